use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use campusdesk_core::config::ToolsConfig;
use campusdesk_core::domain::directory::DirectoryFilter;
use campusdesk_core::domain::Domain;
use campusdesk_core::errors::ToolError;
use campusdesk_db::{DirectoryRepository, RepositoryError};

/// Function-calling description handed to the hosted model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Records returned by one tool, in store order.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainResult {
    pub domain: Domain,
    pub records: Vec<Map<String, Value>>,
}

impl DomainResult {
    pub fn from_rows<T: Serialize>(domain: Domain, rows: &[T]) -> Result<Self, ToolError> {
        let records = rows
            .iter()
            .map(|row| match serde_json::to_value(row) {
                Ok(Value::Object(record)) => Ok(record),
                Ok(other) => Err(ToolError::non_retryable(
                    domain,
                    format!("row serialized to non-object value: {other}"),
                )),
                Err(error) => Err(ToolError::non_retryable(domain, error.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { domain, records })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sentinel(&self) -> &'static str {
        empty_sentinel(self.domain)
    }

    /// Compact JSON array for the hosted model, or the sentinel when empty.
    pub fn to_compact_text(&self) -> String {
        if self.is_empty() {
            return self.sentinel().to_string();
        }
        Value::Array(self.records.iter().cloned().map(Value::Object).collect()).to_string()
    }

    /// Labeled lines, one block per record; null fields are skipped.
    pub fn render_lines(&self) -> String {
        if self.is_empty() {
            return self.sentinel().to_string();
        }

        let mut blocks = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let mut lines = Vec::new();
            for (field, value) in record {
                let rendered = match value {
                    Value::Null => continue,
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                let prefix = if lines.is_empty() { "- " } else { "  " };
                lines.push(format!("{prefix}{field}: {rendered}"));
            }
            blocks.push(lines.join("\n"));
        }
        blocks.join("\n")
    }
}

pub fn empty_sentinel(domain: Domain) -> &'static str {
    match domain {
        Domain::Academic => "No courses found.",
        Domain::Calendar => "No calendar events found.",
        Domain::Financial => "No fees found.",
        Domain::Hostel => "No hostels found.",
        Domain::Library => "No library services found.",
        Domain::Administrative => "No administrative services found.",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self { default_limit: 10, max_limit: 50 }
    }
}

impl From<&ToolsConfig> for ToolLimits {
    fn from(config: &ToolsConfig) -> Self {
        Self { default_limit: config.default_limit, max_limit: config.max_limit }
    }
}

impl ToolLimits {
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_limit.min(self.max_limit),
            Some(limit) => limit.min(self.max_limit),
        }
    }
}

#[async_trait]
pub trait DomainTool: Send + Sync {
    fn domain(&self) -> Domain;
    fn spec(&self) -> ToolSpec;
    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError>;
}

fn parse_params<P>(domain: Domain, params: Value) -> Result<P, ToolError>
where
    P: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(P::default());
    }
    serde_json::from_value(params)
        .map_err(|error| ToolError::non_retryable(domain, format!("invalid parameters: {error}")))
}

fn store_failure(domain: Domain, error: RepositoryError) -> ToolError {
    if error.is_retryable() {
        ToolError::retryable(domain, error.to_string())
    } else {
        ToolError::non_retryable(domain, error.to_string())
    }
}

fn string_schema(field: &str, description: &str) -> Value {
    let mut properties = Map::new();
    properties.insert(field.to_string(), json!({ "type": "string", "description": description }));
    properties.insert(
        "limit".to_string(),
        json!({ "type": "integer", "minimum": 1, "description": "Maximum rows to return" }),
    );
    json!({ "type": "object", "properties": properties, "additionalProperties": false })
}

#[derive(Debug, Default, Deserialize)]
struct CourseParams {
    search: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ScheduleParams {
    semester: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FeeParams {
    level: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct HostelParams {
    gender: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LibraryParams {
    topic: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AdministrativeParams {
    service: Option<String>,
    limit: Option<u32>,
}

pub struct CourseTool {
    directory: Arc<dyn DirectoryRepository>,
    limits: ToolLimits,
}

impl CourseTool {
    pub fn new(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        Self { directory, limits }
    }
}

#[async_trait]
impl DomainTool for CourseTool {
    fn domain(&self) -> Domain {
        Domain::Academic
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Domain::Academic.tool_name(),
            description: "Search courses by code or name (prerequisites, lecturer, semester). Leave empty for top results.",
            parameters: string_schema("search", "Course code such as CSC301, or part of a course name"),
        }
    }

    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError> {
        let params: CourseParams = parse_params(Domain::Academic, params)?;
        let filter = DirectoryFilter::new(params.search, self.limits.resolve(params.limit));
        let rows = self
            .directory
            .courses(&filter)
            .await
            .map_err(|error| store_failure(Domain::Academic, error))?;
        DomainResult::from_rows(Domain::Academic, &rows)
    }
}

pub struct ScheduleTool {
    directory: Arc<dyn DirectoryRepository>,
    limits: ToolLimits,
}

impl ScheduleTool {
    pub fn new(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        Self { directory, limits }
    }
}

#[async_trait]
impl DomainTool for ScheduleTool {
    fn domain(&self) -> Domain {
        Domain::Calendar
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Domain::Calendar.tool_name(),
            description: "Get academic calendar events: registration dates, deadlines, exam periods.",
            parameters: string_schema("semester", "`first` or `second` to filter by semester"),
        }
    }

    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError> {
        let params: ScheduleParams = parse_params(Domain::Calendar, params)?;
        let filter = DirectoryFilter::new(params.semester, self.limits.resolve(params.limit));
        let rows = self
            .directory
            .calendar(&filter)
            .await
            .map_err(|error| store_failure(Domain::Calendar, error))?;
        DomainResult::from_rows(Domain::Calendar, &rows)
    }
}

pub struct FeeTool {
    directory: Arc<dyn DirectoryRepository>,
    limits: ToolLimits,
}

impl FeeTool {
    pub fn new(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        Self { directory, limits }
    }
}

#[async_trait]
impl DomainTool for FeeTool {
    fn domain(&self) -> Domain {
        Domain::Financial
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Domain::Financial.tool_name(),
            description: "Get tuition fees. Pass a level such as `100` or `200` to filter, or leave empty for all.",
            parameters: string_schema("level", "Student level, for example `200`"),
        }
    }

    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError> {
        let params: FeeParams = parse_params(Domain::Financial, params)?;
        let filter = DirectoryFilter::new(params.level, self.limits.resolve(params.limit));
        let rows = self
            .directory
            .fees(&filter)
            .await
            .map_err(|error| store_failure(Domain::Financial, error))?;
        DomainResult::from_rows(Domain::Financial, &rows)
    }
}

pub struct HostelTool {
    directory: Arc<dyn DirectoryRepository>,
    limits: ToolLimits,
}

impl HostelTool {
    pub fn new(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        Self { directory, limits }
    }
}

#[async_trait]
impl DomainTool for HostelTool {
    fn domain(&self) -> Domain {
        Domain::Hostel
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Domain::Hostel.tool_name(),
            description: "Get hostel information. Pass `male`, `female` or `mixed` to filter by gender; mixed halls are always included.",
            parameters: string_schema("gender", "`male`, `female` or `mixed`"),
        }
    }

    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError> {
        let params: HostelParams = parse_params(Domain::Hostel, params)?;
        let filter = DirectoryFilter::new(params.gender, self.limits.resolve(params.limit));
        let rows = self
            .directory
            .hostels(&filter)
            .await
            .map_err(|error| store_failure(Domain::Hostel, error))?;
        DomainResult::from_rows(Domain::Hostel, &rows)
    }
}

pub struct LibraryTool {
    directory: Arc<dyn DirectoryRepository>,
    limits: ToolLimits,
}

impl LibraryTool {
    pub fn new(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        Self { directory, limits }
    }
}

#[async_trait]
impl DomainTool for LibraryTool {
    fn domain(&self) -> Domain {
        Domain::Library
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Domain::Library.tool_name(),
            description: "Get library hours, borrowing rules, resources and facilities.",
            parameters: string_schema("topic", "Topic such as `hours` or `borrowing`"),
        }
    }

    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError> {
        let params: LibraryParams = parse_params(Domain::Library, params)?;
        let filter = DirectoryFilter::new(params.topic, self.limits.resolve(params.limit));
        let rows = self
            .directory
            .library(&filter)
            .await
            .map_err(|error| store_failure(Domain::Library, error))?;
        DomainResult::from_rows(Domain::Library, &rows)
    }
}

pub struct AdministrativeTool {
    directory: Arc<dyn DirectoryRepository>,
    limits: ToolLimits,
}

impl AdministrativeTool {
    pub fn new(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        Self { directory, limits }
    }
}

#[async_trait]
impl DomainTool for AdministrativeTool {
    fn domain(&self) -> Domain {
        Domain::Administrative
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Domain::Administrative.tool_name(),
            description: "Get administrative services: transcripts, ID cards, certificates, clearance, verification letters.",
            parameters: string_schema("service", "Service name such as `transcript` or `id card`"),
        }
    }

    async fn invoke(&self, params: Value) -> Result<DomainResult, ToolError> {
        let params: AdministrativeParams = parse_params(Domain::Administrative, params)?;
        let filter = DirectoryFilter::new(params.service, self.limits.resolve(params.limit));
        let rows = self
            .directory
            .administrative(&filter)
            .await
            .map_err(|error| store_failure(Domain::Administrative, error))?;
        DomainResult::from_rows(Domain::Administrative, &rows)
    }
}

/// One requested tool call.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub call_id: Option<String>,
    pub domain: Domain,
    pub params: Value,
}

impl ToolInvocation {
    pub fn new(domain: Domain, params: Value) -> Self {
        Self { call_id: None, domain, params }
    }
}

#[derive(Clone, Debug)]
pub struct ToolOutcome {
    pub call_id: Option<String>,
    pub domain: Domain,
    pub result: Result<DomainResult, ToolError>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<Domain, Arc<dyn DomainTool>>,
}

impl ToolRegistry {
    /// Registers the six directory-backed tools.
    pub fn with_directory(directory: Arc<dyn DirectoryRepository>, limits: ToolLimits) -> Self {
        let mut registry = Self::default();
        registry.register(CourseTool::new(directory.clone(), limits));
        registry.register(ScheduleTool::new(directory.clone(), limits));
        registry.register(FeeTool::new(directory.clone(), limits));
        registry.register(HostelTool::new(directory.clone(), limits));
        registry.register(LibraryTool::new(directory.clone(), limits));
        registry.register(AdministrativeTool::new(directory, limits));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: DomainTool + 'static,
    {
        self.tools.insert(tool.domain(), Arc::new(tool));
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<dyn DomainTool>> {
        self.tools.get(&domain).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn DomainTool>> {
        Domain::from_tool_name(name).and_then(|domain| self.get(domain))
    }

    /// Specs in composition priority order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs all invocations concurrently, each bounded by `timeout`.
    ///
    /// Outcomes come back sorted by domain priority regardless of completion
    /// order; a failing tool never affects the others.
    pub async fn invoke_all(
        &self,
        invocations: Vec<ToolInvocation>,
        timeout: Duration,
    ) -> Vec<ToolOutcome> {
        let pending = invocations.into_iter().map(|invocation| async move {
            let started = Instant::now();
            let domain = invocation.domain;
            let result = match self.get(domain) {
                None => Err(ToolError::non_retryable(domain, "tool is not registered")),
                Some(tool) => match tokio::time::timeout(timeout, tool.invoke(invocation.params)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::timed_out(domain, timeout.as_secs())),
                },
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(found) => info!(
                    event_name = "tool.invoked",
                    domain = %domain,
                    records = found.records.len(),
                    elapsed_ms,
                    "domain tool answered"
                ),
                Err(error) => warn!(
                    event_name = "tool.failed",
                    domain = %domain,
                    retryable = error.class.is_retryable(),
                    elapsed_ms,
                    error = %error,
                    "domain tool failed"
                ),
            }

            ToolOutcome { call_id: invocation.call_id, domain, result }
        });

        let mut outcomes = join_all(pending).await;
        outcomes.sort_by_key(|outcome| outcome.domain);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use campusdesk_core::domain::directory::{Fee, Hostel};
    use campusdesk_core::domain::Domain;
    use campusdesk_core::errors::{FailureClass, ToolError};
    use campusdesk_db::InMemoryDirectoryRepository;

    use super::{
        DomainResult, DomainTool, HostelTool, ToolInvocation, ToolLimits, ToolRegistry, ToolSpec,
    };

    fn hostel(name: &str, gender: &str) -> Hostel {
        Hostel {
            name: name.to_string(),
            gender: Some(gender.to_string()),
            capacity: Some(400),
            status: Some("Available".to_string()),
            facilities: None,
        }
    }

    async fn directory() -> Arc<InMemoryDirectoryRepository> {
        let directory = Arc::new(InMemoryDirectoryRepository::default());
        directory.add_hostel(hostel("Ajose Hall", "Male")).await;
        directory.add_hostel(hostel("Adeoye Hall", "Female")).await;
        directory
            .add_fee(Fee {
                level: "200-400 Level".to_string(),
                amount: 75_000,
                fee_type: Some("Tuition".to_string()),
                session: Some("2024/2025".to_string()),
            })
            .await;
        directory
    }

    struct SlowTool;

    #[async_trait]
    impl DomainTool for SlowTool {
        fn domain(&self) -> Domain {
            Domain::Library
        }

        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "get_library_info", description: "slow", parameters: json!({}) }
        }

        async fn invoke(&self, _params: Value) -> Result<DomainResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(DomainResult { domain: Domain::Library, records: Vec::new() })
        }
    }

    #[tokio::test]
    async fn unknown_gender_yields_sentinel_not_error() {
        let tool = HostelTool::new(directory().await, ToolLimits::default());

        let result = tool.invoke(json!({ "gender": "nonbinary" })).await.expect("invoke");

        assert!(result.is_empty());
        assert_eq!(result.to_compact_text(), "No hostels found.");
        assert_eq!(result.render_lines(), "No hostels found.");
    }

    #[tokio::test]
    async fn compact_text_is_json_array_of_records() {
        let tool = HostelTool::new(directory().await, ToolLimits::default());

        let result = tool.invoke(json!({ "gender": "female" })).await.expect("invoke");
        let parsed: Value = serde_json::from_str(&result.to_compact_text()).expect("json");

        assert_eq!(parsed[0]["name"], "Adeoye Hall");
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn rendered_lines_label_each_field_and_skip_nulls() {
        let tool = HostelTool::new(directory().await, ToolLimits::default());

        let result = tool.invoke(json!({ "gender": "male" })).await.expect("invoke");
        let rendered = result.render_lines();

        assert!(rendered.starts_with("- name: Ajose Hall"));
        assert!(rendered.contains("  capacity: 400"));
        assert!(!rendered.contains("facilities"));
    }

    #[tokio::test]
    async fn wrongly_typed_parameters_are_non_retryable() {
        let tool = HostelTool::new(directory().await, ToolLimits::default());

        let error = tool.invoke(json!({ "gender": 42 })).await.expect_err("invalid params");

        assert_eq!(error.domain, Domain::Hostel);
        assert_eq!(error.class, FailureClass::NonRetryable);
    }

    #[tokio::test]
    async fn null_parameters_mean_unfiltered() {
        let tool = HostelTool::new(directory().await, ToolLimits::default());

        let result = tool.invoke(Value::Null).await.expect("invoke");

        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn limits_default_and_cap() {
        let limits = ToolLimits::default();
        assert_eq!(limits.resolve(None), 10);
        assert_eq!(limits.resolve(Some(0)), 10);
        assert_eq!(limits.resolve(Some(3)), 3);
        assert_eq!(limits.resolve(Some(500)), 50);
    }

    #[tokio::test]
    async fn registry_exposes_specs_in_priority_order() {
        let registry = ToolRegistry::with_directory(directory().await, ToolLimits::default());

        let names: Vec<_> = registry.specs().into_iter().map(|spec| spec.name).collect();

        assert_eq!(registry.len(), 6);
        assert_eq!(
            names,
            vec![
                "get_course_info",
                "get_schedule_info",
                "get_financial_info",
                "get_hostel_info",
                "get_library_info",
                "get_administrative_info",
            ]
        );
        assert!(registry.by_name("get_hostel_info").is_some());
        assert!(registry.by_name("get_weather").is_none());
    }

    #[tokio::test]
    async fn invoke_all_sorts_by_priority_and_times_out_slow_tools() {
        let mut registry = ToolRegistry::with_directory(directory().await, ToolLimits::default());
        registry.register(SlowTool);

        let outcomes = registry
            .invoke_all(
                vec![
                    ToolInvocation::new(Domain::Library, json!({})),
                    ToolInvocation::new(Domain::Hostel, json!({})),
                    ToolInvocation::new(Domain::Financial, json!({})),
                ],
                Duration::from_millis(50),
            )
            .await;

        let domains: Vec<_> = outcomes.iter().map(|outcome| outcome.domain).collect();
        assert_eq!(domains, vec![Domain::Financial, Domain::Hostel, Domain::Library]);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_ok());
        let timeout = outcomes[2].result.as_ref().expect_err("slow tool times out");
        assert_eq!(timeout.class, FailureClass::Retryable);
    }
}
