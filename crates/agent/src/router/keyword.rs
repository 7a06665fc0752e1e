use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use campusdesk_core::config::RoutingStrategy;
use campusdesk_core::domain::query::Query;
use campusdesk_core::domain::session::SessionContext;

use crate::conversation::{matched_domains, ParameterExtractor};
use crate::router::{append_apologies, compose_sections, RoutedAnswer, Router, RouterError};
use crate::tools::{ToolInvocation, ToolRegistry};

/// Deterministic routing by keyword sets and extracted parameters.
pub struct KeywordRouter {
    registry: Arc<ToolRegistry>,
    extractor: ParameterExtractor,
    tool_timeout: Duration,
}

impl KeywordRouter {
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Duration) -> Self {
        Self { registry, extractor: ParameterExtractor::new(), tool_timeout }
    }
}

#[async_trait]
impl Router for KeywordRouter {
    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::Keyword
    }

    async fn route(
        &self,
        query: &Query,
        session: &SessionContext,
    ) -> Result<RoutedAnswer, RouterError> {
        let normalized = query.normalized();
        let domains = matched_domains(normalized);
        if domains.is_empty() {
            debug!(
                event_name = "router.keyword.no_match",
                session_id = %session.session_id,
                "no domain keywords matched"
            );
            return Ok(RoutedAnswer::help());
        }

        let invocations: Vec<ToolInvocation> = domains
            .iter()
            .map(|domain| ToolInvocation::new(*domain, self.extractor.extract(*domain, normalized)))
            .collect();
        info!(
            event_name = "router.keyword.selected",
            session_id = %session.session_id,
            domains = ?domains,
            "routing query to domain tools"
        );

        let outcomes = self.registry.invoke_all(invocations, self.tool_timeout).await;

        let mut sections = Vec::new();
        let mut failed = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(result) => sections.push((outcome.domain, result.render_lines())),
                Err(error) => {
                    failed.push(outcome.domain);
                    errors.push(error);
                }
            }
        }

        if sections.is_empty() {
            return Err(RouterError::AllToolsFailed(errors));
        }

        let text = append_apologies(&compose_sections(&sections), &failed);
        Ok(RoutedAnswer {
            text,
            domains: sections.into_iter().map(|(domain, _)| domain).collect(),
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use campusdesk_core::domain::directory::{CalendarEvent, Fee, Hostel};
    use campusdesk_core::domain::query::Query;
    use campusdesk_core::domain::session::SessionContext;
    use campusdesk_core::domain::Domain;
    use campusdesk_db::InMemoryDirectoryRepository;

    use crate::conversation::HELP_TEXT;
    use crate::router::{Router, RouterError, MULTI_DOMAIN_PREAMBLE};
    use crate::tools::{ToolLimits, ToolRegistry};

    use super::KeywordRouter;

    async fn router() -> KeywordRouter {
        let directory = Arc::new(InMemoryDirectoryRepository::default());
        directory
            .add_calendar_event(CalendarEvent {
                event_type: "Registration".to_string(),
                event_date: "2024-09-01".to_string(),
                semester: Some("First".to_string()),
                session: Some("2024/2025".to_string()),
                description: Some("Course registration opens".to_string()),
            })
            .await;
        directory
            .add_fee(Fee {
                level: "100 Level".to_string(),
                amount: 85_000,
                fee_type: Some("Tuition".to_string()),
                session: Some("2024/2025".to_string()),
            })
            .await;
        directory
            .add_fee(Fee {
                level: "200-400 Level".to_string(),
                amount: 75_000,
                fee_type: Some("Tuition".to_string()),
                session: Some("2024/2025".to_string()),
            })
            .await;
        directory
            .add_hostel(Hostel {
                name: "Mercy Hall".to_string(),
                gender: Some("Female".to_string()),
                capacity: Some(350),
                status: Some("Available".to_string()),
                facilities: None,
            })
            .await;

        let registry = ToolRegistry::with_directory(directory, ToolLimits::default());
        KeywordRouter::new(Arc::new(registry), Duration::from_secs(1))
    }

    fn session() -> SessionContext {
        SessionContext::new("sess-1", "student-1")
    }

    #[tokio::test]
    async fn multi_domain_query_composes_sections_in_priority_order() {
        let answer = router()
            .await
            .route(&Query::new("How much are fees and when is registration?"), &session())
            .await
            .expect("route");

        assert_eq!(answer.domains, vec![Domain::Calendar, Domain::Financial]);
        assert!(answer.text.starts_with(MULTI_DOMAIN_PREAMBLE));
        assert!(answer.text.contains("- event_type: Registration"));
        assert!(answer.text.contains("- level: 100 Level"));
        assert!(answer.is_complete());
    }

    #[tokio::test]
    async fn single_domain_query_returns_bare_body() {
        let answer = router()
            .await
            .route(&Query::new("hostels for female students"), &session())
            .await
            .expect("route");

        assert_eq!(answer.domains, vec![Domain::Hostel]);
        assert!(answer.text.starts_with("- name: Mercy Hall"));
    }

    #[tokio::test]
    async fn mid_programme_level_finds_its_fee_band() {
        let answer = router()
            .await
            .route(&Query::new("fees for 300 level"), &session())
            .await
            .expect("route");

        assert_eq!(answer.domains, vec![Domain::Financial]);
        assert!(answer.text.contains("- level: 200-400 Level"));
        assert!(!answer.text.contains("100 Level"));
    }

    #[tokio::test]
    async fn unmatched_query_returns_help_text() {
        let answer = router()
            .await
            .route(&Query::new("What is the weather today?"), &session())
            .await
            .expect("route");

        assert_eq!(answer.text, HELP_TEXT);
        assert!(answer.domains.is_empty());
    }

    #[tokio::test]
    async fn empty_store_result_is_a_sentinel_section() {
        let answer = router()
            .await
            .route(&Query::new("any male hostel rooms?"), &session())
            .await
            .expect("route");

        assert_eq!(answer.text, "No hostels found.");
        assert_eq!(answer.domains, vec![Domain::Hostel]);
    }

    #[tokio::test]
    async fn missing_tools_fail_every_selected_domain() {
        let router = KeywordRouter::new(Arc::new(ToolRegistry::default()), Duration::from_secs(1));

        let error = router
            .route(&Query::new("library hours"), &session())
            .await
            .expect_err("no tools registered");

        assert!(matches!(error, RouterError::AllToolsFailed(ref errors) if errors.len() == 1));
    }
}
