use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use campusdesk_core::config::{AppConfig, RoutingStrategy};
use campusdesk_core::domain::session::SessionContext;
use campusdesk_core::domain::Domain;
use campusdesk_core::errors::ApplicationError;
use campusdesk_db::DirectoryRepository;

use crate::cache::ResponseCache;
use crate::conversation::HELP_TEXT;
use crate::guardrails::{PromptDecision, PromptGuard};
use crate::llm::{ModelClient, ModelError, OpenAiCompatibleClient, RetryPolicy};
use crate::router::{KeywordRouter, ModelDelegatedRouter, Router};
use crate::tools::{ToolLimits, ToolRegistry};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AssistantRequest {
    pub prompt: Option<String>,
    pub session_id: Option<String>,
    pub actor_id: Option<String>,
}

impl AssistantRequest {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self { prompt: Some(prompt.into()), ..Self::default() }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssistantResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<String>,
    pub session_id: String,
    pub correlation_id: String,
    pub cached: bool,
    pub domains: Vec<Domain>,
}

impl AssistantResponse {
    fn answer(
        text: String,
        session: &SessionContext,
        correlation_id: &str,
        cached: bool,
        domains: Vec<Domain>,
    ) -> Self {
        Self {
            response: Some(text),
            error: None,
            error_class: None,
            session_id: session.session_id.clone(),
            correlation_id: correlation_id.to_string(),
            cached,
            domains,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Entry point shared by the HTTP server and the CLI.
///
/// Holds the only cross-request state in the process: the response cache.
#[derive(Clone)]
pub struct AssistantRuntime {
    router: Arc<dyn Router>,
    cache: ResponseCache,
    guard: PromptGuard,
}

impl AssistantRuntime {
    pub fn new(router: Arc<dyn Router>, cache: ResponseCache, guard: PromptGuard) -> Self {
        Self { router, cache, guard }
    }

    /// Builds the configured router over `directory`. The hosted-model client
    /// is only constructed for the model strategy.
    pub fn from_config(
        config: &AppConfig,
        directory: Arc<dyn DirectoryRepository>,
    ) -> Result<Self, ModelError> {
        let client: Option<Arc<dyn ModelClient>> = match config.router.strategy {
            RoutingStrategy::Keyword => None,
            RoutingStrategy::Model => {
                let client: Arc<dyn ModelClient> =
                    Arc::new(OpenAiCompatibleClient::from_config(&config.llm)?);
                Some(client)
            }
        };
        Ok(Self::from_parts(config, directory, client))
    }

    /// Same as [`AssistantRuntime::from_config`] with an injected model client.
    pub fn from_parts(
        config: &AppConfig,
        directory: Arc<dyn DirectoryRepository>,
        client: Option<Arc<dyn ModelClient>>,
    ) -> Self {
        let registry =
            Arc::new(ToolRegistry::with_directory(directory, ToolLimits::from(&config.tools)));
        let tool_timeout = Duration::from_secs(config.router.tool_timeout_secs);

        let router: Arc<dyn Router> = match (config.router.strategy, client) {
            (RoutingStrategy::Model, Some(client)) => Arc::new(ModelDelegatedRouter::new(
                client,
                registry,
                tool_timeout,
                config.router.max_tool_rounds,
                RetryPolicy::from_config(&config.llm),
            )),
            (RoutingStrategy::Model, None) => {
                warn!(
                    event_name = "assistant.model_client_missing",
                    "model strategy configured without a client; using keyword routing"
                );
                Arc::new(KeywordRouter::new(registry, tool_timeout))
            }
            (RoutingStrategy::Keyword, _) => Arc::new(KeywordRouter::new(registry, tool_timeout)),
        };

        Self::new(
            router,
            ResponseCache::from_config(&config.cache),
            PromptGuard::new(config.router.max_prompt_chars),
        )
    }

    pub fn strategy(&self) -> RoutingStrategy {
        self.router.strategy()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Answers one request. Never fails: every error ends up in the
    /// response's `error` field.
    pub async fn handle(&self, request: AssistantRequest) -> AssistantResponse {
        let started = Instant::now();
        let correlation_id = Uuid::new_v4().to_string();
        let session =
            SessionContext::resolve(request.session_id.as_deref(), request.actor_id.as_deref());
        info!(
            event_name = "assistant.received",
            correlation_id = %correlation_id,
            session_id = %session.session_id,
            strategy = ?self.router.strategy(),
            "assistant request received"
        );

        let query = match self.guard.evaluate(request.prompt.as_deref()) {
            PromptDecision::Proceed(query) => query,
            PromptDecision::Help => {
                info!(
                    event_name = "assistant.help",
                    correlation_id = %correlation_id,
                    "help shortcut"
                );
                return AssistantResponse::answer(
                    HELP_TEXT.to_string(),
                    &session,
                    &correlation_id,
                    false,
                    Vec::new(),
                );
            }
            PromptDecision::Reject { reason_code, detail } => {
                warn!(
                    event_name = "assistant.rejected",
                    correlation_id = %correlation_id,
                    reason_code,
                    detail = %detail,
                    "prompt rejected"
                );
                return self.failure(ApplicationError::Validation(detail), &session, &correlation_id);
            }
        };

        if let Some(text) = self.cache.lookup(&query).await {
            let fingerprint = query.fingerprint();
            info!(
                event_name = "assistant.cache_hit",
                correlation_id = %correlation_id,
                fingerprint = fingerprint.short(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "answered from cache"
            );
            return AssistantResponse::answer(text, &session, &correlation_id, true, Vec::new());
        }

        match self.router.route(&query, &session).await {
            Ok(answer) => {
                if answer.is_cacheable() {
                    self.cache.store(&query, answer.text.clone()).await;
                }
                info!(
                    event_name = "assistant.answered",
                    correlation_id = %correlation_id,
                    domains = ?answer.domains,
                    failed = ?answer.failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "query routed and composed"
                );
                AssistantResponse::answer(answer.text, &session, &correlation_id, false, answer.domains)
            }
            Err(error) => {
                warn!(
                    event_name = "assistant.route_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "routing failed"
                );
                self.failure(ApplicationError::from(error), &session, &correlation_id)
            }
        }
    }

    fn failure(
        &self,
        error: ApplicationError,
        session: &SessionContext,
        correlation_id: &str,
    ) -> AssistantResponse {
        let interface = error.into_interface(correlation_id);
        AssistantResponse {
            response: None,
            error: Some(interface.user_message().to_string()),
            error_class: Some(interface.error_class().to_string()),
            session_id: session.session_id.clone(),
            correlation_id: correlation_id.to_string(),
            cached: false,
            domains: Vec::new(),
        }
    }
}
