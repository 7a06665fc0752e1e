use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use campusdesk_core::config::RoutingStrategy;
use campusdesk_core::domain::query::Query;
use campusdesk_core::domain::session::SessionContext;
use campusdesk_core::domain::Domain;
use campusdesk_core::errors::ToolError;

use crate::llm::{converse_with_retry, ChatMessage, ModelClient, ModelRequest, RetryPolicy};
use crate::router::{append_apologies, compose_sections, RoutedAnswer, Router, RouterError};
use crate::tools::{ToolInvocation, ToolRegistry};

pub const SYSTEM_PROMPT: &str = "You are a helpful university assistant. \
Use the available tools to look up courses, the academic calendar, fees, hostels, \
library services and administrative services before answering. \
Call every tool the question needs; several tools may be called at once. \
Answer only from tool results, say so plainly when a tool reports that nothing was found, \
and keep answers short and friendly.";

/// Hands the six tools to a hosted chat model and executes the calls it asks for.
pub struct ModelDelegatedRouter {
    client: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
    max_tool_rounds: u32,
    retry: RetryPolicy,
}

/// Result message for one requested call, kept sortable by domain.
struct CallResult {
    domain: Option<Domain>,
    call_id: String,
    content: String,
}

impl ModelDelegatedRouter {
    pub fn new(
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        tool_timeout: Duration,
        max_tool_rounds: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self { client, registry, tool_timeout, max_tool_rounds: max_tool_rounds.max(1), retry }
    }
}

fn failure_note(error: &ToolError) -> String {
    format!(
        "Error: {} information is unavailable right now ({}).",
        error.domain.display_name(),
        error.message
    )
}

fn parse_arguments(arguments: &str) -> Result<Value, serde_json::Error> {
    if arguments.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(arguments)
}

#[async_trait]
impl Router for ModelDelegatedRouter {
    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::Model
    }

    async fn route(
        &self,
        query: &Query,
        session: &SessionContext,
    ) -> Result<RoutedAnswer, RouterError> {
        let mut request = ModelRequest {
            messages: vec![
                ChatMessage::System(SYSTEM_PROMPT.to_string()),
                ChatMessage::User(query.raw().trim().to_string()),
            ],
            tools: self.registry.specs(),
            session: session.clone(),
        };
        let mut sections: Vec<(Domain, String)> = Vec::new();
        let mut succeeded: BTreeSet<Domain> = BTreeSet::new();
        let mut failed: BTreeSet<Domain> = BTreeSet::new();

        for round in 0..self.max_tool_rounds {
            let reply = converse_with_retry(self.client.as_ref(), &request, self.retry).await?;

            if reply.tool_calls.is_empty() {
                if round == 0 {
                    info!(
                        event_name = "router.model.no_tools",
                        session_id = %session.session_id,
                        "model answered without consulting a tool"
                    );
                    return Ok(RoutedAnswer::help());
                }

                failed.retain(|domain| !succeeded.contains(domain));
                let failed: Vec<Domain> = failed.into_iter().collect();
                let text = reply.text.unwrap_or_else(|| compose_sections(&sections));
                return Ok(RoutedAnswer {
                    text: append_apologies(&text, &failed),
                    domains: succeeded.into_iter().collect(),
                    failed,
                });
            }

            info!(
                event_name = "router.model.round",
                session_id = %session.session_id,
                round,
                calls = reply.tool_calls.len(),
                "model requested tools"
            );

            let mut results = Vec::with_capacity(reply.tool_calls.len());
            let mut invocations = Vec::new();
            let mut round_errors = Vec::new();
            for call in &reply.tool_calls {
                let Some(domain) = Domain::from_tool_name(&call.name) else {
                    warn!(event_name = "router.model.unknown_tool", tool = %call.name, "unknown tool");
                    results.push(CallResult {
                        domain: None,
                        call_id: call.id.clone(),
                        content: format!("Error: unknown tool `{}`.", call.name),
                    });
                    continue;
                };

                match parse_arguments(&call.arguments) {
                    Ok(params) => invocations.push(ToolInvocation {
                        call_id: Some(call.id.clone()),
                        domain,
                        params,
                    }),
                    Err(error) => {
                        let error = ToolError::non_retryable(
                            domain,
                            format!("invalid tool arguments: {error}"),
                        );
                        results.push(CallResult {
                            domain: Some(domain),
                            call_id: call.id.clone(),
                            content: failure_note(&error),
                        });
                        failed.insert(domain);
                        round_errors.push(error);
                    }
                }
            }

            let mut round_succeeded = false;
            for outcome in self.registry.invoke_all(invocations, self.tool_timeout).await {
                let call_id = outcome.call_id.unwrap_or_default();
                match outcome.result {
                    Ok(result) => {
                        round_succeeded = true;
                        if succeeded.insert(outcome.domain) {
                            sections.push((outcome.domain, result.render_lines()));
                        }
                        results.push(CallResult {
                            domain: Some(outcome.domain),
                            call_id,
                            content: result.to_compact_text(),
                        });
                    }
                    Err(error) => {
                        results.push(CallResult {
                            domain: Some(outcome.domain),
                            call_id,
                            content: failure_note(&error),
                        });
                        failed.insert(outcome.domain);
                        round_errors.push(error);
                    }
                }
            }

            if !round_succeeded && succeeded.is_empty() && !round_errors.is_empty() {
                return Err(RouterError::AllToolsFailed(round_errors));
            }

            // Unknown tools sort after every known domain.
            results.sort_by_key(|result| (result.domain.is_none(), result.domain));
            sections.sort_by_key(|(domain, _)| *domain);

            request.messages.push(ChatMessage::Assistant {
                text: reply.text,
                tool_calls: reply.tool_calls,
            });
            request.messages.extend(results.into_iter().map(|result| ChatMessage::ToolResult {
                call_id: result.call_id,
                content: result.content,
            }));
        }

        warn!(
            event_name = "router.model.rounds_exhausted",
            session_id = %session.session_id,
            max_tool_rounds = self.max_tool_rounds,
            "model did not produce a final answer"
        );
        Err(RouterError::RoundsExhausted(self.max_tool_rounds))
    }
}
