//! Routing strategies that turn one validated query into one composed answer.

use async_trait::async_trait;
use thiserror::Error;

use campusdesk_core::config::RoutingStrategy;
use campusdesk_core::domain::query::Query;
use campusdesk_core::domain::session::SessionContext;
use campusdesk_core::domain::Domain;
use campusdesk_core::errors::{ApplicationError, ToolError};

use crate::conversation::HELP_TEXT;
use crate::llm::ModelError;

pub mod keyword;
pub mod model;

pub use keyword::KeywordRouter;
pub use model::{ModelDelegatedRouter, SYSTEM_PROMPT};

pub const MULTI_DOMAIN_PREAMBLE: &str = "I've consulted multiple departments for your query:";

const SECTION_RULE_WIDTH: usize = 60;

/// The composed answer plus which domains contributed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutedAnswer {
    pub text: String,
    /// Domains that produced a section, in priority order.
    pub domains: Vec<Domain>,
    /// Domains that were selected but failed; each has an apology in `text`.
    pub failed: Vec<Domain>,
}

impl RoutedAnswer {
    pub fn help() -> Self {
        Self { text: HELP_TEXT.to_string(), domains: Vec::new(), failed: Vec::new() }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Help fallbacks consulted no domain and stay out of the response cache.
    pub fn is_cacheable(&self) -> bool {
        self.is_complete() && !self.domains.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("all {} selected tools failed", .0.len())]
    AllToolsFailed(Vec<ToolError>),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model kept requesting tools after {0} rounds")]
    RoundsExhausted(u32),
}

impl From<RouterError> for ApplicationError {
    fn from(value: RouterError) -> Self {
        match value {
            RouterError::AllToolsFailed(errors) => match errors.into_iter().next() {
                Some(first) => ApplicationError::ToolFailure(first),
                None => ApplicationError::RoutingFailure("no tool was selected".to_string()),
            },
            RouterError::Model(error) => {
                ApplicationError::ExternalService { class: error.class(), message: error.to_string() }
            }
            RouterError::RoundsExhausted(rounds) => ApplicationError::RoutingFailure(format!(
                "no final answer after {rounds} tool rounds"
            )),
        }
    }
}

#[async_trait]
pub trait Router: Send + Sync {
    fn strategy(&self) -> RoutingStrategy;

    async fn route(
        &self,
        query: &Query,
        session: &SessionContext,
    ) -> Result<RoutedAnswer, RouterError>;
}

pub fn apology(domain: Domain) -> String {
    format!("Sorry, I couldn't retrieve {} information right now.", domain.display_name())
}

/// One section alone is returned as its body; several are wrapped in labeled
/// blocks under the multi-department preamble. `sections` must already be in
/// priority order.
pub fn compose_sections(sections: &[(Domain, String)]) -> String {
    match sections {
        [] => String::new(),
        [(_, body)] => body.clone(),
        _ => {
            let rule = "=".repeat(SECTION_RULE_WIDTH);
            let mut text = format!("{MULTI_DOMAIN_PREAMBLE}\n\n");
            for (domain, body) in sections {
                text.push_str(&format!(
                    "{rule}\n{label}\n{rule}\n\n{body}\n\n",
                    label = domain.section_label()
                ));
            }
            text
        }
    }
}

pub fn append_apologies(text: &str, failed: &[Domain]) -> String {
    if failed.is_empty() {
        return text.to_string();
    }

    let apologies: Vec<String> = failed.iter().map(|domain| apology(*domain)).collect();
    let body = text.trim_end();
    if body.is_empty() {
        apologies.join("\n")
    } else {
        format!("{body}\n\n{}", apologies.join("\n"))
    }
}
