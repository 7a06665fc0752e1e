//! Assistant runtime for campus questions.
//!
//! A prompt passes the [`guardrails::PromptGuard`], is looked up in the
//! [`cache::ResponseCache`], and on a miss is handed to a [`router::Router`]:
//!
//! - [`router::KeywordRouter`] picks domains from fixed keyword sets and reads
//!   tool parameters straight out of the query (`conversation`).
//! - [`router::ModelDelegatedRouter`] gives the six domain tools to a hosted
//!   chat model and runs whatever calls it asks for (`llm`).
//!
//! Both strategies invoke tools through [`tools::ToolRegistry`] and compose
//! sections in the fixed domain priority order. Only answers where every
//! selected tool succeeded are cached.

pub mod cache;
pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod router;
pub mod runtime;
pub mod tools;

pub use cache::ResponseCache;
pub use guardrails::{PromptDecision, PromptGuard};
pub use llm::{ModelClient, ModelError, OpenAiCompatibleClient};
pub use router::{KeywordRouter, ModelDelegatedRouter, RoutedAnswer, Router, RouterError};
pub use runtime::{AssistantRequest, AssistantResponse, AssistantRuntime};
pub use tools::{DomainResult, DomainTool, ToolRegistry};
