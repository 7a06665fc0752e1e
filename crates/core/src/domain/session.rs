use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Correlates several queries into one externally held conversation.
///
/// The assistant never stores conversation state itself; the identifiers are
/// only forwarded to the hosted model so it can keep multi-turn memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub actor_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), actor_id: actor_id.into() }
    }

    /// Missing session ids get a fresh anonymous id so that two callers never
    /// share history by accident.
    pub fn resolve(session_id: Option<&str>, actor_id: Option<&str>) -> Self {
        let session_id = session_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(anonymous_session_id);
        let actor_id = actor_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS_ACTOR)
            .to_string();

        Self { session_id, actor_id }
    }

    pub fn is_anonymous(&self) -> bool {
        self.session_id.starts_with("anon_")
    }
}

fn anonymous_session_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("anon_{}", &id[..12])
}
