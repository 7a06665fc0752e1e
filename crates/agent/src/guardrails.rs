use campusdesk_core::domain::query::Query;

const HELP_COMMANDS: &[&str] = &["help", "start", "menu"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptDecision {
    Proceed(Query),
    Help,
    Reject { reason_code: &'static str, detail: String },
}

/// Admission checks applied to a prompt before it reaches the cache or a router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptGuard {
    pub max_prompt_chars: usize,
}

impl Default for PromptGuard {
    fn default() -> Self {
        Self { max_prompt_chars: 2000 }
    }
}

impl PromptGuard {
    pub fn new(max_prompt_chars: usize) -> Self {
        Self { max_prompt_chars }
    }

    pub fn evaluate(&self, prompt: Option<&str>) -> PromptDecision {
        let Some(prompt) = prompt else {
            return PromptDecision::Reject {
                reason_code: "missing_prompt",
                detail: "request has no prompt".to_string(),
            };
        };

        let query = Query::new(prompt);
        if query.is_blank() {
            return PromptDecision::Reject {
                reason_code: "empty_prompt",
                detail: "prompt is empty".to_string(),
            };
        }

        let length = prompt.chars().count();
        if length > self.max_prompt_chars {
            return PromptDecision::Reject {
                reason_code: "prompt_too_long",
                detail: format!(
                    "prompt has {length} characters, limit is {}",
                    self.max_prompt_chars
                ),
            };
        }

        if HELP_COMMANDS.contains(&query.normalized()) {
            return PromptDecision::Help;
        }

        PromptDecision::Proceed(query)
    }
}
