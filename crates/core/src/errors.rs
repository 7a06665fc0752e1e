use serde::Serialize;
use thiserror::Error;

use crate::domain::Domain;

/// Whether retrying the same call later may succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Retryable,
    NonRetryable,
}

impl FailureClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// A single domain tool could not produce a result.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{domain} tool failed ({class:?}): {message}")]
pub struct ToolError {
    pub domain: Domain,
    pub class: FailureClass,
    pub message: String,
}

impl ToolError {
    pub fn retryable(domain: Domain, message: impl Into<String>) -> Self {
        Self { domain, class: FailureClass::Retryable, message: message.into() }
    }

    pub fn non_retryable(domain: Domain, message: impl Into<String>) -> Self {
        Self { domain, class: FailureClass::NonRetryable, message: message.into() }
    }

    pub fn timed_out(domain: Domain, timeout_secs: u64) -> Self {
        Self::retryable(domain, format!("timed out after {timeout_secs}s"))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    ToolFailure(#[from] ToolError),
    #[error("routing failed: {0}")]
    RoutingFailure(String),
    #[error("external service failure: {message}")]
    ExternalService { class: FailureClass, message: String },
}

impl ApplicationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::RoutingFailure(_) => false,
            Self::ToolFailure(error) => error.class.is_retryable(),
            Self::ExternalService { class, .. } => class.is_retryable(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String, retryable: bool },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "Please send a question about courses, fees, dates, hostels, the library or administrative services."
            }
            Self::ServiceUnavailable { .. } => {
                "Sorry, I'm having trouble connecting to the university system right now. Please try again later."
            }
            Self::Internal { .. } => "Sorry, something went wrong while answering your question.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "validation",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let retryable = value.is_retryable();
        match value {
            ApplicationError::Validation(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::ToolFailure(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
                retryable,
            },
            ApplicationError::ExternalService { message, .. } => Self::ServiceUnavailable {
                message,
                correlation_id: "unassigned".to_owned(),
                retryable,
            },
            ApplicationError::RoutingFailure(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
