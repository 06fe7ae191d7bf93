use async_trait::async_trait;

use super::domain::{
    AnalysisResult, ApplicantId, ApplicantProfile, Application, ApplicationId, ApplicationSummary,
    JobId, JobOpening, NewApplication,
};

/// Job lookup service.
#[async_trait]
pub trait JobDirectory: Send + Sync {
    async fn job(&self, id: JobId) -> Result<JobOpening, ServiceError>;
}

/// Applicant profile lookup service.
#[async_trait]
pub trait ApplicantDirectory: Send + Sync {
    async fn profile(&self, id: ApplicantId) -> Result<ApplicantProfile, ServiceError>;
}

/// Application creation, CV analysis and listing endpoints.
#[async_trait]
pub trait ApplicationGateway: Send + Sync {
    async fn create(&self, request: NewApplication) -> Result<Application, ServiceError>;
    async fn analyze(&self, id: ApplicationId) -> Result<AnalysisResult, ServiceError>;
    async fn list(&self, applicant: ApplicantId) -> Result<Vec<ApplicationSummary>, ServiceError>;
}

/// Failure reported by one of the consumed services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("request rejected: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Server-supplied explanation, when there is one worth showing.
    pub fn detail(&self) -> Option<&str> {
        let message = match self {
            ServiceError::NotFound { .. } => return None,
            ServiceError::Conflict(message)
            | ServiceError::Validation(message)
            | ServiceError::Unauthorized(message)
            | ServiceError::Unavailable(message)
            | ServiceError::Decode(message) => message,
            ServiceError::Server { message, .. } => message,
        };
        let trimmed = message.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// The creation service reports duplicates either as 409 or with an "already applied" message.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
            || self
                .detail()
                .map(|message| message.to_ascii_lowercase().contains("already applied"))
                .unwrap_or(false)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}
