use serde::Serialize;

use super::domain::{AnalysisResult, ApplicantId, ApplicationId, JobId};
use super::guard::SubmissionKey;

/// Steps of one submission attempt, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStep {
    Idle,
    CheckingDuplicate,
    FetchingJob,
    FetchingProfile,
    CreatingApplication,
    Analyzing,
    Success,
    Error,
}

impl SubmissionStep {
    pub const fn is_terminal(self) -> bool {
        matches!(self, SubmissionStep::Success | SubmissionStep::Error)
    }

    /// A session in an active step holds the submission guard for its pair.
    pub const fn is_active(self) -> bool {
        !matches!(
            self,
            SubmissionStep::Idle | SubmissionStep::Success | SubmissionStep::Error
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStep::Idle => "idle",
            SubmissionStep::CheckingDuplicate => "checking_duplicate",
            SubmissionStep::FetchingJob => "fetching_job",
            SubmissionStep::FetchingProfile => "fetching_profile",
            SubmissionStep::CreatingApplication => "creating_application",
            SubmissionStep::Analyzing => "analyzing",
            SubmissionStep::Success => "success",
            SubmissionStep::Error => "error",
        }
    }
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    DuplicateApplication,
    NotFound,
    PreconditionFailed,
    ServiceError,
    Busy,
}

/// Classified failure of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StepFailure {
    pub(crate) kind: FailureKind,
    pub(crate) message: String,
    pub(crate) retryable: bool,
}

impl StepFailure {
    pub(crate) fn terminal(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
        }
    }

    pub(crate) fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ServiceError,
            message: message.into(),
            retryable: true,
        }
    }
}

/// Ephemeral state of one submission attempt.
///
/// Fields are read-only outside the workflow module so the step and pending-id rules can only
/// change through the orchestrator's transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionSession {
    job_id: JobId,
    applicant_id: ApplicantId,
    step: SubmissionStep,
    pending_application_id: Option<ApplicationId>,
    retryable: bool,
    result: Option<AnalysisResult>,
    error_message: Option<String>,
    failure: Option<FailureKind>,
    failed_step: Option<SubmissionStep>,
}

impl SubmissionSession {
    pub fn new(job_id: JobId, applicant_id: ApplicantId) -> Self {
        Self {
            job_id,
            applicant_id,
            step: SubmissionStep::Idle,
            pending_application_id: None,
            retryable: false,
            result: None,
            error_message: None,
            failure: None,
            failed_step: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn applicant_id(&self) -> ApplicantId {
        self.applicant_id
    }

    pub fn key(&self) -> SubmissionKey {
        SubmissionKey::new(self.applicant_id, self.job_id)
    }

    pub fn step(&self) -> SubmissionStep {
        self.step
    }

    pub fn pending_application_id(&self) -> Option<ApplicationId> {
        self.pending_application_id
    }

    pub fn retryable(&self) -> bool {
        self.retryable
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    /// Step that was running when the attempt failed.
    pub fn failed_step(&self) -> Option<SubmissionStep> {
        self.failed_step
    }

    pub fn is_success(&self) -> bool {
        self.step == SubmissionStep::Success
    }

    pub(crate) fn enter(&mut self, step: SubmissionStep) {
        self.step = step;
        self.retryable = false;
        self.error_message = None;
        self.failure = None;
        self.failed_step = None;
    }

    pub(crate) fn record_application(&mut self, id: ApplicationId) {
        self.pending_application_id = Some(id);
        self.enter(SubmissionStep::Analyzing);
    }

    pub(crate) fn succeed(&mut self, result: AnalysisResult) {
        self.result = Some(result);
        self.enter(SubmissionStep::Success);
    }

    pub(crate) fn fail(&mut self, failure: StepFailure) {
        self.failed_step = Some(self.step);
        self.step = SubmissionStep::Error;
        // Only the analysis step can be re-entered, and only with an application on record.
        self.retryable = failure.retryable && self.pending_application_id.is_some();
        self.error_message = Some(failure.message);
        self.failure = Some(failure.kind);
        self.result = None;
    }
}
