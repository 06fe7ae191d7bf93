//! Job application submission workflow.
//!
//! A submission is a client-orchestrated transaction over four backend calls: job lookup,
//! applicant profile lookup, application creation and CV analysis. Only the analysis step can
//! be retried on its own; every earlier failure ends the attempt.

pub mod applied;
pub mod desk;
pub mod domain;
pub mod duplicate;
pub mod gateway;
pub mod guard;
pub mod orchestrator;
pub mod progress;
pub mod router;
pub mod session;

#[cfg(test)]
mod tests;

pub use applied::AppliedSet;
pub use desk::ApplicationDesk;
pub use domain::{
    AnalysisResult, AnalysisStatus, ApplicantId, ApplicantProfile, ApplicantSkill, Application,
    ApplicationId, ApplicationStatus, ApplicationSummary, EmployerId, InvalidId, JobId,
    JobOpening, JobStatus, NewApplication,
};
pub use duplicate::{Admission, DenialReason, DuplicateGuard};
pub use gateway::{ApplicantDirectory, ApplicationGateway, JobDirectory, ServiceError};
pub use guard::{Busy, InFlightPermit, SubmissionGuard, SubmissionKey};
pub use orchestrator::{RetryError, SubmissionOrchestrator, SubmitRejected};
pub use progress::{
    report, NoopObserver, Phase, ProgressReport, SessionObserver, StepState, StepView,
};
pub use router::{application_router, SessionEnvelope};
pub use session::{FailureKind, SubmissionSession, SubmissionStep};
