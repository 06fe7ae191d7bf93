use std::sync::Arc;

use tracing::{debug, info, warn};

use super::applied::AppliedSet;
use super::domain::{ApplicantId, Application, EmployerId, JobId, NewApplication};
use super::duplicate::{Admission, DenialReason, DuplicateGuard};
use super::gateway::{ApplicantDirectory, ApplicationGateway, JobDirectory, ServiceError};
use super::guard::{Busy, SubmissionGuard, SubmissionKey};
use super::progress::{NoopObserver, SessionObserver};
use super::session::{FailureKind, StepFailure, SubmissionSession, SubmissionStep};

const ALREADY_APPLIED: &str =
    "You have already applied for this position. Please check your applications page.";
const INVALID_JOB: &str = "Invalid job ID.";
const INVALID_SESSION: &str = "Invalid user session. Please login again.";
const JOB_UNAVAILABLE: &str = "Failed to load job details. Please try again.";
const JOB_MISSING: &str = "This job posting could not be found. It may have been removed.";
const JOB_INCOMPLETE: &str = "Job information is incomplete. Please contact support.";
const PROFILE_UNAVAILABLE: &str =
    "Failed to retrieve your profile data. Please ensure your profile is complete.";
const PROFILE_MISSING: &str =
    "Your applicant profile could not be found. Please complete your profile before applying.";
const RESUME_MISSING: &str =
    "No CV found in your profile. Please upload a CV in your profile settings before applying.";
const CREATE_FAILED: &str = "Failed to create application.";
const ANALYSIS_FAILED: &str = "Your application was submitted successfully, but CV analysis failed.";
const ANALYSIS_FAILED_AGAIN: &str = "CV analysis failed again.";

/// Raised when `submit` cannot even start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error(transparent)]
    Busy(#[from] Busy),
}

impl SubmitRejected {
    pub const fn kind(&self) -> FailureKind {
        match self {
            SubmitRejected::Busy(_) => FailureKind::Busy,
        }
    }
}

/// Misuse of the retry entry point. Distinct from business failures, which live on the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("session for {key} is not retryable (step {step:?})")]
    NotRetryable {
        key: SubmissionKey,
        step: SubmissionStep,
    },
    #[error("no submission session recorded for {key}")]
    NoSession { key: SubmissionKey },
    #[error(transparent)]
    Busy(#[from] Busy),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisAttempt {
    First,
    Retry,
}

impl AnalysisAttempt {
    fn failure(self, error: &ServiceError) -> StepFailure {
        let (prefix, fallback) = match self {
            AnalysisAttempt::First => (
                ANALYSIS_FAILED,
                "You can retry the analysis or check your application later.",
            ),
            AnalysisAttempt::Retry => (
                ANALYSIS_FAILED_AGAIN,
                "Please check your application later in the applications page.",
            ),
        };
        StepFailure::retryable(format!(
            "{prefix} {}",
            error.detail().unwrap_or(fallback)
        ))
    }
}

/// State machine sequencing duplicate check, job lookup, profile lookup, creation and analysis.
pub struct SubmissionOrchestrator<J, P, G> {
    jobs: Arc<J>,
    applicants: Arc<P>,
    applications: Arc<G>,
    duplicates: DuplicateGuard,
    in_flight: SubmissionGuard,
}

impl<J, P, G> SubmissionOrchestrator<J, P, G>
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    /// The applied set is only read here; inserting confirmed submissions is the caller's job.
    pub fn new(jobs: Arc<J>, applicants: Arc<P>, applications: Arc<G>, applied: AppliedSet) -> Self {
        Self {
            jobs,
            applicants,
            applications,
            duplicates: DuplicateGuard::new(applied),
            in_flight: SubmissionGuard::new(),
        }
    }

    pub fn duplicate_guard(&self) -> &DuplicateGuard {
        &self.duplicates
    }

    pub fn is_in_flight(&self, key: SubmissionKey) -> bool {
        self.in_flight.is_active(key)
    }

    pub async fn submit(
        &self,
        job_id: JobId,
        applicant_id: ApplicantId,
    ) -> Result<SubmissionSession, SubmitRejected> {
        self.submit_observed(job_id, applicant_id, &NoopObserver)
            .await
    }

    /// Run one full attempt, reporting every transition to `observer`.
    pub async fn submit_observed(
        &self,
        job_id: JobId,
        applicant_id: ApplicantId,
        observer: &dyn SessionObserver,
    ) -> Result<SubmissionSession, SubmitRejected> {
        let key = SubmissionKey::new(applicant_id, job_id);
        let _permit = self.in_flight.try_acquire(key)?;

        info!(%job_id, %applicant_id, "application submission started");
        let mut session = SubmissionSession::new(job_id, applicant_id);
        if let Err(failure) = self.drive(&mut session, observer).await {
            self.settle_failure(&mut session, failure, observer);
        }
        Ok(session)
    }

    pub async fn retry(&self, session: SubmissionSession) -> Result<SubmissionSession, RetryError> {
        self.retry_observed(session, &NoopObserver).await
    }

    /// Re-enter the analysis step for the application already created by `session`.
    pub async fn retry_observed(
        &self,
        mut session: SubmissionSession,
        observer: &dyn SessionObserver,
    ) -> Result<SubmissionSession, RetryError> {
        let key = session.key();
        let retryable = session.step() == SubmissionStep::Error
            && session.retryable()
            && session.pending_application_id().is_some();
        if !retryable {
            return Err(RetryError::NotRetryable {
                key,
                step: session.step(),
            });
        }
        let _permit = self.in_flight.try_acquire(key)?;

        info!(
            job_id = %key.job_id,
            applicant_id = %key.applicant_id,
            application_id = ?session.pending_application_id(),
            "retrying application analysis"
        );
        self.transition(&mut session, SubmissionStep::Analyzing, observer);
        if let Err(failure) = self
            .analyze(&mut session, AnalysisAttempt::Retry, observer)
            .await
        {
            self.settle_failure(&mut session, failure, observer);
        }
        Ok(session)
    }

    async fn drive(
        &self,
        session: &mut SubmissionSession,
        observer: &dyn SessionObserver,
    ) -> Result<(), StepFailure> {
        let job_id = session.job_id();
        let applicant_id = session.applicant_id();

        self.transition(session, SubmissionStep::CheckingDuplicate, observer);
        self.check_duplicate(job_id, applicant_id)?;

        self.transition(session, SubmissionStep::FetchingJob, observer);
        let job = self
            .jobs
            .job(job_id)
            .await
            .map_err(|error| lookup_failure(&error, JOB_MISSING, JOB_UNAVAILABLE))?;
        let employer_id = job
            .employer_id
            .filter(|employer| employer.is_valid())
            .ok_or_else(|| {
                warn!(%job_id, "job record has no owning employer");
                StepFailure::terminal(FailureKind::PreconditionFailed, JOB_INCOMPLETE)
            })?;

        self.transition(session, SubmissionStep::FetchingProfile, observer);
        let profile = self
            .applicants
            .profile(applicant_id)
            .await
            .map_err(|error| lookup_failure(&error, PROFILE_MISSING, PROFILE_UNAVAILABLE))?;
        let resume = profile
            .resume()
            .ok_or_else(|| StepFailure::terminal(FailureKind::PreconditionFailed, RESUME_MISSING))?
            .to_string();

        self.transition(session, SubmissionStep::CreatingApplication, observer);
        let application = self
            .create(applicant_id, job_id, employer_id, resume)
            .await?;

        session.record_application(application.id);
        debug!(
            %job_id,
            application_id = %application.id,
            step = SubmissionStep::Analyzing.label(),
            "application created"
        );
        observer.on_transition(session);

        self.analyze(session, AnalysisAttempt::First, observer).await
    }

    fn check_duplicate(&self, job_id: JobId, applicant_id: ApplicantId) -> Result<(), StepFailure> {
        if !applicant_id.is_valid() {
            return Err(StepFailure::terminal(
                FailureKind::InvalidInput,
                INVALID_SESSION,
            ));
        }
        match self.duplicates.may_apply(applicant_id, job_id) {
            Admission::Allowed => Ok(()),
            Admission::Denied(DenialReason::InvalidInput) => Err(StepFailure::terminal(
                FailureKind::InvalidInput,
                INVALID_JOB,
            )),
            Admission::Denied(DenialReason::AlreadyApplied) => Err(StepFailure::terminal(
                FailureKind::DuplicateApplication,
                ALREADY_APPLIED,
            )),
        }
    }

    async fn create(
        &self,
        applicant_id: ApplicantId,
        job_id: JobId,
        employer_id: EmployerId,
        resume: String,
    ) -> Result<Application, StepFailure> {
        let request = NewApplication::under_review(applicant_id, job_id, employer_id, resume);
        self.applications.create(request).await.map_err(|error| {
            if error.is_conflict() {
                // The applied set may be stale here; reconciling it is left to the next listing refresh.
                StepFailure::terminal(FailureKind::DuplicateApplication, ALREADY_APPLIED)
            } else {
                StepFailure::terminal(
                    FailureKind::ServiceError,
                    format!(
                        "{CREATE_FAILED} {}",
                        error.detail().unwrap_or("Please try again later.")
                    ),
                )
            }
        })
    }

    async fn analyze(
        &self,
        session: &mut SubmissionSession,
        attempt: AnalysisAttempt,
        observer: &dyn SessionObserver,
    ) -> Result<(), StepFailure> {
        let Some(application_id) = session.pending_application_id() else {
            return Err(StepFailure::terminal(
                FailureKind::ServiceError,
                "No pending application to analyze. Please try applying again.",
            ));
        };

        let result = self
            .applications
            .analyze(application_id)
            .await
            .map_err(|error| attempt.failure(&error))?;

        if result.application_id != application_id {
            warn!(
                %application_id,
                returned = %result.application_id,
                "analysis returned a result for another application"
            );
            return Err(attempt.failure(&ServiceError::Decode(format!(
                "analysis result belongs to application {}",
                result.application_id
            ))));
        }

        info!(
            job_id = %session.job_id(),
            %application_id,
            ats_score = result.ats_score,
            status = result.status.display(),
            "application analyzed"
        );
        session.succeed(result);
        observer.on_transition(session);
        Ok(())
    }

    fn transition(
        &self,
        session: &mut SubmissionSession,
        step: SubmissionStep,
        observer: &dyn SessionObserver,
    ) {
        session.enter(step);
        debug!(
            job_id = %session.job_id(),
            applicant_id = %session.applicant_id(),
            step = step.label(),
            "submission step"
        );
        observer.on_transition(session);
    }

    fn settle_failure(
        &self,
        session: &mut SubmissionSession,
        failure: StepFailure,
        observer: &dyn SessionObserver,
    ) {
        warn!(
            job_id = %session.job_id(),
            applicant_id = %session.applicant_id(),
            step = session.step().label(),
            kind = ?failure.kind,
            retryable = failure.retryable,
            "application submission failed"
        );
        session.fail(failure);
        observer.on_transition(session);
    }
}

fn lookup_failure(error: &ServiceError, missing: &str, unavailable: &str) -> StepFailure {
    if error.is_not_found() {
        StepFailure::terminal(FailureKind::NotFound, missing)
    } else {
        StepFailure::terminal(FailureKind::ServiceError, unavailable)
    }
}
