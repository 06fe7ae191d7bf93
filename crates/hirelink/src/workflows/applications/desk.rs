use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use super::applied::AppliedSet;
use super::domain::{ApplicantId, JobId};
use super::gateway::{ApplicantDirectory, ApplicationGateway, JobDirectory, ServiceError};
use super::guard::{Busy, SubmissionKey};
use super::orchestrator::{RetryError, SubmissionOrchestrator, SubmitRejected};
use super::progress::{report, NoopObserver, ProgressReport, SessionObserver};
use super::session::SubmissionSession;

/// Single entry point shared by every screen that can start an application.
///
/// Owns the applied-set cache, records confirmed submissions into it and remembers the latest
/// session per `(applicant, job)` so a later retry or status poll can find it.
pub struct ApplicationDesk<J, P, G> {
    orchestrator: SubmissionOrchestrator<J, P, G>,
    applications: Arc<G>,
    applied: AppliedSet,
    sessions: Mutex<HashMap<SubmissionKey, SubmissionSession>>,
}

impl<J, P, G> ApplicationDesk<J, P, G>
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    pub fn new(jobs: Arc<J>, applicants: Arc<P>, applications: Arc<G>) -> Self {
        Self::with_applied(jobs, applicants, applications, AppliedSet::new())
    }

    pub fn with_applied(
        jobs: Arc<J>,
        applicants: Arc<P>,
        applications: Arc<G>,
        applied: AppliedSet,
    ) -> Self {
        let orchestrator = SubmissionOrchestrator::new(
            jobs,
            applicants,
            Arc::clone(&applications),
            applied.clone(),
        );
        Self {
            orchestrator,
            applications,
            applied,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn applied(&self) -> &AppliedSet {
        &self.applied
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator<J, P, G> {
        &self.orchestrator
    }

    /// Re-read the applicant's existing applications into the applied set.
    pub async fn refresh_applied(&self, applicant_id: ApplicantId) -> Result<usize, ServiceError> {
        self.applied
            .hydrate(&*self.applications, applicant_id)
            .await
    }

    pub async fn apply(
        &self,
        job_id: JobId,
        applicant_id: ApplicantId,
    ) -> Result<SubmissionSession, SubmitRejected> {
        self.apply_observed(job_id, applicant_id, &NoopObserver)
            .await
    }

    pub async fn apply_observed(
        &self,
        job_id: JobId,
        applicant_id: ApplicantId,
        observer: &dyn SessionObserver,
    ) -> Result<SubmissionSession, SubmitRejected> {
        let recording = Recording {
            sessions: &self.sessions,
            inner: observer,
        };
        let session = self
            .orchestrator
            .submit_observed(job_id, applicant_id, &recording)
            .await?;
        self.settle(&session);
        Ok(session)
    }

    /// Retry the analysis step of the latest session recorded for `key`.
    pub async fn retry(&self, key: SubmissionKey) -> Result<SubmissionSession, RetryError> {
        self.retry_observed(key, &NoopObserver).await
    }

    pub async fn retry_observed(
        &self,
        key: SubmissionKey,
        observer: &dyn SessionObserver,
    ) -> Result<SubmissionSession, RetryError> {
        let previous = self.session(key).ok_or(RetryError::NoSession { key })?;
        let recording = Recording {
            sessions: &self.sessions,
            inner: observer,
        };
        let session = self
            .orchestrator
            .retry_observed(previous, &recording)
            .await?;
        self.settle(&session);
        Ok(session)
    }

    pub fn session(&self, key: SubmissionKey) -> Option<SubmissionSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    pub fn report(&self, key: SubmissionKey) -> Option<ProgressReport> {
        self.session(key).as_ref().map(report)
    }

    /// Forget the session. An application that was already created stays on the server.
    ///
    /// A running submission keeps publishing transitions, so it cannot be forgotten until it
    /// settles.
    pub fn abandon(&self, key: SubmissionKey) -> Result<Option<SubmissionSession>, Busy> {
        if self.orchestrator.is_in_flight(key) {
            return Err(Busy { key });
        }
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        if removed.is_some() {
            info!(%key, "submission session abandoned");
        }
        Ok(removed)
    }

    /// Number of sessions currently remembered.
    pub fn tracked_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn settle(&self, session: &SubmissionSession) {
        let recorded = session.is_success()
            && self
                .applied
                .insert(session.applicant_id(), session.job_id());
        if recorded {
            info!(
                job_id = %session.job_id(),
                applicant_id = %session.applicant_id(),
                "job recorded as applied"
            );
        }
    }
}

/// Keeps the desk's copy of a session current while it runs, then forwards to the caller.
struct Recording<'a> {
    sessions: &'a Mutex<HashMap<SubmissionKey, SubmissionSession>>,
    inner: &'a dyn SessionObserver,
}

impl SessionObserver for Recording<'_> {
    fn on_transition(&self, session: &SubmissionSession) {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.key(), session.clone());
        self.inner.on_transition(session);
    }
}
