use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use super::domain::{ApplicantId, JobId};

/// The pair a submission is serialized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubmissionKey {
    pub applicant_id: ApplicantId,
    pub job_id: JobId,
}

impl SubmissionKey {
    pub const fn new(applicant_id: ApplicantId, job_id: JobId) -> Self {
        Self {
            applicant_id,
            job_id,
        }
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {} by applicant {}", self.job_id, self.applicant_id)
    }
}

/// Rejection returned while another submission for the same pair is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a submission for {key} is already in progress")]
pub struct Busy {
    pub key: SubmissionKey,
}

/// Admits at most one in-flight orchestration per `(applicant, job)` pair.
#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard {
    in_flight: Arc<Mutex<HashSet<SubmissionKey>>>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: SubmissionKey) -> Result<InFlightPermit, Busy> {
        let mut guard = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !guard.insert(key) {
            return Err(Busy { key });
        }
        Ok(InFlightPermit {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_active(&self, key: SubmissionKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }
}

/// Releases the pair when dropped, including when the submitting future is abandoned.
#[derive(Debug)]
pub struct InFlightPermit {
    key: SubmissionKey,
    in_flight: Arc<Mutex<HashSet<SubmissionKey>>>,
}

impl InFlightPermit {
    pub fn key(&self) -> SubmissionKey {
        self.key
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
