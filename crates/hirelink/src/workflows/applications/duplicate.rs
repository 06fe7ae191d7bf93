use serde::Serialize;

use super::applied::AppliedSet;
use super::domain::{ApplicantId, JobId};

/// Why the duplicate guard refused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    InvalidInput,
    AlreadyApplied,
}

/// Outcome of the client-local duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "reason")]
pub enum Admission {
    Allowed,
    Denied(DenialReason),
}

impl Admission {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Optimistic duplicate check against the applied-set cache.
///
/// The creation service remains the authority; a stale cache only means the conflict surfaces
/// one step later.
#[derive(Debug, Clone)]
pub struct DuplicateGuard {
    applied: AppliedSet,
}

impl DuplicateGuard {
    pub fn new(applied: AppliedSet) -> Self {
        Self { applied }
    }

    pub fn may_apply(&self, applicant: ApplicantId, job_id: JobId) -> Admission {
        if !job_id.is_valid() || !applicant.is_valid() {
            return Admission::Denied(DenialReason::InvalidInput);
        }
        if self.applied.contains(applicant, job_id) {
            return Admission::Denied(DenialReason::AlreadyApplied);
        }
        Admission::Allowed
    }
}
