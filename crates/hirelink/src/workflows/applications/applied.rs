use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::domain::{ApplicantId, JobId};
use super::gateway::{ApplicationGateway, ServiceError};

/// Job ids each applicant has already applied to.
///
/// Append-only from the workflow's point of view: entries are added after a confirmed
/// submission or a listing refresh and are never removed here. One applicant's entries never
/// affect another applicant's checks.
#[derive(Debug, Clone, Default)]
pub struct AppliedSet {
    jobs: Arc<RwLock<HashMap<ApplicantId, HashSet<JobId>>>>,
}

impl AppliedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, applicant: ApplicantId, job_id: JobId) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&applicant)
            .is_some_and(|jobs| jobs.contains(&job_id))
    }

    /// Returns `true` when the job was not yet present for the applicant.
    pub fn insert(&self, applicant: ApplicantId, job_id: JobId) -> bool {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(applicant)
            .or_default()
            .insert(job_id)
    }

    /// Adds every id for the applicant, returning how many were new.
    pub fn extend<I>(&self, applicant: ApplicantId, job_ids: I) -> usize
    where
        I: IntoIterator<Item = JobId>,
    {
        let mut guard = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let jobs = guard.entry(applicant).or_default();
        job_ids
            .into_iter()
            .filter(|job_id| jobs.insert(*job_id))
            .count()
    }

    /// Number of `(applicant, job)` entries across all applicants.
    pub fn len(&self) -> usize {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(HashSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the applicant's entries.
    pub fn snapshot(&self, applicant: ApplicantId) -> Vec<JobId> {
        let mut jobs: Vec<JobId> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&applicant)
            .map(|jobs| jobs.iter().copied().collect())
            .unwrap_or_default();
        jobs.sort();
        jobs
    }

    /// Populate the set from the applicant's existing applications.
    pub async fn hydrate<G>(&self, gateway: &G, applicant: ApplicantId) -> Result<usize, ServiceError>
    where
        G: ApplicationGateway + ?Sized,
    {
        let applications = gateway.list(applicant).await?;
        let added = self.extend(applicant, applications.iter().map(|summary| summary.job_id));
        debug!(
            applicant_id = %applicant,
            listed = applications.len(),
            added,
            "applied set hydrated"
        );
        Ok(added)
    }
}
