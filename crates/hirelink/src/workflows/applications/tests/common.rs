use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::applications::{
    AnalysisResult, AnalysisStatus, ApplicantDirectory, ApplicantId, ApplicantProfile,
    ApplicantSkill, Application, ApplicationDesk, ApplicationGateway, ApplicationId,
    ApplicationStatus, ApplicationSummary, AppliedSet, EmployerId, JobDirectory, JobId,
    JobOpening, JobStatus, NewApplication, ServiceError, SessionObserver, SubmissionOrchestrator,
    SubmissionSession, SubmissionStep,
};

pub(super) const JOB: JobId = JobId(42);
pub(super) const APPLICANT: ApplicantId = ApplicantId(9);
pub(super) const EMPLOYER: EmployerId = EmployerId(7);
pub(super) const FIRST_APPLICATION: ApplicationId = ApplicationId(501);

pub(super) type TestOrchestrator = SubmissionOrchestrator<FakeJobs, FakeApplicants, FakeApplications>;
pub(super) type TestDesk = ApplicationDesk<FakeJobs, FakeApplicants, FakeApplications>;

pub(super) fn job_opening(id: JobId, employer: Option<EmployerId>) -> JobOpening {
    JobOpening {
        id,
        title: "Data Analyst".to_string(),
        company_name: "Acme Analytics".to_string(),
        status: JobStatus::Active,
        application_deadline: Utc.with_ymd_and_hms(2030, 1, 31, 0, 0, 0).single(),
        employer_id: employer,
    }
}

pub(super) fn profile(id: ApplicantId, resume: &str) -> ApplicantProfile {
    ApplicantProfile {
        id,
        full_name: "Mona Said".to_string(),
        resume_reference: resume.to_string(),
        skill_level: Some("Intermediate".to_string()),
        skills: vec![ApplicantSkill {
            skill_id: 3,
            name: "SQL".to_string(),
            rating: 4,
        }],
    }
}

pub(super) fn analysis(id: ApplicationId) -> AnalysisResult {
    AnalysisResult {
        application_id: id,
        ats_score: 82,
        status: AnalysisStatus::AtsPassed,
        feedback: "Strong SQL background.".to_string(),
        skills_found: vec!["SQL".to_string()],
        skill_gaps: vec!["Power BI".to_string()],
    }
}

pub(super) fn summary(application: u64, job: JobId) -> ApplicationSummary {
    ApplicationSummary {
        application_id: ApplicationId(application),
        job_id: job,
        job_title: "Data Analyst".to_string(),
        company_name: "Acme Analytics".to_string(),
        status: ApplicationStatus::UnderReview,
        ats_score: Some(70),
        applied_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single(),
    }
}

/// Fakes seeded with job 42 (employer 7) and applicant 9 holding `cv-9.pdf`.
#[derive(Clone)]
pub(super) struct Harness {
    pub(super) jobs: Arc<FakeJobs>,
    pub(super) applicants: Arc<FakeApplicants>,
    pub(super) applications: Arc<FakeApplications>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let jobs = FakeJobs::default();
        jobs.put(job_opening(JOB, Some(EMPLOYER)));
        let applicants = FakeApplicants::default();
        applicants.put(profile(APPLICANT, "cv-9.pdf"));
        Self {
            jobs: Arc::new(jobs),
            applicants: Arc::new(applicants),
            applications: Arc::new(FakeApplications::default()),
        }
    }

    pub(super) fn orchestrator(&self, applied: AppliedSet) -> TestOrchestrator {
        SubmissionOrchestrator::new(
            self.jobs.clone(),
            self.applicants.clone(),
            self.applications.clone(),
            applied,
        )
    }

    pub(super) fn desk(&self) -> TestDesk {
        ApplicationDesk::new(
            self.jobs.clone(),
            self.applicants.clone(),
            self.applications.clone(),
        )
    }
}

#[derive(Default)]
pub(super) struct FakeJobs {
    jobs: Mutex<HashMap<JobId, JobOpening>>,
    failure: Mutex<Option<ServiceError>>,
    gate: Mutex<Option<Gate>>,
    pub(super) calls: AtomicUsize,
}

/// Holds a lookup open until the test releases it.
#[derive(Clone, Default)]
pub(super) struct Gate {
    pub(super) entered: Arc<Notify>,
    pub(super) release: Arc<Notify>,
}

impl FakeJobs {
    pub(super) fn put(&self, job: JobOpening) {
        self.jobs
            .lock()
            .expect("jobs mutex poisoned")
            .insert(job.id, job);
    }

    pub(super) fn fail_with(&self, error: ServiceError) {
        *self.failure.lock().expect("jobs mutex poisoned") = Some(error);
    }

    pub(super) fn gate(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock().expect("jobs mutex poisoned") = Some(gate.clone());
        gate
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobDirectory for FakeJobs {
    async fn job(&self, id: JobId) -> Result<JobOpening, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().expect("jobs mutex poisoned").take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(error) = self.failure.lock().expect("jobs mutex poisoned").clone() {
            return Err(error);
        }
        self.jobs
            .lock()
            .expect("jobs mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound { resource: "job" })
    }
}

#[derive(Default)]
pub(super) struct FakeApplicants {
    profiles: Mutex<HashMap<ApplicantId, ApplicantProfile>>,
    failure: Mutex<Option<ServiceError>>,
    pub(super) calls: AtomicUsize,
}

impl FakeApplicants {
    pub(super) fn put(&self, profile: ApplicantProfile) {
        self.profiles
            .lock()
            .expect("profiles mutex poisoned")
            .insert(profile.id, profile);
    }

    pub(super) fn fail_with(&self, error: ServiceError) {
        *self.failure.lock().expect("profiles mutex poisoned") = Some(error);
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApplicantDirectory for FakeApplicants {
    async fn profile(&self, id: ApplicantId) -> Result<ApplicantProfile, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().expect("profiles mutex poisoned").clone() {
            return Err(error);
        }
        self.profiles
            .lock()
            .expect("profiles mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound {
                resource: "applicant",
            })
    }
}

pub(super) struct FakeApplications {
    next_id: AtomicU64,
    create_failure: Mutex<Option<ServiceError>>,
    analysis_failures: Mutex<VecDeque<ServiceError>>,
    analysis_override: Mutex<Option<AnalysisResult>>,
    listing: Mutex<Result<Vec<ApplicationSummary>, ServiceError>>,
    pub(super) created: Mutex<Vec<NewApplication>>,
    pub(super) analyzed: Mutex<Vec<ApplicationId>>,
}

impl Default for FakeApplications {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(FIRST_APPLICATION.0),
            create_failure: Mutex::new(None),
            analysis_failures: Mutex::new(VecDeque::new()),
            analysis_override: Mutex::new(None),
            listing: Mutex::new(Ok(Vec::new())),
            created: Mutex::new(Vec::new()),
            analyzed: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApplications {
    pub(super) fn fail_create(&self, error: ServiceError) {
        *self.create_failure.lock().expect("applications mutex poisoned") = Some(error);
    }

    /// Queue failures consumed by the next analysis calls, in order.
    pub(super) fn fail_analysis(&self, error: ServiceError) {
        self.analysis_failures
            .lock()
            .expect("applications mutex poisoned")
            .push_back(error);
    }

    pub(super) fn answer_analysis_with(&self, result: AnalysisResult) {
        *self
            .analysis_override
            .lock()
            .expect("applications mutex poisoned") = Some(result);
    }

    pub(super) fn set_listing(&self, listing: Result<Vec<ApplicationSummary>, ServiceError>) {
        *self.listing.lock().expect("applications mutex poisoned") = listing;
    }

    pub(super) fn created(&self) -> Vec<NewApplication> {
        self.created
            .lock()
            .expect("applications mutex poisoned")
            .clone()
    }

    pub(super) fn analyzed(&self) -> Vec<ApplicationId> {
        self.analyzed
            .lock()
            .expect("applications mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl ApplicationGateway for FakeApplications {
    async fn create(&self, request: NewApplication) -> Result<Application, ServiceError> {
        self.created
            .lock()
            .expect("applications mutex poisoned")
            .push(request.clone());
        if let Some(error) = self
            .create_failure
            .lock()
            .expect("applications mutex poisoned")
            .clone()
        {
            return Err(error);
        }
        Ok(Application {
            id: ApplicationId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            applicant_id: request.applicant_id,
            job_id: request.job_id,
            employer_id: request.employer_id,
            resume_reference: request.resume_reference,
            status: request.status,
            created_at: Utc::now(),
        })
    }

    async fn analyze(&self, id: ApplicationId) -> Result<AnalysisResult, ServiceError> {
        self.analyzed
            .lock()
            .expect("applications mutex poisoned")
            .push(id);
        if let Some(error) = self
            .analysis_failures
            .lock()
            .expect("applications mutex poisoned")
            .pop_front()
        {
            return Err(error);
        }
        if let Some(result) = self
            .analysis_override
            .lock()
            .expect("applications mutex poisoned")
            .clone()
        {
            return Ok(result);
        }
        Ok(analysis(id))
    }

    async fn list(&self, _applicant: ApplicantId) -> Result<Vec<ApplicationSummary>, ServiceError> {
        self.listing
            .lock()
            .expect("applications mutex poisoned")
            .clone()
    }
}

/// Collects the step of every snapshot it sees.
#[derive(Default)]
pub(super) struct StepLog {
    steps: Mutex<Vec<SubmissionStep>>,
}

impl StepLog {
    pub(super) fn steps(&self) -> Vec<SubmissionStep> {
        self.steps.lock().expect("step log mutex poisoned").clone()
    }
}

impl SessionObserver for StepLog {
    fn on_transition(&self, session: &SubmissionSession) {
        self.steps
            .lock()
            .expect("step log mutex poisoned")
            .push(session.step());
    }
}

pub(super) fn transient_failure() -> ServiceError {
    ServiceError::Server {
        status: 503,
        message: "analysis engine warming up".to_string(),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
