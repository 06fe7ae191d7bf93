use async_trait::async_trait;
use chrono::Utc;
use hirelink::workflows::applications::{
    AnalysisResult, AnalysisStatus, ApplicantDirectory, ApplicantId, ApplicantProfile,
    ApplicantSkill, Application, ApplicationGateway, ApplicationId, ApplicationStatus,
    ApplicationSummary, EmployerId, JobDirectory, JobId, JobOpening, JobStatus, NewApplication,
    ServiceError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Recruitment backend kept entirely in memory, used by the demo command.
pub(crate) struct InMemoryRecruitment {
    jobs: Mutex<HashMap<JobId, JobOpening>>,
    profiles: Mutex<HashMap<ApplicantId, ApplicantProfile>>,
    applications: Mutex<Vec<Application>>,
    next_id: AtomicU64,
    /// Number of upcoming analysis calls that fail with a timeout.
    analysis_outages: AtomicU64,
}

impl Default for InMemoryRecruitment {
    fn default() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            applications: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(501),
            analysis_outages: AtomicU64::new(0),
        }
    }
}

impl InMemoryRecruitment {
    /// Two openings and two applicants, one of them without a CV on file.
    pub(crate) fn seeded() -> Self {
        let backend = Self::default();
        backend.add_job(JobId(42), "Data Analyst", "Acme Analytics", Some(EmployerId(7)));
        backend.add_job(JobId(43), "Backend Engineer", "Globex", Some(EmployerId(7)));
        backend.add_job(JobId(44), "QA Engineer", "Initech", None);
        backend.add_applicant(ApplicantId(9), "Mona Said", "cv-9.pdf");
        backend.add_applicant(ApplicantId(10), "Omar Adel", "");
        backend
    }

    pub(crate) fn add_job(
        &self,
        id: JobId,
        title: &str,
        company: &str,
        employer_id: Option<EmployerId>,
    ) {
        self.jobs.lock().expect("jobs mutex poisoned").insert(
            id,
            JobOpening {
                id,
                title: title.to_string(),
                company_name: company.to_string(),
                status: JobStatus::Active,
                application_deadline: None,
                employer_id,
            },
        );
    }

    pub(crate) fn add_applicant(&self, id: ApplicantId, name: &str, resume: &str) {
        self.profiles.lock().expect("profiles mutex poisoned").insert(
            id,
            ApplicantProfile {
                id,
                full_name: name.to_string(),
                resume_reference: resume.to_string(),
                skill_level: Some("Intermediate".to_string()),
                skills: vec![ApplicantSkill {
                    skill_id: 3,
                    name: "SQL".to_string(),
                    rating: 4,
                }],
            },
        );
    }

    pub(crate) fn fail_next_analyses(&self, count: u64) {
        self.analysis_outages.store(count, Ordering::SeqCst);
    }

    pub(crate) fn application_count(&self) -> usize {
        self.applications
            .lock()
            .expect("applications mutex poisoned")
            .len()
    }
}

#[async_trait]
impl JobDirectory for InMemoryRecruitment {
    async fn job(&self, id: JobId) -> Result<JobOpening, ServiceError> {
        self.jobs
            .lock()
            .expect("jobs mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound { resource: "job" })
    }
}

#[async_trait]
impl ApplicantDirectory for InMemoryRecruitment {
    async fn profile(&self, id: ApplicantId) -> Result<ApplicantProfile, ServiceError> {
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

#[async_trait]
impl ApplicationGateway for InMemoryRecruitment {
    async fn create(&self, request: NewApplication) -> Result<Application, ServiceError> {
        let mut guard = self.applications.lock().expect("applications mutex poisoned");
        let duplicate = guard.iter().any(|existing| {
            existing.applicant_id == request.applicant_id && existing.job_id == request.job_id
        });
        if duplicate {
            return Err(ServiceError::Conflict(
                "Applicant has already applied to this job".to_string(),
            ));
        }
        let application = Application {
            id: ApplicationId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            applicant_id: request.applicant_id,
            job_id: request.job_id,
            employer_id: request.employer_id,
            resume_reference: request.resume_reference,
            status: request.status,
            created_at: Utc::now(),
        };
        guard.push(application.clone());
        Ok(application)
    }

    async fn analyze(&self, id: ApplicationId) -> Result<AnalysisResult, ServiceError> {
        let outage = self
            .analysis_outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if outage {
            return Err(ServiceError::Unavailable(
                "analysis service timed out".to_string(),
            ));
        }
        let known = self
            .applications
            .lock()
            .expect("applications mutex poisoned")
            .iter()
            .any(|application| application.id == id);
        if !known {
            return Err(ServiceError::NotFound {
                resource: "application",
            });
        }
        Ok(AnalysisResult {
            application_id: id,
            ats_score: 82,
            status: AnalysisStatus::AtsPassed,
            feedback: "Solid SQL experience; dashboards would strengthen the profile.".to_string(),
            skills_found: vec!["SQL".to_string(), "Excel".to_string()],
            skill_gaps: vec!["Power BI".to_string()],
        })
    }

    async fn list(&self, applicant: ApplicantId) -> Result<Vec<ApplicationSummary>, ServiceError> {
        let jobs = self.jobs.lock().expect("jobs mutex poisoned").clone();
        Ok(self
            .applications
            .lock()
            .expect("applications mutex poisoned")
            .iter()
            .filter(|application| application.applicant_id == applicant)
            .map(|application| {
                let job = jobs.get(&application.job_id);
                ApplicationSummary {
                    application_id: application.id,
                    job_id: application.job_id,
                    job_title: job.map(|job| job.title.clone()).unwrap_or_default(),
                    company_name: job.map(|job| job.company_name.clone()).unwrap_or_default(),
                    status: ApplicationStatus::UnderReview,
                    ats_score: None,
                    applied_at: Some(application.created_at),
                }
            })
            .collect())
    }
}
