//! camelCase payloads exchanged with the recruitment backend.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{Credentials, RefreshError};
use crate::workflows::applications::{
    AnalysisResult, AnalysisStatus, ApplicantId, ApplicantProfile, ApplicantSkill, Application,
    ApplicationId, ApplicationStatus, ApplicationSummary, EmployerId, JobId, JobOpening, JobStatus,
    NewApplication, ServiceError,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobDto {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    job_status: Option<JobStatus>,
    #[serde(default)]
    application_deadline: Option<String>,
    #[serde(default)]
    hr_id: Option<u64>,
}

impl From<JobDto> for JobOpening {
    fn from(dto: JobDto) -> Self {
        Self {
            id: JobId(dto.id),
            title: dto.title.unwrap_or_default(),
            company_name: dto.company_name.unwrap_or_default(),
            status: dto.job_status.unwrap_or_default(),
            application_deadline: dto.application_deadline.as_deref().and_then(parse_timestamp),
            employer_id: dto.hr_id.map(EmployerId),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplicantDto {
    id: u64,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    resume_url: Option<String>,
    #[serde(default)]
    skill_level: Option<Value>,
    #[serde(default)]
    applicant_skills: Option<Vec<SkillDto>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkillDto {
    skill_id: u64,
    #[serde(default)]
    skill_name: Option<String>,
    #[serde(default)]
    skill_rate: Option<u32>,
}

impl From<ApplicantDto> for ApplicantProfile {
    fn from(dto: ApplicantDto) -> Self {
        let skill_level = match dto.skill_level {
            Some(Value::String(level)) => Some(level),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Self {
            id: ApplicantId(dto.id),
            full_name: dto.full_name.unwrap_or_default(),
            resume_reference: dto.resume_url.unwrap_or_default(),
            skill_level,
            skills: dto
                .applicant_skills
                .unwrap_or_default()
                .into_iter()
                .map(|skill| ApplicantSkill {
                    skill_id: skill.skill_id,
                    name: skill.skill_name.unwrap_or_default(),
                    rating: skill.skill_rate.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateApplicationDto<'a> {
    applicant_id: u64,
    job_id: u64,
    hr_id: u64,
    cv_file_path: &'a str,
    application_status: &'static str,
}

impl<'a> From<&'a NewApplication> for CreateApplicationDto<'a> {
    fn from(request: &'a NewApplication) -> Self {
        Self {
            applicant_id: request.applicant_id.0,
            job_id: request.job_id.0,
            hr_id: request.employer_id.0,
            cv_file_path: &request.resume_reference,
            application_status: request.status.as_wire(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplicationDto {
    id: u64,
    #[serde(default)]
    application_status: Option<String>,
    #[serde(default)]
    date_applied: Option<String>,
    #[serde(default)]
    cv_file_path: Option<String>,
    #[serde(default)]
    hr_id: Option<u64>,
    #[serde(default)]
    applicant_id: Option<u64>,
    #[serde(default)]
    job_id: Option<u64>,
}

impl ApplicationDto {
    /// Fields the backend leaves out are taken from the request that created the record.
    ///
    /// A record without a usable id cannot be analyzed, so it is rejected as undecodable.
    pub(crate) fn into_application(
        self,
        request: &NewApplication,
    ) -> Result<Application, ServiceError> {
        let id = ApplicationId(self.id);
        if !id.is_valid() {
            return Err(ServiceError::Decode(
                "application response carried no id".to_string(),
            ));
        }
        Ok(Application {
            id,
            applicant_id: self
                .applicant_id
                .map(ApplicantId)
                .unwrap_or(request.applicant_id),
            job_id: self.job_id.map(JobId).unwrap_or(request.job_id),
            employer_id: self.hr_id.map(EmployerId).unwrap_or(request.employer_id),
            resume_reference: self
                .cv_file_path
                .unwrap_or_else(|| request.resume_reference.clone()),
            status: self
                .application_status
                .as_deref()
                .map(ApplicationStatus::from_wire)
                .unwrap_or(request.status),
            created_at: self
                .date_applied
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalysisDto {
    #[serde(default)]
    application_id: Option<u64>,
    #[serde(default)]
    ats_score: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    skills_found: Option<Vec<String>>,
    #[serde(default)]
    skills_gaps: Option<Vec<String>>,
}

impl AnalysisDto {
    pub(crate) fn into_result(self, requested: ApplicationId) -> AnalysisResult {
        AnalysisResult {
            application_id: self.application_id.map(ApplicationId).unwrap_or(requested),
            ats_score: self.ats_score.map(clamp_score).unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .map(AnalysisStatus::from_wire)
                .unwrap_or(AnalysisStatus::UnderReview),
            feedback: self.feedback.unwrap_or_default(),
            skills_found: self.skills_found.unwrap_or_default(),
            skill_gaps: self.skills_gaps.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryDto {
    application_id: u64,
    job_id: u64,
    #[serde(default)]
    job_title: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    applied_at: Option<String>,
    #[serde(default)]
    ats_score: Option<f64>,
    #[serde(default)]
    application_status: Option<String>,
}

impl From<SummaryDto> for ApplicationSummary {
    fn from(dto: SummaryDto) -> Self {
        Self {
            application_id: ApplicationId(dto.application_id),
            job_id: JobId(dto.job_id),
            job_title: dto.job_title.unwrap_or_default(),
            company_name: dto.company_name.unwrap_or_default(),
            status: dto
                .application_status
                .as_deref()
                .map(ApplicationStatus::from_wire)
                .unwrap_or(ApplicationStatus::Unknown),
            ats_score: dto.ats_score.map(clamp_score),
            applied_at: dto.applied_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequestDto<'a> {
    access_token: &'a str,
    refresh_token: &'a str,
}

impl<'a> RefreshRequestDto<'a> {
    pub(crate) fn new(access_token: &'a str, refresh_token: &'a str) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponseDto {
    #[serde(default)]
    is_authenticated: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RefreshResponseDto {
    pub(crate) fn into_credentials(self, stale: &Credentials) -> Result<Credentials, RefreshError> {
        match self.token.filter(|token| !token.trim().is_empty()) {
            Some(access_token) if self.is_authenticated => Ok(Credentials {
                access_token,
                refresh_token: self.refresh_token.or_else(|| stale.refresh_token.clone()),
            }),
            _ => Err(RefreshError::Rejected(
                self.message
                    .unwrap_or_else(|| "session could not be renewed".to_string()),
            )),
        }
    }
}

/// The backend emits RFC 3339 stamps, or naive ones that are implicitly UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|stamp| stamp.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn clamp_score(raw: f64) -> u8 {
    if raw.is_finite() {
        raw.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

/// `message` field of a JSON error body, or the body itself.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
