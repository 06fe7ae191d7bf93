use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a published job opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

/// Identifier of the applicant submitting the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u64);

/// Identifier assigned by the creation service to a stored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

/// Identifier of the HR account that owns a job opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployerId(pub u64);

impl JobId {
    /// Zero is what the backend hands out for "no job"; it never names a real opening.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl ApplicantId {
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl EmployerId {
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl ApplicationId {
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EmployerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when a path or form value cannot be turned into an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{raw}' is not a valid identifier")]
pub struct InvalidId {
    pub raw: String,
}

fn parse_id(raw: &str) -> Result<u64, InvalidId> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value != 0)
        .ok_or_else(|| InvalidId {
            raw: raw.to_string(),
        })
}

impl FromStr for JobId {
    type Err = InvalidId;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_id(raw).map(JobId)
    }
}

impl FromStr for ApplicantId {
    type Err = InvalidId;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_id(raw).map(ApplicantId)
    }
}

/// Publication state of a job opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    Active,
    Closed,
    #[default]
    #[serde(other)]
    NotSet,
}

/// Job record as read from the job lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOpening {
    pub id: JobId,
    pub title: String,
    pub company_name: String,
    pub status: JobStatus,
    pub application_deadline: Option<DateTime<Utc>>,
    /// Owning HR account. Missing values indicate broken upstream data.
    pub employer_id: Option<EmployerId>,
}

/// Skill entry attached to an applicant profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSkill {
    pub skill_id: u64,
    pub name: String,
    pub rating: u32,
}

/// Applicant record as read from the profile lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub id: ApplicantId,
    pub full_name: String,
    /// Reference to the stored CV file; blank when no CV was uploaded.
    pub resume_reference: String,
    pub skill_level: Option<String>,
    pub skills: Vec<ApplicantSkill>,
}

impl ApplicantProfile {
    pub fn resume(&self) -> Option<&str> {
        let trimmed = self.resume_reference.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Lifecycle status of a stored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    UnderReview,
    #[serde(rename = "ATSPassed")]
    AtsPassed,
    Rejected,
    ExamSent,
    Completed,
    #[serde(other)]
    Unknown,
}

impl ApplicationStatus {
    /// Wire spelling expected by the creation service.
    pub const fn as_wire(self) -> &'static str {
        match self {
            ApplicationStatus::UnderReview => "UnderReview",
            ApplicationStatus::AtsPassed => "ATSPassed",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::ExamSent => "ExamSent",
            ApplicationStatus::Completed => "Completed",
            ApplicationStatus::Unknown => "Unknown",
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "UnderReview" => ApplicationStatus::UnderReview,
            "ATSPassed" => ApplicationStatus::AtsPassed,
            "Rejected" => ApplicationStatus::Rejected,
            "ExamSent" => ApplicationStatus::ExamSent,
            "Completed" => ApplicationStatus::Completed,
            _ => ApplicationStatus::Unknown,
        }
    }
}

/// Payload for the creation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub applicant_id: ApplicantId,
    pub job_id: JobId,
    pub employer_id: EmployerId,
    pub resume_reference: String,
    pub status: ApplicationStatus,
}

impl NewApplication {
    /// Every fresh submission starts out under review.
    pub fn under_review(
        applicant_id: ApplicantId,
        job_id: JobId,
        employer_id: EmployerId,
        resume_reference: impl Into<String>,
    ) -> Self {
        Self {
            applicant_id,
            job_id,
            employer_id,
            resume_reference: resume_reference.into(),
            status: ApplicationStatus::UnderReview,
        }
    }
}

/// Application record returned by the creation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub job_id: JobId,
    pub employer_id: EmployerId,
    pub resume_reference: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Row of the applicant's existing-applications listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub job_title: String,
    pub company_name: String,
    pub status: ApplicationStatus,
    pub ats_score: Option<u8>,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Verdict reached by the CV analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    #[serde(rename = "ATSPassed")]
    AtsPassed,
    Rejected,
    #[serde(other)]
    UnderReview,
}

impl AnalysisStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "ATSPassed" => AnalysisStatus::AtsPassed,
            "Rejected" => AnalysisStatus::Rejected,
            _ => AnalysisStatus::UnderReview,
        }
    }

    pub const fn display(self) -> &'static str {
        match self {
            AnalysisStatus::AtsPassed => "ATS Passed",
            AnalysisStatus::Rejected => "Not Qualified",
            AnalysisStatus::UnderReview => "Under Review",
        }
    }
}

/// Scoring produced for one application. Never regenerated for a new id on retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub application_id: ApplicationId,
    /// ATS score, 0-100.
    pub ats_score: u8,
    pub status: AnalysisStatus,
    pub feedback: String,
    pub skills_found: Vec<String>,
    pub skill_gaps: Vec<String>,
}
