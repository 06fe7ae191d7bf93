use serde::Serialize;
use tokio::sync::watch;

use super::session::{FailureKind, SubmissionSession, SubmissionStep};

/// Coarse phases shown to the applicant while a submission runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Checking,
    Fetching,
    Creating,
    Analyzing,
    Success,
    Error,
}

impl Phase {
    const CHECKLIST: [Phase; 4] = [
        Phase::Checking,
        Phase::Fetching,
        Phase::Creating,
        Phase::Analyzing,
    ];

    pub const fn from_step(step: SubmissionStep) -> Self {
        match step {
            SubmissionStep::Idle => Phase::Idle,
            SubmissionStep::CheckingDuplicate | SubmissionStep::FetchingJob => Phase::Checking,
            SubmissionStep::FetchingProfile => Phase::Fetching,
            SubmissionStep::CreatingApplication => Phase::Creating,
            SubmissionStep::Analyzing => Phase::Analyzing,
            SubmissionStep::Success => Phase::Success,
            SubmissionStep::Error => Phase::Error,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Ready to Apply",
            Phase::Checking => "Checking Application Status",
            Phase::Fetching => "Retrieving Your Profile",
            Phase::Creating => "Creating Application",
            Phase::Analyzing => "AI CV Analysis",
            Phase::Success => "Application Submitted Successfully",
            Phase::Error => "Application Error",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Phase::Checking => "Verifying if you've already applied...",
            Phase::Fetching => "Loading your CV and profile information...",
            Phase::Creating => "Submitting your application to the company...",
            Phase::Analyzing => "Analyzing your CV with AI technology...",
            Phase::Idle | Phase::Success | Phase::Error => "",
        }
    }

    fn checklist_index(self) -> Option<usize> {
        Self::CHECKLIST.iter().position(|phase| *phase == self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Active,
    Completed,
    Failed,
}

/// One row of the progress checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub phase: Phase,
    pub title: &'static str,
    pub description: &'static str,
    pub state: StepState,
}

/// Read-only projection of a session for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub phase: Phase,
    pub phase_label: &'static str,
    pub header_title: &'static str,
    pub is_terminal: bool,
    pub can_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_title: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ats_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_display: Option<&'static str>,
    pub steps: Vec<StepView>,
}

/// Project a session into its presentation form. Total over every step.
pub fn report(session: &SubmissionSession) -> ProgressReport {
    let phase = Phase::from_step(session.step());
    let can_retry = session.step() == SubmissionStep::Error
        && session.retryable()
        && session.pending_application_id().is_some();

    let header_title = match phase {
        Phase::Success => "Application Successful",
        Phase::Error => "Application Error",
        _ => "Processing Your Application",
    };

    let error_title = session
        .failure()
        .map(|kind| error_title(kind, session.failed_step()));

    ProgressReport {
        phase,
        phase_label: phase.label(),
        header_title,
        is_terminal: session.step().is_terminal(),
        can_retry,
        error_title,
        error_message: session.error_message().map(str::to_string),
        ats_score: session.result().map(|result| result.ats_score),
        status_display: session.result().map(|result| result.status.display()),
        steps: checklist(session),
    }
}

fn error_title(kind: FailureKind, failed_step: Option<SubmissionStep>) -> &'static str {
    match (kind, failed_step) {
        (FailureKind::DuplicateApplication, _) => "Already Applied",
        (FailureKind::InvalidInput, _) => "Invalid Request",
        (FailureKind::Busy, _) => "Please Wait",
        (_, Some(SubmissionStep::FetchingProfile)) => "Profile Error",
        (_, Some(SubmissionStep::Analyzing)) => "CV Analysis Error",
        _ => "Application Error",
    }
}

fn checklist(session: &SubmissionSession) -> Vec<StepView> {
    let current = Phase::from_step(session.step());
    let failed_at = session
        .failed_step()
        .map(Phase::from_step)
        .and_then(Phase::checklist_index);
    let active_at = current.checklist_index();

    Phase::CHECKLIST
        .iter()
        .enumerate()
        .map(|(index, phase)| {
            let state = match current {
                Phase::Success => StepState::Completed,
                Phase::Error => match failed_at {
                    Some(failed) if index < failed => StepState::Completed,
                    Some(failed) if index == failed => StepState::Failed,
                    _ => StepState::Pending,
                },
                _ => match active_at {
                    Some(active) if index < active => StepState::Completed,
                    Some(active) if index == active => StepState::Active,
                    _ => StepState::Pending,
                },
            };
            StepView {
                phase: *phase,
                title: phase.label(),
                description: phase.description(),
                state,
            }
        })
        .collect()
}

/// Receives a snapshot after every session transition.
pub trait SessionObserver: Send + Sync {
    fn on_transition(&self, session: &SubmissionSession);
}

/// Observer for callers that only want the final session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_transition(&self, _session: &SubmissionSession) {}
}

impl SessionObserver for watch::Sender<SubmissionSession> {
    fn on_transition(&self, session: &SubmissionSession) {
        self.send_replace(session.clone());
    }
}
