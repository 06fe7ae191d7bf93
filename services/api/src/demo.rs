use crate::infra::InMemoryRecruitment;
use clap::Args;
use hirelink::auth::CredentialStore;
use hirelink::backend::HttpBackend;
use hirelink::config::AppConfig;
use hirelink::error::AppError;
use hirelink::telemetry;
use hirelink::workflows::applications::{
    report, ApplicantDirectory, ApplicantId, ApplicationDesk, ApplicationGateway, JobDirectory,
    JobId, Phase, ProgressReport, SessionEnvelope, SessionObserver, StepState, SubmissionKey,
    SubmissionSession,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print every scenario's final session and progress as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
    /// Skip the analysis outage and retry scenario
    #[arg(long)]
    pub(crate) skip_retry: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// Job opening to apply for
    #[arg(long)]
    pub(crate) job: u64,
    /// Applicant submitting the application
    #[arg(long)]
    pub(crate) applicant: u64,
    /// How many times to retry a failed CV analysis
    #[arg(long, default_value_t = 1)]
    pub(crate) retries: u8,
    /// Print the final session and progress as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct ScenarioOutcome {
    scenario: &'static str,
    #[serde(flatten)]
    envelope: SessionEnvelope,
}

/// Prints each new phase as the submission moves through it.
struct ConsoleProgress {
    quiet: bool,
    last: Mutex<Option<Phase>>,
}

impl ConsoleProgress {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            last: Mutex::new(None),
        }
    }
}

impl SessionObserver for ConsoleProgress {
    fn on_transition(&self, session: &SubmissionSession) {
        if self.quiet {
            return;
        }
        let phase = Phase::from_step(session.step());
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last != Some(phase) {
            println!("  ... {}", phase.label());
            *last = Some(phase);
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { json, skip_retry } = args;
    let backend = Arc::new(InMemoryRecruitment::seeded());
    let desk = ApplicationDesk::new(backend.clone(), backend.clone(), backend.clone());
    let mut outcomes = Vec::new();

    if !json {
        println!("Job application demo (in-memory backend)");
    }

    let scenarios = [
        ("Applicant 9 applies for job 42", JobId(42), ApplicantId(9)),
        ("Applicant 9 applies for job 42 again", JobId(42), ApplicantId(9)),
        ("Applicant 10 has no CV on file", JobId(43), ApplicantId(10)),
        ("Job 44 has no owning HR account", JobId(44), ApplicantId(9)),
        ("Job 99 does not exist", JobId(99), ApplicantId(9)),
    ];
    for (title, job_id, applicant_id) in scenarios {
        if let Some(session) = run_scenario(&desk, title, job_id, applicant_id, json).await {
            outcomes.push(ScenarioOutcome {
                scenario: title,
                envelope: session.into(),
            });
        }
    }

    if !skip_retry {
        backend.fail_next_analyses(1);
        let title = "Applicant 9 applies for job 43 during an analysis outage";
        if let Some(session) = run_scenario(&desk, title, JobId(43), ApplicantId(9), json).await {
            outcomes.push(ScenarioOutcome {
                scenario: title,
                envelope: session.into(),
            });
        }

        let title = "Applicant 9 retries the analysis";
        if !json {
            println!("\n{title}");
        }
        let key = SubmissionKey::new(ApplicantId(9), JobId(43));
        match desk.retry_observed(key, &ConsoleProgress::new(json)).await {
            Ok(session) => {
                if !json {
                    render(&report(&session));
                }
                outcomes.push(ScenarioOutcome {
                    scenario: title,
                    envelope: session.into(),
                });
            }
            Err(err) => println!("  Retry refused: {err}"),
        }
    }

    if json {
        print_json(&outcomes);
    } else {
        let applied: Vec<String> = desk
            .applied()
            .snapshot(ApplicantId(9))
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "\nApplications stored by the backend: {}",
            backend.application_count()
        );
        println!("Jobs applicant 9 has applied to: {}", applied.join(", "));
    }

    Ok(())
}

async fn run_scenario<J, P, G>(
    desk: &ApplicationDesk<J, P, G>,
    title: &'static str,
    job_id: JobId,
    applicant_id: ApplicantId,
    quiet: bool,
) -> Option<SubmissionSession>
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    if !quiet {
        println!("\n{title}");
    }
    match desk
        .apply_observed(job_id, applicant_id, &ConsoleProgress::new(quiet))
        .await
    {
        Ok(session) => {
            if !quiet {
                render(&report(&session));
            }
            Some(session)
        }
        Err(err) => {
            println!("  Submission refused: {err}");
            None
        }
    }
}

pub(crate) async fn run_apply(args: ApplyArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let backend = Arc::new(HttpBackend::new(
        &config.backend,
        CredentialStore::new(config.backend.credentials()),
    )?);
    let desk = ApplicationDesk::new(backend.clone(), backend.clone(), backend);
    let job_id = JobId(args.job);
    let applicant_id = ApplicantId(args.applicant);
    let progress = ConsoleProgress::new(args.json);

    if applicant_id.is_valid() {
        if let Err(err) = desk.refresh_applied(applicant_id).await {
            warn!(%applicant_id, error = %err, "could not load existing applications");
        }
    }

    let mut session = match desk.apply_observed(job_id, applicant_id, &progress).await {
        Ok(session) => session,
        Err(err) => {
            println!("Submission refused: {err}");
            return Ok(());
        }
    };

    let mut retries_left = args.retries;
    while retries_left > 0 && report(&session).can_retry {
        retries_left -= 1;
        if !args.json {
            println!("Retrying CV analysis for application {:?}", session.pending_application_id());
        }
        match desk.retry_observed(session.key(), &progress).await {
            Ok(next) => session = next,
            Err(err) => {
                println!("Retry refused: {err}");
                break;
            }
        }
    }

    if args.json {
        print_json(&SessionEnvelope::from(session));
    } else {
        render(&report(&session));
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to encode output: {err}"),
    }
}

fn render(report: &ProgressReport) {
    println!("  {}: {}", report.header_title, report.phase_label);
    for step in &report.steps {
        let marker = match step.state {
            StepState::Completed => "[x]",
            StepState::Active => "[>]",
            StepState::Failed => "[!]",
            StepState::Pending => "[ ]",
        };
        println!("    {marker} {}", step.title);
    }
    if let Some(title) = report.error_title {
        println!(
            "  {title}: {}",
            report.error_message.as_deref().unwrap_or_default()
        );
    }
    if let (Some(score), Some(status)) = (report.ats_score, report.status_display) {
        println!("  ATS score {score}/100 ({status})");
    }
    if report.can_retry {
        println!("  The application was saved; its CV analysis can be retried.");
    }
}
