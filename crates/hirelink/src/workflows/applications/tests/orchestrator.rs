use super::common::*;
use std::sync::Arc;

use crate::workflows::applications::{
    AnalysisStatus, ApplicantId, ApplicationId, ApplicationStatus, AppliedSet, EmployerId,
    FailureKind, JobId, RetryError, ServiceError, SubmissionKey, SubmissionStep, SubmitRejected,
};

#[tokio::test]
async fn submission_runs_every_step_and_returns_analysis() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(AppliedSet::new());
    let log = StepLog::default();

    let session = orchestrator
        .submit_observed(JOB, APPLICANT, &log)
        .await
        .expect("submission admitted");

    assert_eq!(session.step(), SubmissionStep::Success);
    assert_eq!(session.pending_application_id(), Some(FIRST_APPLICATION));
    let result = session.result().expect("analysis recorded");
    assert_eq!(result.ats_score, 82);
    assert_eq!(result.status, AnalysisStatus::AtsPassed);
    assert!(result.skills_found.contains(&"SQL".to_string()));
    assert_eq!(session.error_message(), None);

    assert_eq!(
        log.steps(),
        vec![
            SubmissionStep::CheckingDuplicate,
            SubmissionStep::FetchingJob,
            SubmissionStep::FetchingProfile,
            SubmissionStep::CreatingApplication,
            SubmissionStep::Analyzing,
            SubmissionStep::Success,
        ]
    );

    let created = harness.applications.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].employer_id, EMPLOYER);
    assert_eq!(created[0].resume_reference, "cv-9.pdf");
    assert_eq!(created[0].status, ApplicationStatus::UnderReview);
    assert_eq!(harness.applications.analyzed(), vec![FIRST_APPLICATION]);
}

#[tokio::test]
async fn cached_job_is_rejected_before_any_backend_call() {
    let harness = Harness::new();
    let applied = AppliedSet::new();
    applied.insert(APPLICANT, JOB);
    let orchestrator = harness.orchestrator(applied);

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.step(), SubmissionStep::Error);
    assert_eq!(session.failure(), Some(FailureKind::DuplicateApplication));
    assert_eq!(session.failed_step(), Some(SubmissionStep::CheckingDuplicate));
    assert!(!session.retryable());
    assert_eq!(
        session.error_message(),
        Some("You have already applied for this position. Please check your applications page.")
    );
    assert_eq!(harness.jobs.calls(), 0);
    assert!(harness.applications.created().is_empty());
}

#[tokio::test]
async fn zero_ids_are_invalid_input() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let bad_job = orchestrator
        .submit(JobId(0), APPLICANT)
        .await
        .expect("submission admitted");
    assert_eq!(bad_job.failure(), Some(FailureKind::InvalidInput));
    assert_eq!(bad_job.error_message(), Some("Invalid job ID."));

    let bad_applicant = orchestrator
        .submit(JOB, ApplicantId(0))
        .await
        .expect("submission admitted");
    assert_eq!(bad_applicant.failure(), Some(FailureKind::InvalidInput));
    assert_eq!(
        bad_applicant.error_message(),
        Some("Invalid user session. Please login again.")
    );

    assert_eq!(harness.jobs.calls(), 0);
}

#[tokio::test]
async fn missing_job_is_terminal_not_found() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let session = orchestrator
        .submit(JobId(77), APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.failure(), Some(FailureKind::NotFound));
    assert_eq!(session.failed_step(), Some(SubmissionStep::FetchingJob));
    assert!(!session.retryable());
    assert_eq!(harness.applicants.calls(), 0);
}

#[tokio::test]
async fn job_lookup_outage_is_not_retryable() {
    let harness = Harness::new();
    harness
        .jobs
        .fail_with(ServiceError::Unavailable("connection refused".to_string()));
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.failure(), Some(FailureKind::ServiceError));
    assert_eq!(
        session.error_message(),
        Some("Failed to load job details. Please try again.")
    );
    assert!(!session.retryable());
    assert_eq!(session.pending_application_id(), None);
}

#[tokio::test]
async fn job_without_valid_employer_fails_precondition() {
    for employer in [None, Some(EmployerId(0))] {
        let harness = Harness::new();
        harness.jobs.put(job_opening(JOB, employer));
        let orchestrator = harness.orchestrator(AppliedSet::new());

        let session = orchestrator
            .submit(JOB, APPLICANT)
            .await
            .expect("submission admitted");

        assert_eq!(session.failure(), Some(FailureKind::PreconditionFailed));
        assert_eq!(
            session.error_message(),
            Some("Job information is incomplete. Please contact support.")
        );
        assert_eq!(harness.applicants.calls(), 0);
    }
}

#[tokio::test]
async fn blank_resume_stops_before_creation() {
    let harness = Harness::new();
    harness.applicants.put(profile(APPLICANT, "   "));
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.step(), SubmissionStep::Error);
    assert_eq!(session.failure(), Some(FailureKind::PreconditionFailed));
    assert_eq!(session.failed_step(), Some(SubmissionStep::FetchingProfile));
    assert!(session
        .error_message()
        .expect("message recorded")
        .starts_with("No CV found in your profile."));
    assert!(harness.applications.created().is_empty());
}

#[tokio::test]
async fn profile_lookup_failures_are_classified() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(AppliedSet::new());
    let session = orchestrator
        .submit(JOB, ApplicantId(10))
        .await
        .expect("submission admitted");
    assert_eq!(session.failure(), Some(FailureKind::NotFound));

    harness.applicants.fail_with(ServiceError::Server {
        status: 500,
        message: "boom".to_string(),
    });
    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");
    assert_eq!(session.failure(), Some(FailureKind::ServiceError));
    assert!(!session.retryable());
}

#[tokio::test]
async fn creation_conflicts_map_to_duplicate_application() {
    let conflicts = [
        ServiceError::Conflict("duplicate".to_string()),
        ServiceError::Validation("You have already applied for this job".to_string()),
    ];
    for conflict in conflicts {
        let harness = Harness::new();
        harness.applications.fail_create(conflict);
        let orchestrator = harness.orchestrator(AppliedSet::new());

        let session = orchestrator
            .submit(JOB, APPLICANT)
            .await
            .expect("submission admitted");

        assert_eq!(session.failure(), Some(FailureKind::DuplicateApplication));
        assert_eq!(session.failed_step(), Some(SubmissionStep::CreatingApplication));
        assert!(!session.retryable());
        assert!(harness.applications.analyzed().is_empty());
    }
}

#[tokio::test]
async fn other_creation_errors_carry_the_server_message() {
    let harness = Harness::new();
    harness
        .applications
        .fail_create(ServiceError::Validation("hrId is required".to_string()));
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.failure(), Some(FailureKind::ServiceError));
    assert_eq!(
        session.error_message(),
        Some("Failed to create application. hrId is required")
    );
    assert_eq!(session.pending_application_id(), None);
    assert!(!session.retryable());
}

#[tokio::test]
async fn analysis_failure_keeps_the_created_application_retryable() {
    let harness = Harness::new();
    harness.applications.fail_analysis(transient_failure());
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.step(), SubmissionStep::Error);
    assert_eq!(session.failed_step(), Some(SubmissionStep::Analyzing));
    assert_eq!(session.pending_application_id(), Some(FIRST_APPLICATION));
    assert!(session.retryable());
    assert_eq!(
        session.error_message(),
        Some(
            "Your application was submitted successfully, but CV analysis failed. \
             analysis engine warming up"
        )
    );
    assert!(session.result().is_none());
}

#[tokio::test]
async fn retry_reuses_the_pending_application_without_recreating() {
    let harness = Harness::new();
    harness.applications.fail_analysis(transient_failure());
    let orchestrator = harness.orchestrator(AppliedSet::new());
    let failed = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    let log = StepLog::default();
    let session = orchestrator
        .retry_observed(failed, &log)
        .await
        .expect("retry admitted");

    assert_eq!(session.step(), SubmissionStep::Success);
    assert_eq!(session.pending_application_id(), Some(FIRST_APPLICATION));
    assert_eq!(
        session.result().map(|result| result.application_id),
        Some(FIRST_APPLICATION)
    );
    assert_eq!(harness.applications.created().len(), 1);
    assert_eq!(
        harness.applications.analyzed(),
        vec![FIRST_APPLICATION, FIRST_APPLICATION]
    );
    assert_eq!(
        log.steps(),
        vec![SubmissionStep::Analyzing, SubmissionStep::Success]
    );
}

#[tokio::test]
async fn second_analysis_failure_stays_retryable() {
    let harness = Harness::new();
    harness.applications.fail_analysis(transient_failure());
    harness
        .applications
        .fail_analysis(ServiceError::Unavailable(String::new()));
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let failed = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");
    let again = orchestrator.retry(failed).await.expect("retry admitted");

    assert_eq!(again.step(), SubmissionStep::Error);
    assert!(again.retryable());
    assert_eq!(again.pending_application_id(), Some(FIRST_APPLICATION));
    assert_eq!(
        again.error_message(),
        Some(
            "CV analysis failed again. \
             Please check your application later in the applications page."
        )
    );
    assert_eq!(harness.applications.created().len(), 1);
}

#[tokio::test]
async fn retry_refuses_sessions_without_a_pending_analysis() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let succeeded = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");
    assert_eq!(
        orchestrator.retry(succeeded).await,
        Err(RetryError::NotRetryable {
            key: SubmissionKey::new(APPLICANT, JOB),
            step: SubmissionStep::Success,
        })
    );

    harness
        .jobs
        .fail_with(ServiceError::Unavailable("down".to_string()));
    let failed_early = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");
    assert!(matches!(
        orchestrator.retry(failed_early).await,
        Err(RetryError::NotRetryable { .. })
    ));
    assert_eq!(harness.applications.analyzed().len(), 1);
}

#[tokio::test]
async fn analysis_for_another_application_is_rejected() {
    let harness = Harness::new();
    harness
        .applications
        .answer_analysis_with(analysis(ApplicationId(999)));
    let orchestrator = harness.orchestrator(AppliedSet::new());

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("submission admitted");

    assert_eq!(session.step(), SubmissionStep::Error);
    assert!(session.retryable());
    assert!(session.result().is_none());
}

#[tokio::test]
async fn concurrent_submission_for_same_pair_is_busy() {
    let harness = Harness::new();
    let gate = harness.jobs.gate();
    let orchestrator = Arc::new(harness.orchestrator(AppliedSet::new()));

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(JOB, APPLICANT).await }
    });
    gate.entered.notified().await;

    let key = SubmissionKey::new(APPLICANT, JOB);
    assert!(orchestrator.is_in_flight(key));
    assert_eq!(
        orchestrator.submit(JOB, APPLICANT).await,
        Err(SubmitRejected::Busy(crate::workflows::applications::Busy { key }))
    );

    gate.release.notify_one();
    let session = first
        .await
        .expect("task joins")
        .expect("first submission admitted");
    assert!(session.is_success());
    assert!(!orchestrator.is_in_flight(key));
    assert_eq!(harness.applications.created().len(), 1);
}

#[tokio::test]
async fn abandoned_submission_releases_the_pair() {
    let harness = Harness::new();
    let gate = harness.jobs.gate();
    let orchestrator = Arc::new(harness.orchestrator(AppliedSet::new()));
    let key = SubmissionKey::new(APPLICANT, JOB);

    let pending = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(JOB, APPLICANT).await }
    });
    gate.entered.notified().await;
    assert!(orchestrator.is_in_flight(key));

    pending.abort();
    assert!(pending.await.is_err());
    assert!(!orchestrator.is_in_flight(key));

    let session = orchestrator
        .submit(JOB, APPLICANT)
        .await
        .expect("pair is free again");
    assert!(session.is_success());
}

#[tokio::test]
async fn different_jobs_run_independently() {
    let harness = Harness::new();
    harness.jobs.put(job_opening(JobId(43), Some(EMPLOYER)));
    let gate = harness.jobs.gate();
    let orchestrator = Arc::new(harness.orchestrator(AppliedSet::new()));

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(JOB, APPLICANT).await }
    });
    gate.entered.notified().await;

    let other = orchestrator
        .submit(JobId(43), APPLICANT)
        .await
        .expect("other pair admitted");
    assert!(other.is_success());

    gate.release.notify_one();
    assert!(first.await.expect("task joins").expect("admitted").is_success());
}
