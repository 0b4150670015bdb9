//! Bulk signing: progress reporting, partial failure, cancellation,
//! timeouts and concurrent starts.

mod common;

use std::time::Duration;

use common::{drain_events, TestHarness};
use signoff::batch::FailedDocument;
use signoff::broadcast::{SigningProgress, StatusChanged};
use signoff::{
    BatchOutcome, BatchProgress, EngineEvent, RequestStatus, SubjectKind, SubjectRef, Transition,
    TransitionError, TransitionEvent,
};

#[tokio::test]
async fn test_three_documents_report_progress_in_order() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(3).await;
    let mut rx = harness.subscribe();

    let handle = harness
        .service
        .sign(&request_id, "signature-7", &harness.officer)
        .await
        .unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.outcome, BatchOutcome::Completed);
    assert_eq!(report.final_status, RequestStatus::Signed);
    assert_eq!(report.total, 3);
    let expected: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
    assert_eq!(report.signed, expected);
    assert_eq!(harness.signer.calls(), expected);

    let progress: Vec<(u32, u32)> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::SigningProgress(SigningProgress { current, total, .. }) => {
                Some((current, total))
            }
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);

    let record = harness.record(&request_id);
    assert_eq!(record.request.status, RequestStatus::Signed);
    assert!(record.documents.iter().all(|d| d.signed_date.is_some()));
    assert!(harness.service.progress(&request_id).is_none());
}

#[tokio::test]
async fn test_event_sequence_for_one_batch() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(2).await;
    let mut rx = harness.subscribe();

    harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 6);
    assert_eq!(
        events[0],
        EngineEvent::StatusChanged(StatusChanged::request(
            &request_id,
            RequestStatus::ReadyForSign,
            RequestStatus::InProcess,
            None
        ))
    );
    // Each document's status change precedes its progress event.
    for (i, doc) in docs.iter().enumerate() {
        match &events[1 + i * 2] {
            EngineEvent::StatusChanged(e) => {
                assert_eq!(e.subject_id, doc.id);
                assert_eq!(e.subject_kind, SubjectKind::Document);
                assert_eq!(e.new_status, RequestStatus::Signed);
            }
            other => panic!("expected document status change, got {:?}", other),
        }
        assert!(matches!(
            &events[2 + i * 2],
            EngineEvent::SigningProgress(p) if p.current == i as u32 + 1
        ));
    }
    assert_eq!(
        events[5],
        EngineEvent::StatusChanged(StatusChanged::request(
            &request_id,
            RequestStatus::InProcess,
            RequestStatus::Signed,
            None
        ))
    );
}

#[tokio::test]
async fn test_partial_failure_reverts_and_clears_progress() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(3).await;
    harness.signer.fail_on(&docs[1].id);

    let report = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.outcome, BatchOutcome::PartiallyFailed);
    assert_eq!(report.final_status, RequestStatus::ReadyForSign);
    assert_eq!(report.signed, vec![docs[0].id.clone(), docs[2].id.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].document_id, docs[1].id);
    assert!(report.failed[0].error.contains("scripted failure"));
    assert!(harness.service.progress(&request_id).is_none());

    let record = harness.record(&request_id);
    assert_eq!(record.request.status, RequestStatus::ReadyForSign);
    let failed = record.document(&docs[1].id).unwrap();
    assert_eq!(failed.sign_status, RequestStatus::Unsigned);
    assert!(failed.signed_date.is_none());
}

#[tokio::test]
async fn test_panicking_signer_fails_only_its_document() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(3).await;
    harness.signer.panic_on(&docs[1].id);

    let report = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.outcome, BatchOutcome::PartiallyFailed);
    assert_eq!(report.signed, vec![docs[0].id.clone(), docs[2].id.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].document_id, docs[1].id);
    assert!(report.failed[0].error.contains("scripted panic"));
    assert_eq!(report.final_status, RequestStatus::ReadyForSign);
    assert!(harness.service.progress(&request_id).is_none());

    let record = harness.record(&request_id);
    assert_eq!(record.request.status, RequestStatus::ReadyForSign);
    assert_eq!(
        record.document(&docs[1].id).unwrap().sign_status,
        RequestStatus::Unsigned
    );
}

#[tokio::test]
async fn test_retry_after_failure_signs_only_the_rest() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(2).await;
    harness.signer.fail_on(&docs[0].id);
    harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    harness.signer.heal(&docs[0].id);
    let report = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.signed, vec![docs[0].id.clone()]);
    assert_eq!(report.final_status, RequestStatus::Signed);
}

#[tokio::test]
async fn test_progress_visible_while_running() {
    let harness = TestHarness::new();
    let (request_id, _docs) = harness.ready_request(3).await;
    harness.signer.set_gated(true);

    let handle = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap();

    harness.signer.wait_entered().await;
    assert_eq!(
        harness.service.progress(&request_id),
        Some(BatchProgress { current: 0, total: 3 })
    );
    assert_eq!(
        harness.record(&request_id).request.status,
        RequestStatus::InProcess
    );

    harness.signer.release();
    harness.signer.wait_entered().await;
    assert_eq!(
        harness.service.progress(&request_id),
        Some(BatchProgress { current: 1, total: 3 })
    );

    harness.signer.set_gated(false);
    harness.signer.release();
    let report = handle.wait().await.unwrap();
    assert!(report.is_success());
    assert!(harness.service.progress(&request_id).is_none());
}

#[tokio::test]
async fn test_cancel_between_documents() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(3).await;
    harness.signer.set_gated(true);

    let handle = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap();
    harness.signer.wait_entered().await;

    // The in-flight document still completes.
    handle.cancel();
    harness.signer.release();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.outcome, BatchOutcome::Cancelled);
    assert!(report.cancelled);
    assert_eq!(report.signed, vec![docs[0].id.clone()]);
    assert_eq!(report.skipped, vec![docs[1].id.clone(), docs[2].id.clone()]);
    assert_eq!(report.final_status, RequestStatus::ReadyForSign);
    assert_eq!(harness.signer.calls().len(), 1);
    assert!(harness.service.progress(&request_id).is_none());

    let record = harness.record(&request_id);
    assert_eq!(
        record.document(&docs[2].id).unwrap().sign_status,
        RequestStatus::Unsigned
    );
}

#[tokio::test]
async fn test_hung_signer_times_out_per_document() {
    let harness = TestHarness::with_timeout(Duration::from_millis(50));
    let (request_id, docs) = harness.ready_request(2).await;
    harness.signer.hang_on(&docs[0].id);

    let report = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.outcome, BatchOutcome::PartiallyFailed);
    assert_eq!(report.signed, vec![docs[1].id.clone()]);
    assert_eq!(report.failed[0].document_id, docs[0].id);
    assert!(report.failed[0].error.contains("timed out"));
    assert_eq!(report.final_status, RequestStatus::ReadyForSign);
}

#[tokio::test]
async fn test_concurrent_sign_only_one_runs() {
    let harness = TestHarness::new();
    let (request_id, _docs) = harness.ready_request(2).await;

    let (first, second) = tokio::join!(
        harness.service.sign(&request_id, "sig", &harness.officer),
        harness.service.sign(&request_id, "sig", &harness.officer),
    );

    let (winner, loser) = match (first, second) {
        (Ok(handle), Err(err)) | (Err(err), Ok(handle)) => (handle, err),
        (Ok(_), Ok(_)) => panic!("both sign calls started a batch"),
        (Err(a), Err(b)) => panic!("both sign calls failed: {a}, {b}"),
    };
    assert!(matches!(
        loser,
        TransitionError::InvalidTransition {
            current: RequestStatus::InProcess,
            event: TransitionEvent::Sign
        }
    ));

    let report = winner.wait().await.unwrap();
    assert_eq!(report.final_status, RequestStatus::Signed);
    assert_eq!(harness.signer.calls().len(), 2);
}

#[tokio::test]
async fn test_sign_while_in_process_is_rejected() {
    let harness = TestHarness::new();
    let (request_id, _docs) = harness.ready_request(1).await;
    harness.signer.set_gated(true);

    let handle = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap();
    harness.signer.wait_entered().await;

    let err = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));

    // Nothing else may touch the request while it is in process.
    let err = harness
        .service
        .reject(&request_id, "too late", &harness.officer)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));

    harness.signer.set_gated(false);
    harness.signer.release();
    assert!(handle.wait().await.unwrap().is_success());
}

#[tokio::test]
async fn test_write_failure_aborts_batch() {
    let harness = TestHarness::new();
    let (request_id, docs) = harness.ready_request(3).await;
    harness.store.fail_document_saves_after(1);

    let report = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.outcome, BatchOutcome::Aborted);
    assert_eq!(report.signed, vec![docs[0].id.clone()]);
    assert_eq!(
        report.failed,
        vec![FailedDocument {
            document_id: docs[1].id.clone(),
            error: report.failed[0].error.clone(),
        }]
    );
    assert_eq!(report.skipped, vec![docs[2].id.clone()]);
    assert_eq!(report.final_status, RequestStatus::ReadyForSign);
    assert!(report.error.is_some());
    assert!(harness.service.progress(&request_id).is_none());
    assert_eq!(harness.signer.calls().len(), 2);
}

#[tokio::test]
async fn test_ineligible_sign_fails_fast() {
    let harness = TestHarness::new();
    let (request, _docs) = harness.request_with_documents(1).await;

    let err = harness
        .service
        .sign(&request.id, "sig", &harness.officer)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        TransitionError::InvalidTransition {
            current: RequestStatus::Unsigned,
            event: TransitionEvent::Sign
        }
    ));
    assert!(harness.service.progress(&request.id).is_none());
    assert!(harness.signer.calls().is_empty());
}

#[tokio::test]
async fn test_generic_sign_cannot_strand_request_in_process() {
    let harness = TestHarness::new();
    let (request_id, _docs) = harness.ready_request(2).await;
    let mut rx = harness.subscribe();

    let err = harness
        .service
        .engine()
        .apply_transition(
            &SubjectRef::request(&request_id),
            Transition::Sign,
            &harness.officer,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::BatchRequired));
    assert_eq!(
        harness.record(&request_id).request.status,
        RequestStatus::ReadyForSign
    );
    assert!(harness.service.progress(&request_id).is_none());
    assert!(drain_events(&mut rx).is_empty());

    // The batch path still works afterwards.
    let report = harness
        .service
        .sign(&request_id, "sig", &harness.officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(report.final_status, RequestStatus::Signed);
}
