//! The service running over an on-disk SQLite database.

mod common;

use std::sync::Arc;

use common::{uploads, ScriptedSigner, TemplateBuilder, UploadBuilder};
use signoff::db::Database;
use signoff::{
    Actor, EngineConfig, RequestService, RequestStatus, RequestStore, SqliteStore,
};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        database_path: Some(dir.path().join("data").join("signoff.db")),
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let owner = Actor::reader("owner-1");
    let officer = Actor::officer("officer-9");

    let (request_id, doc_ids) = {
        let (service, _broadcaster) =
            RequestService::open(&config, Arc::new(ScriptedSigner::new())).unwrap();
        let template = TemplateBuilder::new().required("plate").build();
        let request = service
            .create_request("Permits", "Q3", template, &owner)
            .unwrap();
        let docs = service
            .upload_documents(
                &request.id,
                vec![
                    UploadBuilder::new("first").field("plate", "AB-1").build(),
                    UploadBuilder::new("second").field("plate", "AB-2").build(),
                ],
                &owner,
            )
            .await
            .unwrap();
        service.send(&request.id, "officer-9", &owner).await.unwrap();
        service
            .reject_document(&request.id, &docs[1].id, "unreadable", &officer)
            .await
            .unwrap();
        (request.id, docs.into_iter().map(|d| d.id).collect::<Vec<_>>())
    };

    let (service, _broadcaster) =
        RequestService::open(&config, Arc::new(ScriptedSigner::new())).unwrap();
    let view = service.view(&request_id).unwrap();

    assert_eq!(view.request().status, RequestStatus::ReadyForSign);
    assert_eq!(view.request().assigned_officer.as_deref(), Some("officer-9"));
    assert_eq!(view.request().template_variables.len(), 1);
    let stored: Vec<&str> = view.documents().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(stored, doc_ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(view.documents()[0].data["plate"], "AB-1");

    let rejected = view.rejected_documents();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].reason, "unreadable");

    let report = service
        .sign(&request_id, "sig", &officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(report.signed, vec![doc_ids[0].clone()]);
    assert_eq!(report.final_status, RequestStatus::Signed);

    let signed = service.view(&request_id).unwrap();
    assert!(signed.documents()[0].signed_date.is_some());
    assert!(signed.documents()[1].signed_date.is_none());
}

#[tokio::test]
async fn test_delete_cascades_to_documents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("signoff.db");
    let owner = Actor::reader("owner-1");
    let store = Arc::new(SqliteStore::new(Database::open(&path).unwrap()));

    let service = RequestService::new(
        &EngineConfig::default(),
        store.clone(),
        Arc::new(ScriptedSigner::new()),
        Arc::new(signoff::NotificationBroadcaster::new(16)),
    );
    let request = service.create_request("Permits", "", vec![], &owner).unwrap();
    service
        .upload_documents(&request.id, uploads(3), &owner)
        .await
        .unwrap();
    service.delete_request(&request.id, &owner).await.unwrap();

    assert!(store.load_request(&request.id).is_err());
    let orphans: i64 = store
        .database()
        .with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                .map_err(Into::into)
        })
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_reopen_recovers_batch_interrupted_by_crash() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let owner = Actor::reader("owner-1");
    let officer = Actor::officer("officer-9");

    let (request_id, doc_ids) = {
        let (service, _broadcaster) =
            RequestService::open(&config, Arc::new(ScriptedSigner::new())).unwrap();
        let request = service.create_request("Permits", "", vec![], &owner).unwrap();
        let docs = service
            .upload_documents(&request.id, uploads(2), &owner)
            .await
            .unwrap();
        service.send(&request.id, "officer-9", &owner).await.unwrap();
        (request.id, docs.into_iter().map(|d| d.id).collect::<Vec<_>>())
    };

    // A process that died after signing the first document.
    {
        let path = config.database_path.clone().unwrap();
        let store = SqliteStore::new(Database::open(&path).unwrap());
        let mut record = store.load_request(&request_id).unwrap();
        record.request.enter_signing();
        store.save_request(&record.request).unwrap();
        let mut first = record.documents[0].clone();
        first.mark_signed(chrono::Utc::now());
        store.save_document(&first).unwrap();
    }

    let (service, _broadcaster) =
        RequestService::open(&config, Arc::new(ScriptedSigner::new())).unwrap();
    let view = service.view(&request_id).unwrap();
    assert_eq!(view.request().status, RequestStatus::ReadyForSign);
    assert!(view.request().pre_batch_status.is_none());
    assert!(view.documents()[0].signed_date.is_some());

    let report = service
        .sign(&request_id, "sig", &officer)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(report.signed, vec![doc_ids[1].clone()]);
    assert_eq!(report.final_status, RequestStatus::Signed);
}
