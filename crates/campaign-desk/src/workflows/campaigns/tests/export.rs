use super::common::*;
use std::sync::atomic::Ordering;

use crate::workflows::campaigns::export::lead_lists::LeadListRepository;
use crate::workflows::campaigns::export::ExportError;
use crate::workflows::campaigns::filters::{CoachFilters, FacetFilter};
use crate::workflows::campaigns::service::{ActionError, ExportRequest, NO_MATCHING_COACHES};

fn division_one() -> ExportRequest {
    ExportRequest {
        coach_ids: None,
        filters: Some(CoachFilters {
            divisions: Some(FacetFilter::any_of(vec!["Division I".to_string()])),
            ..CoachFilters::default()
        }),
    }
}

#[tokio::test]
async fn export_uploads_csv_and_records_lead_list() {
    let harness = harness();
    let session = session();

    let export = harness
        .service
        .export_coach_list(Some(&session), campaign_id(), &division_one())
        .await
        .expect("export");

    assert_eq!(export.row_count, 4);
    assert!(export.file_name.starts_with("coach-list-"));
    assert!(export.file_name.ends_with(".csv"));
    assert_eq!(export.csv_content.lines().count(), 5);

    let path = format!("{}/{}", campaign_id(), export.file_name);
    let stored = harness.storage.object(&path).expect("uploaded object");
    assert_eq!(stored, export.csv_content.as_bytes());
    assert!(export.file_url.contains(&path));
    assert!(export.file_url.ends_with("expires=604800"));

    let lists = harness
        .lead_lists
        .for_campaign(campaign_id())
        .await
        .expect("lead lists");
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id, export.lead_list_id);
    assert_eq!(lists[0].row_count, 4);
    assert_eq!(lists[0].file_path, path);
    assert_eq!(lists[0].created_by, "recruiter");
}

#[tokio::test]
async fn coach_ids_apply_to_the_complete_result() {
    let harness = harness();
    let request = ExportRequest {
        coach_ids: Some(vec![coach_id(8)]),
        filters: None,
    };

    // Export pages hold two rows; coach 8 only appears on the last page.
    let export = harness
        .service
        .export_coach_list(Some(&session()), campaign_id(), &request)
        .await
        .expect("export");

    assert_eq!(export.row_count, 1);
    assert!(export.csv_content.contains(&coach_id(8).to_string()));
    assert_eq!(harness.directory.counts(), (1, 4));
}

#[tokio::test]
async fn empty_export_is_rejected_before_upload() {
    let harness = harness();
    let request = ExportRequest {
        coach_ids: Some(vec![coach_id(99)]),
        filters: None,
    };

    match harness
        .service
        .export_coach_list(Some(&session()), campaign_id(), &request)
        .await
    {
        Err(ActionError::Validation(message)) => assert_eq!(message, NO_MATCHING_COACHES),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(harness.storage.object_count(), 0);
}

#[tokio::test]
async fn lead_list_failure_removes_the_upload() {
    let harness = harness_with(FlakyLeadLists::failing(usize::MAX), MemoryStorage::default());

    let result = harness
        .service
        .export_coach_list(Some(&session()), campaign_id(), &division_one())
        .await;

    match result {
        Err(ActionError::Export(ExportError::LeadList(_))) => {}
        other => panic!("expected lead list failure, got {other:?}"),
    }
    assert_eq!(harness.lead_lists.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(harness.storage.object_count(), 0);
    assert_eq!(harness.storage.removed().len(), 1);
}

#[tokio::test]
async fn lead_list_insert_is_retried() {
    let harness = harness_with(FlakyLeadLists::failing(1), MemoryStorage::default());

    let export = harness
        .service
        .export_coach_list(Some(&session()), campaign_id(), &division_one())
        .await
        .expect("export succeeds on retry");

    assert_eq!(harness.lead_lists.attempts.load(Ordering::SeqCst), 2);
    assert!(harness.storage.removed().is_empty());
    let path = format!("{}/{}", campaign_id(), export.file_name);
    assert!(harness.storage.object(&path).is_some());
}

#[tokio::test]
async fn signing_failure_removes_the_upload() {
    let storage = MemoryStorage {
        fail_sign: true,
        ..MemoryStorage::default()
    };
    let harness = harness_with(FlakyLeadLists::default(), storage);

    match harness
        .service
        .export_coach_list(Some(&session()), campaign_id(), &division_one())
        .await
    {
        Err(ActionError::Export(ExportError::Sign(_))) => {}
        other => panic!("expected sign failure, got {other:?}"),
    }
    assert_eq!(harness.storage.object_count(), 0);
    assert_eq!(harness.lead_lists.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_failure_writes_nothing() {
    let storage = MemoryStorage {
        fail_upload: true,
        ..MemoryStorage::default()
    };
    let harness = harness_with(FlakyLeadLists::default(), storage);

    match harness
        .service
        .export_coach_list(Some(&session()), campaign_id(), &division_one())
        .await
    {
        Err(ActionError::Export(ExportError::Upload(_))) => {}
        other => panic!("expected upload failure, got {other:?}"),
    }
    assert!(harness.storage.removed().is_empty());
    assert_eq!(harness.lead_lists.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn actions_require_a_session() {
    let harness = harness();

    match harness
        .service
        .export_coach_list(None, campaign_id(), &division_one())
        .await
    {
        Err(ActionError::Unauthenticated) => {}
        other => panic!("expected unauthenticated, got {other:?}"),
    }
    match harness.service.lead_lists(None, campaign_id()).await {
        Err(error) => assert_eq!(error.to_string(), "You must be logged in"),
        Ok(_) => panic!("lead lists served without a session"),
    }
    assert_eq!(harness.directory.counts(), (0, 0));
    assert_eq!(harness.storage.object_count(), 0);
}
