//! Integration tests for the draft lifecycle: edits, readiness, AI
//! improvement and auto-save fencing.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use listcast_core::channel::Channel;
use listcast_core::draft::DraftPatch;
use listcast_core::draft_status::{DraftAction, DraftStatus};
use listcast_core::error::CoreError;
use listcast_core::services::ServiceError;
use listcast_core::validation::LimitViolation;
use listcast_events::{event_types, Notification, NotificationLevel};
use listcast_workflow::{DraftRef, WorkflowError};

use common::*;

async fn generated(channels: &[Channel]) -> Harness {
    let h = harness_with(channels).await;
    h.session.add_language(lang("en")).await.unwrap();
    h
}

// ---------------------------------------------------------------------------
// Test: edits from generated, edited and ready all yield edited
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_yields_edited_from_every_editable_status() {
    let h = generated(&[Channel::Facebook]).await;
    let k = key("en", Channel::Facebook);

    // generated -> edited
    let update = h
        .session
        .update_draft(&k, DraftPatch::default().title("Ocean villa"))
        .await
        .unwrap();
    assert_eq!(update.draft.status, DraftStatus::Edited);
    assert_eq!(update.draft.title, "Ocean villa");
    assert_eq!(update.draft.edited_by.as_deref(), Some("agent-1"));

    // edited -> edited
    let update = h
        .session
        .update_draft(&k, DraftPatch::default().body("Second pass"))
        .await
        .unwrap();
    assert_eq!(update.draft.status, DraftStatus::Edited);

    // ready -> edited
    h.session.mark_ready(&k).await.unwrap();
    let update = h
        .session
        .update_draft(&k, DraftPatch::default().contact_included(false))
        .await
        .unwrap();
    assert_eq!(update.draft.status, DraftStatus::Edited);
    assert!(!update.draft.contact_included);
    assert_eq!(update.draft.body, "Second pass");
}

#[tokio::test]
async fn drafts_can_be_addressed_by_id() {
    let h = generated(&[Channel::Linkedin]).await;
    let id = h
        .session
        .draft(key("en", Channel::Linkedin))
        .await
        .and_then(|d| d.id)
        .unwrap();

    let update = h
        .session
        .update_draft(DraftRef::Id(id), DraftPatch::default().body("By id"))
        .await
        .unwrap();
    assert_eq!(update.draft.body, "By id");

    let missing = h
        .session
        .update_draft(DraftRef::Id("nope".into()), DraftPatch::default().body("x"))
        .await;
    assert_matches!(missing, Err(WorkflowError::Core(CoreError::NotFound { .. })));
}

// ---------------------------------------------------------------------------
// Test: a publishing draft cannot be edited and is left unchanged
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_on_publishing_draft_is_rejected_without_change() {
    let h = generated(&[Channel::Facebook]).await;
    h.backend.defer_results();
    let k = key("en", Channel::Facebook);
    h.session.mark_ready(&k).await.unwrap();
    h.session.publish_ready().await.unwrap();

    let before = h.session.draft(&k).await.unwrap();
    assert_eq!(before.status, DraftStatus::Publishing);

    let err = h
        .session
        .update_draft(&k, DraftPatch::default().body("Too late").hashtags(["late"]))
        .await
        .unwrap_err();

    assert!(err.is_invalid_transition());
    assert_matches!(
        err,
        WorkflowError::Core(CoreError::InvalidTransition {
            from: DraftStatus::Publishing,
            action: DraftAction::Edit,
        })
    );
    assert_eq!(h.session.draft(&k).await.unwrap(), before);
}

#[tokio::test]
async fn update_on_published_draft_is_rejected() {
    let h = generated(&[Channel::Facebook]).await;
    let k = key("en", Channel::Facebook);
    h.session.mark_ready(&k).await.unwrap();
    h.session.publish_ready().await.unwrap();

    let before = h.session.draft(&k).await.unwrap();
    assert_eq!(before.status, DraftStatus::Published);

    let result = h.session.update_draft(&k, DraftPatch::default().body("Edit")).await;
    assert_matches!(
        result,
        Err(WorkflowError::Core(CoreError::InvalidTransition {
            from: DraftStatus::Published,
            ..
        }))
    );
    assert_eq!(h.session.draft(&k).await.unwrap(), before);
}

#[tokio::test]
async fn empty_patch_is_a_validation_error() {
    let h = generated(&[Channel::Facebook]).await;
    let k = key("en", Channel::Facebook);
    let before = h.session.draft(&k).await.unwrap();

    let err = h.session.update_draft(&k, DraftPatch::default()).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(h.session.draft(&k).await.unwrap(), before);
    assert_eq!(h.backend.save_count(), 0);
}

#[tokio::test]
async fn edited_hashtags_are_normalized() {
    let h = generated(&[Channel::Instagram]).await;

    let update = h
        .session
        .update_draft(
            key("en", Channel::Instagram),
            DraftPatch::default().hashtags(["#beach", " ", "villa", "#beach"]),
        )
        .await
        .unwrap();

    assert_eq!(update.draft.hashtags, vec!["beach", "villa", "beach"]);
}

// ---------------------------------------------------------------------------
// Test: mark_ready is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_ready_twice_equals_once() {
    let mut h = generated(&[Channel::Facebook]).await;
    let k = key("en", Channel::Facebook);
    h.drain_events();

    assert!(h.session.mark_ready(&k).await.unwrap());
    let once = h.session.draft(&k).await.unwrap();

    assert!(!h.session.mark_ready(&k).await.unwrap());
    let twice = h.session.draft(&k).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.status, DraftStatus::Ready);
    let ready_events = h
        .event_types()
        .into_iter()
        .filter(|t| t == event_types::DRAFT_READY)
        .count();
    assert_eq!(ready_events, 1);
}

#[tokio::test]
async fn mark_ready_rejected_while_publishing() {
    let h = generated(&[Channel::Facebook]).await;
    h.backend.defer_results();
    let k = key("en", Channel::Facebook);
    h.session.mark_ready(&k).await.unwrap();
    h.session.publish_ready().await.unwrap();

    let result = h.session.mark_ready(&k).await;
    assert_matches!(
        result,
        Err(WorkflowError::Core(CoreError::InvalidTransition {
            from: DraftStatus::Publishing,
            action: DraftAction::MarkReady,
        }))
    );
}

#[tokio::test]
async fn mark_all_ready_skips_other_statuses() {
    let h = generated(&[Channel::Facebook, Channel::Website]).await;
    h.session.mark_ready(key("en", Channel::Website)).await.unwrap();

    let changed = h.session.mark_all_ready().await;

    assert_eq!(changed, vec![key("en", Channel::Facebook)]);
    assert_eq!(h.session.ready_drafts().await.len(), 2);
}

// ---------------------------------------------------------------------------
// Test: channel limits are advisory while editing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn over_limit_edit_is_accepted_with_warnings() {
    let mut h = generated(&[Channel::Twitter]).await;
    h.drain_events();

    let update = h
        .session
        .update_draft(key("en", Channel::Twitter), DraftPatch::default().body(long_body(300)))
        .await
        .unwrap();

    assert_eq!(update.draft.status, DraftStatus::Edited);
    assert_matches!(
        update.warnings.as_slice(),
        [LimitViolation::TooLong { limit: 280, .. }]
    );

    let event = h
        .drain_events()
        .into_iter()
        .find(|e| e.event_type == event_types::DRAFT_UPDATED)
        .expect("update event");
    let notification = Notification::from_event(&event).expect("warning notification");
    assert_eq!(notification.level, NotificationLevel::Warning);
    assert!(notification.message.contains("280"));
}

// ---------------------------------------------------------------------------
// Test: auto-save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edits_are_auto_saved_without_blocking() {
    let h = generated(&[Channel::Facebook]).await;
    let gate = h.backend.gate_save(1);
    let k = key("en", Channel::Facebook);

    // Returns while the save is still held open.
    let update = h
        .session
        .update_draft(&k, DraftPatch::default().body("Saved later"))
        .await
        .unwrap();
    assert_eq!(update.draft.body, "Saved later");

    gate.notify_one();
    h.session.flush_autosaves().await;

    let saves = h.backend.saves.lock().unwrap().clone();
    assert_eq!(saves.len(), 1);
    assert_eq!(Some(saves[0].0.clone()), update.draft.id);
    assert_eq!(saves[0].1.body.as_deref(), Some("Saved later"));
}

#[tokio::test]
async fn failed_auto_save_is_reported_and_edit_kept() {
    let mut h = generated(&[Channel::Facebook]).await;
    h.backend.fail_save(1, ServiceError::Network("connection reset".into()));
    let k = key("en", Channel::Facebook);
    h.drain_events();

    h.session
        .update_draft(&k, DraftPatch::default().body("Unsaved"))
        .await
        .unwrap();
    h.session.flush_autosaves().await;

    let draft = h.session.draft(&k).await.unwrap();
    assert_eq!(draft.body, "Unsaved");
    assert_eq!(draft.status, DraftStatus::Edited);

    let failed = h
        .drain_events()
        .into_iter()
        .find(|e| e.event_type == event_types::AUTOSAVE_FAILED)
        .expect("auto-save failure event");
    assert_eq!(failed.draft, Some(k));
    assert_eq!(failed.payload["retryable"], true);
}

#[tokio::test]
async fn stale_auto_save_response_is_ignored() {
    let mut h = generated(&[Channel::Facebook]).await;
    let k = key("en", Channel::Facebook);
    let first_gate = h.backend.gate_save(1);
    h.backend.fail_save(1, ServiceError::Network("timeout".into()));
    h.drain_events();

    h.session
        .update_draft(&k, DraftPatch::default().body("First"))
        .await
        .unwrap();
    let backend = h.backend.clone();
    wait_until(|| backend.save_count() >= 1).await;

    h.session
        .update_draft(&k, DraftPatch::default().body("Second"))
        .await
        .unwrap();

    // The older save fails after the newer edit; it must not surface.
    first_gate.notify_one();
    h.session.flush_autosaves().await;

    assert_eq!(h.backend.save_count(), 2);
    assert_eq!(h.session.draft(&k).await.unwrap().body, "Second");
    assert!(!h
        .event_types()
        .contains(&event_types::AUTOSAVE_FAILED.to_string()));
}

// ---------------------------------------------------------------------------
// Test: AI improvement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn improvement_is_applied_as_an_edit() {
    let mut h = generated(&[Channel::Linkedin]).await;
    let k = key("en", Channel::Linkedin);
    h.drain_events();

    let update = h
        .session
        .improve_draft(&k, "make it shorter")
        .await
        .unwrap()
        .expect("improvement applied");

    assert_eq!(update.draft.status, DraftStatus::Edited);
    assert!(update.draft.body.ends_with("[make it shorter]"));
    assert!(h.event_types().contains(&event_types::DRAFT_IMPROVED.to_string()));

    h.session.flush_autosaves().await;
    assert_eq!(h.backend.save_count(), 1);
}

#[tokio::test]
async fn improvement_is_dropped_when_draft_changed_meanwhile() {
    let h = generated(&[Channel::Linkedin]).await;
    let k = key("en", Channel::Linkedin);
    let gate = h.backend.gate_improve();

    let session = h.session.clone();
    let task_key = k.clone();
    let task = tokio::spawn(async move { session.improve_draft(&task_key, "more luxurious").await });
    let backend = h.backend.clone();
    wait_until(|| backend.improve_calls.load(Ordering::SeqCst) >= 1).await;

    h.session
        .update_draft(&k, DraftPatch::default().body("Manual rewrite"))
        .await
        .unwrap();
    gate.notify_one();

    assert_matches!(task.await.unwrap(), Ok(None));
    assert_eq!(h.session.draft(&k).await.unwrap().body, "Manual rewrite");
}

#[tokio::test]
async fn improvement_failure_is_notified_and_draft_kept() {
    let mut h = generated(&[Channel::Instagram]).await;
    let k = key("en", Channel::Instagram);
    let before = h.session.draft(&k).await.unwrap();
    h.drain_events();
    h.backend.fail_improve(ServiceError::Api {
        status: 502,
        message: "model overloaded".into(),
    });

    let err = h.session.improve_draft(&k, "warmer tone").await.unwrap_err();

    assert_matches!(err, WorkflowError::Service(ServiceError::Api { status: 502, .. }));
    assert_eq!(h.session.draft(&k).await.unwrap(), before);

    let event = h
        .drain_events()
        .into_iter()
        .find(|e| e.event_type == event_types::DRAFT_IMPROVE_FAILED)
        .expect("improve failure event");
    assert_eq!(event.draft, Some(k));
    let notification = Notification::from_event(&event).unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.message, "Service returned HTTP 502: model overloaded");
    assert!(notification.retryable);
}

#[tokio::test]
async fn improvement_rejected_for_non_editable_draft() {
    let h = generated(&[Channel::Facebook]).await;
    h.backend.defer_results();
    let k = key("en", Channel::Facebook);
    h.session.mark_ready(&k).await.unwrap();
    h.session.publish_ready().await.unwrap();

    let result = h.session.improve_draft(&k, "punchier").await;

    assert_matches!(
        result,
        Err(WorkflowError::Core(CoreError::InvalidTransition { .. }))
    );
    assert_eq!(h.backend.improve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_instruction_is_rejected() {
    let h = generated(&[Channel::Facebook]).await;
    let result = h.session.improve_draft(key("en", Channel::Facebook), "   ").await;
    assert_matches!(result, Err(WorkflowError::Core(CoreError::Validation(_))));
}
