//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use chrono::Utc;
use geonotify_core::{
  check::check_location,
  incident::{IncidentUpdate, NewIncident},
  location::{LocationCheckAudit, LocationCheckRequest},
  payload::{DeadLetter, DeliveryTask, WebhookPayload},
  queue::DeliveryQueue,
  store::{AuditLog, IncidentStore, Page, Storage},
};
use tokio_util::sync::CancellationToken;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
    .with_poll_interval(Duration::from_millis(20))
}

fn zone(title: &str, latitude: f64, longitude: f64, radius_m: i64) -> NewIncident {
  NewIncident {
    title: title.into(),
    description: format!("{title} nearby"),
    latitude,
    longitude,
    radius_m,
  }
}

fn task(user_id: i64) -> DeliveryTask {
  DeliveryTask::new(WebhookPayload {
    user_id,
    latitude: 1.0,
    longitude: 2.0,
    locations_ids: vec![1],
    checked_at: Utc::now(),
  })
}

async fn pop(s: &SqliteStore) -> Option<DeliveryTask> {
  s.dequeue(Duration::from_millis(50))
    .await
    .unwrap()
    .map(|raw| DeliveryTask::from_json(&raw).unwrap())
}

// ─── Incidents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_incident() {
  let s = store().await;

  let created = s.create_incident(zone("Flood", 52.0, 13.0, 3)).await.unwrap();
  assert!(created.id > 0);
  assert!(created.active);
  assert_eq!(created.title, "Flood");
  assert_eq!(created.created_at, created.updated_at);

  let fetched = s.get_incident(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_incident_missing_returns_none() {
  let s = store().await;
  assert!(s.get_incident(999).await.unwrap().is_none());
}

#[tokio::test]
async fn create_rejects_invalid_input() {
  let s = store().await;
  let err = s.create_incident(zone("", 0.0, 0.0, 1)).await.unwrap_err();
  assert!(matches!(err, Error::Core(geonotify_core::Error::Validation(_))));

  let err = s.create_incident(zone("Fire", 0.0, 0.0, -5)).await.unwrap_err();
  assert!(matches!(err, Error::Core(geonotify_core::Error::Validation(_))));
}

#[tokio::test]
async fn list_incidents_is_newest_first_and_paginated() {
  let s = store().await;
  for n in 1..=5 {
    s.create_incident(zone(&format!("z{n}"), 0.0, 0.0, 1)).await.unwrap();
  }

  let first = s.list_incidents(Page { page: 1, page_size: 2 }).await.unwrap();
  let titles: Vec<_> = first.iter().map(|i| i.title.as_str()).collect();
  assert_eq!(titles, ["z5", "z4"]);

  let last = s.list_incidents(Page { page: 3, page_size: 2 }).await.unwrap();
  assert_eq!(last.len(), 1);
  assert_eq!(last[0].title, "z1");

  let beyond = s.list_incidents(Page { page: 4, page_size: 2 }).await.unwrap();
  assert!(beyond.is_empty());
}

#[tokio::test]
async fn update_replaces_fields() {
  let s = store().await;
  let created = s.create_incident(zone("Flood", 0.0, 0.0, 1)).await.unwrap();

  let updated = s
    .update_incident(created.id, IncidentUpdate {
      title:       "Flood (receding)".into(),
      description: "smaller".into(),
      latitude:    1.0,
      longitude:   -1.0,
      radius_m:    0,
      active:      true,
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.id, created.id);
  assert_eq!(updated.title, "Flood (receding)");
  assert_eq!(updated.radius_m, 0);
  assert_eq!(updated.created_at, created.created_at);
  assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn update_missing_returns_none() {
  let s = store().await;
  let result = s
    .update_incident(42, IncidentUpdate {
      title:       "ghost".into(),
      description: String::new(),
      latitude:    0.0,
      longitude:   0.0,
      radius_m:    1,
      active:      true,
    })
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn deactivate_hides_incident_from_active_listing_but_keeps_it() {
  let s = store().await;
  let a = s.create_incident(zone("a", 0.0, 0.0, 1)).await.unwrap();
  let b = s.create_incident(zone("b", 0.0, 0.0, 1)).await.unwrap();
  let c = s.create_incident(zone("c", 0.0, 0.0, 1)).await.unwrap();

  assert!(s.deactivate_incident(b.id).await.unwrap());
  assert!(!s.deactivate_incident(999).await.unwrap());

  let active: Vec<i64> = s
    .list_active_incidents()
    .await
    .unwrap()
    .into_iter()
    .map(|i| i.id)
    .collect();
  assert_eq!(active, vec![a.id, c.id]);

  let kept = s.get_incident(b.id).await.unwrap().unwrap();
  assert!(!kept.active);
}

#[tokio::test]
async fn ping_succeeds() {
  let s = store().await;
  s.ping().await.unwrap();
}

// ─── Audit log ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn audit_counts_distinct_users_in_window() {
  let s = store().await;
  let now = Utc::now();

  for (user_id, minutes_ago) in [(1, 1), (1, 2), (2, 3), (3, 120)] {
    s.append_audit(LocationCheckAudit {
      user_id,
      latitude: 0.0,
      longitude: 0.0,
      incident_ids: vec![],
      checked_at: now - chrono::Duration::minutes(minutes_ago),
    })
    .await
    .unwrap();
  }

  let since = now - chrono::Duration::minutes(60);
  assert_eq!(s.count_users_since(since).await.unwrap(), 2);
  assert_eq!(s.count_users_since(now).await.unwrap(), 0);
}

// ─── Queue ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dequeue_returns_what_was_enqueued() {
  let s = store().await;
  let sent = task(7);
  s.enqueue(sent.clone()).await.unwrap();

  let received = pop(&s).await.unwrap();
  assert_eq!(received, sent);
}

#[tokio::test]
async fn dequeue_is_fifo() {
  let s = store().await;
  for user_id in 1..=3 {
    s.enqueue(task(user_id)).await.unwrap();
  }

  let mut order = vec![];
  while let Some(t) = pop(&s).await {
    order.push(t.payload.user_id);
  }
  assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test]
async fn dequeue_on_empty_queue_times_out_with_none() {
  let s = store().await;
  let started = std::time::Instant::now();
  let result = s.dequeue(Duration::from_millis(100)).await.unwrap();
  assert!(result.is_none());
  assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn cancelled_wait_returns_none_promptly() {
  let s = store().await.with_poll_interval(Duration::from_secs(60));
  let cancel = CancellationToken::new();
  let consumer = {
    let s = s.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move { s.dequeue_until(Duration::from_secs(30), &cancel).await })
  };

  tokio::time::sleep(Duration::from_millis(50)).await;
  let started = std::time::Instant::now();
  cancel.cancel();

  let result = tokio::time::timeout(Duration::from_secs(1), consumer)
    .await
    .expect("cancelled dequeue returned")
    .unwrap()
    .unwrap();
  assert!(result.is_none());
  assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn cancelled_consumer_leaves_rows_queued() {
  let s = store().await;
  s.enqueue(task(4)).await.unwrap();

  let cancel = CancellationToken::new();
  cancel.cancel();
  assert!(s.dequeue_until(Duration::from_secs(1), &cancel).await.unwrap().is_none());
  assert_eq!(s.depth().await.unwrap(), 1);

  let raw = s
    .dequeue_until(Duration::from_millis(50), &CancellationToken::new())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(DeliveryTask::from_json(&raw).unwrap().payload.user_id, 4);
}

#[tokio::test]
async fn dequeued_element_is_gone() {
  let s = store().await;
  s.enqueue(task(1)).await.unwrap();
  assert_eq!(s.depth().await.unwrap(), 1);

  assert!(pop(&s).await.is_some());
  assert!(pop(&s).await.is_none());
  assert_eq!(s.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn blocked_dequeue_wakes_on_enqueue() {
  let s = store().await.with_poll_interval(Duration::from_secs(60));
  let consumer = {
    let s = s.clone();
    tokio::spawn(async move { s.dequeue(Duration::from_secs(5)).await })
  };

  tokio::time::sleep(Duration::from_millis(50)).await;
  s.enqueue(task(9)).await.unwrap();

  let raw = tokio::time::timeout(Duration::from_secs(1), consumer)
    .await
    .expect("consumer woke")
    .unwrap()
    .unwrap()
    .unwrap();
  assert_eq!(DeliveryTask::from_json(&raw).unwrap().payload.user_id, 9);
}

#[tokio::test]
async fn requeued_task_waits_until_not_before() {
  let s = store().await;
  let retry = task(1).next_attempt();
  s.requeue(retry.clone(), Utc::now() + chrono::Duration::milliseconds(300))
    .await
    .unwrap();
  s.enqueue(task(2)).await.unwrap();

  // The delayed element is older, but only the fresh one is eligible.
  assert_eq!(pop(&s).await.unwrap().payload.user_id, 2);
  assert!(pop(&s).await.is_none());
  assert_eq!(s.depth().await.unwrap(), 1);

  let later = s.dequeue(Duration::from_secs(2)).await.unwrap().unwrap();
  assert_eq!(DeliveryTask::from_json(&later).unwrap(), retry);
}

#[tokio::test]
async fn competing_consumers_never_share_an_element() {
  let s = store().await;
  for user_id in 0..40 {
    s.enqueue(task(user_id)).await.unwrap();
  }

  let mut handles = vec![];
  for _ in 0..4 {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      let mut seen = vec![];
      while let Some(raw) = s.dequeue(Duration::from_millis(50)).await.unwrap() {
        seen.push(DeliveryTask::from_json(&raw).unwrap().payload.user_id);
      }
      seen
    }));
  }

  let mut all = vec![];
  for h in handles {
    all.extend(h.await.unwrap());
  }
  all.sort_unstable();
  assert_eq!(all, (0..40).collect::<Vec<_>>());
}

#[tokio::test]
async fn dead_letters_are_listed_newest_first() {
  let s = store().await;
  let t = task(5);

  s.dead_letter(DeadLetter {
    delivery_id: None,
    raw:         "{broken".into(),
    reason:      "undecodable".into(),
    attempts:    0,
    failed_at:   Utc::now(),
  })
  .await
  .unwrap();
  s.dead_letter(DeadLetter {
    delivery_id: Some(t.delivery_id),
    raw:         t.to_json().unwrap(),
    reason:      "subscriber returned 400".into(),
    attempts:    1,
    failed_at:   Utc::now(),
  })
  .await
  .unwrap();

  let letters = s.dead_letters(10).await.unwrap();
  assert_eq!(letters.len(), 2);
  assert_eq!(letters[0].delivery_id, Some(t.delivery_id));
  assert_eq!(letters[0].attempts, 1);
  assert_eq!(letters[1].raw, "{broken");

  assert_eq!(s.dead_letters(1).await.unwrap().len(), 1);
}

// ─── Location check end to end ───────────────────────────────────────────────

#[tokio::test]
async fn location_check_enqueues_and_audits() {
  let s = store().await;
  let incident = s.create_incident(zone("Storm", 52.0, 52.0, 100)).await.unwrap();

  let resp = check_location(&s, &s, &s, LocationCheckRequest {
    user_id:   7,
    latitude:  52.0,
    longitude: 52.05,
  })
  .await
  .unwrap();
  assert_eq!(resp.user_id, 7);
  assert_eq!(resp.latitude, 52.0);
  assert_eq!(resp.longitude, 52.05);
  assert_eq!(resp.locations_ids, vec![incident.id]);

  let queued = pop(&s).await.unwrap();
  assert_eq!(queued.payload.user_id, 7);
  assert_eq!(queued.payload.locations_ids, vec![incident.id]);
  assert!(pop(&s).await.is_none());

  let audits = s.audit_records().await.unwrap();
  assert_eq!(audits.len(), 1);
  assert_eq!(audits[0].incident_ids, vec![incident.id]);
}

#[tokio::test]
async fn location_check_without_match_only_audits() {
  let s = store().await;
  s.create_incident(zone("Storm", 52.0, 52.0, 1)).await.unwrap();

  let resp = check_location(&s, &s, &s, LocationCheckRequest {
    user_id:   7,
    latitude:  10.0,
    longitude: 10.0,
  })
  .await
  .unwrap();
  assert!(resp.locations_ids.is_empty());
  assert_eq!(s.depth().await.unwrap(), 0);

  let audits = s.audit_records().await.unwrap();
  assert_eq!(audits.len(), 1);
  assert!(audits[0].incident_ids.is_empty());
}

#[tokio::test]
async fn deactivated_incident_no_longer_matches() {
  let s = store().await;
  let incident = s.create_incident(zone("Storm", 0.0, 0.0, 10)).await.unwrap();
  s.deactivate_incident(incident.id).await.unwrap();

  let resp = check_location(&s, &s, &s, LocationCheckRequest {
    user_id:   1,
    latitude:  0.0,
    longitude: 0.0,
  })
  .await
  .unwrap();
  assert!(resp.locations_ids.is_empty());
}
