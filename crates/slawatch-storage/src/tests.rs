use chrono::{DateTime, Duration, TimeZone, Utc};
use slawatch_common::types::{
    Attachment, BreachKind, Comment, IncidentPriority, IncidentStatus, SlaStatus, User,
};
use slawatch_sla::incident::Incident;
use slawatch_sla::policy::SlaPolicy;
use slawatch_sla::sla::Sla;
use tempfile::TempDir;

use crate::error::StorageError;
use crate::store::{IncidentFilter, IncidentStore};

async fn setup() -> (TempDir, IncidentStore) {
    slawatch_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}/slawatch.db?mode=rwc", dir.path().display());
    let store = IncidentStore::new(&db_url, dir.path()).await.unwrap();
    (dir, store)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

fn make_pair(
    title: &str,
    priority: IncidentPriority,
    created_at: DateTime<Utc>,
) -> (Incident, Sla) {
    let incident = Incident::new(
        slawatch_common::id::next_id(),
        title.to_string(),
        format!("details for {title}"),
        priority,
        "reporter-1".to_string(),
        created_at,
    );
    let deadlines = SlaPolicy::default().deadlines_for(priority);
    let sla = Sla::new(
        slawatch_common::id::next_id(),
        incident.id.clone(),
        created_at,
        deadlines,
    );
    (incident, sla)
}

fn make_user(email: &str, username: &str) -> User {
    User {
        id: slawatch_common::id::next_id(),
        email: email.to_string(),
        username: username.to_string(),
        full_name: None,
        active: true,
        created_at: t0(),
        updated_at: t0(),
    }
}

#[tokio::test]
async fn save_and_load_incident_with_sla() {
    let (_dir, store) = setup().await;
    let (incident, sla) = make_pair("Checkout latency spike", IncidentPriority::Critical, t0());

    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    let loaded = store.get_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(loaded, incident);

    let loaded_sla = store
        .get_sla_for_incident(&incident.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded_sla, sla);
    assert_eq!(loaded_sla.response_deadline, t0() + Duration::hours(1));
    assert_eq!(loaded_sla.resolution_deadline, t0() + Duration::hours(4));
    assert_eq!(loaded_sla.version, 0);
}

#[tokio::test]
async fn soft_delete_hides_incident_but_keeps_rows() {
    let (_dir, store) = setup().await;
    let (incident, sla) = make_pair("Stale search results", IncidentPriority::Medium, t0());
    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    assert!(store
        .soft_delete_incident(&incident.id, t0() + Duration::minutes(5))
        .await
        .unwrap());
    assert!(store.get_incident(&incident.id).await.unwrap().is_none());

    // Second delete is a no-op
    assert!(!store
        .soft_delete_incident(&incident.id, t0() + Duration::minutes(6))
        .await
        .unwrap());

    // The SLA row survives until the retention purge cascades it away
    assert!(store
        .get_sla_for_incident(&incident.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn list_incidents_filters() {
    let (_dir, store) = setup().await;
    let (gateway, s1) = make_pair("Payment gateway down", IncidentPriority::Critical, t0());
    let (mut login, s2) = make_pair(
        "Login page slow",
        IncidentPriority::High,
        t0() + Duration::minutes(1),
    );
    let (search, s3) = make_pair(
        "Search index lag",
        IncidentPriority::Medium,
        t0() + Duration::minutes(2),
    );
    login.assign("user-7".to_string(), t0() + Duration::minutes(3));
    store.save_incident_and_sla(&gateway, &s1).await.unwrap();
    store.save_incident_and_sla(&login, &s2).await.unwrap();
    store.save_incident_and_sla(&search, &s3).await.unwrap();

    let (open, total) = store
        .list_incidents(
            &IncidentFilter {
                status_eq: Some(IncidentStatus::Open),
                ..Default::default()
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(open.iter().all(|i| i.status == IncidentStatus::Open));

    let (critical, _) = store
        .list_incidents(
            &IncidentFilter {
                priority_eq: Some(IncidentPriority::Critical),
                ..Default::default()
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].id, gateway.id);

    let (assigned, _) = store
        .list_incidents(
            &IncidentFilter {
                assignee_id_eq: Some("user-7".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, login.id);

    let (found, _) = store
        .list_incidents(
            &IncidentFilter {
                search: Some("gateway".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, gateway.id);

    // Soft-deleted rows drop out of both the page and the total
    store.soft_delete_incident(&search.id, t0()).await.unwrap();
    let (all, total) = store
        .list_incidents(&IncidentFilter::default(), 100, 0)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(all.iter().all(|i| i.id != search.id));
}

#[tokio::test]
async fn list_incidents_paginates_newest_first() {
    let (_dir, store) = setup().await;
    for i in 0..5 {
        let (incident, sla) = make_pair(
            &format!("Incident {i}"),
            IncidentPriority::Low,
            t0() + Duration::minutes(i),
        );
        store.save_incident_and_sla(&incident, &sla).await.unwrap();
    }

    let (page1, total) = store
        .list_incidents(&IncidentFilter::default(), 2, 0)
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].title, "Incident 4");
    assert!(page1[0].created_at >= page1[1].created_at);

    let (page2, _) = store
        .list_incidents(&IncidentFilter::default(), 2, 2)
        .await
        .unwrap();
    assert_eq!(page2.len(), 2);
    assert_ne!(page1[0].id, page2[0].id);

    let (page3, _) = store
        .list_incidents(&IncidentFilter::default(), 2, 4)
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);
}

#[tokio::test]
async fn update_incident_persists_changes() {
    let (_dir, store) = setup().await;
    let (mut incident, sla) = make_pair("API 500s on login", IncidentPriority::High, t0());
    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    incident.set_status(IncidentStatus::Resolved, t0() + Duration::hours(2));
    store.update_incident(&incident).await.unwrap();

    let loaded = store.get_incident(&incident.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, IncidentStatus::Resolved);
    assert_eq!(loaded.resolved_at, Some(t0() + Duration::hours(2)));
}

#[tokio::test]
async fn update_missing_incident_is_not_found() {
    let (_dir, store) = setup().await;
    let (incident, _) = make_pair("Never persisted", IncidentPriority::Low, t0());

    let err = store.update_incident(&incident).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { entity: "incident", .. }));
}

#[tokio::test]
async fn update_sla_cas_detects_lost_race() {
    let (_dir, store) = setup().await;
    let (incident, sla) = make_pair("Queue backlog", IncidentPriority::High, t0());
    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    let mut first = store
        .get_sla_for_incident(&incident.id)
        .await
        .unwrap()
        .unwrap();
    let mut second = first.clone();

    first.record_response(t0() + Duration::minutes(10)).unwrap();
    store.update_sla(&mut first).await.unwrap();
    assert_eq!(first.version, 1);

    // The stale copy still carries version 0 and must lose
    second.pause(t0() + Duration::minutes(12)).unwrap();
    let err = store.update_sla(&mut second).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { entity: "sla", .. }));

    let loaded = store
        .get_sla_for_incident(&incident.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.status, SlaStatus::Active);
    assert_eq!(loaded.response_at, Some(t0() + Duration::minutes(10)));
    assert_eq!(loaded.version, 1);
}

#[tokio::test]
async fn breach_scan_selects_overdue_response() {
    let (_dir, store) = setup().await;
    let assignee = make_user("oncall@example.com", "oncall");
    store.insert_user(&assignee).await.unwrap();

    // Critical response deadline is t0+1h; high is t0+4h
    let (mut overdue, s1) = make_pair("Primary DB down", IncidentPriority::Critical, t0());
    overdue.assign(assignee.id.clone(), t0());
    let (fresh, s2) = make_pair("Minor UI glitch", IncidentPriority::High, t0());
    store.save_incident_and_sla(&overdue, &s1).await.unwrap();
    store.save_incident_and_sla(&fresh, &s2).await.unwrap();

    let candidates = store
        .find_breach_candidates(t0() + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].incident.id, overdue.id);
    assert_eq!(candidates[0].sla.breach_kind(), BreachKind::Response);
    assert_eq!(
        candidates[0].assignee.as_ref().map(|u| u.email.as_str()),
        Some("oncall@example.com")
    );
}

#[tokio::test]
async fn breach_scan_keeps_unassigned_candidates_without_assignee() {
    let (_dir, store) = setup().await;
    let (incident, sla) = make_pair("Unassigned outage", IncidentPriority::Critical, t0());
    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    // The breach is still claimable, there is just nobody to notify
    let candidates = store
        .find_breach_candidates(t0() + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].incident.id, incident.id);
    assert!(candidates[0].assignee.is_none());
}

#[tokio::test]
async fn breach_scan_skips_paused_settled_and_deleted() {
    let (_dir, store) = setup().await;
    let now = t0() + Duration::hours(2);

    let (paused_incident, paused_sla) =
        make_pair("Paused on customer", IncidentPriority::Critical, t0());
    let (met_incident, met_sla) = make_pair("Fixed quickly", IncidentPriority::Critical, t0());
    let (claimed_incident, claimed_sla) =
        make_pair("Already notified", IncidentPriority::Critical, t0());
    let (gone_incident, gone_sla) = make_pair("Deleted anyway", IncidentPriority::Critical, t0());
    let (live_incident, live_sla) = make_pair("Still burning", IncidentPriority::Critical, t0());
    for (i, s) in [
        (&paused_incident, &paused_sla),
        (&met_incident, &met_sla),
        (&claimed_incident, &claimed_sla),
        (&gone_incident, &gone_sla),
        (&live_incident, &live_sla),
    ] {
        store.save_incident_and_sla(i, s).await.unwrap();
    }

    let mut sla = store
        .get_sla_for_incident(&paused_incident.id)
        .await
        .unwrap()
        .unwrap();
    sla.pause(t0() + Duration::minutes(10)).unwrap();
    store.update_sla(&mut sla).await.unwrap();

    let mut sla = store
        .get_sla_for_incident(&met_incident.id)
        .await
        .unwrap()
        .unwrap();
    assert!(sla.record_resolution(t0() + Duration::minutes(30)).unwrap());
    store.update_sla(&mut sla).await.unwrap();

    let mut sla = store
        .get_sla_for_incident(&claimed_incident.id)
        .await
        .unwrap()
        .unwrap();
    sla.mark_breached(t0() + Duration::minutes(90)).unwrap();
    store.update_sla(&mut sla).await.unwrap();

    store.soft_delete_incident(&gone_incident.id, t0()).await.unwrap();

    let candidates = store.find_breach_candidates(now).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].incident.id, live_incident.id);
}

#[tokio::test]
async fn breach_scan_response_arm_fires_for_resolved_incident() {
    let (_dir, store) = setup().await;

    // Resolved incident, but nobody ever recorded a first response
    let (mut unanswered, s1) = make_pair("Resolved unanswered", IncidentPriority::Critical, t0());
    store.save_incident_and_sla(&unanswered, &s1).await.unwrap();
    unanswered.set_status(IncidentStatus::Resolved, t0() + Duration::minutes(30));
    store.update_incident(&unanswered).await.unwrap();

    // Resolved incident with a response: neither arm applies even though
    // the resolution deadline has long passed
    let (mut answered, s2) = make_pair("Resolved answered", IncidentPriority::Critical, t0());
    store.save_incident_and_sla(&answered, &s2).await.unwrap();
    answered.set_status(IncidentStatus::Resolved, t0() + Duration::minutes(40));
    store.update_incident(&answered).await.unwrap();
    let mut sla = store
        .get_sla_for_incident(&answered.id)
        .await
        .unwrap()
        .unwrap();
    sla.record_response(t0() + Duration::minutes(5)).unwrap();
    store.update_sla(&mut sla).await.unwrap();

    let candidates = store
        .find_breach_candidates(t0() + Duration::hours(5))
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].incident.id, unanswered.id);
    assert_eq!(candidates[0].sla.breach_kind(), BreachKind::Response);
}

#[tokio::test]
async fn warning_scan_windows_depend_on_priority() {
    let (_dir, store) = setup().await;
    let now = t0() + Duration::hours(100);

    // High resolution budget is 24h, medium is 72h
    let (high_in, s1) = make_pair(
        "High due soon",
        IncidentPriority::High,
        now - Duration::hours(23) - Duration::minutes(30),
    );
    let (high_out, s2) = make_pair("High due later", IncidentPriority::High, now - Duration::hours(22));
    let (med_in, s3) = make_pair("Medium due soon", IncidentPriority::Medium, now - Duration::hours(69));
    let (med_out, s4) = make_pair("Medium due later", IncidentPriority::Medium, now - Duration::hours(48));
    let (overdue, s5) = make_pair("High already over", IncidentPriority::High, now - Duration::hours(25));
    let (mut resolved, s6) = make_pair(
        "High resolved",
        IncidentPriority::High,
        now - Duration::hours(23) - Duration::minutes(30),
    );
    for (i, s) in [
        (&high_in, &s1),
        (&high_out, &s2),
        (&med_in, &s3),
        (&med_out, &s4),
        (&overdue, &s5),
        (&resolved, &s6),
    ] {
        store.save_incident_and_sla(i, s).await.unwrap();
    }
    resolved.set_status(IncidentStatus::Resolved, now - Duration::minutes(5));
    store.update_incident(&resolved).await.unwrap();

    let candidates = store.find_warning_candidates(now).await.unwrap();
    let mut ids: Vec<&str> = candidates.iter().map(|c| c.incident.id.as_str()).collect();
    ids.sort_unstable();
    let mut expected = vec![high_in.id.as_str(), med_in.id.as_str()];
    expected.sort_unstable();
    assert_eq!(ids, expected);

    // Warnings are not deduplicated; the next pass sees them again
    let again = store.find_warning_candidates(now).await.unwrap();
    assert_eq!(again.len(), candidates.len());
}

#[tokio::test]
async fn users_round_trip_and_unique_email() {
    let (_dir, store) = setup().await;
    let bart = make_user("bart@example.com", "bart");
    let alice = make_user("alice@example.com", "alice");
    store.insert_user(&bart).await.unwrap();
    store.insert_user(&alice).await.unwrap();

    assert_eq!(store.get_user(&bart.id).await.unwrap().unwrap(), bart);
    assert_eq!(
        store
            .find_user_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap()
            .id,
        alice.id
    );
    assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    assert_eq!(store.count_users().await.unwrap(), 2);

    let users = store.list_users().await.unwrap();
    assert_eq!(users[0].username, "alice");
    assert_eq!(users[1].username, "bart");

    let mut dup = make_user("alice@example.com", "alice2");
    dup.id = slawatch_common::id::next_id();
    let err = store.insert_user(&dup).await.unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));
}

#[tokio::test]
async fn comments_list_in_chronological_order() {
    let (_dir, store) = setup().await;
    let (incident, sla) = make_pair("Needs notes", IncidentPriority::Medium, t0());
    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    let later = Comment {
        id: slawatch_common::id::next_id(),
        incident_id: incident.id.clone(),
        author_id: "user-1".to_string(),
        content: "rolled back the deploy".to_string(),
        is_internal: false,
        created_at: t0() + Duration::minutes(20),
        updated_at: t0() + Duration::minutes(20),
    };
    let earlier = Comment {
        id: slawatch_common::id::next_id(),
        incident_id: incident.id.clone(),
        author_id: "user-2".to_string(),
        content: "looking into it".to_string(),
        is_internal: true,
        created_at: t0() + Duration::minutes(10),
        updated_at: t0() + Duration::minutes(10),
    };
    store.insert_comment(&later).await.unwrap();
    store.insert_comment(&earlier).await.unwrap();

    let comments = store.list_comments(&incident.id).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].content, "looking into it");
    assert!(comments[0].is_internal);
    assert_eq!(comments[1].content, "rolled back the deploy");
}

#[tokio::test]
async fn attachments_round_trip() {
    let (_dir, store) = setup().await;
    let (incident, sla) = make_pair("With evidence", IncidentPriority::Low, t0());
    store.save_incident_and_sla(&incident, &sla).await.unwrap();

    let attachment = Attachment {
        id: slawatch_common::id::next_id(),
        incident_id: incident.id.clone(),
        filename: "heap-dump.txt".to_string(),
        file_path: "data/uploads/heap-dump.txt".to_string(),
        file_size: 2048,
        content_type: Some("text/plain".to_string()),
        uploaded_by: "user-1".to_string(),
        created_at: t0(),
    };
    store.insert_attachment(&attachment).await.unwrap();

    let listed = store.list_attachments(&incident.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], attachment);
    assert!(store.list_attachments("missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn purge_cascades_expired_soft_deletes_only() {
    let (_dir, store) = setup().await;
    let (expired, s1) = make_pair("Old and deleted", IncidentPriority::Low, t0());
    let (recent, s2) = make_pair("Freshly deleted", IncidentPriority::Low, t0());
    let (live, s3) = make_pair("Still live", IncidentPriority::Low, t0());
    store.save_incident_and_sla(&expired, &s1).await.unwrap();
    store.save_incident_and_sla(&recent, &s2).await.unwrap();
    store.save_incident_and_sla(&live, &s3).await.unwrap();

    let note = Comment {
        id: slawatch_common::id::next_id(),
        incident_id: expired.id.clone(),
        author_id: "user-1".to_string(),
        content: "will be purged".to_string(),
        is_internal: false,
        created_at: t0(),
        updated_at: t0(),
    };
    store.insert_comment(&note).await.unwrap();

    store
        .soft_delete_incident(&expired.id, t0() + Duration::days(1))
        .await
        .unwrap();
    store
        .soft_delete_incident(&recent.id, t0() + Duration::days(40))
        .await
        .unwrap();

    // Cutoff falls between the two deletion stamps
    let purged = store
        .purge_soft_deleted(t0() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(purged, 1);

    assert!(store
        .get_sla_for_incident(&expired.id)
        .await
        .unwrap()
        .is_none());
    assert!(store.list_comments(&expired.id).await.unwrap().is_empty());
    assert!(store
        .get_sla_for_incident(&recent.id)
        .await
        .unwrap()
        .is_some());
    assert!(store.get_incident(&live.id).await.unwrap().is_some());
}

#[tokio::test]
async fn incident_stats_count_live_rows() {
    let (_dir, store) = setup().await;
    let (open_inc, s1) = make_pair("Open critical", IncidentPriority::Critical, t0());
    let (mut working, s2) = make_pair("Being worked", IncidentPriority::High, t0());
    let (mut done, s3) = make_pair("Resolved medium", IncidentPriority::Medium, t0());
    let (hidden, s4) = make_pair("Deleted low", IncidentPriority::Low, t0());
    working.assign("user-1".to_string(), t0());
    store.save_incident_and_sla(&open_inc, &s1).await.unwrap();
    store.save_incident_and_sla(&working, &s2).await.unwrap();
    store.save_incident_and_sla(&done, &s3).await.unwrap();
    store.save_incident_and_sla(&hidden, &s4).await.unwrap();

    done.set_status(IncidentStatus::Resolved, t0() + Duration::hours(1));
    store.update_incident(&done).await.unwrap();
    store.soft_delete_incident(&hidden.id, t0()).await.unwrap();

    let stats = store.incident_stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.open, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.closed, 0);
    assert_eq!(stats.critical, 1);
    assert_eq!(stats.high, 1);
    assert_eq!(stats.medium, 1);
    assert_eq!(stats.low, 0);
}
