//! Storage layer tests for the fleet database.

use weaver_core::unix_timestamp;

use super::db::FleetDb;
use super::queries_checkins::NewCheckinParams;
use super::queries_hosts::HostDetailsParams;
use super::queries_registrations::NewRegistrationParams;
use super::queries_work::NewWorkParams;

async fn test_db() -> FleetDb {
    FleetDb::open_in_memory().await.unwrap()
}

/// Insert a registration (and its `unregistered` host row) for `host_id`.
async fn seed_registration(db: &FleetDb, host_id: &str, key_hash: &str) {
    let reg_id = format!("r-{host_id}");
    db.create_registration(&NewRegistrationParams {
        registration_id: &reg_id,
        host_id,
        owner_id: "u1",
        description: "rack host",
        key_hash,
        audit: "operator:alice",
    })
    .await
    .unwrap();
}

/// Insert and confirm a host so it is operational.
async fn seed_host(db: &FleetDb, host_id: &str) {
    seed_registration(db, host_id, "kh").await;
    let confirmed = db
        .confirm_registration(host_id, "kh", "10.0.0.1", "credhash", &format!("host:{host_id}"))
        .await
        .unwrap();
    assert!(confirmed);
}

fn checkin_params(host_id: &str, receive_timestamp: i64) -> NewCheckinParams<'_> {
    NewCheckinParams {
        host_id,
        send_timestamp: receive_timestamp - 1,
        receive_timestamp,
        cpu_usage: 12.5,
        ram_usage: 48.0,
        uptime_secs: 3600,
        network_in_bytes: 1024,
        network_out_bytes: 2048,
    }
}

#[tokio::test]
async fn open_migrates_file_backed_database_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.db");

    {
        let db = FleetDb::open(&path).await.unwrap();
        seed_host(&db, "h1").await;
    }

    // Reopen: migrations are idempotent and committed rows survive.
    let db = FleetDb::open(&path).await.unwrap();
    assert!(db.get_host("h1").await.unwrap().is_confirmed());
}

// === Registration tests ===

#[tokio::test]
async fn create_registration_creates_unregistered_host() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh").await;

    let reg = db.get_registration("r-h1").await.unwrap();
    assert_eq!(reg.host_id, "h1");
    assert_eq!(reg.active, 1);
    assert!(reg.activation_timestamp.is_none());

    let host = db.get_host("h1").await.unwrap();
    assert_eq!(host.current_state, "unregistered");
    assert!(!host.is_confirmed());
}

#[tokio::test]
async fn confirm_registration_redeems_key_once() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh").await;

    let first = db
        .confirm_registration("h1", "kh", "10.0.0.1", "credhash", "host:h1")
        .await
        .unwrap();
    assert!(first);

    let host = db.get_host("h1").await.unwrap();
    assert!(host.is_confirmed());
    assert_eq!(host.current_state, "registered");

    let reg = db.get_registration("r-h1").await.unwrap();
    assert_eq!(reg.active, 0);
    assert!(reg.activation_timestamp.is_some());
    assert_eq!(reg.activation_source_address.as_deref(), Some("10.0.0.1"));

    // The key is spent: a second attempt matches nothing.
    let second = db
        .confirm_registration("h1", "kh", "10.0.0.2", "otherhash", "host:h1")
        .await
        .unwrap();
    assert!(!second);

    // And the first credential is untouched.
    let host = db.get_host("h1").await.unwrap();
    assert_eq!(host.credential_hash.as_deref(), Some("credhash"));
}

#[tokio::test]
async fn confirm_with_wrong_key_changes_nothing() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh").await;

    let confirmed = db
        .confirm_registration("h1", "wrong", "10.0.0.1", "credhash", "host:h1")
        .await
        .unwrap();
    assert!(!confirmed);

    let reg = db.get_registration("r-h1").await.unwrap();
    assert_eq!(reg.active, 1);
    let host = db.get_host("h1").await.unwrap();
    assert!(!host.is_confirmed());
}

#[tokio::test]
async fn confirm_for_deleted_host_rolls_back_key_claim() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh").await;
    assert!(db.remove_host("h1", "operator:alice").await.unwrap().is_some());

    let confirmed = db
        .confirm_registration("h1", "kh", "10.0.0.1", "credhash", "host:h1")
        .await
        .unwrap();
    assert!(!confirmed);

    // The whole transaction rolled back; the key claim did not stick.
    let reg = db.get_registration("r-h1").await.unwrap();
    assert_eq!(reg.active, 1);
}

#[tokio::test]
async fn purge_abandoned_removes_stale_unconfirmed_only() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh1").await;
    seed_host(&db, "h2").await;

    let (regs, hosts) = db
        .purge_abandoned_registrations(unix_timestamp() + 1)
        .await
        .unwrap();
    assert_eq!(regs, 1);
    assert_eq!(hosts, 1);

    assert!(db.get_registration("r-h1").await.is_err());
    assert!(db.get_host("h1").await.is_err());

    // Confirmed host and its (inactive) registration survive any age.
    assert!(db.get_host("h2").await.is_ok());
    assert!(db.get_registration("r-h2").await.is_ok());
}

#[tokio::test]
async fn list_registrations_returns_all() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh1").await;
    seed_registration(&db, "h2", "kh2").await;

    let regs = db.list_registrations().await.unwrap();
    assert_eq!(regs.len(), 2);
}

// === Host tests ===

#[tokio::test]
async fn get_host_excludes_soft_deleted() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    assert!(db.get_host("h1").await.is_ok());
    assert!(db.remove_host("h1", "operator:alice").await.unwrap().is_some());
    assert!(db.get_host("h1").await.is_err());

    // Already gone: second delete is a no-op.
    assert!(db.remove_host("h1", "operator:alice").await.unwrap().is_none());
}

#[tokio::test]
async fn list_hosts_with_state_filter() {
    let db = test_db().await;
    seed_registration(&db, "h1", "kh1").await;
    seed_host(&db, "h2").await;

    let all = db.list_hosts(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let registered = db.list_hosts(Some("registered")).await.unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].id, "h2");

    let unregistered = db.list_hosts(Some("unregistered")).await.unwrap();
    assert_eq!(unregistered.len(), 1);
    assert_eq!(unregistered[0].id, "h1");
}

#[tokio::test]
async fn update_host_profile_leaves_unset_fields() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    let host = db
        .update_host_profile("h1", Some("rack-42"), None, Some("10.1.2.3"), None, "operator:alice")
        .await
        .unwrap();
    assert_eq!(host.friendly_name, "rack-42");
    assert_eq!(host.private_address, "10.1.2.3");
    // Untouched fields keep their values.
    assert_eq!(host.description, "rack host");

    assert!(
        db.update_host_profile("missing", Some("x"), None, None, None, "operator:alice")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn update_host_details_replaces_descriptor() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    db.update_host_details(
        "h1",
        &HostDetailsParams {
            hostname: "node-1.lan",
            os: "Debian 12",
            cpu_info: "8 cores",
            network_info: "eth0",
            storage_info: "1 TiB",
        },
        "host:h1",
    )
    .await
    .unwrap();

    let host = db.get_host("h1").await.unwrap();
    assert_eq!(host.hostname, "node-1.lan");
    assert_eq!(host.os, "Debian 12");
    assert_eq!(host.modified_by, "host:h1");
}

#[tokio::test]
async fn mark_stale_hosts_offline_flips_only_stale_online() {
    let db = test_db().await;
    seed_host(&db, "h1").await;
    seed_host(&db, "h2").await;

    let now = unix_timestamp();
    db.record_checkin(&checkin_params("h1", now - 600), "host:h1")
        .await
        .unwrap();
    db.record_checkin(&checkin_params("h2", now), "host:h2")
        .await
        .unwrap();

    let flipped = db
        .mark_stale_hosts_offline(now - 180, "system")
        .await
        .unwrap();
    assert_eq!(flipped, 1);

    assert_eq!(db.get_host("h1").await.unwrap().current_state, "offline");
    assert_eq!(db.get_host("h2").await.unwrap().current_state, "online");
}

// === Check-in tests ===

#[tokio::test]
async fn record_checkin_appends_and_bumps_host() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    let now = unix_timestamp();
    let checkin = db
        .record_checkin(&checkin_params("h1", now), "host:h1")
        .await
        .unwrap();
    assert_eq!(checkin.host_id, "h1");
    assert_eq!(checkin.receive_timestamp, now);

    let host = db.get_host("h1").await.unwrap();
    assert_eq!(host.current_state, "online");
    assert_eq!(host.last_checkin_at, Some(now));
}

#[tokio::test]
async fn list_checkins_newest_first_with_limit() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    let now = unix_timestamp();
    for i in 0..5 {
        db.record_checkin(&checkin_params("h1", now + i), "host:h1")
            .await
            .unwrap();
    }

    let checkins = db.list_checkins("h1", 3).await.unwrap();
    assert_eq!(checkins.len(), 3);
    assert_eq!(checkins[0].receive_timestamp, now + 4);
    assert!(checkins[0].id > checkins[1].id);
}

#[tokio::test]
async fn purge_checkins_globally_and_per_host() {
    let db = test_db().await;
    seed_host(&db, "h1").await;
    seed_host(&db, "h2").await;

    let now = unix_timestamp();
    db.record_checkin(&checkin_params("h1", now - 100), "host:h1")
        .await
        .unwrap();
    db.record_checkin(&checkin_params("h2", now - 100), "host:h2")
        .await
        .unwrap();
    db.record_checkin(&checkin_params("h2", now), "host:h2")
        .await
        .unwrap();

    let removed = db.purge_checkins_before(now - 50, Some("h2")).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(db.list_checkins("h1", 10).await.unwrap().len(), 1);

    let removed = db.purge_checkins_before(now + 1, None).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(db.list_checkins("h2", 10).await.unwrap().len(), 0);
}

// === Work queue tests ===

async fn enqueue(db: &FleetDb, host_id: &str, data: &str) -> i64 {
    db.create_work_item(&NewWorkParams {
        host_id,
        target_type: "report_status",
        work_data: data,
        audit: "operator:alice",
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn work_ids_increase_monotonically() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    let a = enqueue(&db, "h1", "{}").await;
    let b = enqueue(&db, "h1", "{}").await;
    let c = enqueue(&db, "h1", "{}").await;
    assert!(a < b && b < c);

    let item = db.get_work_item(a).await.unwrap();
    assert_eq!(item.status, "waiting");
    assert_eq!(item.result_data, None);
}

#[tokio::test]
async fn waiting_batch_is_fifo_and_redelivers_unacknowledged() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(enqueue(&db, "h1", &format!("{{\"n\":{i}}}")).await);
    }

    let batch = db.waiting_work_batch("h1", 10).await.unwrap();
    assert_eq!(batch.len(), 10);
    assert_eq!(batch[0].id, ids[0]);
    assert_eq!(batch[9].id, ids[9]);

    // Nothing was claimed: the same batch comes back until acknowledged.
    let again = db.waiting_work_batch("h1", 10).await.unwrap();
    assert_eq!(again.len(), 10);
    assert_eq!(again[0].id, ids[0]);

    for id in &ids[..5] {
        assert!(
            db.try_advance_work_status(*id, "waiting", "picked_up", None, "host:h1")
                .await
                .unwrap()
        );
    }

    let batch = db.waiting_work_batch("h1", 10).await.unwrap();
    assert_eq!(batch.len(), 7);
    assert_eq!(batch[0].id, ids[5]);
    assert_eq!(batch[6].id, ids[11]);
}

#[tokio::test]
async fn try_advance_is_compare_and_set() {
    let db = test_db().await;
    seed_host(&db, "h1").await;
    let id = enqueue(&db, "h1", "{}").await;

    assert!(
        db.try_advance_work_status(id, "waiting", "picked_up", None, "host:h1")
            .await
            .unwrap()
    );

    // A stale retry of the same edge loses and changes nothing.
    assert!(
        !db.try_advance_work_status(id, "waiting", "picked_up", None, "host:h1")
            .await
            .unwrap()
    );
    assert_eq!(db.get_work_item(id).await.unwrap().status, "picked_up");

    assert!(
        db.try_advance_work_status(id, "picked_up", "in_progress", None, "host:h1")
            .await
            .unwrap()
    );
    assert!(
        db.try_advance_work_status(id, "in_progress", "completed", Some("{\"ok\":true}"), "host:h1")
            .await
            .unwrap()
    );

    let item = db.get_work_item(id).await.unwrap();
    assert_eq!(item.status, "completed");
    assert_eq!(item.result_data.as_deref(), Some("{\"ok\":true}"));
}

#[tokio::test]
async fn list_work_filters() {
    let db = test_db().await;
    seed_host(&db, "h1").await;
    seed_host(&db, "h2").await;

    let a = enqueue(&db, "h1", "{}").await;
    enqueue(&db, "h1", "{}").await;
    enqueue(&db, "h2", "{}").await;
    db.try_advance_work_status(a, "waiting", "picked_up", None, "host:h1")
        .await
        .unwrap();

    assert_eq!(db.list_work(None, None).await.unwrap().len(), 3);
    assert_eq!(db.list_work(Some("h1"), None).await.unwrap().len(), 2);
    assert_eq!(db.list_work(None, Some("waiting")).await.unwrap().len(), 2);
    assert_eq!(
        db.list_work(Some("h1"), Some("picked_up")).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn purge_removes_only_terminal_work() {
    let db = test_db().await;
    seed_host(&db, "h1").await;

    let waiting = enqueue(&db, "h1", "{}").await;
    let completed = enqueue(&db, "h1", "{}").await;
    let cancelled = enqueue(&db, "h1", "{}").await;

    db.try_advance_work_status(completed, "waiting", "picked_up", None, "host:h1")
        .await
        .unwrap();
    db.try_advance_work_status(completed, "picked_up", "in_progress", None, "host:h1")
        .await
        .unwrap();
    db.try_advance_work_status(completed, "in_progress", "completed", None, "host:h1")
        .await
        .unwrap();
    db.try_advance_work_status(cancelled, "waiting", "cancelled", None, "operator:alice")
        .await
        .unwrap();

    let removed = db
        .purge_terminal_work_before(unix_timestamp() + 10)
        .await
        .unwrap();
    assert_eq!(removed, 2);

    // The queued item survives no matter how old the cutoff.
    assert!(db.get_work_item(waiting).await.is_ok());
    assert!(db.get_work_item(completed).await.is_err());
    assert!(db.get_work_item(cancelled).await.is_err());
}

#[tokio::test]
async fn remove_host_drops_host_and_its_work_together() {
    let db = test_db().await;
    seed_host(&db, "h1").await;
    seed_host(&db, "h2").await;

    enqueue(&db, "h1", "{}").await;
    enqueue(&db, "h1", "{}").await;
    let keep = enqueue(&db, "h2", "{}").await;

    let removed = db.remove_host("h1", "operator:alice").await.unwrap();
    assert_eq!(removed, Some(2));
    assert!(db.get_host("h1").await.is_err());
    assert_eq!(db.list_work(Some("h1"), None).await.unwrap().len(), 0);

    // The other host's queue is untouched.
    assert!(db.get_work_item(keep).await.is_ok());
}
