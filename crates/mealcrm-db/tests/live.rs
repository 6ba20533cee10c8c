//! Live integration tests for mealcrm-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database. The
//! `migrations` path is relative to `crates/mealcrm-db/`.

use chrono::{NaiveDate, TimeZone, Utc};
use mealcrm_core::ClientSource;
use mealcrm_db::{
    apply_order_event, complete_sync_run, create_manual_client, create_manual_order,
    delete_manual_client, delete_manual_order, fail_sync_run, get_cached_client,
    get_cached_client_by_email, get_manual_client, list_manual_orders, list_recent_sync_runs,
    start_sync_run, update_manual_client, update_manual_order_status, upsert_cached_clients,
    CachedClientUpsert, DbError, ManualClientUpdate, ManualOrderFilters, NewManualClient,
    NewManualOrder, OrderEvent, OrderEventOutcome, SyncRunStats,
};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_client(email: &str) -> NewManualClient<'_> {
    NewManualClient {
        first_name: "Ana",
        last_name: "Petrovic",
        email,
        phone: Some("0643073023"),
        address: Some("Bulevar 1"),
        city: Some("Novi Sad"),
        postcode: None,
    }
}

fn new_order(client_id: Uuid) -> NewManualOrder<'static> {
    NewManualOrder {
        client_id,
        product_name: "Fit plan",
        start_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
        duration_days: 20,
        address: "Bulevar 1",
        payment_method: "cash",
        status: None,
        customer_note: None,
    }
}

fn aggregate(email: &str, order_count: i32, order_ids: Vec<i64>) -> CachedClientUpsert {
    CachedClientUpsert {
        email: email.to_string(),
        phone: Some("0643073023".to_string()),
        first_name: "Ana".to_string(),
        last_name: "Petrovic".to_string(),
        address: None,
        city: Some("Novi Sad".to_string()),
        wc_customer_id: Some(5),
        source: ClientSource::Registered,
        order_count,
        last_order_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        order_ids,
    }
}

fn event(order_id: i64, email: &str) -> OrderEvent<'_> {
    OrderEvent {
        order_id,
        email,
        phone: Some("0643073023"),
        first_name: "Ana",
        last_name: "Petrovic",
        address: Some("Bulevar 1"),
        city: Some("Novi Sad"),
        wc_customer_id: None,
        date_created: Some(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()),
    }
}

async fn count_manual_orders(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM manual_orders")
        .fetch_one(pool)
        .await
        .expect("count manual_orders")
}

// ---------------------------------------------------------------------------
// Manual clients and orders
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_manual_client_email_is_unique_violation(pool: PgPool) {
    create_manual_client(&pool, &new_client("ana@example.com"))
        .await
        .expect("first insert");

    let err = create_manual_client(&pool, &new_client("ana@example.com"))
        .await
        .expect_err("duplicate email should fail");
    assert!(err.is_unique_violation(), "got: {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_manual_client_applies_sparse_changes(pool: PgPool) {
    let created = create_manual_client(&pool, &new_client("ana@example.com"))
        .await
        .expect("insert");

    let updated = update_manual_client(
        &pool,
        created.id,
        &ManualClientUpdate {
            city: Some(Some("Beograd")),
            phone: Some(None),
            ..ManualClientUpdate::default()
        },
    )
    .await
    .expect("update");

    assert_eq!(updated.city.as_deref(), Some("Beograd"));
    assert_eq!(updated.phone, None);
    assert_eq!(updated.address.as_deref(), Some("Bulevar 1"));
    assert_eq!(updated.first_name, "Ana");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_missing_manual_client_is_not_found(pool: PgPool) {
    let err = update_manual_client(&pool, Uuid::new_v4(), &ManualClientUpdate::default())
        .await
        .expect_err("should fail");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_manual_client_with_order_is_rejected(pool: PgPool) {
    let client = create_manual_client(&pool, &new_client("ana@example.com"))
        .await
        .expect("insert client");
    create_manual_order(&pool, &new_order(client.id))
        .await
        .expect("insert order");

    let err = delete_manual_client(&pool, client.id)
        .await
        .expect_err("delete should be guarded");
    assert!(
        matches!(
            err,
            DbError::HasDependents {
                entity: "client",
                count: 1
            }
        ),
        "got: {err:?}"
    );

    assert!(get_manual_client(&pool, client.id)
        .await
        .expect("get")
        .is_some());
    assert_eq!(count_manual_orders(&pool).await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_manual_client_without_orders_succeeds(pool: PgPool) {
    let client = create_manual_client(&pool, &new_client("ana@example.com"))
        .await
        .expect("insert client");
    let order = create_manual_order(&pool, &new_order(client.id))
        .await
        .expect("insert order");
    delete_manual_order(&pool, order.id)
        .await
        .expect("delete order");

    delete_manual_client(&pool, client.id)
        .await
        .expect("delete client");
    assert!(get_manual_client(&pool, client.id)
        .await
        .expect("get")
        .is_none());

    let err = delete_manual_client(&pool, client.id)
        .await
        .expect_err("second delete");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn manual_order_for_unknown_client_is_not_found(pool: PgPool) {
    let err = create_manual_order(&pool, &new_order(Uuid::new_v4()))
        .await
        .expect_err("fk should fail");
    assert!(matches!(err, DbError::NotFound), "got: {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn manual_orders_filter_by_status(pool: PgPool) {
    let client = create_manual_client(&pool, &new_client("ana@example.com"))
        .await
        .expect("insert client");
    let first = create_manual_order(&pool, &new_order(client.id))
        .await
        .expect("order 1");
    create_manual_order(&pool, &new_order(client.id))
        .await
        .expect("order 2");
    assert_eq!(first.status, "pending");

    update_manual_order_status(&pool, first.id, "delivered")
        .await
        .expect("status");

    let delivered = list_manual_orders(
        &pool,
        &ManualOrderFilters {
            client_id: Some(client.id),
            status: Some("delivered"),
            limit: 50,
            offset: 0,
        },
    )
    .await
    .expect("list");
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].id, first.id);
}

// ---------------------------------------------------------------------------
// Cached clients
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn full_upsert_overwrites_existing_row(pool: PgPool) {
    upsert_cached_clients(&pool, &[aggregate("a@x.com", 7, vec![1, 2])])
        .await
        .expect("first upsert");

    let mut replacement = aggregate("a@x.com", 2, vec![1, 2]);
    replacement.phone = None;
    replacement.source = ClientSource::Guest;
    replacement.wc_customer_id = None;
    let written = upsert_cached_clients(&pool, &[replacement])
        .await
        .expect("second upsert");
    assert_eq!(written, 1);

    let row = get_cached_client_by_email(&pool, "a@x.com")
        .await
        .expect("get")
        .expect("row exists");
    assert_eq!(row.order_count, 2);
    assert_eq!(row.phone, None);
    assert_eq!(row.source, "guest");
    assert_eq!(row.wc_customer_id, None);

    let by_id = get_cached_client(&pool, row.id)
        .await
        .expect("get by id")
        .expect("row exists");
    assert_eq!(by_id.email, "a@x.com");
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_event_increments_once_per_order_id(pool: PgPool) {
    upsert_cached_clients(&pool, &[aggregate("a@x.com", 2, vec![1, 2])])
        .await
        .expect("sync");

    let outcome = apply_order_event(&pool, &event(3, "a@x.com"))
        .await
        .expect("first delivery");
    assert_eq!(outcome, OrderEventOutcome::Counted { order_count: 3 });

    let outcome = apply_order_event(&pool, &event(3, "a@x.com"))
        .await
        .expect("redelivery");
    assert_eq!(outcome, OrderEventOutcome::Duplicate { order_count: 3 });

    let row = get_cached_client_by_email(&pool, "a@x.com")
        .await
        .expect("get")
        .expect("row exists");
    assert_eq!(row.order_count, 3);
    assert_eq!(
        row.last_order_date,
        Some(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap())
    );
    // Registered source from the sync survives a guest order.
    assert_eq!(row.source, "registered");
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_event_already_covered_by_sync_is_duplicate(pool: PgPool) {
    upsert_cached_clients(&pool, &[aggregate("a@x.com", 2, vec![1, 2])])
        .await
        .expect("sync");

    let outcome = apply_order_event(&pool, &event(2, "a@x.com"))
        .await
        .expect("event");
    assert_eq!(outcome, OrderEventOutcome::Duplicate { order_count: 2 });
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_event_for_new_email_starts_at_one(pool: PgPool) {
    let outcome = apply_order_event(&pool, &event(10, "new@x.com"))
        .await
        .expect("event");
    assert_eq!(outcome.order_count(), 1);

    let row = get_cached_client_by_email(&pool, "new@x.com")
        .await
        .expect("get")
        .expect("row exists");
    assert_eq!(row.source, "guest");
    assert_eq!(row.city.as_deref(), Some("Novi Sad"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_event_for_removed_row_recreates_it_at_one(pool: PgPool) {
    upsert_cached_clients(&pool, &[aggregate("a@x.com", 1, vec![7])])
        .await
        .expect("sync");
    sqlx::query("DELETE FROM cached_clients WHERE email = $1")
        .bind("a@x.com")
        .execute(&pool)
        .await
        .expect("delete row");

    let outcome = apply_order_event(&pool, &event(7, "a@x.com"))
        .await
        .expect("event");
    assert_eq!(outcome, OrderEventOutcome::Duplicate { order_count: 1 });

    let row = get_cached_client_by_email(&pool, "a@x.com")
        .await
        .expect("get")
        .expect("row recreated");
    assert_eq!(row.order_count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn older_order_event_keeps_newer_last_order_date(pool: PgPool) {
    apply_order_event(&pool, &event(10, "a@x.com"))
        .await
        .expect("newer");

    let mut older = event(11, "a@x.com");
    older.date_created = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    apply_order_event(&pool, &older).await.expect("older");

    let row = get_cached_client_by_email(&pool, "a@x.com")
        .await
        .expect("get")
        .expect("row exists");
    assert_eq!(row.order_count, 2);
    assert_eq!(
        row.last_order_date,
        Some(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap())
    );
}

// ---------------------------------------------------------------------------
// Sync runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn sync_run_lifecycle(pool: PgPool) {
    let run = start_sync_run(&pool, "cli").await.expect("start");
    assert_eq!(run.status, "running");

    complete_sync_run(
        &pool,
        run.id,
        SyncRunStats {
            pages_fetched: 2,
            orders_seen: 150,
            clients_upserted: 90,
            failed_batches: 0,
        },
        None,
    )
    .await
    .expect("complete");

    let runs = list_recent_sync_runs(&pool, 10).await.expect("list");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "succeeded");
    assert_eq!(runs[0].orders_seen, 150);
    assert!(runs[0].completed_at.is_some());

    let err = fail_sync_run(&pool, run.id, "late failure")
        .await
        .expect_err("already completed");
    assert!(matches!(err, DbError::InvalidSyncRunTransition { .. }));
}
