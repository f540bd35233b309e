use super::*;
use crate::models::Student;
#[cfg(feature = "live-db-tests")]
use crate::models::Grade;

#[test]
fn changes_set_replaces_existing_column() {
    let changes = Changes::new().set("first_name", "Ana").set("first_name", "Bea");
    let cols: Vec<_> = changes.iter().collect();
    assert_eq!(cols, vec![("first_name", &SqlValue::Text("Bea".into()))]);
}

#[test]
fn changes_set_opt_skips_none() {
    let changes = Changes::new()
        .set_opt("first_name", None::<String>)
        .set_opt("last_name", Some("Reyes"));
    assert_eq!(changes.iter().count(), 1);
    assert!(Changes::new().set_opt("x", None::<bool>).is_empty());
}

#[test]
fn option_converts_to_null() {
    assert_eq!(SqlValue::from(None::<Uuid>), SqlValue::Null);
    assert_eq!(SqlValue::from(Some(3)), SqlValue::Int(3));
}

#[test]
fn page_computes_offset_and_clamps() {
    let opts = FindOptions::new().page(3, 25);
    assert_eq!(opts.limit, Some(25));
    assert_eq!(opts.offset, Some(50));

    let opts = FindOptions::new().page(0, 10_000);
    assert_eq!(opts.limit, Some(MAX_PAGE_SIZE));
    assert_eq!(opts.offset, Some(0));
}

#[test]
fn knows_column_includes_implicit_columns() {
    assert!(Student::knows_column("id"));
    assert!(Student::knows_column("updated_at"));
    assert!(Student::knows_column("pta_contribution_paid"));
    assert!(!Student::knows_column("password_hash"));
}

#[test]
fn store_error_classification() {
    let err = StoreError::Database(sqlx::Error::PoolTimedOut);
    assert!(err.is_unavailable());
    assert!(!err.is_unique_violation());
    let err = StoreError::UnknownColumn { table: "students", column: "x".into() };
    assert!(!err.is_unavailable());
    assert!(err.to_string().contains("students"));
}

#[tokio::test]
async fn unknown_filter_column_never_reaches_database() {
    let state = crate::state::test_helpers::test_app_state();
    let opts = FindOptions::new().filter(Filter::eq("bogus", 1));
    let err = state.store.find_many::<Student>(&opts).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownColumn { .. }));
}

#[cfg(feature = "live-db-tests")]
async fn live_store() -> Store {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
    let pool = crate::db::init_pool(&url, 2).await.expect("live pool");
    Store::new(pool, crate::retry::RetryPolicy::none())
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn live_crud_cycle() {
    let store = live_store().await;
    let name = format!("Grade {}", Uuid::new_v4());
    let grade: Grade = store
        .create(&Changes::new().set("name", name.clone()).set("level", 99))
        .await
        .unwrap();
    assert_eq!(grade.name, name);

    let found: Option<Grade> = store.find_by_id(grade.id).await.unwrap();
    assert_eq!(found.map(|g| g.level), Some(99));

    let updated: Option<Grade> = store
        .update(grade.id, &Changes::new().set("level", 98))
        .await
        .unwrap();
    assert_eq!(updated.map(|g| g.level), Some(98));

    let hits: Vec<Grade> = store.search(&name[6..14], &[], &FindOptions::new()).await.unwrap();
    assert!(hits.iter().any(|g| g.id == grade.id));

    let n = store.count::<Grade>(&[Filter::eq("name", name.clone())]).await.unwrap();
    assert_eq!(n, 1);

    assert!(store.delete::<Grade>(grade.id).await.unwrap());
    assert!(!store.delete::<Grade>(grade.id).await.unwrap());
}
