use super::*;
use crate::state::test_helpers::test_app_state;

#[test]
fn admin_cannot_demote_self() {
    let me = Uuid::new_v4();
    let update = UserUpdate { role: Some(Role::Teacher), ..UserUpdate::default() };
    assert!(matches!(check_self_update(me, me, &update), Err(UserAdminError::SelfDemotion)));
}

#[test]
fn admin_cannot_deactivate_self() {
    let me = Uuid::new_v4();
    let update = UserUpdate { is_active: Some(false), ..UserUpdate::default() };
    assert!(matches!(check_self_update(me, me, &update), Err(UserAdminError::SelfDeactivation)));
}

#[test]
fn admin_may_rename_self_and_keep_admin_role() {
    let me = Uuid::new_v4();
    let update = UserUpdate { full_name: Some("Head Admin".into()), role: Some(Role::Admin), is_active: Some(true) };
    assert!(check_self_update(me, me, &update).is_ok());
}

#[test]
fn admin_may_demote_others() {
    let update = UserUpdate { role: Some(Role::Parent), is_active: Some(false), ..UserUpdate::default() };
    assert!(check_self_update(Uuid::new_v4(), Uuid::new_v4(), &update).is_ok());
}

#[test]
fn update_changes_store_role_as_text() {
    let update = UserUpdate { role: Some(Role::Treasurer), ..UserUpdate::default() };
    let changes = update.changes().unwrap();
    let pairs: Vec<(&str, crate::store::SqlValue)> = changes.iter().map(|(c, v)| (c, v.clone())).collect();
    assert_eq!(pairs, vec![("role", crate::store::SqlValue::Text("treasurer".into()))]);
}

#[test]
fn blank_name_is_rejected() {
    let update = UserUpdate { full_name: Some(" ".into()), ..UserUpdate::default() };
    assert!(matches!(update.changes(), Err(UserAdminError::MissingName)));
}

#[test]
fn query_filters_role_and_active() {
    let query = UserQuery { role: Some(Role::Teacher), active: Some(true), ..UserQuery::default() };
    assert_eq!(
        query.filters().filters,
        vec![Filter::eq("role", "teacher"), Filter::eq("is_active", true)]
    );
}

#[tokio::test]
async fn self_demotion_is_refused_before_database() {
    let state = test_app_state();
    let me = Uuid::new_v4();
    let update = UserUpdate { role: Some(Role::Principal), ..UserUpdate::default() };
    assert!(matches!(
        super::update(&state.store, me, me, &update).await,
        Err(UserAdminError::SelfDemotion)
    ));
}
