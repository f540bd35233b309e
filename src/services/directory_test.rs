use super::*;
use crate::state::test_helpers::test_app_state;

fn columns(changes: &Changes) -> Vec<&'static str> {
    changes.iter().map(|(c, _)| c).collect()
}

#[test]
fn parent_create_requires_full_name() {
    let input = ParentInput { email: Some("mom@example.com".into()), ..ParentInput::default() };
    assert!(matches!(input.changes(true), Err(DirectoryError::MissingField("full_name"))));
}

#[test]
fn parent_update_may_omit_full_name() {
    let input = ParentInput { phone: Some(" 0917 555 0101 ".into()), ..ParentInput::default() };
    let changes = input.changes(false).unwrap();
    assert_eq!(columns(&changes), vec!["phone"]);
    let phone = changes.iter().next().map(|(_, v)| v.clone());
    assert_eq!(phone, Some(crate::store::SqlValue::Text("0917 555 0101".into())));
}

#[test]
fn parent_email_is_normalized() {
    let input = ParentInput {
        full_name: Some("Maria Santos".into()),
        email: Some(" Maria@Example.COM ".into()),
        ..ParentInput::default()
    };
    let changes = input.changes(true).unwrap();
    let email = changes.iter().find(|(c, _)| *c == "email").map(|(_, v)| v.clone());
    assert_eq!(email, Some(crate::store::SqlValue::Text("maria@example.com".into())));
}

#[test]
fn blank_names_are_rejected() {
    assert!(matches!(required("  ", "name"), Err(DirectoryError::MissingField("name"))));
    assert_eq!(required(" Grade 1 ", "name").unwrap(), "Grade 1");
}

#[test]
fn grade_level_defaults_to_zero() {
    let input: GradeInput = serde_json::from_value(serde_json::json!({ "name": "Kinder" })).unwrap();
    assert_eq!(input.level, 0);
}

#[test]
fn category_input_parses_kind() {
    let input: CategoryInput =
        serde_json::from_value(serde_json::json!({ "name": "Field trips", "kind": "expense" })).unwrap();
    assert_eq!(input.kind, CategoryKind::Expense);
}

#[test]
fn error_messages_name_the_thing() {
    assert_eq!(DirectoryError::Duplicate("grade").to_string(), "grade already exists");
    assert_eq!(DirectoryError::NotFound("section").to_string(), "section not found");
}

#[tokio::test]
async fn create_grade_validates_before_database() {
    let state = test_app_state();
    let input = GradeInput { name: String::new(), level: 1 };
    assert!(matches!(
        create_grade(&state.store, &input).await,
        Err(DirectoryError::MissingField("name"))
    ));
}

#[tokio::test]
async fn delete_surfaces_database_failure() {
    let state = test_app_state();
    assert!(matches!(delete_category(&state.store, Uuid::new_v4()).await, Err(DirectoryError::Store(_))));
}
