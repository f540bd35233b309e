use super::*;
use crate::state::test_helpers::{test_app_state, test_date};

// =============================================================================
// generate_transaction_id
// =============================================================================

#[test]
fn transaction_id_has_prefix_date_and_suffix() {
    let id = generate_transaction_id(Ledger::Income, test_date(1, 15));
    let parts: Vec<&str> = id.split('-').collect();
    assert_eq!(parts.len(), 3, "unexpected id {id}");
    assert_eq!(parts[0], "INC");
    assert_eq!(parts[1], "20260115");
    assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
    assert!(parts[2].bytes().all(|b| ID_ALPHABET.contains(&b)));
}

#[test]
fn expense_ids_use_exp_prefix() {
    assert!(generate_transaction_id(Ledger::Expense, test_date(3, 2)).starts_with("EXP-20260302-"));
}

#[test]
fn transaction_ids_vary() {
    let ids: std::collections::HashSet<String> = (0..20)
        .map(|_| generate_transaction_id(Ledger::Income, test_date(1, 1)))
        .collect();
    assert!(ids.len() > 1);
}

// =============================================================================
// amounts
// =============================================================================

#[test]
fn non_positive_amounts_are_rejected() {
    assert!(matches!(check_amount(Decimal::ZERO), Err(FinanceError::InvalidAmount)));
    assert!(matches!(check_amount(Decimal::from(-5)), Err(FinanceError::InvalidAmount)));
}

#[test]
fn amounts_that_round_to_zero_are_rejected() {
    assert!(matches!(check_amount(Decimal::new(4, 3)), Err(FinanceError::InvalidAmount)));
    assert_eq!(check_amount(Decimal::new(5, 3)).unwrap(), Decimal::new(1, 2));
}

// =============================================================================
// with_fresh_id
// =============================================================================

#[tokio::test]
async fn clashing_ids_are_drawn_again() {
    let mut seen = Vec::new();
    let result: Result<String, &str> = with_fresh_id(Ledger::Income, test_date(1, 15), |e| *e == "clash", |id| {
        seen.push(id.clone());
        let outcome = if seen.len() < 2 { Err("clash") } else { Ok(id) };
        async move { outcome }
    })
    .await;
    assert_eq!(seen.len(), 2);
    assert_eq!(result.unwrap(), seen[1]);
}

#[tokio::test]
async fn id_draws_are_capped() {
    let mut draws = 0;
    let result: Result<(), &str> = with_fresh_id(Ledger::Expense, test_date(1, 15), |e| *e == "clash", |_| {
        draws += 1;
        async { Err("clash") }
    })
    .await;
    assert_eq!(result, Err("clash"));
    assert_eq!(draws, MAX_ID_DRAWS);
}

#[tokio::test]
async fn other_errors_are_not_redrawn() {
    let mut draws = 0;
    let result: Result<(), &str> = with_fresh_id(Ledger::Income, test_date(1, 15), |e| *e == "clash", |_| {
        draws += 1;
        async { Err("down") }
    })
    .await;
    assert_eq!(result, Err("down"));
    assert_eq!(draws, 1);
}

#[test]
fn amounts_are_rounded_to_cents() {
    assert_eq!(check_amount(Decimal::new(12_346, 3)).unwrap(), Decimal::new(1235, 2));
    assert_eq!(check_amount(Decimal::from(250)).unwrap(), Decimal::from(250));
}

// =============================================================================
// TransactionQuery
// =============================================================================

#[test]
fn empty_query_orders_newest_first() {
    let opts = TransactionQuery::default().filters();
    assert!(opts.filters.is_empty());
    assert_eq!(opts.order, Some(OrderBy::desc("transaction_date")));
}

#[test]
fn query_builds_status_category_and_date_filters() {
    let category = Uuid::new_v4();
    let query = TransactionQuery {
        status: Some(TransactionStatus::Approved),
        category_id: Some(category),
        from: Some(test_date(1, 1)),
        to: Some(test_date(1, 31)),
        ..TransactionQuery::default()
    };
    let opts = query.filters();
    assert_eq!(
        opts.filters,
        vec![
            Filter::eq("status", "approved"),
            Filter::eq("category_id", category),
            Filter::gte("transaction_date", test_date(1, 1)),
            Filter::lte("transaction_date", test_date(1, 31)),
        ]
    );
}

#[test]
fn query_deserializes_from_url_params() {
    let query: TransactionQuery =
        serde_json::from_value(serde_json::json!({ "status": "pending", "from": "2026-02-01", "page": 2 })).unwrap();
    assert_eq!(query.status, Some(TransactionStatus::Pending));
    assert_eq!(query.from, Some(test_date(2, 1)));
    assert_eq!(query.page, Some(2));
}

// =============================================================================
// patches
// =============================================================================

#[test]
fn patch_with_blank_description_is_rejected() {
    let patch = TransactionPatch { description: Some("   ".into()), ..TransactionPatch::default() };
    assert!(matches!(patch.changes(), Err(FinanceError::MissingDescription)));
}

#[test]
fn patch_only_sets_given_fields() {
    let patch = TransactionPatch { amount: Some(Decimal::from(75)), ..TransactionPatch::default() };
    let changes = patch.changes().unwrap();
    let columns: Vec<&str> = changes.iter().map(|(c, _)| c).collect();
    assert_eq!(columns, vec!["amount"]);
}

#[test]
fn new_income_accepts_string_amounts() {
    let input: NewIncome =
        serde_json::from_value(serde_json::json!({ "amount": "250.50", "description": "Donation" })).unwrap();
    assert_eq!(input.amount, Decimal::new(25050, 2));
    assert!(input.status.is_none());
}

// =============================================================================
// validation happens before any database call
// =============================================================================

#[tokio::test]
async fn create_income_rejects_zero_amount() {
    let state = test_app_state();
    let input = NewIncome {
        amount: Decimal::ZERO,
        description: "Bake sale".into(),
        notes: None,
        transaction_date: None,
        status: None,
        category_id: None,
        student_id: None,
    };
    let err = create_income(&state.store, &input, None).await.unwrap_err();
    assert!(matches!(err, FinanceError::InvalidAmount));
}

#[tokio::test]
async fn create_expense_requires_description() {
    let state = test_app_state();
    let input = NewExpense {
        amount: Decimal::from(100),
        description: String::new(),
        notes: None,
        payee: None,
        transaction_date: None,
        status: None,
        category_id: None,
    };
    let err = create_expense(&state.store, &input, None).await.unwrap_err();
    assert!(matches!(err, FinanceError::MissingDescription));
}

#[tokio::test]
async fn store_failures_surface_as_store_errors() {
    let state = test_app_state();
    let err = set_income_status(&state.store, Uuid::new_v4(), TransactionStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, FinanceError::Store(_)));
}
