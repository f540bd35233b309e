use super::*;
use chrono::Utc;
use crate::models::CategoryKind;
use crate::state::test_helpers::{dummy_expense, dummy_income, dummy_student, test_date};

fn category(name: &str, kind: CategoryKind) -> Category {
    Category { id: Uuid::new_v4(), name: name.into(), kind, created_at: Utc::now() }
}

fn grade(name: &str, level: i32) -> Grade {
    Grade { id: Uuid::new_v4(), name: name.into(), level, created_at: Utc::now() }
}

fn income_on(amount: i64, date: NaiveDate, category_id: Option<Uuid>) -> Income {
    let mut row = dummy_income(Decimal::from(amount));
    row.transaction_date = date;
    row.category_id = category_id;
    row
}

fn expense_on(amount: i64, date: NaiveDate, category_id: Option<Uuid>) -> Expense {
    let mut row = dummy_expense(Decimal::from(amount));
    row.transaction_date = date;
    row.category_id = category_id;
    row
}

// =============================================================================
// ReportRange
// =============================================================================

#[test]
fn open_range_contains_everything() {
    assert!(ReportRange::default().contains(test_date(6, 1)));
}

#[test]
fn range_bounds_are_inclusive() {
    let range = ReportRange { from: Some(test_date(2, 1)), to: Some(test_date(2, 28)) };
    assert!(range.contains(test_date(2, 1)));
    assert!(range.contains(test_date(2, 28)));
    assert!(!range.contains(test_date(1, 31)));
    assert!(!range.contains(test_date(3, 1)));
}

#[test]
fn range_options_push_date_filters() {
    let range = ReportRange { from: Some(test_date(2, 1)), to: None };
    assert_eq!(range.options().filters, vec![Filter::gte("transaction_date", test_date(2, 1))]);
}

// =============================================================================
// grouping
// =============================================================================

#[test]
fn category_totals_group_and_sort_largest_first() {
    let contribution = category("PTA Contribution", CategoryKind::Income);
    let donation = category("Donation", CategoryKind::Income);
    let rows = [
        income_on(250, test_date(1, 5), Some(contribution.id)),
        income_on(250, test_date(1, 6), Some(contribution.id)),
        income_on(5000, test_date(1, 7), Some(donation.id)),
        income_on(40, test_date(1, 8), None),
    ];
    let refs: Vec<&Income> = rows.iter().collect();
    let totals = by_category(&refs, &[contribution.clone(), donation.clone()]);

    let names: Vec<&str> = totals.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(names, vec!["Donation", "PTA Contribution", UNCATEGORIZED]);
    assert_eq!(totals[1].total, Decimal::from(500));
    assert_eq!(totals[1].count, 2);
    assert_eq!(totals[2].category_id, None);
}

#[test]
fn deleted_category_counts_as_uncategorized() {
    let rows = [expense_on(100, test_date(1, 1), Some(Uuid::new_v4())), expense_on(50, test_date(1, 2), None)];
    let refs: Vec<&Expense> = rows.iter().collect();
    let totals = by_category(&refs, &[]);
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].category, UNCATEGORIZED);
    assert_eq!(totals[0].total, Decimal::from(150));
}

#[test]
fn month_totals_are_chronological_with_net() {
    let income = [income_on(300, test_date(2, 10), None), income_on(200, test_date(1, 3), None)];
    let expenses = [expense_on(150, test_date(2, 20), None)];
    let income: Vec<&Income> = income.iter().collect();
    let expenses: Vec<&Expense> = expenses.iter().collect();
    let months = by_month(&income, &expenses);

    assert_eq!(months.len(), 2);
    assert_eq!(months[0].month, "2026-01");
    assert_eq!(months[0].net, Decimal::from(200));
    assert_eq!(months[1].month, "2026-02");
    assert_eq!(months[1].income, Decimal::from(300));
    assert_eq!(months[1].expenses, Decimal::from(150));
    assert_eq!(months[1].net, Decimal::from(150));
}

#[test]
fn grade_collection_counts_paid_students() {
    let g1 = grade("Grade 1", 1);
    let g2 = grade("Grade 2", 2);
    let mut students = vec![
        dummy_student(true, Decimal::from(250)),
        dummy_student(false, Decimal::ZERO),
        dummy_student(true, Decimal::from(300)),
        dummy_student(false, Decimal::ZERO),
    ];
    students[0].grade_id = Some(g1.id);
    students[1].grade_id = Some(g1.id);
    students[2].grade_id = Some(g2.id);

    let rows = by_grade(&students, &[g1.clone(), g2.clone()]);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].grade, "Grade 1");
    assert_eq!((rows[0].total_students, rows[0].paid_count), (2, 1));
    assert!((rows[0].paid_percentage - 50.0).abs() < f64::EPSILON);
    assert_eq!(rows[0].collected, Decimal::from(250));
    assert_eq!(rows[1].collected, Decimal::from(300));
    assert_eq!(rows[2].grade, UNASSIGNED_GRADE);
    assert_eq!(rows[2].total_students, 1);
}

#[test]
fn no_unassigned_row_when_every_student_has_a_grade() {
    let g1 = grade("Grade 1", 1);
    let mut student = dummy_student(false, Decimal::ZERO);
    student.grade_id = Some(g1.id);
    let rows = by_grade(&[student], &[g1]);
    assert_eq!(rows.len(), 1);
}

// =============================================================================
// build
// =============================================================================

#[test]
fn build_restricts_to_range() {
    let income = vec![income_on(250, test_date(1, 15), None), income_on(5000, test_date(3, 1), None)];
    let expenses = vec![expense_on(800, test_date(1, 20), None), expense_on(2200, test_date(4, 2), None)];
    let range = ReportRange { from: Some(test_date(1, 1)), to: Some(test_date(1, 31)) };
    let report = build(
        range,
        &ReportInput { income: &income, expenses: &expenses, students: &[], categories: &[], grades: &[] },
    );

    assert_eq!(report.summary.total_income, Decimal::from(250));
    assert_eq!(report.summary.total_expenses, Decimal::from(800));
    assert_eq!(report.summary.balance, Decimal::from(-550));
    assert_eq!(report.summary.income_count, 1);
    assert_eq!(report.by_month.len(), 1);
    assert!(report.by_grade.is_empty());
}

#[test]
fn build_without_range_matches_dashboard_totals() {
    let income: Vec<Income> = [250, 250, 250, 5000]
        .into_iter()
        .map(|a| income_on(a, test_date(1, 15), None))
        .collect();
    let expenses: Vec<Expense> = [1500, 800, 2200]
        .into_iter()
        .map(|a| expense_on(a, test_date(1, 20), None))
        .collect();
    let report = build(
        ReportRange::default(),
        &ReportInput { income: &income, expenses: &expenses, students: &[], categories: &[], grades: &[] },
    );
    assert_eq!(report.summary.total_income, Decimal::from(5750));
    assert_eq!(report.summary.total_expenses, Decimal::from(4500));
    assert_eq!(report.summary.balance, Decimal::from(1250));
}
