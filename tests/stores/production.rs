use registro::core::db::initialize_registro_db;
use registro::core::error::RegistroError;
use registro::core::store::Store;
use registro::core::time::Date;
use registro::stores::identity::{Role, register_user};
use registro::stores::production::{
    get_register, record_daily, record_monthly_adjustment, remove_register,
};
use tempfile::tempdir;

fn setup_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let data_dir = tmp.path().join(".registro").join("data");
    initialize_registro_db(&data_dir).unwrap();
    let store = Store::open(tmp.path()).unwrap();
    register_user(&store, "alice", "Alice Silva", "h1", Role::Producao).unwrap();
    (tmp, store)
}

fn day(s: &str) -> Date {
    Date::parse(s).unwrap()
}

#[test]
fn test_daily_sum_lands_on_every_row() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_daily(&store, day("2024-03-02"), 'D', 5, "alice", None).unwrap();

    let first = get_register(&store, day("2024-03-01"), 'D').unwrap();
    let second = get_register(&store, day("2024-03-02"), 'D').unwrap();

    assert_eq!(first.quantidade_diaria, Some(10));
    assert_eq!(second.quantidade_diaria, Some(5));
    assert_eq!(first.quantidade_mensal, 15);
    assert_eq!(second.quantidade_mensal, 15);
    assert_eq!(first.responsavel, "alice");
}

#[test]
fn test_daily_is_idempotent() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", Some("first shift")).unwrap();
    record_daily(&store, day("2024-03-02"), 'D', 5, "alice", None).unwrap();

    // Replay the first record verbatim: nothing may change.
    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", Some("first shift")).unwrap();

    let first = get_register(&store, day("2024-03-01"), 'D').unwrap();
    let second = get_register(&store, day("2024-03-02"), 'D').unwrap();
    assert_eq!(first.quantidade_diaria, Some(10));
    assert_eq!(first.quantidade_mensal, 15);
    assert_eq!(first.observacao_diaria.as_deref(), Some("first shift"));
    assert_eq!(second.quantidade_mensal, 15);
}

#[test]
fn test_daily_replacement_recomputes() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_daily(&store, day("2024-03-02"), 'D', 5, "alice", None).unwrap();

    // Correcting a day replaces its count; the month follows.
    record_daily(&store, day("2024-03-01"), 'D', 7, "alice", Some("recount")).unwrap();

    let first = get_register(&store, day("2024-03-01"), 'D').unwrap();
    let second = get_register(&store, day("2024-03-02"), 'D').unwrap();
    assert_eq!(first.quantidade_diaria, Some(7));
    assert_eq!(first.observacao_diaria.as_deref(), Some("recount"));
    assert_eq!(first.quantidade_mensal, 12);
    assert_eq!(second.quantidade_mensal, 12);
}

#[test]
fn test_adjustment_below_daily_sum_rejected() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_daily(&store, day("2024-03-02"), 'D', 5, "alice", None).unwrap();

    let err =
        record_monthly_adjustment(&store, day("2024-03-31"), 'D', 8, "alice", None).unwrap_err();
    match err {
        RegistroError::MonthlyBelowDailySum { informed, daily_sum } => {
            assert_eq!(informed, 8);
            assert_eq!(daily_sum, 15);
        }
        other => panic!("expected MonthlyBelowDailySum, got {:?}", other),
    }

    // The refused adjustment left no trace.
    let first = get_register(&store, day("2024-03-01"), 'D').unwrap();
    assert_eq!(first.quantidade_mensal, 15);
    assert!(matches!(
        get_register(&store, day("2024-03-31"), 'D').unwrap_err(),
        RegistroError::NotFound(_)
    ));
}

#[test]
fn test_adjustment_overrides_monthly() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_daily(&store, day("2024-03-02"), 'D', 5, "alice", None).unwrap();

    let adjusted = record_monthly_adjustment(
        &store,
        day("2024-03-31"),
        'D',
        20,
        "alice",
        Some("includes line 2 rework"),
    )
    .unwrap();
    assert_eq!(adjusted.quantidade_diaria, None);
    assert_eq!(adjusted.quantidade_mensal, 20);
    assert_eq!(
        adjusted.observacao_mensal.as_deref(),
        Some("includes line 2 rework")
    );

    // Every row of the month carries the adjusted total.
    assert_eq!(
        get_register(&store, day("2024-03-01"), 'D')
            .unwrap()
            .quantidade_mensal,
        20
    );
    assert_eq!(
        get_register(&store, day("2024-03-02"), 'D')
            .unwrap()
            .quantidade_mensal,
        20
    );
}

#[test]
fn test_adjustment_equal_to_daily_sum_allowed() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    let adjusted =
        record_monthly_adjustment(&store, day("2024-03-31"), 'D', 10, "alice", None).unwrap();
    assert_eq!(adjusted.quantidade_mensal, 10);
}

#[test]
fn test_adjustment_on_empty_month_creates_row() {
    let (_tmp, store) = setup_store();

    let adjusted =
        record_monthly_adjustment(&store, day("2024-05-31"), 'D', 40, "alice", None).unwrap();
    assert_eq!(adjusted.quantidade_diaria, None);
    assert_eq!(adjusted.quantidade_mensal, 40);
    assert_eq!(adjusted.responsavel, "alice");
}

#[test]
fn test_daily_after_adjustment_consumes_surplus() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_daily(&store, day("2024-03-02"), 'D', 5, "alice", None).unwrap();
    record_monthly_adjustment(&store, day("2024-03-31"), 'D', 20, "alice", None).unwrap();

    // A new day inside the surplus keeps the adjusted total authoritative.
    record_daily(&store, day("2024-03-03"), 'D', 4, "alice", None).unwrap();
    assert_eq!(
        get_register(&store, day("2024-03-03"), 'D')
            .unwrap()
            .quantidade_mensal,
        20
    );

    // The next new day exhausts the remaining surplus of 1, so the total
    // grows with the recorded days again: 10+5+4+3 with 1 still covered.
    record_daily(&store, day("2024-03-04"), 'D', 3, "alice", None).unwrap();
    let last = get_register(&store, day("2024-03-04"), 'D').unwrap();
    assert_eq!(last.quantidade_mensal, 22);
    assert_eq!(
        get_register(&store, day("2024-03-01"), 'D')
            .unwrap()
            .quantidade_mensal,
        22
    );
}

#[test]
fn test_replacement_keeps_adjustment_surplus() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_monthly_adjustment(&store, day("2024-03-31"), 'D', 18, "alice", None).unwrap();

    // Correcting an already-recorded day moves the total by the delta; the
    // surplus of 8 unrecorded units stays covered.
    record_daily(&store, day("2024-03-01"), 'D', 12, "alice", None).unwrap();
    assert_eq!(
        get_register(&store, day("2024-03-01"), 'D')
            .unwrap()
            .quantidade_mensal,
        20
    );
}

#[test]
fn test_types_and_months_are_independent() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    record_daily(&store, day("2024-03-01"), 'N', 4, "alice", None).unwrap();
    record_daily(&store, day("2024-04-01"), 'D', 7, "alice", None).unwrap();

    assert_eq!(
        get_register(&store, day("2024-03-01"), 'D')
            .unwrap()
            .quantidade_mensal,
        10
    );
    assert_eq!(
        get_register(&store, day("2024-03-01"), 'N')
            .unwrap()
            .quantidade_mensal,
        4
    );
    assert_eq!(
        get_register(&store, day("2024-04-01"), 'D')
            .unwrap()
            .quantidade_mensal,
        7
    );
}

#[test]
fn test_validation() {
    let (_tmp, store) = setup_store();

    let err = record_daily(&store, day("2024-03-01"), 'D', -1, "alice", None).unwrap_err();
    assert!(matches!(err, RegistroError::InvalidQuantity(-1)));

    let err = record_daily(&store, day("2024-03-01"), '!', 1, "alice", None).unwrap_err();
    assert!(matches!(err, RegistroError::ValidationError(_)));

    let err = record_daily(&store, day("2024-03-01"), 'D', 1, "ghost", None).unwrap_err();
    assert!(matches!(err, RegistroError::UnknownResponsible(_)));

    let err =
        record_monthly_adjustment(&store, day("2024-03-31"), 'D', -2, "alice", None).unwrap_err();
    assert!(matches!(err, RegistroError::InvalidQuantity(-2)));

    let err = get_register(&store, day("2024-03-01"), 'D').unwrap_err();
    assert!(matches!(err, RegistroError::NotFound(_)));

    assert!(Date::parse("2024-02-30").is_err());
    assert!(Date::parse("2024-3-1").is_err());
}

#[test]
fn test_remove_is_always_refused() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 10, "alice", None).unwrap();
    let err = remove_register(&store, day("2024-03-01"), 'D').unwrap_err();
    assert!(matches!(err, RegistroError::UnsupportedOperation(_)));
    assert!(get_register(&store, day("2024-03-01"), 'D').is_ok());
}

#[test]
fn test_zero_daily_quantity() {
    let (_tmp, store) = setup_store();

    record_daily(&store, day("2024-03-01"), 'D', 0, "alice", None).unwrap();
    let row = get_register(&store, day("2024-03-01"), 'D').unwrap();
    assert_eq!(row.quantidade_diaria, Some(0));
    assert_eq!(row.quantidade_mensal, 0);
}
