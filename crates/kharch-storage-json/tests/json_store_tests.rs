use std::sync::{Arc, Mutex};

use kharch_core::{
    storage::{ExpenseStore, RosterStore},
    CoreError, ExpenseDraft, ExpenseService, SummaryService,
};
use kharch_domain::{Expense, MemberShare, Participant, PaymentStatus, Transfer};
use kharch_storage_json::JsonDocumentStore;
use tempfile::tempdir;
use uuid::Uuid;

fn lunch() -> Expense {
    ExpenseService::create(
        ExpenseDraft::new("Lunch", 300.0, "john")
            .category("Food")
            .member("John Doe", 150.0)
            .member("Jane Smith", 150.0),
    )
    .expect("valid draft")
}

#[test]
fn empty_directory_reads_as_empty_store() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::new(dir.path().join("data")).expect("store");

    assert!(store.list_expenses().expect("list").is_empty());
    assert!(store.list_participants().expect("roster").is_empty());
    assert!(store.backups_dir().exists());
}

#[test]
fn expenses_persist_across_instances() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("data");
    let id = {
        let store = JsonDocumentStore::new(root.clone()).expect("store");
        store.add_expense(lunch()).expect("add")
    };

    let reopened = JsonDocumentStore::new(root.clone()).expect("reopen");
    let loaded = reopened.get_expense(id).expect("get");
    assert_eq!(loaded.description, "Lunch");
    assert_eq!(loaded.members.len(), 2);
    assert!(!root.join("expenses.json.tmp").exists());

    let raw = std::fs::read_to_string(reopened.expenses_path()).expect("read");
    assert!(raw.contains("\"totalAmount\""));
    assert!(raw.contains("\"paymentStatus\": \"pending\""));
}

#[test]
fn update_and_delete_round_trip() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");
    let id = store.add_expense(lunch()).expect("add");

    let mut expense = store.get_expense(id).expect("get");
    ExpenseService::update_payment_status(&mut expense, PaymentStatus::Paid, 300.0, "Jane Smith")
        .expect("status");
    store.update_expense(expense).expect("update");
    let stored = store.get_expense(id).expect("get");
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.paid_by, "Jane Smith");

    store.delete_expense(id).expect("delete");
    assert!(matches!(
        store.get_expense(id),
        Err(CoreError::ExpenseNotFound(missing)) if missing == id
    ));
    assert!(matches!(
        store.update_expense(stored),
        Err(CoreError::ExpenseNotFound(_))
    ));
}

#[test]
fn demo_seed_produces_expected_settlement() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");

    assert!(store.seed_demo_data().expect("seed"));
    assert!(!store.seed_demo_data().expect("second seed is a no-op"));

    let expenses = store.list_expenses().expect("list");
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].description, "Dinner at Restaurant");
    assert_eq!(expenses[1].payment_status, PaymentStatus::Partial);

    let snapshot = store.snapshot().expect("snapshot");
    let plan = SummaryService::default().settlement_plan(&snapshot);
    assert_eq!(plan.transfers, vec![Transfer::new("Jane Smith", "John Doe", 650.0)]);

    let summary = SummaryService::default().balance_summary(&snapshot);
    assert_eq!(summary["Admin User"].balance, 0.0);
}

#[test]
fn subscribers_receive_snapshots_after_writes() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = store
        .subscribe(Arc::new(move |expenses: &[Expense]| {
            sink.lock().unwrap().push(expenses.len());
        }))
        .expect("subscribe");

    let id = store.add_expense(lunch()).expect("add");
    store.add_expense(lunch()).expect("add second");
    store.delete_expense(id).expect("delete");
    assert!(store.unsubscribe(subscription).expect("unsubscribe"));
    store.add_expense(lunch()).expect("add after unsubscribe");

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 1]);
}

#[test]
fn roster_rejects_duplicate_names() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");
    store
        .upsert_participant(Participant::new("john", "John Doe"))
        .expect("insert");
    let err = store
        .upsert_participant(Participant::new("johnny", "John Doe"))
        .expect_err("duplicate name");
    assert!(matches!(err, CoreError::Validation(_)));

    store.remove_participant("john").expect("remove");
    assert!(store.list_participants().expect("roster").is_empty());
    assert!(matches!(
        store.remove_participant("john"),
        Err(CoreError::ParticipantNotFound(_))
    ));
}

#[test]
fn backups_are_pruned_and_restorable() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::with_retention(dir.path().to_path_buf(), 2).expect("store");
    store.seed_demo_data().expect("seed");

    let kept = store.backup(Some("Before cleanup")).expect("backup");
    assert!(kept.name.ends_with("_before-cleanup.json"));
    store.backup(Some("second")).expect("backup");
    store.backup(Some("third")).expect("backup");
    assert!(store.list_backups().expect("list").len() <= 2);

    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("reopen");
    let latest = store.backup(Some("restore point")).expect("backup");
    for expense in store.list_expenses().expect("list") {
        store.delete_expense(expense.id).expect("delete");
    }
    assert!(store.list_expenses().expect("list").is_empty());

    let restored = store.restore_backup(&latest.name).expect("restore");
    assert_eq!(restored.expenses.len(), 2);
    assert_eq!(store.list_expenses().expect("list").len(), 2);
    assert!(store.restore_backup("snapshot_missing.json").is_err());
}

#[test]
fn non_finite_amounts_do_not_poison_the_document() {
    let dir = tempdir().expect("tempdir");
    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");
    store.add_expense(lunch()).expect("add");

    let broken = Expense::new(
        "Snacks",
        10.0,
        "Food",
        "john",
        vec![
            MemberShare::new("John Doe", f64::NAN),
            MemberShare::new("Jane Smith", 10.0),
        ],
    );
    let id = store.add_expense(broken).expect("add with NaN share");

    let raw = std::fs::read_to_string(store.expenses_path()).expect("read");
    assert!(!raw.contains("null"));
    let stored = store.get_expense(id).expect("get");
    assert_eq!(stored.members[0].share_amount, 0.0);
    assert_eq!(store.list_expenses().expect("list").len(), 2);
    store.add_expense(lunch()).expect("later add still works");
}

#[test]
fn null_amounts_written_elsewhere_still_load() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("expenses.json"),
        r#"[{
            "id": "6f1c1c3e-2b0e-4c4e-9a51-0d6f1f2a9b10",
            "description": "Snacks",
            "totalAmount": 10,
            "payer": "john",
            "members": [{ "participant": "John Doe", "shareAmount": null }]
        }]"#,
    )
    .expect("write");
    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");

    let expenses = store.list_expenses().expect("list");
    assert_eq!(expenses[0].members[0].share_amount, 0.0);
    let report = SummaryService::default().report(&store.snapshot().expect("snapshot"));
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn expenses_without_ids_get_stable_distinct_ids() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("expenses.json"),
        r#"[
            { "description": "Tea", "totalAmount": 40, "payer": "john",
              "members": [{ "participant": "John Doe", "shareAmount": 40 }] },
            { "description": "Cab", "totalAmount": 200, "payer": "jane",
              "members": [{ "participant": "Jane Smith", "shareAmount": 200 }] }
        ]"#,
    )
    .expect("write");

    let store = JsonDocumentStore::new(dir.path().to_path_buf()).expect("store");
    let ids: Vec<_> = store
        .list_expenses()
        .expect("list")
        .iter()
        .map(|expense| expense.id)
        .collect();
    assert!(ids.iter().all(|id| !id.is_nil()));
    assert_ne!(ids[0], ids[1]);

    let reopened = JsonDocumentStore::new(dir.path().to_path_buf()).expect("reopen");
    reopened.delete_expense(ids[0]).expect("delete by listed id");
    let remaining = reopened.list_expenses().expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ids[1]);
    assert!(reopened.delete_expense(Uuid::nil()).is_err());
}

#[test]
fn restore_only_accepts_listed_backups() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("data");
    let store = JsonDocumentStore::new(root.clone()).expect("store");
    store.seed_demo_data().expect("seed");
    std::fs::write(dir.path().join("outside.json"), r#"{"roster":[],"expenses":[]}"#)
        .expect("write");

    for name in ["../../outside.json", "../expenses.json"] {
        assert!(
            matches!(store.restore_backup(name), Err(CoreError::Storage(_))),
            "{name} should be rejected"
        );
    }
    let absolute = dir.path().join("outside.json");
    assert!(store
        .restore_backup(absolute.to_str().expect("utf8 path"))
        .is_err());
    assert_eq!(store.list_expenses().expect("list").len(), 2);
}

#[test]
fn changes_made_during_initial_delivery_are_delivered() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonDocumentStore::new(dir.path().to_path_buf()).expect("store"));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let writer = Arc::downgrade(&store);
    store
        .subscribe(Arc::new(move |expenses: &[Expense]| {
            sink.lock().unwrap().push(expenses.len());
            if expenses.is_empty() {
                if let Some(store) = writer.upgrade() {
                    store.add_expense(lunch()).expect("add from listener");
                }
            }
        }))
        .expect("subscribe");

    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
}
