//! Seam to the external document store: CRUD plus live snapshot subscriptions.

use std::sync::{Arc, Mutex, MutexGuard};

use kharch_domain::{Expense, LedgerSnapshot, Participant, Roster};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{summary_service::SettlementReport, CoreError, ExpenseService, SummaryService};

/// Callback receiving the complete expense collection after every change.
pub type SnapshotListener = Arc<dyn Fn(&[Expense]) + Send + Sync>;

/// Handle returned by [`ExpenseStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Persisted, live-updating collection of expenses.
pub trait ExpenseStore: Send + Sync {
    /// All expenses, newest first.
    fn list_expenses(&self) -> Result<Vec<Expense>, CoreError>;
    fn get_expense(&self, id: Uuid) -> Result<Expense, CoreError>;
    /// Stores a new expense, assigning an id when it has none.
    fn add_expense(&self, expense: Expense) -> Result<Uuid, CoreError>;
    fn update_expense(&self, expense: Expense) -> Result<(), CoreError>;
    fn delete_expense(&self, id: Uuid) -> Result<(), CoreError>;
    /// Registers a listener. It is called once with the current collection and
    /// again after every committed change.
    fn subscribe(&self, listener: SnapshotListener) -> Result<SubscriptionId, CoreError>;
    /// Returns `false` if the subscription was unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, CoreError>;
}

/// Persisted collection of participants.
pub trait RosterStore: Send + Sync {
    fn list_participants(&self) -> Result<Roster, CoreError>;
    fn upsert_participant(&self, participant: Participant) -> Result<(), CoreError>;
    fn remove_participant(&self, id: &str) -> Result<(), CoreError>;
}

/// Reads roster and expenses into one snapshot.
pub fn load_snapshot<S>(store: &S) -> Result<LedgerSnapshot, CoreError>
where
    S: ExpenseStore + RosterStore + ?Sized,
{
    Ok(LedgerSnapshot::new(
        store.list_participants()?,
        store.list_expenses()?,
    ))
}

/// Recomputes the settlement report whenever the expense collection changes.
pub fn watch_settlements<F>(
    store: &dyn ExpenseStore,
    roster: Roster,
    service: SummaryService,
    on_report: F,
) -> Result<SubscriptionId, CoreError>
where
    F: Fn(SettlementReport) + Send + Sync + 'static,
{
    store.subscribe(Arc::new(move |expenses: &[Expense]| {
        let snapshot = LedgerSnapshot::new(roster.clone(), expenses.to_vec());
        on_report(service.report(&snapshot));
    }))
}

/// Listener bookkeeping shared by store implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    listeners: Vec<(SubscriptionId, SnapshotListener)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: SnapshotListener) -> Result<SubscriptionId, CoreError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.listeners.push((id, listener));
        debug!(subscription = id.0, "listener registered");
        Ok(id)
    }

    pub fn remove(&self, id: SubscriptionId) -> Result<bool, CoreError> {
        let mut state = self.lock()?;
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        Ok(state.listeners.len() != before)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.listeners.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every listener with `expenses`. The lock is released first so
    /// listeners may read from the store.
    pub fn notify(&self, expenses: &[Expense]) -> Result<(), CoreError> {
        let listeners: Vec<SnapshotListener> = self
            .lock()?
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(expenses);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Storage("listener registry lock poisoned".into()))
    }
}

/// In-process store for tests and embedding; nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    expenses: Mutex<Vec<Expense>>,
    roster: Mutex<Roster>,
    listeners: ListenerRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: Roster) -> Self {
        Self {
            roster: Mutex::new(roster),
            ..Self::default()
        }
    }

    fn expenses(&self) -> Result<MutexGuard<'_, Vec<Expense>>, CoreError> {
        self.expenses
            .lock()
            .map_err(|_| CoreError::Storage("expense collection lock poisoned".into()))
    }

    fn roster(&self) -> Result<MutexGuard<'_, Roster>, CoreError> {
        self.roster
            .lock()
            .map_err(|_| CoreError::Storage("roster lock poisoned".into()))
    }

    // Runs after the change is committed, so failures are logged rather than returned.
    fn publish(&self) {
        let notified = self
            .list_expenses()
            .and_then(|snapshot| self.listeners.notify(&snapshot));
        if let Err(err) = notified {
            warn!(error = %err, "failed to notify expense subscribers");
        }
    }
}

impl ExpenseStore for MemoryStore {
    fn list_expenses(&self) -> Result<Vec<Expense>, CoreError> {
        let mut expenses = self.expenses()?.clone();
        ExpenseService::sort_newest_first(&mut expenses);
        Ok(expenses)
    }

    fn get_expense(&self, id: Uuid) -> Result<Expense, CoreError> {
        self.expenses()?
            .iter()
            .find(|expense| expense.id == id)
            .cloned()
            .ok_or(CoreError::ExpenseNotFound(id))
    }

    fn add_expense(&self, mut expense: Expense) -> Result<Uuid, CoreError> {
        if expense.id.is_nil() {
            expense.id = Uuid::new_v4();
        }
        let id = expense.id;
        {
            let mut expenses = self.expenses()?;
            if expenses.iter().any(|existing| existing.id == id) {
                return Err(CoreError::InvalidOperation(format!(
                    "expense {id} already exists"
                )));
            }
            expenses.push(expense);
        }
        self.publish();
        Ok(id)
    }

    fn update_expense(&self, expense: Expense) -> Result<(), CoreError> {
        {
            let mut expenses = self.expenses()?;
            let slot = expenses
                .iter_mut()
                .find(|existing| existing.id == expense.id)
                .ok_or(CoreError::ExpenseNotFound(expense.id))?;
            *slot = expense;
        }
        self.publish();
        Ok(())
    }

    fn delete_expense(&self, id: Uuid) -> Result<(), CoreError> {
        {
            let mut expenses = self.expenses()?;
            let before = expenses.len();
            expenses.retain(|expense| expense.id != id);
            if expenses.len() == before {
                return Err(CoreError::ExpenseNotFound(id));
            }
        }
        self.publish();
        Ok(())
    }

    fn subscribe(&self, listener: SnapshotListener) -> Result<SubscriptionId, CoreError> {
        let id = self.listeners.register(Arc::clone(&listener))?;
        match self.list_expenses() {
            Ok(snapshot) => {
                listener(&snapshot);
                Ok(id)
            }
            Err(err) => {
                self.listeners.remove(id)?;
                Err(err)
            }
        }
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, CoreError> {
        self.listeners.remove(id)
    }
}

impl RosterStore for MemoryStore {
    fn list_participants(&self) -> Result<Roster, CoreError> {
        Ok(self.roster()?.clone())
    }

    fn upsert_participant(&self, participant: Participant) -> Result<(), CoreError> {
        let name = participant.name.clone();
        if self.roster()?.upsert(participant) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "participant name `{name}` is already taken"
            )))
        }
    }

    fn remove_participant(&self, id: &str) -> Result<(), CoreError> {
        self.roster()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::ParticipantNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use kharch_domain::MemberShare;

    fn expense(description: &str, day: u32) -> Expense {
        Expense::new(
            description,
            100.0,
            "Food",
            "a",
            vec![MemberShare::new("A", 50.0), MemberShare::new("B", 50.0)],
        )
        .with_created_at(Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap())
    }

    #[test]
    fn crud_round_trip_lists_newest_first() {
        let store = MemoryStore::new();
        let older = store.add_expense(expense("Groceries", 10)).unwrap();
        let newer = store.add_expense(expense("Dinner", 12)).unwrap();

        let listed = store.list_expenses().unwrap();
        assert_eq!(listed[0].id, newer);
        assert_eq!(listed[1].id, older);

        let mut updated = store.get_expense(older).unwrap();
        updated.description = "Weekly groceries".into();
        store.update_expense(updated).unwrap();
        assert_eq!(store.get_expense(older).unwrap().description, "Weekly groceries");

        store.delete_expense(newer).unwrap();
        assert!(matches!(
            store.get_expense(newer),
            Err(CoreError::ExpenseNotFound(id)) if id == newer
        ));
        assert!(store.delete_expense(newer).is_err());
    }

    #[test]
    fn add_assigns_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let mut draft = expense("Taxi", 3);
        draft.id = Uuid::nil();
        let id = store.add_expense(draft).unwrap();
        assert!(!id.is_nil());

        let duplicate = store.get_expense(id).unwrap();
        assert!(matches!(
            store.add_expense(duplicate),
            Err(CoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn subscribers_see_initial_and_subsequent_snapshots() {
        let store = MemoryStore::new();
        store.add_expense(expense("Existing", 1)).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let subscription = {
            let calls = Arc::clone(&calls);
            let sizes = Arc::clone(&sizes);
            store
                .subscribe(Arc::new(move |expenses: &[Expense]| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    sizes.lock().unwrap().push(expenses.len());
                }))
                .unwrap()
        };

        store.add_expense(expense("Second", 2)).unwrap();
        assert!(store.unsubscribe(subscription).unwrap());
        store.add_expense(expense("Third", 3)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*sizes.lock().unwrap(), vec![1, 2]);
        assert!(!store.unsubscribe(subscription).unwrap());
    }

    #[test]
    fn changes_made_during_initial_delivery_reach_the_subscriber() {
        let store = Arc::new(MemoryStore::new());
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sizes);
        let writer = Arc::downgrade(&store);
        store
            .subscribe(Arc::new(move |expenses: &[Expense]| {
                sink.lock().unwrap().push(expenses.len());
                if expenses.is_empty() {
                    if let Some(store) = writer.upgrade() {
                        store.add_expense(expense("Late", 4)).unwrap();
                    }
                }
            }))
            .unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn watched_report_follows_changes() {
        let roster = Roster::from_participants([
            Participant::new("a", "A"),
            Participant::new("b", "B"),
        ]);
        let store = MemoryStore::with_roster(roster.clone());
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        watch_settlements(&store, roster, SummaryService::default(), move |report| {
            sink.lock().unwrap().push(report);
        })
        .unwrap();

        let id = store.add_expense(expense("Dinner", 5)).unwrap();
        store.delete_expense(id).unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports[0].is_settled());
        assert_eq!(reports[1].plan.len(), 1);
        assert_eq!(reports[1].plan.transfers[0].from, "B");
        assert_eq!(reports[1].plan.transfers[0].to, "A");
        assert!(reports[2].is_settled());
    }

    #[test]
    fn roster_store_rejects_name_collisions() {
        let store = MemoryStore::new();
        store.upsert_participant(Participant::new("a", "Asha")).unwrap();
        store.upsert_participant(Participant::new("a", "Asha K")).unwrap();
        assert!(matches!(
            store.upsert_participant(Participant::new("b", "Asha K")),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(store.list_participants().unwrap().len(), 1);

        let snapshot = load_snapshot(&store).unwrap();
        assert_eq!(snapshot.roster.len(), 1);
        assert!(snapshot.expenses.is_empty());

        store.remove_participant("a").unwrap();
        assert!(matches!(
            store.remove_participant("a"),
            Err(CoreError::ParticipantNotFound(_))
        ));
    }
}
