//! kharch-storage-json
//!
//! Filesystem-backed document store for expenses and the participant roster.

use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use kharch_core::{
    storage::{
        load_snapshot, ExpenseStore, ListenerRegistry, RosterStore, SnapshotListener,
        SubscriptionId,
    },
    CoreError, ExpenseService,
};
use kharch_domain::{
    Expense, LedgerSnapshot, MemberShare, Participant, PaymentStatus, Roster,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

const EXPENSES_FILE: &str = "expenses.json";
const ROSTER_FILE: &str = "roster.json";
const BACKUPS_DIR: &str = "backups";
const BACKUP_PREFIX: &str = "snapshot";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// A snapshot backup on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub path: PathBuf,
}

/// Expenses and roster persisted as two JSON documents under one directory.
///
/// Every write goes to a temporary file that is renamed into place. The
/// previous state is copied into `backups/` first, keeping the newest
/// `retention` snapshots.
pub struct JsonDocumentStore {
    root: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
    write_lock: Mutex<()>,
    listeners: ListenerRegistry,
}

impl JsonDocumentStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        Self::with_retention(root, DEFAULT_RETENTION)
    }

    pub fn with_retention(root: PathBuf, retention: usize) -> Result<Self, CoreError> {
        let backups_dir = root.join(BACKUPS_DIR);
        fs::create_dir_all(&backups_dir)?;
        let store = Self {
            root,
            backups_dir,
            retention: retention.max(1),
            write_lock: Mutex::new(()),
            listeners: ListenerRegistry::new(),
        };
        store.assign_missing_ids()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn expenses_path(&self) -> PathBuf {
        self.root.join(EXPENSES_FILE)
    }

    pub fn roster_path(&self) -> PathBuf {
        self.root.join(ROSTER_FILE)
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, CoreError> {
        load_snapshot(self)
    }

    /// Populates the demo roster and expenses when the store holds no data.
    /// Returns `false` and leaves the store untouched otherwise.
    pub fn seed_demo_data(&self) -> Result<bool, CoreError> {
        {
            let _guard = self.lock_writes()?;
            if !self.read_expenses()?.is_empty() || !self.read_roster()?.is_empty() {
                debug!(root = %self.root.display(), "store already populated, skipping demo seed");
                return Ok(false);
            }
            let roster = demo_roster();
            let expenses = demo_expenses();
            write_json(&self.roster_path(), &roster)?;
            write_json(&self.expenses_path(), &expenses)?;
            info!(
                participants = roster.len(),
                expenses = expenses.len(),
                "seeded demo data"
            );
        }
        self.publish();
        Ok(true)
    }

    /// Writes the current roster and expenses to a named backup file.
    pub fn backup(&self, note: Option<&str>) -> Result<BackupInfo, CoreError> {
        let _guard = self.lock_writes()?;
        self.write_backup(note)
    }

    /// Backups, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, CoreError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(BackupInfo {
                    name: name.to_string(),
                    created_at: parse_backup_timestamp(name),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by(|a, b| {
            Reverse(a.created_at)
                .cmp(&Reverse(b.created_at))
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    /// Replaces the stored data with a backup and notifies subscribers.
    ///
    /// Only names returned by [`list_backups`](Self::list_backups) are accepted.
    pub fn restore_backup(&self, name: &str) -> Result<LedgerSnapshot, CoreError> {
        let backup = self
            .list_backups()?
            .into_iter()
            .find(|backup| backup.name == name)
            .ok_or_else(|| CoreError::Storage(format!("backup `{name}` not found")))?;
        let mut snapshot: LedgerSnapshot = read_json(&backup.path)?;
        fill_missing_ids(&mut snapshot.expenses);
        {
            let _guard = self.lock_writes()?;
            self.write_backup(None)?;
            write_json(&self.roster_path(), &snapshot.roster)?;
            write_json(&self.expenses_path(), &snapshot.expenses)?;
        }
        info!(backup = name, "restored snapshot backup");
        self.publish();
        Ok(snapshot)
    }

    fn read_expenses(&self) -> Result<Vec<Expense>, CoreError> {
        let path = self.expenses_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    fn read_roster(&self) -> Result<Roster, CoreError> {
        let path = self.roster_path();
        if !path.exists() {
            return Ok(Roster::new());
        }
        read_json(&path)
    }

    /// Read-modify-write of the expense document under the write lock.
    fn mutate_expenses<T>(
        &self,
        change: impl FnOnce(&mut Vec<Expense>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let result = {
            let _guard = self.lock_writes()?;
            let mut expenses = self.read_expenses()?;
            fill_missing_ids(&mut expenses);
            let result = change(&mut expenses)?;
            self.write_backup(None)?;
            write_json(&self.expenses_path(), &expenses)?;
            result
        };
        self.publish();
        Ok(result)
    }

    /// Gives stored expenses without an id a fresh one and persists them.
    fn assign_missing_ids(&self) -> Result<(), CoreError> {
        let _guard = self.lock_writes()?;
        let mut expenses = self.read_expenses()?;
        if fill_missing_ids(&mut expenses) == 0 {
            return Ok(());
        }
        self.write_backup(None)?;
        write_json(&self.expenses_path(), &expenses)
    }

    fn mutate_roster<T>(
        &self,
        change: impl FnOnce(&mut Roster) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let _guard = self.lock_writes()?;
        let mut roster = self.read_roster()?;
        let result = change(&mut roster)?;
        self.write_backup(None)?;
        write_json(&self.roster_path(), &roster)?;
        Ok(result)
    }

    // Caller holds the write lock.
    fn write_backup(&self, note: Option<&str>) -> Result<BackupInfo, CoreError> {
        let snapshot = LedgerSnapshot::new(self.read_roster()?, self.read_expenses()?);
        let now = Utc::now();
        let mut name = format!("{BACKUP_PREFIX}_{}", now.format(BACKUP_TIMESTAMP_FORMAT));
        if let Some(label) = sanitize_backup_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        name.push('.');
        name.push_str(BACKUP_EXTENSION);
        let path = self.backups_dir.join(&name);
        write_json(&path, &snapshot)?;
        self.prune_backups()?;
        debug!(backup = %name, "wrote snapshot backup");
        Ok(BackupInfo {
            name,
            created_at: Some(now),
            path,
        })
    }

    fn prune_backups(&self) -> Result<(), CoreError> {
        for stale in self.list_backups()?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                warn!(backup = %stale.name, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }

    // Runs after the write is committed, so failures are logged rather than returned.
    fn publish(&self) {
        let notified = self
            .list_expenses()
            .and_then(|expenses| self.listeners.notify(&expenses));
        if let Err(err) = notified {
            warn!(error = %err, "failed to notify expense subscribers");
        }
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::Storage("store write lock poisoned".into()))
    }
}

impl ExpenseStore for JsonDocumentStore {
    fn list_expenses(&self) -> Result<Vec<Expense>, CoreError> {
        let mut expenses = self.read_expenses()?;
        ExpenseService::sort_newest_first(&mut expenses);
        Ok(expenses)
    }

    fn get_expense(&self, id: Uuid) -> Result<Expense, CoreError> {
        self.read_expenses()?
            .into_iter()
            .find(|expense| expense.id == id)
            .ok_or(CoreError::ExpenseNotFound(id))
    }

    fn add_expense(&self, mut expense: Expense) -> Result<Uuid, CoreError> {
        if expense.id.is_nil() {
            expense.id = Uuid::new_v4();
        }
        let id = expense.id;
        self.mutate_expenses(|expenses| {
            if expenses.iter().any(|existing| existing.id == id) {
                return Err(CoreError::InvalidOperation(format!(
                    "expense {id} already exists"
                )));
            }
            expenses.push(expense);
            Ok(())
        })?;
        info!(expense = %id, "expense stored");
        Ok(id)
    }

    fn update_expense(&self, expense: Expense) -> Result<(), CoreError> {
        self.mutate_expenses(|expenses| {
            let slot = expenses
                .iter_mut()
                .find(|existing| existing.id == expense.id)
                .ok_or(CoreError::ExpenseNotFound(expense.id))?;
            *slot = expense;
            Ok(())
        })
    }

    fn delete_expense(&self, id: Uuid) -> Result<(), CoreError> {
        self.mutate_expenses(|expenses| {
            let before = expenses.len();
            expenses.retain(|expense| expense.id != id);
            if expenses.len() == before {
                return Err(CoreError::ExpenseNotFound(id));
            }
            Ok(())
        })?;
        info!(expense = %id, "expense deleted");
        Ok(())
    }

    fn subscribe(&self, listener: SnapshotListener) -> Result<SubscriptionId, CoreError> {
        let id = self.listeners.register(Arc::clone(&listener))?;
        match self.list_expenses() {
            Ok(expenses) => {
                listener(&expenses);
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

impl RosterStore for JsonDocumentStore {
    fn list_participants(&self) -> Result<Roster, CoreError> {
        self.read_roster()
    }

    fn upsert_participant(&self, participant: Participant) -> Result<(), CoreError> {
        self.mutate_roster(|roster| {
            let name = participant.name.clone();
            if roster.upsert(participant) {
                Ok(())
            } else {
                Err(CoreError::Validation(format!(
                    "participant name `{name}` is already taken"
                )))
            }
        })
    }

    fn remove_participant(&self, id: &str) -> Result<(), CoreError> {
        self.mutate_roster(|roster| {
            roster
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| CoreError::ParticipantNotFound(id.to_string()))
        })
    }
}

fn demo_roster() -> Roster {
    Roster::from_participants([
        Participant::new("john", "John Doe"),
        Participant::new("jane", "Jane Smith"),
        Participant::new("admin", "Admin User"),
    ])
}

fn demo_expenses() -> Vec<Expense> {
    let day = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).single();

    let mut dinner = Expense::new(
        "Dinner at Restaurant",
        2500.0,
        "Food",
        "john",
        vec![
            MemberShare::new("John Doe", 1250.0),
            MemberShare::new("Jane Smith", 1250.0),
        ],
    );
    let mut movie = Expense::new(
        "Movie Tickets",
        1200.0,
        "Entertainment",
        "jane",
        vec![
            MemberShare::new("John Doe", 600.0),
            MemberShare::new("Jane Smith", 600.0),
        ],
    );
    movie.payment_status = PaymentStatus::Partial;
    movie.paid_amount = 600.0;
    movie.paid_by = "John Doe".into();

    if let Some(created_at) = day(15) {
        dinner.created_at = created_at;
    }
    if let Some(created_at) = day(14) {
        movie.created_at = created_at;
    }
    vec![dinner, movie]
}

/// Returns how many expenses received a new id.
fn fill_missing_ids(expenses: &mut [Expense]) -> usize {
    let mut filled = 0;
    for expense in expenses.iter_mut().filter(|expense| expense.id.is_nil()) {
        expense.id = Uuid::new_v4();
        filled += 1;
    }
    if filled > 0 {
        warn!(count = filled, "assigned ids to stored expenses without one");
    }
    filled
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| {
        CoreError::Serde(format!("{}: {err}", path.display()))
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|err| CoreError::Serde(err.to_string()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let mut sanitized = String::new();
    for ch in note?.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
        } else if !sanitized.is_empty() && !sanitized.ends_with('-') {
            sanitized.push('-');
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// `snapshot_<date>_<time>[_note].json`
fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name
        .strip_suffix(&format!(".{BACKUP_EXTENSION}"))?
        .strip_prefix(&format!("{BACKUP_PREFIX}_"))?;
    let mut parts = stem.splitn(3, '_');
    let date = parts.next()?;
    let time = parts.next()?;
    if !is_digits(date, 8) || !is_digits(time, 6) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}
