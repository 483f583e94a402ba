use std::path::PathBuf;

use kharch_config::Config;
use kharch_core::{
    format::{CurrencyFormatter, SymbolFormatter},
    storage::{load_snapshot, ExpenseStore, RosterStore},
    ExpenseDraft, ExpenseService, SettlementEngine, SettlementReport, SummaryService,
};
use kharch_domain::{
    Displayable, Expense, ExpenseStats, LedgerSnapshot, Participant, PaymentStatus,
};
use kharch_storage_json::JsonDocumentStore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    errors::{KharchError, Result},
    report,
};

/// An opened expense store plus the settings used to summarize it.
pub struct Session {
    config: Config,
    store: JsonDocumentStore,
    summary: SummaryService,
    formatter: SymbolFormatter,
}

impl Session {
    /// Opens the store at `data_dir`, or at the configured data root.
    pub fn open(config: Config, data_dir: Option<PathBuf>) -> Result<Self> {
        config.validate()?;
        let root = data_dir.unwrap_or_else(|| config.resolve_data_root());
        debug!(root = %root.display(), "opening expense store");
        let store = JsonDocumentStore::new(root)?;
        let engine = SettlementEngine::with_epsilon(config.settlement_epsilon)?;
        let formatter = SymbolFormatter::new(config.currency_symbol.clone());
        Ok(Self {
            config,
            store,
            summary: SummaryService::new(engine),
            formatter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &JsonDocumentStore {
        &self.store
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        Ok(load_snapshot(&self.store)?)
    }

    pub fn report(&self) -> Result<SettlementReport> {
        Ok(self.summary.report(&self.snapshot()?))
    }

    pub fn stats(&self) -> Result<ExpenseStats> {
        Ok(self.summary.stats(&self.snapshot()?))
    }

    pub fn render_report(&self) -> Result<String> {
        Ok(report::render_report(
            &self.report()?,
            &self.formatter,
            self.summary.engine().epsilon(),
        ))
    }

    pub fn render_settlement(&self) -> Result<String> {
        let plan = self.summary.settlement_plan(&self.snapshot()?);
        Ok(kharch_core::format::settlement_lines(&plan, &self.formatter).join("\n"))
    }

    /// Validates and stores a new expense.
    pub fn record_expense(&self, draft: ExpenseDraft) -> Result<Expense> {
        let expense = draft.into_expense()?;
        self.store.add_expense(expense.clone())?;
        Ok(expense)
    }

    /// Updates how much of an expense has been paid back.
    ///
    /// Without an explicit amount, `paid` means the full total and `pending`
    /// means nothing; `partial` always needs one.
    pub fn set_payment_status(
        &self,
        id: &str,
        status: PaymentStatus,
        paid_amount: Option<f64>,
        paid_by: &str,
    ) -> Result<Expense> {
        let mut expense = self.store.get_expense(parse_expense_id(id)?)?;
        let paid_amount = match (status, paid_amount) {
            (_, Some(amount)) => amount,
            (PaymentStatus::Paid, None) => expense.total_amount,
            (PaymentStatus::Pending, None) => 0.0,
            (PaymentStatus::Partial, None) => {
                return Err(KharchError::InvalidInput(
                    "a partial payment needs an amount".into(),
                ))
            }
        };
        ExpenseService::update_payment_status(&mut expense, status, paid_amount, paid_by)?;
        self.store.update_expense(expense.clone())?;
        Ok(expense)
    }

    /// Removes an expense and returns what was removed.
    pub fn delete_expense(&self, id: &str) -> Result<Expense> {
        let expense = self.store.get_expense(parse_expense_id(id)?)?;
        self.store.delete_expense(expense.id)?;
        Ok(expense)
    }

    pub fn add_participant(&self, id: &str, name: &str) -> Result<Participant> {
        let (id, name) = (id.trim(), name.trim());
        if id.is_empty() || name.is_empty() {
            return Err(KharchError::InvalidInput(
                "participant id and name are required".into(),
            ));
        }
        let participant = Participant::new(id, name);
        self.store.upsert_participant(participant.clone())?;
        info!(participant = id, "participant saved");
        Ok(participant)
    }

    pub fn remove_participant(&self, id: &str) -> Result<()> {
        self.store.remove_participant(id.trim())?;
        info!(participant = id, "participant removed");
        Ok(())
    }

    pub fn render_stats(&self) -> Result<String> {
        Ok(report::render_stats(&self.stats()?, &self.formatter))
    }

    /// Expense history, newest first, filtered by a search term.
    pub fn render_history(&self, term: &str) -> Result<String> {
        let snapshot = self.snapshot()?;
        let matches = ExpenseService::search(&snapshot.expenses, &snapshot.roster, term);
        if matches.is_empty() {
            return Ok("No expenses found.".to_string());
        }
        let lines: Vec<String> = matches
            .iter()
            .map(|expense| {
                format!(
                    "{}  {} paid by {}, outstanding {}  #{}",
                    expense.created_at.format("%Y-%m-%d"),
                    expense.display_label(),
                    snapshot.roster.canonical_name(&expense.payer),
                    self.formatter.format_amount(expense.outstanding_amount()),
                    expense.id
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    pub fn render_roster(&self) -> Result<String> {
        let roster = self.store.list_participants()?;
        if roster.is_empty() {
            return Ok("No participants yet.".to_string());
        }
        let lines: Vec<String> = roster.iter().map(Displayable::display_label).collect();
        Ok(lines.join("\n"))
    }

    pub fn report_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.report()?)?)
    }
}

fn parse_expense_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim().trim_start_matches('#'))
        .map_err(|_| KharchError::InvalidInput(format!("invalid expense id `{id}`")))
}
