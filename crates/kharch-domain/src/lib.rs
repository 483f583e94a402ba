//! kharch-domain
//!
//! Pure domain models (Participant, Roster, Expense, ledger views, snapshots).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod common;
pub mod expense;
pub mod ledger;
pub mod participant;
pub mod snapshot;

pub use common::*;
pub use expense::*;
pub use ledger::*;
pub use participant::*;
pub use snapshot::*;
