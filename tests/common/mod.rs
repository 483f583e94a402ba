#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use kharch::{config::Config, session::Session};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a fresh directory that outlives the calling test.
pub fn temp_root() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Opens a session on an isolated, empty store with default settings.
pub fn setup_session() -> Session {
    Session::open(Config::default(), Some(temp_root().join("data"))).expect("open session")
}

/// Opens a session whose store already holds the demo roster and expenses.
pub fn seeded_session() -> Session {
    let session = setup_session();
    session.store().seed_demo_data().expect("seed demo data");
    session
}
