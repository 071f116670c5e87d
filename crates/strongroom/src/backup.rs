// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongroom backup` and `strongroom restore`.
//!
//! Copies go through SQLite's online backup API, so a backup is a
//! consistent snapshot of the vault file. Records stay encrypted in the
//! copy; restoring needs the master password the backup was made under.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use strongroom_core::StrongroomError;
use tracing::info;

/// Pages copied per backup step.
const PAGES_PER_STEP: std::ffi::c_int = 100;
const STEP_PAUSE: Duration = Duration::from_millis(10);

fn not_found(what: &str, path: &Path) -> StrongroomError {
    StrongroomError::storage(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{what} not found: {}", path.display()),
    ))
}

fn open_read_only(path: &Path) -> Result<Connection, StrongroomError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(StrongroomError::storage)
}

/// Copy `src` over `dst` page by page. Returns the size of `dst` in bytes.
fn copy_database(src: &Path, dst: &Path) -> Result<u64, StrongroomError> {
    let source = open_read_only(src)?;
    let mut target = Connection::open(dst).map_err(StrongroomError::storage)?;
    Backup::new(&source, &mut target)
        .and_then(|backup| backup.run_to_completion(PAGES_PER_STEP, STEP_PAUSE, None))
        .map_err(StrongroomError::storage)?;
    drop(target);
    std::fs::metadata(dst)
        .map(|meta| meta.len())
        .map_err(StrongroomError::storage)
}

/// Reject files that are not initialized vaults.
fn check_is_vault(path: &Path) -> Result<(), StrongroomError> {
    let conn = open_read_only(path)?;
    let has_canary: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE collection = 'config' AND path = 'canary')",
            [],
            |row| row.get(0),
        )
        .map_err(|_| {
            StrongroomError::Config(format!("{} is not a strongroom vault", path.display()))
        })?;
    if !has_canary {
        return Err(StrongroomError::Config(format!(
            "{} holds no initialized vault",
            path.display()
        )));
    }
    Ok(())
}

/// Write a consistent copy of the vault at `db_path` to `backup_path`.
pub fn run_backup(db_path: &Path, backup_path: &Path) -> Result<u64, StrongroomError> {
    if !db_path.exists() {
        return Err(not_found("vault", db_path));
    }
    let size = copy_database(db_path, backup_path)?;
    info!(from = %db_path.display(), to = %backup_path.display(), bytes = size, "backup written");
    Ok(size)
}

/// Path of the safety copy taken before a restore overwrites `db_path`.
pub fn pre_restore_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_owned();
    name.push(".pre-restore");
    PathBuf::from(name)
}

/// Replace the vault at `db_path` with the one in `backup_path`.
///
/// The current vault, if any, is first copied next to itself with a
/// `.pre-restore` suffix.
pub fn run_restore(db_path: &Path, backup_path: &Path) -> Result<u64, StrongroomError> {
    if !backup_path.exists() {
        return Err(not_found("backup file", backup_path));
    }
    check_is_vault(backup_path)?;

    if db_path.exists() {
        let safety = pre_restore_path(db_path);
        copy_database(db_path, &safety)?;
        info!(path = %safety.display(), "safety copy written");
    }

    let size = copy_database(backup_path, db_path)?;
    info!(from = %backup_path.display(), to = %db_path.display(), bytes = size, "vault restored");
    Ok(size)
}
