// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The unlock lifecycle: Locked -> Unlocked -> Locked.
//!
//! A [`Session`] owns the process's only [`KeyStore`]. The key slot sits
//! behind one mutex; [`KeyAccess::with_key`] holds that mutex for the length
//! of a single cryptographic call, so a concurrent [`Session::lock`] either
//! waits for the call to finish or wins and the caller sees `SessionLocked`.
//!
//! Expiry is absolute: it is measured from the moment of unlock and is not
//! extended by use. A background tokio task locks the session when the
//! deadline passes, and every state read re-checks the deadline as well, so
//! an expired session reports Locked even without a running timer.
//! A timeout of `None` means the session never expires on its own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use strongroom_core::StrongroomError;
use strongroom_vault::{KdfParams, KeyAccess, KeyHeader, KeyStore, MasterKey, Vault};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::script::Scripts;

/// States in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No key material resident.
    Locked,
    /// Master key resident until lock, logout or expiry.
    Unlocked,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Locked => write!(f, "locked"),
            SessionState::Unlocked => write!(f, "unlocked"),
        }
    }
}

struct Slot {
    keystore: KeyStore,
    unlocked_at: Option<Instant>,
    timer: Option<CancellationToken>,
    /// Bumped on every transition so a stale timer cannot lock a newer unlock.
    epoch: u64,
}

impl Slot {
    fn is_due(&self, timeout: Option<Duration>) -> bool {
        match (self.unlocked_at, timeout) {
            (Some(at), Some(timeout)) => at.elapsed() >= timeout,
            _ => false,
        }
    }

    /// Lock if the deadline has passed; report whether the key is usable.
    fn refresh(&mut self, timeout: Option<Duration>) -> bool {
        if self.is_due(timeout) {
            debug!("session deadline passed");
            self.lock();
        }
        self.unlocked_at.is_some() && self.keystore.is_loaded()
    }

    fn lock(&mut self) -> bool {
        let was_unlocked = self.unlocked_at.is_some();
        self.keystore.wipe();
        self.unlocked_at = None;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.epoch = self.epoch.wrapping_add(1);
        was_unlocked
    }
}

struct Inner {
    slot: Mutex<Slot>,
    scripts: Mutex<Scripts>,
    timeout: Option<Duration>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, epoch: u64) {
        let mut slot = self.slot();
        if slot.epoch == epoch && slot.lock() {
            info!("session expired, master key wiped");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.slot().lock();
    }
}

/// The single unlock state of a running process. Cheap to clone; clones
/// share the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// A locked session over `keystore`.
    pub fn new(mut keystore: KeyStore, timeout: Option<Duration>, scripts: Scripts) -> Self {
        keystore.wipe();
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot {
                    keystore,
                    unlocked_at: None,
                    timer: None,
                    epoch: 0,
                }),
                scripts: Mutex::new(scripts),
                timeout,
            }),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub fn state(&self) -> SessionState {
        if self.inner.slot().refresh(self.inner.timeout) {
            SessionState::Unlocked
        } else {
            SessionState::Locked
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == SessionState::Unlocked
    }

    /// Time left before expiry. `None` when locked or when the session never expires.
    pub fn remaining(&self) -> Option<Duration> {
        let mut slot = self.inner.slot();
        if !slot.refresh(self.inner.timeout) {
            return None;
        }
        let (at, timeout) = (slot.unlocked_at?, self.inner.timeout?);
        Some(timeout.saturating_sub(at.elapsed()))
    }

    /// Verify `password` and move to Unlocked, starting the expiry clock.
    ///
    /// The KDF runs without holding the key slot, so the timer and other
    /// readers are never blocked behind it.
    pub fn unlock(&self, password: &SecretString) -> Result<(), StrongroomError> {
        let header = self.inner.slot().keystore.header().clone();
        let key = KeyStore::new(header.clone()).verify(password.expose_secret().as_bytes())?;
        self.activate(header, key);
        info!("session unlocked");
        Ok(())
    }

    fn activate(&self, header: KeyHeader, key: MasterKey) {
        if !key.is_memory_locked() {
            warn!("master key memory is not locked against swapping");
        }
        let mut slot = self.inner.slot();
        slot.lock();
        slot.keystore.install(header, key);
        slot.unlocked_at = Some(Instant::now());

        if let Some(timeout) = self.inner.timeout
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            let token = CancellationToken::new();
            slot.timer = Some(token.clone());
            let epoch = slot.epoch;
            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            handle.spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(inner) = weak.upgrade() {
                            inner.expire(epoch);
                        }
                    }
                    _ = token.cancelled() => {}
                }
            });
        }
    }

    /// Wipe the key and move to Locked. Idempotent.
    pub fn lock(&self) {
        if self.inner.slot().lock() {
            debug!("session locked");
        }
    }

    /// User-initiated lock. Any chain in progress stops at its next step.
    pub fn logout(&self) {
        self.lock();
        info!("logged out");
    }

    /// Check a password against the vault header without changing state.
    pub fn verify_password(&self, password: &SecretString) -> Result<(), StrongroomError> {
        let header = self.inner.slot().keystore.header().clone();
        KeyStore::new(header)
            .verify(password.expose_secret().as_bytes())
            .map(drop)
    }

    /// Re-encrypt the vault under a key derived from `new_password` and keep
    /// the session on the new key. Returns the number of re-encrypted records.
    pub async fn change_password(
        &self,
        vault: &Vault,
        new_password: &SecretString,
        params: KdfParams,
    ) -> Result<usize, StrongroomError> {
        if !self.is_unlocked() {
            return Err(StrongroomError::SessionLocked);
        }
        let (new_key, header) =
            KeyHeader::generate(new_password.expose_secret().as_bytes(), params)?;
        let count = vault.rekey(self, &new_key, &header).await?;

        let mut slot = self.inner.slot();
        let still_unlocked = slot.refresh(self.inner.timeout);
        slot.keystore.install(header, new_key);
        if !still_unlocked {
            slot.keystore.wipe();
        }
        info!(records = count, "master password changed");
        Ok(count)
    }

    /// Snapshot of the script book.
    pub fn scripts(&self) -> Scripts {
        self.scripts_guard().clone()
    }

    pub fn set_script(&self, name: impl Into<String>, template: impl Into<String>) {
        self.scripts_guard().insert(name, template);
    }

    pub fn remove_script(&self, name: &str) -> bool {
        self.scripts_guard().remove(name).is_some()
    }

    fn scripts_guard(&self) -> MutexGuard<'_, Scripts> {
        self.inner
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyAccess for Session {
    fn with_key<R>(&self, f: impl FnOnce(&MasterKey) -> R) -> Result<R, StrongroomError> {
        let mut slot = self.inner.slot();
        if !slot.refresh(self.inner.timeout) {
            return Err(StrongroomError::SessionLocked);
        }
        slot.keystore.with_key(f)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}
