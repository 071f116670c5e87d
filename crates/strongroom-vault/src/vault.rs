// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional record storage over named collections.
//!
//! Every collection maps a normalized path to bytes in one `records` table.
//! Record collections store envelopes produced by [`crate::crypto`]; the
//! vault encrypts before a write reaches SQLite and decrypts after a read
//! leaves it, so plaintext never crosses the storage boundary. Paths are
//! plaintext metadata and can be listed without the key.
//!
//! Each mutating operation runs in a single SQLite transaction. A logical
//! failure inside the transaction (e.g. `AlreadyExists`) returns before
//! commit, so the transaction is rolled back and nothing partial is visible.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{OptionalExtension, params};
use strongroom_core::{Collection, StrongroomError};
use tracing::{debug, info};

use crate::crypto::{self, Envelope};
use crate::database::{Database, map_tr_err};
use crate::kdf::{KdfParams, SALT_LEN};
use crate::keystore::{KeyAccess, KeyHeader, KeyStore};
use crate::memory::MasterKey;
use crate::path;
use crate::record::Record;

const HEADER_SALT: &str = "kdf_salt";
const HEADER_PARAMS: &str = "kdf_params";
const HEADER_CANARY: &str = "canary";

/// Result of a transaction body: the outer error aborts on SQLite failure,
/// the inner one carries a logical failure that skipped the commit.
type TxResult<T> = Result<Result<T, StrongroomError>, rusqlite::Error>;

/// The encrypted record store.
pub struct Vault {
    db: Database,
}

impl Vault {
    /// Open the vault file at `path`, creating an empty one if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StrongroomError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    pub async fn close(self) -> Result<(), StrongroomError> {
        self.db.close().await
    }

    fn conn(&self) -> &tokio_rusqlite::Connection {
        self.db.connection()
    }

    /// Whether a key header (salt, params, canary) has been written.
    pub async fn is_initialized(&self) -> Result<bool, StrongroomError> {
        self.conn()
            .call(|conn| -> Result<bool, rusqlite::Error> {
                row_exists(conn, Collection::Config, HEADER_CANARY)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Write a fresh key header for `password` and return an unlocked store.
    ///
    /// Fails with `AlreadyExists` if the vault already has a header.
    pub async fn initialize(
        &self,
        password: &[u8],
        params: KdfParams,
    ) -> Result<KeyStore, StrongroomError> {
        let (key, header) = KeyHeader::generate(password, params)?;
        let rows = header_rows(&header)?;

        self.conn()
            .call(move |conn| -> TxResult<()> {
                let tx = conn.transaction()?;
                if row_exists(&tx, Collection::Config, HEADER_CANARY)? {
                    return Ok(Err(StrongroomError::AlreadyExists {
                        collection: Collection::Config,
                        path: HEADER_CANARY.to_string(),
                    }));
                }
                write_header_rows(&tx, rows)?;
                tx.commit()?;
                Ok(Ok(()))
            })
            .await
            .map_err(map_tr_err)??;

        info!(
            memory_cost = params.memory_cost,
            iterations = params.iterations,
            "vault initialized"
        );
        Ok(KeyStore::unlocked(header, key))
    }

    /// Read the stored key header.
    pub async fn load_key_header(&self) -> Result<KeyHeader, StrongroomError> {
        let rows = self
            .conn()
            .call(|conn| -> Result<Vec<(String, Vec<u8>)>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT path, value FROM records WHERE collection = ?1")?;
                let rows = stmt.query_map(params![Collection::Config.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        let mut rows: BTreeMap<String, Vec<u8>> = rows.into_iter().collect();
        let mut take = |name: &str| {
            rows.remove(name)
                .ok_or_else(|| StrongroomError::Internal("vault is not initialized".to_string()))
        };

        let salt: [u8; SALT_LEN] = take(HEADER_SALT)?
            .try_into()
            .map_err(|_| corrupted_header("salt has the wrong length"))?;
        let params: KdfParams = serde_json::from_slice(&take(HEADER_PARAMS)?)
            .map_err(|_| corrupted_header("KDF parameters are unreadable"))?;
        let canary = Envelope::from_bytes(&take(HEADER_CANARY)?)
            .map_err(|_| corrupted_header("canary envelope is malformed"))?;

        Ok(KeyHeader {
            salt,
            params,
            canary,
        })
    }

    /// A locked key store for this vault.
    pub async fn keystore(&self) -> Result<KeyStore, StrongroomError> {
        Ok(KeyStore::new(self.load_key_header().await?))
    }

    /// Encrypt and insert a new record. Returns the normalized path.
    pub async fn create<R: Record>(
        &self,
        keys: &impl KeyAccess,
        record: &R,
    ) -> Result<String, StrongroomError> {
        let collection = R::COLLECTION;
        let path = path::normalize(record.path())?;
        let value = seal_record(keys, record, &path)?;

        let key_path = path.clone();
        self.conn()
            .call(move |conn| -> TxResult<()> {
                let tx = conn.transaction()?;
                if row_exists(&tx, collection, &key_path)? {
                    return Ok(Err(StrongroomError::AlreadyExists {
                        collection,
                        path: key_path,
                    }));
                }
                tx.execute(
                    "INSERT INTO records (collection, path, value) VALUES (?1, ?2, ?3)",
                    params![collection.as_str(), key_path, value],
                )?;
                tx.commit()?;
                Ok(Ok(()))
            })
            .await
            .map_err(map_tr_err)??;

        debug!(collection = %collection, path = %path, "record created");
        Ok(path)
    }

    /// Fetch and decrypt one record.
    pub async fn get<R: Record>(
        &self,
        keys: &impl KeyAccess,
        raw_path: &str,
    ) -> Result<R, StrongroomError> {
        let collection = R::COLLECTION;
        let path = path::normalize(raw_path)?;
        let key_path = path.clone();
        let value = self
            .conn()
            .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM records WHERE collection = ?1 AND path = ?2",
                    params![collection.as_str(), key_path],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        match value {
            Some(value) => open_record(keys, &value),
            None => Err(StrongroomError::NotFound { collection, path }),
        }
    }

    /// Snapshot the collection and decrypt records lazily, in path order.
    ///
    /// A record that fails to decrypt yields its own error without stopping
    /// the iteration. Call again to re-enumerate current state.
    pub async fn list<'k, R: Record, K: KeyAccess>(
        &self,
        keys: &'k K,
    ) -> Result<RecordIter<'k, K, R>, StrongroomError> {
        let collection = R::COLLECTION;
        let rows = self
            .conn()
            .call(move |conn| -> Result<Vec<(String, Vec<u8>)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT path, value FROM records WHERE collection = ?1 ORDER BY path",
                )?;
                let rows = stmt.query_map(params![collection.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        Ok(RecordIter {
            keys,
            rows: rows.into_iter(),
            _kind: PhantomData,
        })
    }

    /// Paths in `collection`, sorted. Never touches the key or the codec.
    pub async fn list_names(&self, collection: Collection) -> Result<Vec<String>, StrongroomError> {
        let collection = record_collection(collection)?;
        self.conn()
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn
                    .prepare("SELECT path FROM records WHERE collection = ?1 ORDER BY path")?;
                let rows = stmt.query_map(params![collection.as_str()], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn exists(&self, collection: Collection, raw_path: &str) -> Result<bool, StrongroomError> {
        let collection = record_collection(collection)?;
        let path = path::normalize(raw_path)?;
        self.conn()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                row_exists(conn, collection, &path)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Delete exactly one path.
    pub async fn remove(&self, collection: Collection, raw_path: &str) -> Result<(), StrongroomError> {
        let collection = record_collection(collection)?;
        let path = path::normalize(raw_path)?;
        let key_path = path.clone();
        self.conn()
            .call(move |conn| -> TxResult<()> {
                let tx = conn.transaction()?;
                let removed = tx.execute(
                    "DELETE FROM records WHERE collection = ?1 AND path = ?2",
                    params![collection.as_str(), key_path],
                )?;
                if removed == 0 {
                    return Ok(Err(StrongroomError::NotFound {
                        collection,
                        path: key_path,
                    }));
                }
                tx.commit()?;
                Ok(Ok(()))
            })
            .await
            .map_err(map_tr_err)??;

        debug!(collection = %collection, path = %path, "record removed");
        Ok(())
    }

    /// Delete every path under the folder `raw_prefix`. Returns how many were removed.
    pub async fn remove_prefix(
        &self,
        collection: Collection,
        raw_prefix: &str,
    ) -> Result<usize, StrongroomError> {
        let collection = record_collection(collection)?;
        let prefix = path::normalize_prefix(raw_prefix)?;
        let key_prefix = prefix.clone();
        let removed = self
            .conn()
            .call(move |conn| -> TxResult<usize> {
                let tx = conn.transaction()?;
                let removed = tx.execute(
                    "DELETE FROM records
                     WHERE collection = ?1 AND substr(path, 1, length(?2)) = ?2",
                    params![collection.as_str(), key_prefix],
                )?;
                if removed == 0 {
                    return Ok(Err(StrongroomError::NotFound {
                        collection,
                        path: key_prefix,
                    }));
                }
                tx.commit()?;
                Ok(Ok(removed))
            })
            .await
            .map_err(map_tr_err)??;

        debug!(collection = %collection, prefix = %prefix, removed, "folder removed");
        Ok(removed)
    }

    /// Replace the record at `old_path` with `record`, moving it if the
    /// record's own path differs. Returns the new normalized path.
    pub async fn update<R: Record>(
        &self,
        keys: &impl KeyAccess,
        old_path: &str,
        record: &R,
    ) -> Result<String, StrongroomError> {
        let collection = R::COLLECTION;
        let old = path::normalize(old_path)?;
        let new = path::normalize(record.path())?;
        let value = seal_record(keys, record, &new)?;

        let (tx_old, tx_new) = (old.clone(), new.clone());
        self.conn()
            .call(move |conn| -> TxResult<()> {
                let tx = conn.transaction()?;
                if !row_exists(&tx, collection, &tx_old)? {
                    return Ok(Err(StrongroomError::NotFound {
                        collection,
                        path: tx_old,
                    }));
                }
                if tx_new != tx_old && row_exists(&tx, collection, &tx_new)? {
                    return Ok(Err(StrongroomError::AlreadyExists {
                        collection,
                        path: tx_new,
                    }));
                }
                tx.execute(
                    "DELETE FROM records WHERE collection = ?1 AND path = ?2",
                    params![collection.as_str(), tx_old],
                )?;
                tx.execute(
                    "INSERT INTO records (collection, path, value) VALUES (?1, ?2, ?3)",
                    params![collection.as_str(), tx_new, value],
                )?;
                tx.commit()?;
                Ok(Ok(()))
            })
            .await
            .map_err(map_tr_err)??;

        debug!(collection = %collection, from = %old, to = %new, "record updated");
        Ok(new)
    }

    /// Number of stored items per record collection and script.
    pub async fn stats(&self) -> Result<BTreeMap<Collection, usize>, StrongroomError> {
        let counts = self
            .conn()
            .call(|conn| -> Result<Vec<(String, i64)>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT collection, COUNT(*) FROM records GROUP BY collection")?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        let mut stats: BTreeMap<Collection, usize> = Collection::RECORDS
            .iter()
            .chain([&Collection::Scripts])
            .map(|c| (*c, 0))
            .collect();
        for (name, count) in counts {
            if let Ok(collection) = Collection::from_str(&name)
                && collection != Collection::Config
            {
                stats.insert(collection, usize::try_from(count).unwrap_or(0));
            }
        }
        Ok(stats)
    }

    /// Store or replace a named script template (plaintext).
    pub async fn save_script(&self, name: &str, template: &str) -> Result<(), StrongroomError> {
        let (name, template) = (name.to_string(), template.as_bytes().to_vec());
        self.conn()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO records (collection, path, value) VALUES (?1, ?2, ?3)",
                    params![Collection::Scripts.as_str(), name, template],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(())
    }

    pub async fn remove_script(&self, name: &str) -> Result<(), StrongroomError> {
        let key_name = name.to_string();
        let removed = self
            .conn()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM records WHERE collection = ?1 AND path = ?2",
                    params![Collection::Scripts.as_str(), key_name],
                )
            })
            .await
            .map_err(map_tr_err)?;
        if removed == 0 {
            return Err(StrongroomError::ScriptNotFound(name.to_string()));
        }
        Ok(())
    }

    /// All stored script templates by name.
    pub async fn scripts(&self) -> Result<BTreeMap<String, String>, StrongroomError> {
        let rows = self
            .conn()
            .call(|conn| -> Result<Vec<(String, Vec<u8>)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT path, value FROM records WHERE collection = ?1 ORDER BY path",
                )?;
                let rows = stmt.query_map(params![Collection::Scripts.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        rows.into_iter()
            .map(|(name, value)| {
                let template = String::from_utf8(value).map_err(|_| {
                    StrongroomError::Internal(format!("script {name:?} is not valid UTF-8"))
                })?;
                Ok((name, template))
            })
            .collect()
    }

    /// Re-encrypt every record under `new_key` and swap in `header`, all in
    /// one transaction. Returns the number of re-encrypted records.
    ///
    /// Records are decrypted with the current key before the transaction
    /// starts. Each row is rewritten only if it still holds the bytes that
    /// were read; otherwise the whole change is rolled back.
    pub async fn rekey(
        &self,
        keys: &impl KeyAccess,
        new_key: &MasterKey,
        header: &KeyHeader,
    ) -> Result<usize, StrongroomError> {
        let rows = self
            .conn()
            .call(|conn| -> Result<Vec<(String, String, Vec<u8>)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT collection, path, value FROM records
                     WHERE collection IN (?1, ?2, ?3, ?4)",
                )?;
                let [a, b, c, d] = Collection::RECORDS.map(|c| c.as_str());
                let rows = stmt.query_map(params![a, b, c, d], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;

        let mut rewritten = Vec::with_capacity(rows.len());
        for (collection, path, old_value) in rows {
            let plaintext = keys.with_key(|key| crypto::open_bytes(key, &old_value))??;
            let new_value = crypto::encrypt(new_key, &plaintext)?.to_bytes();
            rewritten.push((collection, path, old_value, new_value));
        }
        let header_values = header_rows(header)?;

        let count = self
            .conn()
            .call(move |conn| -> TxResult<usize> {
                let tx = conn.transaction()?;
                for (collection, path, old_value, new_value) in &rewritten {
                    let changed = tx.execute(
                        "UPDATE records SET value = ?4
                         WHERE collection = ?1 AND path = ?2 AND value = ?3",
                        params![collection, path, old_value, new_value],
                    )?;
                    if changed == 0 {
                        return Ok(Err(StrongroomError::Internal(
                            "vault changed during password change".to_string(),
                        )));
                    }
                }
                write_header_rows(&tx, header_values)?;
                tx.commit()?;
                Ok(Ok(rewritten.len()))
            })
            .await
            .map_err(map_tr_err)??;

        info!(records = count, "vault re-encrypted under new master key");
        Ok(count)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.db.path())
            .finish()
    }
}

/// Lazily decrypting iterator returned by [`Vault::list`].
pub struct RecordIter<'k, K, R> {
    keys: &'k K,
    rows: std::vec::IntoIter<(String, Vec<u8>)>,
    _kind: PhantomData<fn() -> R>,
}

impl<K: KeyAccess, R: Record> Iterator for RecordIter<'_, K, R> {
    type Item = (String, Result<R, StrongroomError>);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, value) = self.rows.next()?;
        let record = open_record(self.keys, &value);
        Some((path, record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<K: KeyAccess, R: Record> ExactSizeIterator for RecordIter<'_, K, R> {}

fn seal_record<R: Record>(
    keys: &impl KeyAccess,
    record: &R,
    path: &str,
) -> Result<Vec<u8>, StrongroomError> {
    let mut record = record.clone();
    record.set_path(path.to_string());
    let plaintext = record.to_plaintext()?;
    let envelope = keys.with_key(|key| crypto::encrypt(key, &plaintext))??;
    Ok(envelope.to_bytes())
}

fn open_record<R: Record>(keys: &impl KeyAccess, value: &[u8]) -> Result<R, StrongroomError> {
    let plaintext = keys.with_key(|key| crypto::open_bytes(key, value))??;
    R::from_plaintext(&plaintext)
}

/// Path-addressed operations only touch the encrypted collections; the key
/// header and scripts have their own accessors.
fn record_collection(collection: Collection) -> Result<Collection, StrongroomError> {
    if collection.holds_records() {
        Ok(collection)
    } else {
        Err(StrongroomError::Internal(format!(
            "{collection} is not a record collection"
        )))
    }
}

fn row_exists(
    conn: &rusqlite::Connection,
    collection: Collection,
    path: &str,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM records WHERE collection = ?1 AND path = ?2",
        params![collection.as_str(), path],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

fn header_rows(header: &KeyHeader) -> Result<[(&'static str, Vec<u8>); 3], StrongroomError> {
    let params = serde_json::to_vec(&header.params)
        .map_err(|e| StrongroomError::Internal(format!("failed to encode KDF parameters: {e}")))?;
    Ok([
        (HEADER_SALT, header.salt.to_vec()),
        (HEADER_PARAMS, params),
        (HEADER_CANARY, header.canary.to_bytes()),
    ])
}

fn write_header_rows(
    tx: &rusqlite::Transaction<'_>,
    rows: [(&'static str, Vec<u8>); 3],
) -> Result<(), rusqlite::Error> {
    for (name, value) in rows {
        tx.execute(
            "INSERT OR REPLACE INTO records (collection, path, value) VALUES (?1, ?2, ?3)",
            params![Collection::Config.as_str(), name, value],
        )?;
    }
    Ok(())
}

fn corrupted_header(detail: &str) -> StrongroomError {
    StrongroomError::Internal(format!("corrupted vault header: {detail}"))
}
