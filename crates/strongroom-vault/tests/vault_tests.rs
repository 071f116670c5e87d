// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the transactional vault against a real SQLite file.

use strongroom_core::{Collection, StrongroomError};
use strongroom_vault::{
    Card, Entry, KdfParams, KeyAccess, KeyHeader, KeyStore, Note, Totp, Vault, crypto,
};
use tempfile::TempDir;

fn fast_params() -> KdfParams {
    KdfParams {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    }
}

async fn new_vault(password: &str) -> (Vault, KeyStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(dir.path().join("vault.db")).await.unwrap();
    let keys = vault
        .initialize(password.as_bytes(), fast_params())
        .await
        .unwrap();
    (vault, keys, dir)
}

/// A second connection to the vault file, for writes the API refuses.
fn raw_connection(dir: &TempDir) -> rusqlite::Connection {
    rusqlite::Connection::open(dir.path().join("vault.db")).unwrap()
}

fn raw_insert(dir: &TempDir, collection: Collection, path: &str, value: Vec<u8>) {
    raw_connection(dir)
        .execute(
            "INSERT OR REPLACE INTO records (collection, path, value) VALUES (?1, ?2, ?3)",
            rusqlite::params![collection.as_str(), path, value],
        )
        .unwrap();
}

#[tokio::test]
async fn initialize_then_reopen_and_unlock() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("vault.db");

    {
        let vault = Vault::open(&db_path).await.unwrap();
        assert!(!vault.is_initialized().await.unwrap());
        let keys = vault.initialize(b"correct horse", fast_params()).await.unwrap();
        vault
            .create(&keys, &Entry::new("github").with_password("hunter2"))
            .await
            .unwrap();
        vault.close().await.unwrap();
    }

    let vault = Vault::open(&db_path).await.unwrap();
    assert!(vault.is_initialized().await.unwrap());
    let mut keys = vault.keystore().await.unwrap();
    assert!(!keys.is_loaded());
    assert!(matches!(
        vault.get::<Entry>(&keys, "github").await,
        Err(StrongroomError::SessionLocked)
    ));

    keys.unlock(b"correct horse").unwrap();
    let entry: Entry = vault.get(&keys, "GitHub").await.unwrap();
    assert_eq!(entry.password, "hunter2");
}

#[tokio::test]
async fn initialize_twice_fails() {
    let (vault, _keys, _dir) = new_vault("pw").await;
    let err = vault.initialize(b"other", fast_params()).await.unwrap_err();
    assert!(matches!(err, StrongroomError::AlreadyExists { .. }));
    // The original header still verifies.
    assert!(vault.keystore().await.unwrap().verify(b"pw").is_ok());
}

#[tokio::test]
async fn wrong_password_leaves_no_key_resident() {
    let (vault, _keys, _dir) = new_vault("right").await;
    let mut keys = vault.keystore().await.unwrap();
    assert!(keys.unlock(b"wrong").unwrap_err().is_auth_failure());
    assert!(!keys.is_loaded());
}

#[tokio::test]
async fn create_twice_keeps_first_record() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault
        .create(&keys, &Entry::new("mail").with_password("first"))
        .await
        .unwrap();

    let err = vault
        .create(&keys, &Entry::new("Mail/").with_password("second"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StrongroomError::AlreadyExists {
            collection: Collection::Entries,
            ..
        }
    ));

    assert_eq!(vault.list_names(Collection::Entries).await.unwrap(), ["mail"]);
    let entry: Entry = vault.get(&keys, "mail").await.unwrap();
    assert_eq!(entry.password, "first");
}

#[tokio::test]
async fn same_path_in_different_collections_is_allowed() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault.create(&keys, &Entry::new("bank")).await.unwrap();
    vault.create(&keys, &Card::new("bank")).await.unwrap();
    vault.create(&keys, &Note::new("bank", "pin hint")).await.unwrap();
    assert!(vault.exists(Collection::Cards, "bank").await.unwrap());
}

#[tokio::test]
async fn invalid_path_is_rejected_before_storage() {
    let (vault, keys, _dir) = new_vault("pw").await;
    let err = vault.create(&keys, &Entry::new(" // ")).await.unwrap_err();
    assert!(matches!(err, StrongroomError::InvalidPath { .. }));
    assert!(vault.list_names(Collection::Entries).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let (vault, keys, _dir) = new_vault("pw").await;
    let err = vault.get::<Note>(&keys, "nope").await.unwrap_err();
    assert_eq!(err.to_string(), "\"nope\" does not exist in notes");
}

#[tokio::test]
async fn remove_prefix_deletes_only_the_folder() {
    let (vault, keys, _dir) = new_vault("pw").await;
    for name in ["folder/a", "folder/b", "other", "folderish"] {
        vault.create(&keys, &Entry::new(name)).await.unwrap();
    }

    let removed = vault
        .remove_prefix(Collection::Entries, "folder/")
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        vault.list_names(Collection::Entries).await.unwrap(),
        ["folderish", "other"]
    );

    assert!(matches!(
        vault.remove_prefix(Collection::Entries, "folder").await,
        Err(StrongroomError::NotFound { .. })
    ));
}

#[tokio::test]
async fn remove_exact_path() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault.create(&keys, &Entry::new("a")).await.unwrap();
    vault.remove(Collection::Entries, "A").await.unwrap();
    assert!(matches!(
        vault.remove(Collection::Entries, "a").await,
        Err(StrongroomError::NotFound { .. })
    ));
}

#[tokio::test]
async fn update_renames_atomically() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault
        .create(&keys, &Entry::new("old").with_username("me"))
        .await
        .unwrap();

    let moved = vault
        .update(&keys, "old", &Entry::new("new/place").with_username("me"))
        .await
        .unwrap();
    assert_eq!(moved, "new/place");
    assert_eq!(
        vault.list_names(Collection::Entries).await.unwrap(),
        ["new/place"]
    );
    let entry: Entry = vault.get(&keys, "new/place").await.unwrap();
    assert_eq!(entry.username, "me");
}

#[tokio::test]
async fn update_in_place_changes_content() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault.create(&keys, &Note::new("todo", "v1")).await.unwrap();
    vault
        .update(&keys, "todo", &Note::new("todo", "v2"))
        .await
        .unwrap();
    let note: Note = vault.get(&keys, "todo").await.unwrap();
    assert_eq!(note.content, "v2");
}

#[tokio::test]
async fn update_onto_existing_path_changes_nothing() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault.create(&keys, &Note::new("a", "alpha")).await.unwrap();
    vault.create(&keys, &Note::new("b", "beta")).await.unwrap();

    let err = vault
        .update(&keys, "a", &Note::new("b", "clobber"))
        .await
        .unwrap_err();
    assert!(matches!(err, StrongroomError::AlreadyExists { .. }));

    let a: Note = vault.get(&keys, "a").await.unwrap();
    let b: Note = vault.get(&keys, "b").await.unwrap();
    assert_eq!(a.content, "alpha");
    assert_eq!(b.content, "beta");
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let (vault, keys, _dir) = new_vault("pw").await;
    let err = vault
        .update(&keys, "ghost", &Note::new("ghost", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, StrongroomError::NotFound { .. }));
}

#[tokio::test]
async fn list_is_sorted_and_restartable() {
    let (vault, keys, _dir) = new_vault("pw").await;
    for name in ["zeta", "alpha", "mid/one"] {
        vault.create(&keys, &Note::new(name, name)).await.unwrap();
    }

    let first: Vec<String> = vault
        .list::<Note, _>(&keys)
        .await
        .unwrap()
        .map(|(path, note)| {
            assert_eq!(note.unwrap().content, path);
            path
        })
        .collect();
    assert_eq!(first, ["alpha", "mid/one", "zeta"]);

    vault.remove(Collection::Notes, "alpha").await.unwrap();
    let second = vault.list::<Note, _>(&keys).await.unwrap();
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn tampered_record_fails_alone_during_listing() {
    let (vault, keys, dir) = new_vault("pw").await;
    vault.create(&keys, &Entry::new("a")).await.unwrap();
    vault.create(&keys, &Entry::new("b")).await.unwrap();
    vault.create(&keys, &Entry::new("c")).await.unwrap();

    let conn = raw_connection(&dir);
    let mut value: Vec<u8> = conn
        .query_row(
            "SELECT value FROM records WHERE collection = 'entries' AND path = 'b'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let last = value.len() - 1;
    value[last] ^= 0x01;
    conn.execute(
        "UPDATE records SET value = ?1 WHERE collection = 'entries' AND path = 'b'",
        rusqlite::params![value],
    )
    .unwrap();
    drop(conn);

    let results: Vec<(String, bool)> = vault
        .list::<Entry, _>(&keys)
        .await
        .unwrap()
        .map(|(path, record)| {
            if let Err(e) = &record {
                assert!(matches!(e, StrongroomError::DecryptionFailure));
            }
            (path, record.is_ok())
        })
        .collect();
    assert_eq!(
        results,
        [
            ("a".to_string(), true),
            ("b".to_string(), false),
            ("c".to_string(), true)
        ]
    );
}

#[tokio::test]
async fn wrong_key_fails_every_record_but_names_still_list() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault.create(&keys, &Card::new("visa")).await.unwrap();
    vault.create(&keys, &Card::new("amex")).await.unwrap();

    let (_other_vault, other_keys, _other_dir) = new_vault("pw").await;
    let failures = vault
        .list::<Card, _>(&other_keys)
        .await
        .unwrap()
        .filter(|(_, record)| matches!(record, Err(StrongroomError::DecryptionFailure)))
        .count();
    assert_eq!(failures, 2);

    let locked = vault.keystore().await.unwrap();
    assert!(!locked.is_loaded());
    assert_eq!(
        vault.list_names(Collection::Cards).await.unwrap(),
        ["amex", "visa"]
    );
}

#[tokio::test]
async fn unknown_record_format_fails_closed() {
    let (vault, keys, dir) = new_vault("pw").await;
    let mut payload = vec![9u8];
    payload.extend_from_slice(br#"{"name":"future","content":"x"}"#);
    let envelope = keys
        .with_key(|key| crypto::encrypt(key, &payload))
        .unwrap()
        .unwrap();
    raw_insert(&dir, Collection::Notes, "future", envelope.to_bytes());

    assert!(matches!(
        vault.get::<Note>(&keys, "future").await,
        Err(StrongroomError::UnsupportedFormat { version: 9 })
    ));
}

#[tokio::test]
async fn rekey_reencrypts_everything() {
    let (vault, keys, _dir) = new_vault("old").await;
    vault
        .create(&keys, &Entry::new("e").with_password("p"))
        .await
        .unwrap();
    vault
        .create(&keys, &Totp::new("t", "JBSWY3DPEHPK3PXP"))
        .await
        .unwrap();

    let (new_key, header) = KeyHeader::generate(b"new", fast_params()).unwrap();
    let count = vault.rekey(&keys, &new_key, &header).await.unwrap();
    assert_eq!(count, 2);

    let mut reopened = vault.keystore().await.unwrap();
    assert!(reopened.unlock(b"old").unwrap_err().is_auth_failure());
    reopened.unlock(b"new").unwrap();
    let entry: Entry = vault.get(&reopened, "e").await.unwrap();
    assert_eq!(entry.password, "p");
    let totp: Totp = vault.get(&reopened, "t").await.unwrap();
    assert_eq!(totp.secret, "JBSWY3DPEHPK3PXP");
}

#[tokio::test]
async fn rekey_with_tampered_record_changes_nothing() {
    let (vault, keys, dir) = new_vault("old").await;
    vault.create(&keys, &Note::new("good", "ok")).await.unwrap();
    raw_insert(&dir, Collection::Notes, "bad", vec![1u8; 40]);

    let (new_key, header) = KeyHeader::generate(b"new", fast_params()).unwrap();
    let err = vault.rekey(&keys, &new_key, &header).await.unwrap_err();
    assert!(matches!(err, StrongroomError::DecryptionFailure));

    let mut reopened = vault.keystore().await.unwrap();
    reopened.unlock(b"old").unwrap();
    let note: Note = vault.get(&reopened, "good").await.unwrap();
    assert_eq!(note.content, "ok");
}

#[tokio::test]
async fn stats_and_scripts() {
    let (vault, keys, _dir) = new_vault("pw").await;
    vault.create(&keys, &Entry::new("a")).await.unwrap();
    vault.create(&keys, &Entry::new("b")).await.unwrap();
    vault.create(&keys, &Card::new("c")).await.unwrap();
    vault.save_script("cards", "card ls $1").await.unwrap();
    vault.save_script("cards", "card ls").await.unwrap();

    let stats = vault.stats().await.unwrap();
    assert_eq!(stats[&Collection::Entries], 2);
    assert_eq!(stats[&Collection::Cards], 1);
    assert_eq!(stats[&Collection::Notes], 0);
    assert_eq!(stats[&Collection::Scripts], 1);
    assert!(!stats.contains_key(&Collection::Config));

    let scripts = vault.scripts().await.unwrap();
    assert_eq!(scripts["cards"], "card ls");

    vault.remove_script("cards").await.unwrap();
    assert!(matches!(
        vault.remove_script("cards").await,
        Err(StrongroomError::ScriptNotFound(_))
    ));
}

#[tokio::test]
async fn path_operations_refuse_metadata_collections() {
    let (vault, _keys, _dir) = new_vault("pw").await;
    vault.save_script("cards", "card ls").await.unwrap();

    assert!(matches!(
        vault.remove_prefix(Collection::Config, "").await,
        Err(StrongroomError::Internal(_))
    ));
    assert!(vault.remove(Collection::Scripts, "cards").await.is_err());
    assert!(vault.list_names(Collection::Config).await.is_err());
    assert!(vault.exists(Collection::Config, "salt").await.is_err());

    assert!(vault.is_initialized().await.unwrap());
    assert_eq!(vault.scripts().await.unwrap().len(), 1);
}
