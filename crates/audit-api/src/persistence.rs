use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use audit_core::{EngineError, KeyValueStore, StoreError};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    Engine(EngineError),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

impl From<EngineError> for PersistenceError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// String key-value table backing the identity store on disk.
#[derive(Debug)]
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn keys(&self) -> Result<Vec<String>, PersistenceError> {
        let mut statement = self.conn.prepare("SELECT key FROM kv ORDER BY key ASC")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, now_stamp()],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_kv', ?1)",
            params![now_stamp()],
        )?;

        Ok(())
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key).map_err(backend)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write(key, value).map_err(backend)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.delete(key).map_err(backend)
    }
}

fn backend(err: PersistenceError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn now_stamp() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0);
    format!("ms-{millis}")
}

#[cfg(test)]
mod tests {
    use audit_core::identity::{HISTORY_KEY, PROFILE_KEY};
    use audit_core::IdentityStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();

        std::env::temp_dir().join(format!("chain_audit_kv_{name}_{nanos}.sqlite"))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("sqlite-wal"));
        let _ = std::fs::remove_file(path.with_extension("sqlite-shm"));
    }

    #[test]
    fn set_get_overwrite_and_remove() {
        let path = temp_db_path("kv");
        let mut store = SqliteKvStore::open(&path).expect("open");

        assert_eq!(store.get("missing").expect("get"), None);
        store.set("a", "1").expect("set");
        store.set("a", "2").expect("overwrite");
        assert_eq!(store.get("a").expect("get").as_deref(), Some("2"));
        assert_eq!(store.keys().expect("keys"), vec!["a".to_string()]);

        store.remove("a").expect("remove");
        assert_eq!(store.get("a").expect("get"), None);
        cleanup(&path);
    }

    #[test]
    fn profile_survives_reopen() {
        let path = temp_db_path("profile");
        let mut rng = StdRng::seed_from_u64(4);

        let registered = {
            let store = SqliteKvStore::open(&path).expect("open");
            let mut identity = IdentityStore::new(Box::new(store));
            identity.register("alice", 100, &mut rng).expect("register")
        };

        let store = SqliteKvStore::open(&path).expect("reopen");
        assert!(store.keys().expect("keys").contains(&PROFILE_KEY.to_string()));
        assert!(!store.keys().expect("keys").contains(&HISTORY_KEY.to_string()));
        let identity = IdentityStore::new(Box::new(store));
        assert_eq!(identity.load_profile().expect("load"), Some(registered));
        drop(identity);
        cleanup(&path);
    }
}
