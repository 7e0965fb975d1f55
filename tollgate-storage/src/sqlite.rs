//! SQLite backend.
//!
//! Headers and claims are stored as JSON text so their order survives. All
//! statements run on the blocking pool against one shared connection.
//! Timestamps are fixed-width RFC 3339 so text order is time order.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tollgate_types::{Fields, License, SealedMaterial, StoredKey};

use crate::error::{StorageError, StorageResult};
use crate::{KeyStore, LicenseStore, UpdateOutcome};

const LICENSE_COLUMNS: &str = "id, token, headers, claims, key_id, active, created_at";
const KEY_COLUMNS: &str = "id, name, type, hmac, private, public, created_at";

/// Licenses and keys in a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn call<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Backend("sqlite connection lock poisoned".into()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("sqlite task failed: {e}")))?
    }
}

fn init_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            token TEXT NOT NULL,
            headers TEXT NOT NULL,
            claims TEXT NOT NULL,
            key_id TEXT NOT NULL,
            active INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS licenses_token ON licenses(token);

        CREATE TABLE IF NOT EXISTS keys (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            hmac TEXT,
            private TEXT,
            public TEXT,
            created_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn parse_time(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("bad timestamp {raw:?}: {e}")))
}

// ── Row mapping ──────────────────────────────────────────────────

struct LicenseRow {
    id: String,
    token: String,
    headers: String,
    claims: String,
    key_id: String,
    active: bool,
    created_at: String,
}

impl LicenseRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            token: row.get(1)?,
            headers: row.get(2)?,
            claims: row.get(3)?,
            key_id: row.get(4)?,
            active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_license(self) -> StorageResult<License> {
        Ok(License {
            headers: serde_json::from_str::<Fields>(&self.headers)?,
            claims: serde_json::from_str::<Fields>(&self.claims)?,
            created_at: parse_time(&self.created_at)?,
            id: self.id,
            token: self.token,
            key_id: self.key_id,
            active: self.active,
        })
    }
}

struct KeyRow {
    id: String,
    name: String,
    key_type: String,
    hmac: Option<String>,
    private: Option<String>,
    public: Option<String>,
    created_at: String,
}

impl KeyRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            key_type: row.get(2)?,
            hmac: row.get(3)?,
            private: row.get(4)?,
            public: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_key(self) -> StorageResult<StoredKey> {
        let material = match (self.key_type.as_str(), self.hmac, self.private, self.public) {
            ("hmac", Some(hmac), _, _) => SealedMaterial::Hmac { hmac },
            ("rsa", _, Some(private), Some(public)) => SealedMaterial::Rsa { private, public },
            (other, ..) => {
                return Err(StorageError::InvalidData(format!(
                    "key {} has type {other:?} without matching material",
                    self.id
                )));
            }
        };
        Ok(StoredKey {
            created_at: parse_time(&self.created_at)?,
            id: self.id,
            name: self.name,
            material,
        })
    }
}

// ── LicenseStore ─────────────────────────────────────────────────

#[async_trait]
impl LicenseStore for SqliteStore {
    async fn add_if_not_existing(&self, license: &License) -> StorageResult<()> {
        let license = license.clone();
        self.call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO licenses (id, token, headers, claims, key_id, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT DO NOTHING",
                params![
                    license.id,
                    license.token,
                    serde_json::to_string(&license.headers)?,
                    serde_json::to_string(&license.claims)?,
                    license.key_id,
                    license.active,
                    license.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                ],
            )?;
            if inserted == 0 {
                return Err(StorageError::license_conflict(&license.id));
            }
            tracing::debug!(license_id = %license.id, "License inserted");
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<License> {
        let id = id.to_string();
        self.call(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE id = ?1"),
                    params![id],
                    LicenseRow::read,
                )
                .optional()?;
            row.ok_or_else(|| StorageError::license_not_found(&id))?
                .into_license()
        })
        .await
    }

    async fn get_by_token(&self, token: &str) -> StorageResult<License> {
        let token = token.to_string();
        self.call(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE token = ?1"),
                    params![token],
                    LicenseRow::read,
                )
                .optional()?;
            row.ok_or_else(|| {
                StorageError::license_not_found(&tollgate_types::content_id(token.as_bytes()))
            })?
            .into_license()
        })
        .await
    }

    async fn set_active(&self, id: &str, active: bool) -> StorageResult<UpdateOutcome> {
        let id = id.to_string();
        self.call(move |conn| {
            let matched: i64 = conn.query_row(
                "SELECT COUNT(*) FROM licenses WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            let modified = conn.execute(
                "UPDATE licenses SET active = ?2 WHERE id = ?1 AND active <> ?2",
                params![id, active],
            )?;
            Ok(UpdateOutcome {
                matched: u64::try_from(matched).unwrap_or_default(),
                modified: modified as u64,
            })
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> StorageResult<()> {
        let id = id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM licenses WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(StorageError::license_not_found(&id));
            }
            Ok(())
        })
        .await
    }

    async fn get_all(&self) -> StorageResult<Vec<License>> {
        self.call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LICENSE_COLUMNS} FROM licenses ORDER BY created_at, id"
            ))?;
            let rows = stmt
                .query_map([], LicenseRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(LicenseRow::into_license).collect()
        })
        .await
    }
}

// ── KeyStore ─────────────────────────────────────────────────────

#[async_trait]
impl KeyStore for SqliteStore {
    async fn add_if_not_existing(&self, key: &StoredKey) -> StorageResult<()> {
        let key = key.clone();
        self.call(move |conn| {
            let (hmac, private, public) = match &key.material {
                SealedMaterial::Hmac { hmac } => (Some(hmac.as_str()), None, None),
                SealedMaterial::Rsa { private, public } => {
                    (None, Some(private.as_str()), Some(public.as_str()))
                }
            };
            let inserted = conn.execute(
                "INSERT INTO keys (id, name, type, hmac, private, public, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT DO NOTHING",
                params![
                    key.id,
                    key.name,
                    key.key_type().as_str(),
                    hmac,
                    private,
                    public,
                    key.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                ],
            )?;
            if inserted == 0 {
                return Err(StorageError::key_conflict(&key.id));
            }
            tracing::debug!(key_id = %key.id, "Key inserted");
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<StoredKey> {
        let id = id.to_string();
        self.call(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {KEY_COLUMNS} FROM keys WHERE id = ?1"),
                    params![id],
                    KeyRow::read,
                )
                .optional()?;
            row.ok_or_else(|| StorageError::key_not_found(&id))?
                .into_key()
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> StorageResult<()> {
        let id = id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute("DELETE FROM keys WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(StorageError::key_not_found(&id));
            }
            Ok(())
        })
        .await
    }

    async fn get_all(&self) -> StorageResult<Vec<StoredKey>> {
        self.call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {KEY_COLUMNS} FROM keys ORDER BY created_at, id"))?;
            let rows = stmt
                .query_map([], KeyRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(KeyRow::into_key).collect()
        })
        .await
    }
}
