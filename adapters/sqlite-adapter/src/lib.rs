//! sqlite-adapter: SQLite implementation of the ProfileRepository port for local/dev.
//!
//! Purpose
//! - Provide a lightweight, file-based document store to run the service
//!   locally without cloud dependencies.
//! - Implements the `ProfileRepository` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - rusqlite is blocking, so every statement runs on tokio's blocking pool.
//! - New profiles get a random UUID v4 as their id.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use domain::{CoreError, Profile, ProfileId, ProfileRepository};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed profile repository.
#[derive(Clone)]
pub struct SqliteProfileRepo {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_open_err)?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, gone when the repo is dropped.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_open_err)?;
        Self::with_connection(conn)
    }

    /// Open `path`, creating its parent directory first if needed.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| CoreError::StoreUnavailable(format!("create {}: {e}", dir.display())))?;
            }
        }
        Self::new(path)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CoreError::Repository(format!("blocking task failed: {e}")))?
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn map_open_err<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::StoreUnavailable(format!("sqlite open: {e}"))
}

fn row_to_profile(row: &rusqlite::Row) -> Result<Profile, CoreError> {
    let id: String = row.get(0).map_err(map_sqerr)?;
    let email: String = row.get(1).map_err(map_sqerr)?;
    let id = ProfileId::new(id).map_err(|e| CoreError::Repository(format!("bad id in db: {e}")))?;
    Ok(Profile::with_id(id, email))
}

fn new_id() -> ProfileId {
    ProfileId::new(uuid::Uuid::new_v4().to_string()).expect("uuid strings are non-empty")
}

impl ProfileRepository for SqliteProfileRepo {
    fn find_all(&self) -> impl Future<Output = Result<Vec<Profile>, CoreError>> + Send {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, email FROM profiles")
                .map_err(map_sqerr)?;
            let mut rows = stmt.query([]).map_err(map_sqerr)?;
            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(map_sqerr)? {
                out.push(row_to_profile(row)?);
            }
            Ok(out)
        })
    }

    fn find_by_id(
        &self,
        id: &ProfileId,
    ) -> impl Future<Output = Result<Option<Profile>, CoreError>> + Send {
        let id = id.as_str().to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, email FROM profiles WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()
                .map_err(map_sqerr)?;
            match row {
                Some((id, email)) => {
                    let id = ProfileId::new(id)
                        .map_err(|e| CoreError::Repository(format!("bad id in db: {e}")))?;
                    Ok(Some(Profile::with_id(id, email)))
                }
                None => Ok(None),
            }
        })
    }

    fn save(&self, profile: Profile) -> impl Future<Output = Result<Profile, CoreError>> + Send {
        let id = profile.id.unwrap_or_else(new_id);
        let stored = Profile::with_id(id.clone(), profile.email);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO profiles(id, email) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET email = excluded.email",
                params![id.as_str(), stored.email],
            )
            .map_err(map_sqerr)?;
            Ok(stored)
        })
    }

    fn delete_by_id(&self, id: &ProfileId) -> impl Future<Output = Result<(), CoreError>> + Send {
        let id = id.as_str().to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM profiles WHERE id = ?1", params![id])
                .map_err(map_sqerr)?;
            Ok(())
        })
    }

    fn delete_all(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM profiles", []).map_err(map_sqerr)?;
            Ok(())
        })
    }
}
