//! Persistence of saved queries and environments.
//!
//! The rest of the crate only talks to the [`Store`] trait. [`SqliteStore`]
//! is the implementation used by the binary; tests use its in-memory form.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::query::{Method, Query};

/// Record-level storage for [`Query`] and [`Environment`].
///
/// Every mutating method is a single statement, so a failure leaves the
/// record either fully changed or untouched.
pub trait Store {
    fn find_query(&self, name: &str) -> Result<Option<Query>>;
    /// Insert a new query and return its id. A taken name fails with
    /// [`Error::AlreadyExists`].
    fn insert_query(&self, query: &Query) -> Result<i64>;
    /// All saved queries ordered by name.
    fn list_queries(&self) -> Result<Vec<Query>>;

    fn find_environment(&self, name: &str) -> Result<Option<Environment>>;
    fn current_environment(&self) -> Result<Option<Environment>>;
    /// All environments ordered by name.
    fn list_environments(&self) -> Result<Vec<Environment>>;
    fn insert_environment(&self, env: &Environment) -> Result<i64>;
    fn update_environment_variables(&self, env: &Environment) -> Result<()>;
    /// Returns `false` when no environment had that name.
    fn delete_environment(&self, name: &str) -> Result<bool>;
    /// Flag `name` as current and every other environment as not current.
    fn set_current_environment(&self, name: &str) -> Result<()>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS queries (
     id INTEGER PRIMARY KEY AUTOINCREMENT,
     name TEXT NOT NULL UNIQUE,
     method TEXT NOT NULL,
     url TEXT NOT NULL,
     data TEXT NOT NULL DEFAULT '{}',
     header TEXT NOT NULL DEFAULT '{}',
     cookie TEXT NOT NULL DEFAULT '{}',
     is_json INTEGER NOT NULL DEFAULT 0,
     created_at TEXT NOT NULL,
     updated_at TEXT NOT NULL
   );
   CREATE TABLE IF NOT EXISTS environments (
     id INTEGER PRIMARY KEY AUTOINCREMENT,
     name TEXT NOT NULL UNIQUE,
     description TEXT NOT NULL DEFAULT '',
     variables TEXT NOT NULL DEFAULT '{}',
     current INTEGER NOT NULL DEFAULT 0,
     created_at TEXT NOT NULL,
     updated_at TEXT NOT NULL
   );";

const QUERY_COLUMNS: &str =
    "id, name, method, url, data, header, cookie, is_json, created_at, updated_at";
const ENV_COLUMNS: &str = "id, name, description, variables, current, created_at, updated_at";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!(path = %path.display(), "opened query database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn find_query(&self, name: &str) -> Result<Option<Query>> {
        let sql = format!("SELECT {QUERY_COLUMNS} FROM queries WHERE name = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, params![name], query_from_row)
            .optional()?)
    }

    fn insert_query(&self, query: &Query) -> Result<i64> {
        let now = Utc::now();
        let res = self.conn.execute(
            "INSERT INTO queries (name, method, url, data, header, cookie, is_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                query.name,
                query.method,
                query.url,
                serde_json::to_string(&query.data)?,
                serde_json::to_string(&query.header)?,
                serde_json::to_string(&query.cookie)?,
                query.is_json,
                now,
            ],
        );
        map_unique(res, "query", &query.name)?;
        tracing::debug!(name = %query.name, "query saved");
        Ok(self.conn.last_insert_rowid())
    }

    fn list_queries(&self) -> Result<Vec<Query>> {
        let sql = format!("SELECT {QUERY_COLUMNS} FROM queries ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], query_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_environment(&self, name: &str) -> Result<Option<Environment>> {
        let sql = format!("SELECT {ENV_COLUMNS} FROM environments WHERE name = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, params![name], env_from_row)
            .optional()?)
    }

    fn current_environment(&self) -> Result<Option<Environment>> {
        let sql = format!("SELECT {ENV_COLUMNS} FROM environments WHERE current = 1 LIMIT 1");
        Ok(self.conn.query_row(&sql, [], env_from_row).optional()?)
    }

    fn list_environments(&self) -> Result<Vec<Environment>> {
        let sql = format!("SELECT {ENV_COLUMNS} FROM environments ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], env_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_environment(&self, env: &Environment) -> Result<i64> {
        let now = Utc::now();
        let res = self.conn.execute(
            "INSERT INTO environments (name, description, variables, current, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                env.name,
                env.description,
                serde_json::to_string(&env.variables)?,
                env.current,
                now,
            ],
        );
        map_unique(res, "environment", &env.name)?;
        tracing::debug!(name = %env.name, "environment created");
        Ok(self.conn.last_insert_rowid())
    }

    fn update_environment_variables(&self, env: &Environment) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE environments SET variables = ?2, updated_at = ?3 WHERE name = ?1",
            params![env.name, serde_json::to_string(&env.variables)?, Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound {
                entity: "environment",
                name: env.name.clone(),
            });
        }
        Ok(())
    }

    fn delete_environment(&self, name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM environments WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }

    fn set_current_environment(&self, name: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE environments
             SET current = (name = ?1),
                 updated_at = CASE WHEN name = ?1 THEN ?2 ELSE updated_at END",
            params![name, Utc::now()],
        )?;
        tracing::debug!(name, rows = changed, "current environment switched");
        Ok(())
    }
}

fn map_unique(res: rusqlite::Result<usize>, entity: &'static str, name: &str) -> Result<()> {
    match res {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(Error::AlreadyExists {
                entity,
                name: name.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn json_map(row: &Row<'_>, column: &str) -> rusqlite::Result<BTreeMap<String, String>> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| {
        let idx = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

fn query_from_row(row: &Row<'_>) -> rusqlite::Result<Query> {
    Ok(Query {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        method: row.get("method")?,
        url: row.get("url")?,
        data: json_map(row, "data")?,
        header: json_map(row, "header")?,
        cookie: json_map(row, "cookie")?,
        is_json: row.get("is_json")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn env_from_row(row: &Row<'_>) -> rusqlite::Result<Environment> {
    Ok(Environment {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        variables: json_map(row, "variables")?,
        current: row.get("current")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl ToSql for Method {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Method {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query(name: &str) -> Query {
        let mut q = Query::new(Method::Post, "http://%{host}%/items");
        q.name = name.to_string();
        q.data.insert("title".to_string(), "hello".to_string());
        q.header.insert("x-trace".to_string(), "1".to_string());
        q.cookie.insert("session".to_string(), "abc".to_string());
        q.is_json = true;
        q
    }

    // ==================== query records ====================

    #[test]
    fn test_insert_and_find_query() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_query(&sample_query("demo/post")).unwrap();
        assert!(id > 0);

        let found = store.find_query("demo/post").unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.method, Method::Post);
        assert_eq!(found.url, "http://%{host}%/items");
        assert_eq!(found.data["title"], "hello");
        assert_eq!(found.header["x-trace"], "1");
        assert_eq!(found.cookie["session"], "abc");
        assert!(found.is_json);
    }

    #[test]
    fn test_find_missing_query() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.find_query("nope").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_query_is_already_exists() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_query(&sample_query("dup")).unwrap();
        let err = store.insert_query(&sample_query("dup")).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { entity: "query", .. }));
    }

    #[test]
    fn test_list_queries_ordered_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_query(&sample_query("b/two")).unwrap();
        store.insert_query(&sample_query("a/one")).unwrap();
        let names: Vec<String> = store
            .list_queries()
            .unwrap()
            .into_iter()
            .map(|q| q.name)
            .collect();
        assert_eq!(names, vec!["a/one", "b/two"]);
    }

    // ==================== environment records ====================

    #[test]
    fn test_environment_roundtrip_and_current_switch() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut default_env = Environment::new("default", "");
        default_env.current = true;
        store.insert_environment(&default_env).unwrap();
        let mut staging = Environment::new("staging", "pre-prod");
        staging
            .variables
            .insert("host".to_string(), "staging.local".to_string());
        store.insert_environment(&staging).unwrap();

        assert_eq!(store.current_environment().unwrap().unwrap().name, "default");

        store.set_current_environment("staging").unwrap();
        let current = store.current_environment().unwrap().unwrap();
        assert_eq!(current.name, "staging");
        assert_eq!(current.variables["host"], "staging.local");

        let flagged: Vec<String> = store
            .list_environments()
            .unwrap()
            .into_iter()
            .filter(|e| e.current)
            .map(|e| e.name)
            .collect();
        assert_eq!(flagged, vec!["staging"]);
    }

    #[test]
    fn test_update_variables_of_missing_environment() {
        let store = SqliteStore::open_in_memory().unwrap();
        let env = Environment::new("ghost", "");
        assert!(matches!(
            store.update_environment_variables(&env),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_environment_reports_absence() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_environment(&Environment::new("tmp", ""))
            .unwrap();
        assert!(store.delete_environment("tmp").unwrap());
        assert!(!store.delete_environment("tmp").unwrap());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_query(&sample_query("kept")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.find_query("kept").unwrap().is_some());
    }
}
