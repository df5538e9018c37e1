//! Named variable sets and the "current" environment.
//!
//! The current environment is a persisted flag; in process it is the
//! [`Environment`] value returned by [`init`] or [`load`] and handed to
//! whatever needs to expand placeholders.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::store::Store;

/// Reserved environment that always exists and cannot be deleted.
pub const DEFAULT_ENV: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub variables: BTreeMap<String, String>,
    pub current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            variables: BTreeMap::new(),
            current: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert or replace variables and persist them in one write.
    pub fn set_variables(
        &mut self,
        store: &dyn Store,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        let mut updated = self.clone();
        updated.variables.extend(pairs);
        store.update_environment_variables(&updated)?;
        *self = updated;
        Ok(())
    }

    /// Remove a variable and persist the change.
    pub fn remove_variable(&mut self, store: &dyn Store, key: &str) -> Result<()> {
        let mut updated = self.clone();
        if updated.variables.remove(key).is_none() {
            return Err(Error::NotFound {
                entity: "variable",
                name: key.to_string(),
            });
        }
        store.update_environment_variables(&updated)?;
        *self = updated;
        Ok(())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.current {
            f.write_str("* ")?;
        }
        f.write_str(&self.name)?;
        if !self.description.is_empty() {
            write!(f, " - {}", self.description)?;
        }
        Ok(())
    }
}

/// Make sure the `default` environment exists and return the current one.
pub fn init(store: &dyn Store) -> Result<Environment> {
    if store.find_environment(DEFAULT_ENV)?.is_none() {
        let mut default_env =
            Environment::new(DEFAULT_ENV, "default environment created on first execution");
        default_env.current = store.current_environment()?.is_none();
        store.insert_environment(&default_env)?;
        tracing::info!("created the default environment");
    }
    match store.current_environment()? {
        Some(env) => Ok(env),
        None => load(store, DEFAULT_ENV),
    }
}

/// Create a new, non-current environment.
pub fn create(
    store: &dyn Store,
    name: &str,
    variables: BTreeMap<String, String>,
    description: &str,
) -> Result<Environment> {
    if name.is_empty() {
        return Err(Error::validation("an environment needs a name"));
    }
    if store.find_environment(name)?.is_some() {
        return Err(Error::AlreadyExists {
            entity: "environment",
            name: name.to_string(),
        });
    }
    let mut env = Environment::new(name, description);
    env.variables = variables;
    env.id = Some(store.insert_environment(&env)?);
    Ok(env)
}

/// Mark `name` as the current environment and return it.
pub fn load(store: &dyn Store, name: &str) -> Result<Environment> {
    let mut env = store.find_environment(name)?.ok_or_else(|| Error::NotFound {
        entity: "environment",
        name: name.to_string(),
    })?;
    store.set_current_environment(name)?;
    env.current = true;
    tracing::info!(env = name, "environment loaded");
    Ok(env)
}

/// Delete `name`. When it was the current environment, `default` is loaded
/// and returned so the caller can switch to it.
pub fn delete(store: &dyn Store, name: &str) -> Result<Option<Environment>> {
    if name == DEFAULT_ENV {
        return Err(Error::ProtectedEnvironment(name.to_string()));
    }
    let existing = store.find_environment(name)?.ok_or_else(|| Error::NotFound {
        entity: "environment",
        name: name.to_string(),
    })?;
    store.delete_environment(name)?;
    tracing::debug!(env = name, "environment deleted");
    if existing.current {
        return load(store, DEFAULT_ENV).map(Some);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn fresh_store() -> (SqliteStore, Environment) {
        let store = SqliteStore::open_in_memory().unwrap();
        let current = init(&store).unwrap();
        (store, current)
    }

    // ==================== init tests ====================

    #[test]
    fn test_init_creates_current_default() {
        let (store, current) = fresh_store();
        assert_eq!(current.name, DEFAULT_ENV);
        assert!(current.current);
        assert_eq!(store.list_environments().unwrap().len(), 1);
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_current() {
        let (store, _) = fresh_store();
        create(&store, "staging", BTreeMap::new(), "").unwrap();
        load(&store, "staging").unwrap();
        let current = init(&store).unwrap();
        assert_eq!(current.name, "staging");
        assert_eq!(store.list_environments().unwrap().len(), 2);
    }

    // ==================== create / load tests ====================

    #[test]
    fn test_create_duplicate_fails() {
        let (store, _) = fresh_store();
        create(&store, "staging", BTreeMap::new(), "").unwrap();
        let err = create(&store, "staging", BTreeMap::new(), "again").unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { entity: "environment", .. }));
    }

    #[test]
    fn test_create_is_not_current() {
        let (store, _) = fresh_store();
        let env = create(&store, "qa", BTreeMap::new(), "qa boxes").unwrap();
        assert!(!env.current);
        assert_eq!(store.current_environment().unwrap().unwrap().name, DEFAULT_ENV);
    }

    #[test]
    fn test_load_flips_current() {
        let (store, _) = fresh_store();
        create(&store, "staging", BTreeMap::new(), "").unwrap();
        let loaded = load(&store, "staging").unwrap();
        assert!(loaded.current);
        let currents: Vec<String> = store
            .list_environments()
            .unwrap()
            .into_iter()
            .filter(|e| e.current)
            .map(|e| e.name)
            .collect();
        assert_eq!(currents, vec!["staging"]);
    }

    #[test]
    fn test_load_missing() {
        let (store, _) = fresh_store();
        assert!(matches!(
            load(&store, "nope"),
            Err(Error::NotFound { entity: "environment", .. })
        ));
    }

    // ==================== delete tests ====================

    #[test]
    fn test_delete_default_is_protected() {
        let (store, _) = fresh_store();
        let err = delete(&store, DEFAULT_ENV).unwrap_err();
        assert!(matches!(err, Error::ProtectedEnvironment(_)));
        assert!(store.find_environment(DEFAULT_ENV).unwrap().is_some());
    }

    #[test]
    fn test_delete_current_loads_default() {
        let (store, _) = fresh_store();
        create(&store, "staging", BTreeMap::new(), "").unwrap();
        load(&store, "staging").unwrap();
        let switched = delete(&store, "staging").unwrap().unwrap();
        assert_eq!(switched.name, DEFAULT_ENV);
        assert_eq!(store.current_environment().unwrap().unwrap().name, DEFAULT_ENV);
    }

    #[test]
    fn test_delete_other_keeps_current() {
        let (store, _) = fresh_store();
        create(&store, "qa", BTreeMap::new(), "").unwrap();
        assert!(delete(&store, "qa").unwrap().is_none());
        assert!(store.find_environment("qa").unwrap().is_none());
    }

    // ==================== variables & display ====================

    #[test]
    fn test_set_and_remove_variable_persist() {
        let (store, mut current) = fresh_store();
        current
            .set_variables(&store, [("host".to_string(), "free.fr".to_string())])
            .unwrap();
        let stored = store.find_environment(DEFAULT_ENV).unwrap().unwrap();
        assert_eq!(stored.variables["host"], "free.fr");

        current.remove_variable(&store, "host").unwrap();
        let stored = store.find_environment(DEFAULT_ENV).unwrap().unwrap();
        assert!(stored.variables.is_empty());

        assert!(matches!(
            current.remove_variable(&store, "host"),
            Err(Error::NotFound { entity: "variable", .. })
        ));
    }

    #[test]
    fn test_display() {
        let mut env = Environment::new("prod", "live traffic");
        assert_eq!(env.to_string(), "prod - live traffic");
        env.current = true;
        env.description.clear();
        assert_eq!(env.to_string(), "* prod");
    }
}
