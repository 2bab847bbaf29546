//! Key-value record store.
//!
//! Every collection lives under its own key as one JSON document and is read
//! and written whole. Handlers only ever see `dyn RecordStore`, so the SQLite
//! store and the in-memory store are interchangeable.

use crate::config::{
    CLASSES_KEY, SEED_ADMIN_NAME, SEED_ADMIN_PASSWORD, SEED_ADMIN_USERNAME, SEED_CLASSES,
    USERS_KEY,
};
use crate::model::{slugify, ClassRoom, User, UserRole};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

pub trait RecordStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;

    /// Writes all entries or none of them.
    fn set_many(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

/// Missing key reads as an empty collection.
pub fn load_list<T: DeserializeOwned>(store: &dyn RecordStore, key: &str) -> anyhow::Result<Vec<T>> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw).with_context(|| format!("{} is not valid", key)),
        None => Ok(Vec::new()),
    }
}

pub fn save_list<T: Serialize>(store: &mut dyn RecordStore, key: &str, items: &[T]) -> anyhow::Result<()> {
    let raw = encode_list(key, items)?;
    store.set(key, &raw)
}

/// Encodes a collection for a `set_many` entry.
pub fn encode_list<T: Serialize>(key: &str, items: &[T]) -> anyhow::Result<String> {
    serde_json::to_string(items).with_context(|| format!("failed to encode {}", key))
}

pub fn load_value<T: DeserializeOwned>(store: &dyn RecordStore, key: &str) -> anyhow::Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => {
            let v = serde_json::from_str(&raw).with_context(|| format!("{} is not valid", key))?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

pub fn save_value<T: Serialize>(store: &mut dyn RecordStore, key: &str, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value).with_context(|| format!("failed to encode {}", key))?;
    store.set(key, &raw)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_seeded: bool,
    pub classes_seeded: bool,
}

/// First-open defaults: one admin account and the standard nursery classes.
/// Keys that already exist are left untouched, even when empty.
pub fn seed_defaults(store: &mut dyn RecordStore) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    if store.get(USERS_KEY)?.is_none() {
        let admin = User {
            username: SEED_ADMIN_USERNAME.to_string(),
            name: SEED_ADMIN_NAME.to_string(),
            role: UserRole::Admin,
            email: None,
            password: Some(SEED_ADMIN_PASSWORD.to_string()),
            school_id: None,
        };
        save_list(store, USERS_KEY, &[admin])?;
        summary.users_seeded = true;
    }

    if store.get(CLASSES_KEY)?.is_none() {
        let classes: Vec<ClassRoom> = SEED_CLASSES
            .iter()
            .map(|name| ClassRoom {
                id: slugify(name),
                name: name.to_string(),
                teacher_username: None,
            })
            .collect();
        save_list(store, CLASSES_KEY, &classes)?;
        summary.classes_seeded = true;
    }

    Ok(summary)
}
