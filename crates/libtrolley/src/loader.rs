// SPDX-License-Identifier: MIT OR Apache-2.0

//! per-request batching caches for stores and tags looked up by key.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{
    Error, Result,
    criteria::{Include, key_criteria},
    service::RecordService,
    types::{Store, Tag},
};

/// memoizing key lookup over one record kind.
///
/// a loader lives as long as the request that created it; entries are
/// dropped with [`KeyedLoader::clear`] or [`KeyedLoader::clear_all`] when
/// the underlying records change.
pub struct KeyedLoader<T> {
    service: Arc<dyn RecordService<T>>,
    label: &'static str,
    parent: Include,
    session: Option<String>,
    cache: Mutex<HashMap<String, T>>,
}

pub type StoreLoader = KeyedLoader<Store>;
pub type TagLoader = KeyedLoader<Tag>;

impl StoreLoader {
    pub fn stores(service: Arc<dyn RecordService<Store>>, session: Option<String>) -> Self {
        Self::new(service, "Store", Include::ParentStore, session)
    }
}

impl TagLoader {
    pub fn tags(service: Arc<dyn RecordService<Tag>>, session: Option<String>) -> Self {
        Self::new(service, "Tag", Include::ParentTag, session)
    }
}

impl<T: Clone + Send + Sync> KeyedLoader<T> {
    pub fn new(
        service: Arc<dyn RecordService<T>>,
        label: &'static str,
        parent: Include,
        session: Option<String>,
    ) -> Self {
        Self {
            service,
            label,
            parent,
            session,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// resolves exactly one record for `key`.
    pub fn load(&self, key: &str) -> Result<T> {
        if let Some(hit) = self.cache.lock().get(key) {
            return Ok(hit.clone());
        }

        let criteria = key_criteria(key, self.parent);
        let mut matches = self.service.search(&criteria, self.session.as_deref())?;

        let record = match matches.len() {
            0 => {
                return Err(Error::not_found(format!(
                    "{} not found with provided key: {key}",
                    self.label
                )));
            }
            1 => matches.remove(0),
            _ => {
                return Err(Error::multiplicity(format!(
                    "Multiple {} found with provided key: {key}",
                    self.label.to_lowercase()
                )));
            }
        };

        log::debug!("**loader:** cached {} '{key}'", self.label.to_lowercase());
        self.cache.lock().insert(key.to_string(), record.clone());
        Ok(record)
    }

    /// resolves every key concurrently, preserving input order.
    pub fn load_many(&self, keys: &[String]) -> Result<Vec<T>> {
        keys.par_iter().map(|key| self.load(key)).collect()
    }

    pub fn clear(&self, key: &str) {
        self.cache.lock().remove(key);
    }

    pub fn clear_all(&self) {
        self.cache.lock().clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}
