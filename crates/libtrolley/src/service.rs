// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use crate::{
    Criteria, Result,
    types::{PriceRecord, ShoppingListLink, StapleItem, StapleShoppingList, Store, Tag},
};

/// the authenticated caller a request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// opaque token forwarded to the data service.
    pub token: Option<String>,
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            token: None,
            user_id: user_id.into(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// access control attached to created records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub owner_user_id: String,
}

impl Acl {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            owner_user_id: user_id.into(),
        }
    }
}

type Unsubscribe = Box<dyn FnOnce() + Send>;

/// records pushed by a `search_all` subscription.
///
/// the subscription is released when the stream is dropped, whichever
/// way the consumer leaves it.
pub struct RecordStream<T> {
    records: Box<dyn Iterator<Item = Result<T>> + Send>,
    unsubscribe: Option<Unsubscribe>,
}

impl<T> RecordStream<T> {
    pub fn new(records: impl Iterator<Item = Result<T>> + Send + 'static) -> Self {
        Self {
            records: Box::new(records),
            unsubscribe: None,
        }
    }

    pub fn on_unsubscribe(mut self, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        self.unsubscribe = Some(Box::new(unsubscribe));
        self
    }
}

impl<T> Iterator for RecordStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }
}

impl<T> Drop for RecordStream<T> {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// collects every record of a stream; the first error stops the drain.
pub fn drain<T>(stream: RecordStream<T>) -> Result<Vec<T>> {
    stream.collect()
}

/// data-service capabilities for one record kind.
pub trait RecordService<T>: Send + Sync {
    fn search(&self, criteria: &Criteria, session: Option<&str>) -> Result<Vec<T>>;

    fn count(&self, criteria: &Criteria, session: Option<&str>) -> Result<usize>;

    /// stores a new record and returns its id.
    fn create(&self, record: T, acl: Option<&Acl>, session: Option<&str>) -> Result<String>;

    fn update(&self, record: &T, session: Option<&str>) -> Result<()>;

    /// streams every match, ignoring `limit`/`skip`.
    fn search_all(&self, criteria: &Criteria, session: Option<&str>) -> Result<RecordStream<T>>;
}

/// one service handle per record kind, shared across requests.
#[derive(Clone)]
pub struct Services {
    pub shopping_list: Arc<dyn RecordService<ShoppingListLink>>,
    pub staple_shopping_lists: Arc<dyn RecordService<StapleShoppingList>>,
    pub staple_templates: Arc<dyn RecordService<StapleShoppingList>>,
    pub staple_items: Arc<dyn RecordService<StapleItem>>,
    pub prices: Arc<dyn RecordService<PriceRecord>>,
    pub stores: Arc<dyn RecordService<Store>>,
    pub tags: Arc<dyn RecordService<Tag>>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
