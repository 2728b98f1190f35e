// SPDX-License-Identifier: MIT OR Apache-2.0

//! in-memory data service backed by a json snapshot of the hosted backend.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fs,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering},
    },
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    criteria::{Conditions, Criteria, Direction, Include, SortField},
    normalize::{compare_names, contains_all_tokens},
    service::{Acl, RecordService, RecordStream, Services},
    types::{
        LinkTarget, MasterProduct, PriceRecord, ShoppingListLink, StapleItem, StapleShoppingList,
        Store, Tag,
    },
};

/// every record kind the engine reads, as exported from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub shopping_list: Vec<ShoppingListLink>,
    pub staple_shopping_lists: Vec<StapleShoppingList>,
    pub staple_templates: Vec<StapleShoppingList>,
    pub staple_items: Vec<StapleItem>,
    pub prices: Vec<PriceRecord>,
    pub master_products: Vec<MasterProduct>,
    pub stores: Vec<Store>,
    pub tags: Vec<Tag>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn master_product(&self, id: &str) -> Option<&MasterProduct> {
        self.master_products.iter().find(|p| p.id == id)
    }

    fn tags_for(&self, ids: &[String]) -> Vec<Tag> {
        ids.iter()
            .filter_map(|id| self.tags.iter().find(|t| &t.id == id))
            .cloned()
            .collect()
    }
}

/// per-kind matching, ordering and join rules of the hosted backend.
pub(crate) trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn matches(&self, conditions: &Conditions, snapshot: &Snapshot) -> bool;

    fn compare(&self, _other: &Self, _field: SortField, _snapshot: &Snapshot) -> Ordering {
        Ordering::Equal
    }

    fn hydrate(&mut self, _includes: &BTreeSet<Include>, _snapshot: &Snapshot) {}

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

fn eq_if_set(expected: Option<&str>, actual: &str) -> bool {
    expected.is_none_or(|e| e == actual)
}

fn any_tag(expected: Option<&Vec<String>>, actual: &[String]) -> bool {
    expected.is_none_or(|ids| ids.iter().any(|id| actual.contains(id)))
}

fn cmp_optional<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Record for ShoppingListLink {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, c: &Conditions, _snapshot: &Snapshot) -> bool {
        let target_matches = match &self.target {
            LinkTarget::StapleShoppingList {
                staple_shopping_list_id,
            } => {
                c.price_id.is_none()
                    && eq_if_set(c.staple_shopping_list_id.as_deref(), staple_shopping_list_id)
            }
            LinkTarget::Price { price_id } => {
                c.staple_shopping_list_id.is_none() && eq_if_set(c.price_id.as_deref(), price_id)
            }
        };

        target_matches
            && eq_if_set(c.user_id.as_deref(), &self.user_id)
            && c.link_kind.is_none_or(|kind| kind == self.target.kind())
            && !(c.exclude_items_marked_as_done && self.done_date.is_some())
            && !(c.exclude_items_removed_by_user && self.removed_by_user_id.is_some())
            && contains_all_tokens(self.name.as_deref().unwrap_or_default(), &c.contains_names)
            && contains_all_tokens(
                self.description.as_deref().unwrap_or_default(),
                &c.contains_descriptions,
            )
    }

    fn compare(&self, other: &Self, field: SortField, _snapshot: &Snapshot) -> Ordering {
        match field {
            SortField::Name => compare_names(
                self.name.as_deref().unwrap_or_default(),
                other.name.as_deref().unwrap_or_default(),
            ),
            _ => Ordering::Equal,
        }
    }
}

impl Record for StapleShoppingList {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, c: &Conditions, _snapshot: &Snapshot) -> bool {
        c.user_id
            .as_deref()
            .is_none_or(|user| self.user_id.as_deref() == Some(user))
            && c.name
                .as_deref()
                .is_none_or(|name| self.name.to_lowercase() == name)
            && contains_all_tokens(&self.name, &c.contains_names)
            && any_tag(c.tag_ids.as_ref(), &self.tag_ids)
    }

    fn compare(&self, other: &Self, field: SortField, _snapshot: &Snapshot) -> Ordering {
        match field {
            SortField::Name => compare_names(&self.name, &other.name),
            _ => Ordering::Equal,
        }
    }

    fn hydrate(&mut self, includes: &BTreeSet<Include>, snapshot: &Snapshot) {
        if includes.contains(&Include::Tags) {
            self.tags = snapshot.tags_for(&self.tag_ids);
        }
    }
}

impl Record for StapleItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, c: &Conditions, _snapshot: &Snapshot) -> bool {
        eq_if_set(c.user_id.as_deref(), &self.user_id)
            && c.name
                .as_deref()
                .is_none_or(|name| self.name.to_lowercase() == name)
            && contains_all_tokens(&self.name, &c.contains_names)
            && any_tag(c.tag_ids.as_ref(), &self.tag_ids)
            && c.popular.is_none_or(|popular| popular == self.popular)
    }

    fn compare(&self, other: &Self, field: SortField, _snapshot: &Snapshot) -> Ordering {
        match field {
            SortField::Name => compare_names(&self.name, &other.name),
            _ => Ordering::Equal,
        }
    }

    fn hydrate(&mut self, includes: &BTreeSet<Include>, snapshot: &Snapshot) {
        if includes.contains(&Include::Tags) {
            self.tags = snapshot.tags_for(&self.tag_ids);
        }
    }
}

fn price_name<'a>(price: &'a PriceRecord, snapshot: &'a Snapshot) -> &'a str {
    snapshot
        .master_product(&price.master_product_id)
        .map(|p| p.name.as_str())
        .unwrap_or_else(|| price.display_name())
}

impl Record for PriceRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, c: &Conditions, snapshot: &Snapshot) -> bool {
        let description = snapshot
            .master_product(&self.master_product_id)
            .and_then(|p| p.description.as_deref())
            .or(self.description.as_deref())
            .unwrap_or_default();

        c.status.is_none_or(|status| status == self.status)
            && c.special.is_none_or(|special| special == self.special)
            && eq_if_set(c.master_product_id.as_deref(), &self.master_product_id)
            && eq_if_set(c.store_id.as_deref(), &self.store_id)
            && (c.store_ids.is_empty() || c.store_ids.contains(&self.store_id))
            && any_tag(c.tag_ids.as_ref(), &self.tag_ids)
            && contains_all_tokens(price_name(self, snapshot), &c.contains_names)
            && contains_all_tokens(description, &c.contains_descriptions)
    }

    fn compare(&self, other: &Self, field: SortField, snapshot: &Snapshot) -> Ordering {
        match field {
            SortField::Name => compare_names(price_name(self, snapshot), price_name(other, snapshot)),
            SortField::PriceToDisplay => cmp_optional(self.price_to_display, other.price_to_display),
            SortField::Saving => cmp_optional(self.saving, other.saving),
            SortField::SavingPercentage => {
                cmp_optional(self.saving_percentage, other.saving_percentage)
            }
            SortField::OfferEndDate => cmp_optional(self.offer_end_date, other.offer_end_date),
        }
    }

    fn hydrate(&mut self, includes: &BTreeSet<Include>, snapshot: &Snapshot) {
        if includes.contains(&Include::Store) {
            self.store = snapshot.stores.iter().find(|s| s.id == self.store_id).cloned();
        }
        if includes.contains(&Include::MasterProduct) {
            self.master_product = snapshot.master_product(&self.master_product_id).cloned();
        }
        if includes.contains(&Include::Tags) {
            self.tags = snapshot.tags_for(&self.tag_ids);
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Record for Store {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, c: &Conditions, _snapshot: &Snapshot) -> bool {
        c.key.as_deref().is_none_or(|key| self.key.as_deref() == Some(key))
            && contains_all_tokens(&self.name, &c.contains_names)
    }

    fn compare(&self, other: &Self, field: SortField, _snapshot: &Snapshot) -> Ordering {
        match field {
            SortField::Name => compare_names(&self.name, &other.name),
            _ => Ordering::Equal,
        }
    }

    fn hydrate(&mut self, includes: &BTreeSet<Include>, snapshot: &Snapshot) {
        if includes.contains(&Include::ParentStore) {
            self.parent_store = self
                .parent_store_id
                .as_deref()
                .and_then(|id| snapshot.stores.iter().find(|s| s.id == id))
                .cloned()
                .map(Box::new);
        }
    }
}

impl Record for Tag {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, c: &Conditions, _snapshot: &Snapshot) -> bool {
        c.key.as_deref().is_none_or(|key| self.key.as_deref() == Some(key))
            && c.for_display.is_none_or(|flag| flag == self.for_display)
            && contains_all_tokens(&self.name, &c.contains_names)
    }

    fn compare(&self, other: &Self, field: SortField, _snapshot: &Snapshot) -> Ordering {
        match field {
            SortField::Name => compare_names(&self.name, &other.name),
            _ => Ordering::Equal,
        }
    }

    fn hydrate(&mut self, includes: &BTreeSet<Include>, snapshot: &Snapshot) {
        if includes.contains(&Include::ParentTag) {
            self.parent_tags = snapshot.tags_for(&self.parent_tag_ids);
        }
    }
}

struct Inner {
    data: RwLock<Snapshot>,
    next_id: AtomicU64,
    open_streams: AtomicUsize,
}

/// shared in-memory backend; cheap to clone.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(snapshot),
                next_id: AtomicU64::new(1),
                open_streams: AtomicUsize::new(0),
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = Snapshot::load(path)?;
        log::debug!(
            "**snapshot:** loaded {} shopping-list links and {} prices from {}",
            snapshot.shopping_list.len(),
            snapshot.prices.len(),
            path.display()
        );
        Ok(Self::new(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.inner.data.read().save(path)
    }

    /// copy of the current data.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.data.read().clone()
    }

    /// number of `search_all` subscriptions not yet released.
    pub fn open_streams(&self) -> usize {
        self.inner.open_streams.load(AtomicOrdering::SeqCst)
    }

    pub fn services(&self) -> Services {
        Services {
            shopping_list: Arc::new(self.table(|s| &s.shopping_list, |s| &mut s.shopping_list)),
            staple_shopping_lists: Arc::new(
                self.table(|s| &s.staple_shopping_lists, |s| &mut s.staple_shopping_lists),
            ),
            staple_templates: Arc::new(
                self.table(|s| &s.staple_templates, |s| &mut s.staple_templates),
            ),
            staple_items: Arc::new(self.table(|s| &s.staple_items, |s| &mut s.staple_items)),
            prices: Arc::new(self.table(|s| &s.prices, |s| &mut s.prices)),
            stores: Arc::new(self.table(|s| &s.stores, |s| &mut s.stores)),
            tags: Arc::new(self.table(|s| &s.tags, |s| &mut s.tags)),
        }
    }

    fn table<T: Record>(
        &self,
        rows: fn(&Snapshot) -> &Vec<T>,
        rows_mut: fn(&mut Snapshot) -> &mut Vec<T>,
    ) -> MemoryTable<T> {
        MemoryTable {
            inner: Arc::clone(&self.inner),
            rows,
            rows_mut,
        }
    }
}

pub(crate) struct MemoryTable<T> {
    inner: Arc<Inner>,
    rows: fn(&Snapshot) -> &Vec<T>,
    rows_mut: fn(&mut Snapshot) -> &mut Vec<T>,
}

impl<T: Record> MemoryTable<T> {
    fn select(&self, criteria: &Criteria, paged: bool) -> Vec<T> {
        let data = self.inner.data.read();

        let mut matched: Vec<(usize, &T)> = (self.rows)(&data)
            .iter()
            .enumerate()
            .filter(|(_, r)| criteria.id.as_deref().is_none_or(|id| r.id() == id))
            .filter(|(_, r)| criteria.ids.as_ref().is_none_or(|ids| ids.contains(r.id())))
            .filter(|(_, r)| r.matches(&criteria.conditions, &data))
            .collect();

        if criteria.top_most {
            matched = matched
                .into_iter()
                .max_by(|(ia, a), (ib, b)| a.created_at().cmp(&b.created_at()).then(ia.cmp(ib)))
                .into_iter()
                .collect();
        }

        if let Some(order) = criteria.order_by {
            matched.sort_by(|(_, a), (_, b)| {
                let ordering = a.compare(b, order.field, &data);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        let skip = if paged { criteria.skip.unwrap_or(0) } else { 0 };
        let limit = if paged {
            criteria.limit.unwrap_or(usize::MAX)
        } else {
            usize::MAX
        };

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, r)| {
                let mut record = r.clone();
                record.hydrate(&criteria.includes, &data);
                record
            })
            .collect()
    }

    fn next_free_id(&self, rows: &[T]) -> String {
        loop {
            let id = format!(
                "rec{}",
                self.inner.next_id.fetch_add(1, AtomicOrdering::SeqCst)
            );
            if !rows.iter().any(|r| r.id() == id) {
                return id;
            }
        }
    }
}

impl<T: Record> RecordService<T> for MemoryTable<T> {
    fn search(&self, criteria: &Criteria, _session: Option<&str>) -> Result<Vec<T>> {
        Ok(self.select(criteria, true))
    }

    fn count(&self, criteria: &Criteria, _session: Option<&str>) -> Result<usize> {
        Ok(self.select(criteria, false).len())
    }

    fn create(&self, mut record: T, acl: Option<&Acl>, _session: Option<&str>) -> Result<String> {
        let mut data = self.inner.data.write();
        let rows = (self.rows_mut)(&mut data);

        if record.id().is_empty() {
            let id = self.next_free_id(rows);
            record.set_id(id);
        } else if rows.iter().any(|r| r.id() == record.id()) {
            return Err(Error::upstream(format!(
                "record already exists: {}",
                record.id()
            )));
        }

        let id = record.id().to_string();
        if let Some(acl) = acl {
            log::debug!("**snapshot:** created {id} owned by {}", acl.owner_user_id);
        }
        rows.push(record);
        Ok(id)
    }

    fn update(&self, record: &T, _session: Option<&str>) -> Result<()> {
        let mut data = self.inner.data.write();
        let rows = (self.rows_mut)(&mut data);

        let existing = rows
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| Error::upstream(format!("record not found for update: {}", record.id())))?;
        *existing = record.clone();
        Ok(())
    }

    fn search_all(&self, criteria: &Criteria, _session: Option<&str>) -> Result<RecordStream<T>> {
        let records = self.select(criteria, false);
        let inner = Arc::clone(&self.inner);
        inner.open_streams.fetch_add(1, AtomicOrdering::SeqCst);

        Ok(RecordStream::new(records.into_iter().map(Ok)).on_unsubscribe(move || {
            inner.open_streams.fetch_sub(1, AtomicOrdering::SeqCst);
        }))
    }
}
