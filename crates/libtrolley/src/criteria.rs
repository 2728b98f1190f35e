// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    normalize::to_token_set,
    types::{LinkKind, PriceStatus},
};

/// connection arguments as they arrive from the graphql layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionArgs {
    pub first: Option<usize>,
    pub after: Option<String>,
    pub last: Option<usize>,
    pub before: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_option: Option<String>,
    pub tags: Option<Vec<String>>,
    pub stores: Option<Vec<String>>,
    pub tag_keys: Option<Vec<String>>,
    pub store_keys: Option<Vec<String>>,
    pub popular: Option<bool>,
}

impl ConnectionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(mut self, first: usize) -> Self {
        self.first = Some(first);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn last(mut self, last: usize) -> Self {
        self.last = Some(last);
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sort_option(mut self, option: impl Into<String>) -> Self {
        self.sort_option = Some(option.into());
        self
    }

    // a zero page size counts as not given
    pub(crate) fn forward_requested(&self) -> bool {
        self.first.is_some_and(|n| n > 0) || self.after.is_some()
    }

    pub(crate) fn backward_requested(&self) -> bool {
        self.last.is_some_and(|n| n > 0) || self.before.is_some()
    }

    /// rejects requests that page forwards and backwards at once.
    pub fn validate(&self) -> Result<()> {
        if self.forward_requested() && self.backward_requested() {
            return Err(Error::validation(
                "Mixing first and after with last and before is not supported.",
            ));
        }
        Ok(())
    }

    pub fn name_tokens(&self) -> BTreeSet<String> {
        to_token_set(self.name.as_deref())
    }

    pub fn description_tokens(&self) -> BTreeSet<String> {
        to_token_set(self.description.as_deref())
    }

    pub fn order_by(&self) -> OrderBy {
        SortOption::resolve(self.sort_option.as_deref()).order_by()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    PriceToDisplay,
    Saving,
    SavingPercentage,
    OfferEndDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// `orderByField{Ascending|Descending}` directive for the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: SortField,
    pub direction: Direction,
}

impl OrderBy {
    pub const fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
        }
    }

    pub const fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }
}

/// sort options exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOption {
    PriceAscending,
    PriceDescending,
    SavingAscending,
    SavingDescending,
    SavingPercentageAscending,
    SavingPercentageDescending,
    OfferEndDateAscending,
    OfferEndDateDescending,
    #[default]
    NameAscending,
    NameDescending,
}

impl SortOption {
    pub fn parse(value: &str) -> Option<Self> {
        let option = match value {
            "PriceAscending" => Self::PriceAscending,
            "PriceDescending" => Self::PriceDescending,
            "SavingAscending" => Self::SavingAscending,
            "SavingDescending" => Self::SavingDescending,
            "SavingPercentageAscending" => Self::SavingPercentageAscending,
            "SavingPercentageDescending" => Self::SavingPercentageDescending,
            "OfferEndDateAscending" => Self::OfferEndDateAscending,
            "OfferEndDateDescending" => Self::OfferEndDateDescending,
            "NameAscending" => Self::NameAscending,
            "NameDescending" => Self::NameDescending,
            _ => return None,
        };
        Some(option)
    }

    /// unknown or missing options fall back to name ascending.
    pub fn resolve(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub const fn order_by(self) -> OrderBy {
        match self {
            Self::PriceAscending => OrderBy::ascending(SortField::PriceToDisplay),
            Self::PriceDescending => OrderBy::descending(SortField::PriceToDisplay),
            Self::SavingAscending => OrderBy::ascending(SortField::Saving),
            Self::SavingDescending => OrderBy::descending(SortField::Saving),
            Self::SavingPercentageAscending => OrderBy::ascending(SortField::SavingPercentage),
            Self::SavingPercentageDescending => OrderBy::descending(SortField::SavingPercentage),
            Self::OfferEndDateAscending => OrderBy::ascending(SortField::OfferEndDate),
            Self::OfferEndDateDescending => OrderBy::descending(SortField::OfferEndDate),
            Self::NameAscending => OrderBy::ascending(SortField::Name),
            Self::NameDescending => OrderBy::descending(SortField::Name),
        }
    }
}

/// relations the search service should join into returned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Include {
    Store,
    MasterProduct,
    Tags,
    StapleShoppingList,
    MasterProductPrice,
    ParentStore,
    ParentTag,
}

/// filter conditions understood by the search service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Conditions {
    pub user_id: Option<String>,
    pub contains_names: BTreeSet<String>,
    pub contains_descriptions: BTreeSet<String>,
    /// exact, lowercased name match.
    pub name: Option<String>,
    pub key: Option<String>,
    pub status: Option<PriceStatus>,
    pub special: Option<bool>,
    pub for_display: Option<bool>,
    pub popular: Option<bool>,
    pub tag_ids: Option<Vec<String>>,
    pub store_ids: Vec<String>,
    pub master_product_id: Option<String>,
    pub store_id: Option<String>,
    pub staple_shopping_list_id: Option<String>,
    pub price_id: Option<String>,
    /// restricts links to one target kind; `None` accepts both.
    pub link_kind: Option<LinkKind>,
    pub exclude_items_marked_as_done: bool,
    pub exclude_items_removed_by_user: bool,
}

/// query criteria consumed by the external search/count service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Criteria {
    pub id: Option<String>,
    pub ids: Option<BTreeSet<String>>,
    pub conditions: Conditions,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub includes: BTreeSet<Include>,
    /// only the most recently created match is wanted.
    pub top_most: bool,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ids(mut self, ids: BTreeSet<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_order(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn include(mut self, include: Include) -> Self {
        self.includes.insert(include);
        self
    }

    pub fn top_most(mut self) -> Self {
        self.top_most = true;
        self
    }

    /// sets `limit`/`skip` for store-side paging.
    pub fn page(mut self, limit: usize, skip: usize) -> Self {
        self.limit = Some(limit);
        self.skip = Some(skip);
        self
    }

    pub fn includes(&self, include: Include) -> bool {
        self.includes.contains(&include)
    }
}

/// live shopping-list links of a user, both kinds, with both targets joined.
pub fn shopping_list_criteria(user_id: &str, args: &ConnectionArgs) -> Result<Criteria> {
    args.validate()?;

    Ok(Criteria::new()
        .include(Include::StapleShoppingList)
        .include(Include::MasterProductPrice)
        .with_conditions(Conditions {
            user_id: Some(user_id.to_string()),
            contains_names: args.name_tokens(),
            contains_descriptions: args.description_tokens(),
            exclude_items_marked_as_done: true,
            exclude_items_removed_by_user: true,
            ..Default::default()
        }))
}

/// live links of one user pointing at one target.
pub fn links_to_target_criteria(user_id: &str, kind: LinkKind, target_id: &str) -> Criteria {
    let mut conditions = Conditions {
        user_id: Some(user_id.to_string()),
        link_kind: Some(kind),
        exclude_items_marked_as_done: true,
        exclude_items_removed_by_user: true,
        ..Default::default()
    };

    match kind {
        LinkKind::StapleShoppingList => {
            conditions.staple_shopping_list_id = Some(target_id.to_string());
        }
        LinkKind::Price => conditions.price_id = Some(target_id.to_string()),
    }

    Criteria::new().with_conditions(conditions)
}

/// active specials matching the name/description/tag/store filters.
///
/// `tag_ids`/`store_ids` are the already-resolved ids of `args.tag_keys` and
/// `args.store_keys`; when given they replace the raw `tags`/`stores` ids.
pub fn specials_criteria(
    args: &ConnectionArgs,
    tag_ids: Option<Vec<String>>,
    store_ids: Option<Vec<String>>,
) -> Result<Criteria> {
    args.validate()?;

    Ok(Criteria::new()
        .include(Include::Store)
        .include(Include::Tags)
        .include(Include::MasterProduct)
        .with_order(args.order_by())
        .with_conditions(Conditions {
            contains_names: args.name_tokens(),
            contains_descriptions: args.description_tokens(),
            status: Some(PriceStatus::Active),
            special: Some(true),
            tag_ids: tag_ids.or_else(|| args.tags.clone()),
            store_ids: store_ids.or_else(|| args.stores.clone()).unwrap_or_default(),
            ..Default::default()
        }))
}

pub fn stores_criteria(args: &ConnectionArgs) -> Result<Criteria> {
    args.validate()?;

    Ok(Criteria::new()
        .with_order(OrderBy::ascending(SortField::Name))
        .with_conditions(Conditions {
            contains_names: args.name_tokens(),
            ..Default::default()
        }))
}

/// only tags flagged for display are listed.
pub fn tags_criteria(args: &ConnectionArgs) -> Result<Criteria> {
    args.validate()?;

    Ok(Criteria::new()
        .with_order(OrderBy::ascending(SortField::Name))
        .with_conditions(Conditions {
            contains_names: args.name_tokens(),
            for_display: Some(true),
            ..Default::default()
        }))
}

pub fn staple_shopping_list_criteria(user_id: &str, args: &ConnectionArgs) -> Result<Criteria> {
    args.validate()?;

    Ok(Criteria::new()
        .include(Include::Tags)
        .with_order(OrderBy::ascending(SortField::Name))
        .with_conditions(Conditions {
            user_id: Some(user_id.to_string()),
            contains_names: args.name_tokens(),
            ..Default::default()
        }))
}

/// `tag_ids` are the already-resolved ids of `args.tag_keys`, if any.
pub fn staple_item_criteria(
    user_id: &str,
    args: &ConnectionArgs,
    tag_ids: Option<Vec<String>>,
) -> Result<Criteria> {
    args.validate()?;

    Ok(Criteria::new()
        .include(Include::Tags)
        .with_order(OrderBy::ascending(SortField::Name))
        .with_conditions(Conditions {
            user_id: Some(user_id.to_string()),
            contains_names: args.name_tokens(),
            tag_ids: tag_ids.or_else(|| args.tags.clone()),
            popular: args.popular,
            ..Default::default()
        }))
}

/// looks a store or tag up by its unique key.
pub fn key_criteria(key: &str, parent: Include) -> Criteria {
    Criteria::new().include(parent).with_conditions(Conditions {
        key: Some(key.to_string()),
        ..Default::default()
    })
}
