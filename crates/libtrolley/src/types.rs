// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// whether a price record is the current offer for its product/store pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriceStatus {
    #[default]
    #[serde(rename = "A")]
    Active,
    #[serde(rename = "I")]
    Inactive,
}

impl PriceStatus {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for PriceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "A"),
            Self::Inactive => write!(f, "I"),
        }
    }
}

/// the two kinds of record a shopping-list link can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkKind {
    StapleShoppingList,
    Price,
}

/// the record a shopping-list link points at. exactly one is set per link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkTarget {
    StapleShoppingList {
        #[serde(rename = "stapleShoppingListId")]
        staple_shopping_list_id: String,
    },
    Price {
        #[serde(rename = "masterProductPriceId", alias = "productPriceId")]
        price_id: String,
    },
}

impl LinkTarget {
    pub fn staple_shopping_list(id: impl Into<String>) -> Self {
        Self::StapleShoppingList {
            staple_shopping_list_id: id.into(),
        }
    }

    pub fn price(id: impl Into<String>) -> Self {
        Self::Price {
            price_id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::StapleShoppingList {
                staple_shopping_list_id,
            } => staple_shopping_list_id,
            Self::Price { price_id } => price_id,
        }
    }

    pub const fn kind(&self) -> LinkKind {
        match self {
            Self::StapleShoppingList { .. } => LinkKind::StapleShoppingList,
            Self::Price { .. } => LinkKind::Price,
        }
    }
}

/// join record placing a staple list or a special price on a user's shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListLink {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub target: LinkTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_by_user_id: Option<String>,
}

impl ShoppingListLink {
    pub fn new(user_id: impl Into<String>, target: LinkTarget) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            target,
            name: None,
            description: None,
            done_date: None,
            removed_by_user_id: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// a link is live until it is marked done or removed.
    pub fn is_live(&self) -> bool {
        self.done_date.is_none() && self.removed_by_user_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterProduct {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Store {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_store: Option<Box<Store>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    pub for_display: bool,
    pub parent_tag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parent_tags: Vec<Tag>,
}

/// a user's recurring list entry; templates carry no user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StapleShoppingList {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub tag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StapleItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub popular: bool,
    pub tag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultiBuyInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitPrice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_buy_info: Option<MultiBuyInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<UnitPrice>,
}

/// a store-and-time-scoped priced offer for a master product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceRecord {
    pub id: String,
    pub master_product_id: String,
    pub store_id: String,
    pub status: PriceStatus,
    pub special: bool,
    pub price_details: PriceDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_display: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saving: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saving_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub tag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_product: Option<MasterProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<Store>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl PriceRecord {
    /// product name when the master product is joined, else the record's own name.
    pub fn display_name(&self) -> &str {
        self.master_product
            .as_ref()
            .map(|p| p.name.as_str())
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    pub fn display_description(&self) -> Option<&str> {
        self.master_product
            .as_ref()
            .and_then(|p| p.description.as_deref())
            .or(self.description.as_deref())
    }

    /// key shared by all price records of one product at one store.
    pub fn product_store_key(&self) -> (&str, &str) {
        (&self.master_product_id, &self.store_id)
    }
}

/// display fields of a special on the consolidated shopping list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialDetails {
    pub special_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_display: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saving: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saving_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_buy: Option<MultiBuyInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<UnitPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_end_date: Option<DateTime<Utc>>,
}

impl SpecialDetails {
    /// takes display fields from `source` while keeping `special_id` as the link identity.
    pub fn from_price(special_id: impl Into<String>, source: &PriceRecord) -> Self {
        let product = source.master_product.as_ref();
        let details = &source.price_details;

        Self {
            special_id: special_id.into(),
            description: source.display_description().map(str::to_string),
            image_url: product.and_then(|p| p.image_url.clone()),
            barcode: product.and_then(|p| p.barcode.clone()),
            size: product.and_then(|p| p.size.clone()),
            special_type: details.special_type.clone(),
            price_to_display: source.price_to_display,
            saving: source.saving,
            saving_percentage: source.saving_percentage,
            current_price: details.current_price,
            was_price: details.was_price,
            multi_buy: details.multi_buy_info.clone(),
            store_name: source.store.as_ref().map(|s| s.name.clone()),
            store_image_url: source.store.as_ref().and_then(|s| s.image_url.clone()),
            unit_price: details.unit_price.clone(),
            offer_end_date: source.offer_end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowTarget {
    StapleShoppingList {
        #[serde(rename = "stapleShoppingListId")]
        staple_shopping_list_id: String,
    },
    Special(Box<SpecialDetails>),
}

impl RowTarget {
    pub fn id(&self) -> &str {
        match self {
            Self::StapleShoppingList {
                staple_shopping_list_id,
            } => staple_shopping_list_id,
            Self::Special(details) => &details.special_id,
        }
    }

    pub const fn kind(&self) -> LinkKind {
        match self {
            Self::StapleShoppingList { .. } => LinkKind::StapleShoppingList,
            Self::Special(_) => LinkKind::Price,
        }
    }
}

/// one de-duplicated shopping-list display entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedRow {
    pub id: String,
    pub shopping_list_ids: Vec<String>,
    pub name: String,
    pub quantity: usize,
    pub status: PriceStatus,
    pub comments: String,
    #[serde(flatten)]
    pub target: RowTarget,
}

impl ConsolidatedRow {
    pub fn staple(staple: &StapleShoppingList, shopping_list_ids: Vec<String>) -> Self {
        Self::build(
            staple.name.clone(),
            PriceStatus::Active,
            RowTarget::StapleShoppingList {
                staple_shopping_list_id: staple.id.clone(),
            },
            shopping_list_ids,
        )
    }

    /// `special_id` is the linked record; `source` supplies the display fields.
    pub fn special(
        special_id: &str,
        source: &PriceRecord,
        shopping_list_ids: Vec<String>,
    ) -> Self {
        Self::build(
            source.display_name().to_string(),
            source.status,
            RowTarget::Special(Box::new(SpecialDetails::from_price(special_id, source))),
            shopping_list_ids,
        )
    }

    fn build(
        name: String,
        status: PriceStatus,
        target: RowTarget,
        shopping_list_ids: Vec<String>,
    ) -> Self {
        Self {
            id: format!("shoppingList-{}", target.id()),
            quantity: shopping_list_ids.len(),
            shopping_list_ids,
            name,
            status,
            comments: String::new(),
            target,
        }
    }
}
