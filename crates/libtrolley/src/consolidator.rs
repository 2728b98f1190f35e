// SPDX-License-Identifier: MIT OR Apache-2.0

//! merges a user's shopping-list links into de-duplicated display rows.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;

use crate::{
    ConnectionArgs, Error, Result,
    context::RequestContext,
    criteria::{Conditions, Criteria, Include, SortOption, shopping_list_criteria},
    normalize::compare_names,
    service::drain,
    types::{ConsolidatedRow, LinkTarget, PriceRecord, PriceStatus, StapleShoppingList},
};

type ProductStoreKey = (String, String);

/// builds the consolidated shopping list of `user_id`.
///
/// every live link ends up in exactly one row; a link whose target can no
/// longer be resolved fails the whole call with a not-found error.
pub fn consolidate(
    ctx: &RequestContext,
    user_id: &str,
    args: &ConnectionArgs,
) -> Result<Vec<ConsolidatedRow>> {
    let criteria = shopping_list_criteria(user_id, args)?;
    let links = drain(ctx.services.shopping_list.search_all(&criteria, ctx.token())?)?;

    let mut staple_ids = BTreeSet::new();
    let mut price_ids = BTreeSet::new();
    for link in &links {
        match &link.target {
            LinkTarget::StapleShoppingList {
                staple_shopping_list_id,
            } => staple_ids.insert(staple_shopping_list_id.clone()),
            LinkTarget::Price { price_id } => price_ids.insert(price_id.clone()),
        };
    }

    log::debug!(
        "**consolidate:** {} live links for {user_id} ({} staple lists, {} prices)",
        links.len(),
        staple_ids.len(),
        price_ids.len()
    );

    let (staples, prices) = rayon::join(
        || resolve_staple_lists(ctx, user_id, staple_ids),
        || resolve_prices(ctx, price_ids),
    );
    let staples = staples?;
    let prices = prices?;
    let replacements = resolve_active_replacements(ctx, &prices)?;

    // re-walk in link order; the first link of a target fixes its group position
    let mut staple_groups: Vec<(&StapleShoppingList, Vec<String>)> = Vec::new();
    let mut price_groups: Vec<(&PriceRecord, Vec<String>)> = Vec::new();
    let mut staple_index: HashMap<&str, usize> = HashMap::new();
    let mut price_index: HashMap<&str, usize> = HashMap::new();

    for link in &links {
        match &link.target {
            LinkTarget::StapleShoppingList {
                staple_shopping_list_id: id,
            } => {
                let staple = staples.get(id.as_str()).ok_or_else(|| missing_staple(id))?;
                let index = *staple_index.entry(staple.id.as_str()).or_insert_with(|| {
                    staple_groups.push((staple, Vec::new()));
                    staple_groups.len() - 1
                });
                staple_groups[index].1.push(link.id.clone());
            }
            LinkTarget::Price { price_id: id } => {
                let price = prices.get(id.as_str()).ok_or_else(|| missing_price(id))?;
                let index = *price_index.entry(price.id.as_str()).or_insert_with(|| {
                    price_groups.push((price, Vec::new()));
                    price_groups.len() - 1
                });
                price_groups[index].1.push(link.id.clone());
            }
        }
    }

    let mut rows: Vec<ConsolidatedRow> = staple_groups
        .into_iter()
        .map(|(staple, link_ids)| ConsolidatedRow::staple(staple, link_ids))
        .collect();

    rows.extend(
        price_groups
            .into_iter()
            .map(|(price, link_ids)| special_row(price, &replacements, link_ids)),
    );

    let descending =
        SortOption::resolve(args.sort_option.as_deref()) == SortOption::NameDescending;
    rows.sort_by(|a, b| {
        let ordering = compare_names(&a.name, &b.name);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    Ok(rows)
}

/// builds the row of a single target from its live link ids.
///
/// only the target itself is resolved, so dangling links elsewhere on the
/// list do not affect the result. no links means no row.
pub(crate) fn consolidate_target(
    ctx: &RequestContext,
    user_id: &str,
    target: &LinkTarget,
    link_ids: Vec<String>,
) -> Result<Option<ConsolidatedRow>> {
    if link_ids.is_empty() {
        return Ok(None);
    }

    let row = match target {
        LinkTarget::StapleShoppingList {
            staple_shopping_list_id: id,
        } => {
            let staples = resolve_staple_lists(ctx, user_id, BTreeSet::from([id.clone()]))?;
            let staple = staples.get(id.as_str()).ok_or_else(|| missing_staple(id))?;
            ConsolidatedRow::staple(staple, link_ids)
        }
        LinkTarget::Price { price_id: id } => {
            let prices = resolve_prices(ctx, BTreeSet::from([id.clone()]))?;
            let price = prices.get(id.as_str()).ok_or_else(|| missing_price(id))?;
            let replacements = resolve_active_replacements(ctx, &prices)?;
            special_row(price, &replacements, link_ids)
        }
    };

    Ok(Some(row))
}

fn missing_staple(id: &str) -> Error {
    Error::not_found(format!("Staple Shopping List not found: {id}"))
}

fn missing_price(id: &str) -> Error {
    Error::not_found(format!("Master Product Price not found: {id}"))
}

// an inactive price shows its active replacement when one exists
fn special_row(
    price: &PriceRecord,
    replacements: &HashMap<ProductStoreKey, PriceRecord>,
    link_ids: Vec<String>,
) -> ConsolidatedRow {
    let source = replacements
        .get(&product_store_key(price))
        .unwrap_or(price);
    ConsolidatedRow::special(&price.id, source, link_ids)
}

fn resolve_staple_lists(
    ctx: &RequestContext,
    user_id: &str,
    ids: BTreeSet<String>,
) -> Result<HashMap<String, StapleShoppingList>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let criteria = Criteria::new().with_ids(ids).with_conditions(Conditions {
        user_id: Some(user_id.to_string()),
        ..Default::default()
    });
    let staples = drain(
        ctx.services
            .staple_shopping_lists
            .search_all(&criteria, ctx.token())?,
    )?;

    Ok(staples.into_iter().map(|s| (s.id.clone(), s)).collect())
}

fn resolve_prices(
    ctx: &RequestContext,
    ids: BTreeSet<String>,
) -> Result<HashMap<String, PriceRecord>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let criteria = Criteria::new()
        .with_ids(ids)
        .include(Include::Store)
        .include(Include::MasterProduct);
    let prices = drain(ctx.services.prices.search_all(&criteria, ctx.token())?)?;

    Ok(prices.into_iter().map(|p| (p.id.clone(), p)).collect())
}

fn product_store_key(price: &PriceRecord) -> ProductStoreKey {
    let (product, store) = price.product_store_key();
    (product.to_string(), store.to_string())
}

/// finds the most recent active offer for every inactive price's product/store pair.
fn resolve_active_replacements(
    ctx: &RequestContext,
    prices: &HashMap<String, PriceRecord>,
) -> Result<HashMap<ProductStoreKey, PriceRecord>> {
    let keys: BTreeSet<ProductStoreKey> = prices
        .values()
        .filter(|p| !p.status.is_active())
        .map(product_store_key)
        .collect();

    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    log::debug!(
        "**consolidate:** looking up active offers for {} inactive prices",
        keys.len()
    );

    let found: Vec<Option<(ProductStoreKey, PriceRecord)>> = keys
        .into_par_iter()
        .map(|key| {
            let criteria = Criteria::new()
                .top_most()
                .page(1, 0)
                .include(Include::Store)
                .include(Include::MasterProduct)
                .with_conditions(Conditions {
                    master_product_id: Some(key.0.clone()),
                    store_id: Some(key.1.clone()),
                    status: Some(PriceStatus::Active),
                    ..Default::default()
                });
            let active = ctx.services.prices.search(&criteria, ctx.token())?;
            Ok(active.into_iter().next().map(|price| (key, price)))
        })
        .collect::<Result<_>>()?;

    Ok(found.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Config,
        service::Session,
        snapshot::{MemoryBackend, Snapshot},
        types::RowTarget,
    };

    const FIXTURE: &str = r#"{
        "masterProducts": [
            {"id": "m1", "name": "Milk", "description": "2 litre"},
            {"id": "m2", "name": "Butter", "imageUrl": "butter-old.png"},
            {"id": "m3", "name": "Cheese"}
        ],
        "stores": [{"id": "s1", "key": "countdown", "name": "Countdown"}],
        "stapleShoppingLists": [
            {"id": "x1", "userId": "u1", "name": "bread"},
            {"id": "x2", "userId": "u1", "name": "Apples"}
        ],
        "prices": [
            {"id": "p1", "masterProductId": "m1", "storeId": "s1", "status": "A", "special": true, "priceToDisplay": 3.5},
            {"id": "p4", "masterProductId": "m2", "storeId": "s1", "status": "I", "special": true, "priceToDisplay": 5.0, "createdAt": "2017-01-01T00:00:00Z"},
            {"id": "p5", "masterProductId": "m2", "storeId": "s1", "status": "A", "special": true, "priceToDisplay": 4.0, "createdAt": "2017-02-01T00:00:00Z"},
            {"id": "p6", "masterProductId": "m3", "storeId": "s1", "status": "I", "special": true, "priceToDisplay": 8.0},
            {"id": "p7", "masterProductId": "m3", "storeId": "s2", "status": "A", "special": true, "priceToDisplay": 6.0}
        ],
        "shoppingList": [
            {"id": "l1", "userId": "u1", "stapleShoppingListId": "x1"},
            {"id": "l2", "userId": "u1", "stapleShoppingListId": "x1"},
            {"id": "l3", "userId": "u1", "masterProductPriceId": "p1", "name": "Milk"},
            {"id": "l4", "userId": "u1", "masterProductPriceId": "p4"},
            {"id": "l5", "userId": "u1", "stapleShoppingListId": "x2", "doneDate": "2017-03-01T00:00:00Z"},
            {"id": "l6", "userId": "u1", "masterProductPriceId": "p1", "removedByUserId": "u1"},
            {"id": "l7", "userId": "u2", "stapleShoppingListId": "x2"},
            {"id": "l8", "userId": "u3", "masterProductPriceId": "p404"},
            {"id": "l9", "userId": "u4", "masterProductPriceId": "p6"}
        ]
    }"#;

    fn context(user_id: &str) -> (MemoryBackend, RequestContext) {
        let backend = MemoryBackend::new(Snapshot::from_json(FIXTURE).unwrap());
        let ctx = RequestContext::new(Session::new(user_id), backend.services(), Config::default());
        (backend, ctx)
    }

    fn names(rows: &[ConsolidatedRow]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_groups_and_sorts_by_name() {
        let (_, ctx) = context("u1");
        let rows = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();

        assert_eq!(names(&rows), vec!["bread", "Butter", "Milk"]);

        let bread = &rows[0];
        assert_eq!(bread.id, "shoppingList-x1");
        assert_eq!(bread.quantity, 2);
        assert_eq!(bread.shopping_list_ids, vec!["l1", "l2"]);
    }

    #[test]
    fn test_quantities_cover_every_live_link() {
        let (_, ctx) = context("u1");
        let rows = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();

        let total: usize = rows.iter().map(|r| r.quantity).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_inactive_price_shows_latest_active_offer() {
        let (_, ctx) = context("u1");
        let rows = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();

        let butter = rows.iter().find(|r| r.name == "Butter").unwrap();
        assert_eq!(butter.id, "shoppingList-p4");
        assert_eq!(butter.status, PriceStatus::Active);
        let RowTarget::Special(details) = &butter.target else {
            panic!("expected a special row");
        };
        assert_eq!(details.special_id, "p4");
        assert_eq!(details.price_to_display, Some(4.0));
        assert_eq!(details.image_url.as_deref(), Some("butter-old.png"));
        assert_eq!(details.store_name.as_deref(), Some("Countdown"));
    }

    #[test]
    fn test_inactive_price_without_replacement_keeps_its_own_fields() {
        let (_, ctx) = context("u4");
        let rows = consolidate(&ctx, "u4", &ConnectionArgs::new()).unwrap();

        assert_eq!(rows.len(), 1);
        let cheese = &rows[0];
        assert_eq!(cheese.name, "Cheese");
        assert_eq!(cheese.status, PriceStatus::Inactive);
        let RowTarget::Special(details) = &cheese.target else {
            panic!("expected a special row");
        };
        // an active offer in another store is not a replacement
        assert_eq!(details.special_id, "p6");
        assert_eq!(details.price_to_display, Some(8.0));
    }

    #[test]
    fn test_single_target_row_skips_the_rest_of_the_list() {
        let (_, ctx) = context("u1");
        let target = LinkTarget::price("p4");

        let row = consolidate_target(&ctx, "u1", &target, vec!["l4".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(row.id, "shoppingList-p4");
        assert_eq!(row.status, PriceStatus::Active);
        assert_eq!(row.quantity, 1);

        assert!(consolidate_target(&ctx, "u1", &target, Vec::new()).unwrap().is_none());

        let err = consolidate_target(&ctx, "u1", &LinkTarget::price("p404"), vec!["l8".into()])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let (_, ctx) = context("u1");
        let first = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();
        let second = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_name_descending_reverses_order() {
        let (_, ctx) = context("u1");
        let args = ConnectionArgs::new().sort_option("NameDescending");
        let rows = consolidate(&ctx, "u1", &args).unwrap();
        assert_eq!(names(&rows), vec!["Milk", "Butter", "bread"]);

        // price orderings do not apply to the shopping list
        let args = ConnectionArgs::new().sort_option("PriceDescending");
        let rows = consolidate(&ctx, "u1", &args).unwrap();
        assert_eq!(names(&rows), vec!["bread", "Butter", "Milk"]);
    }

    #[test]
    fn test_done_link_removes_its_row() {
        let (backend, ctx) = context("u1");
        let mut link = backend
            .snapshot()
            .shopping_list
            .into_iter()
            .find(|l| l.id == "l3")
            .unwrap();
        link.done_date = Some(chrono::Utc::now());
        ctx.services.shopping_list.update(&link, None).unwrap();

        let rows = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();
        assert_eq!(names(&rows), vec!["bread", "Butter"]);
    }

    #[test]
    fn test_name_filter_applies_to_links() {
        let (_, ctx) = context("u1");
        let rows = consolidate(&ctx, "u1", &ConnectionArgs::new().name("MILK")).unwrap();
        assert_eq!(names(&rows), vec!["Milk"]);
    }

    #[test]
    fn test_dangling_reference_fails() {
        let (backend, ctx) = context("u3");
        let err = consolidate(&ctx, "u3", &ConnectionArgs::new()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Master Product Price not found: p404");
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn test_foreign_staple_list_is_not_resolved() {
        let (_, ctx) = context("u2");
        let err = consolidate(&ctx, "u2", &ConnectionArgs::new()).unwrap_err();
        assert_eq!(err.to_string(), "Staple Shopping List not found: x2");
    }

    #[test]
    fn test_mixed_pagination_is_rejected() {
        let (_, ctx) = context("u1");
        let args = ConnectionArgs::new().first(1).last(1);
        assert!(consolidate(&ctx, "u1", &args).unwrap_err().is_validation());
    }
}
