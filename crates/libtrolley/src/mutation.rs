// SPDX-License-Identifier: MIT OR Apache-2.0

//! shopping-list mutations.
//!
//! failures never escape as errors: they are logged and reported through
//! [`MutationOutcome::error_message`] so the caller always gets a payload.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::{
    ConnectionArgs, Error, Result,
    bulk::apply_in_chunks,
    consolidator::{consolidate, consolidate_target},
    context::RequestContext,
    criteria::{Conditions, Criteria, Include, links_to_target_criteria},
    normalize::normalize,
    service::{Acl, drain},
    types::{ConsolidatedRow, LinkKind, LinkTarget, ShoppingListLink, StapleShoppingList},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

impl<T> MutationOutcome<T> {
    pub fn ok(item: Option<T>) -> Self {
        Self {
            error_message: None,
            item,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            item: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error_message.is_none()
    }
}

fn settle<T>(operation: &str, result: Result<Option<T>>) -> MutationOutcome<T> {
    match result {
        Ok(item) => MutationOutcome::ok(item),
        Err(e) => {
            log::error!("**mutation:** {operation} failed: {e}");
            MutationOutcome::failed(e.to_string())
        }
    }
}

/// marks one live link to the special done; returns what is left of its row.
pub fn remove_special_item_from_user_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    special_id: &str,
) -> MutationOutcome<ConsolidatedRow> {
    settle(
        "remove special item",
        remove_one(ctx, user_id, &LinkTarget::price(special_id)),
    )
}

pub fn remove_special_items_from_user_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    special_id: &str,
) -> MutationOutcome<()> {
    settle(
        "remove special items",
        remove_all(ctx, user_id, LinkKind::Price, special_id).map(|()| None),
    )
}

pub fn remove_staple_shopping_list_item_from_user_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    staple_shopping_list_id: &str,
) -> MutationOutcome<ConsolidatedRow> {
    settle(
        "remove staple shopping list item",
        remove_one(
            ctx,
            user_id,
            &LinkTarget::staple_shopping_list(staple_shopping_list_id),
        ),
    )
}

pub fn remove_staple_shopping_list_items_from_user_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    staple_shopping_list_id: &str,
) -> MutationOutcome<()> {
    settle(
        "remove staple shopping list items",
        remove_all(
            ctx,
            user_id,
            LinkKind::StapleShoppingList,
            staple_shopping_list_id,
        )
        .map(|()| None),
    )
}

/// removes every entry the given links stand for and returns the refreshed list.
pub fn remove_items_from_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    shopping_list_ids: &[String],
) -> MutationOutcome<Vec<ConsolidatedRow>> {
    settle(
        "remove items from shopping list",
        remove_items(ctx, user_id, shopping_list_ids),
    )
}

pub fn add_special_item_to_user_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    special_id: &str,
) -> MutationOutcome<ConsolidatedRow> {
    settle(
        "add special item",
        add_link(ctx, user_id, &LinkTarget::price(special_id)),
    )
}

pub fn add_staple_shopping_list_item_to_user_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    staple_shopping_list_id: &str,
) -> MutationOutcome<ConsolidatedRow> {
    settle(
        "add staple shopping list item",
        add_link(
            ctx,
            user_id,
            &LinkTarget::staple_shopping_list(staple_shopping_list_id),
        ),
    )
}

/// adds a staple list by name, reusing the user's own list or a template first.
pub fn add_new_staple_shopping_list_to_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    name: &str,
) -> MutationOutcome<ConsolidatedRow> {
    let result = find_or_create_staple_list(ctx, user_id, name).and_then(|staple_id| {
        add_link(ctx, user_id, &LinkTarget::staple_shopping_list(staple_id))
    });
    settle("add new staple shopping list", result)
}

/// adds one link per target, in bulk, and returns the refreshed list.
pub fn add_items_to_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    targets: &[LinkTarget],
) -> MutationOutcome<Vec<ConsolidatedRow>> {
    settle(
        "add items to shopping list",
        add_items(ctx, user_id, targets),
    )
}

fn add_items(
    ctx: &RequestContext,
    user_id: &str,
    targets: &[LinkTarget],
) -> Result<Option<Vec<ConsolidatedRow>>> {
    // every target is checked before the first write
    let links = targets
        .iter()
        .map(|target| new_link(ctx, user_id, target))
        .collect::<Result<Vec<_>>>()?;

    let acl = Acl::for_user(user_id);
    apply_in_chunks(&links, ctx.config.bulk_chunk_size, |link| {
        ctx.services
            .shopping_list
            .create(link.clone(), Some(&acl), ctx.token())
            .map(|_| ())
    })?;

    log::info!("**mutation:** added {} items for {user_id}", links.len());
    consolidate(ctx, user_id, &ConnectionArgs::new()).map(Some)
}

fn live_links(
    ctx: &RequestContext,
    user_id: &str,
    kind: LinkKind,
    target_id: &str,
) -> Result<Vec<ShoppingListLink>> {
    let criteria = links_to_target_criteria(user_id, kind, target_id);
    drain(ctx.services.shopping_list.search_all(&criteria, ctx.token())?)
}

// the row of one target, rebuilt from that target's remaining live links only
fn target_row(
    ctx: &RequestContext,
    user_id: &str,
    target: &LinkTarget,
) -> Result<Option<ConsolidatedRow>> {
    let link_ids = live_links(ctx, user_id, target.kind(), target.id())?
        .into_iter()
        .map(|link| link.id)
        .collect();
    consolidate_target(ctx, user_id, target, link_ids)
}

fn remove_one(
    ctx: &RequestContext,
    user_id: &str,
    target: &LinkTarget,
) -> Result<Option<ConsolidatedRow>> {
    let Some(mut link) = live_links(ctx, user_id, target.kind(), target.id())?
        .into_iter()
        .next()
    else {
        log::debug!("**mutation:** no live link to {} for {user_id}", target.id());
        return Ok(None);
    };

    link.done_date = Some(Utc::now());
    ctx.services.shopping_list.update(&link, ctx.token())?;
    log::debug!("**mutation:** marked {} done", link.id);

    target_row(ctx, user_id, target)
}

fn remove_all(ctx: &RequestContext, user_id: &str, kind: LinkKind, target_id: &str) -> Result<()> {
    let links = live_links(ctx, user_id, kind, target_id)?;
    let done_date = Utc::now();

    apply_in_chunks(&links, ctx.config.bulk_chunk_size, |link| {
        let mut link = link.clone();
        link.done_date = Some(done_date);
        ctx.services.shopping_list.update(&link, ctx.token())
    })?;

    log::info!("**mutation:** marked {} links to {target_id} done", links.len());
    Ok(())
}

fn remove_items(
    ctx: &RequestContext,
    user_id: &str,
    shopping_list_ids: &[String],
) -> Result<Option<Vec<ConsolidatedRow>>> {
    let criteria = Criteria::new()
        .with_ids(shopping_list_ids.iter().cloned().collect())
        .with_conditions(Conditions {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        });
    let selected = drain(ctx.services.shopping_list.search_all(&criteria, ctx.token())?)?;

    if let Some(missing) = shopping_list_ids
        .iter()
        .find(|id| !selected.iter().any(|link| &link.id == *id))
    {
        return Err(Error::not_found(format!(
            "Shopping list item not found: {missing}"
        )));
    }

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for target in selected.iter().map(|link| &link.target) {
        if seen.insert(target) {
            links.extend(live_links(ctx, user_id, target.kind(), target.id())?);
        }
    }

    apply_in_chunks(&links, ctx.config.bulk_chunk_size, |link| {
        let mut link = link.clone();
        link.removed_by_user_id = Some(user_id.to_string());
        ctx.services.shopping_list.update(&link, ctx.token())
    })?;

    log::info!(
        "**mutation:** removed {} links across {} entries for {user_id}",
        links.len(),
        seen.len()
    );
    consolidate(ctx, user_id, &ConnectionArgs::new()).map(Some)
}

/// builds a link after checking its target exists, named after the target.
fn new_link(ctx: &RequestContext, user_id: &str, target: &LinkTarget) -> Result<ShoppingListLink> {
    match target {
        LinkTarget::StapleShoppingList {
            staple_shopping_list_id: id,
        } => {
            let criteria = Criteria::new().with_id(id.clone()).with_conditions(Conditions {
                user_id: Some(user_id.to_string()),
                ..Default::default()
            });
            let staple = ctx
                .services
                .staple_shopping_lists
                .search(&criteria, ctx.token())?
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found(format!("Staple Shopping List not found: {id}")))?;

            Ok(ShoppingListLink::new(user_id, target.clone()).with_name(Some(staple.name)))
        }
        LinkTarget::Price { price_id: id } => {
            let criteria = Criteria::new()
                .with_id(id.clone())
                .include(Include::MasterProduct);
            let price = ctx
                .services
                .prices
                .search(&criteria, ctx.token())?
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found(format!("Master Product Price not found: {id}")))?;

            let mut link = ShoppingListLink::new(user_id, target.clone())
                .with_name(Some(price.display_name().to_string()));
            link.description = price.display_description().map(str::to_string);
            Ok(link)
        }
    }
}

fn add_link(
    ctx: &RequestContext,
    user_id: &str,
    target: &LinkTarget,
) -> Result<Option<ConsolidatedRow>> {
    let link = new_link(ctx, user_id, target)?;
    let id = ctx
        .services
        .shopping_list
        .create(link, Some(&Acl::for_user(user_id)), ctx.token())?;
    log::debug!("**mutation:** created link {id} to {}", target.id());

    target_row(ctx, user_id, target)
}

fn find_or_create_staple_list(ctx: &RequestContext, user_id: &str, name: &str) -> Result<String> {
    let trimmed = normalize(Some(name));
    if trimmed.is_empty() {
        return Err(Error::validation("Name is invalid."));
    }

    let lowered = trimmed.to_lowercase();
    let own = Criteria::new().with_conditions(Conditions {
        user_id: Some(user_id.to_string()),
        name: Some(lowered.clone()),
        ..Default::default()
    });
    if let Some(existing) = ctx
        .services
        .staple_shopping_lists
        .search(&own, ctx.token())?
        .into_iter()
        .next()
    {
        log::debug!("**mutation:** reusing staple list {}", existing.id);
        return Ok(existing.id);
    }

    let template = Criteria::new().with_conditions(Conditions {
        name: Some(lowered),
        ..Default::default()
    });
    let copy = match ctx
        .services
        .staple_templates
        .search(&template, ctx.token())?
        .into_iter()
        .next()
    {
        Some(found) => StapleShoppingList {
            id: String::new(),
            user_id: Some(user_id.to_string()),
            name: found.name,
            tag_ids: found.tag_ids,
            tags: Vec::new(),
        },
        None => StapleShoppingList {
            user_id: Some(user_id.to_string()),
            name: trimmed,
            ..Default::default()
        },
    };

    ctx.services
        .staple_shopping_lists
        .create(copy, Some(&Acl::for_user(user_id)), ctx.token())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Config,
        service::Session,
        snapshot::{MemoryBackend, Snapshot},
    };

    const FIXTURE: &str = r#"{
        "masterProducts": [
            {"id": "m1", "name": "Milk", "description": "2 litre"},
            {"id": "m2", "name": "Bread"}
        ],
        "stores": [{"id": "s1", "key": "countdown", "name": "Countdown"}],
        "stapleShoppingLists": [
            {"id": "x1", "userId": "u1", "name": "Eggs"}
        ],
        "stapleTemplates": [
            {"id": "tpl1", "name": "Bananas", "tagIds": ["t9"]}
        ],
        "prices": [
            {"id": "p1", "masterProductId": "m1", "storeId": "s1", "status": "A", "special": true},
            {"id": "p2", "masterProductId": "m2", "storeId": "s1", "status": "A", "special": true}
        ],
        "shoppingList": [
            {"id": "l1", "userId": "u1", "masterProductPriceId": "p1"},
            {"id": "l2", "userId": "u1", "masterProductPriceId": "p1"},
            {"id": "l3", "userId": "u1", "masterProductPriceId": "p1"},
            {"id": "l4", "userId": "u1", "stapleShoppingListId": "x1"},
            {"id": "l5", "userId": "u2", "masterProductPriceId": "p1"}
        ]
    }"#;

    fn context(chunk_size: usize) -> (MemoryBackend, RequestContext) {
        let backend = MemoryBackend::new(Snapshot::from_json(FIXTURE).unwrap());
        let config = Config::default().with_bulk_chunk_size(chunk_size);
        let ctx = RequestContext::new(Session::new("u1"), backend.services(), config);
        (backend, ctx)
    }

    fn link(backend: &MemoryBackend, id: &str) -> ShoppingListLink {
        backend
            .snapshot()
            .shopping_list
            .into_iter()
            .find(|l| l.id == id)
            .unwrap()
    }

    #[test]
    fn test_remove_one_decrements_quantity() {
        let (backend, ctx) = context(100);

        let outcome = remove_special_item_from_user_shopping_list(&ctx, "u1", "p1");
        assert!(outcome.is_ok());
        let row = outcome.item.unwrap();
        assert_eq!(row.quantity, 2);
        assert_eq!(row.shopping_list_ids, vec!["l2", "l3"]);
        assert!(link(&backend, "l1").done_date.is_some());
    }

    #[test]
    fn test_remove_last_one_drops_the_row() {
        let (_, ctx) = context(100);

        let outcome = remove_staple_shopping_list_item_from_user_shopping_list(&ctx, "u1", "x1");
        assert!(outcome.is_ok());
        assert!(outcome.item.is_none());

        let rows = consolidate(&ctx, "u1", &ConnectionArgs::new()).unwrap();
        assert!(rows.iter().all(|r| r.target.id() != "x1"));
    }

    #[test]
    fn test_single_mutations_ignore_unrelated_dangling_links() {
        let (backend, ctx) = context(100);
        let dangling = ShoppingListLink::new("u1", LinkTarget::price("gone"));
        ctx.services
            .shopping_list
            .create(dangling, None, None)
            .unwrap();

        let outcome = remove_staple_shopping_list_item_from_user_shopping_list(&ctx, "u1", "x1");
        assert!(outcome.is_ok());
        assert!(outcome.item.is_none());
        assert!(link(&backend, "l4").done_date.is_some());

        let outcome = remove_special_item_from_user_shopping_list(&ctx, "u1", "p1");
        assert_eq!(outcome.item.unwrap().quantity, 2);

        let outcome = add_special_item_to_user_shopping_list(&ctx, "u1", "p2");
        assert!(outcome.is_ok());
        assert_eq!(outcome.item.unwrap().name, "Bread");
    }

    #[test]
    fn test_remove_all_marks_every_link_done() {
        let (backend, ctx) = context(2);

        let outcome = remove_special_items_from_user_shopping_list(&ctx, "u1", "p1");
        assert!(outcome.is_ok());
        for id in ["l1", "l2", "l3"] {
            assert!(link(&backend, id).done_date.is_some());
        }
        // other users keep their links
        assert!(link(&backend, "l5").is_live());
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn test_remove_items_marks_links_removed_by_user() {
        let (backend, ctx) = context(100);

        let outcome = remove_items_from_shopping_list(&ctx, "u1", &["l2".to_string()]);
        assert!(outcome.is_ok());
        let rows = outcome.item.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Eggs");

        for id in ["l1", "l2", "l3"] {
            assert_eq!(link(&backend, id).removed_by_user_id.as_deref(), Some("u1"));
        }
        assert!(link(&backend, "l5").is_live());
    }

    #[test]
    fn test_remove_items_with_unknown_link_is_soft_failure() {
        let (backend, ctx) = context(100);

        let outcome = remove_items_from_shopping_list(&ctx, "u1", &["l5".to_string()]);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Shopping list item not found: l5")
        );
        assert!(outcome.item.is_none());
        assert!(link(&backend, "l5").is_live());
    }

    #[test]
    fn test_add_special_creates_named_link() {
        let (backend, ctx) = context(100);

        let outcome = add_special_item_to_user_shopping_list(&ctx, "u1", "p2");
        let row = outcome.item.unwrap();
        assert_eq!(row.name, "Bread");
        assert_eq!(row.quantity, 1);

        let created = link(&backend, &row.shopping_list_ids[0]);
        assert_eq!(created.name.as_deref(), Some("Bread"));
        assert_eq!(created.target, LinkTarget::price("p2"));
    }

    #[test]
    fn test_add_unknown_special_is_soft_failure() {
        let (_, ctx) = context(100);
        let outcome = add_special_item_to_user_shopping_list(&ctx, "u1", "nope");
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Master Product Price not found: nope")
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["errorMessage"], "Master Product Price not found: nope");
        assert!(json.get("item").is_none());
    }

    #[test]
    fn test_add_staple_increments_existing_row() {
        let (_, ctx) = context(100);
        let outcome = add_staple_shopping_list_item_to_user_shopping_list(&ctx, "u1", "x1");
        assert_eq!(outcome.item.unwrap().quantity, 2);
    }

    #[test]
    fn test_add_new_staple_list_reuses_own_list() {
        let (backend, ctx) = context(100);
        let outcome = add_new_staple_shopping_list_to_shopping_list(&ctx, "u1", "  eggs!! ");

        let row = outcome.item.unwrap();
        assert_eq!(row.target.id(), "x1");
        assert_eq!(row.quantity, 2);
        assert_eq!(backend.snapshot().staple_shopping_lists.len(), 1);
    }

    #[test]
    fn test_add_new_staple_list_copies_template() {
        let (backend, ctx) = context(100);
        let outcome = add_new_staple_shopping_list_to_shopping_list(&ctx, "u1", "bananas");

        let row = outcome.item.unwrap();
        assert_eq!(row.name, "Bananas");

        let snapshot = backend.snapshot();
        let copy = snapshot
            .staple_shopping_lists
            .iter()
            .find(|s| s.id == row.target.id())
            .unwrap();
        assert_eq!(copy.user_id.as_deref(), Some("u1"));
        assert_eq!(copy.tag_ids, vec!["t9"]);
        assert_ne!(copy.id, "tpl1");
    }

    #[test]
    fn test_add_new_staple_list_creates_from_name() {
        let (_, ctx) = context(100);
        let outcome = add_new_staple_shopping_list_to_shopping_list(&ctx, "u1", "Dish   soap");
        assert_eq!(outcome.item.unwrap().name, "Dish soap");
    }

    #[test]
    fn test_add_new_staple_list_rejects_blank_name() {
        let (_, ctx) = context(100);
        let outcome = add_new_staple_shopping_list_to_shopping_list(&ctx, "u1", " !? ");
        assert_eq!(outcome.error_message.as_deref(), Some("Name is invalid."));
    }

    #[test]
    fn test_add_items_in_bulk() {
        let (_, ctx) = context(1);
        let targets = vec![
            LinkTarget::price("p2"),
            LinkTarget::price("p2"),
            LinkTarget::staple_shopping_list("x1"),
        ];

        let rows = add_items_to_shopping_list(&ctx, "u1", &targets).item.unwrap();
        let quantities: Vec<(&str, usize)> =
            rows.iter().map(|r| (r.name.as_str(), r.quantity)).collect();
        assert_eq!(quantities, vec![("Bread", 2), ("Eggs", 2), ("Milk", 3)]);
    }

    #[test]
    fn test_add_items_validates_before_writing() {
        let (backend, ctx) = context(100);
        let targets = vec![LinkTarget::price("p2"), LinkTarget::price("gone")];

        let outcome = add_items_to_shopping_list(&ctx, "u1", &targets);
        assert!(!outcome.is_ok());
        assert_eq!(backend.snapshot().shopping_list.len(), 5);
    }
}
