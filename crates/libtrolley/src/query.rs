// SPDX-License-Identifier: MIT OR Apache-2.0

//! connection queries: errors propagate to the caller as hard failures.

use crate::{
    ConnectionArgs, Result,
    connection::{Connection, from_window, to_page},
    consolidator::consolidate,
    context::RequestContext,
    loader::KeyedLoader,
    criteria::{
        Criteria, specials_criteria, staple_item_criteria, staple_shopping_list_criteria,
        stores_criteria, tags_criteria,
    },
    pagination::paginate,
    service::RecordService,
    types::{ConsolidatedRow, PriceRecord, StapleItem, StapleShoppingList, Store, Tag},
};

/// pages the consolidated shopping list of `user_id`.
pub fn get_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    args: &ConnectionArgs,
) -> Result<Connection<ConsolidatedRow>> {
    let rows = consolidate(ctx, user_id, args)?;
    let window = paginate(args, rows.len(), &ctx.config.page_policy)?;
    log::debug!(
        "**query:** shopping list of {user_id}: {} rows, skip {} limit {}",
        rows.len(),
        window.skip,
        window.limit
    );
    Ok(to_page(rows, &window))
}

/// `tag_keys`/`store_keys` take precedence over raw ids and must all resolve.
pub fn get_specials(ctx: &RequestContext, args: &ConnectionArgs) -> Result<Connection<PriceRecord>> {
    let tag_ids = ids_for_keys(&ctx.tags, args.tag_keys.as_deref(), |tag: Tag| tag.id)?;
    let store_ids = ids_for_keys(&ctx.stores, args.store_keys.as_deref(), |store: Store| {
        store.id
    })?;

    let criteria = specials_criteria(args, tag_ids, store_ids)?;
    page_from_store(ctx, ctx.services.prices.as_ref(), criteria, args)
}

pub fn get_stores(ctx: &RequestContext, args: &ConnectionArgs) -> Result<Connection<Store>> {
    page_from_store(ctx, ctx.services.stores.as_ref(), stores_criteria(args)?, args)
}

pub fn get_tags(ctx: &RequestContext, args: &ConnectionArgs) -> Result<Connection<Tag>> {
    page_from_store(ctx, ctx.services.tags.as_ref(), tags_criteria(args)?, args)
}

pub fn get_staple_shopping_list(
    ctx: &RequestContext,
    user_id: &str,
    args: &ConnectionArgs,
) -> Result<Connection<StapleShoppingList>> {
    let criteria = staple_shopping_list_criteria(user_id, args)?;
    page_from_store(ctx, ctx.services.staple_shopping_lists.as_ref(), criteria, args)
}

/// `tag_keys` take precedence over raw tag ids and must all resolve.
pub fn get_staple_item(
    ctx: &RequestContext,
    user_id: &str,
    args: &ConnectionArgs,
) -> Result<Connection<StapleItem>> {
    let tag_ids = ids_for_keys(&ctx.tags, args.tag_keys.as_deref(), |tag: Tag| tag.id)?;
    let criteria = staple_item_criteria(user_id, args, tag_ids)?;
    page_from_store(ctx, ctx.services.staple_items.as_ref(), criteria, args)
}

fn ids_for_keys<T: Clone + Send + Sync>(
    loader: &KeyedLoader<T>,
    keys: Option<&[String]>,
    id: fn(T) -> String,
) -> Result<Option<Vec<String>>> {
    match keys {
        Some(keys) if !keys.is_empty() => {
            Ok(Some(loader.load_many(keys)?.into_iter().map(id).collect()))
        }
        _ => Ok(None),
    }
}

// counts first so the window knows whether a next page exists
fn page_from_store<T>(
    ctx: &RequestContext,
    service: &dyn RecordService<T>,
    criteria: Criteria,
    args: &ConnectionArgs,
) -> Result<Connection<T>> {
    let count = service.count(&criteria, ctx.token())?;
    let window = paginate(args, count, &ctx.config.page_policy)?;
    let page = service.search(&criteria.page(window.limit, window.skip), ctx.token())?;
    Ok(from_window(page, count, &window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Config,
        connection::CURSOR_NOT_AVAILABLE,
        service::Session,
        snapshot::{MemoryBackend, Snapshot},
    };

    const FIXTURE: &str = r#"{
        "masterProducts": [
            {"id": "m1", "name": "Milk"},
            {"id": "m2", "name": "Bread"},
            {"id": "m3", "name": "Cheese"}
        ],
        "stores": [
            {"id": "s1", "key": "countdown", "name": "Countdown"},
            {"id": "s2", "key": "new-world", "name": "New World"},
            {"id": "s3", "key": "pak-n-save", "name": "Pak n Save"}
        ],
        "tags": [
            {"id": "t1", "key": "dairy", "name": "Dairy", "forDisplay": true},
            {"id": "t2", "key": "bakery", "name": "Bakery", "forDisplay": true},
            {"id": "t3", "key": "internal", "name": "Internal"}
        ],
        "prices": [
            {"id": "p1", "masterProductId": "m1", "storeId": "s1", "status": "A", "special": true, "priceToDisplay": 3.5, "tagIds": ["t1"]},
            {"id": "p2", "masterProductId": "m2", "storeId": "s1", "status": "A", "special": true, "priceToDisplay": 2.0, "tagIds": ["t2"]},
            {"id": "p3", "masterProductId": "m3", "storeId": "s2", "status": "A", "special": true, "priceToDisplay": 7.0, "tagIds": ["t1"]},
            {"id": "p4", "masterProductId": "m3", "storeId": "s2", "status": "A", "special": false, "priceToDisplay": 9.0},
            {"id": "p5", "masterProductId": "m1", "storeId": "s2", "status": "I", "special": true}
        ],
        "stapleShoppingLists": [
            {"id": "x1", "userId": "u1", "name": "Eggs"},
            {"id": "x2", "userId": "u1", "name": "apples"},
            {"id": "x3", "userId": "u2", "name": "Rice"}
        ],
        "stapleItems": [
            {"id": "i1", "userId": "u1", "name": "Yoghurt", "tagIds": ["t1"], "popular": true},
            {"id": "i2", "userId": "u1", "name": "Baguette", "tagIds": ["t2"]},
            {"id": "i3", "userId": "u1", "name": "Brie", "tagIds": ["t1"]}
        ],
        "shoppingList": [
            {"id": "l1", "userId": "u1", "stapleShoppingListId": "x1"},
            {"id": "l2", "userId": "u1", "stapleShoppingListId": "x2"},
            {"id": "l3", "userId": "u1", "masterProductPriceId": "p1"},
            {"id": "l4", "userId": "u1", "masterProductPriceId": "p2"},
            {"id": "l5", "userId": "u1", "masterProductPriceId": "p2"}
        ]
    }"#;

    fn context() -> RequestContext {
        let backend = MemoryBackend::new(Snapshot::from_json(FIXTURE).unwrap());
        RequestContext::new(Session::new("u1"), backend.services(), Config::default())
    }

    #[test]
    fn test_shopping_list_pages_forward() {
        let ctx = context();

        let page = get_shopping_list(&ctx, "u1", &ConnectionArgs::new().first(2)).unwrap();
        assert_eq!(page.count, 4);
        let names: Vec<&str> = page.nodes().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["apples", "Bread"]);
        assert_eq!(page.edges[1].node.quantity, 2);
        assert_eq!(page.page_info.start_cursor, "1");
        assert_eq!(page.page_info.end_cursor, "2");
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);

        let args = ConnectionArgs::new().first(2).after(page.page_info.end_cursor.clone());
        let page = get_shopping_list(&ctx, "u1", &args).unwrap();
        let names: Vec<&str> = page.nodes().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Eggs", "Milk"]);
        assert_eq!(page.edges[0].cursor, 3);
        assert!(!page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_shopping_list_pages_backward() {
        let ctx = context();
        let args = ConnectionArgs::new().last(2).before("3");
        let page = get_shopping_list(&ctx, "u1", &args).unwrap();

        assert_eq!(page.edges[0].cursor, 2);
        assert_eq!(page.edges.len(), 2);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_shopping_list_past_the_end_is_empty() {
        let ctx = context();
        let args = ConnectionArgs::new().first(5).after("10");
        let page = get_shopping_list(&ctx, "u1", &args).unwrap();

        assert!(page.edges.is_empty());
        assert_eq!(page.count, 4);
        assert_eq!(page.page_info.start_cursor, CURSOR_NOT_AVAILABLE);
        assert_eq!(page.page_info.end_cursor, CURSOR_NOT_AVAILABLE);
    }

    #[test]
    fn test_specials_sorted_and_filtered() {
        let ctx = context();
        let args = ConnectionArgs::new().sort_option("PriceDescending");
        let page = get_specials(&ctx, &args).unwrap();

        let ids: Vec<&str> = page.nodes().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1", "p2"]);
        assert_eq!(page.count, 3);
        assert_eq!(page.edges[0].node.store.as_ref().unwrap().name, "New World");

        let args = ConnectionArgs {
            tags: Some(vec!["t1".to_string()]),
            stores: Some(vec!["s1".to_string()]),
            ..Default::default()
        };
        let page = get_specials(&ctx, &args).unwrap();
        let ids: Vec<&str> = page.nodes().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn test_specials_by_store_and_tag_keys() {
        let ctx = context();
        let args = ConnectionArgs {
            store_keys: Some(vec!["new-world".to_string()]),
            ..Default::default()
        };
        let page = get_specials(&ctx, &args).unwrap();
        let ids: Vec<&str> = page.nodes().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3"]);
        assert_eq!(ctx.stores.cached(), 1);

        let args = ConnectionArgs {
            tag_keys: Some(vec!["dairy".to_string()]),
            ..Default::default()
        };
        let page = get_specials(&ctx, &args).unwrap();
        let ids: Vec<&str> = page.nodes().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1"]);

        let args = ConnectionArgs {
            store_keys: Some(vec!["warehouse".to_string()]),
            ..Default::default()
        };
        let err = get_specials(&ctx, &args).unwrap_err();
        assert_eq!(err.to_string(), "Store not found with provided key: warehouse");
    }

    #[test]
    fn test_specials_second_page_from_store() {
        let ctx = context();
        let args = ConnectionArgs::new().first(1).after("1");
        let page = get_specials(&ctx, &args).unwrap();

        assert_eq!(page.count, 3);
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.display_name(), "Cheese");
        assert_eq!(page.edges[0].cursor, 2);
        assert!(page.page_info.has_next_page);
    }

    #[test]
    fn test_stores_and_tags() {
        let ctx = context();

        let stores = get_stores(&ctx, &ConnectionArgs::new().name("world")).unwrap();
        assert_eq!(stores.count, 1);
        assert_eq!(stores.edges[0].node.id, "s2");

        let tags = get_tags(&ctx, &ConnectionArgs::new()).unwrap();
        let names: Vec<&str> = tags.nodes().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Bakery", "Dairy"]);
    }

    #[test]
    fn test_staple_lists_belong_to_user() {
        let ctx = context();
        let page = get_staple_shopping_list(&ctx, "u1", &ConnectionArgs::new()).unwrap();
        let names: Vec<&str> = page.nodes().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["apples", "Eggs"]);
    }

    #[test]
    fn test_staple_items_by_tag_key() {
        let ctx = context();
        let args = ConnectionArgs {
            tag_keys: Some(vec!["dairy".to_string()]),
            ..Default::default()
        };
        let page = get_staple_item(&ctx, "u1", &args).unwrap();
        let names: Vec<&str> = page.nodes().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Brie", "Yoghurt"]);
        assert_eq!(page.edges[0].node.tags[0].key.as_deref(), Some("dairy"));

        let args = ConnectionArgs {
            popular: Some(true),
            ..Default::default()
        };
        let page = get_staple_item(&ctx, "u1", &args).unwrap();
        assert_eq!(page.count, 1);
    }

    #[test]
    fn test_unknown_tag_key_fails() {
        let ctx = context();
        let args = ConnectionArgs {
            tag_keys: Some(vec!["frozen".to_string()]),
            ..Default::default()
        };
        let err = get_staple_item(&ctx, "u1", &args).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_cursor_is_a_validation_error() {
        let ctx = context();
        let args = ConnectionArgs::new().after("later");
        assert!(get_stores(&ctx, &args).unwrap_err().is_validation());
    }
}
