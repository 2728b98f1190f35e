// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Shopping-list consolidation and pagination engine for a grocery-deals
// backend. Storage, session resolution and transport live behind the
// `RecordService` trait; this crate only prepares criteria, merges the
// records it gets back and pages the result.

pub mod bulk;
pub mod config;
pub mod connection;
pub mod consolidator;
pub mod context;
pub mod criteria;
pub mod error;
pub mod loader;
pub mod mutation;
pub mod normalize;
pub mod pagination;
pub mod query;
pub mod service;
pub mod snapshot;
pub mod types;

pub use bulk::{apply_in_chunks, split_into_chunks};
pub use config::{
    Config, DEFAULT_BULK_CHUNK_SIZE, DEFAULT_PAGE_SIZE, MAXIMUM_PAGE_SIZE, PagePolicy, Verbosity,
};
pub use connection::{CURSOR_NOT_AVAILABLE, Connection, Edge, PageInfo};
pub use consolidator::consolidate;
pub use context::{RecordChange, RequestContext};
pub use criteria::{ConnectionArgs, Criteria, OrderBy, SortOption};
pub use error::{Error, Result};
pub use loader::{KeyedLoader, StoreLoader, TagLoader};
pub use mutation::{
    MutationOutcome, add_items_to_shopping_list, add_new_staple_shopping_list_to_shopping_list,
    add_special_item_to_user_shopping_list, add_staple_shopping_list_item_to_user_shopping_list,
    remove_items_from_shopping_list, remove_special_item_from_user_shopping_list,
    remove_special_items_from_user_shopping_list,
    remove_staple_shopping_list_item_from_user_shopping_list,
    remove_staple_shopping_list_items_from_user_shopping_list,
};
pub use normalize::normalize;
pub use pagination::{PageWindow, paginate};
pub use query::{
    get_shopping_list, get_specials, get_staple_item, get_staple_shopping_list, get_stores,
    get_tags,
};
pub use service::{Acl, RecordService, RecordStream, Services, Session, drain};
pub use snapshot::{MemoryBackend, Snapshot};
pub use types::{
    ConsolidatedRow, LinkKind, LinkTarget, MasterProduct, PriceRecord, PriceStatus, RowTarget,
    ShoppingListLink, SpecialDetails, StapleItem, StapleShoppingList, Store, Tag,
};
