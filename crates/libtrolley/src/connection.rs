// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serialize;

use crate::pagination::PageWindow;

/// placeholder cursor for an empty page; keeps the response shape stable.
pub const CURSOR_NOT_AVAILABLE: &str = "cursor not available";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<T> {
    pub node: T,
    /// 1-based position of the node in the full collection.
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: String,
    pub end_cursor: String,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub count: usize,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

/// slices a fully materialized collection to the window.
pub fn to_page<T>(rows: Vec<T>, window: &PageWindow) -> Connection<T> {
    let count = rows.len();
    let page = rows
        .into_iter()
        .skip(window.skip)
        .take(window.limit)
        .collect();
    from_window(page, count, window)
}

/// wraps a page the store already sliced with `window.limit`/`window.skip`.
pub fn from_window<T>(page: Vec<T>, count: usize, window: &PageWindow) -> Connection<T> {
    let edges: Vec<Edge<T>> = page
        .into_iter()
        .take(window.limit)
        .enumerate()
        .map(|(offset, node)| Edge {
            node,
            cursor: window.skip.saturating_add(offset + 1),
        })
        .collect();

    let cursor_text = |edge: Option<&Edge<T>>| {
        edge.map(|e| e.cursor.to_string())
            .unwrap_or_else(|| CURSOR_NOT_AVAILABLE.to_string())
    };

    let page_info = PageInfo {
        start_cursor: cursor_text(edges.first()),
        end_cursor: cursor_text(edges.last()),
        has_previous_page: window.has_previous_page,
        has_next_page: window.has_next_page,
    };

    Connection {
        edges,
        count,
        page_info,
    }
}
