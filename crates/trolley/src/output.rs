// SPDX-License-Identifier: MIT OR Apache-2.0

use libtrolley::{
    Connection, ConsolidatedRow, PriceRecord, RowTarget, StapleItem, StapleShoppingList, Store,
    Tag, Verbosity,
};
use serde::Serialize;

pub mod ansi {
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";

    #[inline]
    pub fn bold(s: &str) -> String {
        format!("{BOLD}{s}{RESET}")
    }
}

/// envelope for machine-readable output.
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

/// one line of a human-readable listing.
pub trait Listing {
    fn title(&self) -> &str;

    fn detail(&self, verbosity: Verbosity) -> String;
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("${v:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

impl Listing for ConsolidatedRow {
    fn title(&self) -> &str {
        &self.name
    }

    fn detail(&self, verbosity: Verbosity) -> String {
        let mut detail = format!("x{}", self.quantity);
        if let RowTarget::Special(special) = &self.target {
            detail.push_str(&format!("  {}", money(special.price_to_display)));
            if let Some(store) = &special.store_name {
                detail.push_str(&format!("  {store}"));
            }
        }
        if verbosity == Verbosity::Verbose {
            detail.push_str(&format!("  [{}]", self.shopping_list_ids.join(", ")));
        }
        detail
    }
}

impl Listing for PriceRecord {
    fn title(&self) -> &str {
        self.display_name()
    }

    fn detail(&self, verbosity: Verbosity) -> String {
        let store = self.store.as_ref().map(|s| s.name.as_str()).unwrap_or("-");
        let mut detail = format!("{}  {store}", money(self.price_to_display));
        if verbosity == Verbosity::Verbose {
            if let Some(saving) = self.saving {
                detail.push_str(&format!("  save ${saving:.2}"));
            }
            if let Some(end) = self.offer_end_date {
                detail.push_str(&format!("  until {}", end.format("%Y-%m-%d")));
            }
            detail.push_str(&format!("  ({})", self.id));
        }
        detail
    }
}

impl Listing for Store {
    fn title(&self) -> &str {
        &self.name
    }

    fn detail(&self, _verbosity: Verbosity) -> String {
        self.key.clone().unwrap_or_else(|| self.id.clone())
    }
}

impl Listing for Tag {
    fn title(&self) -> &str {
        &self.name
    }

    fn detail(&self, _verbosity: Verbosity) -> String {
        self.key.clone().unwrap_or_else(|| self.id.clone())
    }
}

impl Listing for StapleShoppingList {
    fn title(&self) -> &str {
        &self.name
    }

    fn detail(&self, _verbosity: Verbosity) -> String {
        self.id.clone()
    }
}

impl Listing for StapleItem {
    fn title(&self) -> &str {
        &self.name
    }

    fn detail(&self, _verbosity: Verbosity) -> String {
        if self.popular {
            format!("{}  popular", self.id)
        } else {
            self.id.clone()
        }
    }
}

fn name_width<T: Listing>(items: &[&T]) -> usize {
    items
        .iter()
        .map(|i| i.title().chars().count())
        .max()
        .unwrap_or(10)
        .max(10)
}

pub fn print_connection<T: Listing>(connection: &Connection<T>, verbosity: Verbosity) {
    if verbosity == Verbosity::Quiet {
        println!("{}", connection.count);
        return;
    }

    if connection.edges.is_empty() {
        println!("{} nothing to show", ansi::bold("info:"));
        return;
    }

    let nodes: Vec<&T> = connection.nodes().collect();
    let name_width = name_width(&nodes);

    println!("{:>6}  {:<name_width$}  DETAIL", "#", "NAME");
    println!("{}", "-".repeat(name_width + 24));
    for edge in &connection.edges {
        println!(
            "{:>6}  {:<name_width$}  {}",
            edge.cursor,
            edge.node.title(),
            edge.node.detail(verbosity)
        );
    }

    println!();
    println!(
        "{} showing {}-{} of {}",
        ansi::bold("info:"),
        connection.page_info.start_cursor,
        connection.page_info.end_cursor,
        connection.count
    );
    if connection.page_info.has_next_page {
        println!(
            "{} next page: --after {}",
            ansi::bold("info:"),
            connection.page_info.end_cursor
        );
    }
}

pub fn print_rows(rows: &[ConsolidatedRow], verbosity: Verbosity) {
    if verbosity == Verbosity::Quiet {
        println!("{}", rows.len());
        return;
    }

    let nodes: Vec<&ConsolidatedRow> = rows.iter().collect();
    let name_width = name_width(&nodes);
    for row in rows {
        println!("{:<name_width$}  {}", row.title(), row.detail(verbosity));
    }
}
