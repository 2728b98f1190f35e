// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ConnectionArgs, Error, PagePolicy, Result};

/// `limit`/`skip` window derived from connection arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: usize,
    pub skip: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// parses a positional cursor (1-based row number rendered as text).
/// surrounding whitespace is ignored; trailing garbage such as `7abc` is not.
pub fn parse_cursor(cursor: &str) -> Result<usize> {
    cursor
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::validation(format!("Provided cursor is invalid: {cursor}")))
}

/// computes the window for `args` over a collection of `total_count` rows.
///
/// cursors are plain row positions: the store only understands
/// `limit`/`skip`, so forward and backward paging are mapped onto them.
pub fn paginate(args: &ConnectionArgs, total_count: usize, policy: &PagePolicy) -> Result<PageWindow> {
    args.validate()?;

    let clamp = |size: Option<usize>| {
        size.filter(|&n| n > 0)
            .unwrap_or(policy.default_page_size)
            .min(policy.maximum_page_size)
    };

    let (limit, skip) = if args.backward_requested() {
        let last = clamp(args.last);
        let skip = match args.before.as_deref() {
            Some(before) => parse_cursor(before)?.saturating_sub(last),
            None => 0,
        };
        (last, skip)
    } else {
        let first = clamp(args.first);
        let skip = match args.after.as_deref() {
            Some(after) => parse_cursor(after)?,
            None => 0,
        };
        (first, skip)
    };

    Ok(PageWindow {
        limit,
        skip,
        has_next_page: skip.saturating_add(limit) < total_count,
        has_previous_page: skip != 0,
    })
}
