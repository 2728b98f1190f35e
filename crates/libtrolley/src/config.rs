// SPDX-License-Identifier: MIT OR Apache-2.0

/// page size used when a connection request names no page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// upper bound applied to `first`/`last`.
pub const MAXIMUM_PAGE_SIZE: usize = 1000;
/// number of records written concurrently by the bulk updater.
pub const DEFAULT_BULK_CHUNK_SIZE: usize = 100;

/// verbosity level for operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}

/// default and maximum page sizes for connection pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    pub default_page_size: usize,
    pub maximum_page_size: usize,
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            maximum_page_size: MAXIMUM_PAGE_SIZE,
        }
    }
}

/// configuration for trolley operations.
///
/// library consumers construct this directly; the cli layers a toml file
/// on top of it.
#[derive(Debug, Clone)]
pub struct Config {
    /// page sizes applied to every connection query.
    pub page_policy: PagePolicy,

    /// how many shopping-list rows are updated concurrently by bulk removals.
    pub bulk_chunk_size: usize,

    /// verbosity level for output.
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_policy: PagePolicy::default(),
            bulk_chunk_size: DEFAULT_BULK_CHUNK_SIZE,
            verbosity: Verbosity::default(),
        }
    }
}

impl Config {
    /// creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_policy(mut self, default_page_size: usize, maximum_page_size: usize) -> Self {
        self.page_policy = PagePolicy {
            default_page_size,
            maximum_page_size,
        };
        self
    }

    pub fn with_bulk_chunk_size(mut self, chunk_size: usize) -> Self {
        self.bulk_chunk_size = chunk_size;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}
