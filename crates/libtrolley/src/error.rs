// SPDX-License-Identifier: MIT OR Apache-2.0

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Multiplicity(String),

    #[error("data service error: {0}")]
    Upstream(String),

    #[error("failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

macro_rules! error_ctor {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $name(msg: impl Into<String>) -> Self {
                Self::$variant(msg.into())
            }
        )*
    };
}

impl Error {
    error_ctor!(
        validation => Validation,
        not_found => NotFound,
        multiplicity => Multiplicity,
        upstream => Upstream,
        config => Config,
        other => Other,
    );

    /// returns true for errors caused by the caller's input rather than the data.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// returns true when a referenced record could not be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
