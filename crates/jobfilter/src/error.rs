// crates/jobfilter/src/error.rs

/// Errors surfaced by the filter engine and its stores.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// An abstract operation was invoked on an engine with no record family
    /// bound. Programmer error; never recovered.
    #[error("not implemented: `{operation}` requires a bound record family")]
    NotImplemented { operation: &'static str },

    /// A request parameter could not be parsed.
    #[error("invalid value for `{key}`: {value:?}")]
    InvalidInput { key: &'static str, value: String },

    /// The `state` parameter is not one of the family's state names.
    #[error("unsupported state {state:?} (expected one of: {})", allowed.join(", "))]
    UnsupportedState {
        state: String,
        allowed: Vec<&'static str>,
    },

    /// Grouping was requested on a dataset that still carries a column
    /// projection.
    #[error("cannot group a projected dataset; unscope the projection first")]
    ProjectedGrouping,

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl FilterError {
    pub fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidInput {
            key,
            value: value.into(),
        }
    }

    /// True for errors caused by the request rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::UnsupportedState { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
