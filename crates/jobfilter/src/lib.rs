pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod families;
pub mod filters;
pub mod jobs;
pub mod store;

pub use error::{FilterError, Result};
pub use filters::{FamilyBinding, FilterEngine, FilterParameters};
