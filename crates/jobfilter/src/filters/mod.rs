pub mod compose;
pub mod engine;
pub mod facets;
pub mod keyset;
pub mod lifecycle;
pub mod params;
pub mod predicate;

pub use engine::{FamilyBinding, FilterEngine, RecordFamily, MAX_LIMIT};
pub use facets::{CountMapping, EMPTY};
pub use keyset::{Cursor, SortDirection};
pub use lifecycle::{LifecycleClassifier, UnknownStatePolicy};
pub use params::{clamp_limits, FilterParameters, ParamScope, RawParams, DEFAULT_LIMIT};
pub use predicate::{CmpOp, Column, Expr, Predicate, Value};
