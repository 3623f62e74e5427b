//! Field descriptors: one declarative entry per tunable, resolved flag → env → default.

pub mod catalog;
pub mod field;
pub mod value;

pub use catalog::{MetaConfig, ENV_PREFIX};
pub use field::{Environment, MetaField, ProcessEnv, Source};
pub use value::{parse_bool, parse_int, parse_list, FieldKind, Value};
