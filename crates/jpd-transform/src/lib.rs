//! Field mapping and template rendering for jpd-sync
//!
//! Pure functions from a source record (as a JSON view) to destination
//! values. No state beyond the custom-function cache, no I/O.
//!
//! Resolution strategies, highest priority first:
//!
//! - **function**: user-supplied function looked up by path
//! - **template**: `{{path.to[0].field | filter}}` placeholders
//! - **lookup**: static table keyed by the resolved field value
//! - **field**: direct access with select-field unwrapping

pub mod error;
pub mod filter;
pub mod function;
pub mod mapping;
pub mod template;
pub mod value;

pub use error::{Error, Result};
pub use filter::{Filter, slugify};
pub use function::{BuiltinFunctions, FunctionLoader, FunctionRegistry, TransformFn};
pub use mapping::{FieldMapping, MappingSpec, Strategy, Transformer, transform};
pub use value::{display_value, unwrap_value, value_to_strings};
