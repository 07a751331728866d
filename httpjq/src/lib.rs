//! A minimal, thread-safe jq-style query engine plus the JSON folding
//! helpers that let templates address fields nested inside stringified JSON
//! bodies.
//!
//! The query language supports field access (`.a.b`), indexing, string
//! concatenation, equality/boolean composition, `length`, identity, and
//! object construction — enough to express the URL/body/header templates
//! and the custom response-check predicates this crate's callers build on
//! top of it.

mod engine;
mod error;
mod json;

pub use engine::{parse_bool, parse_map_interface, parse_map_of_string_lists, parse_string, parse_value};
pub use error::Error;
pub use json::{contains, convert_json_strings_to_maps, is_json_string, json_string_to_map, struct_to_map};
