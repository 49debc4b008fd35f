//! Selector Language
//!
//! Parses textual queries such as `name=foo,tier!=db` into a [`Selector`]
//! predicate over string key/value pairs. The same language filters resources
//! by label and by projected field path (`DesiredState.Host=`).
//!
//! # Grammar
//!
//! A selector is a comma-separated list of terms, combined with logical AND:
//! - `key=value` (also `key==value`): the value under `key` equals `value`
//! - `key!=value`: the value under `key` differs from `value`
//! - `key`: `key` is present (label selectors only)
//! - `!key`: `key` is absent (label selectors only)
//!
//! A missing key reads as the empty string for `=` and `!=`, so `Host=`
//! matches resources without a host and `Host!=` matches the rest.
//!
//! # Example
//!
//! ```
//! use labels::{Selector, Set};
//!
//! let selector = Selector::parse("name=foo,tier!=db").unwrap();
//! let mut set = Set::new();
//! set.insert("name".to_string(), "foo".to_string());
//! assert!(selector.matches(&set));
//! ```

mod error;
mod selector;

pub use error::ParseError;
pub use selector::{Requirement, Selector};

use std::collections::{BTreeMap, HashMap};

/// Ordered key/value set, used for resource labels and projected fields.
pub type Set = BTreeMap<String, String>;

/// Read access to the key/value pairs a [`Selector`] is evaluated against.
pub trait Labels {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<&str>;
}

impl Labels for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }
}

impl Labels for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}
