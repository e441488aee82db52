//! Hook types a [`ChainedConverter`](crate::ChainedConverter) carries: predicates,
//! reviver, replacer and indentation.
//!
//! Every hook is reference counted and `Send + Sync`, so converters sharing a
//! parent share its hooks without copying them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Decides whether a converter's serialize path applies to a value.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Decides whether a converter's deserialize path applies to a source string.
pub type SourceValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Key/value transform shared by revivers and replacer functions.
pub type Transform = dyn Fn(&str, Value) -> Value + Send + Sync;

/// Parse-time transform, called bottom-up with each member key (array indices
/// as decimal strings) and the already revived value; the root is visited last
/// with the key `""`. Returning [`Value::Undefined`] removes the member.
#[derive(Clone)]
pub struct Reviver(Arc<Transform>);

impl Reviver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A reviver that returns every value unchanged.
    pub fn identity() -> Self {
        Self::new(|_, value| value)
    }

    pub fn call(&self, key: &str, value: Value) -> Value {
        (self.0)(key, value)
    }
}

impl fmt::Debug for Reviver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reviver(..)")
    }
}

/// Stringify-time transform or member filter.
#[derive(Clone)]
pub enum Replacer {
    /// Called top-down with the member key (`""` for the root) and the raw value
    /// before it is written. Returning [`Value::Undefined`] drops the member.
    Function(Arc<Transform>),
    /// Only the listed object members are written, in list order.
    /// Arrays are written in full.
    AllowList(Vec<String>),
}

impl Replacer {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        Replacer::Function(Arc::new(f))
    }

    /// Build an allow-list. Duplicate names keep their first position.
    pub fn allow<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: ToString,
    {
        let mut list: Vec<String> = Vec::new();
        for key in keys {
            let key = key.to_string();
            if !list.contains(&key) {
                list.push(key);
            }
        }
        Replacer::AllowList(list)
    }

    pub fn identity() -> Self {
        Self::function(|_, value| value)
    }
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacer::Function(_) => f.write_str("Replacer::Function(..)"),
            Replacer::AllowList(keys) => f.debug_tuple("Replacer::AllowList").field(keys).finish(),
        }
    }
}

/// Pretty-printing of stringified output.
///
/// Deserializes from either a number or a string, so it can sit in a settings file:
///
/// ```
/// use json_converter::Indent;
///
/// let spaces: Indent = serde_json::from_str("2").unwrap();
/// assert_eq!(spaces, Indent::Spaces(2));
/// let tab: Indent = serde_json::from_str("\"\\t\"").unwrap();
/// assert_eq!(tab, Indent::Padding("\t".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Indent {
    /// Number of spaces per level, capped at 10.
    Spaces(usize),
    /// Literal padding per level, truncated to 10 characters.
    Padding(String),
}

const MAX_INDENT: usize = 10;

impl Indent {
    /// The padding string actually written per nesting level.
    /// Empty means compact output.
    pub fn padding(&self) -> String {
        match self {
            Indent::Spaces(n) => " ".repeat((*n).min(MAX_INDENT)),
            Indent::Padding(s) => s.chars().take(MAX_INDENT).collect(),
        }
    }
}

impl From<usize> for Indent {
    fn from(n: usize) -> Self {
        Indent::Spaces(n)
    }
}

impl From<&str> for Indent {
    fn from(s: &str) -> Self {
        Indent::Padding(s.to_string())
    }
}
