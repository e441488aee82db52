//! Chainable JSON converters.
//!
//! A [`ChainedConverter`] wraps the JSON stringify/parse pair in [`primitive`]
//! with a validator per direction and optional reviver, replacer and indent
//! hooks. Converters link to a parent; input a converter rejects goes up the
//! chain, and unset hooks are inherited from it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use json_converter::{ChainedConverter, Deserialized, Replacer, Serialized, Value};
//!
//! // Root: accepts everything, hides "password" members.
//! let root = Arc::new(
//!     ChainedConverter::builder()
//!         .replacer(Replacer::function(|key, v| if key == "password" { Value::Undefined } else { v }))
//!         .build(),
//! );
//!
//! // Child: only handles objects, otherwise falls back to the root.
//! let objects = ChainedConverter::builder()
//!     .validator(|v: &Value| v.as_object().is_some())
//!     .parent(root)
//!     .build();
//!
//! let user = Value::object([("name", Value::from("ann")), ("password", Value::from("x"))]);
//! assert_eq!(objects.serialize(user).unwrap(), Serialized::Text(r#"{"name":"ann"}"#.into()));
//! assert_eq!(objects.deserialize("[1]").unwrap(), Deserialized::Value(Value::array([Value::from(1)])));
//! assert!(objects.deserialize("not json").unwrap().is_unhandled());
//! ```

pub mod converter;
pub mod error;
pub mod hooks;
pub mod primitive;
pub mod value;

pub use converter::{Chain, ChainedConverter, ConverterBuilder, Deserialized, Serialized};
pub use error::{ConvertError, Unrepresentable};
pub use hooks::{Indent, Replacer, Reviver, SourceValidator, Transform, Validator};
pub use value::{Object, Reference, Value};
