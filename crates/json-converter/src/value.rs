//! [`Value`]: the in-memory value model the converters stringify and produce.
//!
//! Covers what a JSON primitive can be handed, not only what it can emit:
//! - JSON primitives (null, bool, numbers, strings, arrays, objects)
//! - `undefined` (also the "absent" marker returned by revivers and replacers)
//! - Big integers, which have no JSON representation
//! - Opaque host values (callables, symbols), silently dropped by stringify
//! - Late-bound shared references, the only way to build a cyclic graph

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

/// Ordered object storage. Member order is insertion order.
pub type Object = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `undefined`; never written as a member, `null` inside arrays.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    /// IEEE-754 double, like every JSON number once parsed.
    Number(f64),
    /// Arbitrary-size integer (two's complement). Stringify rejects it.
    BigInt(i128),
    Str(String),
    Array(Vec<Value>),
    Object(Object),
    /// Host value with no JSON form; carries a descriptive name only.
    Opaque(Arc<str>),
    /// Shared reference to another value, see [`Reference`].
    Ref(Reference),
}

impl Value {
    /// Build an object from key/value pairs, keeping their order.
    pub fn object<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(items.into_iter().collect())
    }

    pub fn opaque(name: &str) -> Self {
        Value::Opaque(Arc::from(name))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Member lookup on objects; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Ref(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            // Without arbitrary_precision every parsed number has an f64 view.
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// A write-once, shareable slot holding a [`Value`].
///
/// Clones share the slot. Binding a reference after it has been placed inside
/// its own target is how self-referential values are built:
///
/// ```
/// use json_converter::{Reference, Value};
///
/// let node = Reference::new();
/// let obj = Value::object([("self", Value::Ref(node.clone()))]);
/// node.bind(obj).unwrap();
/// assert!(node.get().is_some());
/// ```
///
/// Equality is identity: two references are equal only if they share a slot.
///
/// A reference bound to a value that contains it forms an `Arc` cycle and is
/// never freed. Slots cannot be unbound; build cyclic values for short-lived
/// or process-wide data only.
#[derive(Clone, Default)]
pub struct Reference(Arc<OnceLock<Value>>);

impl Reference {
    pub fn new() -> Self {
        Self(Arc::new(OnceLock::new()))
    }

    /// A reference already bound to `value`.
    pub fn to(value: Value) -> Self {
        let slot = OnceLock::new();
        let _ = slot.set(value);
        Self(Arc::new(slot))
    }

    /// Bind the target. Fails with the rejected value if already bound.
    pub fn bind(&self, value: Value) -> Result<(), Value> {
        self.0.set(value)
    }

    pub fn get(&self) -> Option<&Value> {
        self.0.get()
    }

    pub fn ptr_eq(&self, other: &Reference) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0).cast()
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Targets may point back at the reference; print identity only.
impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.0.get().is_some() { "bound" } else { "unbound" };
        write!(f, "Reference({:p}, {})", self.addr(), state)
    }
}
