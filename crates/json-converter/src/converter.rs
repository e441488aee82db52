//! [`ChainedConverter`]: validated stringify/parse with fallback to a parent.
//!
//! A converter handles a value when its validator accepts it, and hands it to its
//! parent otherwise. The walk ends at the first converter that accepts, or at the
//! root, which returns the input untouched as an `Unhandled` outcome.
//!
//! Hooks left unset (reviver, replacer, indent) are read from the parent chain at
//! call time.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::ConvertError;
use crate::hooks::{Indent, Replacer, Reviver, SourceValidator, Validator};
use crate::primitive;
use crate::value::Value;

/// Result of [`ChainedConverter::serialize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    /// A converter accepted the value and the primitive produced text.
    Text(String),
    /// A converter accepted the value but it has no JSON form at top level
    /// (undefined, an opaque host value, or a replacer that removed the root).
    Undefined,
    /// No converter in the chain accepted the value; it is returned as given.
    Unhandled(Value),
}

impl Serialized {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Serialized::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Serialized::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, Serialized::Unhandled(_))
    }
}

/// Result of [`ChainedConverter::deserialize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Deserialized {
    Value(Value),
    /// No converter in the chain accepted the source; it is returned as given.
    Unhandled(String),
}

impl Deserialized {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Deserialized::Value(v) => Some(v),
            Deserialized::Unhandled(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Deserialized::Value(v) => Some(v),
            Deserialized::Unhandled(_) => None,
        }
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, Deserialized::Unhandled(_))
    }
}

/// A JSON converter wrapping a validator, a source validator, an optional
/// reviver/replacer/indent and an optional parent to fall back on.
///
/// Converters are immutable once built. Parents are shared through [`Arc`], so
/// one parent can serve many children and a chain can be used from several
/// threads at once. A parent must exist before its child, so chains cannot
/// contain cycles.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use json_converter::{ChainedConverter, Indent, Serialized, Value};
///
/// let fallback = Arc::new(ChainedConverter::new());
/// let numbers_only = ChainedConverter::builder()
///     .validator(|v: &Value| matches!(v, Value::Number(_)))
///     .indent(Indent::Spaces(2))
///     .parent(fallback)
///     .build();
///
/// assert_eq!(numbers_only.serialize(Value::from(3)).unwrap(), Serialized::Text("3".into()));
/// // Not a number: the parent handles it.
/// assert_eq!(numbers_only.serialize(Value::Bool(true)).unwrap(), Serialized::Text("true".into()));
/// ```
#[derive(Clone)]
pub struct ChainedConverter {
    validator: Validator,
    source_validator: SourceValidator,
    reviver: Option<Reviver>,
    replacer: Option<Replacer>,
    indent: Option<Indent>,
    parent: Option<Arc<ChainedConverter>>,
}

impl Default for ChainedConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainedConverter {
    /// A root converter accepting every value and every valid JSON string.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// Default value validator: accepts everything.
    pub fn accept_all(_value: &Value) -> bool {
        true
    }

    /// Default source validator: accepts strings that parse as JSON.
    pub fn valid_json(source: &str) -> bool {
        primitive::is_valid_json(source)
    }

    /// Whether this converter's own validator accepts `value`. Parents are not consulted.
    pub fn accepts(&self, value: &Value) -> bool {
        (self.validator)(value)
    }

    /// Whether this converter's own source validator accepts `source`.
    pub fn accepts_source(&self, source: &str) -> bool {
        (self.source_validator)(source)
    }

    pub fn parent(&self) -> Option<&Arc<ChainedConverter>> {
        self.parent.as_ref()
    }

    /// Iterate from this converter up to the root.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of converters in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Effective reviver: own, else the nearest ancestor's.
    pub fn reviver(&self) -> Option<&Reviver> {
        self.chain().find_map(|c| c.reviver.as_ref())
    }

    /// Effective replacer: own, else the nearest ancestor's.
    pub fn replacer(&self) -> Option<&Replacer> {
        self.chain().find_map(|c| c.replacer.as_ref())
    }

    /// Effective indentation: own, else the nearest ancestor's.
    pub fn indent(&self) -> Option<&Indent> {
        self.chain().find_map(|c| c.indent.as_ref())
    }

    /// Serialize with the chain's own hooks. See [`serialize_with`](Self::serialize_with).
    pub fn serialize(&self, value: Value) -> Result<Serialized, ConvertError> {
        self.serialize_with(value, None, None)
    }

    /// Serialize `value` with the first converter in the chain whose validator
    /// accepts it.
    ///
    /// `replacer` and `indent`, when given, take precedence over the accepting
    /// converter's effective hooks; they travel unchanged along the chain.
    ///
    /// # Errors
    ///
    /// Errors of [`primitive::stringify`] are returned as-is. Once a converter has
    /// accepted the value its parents are not tried again.
    pub fn serialize_with(
        &self,
        value: Value,
        replacer: Option<&Replacer>,
        indent: Option<&Indent>,
    ) -> Result<Serialized, ConvertError> {
        for (depth, converter) in self.chain().enumerate() {
            if !converter.accepts(&value) {
                trace!(depth, "value rejected, delegating to parent");
                continue;
            }
            let replacer = replacer.or_else(|| converter.replacer());
            let indent = indent.or_else(|| converter.indent());
            let text = primitive::stringify(&value, replacer, indent)?;
            return Ok(text.map_or(Serialized::Undefined, Serialized::Text));
        }
        debug!(depth = self.depth(), "no converter in chain accepted value");
        Ok(Serialized::Unhandled(value))
    }

    /// Deserialize with the chain's own reviver. See [`deserialize_with`](Self::deserialize_with).
    pub fn deserialize(&self, source: &str) -> Result<Deserialized, ConvertError> {
        self.deserialize_with(source, None)
    }

    /// Parse `source` with the first converter in the chain whose source
    /// validator accepts it.
    ///
    /// An explicit `reviver` is used even if it is an identity transform and the
    /// chain defines its own.
    ///
    /// # Errors
    ///
    /// Errors of [`primitive::parse`] are returned as-is.
    pub fn deserialize_with(
        &self,
        source: &str,
        reviver: Option<&Reviver>,
    ) -> Result<Deserialized, ConvertError> {
        for (depth, converter) in self.chain().enumerate() {
            if !converter.accepts_source(source) {
                trace!(depth, "source rejected, delegating to parent");
                continue;
            }
            let reviver = reviver.or_else(|| converter.reviver());
            return primitive::parse(source, reviver).map(Deserialized::Value);
        }
        debug!(depth = self.depth(), "no converter in chain accepted source");
        Ok(Deserialized::Unhandled(source.to_string()))
    }
}

impl fmt::Debug for ChainedConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedConverter")
            .field("reviver", &self.reviver)
            .field("replacer", &self.replacer)
            .field("indent", &self.indent)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// Iterator over a converter and its ancestors, see [`ChainedConverter::chain`].
pub struct Chain<'a> {
    next: Option<&'a ChainedConverter>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a ChainedConverter;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// Builder for [`ChainedConverter`]. Every field is optional.
#[derive(Default)]
pub struct ConverterBuilder {
    validator: Option<Validator>,
    source_validator: Option<SourceValidator>,
    reviver: Option<Reviver>,
    replacer: Option<Replacer>,
    indent: Option<Indent>,
    parent: Option<Arc<ChainedConverter>>,
}

impl ConverterBuilder {
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn source_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.source_validator = Some(Arc::new(f));
        self
    }

    pub fn reviver(mut self, reviver: Reviver) -> Self {
        self.reviver = Some(reviver);
        self
    }

    pub fn replacer(mut self, replacer: Replacer) -> Self {
        self.replacer = Some(replacer);
        self
    }

    pub fn indent(mut self, indent: impl Into<Indent>) -> Self {
        self.indent = Some(indent.into());
        self
    }

    pub fn parent(mut self, parent: Arc<ChainedConverter>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> ChainedConverter {
        let validator: Validator = match self.validator {
            Some(f) => f,
            None => Arc::new(ChainedConverter::accept_all),
        };
        let source_validator: SourceValidator = match self.source_validator {
            Some(f) => f,
            None => Arc::new(ChainedConverter::valid_json),
        };
        ChainedConverter {
            validator,
            source_validator,
            reviver: self.reviver,
            replacer: self.replacer,
            indent: self.indent,
            parent: self.parent,
        }
    }
}
