//! The stringify/parse primitive pair every converter delegates to.
//!
//! Semantics follow ECMAScript `JSON.stringify` / `JSON.parse` (replacer,
//! allow-list, reviver, indentation); the text itself is written and read by
//! `serde_json`.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};

use crate::error::{ConvertError, Unrepresentable};
use crate::hooks::{Indent, Replacer, Reviver, Transform};
use crate::value::Value;

/// Integral numbers below this magnitude are written as `i64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Magnitudes in `[MIN_POSITIONAL, MAX_POSITIONAL)` are written without an exponent.
const MIN_POSITIONAL: f64 = 1e-6;
const MAX_POSITIONAL: f64 = 1e21;

/// Stringify `value`.
///
/// Returns `Ok(None)` when the root has no JSON form (undefined, an opaque
/// host value, an unbound reference, or a replacer that returned undefined).
///
/// # Errors
///
/// - `UnrepresentableValue(BigInt)` for any big integer that gets written
/// - `UnrepresentableValue(CircularReference)` when a reference is re-entered
///
/// # Example
///
/// ```
/// use json_converter::{primitive, Value};
///
/// let v = Value::array([Value::from(1), Value::Undefined, Value::from("x")]);
/// assert_eq!(primitive::stringify(&v, None, None).unwrap().as_deref(), Some(r#"[1,null,"x"]"#));
/// assert_eq!(primitive::stringify(&Value::Undefined, None, None).unwrap(), None);
/// ```
pub fn stringify(
    value: &Value,
    replacer: Option<&Replacer>,
    indent: Option<&Indent>,
) -> Result<Option<String>, ConvertError> {
    let mut writer = match replacer {
        Some(Replacer::Function(f)) => Writer::new(Some(f.as_ref()), None),
        Some(Replacer::AllowList(keys)) => Writer::new(None, Some(keys.as_slice())),
        None => Writer::new(None, None),
    };
    let json = match writer.property("", value)? {
        Some(json) => json,
        None => return Ok(None),
    };
    let padding = indent.map(Indent::padding).unwrap_or_default();
    encode(&json, &padding).map(Some)
}

/// Parse `text` as strict JSON, then run `reviver` over the result bottom-up.
///
/// # Errors
///
/// `MalformedSource` with the position reported by `serde_json`.
pub fn parse(text: &str, reviver: Option<&Reviver>) -> Result<Value, ConvertError> {
    let value = Value::from(read(text).map_err(ConvertError::malformed)?);
    Ok(match reviver {
        Some(reviver) => internalize("", value, reviver),
        None => value,
    })
}

/// True when `text` parses as JSON. The parse error itself is discarded.
pub fn is_valid_json(text: &str) -> bool {
    read(text).is_ok()
}

/// Shared by [`parse`] and [`is_valid_json`] so both accept the same inputs.
/// Nesting depth is unbounded; the stack grows on demand.
fn read(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = serde_json::Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn encode(json: &serde_json::Value, padding: &str) -> Result<String, ConvertError> {
    if padding.is_empty() {
        write_with(json, CompactFormatter)
    } else {
        write_with(json, PrettyFormatter::with_indent(padding.as_bytes()))
    }
}

fn write_with<F: Formatter>(json: &serde_json::Value, formatter: F) -> Result<String, ConvertError> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, HostNumbers(formatter));
    json.serialize(&mut ser).map_err(ConvertError::Encode)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Wraps a formatter so floats are written in ECMAScript Number-to-String form.
struct HostNumbers<F>(F);

impl<F: Formatter> Formatter for HostNumbers<F> {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(host_number(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

/// Finite `n` as ECMAScript prints it: shortest round-trip digits, positional
/// between 1e-6 and 1e21, otherwise `d.ddde+x` / `d.ddde-x`.
fn host_number(n: f64) -> String {
    let abs = n.abs();
    if abs == 0.0 {
        return "0".to_string();
    }
    if (MIN_POSITIONAL..MAX_POSITIONAL).contains(&abs) {
        // Display never uses an exponent and drops a zero fraction.
        return n.to_string();
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}

struct Writer<'r> {
    function: Option<&'r Transform>,
    allow: Option<&'r [String]>,
    /// Addresses of the references whose targets are being written.
    stack: Vec<*const ()>,
}

impl<'r> Writer<'r> {
    fn new(function: Option<&'r Transform>, allow: Option<&'r [String]>) -> Self {
        Self {
            function,
            allow,
            stack: Vec::new(),
        }
    }

    fn property(&mut self, key: &str, value: &Value) -> Result<Option<serde_json::Value>, ConvertError> {
        let replaced;
        let value = match self.function {
            Some(f) => {
                replaced = f(key, value.clone());
                &replaced
            }
            None => value,
        };
        let depth = self.stack.len();
        let result = self.write(key, value);
        self.stack.truncate(depth);
        result
    }

    fn write(&mut self, key: &str, value: &Value) -> Result<Option<serde_json::Value>, ConvertError> {
        let json = match value {
            Value::Undefined | Value::Opaque(_) => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number(*n),
            Value::BigInt(_) => {
                return Err(ConvertError::unrepresentable(Unrepresentable::BigInt, key));
            }
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Ref(r) => {
                if self.stack.contains(&r.addr()) {
                    return Err(ConvertError::unrepresentable(
                        Unrepresentable::CircularReference,
                        key,
                    ));
                }
                self.stack.push(r.addr());
                return match r.get() {
                    Some(target) => self.write(key, target),
                    None => Ok(None),
                };
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let json = self.property(&i.to_string(), item)?;
                    out.push(json.unwrap_or(serde_json::Value::Null));
                }
                serde_json::Value::Array(out)
            }
            Value::Object(obj) => {
                let mut out = serde_json::Map::new();
                match self.allow {
                    Some(keys) => {
                        for k in keys {
                            if let Some(member) = obj.get(k) {
                                if let Some(json) = self.property(k, member)? {
                                    out.insert(k.clone(), json);
                                }
                            }
                        }
                    }
                    None => {
                        for (k, member) in obj {
                            if let Some(json) = self.property(k, member)? {
                                out.insert(k.clone(), json);
                            }
                        }
                    }
                }
                serde_json::Value::Object(out)
            }
        };
        Ok(Some(json))
    }
}

fn number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        // Also folds -0 into 0.
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

fn internalize(key: &str, value: Value, reviver: &Reviver) -> Value {
    let value = match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| internalize(&i.to_string(), item, reviver))
                .collect(),
        ),
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .filter_map(|(k, member)| {
                    let member = internalize(&k, member, reviver);
                    (!member.is_undefined()).then_some((k, member))
                })
                .collect(),
        ),
        other => other,
    };
    reviver.call(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Reference;
    use std::sync::{Arc, Mutex};

    fn text(value: &Value) -> Option<String> {
        stringify(value, None, None).unwrap()
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(text(&Value::Bool(true)).as_deref(), Some("true"));
        assert_eq!(text(&Value::Null).as_deref(), Some("null"));
        assert_eq!(text(&Value::from(1.5)).as_deref(), Some("1.5"));
        assert_eq!(text(&Value::from(-1)).as_deref(), Some("-1"));
        assert_eq!(text(&Value::from(-0.0)).as_deref(), Some("0"));
        assert_eq!(text(&Value::from("Furball")).as_deref(), Some("\"Furball\""));
    }

    #[test]
    fn test_stringify_non_finite_numbers_as_null() {
        assert_eq!(text(&Value::from(f64::NAN)).as_deref(), Some("null"));
        assert_eq!(text(&Value::from(f64::INFINITY)).as_deref(), Some("null"));
        assert_eq!(text(&Value::from(f64::NEG_INFINITY)).as_deref(), Some("null"));
    }

    #[test]
    fn test_stringify_max_safe_integer() {
        assert_eq!(
            text(&Value::from(9_007_199_254_740_991.0)).as_deref(),
            Some("9007199254740991")
        );
    }

    #[test]
    fn test_stringify_large_integers_positionally() {
        assert_eq!(text(&Value::from(MAX_SAFE_INTEGER)).as_deref(), Some("9007199254740992"));
        assert_eq!(text(&Value::from(-MAX_SAFE_INTEGER)).as_deref(), Some("-9007199254740992"));
        assert_eq!(text(&Value::from(1e20)).as_deref(), Some("100000000000000000000"));
        assert_eq!(
            text(&Value::from(1.2345678901234568e20)).as_deref(),
            Some("123456789012345680000")
        );
    }

    #[test]
    fn test_stringify_exponent_form() {
        assert_eq!(text(&Value::from(1e21)).as_deref(), Some("1e+21"));
        assert_eq!(text(&Value::from(-2.5e22)).as_deref(), Some("-2.5e+22"));
        assert_eq!(text(&Value::from(1.5e-7)).as_deref(), Some("1.5e-7"));
        assert_eq!(text(&Value::from(0.000001)).as_deref(), Some("0.000001"));
        assert_eq!(text(&Value::from(0.1)).as_deref(), Some("0.1"));
    }

    #[test]
    fn test_host_numbers_inside_pretty_output() {
        let v = Value::array([Value::from(1e20), Value::from(1e21)]);
        assert_eq!(
            stringify(&v, None, Some(&Indent::Spaces(1))).unwrap().as_deref(),
            Some("[\n 100000000000000000000,\n 1e+21\n]")
        );
    }

    #[test]
    fn test_stringify_absent_values() {
        assert_eq!(text(&Value::Undefined), None);
        assert_eq!(text(&Value::opaque("toString")), None);
        assert_eq!(text(&Value::Ref(Reference::new())), None);

        let obj = Value::object([
            ("a", Value::Undefined),
            ("b", Value::opaque("fn")),
            ("c", Value::from(1)),
        ]);
        assert_eq!(text(&obj).as_deref(), Some(r#"{"c":1}"#));

        let arr = Value::array([Value::Undefined, Value::opaque("fn"), Value::Bool(false)]);
        assert_eq!(text(&arr).as_deref(), Some("[null,null,false]"));
    }

    #[test]
    fn test_stringify_bigint_fails_with_key() {
        let v = Value::object([("n", Value::BigInt(1))]);
        match stringify(&v, None, None) {
            Err(ConvertError::UnrepresentableValue { kind, key }) => {
                assert_eq!(kind, Unrepresentable::BigInt);
                assert_eq!(key, "n");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_stringify_detects_cycle() {
        let node = Reference::new();
        let obj = Value::object([("name", Value::from("loop")), ("me", Value::Ref(node.clone()))]);
        node.bind(obj).unwrap();

        match stringify(&Value::Ref(node), None, None) {
            Err(ConvertError::UnrepresentableValue { kind, key }) => {
                assert_eq!(kind, Unrepresentable::CircularReference);
                assert_eq!(key, "me");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_stringify_shared_reference_is_not_a_cycle() {
        let shared = Reference::to(Value::array([Value::from(1)]));
        let v = Value::object([
            ("x", Value::Ref(shared.clone())),
            ("y", Value::Ref(shared)),
        ]);
        assert_eq!(text(&v).as_deref(), Some(r#"{"x":[1],"y":[1]}"#));
    }

    #[test]
    fn test_replacer_can_break_cycle() {
        let node = Reference::new();
        node.bind(Value::object([("me", Value::Ref(node.clone()))])).unwrap();
        let replacer = Replacer::function(|key, value| {
            if key == "me" && matches!(value, Value::Ref(_)) {
                Value::from("[circular]")
            } else {
                value
            }
        });
        let out = stringify(&Value::Ref(node), Some(&replacer), None).unwrap();
        assert_eq!(out.as_deref(), Some(r#"{"me":"[circular]"}"#));
    }

    #[test]
    fn test_replacer_function_visits_root_first() {
        let keys = Arc::new(Mutex::new(Vec::new()));
        let seen = keys.clone();
        let replacer = Replacer::function(move |key, value| {
            seen.lock().unwrap().push(key.to_string());
            value
        });
        let v = Value::object([("a", Value::array([Value::from(1)])), ("b", Value::Null)]);
        stringify(&v, Some(&replacer), None).unwrap();
        assert_eq!(*keys.lock().unwrap(), vec!["", "a", "0", "b"]);
    }

    #[test]
    fn test_replacer_function_drops_members() {
        let replacer = Replacer::function(|key, value| if key == "secret" { Value::Undefined } else { value });
        let v = Value::object([("user", Value::from("ann")), ("secret", Value::from("hunter2"))]);
        assert_eq!(
            stringify(&v, Some(&replacer), None).unwrap().as_deref(),
            Some(r#"{"user":"ann"}"#)
        );
    }

    #[test]
    fn test_allow_list_uses_list_order_at_every_depth() {
        let v = Value::object([
            ("b", Value::from(1)),
            ("a", Value::object([("a", Value::from(2)), ("z", Value::from(3))])),
            ("c", Value::array([Value::object([("z", Value::Null), ("b", Value::Null)])])),
        ]);
        let replacer = Replacer::allow(["a", "b", "c"]);
        assert_eq!(
            stringify(&v, Some(&replacer), None).unwrap().as_deref(),
            Some(r#"{"a":{"a":2},"b":1,"c":[{"b":null}]}"#)
        );
    }

    #[test]
    fn test_indent() {
        let v = Value::object([("a", Value::array([Value::from(1), Value::array([])]))]);
        assert_eq!(
            stringify(&v, None, Some(&Indent::Spaces(2))).unwrap().as_deref(),
            Some("{\n  \"a\": [\n    1,\n    []\n  ]\n}")
        );
        assert_eq!(
            stringify(&v, None, Some(&Indent::from("\t"))).unwrap().as_deref(),
            Some("{\n\t\"a\": [\n\t\t1,\n\t\t[]\n\t]\n}")
        );
        assert_eq!(
            stringify(&v, None, Some(&Indent::Spaces(0))).unwrap().as_deref(),
            Some(r#"{"a":[1,[]]}"#)
        );
    }

    #[test]
    fn test_parse_plain() {
        let v = parse(r#" {"a": [1, 2.5, "x"], "b": null} "#, None).unwrap();
        assert_eq!(
            v,
            Value::object([
                ("a", Value::array([Value::from(1), Value::from(2.5), Value::from("x")])),
                ("b", Value::Null),
            ])
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse("{\"a\":", None).unwrap_err().is_malformed());
        assert!(parse("", None).unwrap_err().is_malformed());
        assert!(parse("true false", None).unwrap_err().is_malformed());
    }

    #[test]
    fn test_reviver_runs_bottom_up_root_last() {
        let keys = Arc::new(Mutex::new(Vec::new()));
        let seen = keys.clone();
        let reviver = Reviver::new(move |key, value| {
            seen.lock().unwrap().push(key.to_string());
            value
        });
        parse(r#"{"a":[1,2],"b":3}"#, Some(&reviver)).unwrap();
        assert_eq!(*keys.lock().unwrap(), vec!["0", "1", "a", "b", ""]);
    }

    #[test]
    fn test_reviver_removes_members_and_leaves_holes() {
        let reviver = Reviver::new(|_, value| match value {
            Value::Str(ref s) if s == "drop" => Value::Undefined,
            other => other,
        });
        let v = parse(r#"{"a":"drop","b":["drop",1]}"#, Some(&reviver)).unwrap();
        assert_eq!(
            v,
            Value::object([("b", Value::array([Value::Undefined, Value::from(1)]))])
        );
    }

    #[test]
    fn test_reviver_can_discard_root() {
        let reviver = Reviver::new(|key, value| if key.is_empty() { Value::Undefined } else { value });
        assert_eq!(parse("[1]", Some(&reviver)).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_is_valid_json() {
        assert!(is_valid_json("true"));
        assert!(is_valid_json(" [1, 2] "));
        assert!(!is_valid_json(""));
        assert!(!is_valid_json("{'a': 1}"));
        assert!(!is_valid_json("NaN"));
    }

    #[test]
    fn test_parse_beyond_default_nesting_limit() {
        let depth = 1000;
        let source = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        assert!(is_valid_json(&source));

        let mut v = parse(&source, None).unwrap();
        let mut levels = 1;
        while let Value::Array(mut items) = v {
            match items.pop() {
                Some(inner) => {
                    levels += 1;
                    v = inner;
                }
                None => break,
            }
        }
        assert_eq!(levels, depth);
    }

    #[test]
    fn test_deep_stringify_reads_back() {
        let mut v = Value::Null;
        for _ in 0..300 {
            v = Value::array([v]);
        }
        let out = text(&v).unwrap();
        assert!(is_valid_json(&out));
        assert_eq!(parse(&out, None).unwrap(), v);
    }

    #[test]
    fn test_deep_malformed_is_rejected() {
        let source = "[".repeat(500);
        assert!(!is_valid_json(&source));
        assert!(parse(&source, None).unwrap_err().is_malformed());
    }
}
