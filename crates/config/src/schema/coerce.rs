//! A deserializer over `serde_json::Value` that coerces loosely typed input.
//!
//! Settings arrive from env vars, dotenv files and YAML, where everything may be a
//! string. When the target type asks for something else this deserializer converts:
//!
//! - strings to bools (`true/false/1/0/yes/no/on/off`), integers and floats;
//! - numbers and bools to strings;
//! - strings holding JSON to sequences and maps;
//! - `null` to `None`.
//!
//! Errors describe the kind of the offending input, never its contents.

use std::fmt;

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, Deserializer, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::Value;

/// Error produced while validating settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoerceError(String);

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CoerceError {}

fn kind<'a>(unexp: &Unexpected<'a>) -> &'a str {
    match unexp {
        Unexpected::Bool(_) => "boolean",
        Unexpected::Unsigned(_) | Unexpected::Signed(_) => "integer",
        Unexpected::Float(_) => "floating point number",
        Unexpected::Char(_) => "character",
        Unexpected::Str(_) => "string",
        Unexpected::Bytes(_) => "bytes",
        Unexpected::Unit => "null",
        Unexpected::Seq => "sequence",
        Unexpected::Map => "map",
        Unexpected::Other(other) => *other,
        _ => "value",
    }
}

impl de::Error for CoerceError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }

    fn invalid_type(unexp: Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        Self(format!("invalid type: {}, expected {exp}", kind(&unexp)))
    }

    fn invalid_value(unexp: Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        Self(format!("invalid value: {}, expected {exp}", kind(&unexp)))
    }

    fn unknown_variant(_variant: &str, expected: &'static [&'static str]) -> Self {
        Self(format!("unknown variant, expected one of {expected:?}"))
    }
}

/// Deserialize `T` from `value` with coercion.
pub fn from_value<T: de::DeserializeOwned>(value: Value) -> Result<T, CoerceError> {
    T::deserialize(Coerce(value))
}

/// Coercing wrapper around a JSON value.
pub struct Coerce(pub Value);

impl<'de> IntoDeserializer<'de, CoerceError> for Coerce {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn visit_integer_str<'de, V: Visitor<'de>>(s: &str, visitor: V) -> Result<V::Value, CoerceError> {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return visitor.visit_i64(i);
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return visitor.visit_u64(u);
    }
    Err(de::Error::invalid_type(Unexpected::Str(s), &visitor))
}

/// A string that holds a JSON array or object, parsed; anything else is returned unchanged.
fn json_container(s: String) -> Value {
    match serde_json::from_str::<Value>(&s) {
        Ok(parsed @ (Value::Array(_) | Value::Object(_))) => parsed,
        _ => Value::String(s),
    }
}

macro_rules! coerce_integer {
    ($de:lifetime; $($method:ident)*) => {$(
        fn $method<V: Visitor<$de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::String(s) => visit_integer_str(&s, visitor),
                other => Coerce(other).deserialize_any(visitor),
            }
        }
    )*};
}

macro_rules! coerce_float {
    ($de:lifetime; $($method:ident)*) => {$(
        fn $method<V: Visitor<$de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(f) => visitor.visit_f64(f),
                    Err(_) => Err(de::Error::invalid_type(Unexpected::Str(&s), &visitor)),
                },
                other => Coerce(other).deserialize_any(visitor),
            }
        }
    )*};
}

macro_rules! coerce_string {
    ($de:lifetime; $($method:ident)*) => {$(
        fn $method<V: Visitor<$de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::Number(n) => visitor.visit_string(n.to_string()),
                Value::Bool(b) => visitor.visit_string(b.to_string()),
                other => Coerce(other).deserialize_any(visitor),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Coerce {
    type Error = CoerceError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else {
                    visitor.visit_f64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => visitor.visit_string(s),
            Value::Array(items) => {
                let mut seq =
                    SeqDeserializer::<_, CoerceError>::new(items.into_iter().map(Coerce));
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Object(map) => {
                let mut access = MapDeserializer::<_, CoerceError>::new(
                    map.into_iter().map(|(k, v)| (k, Coerce(v))),
                );
                let value = visitor.visit_map(&mut access)?;
                access.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => match parse_bool(&s) {
                Some(b) => visitor.visit_bool(b),
                None => Err(de::Error::invalid_type(Unexpected::Str(&s), &visitor)),
            },
            Value::Number(n) if n.as_u64() == Some(0) => visitor.visit_bool(false),
            Value::Number(n) if n.as_u64() == Some(1) => visitor.visit_bool(true),
            other => Coerce(other).deserialize_any(visitor),
        }
    }

    coerce_integer! {
        'de;
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
    }

    coerce_float! { 'de; deserialize_f32 deserialize_f64 }

    coerce_string! { 'de; deserialize_char deserialize_str deserialize_string }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(Coerce(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => Coerce(json_container(s)).deserialize_any(visitor),
            other => Coerce(other).deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => Coerce(json_container(s)).deserialize_any(visitor),
            other => Coerce(other).deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            other => other
                .deserialize_enum(name, variants, visitor)
                .map_err(|e| CoerceError(e.to_string())),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            other => Coerce(other).deserialize_any(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! { bytes byte_buf identifier }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    enum Mode {
        #[serde(rename = "fast")]
        Fast,
        #[serde(rename = "slow")]
        Slow,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        port: u16,
        ratio: f64,
        enabled: bool,
        name: String,
        tags: Vec<String>,
        limits: BTreeMap<String, u32>,
        nickname: Option<String>,
        mode: Mode,
    }

    #[test]
    fn test_strings_coerce_to_target_types() {
        let value = json!({
            "port": "8080",
            "ratio": "0.5",
            "enabled": "yes",
            "name": 42,
            "tags": "[\"a\", \"b\"]",
            "limits": "{\"cpu\": 2}",
            "nickname": null,
            "mode": "fast",
        });
        let sample: Sample = from_value(value).unwrap();
        assert_eq!(
            sample,
            Sample {
                port: 8080,
                ratio: 0.5,
                enabled: true,
                name: "42".into(),
                tags: vec!["a".into(), "b".into()],
                limits: BTreeMap::from([("cpu".into(), 2)]),
                nickname: None,
                mode: Mode::Fast,
            }
        );
    }

    #[test]
    fn test_native_types_pass_through() {
        let value = json!({
            "port": 1,
            "ratio": 2,
            "enabled": false,
            "name": "n",
            "tags": ["x"],
            "limits": {},
            "nickname": "nick",
            "mode": "slow",
        });
        let sample: Sample = from_value(value).unwrap();
        assert_eq!(sample.ratio, 2.0);
        assert_eq!(sample.nickname.as_deref(), Some("nick"));
        assert_eq!(sample.mode, Mode::Slow);
    }

    #[test]
    fn test_errors_do_not_echo_values() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Port {
            port: u16,
        }
        let err = from_value::<Port>(json!({"port": "hunter2"})).unwrap_err();
        assert!(!err.to_string().contains("hunter2"));
        assert!(err.to_string().contains("string"));

        let err = from_value::<Port>(json!({})).unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_bool_spellings() {
        for (raw, expected) in [("TRUE", true), ("off", false), ("1", true), ("no", false)] {
            let b: bool = from_value(json!(raw)).unwrap();
            assert_eq!(b, expected, "{raw}");
        }
        assert!(from_value::<bool>(json!("maybe")).is_err());
    }
}
