//! Types shared across TDX ticket models.
//!
//! TDX serializes dates inconsistently (with or without an offset), so every
//! date field goes through [`deserialize_tdx_date`]. Other scalar fields use
//! the `deserialize_lenient_*` readers: TDX sends some enum fields as integers
//! and some IDs as strings, and a mistyped field must not lose the record.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person attached to a ticket as a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    /// The person's UID.
    #[serde(rename = "UID")]
    pub uid: String,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub full_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub primary_email: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_active: Option<bool>,
}

impl Contact {
    /// Returns the full name if present, otherwise the UID.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.uid)
    }
}

/// An attachment stored on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    /// Attachment GUID.
    #[serde(rename = "ID", default, deserialize_with = "deserialize_lenient_string")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: Option<String>,

    /// Size in bytes.
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub size: Option<i64>,

    #[serde(rename = "ItemID", default, deserialize_with = "deserialize_lenient_i64")]
    pub item_id: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_uid: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_full_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub created_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub uri: Option<String>,

    /// Download location for the file body.
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub content_uri: Option<String>,
}

/// Parses a TDX date string.
///
/// Accepts RFC 3339 (any offset, converted to UTC) or a naive ISO timestamp,
/// which is taken as UTC. Returns `None` for anything else.
pub fn parse_tdx_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Deserializes an optional date without ever failing the enclosing record.
///
/// Strings go through [`parse_tdx_date`]; null, numbers, booleans, arrays and
/// objects all become `None`.
pub(crate) fn deserialize_tdx_date<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};

    struct TolerantDateVisitor;

    impl<'de> Visitor<'de> for TolerantDateVisitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a date string or null")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(TolerantDateVisitor)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(parse_tdx_date(value))
        }

        fn visit_bool<E>(self, _value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_i64<E>(self, _value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_u64<E>(self, _value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_f64<E>(self, _value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_option(TolerantDateVisitor)
}

/// A JSON scalar as TDX sent it, before coercion to the field's type.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Text(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
}

/// Reads any JSON value, keeping scalars and discarding null, arrays and
/// objects.
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};

    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = Option<Scalar>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("null, a string, a number or a boolean")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(ScalarVisitor)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Scalar::Text(value.to_string())))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Scalar::Text(value)))
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Scalar::Bool(value)))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Scalar::Int(value)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Scalar::Uint(value)))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Scalar::Float(value)))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_option(ScalarVisitor)
}

/// Deserializes an optional string; numbers and booleans become their text.
pub(crate) fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_scalar(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Int(n) => n.to_string(),
        Scalar::Uint(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

/// Deserializes an optional integer; numeric strings are parsed and
/// whole-valued floats accepted. Anything else is `None`.
pub(crate) fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_scalar(deserializer)?.and_then(|scalar| match scalar {
        Scalar::Int(n) => Some(n),
        Scalar::Uint(n) => i64::try_from(n).ok(),
        Scalar::Float(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(n as i64),
        Scalar::Text(text) => text.trim().parse().ok(),
        _ => None,
    }))
}

/// Deserializes an optional float; numeric strings are parsed.
pub(crate) fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_scalar(deserializer)?.and_then(|scalar| match scalar {
        Scalar::Float(n) => Some(n),
        Scalar::Int(n) => Some(n as f64),
        Scalar::Uint(n) => Some(n as f64),
        Scalar::Text(text) => text.trim().parse().ok(),
        Scalar::Bool(_) => None,
    }))
}

/// Deserializes an optional list. A list that does not fit `T`, or any
/// non-list value, becomes `None`.
pub(crate) fn deserialize_lenient_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(value @ serde_json::Value::Array(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Deserializes an optional boolean; `"true"`/`"false"` strings are accepted.
pub(crate) fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_scalar(deserializer)?.and_then(|scalar| match scalar {
        Scalar::Bool(b) => Some(b),
        Scalar::Text(text) => text.trim().to_ascii_lowercase().parse().ok(),
        _ => None,
    }))
}
