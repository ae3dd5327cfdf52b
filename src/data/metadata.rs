use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};
use super::layout::MetadataEntry;

// ---------------------------------------------------------------------------
// MetadataValue – a single metadata field, used as a query operand
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::String(_) => None,
        }
    }

    /// Equality used by metadata filters: numbers compare by value across
    /// integer/float, strings compare exactly.
    pub fn matches(&self, other: &MetadataValue) -> bool {
        match (self, other) {
            (MetadataValue::String(a), MetadataValue::String(b)) => a == b,
            (MetadataValue::Integer(a), MetadataValue::Integer(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Best-effort typing of a command-line operand.
    pub fn guess(s: &str) -> MetadataValue {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return MetadataValue::Float(f);
        }
        MetadataValue::String(s.to_string())
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

// ---------------------------------------------------------------------------
// Metadata – the decoded header block of one file
// ---------------------------------------------------------------------------

/// Identifiers, beam nuclei and type tags of one dataset. Fields whose key
/// never appeared in the file stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: Option<i64>,
    pub type_exp: Option<String>,
    pub type_theo: Option<String>,
    pub type_current: Option<String>,
    pub a1: Option<f64>,
    pub a2: Option<f64>,
    pub z1: Option<f64>,
    pub z2: Option<f64>,
    /// Kinematic variables spanning the grid, in file order.
    pub kin_var: Vec<String>,
}

type Decoder = fn(&mut Metadata, &str) -> DecodeResult;
type Accessor = fn(&Metadata) -> Option<MetadataValue>;

/// File key → decoder. Keys not listed here are ignored.
const DECODERS: &[(&str, Decoder)] = &[
    ("ID", decode_id),
    ("TypeExp", decode_type_exp),
    ("TypeTheo", decode_type_theo),
    ("TypeCurrent", decode_type_current),
    ("A1", decode_a1),
    ("A2", decode_a2),
    ("Z1", decode_z1),
    ("Z2", decode_z2),
    ("KinVar", decode_kin_var),
];

/// Queryable field name → accessor, as used by collection filters.
const FIELDS: &[(&str, Accessor)] = &[
    ("ID", get_id),
    ("Z1", get_z1),
    ("Z2", get_z2),
    ("A1", get_a1),
    ("A2", get_a2),
    ("TypeExp", get_type_exp),
    ("TypeTheo", get_type_theo),
    ("TypeCurrent", get_type_current),
];

type DecodeResult = std::result::Result<(), String>;

fn decode_id(m: &mut Metadata, v: &str) -> DecodeResult {
    parse_into(v, &mut m.id)
}
fn decode_a1(m: &mut Metadata, v: &str) -> DecodeResult {
    parse_into(v, &mut m.a1)
}
fn decode_a2(m: &mut Metadata, v: &str) -> DecodeResult {
    parse_into(v, &mut m.a2)
}
fn decode_z1(m: &mut Metadata, v: &str) -> DecodeResult {
    parse_into(v, &mut m.z1)
}
fn decode_z2(m: &mut Metadata, v: &str) -> DecodeResult {
    parse_into(v, &mut m.z2)
}
fn decode_type_exp(m: &mut Metadata, v: &str) -> DecodeResult {
    m.type_exp = Some(v.to_string());
    Ok(())
}
fn decode_type_theo(m: &mut Metadata, v: &str) -> DecodeResult {
    m.type_theo = Some(v.to_string());
    Ok(())
}
fn decode_type_current(m: &mut Metadata, v: &str) -> DecodeResult {
    m.type_current = Some(v.to_string());
    Ok(())
}
fn decode_kin_var(m: &mut Metadata, v: &str) -> DecodeResult {
    m.kin_var = parse_kin_var(v);
    Ok(())
}

fn get_id(m: &Metadata) -> Option<MetadataValue> {
    m.id.map(MetadataValue::Integer)
}
fn get_z1(m: &Metadata) -> Option<MetadataValue> {
    m.z1.map(MetadataValue::Float)
}
fn get_z2(m: &Metadata) -> Option<MetadataValue> {
    m.z2.map(MetadataValue::Float)
}
fn get_a1(m: &Metadata) -> Option<MetadataValue> {
    m.a1.map(MetadataValue::Float)
}
fn get_a2(m: &Metadata) -> Option<MetadataValue> {
    m.a2.map(MetadataValue::Float)
}
fn get_type_exp(m: &Metadata) -> Option<MetadataValue> {
    m.type_exp.clone().map(MetadataValue::String)
}
fn get_type_theo(m: &Metadata) -> Option<MetadataValue> {
    m.type_theo.clone().map(MetadataValue::String)
}
fn get_type_current(m: &Metadata) -> Option<MetadataValue> {
    m.type_current.clone().map(MetadataValue::String)
}

fn parse_into<T: std::str::FromStr>(v: &str, slot: &mut Option<T>) -> DecodeResult {
    let parsed = v.parse::<T>().map_err(|_| format!("'{v}' is not a valid number"))?;
    *slot = Some(parsed);
    Ok(())
}

/// `[a, b, c]` → `["a", "b", "c"]`. Order and duplicates are kept.
pub fn parse_kin_var(value: &str) -> Vec<String> {
    let value = value.trim();
    let value = value.strip_prefix('[').unwrap_or(value);
    let value = value.strip_suffix(']').unwrap_or(value);
    if value.trim().is_empty() {
        return Vec::new();
    }
    value
        .split(',')
        .map(|name| {
            let name = name.trim();
            let name = name.strip_prefix('[').unwrap_or(name);
            name.strip_suffix(']').unwrap_or(name).trim().to_string()
        })
        .collect()
}

impl Metadata {
    /// Decode the metadata block of a file.
    pub fn decode(entries: &[MetadataEntry]) -> Result<Self> {
        let mut meta = Metadata::default();
        for entry in entries {
            if let Some((_, decode)) = DECODERS.iter().find(|(key, _)| *key == entry.key) {
                decode(&mut meta, &entry.value).map_err(|reason| {
                    DataError::malformed(entry.line, format!("{}: {reason}", entry.key))
                })?;
            }
        }
        Ok(meta)
    }

    /// Names accepted by [`Metadata::field`].
    pub fn field_names() -> impl Iterator<Item = &'static str> {
        FIELDS.iter().map(|(name, _)| *name)
    }

    /// Look up a queryable field by its file key.
    ///
    /// Returns `Err(UnknownQueryKey)` for names outside [`Metadata::field_names`]
    /// and `Ok(None)` for a known field the file did not set.
    pub fn field(&self, name: &str) -> Result<Option<MetadataValue>> {
        FIELDS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, get)| get(self))
            .ok_or_else(|| DataError::UnknownQueryKey(name.to_string()))
    }
}
