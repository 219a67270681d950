use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type NodeId = Uuid;
pub type EdgeId = Uuid;
pub type ChunkId = Uuid;
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A dynamic property value. Closed tagged sum per spec §9 "Dynamic property
/// bags" — string | integer | float | bool | timestamp | mapping | sequence.
///
/// Adjacently tagged rather than `#[serde(untagged)]`: a `Timestamp`
/// serializes to the same RFC3339 string shape as `Str`, so untagged
/// matching (which tries variants in declaration order) would deserialize
/// every `Timestamp` back as a `Str` and silently violate the round-trip
/// property (spec §8 property #8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(Timestamp),
    Sequence(Vec<PropertyValue>),
    Mapping(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// Direction of traversal relative to a node. Incident-edge queries and
/// pattern steps both use this (spec §4.2, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Semantic class of a relation type (spec §3). HIERARCHY/ASSOCIATION/etc
/// differ only in default traversal direction per design note §9; the
/// engine itself treats them as opaque tags consumed by planners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationSemantics {
    Hierarchy,
    Classification,
    Association,
    Attribution,
    Causality,
    Temporal,
    Reference,
}

impl fmt::Display for RelationSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationSemantics::Hierarchy => "hierarchy",
            RelationSemantics::Classification => "classification",
            RelationSemantics::Association => "association",
            RelationSemantics::Attribution => "attribution",
            RelationSemantics::Causality => "causality",
            RelationSemantics::Temporal => "temporal",
            RelationSemantics::Reference => "reference",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RelationSemantics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hierarchy" => Ok(RelationSemantics::Hierarchy),
            "classification" => Ok(RelationSemantics::Classification),
            "association" => Ok(RelationSemantics::Association),
            "attribution" => Ok(RelationSemantics::Attribution),
            "causality" => Ok(RelationSemantics::Causality),
            "temporal" => Ok(RelationSemantics::Temporal),
            "reference" => Ok(RelationSemantics::Reference),
            other => Err(format!("unknown relation semantics: {other}")),
        }
    }
}
