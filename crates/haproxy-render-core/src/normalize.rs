//! Input boundary: polymorphic declaration values and their canonical forms.
//!
//! Every value that may arrive as a scalar, a list or a keyed table is
//! resolved here into an ordered representation. Downstream stages only ever
//! see [`BindEntry`], [`OptionEntry`], port strings and mapping pairs.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::bind::BindEntry;
use crate::error::{RenderError, RenderResult};
use crate::options::OptionEntry;
use crate::validate::require_single_line;

/// Key/value pairs in the order they were declared.
///
/// Deserializes from any map-shaped input by walking its entries as the
/// deserializer yields them, so a TOML table keeps its document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedPairs<V>(Vec<(String, V)>);

impl<V> OrderedPairs<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(existing, _)| existing == key)
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedPairs<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

impl<K: Into<String>, V> From<Vec<(K, V)>> for OrderedPairs<V> {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'de, V> Deserialize<'de> for OrderedPairs<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PairsVisitor<V>(PhantomData<V>);

        impl<'de, V> Visitor<'de> for PairsVisitor<V>
        where
            V: Deserialize<'de>,
        {
            type Value = OrderedPairs<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of key/value pairs")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    pairs.push((key, value));
                }
                Ok(OrderedPairs(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor(PhantomData))
    }
}

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

/// Tokens following a bind address: a list, or one string kept whole.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum BindValue {
    Tokens(Vec<String>),
    Token(String),
}

pub type BindInput = OrderedPairs<BindValue>;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionScalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for OptionScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionScalar::Text(text) => f.write_str(text),
            OptionScalar::Integer(value) => write!(f, "{value}"),
            OptionScalar::Float(value) => write!(f, "{value}"),
            OptionScalar::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for OptionScalar {
    fn from(value: &str) -> Self {
        OptionScalar::Text(value.to_string())
    }
}

/// Option value: one line, or one line per list element.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    One(OptionScalar),
    Many(Vec<OptionScalar>),
}

impl OptionValue {
    fn lines(&self) -> Vec<String> {
        match self {
            OptionValue::One(value) => vec![value.to_string()],
            OptionValue::Many(values) => values.iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::One(value.into())
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(values: Vec<&str>) -> Self {
        OptionValue::Many(values.into_iter().map(OptionScalar::from).collect())
    }
}

/// Section options, either as one table or as an explicitly ordered list.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionsInput {
    Mapping(OrderedPairs<OptionValue>),
    List(Vec<OrderedPairs<OptionValue>>),
}

impl OptionsInput {
    pub fn contains_key(&self, key: &str) -> bool {
        match self {
            OptionsInput::Mapping(pairs) => pairs.contains_key(key),
            OptionsInput::List(items) => items.iter().any(|pairs| pairs.contains_key(key)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum PortItem {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum PortsInput {
    Number(i64),
    Text(String),
    List(Vec<PortItem>),
}

/// One map-file line: `{ key = "value" }` or a literal `"key value"`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum MappingItem {
    Line(String),
    Pairs(OrderedPairs<String>),
}

pub fn normalize_bind(input: &BindInput) -> RenderResult<Vec<BindEntry>> {
    input
        .iter()
        .map(|(address, value)| {
            let tokens = match value {
                BindValue::Tokens(tokens) => tokens.clone(),
                BindValue::Token(token) => vec![token.clone()],
            };
            require_single_line("bind address", address)?;
            for token in &tokens {
                require_single_line("bind token", token)?;
            }
            Ok(BindEntry::new(address, tokens))
        })
        .collect()
}

pub fn normalize_options(
    input: &OptionsInput,
    sort_alphabetic: bool,
) -> RenderResult<Vec<OptionEntry>> {
    match input {
        OptionsInput::Mapping(pairs) => {
            let mut entries = entries_from_pairs(pairs)?;
            if sort_alphabetic {
                entries.sort_by(|a, b| a.key.cmp(&b.key));
            }
            Ok(entries)
        }
        // An explicit list is already an ordering decision; only keys sharing
        // one list element are put in ascending order.
        OptionsInput::List(items) => {
            let mut entries = Vec::new();
            for pairs in items {
                let mut group = entries_from_pairs(pairs)?;
                group.sort_by(|a, b| a.key.cmp(&b.key));
                entries.extend(group);
            }
            Ok(entries)
        }
    }
}

fn entries_from_pairs(pairs: &OrderedPairs<OptionValue>) -> RenderResult<Vec<OptionEntry>> {
    pairs
        .iter()
        .map(|(key, value)| {
            require_single_line("option key", key)?;
            let values = value.lines();
            for line in &values {
                require_single_line("option value", line)?;
            }
            Ok(OptionEntry::new(key, values))
        })
        .collect()
}

pub fn normalize_ports(input: &PortsInput) -> RenderResult<Vec<String>> {
    match input {
        PortsInput::Number(number) => Ok(vec![number.to_string()]),
        PortsInput::Text(text) => split_port_list(text),
        PortsInput::List(items) => items
            .iter()
            .map(|item| match item {
                PortItem::Number(number) => Ok(number.to_string()),
                PortItem::Text(text) if is_digits(text) => Ok(text.clone()),
                PortItem::Text(text) => Err(RenderError::invalid_argument(format!(
                    "ports list element '{text}' must contain digits only"
                ))),
            })
            .collect(),
    }
}

fn split_port_list(text: &str) -> RenderResult<Vec<String>> {
    let segments: Vec<&str> = text.split(',').collect();
    if segments.iter().all(|segment| is_digits(segment)) {
        Ok(segments.into_iter().map(str::to_string).collect())
    } else {
        Err(RenderError::invalid_argument(format!(
            "ports value '{text}' must be digits separated by commas"
        )))
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn normalize_mappings(items: &[MappingItem]) -> RenderResult<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(items.len());
    for item in items {
        match item {
            MappingItem::Line(line) => pairs.push(split_mapping_line(line)?),
            MappingItem::Pairs(entries) => {
                for (key, value) in entries.iter() {
                    pairs.push(check_mapping(key, value)?);
                }
            }
        }
    }
    Ok(pairs)
}

/// A map line is split back on its first whitespace, so keys are single words.
fn check_mapping(key: &str, value: &str) -> RenderResult<(String, String)> {
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(RenderError::invalid_argument(format!(
            "mapping key {key:?} must be a single non-empty word"
        )));
    }
    require_single_line("mapping value", value)?;
    Ok((key.to_string(), value.to_string()))
}

/// Splits `"key value"` on the first run of whitespace.
pub fn split_mapping_line(line: &str) -> RenderResult<(String, String)> {
    let trimmed = line.trim();
    let Some(split_at) = trimmed.find(char::is_whitespace) else {
        return Err(RenderError::invalid_argument(format!(
            "mapping '{line}' has no value"
        )));
    };
    let key = &trimmed[..split_at];
    let value = trimmed[split_at..].trim_start();
    check_mapping(key, value)
}

pub fn normalize_addresses(input: &OneOrMany<String>) -> Vec<String> {
    input.to_vec()
}
