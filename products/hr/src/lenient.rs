//! Deserializers for form-style payloads.
//!
//! Browser forms submit every value as a string: `"50000"` for a salary,
//! `"on"` for a checkbox, `""` for an unselected reference. These helpers
//! accept both the JSON-native value and its string rendering. An empty
//! string counts as absent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, de::Error};
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagOrText {
    Flag(bool),
    Text(String),
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(raw)) => match non_empty(raw) {
            None => Ok(None),
            Some(text) => text
                .parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("`{text}` is not a number"))),
        },
    }
}

pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlagOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlagOrText::Flag(value)) => Ok(Some(value)),
        Some(FlagOrText::Text(raw)) => match non_empty(raw) {
            None => Ok(None),
            Some(text) => match text.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" | "yes" => Ok(Some(true)),
                "false" | "off" | "0" | "no" => Ok(Some(false)),
                _ => Err(D::Error::custom(format!("`{text}` is not a boolean"))),
            },
        },
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)?.and_then(non_empty) else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(midnight.and_utc()))
        .ok_or_else(|| D::Error::custom(format!("`{text}` is not a date")))
}

fn parse_id<E: Error>(text: &str) -> Result<Uuid, E> {
    Uuid::parse_str(text).map_err(|_| E::custom(format!("`{text}` is not a valid id")))
}

/// Reference on create: `null`, `""` and absent all mean "none".
pub fn reference<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .and_then(non_empty)
        .map(|text| parse_id(&text))
        .transpose()
}

/// Reference on update: absent leaves the field alone (via `#[serde(default)]`),
/// `null` or `""` clears it.
pub fn reference_patch<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    reference(deserializer).map(Some)
}
