//! The backend wraps list payloads in several ways. Each shape is named here
//! and normalized into a plain `Vec` before anything else looks at it.

use super::error::{Error, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_GROUP: &str = "Sin grupo";

const LEADER_NAME_KEYS: [&str; 6] = [
    "lider_grupo",
    "nombre_completo",
    "full_name",
    "nombre",
    "name",
    "lider",
];
const LEADER_GROUP_KEYS: [&str; 2] = ["grupo", "group"];

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Envelope<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Leaders { lideres: Vec<T> },
    Other(Value),
}

impl<T> Envelope<T> {
    pub fn into_rows(self) -> Vec<T> {
        match self {
            Envelope::Bare(rows)
            | Envelope::Data { data: rows }
            | Envelope::Leaders { lideres: rows } => rows,
            Envelope::Other(_) => vec![],
        }
    }
}

/// `{ success, total, data, message }`, the envelope of most endpoints.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub data: Option<Vec<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> Result<Vec<T>> {
        match self {
            ApiResponse {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            ApiResponse { message, .. } => Err(Error::InvalidResponse(
                message.unwrap_or_else(|| "unsuccessful response without data".into()),
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Leader {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "grupo")]
    pub group: String,
}

/// Value of the first key holding a non-empty string or a number. A blank
/// string still wins over later keys and yields `None`.
fn first_text(object: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(text) if !text.is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })?;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Lowercased with diacritics removed, so `Ángela` sorts next to `angela`.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn parse_leader(item: &Value) -> Option<Leader> {
    match item {
        Value::String(name) => {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Leader {
                name: name.into(),
                group: DEFAULT_GROUP.into(),
            })
        }
        Value::Object(object) => {
            let name = first_text(object, &LEADER_NAME_KEYS)?;
            let group =
                first_text(object, &LEADER_GROUP_KEYS).unwrap_or_else(|| DEFAULT_GROUP.into());
            Some(Leader { name, group })
        }
        _ => None,
    }
}

/// Normalizes the group-leader catalogue: any envelope, string or object
/// rows, duplicates removed case-insensitively, sorted by name.
pub fn parse_leaders(envelope: Envelope<Value>) -> Vec<Leader> {
    envelope
        .into_rows()
        .iter()
        .filter_map(parse_leader)
        .unique_by(|leader| format!("{}::{}", leader.name, leader.group).to_lowercase())
        .sorted_by(|a, b| {
            collation_key(&a.name)
                .cmp(&collation_key(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        })
        .collect()
}
