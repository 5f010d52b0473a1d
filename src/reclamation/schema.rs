//! Shapes of reclamation records and validation of untrusted server payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A reclamation record as held by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reclamation {
    pub id: i64,
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload for creating a record; the server assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReclamation {
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One page of records plus the server-wide total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclamationList {
    pub reclamations: Vec<Reclamation>,
    pub total_items: u64,
}

impl ReclamationList {
    pub fn is_empty(&self) -> bool {
        self.reclamations.is_empty()
    }

    /// Replace the record with the same id, if present. Returns whether a
    /// record was replaced.
    pub fn replace(&mut self, updated: &Reclamation) -> bool {
        let mut replaced = false;
        for record in self.reclamations.iter_mut().filter(|r| r.id == updated.id) {
            *record = updated.clone();
            replaced = true;
        }
        replaced
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: i64) -> bool {
        self.reclamations.iter().any(|r| r.id == id)
    }
}

/// First violated field constraint in a server payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub expected: &'static str,
    pub found: &'static str,
}

impl ValidationError {
    fn new(path: impl Into<String>, expected: &'static str, value: Option<&Value>) -> Self {
        Self {
            path: path.into(),
            expected,
            found: kind_of(value),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

impl std::error::Error for ValidationError {}

fn kind_of(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn field_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn require_string(obj: &serde_json::Map<String, Value>, prefix: &str, field: &str) -> Result<String, ValidationError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(ValidationError::new(field_path(prefix, field), "string", other)),
    }
}

fn parse_record_at(value: &Value, prefix: &str) -> Result<Reclamation, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::new(if prefix.is_empty() { "$" } else { prefix }, "object", Some(value)))?;

    let id = match obj.get("id") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| ValidationError::new(field_path(prefix, "id"), "integer", obj.get("id")))?,
        other => return Err(ValidationError::new(field_path(prefix, "id"), "number", other)),
    };
    let name = require_string(obj, prefix, "name")?;
    let link = require_string(obj, prefix, "link")?;
    let description = match obj.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        other => return Err(ValidationError::new(field_path(prefix, "description"), "string or null", other)),
    };

    Ok(Reclamation {
        id,
        name,
        link,
        description,
    })
}

/// Validate a single record payload.
pub fn parse_reclamation(value: &Value) -> Result<Reclamation, ValidationError> {
    parse_record_at(value, "")
}

/// Validate a list body together with the raw `x-total-count` header value.
pub fn parse_reclamation_list(body: &Value, total_items: Option<&str>) -> Result<ReclamationList, ValidationError> {
    let items = body
        .as_array()
        .ok_or_else(|| ValidationError::new("reclamations", "array", Some(body)))?;

    let reclamations = items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_record_at(item, &format!("reclamations[{}]", index)))
        .collect::<Result<Vec<_>, _>>()?;

    let total_items = match total_items {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| ValidationError {
            path: "totalItems".to_string(),
            expected: "numeric string",
            found: "string",
        })?,
        None => {
            return Err(ValidationError {
                path: "totalItems".to_string(),
                expected: "numeric string",
                found: "nothing",
            })
        }
    };

    Ok(ReclamationList {
        reclamations,
        total_items,
    })
}
