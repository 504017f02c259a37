//! Request field validation
//!
//! Request bodies (JSON objects, url-encoded or multipart text fields) are
//! normalised into a [`Fields`] map, deserialized into a typed request
//! struct and checked with [`validator::Validate`]. Failures of either step
//! come back as per-field messages in [`FieldErrors`].
//!
//! Normalisation applied to every raw value before deserializing:
//! - strings are trimmed
//! - empty strings count as `null`
//!
//! Updatable fields are `Option<Option<T>>`: `None` when the key is absent,
//! `Some(None)` for an explicit null, `Some(Some(v))` for a value. The
//! [`de`] helpers produce that shape and accept numeric strings.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{Error, Result};

/// Raw request fields keyed by field name
pub type Fields = Map<String, Value>;

/// Per-field validation messages, serialized as `{field: [messages]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for a field (empty slice if none)
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Field must be present and non-null
    pub fn require<T>(&mut self, field: &str, value: &Option<Option<T>>) {
        if !matches!(value, Some(Some(_))) && !self.contains(field) {
            self.add(field, format!("The {} field is required.", field_label(field)));
        }
    }

    /// Field may be omitted, but when present it must not be null
    pub fn reject_null<T>(&mut self, field: &str, value: &Option<Option<T>>) {
        if matches!(value, Some(None)) && !self.contains(field) {
            self.add(field, format!("The {} field is required.", field_label(field)));
        }
    }

    /// `Ok(())` when no messages were recorded, `Error::Validation` otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let field: &str = &field;
            for error in field_errors.iter() {
                fields.add(field, describe(field, error));
            }
        }
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Human-readable field name used in messages (`total_pages` -> `total pages`)
pub fn field_label(key: &str) -> String {
    key.replace('_', " ")
}

/// Bound rendered the way users typed it: `5` rather than `5.0`
fn param_text(value: &Value) -> String {
    match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn param<'a>(error: &'a ValidationError, name: &str) -> Option<&'a Value> {
    error.params.get(name)
}

/// Message for one failed rule
fn describe(field: &str, error: &ValidationError) -> String {
    let label = field_label(field);
    let text = |name: &str| param(error, name).map(param_text).unwrap_or_default();

    match &*error.code {
        "required" => format!("The {} field is required.", label),
        "length" => match param(error, "max") {
            Some(max) => format!(
                "The {} field must not be greater than {} characters.",
                label,
                param_text(max)
            ),
            None => format!("The {} field must be at least {} characters.", label, text("min")),
        },
        "range" => {
            let value = param(error, "value").and_then(Value::as_f64);
            let min = param(error, "min").and_then(Value::as_f64);
            let below_min = match (value, min) {
                (Some(v), Some(m)) => v < m,
                (None, Some(_)) => param(error, "max").is_none(),
                _ => false,
            };
            if below_min {
                format!("The {} field must be at least {}.", label, text("min"))
            } else {
                format!("The {} field must not be greater than {}.", label, text("max"))
            }
        }
        "in" => format!("The {} field must be one of: {}.", label, text("values")),
        "format" => format!("The {} field format is invalid.", label),
        de::INTEGER => format!("The {} field must be an integer.", label),
        de::NUMBER => format!("The {} field must be a number.", label),
        de::DATE => format!("The {} field must be a valid date.", label),
        de::STRING => format!("The {} field must be a string.", label),
        _ => format!("The {} field is invalid.", label),
    }
}

/// Custom rule: value must be one of `allowed`
pub fn one_of(value: &str, allowed: &[&str]) -> std::result::Result<(), ValidationError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    let mut error = ValidationError::new("in");
    error.add_param(Cow::from("values"), &allowed.join(", "));
    Err(error)
}

/// Trim strings and turn blank ones into null
fn normalize(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) if s.trim().is_empty() => Value::Null,
                    Value::String(s) => Value::String(s.trim().to_string()),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect(),
    )
}

/// Deserialize and validate a request
///
/// A value of the wrong type stops deserialization and is reported alone.
/// Otherwise the rule failures are returned so callers can add their own
/// (required fields, upload checks) before calling
/// [`FieldErrors::into_result`].
pub fn read_request<T>(fields: &Fields) -> Result<(T, FieldErrors)>
where
    T: DeserializeOwned + Validate,
{
    let request: T = serde_path_to_error::deserialize(normalize(fields)).map_err(|e| {
        let field = e.path().to_string();
        let code = e.inner().to_string();
        let mut errors = FieldErrors::new();
        errors.add(&field, describe(&field, &ValidationError::new(type_code(&code))));
        Error::Validation(errors)
    })?;

    let errors = match request.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(&e),
    };
    Ok((request, errors))
}

fn type_code(message: &str) -> &'static str {
    match message {
        de::INTEGER => de::INTEGER,
        de::NUMBER => de::NUMBER,
        de::DATE => de::DATE,
        de::STRING => de::STRING,
        _ => "invalid",
    }
}

/// Apply an optional change to a nullable column
pub fn apply_nullable<T>(change: Option<Option<T>>, target: &mut Option<T>) {
    if let Some(value) = change {
        *target = value;
    }
}

/// `deserialize_with` helpers producing `Option<Option<T>>`
///
/// Use with `#[serde(default, deserialize_with = "...")]` so an absent
/// key stays `None`. Failures carry a short code that [`read_request`]
/// turns into a message.
pub mod de {
    use std::fmt::Display;
    use std::str::FromStr;

    use chrono::NaiveDate;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_with::{DeserializeAs, DisplayFromStr, PickFirst, Same};

    pub const INTEGER: &str = "integer";
    pub const NUMBER: &str = "number";
    pub const DATE: &str = "date";
    pub const STRING: &str = "string";

    /// JSON number or numeric string (multipart sends everything as text)
    fn lenient<'de, T, D>(
        deserializer: D,
        code: &'static str,
    ) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        <Option<PickFirst<(Same, DisplayFromStr)>> as DeserializeAs<'de, Option<T>>>::deserialize_as(
            deserializer,
        )
        .map(Some)
        .map_err(|_| D::Error::custom(code))
    }

    pub fn integer<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        lenient(deserializer, INTEGER)
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = lenient::<f64, D>(deserializer, NUMBER)?;
        if matches!(value, Some(Some(n)) if !n.is_finite()) {
            return Err(D::Error::custom(NUMBER));
        }
        Ok(value)
    }

    /// `YYYY-MM-DD`
    pub fn date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_with::rust::double_option::deserialize(deserializer)
            .map_err(|_: D::Error| D::Error::custom(DATE))
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_with::rust::double_option::deserialize(deserializer)
            .map_err(|_: D::Error| D::Error::custom(STRING))
    }
}
