use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// In-progress answers keyed by question id.
pub type ResponseMap = BTreeMap<String, Response>;

/// A single answer. Text, numeric and single-choice answers are all text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Response {
    Text(String),
    Choices(Vec<String>),
    File(FileHandle),
    /// Any other JSON shape found in cached or stored responses.
    Raw(Value),
}

impl Response {
    pub fn text(value: impl Into<String>) -> Self {
        Response::Text(value.into())
    }

    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Response::Choices(values.into_iter().map(Into::into).collect())
    }

    /// Empty string, empty list, null or empty array.
    pub fn is_empty(&self) -> bool {
        match self {
            Response::Text(text) => text.is_empty(),
            Response::Choices(values) => values.is_empty(),
            Response::File(_) => false,
            Response::Raw(Value::Null) => true,
            Response::Raw(Value::Array(values)) => values.is_empty(),
            Response::Raw(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Response::File(file) => Some(file),
            _ => None,
        }
    }

    /// Numeric coercion with script `Number` rules: empty text and empty lists are 0,
    /// a one-element list coerces its element, anything else non-numeric is NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            Response::Text(text) => coerce_number(text),
            Response::Choices(values) => match values.as_slice() {
                [] => 0.0,
                [single] => coerce_number(single),
                _ => f64::NAN,
            },
            Response::File(_) => f64::NAN,
            Response::Raw(value) => value_number(value),
        }
    }

    /// Loose equality against a condition value: only text answers can match.
    pub fn equals_text(&self, value: &str) -> bool {
        self.as_text() == Some(value)
    }

    pub fn display(&self) -> String {
        match self {
            Response::Text(text) => text.clone(),
            Response::Choices(values) => values.join(", "),
            Response::File(file) => format!("{} ({} bytes)", file.name, file.size),
            Response::Raw(value) => value.to_string(),
        }
    }
}

fn value_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => coerce_number(text),
        Value::Array(values) => match values.as_slice() {
            [] => 0.0,
            [single] if !single.is_array() && !single.is_object() => value_number_text(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

// Array elements coerce through their string form, so `[null]` is 0 and `[true]` is NaN.
fn value_number_text(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::String(text) => coerce_number(text),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Converts text the way a script `Number()` call does.
///
/// Surrounding whitespace is ignored and blank text is 0. Accepts decimal literals with an
/// optional sign and exponent, unsigned `0x`/`0o`/`0b` integers, and `Infinity` with an
/// optional sign. Everything else is NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'+' => (1.0, &trimmed[1..]),
        b'-' => (-1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if let Some(value) = radix_integer(trimmed) {
        return value;
    }
    let decimal = unsigned.bytes().any(|byte| byte.is_ascii_digit())
        && unsigned
            .bytes()
            .all(|byte| byte.is_ascii_digit() || matches!(byte, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !decimal {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// `0x1F`, `0o17`, `0b101`; a sign is not allowed in front of a prefix.
fn radix_integer(text: &str) -> Option<f64> {
    let radix = match text.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() {
        return Some(f64::NAN);
    }
    let mut value = 0.0_f64;
    for ch in digits.chars() {
        match ch.to_digit(radix) {
            Some(digit) => value = value * f64::from(radix) + f64::from(digit),
            None => return Some(f64::NAN),
        }
    }
    Some(value)
}

/// Uploaded file metadata. `path` is only set for local files awaiting upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: None,
            path: None,
        }
    }

    /// Reads name and size from a file on disk.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        Ok(Self {
            name,
            size: metadata.len(),
            mime_type: None,
            path: Some(path.to_path_buf()),
        })
    }

    /// Lowercased text after the last `.`; the whole name when there is no dot.
    pub fn extension(&self) -> String {
        self.name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Validation error metadata reported for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub question_id: String,
    pub message: String,
    pub code: String,
}

/// Failures keyed by question id.
pub type ValidationErrors = BTreeMap<String, ValidationError>;

/// Result returned from [`crate::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: ValidationErrors,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untagged_shapes_round_into_variants() {
        let map: ResponseMap = serde_json::from_value(json!({
            "a": "yes",
            "b": ["x", "y"],
            "c": { "name": "cv.PDF", "size": 1024 },
            "d": 4,
            "e": null
        }))
        .expect("deserialize");
        assert_eq!(map["a"], Response::text("yes"));
        assert_eq!(map["b"], Response::choices(["x", "y"]));
        assert_eq!(map["c"].as_file().map(FileHandle::extension), Some("pdf".into()));
        assert_eq!(map["d"].as_number(), 4.0);
        assert!(map["e"].is_empty());
    }

    #[test]
    fn coercion_follows_number_conversion() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("  "), 0.0);
        assert_eq!(coerce_number(" 2.5 "), 2.5);
        assert_eq!(coerce_number("-.5e1"), -5.0);
        assert_eq!(coerce_number("0x10"), 16.0);
        assert_eq!(coerce_number("0b101"), 5.0);
        assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(coerce_number("+Infinity"), f64::INFINITY);
        for rejected in ["abc", "nan", "NaN", "INFINITY", "inf", "-0x10", "0x", "0xg", "1e", "1 2"] {
            assert!(coerce_number(rejected).is_nan(), "{rejected}");
        }
    }

    #[test]
    fn lists_and_raw_values_coerce_like_scripts() {
        assert_eq!(Response::choices(Vec::<String>::new()).as_number(), 0.0);
        assert_eq!(Response::choices(["3"]).as_number(), 3.0);
        assert!(Response::choices(["1", "2"]).as_number().is_nan());
        assert_eq!(Response::Raw(Value::Null).as_number(), 0.0);
        assert_eq!(Response::Raw(json!(true)).as_number(), 1.0);
        assert_eq!(Response::Raw(json!([null])).as_number(), 0.0);
        assert!(Response::Raw(json!([true])).as_number().is_nan());
        assert!(Response::Raw(json!({ "a": 1 })).as_number().is_nan());
        assert!(Response::File(FileHandle::new("a.pdf", 1)).as_number().is_nan());
    }

    #[test]
    fn extension_without_dot_is_whole_name() {
        assert_eq!(FileHandle::new("README", 10).extension(), "readme");
        assert_eq!(FileHandle::new("a.tar.GZ", 10).extension(), "gz");
    }
}
