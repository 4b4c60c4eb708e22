use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::condition::Condition;

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    ShortText,
    LongText,
    Numeric,
    FileUpload,
    /// A type label written by a newer version; rendered as nothing.
    #[serde(other)]
    Unsupported,
}

impl QuestionType {
    /// Every type a builder can create, in menu order.
    pub const ALL: [QuestionType; 6] = [
        QuestionType::SingleChoice,
        QuestionType::MultiChoice,
        QuestionType::ShortText,
        QuestionType::LongText,
        QuestionType::Numeric,
        QuestionType::FileUpload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::ShortText => "short_text",
            QuestionType::LongText => "long_text",
            QuestionType::Numeric => "numeric",
            QuestionType::FileUpload => "file_upload",
            QuestionType::Unsupported => "unsupported",
        }
    }

    /// Menu label, e.g. `Single Choice`.
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "Single Choice",
            QuestionType::MultiChoice => "Multi Choice",
            QuestionType::ShortText => "Short Text",
            QuestionType::LongText => "Long Text",
            QuestionType::Numeric => "Numeric",
            QuestionType::FileUpload => "File Upload",
            QuestionType::Unsupported => "Unsupported",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "single_choice" | "single" | "radio" => Ok(QuestionType::SingleChoice),
            "multi_choice" | "multi" | "checkbox" => Ok(QuestionType::MultiChoice),
            "short_text" | "short" | "text" => Ok(QuestionType::ShortText),
            "long_text" | "long" | "textarea" => Ok(QuestionType::LongText),
            "numeric" | "number" => Ok(QuestionType::Numeric),
            "file_upload" | "file" => Ok(QuestionType::FileUpload),
            _ => Err(format!("unknown question type '{}'", value)),
        }
    }
}

/// Type-dependent validation parameters, stored flat on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<BTreeSet<String>>,
}

impl ValidationRules {
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn max_length(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::default()
        }
    }

    pub fn file<I, S>(max_size: Option<f64>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = normalize_extensions(extensions);
        Self {
            max_size,
            allowed_extensions: (!allowed.is_empty()).then_some(allowed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Lowercases, trims and strips a leading dot; blank entries are dropped.
pub fn normalize_extensions<I, S>(extensions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| {
            ext.as_ref()
                .trim()
                .trim_start_matches('.')
                .to_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Typed view over a question's parameters, one arm per question type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rules<'a> {
    Choice {
        options: &'a [String],
        multiple: bool,
    },
    Text {
        max_length: Option<usize>,
        multiline: bool,
    },
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
    },
    File {
        max_size_mb: Option<f64>,
        allowed_extensions: Option<&'a BTreeSet<String>>,
    },
    Unsupported,
}

/// Definition of a single question inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

pub const DEFAULT_QUESTION_TEXT: &str = "New Question";

impl QuestionSpec {
    /// Fresh question of the given type with builder defaults.
    pub fn new(kind: QuestionType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            text: DEFAULT_QUESTION_TEXT.into(),
            required: false,
            options: Vec::new(),
            validation: ValidationRules::default(),
            conditions: Vec::new(),
        }
    }

    pub fn rules(&self) -> Rules<'_> {
        match self.kind {
            QuestionType::SingleChoice => Rules::Choice {
                options: &self.options,
                multiple: false,
            },
            QuestionType::MultiChoice => Rules::Choice {
                options: &self.options,
                multiple: true,
            },
            QuestionType::ShortText => Rules::Text {
                max_length: self.validation.max_length,
                multiline: false,
            },
            QuestionType::LongText => Rules::Text {
                max_length: self.validation.max_length,
                multiline: true,
            },
            QuestionType::Numeric => Rules::Numeric {
                min: self.validation.min,
                max: self.validation.max,
            },
            QuestionType::FileUpload => Rules::File {
                max_size_mb: self.validation.max_size,
                allowed_extensions: self.validation.allowed_extensions.as_ref(),
            },
            QuestionType::Unsupported => Rules::Unsupported,
        }
    }

    /// Returns a copy with the patch shallow-merged over this question.
    pub fn merged(&self, patch: QuestionPatch) -> Self {
        Self {
            id: self.id.clone(),
            kind: patch.kind.unwrap_or(self.kind),
            text: patch.text.unwrap_or_else(|| self.text.clone()),
            required: patch.required.unwrap_or(self.required),
            options: patch.options.unwrap_or_else(|| self.options.clone()),
            validation: patch.validation.unwrap_or_else(|| self.validation.clone()),
            conditions: patch.conditions.unwrap_or_else(|| self.conditions.clone()),
        }
    }
}

/// Partial update applied with [`QuestionSpec::merged`]; the id is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<QuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl QuestionPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn required(required: bool) -> Self {
        Self {
            required: Some(required),
            ..Self::default()
        }
    }

    pub fn options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: Some(options.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn validation(validation: ValidationRules) -> Self {
        Self {
            validation: Some(validation),
            ..Self::default()
        }
    }

    pub fn conditions(conditions: Vec<Condition>) -> Self {
        Self {
            conditions: Some(conditions),
            ..Self::default()
        }
    }
}
