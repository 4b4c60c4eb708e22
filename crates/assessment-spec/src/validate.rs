use std::collections::BTreeSet;

use thiserror::Error;

use crate::responses::{Response, ResponseMap, ValidationError, ValidationErrors, ValidationResult};
use crate::spec::form::FormSpec;
use crate::spec::question::{QuestionSpec, QuestionType, Rules};
use crate::visibility::is_visible;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Why a single response was rejected. Display is the message shown to the candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("This field is required")]
    Required,
    #[error("Value must be at least {min}")]
    BelowMin { min: f64 },
    #[error("Value must be at most {max}")]
    AboveMax { max: f64 },
    #[error("Text must be no longer than {max_length} characters")]
    TooLong { max_length: usize },
    #[error("File must be smaller than {max_size}MB")]
    FileTooLarge { max_size: f64 },
    #[error("File must be one of: {}", join(.allowed))]
    ExtensionNotAllowed { allowed: BTreeSet<String> },
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl ValidationFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::Required => "required",
            ValidationFailure::BelowMin { .. } => "min",
            ValidationFailure::AboveMax { .. } => "max",
            ValidationFailure::TooLong { .. } => "max_length",
            ValidationFailure::FileTooLarge { .. } => "max_size",
            ValidationFailure::ExtensionNotAllowed { .. } => "extension",
        }
    }

    pub fn to_error(&self, question_id: &str) -> ValidationError {
        ValidationError {
            question_id: question_id.to_string(),
            message: self.to_string(),
            code: self.code().to_string(),
        }
    }
}

/// Checks one response against its question's rules.
pub fn validate_response(
    question: &QuestionSpec,
    response: Option<&Response>,
) -> Option<ValidationFailure> {
    if question.kind == QuestionType::Unsupported {
        return None;
    }
    let response = match response {
        Some(response) if !response.is_empty() => response,
        _ if question.required => return Some(ValidationFailure::Required),
        _ => return None,
    };

    match question.rules() {
        Rules::Numeric { min, max } => {
            let value = response.as_number();
            if let Some(min) = min
                && value < min
            {
                return Some(ValidationFailure::BelowMin { min });
            }
            if let Some(max) = max
                && value > max
            {
                return Some(ValidationFailure::AboveMax { max });
            }
            None
        }
        Rules::Text { max_length, .. } => {
            if let Some(max_length) = max_length
                && let Some(text) = response.as_text()
                && text.chars().count() > max_length
            {
                return Some(ValidationFailure::TooLong { max_length });
            }
            None
        }
        Rules::File {
            max_size_mb,
            allowed_extensions,
        } => {
            let file = response.as_file()?;
            if let Some(max_size) = max_size_mb
                && file.size as f64 > max_size * BYTES_PER_MB
            {
                return Some(ValidationFailure::FileTooLarge { max_size });
            }
            if let Some(allowed) = allowed_extensions
                && !allowed.is_empty()
                && !allowed.contains(&file.extension())
            {
                return Some(ValidationFailure::ExtensionNotAllowed {
                    allowed: allowed.clone(),
                });
            }
            None
        }
        Rules::Choice { .. } | Rules::Unsupported => None,
    }
}

/// Validates every visible question; hidden questions are skipped entirely.
pub fn validate(spec: &FormSpec, responses: &ResponseMap) -> ValidationResult {
    let errors: ValidationErrors = spec
        .questions()
        .filter(|question| is_visible(question, responses))
        .filter_map(|question| {
            validate_response(question, responses.get(&question.id))
                .map(|failure| (question.id.clone(), failure.to_error(&question.id)))
        })
        .collect();

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}
