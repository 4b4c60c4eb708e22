use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::spec::question::QuestionSpec;

pub const DEFAULT_SECTION_TITLE: &str = "New Section";

/// Ordered container of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionSpec {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
}

impl SectionSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: Some(String::new()),
            questions: Vec::new(),
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&QuestionSpec> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }

    pub fn position(&self, question_id: &str) -> Option<usize> {
        self.questions
            .iter()
            .position(|question| question.id == question_id)
    }

    pub fn merged(&self, patch: SectionPatch) -> Self {
        Self {
            id: self.id.clone(),
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            description: patch.description.or_else(|| self.description.clone()),
            questions: self.questions.clone(),
        }
    }
}

impl Default for SectionSpec {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_TITLE)
    }
}

/// Title and/or description update for a section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SectionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(description.into()),
        }
    }
}
