use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::question::{QuestionSpec, QuestionType};
use crate::spec::section::SectionSpec;

/// Per-job assessment: the ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::wire::opt_string_or_number"
    )]
    #[schemars(with = "Option<String>")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

/// Where a question sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionLocation {
    pub section: usize,
    pub index: usize,
}

/// A question that may be referenced by a condition, with its section title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSource {
    pub question_id: String,
    pub text: String,
    pub section_title: String,
}

/// Structural problems detected in a stored form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityIssue {
    #[error("id '{0}' is used more than once")]
    DuplicateId(String),
    #[error("question '{question_id}' has a condition on unknown question '{source_id}'")]
    DanglingCondition {
        question_id: String,
        source_id: String,
    },
    #[error("question '{0}' has a condition on itself")]
    SelfCondition(String),
    #[error("question '{question_id}' has a condition on later question '{source_id}'")]
    ForwardCondition {
        question_id: String,
        source_id: String,
    },
    #[error("choice question '{0}' has no options")]
    MissingOptions(String),
    #[error("question '{0}' has min greater than max")]
    InvertedBounds(String),
    #[error("question '{0}' has an unsupported type")]
    UnsupportedType(String),
}

impl FormSpec {
    pub fn new(job_id: impl Into<String>, sections: Vec<SectionSpec>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            sections,
        }
    }

    pub fn has_sections(&self) -> bool {
        !self.sections.is_empty()
    }

    /// Questions in document order.
    pub fn questions(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, question_id: &str) -> Option<&QuestionSpec> {
        self.questions().find(|question| question.id == question_id)
    }

    pub fn section(&self, section_id: &str) -> Option<&SectionSpec> {
        self.sections
            .iter()
            .find(|section| section.id == section_id)
    }

    pub fn locate(&self, question_id: &str) -> Option<QuestionLocation> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section, spec)| {
                spec.position(question_id)
                    .map(|index| QuestionLocation { section, index })
            })
    }

    /// Questions a condition on `question_id` may reference: every question of
    /// earlier sections, then the questions before it in its own section.
    pub fn eligible_condition_sources(
        &self,
        section_id: &str,
        question_id: &str,
    ) -> Vec<ConditionSource> {
        let mut sources = Vec::new();
        for section in &self.sections {
            let own = section.id == section_id;
            let limit = if own {
                section
                    .position(question_id)
                    .unwrap_or(section.questions.len())
            } else {
                section.questions.len()
            };
            sources.extend(
                section.questions[..limit]
                    .iter()
                    .filter(|question| question.id != question_id)
                    .map(|question| ConditionSource {
                        question_id: question.id.clone(),
                        text: question.text.clone(),
                        section_title: section.title.clone(),
                    }),
            );
            if own {
                break;
            }
        }
        sources
    }

    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        let mut seen = BTreeSet::new();
        let ids = self
            .sections
            .iter()
            .map(|section| &section.id)
            .chain(self.questions().map(|question| &question.id));
        for id in ids {
            if !seen.insert(id.as_str()) {
                issues.push(IntegrityIssue::DuplicateId(id.clone()));
            }
        }

        let order: BTreeMap<&str, usize> = self
            .questions()
            .enumerate()
            .map(|(index, question)| (question.id.as_str(), index))
            .collect();

        for (index, question) in self.questions().enumerate() {
            for condition in &question.conditions {
                let source_id = condition.question_id.clone();
                match order.get(condition.question_id.as_str()) {
                    None => issues.push(IntegrityIssue::DanglingCondition {
                        question_id: question.id.clone(),
                        source_id,
                    }),
                    Some(&source) if source == index => {
                        issues.push(IntegrityIssue::SelfCondition(question.id.clone()))
                    }
                    Some(&source) if source > index => {
                        issues.push(IntegrityIssue::ForwardCondition {
                            question_id: question.id.clone(),
                            source_id,
                        })
                    }
                    Some(_) => {}
                }
            }

            match question.kind {
                QuestionType::SingleChoice | QuestionType::MultiChoice
                    if question.options.is_empty() =>
                {
                    issues.push(IntegrityIssue::MissingOptions(question.id.clone()))
                }
                QuestionType::Numeric => {
                    if let (Some(min), Some(max)) = (question.validation.min, question.validation.max)
                        && min > max
                    {
                        issues.push(IntegrityIssue::InvertedBounds(question.id.clone()));
                    }
                }
                QuestionType::Unsupported => {
                    issues.push(IntegrityIssue::UnsupportedType(question.id.clone()))
                }
                _ => {}
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Operator};
    use crate::spec::question::ValidationRules;

    fn question(id: &str, kind: QuestionType) -> QuestionSpec {
        let mut question = QuestionSpec::new(kind);
        question.id = id.into();
        question.text = id.to_uppercase();
        question
    }

    fn two_sections() -> FormSpec {
        let mut first = SectionSpec::new("First");
        first.id = "s1".into();
        first.questions = vec![
            question("a", QuestionType::ShortText),
            question("b", QuestionType::ShortText),
        ];
        let mut second = SectionSpec::new("Second");
        second.id = "s2".into();
        second.questions = vec![
            question("c", QuestionType::Numeric),
            question("d", QuestionType::ShortText),
            question("e", QuestionType::ShortText),
        ];
        FormSpec::new("7", vec![first, second])
    }

    #[test]
    fn eligible_sources_stop_before_the_question() {
        let form = two_sections();
        let ids: Vec<_> = form
            .eligible_condition_sources("s2", "d")
            .into_iter()
            .map(|source| source.question_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let first = form.eligible_condition_sources("s1", "a");
        assert!(first.is_empty());
    }

    #[test]
    fn locate_reports_section_and_index() {
        let form = two_sections();
        assert_eq!(
            form.locate("d"),
            Some(QuestionLocation {
                section: 1,
                index: 1
            })
        );
        assert_eq!(form.locate("zz"), None);
    }

    #[test]
    fn integrity_flags_bad_conditions_and_bounds() {
        let mut form = two_sections();
        form.sections[0].questions[0]
            .conditions
            .push(Condition::with("d", Operator::Eq, "x"));
        form.sections[0].questions[1]
            .conditions
            .push(Condition::with("b", Operator::Eq, "x"));
        form.sections[1].questions[1]
            .conditions
            .push(Condition::with("gone", Operator::Eq, "x"));
        form.sections[1].questions[0].validation = ValidationRules::range(Some(5.0), Some(1.0));
        form.sections[1].questions[2].kind = QuestionType::SingleChoice;

        let issues = form.integrity_issues();
        assert!(issues.contains(&IntegrityIssue::ForwardCondition {
            question_id: "a".into(),
            source_id: "d".into()
        }));
        assert!(issues.contains(&IntegrityIssue::SelfCondition("b".into())));
        assert!(issues.contains(&IntegrityIssue::DanglingCondition {
            question_id: "d".into(),
            source_id: "gone".into()
        }));
        assert!(issues.contains(&IntegrityIssue::InvertedBounds("c".into())));
        assert!(issues.contains(&IntegrityIssue::MissingOptions("e".into())));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn numeric_job_id_is_accepted() {
        let form: FormSpec =
            serde_json::from_str(r#"{ "jobId": 42, "sections": [] }"#).expect("deserialize");
        assert_eq!(form.job_id.as_deref(), Some("42"));
        assert!(!form.has_sections());
    }
}
