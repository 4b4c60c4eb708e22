use std::collections::BTreeMap;

use crate::responses::ResponseMap;
use crate::spec::form::FormSpec;
use crate::spec::question::QuestionSpec;

pub type VisibilityMap = BTreeMap<String, bool>;

/// A question is shown when every one of its conditions holds.
pub fn is_visible(question: &QuestionSpec, responses: &ResponseMap) -> bool {
    question
        .conditions
        .iter()
        .all(|condition| condition.holds(responses))
}

pub fn resolve_visibility(spec: &FormSpec, responses: &ResponseMap) -> VisibilityMap {
    spec.questions()
        .map(|question| (question.id.clone(), is_visible(question, responses)))
        .collect()
}
