use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::{
    responses::{Response, ResponseMap, ValidationErrors},
    responses_schema,
    spec::{
        form::FormSpec,
        question::{QuestionSpec, QuestionType, Rules},
    },
    visibility::resolve_visibility,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required question has no response yet.
    NeedInput,
    /// Every visible required question has a response.
    Complete,
    /// At least one visible question carries a validation error.
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Error => "error",
        }
    }
}

/// Per-question display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Hidden,
    Untouched,
    Invalid,
    Valid,
}

impl QuestionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionState::Hidden => "hidden",
            QuestionState::Untouched => "untouched",
            QuestionState::Invalid => "invalid",
            QuestionState::Valid => "valid",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Input constraints a front end can apply before submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputHints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_length: Option<usize>,
    pub max_size_mb: Option<f64>,
    pub accept: Option<BTreeSet<String>>,
    pub multiline: bool,
    pub multiple: bool,
}

impl InputHints {
    fn from_rules(rules: Rules<'_>) -> Self {
        match rules {
            Rules::Choice { multiple, .. } => Self {
                multiple,
                ..Self::default()
            },
            Rules::Text {
                max_length,
                multiline,
            } => Self {
                max_length,
                multiline,
                ..Self::default()
            },
            Rules::Numeric { min, max } => Self {
                min,
                max,
                ..Self::default()
            },
            Rules::File {
                max_size_mb,
                allowed_extensions,
            } => Self {
                max_size_mb,
                accept: allowed_extensions.cloned(),
                ..Self::default()
            },
            Rules::Unsupported => Self::default(),
        }
    }
}

/// Describes a single question for render outputs.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub text: String,
    pub kind: QuestionType,
    pub required: bool,
    pub state: QuestionState,
    pub options: Vec<String>,
    pub current_value: Option<Response>,
    pub error: Option<String>,
    pub hints: InputHints,
}

impl RenderQuestion {
    pub fn visible(&self) -> bool {
        self.state != QuestionState::Hidden
    }
}

#[derive(Debug, Clone)]
pub struct RenderSection {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<RenderQuestion>,
}

impl RenderSection {
    pub fn visible_questions(&self) -> impl Iterator<Item = &RenderQuestion> {
        self.questions.iter().filter(|question| question.visible())
    }
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub job_id: Option<String>,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub sections: Vec<RenderSection>,
    pub schema: Value,
}

impl RenderPayload {
    pub fn questions(&self) -> impl Iterator<Item = &RenderQuestion> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }
}

pub fn question_state(
    question: &QuestionSpec,
    visible: bool,
    responses: &ResponseMap,
    errors: &ValidationErrors,
) -> QuestionState {
    if !visible {
        return QuestionState::Hidden;
    }
    if errors.contains_key(&question.id) {
        return QuestionState::Invalid;
    }
    match responses.get(&question.id) {
        Some(response) if !response.is_empty() => QuestionState::Valid,
        _ => QuestionState::Untouched,
    }
}

/// Build the renderer payload from the form, live responses and current errors.
/// Questions of an unsupported type are left out.
pub fn build_render_payload(
    spec: &FormSpec,
    responses: &ResponseMap,
    errors: &ValidationErrors,
) -> RenderPayload {
    let visibility = resolve_visibility(spec, responses);

    let sections = spec
        .sections
        .iter()
        .map(|section| RenderSection {
            id: section.id.clone(),
            title: section.title.clone(),
            description: section.description.clone().filter(|text| !text.is_empty()),
            questions: section
                .questions
                .iter()
                .filter(|question| question.kind != QuestionType::Unsupported)
                .map(|question| {
                    let visible = visibility.get(&question.id).copied().unwrap_or(true);
                    RenderQuestion {
                        id: question.id.clone(),
                        text: question.text.clone(),
                        kind: question.kind,
                        required: question.required,
                        state: question_state(question, visible, responses, errors),
                        options: question.options.clone(),
                        current_value: responses.get(&question.id).cloned(),
                        error: errors.get(&question.id).map(|error| error.message.clone()),
                        hints: InputHints::from_rules(question.rules()),
                    }
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    let visible = sections
        .iter()
        .flat_map(RenderSection::visible_questions)
        .collect::<Vec<_>>();
    let answered = visible
        .iter()
        .filter(|question| {
            question
                .current_value
                .as_ref()
                .is_some_and(|value| !value.is_empty())
        })
        .count();
    let total = visible.len();

    let status = if visible
        .iter()
        .any(|question| question.state == QuestionState::Invalid)
    {
        RenderStatus::Error
    } else if visible
        .iter()
        .any(|question| question.required && question.state == QuestionState::Untouched)
    {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    let schema = responses_schema::generate(spec, &visibility);

    RenderPayload {
        job_id: spec.job_id.clone(),
        status,
        progress: RenderProgress { answered, total },
        sections,
        schema,
    }
}

/// Render the payload as a structured JSON-friendly value. Hidden questions are omitted.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let sections = payload
        .sections
        .iter()
        .map(|section| {
            let questions = section
                .visible_questions()
                .map(question_json)
                .collect::<Vec<_>>();
            json!({
                "id": section.id,
                "title": section.title,
                "description": section.description,
                "questions": questions,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "job_id": payload.job_id,
        "status": payload.status.as_str(),
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "sections": sections,
        "schema": payload.schema,
    })
}

fn question_json(question: &RenderQuestion) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(question.id.clone()));
    map.insert("text".into(), Value::String(question.text.clone()));
    map.insert("type".into(), Value::String(question.kind.as_str().into()));
    map.insert("required".into(), Value::Bool(question.required));
    map.insert("state".into(), Value::String(question.state.as_str().into()));
    if question.kind.is_choice() {
        map.insert("options".into(), json!(question.options));
    }
    if let Some(current_value) = &question.current_value
        && let Ok(value) = serde_json::to_value(current_value)
    {
        map.insert("current_value".into(), value);
    }
    if let Some(error) = &question.error {
        map.insert("error".into(), Value::String(error.clone()));
    }

    let hints = &question.hints;
    let mut hint_map = Map::new();
    if let Some(min) = hints.min {
        hint_map.insert("min".into(), json!(min));
    }
    if let Some(max) = hints.max {
        hint_map.insert("max".into(), json!(max));
    }
    if let Some(max_length) = hints.max_length {
        hint_map.insert("maxLength".into(), json!(max_length));
    }
    if let Some(max_size) = hints.max_size_mb {
        hint_map.insert("maxSize".into(), json!(max_size));
    }
    if let Some(accept) = &hints.accept {
        hint_map.insert(
            "accept".into(),
            Value::String(
                accept
                    .iter()
                    .map(|ext| format!(".{}", ext))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        );
    }
    if hints.multiline {
        hint_map.insert("multiline".into(), Value::Bool(true));
    }
    if hints.multiple {
        hint_map.insert("multiple".into(), Value::Bool(true));
    }
    if !hint_map.is_empty() {
        map.insert("hints".into(), Value::Object(hint_map));
    }
    Value::Object(map)
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    if let Some(job_id) = &payload.job_id {
        lines.push(format!("Assessment for job {}", job_id));
    }
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    for (index, section) in payload.sections.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("{}. {}", index + 1, section.title));
        if let Some(description) = &section.description {
            lines.push(format!("   {}", description));
        }
        let mut shown = 0;
        for question in section.visible_questions() {
            shown += 1;
            let mut entry = format!(" - [{}] {}", question.kind.label(), question.text);
            if question.required {
                entry.push_str(" *");
            }
            lines.push(entry);
            if !question.options.is_empty() {
                lines.push(format!("     options: {}", question.options.join(" | ")));
            }
            if let Some(hint) = hint_text(&question.hints) {
                lines.push(format!("     {}", hint));
            }
            if let Some(value) = &question.current_value {
                lines.push(format!("     = {}", value.display()));
            }
            if let Some(error) = &question.error {
                lines.push(format!("     ! {}", error));
            }
        }
        if shown == 0 {
            lines.push("   (no questions)".to_string());
        }
    }

    lines.join("\n")
}

fn hint_text(hints: &InputHints) -> Option<String> {
    let mut parts = Vec::new();
    match (hints.min, hints.max) {
        (Some(min), Some(max)) => parts.push(format!("between {} and {}", min, max)),
        (Some(min), None) => parts.push(format!("at least {}", min)),
        (None, Some(max)) => parts.push(format!("at most {}", max)),
        (None, None) => {}
    }
    if let Some(max_length) = hints.max_length {
        parts.push(format!("max {} characters", max_length));
    }
    if let Some(max_size) = hints.max_size_mb {
        parts.push(format!("max {}MB", max_size));
    }
    if let Some(accept) = &hints.accept {
        parts.push(format!(
            "accepts {}",
            accept.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}
