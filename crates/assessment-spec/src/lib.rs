#![allow(missing_docs)]

pub mod condition;
pub mod render;
pub mod responses;
pub mod responses_schema;
pub mod spec;
pub mod submission;
pub mod templates;
pub mod validate;
pub mod visibility;
mod wire;

pub use condition::{Condition, Operator};
pub use render::{
    InputHints, QuestionState, RenderPayload, RenderProgress, RenderQuestion, RenderSection,
    RenderStatus, build_render_payload, render_json_ui, render_text,
};
pub use responses::{
    FileHandle, Response, ResponseMap, ValidationError, ValidationErrors, ValidationResult,
};
pub use responses_schema::generate as responses_schema;
pub use spec::{
    ConditionSource, FormSpec, IntegrityIssue, QuestionPatch, QuestionSpec, QuestionType, Rules,
    SectionPatch, SectionSpec, ValidationRules,
};
pub use submission::{SubmissionPage, SubmissionRecord};
pub use templates::{TemplateError, TemplateKind};
pub use validate::{ValidationFailure, validate, validate_response};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility};

/// JSON Schema of the stored form definition.
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or_default()
}
