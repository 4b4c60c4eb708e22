pub mod form;
pub mod question;
pub mod section;

pub use form::{ConditionSource, FormSpec, IntegrityIssue, QuestionLocation};
pub use question::{
    DEFAULT_QUESTION_TEXT, QuestionPatch, QuestionSpec, QuestionType, Rules, ValidationRules,
    normalize_extensions,
};
pub use section::{DEFAULT_SECTION_TITLE, SectionPatch, SectionSpec};
