pub mod api;
pub mod builder;
pub mod config;
pub mod drafts;
pub mod error;
pub mod events;
pub mod lifetime;
pub mod preview;
pub mod submission;

pub use api::{
    AssessmentApi, FormPart, HttpAssessmentApi, InMemoryAssessmentApi, SubmissionPayload,
};
pub use builder::{AssessmentBuilder, SaveStatus};
pub use config::RuntimeConfig;
pub use drafts::{DraftStore, FileDraftStore, InMemoryDraftStore};
pub use error::{BuilderError, RuntimeError, RuntimeResult};
pub use events::{AssessmentEvent, EventBus};
pub use lifetime::{Completion, Lifetime, LifetimeGuard, PendingRequest, RequestTokens};
pub use preview::PreviewSession;
pub use submission::SubmissionPipeline;
