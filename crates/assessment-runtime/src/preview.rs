//! Candidate-facing session: collects responses for a job's form, validates on
//! submit and hands the full response map to the submission pipeline.

use std::sync::Arc;

use assessment_spec::{
    FormSpec, RenderPayload, Response, ResponseMap, SubmissionRecord, ValidationErrors,
    VisibilityMap, build_render_payload, resolve_visibility, validate,
};
use tracing::{debug, warn};

use crate::api::AssessmentApi;
use crate::drafts::DraftStore;
use crate::error::{RuntimeError, RuntimeResult};
use crate::events::{AssessmentEvent, EventBus};
use crate::lifetime::{Completion, Lifetime, PendingRequest, RequestTokens};
use crate::submission::SubmissionPipeline;

pub struct PreviewSession {
    job_id: String,
    form: FormSpec,
    responses: ResponseMap,
    errors: ValidationErrors,
    last_submission: Option<SubmissionRecord>,
    pipeline: SubmissionPipeline,
    drafts: Arc<dyn DraftStore>,
    events: EventBus,
    tokens: RequestTokens,
    lifetime: Lifetime,
}

impl PreviewSession {
    /// Loads the job's form from storage; fetch failures degrade to an empty form.
    pub async fn open(
        job_id: impl Into<String>,
        api: Arc<dyn AssessmentApi>,
        drafts: Arc<dyn DraftStore>,
        events: EventBus,
    ) -> Self {
        let job_id = job_id.into();
        let form = match api.fetch_assessment(&job_id).await {
            Ok(form) => form,
            Err(error) => {
                warn!(job_id = %job_id, %error, "assessment fetch failed; previewing empty form");
                FormSpec::new(job_id.clone(), Vec::new())
            }
        };
        Self::new(job_id, form, api, drafts, events)
    }

    /// Session over a known form, hydrated from the response cache.
    pub fn new(
        job_id: impl Into<String>,
        form: FormSpec,
        api: Arc<dyn AssessmentApi>,
        drafts: Arc<dyn DraftStore>,
        events: EventBus,
    ) -> Self {
        let job_id = job_id.into();
        let responses = match drafts.load_responses(&job_id) {
            Ok(cached) => cached.unwrap_or_default(),
            Err(error) => {
                warn!(job_id = %job_id, %error, "ignoring unreadable response cache");
                ResponseMap::new()
            }
        };
        Self {
            job_id,
            form,
            responses,
            errors: ValidationErrors::new(),
            last_submission: None,
            pipeline: SubmissionPipeline::new(api),
            drafts,
            events,
            tokens: RequestTokens::new(),
            lifetime: Lifetime::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn form(&self) -> &FormSpec {
        &self.form
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn last_submission(&self) -> Option<&SubmissionRecord> {
        self.last_submission.as_ref()
    }

    pub fn visibility(&self) -> VisibilityMap {
        resolve_visibility(&self.form, &self.responses)
    }

    pub fn render(&self) -> RenderPayload {
        build_render_payload(&self.form, &self.responses, &self.errors)
    }

    /// Records an answer, clears that field's error and rewrites the cache.
    pub fn set_response(&mut self, question_id: &str, response: Response) {
        let mut responses = self.responses.clone();
        responses.insert(question_id.to_string(), response);
        self.replace(question_id, responses);
    }

    pub fn clear_response(&mut self, question_id: &str) {
        let mut responses = self.responses.clone();
        responses.remove(question_id);
        self.replace(question_id, responses);
    }

    /// Checking appends the option, unchecking removes it.
    pub fn toggle_choice(&mut self, question_id: &str, option: &str, checked: bool) {
        let mut selected = match self.responses.get(question_id) {
            Some(Response::Choices(values)) => values.clone(),
            _ => Vec::new(),
        };
        if checked {
            if !selected.iter().any(|value| value == option) {
                selected.push(option.to_string());
            }
        } else {
            selected.retain(|value| value != option);
        }
        self.set_response(question_id, Response::Choices(selected));
    }

    /// Recomputes errors for every visible question.
    pub fn validate(&mut self) -> bool {
        let result = validate(&self.form, &self.responses);
        self.errors = result.errors;
        result.valid
    }

    /// Validates and, when clean, starts a submission of the whole response map.
    pub fn begin_submit(&mut self) -> RuntimeResult<PendingRequest<SubmissionRecord>> {
        if !self.validate() {
            return Err(RuntimeError::Invalid {
                count: self.errors.len(),
            });
        }
        let token = self.tokens.issue();
        let pipeline = self.pipeline.clone();
        let job_id = self.job_id.clone();
        let responses = self.responses.clone();
        debug!(job_id = %self.job_id, token, "submission started");
        Ok(PendingRequest::new(
            token,
            self.lifetime.guard(),
            Box::pin(async move { pipeline.submit(&job_id, &responses).await }),
        ))
    }

    /// Applies a submission completion; `None` when it was superseded.
    pub fn complete_submit(
        &mut self,
        completion: Completion<SubmissionRecord>,
    ) -> Option<RuntimeResult<SubmissionRecord>> {
        if !self.tokens.is_latest(completion.token) {
            debug!(job_id = %self.job_id, token = completion.token, "stale submission completion ignored");
            self.events.publish(AssessmentEvent::StaleCompletion {
                job_id: self.job_id.clone(),
                token: completion.token,
            });
            return None;
        }
        match &completion.result {
            Ok(record) => {
                self.last_submission = Some(record.clone());
                self.events.publish(AssessmentEvent::Submitted {
                    job_id: self.job_id.clone(),
                    submission_id: record.id.clone(),
                });
            }
            Err(error) => self.events.publish(AssessmentEvent::SubmitFailed {
                job_id: self.job_id.clone(),
                message: error.to_string(),
            }),
        }
        Some(completion.result)
    }

    pub async fn submit(&mut self) -> RuntimeResult<SubmissionRecord> {
        let completion = self.begin_submit()?.run().await;
        self.complete_submit(completion)
            .unwrap_or(Err(RuntimeError::Cancelled))
    }

    pub fn cancel(&self) {
        self.lifetime.cancel();
    }

    fn replace(&mut self, question_id: &str, responses: ResponseMap) {
        self.responses = responses;
        self.errors.remove(question_id);
        if let Err(error) = self.drafts.save_responses(&self.job_id, &self.responses) {
            warn!(job_id = %self.job_id, %error, "response cache write failed");
        }
    }
}
