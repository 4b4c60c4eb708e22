//! Editing session for one job's assessment.

use std::sync::Arc;

use assessment_spec::{
    Condition, ConditionSource, FormSpec, QuestionPatch, QuestionSpec, QuestionType,
    SectionPatch, SectionSpec, TemplateKind,
};
use tracing::{debug, info, warn};

use crate::api::AssessmentApi;
use crate::drafts::DraftStore;
use crate::error::{BuilderError, RuntimeError, RuntimeResult};
use crate::events::{AssessmentEvent, EventBus};
use crate::lifetime::{Completion, Lifetime, PendingRequest, RequestTokens};

/// Outcome of the last explicit save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error(_) => "error",
        }
    }
}

pub struct AssessmentBuilder {
    job_id: String,
    sections: Vec<SectionSpec>,
    active_section: Option<String>,
    status: SaveStatus,
    api: Arc<dyn AssessmentApi>,
    drafts: Arc<dyn DraftStore>,
    events: EventBus,
    tokens: RequestTokens,
    lifetime: Lifetime,
}

impl AssessmentBuilder {
    /// Opens the builder: remote form first, a local draft overrides it, and an
    /// empty result is seeded with one default section.
    pub async fn open(
        job_id: impl Into<String>,
        api: Arc<dyn AssessmentApi>,
        drafts: Arc<dyn DraftStore>,
        events: EventBus,
    ) -> Self {
        let job_id = job_id.into();
        let remote = match api.fetch_assessment(&job_id).await {
            Ok(form) => form.sections,
            Err(error) => {
                warn!(job_id = %job_id, %error, "assessment fetch failed; starting empty");
                Vec::new()
            }
        };
        let draft = match drafts.load_sections(&job_id) {
            Ok(draft) => draft,
            Err(error) => {
                warn!(job_id = %job_id, %error, "ignoring unreadable draft");
                None
            }
        };
        if draft.is_some() {
            debug!(job_id = %job_id, "local draft overrides remote assessment");
        }
        Self::with_sections(job_id, draft.unwrap_or(remote), api, drafts, events)
    }

    /// Builder over a known section list, without touching storage.
    pub fn with_sections(
        job_id: impl Into<String>,
        sections: Vec<SectionSpec>,
        api: Arc<dyn AssessmentApi>,
        drafts: Arc<dyn DraftStore>,
        events: EventBus,
    ) -> Self {
        let sections = if sections.is_empty() {
            vec![SectionSpec::default()]
        } else {
            sections
        };
        let active_section = sections.first().map(|section| section.id.clone());
        Self {
            job_id: job_id.into(),
            sections,
            active_section,
            status: SaveStatus::Idle,
            api,
            drafts,
            events,
            tokens: RequestTokens::new(),
            lifetime: Lifetime::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn form(&self) -> FormSpec {
        FormSpec::new(self.job_id.clone(), self.sections.clone())
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn active_section(&self) -> Option<&SectionSpec> {
        self.active_section
            .as_deref()
            .and_then(|id| self.sections.iter().find(|section| section.id == id))
    }

    pub fn select_section(&mut self, section_id: &str) -> Result<(), BuilderError> {
        self.section_index(section_id)?;
        self.active_section = Some(section_id.to_string());
        Ok(())
    }

    pub fn add_section(&mut self) -> String {
        let section = SectionSpec::default();
        let id = section.id.clone();
        let mut sections = self.sections.clone();
        sections.push(section);
        self.commit(sections);
        self.active_section = Some(id.clone());
        id
    }

    pub fn update_section(
        &mut self,
        section_id: &str,
        patch: SectionPatch,
    ) -> Result<(), BuilderError> {
        let index = self.section_index(section_id)?;
        let mut sections = self.sections.clone();
        sections[index] = sections[index].merged(patch);
        self.commit(sections);
        Ok(())
    }

    pub fn delete_section(&mut self, section_id: &str) -> Result<(), BuilderError> {
        let index = self.section_index(section_id)?;
        if self.sections.len() == 1 {
            return Err(BuilderError::LastSection);
        }
        let mut sections = self.sections.clone();
        sections.remove(index);
        if self.active_section.as_deref() == Some(section_id) {
            self.active_section = sections.first().map(|section| section.id.clone());
        }
        self.commit(sections);
        Ok(())
    }

    pub fn add_question(
        &mut self,
        section_id: &str,
        kind: QuestionType,
    ) -> Result<String, BuilderError> {
        let question = QuestionSpec::new(kind);
        let id = question.id.clone();
        self.edit_section(section_id, |section| {
            section.questions.push(question);
            Ok(())
        })?;
        Ok(id)
    }

    pub fn update_question(
        &mut self,
        section_id: &str,
        question_id: &str,
        patch: QuestionPatch,
    ) -> Result<(), BuilderError> {
        self.edit_question(section_id, question_id, |question| {
            *question = question.merged(patch);
            Ok(())
        })
    }

    pub fn delete_question(
        &mut self,
        section_id: &str,
        question_id: &str,
    ) -> Result<(), BuilderError> {
        self.edit_section(section_id, |section| {
            let index = section
                .position(question_id)
                .ok_or_else(|| BuilderError::UnknownQuestion(question_id.to_string()))?;
            section.questions.remove(index);
            Ok(())
        })
    }

    /// Removes the question at `from` and reinserts it at `to`.
    pub fn move_question(
        &mut self,
        section_id: &str,
        from: usize,
        to: usize,
    ) -> Result<(), BuilderError> {
        self.edit_section(section_id, |section| {
            let len = section.questions.len();
            if from >= len || to >= len {
                return Err(BuilderError::MoveOutOfRange { from, to, len });
            }
            let question = section.questions.remove(from);
            section.questions.insert(to, question);
            Ok(())
        })
    }

    pub fn eligible_sources(&self, section_id: &str, question_id: &str) -> Vec<ConditionSource> {
        FormSpec::new(self.job_id.clone(), self.sections.clone())
            .eligible_condition_sources(section_id, question_id)
    }

    /// Appends `= ""` on `source_id`; returns the new condition's index.
    pub fn add_condition(
        &mut self,
        section_id: &str,
        question_id: &str,
        source_id: &str,
    ) -> Result<usize, BuilderError> {
        self.ensure_eligible(section_id, question_id, source_id)?;
        let mut index = 0;
        self.edit_question(section_id, question_id, |question| {
            question.conditions.push(Condition::new(source_id));
            index = question.conditions.len() - 1;
            Ok(())
        })?;
        Ok(index)
    }

    pub fn update_condition(
        &mut self,
        section_id: &str,
        question_id: &str,
        index: usize,
        condition: Condition,
    ) -> Result<(), BuilderError> {
        self.ensure_eligible(section_id, question_id, &condition.question_id)?;
        self.edit_question(section_id, question_id, |question| {
            let slot = question.conditions.get_mut(index).ok_or_else(|| {
                BuilderError::UnknownCondition {
                    question_id: question_id.to_string(),
                    index,
                }
            })?;
            *slot = condition;
            Ok(())
        })
    }

    pub fn remove_condition(
        &mut self,
        section_id: &str,
        question_id: &str,
        index: usize,
    ) -> Result<(), BuilderError> {
        self.edit_question(section_id, question_id, |question| {
            if index >= question.conditions.len() {
                return Err(BuilderError::UnknownCondition {
                    question_id: question_id.to_string(),
                    index,
                });
            }
            question.conditions.remove(index);
            Ok(())
        })
    }

    /// Replaces every section with a fresh copy of the template.
    pub fn apply_template(&mut self, kind: TemplateKind) {
        let sections = kind.instantiate();
        self.active_section = sections.first().map(|section| section.id.clone());
        info!(job_id = %self.job_id, template = kind.slug(), "template applied");
        self.commit(sections);
    }

    /// Starts a remote save of the current sections. Drive the returned request
    /// and hand its completion to [`Self::complete_save`].
    pub fn begin_save(&mut self) -> PendingRequest<FormSpec> {
        let token = self.tokens.issue();
        let api = Arc::clone(&self.api);
        let job_id = self.job_id.clone();
        let sections = self.sections.clone();
        self.status = SaveStatus::Saving;
        debug!(job_id = %self.job_id, token, "save started");
        PendingRequest::new(
            token,
            self.lifetime.guard(),
            Box::pin(async move { api.save_assessment(&job_id, &sections).await }),
        )
    }

    /// Applies a save completion. Returns `None` when a newer save was issued in
    /// the meantime and this completion was ignored.
    pub fn complete_save(
        &mut self,
        completion: Completion<FormSpec>,
    ) -> Option<RuntimeResult<FormSpec>> {
        if !self.tokens.is_latest(completion.token) {
            debug!(job_id = %self.job_id, token = completion.token, "stale save completion ignored");
            self.events.publish(AssessmentEvent::StaleCompletion {
                job_id: self.job_id.clone(),
                token: completion.token,
            });
            return None;
        }
        match &completion.result {
            Ok(_) => {
                info!(job_id = %self.job_id, "assessment saved");
                self.status = SaveStatus::Saved;
                self.events.publish(AssessmentEvent::Saved {
                    job_id: self.job_id.clone(),
                });
            }
            Err(error) => {
                warn!(job_id = %self.job_id, %error, "assessment save failed; local draft kept");
                self.status = SaveStatus::Error(error.to_string());
                self.events.publish(AssessmentEvent::SaveFailed {
                    job_id: self.job_id.clone(),
                    message: error.to_string(),
                });
            }
        }
        Some(completion.result)
    }

    /// Saves remotely and waits for the result. The in-memory model and the local
    /// draft are left as they are on failure.
    pub async fn save(&mut self) -> RuntimeResult<FormSpec> {
        let completion = self.begin_save().run().await;
        self.complete_save(completion)
            .unwrap_or(Err(RuntimeError::Cancelled))
    }

    /// Cancels in-flight requests started by this builder.
    pub fn cancel(&self) {
        self.lifetime.cancel();
    }

    fn section_index(&self, section_id: &str) -> Result<usize, BuilderError> {
        self.sections
            .iter()
            .position(|section| section.id == section_id)
            .ok_or_else(|| BuilderError::UnknownSection(section_id.to_string()))
    }

    fn ensure_eligible(
        &self,
        section_id: &str,
        question_id: &str,
        source_id: &str,
    ) -> Result<(), BuilderError> {
        let eligible = self
            .eligible_sources(section_id, question_id)
            .iter()
            .any(|source| source.question_id == source_id);
        if eligible {
            Ok(())
        } else {
            Err(BuilderError::IneligibleConditionSource {
                question_id: question_id.to_string(),
                source_id: source_id.to_string(),
            })
        }
    }

    fn edit_section<F>(&mut self, section_id: &str, edit: F) -> Result<(), BuilderError>
    where
        F: FnOnce(&mut SectionSpec) -> Result<(), BuilderError>,
    {
        let index = self.section_index(section_id)?;
        let mut section = self.sections[index].clone();
        edit(&mut section)?;
        let mut sections = self.sections.clone();
        sections[index] = section;
        self.commit(sections);
        Ok(())
    }

    fn edit_question<F>(
        &mut self,
        section_id: &str,
        question_id: &str,
        edit: F,
    ) -> Result<(), BuilderError>
    where
        F: FnOnce(&mut QuestionSpec) -> Result<(), BuilderError>,
    {
        self.edit_section(section_id, |section| {
            let question = section
                .questions
                .iter_mut()
                .find(|question| question.id == question_id)
                .ok_or_else(|| BuilderError::UnknownQuestion(question_id.to_string()))?;
            edit(question)
        })
    }

    // Swaps in the replacement list and writes the local draft.
    fn commit(&mut self, sections: Vec<SectionSpec>) {
        self.sections = sections;
        match self.drafts.save_sections(&self.job_id, &self.sections) {
            Ok(()) => self.events.publish(AssessmentEvent::DraftSaved {
                job_id: self.job_id.clone(),
            }),
            Err(error) => warn!(job_id = %self.job_id, %error, "draft write failed"),
        }
    }
}
