//! Storage collaborator for assessments and submissions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assessment_spec::{
    FileHandle, FormSpec, Response, ResponseMap, SectionSpec, SubmissionPage, SubmissionRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::{StatusCode, multipart};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// One part of a multipart submission.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    File { name: String, file: FileHandle },
    /// JSON encoding of a non-file response.
    Text { name: String, value: String },
}

/// Body of a submission: plain JSON, or multipart when any answer is a file.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPayload {
    Json(ResponseMap),
    Multipart(Vec<FormPart>),
}

impl SubmissionPayload {
    pub fn from_responses(responses: &ResponseMap) -> RuntimeResult<Self> {
        let has_files = responses
            .values()
            .any(|response| matches!(response, Response::File(_)));
        if !has_files {
            return Ok(SubmissionPayload::Json(responses.clone()));
        }

        let mut parts = Vec::with_capacity(responses.len());
        for (name, response) in responses {
            let part = match response {
                Response::File(file) => FormPart::File {
                    name: name.clone(),
                    file: file.clone(),
                },
                other => FormPart::Text {
                    name: name.clone(),
                    value: serde_json::to_string(other)?,
                },
            };
            parts.push(part);
        }
        Ok(SubmissionPayload::Multipart(parts))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, SubmissionPayload::Multipart(_))
    }

    /// Response map as the storage side reconstructs it.
    pub fn into_responses(self) -> ResponseMap {
        match self {
            SubmissionPayload::Json(responses) => responses,
            SubmissionPayload::Multipart(parts) => parts
                .into_iter()
                .map(|part| match part {
                    FormPart::File { name, mut file } => {
                        file.path = None;
                        (name, Response::File(file))
                    }
                    FormPart::Text { name, value } => {
                        let response = serde_json::from_str(&value)
                            .unwrap_or_else(|_| Response::Text(value));
                        (name, response)
                    }
                })
                .collect(),
        }
    }
}

#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// The job's form; a job without one yields an empty section list.
    async fn fetch_assessment(&self, job_id: &str) -> RuntimeResult<FormSpec>;

    async fn save_assessment(&self, job_id: &str, sections: &[SectionSpec])
    -> RuntimeResult<FormSpec>;

    async fn submit(&self, job_id: &str, payload: SubmissionPayload)
    -> RuntimeResult<SubmissionRecord>;

    async fn list_submissions(&self, job_id: &str) -> RuntimeResult<SubmissionPage>;

    async fn has_assessment(&self, job_id: &str) -> RuntimeResult<bool> {
        Ok(self.fetch_assessment(job_id).await?.has_sections())
    }
}

/// Process-local collaborator with optional write-failure injection.
#[derive(Debug, Default)]
pub struct InMemoryAssessmentApi {
    forms: RwLock<HashMap<String, FormSpec>>,
    submissions: RwLock<HashMap<String, Vec<SubmissionRecord>>>,
    failing_writes: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryAssessmentApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Rejects the next `count` writes with a transient 500.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn insert_form(&self, job_id: &str, sections: Vec<SectionSpec>) {
        self.forms
            .write()
            .insert(job_id.to_string(), FormSpec::new(job_id, sections));
    }

    pub fn stored_form(&self, job_id: &str) -> Option<FormSpec> {
        self.forms.read().get(job_id).cloned()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_write(&self) -> RuntimeResult<()> {
        let rejected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if rejected {
            return Err(RuntimeError::TransientWrite {
                status: 500,
                message: "random write failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AssessmentApi for InMemoryAssessmentApi {
    async fn fetch_assessment(&self, job_id: &str) -> RuntimeResult<FormSpec> {
        self.delay().await;
        Ok(self
            .forms
            .read()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| FormSpec::new(job_id, Vec::new())))
    }

    async fn save_assessment(
        &self,
        job_id: &str,
        sections: &[SectionSpec],
    ) -> RuntimeResult<FormSpec> {
        self.delay().await;
        self.check_write()?;
        let form = FormSpec::new(job_id, sections.to_vec());
        self.forms.write().insert(job_id.to_string(), form.clone());
        Ok(form)
    }

    async fn submit(
        &self,
        job_id: &str,
        payload: SubmissionPayload,
    ) -> RuntimeResult<SubmissionRecord> {
        self.delay().await;
        self.check_write()?;
        let record = SubmissionRecord {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            responses: payload.into_responses(),
            submitted_at: Utc::now(),
        };
        self.submissions
            .write()
            .entry(job_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list_submissions(&self, job_id: &str) -> RuntimeResult<SubmissionPage> {
        self.delay().await;
        let items = self
            .submissions
            .read()
            .get(job_id)
            .cloned()
            .unwrap_or_default();
        Ok(SubmissionPage::from_items(items))
    }
}

/// REST client for the `/assessments/{jobId}` endpoints.
#[derive(Debug, Clone)]
pub struct HttpAssessmentApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpAssessmentApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RuntimeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> RuntimeResult<Option<Self>> {
        config
            .api_base_url
            .as_deref()
            .map(|url| Self::new(url, config.request_timeout()))
            .transpose()
    }

    fn url(&self, job_id: &str, suffix: &str) -> String {
        format!("{}/assessments/{}{}", self.base_url, job_id, suffix)
    }

    async fn rejection(response: reqwest::Response) -> RuntimeError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| {
                if text.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    text
                }
            });
        if status.is_server_error() {
            RuntimeError::TransientWrite {
                status: status.as_u16(),
                message,
            }
        } else {
            RuntimeError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    async fn multipart_form(parts: Vec<FormPart>) -> RuntimeResult<multipart::Form> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File { name, file } => {
                    let bytes = match &file.path {
                        Some(path) => tokio::fs::read(path).await?,
                        None => {
                            debug!(question = %name, file = %file.name, "file has no local path; sending metadata only");
                            Vec::new()
                        }
                    };
                    let mut body = multipart::Part::bytes(bytes).file_name(file.name.clone());
                    if let Some(mime) = &file.mime_type {
                        body = body.mime_str(mime)?;
                    }
                    form.part(name, body)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl AssessmentApi for HttpAssessmentApi {
    async fn fetch_assessment(&self, job_id: &str) -> RuntimeResult<FormSpec> {
        let response = self.client.get(self.url(job_id, "")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FormSpec::new(job_id, Vec::new()));
        }
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        let mut form: FormSpec = response.json().await?;
        if form.job_id.is_none() {
            form.job_id = Some(job_id.to_string());
        }
        Ok(form)
    }

    async fn save_assessment(
        &self,
        job_id: &str,
        sections: &[SectionSpec],
    ) -> RuntimeResult<FormSpec> {
        let response = self
            .client
            .put(self.url(job_id, ""))
            .json(&json!({ "sections": sections }))
            .send()
            .await?;
        if !response.status().is_success() {
            let error = Self::rejection(response).await;
            warn!(job_id, %error, "assessment save rejected");
            return Err(error);
        }
        Ok(response.json().await?)
    }

    async fn submit(
        &self,
        job_id: &str,
        payload: SubmissionPayload,
    ) -> RuntimeResult<SubmissionRecord> {
        let request = self.client.post(self.url(job_id, "/submit"));
        let request = match payload {
            SubmissionPayload::Json(responses) => request.json(&responses),
            SubmissionPayload::Multipart(parts) => {
                request.multipart(Self::multipart_form(parts).await?)
            }
        };
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(response.json().await?)
    }

    async fn list_submissions(&self, job_id: &str) -> RuntimeResult<SubmissionPage> {
        let response = self
            .client
            .get(self.url(job_id, "/submissions"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        let page: SubmissionPage = response.json().await?;
        Ok(page.newest_first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_switch_the_payload_to_multipart() {
        let plain = ResponseMap::from([("a".to_string(), Response::text("x"))]);
        assert!(!SubmissionPayload::from_responses(&plain).expect("payload").is_multipart());

        let mut with_file = plain.clone();
        with_file.insert(
            "cv".into(),
            Response::File(FileHandle::new("cv.pdf", 10)),
        );
        with_file.insert("tags".into(), Response::choices(["a", "b"]));
        let payload = SubmissionPayload::from_responses(&with_file).expect("payload");
        let SubmissionPayload::Multipart(parts) = &payload else {
            panic!("expected multipart");
        };
        assert!(parts.contains(&FormPart::Text {
            name: "a".into(),
            value: "\"x\"".into()
        }));
        assert!(parts.contains(&FormPart::Text {
            name: "tags".into(),
            value: "[\"a\",\"b\"]".into()
        }));
        assert_eq!(payload.into_responses(), with_file);
    }

    #[tokio::test]
    async fn injected_failures_are_transient_and_counted() {
        let api = InMemoryAssessmentApi::new();
        api.fail_next_writes(1);
        let err = api
            .save_assessment("1", &[SectionSpec::default()])
            .await
            .expect_err("rejected");
        assert!(err.is_transient());
        assert!(api.stored_form("1").is_none());

        api.save_assessment("1", &[SectionSpec::default()])
            .await
            .expect("second write succeeds");
        assert!(api.has_assessment("1").await.expect("check"));
        assert!(!api.has_assessment("2").await.expect("check"));
    }
}
