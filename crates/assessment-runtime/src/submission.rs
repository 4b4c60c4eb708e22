use std::sync::Arc;

use assessment_spec::{ResponseMap, SubmissionPage, SubmissionRecord};
use tracing::{info, warn};

use crate::api::{AssessmentApi, SubmissionPayload};
use crate::error::RuntimeResult;

/// Sends completed response sets to storage and reads them back.
#[derive(Clone)]
pub struct SubmissionPipeline {
    api: Arc<dyn AssessmentApi>,
}

impl SubmissionPipeline {
    pub fn new(api: Arc<dyn AssessmentApi>) -> Self {
        Self { api }
    }

    /// Submits the whole map; multipart when any response is a file.
    pub async fn submit(
        &self,
        job_id: &str,
        responses: &ResponseMap,
    ) -> RuntimeResult<SubmissionRecord> {
        let payload = SubmissionPayload::from_responses(responses)?;
        let multipart = payload.is_multipart();
        match self.api.submit(job_id, payload).await {
            Ok(record) => {
                info!(job_id, submission_id = %record.id, multipart, "assessment submitted");
                Ok(record)
            }
            Err(error) => {
                warn!(job_id, %error, "assessment submission failed");
                Err(error)
            }
        }
    }

    /// Every submission for the job, newest first.
    pub async fn list(&self, job_id: &str) -> RuntimeResult<SubmissionPage> {
        Ok(self.api.list_submissions(job_id).await?.newest_first())
    }
}
