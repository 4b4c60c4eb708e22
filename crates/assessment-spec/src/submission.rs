use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::responses::ResponseMap;

/// A stored, immutable set of responses for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(deserialize_with = "crate::wire::string_or_number")]
    #[schemars(with = "String")]
    pub id: String,
    #[serde(deserialize_with = "crate::wire::string_or_number")]
    #[schemars(with = "String")]
    pub job_id: String,
    #[serde(default)]
    pub responses: ResponseMap,
    #[serde(with = "crate::wire::epoch_millis")]
    #[schemars(with = "i64")]
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let value = serde_cbor::value::to_value(self)?;
        serde_cbor::to_vec(&value)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn export_file_name(&self) -> String {
        format!("submission_{}.json", self.id)
    }
}

/// Page of submissions as returned by the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionPage {
    #[serde(default)]
    pub items: Vec<SubmissionRecord>,
    #[serde(default)]
    pub total: usize,
}

impl SubmissionPage {
    pub fn from_items(items: Vec<SubmissionRecord>) -> Self {
        let total = items.len();
        Self { items, total }.newest_first()
    }

    /// Sorts by submission time, latest first; ties keep their order.
    pub fn newest_first(mut self) -> Self {
        self.items
            .sort_by(|left, right| right.submitted_at.cmp(&left.submitted_at));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::Response;
    use serde_json::json;

    #[test]
    fn collaborator_shape_is_accepted() {
        let record: SubmissionRecord = serde_json::from_value(json!({
            "id": 1700000000001u64,
            "jobId": 3,
            "responses": { "q1": "yes" },
            "submittedAt": 1700000000001u64
        }))
        .expect("deserialize");
        assert_eq!(record.job_id, "3");
        assert_eq!(record.responses["q1"], Response::text("yes"));
        assert_eq!(record.submitted_at.timestamp_millis(), 1_700_000_000_001);
        assert_eq!(record.export_file_name(), "submission_1700000000001.json");

        let encoded = serde_json::to_value(&record).expect("serialize");
        assert_eq!(encoded["submittedAt"], json!(1_700_000_000_001i64));
    }

    #[test]
    fn cbor_export_reads_back() {
        let record = SubmissionRecord {
            id: "s1".into(),
            job_id: "9".into(),
            responses: ResponseMap::from([("q".to_string(), Response::choices(["a", "b"]))]),
            submitted_at: DateTime::from_timestamp_millis(1_000).expect("timestamp"),
        };
        let bytes = record.to_cbor().expect("cbor");
        assert_eq!(SubmissionRecord::from_cbor(&bytes).expect("decode"), record);
    }

    #[test]
    fn page_sorts_newest_first() {
        let at = |millis| DateTime::from_timestamp_millis(millis).expect("timestamp");
        let record = |id: &str, millis| SubmissionRecord {
            id: id.into(),
            job_id: "1".into(),
            responses: ResponseMap::new(),
            submitted_at: at(millis),
        };
        let page = SubmissionPage::from_items(vec![record("old", 1), record("new", 3), record("mid", 2)]);
        let ids: Vec<_> = page.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(page.total, 3);
    }
}
