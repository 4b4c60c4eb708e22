use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::responses::{Response, ResponseMap, coerce_number};

/// Comparison applied between a referenced response and a condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Operator {
    #[serde(rename = "===", alias = "=", alias = "==")]
    Eq,
    #[serde(rename = "!==", alias = "!=", alias = "≠")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    /// Operator written by a newer version; never hides anything.
    #[serde(other)]
    Unsupported,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Eq, Operator::Ne, Operator::Gt, Operator::Lt];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "≠",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Unsupported => "?",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "=" | "==" | "===" | "eq" => Ok(Operator::Eq),
            "!=" | "!==" | "≠" | "ne" => Ok(Operator::Ne),
            ">" | "gt" => Ok(Operator::Gt),
            "<" | "lt" => Ok(Operator::Lt),
            _ => Err(format!("unknown operator '{}'", value)),
        }
    }
}

/// Display rule gating a question on an earlier question's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub question_id: String,
    pub operator: Operator,
    #[serde(default, deserialize_with = "crate::wire::string_or_number")]
    #[schemars(with = "String")]
    pub value: String,
}

impl Condition {
    /// Condition as the builder first creates it: `= ""`.
    pub fn new(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            operator: Operator::Eq,
            value: String::new(),
        }
    }

    pub fn with(question_id: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluates against the current responses. Total: never panics.
    pub fn holds(&self, responses: &ResponseMap) -> bool {
        let response = responses.get(&self.question_id);
        match self.operator {
            Operator::Eq => equals(response, &self.value),
            Operator::Ne => !equals(response, &self.value),
            Operator::Gt => numeric(response, &self.value, |left, right| left > right),
            Operator::Lt => numeric(response, &self.value, |left, right| left < right),
            Operator::Unsupported => true,
        }
    }
}

fn equals(response: Option<&Response>, value: &str) -> bool {
    response.is_some_and(|response| response.equals_text(value))
}

// NaN on either side makes both comparisons false.
fn numeric(response: Option<&Response>, value: &str, compare: fn(f64, f64) -> bool) -> bool {
    let left = response.map_or(f64::NAN, Response::as_number);
    compare(left, coerce_number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn responses(entries: &[(&str, Response)]) -> ResponseMap {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn operator_accepts_wire_and_display_forms() {
        let ops: Vec<Operator> =
            serde_json::from_value(json!(["===", "!==", ">", "<", "=", "≠", "~"])).expect("ops");
        assert_eq!(
            ops,
            vec![
                Operator::Eq,
                Operator::Ne,
                Operator::Gt,
                Operator::Lt,
                Operator::Eq,
                Operator::Ne,
                Operator::Unsupported
            ]
        );
        assert_eq!(serde_json::to_value(Operator::Ne).expect("ser"), json!("!=="));
    }

    #[test]
    fn equality_is_string_based() {
        let map = responses(&[("a", Response::text("5"))]);
        assert!(Condition::with("a", Operator::Eq, "5").holds(&map));
        assert!(!Condition::with("a", Operator::Eq, "5.0").holds(&map));
        assert!(Condition::with("a", Operator::Ne, "5.0").holds(&map));
    }

    #[test]
    fn missing_response_is_never_equal() {
        let map = ResponseMap::new();
        assert!(!Condition::with("a", Operator::Eq, "").holds(&map));
        assert!(Condition::with("a", Operator::Ne, "yes").holds(&map));
    }

    #[test]
    fn list_response_never_equals_text() {
        let map = responses(&[("a", Response::choices(["yes"]))]);
        assert!(!Condition::with("a", Operator::Eq, "yes").holds(&map));
    }

    #[test]
    fn numeric_operators_coerce_both_sides() {
        let map = responses(&[("years", Response::text(" 7 "))]);
        assert!(Condition::with("years", Operator::Gt, "5").holds(&map));
        assert!(!Condition::with("years", Operator::Lt, "5").holds(&map));
        assert!(!Condition::with("years", Operator::Gt, "seven").holds(&map));
    }

    #[test]
    fn value_may_be_stored_as_number() {
        let condition: Condition = serde_json::from_value(json!({
            "questionId": "a",
            "operator": ">",
            "value": 3
        }))
        .expect("deserialize");
        assert_eq!(condition.value, "3");
    }
}
