//! Submission validation
//!
//! Every check runs over the raw JSON body and all violations are
//! reported together, so a client fixing a payload sees the whole list
//! at once instead of one complaint per round trip.

use bson::{oid::ObjectId, DateTime};
use serde_json::{Map, Value};

use crate::db::schemas::{Recommend, ReferenceDoc};

/// Fields a submission may carry
const ALLOWED_FIELDS: [&str; 5] = ["userTo", "met", "hostedMe", "hostedThem", "recommend"];

/// Flags describing the claimed interaction
const INTERACTION_FIELDS: [&str; 3] = ["met", "hostedMe", "hostedThem"];

/// A validated, typed creation request
///
/// Only the allowed field set exists structurally, so nothing a client
/// smuggles into the body can reach the stored record.
#[derive(Debug, Clone)]
pub struct CreateReferenceRequest {
    pub user_to: ObjectId,
    pub met: bool,
    pub hosted_me: bool,
    pub hosted_them: bool,
    pub recommend: Option<Recommend>,
}

impl CreateReferenceRequest {
    /// Validate a raw submission from `submitter`
    ///
    /// Err carries one human-readable detail per violation.
    pub fn parse(submitter: &ObjectId, payload: &Value) -> Result<Self, Vec<String>> {
        let empty = Map::new();
        let body = payload.as_object().unwrap_or(&empty);
        let mut details = Vec::new();

        // Writing about oneself is never allowed
        let submitter_hex = submitter.to_hex();
        if body.get("userTo").and_then(Value::as_str) == Some(submitter_hex.as_str()) {
            details.push("Reference to self.".to_string());
        }

        // Some interaction must be claimed
        let any_interaction = INTERACTION_FIELDS
            .iter()
            .any(|field| body.get(*field).map(is_truthy).unwrap_or(false));
        if !any_interaction {
            details.push("No interaction.".to_string());
        }

        // recommend is optional; when given it must be a known value
        let recommend = match body.get("recommend") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = value.as_str().and_then(Recommend::from_wire);
                if parsed.is_none() {
                    details.push("Invalid recommendation.".to_string());
                }
                parsed
            }
        };

        let met = bool_field(body, "met", &mut details);
        let hosted_me = bool_field(body, "hostedMe", &mut details);
        let hosted_them = bool_field(body, "hostedThem", &mut details);

        let user_to = match body.get("userTo") {
            None => {
                details.push("Missing userTo.".to_string());
                None
            }
            Some(value) => {
                let parsed = value
                    .as_str()
                    .and_then(|raw| ObjectId::parse_str(raw).ok());
                if parsed.is_none() {
                    details.push("Value of userTo must be a user id.".to_string());
                }
                parsed
            }
        };

        // Nothing outside the recognized field set may appear; a
        // non-object envelope counts as unexpected content
        match payload.as_object() {
            Some(map) => {
                if map.keys().any(|key| !ALLOWED_FIELDS.contains(&key.as_str())) {
                    details.push("Unexpected fields.".to_string());
                }
            }
            None if payload.is_null() => {}
            None => details.push("Unexpected fields.".to_string()),
        }

        match (user_to, details.is_empty()) {
            (Some(user_to), true) => Ok(Self {
                user_to,
                met,
                hosted_me,
                hosted_them,
                recommend,
            }),
            _ => Err(details),
        }
    }

    /// Assemble the stored record from the validated request
    pub fn to_doc(&self, user_from: ObjectId, public: bool) -> ReferenceDoc {
        ReferenceDoc {
            _id: None,
            user_from,
            user_to: self.user_to,
            created: DateTime::now(),
            met: self.met,
            hosted_me: self.hosted_me,
            hosted_them: self.hosted_them,
            recommend: self.recommend,
            public,
        }
    }
}

/// A present flag must be boolean-typed; absent means false
fn bool_field(body: &Map<String, Value>, field: &str, details: &mut Vec<String>) -> bool {
    match body.get(field) {
        None => false,
        Some(Value::Bool(value)) => *value,
        Some(_) => {
            details.push(format!("Value of '{}' should be a boolean.", field));
            false
        }
    }
}

/// Truthiness as loosely-typed clients expect it: null, false, 0, NaN
/// and the empty string do not count as a claimed interaction
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submitter() -> ObjectId {
        ObjectId::new()
    }

    fn target_hex() -> String {
        ObjectId::new().to_hex()
    }

    #[test]
    fn test_minimal_valid_submission() {
        let request = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": target_hex(), "met": true }),
        )
        .unwrap();

        assert!(request.met);
        assert!(!request.hosted_me);
        assert!(!request.hosted_them);
        assert_eq!(request.recommend, None);
    }

    #[test]
    fn test_full_valid_submission() {
        let request = CreateReferenceRequest::parse(
            &submitter(),
            &json!({
                "userTo": target_hex(),
                "met": true,
                "hostedMe": true,
                "hostedThem": false,
                "recommend": "no",
            }),
        )
        .unwrap();

        assert!(request.hosted_me);
        assert!(!request.hosted_them);
        assert_eq!(request.recommend, Some(Recommend::No));
    }

    #[test]
    fn test_reference_to_self() {
        let me = submitter();
        let details = CreateReferenceRequest::parse(
            &me,
            &json!({ "userTo": me.to_hex(), "met": true }),
        )
        .unwrap_err();

        assert!(details.contains(&"Reference to self.".to_string()));
    }

    #[test]
    fn test_no_interaction_when_flags_absent() {
        let details =
            CreateReferenceRequest::parse(&submitter(), &json!({ "userTo": target_hex() }))
                .unwrap_err();

        assert_eq!(details, vec!["No interaction.".to_string()]);
    }

    #[test]
    fn test_no_interaction_when_flags_false() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({
                "userTo": target_hex(),
                "met": false,
                "hostedMe": false,
                "hostedThem": false,
            }),
        )
        .unwrap_err();

        assert_eq!(details, vec!["No interaction.".to_string()]);
    }

    #[test]
    fn test_invalid_recommendation() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": target_hex(), "met": true, "recommend": "maybe" }),
        )
        .unwrap_err();

        assert_eq!(details, vec!["Invalid recommendation.".to_string()]);
    }

    #[test]
    fn test_null_recommend_means_absent() {
        let request = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": target_hex(), "met": true, "recommend": null }),
        )
        .unwrap();

        assert_eq!(request.recommend, None);
    }

    #[test]
    fn test_non_boolean_flag() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": target_hex(), "met": "yes" }),
        )
        .unwrap_err();

        // "yes" still counts as a claimed interaction, so the type
        // violation is the only complaint
        assert_eq!(
            details,
            vec!["Value of 'met' should be a boolean.".to_string()]
        );
    }

    #[test]
    fn test_null_flag_is_not_boolean() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": target_hex(), "met": true, "hostedMe": null }),
        )
        .unwrap_err();

        assert_eq!(
            details,
            vec!["Value of 'hostedMe' should be a boolean.".to_string()]
        );
    }

    #[test]
    fn test_missing_user_to() {
        let details =
            CreateReferenceRequest::parse(&submitter(), &json!({ "met": true })).unwrap_err();

        assert_eq!(details, vec!["Missing userTo.".to_string()]);
    }

    #[test]
    fn test_user_to_not_an_id() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": "not-an-object-id", "met": true }),
        )
        .unwrap_err();

        assert_eq!(
            details,
            vec!["Value of userTo must be a user id.".to_string()]
        );
    }

    #[test]
    fn test_unexpected_fields() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "userTo": target_hex(), "met": true, "note": "lovely person" }),
        )
        .unwrap_err();

        assert_eq!(details, vec!["Unexpected fields.".to_string()]);
    }

    #[test]
    fn test_violations_accumulate() {
        let details = CreateReferenceRequest::parse(
            &submitter(),
            &json!({ "recommend": "kinda", "met": 7, "extra": true }),
        )
        .unwrap_err();

        assert!(details.contains(&"Invalid recommendation.".to_string()));
        assert!(details.contains(&"Value of 'met' should be a boolean.".to_string()));
        assert!(details.contains(&"Missing userTo.".to_string()));
        assert!(details.contains(&"Unexpected fields.".to_string()));
    }

    #[test]
    fn test_non_object_envelope() {
        let details =
            CreateReferenceRequest::parse(&submitter(), &json!(["userTo"])).unwrap_err();

        assert!(details.contains(&"Unexpected fields.".to_string()));
        assert!(details.contains(&"Missing userTo.".to_string()));
        assert!(details.contains(&"No interaction.".to_string()));
    }

    #[test]
    fn test_to_doc_assembly() {
        let me = submitter();
        let request = CreateReferenceRequest::parse(
            &me,
            &json!({ "userTo": target_hex(), "hostedThem": true, "recommend": "yes" }),
        )
        .unwrap();

        let doc = request.to_doc(me, false);
        assert_eq!(doc.user_from, me);
        assert_eq!(doc.user_to, request.user_to);
        assert!(doc.hosted_them);
        assert!(!doc.met);
        assert_eq!(doc.recommend, Some(Recommend::Yes));
        assert!(!doc.public);
        assert!(doc._id.is_none());
    }
}
