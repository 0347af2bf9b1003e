//! Persisted resume records and their feedback.
//!
//! A [`ResumeRecord`] is written twice by a successful pipeline run: once as
//! a placeholder with [`Feedback::Pending`] before scoring, and once more
//! with [`Feedback::Complete`]. On the wire the pending state is the empty
//! string `""`, so stored records look like
//!
//! ```json
//! { "id": "…", "resumePath": "…", "imagePath": "…", "companyName": "Acme",
//!   "jobTitle": "Engineer", "jobDescription": "…", "feedback": "" }
//! ```
//!
//! In memory the two states are separate variants; nothing outside this
//! module ever inspects the empty-string form.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One resume submission and its (possibly pending) analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: Feedback,
}

impl ResumeRecord {
    /// A record is complete once its feedback is structured.
    pub fn is_complete(&self) -> bool {
        self.feedback.is_complete()
    }

    /// Route of the record's detail view.
    pub fn detail_path(&self) -> String {
        detail_path(&self.id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Route of the detail view for record `id`.
pub fn detail_path(id: &str) -> String {
    format!("/resume/{id}")
}

/// Analysis state of a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Feedback {
    /// Not yet analyzed (or the analysis failed). Stored as `""`.
    #[default]
    Pending,
    /// The model's structured verdict.
    Complete(StructuredFeedback),
}

impl Feedback {
    pub fn is_complete(&self) -> bool {
        matches!(self, Feedback::Complete(_))
    }

    /// Overall score, if the record has been analyzed.
    pub fn overall_score(&self) -> Option<f64> {
        match self {
            Feedback::Pending => None,
            Feedback::Complete(f) => Some(f.overall_score),
        }
    }
}

impl Serialize for Feedback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Feedback::Pending => serializer.serialize_str(""),
            Feedback::Complete(f) => f.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Feedback {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s.is_empty() => Ok(Feedback::Pending),
            Value::String(s) => Err(de::Error::custom(format!(
                "feedback must be \"\" or an object, got string {s:?}"
            ))),
            v @ Value::Object(_) => serde_json::from_value(v)
                .map(Feedback::Complete)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "feedback must be \"\" or an object, got {other}"
            ))),
        }
    }
}

/// The structured analysis returned by the scoring model.
///
/// Only `overallScore` is mandatory; sections the model omits stay `None`
/// and keys this crate does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFeedback {
    pub overall_score: f64,
    #[serde(rename = "ATS", default, skip_serializing_if = "Option::is_none")]
    pub ats: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_and_style: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<FeedbackSection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredFeedback {
    pub fn new(overall_score: f64) -> Self {
        Self {
            overall_score,
            ats: None,
            tone_and_style: None,
            content: None,
            structure: None,
            skills: None,
            extra: Map::new(),
        }
    }
}

/// One scored category with its tips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSection {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(feedback: Feedback) -> ResumeRecord {
        ResumeRecord {
            id: "42".into(),
            resume_path: "/a/resume.pdf".into(),
            image_path: "/b/resume.png".into(),
            company_name: "Acme".into(),
            job_title: "Engineer".into(),
            job_description: "Build things".into(),
            feedback,
        }
    }

    #[test]
    fn pending_feedback_is_stored_as_empty_string() {
        let json = record(Feedback::Pending).to_json().unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["feedback"], Value::String(String::new()));
        assert_eq!(v["resumePath"], "/a/resume.pdf");
        assert_eq!(v["jobDescription"], "Build things");
    }

    #[test]
    fn complete_feedback_is_stored_as_object() {
        let json = record(Feedback::Complete(StructuredFeedback::new(81.0)))
            .to_json()
            .unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["feedback"]["overallScore"], 81.0);

        let back = ResumeRecord::from_json(&json).unwrap();
        assert!(back.is_complete());
        assert_eq!(back.feedback.overall_score(), Some(81.0));
    }

    #[test]
    fn rejects_non_sentinel_strings_and_scoreless_objects() {
        let bad_string = r#"{"id":"1","resumePath":"","imagePath":"","companyName":"a",
            "jobTitle":"b","jobDescription":"c","feedback":"pending"}"#;
        assert!(ResumeRecord::from_json(bad_string).is_err());

        let no_score = r#"{"id":"1","resumePath":"","imagePath":"","companyName":"a",
            "jobTitle":"b","jobDescription":"c","feedback":{"ATS":{"score":3}}}"#;
        assert!(ResumeRecord::from_json(no_score).is_err());
    }

    #[test]
    fn sections_and_unknown_keys_survive() {
        let raw = r#"{
            "overallScore": 72,
            "ATS": {"score": 80, "tips": [{"type": "good", "tip": "Clear headings"}]},
            "skills": {"score": 60, "tips": [{"type": "improve", "tip": "Add Rust", "explanation": "The role asks for it."}]},
            "summary": "solid"
        }"#;
        let f: StructuredFeedback = serde_json::from_str(raw).unwrap();
        assert_eq!(f.overall_score, 72.0);
        assert_eq!(f.ats.as_ref().unwrap().tips[0].kind, TipKind::Good);
        assert_eq!(
            f.skills.as_ref().unwrap().tips[0].explanation.as_deref(),
            Some("The role asks for it.")
        );
        assert_eq!(f.extra["summary"], "solid");
        assert!(f.content.is_none());
    }

    #[test]
    fn detail_path_uses_id() {
        assert_eq!(record(Feedback::Pending).detail_path(), "/resume/42");
    }
}
