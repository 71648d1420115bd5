use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

// ============ Domain Models ============

/// A product or service that leads are qualified against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub name: String,
    /// Value propositions, in the order they were submitted.
    pub value_props: Vec<String>,
    /// Target industries and use cases, in the order they were submitted.
    pub ideal_use_cases: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated offer submission that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOffer {
    pub name: String,
    pub value_props: Vec<String>,
    pub ideal_use_cases: Vec<String>,
}

impl NewOffer {
    /// Validates a raw JSON offer payload.
    ///
    /// Rejects anything the scoring core cannot consume: a missing or blank name, or
    /// `value_props` / `ideal_use_cases` that are not arrays of strings. All problems are
    /// reported together.
    pub fn from_json(payload: &Value) -> Result<Self, AppError> {
        let mut problems = Vec::new();

        let name = match payload.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                problems.push("name is required".to_string());
                String::new()
            }
        };
        let value_props = string_list(payload, "value_props", &mut problems);
        let ideal_use_cases = string_list(payload, "ideal_use_cases", &mut problems);

        if !problems.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid offer".to_string(),
                details: problems,
            });
        }

        Ok(Self {
            name,
            value_props,
            ideal_use_cases,
        })
    }
}

fn string_list(payload: &Value, field: &str, problems: &mut Vec<String>) -> Vec<String> {
    match payload.get(field) {
        Some(Value::Array(items)) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            if strings.len() != items.len() {
                problems.push(format!("{} must contain only strings", field));
            }
            strings
        }
        Some(_) => {
            problems.push(format!("{} must be a list", field));
            Vec::new()
        }
        None => {
            problems.push(format!("{} is required", field));
            Vec::new()
        }
    }
}

/// A prospect under qualification. Every descriptive field is optional.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub linkedin_bio: Option<String>,
    /// Upload batch this lead was ingested with.
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// The six profile fields in a fixed order, trimmed, `None` when blank.
    pub fn profile_fields(&self) -> [Option<&str>; 6] {
        [
            filled(&self.name),
            filled(&self.role),
            filled(&self.company),
            filled(&self.industry),
            filled(&self.location),
            filled(&self.linkedin_bio),
        ]
    }

    /// Name used in logs and error listings.
    pub fn display_name(&self) -> &str {
        filled(&self.name).unwrap_or("unnamed")
    }
}

/// Returns the trimmed value when it is present and non-blank.
pub fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A lead parsed from an upload, ready to be stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub linkedin_bio: Option<String>,
    pub batch_id: String,
}

// ============ Scoring Models ============

/// Buying-intent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    High,
    Medium,
    Low,
}

impl Intent {
    /// Final label for a total score: High at 70+, Medium at 40+, otherwise Low.
    pub fn from_total(total_score: i32) -> Self {
        if total_score >= 70 {
            Intent::High
        } else if total_score >= 40 {
            Intent::Medium
        } else {
            Intent::Low
        }
    }

    /// Points awarded to the AI component for a classified intent.
    pub fn ai_points(self) -> i32 {
        match self {
            Intent::High => 50,
            Intent::Medium => 30,
            Intent::Low => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::High => "High",
            Intent::Medium => "Medium",
            Intent::Low => "Low",
        }
    }

    /// Exact, case-sensitive label match used for query filters.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Intent::High),
            "Medium" => Some(Intent::Medium),
            "Low" => Some(Intent::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = AppError;

    /// Case-insensitive parse, used on model output and stored rows.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Intent::High),
            "medium" => Ok(Intent::Medium),
            "low" => Ok(Intent::Low),
            other => Err(AppError::BadRequest(format!("Unknown intent '{}'", other))),
        }
    }
}

/// Deterministic sub-scores produced by the rule scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScores {
    /// 0, 10 or 20.
    pub role: i32,
    /// 0, 10 or 20.
    pub industry: i32,
    /// 0, 5 or 10.
    pub completeness: i32,
}

impl RuleScores {
    /// Sum of the three rule components (0-50).
    pub fn subtotal(&self) -> i32 {
        self.role + self.industry + self.completeness
    }
}

/// Output of the intent classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAssessment {
    /// 0-50.
    pub score: i32,
    pub intent: Intent,
    pub reasoning: String,
}

/// The current score of a lead against an offer.
///
/// Fields are private so `total_score` and `intent_label` can only be produced by
/// [`LeadScore::new`], which derives them from the sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadScore {
    lead_id: i64,
    offer_id: i64,
    role_score: i32,
    industry_score: i32,
    completeness_score: i32,
    ai_score: i32,
    ai_intent: Intent,
    ai_reasoning: String,
    total_score: i32,
    intent_label: Intent,
    created_at: DateTime<Utc>,
}

impl LeadScore {
    pub fn new(lead_id: i64, offer_id: i64, rules: RuleScores, ai: AiAssessment) -> Self {
        let total_score = rules.subtotal() + ai.score;
        Self {
            lead_id,
            offer_id,
            role_score: rules.role,
            industry_score: rules.industry,
            completeness_score: rules.completeness,
            ai_score: ai.score,
            ai_intent: ai.intent,
            ai_reasoning: ai.reasoning,
            total_score,
            intent_label: Intent::from_total(total_score),
            created_at: Utc::now(),
        }
    }

    /// Replaces the creation timestamp, e.g. with the one already on record.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn lead_id(&self) -> i64 {
        self.lead_id
    }

    pub fn offer_id(&self) -> i64 {
        self.offer_id
    }

    pub fn role_score(&self) -> i32 {
        self.role_score
    }

    pub fn industry_score(&self) -> i32 {
        self.industry_score
    }

    pub fn completeness_score(&self) -> i32 {
        self.completeness_score
    }

    pub fn ai_score(&self) -> i32 {
        self.ai_score
    }

    pub fn ai_intent(&self) -> Intent {
        self.ai_intent
    }

    pub fn ai_reasoning(&self) -> &str {
        &self.ai_reasoning
    }

    pub fn total_score(&self) -> i32 {
        self.total_score
    }

    pub fn intent_label(&self) -> Intent {
        self.intent_label
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn rules(&self) -> RuleScores {
        RuleScores {
            role: self.role_score,
            industry: self.industry_score,
            completeness: self.completeness_score,
        }
    }

    /// Rule-based portion of the total (role + industry + completeness).
    pub fn rule_score(&self) -> i32 {
        self.rules().subtotal()
    }
}

/// A stored score joined with the lead it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLead {
    pub lead: Lead,
    pub score: LeadScore,
}

/// Filters applied when listing scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreFilter {
    pub offer_id: Option<i64>,
    pub batch_id: Option<String>,
    pub intent: Option<Intent>,
}

impl ScoreFilter {
    pub fn matches(&self, scored: &ScoredLead) -> bool {
        self.offer_id.map_or(true, |id| scored.score.offer_id() == id)
            && self
                .batch_id
                .as_deref()
                .map_or(true, |batch| scored.lead.batch_id == batch)
            && self
                .intent
                .map_or(true, |intent| scored.score.intent_label() == intent)
    }
}

// ============ API Request / Response Models ============

/// Body of `POST /score`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub offer_id: i64,
    pub batch_id: Option<String>,
}

/// Query string of `GET /results` and `GET /results/export`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    pub offer_id: Option<i64>,
    pub batch_id: Option<String>,
    pub intent: Option<String>,
}

impl From<ResultsQuery> for ScoreFilter {
    /// Blank batch ids are ignored, and so is any intent other than the exact
    /// labels `High`, `Medium` and `Low`.
    fn from(query: ResultsQuery) -> Self {
        Self {
            offer_id: query.offer_id,
            batch_id: query.batch_id.filter(|batch| !batch.trim().is_empty()),
            intent: query.intent.as_deref().and_then(Intent::from_label),
        }
    }
}

/// Response of `POST /leads/upload`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub batch_id: String,
    pub leads_created: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Response of `POST /score`.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub message: String,
    pub total_leads: usize,
    pub scored_leads: usize,
    pub offer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assessment(score: i32, intent: Intent) -> AiAssessment {
        AiAssessment {
            score,
            intent,
            reasoning: "test".to_string(),
        }
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(Intent::from_total(100), Intent::High);
        assert_eq!(Intent::from_total(70), Intent::High);
        assert_eq!(Intent::from_total(69), Intent::Medium);
        assert_eq!(Intent::from_total(40), Intent::Medium);
        assert_eq!(Intent::from_total(39), Intent::Low);
        assert_eq!(Intent::from_total(0), Intent::Low);
    }

    #[test]
    fn score_derives_total_and_label() {
        let rules = RuleScores {
            role: 20,
            industry: 10,
            completeness: 5,
        };
        let score = LeadScore::new(1, 2, rules, assessment(30, Intent::Medium));

        assert_eq!(score.total_score(), 65);
        assert_eq!(score.rule_score(), 35);
        assert_eq!(score.intent_label(), Intent::Medium);
        // The label follows the total, not the AI intent.
        let score = LeadScore::new(1, 2, rules, assessment(50, Intent::Low));
        assert_eq!(score.total_score(), 85);
        assert_eq!(score.intent_label(), Intent::High);
    }

    #[test]
    fn score_serializes_flat() {
        let score = LeadScore::new(3, 4, RuleScores::default(), assessment(15, Intent::Low));
        let value = serde_json::to_value(&score).unwrap();

        assert_eq!(value["lead_id"], 3);
        assert_eq!(value["total_score"], 15);
        assert_eq!(value["intent_label"], "Low");
        assert_eq!(value["ai_intent"], "Low");
    }

    #[test]
    fn intent_parsing() {
        assert_eq!("HIGH".parse::<Intent>().unwrap(), Intent::High);
        assert_eq!(" medium ".parse::<Intent>().unwrap(), Intent::Medium);
        assert!("maybe".parse::<Intent>().is_err());
        assert_eq!(Intent::from_label("Low"), Some(Intent::Low));
        assert_eq!(Intent::from_label("low"), None);
    }

    #[test]
    fn offer_payload_validation() {
        let offer = NewOffer::from_json(&json!({
            "name": "AI Outreach Automation",
            "value_props": ["24/7 outreach", "6x more meetings"],
            "ideal_use_cases": ["B2B SaaS mid-market"]
        }))
        .unwrap();
        assert_eq!(offer.name, "AI Outreach Automation");
        assert_eq!(offer.value_props.len(), 2);

        let err = NewOffer::from_json(&json!({
            "name": "",
            "value_props": "fast",
            "ideal_use_cases": ["saas", 3]
        }))
        .unwrap_err();
        match err {
            AppError::Validation { details, .. } => {
                assert_eq!(
                    details,
                    vec![
                        "name is required".to_string(),
                        "value_props must be a list".to_string(),
                        "ideal_use_cases must contain only strings".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn results_query_ignores_unknown_intent() {
        let filter = ScoreFilter::from(ResultsQuery {
            offer_id: Some(1),
            batch_id: Some("  ".to_string()),
            intent: Some("high".to_string()),
        });
        assert_eq!(filter.offer_id, Some(1));
        assert_eq!(filter.batch_id, None);
        assert_eq!(filter.intent, None);
    }

    #[test]
    fn profile_fields_treat_blank_as_missing() {
        let lead = Lead {
            name: Some("  Ava ".to_string()),
            role: Some("   ".to_string()),
            ..Default::default()
        };
        let fields = lead.profile_fields();
        assert_eq!(fields[0], Some("Ava"));
        assert_eq!(fields[1], None);
        assert_eq!(lead.display_name(), "Ava");
    }
}
