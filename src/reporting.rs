//! Result views: the JSON rows of `GET /results` and the CSV export.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::{filled, LeadScore, ScoredLead};

const EXPORT_HEADER: [&str; 10] = [
    "Name",
    "Role",
    "Company",
    "Industry",
    "Location",
    "Intent",
    "Score",
    "Rule Score",
    "AI Score",
    "Reasoning",
];

/// One row of the results listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadResult {
    pub name: String,
    pub role: String,
    pub company: String,
    pub intent: String,
    pub score: i32,
    pub reasoning: String,
}

impl From<&ScoredLead> for LeadResult {
    fn from(row: &ScoredLead) -> Self {
        Self {
            name: text(&row.lead.name),
            role: text(&row.lead.role),
            company: text(&row.lead.company),
            intent: row.score.intent_label().to_string(),
            score: row.score.total_score(),
            reasoning: summarize_reasoning(&row.score),
        }
    }
}

fn text(value: &Option<String>) -> String {
    filled(value).unwrap_or_default().to_string()
}

/// Human-readable explanation combining the rule signals with the AI reasoning,
/// e.g. `Fits decision maker role, exact ICP match. Strong fit for the offer.`
pub fn summarize_reasoning(score: &LeadScore) -> String {
    let mut fits = Vec::new();

    match score.role_score() {
        20 => fits.push("decision maker role"),
        10 => fits.push("influencer role"),
        _ => {}
    }
    match score.industry_score() {
        20 => fits.push("exact ICP match"),
        10 => fits.push("adjacent industry"),
        _ => {}
    }
    if score.completeness_score() > 0 {
        fits.push("complete data profile");
    }

    let ai_reasoning = score.ai_reasoning().trim();
    match (fits.is_empty(), ai_reasoning.is_empty()) {
        (false, false) => format!("Fits {}. {}", fits.join(", "), ai_reasoning),
        (false, true) => format!("Fits {}.", fits.join(", ")),
        (true, false) => ai_reasoning.to_string(),
        (true, true) => "Basic scoring applied.".to_string(),
    }
}

/// Renders scored leads as the `lead_scores.csv` export.
pub fn write_results_csv(rows: &[ScoredLead]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for row in rows {
        let lead = &row.lead;
        let score = &row.score;
        writer.write_record([
            text(&lead.name),
            text(&lead.role),
            text(&lead.company),
            text(&lead.industry),
            text(&lead.location),
            score.intent_label().to_string(),
            score.total_score().to_string(),
            score.rule_score().to_string(),
            score.ai_score().to_string(),
            summarize_reasoning(score),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("Failed to write CSV export: {}", e)))
}
