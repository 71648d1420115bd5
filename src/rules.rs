//! Deterministic rule scoring.
//!
//! Three pure functions score a lead's role, industry fit and profile completeness. Together
//! they make up the rule half (max 50 points) of the total score.

use crate::models::{Lead, Offer, RuleScores};

/// Checked first; any hit is worth 20 points. Order matters: the first match wins.
const DECISION_MAKER_KEYWORDS: &[&str] = &[
    "ceo",
    "cto",
    "cfo",
    "cmo",
    "vp",
    "vice president",
    "president",
    "director",
    "head of",
    "chief",
    "founder",
    "owner",
    "manager",
    "lead",
    "principal",
    "senior manager",
];

/// Checked only when no decision-maker keyword matched; a hit is worth 10 points.
const INFLUENCER_KEYWORDS: &[&str] = &[
    "senior",
    "specialist",
    "analyst",
    "coordinator",
    "supervisor",
    "team lead",
    "project manager",
    "product manager",
    "marketing manager",
];

/// Related-industry table for the 10 point adjacent match.
const ADJACENT_INDUSTRIES: &[(&str, &[&str])] = &[
    ("saas", &["software", "technology", "tech", "b2b", "enterprise"]),
    ("software", &["saas", "technology", "tech", "it", "digital"]),
    ("technology", &["software", "saas", "tech", "it", "digital"]),
    ("b2b", &["saas", "enterprise", "business", "corporate"]),
    ("enterprise", &["b2b", "corporate", "business", "large"]),
    ("mid-market", &["medium", "middle", "smb", "small business"]),
    ("fintech", &["finance", "financial", "banking", "payments"]),
    ("healthcare", &["medical", "health", "pharma", "biotech"]),
    ("ecommerce", &["retail", "commerce", "online", "marketplace"]),
];

pub const DECISION_MAKER_POINTS: i32 = 20;
pub const INFLUENCER_POINTS: i32 = 10;
pub const EXACT_INDUSTRY_POINTS: i32 = 20;
pub const ADJACENT_INDUSTRY_POINTS: i32 = 10;
pub const COMPLETE_PROFILE_POINTS: i32 = 10;
pub const PARTIAL_PROFILE_POINTS: i32 = 5;

/// Scores all three rule components for a lead against an offer.
pub fn score_rules(lead: &Lead, offer: &Offer) -> RuleScores {
    RuleScores {
        role: role_score(lead.role.as_deref().unwrap_or_default()),
        industry: industry_score(
            lead.industry.as_deref().unwrap_or_default(),
            offer.ideal_use_cases.as_slice(),
        ),
        completeness: completeness_score(lead),
    }
}

/// Role relevance, 0/10/20.
///
/// Unanchored, case-insensitive substring match. "Team Lead" scores 20 because "lead" in the
/// decision-maker list is reached before "team lead" in the influencer list.
pub fn role_score(role: &str) -> i32 {
    if role.trim().is_empty() {
        return 0;
    }
    let role = role.to_lowercase();

    if DECISION_MAKER_KEYWORDS.iter().any(|k| role.contains(k)) {
        DECISION_MAKER_POINTS
    } else if INFLUENCER_KEYWORDS.iter().any(|k| role.contains(k)) {
        INFLUENCER_POINTS
    } else {
        0
    }
}

/// Industry fit, 0/10/20.
pub fn industry_score<S: AsRef<str>>(industry: &str, ideal_use_cases: &[S]) -> i32 {
    if industry.is_empty() || ideal_use_cases.is_empty() {
        return 0;
    }
    let industry = industry.to_lowercase();
    let use_cases: Vec<String> = ideal_use_cases
        .iter()
        .map(|u| u.as_ref().to_lowercase())
        .collect();

    if use_cases
        .iter()
        .any(|u| industry.contains(u.as_str()) || u.contains(industry.as_str()))
    {
        return EXACT_INDUSTRY_POINTS;
    }

    let adjacent = use_cases.iter().any(|use_case| {
        ADJACENT_INDUSTRIES.iter().any(|(key, related)| {
            if use_case.contains(key) {
                related.iter().any(|r| industry.contains(r))
            } else if industry.contains(key) {
                related.iter().any(|r| use_case.contains(r))
            } else {
                false
            }
        })
    });

    if adjacent {
        ADJACENT_INDUSTRY_POINTS
    } else {
        0
    }
}

/// Profile completeness, 0/5/10: all six fields → 10, four or five → 5, otherwise 0.
pub fn completeness_score(lead: &Lead) -> i32 {
    let fields = lead.profile_fields();
    let present = fields.iter().filter(|f| f.is_some()).count();

    if present == fields.len() {
        COMPLETE_PROFILE_POINTS
    } else if present >= 4 {
        PARTIAL_PROFILE_POINTS
    } else {
        0
    }
}
