//! Intent classification: the AI half (max 50 points) of a lead's score.
//!
//! [`AiIntentClassifier`] asks a completion backend to label the lead and falls back to a
//! rule-derived estimate whenever the call fails. [`FallbackClassifier`] is used when no
//! backend is configured at all. Neither ever returns an error.

use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::ai_client::{CompletionBackend, CompletionRequest, OpenAiClient};
use crate::circuit_breaker::{create_ai_circuit_breaker, AiCircuitBreaker};
use crate::completion_cache::CompletionCache;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{filled, AiAssessment, Intent, Lead, Offer, RuleScores};

const SYSTEM_PROMPT: &str =
    "You are a lead qualification expert that provides concise, actionable assessments.";
const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.3;

const BIO_PROMPT_CHARS: usize = 300;
const REASONING_MAX_CHARS: usize = 200;
const DEFAULT_REASONING: &str = "AI analysis completed";
/// Score for an INTENT line whose value is not High, Medium or Low.
const UNRECOGNIZED_INTENT_POINTS: i32 = 25;

/// Produces the AI sub-score, intent and reasoning for a lead.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, lead: &Lead, offer: &Offer, rules: &RuleScores) -> AiAssessment;
}

/// Builds the classifier selected by configuration: AI-backed when an API key is present,
/// rule-based fallback otherwise.
pub fn classifier_from_config(config: &Config) -> Result<Arc<dyn IntentClassifier>, AppError> {
    match OpenAiClient::from_config(config)? {
        Some(client) => {
            tracing::info!("Using AI intent classifier ({})", client.model());
            Ok(Arc::new(AiIntentClassifier::new(Arc::new(client))))
        }
        None => {
            tracing::info!("No AI backend configured, using fallback intent classifier");
            Ok(Arc::new(FallbackClassifier))
        }
    }
}

// ============ Fallback ============

/// Why the rule-derived estimate is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No backend configured.
    Unconfigured,
    /// The backend call or its parsing failed.
    BackendError,
}

/// Rule-derived stand-in for the AI assessment.
///
/// Thresholds are shared (subtotal 40+ High, 25+ Medium); points differ slightly by reason:
/// 45/30/15 when no backend is configured, 40/25/15 after a backend error.
pub fn fallback_assessment(rules: &RuleScores, reason: FallbackReason) -> AiAssessment {
    let subtotal = rules.subtotal();
    let intent = if subtotal >= 40 {
        Intent::High
    } else if subtotal >= 25 {
        Intent::Medium
    } else {
        Intent::Low
    };

    match reason {
        FallbackReason::Unconfigured => {
            let (score, summary) = match intent {
                Intent::High => (
                    45,
                    "Strong profile match with decision-making role and industry alignment",
                ),
                Intent::Medium => (30, "Good profile with some relevant qualifications"),
                Intent::Low => (15, "Limited alignment with target profile"),
            };
            AiAssessment {
                score,
                intent,
                reasoning: format!("{} (AI fallback scoring)", summary),
            }
        }
        FallbackReason::BackendError => {
            let score = match intent {
                Intent::High => 40,
                Intent::Medium => 25,
                Intent::Low => 15,
            };
            AiAssessment {
                score,
                intent,
                reasoning: format!(
                    "AI unavailable - rule-based {} score ({}/50)",
                    intent.as_str().to_lowercase(),
                    subtotal
                ),
            }
        }
    }
}

/// Classifier used when no AI backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackClassifier;

#[async_trait]
impl IntentClassifier for FallbackClassifier {
    async fn classify(&self, _lead: &Lead, _offer: &Offer, rules: &RuleScores) -> AiAssessment {
        fallback_assessment(rules, FallbackReason::Unconfigured)
    }
}

// ============ AI-backed ============

/// Classifier backed by a completion endpoint.
///
/// Completions are cached per prompt and calls go through a circuit breaker, so a failing
/// backend is skipped after repeated errors.
pub struct AiIntentClassifier {
    backend: Arc<dyn CompletionBackend>,
    cache: CompletionCache,
    breaker: AiCircuitBreaker,
}

impl AiIntentClassifier {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_cache(backend, CompletionCache::new())
    }

    pub fn with_cache(backend: Arc<dyn CompletionBackend>, cache: CompletionCache) -> Self {
        Self {
            backend,
            cache,
            breaker: create_ai_circuit_breaker(),
        }
    }

    async fn assess(&self, lead: &Lead, offer: &Offer) -> Result<AiAssessment, AppError> {
        let request = build_request(lead, offer);

        if let Some(cached) = self.cache.get(&request).await {
            tracing::debug!(lead_id = lead.id, "AI completion cache hit");
            return Ok(parse_response(&cached));
        }

        let completion = self
            .breaker
            .call(self.backend.complete(&request))
            .await
            .map_err(|e| match e {
                failsafe::Error::Inner(inner) => inner,
                failsafe::Error::Rejected => AppError::ExternalApiError(
                    "AI backend circuit open, call skipped".to_string(),
                ),
            })?;

        let assessment = parse_response(&completion);
        self.cache.insert(&request, completion).await;
        Ok(assessment)
    }
}

#[async_trait]
impl IntentClassifier for AiIntentClassifier {
    async fn classify(&self, lead: &Lead, offer: &Offer, rules: &RuleScores) -> AiAssessment {
        match self.assess(lead, offer).await {
            Ok(assessment) => assessment,
            Err(e) => {
                tracing::warn!(
                    lead_id = lead.id,
                    error = %e,
                    "AI scoring failed, using rule-based fallback"
                );
                fallback_assessment(rules, FallbackReason::BackendError)
            }
        }
    }
}

// ============ Prompt ============

/// Builds the completion request for a lead/offer pair.
pub fn build_request(lead: &Lead, offer: &Offer) -> CompletionRequest {
    let prompt = format!(
        "You are a lead qualification expert. Analyze this prospect against the product/offer and classify their buying intent.

PRODUCT/OFFER:
{offer}

PROSPECT:
{lead}

Classify the prospect's intent as High, Medium, or Low based on:
1. Role fit (decision-making authority)
2. Industry/use case alignment
3. Profile completeness and quality
4. Likelihood to benefit from the offer

Respond with exactly this format:
INTENT: [High/Medium/Low]
REASONING: [1-2 sentences explaining your classification]",
        offer = offer_context(offer),
        lead = lead_context(lead),
    );

    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

fn offer_context(offer: &Offer) -> String {
    let mut parts = vec![format!("Product: {}", offer.name)];
    if !offer.value_props.is_empty() {
        parts.push(format!(
            "Value Propositions: {}",
            offer.value_props.join(", ")
        ));
    }
    if !offer.ideal_use_cases.is_empty() {
        parts.push(format!(
            "Ideal Use Cases: {}",
            offer.ideal_use_cases.join(", ")
        ));
    }
    parts.join("\n")
}

fn lead_context(lead: &Lead) -> String {
    let labelled = [
        ("Name", filled(&lead.name)),
        ("Role", filled(&lead.role)),
        ("Company", filled(&lead.company)),
        ("Industry", filled(&lead.industry)),
        ("Location", filled(&lead.location)),
    ];
    let mut parts: Vec<String> = labelled
        .iter()
        .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
        .collect();

    if let Some(bio) = filled(&lead.linkedin_bio) {
        parts.push(format!("LinkedIn Bio: {}", truncate_bio(bio)));
    }
    parts.join("\n")
}

fn truncate_bio(bio: &str) -> String {
    if bio.chars().count() > BIO_PROMPT_CHARS {
        let head: String = bio.chars().take(BIO_PROMPT_CHARS).collect();
        format!("{}...", head)
    } else {
        bio.to_string()
    }
}

// ============ Response parsing ============

fn intent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)INTENT:\s*\[?\s*([a-z]+)").expect("intent pattern is valid")
    })
}

fn reasoning_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)REASONING:\s*(.+)").expect("reasoning pattern is valid")
    })
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Parses a model reply of the form `INTENT: <level>` / `REASONING: <text>`.
///
/// A missing INTENT line means Medium (30 points); an INTENT value other than
/// High/Medium/Low is labelled Medium but earns 25 points. Reasoning is
/// whitespace-collapsed and capped at 200 characters.
pub fn parse_response(text: &str) -> AiAssessment {
    let (intent, score) = match intent_pattern().captures(text).and_then(|c| c.get(1)) {
        Some(word) => match word.as_str().parse::<Intent>() {
            Ok(intent) => (intent, intent.ai_points()),
            Err(_) => (Intent::Medium, UNRECOGNIZED_INTENT_POINTS),
        },
        None => (Intent::Medium, Intent::Medium.ai_points()),
    };

    let reasoning = reasoning_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASONING);
    let reasoning: String = whitespace_pattern()
        .replace_all(reasoning, " ")
        .chars()
        .take(REASONING_MAX_CHARS)
        .collect();

    AiAssessment {
        score,
        intent,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(role: i32, industry: i32, completeness: i32) -> RuleScores {
        RuleScores {
            role,
            industry,
            completeness,
        }
    }

    #[test]
    fn parses_well_formed_reply() {
        let parsed = parse_response(
            "INTENT: High\nREASONING: Decision maker at a SaaS company that matches the ICP.",
        );
        assert_eq!(parsed.intent, Intent::High);
        assert_eq!(parsed.score, 50);
        assert_eq!(
            parsed.reasoning,
            "Decision maker at a SaaS company that matches the ICP."
        );
    }

    #[test]
    fn parsing_is_case_insensitive_and_tolerant() {
        let parsed = parse_response("intent: [low]\nreasoning:   Too   junior\n for this.  ");
        assert_eq!(parsed.intent, Intent::Low);
        assert_eq!(parsed.score, 10);
        assert_eq!(parsed.reasoning, "Too junior for this.");
    }

    #[test]
    fn missing_lines_use_defaults() {
        let parsed = parse_response("I think this lead is promising.");
        assert_eq!(parsed.intent, Intent::Medium);
        assert_eq!(parsed.score, 30);
        assert_eq!(parsed.reasoning, "AI analysis completed");
    }

    #[test]
    fn unrecognized_intent_scores_twenty_five() {
        let parsed = parse_response("INTENT: Uncertain\nREASONING: Not enough data.");
        assert_eq!(parsed.intent, Intent::Medium);
        assert_eq!(parsed.score, 25);
    }

    #[test]
    fn reasoning_is_capped() {
        let long = "word ".repeat(100);
        let parsed = parse_response(&format!("INTENT: Medium\nREASONING: {}", long));
        assert_eq!(parsed.reasoning.chars().count(), 200);
    }

    #[test]
    fn unconfigured_fallback_bands() {
        let high = fallback_assessment(&rules(20, 20, 5), FallbackReason::Unconfigured);
        assert_eq!((high.score, high.intent), (45, Intent::High));
        assert!(high.reasoning.ends_with("(AI fallback scoring)"));

        let medium = fallback_assessment(&rules(20, 0, 5), FallbackReason::Unconfigured);
        assert_eq!((medium.score, medium.intent), (30, Intent::Medium));

        let low = fallback_assessment(&rules(10, 0, 10), FallbackReason::Unconfigured);
        assert_eq!((low.score, low.intent), (15, Intent::Low));
    }

    #[test]
    fn error_fallback_bands() {
        let high = fallback_assessment(&rules(20, 20, 0), FallbackReason::BackendError);
        assert_eq!((high.score, high.intent), (40, Intent::High));
        assert_eq!(high.reasoning, "AI unavailable - rule-based high score (40/50)");

        let medium = fallback_assessment(&rules(20, 0, 5), FallbackReason::BackendError);
        assert_eq!((medium.score, medium.intent), (25, Intent::Medium));
        assert_eq!(medium.reasoning, "AI unavailable - rule-based medium score (25/50)");

        let low = fallback_assessment(&rules(0, 0, 0), FallbackReason::BackendError);
        assert_eq!((low.score, low.intent), (15, Intent::Low));
    }

    #[test]
    fn prompt_includes_present_fields_only() {
        let lead = Lead {
            name: Some("Ava Patel".to_string()),
            role: Some("Head of Growth".to_string()),
            company: Some("   ".to_string()),
            linkedin_bio: Some("x".repeat(350)),
            ..Default::default()
        };
        let offer = Offer {
            name: "AI Outreach Automation".to_string(),
            value_props: vec!["24/7 outreach".to_string(), "6x meetings".to_string()],
            ideal_use_cases: vec!["B2B SaaS".to_string()],
            ..Default::default()
        };

        let request = build_request(&lead, &offer);

        assert!(request
            .prompt
            .contains("Value Propositions: 24/7 outreach, 6x meetings"));
        assert!(request.prompt.contains("Name: Ava Patel\nRole: Head of Growth"));
        assert!(!request.prompt.contains("Company:"));
        assert!(request
            .prompt
            .contains(&format!("LinkedIn Bio: {}...", "x".repeat(300))));
        assert_eq!(request.max_tokens, 150);
        assert_eq!(request.temperature, 0.3);
    }
}
