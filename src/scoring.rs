//! Scoring workflow shared by the HTTP handlers and the batch binary.
//!
//! 1. Rule sub-scores (pure, see `rules`)
//! 2. Intent classification (AI backend or fallback, see `intent`)
//! 3. Combine into a `LeadScore` and upsert it
use futures::future::join_all;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::intent::{classifier_from_config, IntentClassifier};
use crate::models::{Lead, LeadScore, Offer};
use crate::rules::score_rules;
use crate::storage::Storage;

const DEFAULT_CONCURRENCY: usize = 4;

/// A lead that could not be scored in a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLead {
    pub lead_id: i64,
    pub lead_name: String,
    pub error: String,
}

impl SkippedLead {
    /// Line used in the `errors` list of the score response.
    pub fn describe(&self) -> String {
        format!("Lead {} ({}): {}", self.lead_id, self.lead_name, self.error)
    }
}

/// Result of scoring a list of leads.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Stored scores, in input order.
    pub scored: Vec<LeadScore>,
    pub skipped: Vec<SkippedLead>,
}

pub struct ScoringEngine {
    store: Arc<dyn Storage>,
    classifier: Arc<dyn IntentClassifier>,
    concurrency: usize,
}

impl ScoringEngine {
    pub fn new(store: Arc<dyn Storage>, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self::with_concurrency(store, classifier, DEFAULT_CONCURRENCY)
    }

    /// `concurrency` is the number of leads scored at once in batch runs (minimum 1).
    pub fn with_concurrency(
        store: Arc<dyn Storage>,
        classifier: Arc<dyn IntentClassifier>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            classifier,
            concurrency: concurrency.max(1),
        }
    }

    /// Builds the engine with the classifier the configuration selects.
    pub fn from_config(config: &Config, store: Arc<dyn Storage>) -> Result<Self, AppError> {
        let classifier = classifier_from_config(config)?;
        Ok(Self::with_concurrency(
            store,
            classifier,
            config.scoring_concurrency,
        ))
    }

    /// Computes a score without persisting it. Never fails: missing lead fields score as zero
    /// and classifier failures fall back to rule-derived values.
    pub async fn evaluate(&self, lead: &Lead, offer: &Offer) -> LeadScore {
        let rules = score_rules(lead, offer);
        let ai = self.classifier.classify(lead, offer, &rules).await;
        LeadScore::new(lead.id, offer.id, rules, ai)
    }

    /// Scores a lead and upserts the result. Only a storage failure is returned as an error.
    pub async fn score(&self, lead: &Lead, offer: &Offer) -> Result<LeadScore, AppError> {
        let score = self.evaluate(lead, offer).await;
        let stored = self.store.upsert_score(score).await?;

        tracing::debug!(
            "Scored lead {} against offer {}: total={} label={}",
            lead.id,
            offer.id,
            stored.total_score(),
            stored.intent_label()
        );
        Ok(stored)
    }

    /// Scores each lead independently; a lead that fails is logged and reported in
    /// `skipped` while the rest continue.
    pub async fn score_leads(&self, leads: &[Lead], offer: &Offer) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for chunk in leads.chunks(self.concurrency) {
            let results = join_all(chunk.iter().map(|lead| self.score(lead, offer))).await;

            for (lead, result) in chunk.iter().zip(results) {
                match result {
                    Ok(score) => outcome.scored.push(score),
                    Err(e) => {
                        tracing::error!("Failed to score lead {}: {}", lead.id, e);
                        outcome.skipped.push(SkippedLead {
                            lead_id: lead.id,
                            lead_name: lead.display_name().to_string(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            "Scored {}/{} leads against offer {} ({} skipped)",
            outcome.scored.len(),
            leads.len(),
            offer.id,
            outcome.skipped.len()
        );
        outcome
    }

    /// Scores every lead tagged with `batch_id`. Returns the successfully stored subset;
    /// if the batch cannot be loaded at all the result is empty.
    pub async fn score_batch(&self, batch_id: &str, offer: &Offer) -> Vec<LeadScore> {
        let leads = match self.store.leads_by_batch(batch_id).await {
            Ok(leads) => leads,
            Err(e) => {
                tracing::error!("Failed to load leads for batch {}: {}", batch_id, e);
                return Vec::new();
            }
        };

        self.score_leads(&leads, offer).await.scored
    }
}
