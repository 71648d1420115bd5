use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Lead, LeadScore, NewLead, NewOffer, Offer, ScoreFilter, ScoredLead};
use crate::storage::{LeadStore, OfferStore, ScoreStore};

#[derive(Default)]
struct State {
    offers: BTreeMap<i64, Offer>,
    leads: BTreeMap<i64, Lead>,
    scores: HashMap<i64, LeadScore>,
    last_offer_id: i64,
    last_lead_id: i64,
}

/// Process-local store used in tests and when no database is configured.
///
/// Every write takes the single write lock, so two upserts for the same lead never interleave.
#[derive(Default)]
pub struct InMemoryStorage {
    state: RwLock<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored scores.
    pub async fn score_count(&self) -> usize {
        self.state.read().await.scores.len()
    }
}

#[async_trait]
impl LeadStore for InMemoryStorage {
    async fn insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut stored = Vec::with_capacity(leads.len());

        for new in leads {
            state.last_lead_id += 1;
            let lead = Lead {
                id: state.last_lead_id,
                name: new.name,
                role: new.role,
                company: new.company,
                industry: new.industry,
                location: new.location,
                linkedin_bio: new.linkedin_bio,
                batch_id: new.batch_id,
                created_at: now,
            };
            state.leads.insert(lead.id, lead.clone());
            stored.push(lead);
        }

        Ok(stored)
    }

    async fn leads_by_batch(&self, batch_id: &str) -> Result<Vec<Lead>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .leads
            .values()
            .filter(|lead| lead.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn all_leads(&self) -> Result<Vec<Lead>, AppError> {
        Ok(self.state.read().await.leads.values().cloned().collect())
    }

    async fn lead(&self, id: i64) -> Result<Option<Lead>, AppError> {
        Ok(self.state.read().await.leads.get(&id).cloned())
    }
}

#[async_trait]
impl OfferStore for InMemoryStorage {
    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer, AppError> {
        let mut state = self.state.write().await;
        state.last_offer_id += 1;
        let offer = Offer {
            id: state.last_offer_id,
            name: offer.name,
            value_props: offer.value_props,
            ideal_use_cases: offer.ideal_use_cases,
            created_at: Utc::now(),
        };
        state.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    async fn offer(&self, id: i64) -> Result<Option<Offer>, AppError> {
        Ok(self.state.read().await.offers.get(&id).cloned())
    }
}

#[async_trait]
impl ScoreStore for InMemoryStorage {
    async fn upsert_score(&self, score: LeadScore) -> Result<LeadScore, AppError> {
        let mut state = self.state.write().await;
        if !state.leads.contains_key(&score.lead_id()) {
            return Err(AppError::NotFound(format!(
                "Lead with id {} not found",
                score.lead_id()
            )));
        }
        if !state.offers.contains_key(&score.offer_id()) {
            return Err(AppError::NotFound(format!(
                "Offer with id {} not found",
                score.offer_id()
            )));
        }

        let score = match state.scores.get(&score.lead_id()) {
            Some(existing) => score.with_created_at(existing.created_at()),
            None => score,
        };
        state.scores.insert(score.lead_id(), score.clone());
        Ok(score)
    }

    async fn scores(&self, filter: &ScoreFilter) -> Result<Vec<ScoredLead>, AppError> {
        let state = self.state.read().await;
        let mut rows: Vec<ScoredLead> = state
            .scores
            .values()
            .filter_map(|score| {
                state.leads.get(&score.lead_id()).map(|lead| ScoredLead {
                    lead: lead.clone(),
                    score: score.clone(),
                })
            })
            .filter(|row| filter.matches(row))
            .collect();

        rows.sort_by(|a, b| {
            b.score
                .total_score()
                .cmp(&a.score.total_score())
                .then_with(|| b.score.created_at().cmp(&a.score.created_at()))
                .then_with(|| a.lead.id.cmp(&b.lead.id))
        });
        Ok(rows)
    }
}
