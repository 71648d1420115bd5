//! Storage abstractions consumed by the scoring engine and the HTTP layer.
//!
//! Implemented by [`crate::db_storage::PgStorage`] (Postgres) and
//! [`crate::memory_storage::InMemoryStorage`].

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Lead, LeadScore, NewLead, NewOffer, Offer, ScoreFilter, ScoredLead};

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Stores a batch of leads, returning them with their assigned ids in input order.
    async fn insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>, AppError>;
    async fn leads_by_batch(&self, batch_id: &str) -> Result<Vec<Lead>, AppError>;
    async fn all_leads(&self) -> Result<Vec<Lead>, AppError>;
    async fn lead(&self, id: i64) -> Result<Option<Lead>, AppError>;
}

#[async_trait]
pub trait OfferStore: Send + Sync {
    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer, AppError>;
    async fn offer(&self, id: i64) -> Result<Option<Offer>, AppError>;
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Inserts or replaces the score for `score.lead_id()`.
    ///
    /// A lead has at most one score. Replacing keeps the original `created_at`; the returned
    /// value is the score as stored.
    async fn upsert_score(&self, score: LeadScore) -> Result<LeadScore, AppError>;

    /// Scores matching `filter`, highest total first, newest first among ties.
    async fn scores(&self, filter: &ScoreFilter) -> Result<Vec<ScoredLead>, AppError>;
}

/// Everything the service needs from persistence.
pub trait Storage: LeadStore + OfferStore + ScoreStore {}

impl<T: LeadStore + OfferStore + ScoreStore> Storage for T {}
