use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::errors::{AppError, ResultExt};
use crate::models::{
    AiAssessment, Intent, Lead, LeadScore, NewLead, NewOffer, Offer, RuleScores, ScoreFilter,
    ScoredLead,
};
use crate::storage::{LeadStore, OfferStore, ScoreStore};

const LEAD_COLUMNS: &str =
    "id, name, role, company, industry, location, linkedin_bio, batch_id, created_at";

/// Postgres-backed storage for offers, leads and scores.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OfferRow {
    id: i64,
    name: String,
    value_props: Json<Vec<String>>,
    ideal_use_cases: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Offer {
            id: row.id,
            name: row.name,
            value_props: row.value_props.0,
            ideal_use_cases: row.ideal_use_cases.0,
            created_at: row.created_at,
        }
    }
}

/// Joined lead + score row. Stored totals are not read back: the score is rebuilt from its
/// sub-scores so the derived fields are always consistent.
#[derive(Debug, FromRow)]
struct ScoredLeadRow {
    id: i64,
    name: Option<String>,
    role: Option<String>,
    company: Option<String>,
    industry: Option<String>,
    location: Option<String>,
    linkedin_bio: Option<String>,
    batch_id: String,
    created_at: DateTime<Utc>,
    offer_id: i64,
    role_score: i32,
    industry_score: i32,
    completeness_score: i32,
    ai_score: i32,
    ai_intent: String,
    ai_reasoning: String,
    scored_at: DateTime<Utc>,
}

impl TryFrom<ScoredLeadRow> for ScoredLead {
    type Error = AppError;

    fn try_from(row: ScoredLeadRow) -> Result<Self, Self::Error> {
        let intent: Intent = row
            .ai_intent
            .parse()
            .map_err(|_| {
                AppError::InternalError(format!(
                    "Stored score for lead {} has invalid intent '{}'",
                    row.id, row.ai_intent
                ))
            })?;

        let score = LeadScore::new(
            row.id,
            row.offer_id,
            RuleScores {
                role: row.role_score,
                industry: row.industry_score,
                completeness: row.completeness_score,
            },
            AiAssessment {
                score: row.ai_score,
                intent,
                reasoning: row.ai_reasoning,
            },
        )
        .with_created_at(row.scored_at);

        let lead = Lead {
            id: row.id,
            name: row.name,
            role: row.role,
            company: row.company,
            industry: row.industry,
            location: row.location,
            linkedin_bio: row.linkedin_bio,
            batch_id: row.batch_id,
            created_at: row.created_at,
        };

        Ok(ScoredLead { lead, score })
    }
}

#[async_trait]
impl LeadStore for PgStorage {
    /// Inserts all leads in one transaction; either the whole upload is stored or none of it.
    async fn insert_leads(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>, AppError> {
        let mut tx = self.pool.begin().await.context("begin lead insert")?;
        let mut stored = Vec::with_capacity(leads.len());

        for lead in leads {
            let row = sqlx::query_as::<_, Lead>(&format!(
                r#"
                INSERT INTO leads (name, role, company, industry, location, linkedin_bio, batch_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                LEAD_COLUMNS
            ))
            .bind(&lead.name)
            .bind(&lead.role)
            .bind(&lead.company)
            .bind(&lead.industry)
            .bind(&lead.location)
            .bind(&lead.linkedin_bio)
            .bind(&lead.batch_id)
            .fetch_one(&mut *tx)
            .await
            .context("insert lead")?;
            stored.push(row);
        }

        tx.commit().await.context("commit lead insert")?;
        tracing::debug!("Stored {} leads", stored.len());
        Ok(stored)
    }

    async fn leads_by_batch(&self, batch_id: &str) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {} FROM leads WHERE batch_id = $1 ORDER BY id",
            LEAD_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    async fn all_leads(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {} FROM leads ORDER BY id",
            LEAD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    async fn lead(&self, id: i64) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }
}

#[async_trait]
impl OfferStore for PgStorage {
    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer, AppError> {
        let row = sqlx::query_as::<_, OfferRow>(
            r#"
            INSERT INTO offers (name, value_props, ideal_use_cases)
            VALUES ($1, $2, $3)
            RETURNING id, name, value_props, ideal_use_cases, created_at
            "#,
        )
        .bind(&offer.name)
        .bind(Json(&offer.value_props))
        .bind(Json(&offer.ideal_use_cases))
        .fetch_one(&self.pool)
        .await
        .context("insert offer")?;
        Ok(row.into())
    }

    async fn offer(&self, id: i64) -> Result<Option<Offer>, AppError> {
        let row = sqlx::query_as::<_, OfferRow>(
            "SELECT id, name, value_props, ideal_use_cases, created_at FROM offers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Offer::from))
    }
}

#[async_trait]
impl ScoreStore for PgStorage {
    /// Single-statement upsert; Postgres row locking on the `lead_id` key serializes
    /// concurrent writers for the same lead.
    async fn upsert_score(&self, score: LeadScore) -> Result<LeadScore, AppError> {
        let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO lead_scores (
                lead_id, offer_id, role_score, industry_score, completeness_score,
                ai_score, ai_intent, ai_reasoning, total_score, intent_label, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (lead_id) DO UPDATE SET
                offer_id = EXCLUDED.offer_id,
                role_score = EXCLUDED.role_score,
                industry_score = EXCLUDED.industry_score,
                completeness_score = EXCLUDED.completeness_score,
                ai_score = EXCLUDED.ai_score,
                ai_intent = EXCLUDED.ai_intent,
                ai_reasoning = EXCLUDED.ai_reasoning,
                total_score = EXCLUDED.total_score,
                intent_label = EXCLUDED.intent_label
            RETURNING created_at
            "#,
        )
        .bind(score.lead_id())
        .bind(score.offer_id())
        .bind(score.role_score())
        .bind(score.industry_score())
        .bind(score.completeness_score())
        .bind(score.ai_score())
        .bind(score.ai_intent().as_str())
        .bind(score.ai_reasoning())
        .bind(score.total_score())
        .bind(score.intent_label().as_str())
        .bind(score.created_at())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("upsert score for lead {}", score.lead_id()))?;

        Ok(score.with_created_at(created_at))
    }

    async fn scores(&self, filter: &ScoreFilter) -> Result<Vec<ScoredLead>, AppError> {
        let rows = sqlx::query_as::<_, ScoredLeadRow>(
            r#"
            SELECT
                l.id, l.name, l.role, l.company, l.industry, l.location, l.linkedin_bio,
                l.batch_id, l.created_at,
                s.offer_id, s.role_score, s.industry_score, s.completeness_score,
                s.ai_score, s.ai_intent, s.ai_reasoning, s.created_at AS scored_at
            FROM lead_scores s
            JOIN leads l ON l.id = s.lead_id
            WHERE ($1::BIGINT IS NULL OR s.offer_id = $1)
              AND ($2::TEXT IS NULL OR l.batch_id = $2)
              AND ($3::TEXT IS NULL OR s.intent_label = $3)
            ORDER BY s.total_score DESC, s.created_at DESC, l.id ASC
            "#,
        )
        .bind(filter.offer_id)
        .bind(filter.batch_id.as_deref())
        .bind(filter.intent.map(Intent::as_str))
        .fetch_all(&self.pool)
        .await
        .context("list scores")?;

        rows.into_iter().map(ScoredLead::try_from).collect()
    }
}
