use sqlx::{postgres::PgPoolOptions, PgPool};

/// Tables are created idempotently on startup; there is no separate migration step.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS offers (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        value_props JSONB NOT NULL DEFAULT '[]'::jsonb,
        ideal_use_cases JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leads (
        id BIGSERIAL PRIMARY KEY,
        name TEXT,
        role TEXT,
        company TEXT,
        industry TEXT,
        location TEXT,
        linkedin_bio TEXT,
        batch_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS leads_batch_id_idx ON leads (batch_id)",
    r#"
    CREATE TABLE IF NOT EXISTS lead_scores (
        lead_id BIGINT PRIMARY KEY REFERENCES leads (id) ON DELETE CASCADE,
        offer_id BIGINT NOT NULL REFERENCES offers (id) ON DELETE CASCADE,
        role_score INTEGER NOT NULL CHECK (role_score BETWEEN 0 AND 20),
        industry_score INTEGER NOT NULL CHECK (industry_score BETWEEN 0 AND 20),
        completeness_score INTEGER NOT NULL CHECK (completeness_score BETWEEN 0 AND 10),
        ai_score INTEGER NOT NULL CHECK (ai_score BETWEEN 0 AND 50),
        ai_intent TEXT NOT NULL,
        ai_reasoning TEXT NOT NULL,
        total_score INTEGER NOT NULL CHECK (total_score BETWEEN 0 AND 100),
        intent_label TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS lead_scores_offer_id_idx ON lead_scores (offer_id)",
];

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::debug!("Database schema ensured ({} statements)", SCHEMA.len());

        Ok(Self { pool })
    }
}
