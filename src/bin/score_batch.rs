//! Utility to (re)score stored leads against an offer from the command line.
//!
//! Usage: `score_batch <offer_id> [batch_id]`. Without a batch id every stored lead is scored.

use std::env;
use std::sync::Arc;

use lead_qualifier::config::Config;
use lead_qualifier::data::db::Database;
use lead_qualifier::data::db_storage::PgStorage;
use lead_qualifier::data::storage::Storage;
use lead_qualifier::obs;
use lead_qualifier::reporting::summarize_reasoning;
use lead_qualifier::scoring::ScoringEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing();

    let mut args = env::args().skip(1);
    let offer_id: i64 = match args.next() {
        Some(raw) => raw.parse()?,
        None => anyhow::bail!("usage: score_batch <offer_id> [batch_id]"),
    };
    let batch_id = args.next();

    let config = Config::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let db = Database::new(&database_url).await?;
    let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(db.pool));

    let offer = storage
        .offer(offer_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Offer with id {} not found", offer_id))?;
    let engine = ScoringEngine::from_config(&config, storage.clone())?;

    let scores = match batch_id.as_deref() {
        Some(batch) => engine.score_batch(batch, &offer).await,
        None => {
            let leads = storage.all_leads().await?;
            let outcome = engine.score_leads(&leads, &offer).await;
            for skipped in &outcome.skipped {
                println!("skipped: {}", skipped.describe());
            }
            outcome.scored
        }
    };

    println!("Scored {} leads against '{}':", scores.len(), offer.name);
    for score in &scores {
        println!(
            "- lead {}: {} ({}) {}",
            score.lead_id(),
            score.total_score(),
            score.intent_label(),
            summarize_reasoning(score)
        );
    }

    Ok(())
}
