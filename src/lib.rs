//! Lead Qualifier Library
//!
//! This library scores sales leads against a product offer by combining deterministic
//! rule-based heuristics (role, industry fit, profile completeness) with an optional
//! LLM intent assessment that falls back to rule-derived values when the backend is
//! unconfigured or failing.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `integrations`: External service integrations.
//! - `obs`: Observability and logging.
//! - `ai_client`: Chat-completion client.
//! - `circuit_breaker`: Circuit breaker around the AI backend.
//! - `completion_cache`: Cache of AI completions keyed by prompt hash.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema bootstrap.
//! - `db_storage`: Postgres storage.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `ingest`: CSV lead import.
//! - `intent`: Intent classification (AI-backed and fallback).
//! - `memory_storage`: In-process storage.
//! - `models`: Core data models.
//! - `reporting`: Result listings and CSV export.
//! - `rules`: Rule-based sub-scores.
//! - `scoring`: Scoring engine.
//! - `storage`: Storage traits.

pub mod api;
pub mod core;
pub mod data;
pub mod integrations;
pub mod obs;

// Re-export primary modules for shared use in tests and other binaries
pub mod ai_client;
pub mod circuit_breaker;
pub mod completion_cache;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod intent;
pub mod memory_storage;
pub mod models;
pub mod reporting;
pub mod rules;
pub mod scoring;
pub mod storage;
