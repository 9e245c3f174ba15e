//! Copa Loader Library
//!
//! Input JSON → normalized events + team/player/match indexes → document store,
//! and the team KPI refresh over the committed events.

pub mod config;
pub mod error;
pub mod input;
pub mod store;

use chrono::Utc;
use copa_core::{compute_team_kpis, is_team_level, process_records, Document};
use serde::{Deserialize, Serialize};

pub use config::{CollectionNames, ConfigError, PipelineConfig};
pub use error::LoadError;
pub use input::{read_records, InputRecords};
pub use store::{DocumentStore, JsonLinesStore, Manifest, MemoryStore, StoreError};

/// Outcome of one load run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub records_read: usize,
    pub records_normalized: usize,
    pub records_skipped: usize,
    pub events_written: usize,
    pub teams_written: usize,
    pub players_written: usize,
    pub matches_written: usize,
}

/// Outcome of one KPI refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub events_scanned: usize,
    pub removed: usize,
    pub written: usize,
}

/// Serialize typed documents into store documents.
pub fn to_documents<T: Serialize>(items: &[T]) -> Result<Vec<Document>, StoreError> {
    items
        .iter()
        .map(|item| -> Result<Document, StoreError> {
            Ok(serde_json::from_value(serde_json::to_value(item)?)?)
        })
        .collect()
}

/// Read, normalize, index and replace the four destinations.
///
/// The input is fully read and validated before the store is touched, so
/// configuration errors leave existing collections as they were.
pub fn run_load<S: DocumentStore>(
    config: &PipelineConfig,
    store: &mut S,
) -> Result<LoadReport, LoadError> {
    config.validate()?;
    let input = read_records(&config.input_path)?;
    if input.skipped > 0 {
        log::warn!("Skipped {} non-object input elements", input.skipped);
    }

    let batch = process_records(&input.records);
    let teams = to_documents(&batch.index.teams)?;
    let players = to_documents(&batch.index.players)?;
    let matches = to_documents(&batch.index.matches)?;

    let names = &config.collections;
    let report = LoadReport {
        records_read: input.records.len() + input.skipped,
        records_normalized: batch.events.len(),
        records_skipped: input.skipped,
        events_written: store.replace_collection(&names.events, &batch.events)?,
        teams_written: store.replace_collection(&names.teams, &teams)?,
        players_written: store.replace_collection(&names.players, &players)?,
        matches_written: store.replace_collection(&names.matches, &matches)?,
    };

    log::info!(
        "Loaded {} events, {} teams, {} players, {} matches",
        report.events_written,
        report.teams_written,
        report.players_written,
        report.matches_written
    );
    Ok(report)
}

/// Recompute team-level shot KPIs from the committed events.
///
/// Other KPI levels in the collection are left alone.
pub fn run_kpis<S: DocumentStore>(
    config: &PipelineConfig,
    store: &mut S,
) -> Result<KpiReport, LoadError> {
    config.validate()?;
    let names = &config.collections;

    let events = store.load_collection(&names.events)?;
    let kpis = to_documents(&compute_team_kpis(&events, Utc::now()))?;

    let removed = store.delete_where(&names.kpis, &is_team_level)?;
    let written = if kpis.is_empty() {
        0
    } else {
        store.insert_many(&names.kpis, &kpis)?
    };

    log::info!(
        "Refreshed team KPIs: {} groups written, {} replaced ({} events scanned)",
        written,
        removed,
        events.len()
    );
    Ok(KpiReport {
        events_scanned: events.len(),
        removed,
        written,
    })
}

/// Per-collection summary for `inspect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStatus {
    pub role: String,
    pub collection: String,
    pub document_count: usize,
    /// Manifest write time; `None` for collections never written.
    pub written_at: Option<String>,
    /// `None` when verification was not requested.
    pub verified: Option<bool>,
}

pub fn inspect_store(
    config: &PipelineConfig,
    store: &JsonLinesStore,
    verify: bool,
) -> Result<Vec<CollectionStatus>, LoadError> {
    let names = &config.collections;
    let manifest = store.manifest()?;
    let roles = [
        ("events", &names.events),
        ("teams", &names.teams),
        ("players", &names.players),
        ("matches", &names.matches),
        ("kpis", &names.kpis),
    ];

    let mut statuses = Vec::with_capacity(roles.len());
    for (role, collection) in roles {
        let verified = if verify {
            Some(store.verify(collection)?)
        } else {
            None
        };
        statuses.push(CollectionStatus {
            role: role.to_string(),
            collection: collection.clone(),
            document_count: store.count(collection)?,
            written_at: manifest
                .collections
                .get(collection.as_str())
                .map(|entry| entry.written_at.clone()),
            verified,
        });
    }
    Ok(statuses)
}
