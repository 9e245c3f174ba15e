//! # copa_core - Event normalization and entity indexing
//!
//! Turns loosely-typed football event records (one per on-pitch action) into
//! canonical event documents and derives three indexes from them in one
//! ordered pass: teams, players and matches. Also computes per-team shot KPIs
//! from committed events.
//!
//! ## Modules
//! - `literal` - stringified list/dict/tuple columns back to JSON values
//! - `normalize` - per-record canonicalization (subdocuments, id typing, event_id)
//! - `entities` - canonical ids, the entity accumulator and finished documents
//! - `pipeline` - normalize → accumulate → materialize over a batch
//! - `kpi` - team shot metrics over committed events
//!
//! No I/O happens here; reading input and writing documents belongs to the loader.

pub mod entities;
pub mod error;
pub mod kpi;
pub mod literal;
pub mod normalize;
pub mod pipeline;

/// One JSON object with field order preserved.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use entities::{
    EntityAccumulator, EntityId, EntityIndex, MatchDocument, PlayerDocument, TeamDocument,
    TeamRef,
};
pub use error::LiteralError;
pub use kpi::{compute_team_kpis, is_team_level, KpiDocument, TeamMetrics};
pub use literal::{coerce, parse_literal};
pub use normalize::{normalize, normalize_all};
pub use pipeline::{process_records, ProcessedBatch};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
