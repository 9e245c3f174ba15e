//! Derived entity indexes (teams, players, matches).
//!
//! - `id` - canonical identifier type shared by all indexes
//! - `accumulator` - the ordered fold over normalized events
//! - `documents` - finished documents and materialization

pub mod accumulator;
pub mod documents;
pub mod id;

pub use accumulator::EntityAccumulator;
pub use documents::{EntityIndex, MatchDocument, PlayerDocument, TeamDocument, TeamRef};
pub use id::EntityId;
