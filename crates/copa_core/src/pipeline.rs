//! Normalize → accumulate → materialize, over one batch of raw records.

use crate::entities::{EntityAccumulator, EntityIndex};
use crate::normalize::normalize_all;
use crate::Document;

/// Everything a load run commits: the normalized events and the derived
/// indexes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedBatch {
    pub events: Vec<Document>,
    pub index: EntityIndex,
}

/// Normalization runs on the rayon pool; accumulation then walks the
/// normalized events in their original order on the calling thread.
pub fn process_records(records: &[Document]) -> ProcessedBatch {
    let events = normalize_all(records);

    let mut accumulator = EntityAccumulator::new();
    accumulator.extend(events.iter());
    log::debug!(
        "Accumulated {} events: {} teams, {} players, {} matches",
        accumulator.observed(),
        accumulator.team_count(),
        accumulator.player_count(),
        accumulator.match_count()
    );

    ProcessedBatch {
        events,
        index: accumulator.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityId;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("test fixture must be an object")
    }

    #[test]
    fn test_float_ids_index_as_one_entity() {
        let records = vec![
            doc(json!({"id": "e1", "team_id": 779.0, "team": "Argentina", "player_id": 5503.0,
                       "player": "Messi", "match_id": 3943043.0, "type": "Pass"})),
            doc(json!({"id": "e2", "team_id": 779, "team": "Argentina", "player_id": 5503,
                       "player": "Messi", "match_id": 3943043, "type": "Shot"})),
        ];

        let batch = process_records(&records);
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.events[0]["team_id"], json!(779));
        assert_eq!(batch.events[1]["event_id"], json!("e2"));

        assert_eq!(batch.index.teams.len(), 1);
        assert_eq!(batch.index.players.len(), 1);
        assert_eq!(batch.index.matches.len(), 1);
        let team = batch.index.team(&EntityId::Int(779)).unwrap();
        assert_eq!(team.players, vec![EntityId::Int(5503)]);
        assert_eq!(team.matches, vec![EntityId::Int(3943043)]);
    }

    #[test]
    fn test_backfill_depends_on_stream_order() {
        let records = vec![
            doc(json!({"player_id": 10, "player": "", "match_id": 1})),
            doc(json!({"player_id": 10, "player": "Messi", "match_id": 2})),
        ];
        let batch = process_records(&records);
        let player = batch.index.player(&EntityId::Int(10)).unwrap();
        assert_eq!(player.name, "Messi");
        assert_eq!(player.matches, vec![EntityId::Int(1), EntityId::Int(2)]);
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(process_records(&[]), ProcessedBatch::default());
    }
}
