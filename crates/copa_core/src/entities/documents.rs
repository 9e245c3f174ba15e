//! # Materializer
//!
//! Final, immutable entity documents. Set-valued fields come out sorted;
//! team associations keep the order in which they were first seen.

use serde::{Deserialize, Serialize};

use super::accumulator::{EntityAccumulator, TeamNames};
use super::id::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub team_id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDocument {
    pub team_id: EntityId,
    pub name: String,
    pub players: Vec<EntityId>,
    pub matches: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDocument {
    pub player_id: EntityId,
    pub name: String,
    pub teams: Vec<TeamRef>,
    pub positions: Vec<String>,
    pub matches: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDocument {
    pub match_id: EntityId,
    pub teams: Vec<TeamRef>,
    pub players: Vec<EntityId>,
}

/// The three derived indexes, each sorted by its key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIndex {
    pub teams: Vec<TeamDocument>,
    pub players: Vec<PlayerDocument>,
    pub matches: Vec<MatchDocument>,
}

impl EntityIndex {
    pub fn team(&self, team_id: &EntityId) -> Option<&TeamDocument> {
        self.teams.iter().find(|doc| &doc.team_id == team_id)
    }

    pub fn player(&self, player_id: &EntityId) -> Option<&PlayerDocument> {
        self.players.iter().find(|doc| &doc.player_id == player_id)
    }

    pub fn match_doc(&self, match_id: &EntityId) -> Option<&MatchDocument> {
        self.matches.iter().find(|doc| &doc.match_id == match_id)
    }
}

fn team_refs(names: TeamNames) -> Vec<TeamRef> {
    names
        .into_entries()
        .into_iter()
        .map(|(team_id, name)| TeamRef { team_id, name })
        .collect()
}

impl EntityAccumulator {
    /// Consume the accumulator and emit the finished documents.
    ///
    /// Players that never received a non-empty name are left out.
    pub fn finish(self) -> EntityIndex {
        let mut teams: Vec<TeamDocument> = self
            .teams
            .into_iter()
            .map(|(team_id, entry)| TeamDocument {
                team_id,
                name: entry.name,
                players: entry.players.into_iter().collect(),
                matches: entry.matches.into_iter().collect(),
            })
            .collect();
        teams.sort_by(|a, b| a.team_id.cmp(&b.team_id));

        let unnamed = self.players.values().filter(|p| p.name.is_empty()).count();
        if unnamed > 0 {
            log::debug!("Dropping {} player(s) never seen with a name", unnamed);
        }

        let mut players: Vec<PlayerDocument> = self
            .players
            .into_iter()
            .filter(|(_, entry)| !entry.name.is_empty())
            .map(|(player_id, entry)| PlayerDocument {
                player_id,
                name: entry.name,
                teams: team_refs(entry.teams),
                positions: entry.positions.into_iter().collect(),
                matches: entry.matches.into_iter().collect(),
            })
            .collect();
        players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

        let mut matches: Vec<MatchDocument> = self
            .matches
            .into_iter()
            .map(|(match_id, entry)| MatchDocument {
                match_id,
                teams: team_refs(entry.teams),
                players: entry.players.into_iter().collect(),
            })
            .collect();
        matches.sort_by(|a, b| a.match_id.cmp(&b.match_id));

        EntityIndex {
            teams,
            players,
            matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("test fixture must be an object")
    }

    fn index_of(events: &[Value]) -> EntityIndex {
        let mut acc = EntityAccumulator::new();
        for event in events {
            acc.observe(&doc(event.clone()));
        }
        acc.finish()
    }

    #[test]
    fn test_team_document_sorted_and_deduplicated() {
        let index = index_of(&[
            json!({"team_id": 7, "team": "X", "player_id": 11, "match_id": 100}),
            json!({"team_id": 7, "team": "X", "player_id": 9, "match_id": 100}),
        ]);

        let team = index.team(&EntityId::Int(7)).unwrap();
        assert_eq!(
            serde_json::to_value(team).unwrap(),
            json!({"team_id": 7, "name": "X", "players": [9, 11], "matches": [100]})
        );
    }

    #[test]
    fn test_player_backfilled_name_and_matches() {
        let index = index_of(&[
            json!({"player_id": 10, "player": "", "match_id": 1}),
            json!({"player_id": 10, "player": "Messi", "match_id": 2}),
        ]);

        let player = index.player(&EntityId::Int(10)).unwrap();
        assert_eq!(player.name, "Messi");
        assert_eq!(player.matches, vec![EntityId::Int(1), EntityId::Int(2)]);
    }

    #[test]
    fn test_never_named_player_is_not_materialized() {
        let index = index_of(&[json!({"player_id": 10, "player": "", "match_id": 1})]);
        assert!(index.players.is_empty());
        // the match still knows about the player
        assert_eq!(index.matches[0].players, vec![EntityId::Int(10)]);
    }

    #[test]
    fn test_player_document_shape() {
        let index = index_of(&[
            json!({"player_id": 5503, "player": "Lionel Andrés Messi Cuccittini", "position": "Right Wing",
                   "team_id": 779, "team": "Argentina", "match_id": 3943077}),
            json!({"player_id": 5503, "player": "Lionel Andrés Messi Cuccittini", "position": "Center Forward",
                   "team_id": 779, "team": "Argentina", "match_id": 3943043}),
        ]);

        assert_eq!(
            serde_json::to_value(&index.players[0]).unwrap(),
            json!({
                "player_id": 5503,
                "name": "Lionel Andrés Messi Cuccittini",
                "teams": [{"team_id": 779, "name": "Argentina"}],
                "positions": ["Center Forward", "Right Wing"],
                "matches": [3943043, 3943077],
            })
        );
    }

    #[test]
    fn test_match_document_keeps_team_insertion_order() {
        let index = index_of(&[
            json!({"match_id": 1, "team_id": 20, "team": "Home", "player_id": 3}),
            json!({"match_id": 1, "team_id": 10, "team": "Away", "player_id": 1}),
            json!({"match_id": 1, "team_id": 20, "team": "Home FC"}),
        ]);

        assert_eq!(
            serde_json::to_value(&index.matches[0]).unwrap(),
            json!({
                "match_id": 1,
                "teams": [{"team_id": 20, "name": "Home FC"}, {"team_id": 10, "name": "Away"}],
                "players": [1, 3],
            })
        );
    }

    #[test]
    fn test_documents_sorted_by_key() {
        let index = index_of(&[
            json!({"match_id": 30}),
            json!({"match_id": 10}),
            json!({"match_id": 20}),
        ]);
        let ids: Vec<EntityId> = index.matches.iter().map(|m| m.match_id.clone()).collect();
        assert_eq!(ids, vec![EntityId::Int(10), EntityId::Int(20), EntityId::Int(30)]);
    }

    #[test]
    fn test_empty_stream() {
        assert_eq!(EntityAccumulator::new().finish(), EntityIndex::default());
    }
}
