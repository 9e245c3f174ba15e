//! # Entity Accumulator
//!
//! One ordered pass over normalized events builds three indexes at once:
//! teams, players and matches. Later events may overwrite what earlier ones
//! recorded (name back-fill, last team name per id), so observation order is
//! the stream order and the fold runs on a single thread.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::id::EntityId;
use crate::Document;

pub const TEAM_ID_FIELD: &str = "team_id";
pub const TEAM_NAME_FIELD: &str = "team";
pub const PLAYER_ID_FIELD: &str = "player_id";
pub const PLAYER_NAME_FIELD: &str = "player";
pub const POSITION_FIELD: &str = "position";
pub const MATCH_ID_FIELD: &str = "match_id";

/// team_id → team name, in first-insertion order. Re-recording an id replaces
/// its name in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct TeamNames(Vec<(EntityId, String)>);

impl TeamNames {
    fn record(&mut self, team_id: &EntityId, name: &str) {
        match self.0.iter_mut().find(|(id, _)| id == team_id) {
            Some((_, existing)) => *existing = name.to_string(),
            None => self.0.push((team_id.clone(), name.to_string())),
        }
    }

    pub(super) fn into_entries(self) -> Vec<(EntityId, String)> {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(super) struct TeamEntry {
    pub(super) name: String,
    pub(super) players: BTreeSet<EntityId>,
    pub(super) matches: BTreeSet<EntityId>,
}

#[derive(Debug, Clone)]
pub(super) struct PlayerEntry {
    pub(super) name: String,
    pub(super) teams: TeamNames,
    pub(super) positions: BTreeSet<String>,
    pub(super) matches: BTreeSet<EntityId>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct MatchEntry {
    pub(super) teams: TeamNames,
    pub(super) players: BTreeSet<EntityId>,
}

/// The entity-relevant fields of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EventKeys<'a> {
    pub team_id: Option<EntityId>,
    pub team: Option<&'a str>,
    pub player_id: Option<EntityId>,
    pub player: Option<&'a str>,
    pub position: Option<&'a str>,
    pub match_id: Option<EntityId>,
}

impl<'a> EventKeys<'a> {
    pub fn from_event(event: &'a Document) -> Self {
        Self {
            team_id: id_field(event, TEAM_ID_FIELD),
            team: text_field(event, TEAM_NAME_FIELD),
            player_id: id_field(event, PLAYER_ID_FIELD),
            player: text_field(event, PLAYER_NAME_FIELD),
            position: text_field(event, POSITION_FIELD),
            match_id: id_field(event, MATCH_ID_FIELD),
        }
    }

    /// Team name when it is usable as a canonical name.
    fn team_name(&self) -> Option<&'a str> {
        self.team.filter(|name| !name.is_empty())
    }
}

fn id_field(event: &Document, field: &str) -> Option<EntityId> {
    let value = event.get(field)?;
    let id = EntityId::from_value(value);
    if id.is_none() && !value.is_null() {
        log::debug!("Ignoring {} with unsupported shape: {}", field, value);
    }
    id
}

fn text_field<'a>(event: &'a Document, field: &str) -> Option<&'a str> {
    event.get(field).and_then(Value::as_str)
}

/// Stateful visitor over the normalized event stream.
///
/// The maps are only reachable through [`EntityAccumulator::observe`] and
/// [`EntityAccumulator::finish`].
#[derive(Debug, Default)]
pub struct EntityAccumulator {
    pub(super) teams: FxHashMap<EntityId, TeamEntry>,
    pub(super) players: FxHashMap<EntityId, PlayerEntry>,
    pub(super) matches: FxHashMap<EntityId, MatchEntry>,
    observed: usize,
}

impl EntityAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the indexes. Call once per event, in stream order.
    pub fn observe(&mut self, event: &Document) {
        let keys = EventKeys::from_event(event);
        self.observe_keys(&keys);
    }

    pub(crate) fn observe_keys(&mut self, keys: &EventKeys<'_>) {
        self.observed += 1;
        self.update_team(keys);
        self.update_player(keys);
        self.update_match(keys);
    }

    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    fn update_team(&mut self, keys: &EventKeys<'_>) {
        let (Some(team_id), Some(name)) = (&keys.team_id, keys.team_name()) else {
            return;
        };

        let entry = self.teams.entry(team_id.clone()).or_insert_with(|| TeamEntry {
            name: name.to_string(),
            players: BTreeSet::new(),
            matches: BTreeSet::new(),
        });
        if let Some(match_id) = &keys.match_id {
            entry.matches.insert(match_id.clone());
        }
        if let Some(player_id) = &keys.player_id {
            entry.players.insert(player_id.clone());
        }
    }

    fn update_player(&mut self, keys: &EventKeys<'_>) {
        // An empty name still opens the entry; it is named by a later event
        // or dropped when the index is materialized.
        let (Some(player_id), Some(name)) = (&keys.player_id, keys.player) else {
            return;
        };

        let entry = self
            .players
            .entry(player_id.clone())
            .or_insert_with(|| PlayerEntry {
                name: name.to_string(),
                teams: TeamNames::default(),
                positions: BTreeSet::new(),
                matches: BTreeSet::new(),
            });

        if entry.name.is_empty() && !name.is_empty() {
            entry.name = name.to_string();
        }
        if let (Some(team_id), Some(team_name)) = (&keys.team_id, keys.team_name()) {
            entry.teams.record(team_id, team_name);
        }
        if let Some(position) = keys.position.filter(|p| !p.is_empty()) {
            entry.positions.insert(position.to_string());
        }
        if let Some(match_id) = &keys.match_id {
            entry.matches.insert(match_id.clone());
        }
    }

    fn update_match(&mut self, keys: &EventKeys<'_>) {
        let Some(match_id) = &keys.match_id else {
            return;
        };

        let entry = self.matches.entry(match_id.clone()).or_default();
        if let (Some(team_id), Some(team_name)) = (&keys.team_id, keys.team_name()) {
            entry.teams.record(team_id, team_name);
        }
        if let Some(player_id) = &keys.player_id {
            entry.players.insert(player_id.clone());
        }
    }
}

impl<'a> Extend<&'a Document> for EntityAccumulator {
    fn extend<I: IntoIterator<Item = &'a Document>>(&mut self, events: I) {
        for event in events {
            self.observe(event);
        }
    }
}
