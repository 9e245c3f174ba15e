//! # Team KPIs
//!
//! Shot volume per team, computed from committed event documents:
//!
//! - filter `type == "Shot"`
//! - group by `(team_id, team)`
//! - `total_shots`, distinct `match_id` count, `shots_per_match`

use chrono::{DateTime, SecondsFormat, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::accumulator::{MATCH_ID_FIELD, TEAM_ID_FIELD, TEAM_NAME_FIELD};
use crate::entities::EntityId;
use crate::Document;

pub const EVENT_TYPE_FIELD: &str = "type";
pub const SHOT_EVENT_TYPE: &str = "Shot";
pub const LEVEL_FIELD: &str = "level";
pub const TEAM_LEVEL: &str = "team";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    pub total_shots: u64,
    pub matches: u64,
    pub shots_per_match: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiDocument {
    pub level: String,
    pub team_id: Value,
    pub team: Value,
    pub metrics: TeamMetrics,
    /// RFC 3339, UTC.
    pub updated_at: String,
}

/// Whether a stored KPI document belongs to the team level.
pub fn is_team_level(document: &Document) -> bool {
    document.get(LEVEL_FIELD).and_then(Value::as_str) == Some(TEAM_LEVEL)
}

/// Canonical grouping value: integral floats and ints compare equal.
fn canonical(value: Option<&Value>) -> Value {
    match value {
        None => Value::Null,
        Some(value) => match EntityId::from_value(value) {
            Some(id) => id.to_value(),
            None => value.clone(),
        },
    }
}

struct ShotGroup {
    team_id: Value,
    team: Value,
    shots: u64,
    matches: FxHashSet<String>,
}

/// One KPI document per `(team_id, team)` group of shot events, in order of
/// first appearance.
pub fn compute_team_kpis(events: &[Document], updated_at: DateTime<Utc>) -> Vec<KpiDocument> {
    let mut groups: Vec<ShotGroup> = Vec::new();
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();

    for event in events {
        if event.get(EVENT_TYPE_FIELD).and_then(Value::as_str) != Some(SHOT_EVENT_TYPE) {
            continue;
        }

        let team_id = canonical(event.get(TEAM_ID_FIELD));
        let team = canonical(event.get(TEAM_NAME_FIELD));
        let key = format!("{team_id}\u{1f}{team}");

        let slot = *positions.entry(key).or_insert_with(|| {
            groups.push(ShotGroup {
                team_id,
                team,
                shots: 0,
                matches: FxHashSet::default(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.shots += 1;
        match event.get(MATCH_ID_FIELD) {
            None | Some(Value::Null) => {}
            Some(match_id) => {
                group.matches.insert(canonical(Some(match_id)).to_string());
            }
        }
    }

    let updated_at = updated_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    groups
        .into_iter()
        .map(|group| {
            let matches = group.matches.len() as u64;
            let shots_per_match = if matches > 0 {
                group.shots as f64 / matches as f64
            } else {
                0.0
            };
            KpiDocument {
                level: TEAM_LEVEL.to_string(),
                team_id: group.team_id,
                team: group.team,
                metrics: TeamMetrics {
                    total_shots: group.shots,
                    matches,
                    shots_per_match,
                },
                updated_at: updated_at.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("test fixture must be an object")
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 14, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_three_shots_two_matches() {
        let events: Vec<Document> = [
            json!({"type": "Shot", "team_id": 1, "team": "Argentina", "match_id": 10}),
            json!({"type": "Shot", "team_id": 1, "team": "Argentina", "match_id": 10}),
            json!({"type": "Shot", "team_id": 1, "team": "Argentina", "match_id": 11}),
            json!({"type": "Pass", "team_id": 1, "team": "Argentina", "match_id": 12}),
        ]
        .into_iter()
        .map(doc)
        .collect();

        let kpis = compute_team_kpis(&events, at());
        assert_eq!(kpis.len(), 1);
        assert_eq!(
            kpis[0].metrics,
            TeamMetrics {
                total_shots: 3,
                matches: 2,
                shots_per_match: 1.5
            }
        );
        assert_eq!(kpis[0].team_id, json!(1));
        assert_eq!(kpis[0].team, json!("Argentina"));
        assert_eq!(kpis[0].level, "team");
        assert_eq!(kpis[0].updated_at, "2024-07-14T20:00:00.000Z");
    }

    #[test]
    fn test_groups_split_by_team_name() {
        let events: Vec<Document> = [
            json!({"type": "Shot", "team_id": 1, "team": "Colombia", "match_id": 1}),
            json!({"type": "Shot", "team_id": 1.0, "team": "Colombia", "match_id": 2}),
            json!({"type": "Shot", "team_id": 1, "team": "Colombia B", "match_id": 1}),
            json!({"type": "Shot", "team_id": 2, "team": "Uruguay", "match_id": 1}),
        ]
        .into_iter()
        .map(doc)
        .collect();

        let kpis = compute_team_kpis(&events, at());
        let summary: Vec<(Value, Value, u64)> = kpis
            .iter()
            .map(|k| (k.team_id.clone(), k.team.clone(), k.metrics.total_shots))
            .collect();
        assert_eq!(
            summary,
            vec![
                (json!(1), json!("Colombia"), 2),
                (json!(1), json!("Colombia B"), 1),
                (json!(2), json!("Uruguay"), 1),
            ]
        );
    }

    #[test]
    fn test_shots_without_match_id() {
        let events = vec![doc(json!({"type": "Shot", "team_id": 3, "team": "Chile"}))];
        let kpis = compute_team_kpis(&events, at());
        assert_eq!(kpis[0].metrics.matches, 0);
        assert_eq!(kpis[0].metrics.shots_per_match, 0.0);
    }

    #[test]
    fn test_missing_team_fields_group_under_null() {
        let events = vec![doc(json!({"type": "Shot", "match_id": 1}))];
        let kpis = compute_team_kpis(&events, at());
        assert_eq!(kpis[0].team_id, Value::Null);
        assert_eq!(kpis[0].team, Value::Null);
    }

    #[test]
    fn test_no_shots_no_documents() {
        let events = vec![doc(json!({"type": "Pass", "team_id": 1}))];
        assert!(compute_team_kpis(&events, at()).is_empty());
    }

    #[test]
    fn test_kpi_document_shape() {
        let events = vec![doc(json!({"type": "Shot", "team_id": 1, "team": "Peru", "match_id": 5}))];
        let kpis = compute_team_kpis(&events, at());
        assert_eq!(
            serde_json::to_value(&kpis[0]).unwrap(),
            json!({
                "level": "team",
                "team_id": 1,
                "team": "Peru",
                "metrics": {"total_shots": 1, "matches": 1, "shots_per_match": 1.0},
                "updated_at": "2024-07-14T20:00:00.000Z",
            })
        );
        assert!(is_team_level(&doc(serde_json::to_value(&kpis[0]).unwrap())));
        assert!(!is_team_level(&doc(json!({"level": "player"}))));
    }
}
