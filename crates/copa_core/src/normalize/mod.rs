//! # Event Normalizer
//!
//! Turns one raw event record into its canonical document:
//!
//! 1. literal coercion of the list and dict columns
//! 2. prefixed subdocuments for `pass`, `shot`, `carry`, `dribble`, `clearance`
//! 3. integral floats in the id columns become integers (`38718.0` → `38718`),
//!    including their subdocument copies (`pass.recipient_id`)
//! 4. `event_id` mirrors `id`
//!
//! Every step only adds or rewrites fields; no field of the record is dropped.

pub mod subdoc;

use rayon::prelude::*;
use serde_json::Value;

use crate::entities::id::integral_i64;
use crate::literal::coerce_in_place;
use crate::Document;

pub use subdoc::extract_subdocument;

/// Columns exported as stringified lists.
pub const LIST_FIELDS: [&str; 5] = [
    "location",
    "pass_end_location",
    "carry_end_location",
    "shot_end_location",
    "related_events",
];

/// Columns exported as stringified dicts.
pub const DICT_FIELDS: [&str; 1] = ["tactics"];

/// Subdocument prefixes, in extraction order.
pub const SUBDOCUMENT_PREFIXES: [&str; 5] = ["pass", "shot", "carry", "dribble", "clearance"];

/// Identifier columns that must not stay floating point when integral.
pub const ID_FIELDS: [&str; 4] = ["player_id", "pass_recipient_id", "team_id", "match_id"];

pub const SOURCE_ID_FIELD: &str = "id";
pub const EVENT_ID_FIELD: &str = "event_id";

/// Normalize a single record. The input is not modified.
pub fn normalize(record: &Document) -> Document {
    let mut event = record.clone();

    for field in LIST_FIELDS.iter().chain(DICT_FIELDS.iter()) {
        if let Some(value) = event.get_mut(*field) {
            coerce_in_place(value);
        }
    }

    for prefix in SUBDOCUMENT_PREFIXES {
        extract_subdocument(&mut event, prefix);
    }

    for field in ID_FIELDS {
        if let Some(value) = event.get_mut(field) {
            integral_float_to_int(value);
        }
        if let Some(value) = subdocument_mirror(&mut event, field) {
            integral_float_to_int(value);
        }
    }

    // Overwrites any event_id already on the record.
    if let Some(id) = event.get(SOURCE_ID_FIELD).cloned() {
        event.insert(EVENT_ID_FIELD.to_string(), id);
    }

    event
}

/// Normalize a batch on the rayon pool. Output order matches input order.
pub fn normalize_all(records: &[Document]) -> Vec<Document> {
    records.par_iter().map(normalize).collect()
}

/// The copy of `field` inside its subdocument (`pass_recipient_id` →
/// `pass.recipient_id`), when there is one.
fn subdocument_mirror<'a>(event: &'a mut Document, field: &str) -> Option<&'a mut Value> {
    let (prefix, suffix) = SUBDOCUMENT_PREFIXES.iter().find_map(|prefix| {
        field
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|suffix| (*prefix, suffix))
    })?;
    event.get_mut(prefix)?.as_object_mut()?.get_mut(suffix)
}

fn integral_float_to_int(value: &mut Value) {
    if let Value::Number(number) = value {
        if number.is_f64() {
            if let Some(int) = number.as_f64().and_then(integral_i64) {
                *value = Value::from(int);
            }
        }
    }
}
