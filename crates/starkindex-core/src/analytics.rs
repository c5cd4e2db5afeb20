//! Read-only aggregation passes over stored records.
//!
//! Output order is first-seen order of each group, so repeated runs over the
//! same file produce byte-identical JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IndexerError;
use crate::record::{DecodedRecord, EventKind};

/// One leaderboard row. `points_data` is always an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub address: String,
    pub score: u64,
    pub points_data: Value,
}

impl LeaderboardEntry {
    fn new(address: String, score: u64) -> Self {
        Self {
            address,
            score,
            points_data: Value::Object(Map::new()),
        }
    }
}

fn tally<I>(keys: I) -> IndexMap<String, u64>
where
    I: IntoIterator<Item = String>,
{
    let mut counts = IndexMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Leaderboard for one event kind.
///
/// Purchases are scored per caller; recruitments per crewmate class name.
/// Recruitments with an unknown class code are scored under the raw code.
pub fn leaderboard(records: &[DecodedRecord], kind: EventKind) -> Vec<LeaderboardEntry> {
    let keys = records.iter().filter_map(|r| match (kind, r) {
        (EventKind::CrewmatePurchased, DecodedRecord::CrewmatePurchased(p)) => Some(p.caller.clone()),
        (EventKind::CrewmateRecruitedV1, DecodedRecord::CrewmateRecruitedV1(c)) => Some(
            c.class_name()
                .map(str::to_string)
                .unwrap_or_else(|| c.class.clone()),
        ),
        _ => None,
    });
    tally(keys)
        .into_iter()
        .map(|(address, score)| LeaderboardEntry::new(address, score))
        .collect()
}

/// Leaderboard scoring every record once for its caller, whatever its kind.
pub fn caller_leaderboard(records: &[DecodedRecord]) -> Vec<LeaderboardEntry> {
    tally(records.iter().map(|r| r.caller().to_string()))
        .into_iter()
        .map(|(address, score)| LeaderboardEntry::new(address, score))
        .collect()
}

/// How often one value of a field occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// `None` groups records that lack the field.
    pub value: Option<String>,
    pub occurrences: u64,
}

impl Occurrence {
    /// `{ <field>: value, "occurrences": n, "points_data": {} }`.
    pub fn to_json(&self, field: &str) -> Value {
        let mut obj = Map::new();
        obj.insert(
            field.to_string(),
            self.value.clone().map(Value::String).unwrap_or(Value::Null),
        );
        obj.insert("occurrences".into(), Value::from(self.occurrences));
        obj.insert("points_data".into(), Value::Object(Map::new()));
        Value::Object(obj)
    }
}

/// Count records per value of `field` (see [`DecodedRecord::attribute`]).
pub fn occurrences(records: &[DecodedRecord], field: &str) -> Vec<Occurrence> {
    let mut counts: IndexMap<Option<String>, u64> = IndexMap::new();
    for record in records {
        *counts.entry(record.attribute(field)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(value, occurrences)| Occurrence { value, occurrences })
        .collect()
}

/// Records as JSON with the recruitment `class` code replaced by its name.
///
/// Records of other kinds pass through unchanged.
pub fn map_class_attributes(records: &[DecodedRecord]) -> Result<Vec<Value>, IndexerError> {
    records
        .iter()
        .map(|record| {
            let mut value =
                serde_json::to_value(record).map_err(|e| IndexerError::Other(e.to_string()))?;
            if let DecodedRecord::CrewmateRecruitedV1(r) = record {
                if let (Some(name), Some(obj)) = (r.class_name(), value.as_object_mut()) {
                    obj.insert("class".into(), Value::String(name.to_string()));
                }
            }
            Ok(value)
        })
        .collect()
}
