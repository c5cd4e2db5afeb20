//! Typed records produced by the event decoder.
//!
//! The set of event kinds is closed: every consumer matches on
//! [`DecodedRecord`] exhaustively, so an unexpected shape is rejected at
//! decode time instead of surfacing later as a missing field.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::IndexerError;
use crate::types::BlockNumber;

// ─── EventKind ───────────────────────────────────────────────────────────────

/// The contract events this crawler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    CrewmatePurchased,
    CrewmateRecruitedV1,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::CrewmatePurchased, EventKind::CrewmateRecruitedV1];

    /// The event name as declared in the contract ABI.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CrewmatePurchased => "CrewmatePurchased",
            Self::CrewmateRecruitedV1 => "CrewmateRecruitedV1",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| IndexerError::UnknownEventKind { name: s.to_string() })
    }
}

// ─── Record payloads ─────────────────────────────────────────────────────────

/// Chain position shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub block_number: BlockNumber,
    pub block_hash: String,
    /// Unix seconds; `None` until resolved through the timestamp cache.
    #[serde(default)]
    pub block_timestamp: Option<i64>,
    pub transaction_hash: String,
}

/// An in-game entity reference: `(label, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type label, bare lowercase hex.
    pub label: String,
    /// Entity id, decimal.
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewmatePurchased {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub crewmate: EntityRef,
    /// `0x`-prefixed account address.
    pub caller: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewmateRecruited {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub crewmate: EntityRef,
    pub collection: String,
    pub class: String,
    pub title: String,
    pub impactful: Vec<String>,
    pub cosmetic: Vec<String>,
    pub gender: String,
    pub body: String,
    pub face: String,
    pub hair: String,
    pub hair_color: String,
    pub clothes: String,
    pub head: String,
    pub item: String,
    pub name: String,
    pub station: EntityRef,
    pub composition: Vec<String>,
    pub caller_crew: EntityRef,
    pub caller: String,
}

impl CrewmateRecruited {
    /// Human-readable crewmate class, if the code is known.
    pub fn class_name(&self) -> Option<&'static str> {
        class_name(&self.class)
    }
}

/// Maps a crewmate class code to its name.
pub fn class_name(code: &str) -> Option<&'static str> {
    match code {
        "1" => Some("pilot"),
        "2" => Some("engineer"),
        "3" => Some("miner"),
        "4" => Some("merchant"),
        "5" => Some("scientist"),
        _ => None,
    }
}

// ─── DecodedRecord ───────────────────────────────────────────────────────────

/// Dedup key: a transaction's events in one block count once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub block_number: BlockNumber,
    pub transaction_hash: String,
}

/// A decoded contract event. Serialized as a flat JSON object with an
/// `"event"` tag carrying the event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum DecodedRecord {
    CrewmatePurchased(CrewmatePurchased),
    CrewmateRecruitedV1(CrewmateRecruited),
}

impl DecodedRecord {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CrewmatePurchased(_) => EventKind::CrewmatePurchased,
            Self::CrewmateRecruitedV1(_) => EventKind::CrewmateRecruitedV1,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Self::CrewmatePurchased(r) => &r.meta,
            Self::CrewmateRecruitedV1(r) => &r.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            Self::CrewmatePurchased(r) => &mut r.meta,
            Self::CrewmateRecruitedV1(r) => &mut r.meta,
        }
    }

    pub fn key(&self) -> RecordKey {
        let meta = self.meta();
        RecordKey {
            block_number: meta.block_number,
            transaction_hash: meta.transaction_hash.clone(),
        }
    }

    pub fn block_number(&self) -> BlockNumber {
        self.meta().block_number
    }

    pub fn set_block_timestamp(&mut self, timestamp: i64) {
        self.meta_mut().block_timestamp = Some(timestamp);
    }

    pub fn caller(&self) -> &str {
        match self {
            Self::CrewmatePurchased(r) => &r.caller,
            Self::CrewmateRecruitedV1(r) => &r.caller,
        }
    }

    /// Scalar attribute lookup by field name, used by occurrence counting.
    /// Entity fields resolve to their id.
    pub fn attribute(&self, field: &str) -> Option<String> {
        let meta = self.meta();
        match field {
            "event" => return Some(self.kind().name().to_string()),
            "block_number" => return Some(meta.block_number.to_string()),
            "block_hash" => return Some(meta.block_hash.clone()),
            "block_timestamp" => return meta.block_timestamp.map(|t| t.to_string()),
            "transaction_hash" => return Some(meta.transaction_hash.clone()),
            "caller" => return Some(self.caller().to_string()),
            _ => {}
        }
        match self {
            Self::CrewmatePurchased(r) => match field {
                "crewmate" => Some(r.crewmate.id.clone()),
                _ => None,
            },
            Self::CrewmateRecruitedV1(r) => {
                let value = match field {
                    "crewmate" => &r.crewmate.id,
                    "collection" => &r.collection,
                    "class" => &r.class,
                    "title" => &r.title,
                    "gender" => &r.gender,
                    "body" => &r.body,
                    "face" => &r.face,
                    "hair" => &r.hair,
                    "hair_color" => &r.hair_color,
                    "clothes" => &r.clothes,
                    "head" => &r.head,
                    "item" => &r.item,
                    "name" => &r.name,
                    "station" => &r.station.id,
                    "caller_crew" => &r.caller_crew.id,
                    _ => return None,
                };
                Some(value.clone())
            }
        }
    }
}
