//! Adalians contract event decoder.
//!
//! Neither event declares `#[key]` members, so the payload is `keys[1..]`
//! followed by `data`, read front to back in ABI member order.

use std::collections::HashMap;

use starkindex_core::decoder::EventDecoder;
use starkindex_core::error::IndexerError;
use starkindex_core::record::{
    CrewmatePurchased, CrewmateRecruited, DecodedRecord, EntityRef, EventKind, RecordMeta,
};
use starkindex_core::types::EventLog;

use crate::felt::{normalize, starknet_keccak, FeltError, FeltReader};

/// Decodes `CrewmatePurchased` and `CrewmateRecruitedV1`.
pub struct AdaliansDecoder {
    by_selector: HashMap<String, EventKind>,
}

impl AdaliansDecoder {
    pub fn new() -> Self {
        let by_selector = EventKind::ALL
            .into_iter()
            .map(|kind| (starknet_keccak(kind.name()), kind))
            .collect();
        Self { by_selector }
    }
}

impl Default for AdaliansDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn entity((label, id): (String, String)) -> EntityRef {
    EntityRef { label, id }
}

fn meta(log: &EventLog) -> RecordMeta {
    RecordMeta {
        block_number: log.block_number,
        block_hash: log.block_hash.clone(),
        block_timestamp: None,
        transaction_hash: log.transaction_hash.clone(),
    }
}

fn purchased(log: &EventLog, r: &mut FeltReader<'_>) -> Result<DecodedRecord, FeltError> {
    Ok(DecodedRecord::CrewmatePurchased(CrewmatePurchased {
        meta: meta(log),
        crewmate: entity(r.entity()?),
        caller: r.address()?,
    }))
}

fn recruited(log: &EventLog, r: &mut FeltReader<'_>) -> Result<DecodedRecord, FeltError> {
    Ok(DecodedRecord::CrewmateRecruitedV1(CrewmateRecruited {
        meta: meta(log),
        crewmate: entity(r.entity()?),
        collection: r.hex()?,
        class: r.hex()?,
        title: r.hex()?,
        impactful: r.span()?,
        cosmetic: r.span()?,
        gender: r.hex()?,
        body: r.hex()?,
        face: r.hex()?,
        hair: r.hex()?,
        hair_color: r.hex()?,
        clothes: r.hex()?,
        head: r.hex()?,
        item: r.hex()?,
        name: r.short_string()?,
        station: entity(r.entity()?),
        composition: r.span()?,
        caller_crew: entity(r.entity()?),
        caller: r.address()?,
    }))
}

impl EventDecoder for AdaliansDecoder {
    fn selector(&self, kind: EventKind) -> String {
        starknet_keccak(kind.name())
    }

    fn event_name(&self, log: &EventLog) -> Result<EventKind, IndexerError> {
        let selector = log.selector().map(normalize).unwrap_or_default();
        self.by_selector
            .get(&selector)
            .copied()
            .ok_or(IndexerError::UnknownEventKind { name: selector })
    }

    fn decode(&self, event_name: &str, log: &EventLog) -> Result<DecodedRecord, IndexerError> {
        let kind: EventKind = event_name.parse()?;
        let mut reader = FeltReader::new(log.keys.iter().skip(1).chain(log.data.iter()));
        let decoded = match kind {
            EventKind::CrewmatePurchased => purchased(log, &mut reader),
            EventKind::CrewmateRecruitedV1 => recruited(log, &mut reader),
        };
        let to_decode_error = |e: FeltError| IndexerError::Decode {
            event: event_name.to_string(),
            reason: e.to_string(),
        };
        let record = decoded.map_err(to_decode_error)?;
        reader.finish().map_err(to_decode_error)?;
        Ok(record)
    }
}
