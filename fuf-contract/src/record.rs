//! Record encoding.
//!
//! Records carry no type tag. Sensors come first, `sensor_count` of them;
//! every later record is classified by the range its leading id falls in.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{ids, ContractError, FufHeader, HEADER_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecordKind {
    Sensor,
    State,
    Gait,
    Event,
}

impl RecordKind {
    /// Kind of a record following the sensor table, by id range.
    pub fn for_id(id: u8) -> Option<Self> {
        match id {
            ids::STATE_FIRST..=ids::STATE_LAST => Some(RecordKind::State),
            ids::GAIT_FIRST..=ids::GAIT_LAST => Some(RecordKind::Gait),
            ids::EVENT_FIRST..=ids::EVENT_LAST => Some(RecordKind::Event),
            _ => None,
        }
    }
}

/// One serialized table entry. Names and params must not contain NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Record {
    /// `[id][name\0]`
    Sensor { id: u8, name: String },
    /// `[id][name\0][params\0]`
    State { id: u8, name: String, params: String },
    /// `[id][name\0]`
    Gait { id: u8, name: String },
    /// `[id][sensor_id][state_id]`
    Event { id: u8, sensor_id: u8, state_id: u8 },
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Sensor { .. } => RecordKind::Sensor,
            Record::State { .. } => RecordKind::State,
            Record::Gait { .. } => RecordKind::Gait,
            Record::Event { .. } => RecordKind::Event,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Record::Sensor { id, .. }
            | Record::State { id, .. }
            | Record::Gait { id, .. }
            | Record::Event { id, .. } => *id,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Record::Sensor { name, .. } | Record::Gait { name, .. } => 1 + name.len() + 1,
            Record::State { name, params, .. } => 1 + name.len() + 1 + params.len() + 1,
            Record::Event { .. } => 3,
        }
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        match self {
            Record::Sensor { id, name } | Record::Gait { id, name } => {
                out.push(*id);
                push_cstr(out, name);
            }
            Record::State { id, name, params } => {
                out.push(*id);
                push_cstr(out, name);
                push_cstr(out, params);
            }
            Record::Event {
                id,
                sensor_id,
                state_id,
            } => {
                out.extend_from_slice(&[*id, *sensor_id, *state_id]);
            }
        }
    }
}

fn push_cstr(out: &mut Vec<u8>, value: &str) {
    debug_assert!(!value.contains('\0'), "record strings are NUL-terminated");
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

/// Decodes every record of an image in the order it was written.
///
/// Only the header's `sensor_count` is trusted; the remaining counts are
/// not needed to walk the records (and `state_count` is absent from legacy
/// images).
pub fn decode_records(image: &[u8]) -> Result<Vec<Record>, ContractError> {
    let header = FufHeader::from_bytes(image)?;
    let mut cursor = Cursor {
        bytes: image,
        pos: HEADER_LEN,
    };
    let mut records = Vec::new();

    for _ in 0..header.sensor_count {
        let id = cursor.byte()?;
        let name = cursor.cstr()?;
        records.push(Record::Sensor { id, name });
    }

    while !cursor.is_empty() {
        let offset = cursor.pos;
        let id = cursor.byte()?;
        let record = match RecordKind::for_id(id) {
            Some(RecordKind::State) => {
                let name = cursor.cstr()?;
                let params = cursor.cstr()?;
                Record::State { id, name, params }
            }
            Some(RecordKind::Gait) => Record::Gait {
                id,
                name: cursor.cstr()?,
            },
            Some(RecordKind::Event) => Record::Event {
                id,
                sensor_id: cursor.byte()?,
                state_id: cursor.byte()?,
            },
            Some(RecordKind::Sensor) | None => {
                return Err(ContractError::UnknownRecordId { offset, id })
            }
        };
        records.push(record);
    }

    Ok(records)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn byte(&mut self) -> Result<u8, ContractError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(ContractError::Truncated { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn cstr(&mut self) -> Result<String, ContractError> {
        let start = self.pos;
        let rest = self
            .bytes
            .get(start..)
            .ok_or(ContractError::Truncated { offset: start })?;
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(ContractError::MissingTerminator { offset: start })?;
        let text = core::str::from_utf8(&rest[..len])
            .map_err(|_| ContractError::InvalidUtf8 { offset: start })?;
        self.pos = start + len + 1;
        Ok(text.to_string())
    }
}
