// floki-compiler/src/assembler.rs
// FUF image assembly: header placeholder, record stream, backpatching

use fuf_contract::{
    patch_u16, ChecksumLayout, FufHeader, Record, RecordKind, OFFSET_EVENT_COUNT,
    OFFSET_GAIT_COUNT, OFFSET_SENSOR_COUNT, OFFSET_STATE_COUNT,
};
use serde::Serialize;
use tracing::debug;

use crate::error::CompileError;

/// Per-kind record totals, as written into the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub states: u16,
    pub gaits: u16,
    pub events: u16,
    pub sensors: u16,
}

impl RecordCounts {
    fn bump(&mut self, kind: RecordKind) -> Result<(), CompileError> {
        let slot = match kind {
            RecordKind::Sensor => &mut self.sensors,
            RecordKind::State => &mut self.states,
            RecordKind::Gait => &mut self.gaits,
            RecordKind::Event => &mut self.events,
        };
        *slot = slot
            .checked_add(1)
            .ok_or_else(|| CompileError::Assembly(format!("{:?} count overflows u16", kind)))?;
        Ok(())
    }
}

/// Owns the output buffer of one compilation.
///
/// The header is written up front with zero counts; [`Assembler::finish`]
/// backpatches the counts and stamps the checksum once every record is in.
pub struct Assembler {
    buffer: Vec<u8>,
    layout: ChecksumLayout,
    counts: RecordCounts,
}

impl Assembler {
    pub fn new(memory_size: u32, layout: ChecksumLayout) -> Self {
        let buffer = FufHeader::new(memory_size).to_bytes().to_vec();
        Self {
            buffer,
            layout,
            counts: RecordCounts::default(),
        }
    }

    pub fn append(&mut self, record: &Record) -> Result<(), CompileError> {
        self.counts.bump(record.kind())?;
        let offset = self.buffer.len();
        record.encode_into(&mut self.buffer);
        debug!(
            offset,
            id = record.id(),
            kind = ?record.kind(),
            len = self.buffer.len() - offset,
            "record"
        );
        Ok(())
    }

    /// Records appended so far.
    pub fn counts(&self) -> RecordCounts {
        self.counts
    }

    /// Backpatches the counts, stamps the checksum and hands back the image.
    ///
    /// `expected` holds the final table sizes; it must agree with the
    /// records actually appended.
    pub fn finish(mut self, expected: RecordCounts) -> Result<(Vec<u8>, u32), CompileError> {
        if expected != self.counts {
            return Err(CompileError::Assembly(format!(
                "table sizes {:?} disagree with appended records {:?}",
                expected, self.counts
            )));
        }

        self.patch(OFFSET_STATE_COUNT, expected.states)?;
        self.patch(OFFSET_GAIT_COUNT, expected.gaits)?;
        self.patch(OFFSET_EVENT_COUNT, expected.events)?;
        self.patch(OFFSET_SENSOR_COUNT, expected.sensors)?;

        let checksum = self.layout.stamp(&mut self.buffer)?;
        debug!(
            size = self.buffer.len(),
            checksum,
            layout = %self.layout,
            "image sealed"
        );
        Ok((self.buffer, checksum))
    }

    fn patch(&mut self, offset: usize, value: u16) -> Result<(), CompileError> {
        patch_u16(&mut self.buffer, offset, value).map_err(|e| {
            CompileError::Assembly(format!("backpatch at offset {}: {}", offset, e))
        })
    }
}
