#![cfg_attr(not(feature = "std"), no_std)]

//! Binary contract for FUF bytecode images.
//!
//! An image is a fixed 24-byte header followed by variable-length records:
//!
//! ```text
//! 0   magic         "FUF\0"
//! 4   version       u16 (0x0100)
//! 6   checksum      u32, sum of bytes mod 256
//! 10  state_count   u16
//! 12  gait_count    u16
//! 14  event_count   u16
//! 16  sensor_count  u16
//! 18  memory_size   u32
//! 22  flags         u16 (reserved, 0)
//! 24  records...
//! ```
//!
//! All integers are little-endian. Record kinds are implied by identifier
//! range, see [`ids`] and [`record`].

extern crate alloc;

use core::fmt;
use core::str::FromStr;

pub mod record;

pub use record::{decode_records, Record, RecordKind};

pub const HEADER_LEN: usize = 24;
pub const CHECKSUM_LEN: usize = 4;

pub const MAGIC: [u8; 4] = *b"FUF\0";
pub const FORMAT_VERSION: u16 = 0x0100;
pub const DEFAULT_MEMORY_SIZE: u32 = 256;

pub const OFFSET_MAGIC: usize = 0;
pub const OFFSET_VERSION: usize = 4;
pub const OFFSET_CHECKSUM: usize = 6;
pub const OFFSET_LEGACY_CHECKSUM: usize = 8;
pub const OFFSET_STATE_COUNT: usize = 10;
pub const OFFSET_GAIT_COUNT: usize = 12;
pub const OFFSET_EVENT_COUNT: usize = 14;
pub const OFFSET_SENSOR_COUNT: usize = 16;
pub const OFFSET_MEMORY_SIZE: usize = 18;
pub const OFFSET_FLAGS: usize = 22;

/// Identifier ranges. Every identifier is a single byte.
pub mod ids {
    /// Event target written when the named state is not declared.
    pub const UNRESOLVED_STATE: u8 = 0x00;

    pub const SENSOR_FIRST: u8 = 0x01;
    pub const SENSOR_LAST: u8 = 0xFF;
    pub const STATE_FIRST: u8 = 0x10;
    pub const STATE_LAST: u8 = 0x1F;
    pub const GAIT_FIRST: u8 = 0x20;
    pub const GAIT_LAST: u8 = 0x2F;
    pub const EVENT_FIRST: u8 = 0x30;
    pub const EVENT_LAST: u8 = 0xFF;

    /// Upper bound on identifiers assigned across all tables of one image.
    pub const MAX_IDENTIFIERS: usize = 256;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FufHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub checksum: u32,
    pub state_count: u16,
    pub gait_count: u16,
    pub event_count: u16,
    pub sensor_count: u16,
    pub memory_size: u32,
    pub flags: u16,
}

impl FufHeader {
    /// Header with zeroed counts and checksum, as written before any record.
    pub fn new(memory_size: u32) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            checksum: 0,
            state_count: 0,
            gait_count: 0,
            event_count: 0,
            sensor_count: 0,
            memory_size,
            flags: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[OFFSET_MAGIC..OFFSET_MAGIC + 4].copy_from_slice(&self.magic);
        write_u16(&mut out, OFFSET_VERSION, self.version);
        write_u32(&mut out, OFFSET_CHECKSUM, self.checksum);
        write_u16(&mut out, OFFSET_STATE_COUNT, self.state_count);
        write_u16(&mut out, OFFSET_GAIT_COUNT, self.gait_count);
        write_u16(&mut out, OFFSET_EVENT_COUNT, self.event_count);
        write_u16(&mut out, OFFSET_SENSOR_COUNT, self.sensor_count);
        write_u32(&mut out, OFFSET_MEMORY_SIZE, self.memory_size);
        write_u16(&mut out, OFFSET_FLAGS, self.flags);
        out
    }

    /// Reads the header at the start of an image. Trailing bytes are ignored.
    ///
    /// The checksum field is read from the corrected slot; for legacy images
    /// use [`ChecksumLayout::stored`] instead.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContractError> {
        if bytes.len() < HEADER_LEN {
            return Err(ContractError::InvalidLength);
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[OFFSET_MAGIC..OFFSET_MAGIC + 4]);
        let header = Self {
            magic,
            version: read_u16(bytes, OFFSET_VERSION),
            checksum: read_u32(bytes, OFFSET_CHECKSUM),
            state_count: read_u16(bytes, OFFSET_STATE_COUNT),
            gait_count: read_u16(bytes, OFFSET_GAIT_COUNT),
            event_count: read_u16(bytes, OFFSET_EVENT_COUNT),
            sensor_count: read_u16(bytes, OFFSET_SENSOR_COUNT),
            memory_size: read_u32(bytes, OFFSET_MEMORY_SIZE),
            flags: read_u16(bytes, OFFSET_FLAGS),
        };
        header.validate()?;
        Ok(header)
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        if self.magic != MAGIC {
            return Err(ContractError::InvalidMagic);
        }
        if self.version != FORMAT_VERSION {
            return Err(ContractError::InvalidVersion);
        }
        if self.flags != 0 {
            return Err(ContractError::ReservedFieldNonZero);
        }
        Ok(())
    }
}

/// Where the checksum lives and how it is summed.
///
/// `Corrected` keeps every header field intact: the slot at offset 6 is
/// zeroed, the whole image summed, and the result stored in the slot.
///
/// `Legacy` matches images written by earlier compilers byte for
/// byte: the image is summed with the slot still zero and the result is
/// stored at offset 8, clobbering bytes 8..12 and with them `state_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChecksumLayout {
    #[default]
    Corrected,
    Legacy,
}

impl ChecksumLayout {
    pub const fn offset(self) -> usize {
        match self {
            ChecksumLayout::Corrected => OFFSET_CHECKSUM,
            ChecksumLayout::Legacy => OFFSET_LEGACY_CHECKSUM,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChecksumLayout::Corrected => "corrected",
            ChecksumLayout::Legacy => "legacy",
        }
    }

    /// Computes the checksum of a finished image and writes it in place.
    pub fn stamp(self, image: &mut [u8]) -> Result<u32, ContractError> {
        if image.len() < HEADER_LEN {
            return Err(ContractError::InvalidLength);
        }
        if self == ChecksumLayout::Corrected {
            patch_u32(image, OFFSET_CHECKSUM, 0)?;
        }
        let checksum = checksum8(image);
        patch_u32(image, self.offset(), checksum)?;
        Ok(checksum)
    }

    /// Reads the stored checksum without verifying it.
    pub fn stored(self, image: &[u8]) -> Result<u32, ContractError> {
        let offset = self.offset();
        if image.len() < offset + CHECKSUM_LEN {
            return Err(ContractError::InvalidLength);
        }
        Ok(read_u32(image, offset))
    }
}

impl fmt::Display for ChecksumLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumLayout {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "corrected" => Ok(ChecksumLayout::Corrected),
            "legacy" => Ok(ChecksumLayout::Legacy),
            _ => Err(ContractError::UnknownLayout),
        }
    }
}

/// Sum of all bytes modulo 256, widened to the 4-byte field width.
pub fn checksum8(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) as u32
}

/// Recomputes the checksum of `image` and compares it with the stored one.
///
/// Legacy images lost their `state_count` bytes to the checksum write, so
/// the count is recovered from the decoded state records before summing.
pub fn verify_checksum(image: &[u8], layout: ChecksumLayout) -> Result<u32, ContractError> {
    let stored = layout.stored(image)?;
    let computed = match layout {
        ChecksumLayout::Corrected => {
            let slot = &image[OFFSET_CHECKSUM..OFFSET_CHECKSUM + CHECKSUM_LEN];
            checksum8(image).wrapping_sub(checksum8(slot)) & 0xFF
        }
        ChecksumLayout::Legacy => {
            let states = decode_records(image)?
                .iter()
                .filter(|record| record.kind() == RecordKind::State)
                .count() as u16;
            let clobbered = OFFSET_LEGACY_CHECKSUM..OFFSET_LEGACY_CHECKSUM + CHECKSUM_LEN;
            let mut sum = checksum8(&image[..clobbered.start]) as u8;
            sum = sum.wrapping_add(checksum8(&image[clobbered.end..]) as u8);
            for byte in states.to_le_bytes() {
                sum = sum.wrapping_add(byte);
            }
            sum as u32
        }
    };
    if stored != computed {
        return Err(ContractError::ChecksumMismatch { stored, computed });
    }
    Ok(stored)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractError {
    InvalidLength,
    InvalidMagic,
    InvalidVersion,
    ReservedFieldNonZero,
    UnknownLayout,
    Truncated { offset: usize },
    MissingTerminator { offset: usize },
    InvalidUtf8 { offset: usize },
    UnknownRecordId { offset: usize, id: u8 },
    OffsetOutOfBounds { offset: usize, len: usize },
    ChecksumMismatch { stored: u32, computed: u32 },
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::InvalidLength => write!(f, "image shorter than the {HEADER_LEN}-byte header"),
            ContractError::InvalidMagic => write!(f, "bad magic, expected FUF\\0"),
            ContractError::InvalidVersion => {
                write!(f, "unsupported format version, expected {FORMAT_VERSION:#06x}")
            }
            ContractError::ReservedFieldNonZero => write!(f, "reserved flags are non-zero"),
            ContractError::UnknownLayout => {
                write!(f, "unknown checksum layout, expected corrected or legacy")
            }
            ContractError::Truncated { offset } => write!(f, "record truncated at offset {offset}"),
            ContractError::MissingTerminator { offset } => {
                write!(f, "string at offset {offset} is not NUL-terminated")
            }
            ContractError::InvalidUtf8 { offset } => {
                write!(f, "string at offset {offset} is not valid UTF-8")
            }
            ContractError::UnknownRecordId { offset, id } => {
                write!(f, "identifier {id:#04x} at offset {offset} is outside every record range")
            }
            ContractError::OffsetOutOfBounds { offset, len } => {
                write!(f, "offset {offset} out of bounds for {len}-byte buffer")
            }
            ContractError::ChecksumMismatch { stored, computed } => {
                write!(f, "checksum mismatch: stored {stored:#04x}, computed {computed:#04x}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ContractError {}

/// Bounds-checked little-endian write used for backpatching.
pub fn patch_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<(), ContractError> {
    check_bounds(buf, offset, 2)?;
    write_u16(buf, offset, value);
    Ok(())
}

/// Bounds-checked little-endian write used for backpatching.
pub fn patch_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<(), ContractError> {
    check_bounds(buf, offset, 4)?;
    write_u32(buf, offset, value);
    Ok(())
}

fn check_bounds(buf: &[u8], offset: usize, width: usize) -> Result<(), ContractError> {
    match offset.checked_add(width) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(ContractError::OffsetOutOfBounds {
            offset,
            len: buf.len(),
        }),
    }
}

fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
