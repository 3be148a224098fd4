// Status frame encoding, byte stuffing and decoding
//
// Layout (unescaped):
//   0x9A | tag ("A1.0" or legacy "A1.") | 0x9E | u16 LE fields | flags | CRC16 LE
// The CRC covers every preceding byte of the unescaped frame.

use super::crc::crc16_ccitt_false;
use crate::config::FrameFormat;
use crate::measurement::MeasurementSnapshot;
use crate::safety::SafetyState;
use heapless::Vec;

pub const START_BYTE: u8 = 0x9A;
pub const ESCAPE_BYTE: u8 = 0x9B;
pub const ESCAPED_START: u8 = 0x01;
pub const ESCAPED_ESCAPE: u8 = 0x02;
pub const SEPARATOR: u8 = 0x9E;

pub const VERSION_TAG: &[u8; TAG_LEN] = b"A1.0";
pub const LEGACY_VERSION_TAG: &[u8; LEGACY_TAG_LEN] = b"A1.";

const TAG_LEN: usize = 4;
const LEGACY_TAG_LEN: usize = 3;
const CRC_LEN: usize = 2;

/// Unescaped length of a current-format frame
pub const STATUS_FRAME_LEN: usize = 1 + TAG_LEN + 1 + 6 * 2 + 2 + CRC_LEN;
/// Unescaped length of a legacy frame
pub const LEGACY_FRAME_LEN: usize = 1 + LEGACY_TAG_LEN + 1 + 4 * 2 + CRC_LEN;
/// Upper bound once every byte after the start byte is escaped
pub const MAX_ESCAPED_LEN: usize = 1 + (STATUS_FRAME_LEN - 1) * 2;

pub type RawFrame = Vec<u8, STATUS_FRAME_LEN>;
pub type EscapedFrame = Vec<u8, MAX_ESCAPED_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    LengthMismatch,
    InvalidStart(u8),
    InvalidTag,
    InvalidSeparator(u8),
    InvalidCrc,
    InvalidEscape(u8),
    BufferTooSmall,
}

/// Scaled (×1000) readings and flags carried by a status frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFields {
    pub battery_mv: u16,
    pub battery_ma: u16,
    pub array_mv: u16,
    pub array_ma: u16,
    pub load_mv: u16,
    pub load_ma: u16,
    pub battery_fault: bool,
    pub over_temperature: bool,
}

impl StatusFields {
    pub fn from_measurements(snapshot: &MeasurementSnapshot, safety: &SafetyState) -> Self {
        Self {
            battery_mv: milli(snapshot.battery_voltage),
            battery_ma: milli(snapshot.battery_current),
            array_mv: milli(snapshot.array_voltage),
            array_ma: milli(snapshot.array_current),
            load_mv: milli(snapshot.load_voltage),
            load_ma: milli(snapshot.load_current),
            battery_fault: safety.battery_fault(),
            over_temperature: safety.over_temperature,
        }
    }
}

/// ×1000, truncated; negative and NaN map to 0, overflow saturates
fn milli(value: f32) -> u16 {
    (value * 1000.0) as u16
}

fn push_all<const N: usize>(out: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), FrameError> {
    out.extend_from_slice(bytes)
        .map_err(|_| FrameError::BufferTooSmall)
}

/// Build the unescaped frame including its CRC
pub fn encode_status_frame(fields: &StatusFields, format: FrameFormat) -> Result<RawFrame, FrameError> {
    let mut out = RawFrame::new();
    push_all(&mut out, &[START_BYTE])?;

    match format {
        FrameFormat::Current => push_all(&mut out, VERSION_TAG)?,
        FrameFormat::Legacy => push_all(&mut out, LEGACY_VERSION_TAG)?,
    }
    push_all(&mut out, &[SEPARATOR])?;

    push_all(&mut out, &fields.battery_mv.to_le_bytes())?;
    push_all(&mut out, &fields.battery_ma.to_le_bytes())?;
    push_all(&mut out, &fields.array_mv.to_le_bytes())?;
    push_all(&mut out, &fields.array_ma.to_le_bytes())?;

    if format == FrameFormat::Current {
        push_all(&mut out, &fields.load_mv.to_le_bytes())?;
        push_all(&mut out, &fields.load_ma.to_le_bytes())?;
        push_all(
            &mut out,
            &[fields.battery_fault as u8, fields.over_temperature as u8],
        )?;
    }

    let crc = crc16_ccitt_false(&out);
    push_all(&mut out, &crc.to_le_bytes())?;
    Ok(out)
}

/// Byte-stuff a frame for transmission
///
/// `0x9A` after position 0 becomes `0x9B 0x01`, `0x9B` becomes `0x9B 0x02`.
pub fn escape(raw: &[u8]) -> Result<EscapedFrame, FrameError> {
    let mut out = EscapedFrame::new();
    for (i, &byte) in raw.iter().enumerate() {
        match byte {
            START_BYTE if i != 0 => push_all(&mut out, &[ESCAPE_BYTE, ESCAPED_START])?,
            ESCAPE_BYTE => push_all(&mut out, &[ESCAPE_BYTE, ESCAPED_ESCAPE])?,
            _ => push_all(&mut out, &[byte])?,
        }
    }
    Ok(out)
}

/// Reverse `escape`
pub fn unescape<const N: usize>(escaped: &[u8]) -> Result<Vec<u8, N>, FrameError> {
    let mut out = Vec::new();
    let mut bytes = escaped.iter();
    while let Some(&byte) = bytes.next() {
        let decoded = if byte == ESCAPE_BYTE {
            match bytes.next() {
                Some(&ESCAPED_START) => START_BYTE,
                Some(&ESCAPED_ESCAPE) => ESCAPE_BYTE,
                Some(&other) => return Err(FrameError::InvalidEscape(other)),
                None => return Err(FrameError::LengthMismatch),
            }
        } else {
            byte
        };
        out.push(decoded).map_err(|_| FrameError::BufferTooSmall)?;
    }
    Ok(out)
}

/// Encode, then escape
pub fn build_status_frame(fields: &StatusFields, format: FrameFormat) -> Result<EscapedFrame, FrameError> {
    let raw = encode_status_frame(fields, format)?;
    escape(&raw)
}

/// Validate and parse an unescaped status frame
///
/// Legacy frames carry no load readings or flags; those fields decode as zero.
pub fn decode_status_frame(raw: &[u8]) -> Result<(FrameFormat, StatusFields), FrameError> {
    let (format, tag_len) = match raw.len() {
        STATUS_FRAME_LEN => (FrameFormat::Current, TAG_LEN),
        LEGACY_FRAME_LEN => (FrameFormat::Legacy, LEGACY_TAG_LEN),
        _ => return Err(FrameError::LengthMismatch),
    };

    if raw[0] != START_BYTE {
        return Err(FrameError::InvalidStart(raw[0]));
    }
    let tag = &raw[1..1 + tag_len];
    let tag_ok = match format {
        FrameFormat::Current => tag == VERSION_TAG,
        FrameFormat::Legacy => tag == LEGACY_VERSION_TAG,
    };
    if !tag_ok {
        return Err(FrameError::InvalidTag);
    }
    let separator = raw[1 + tag_len];
    if separator != SEPARATOR {
        return Err(FrameError::InvalidSeparator(separator));
    }

    let body_len = raw.len() - CRC_LEN;
    let crc_frame = u16::from_le_bytes([raw[body_len], raw[body_len + 1]]);
    if crc16_ccitt_false(&raw[..body_len]) != crc_frame {
        return Err(FrameError::InvalidCrc);
    }

    let payload = &raw[2 + tag_len..body_len];
    let word = |i: usize| u16::from_le_bytes([payload[2 * i], payload[2 * i + 1]]);

    let mut fields = StatusFields {
        battery_mv: word(0),
        battery_ma: word(1),
        array_mv: word(2),
        array_ma: word(3),
        ..Default::default()
    };
    if format == FrameFormat::Current {
        fields.load_mv = word(4);
        fields.load_ma = word(5);
        fields.battery_fault = payload[12] != 0;
        fields.over_temperature = payload[13] != 0;
    }

    Ok((format, fields))
}
