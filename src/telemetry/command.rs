// Inbound host commands
//
// Frame: 0x9A | command | payload, with the same byte stuffing as status
// frames. Command 0x00 carries a big-endian u16 power-cycle timeout [s]
// followed by a u8 off time [s].

use super::frame::{ESCAPED_ESCAPE, ESCAPED_START, ESCAPE_BYTE, START_BYTE};
use heapless::Vec;

pub const CMD_POWER_CYCLE: u8 = 0x00;

/// Longest command frame (start + command + payload)
pub const MAX_COMMAND_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    UnknownCommand(u8),
    InvalidEscape(u8),
    LengthMismatch,
    MissingStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Arm the load power-cycle watchdog
    PowerCycle { timeout_s: u16, off_time_s: u8 },
    /// Timeout 0x0000 or 0xFFFF
    DisablePowerCycle,
}

/// Frame length for a command byte, including start and command bytes
fn frame_len(command: u8) -> Option<usize> {
    match command {
        CMD_POWER_CYCLE => Some(5),
        _ => None,
    }
}

/// Parse an unescaped command frame
pub fn parse_command(frame: &[u8]) -> Result<Command, CommandError> {
    if frame.first() != Some(&START_BYTE) {
        return Err(CommandError::MissingStart);
    }
    let command = *frame.get(1).ok_or(CommandError::LengthMismatch)?;
    let expected = frame_len(command).ok_or(CommandError::UnknownCommand(command))?;
    if frame.len() != expected {
        return Err(CommandError::LengthMismatch);
    }

    match command {
        CMD_POWER_CYCLE => {
            let timeout_s = u16::from_be_bytes([frame[2], frame[3]]);
            let off_time_s = frame[4];
            if timeout_s == 0x0000 || timeout_s == 0xFFFF {
                Ok(Command::DisablePowerCycle)
            } else {
                Ok(Command::PowerCycle {
                    timeout_s,
                    off_time_s,
                })
            }
        }
        other => Err(CommandError::UnknownCommand(other)),
    }
}

/// Byte-at-a-time command frame decoder
///
/// A start byte always begins a new frame, discarding any partial one.
pub struct CommandDecoder {
    buffer: Vec<u8, MAX_COMMAND_LEN>,
    escaping: bool,
}

impl CommandDecoder {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            escaping: false,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.escaping = false;
    }

    /// Feed one received byte
    ///
    /// # Returns
    /// * `Ok(Some(frame))` - a complete unescaped frame
    /// * `Ok(None)` - more bytes needed (or idle between frames)
    /// * `Err(_)` - the partial frame was discarded
    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8, MAX_COMMAND_LEN>>, CommandError> {
        if byte == START_BYTE {
            self.reset();
            self.store(START_BYTE)?;
            return Ok(None);
        }

        if self.buffer.is_empty() {
            // 開始バイト待ち
            return Ok(None);
        }

        let decoded = if self.escaping {
            self.escaping = false;
            match byte {
                ESCAPED_START => START_BYTE,
                ESCAPED_ESCAPE => ESCAPE_BYTE,
                other => {
                    self.reset();
                    return Err(CommandError::InvalidEscape(other));
                }
            }
        } else if byte == ESCAPE_BYTE {
            self.escaping = true;
            return Ok(None);
        } else {
            byte
        };

        self.store(decoded)?;

        let command = self.buffer[1];
        let Some(expected) = frame_len(command) else {
            self.reset();
            return Err(CommandError::UnknownCommand(command));
        };

        if self.buffer.len() < expected {
            return Ok(None);
        }

        let frame = self.buffer.clone();
        self.reset();
        Ok(Some(frame))
    }

    fn store(&mut self, byte: u8) -> Result<(), CommandError> {
        self.buffer.push(byte).map_err(|_| {
            self.buffer.clear();
            self.escaping = false;
            CommandError::LengthMismatch
        })
    }
}
