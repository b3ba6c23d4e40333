// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus-RTU frame codec for the soil probe
//!
//! The probe is always queried with the same 8-byte request
//! (`01 03 00 00 00 07` followed by its CRC16) and answers with a 19-byte
//! frame: a 3-byte header, seven big-endian registers and a little-endian
//! CRC16 computed over everything before it.
//!
//! All functions here are pure.

use crc::{Crc, CRC_16_MODBUS};

use super::Reading;

/// Address of the probe on the serial bus
pub const SLAVE_ADDRESS: u8 = 0x01;
/// Modbus "read holding registers" function code
pub const READ_HOLDING_REGISTERS: u8 = 0x03;
/// First register queried
pub const START_REGISTER: u16 = 0x0000;
/// Number of registers queried
pub const REGISTER_COUNT: u16 = 7;

/// Length of the request frame
pub const REQUEST_LEN: usize = 8;
/// Address, function code and byte count
pub const RESPONSE_HEADER_LEN: usize = 3;
/// Length of the CRC16 trailer
pub const CRC_LEN: usize = 2;
/// Length of a complete answer to [`build_request`]
pub const RESPONSE_LEN: usize = RESPONSE_HEADER_LEN + PAYLOAD_LEN + CRC_LEN;

const PAYLOAD_LEN: usize = REGISTER_COUNT as usize * 2;

const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Errors raised while validating a probe answer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The answer is shorter than a full frame, or its payload is not
    /// exactly seven registers long
    #[error("Truncated frame: expected {expected} bytes, received {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    /// The trailing CRC16 does not match the frame content
    #[error("CRC mismatch: computed 0x{computed:04X}, frame carries 0x{received:04X}")]
    CrcMismatch { computed: u16, received: u16 },

    /// The frame is intact but is not an answer from the probe to a
    /// register read
    #[error("Unexpected frame header: address 0x{address:02X}, function 0x{function:02X}")]
    UnexpectedHeader { address: u8, function: u8 },
}

/// The fixed query sent to the probe on every poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame([u8; REQUEST_LEN]);

impl RequestFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RequestFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Compute the Modbus CRC16 of `data`.
///
/// Reflected polynomial 0xA001, initial value 0xFFFF, no final XOR
/// (CRC-16/MODBUS). The result is sent on the wire low byte first.
pub fn compute_crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Build the request reading registers 0..7 from the probe
pub fn build_request() -> RequestFrame {
    let mut frame = [0u8; REQUEST_LEN];
    frame[0] = SLAVE_ADDRESS;
    frame[1] = READ_HOLDING_REGISTERS;
    frame[2..4].copy_from_slice(&START_REGISTER.to_be_bytes());
    frame[4..6].copy_from_slice(&REGISTER_COUNT.to_be_bytes());
    let crc = compute_crc16(&frame[..REQUEST_LEN - CRC_LEN]);
    frame[REQUEST_LEN - CRC_LEN..].copy_from_slice(&crc.to_le_bytes());
    RequestFrame(frame)
}

/// Validate and decode a probe answer.
///
/// The frame is rejected as a whole on any problem; nothing is ever
/// partially decoded.
///
/// # Errors
///
/// * [`FrameError::TruncatedFrame`] if fewer than [`RESPONSE_LEN`] bytes were
///   received, or if the payload is not exactly seven registers long
/// * [`FrameError::CrcMismatch`] if the trailing CRC16 is wrong
/// * [`FrameError::UnexpectedHeader`] if the frame comes from another slave
///   or answers another function
pub fn decode_response(bytes: &[u8]) -> Result<Reading, FrameError> {
    if bytes.len() < RESPONSE_LEN {
        return Err(FrameError::TruncatedFrame {
            expected: RESPONSE_LEN,
            actual: bytes.len(),
        });
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CRC_LEN);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    let computed = compute_crc16(body);
    if received != computed {
        return Err(FrameError::CrcMismatch { computed, received });
    }

    let (address, function) = (body[0], body[1]);
    if address != SLAVE_ADDRESS || function != READ_HOLDING_REGISTERS {
        return Err(FrameError::UnexpectedHeader { address, function });
    }

    let payload = &body[RESPONSE_HEADER_LEN..];
    if payload.len() != PAYLOAD_LEN || usize::from(body[2]) != PAYLOAD_LEN {
        return Err(FrameError::TruncatedFrame {
            expected: RESPONSE_LEN,
            actual: bytes.len(),
        });
    }

    let mut registers = [0u16; REGISTER_COUNT as usize];
    for (register, chunk) in registers.iter_mut().zip(payload.chunks_exact(2)) {
        *register = u16::from_be_bytes([chunk[0], chunk[1]]);
    }

    Ok(Reading::from_registers(&registers))
}

/// Encode the answer the probe would give for `registers`.
///
/// Used by the simulated probe and by tests.
pub fn encode_response(registers: &[u16; REGISTER_COUNT as usize]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(RESPONSE_LEN);
    frame.push(SLAVE_ADDRESS);
    frame.push(READ_HOLDING_REGISTERS);
    frame.push(PAYLOAD_LEN as u8);
    for register in registers {
        frame.extend_from_slice(&register.to_be_bytes());
    }
    let crc = compute_crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}
