// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial transport for the soil probe
//!
//! A [`SensorTransport`] performs one request/response exchange. The serial
//! implementation opens the line, writes the request, reads the answer with
//! a short timeout and closes the line again, so no handle outlives a single
//! exchange.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::debug;
use serialport::{DataBits, FlowControl, Parity, StopBits};

use super::frame::{RequestFrame, RESPONSE_LEN};
use crate::config::SensorConfig;

/// Errors raised while exchanging a frame with the probe
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The serial line could not be opened
    #[error("Serial port '{port}' unavailable: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Nothing was received before the read timeout elapsed
    #[error("No answer on '{port}' within {timeout:?}")]
    IoTimeout { port: String, timeout: Duration },

    /// Writing the request or reading the answer failed
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One request/response exchange with the probe.
///
/// Implementations return whatever bytes were received, even when fewer than
/// a full frame arrived; judging the answer is the codec's job. No retry is
/// attempted here.
#[cfg_attr(test, mockall::automock)]
pub trait SensorTransport: Send + Sync {
    /// Send `request` and return the raw answer
    fn exchange(&self, request: &RequestFrame) -> Result<Vec<u8>, TransportError>;

    /// Human readable name of the line, for logs
    fn describe(&self) -> String;
}

/// Probe attached to a local serial port, 8 data bits, no parity, 1 stop bit
#[derive(Debug, Clone)]
pub struct SerialTransport {
    port: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialTransport {
    pub fn new(port: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout,
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(
            config.port.clone(),
            config.baud_rate,
            Duration::from_millis(config.read_timeout_ms),
        )
    }
}

impl SensorTransport for SerialTransport {
    fn exchange(&self, request: &RequestFrame) -> Result<Vec<u8>, TransportError> {
        let mut line = serialport::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|source| TransportError::PortUnavailable {
                port: self.port.clone(),
                source,
            })?;

        debug!("Sending request to {}: {:02X?}", self.port, request.as_bytes());
        line.write_all(request.as_bytes())?;
        line.flush()?;

        let mut buffer = [0u8; RESPONSE_LEN];
        let received = read_answer(&mut line, &mut buffer)?;
        if received == 0 {
            return Err(TransportError::IoTimeout {
                port: self.port.clone(),
                timeout: self.read_timeout,
            });
        }

        debug!("Received {} bytes from {}: {:02X?}", received, self.port, &buffer[..received]);
        Ok(buffer[..received].to_vec())
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.port, self.baud_rate)
    }
}

/// Fill `buffer` from `reader` until it is full, the reader reports end of
/// data, or a read times out. Returns the number of bytes received.
pub(crate) fn read_answer<R: Read + ?Sized>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Reader handing out pre-recorded chunks, then timing out
    struct ChunkedReader {
        chunks: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    let count = chunk.len().min(buf.len());
                    buf[..count].copy_from_slice(&chunk[..count]);
                    Ok(count)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    #[test]
    fn test_read_answer_collects_chunks() {
        let mut reader = ChunkedReader {
            chunks: VecDeque::from(vec![Ok(vec![1, 2, 3]), Ok(vec![4, 5])]),
        };
        let mut buffer = [0u8; 5];
        assert_eq!(read_answer(&mut reader, &mut buffer).unwrap(), 5);
        assert_eq!(buffer, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_read_answer_returns_short_read_on_timeout() {
        let mut reader = ChunkedReader {
            chunks: VecDeque::from(vec![
                Ok(vec![1, 2]),
                Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
                Ok(vec![3]),
            ]),
        };
        let mut buffer = [0u8; RESPONSE_LEN];
        assert_eq!(read_answer(&mut reader, &mut buffer).unwrap(), 3);
    }

    #[test]
    fn test_read_answer_propagates_hard_errors() {
        let mut reader = ChunkedReader {
            chunks: VecDeque::from(vec![Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "unplugged",
            ))]),
        };
        let mut buffer = [0u8; RESPONSE_LEN];
        assert!(read_answer(&mut reader, &mut buffer).is_err());
    }

    #[test]
    fn test_missing_port_is_unavailable() {
        let transport = SerialTransport::new(
            "/dev/npk-monitor-missing-port",
            4800,
            Duration::from_millis(100),
        );
        let result = transport.exchange(&crate::sensor::build_request());
        assert!(matches!(
            result,
            Err(TransportError::PortUnavailable { .. })
        ));
    }
}
