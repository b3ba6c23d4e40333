// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server exposing the soil readings
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.

use std::future;

use anyhow::Result;
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::utility::{LatestReading, ReadingStore};

/// Number of input registers served
pub const INPUT_REGISTER_COUNT: u16 = 10;

const STATUS_NO_DATA: u16 = 0;
const STATUS_OK: u16 = 1;

/// Modbus service answering from a [`ReadingStore`] snapshot
///
/// Each request takes its own snapshot, so all registers returned by one
/// read come from the same reading.
#[derive(Clone)]
pub struct NpkModbusServer {
    store: ReadingStore,
}

impl NpkModbusServer {
    pub fn new(store: ReadingStore) -> Self {
        Self { store }
    }
}

impl tokio_modbus::server::Service for NpkModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadInputRegisters(addr, cnt) => {
                let image = input_register_image(&self.store.latest());
                register_read(&image, addr, cnt).map(Response::ReadInputRegisters)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unsupported function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        future::ready(res)
    }
}

/// Scale a reading field to register units (×10), saturating at the u16 range
fn scaled(value: f64) -> u16 {
    (value * 10.0).round().clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Compute the input register block for a store snapshot
pub fn input_register_image(latest: &LatestReading) -> [u16; INPUT_REGISTER_COUNT as usize] {
    let mut registers = [0u16; INPUT_REGISTER_COUNT as usize];
    if let LatestReading::Available(timed) = latest {
        let reading = &timed.reading;
        registers[0] = scaled(reading.humidity);
        registers[1] = scaled(reading.temperature);
        registers[3] = scaled(reading.ph);
        registers[4] = scaled(reading.n);
        registers[5] = scaled(reading.p);
        registers[6] = scaled(reading.k);
        registers[7] = STATUS_OK;

        let seconds = timed.acquired_at.timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        registers[8] = (seconds & 0xFFFF) as u16;
        registers[9] = (seconds >> 16) as u16;
    } else {
        registers[7] = STATUS_NO_DATA;
    }
    registers
}

fn register_read(registers: &[u16], addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
    let start = usize::from(addr);
    let end = start + usize::from(cnt);
    if cnt == 0 || end > registers.len() {
        error!(
            "Exception::IllegalDataAddress - Registers {}..{} out of range",
            start, end
        );
        return Err(ExceptionCode::IllegalDataAddress);
    }
    Ok(registers[start..end].to_vec())
}

/// Serve Modbus TCP clients on `listener` until the task is aborted
pub async fn serve(listener: TcpListener, store: ReadingStore) -> Result<()> {
    info!("Modbus gateway listening on {}", listener.local_addr()?);
    let server = Server::new(listener);

    let on_connected = move |stream, socket_addr| {
        let store = store.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |peer| {
                debug!("Modbus client connected from {}", peer);
                Ok(Some(NpkModbusServer::new(store.clone())))
            })
        }
    };

    let on_process_error = |err| {
        error!("Modbus server error: {err}");
    };

    server.serve(&on_connected, on_process_error).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Reading;

    #[test]
    fn test_image_without_data() {
        let image = input_register_image(&LatestReading::NoData);
        assert_eq!(image, [0; 10]);
    }

    #[test]
    fn test_image_mirrors_probe_layout() {
        let store = ReadingStore::default();
        let timed = store.publish(Reading::from_registers(&[652, 231, 0, 68, 32, 58, 120]));
        let image = input_register_image(&store.latest());

        assert_eq!(&image[..7], &[652, 231, 0, 68, 32, 58, 120]);
        assert_eq!(image[7], STATUS_OK);
        let seconds = u32::from(image[8]) | (u32::from(image[9]) << 16);
        assert_eq!(i64::from(seconds), timed.acquired_at.timestamp());
    }

    #[test]
    fn test_register_read_bounds() {
        let registers = [1u16, 2, 3];
        assert_eq!(register_read(&registers, 1, 2), Ok(vec![2, 3]));
        assert_eq!(
            register_read(&registers, 2, 2),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            register_read(&registers, 0, 0),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }
}
