// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the Modbus TCP gateway
//!
//! A gateway is started on an OS assigned port and queried with a
//! tokio-modbus client, before and after a reading reaches the store.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time;
use tokio_modbus::prelude::*;

use rust_npk_monitor::modbus;
use rust_npk_monitor::{Reading, ReadingStore};

/// Test utility function to start a gateway in the background
async fn start_test_gateway(
    store: ReadingStore,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), Box<dyn std::error::Error>> {
    // Use port 0 to let the OS assign an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let socket_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = modbus::serve(listener, store).await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server a moment to start
    time::sleep(Duration::from_millis(100)).await;

    Ok((socket_addr, handle))
}

fn sample_reading() -> Reading {
    Reading::from_registers(&[652, 231, 0, 68, 32, 58, 120])
}

#[tokio::test]
async fn test_registers_report_no_data_before_first_reading() -> Result<(), Box<dyn std::error::Error>>
{
    let (socket_addr, server_handle) = start_test_gateway(ReadingStore::default()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let data = ctx.read_input_registers(0, 10).await??;
    assert_eq!(data, vec![0; 10]);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_registers_follow_the_store() -> Result<(), Box<dyn std::error::Error>> {
    let store = ReadingStore::default();
    let (socket_addr, server_handle) = start_test_gateway(store.clone()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let timed = store.publish(sample_reading());

    let data = ctx.read_input_registers(0, 10).await??;
    assert_eq!(&data[..7], &[652, 231, 0, 68, 32, 58, 120]);
    assert_eq!(data[7], 1);
    let seconds = u32::from(data[8]) | (u32::from(data[9]) << 16);
    assert_eq!(i64::from(seconds), timed.acquired_at.timestamp());

    // A partial read starting inside the block
    let nutrients = ctx.read_input_registers(4, 3).await??;
    assert_eq!(nutrients, vec![32, 58, 120]);

    // A newer reading replaces the previous one
    store.publish(Reading::from_registers(&[700, 240, 0, 70, 40, 60, 130]));
    let data = ctx.read_input_registers(0, 2).await??;
    assert_eq!(data, vec![700, 240]);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_read_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, server_handle) = start_test_gateway(ReadingStore::default()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let response = ctx.read_input_registers(8, 5).await?;
    assert_eq!(response, Err(ExceptionCode::IllegalDataAddress));

    // The connection is still usable after an exception
    let data = ctx.read_input_registers(7, 1).await??;
    assert_eq!(data, vec![0]);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_gateway_is_read_only() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, server_handle) = start_test_gateway(ReadingStore::default()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let response = ctx.read_holding_registers(0, 2).await?;
    assert_eq!(response, Err(ExceptionCode::IllegalFunction));

    let response = ctx.write_single_register(0, 42).await?;
    assert_eq!(response, Err(ExceptionCode::IllegalFunction));

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}
