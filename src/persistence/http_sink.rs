// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP persistence sink
//!
//! Posts each record as a JSON document to a fixed endpoint. There is no
//! retry: a failed submission is reported to the publisher, which logs it
//! and moves on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

use super::{PersistenceRecord, PersistenceSink};

/// Sink posting records to an HTTP(S) endpoint
#[derive(Debug, Clone)]
pub struct HttpSink {
    /// Target URL
    endpoint: String,
    /// HTTP client for making requests
    client: reqwest::Client,
    /// Timeout for a single request
    timeout: Duration,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set HTTP request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PersistenceSink for HttpSink {
    async fn submit(&self, record: &PersistenceRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} rejected the record: HTTP {} - {}",
                self.endpoint,
                status,
                error_text
            );
        }

        debug!("Record {} stored at {}", record.timestamp, self.endpoint);
        Ok(())
    }
}
