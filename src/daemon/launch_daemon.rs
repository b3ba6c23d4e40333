// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-npk-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::acquisition::{get_sensor_transport, RecordLog, SensorAcquisitionDaemon};
use crate::config::Config;
use crate::modbus;
use crate::persistence::{
    reading_queue, HttpSink, PersistencePublisher, TcpConnectivityProbe, DEFAULT_QUEUE_CAPACITY,
};
use crate::utility::{ReadingStore, TimedReading};
use crate::visualization::server::build_rocket;
use rocket::{
    config::LogLevel,
    data::{Limits, ToByteUnit},
};

/// Interval between two heartbeat log lines
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// How long `join` waits for each task before aborting it
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How a task ended when the daemon was joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    Finished,
    Failed,
    Panicked,
    /// The task missed the join timeout and was aborted
    Aborted,
}

/// Wait up to `limit` for `task`, aborting it when the limit is reached
async fn join_task(mut task: JoinHandle<Result<()>>, limit: Duration) -> TaskExit {
    match time::timeout(limit, &mut task).await {
        Ok(Ok(Ok(()))) => TaskExit::Finished,
        Ok(Ok(Err(e))) => {
            error!("Task failed: {:#}", e);
            TaskExit::Failed
        }
        Ok(Err(e)) => {
            error!("Task panicked: {}", e);
            TaskExit::Panicked
        }
        Err(_) => {
            warn!("Task did not stop within {:?}, aborting it", limit);
            task.abort();
            // Wait for the cancelled future to be dropped
            let _ = task.await;
            TaskExit::Aborted
        }
    }
}

/// Composition root owning every background task
///
/// The daemon creates the [`ReadingStore`], starts the acquisition loop and
/// each enabled consumer (web server, Modbus gateway, persistence publisher)
/// plus a heartbeat, and stops them all on [`shutdown`](Self::shutdown).
///
/// ### Lifecycle
///
/// 1. [`Daemon::new`]
/// 2. [`Daemon::launch`] with the loaded configuration
/// 3. [`Daemon::shutdown`] when the process should stop
/// 4. [`Daemon::join`] to wait for the tasks
pub struct Daemon {
    /// Handles of the spawned tasks
    tasks: Vec<JoinHandle<Result<()>>>,
    /// Cleared by `shutdown`
    running: Arc<AtomicBool>,
    /// Broadcasts the shutdown to tasks waiting on it
    shutdown_tx: watch::Sender<bool>,
    /// Store shared by the acquisition loop and every consumer
    store: ReadingStore,
    acquisition: Option<Arc<SensorAcquisitionDaemon>>,
    publisher: Option<Arc<PersistencePublisher>>,
    web_shutdown: Option<rocket::Shutdown>,
    /// Address the Modbus gateway is bound to, once started
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
            store: ReadingStore::default(),
            acquisition: None,
            publisher: None,
            web_shutdown: None,
            modbus_addr: None,
        }
    }

    /// Start every task enabled in `config`
    ///
    /// # Errors
    ///
    /// Fails if a server cannot be set up, e.g. its address is already in use.
    /// Tasks started before the failure keep running until `shutdown`.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        self.store = ReadingStore::new(config.acquisition.history_capacity);

        // Every successful reading reaches the publisher through this queue
        let (persistence_queue, persistence_receiver) = if config.persistence.enabled {
            let (sender, receiver) = reading_queue(DEFAULT_QUEUE_CAPACITY);
            (Some(sender), Some(receiver))
        } else {
            (None, None)
        };

        if config.acquisition.enabled {
            self.start_data_acquisition(config, persistence_queue)?;
        } else {
            warn!("Acquisition disabled, consumers will report no data");
        }

        // Start web server if enabled
        if config.visualization.enabled {
            self.start_web_server(config).await?;
        }

        if config.modbus.enabled {
            self.start_modbus_server(config).await?;
        }

        if let Some(receiver) = persistence_receiver {
            self.start_persistence(config, receiver)?;
        }

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    fn start_data_acquisition(
        &mut self,
        config: &Config,
        persistence_queue: Option<mpsc::Sender<TimedReading>>,
    ) -> Result<()> {
        info!("Starting data acquisition task");

        let transport = get_sensor_transport(&config.sensor);
        let mut acquisition = SensorAcquisitionDaemon::new(
            transport,
            self.store.clone(),
            Duration::from_millis(config.acquisition.interval_ms),
        );
        if config.record_log.enabled {
            info!("Recording readings to {}", config.record_log.path.display());
            acquisition = acquisition.with_record_log(RecordLog::new(&config.record_log.path));
        }
        if let Some(queue) = persistence_queue {
            acquisition = acquisition.with_persistence_queue(queue);
        }

        let acquisition = Arc::new(acquisition);
        let runner = acquisition.clone();
        let task = tokio::spawn(async move { runner.run().await });

        self.acquisition = Some(acquisition);
        self.tasks.push(task);
        Ok(())
    }

    async fn start_web_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.visualization.address, config.visualization.port
        );

        let figment = rocket::Config::figment()
            .merge(("ident", config.visualization.name.clone()))
            .merge(("limits", Limits::new().limit("json", 1.mebibytes())))
            .merge(("address", config.visualization.address.clone()))
            .merge(("port", config.visualization.port))
            .merge(("log_level", LogLevel::Normal));

        let rocket = build_rocket(figment, self.store.clone()).await;
        let ignited = rocket
            .ignite()
            .await
            .context("Failed to configure web server")?;
        self.web_shutdown = Some(ignited.shutdown());

        let task = tokio::spawn(async move {
            ignited.launch().await?;
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    async fn start_modbus_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting modbus server on {}:{}",
            config.modbus.address, config.modbus.port
        );

        let listener = TcpListener::bind((config.modbus.address.as_str(), config.modbus.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind Modbus gateway to {}:{}",
                    config.modbus.address, config.modbus.port
                )
            })?;
        self.modbus_addr = Some(listener.local_addr()?);

        let store = self.store.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(async move {
            tokio::select! {
                result = modbus::serve(listener, store) => result,
                _ = shutdown_rx.changed() => {
                    info!("Modbus server shut down");
                    Ok(())
                }
            }
        });

        self.tasks.push(task);
        info!("Modbus server started");
        Ok(())
    }

    fn start_persistence(
        &mut self,
        config: &Config,
        queue: mpsc::Receiver<TimedReading>,
    ) -> Result<()> {
        info!(
            "Starting persistence publisher to {}",
            config.persistence.endpoint
        );

        let sink = HttpSink::new(config.persistence.endpoint.clone());
        let probe = TcpConnectivityProbe::from_config(&config.persistence);
        let publisher = Arc::new(PersistencePublisher::new(
            queue,
            Arc::new(sink),
            Arc::new(probe),
            Duration::from_millis(config.persistence.interval_ms),
        ));

        let runner = publisher.clone();
        let task = tokio::spawn(async move { runner.run().await });

        self.publisher = Some(publisher);
        self.tasks.push(task);
        Ok(())
    }

    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let acquisition = self.acquisition.clone();
        let store = self.store.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match &acquisition {
                    Some(acquisition) => {
                        let stats = acquisition.stats();
                        debug!(
                            "Daemon heartbeat: {} readings, {} failed cycles, data available: {}",
                            stats.successful_cycles,
                            stats.failed_cycles,
                            store.latest().is_available()
                        );
                    }
                    None => debug!("Daemon heartbeat: running"),
                }
                tokio::select! {
                    _ = time::sleep(HEARTBEAT_INTERVAL) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Get the store shared with every consumer
    pub fn get_store(&self) -> ReadingStore {
        self.store.clone()
    }

    /// Address the Modbus gateway listens on, if it was started
    pub fn modbus_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask every task to stop
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);

        if let Some(acquisition) = &self.acquisition {
            acquisition.stop();
        }
        if let Some(publisher) = &self.publisher {
            publisher.stop();
        }
        if let Some(web_shutdown) = &self.web_shutdown {
            web_shutdown.clone().notify();
        }
    }

    /// Wait for every task to finish.
    ///
    /// A task still running after the join timeout is aborted, so no task
    /// outlives the daemon.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            join_task(task, TASK_JOIN_TIMEOUT).await;
        }
        Ok(())
    }
}
