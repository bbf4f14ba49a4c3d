//! Wires two endpoints, two workers and a trace sink into a running relay.

use super::channel::{relay_channel, DEFAULT_CHANNEL_CAPACITY};
use super::error::RelayError;
use super::shutdown::ShutdownSignal;
use super::types::EndpointRole;
use super::worker::{PortWorker, WorkerSettings, WorkerSummary};
use crate::clock::Clock;
use crate::port::{PortConfiguration, PortOpener, SerialPortAdapter};
use crate::trace::TraceSink;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info};

/// Everything needed to start a relay.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub hardware_port: String,
    pub software_port: String,
    /// Line settings applied to both endpoints.
    pub port: PortConfiguration,
    /// Chunks each direction may queue before capture on that side stalls.
    pub channel_capacity: usize,
    pub worker: WorkerSettings,
}

impl RelaySettings {
    pub fn new(hardware_port: impl Into<String>, software_port: impl Into<String>) -> Self {
        Self {
            hardware_port: hardware_port.into(),
            software_port: software_port.into(),
            port: PortConfiguration::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            worker: WorkerSettings::default(),
        }
    }
}

/// Per-side counters from a relay that shut down cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub hardware: WorkerSummary,
    pub software: WorkerSummary,
}

/// Both workers, ready to run.
#[derive(Debug)]
pub struct Sniffer {
    hardware: PortWorker,
    software: PortWorker,
    shutdown: ShutdownSignal,
}

impl Sniffer {
    /// Open both endpoints and build the workers.
    ///
    /// Nothing runs if either endpoint fails to open; an endpoint that did
    /// open is closed again before the error is returned.
    pub fn open<O: PortOpener + ?Sized>(
        opener: &O,
        settings: &RelaySettings,
        sink: Arc<dyn TraceSink>,
        clock: Arc<dyn Clock>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, RelayError> {
        let hardware_port = open_endpoint(
            opener,
            EndpointRole::Hardware,
            &settings.hardware_port,
            &settings.port,
        )?;
        let software_port = open_endpoint(
            opener,
            EndpointRole::Software,
            &settings.software_port,
            &settings.port,
        )?;

        let (hardware_relay, software_relay) = relay_channel(settings.channel_capacity);

        let hardware = PortWorker::new(
            EndpointRole::Hardware,
            hardware_port,
            hardware_relay,
            sink.clone(),
            clock.clone(),
            shutdown.clone(),
            settings.worker,
        );
        let software = PortWorker::new(
            EndpointRole::Software,
            software_port,
            software_relay,
            sink,
            clock,
            shutdown.clone(),
            settings.worker,
        );

        Ok(Self {
            hardware,
            software,
            shutdown,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Run both workers on blocking threads until shutdown or failure.
    ///
    /// When one side fails the other is stopped, and the error that started
    /// it is returned.
    pub async fn run(self) -> Result<RelayReport, RelayError> {
        let Self {
            hardware,
            software,
            shutdown,
        } = self;

        let hardware_task = tokio::task::spawn_blocking(move || hardware.run());
        let software_task = tokio::task::spawn_blocking(move || software.run());
        let (hardware, software) = tokio::join!(hardware_task, software_task);

        let hardware = joined(EndpointRole::Hardware, hardware, &shutdown);
        let software = joined(EndpointRole::Software, software, &shutdown);

        match (hardware, software) {
            (Ok(hardware), Ok(software)) => Ok(RelayReport { hardware, software }),
            (Err(hw), Err(sw)) => Err(if hw.is_secondary() && !sw.is_secondary() {
                sw
            } else {
                hw
            }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

fn open_endpoint<O: PortOpener + ?Sized>(
    opener: &O,
    role: EndpointRole,
    name: &str,
    config: &PortConfiguration,
) -> Result<Box<dyn SerialPortAdapter>, RelayError> {
    match opener.open(name, config) {
        Ok(port) => {
            info!(%role, port = name, baud_rate = config.baud_rate, "opened endpoint");
            Ok(port)
        }
        Err(source) => {
            error!(%role, port = name, error = %source, "failed to open endpoint");
            Err(RelayError::PortUnavailable {
                role,
                port: name.to_string(),
                source,
            })
        }
    }
}

fn joined(
    role: EndpointRole,
    result: Result<Result<WorkerSummary, RelayError>, JoinError>,
    shutdown: &ShutdownSignal,
) -> Result<WorkerSummary, RelayError> {
    result.unwrap_or_else(|e| {
        shutdown.trigger();
        error!(%role, error = %e, "relay worker did not complete");
        Err(RelayError::WorkerPanicked { role })
    })
}
