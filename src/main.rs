use clap::Parser;
use serial_sniffer::clock::SystemClock;
use serial_sniffer::config::{Config, ConfigLoader, LogFormat};
use serial_sniffer::error::AppError;
use serial_sniffer::logging::init_logging;
use serial_sniffer::port::{list_port_names, SystemPortOpener};
use serial_sniffer::relay::{RelayError, RelayReport, ShutdownSignal, Sniffer};
use serial_sniffer::trace::{TerminalSink, TraceSink, TraceStyle};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-sniffer",
    version,
    about = "Relay and trace full-duplex traffic between a serial device and the software that drives it.",
    long_about = "Opens the physical device port and one end of a virtual null-modem pair, forwards every byte unmodified between them, and prints the conversation as hex: green for device-to-software, magenta for software-to-device, with a new line after every idle gap. Point the host software at the other end of the virtual pair."
)]
struct Args {
    /// Configuration file. Defaults to the standard sniffer.toml lookup.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Physical device port (e.g. COM5, /dev/ttyUSB0).
    #[arg(short = 'H', long, value_name = "PORT")]
    hardware_port: Option<String>,

    /// Virtual port the host software's null-modem partner is attached to.
    #[arg(short = 'S', long, value_name = "PORT")]
    software_port: Option<String>,

    /// Baud rate for both ports.
    #[arg(short, long, value_name = "BAUD")]
    baud: Option<u32>,

    /// Seconds of silence on one side before its next bytes start a new line.
    #[arg(long, value_name = "SECS")]
    idle_gap: Option<f64>,

    /// Disable trace colors.
    #[arg(long)]
    no_color: bool,

    /// Prefix each trace line with the capture time.
    #[arg(long)]
    timestamps: bool,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Print the serial ports the system reports and exit.
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    /// Command-line flags win over file and environment settings.
    fn apply(&self, config: &mut Config) {
        if let Some(ref port) = self.hardware_port {
            config.relay.hardware_port = Some(port.clone());
        }
        if let Some(ref port) = self.software_port {
            config.relay.software_port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.relay.baud_rate = baud;
        }
        if let Some(secs) = self.idle_gap {
            config.relay.idle_gap_secs = secs;
        }
        if self.no_color {
            config.trace.color = false;
        }
        if self.timestamps {
            config.trace.show_timestamps = true;
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "serial-sniffer stopped with an error");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let mut config = ConfigLoader::load(args.config.as_deref())?.into_config();
    args.apply(&mut config);
    init_logging(&config.logging);

    if args.list_ports {
        return list_ports();
    }

    let settings = config.relay_settings()?;
    let style = TraceStyle {
        color: config.trace.color && io::stdout().is_terminal(),
        timestamps: config.trace.show_timestamps,
    };
    let sink = Arc::new(TerminalSink::new(io::stdout(), style));
    let shutdown = ShutdownSignal::new();

    let sniffer = Sniffer::open(
        &SystemPortOpener,
        &settings,
        sink.clone(),
        Arc::new(SystemClock),
        shutdown.clone(),
    )?;

    info!(
        hardware = %settings.hardware_port,
        software = %settings.software_port,
        baud_rate = settings.port.baud_rate,
        "relay running, press Ctrl+C to stop"
    );

    let signal_task = tokio::spawn(shutdown_on_signal(shutdown));
    let result = sniffer.run().await;
    signal_task.abort();

    let report = settle(result, sink.finish())?;
    info!(
        hardware_to_software = report.hardware.bytes_captured,
        software_to_hardware = report.software.bytes_captured,
        "relay shut down cleanly"
    );
    Ok(())
}

/// Combine the relay outcome with the final trace flush. A relay failure
/// decides the exit code even when the flush also fails.
fn settle(
    result: Result<RelayReport, RelayError>,
    finished: io::Result<()>,
) -> Result<RelayReport, AppError> {
    match (result, finished) {
        (Ok(report), finished) => {
            finished?;
            Ok(report)
        }
        (Err(e), Err(flush)) => {
            warn!(error = %flush, "could not finish the trace output");
            Err(e.into())
        }
        (Err(e), Ok(())) => Err(e.into()),
    }
}

fn list_ports() -> Result<(), AppError> {
    let names = list_port_names().map_err(AppError::PortList)?;
    if names.is_empty() {
        info!("no serial ports found");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

// --- Graceful Shutdown Handler ---
async fn shutdown_on_signal(shutdown: ShutdownSignal) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
    shutdown.trigger();
}
