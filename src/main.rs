//! serialgraph - Main Entry Point
//!
//! Live plot and CSV log of delimited numeric rows from a serial port.

use anyhow::Context;
use serialgraph::{
    backend::{
        list_ports, AcquisitionBackend, CsvFileSink, LogSink, NullSink, SerialTransport,
        SyntheticTransport, Transport,
    },
    cli::{parse_args, usage, Cli, CliAction},
    config::AppConfig,
    frontend::{run_headless, SerialGraphApp},
    SessionOutcome,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = match parse_args(std::env::args_os()) {
        Ok(CliAction::Help) => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Ok(CliAction::Run(cli)) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            eprintln!("\n{}", usage());
            return ExitCode::from(2);
        }
        // --version
        Err(e) => e.exit(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("serialgraph: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.list_ports {
        let ports = list_ports().context("Failed to enumerate serial ports")?;
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    cli.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let transport: Box<dyn Transport> = if cli.demo {
        tracing::info!("Using synthetic demo signal");
        Box::new(SyntheticTransport::demo(config.parsing.delimiter.clone()))
    } else {
        Box::new(SerialTransport::from_config(&config.serial))
    };

    let sink: Box<dyn LogSink> = if config.log.enabled {
        Box::new(CsvFileSink::open(&config.log.path).context("Failed to open log file")?)
    } else {
        Box::new(NullSink)
    };

    tracing::info!(
        "Starting serialgraph on {} at {} baud",
        config.serial.port,
        config.serial.baud_rate
    );

    let (backend, frontend) = AcquisitionBackend::new(config.clone(), transport, sink);
    if let Err(e) = frontend.stop_on_interrupt() {
        tracing::warn!("{}", e);
    }
    let worker = backend.spawn().context("Failed to start acquisition thread")?;

    let mut state = frontend.state();
    while !state.is_streaming() && !state.is_terminal() {
        state = frontend.wait_for_streaming(Duration::from_secs(1));
    }

    if state.is_streaming() {
        if cli.headless {
            run_headless(&frontend, &config).context("Headless render loop failed")?;
        } else {
            let native_options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([1280.0, 720.0])
                    .with_min_inner_size([640.0, 400.0])
                    .with_title(format!("serialgraph - {}", config.serial.port)),
                ..Default::default()
            };

            let ui_config = config.clone();
            let ui_frontend = frontend.clone();
            let result = eframe::run_native(
                "serialgraph",
                native_options,
                Box::new(move |cc| Ok(Box::new(SerialGraphApp::new(cc, ui_frontend, ui_config)))),
            );
            if let Err(e) = result {
                frontend.shutdown();
                let _ = worker.join();
                return Err(anyhow::anyhow!("Window error: {}", e));
            }
        }
    }

    // Signal backend to stop and wait for it
    tracing::info!("Shutting down...");
    frontend.shutdown();
    let outcome = worker
        .join()
        .map_err(|_| anyhow::anyhow!("Acquisition thread panicked"))?;

    report(&outcome);
    Ok(ExitCode::from(outcome.exit_code()))
}

/// Print the operator diagnostic for how the session ended
fn report(outcome: &SessionOutcome) {
    let stats = &outcome.stats;
    if let Some(e) = &outcome.error {
        eprintln!("serialgraph: {}", e);
    }
    tracing::info!(
        "Session ended ({}): {} rows accepted, {} rejected, {} substituted",
        outcome.state,
        stats.records_accepted,
        stats.rejected(),
        stats.substitutions
    );
}
