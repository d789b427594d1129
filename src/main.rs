/*
 *  main.rs
 *
 *  OLEDStat - always on, always up
 *  (c) 2020-26 Stuart Hunter
 *
 *  Process entry: config, logging, signals, exit status
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::future::Future;
use std::process::ExitCode;
use tokio::signal::unix::{signal, SignalKind};

use oledstat::config::{self, Cli, Config};
use oledstat::metrics::ProcMetrics;
use oledstat::reporter::{ReporterSettings, StatusReporter};
use oledstat::{BUILD_DATE, VERSION};

/// Resolves on the first SIGINT, SIGTERM, or SIGHUP.
///
/// Handlers are installed before this returns, so a signal arriving while
/// the display is still being brought up is not lost.
fn shutdown_signals() -> std::io::Result<impl Future<Output = ()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
            }
            _ = sighup.recv() => {
                info!("SIGHUP received. Initiating graceful shutdown.");
            }
        }
    })
}

fn init_logger(level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    info!("This {} always on, always up", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", VERSION, BUILD_DATE);

    let shutdown = shutdown_signals().context("installing signal handlers")?;

    let settings = ReporterSettings::from_config(&cfg);
    let source = ProcMetrics::new(&cfg.metrics_config());
    let mut reporter = StatusReporter::start(&cfg.display_config(), source, settings)?;

    reporter.splash(VERSION, BUILD_DATE).await;
    reporter.run(shutdown).await;

    // dropping the reporter blanks the panel and closes the bus
    drop(reporter);
    info!("Display released, bye");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_logger(if cli.debug { "debug" } else { "info" });
            error!("Configuration rejected: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_config {
        return match config::dump(&cfg) {
            Ok(yaml) => {
                print!("{}", yaml);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("unable to dump config: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    init_logger(cfg.log_level.as_deref().unwrap_or("info"));

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
