use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use clap::Parser;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::flag;

use statcollect::config;
use statcollect::context::global_context;

/// Demo flush loop: periodically calls `process_stats` against the global
/// context, reloading configuration on SIGHUP and flushing one last time
/// before exit on SIGINT/SIGTERM.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a stats.ini-style configuration file. Falls back to
    /// skystats.ini/stats.ini in the current directory, then a single log
    /// handler flushing every 30 seconds.
    #[arg(short, long)]
    config_path: Option<String>,

    /// How often to check whether a flush is due, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,
}

fn load_config(path: Option<&str>) -> Result<config::StatsConfig, Error> {
    match path {
        Some(path) => Ok(config::load_stats_conf_from(path)?),
        None => Ok(config::load_stats_conf()?),
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();

    let context = global_context();
    let stats_config = load_config(args.config_path.as_deref())?;
    config::configure_context(&context, &stats_config)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGINT, shutdown.clone())?;
    flag::register(SIGTERM, shutdown.clone())?;

    let reload = Arc::new(AtomicBool::new(false));
    #[cfg(not(windows))]
    flag::register(SIGHUP, reload.clone())?;

    log::info!("statcollect flush loop started, interval={:?}", stats_config.interval);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            log::info!("shutting down, flushing final snapshot");
            context.process_stats(true);
            context.close();
            break;
        }

        if reload.swap(false, Ordering::Relaxed) {
            match load_config(args.config_path.as_deref()) {
                Ok(fresh) => {
                    context.process_stats(true);
                    if let Err(e) = config::configure_context(&context, &fresh) {
                        log::error!("failed to reload configuration: {e}");
                    } else {
                        log::info!("configuration reloaded");
                    }
                }
                Err(e) => log::error!("failed to reload configuration: {e}"),
            }
        }

        context.process_stats(false);
        std::thread::sleep(Duration::from_millis(args.poll_interval_ms));
    }

    Ok(())
}
