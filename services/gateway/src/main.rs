//! `conn-gateway` binary entry point: load configuration, build a
//! [`conn_gateway::Gateway`], and drive it through a transport.
//!
//! The real CoAP stack is out of scope for this workspace (spec §1), so
//! this binary runs against [`conn_gateway::transport::memory::MemoryTransport`]
//! — enough to prove the wiring is correct end to end. A production
//! deployment swaps in a real [`conn_gateway::transport::CoapTransport`] and
//! [`conn_pushqueue::PushTransport`] implementation here and nowhere else.

use clap::Parser;
use conn_gateway::transport::memory::MemoryTransport;
use conn_gateway::Gateway;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "conn-gateway", about = "Device-resident LWM2M/AirVantage connector gateway")]
struct Args {
    /// Path to a gateway.toml config file. Falls back to config/gateway.toml,
    /// then to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of event-loop ticks to run before exiting. Absent a real CoAP
    /// transport there is no external signal to run forever on; a
    /// production binary replaces this with the transport's own run loop.
    #[arg(long, default_value_t = 10)]
    ticks: u32,

    /// Milliseconds to sleep between ticks.
    #[arg(long, default_value_t = 100)]
    tick_interval_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = conn_config::load_config(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(device_id = %config.device_id, "starting connector gateway");

    let mut gateway = Gateway::new(&config);
    let mut transport = MemoryTransport::new();

    for tick in 0..args.ticks {
        gateway.run_tick(&mut transport);
        gateway.fire_registration_update_if_due(&mut transport);
        std::thread::sleep(Duration::from_millis(args.tick_interval_ms));
        info!(tick, "event loop tick complete");
    }

    info!("connector gateway exiting");
    Ok(())
}
