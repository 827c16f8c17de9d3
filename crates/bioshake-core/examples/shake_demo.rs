//! BioShake Communication Test Tool
//!
//! Opens a BioShake, prints its identity and state, optionally runs a timed
//! shake, and closes the port.
//!
//! Usage:
//!   cargo run --example shake_demo -- [OPTIONS]
//!
//! Options:
//!   --port PORT       Serial port (default: autodetect)
//!   --config FILE     JSON connection config (overridden by other options)
//!   --speed RPM       Target speed before shaking (default: 1000)
//!   --run SECONDS     Shake for SECONDS, then report remaining time
//!   --list            List serial ports and exit
//!   --debug           Trace every request and response
//!
//! Set RUST_LOG (e.g. RUST_LOG=bioshake_core=debug) to control log output.

use anyhow::{bail, Context, Result};
use bioshake_core::protocol::{list_ports, Bioshake, ConnectionConfig};
use bioshake_core::shake_state::ShakeStateReport;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = ConnectionConfig::default();
    let mut port: Option<String> = None;
    let mut speed = 1000u32;
    let mut runtime: Option<u32> = None;
    let mut debug = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                port = args.get(i).cloned();
            }
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).context("--config needs a file")?;
                config = ConnectionConfig::from_file(path)
                    .with_context(|| format!("loading {}", path))?;
            }
            "--speed" | "-s" => {
                i += 1;
                speed = args.get(i).context("--speed needs a value")?.parse()?;
            }
            "--run" | "-r" => {
                i += 1;
                runtime = Some(args.get(i).context("--run needs a value")?.parse()?);
            }
            "--list" | "-l" => {
                for p in list_ports() {
                    println!("{} {:?}", p.name, p.product.unwrap_or_default());
                }
                return Ok(());
            }
            "--debug" | "-d" => debug = true,
            other => bail!("unknown option '{}'", other),
        }
        i += 1;
    }

    if port.is_some() {
        config.port_name = port;
    }
    config.debug |= debug;

    Bioshake::scoped(config, |dev| {
        println!("Port:        {}", dev.port_name());
        println!("Version:     {}", dev.get_version()?);
        println!("Description: {}", dev.get_description()?);

        let state = ShakeStateReport::from(dev.get_shake_state()?);
        println!("State:       {}", serde_json::to_string(&state).unwrap_or_default());

        if let Some(seconds) = runtime {
            dev.set_shake_target_speed(speed)?;
            println!("Target:      {} rpm", dev.get_shake_target_speed()?);
            dev.shake_on_with_runtime(seconds)?;
            std::thread::sleep(Duration::from_secs(1));
            println!("Remaining:   {:?}", dev.get_shake_remaining_time()?);
            println!("State:       {}", dev.get_shake_state()?);
        }

        let errors = dev.get_errors()?;
        if !errors.is_empty() {
            println!("Errors:      {}", errors.join("; "));
        }
        Ok(())
    })?;

    Ok(())
}
