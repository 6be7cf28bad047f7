//! Wardpost motion-warning appliance
//!
//! Main control-loop binary: loads configuration, wires the configured
//! sensor slots into the detection core, and runs the fixed-cadence tick
//! that feeds the fused verdict into the warning sinks.

use anyhow::{Context, Result};
use std::time::Duration;
use wardpost_detect::SensorManager;

use wardpost::config::AppConfig;
use wardpost::warning::{GpioWarningSink, LogWarningSink, WarningSink};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    tracing::info!("Wardpost motion warning v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    if !config.config_path.as_os_str().is_empty() {
        tracing::info!("Configuration loaded from {:?}", config.config_path);
    }

    let mut manager = build_manager(&config)?;

    let mut sinks: Vec<Box<dyn WarningSink>> = vec![Box::new(LogWarningSink::new())];
    if let Some(pin) = config.warning_pin {
        match GpioWarningSink::new(pin) {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => tracing::warn!(pin, error = %e, "warning output unavailable"),
        }
    }

    tracing::info!(
        slots = manager.enabled_slots(),
        fusion = ?manager.fusion_mode(),
        tick_ms = config.tick_interval_ms,
        "monitoring started"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_interval_ms));
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                manager.update();
                let status = manager.status();

                for sink in &mut sinks {
                    if let Err(e) = sink.render(&status) {
                        tracing::error!(error = %e, "warning sink failed");
                    }
                }

                ticks += 1;
                if ticks % 200 == 0 {
                    for (slot, enabled, ready, events, errors) in manager.slot_diagnostics() {
                        tracing::debug!(slot, enabled, ready, events, errors, "slot diagnostics");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Wardpost shutdown complete");
    Ok(())
}

/// Build the sensor manager from the slot entries in the config
fn build_manager(config: &AppConfig) -> Result<SensorManager> {
    let mut manager = SensorManager::new();

    for entry in &config.slots {
        let transport = entry.binding.build(entry.sensor.max_range_mm);
        manager
            .add_sensor(entry.slot, entry.sensor.clone(), transport)
            .with_context(|| format!("failed to configure slot {}", entry.slot))?;
        if !entry.enabled {
            manager.set_enabled(entry.slot, false)?;
        }
    }

    manager.set_primary(config.primary_slot)?;
    manager
        .set_fusion_mode(config.fusion_mode)
        .context("fusion mode rejected for the configured slots")?;

    Ok(manager)
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,wardpost=debug,wardpost_hal=debug,wardpost_detect=debug")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}
