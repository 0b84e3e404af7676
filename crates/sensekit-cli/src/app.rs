//! Runs one sensing session over simulated drivers.

use std::sync::Arc;

use anyhow::Context;
use sensekit_core::drivers::SimulatedDriver;
use sensekit_core::{Sensor, SensorManager, SessionConfig, Subscriber};
use tracing::{info, warn};

use crate::args::Args;
use crate::feed::{self, Feed};
use crate::output::RecordPrinter;

/// Create one simulated sensor and matching feed per enabled kind.
///
/// # Errors
///
/// Returns an error if a sensor configuration is invalid.
pub fn build(session: &SessionConfig) -> anyhow::Result<(SensorManager, Vec<Feed>)> {
    let mut manager = SensorManager::new();
    let mut feeds = Vec::with_capacity(session.enabled.len());
    for &kind in &session.enabled {
        let (driver, handle) = SimulatedDriver::new();
        let sensor = Sensor::with_config(session.sensor_config(kind)?, Box::new(driver))?;
        manager.register(sensor)?;
        feeds.push(Feed::new(kind, handle));
    }
    Ok((manager, feeds))
}

/// Load the session file named by `args` and apply the command-line
/// overrides on top.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or a value is invalid.
pub fn load_session(args: &Args) -> anyhow::Result<SessionConfig> {
    let path = args.config_path();
    let mut session = SessionConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    args.apply(&mut session);
    session.validate()?;
    Ok(session)
}

/// Run `session` for the requested duration, then stop.
///
/// # Errors
///
/// Returns an error if no sensor could be started.
pub async fn run(args: Args, session: SessionConfig) -> anyhow::Result<()> {
    if args.print_config {
        print!("{}", toml::to_string_pretty(&session)?);
        return Ok(());
    }

    let (manager, feeds) = build(&session)?;
    let printer: Arc<dyn Subscriber> = Arc::new(RecordPrinter::stdout(session.output));
    manager.subscribe_all(&printer);

    if let Err(errors) = manager.start_all() {
        for err in &errors {
            warn!(error = %err, code = err.error_code(), "sensor failed to start");
        }
        if errors.len() == manager.len() {
            anyhow::bail!("none of the {} enabled sensors could be started", manager.len());
        }
    }

    info!(
        sensors = manager.len(),
        format = %session.output,
        duration_ms = args.duration_ms,
        "session running"
    );
    let used = feed::drive(feeds, args.interval(), args.duration()).await;
    manager.stop_all();

    for (kind, stats) in manager.stats() {
        info!(
            kind = %kind,
            produced = stats.produced,
            rejected = stats.rejected,
            delivered = stats.delivered,
            delivery_failures = stats.delivery_failures,
            "sensor summary"
        );
    }
    info!(events = used, "session finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensekit_core::{SensorKind, SensorState};

    #[test]
    fn test_build_creates_a_sensor_per_kind() {
        let session = SessionConfig {
            enabled: vec![SensorKind::Gravity, SensorKind::Bluetooth],
            ..SessionConfig::default()
        };
        let (manager, feeds) = build(&session).unwrap();

        assert_eq!(manager.kinds(), vec![SensorKind::Gravity, SensorKind::Bluetooth]);
        assert_eq!(feeds.len(), 2);
        assert_eq!(
            manager.sensor(SensorKind::Bluetooth).unwrap().state(),
            SensorState::Idle
        );
    }

    #[test]
    fn test_print_config_does_not_start_sensors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let args = Args {
            config: Some(path),
            format: None,
            kinds: vec![SensorKind::Light],
            duration_ms: 10,
            interval_ms: 1,
            production: false,
            print_config: true,
        };
        let session = load_session(&args).unwrap();
        assert_eq!(session.enabled, vec![SensorKind::Light]);
        tokio_test::block_on(run(args, session)).unwrap();
    }

    #[test]
    fn test_short_session_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            config: Some(dir.path().join("absent.toml")),
            format: None,
            kinds: vec![SensorKind::AudioLevel],
            duration_ms: 20,
            interval_ms: 5,
            production: false,
            print_config: false,
        };
        let session = load_session(&args).unwrap();
        tokio_test::block_on(run(args, session)).unwrap();
    }
}
