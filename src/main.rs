use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use strider::game::GamePlugin;
use strider::game::simulation::SimConfig;
use strider::game::skirmish::SkirmishPlugin;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use std::fs;
use std::path::Path;
use std::time::Duration;

const LOG_DIR: &str = "logs";
const LOG_PREFIX: &str = "strider";
/// Battle logs kept on disk, newest first
const KEEP_LOGS: usize = 25;

/// Install stdout + per-run file logging. Returns the log file path.
fn init_logging() -> String {
    let log_dir = Path::new(LOG_DIR);
    fs::create_dir_all(log_dir).expect("Failed to create logs directory");
    prune_logs(log_dir, KEEP_LOGS);

    let file_name = format!("{}_{}.log", LOG_PREFIX, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let file_layer = fmt::layer()
        .with_writer(RollingFileAppender::new(Rotation::NEVER, log_dir, &file_name))
        .with_ansi(false);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bevy_ecs=info,{}=info", LOG_PREFIX)));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    log_dir.join(file_name).to_string_lossy().into_owned()
}

/// Delete all but the `keep` most recently modified battle logs.
fn prune_logs(log_dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    let mut logs: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_PREFIX) && name.ends_with(".log")
        })
        .collect();
    if logs.len() <= keep {
        return;
    }

    // Oldest first
    logs.sort_by_key(|entry| entry.metadata().and_then(|m| m.modified()).ok());
    let excess = logs.len() - keep;
    for entry in logs.into_iter().take(excess) {
        let _ = fs::remove_file(entry.path());
    }
}

/// Advance virtual time by exactly one tick per frame so the battle runs as
/// fast as the machine allows.
fn fast_forward(mut commands: Commands, config: Res<SimConfig>) {
    commands.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / config.tick_rate)));
}

fn main() {
    let log_file = init_logging();
    println!("strider skirmish | logging to {}", log_file);

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins((GamePlugin, SkirmishPlugin))
        .add_systems(Startup, fast_forward.after(strider::game::config::init_sim_config_from_initial))
        .run();
}
