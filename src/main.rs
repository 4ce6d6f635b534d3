//! Life Hockey - headless runner
//!
//! Runs the simulation on its tick thread with the AI on both paddles and
//! logs stats and events until the configured run time is up.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use life_hockey::runner;
use life_hockey::sim::power_up_catalog;
use life_hockey::{Command, Settings, SimulationState};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Life Hockey (headless) starting...");

    let path = Settings::config_path();
    let mut settings = Settings::load(path.as_deref());
    if !settings.demo_mode {
        log::info!("No player input attached; AI takes the left paddle");
        settings.demo_mode = true;
    }

    for info in power_up_catalog() {
        log::debug!(
            "{} {:?}: {} ({}s)",
            info.glyph,
            info.kind,
            info.description,
            info.duration_secs
        );
    }

    let state = SimulationState::from_settings(&settings);
    log::info!(
        "Table {}x{}, seed {}",
        state.canvas.x,
        state.canvas.y,
        state.seed
    );
    let shared = runner::shared(state);

    for command in demo_ramp(&settings) {
        if let Err(e) = runner::apply_command(&shared, &command) {
            log::warn!("Demo command rejected: {e}");
        }
    }

    let driver = match runner::spawn(Arc::clone(&shared), settings.tick_interval()) {
        Ok(driver) => driver,
        Err(e) => {
            log::error!("Failed to start tick thread: {e}");
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    loop {
        thread::sleep(settings.snapshot_interval());

        for event in runner::drain_events(&shared) {
            match serde_json::to_string(&event) {
                Ok(json) => log::info!("Event: {json}"),
                Err(e) => log::warn!("Could not encode event: {e}"),
            }
        }
        match serde_json::to_string(&runner::stats(&shared)) {
            Ok(json) => log::info!("Stats: {json}"),
            Err(e) => log::warn!("Could not encode stats: {e}"),
        }

        if settings
            .run_duration()
            .is_some_and(|limit| started.elapsed() >= limit)
        {
            break;
        }
    }

    driver.stop();
    let snapshot = runner::snapshot(&shared);
    log::info!(
        "Final score: player {} : {} ai after {:.1}s",
        snapshot.score.player,
        snapshot.score.ai,
        snapshot.clock_secs
    );
}

/// A gentle curve in front of the player's goal, drawn through commands
fn demo_ramp(settings: &Settings) -> Vec<Command> {
    let w = settings.canvas_width;
    let h = settings.canvas_height;
    let x = w * 0.15;

    let mut commands = vec![Command::StartLine { x, y: h * 0.2 }];
    for i in 1..=6 {
        let t = i as f32 / 6.0;
        commands.push(Command::AppendLinePoint {
            x: x + (t * std::f32::consts::PI).sin() * w * 0.05,
            y: h * (0.2 + 0.6 * t),
        });
    }
    commands.push(Command::FinishLine);
    commands
}
