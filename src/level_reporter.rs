use chrono;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::read_app_config;
use crate::voice_activity::ActivitySnapshot;

const LEVELS_LOG_FILE: &str = "aura_levels.log";

/// Handles periodic reporting of measured levels and the derived mode
pub struct LevelReporter {
    snapshot: Arc<RwLock<ActivitySnapshot>>,
    running: Arc<AtomicBool>,
}

impl LevelReporter {
    /// Creates a new LevelReporter
    pub fn new(snapshot: Arc<RwLock<ActivitySnapshot>>, running: Arc<AtomicBool>) -> Self {
        Self { snapshot, running }
    }

    /// Start periodic reporting with the configured interval
    pub fn start_periodic_reporting(&self) {
        // Get configuration options
        let app_config = read_app_config();
        if !app_config.log_levels_enabled {
            println!("Level reporting disabled - no levels will be logged");
            return;
        }

        let interval_secs = app_config.level_log_interval_secs.max(1);
        println!(
            "Level reporting enabled - will report every {} seconds to console and {}",
            interval_secs, LEVELS_LOG_FILE
        );

        // Create or truncate the log file
        if let Err(e) = File::create(LEVELS_LOG_FILE) {
            eprintln!("Failed to create levels file: {}", e);
        }

        let snapshot = self.snapshot.clone();
        let running = self.running.clone();

        // Spawn an async task to periodically report the current snapshot
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            while running.load(Ordering::Relaxed) {
                interval.tick().await;

                let snap = *snapshot.read();
                let line = format!(
                    "mic: {:.3} | agent: {:.3} | mode: {:?}",
                    snap.mic_level, snap.agent_level, snap.mode
                );
                println!("{}", line);

                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
                match OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(LEVELS_LOG_FILE)
                {
                    Ok(mut file) => {
                        if let Err(e) = writeln!(file, "{} {}", timestamp, line) {
                            eprintln!("Failed to write to levels file: {}", e);
                        }
                    }
                    Err(e) => eprintln!("Failed to open levels file: {}", e),
                }
            }
            println!("Level reporting stopped");
        });
    }
}
