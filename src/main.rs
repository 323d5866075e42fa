use parking_lot::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

mod analyser;
mod audio_capture;
mod audio_context;
mod config;
mod frame_scheduler;
mod level_extractor;
mod level_reporter;
mod stream_bindings;
mod ui;
mod voice_activity;
mod voice_session;

use config::read_app_config;
use level_reporter::LevelReporter;
use voice_activity::ActivitySnapshot;
use voice_session::VoiceSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Loading configuration...");
    let app_config = read_app_config();

    let running = Arc::new(AtomicBool::new(true));
    let snapshot = Arc::new(RwLock::new(ActivitySnapshot::default()));

    let session = VoiceSession::new(app_config.clone(), running.clone());

    let reporter = LevelReporter::new(snapshot.clone(), running.clone());
    reporter.start_periodic_reporting();

    // Run the UI on the main thread; it owns the session and drives the
    // frame loop until the user quits
    ui::run_with_session(session, snapshot, running, app_config);

    Ok(())
}
