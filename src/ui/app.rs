use parking_lot::{Mutex, RwLock};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use super::window::WindowState;
use crate::config::AppConfig;
use crate::voice_activity::ActivitySnapshot;
use crate::voice_session::VoiceSession;

const WINDOW_SIZE: f64 = 520.0;

/// Run the visualization window until the user quits.
///
/// The session lives on this thread alongside the renderer; connect and
/// disconnect happen in direct response to key presses, which keeps audio
/// context creation tied to a user action.
pub fn run_with_session(
    session: VoiceSession,
    snapshot: Arc<RwLock<ActivitySnapshot>>,
    running: Arc<AtomicBool>,
    config: AppConfig,
) {
    let event_loop = EventLoop::new().unwrap();

    let shortcuts = &config.keyboard_shortcuts;
    let toggle_key = shortcuts
        .to_key_code(&shortcuts.toggle_connection)
        .unwrap_or(KeyCode::Space);
    let exit_key = shortcuts
        .to_key_code(&shortcuts.exit_application)
        .unwrap_or(KeyCode::Escape);

    let mut app = WindowApp {
        window_state: None,
        session: Arc::new(Mutex::new(session)),
        snapshot,
        running,
        config,
        toggle_key,
        exit_key,
    };

    event_loop.run_app(&mut app).unwrap();
}

pub struct WindowApp {
    window_state: Option<WindowState>,
    session: Arc<Mutex<VoiceSession>>,
    snapshot: Arc<RwLock<ActivitySnapshot>>,
    running: Arc<AtomicBool>,
    config: AppConfig,
    toggle_key: KeyCode,
    exit_key: KeyCode,
}

impl WindowApp {
    fn shutdown(&mut self) {
        if let Some(window) = &mut self.window_state {
            window.quit();
        }
        self.session.lock().disconnect();
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_state.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("Aura")
            .with_inner_size(LogicalSize::new(WINDOW_SIZE, WINDOW_SIZE));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let window_state = WindowState::new(
            window,
            self.session.clone(),
            self.snapshot.clone(),
            self.running.clone(),
            &self.config,
        );

        println!(
            "Press {} to connect/disconnect, {} to quit",
            self.config.keyboard_shortcuts.toggle_connection,
            self.config.keyboard_shortcuts.exit_application
        );

        window_state.window.request_redraw();
        self.window_state = Some(window_state);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_state.is_none() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(window) = &mut self.window_state {
                    window.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(window) = &mut self.window_state {
                    window.draw();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if key_code == self.exit_key {
                    self.shutdown();
                    event_loop.exit();
                } else if key_code == self.toggle_key {
                    self.session.lock().toggle_connection();
                }
            }
            _ => {}
        }
    }
}
