use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

/// Aura renderer configuration parameters
/// These control the procedural geometry, not the audio analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuraConfig {
    /// Number of angular samples per ring layer
    /// Higher values give a smoother ribbon at more tessellation cost
    pub segments: usize,
    /// Number of concentric ribbon layers
    pub layers: usize,
}

impl Default for AuraConfig {
    fn default() -> Self {
        Self {
            segments: 128, // Angular resolution of each ring
            layers: 3,     // Concentric ribbon layers
        }
    }
}

/// Configuration for keyboard shortcuts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardShortcuts {
    /// Key to connect/disconnect the voice session
    pub toggle_connection: String,
    /// Key to exit application
    pub exit_application: String,
}

impl Default for KeyboardShortcuts {
    fn default() -> Self {
        Self {
            toggle_connection: "Space".to_string(),  // Default: Space
            exit_application: "Escape".to_string(),  // Default: Escape
        }
    }
}

impl KeyboardShortcuts {
    /// Convert a key string to a KeyCode
    pub fn to_key_code(&self, key_str: &str) -> Option<KeyCode> {
        match key_str {
            "KeyC" => Some(KeyCode::KeyC),
            "KeyD" => Some(KeyCode::KeyD),
            "KeyQ" => Some(KeyCode::KeyQ),
            "KeyR" => Some(KeyCode::KeyR),
            "KeyS" => Some(KeyCode::KeyS),
            "KeyX" => Some(KeyCode::KeyX),
            "Space" => Some(KeyCode::Space),
            "Escape" => Some(KeyCode::Escape),
            "Enter" => Some(KeyCode::Enter),
            "Tab" => Some(KeyCode::Tab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Whether to log measured levels and the derived mode
    pub log_levels_enabled: bool,
    /// Interval between level log lines in seconds
    pub level_log_interval_secs: u64,
    /// The global buffer size used throughout the application
    /// This is the fundamental audio capture block size in samples
    pub buffer_size: usize,
    /// Audio sample rate in Hz
    /// This value is used throughout the application for audio processing
    pub sample_rate: usize,
    /// How long to wait for the first microphone samples before giving up
    /// and running without a mic binding
    pub mic_timeout_secs: u64,
    /// Aura renderer configuration
    pub aura_config: AuraConfig,
    /// Keyboard shortcuts configuration
    pub keyboard_shortcuts: KeyboardShortcuts,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_levels_enabled: false,
            level_log_interval_secs: 2,
            buffer_size: 1024,
            sample_rate: 48000, // 48kHz (default capture rate on most devices)
            mic_timeout_secs: 10,
            aura_config: AuraConfig::default(),
            keyboard_shortcuts: KeyboardShortcuts::default(),
        }
    }
}

/// Helper function to read the application configuration
pub fn read_app_config() -> AppConfig {
    match std::fs::read_to_string("config.json") {
        Ok(config_str) => match serde_json::from_str(&config_str) {
            Ok(config) => config,
            Err(e) => {
                println!(
                    "Failed to parse config.json: {}. Using default configuration.",
                    e
                );
                AppConfig::default()
            }
        },
        Err(e) => {
            println!(
                "Failed to read config.json: {}. Using default configuration.",
                e
            );
            AppConfig::default()
        }
    }
}
