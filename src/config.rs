use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the headless runner. Command-line flags override these.
#[derive(Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Print every executed instruction.
    pub trace: bool,
    /// Stop after this many instructions.
    pub max_steps: u64,
    /// Entry point; 0x0100 is where DMG cartridges start.
    pub start_pc: u16,
    /// Alternate cycle-cost tables; the bundled DMG tables when absent.
    pub cycles_path: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            trace: false,
            max_steps: 1_000_000,
            start_pc: 0x0100,
            cycles_path: None,
        }
    }
}

impl RunnerConfig {
    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("dmg_core");
        path.push("config.toml");
        path
    }

    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => eprintln!("Error parsing {}: {}; using defaults", path.display(), e),
                },
                Err(e) => eprintln!("Error reading {}: {}; using defaults", path.display(), e),
            }
        } else {
            let config = RunnerConfig::default();
            config.write_defaults();
            return config;
        }
        RunnerConfig::default()
    }

    fn write_defaults(&self) {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error creating config directory: {}", e);
                return;
            }
        }
        match toml::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&path, contents) {
                    eprintln!("Error writing {}: {}", path.display(), e);
                } else {
                    eprintln!("Wrote default config to {}", path.display());
                }
            }
            Err(e) => eprintln!("Error serializing default config: {}", e),
        }
    }
}
