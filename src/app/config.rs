//! Configuration for the terminal
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Color, Style, DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_SCROLLBACK, DEFAULT_TAB_WIDTH};
use crate::error::{Error, Result};
use crate::render::{DEFAULT_BLINK_MS, DEFAULT_REPAINT_DELAY_MS};

/// Terminal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Columns in the grid
    pub columns: usize,
    /// Visible rows
    pub rows: usize,
    /// Rows remembered in total, visible rows included
    pub scrollback: usize,
    /// Spaces per tab stop
    pub tab_width: usize,
    /// Debounce applied to repaint requests
    pub repaint_delay_ms: u64,
    /// Cursor blink half-period
    pub cursor_blink_ms: u64,
    /// Default text colors
    pub colors: ColorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            scrollback: DEFAULT_SCROLLBACK,
            tab_width: DEFAULT_TAB_WIDTH,
            repaint_delay_ms: DEFAULT_REPAINT_DELAY_MS,
            cursor_blink_ms: DEFAULT_BLINK_MS,
            colors: ColorConfig::default(),
        }
    }
}

/// Default foreground/background as RGB triples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub foreground: (u8, u8, u8),
    pub background: (u8, u8, u8),
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            foreground: (192, 192, 192),
            background: (0, 0, 0),
        }
    }
}

impl ColorConfig {
    pub fn style(&self) -> Style {
        let (fr, fg, fb) = self.foreground;
        let (br, bg, bb) = self.background;
        Style::new(Color::Rgb(fr, fg, fb), Color::Rgb(br, bg, bb))
    }
}

impl Config {
    /// Parse configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("softconsole").join("config.json"))
    }

    /// Load configuration from the default location or return defaults
    pub fn load_or_default() -> Self {
        match Self::default_config_path() {
            Some(path) => Self::load_or_default_from(&path),
            None => Self::default(),
        }
    }

    /// Load `path` if it exists. A missing file gives the defaults; an
    /// unreadable or invalid one is logged and also gives the defaults.
    pub fn load_or_default_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Reject values the terminal cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(Error::InvalidDimensions {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.tab_width == 0 {
            return Err(Error::InvalidConfig("tab_width must be positive".to_string()));
        }
        if self.cursor_blink_ms == 0 {
            return Err(Error::InvalidConfig("cursor_blink_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn repaint_delay(&self) -> Duration {
        Duration::from_millis(self.repaint_delay_ms)
    }

    pub fn cursor_blink(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_ms)
    }
}
