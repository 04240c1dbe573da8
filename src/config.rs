//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/orgchart/orgchart.toml`
//! 3. Local config: `.orgchart.toml` next to the chart data file
//! 4. Environment variables: `ORGCHART_*` prefix, `__` for nesting
//!    (e.g. `ORGCHART_LAYOUT__NODE_WIDTH=200`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::domain::{LayoutConfig, ViewportConfig};

pub const DEFAULT_DATA_FILE: &str = "orgchart.json";
pub const LOCAL_CONFIG_FILE: &str = ".orgchart.toml";

/// Raw layout section; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLayoutConfig {
    pub node_width: Option<f64>,
    pub node_height: Option<f64>,
    pub min_spacing: Option<f64>,
    pub level_height: Option<f64>,
    pub team_spacing: Option<f64>,
    pub base_x: Option<f64>,
    pub base_y: Option<f64>,
}

/// Raw viewport section; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawViewportConfig {
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub zoom_step: Option<f64>,
    pub wheel_sensitivity: Option<f64>,
    pub fit_margin: Option<f64>,
}

/// Raw settings for intermediate parsing of one config file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_file: Option<PathBuf>,
    pub layout: RawLayoutConfig,
    pub viewport: RawViewportConfig,
}

impl RawLayoutConfig {
    fn apply_to(&self, base: LayoutConfig) -> LayoutConfig {
        LayoutConfig {
            node_width: self.node_width.unwrap_or(base.node_width),
            node_height: self.node_height.unwrap_or(base.node_height),
            min_spacing: self.min_spacing.unwrap_or(base.min_spacing),
            level_height: self.level_height.unwrap_or(base.level_height),
            team_spacing: self.team_spacing.unwrap_or(base.team_spacing),
            base_x: self.base_x.unwrap_or(base.base_x),
            base_y: self.base_y.unwrap_or(base.base_y),
        }
    }
}

impl RawViewportConfig {
    fn apply_to(&self, base: ViewportConfig) -> ViewportConfig {
        ViewportConfig {
            min_zoom: self.min_zoom.unwrap_or(base.min_zoom),
            max_zoom: self.max_zoom.unwrap_or(base.max_zoom),
            zoom_step: self.zoom_step.unwrap_or(base.zoom_step),
            wheel_sensitivity: self.wheel_sensitivity.unwrap_or(base.wheel_sensitivity),
            fit_margin: self.fit_margin.unwrap_or(base.fit_margin),
        }
    }
}

/// Unified configuration for orgchart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Chart data file (JSON, one array of people per board)
    pub data_file: PathBuf,
    /// Layout pixel constants
    pub layout: LayoutConfig,
    /// Zoom bounds and steps
    pub viewport: ViewportConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            layout: LayoutConfig::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

/// Get the XDG config directory for orgchart.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "orgchart").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("orgchart.toml"))
}

/// Get the path to the local config file for a chart data file.
pub fn local_config_path(data_file: &Path) -> PathBuf {
    match data_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(LOCAL_CONFIG_FILE),
        _ => PathBuf::from(LOCAL_CONFIG_FILE),
    }
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand(self.data_file.to_string_lossy().as_ref());
        self.data_file = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_file: overlay
                .data_file
                .clone()
                .unwrap_or_else(|| self.data_file.clone()),
            layout: overlay.layout.apply_to(self.layout),
            viewport: overlay.viewport.apply_to(self.viewport),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `data_file` - Chart file given on the command line. It decides where
    ///   the local config is looked up and overrides every configured `data_file`.
    pub fn load(data_file: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_with(global_config_path().as_deref(), data_file)
    }

    /// Like [`Settings::load`], with an explicit global config file.
    #[instrument(level = "debug")]
    pub fn load_with(
        global_path: Option<&Path>,
        data_file: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                debug!(path = %global_path.display(), "global config");
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        // 3. Local config next to the data file
        let local_path = local_config_path(data_file.unwrap_or(Path::new(DEFAULT_DATA_FILE)));
        if local_path.exists() {
            debug!(path = %local_path.display(), "local config");
            current = current.merge_with(&load_raw_settings(&local_path)?);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        if let Some(path) = data_file {
            current.data_file = path.to_path_buf();
        }
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply ORGCHART_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("ORGCHART").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = PathBuf::from(val);
        }

        let layout = &mut settings.layout;
        for (key, field) in [
            ("layout.node_width", &mut layout.node_width),
            ("layout.node_height", &mut layout.node_height),
            ("layout.min_spacing", &mut layout.min_spacing),
            ("layout.level_height", &mut layout.level_height),
            ("layout.team_spacing", &mut layout.team_spacing),
            ("layout.base_x", &mut layout.base_x),
            ("layout.base_y", &mut layout.base_y),
        ] {
            if let Some(val) = env_float(&config, key)? {
                *field = val;
            }
        }

        let viewport = &mut settings.viewport;
        for (key, field) in [
            ("viewport.min_zoom", &mut viewport.min_zoom),
            ("viewport.max_zoom", &mut viewport.max_zoom),
            ("viewport.zoom_step", &mut viewport.zoom_step),
            ("viewport.wheel_sensitivity", &mut viewport.wheel_sensitivity),
            ("viewport.fit_margin", &mut viewport.fit_margin),
        ] {
            if let Some(val) = env_float(&config, key)? {
                *field = val;
            }
        }

        Ok(settings)
    }

    /// Reject values the layout and viewport cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let invalid = |message: String| Err(ApplicationError::Config { message });
        let layout = &self.layout;
        if layout.node_width <= 0.0 || layout.node_height <= 0.0 {
            return invalid(format!(
                "node size must be positive, got {}x{}",
                layout.node_width, layout.node_height
            ));
        }
        if layout.min_spacing < 0.0 || layout.team_spacing < 0.0 || layout.level_height < 0.0 {
            return invalid("spacing values must not be negative".to_string());
        }
        let viewport = &self.viewport;
        if viewport.min_zoom <= 0.0 || viewport.min_zoom > viewport.max_zoom {
            return invalid(format!(
                "zoom bounds must satisfy 0 < min_zoom <= max_zoom, got [{}, {}]",
                viewport.min_zoom, viewport.max_zoom
            ));
        }
        if viewport.zoom_step <= 1.0 {
            return invalid(format!("zoom_step must be > 1, got {}", viewport.zoom_step));
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# orgchart configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/orgchart/orgchart.toml
#   Local:  .orgchart.toml next to the chart data file
#   Env:    ORGCHART_* environment variables, e.g. ORGCHART_LAYOUT__NODE_WIDTH=200

# Chart data file
# data_file = "orgchart.json"

[layout]
# Node box size in pixels
# node_width = 240.0
# node_height = 120.0

# Minimum gap between sibling subtrees
# min_spacing = 40.0

# Vertical distance between ranks
# level_height = 200.0

# Gap between independent trees
# team_spacing = 100.0

# Top-left anchor of the first tree
# base_x = 50.0
# base_y = 50.0

[viewport]
# min_zoom = 0.3
# max_zoom = 3.0
# zoom_step = 1.2
# wheel_sensitivity = 0.001

# Padding around the content when fitting to screen
# fit_margin = 50.0
"#
        .to_string()
    }
}

fn env_float(config: &Config, key: &str) -> Result<Option<f64>, ApplicationError> {
    match config.get_float(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("{key}: {e}"),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
