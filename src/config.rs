//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/boxes/config.json`.
//! All grid options live under a `"grid"` key so the file can grow other
//! sections later.
//!
//! # Example
//!
//! ```json
//! {
//!   "grid": {
//!     "grid_columns": 6,
//!     "grid_rows": 3,
//!     "hotkey": "Super+G",
//!     "background_color": "rgba(75, 77, 81, 255)",
//!     "box_background_color": "rgba(100, 106, 116, 204)",
//!     "selected_box_background_color": "rgba(50, 53, 58, 0.8)",
//!     "grid_window_width": 600,
//!     "grid_window_height": 300
//!   }
//! }
//! ```
//!
//! Options are decoded one at a time.  A missing option takes its default
//! silently; an option that is present but unusable (wrong type, a zero
//! grid size, an unparseable hotkey) also takes its default, with a
//! warning.  A bad entry never makes the whole file fail.

use crate::geometry::{centered_frame, GridDimensions, PixelRect, ScreenBounds};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_COLUMNS: u32 = 8;
const DEFAULT_ROWS: u32 = 4;
const DEFAULT_BACKGROUND: &str = "rgba(75, 77, 81, 255)";
const DEFAULT_BOX_BACKGROUND: &str = "rgba(100, 106, 116, 204)";
const DEFAULT_SELECTED_BOX_BACKGROUND: &str = "rgba(50, 53, 58, 0.8)";

/// The overlay frame defaults to this fraction of the screen per axis.
const FRAME_DIVISOR: f64 = 3.5;

/// Top-level configuration.
///
/// A minimal `{}` file is valid; every option falls back to its
/// compiled-in default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub grid: GridConfig,
}

/// Options of the `"grid"` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub grid_columns: u32,
    pub grid_rows: u32,
    pub hotkey: Hotkey,
    pub background_color: String,
    pub box_background_color: String,
    pub selected_box_background_color: String,
    /// Overlay frame width; `None` means a fraction of the screen width.
    pub grid_window_width: Option<u32>,
    /// Overlay frame height; `None` means a fraction of the screen height.
    pub grid_window_height: Option<u32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_columns: DEFAULT_COLUMNS,
            grid_rows: DEFAULT_ROWS,
            hotkey: Hotkey::default(),
            background_color: DEFAULT_BACKGROUND.into(),
            box_background_color: DEFAULT_BOX_BACKGROUND.into(),
            selected_box_background_color: DEFAULT_SELECTED_BOX_BACKGROUND.into(),
            grid_window_width: None,
            grid_window_height: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Fails only if the file cannot be read or is not a JSON object;
    /// individual options never fail.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e.0)))
    }

    /// Parse configuration from JSON text.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(contents).map_err(|e| ConfigError(e.to_string()))?;
        let root = match value {
            Value::Object(map) => map,
            other => {
                return Err(ConfigError(format!(
                    "expected a JSON object at top level, got {}",
                    json_kind(&other)
                )))
            }
        };

        let grid = match root.get("grid") {
            None => GridConfig::default(),
            Some(Value::Object(section)) => GridConfig::from_section(section),
            Some(other) => {
                warn!(
                    "config: \"grid\" should be an object, got {}; using defaults",
                    json_kind(other)
                );
                GridConfig::default()
            }
        };
        Ok(Self { grid })
    }
}

impl GridConfig {
    fn from_section(section: &Map<String, Value>) -> Self {
        let d = Self::default();
        let positive = |v: &u32| *v > 0;
        Self {
            grid_columns: option(section, "grid_columns", d.grid_columns, positive),
            grid_rows: option(section, "grid_rows", d.grid_rows, positive),
            hotkey: option(section, "hotkey", d.hotkey, |_: &Hotkey| true),
            background_color: option(section, "background_color", d.background_color, non_blank),
            box_background_color: option(
                section,
                "box_background_color",
                d.box_background_color,
                non_blank,
            ),
            selected_box_background_color: option(
                section,
                "selected_box_background_color",
                d.selected_box_background_color,
                non_blank,
            ),
            grid_window_width: option(section, "grid_window_width", None, |v: &Option<u32>| {
                v.map_or(true, |w| w > 0)
            }),
            grid_window_height: option(section, "grid_window_height", None, |v: &Option<u32>| {
                v.map_or(true, |h| h > 0)
            }),
        }
    }
}

fn non_blank(s: &String) -> bool {
    !s.trim().is_empty()
}

/// Decode `key` from `section`, falling back to `default` if it is absent,
/// fails to deserialize, or is rejected by `accept`.
fn option<T, F>(section: &Map<String, Value>, key: &str, default: T, accept: F) -> T
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let Some(raw) = section.get(key) else {
        return default;
    };
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(v) if accept(&v) => v,
        Ok(_) => {
            warn!("config: {} = {} is out of range; using default", key, raw);
            default
        }
        Err(e) => {
            warn!("config: {} = {} is invalid ({}); using default", key, raw, e);
            default
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

//  Hotkey

/// Keyboard modifier of a [`Hotkey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Super,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Ctrl => write!(f, "Ctrl"),
            Modifier::Alt => write!(f, "Alt"),
            Modifier::Shift => write!(f, "Shift"),
            Modifier::Super => write!(f, "Super"),
        }
    }
}

fn parse_modifier(s: &str) -> Option<Modifier> {
    match s.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(Modifier::Ctrl),
        "alt" | "mod1" => Some(Modifier::Alt),
        "shift" => Some(Modifier::Shift),
        "super" | "mod4" | "win" => Some(Modifier::Super),
        _ => None,
    }
}

/// A key combination such as `Alt+R`.
///
/// The daemon does not grab keys itself; the combination is reported at
/// startup so the user can bind it to `boxes --toggle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct Hotkey {
    modifiers: Vec<Modifier>,
    key: String,
}

impl Hotkey {
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            modifiers: vec![Modifier::Alt],
            key: "R".into(),
        }
    }
}

/// Error from parsing a [`Hotkey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hotkey {input:?}: {reason}")]
pub struct HotkeyError {
    input: String,
    reason: &'static str,
}

impl FromStr for Hotkey {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| HotkeyError {
            input: s.to_string(),
            reason,
        };
        let mut modifiers = Vec::new();
        let mut key = None;
        for part in s.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(err("empty key name"));
            }
            match parse_modifier(part) {
                Some(m) if !modifiers.contains(&m) => modifiers.push(m),
                Some(_) => return Err(err("repeated modifier")),
                None if key.is_none() => {
                    key = Some(if part.chars().count() == 1 {
                        part.to_uppercase()
                    } else {
                        part.to_string()
                    })
                }
                None => return Err(err("more than one non-modifier key")),
            }
        }
        let key = key.ok_or_else(|| err("no key besides modifiers"))?;
        modifiers.sort();
        Ok(Self { modifiers, key })
    }
}

impl TryFrom<String> for Hotkey {
    type Error = HotkeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m)?;
        }
        write!(f, "{}", self.key)
    }
}

//  Resolved settings

/// Overlay colors, as CSS color strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colors {
    pub background: String,
    pub cell: String,
    pub selected_cell: String,
}

/// Settings resolved against the screen once at startup and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dimensions: GridDimensions,
    pub bounds: ScreenBounds,
    pub hotkey: Hotkey,
    pub colors: Colors,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Settings {
    /// Combine `config` with the measured screen `bounds`.
    pub fn resolve(config: &GridConfig, bounds: ScreenBounds) -> Self {
        let dimensions = GridDimensions::new(config.grid_columns, config.grid_rows)
            .unwrap_or_else(|e| {
                warn!("config: {}; using the default grid", e);
                GridDimensions::default()
            });
        let frame_width = config
            .grid_window_width
            .unwrap_or((bounds.width as f64 / FRAME_DIVISOR) as u32);
        let frame_height = config
            .grid_window_height
            .unwrap_or((bounds.height as f64 / FRAME_DIVISOR) as u32);

        Self {
            dimensions,
            bounds,
            hotkey: config.hotkey.clone(),
            colors: Colors {
                background: config.background_color.clone(),
                cell: config.box_background_color.clone(),
                selected_cell: config.selected_box_background_color.clone(),
            },
            frame_width,
            frame_height,
        }
    }

    /// Where the overlay frame sits on screen: centered.
    pub fn frame(&self) -> PixelRect {
        centered_frame(self.bounds, self.frame_width, self.frame_height)
    }
}
