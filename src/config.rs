use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use supports_color::Stream;

pub const CONFIG_VERSION: &str = "0.1";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");
        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }
        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;
        Ok(config_path)
    }

    /// Reads `config.toml` from this directory; defaults when absent.
    pub fn read_config(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;
        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub display: DisplayConfig,
    pub chart: ChartConfig,
    pub performance: PerformanceConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_table_rows: usize,
    pub chart_markers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub export_width: u32,
    pub export_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub error: String,
    pub warning: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub table_header: String,
    pub table_border: String,
    pub focus_border: String,
    pub checked: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            display: DisplayConfig::default(),
            chart: ChartConfig::default(),
            performance: PerformanceConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_table_rows: 500,
            chart_markers: true,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        let (export_width, export_height) = crate::chart_export::DEFAULT_EXPORT_SIZE;
        Self {
            export_width,
            export_height,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            error: "red".to_string(),
            warning: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            text_primary: "white".to_string(),
            table_header: "white".to_string(),
            table_border: "cyan".to_string(),
            focus_border: "yellow".to_string(),
            checked: "green".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();
        let manager = ConfigManager::new(app_name)?;
        match manager.read_config() {
            Ok(user_config) => config.merge(user_config),
            Err(e) => log::warn!("ignoring user config: {}", e),
        }
        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != CONFIG_VERSION {
            self.version = other.version;
        }
        self.display.merge(other.display);
        self.chart.merge(other.chart);
        self.performance.merge(other.performance);
        self.theme.merge(other.theme);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with(CONFIG_VERSION) {
            return Err(eyre!(
                "Unsupported config version: {}. Expected {}.x",
                self.version,
                CONFIG_VERSION
            ));
        }
        if self.display.max_table_rows == 0 {
            return Err(eyre!("max_table_rows must be greater than 0"));
        }
        if self.chart.export_width < 100 || self.chart.export_height < 100 {
            return Err(eyre!(
                "Chart export size must be at least 100x100, got {}x{}",
                self.chart.export_width,
                self.chart.export_height
            ));
        }
        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }
        let parser = ColorParser::new();
        for (name, value) in self.theme.colors.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn export_size(&self) -> (u32, u32) {
        (self.chart.export_width, self.chart.export_height)
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.max_table_rows != default.max_table_rows {
            self.max_table_rows = other.max_table_rows;
        }
        if other.chart_markers != default.chart_markers {
            self.chart_markers = other.chart_markers;
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.export_width != default.export_width {
            self.export_width = other.export_width;
        }
        if other.export_height != default.export_height {
            self.export_height = other.export_height;
        }
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        if other.event_poll_interval_ms != PerformanceConfig::default().event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

impl ColorConfig {
    /// (name, value) of every colour setting.
    pub fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("primary", self.primary.as_str()),
            ("secondary", self.secondary.as_str()),
            ("error", self.error.as_str()),
            ("warning", self.warning.as_str()),
            ("dimmed", self.dimmed.as_str()),
            ("controls_bg", self.controls_bg.as_str()),
            ("text_primary", self.text_primary.as_str()),
            ("table_header", self.table_header.as_str()),
            ("table_border", self.table_border.as_str()),
            ("focus_border", self.focus_border.as_str()),
            ("checked", self.checked.as_str()),
        ]
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        let fields = [
            (&mut self.primary, other.primary, default.primary),
            (&mut self.secondary, other.secondary, default.secondary),
            (&mut self.error, other.error, default.error),
            (&mut self.warning, other.warning, default.warning),
            (&mut self.dimmed, other.dimmed, default.dimmed),
            (&mut self.controls_bg, other.controls_bg, default.controls_bg),
            (&mut self.text_primary, other.text_primary, default.text_primary),
            (&mut self.table_header, other.table_header, default.table_header),
            (&mut self.table_border, other.table_border, default.table_border),
            (&mut self.focus_border, other.focus_border, default.focus_border),
            (&mut self.checked, other.checked, default.checked),
        ];
        for (current, theirs, default) in fields {
            if theirs != default {
                *current = theirs;
            }
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    pub fn new() -> Self {
        let support = supports_color::on(Stream::Stdout);
        Self {
            supports_true_color: support.as_ref().is_some_and(|s| s.has_16m),
            supports_256: support.as_ref().is_some_and(|s| s.has_256),
            no_color: std::env::var("NO_COLOR").is_ok(),
        }
    }

    /// Parse `#rrggbb`, `indexed(n)` or a colour name into a terminal colour.
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();

        if trimmed.starts_with('#') {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }
        if let Some(inner) = lower
            .strip_prefix("indexed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let num = inner.trim().parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        let name = lower.replace(' ', "_").replace("grey", "gray");
        let color = match name.as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "white" => Color::White,
            "bright_black" | "gray" | "dark_gray" => Color::Indexed(8),
            "bright_red" => Color::Indexed(9),
            "bright_green" => Color::Indexed(10),
            "bright_yellow" => Color::Indexed(11),
            "bright_blue" => Color::Indexed(12),
            "bright_magenta" => Color::Indexed(13),
            "bright_cyan" => Color::Indexed(14),
            "bright_white" => Color::Indexed(15),
            "light_gray" => Color::Indexed(7),
            "reset" | "reversed" => Color::Reset,
            _ => {
                return Err(eyre!(
                    "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                     bright variants (bright_red, etc.), indexed(n) or hex colors (#ff0000)",
                    trimmed
                ))
            }
        };
        Ok(color)
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    let digits = s
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.is_ascii())
        .ok_or_else(|| eyre!("Invalid hex color format: '{}'. Expected format: #rrggbb", s))?;
    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| eyre!("Invalid hex color: {}", s))
    };
    Ok((component(0..2)?, component(2..4)?, component(4..6)?))
}

/// Nearest entry of the xterm 256-colour palette.
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let spread = r.max(g).max(b) - r.min(g).min(b);
    if spread < 10 {
        // grayscale ramp 232-255
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        return if gray < 8 {
            16
        } else if gray > 247 {
            231
        } else {
            232 + ((gray - 8) * 24 / 240) as u8
        };
    }
    let level = |c: u8| (c as u16 * 5 / 255) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

/// Nearest of the 8 basic ANSI colours.
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let spread = r.max(g).max(b) - r.min(g).min(b);
    if spread < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }
    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Parsed theme colours used by the widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub error: Color,
    pub warning: Color,
    pub dimmed: Color,
    pub controls_bg: Color,
    pub text_primary: Color,
    pub table_header: Color,
    pub table_border: Color,
    pub focus_border: Color,
    pub checked: Color,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let c = &config.colors;
        Ok(Self {
            primary: parser.parse(&c.primary)?,
            secondary: parser.parse(&c.secondary)?,
            error: parser.parse(&c.error)?,
            warning: parser.parse(&c.warning)?,
            dimmed: parser.parse(&c.dimmed)?,
            controls_bg: parser.parse(&c.controls_bg)?,
            text_primary: parser.parse(&c.text_primary)?,
            table_header: parser.parse(&c.table_header)?,
            table_border: parser.parse(&c.table_border)?,
            focus_border: parser.parse(&c.focus_border)?,
            checked: parser.parse(&c.checked)?,
        })
    }

    /// Colour of the n-th chart series.
    pub fn series_color(&self, n: usize) -> Color {
        const SERIES: [Color; 7] = [
            Color::Cyan,
            Color::Magenta,
            Color::Green,
            Color::Yellow,
            Color::Blue,
            Color::Red,
            Color::LightCyan,
        ];
        SERIES[n % SERIES.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Yellow,
            error: Color::Red,
            warning: Color::Yellow,
            dimmed: Color::Indexed(8),
            controls_bg: Color::Indexed(236),
            text_primary: Color::White,
            table_header: Color::White,
            table_border: Color::Cyan,
            focus_border: Color::Yellow,
            checked: Color::Green,
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
