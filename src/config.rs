use crate::error::{Error, Result};
use crate::game::modifiers::Modifiers;
use crate::game::pool::DEFAULT_ACTIVE_POOL_CAPACITY;
use crate::game::scroll::ScrollDirection;
use crate::game::timing_windows::{DEFAULT_PRESS_WINDOW_LATEST_MS, DEFAULT_RELEASE_WINDOW_LATEST_MS};
use ini::Ini;
use log::{info, warn};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH: &str = "lanesync.ini";
const SECTION: &str = "Gameplay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Pixels per millisecond at 1.0x scroll velocity.
    pub scroll_speed: f32,
    pub scroll_direction: ScrollDirection,
    /// Receptor Y in pixels.
    pub hit_position_offset: f32,
    pub lane_width: f32,
    pub lane_spacing: f32,
    pub playfield_x: f32,
    pub press_window_latest_ms: f32,
    pub release_window_latest_ms: f32,
    pub active_pool_capacity: usize,
    pub playback_rate: f32,
    pub bar_offset: f32,
    pub measure_bars: bool,
    pub color_by_snap: bool,
    pub modifiers: Modifiers,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scroll_speed: 1.0,
            scroll_direction: ScrollDirection::Down,
            hit_position_offset: 600.0,
            lane_width: 96.0,
            lane_spacing: 0.0,
            playfield_x: 448.0,
            press_window_latest_ms: DEFAULT_PRESS_WINDOW_LATEST_MS,
            release_window_latest_ms: DEFAULT_RELEASE_WINDOW_LATEST_MS,
            active_pool_capacity: DEFAULT_ACTIVE_POOL_CAPACITY,
            playback_rate: 1.0,
            bar_offset: 0.0,
            measure_bars: true,
            color_by_snap: true,
            modifiers: Modifiers::empty(),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Left edge of 1-based `lane`.
    #[inline(always)]
    pub fn receptor_x(&self, lane: usize) -> f32 {
        let index = lane.saturating_sub(1) as f32;
        index.mul_add(self.lane_width + self.lane_spacing, self.playfield_x)
    }

    pub fn to_ini_string(&self) -> String {
        let flag = |b: bool| if b { "1" } else { "0" };
        let mut content = String::new();
        content.push_str("[Gameplay]\n");
        // Keys in alphabetical order
        let _ = writeln!(content, "ActivePoolCapacity={}", self.active_pool_capacity);
        let _ = writeln!(content, "BarOffset={}", self.bar_offset);
        let _ = writeln!(content, "ColorBySnap={}", flag(self.color_by_snap));
        let _ = writeln!(content, "DownScroll={}", flag(self.scroll_direction.is_down()));
        let _ = writeln!(content, "HitPositionOffset={}", self.hit_position_offset);
        let _ = writeln!(content, "LaneSpacing={}", self.lane_spacing);
        let _ = writeln!(content, "LaneWidth={}", self.lane_width);
        let _ = writeln!(content, "LogLevel={}", self.log_level.as_str());
        let _ = writeln!(content, "MeasureBars={}", flag(self.measure_bars));
        let _ = writeln!(content, "Modifiers={}", self.modifiers);
        let _ = writeln!(content, "PlaybackRate={}", self.playback_rate);
        let _ = writeln!(content, "PlayfieldX={}", self.playfield_x);
        let _ = writeln!(content, "PressWindowLatest={}", self.press_window_latest_ms);
        let _ = writeln!(content, "ReleaseWindowLatest={}", self.release_window_latest_ms);
        let _ = writeln!(content, "ScrollSpeed={}", self.scroll_speed);
        content
    }

    pub fn from_ini_str(content: &str) -> Result<Self> {
        let conf = Ini::load_from_str(content).map_err(|e| Error::Config {
            path: CONFIG_PATH.into(),
            message: e.to_string(),
        })?;
        Ok(Self::from_ini(&conf))
    }

    /// Populates a config from `conf`, using defaults for missing or invalid keys.
    pub fn from_ini(conf: &Ini) -> Self {
        let default = Self::default();
        let get = |key: &str| conf.get_from(Some(SECTION), key).map(str::trim);

        let scroll_speed = get("ScrollSpeed")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite() && *v > 0.0);
        let press_window = get("PressWindowLatest")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0);
        let release_window = get("ReleaseWindowLatest")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0);
        let playback_rate = get("PlaybackRate")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite() && *v > 0.0);
        let modifiers = get("Modifiers").map(Modifiers::from_str);

        Self {
            scroll_speed: scroll_speed.unwrap_or_else(|| {
                warn_invalid(&get, "ScrollSpeed");
                default.scroll_speed
            }),
            scroll_direction: get("DownScroll")
                .and_then(parse_bool)
                .map_or(default.scroll_direction, ScrollDirection::from_downscroll),
            hit_position_offset: get("HitPositionOffset")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.hit_position_offset),
            lane_width: get("LaneWidth")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default.lane_width),
            lane_spacing: get("LaneSpacing")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.lane_spacing),
            playfield_x: get("PlayfieldX")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.playfield_x),
            press_window_latest_ms: press_window.unwrap_or_else(|| {
                warn_invalid(&get, "PressWindowLatest");
                default.press_window_latest_ms
            }),
            release_window_latest_ms: release_window.unwrap_or_else(|| {
                warn_invalid(&get, "ReleaseWindowLatest");
                default.release_window_latest_ms
            }),
            active_pool_capacity: get("ActivePoolCapacity")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default.active_pool_capacity),
            playback_rate: playback_rate.unwrap_or_else(|| {
                warn_invalid(&get, "PlaybackRate");
                default.playback_rate
            }),
            bar_offset: get("BarOffset")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default.bar_offset),
            measure_bars: get("MeasureBars")
                .and_then(parse_bool)
                .unwrap_or(default.measure_bars),
            color_by_snap: get("ColorBySnap")
                .and_then(parse_bool)
                .unwrap_or(default.color_by_snap),
            modifiers: match modifiers {
                Some(Ok(mods)) => mods,
                Some(Err(e)) => {
                    warn!("{e}; ignoring Modifiers.");
                    default.modifiers
                }
                None => default.modifiers,
            },
            log_level: get("LogLevel")
                .and_then(|v| LogLevel::from_str(v).ok())
                .unwrap_or(default.log_level),
        }
    }
}

fn warn_invalid<'a>(get: &impl Fn(&str) -> Option<&'a str>, key: &str) {
    if let Some(raw) = get(key) {
        warn!("Invalid value '{raw}' for {key}; using default.");
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    if v.is_empty() {
        None
    } else if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no") || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

fn create_default_config_file(path: &Path) -> std::result::Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, Config::default().to_ini_string())
}

/// Loads the config at `path`, writing a default file when it does not exist.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        if let Err(e) = create_default_config_file(path) {
            warn!("Failed to create default config file: {e}");
        }
        return Ok(Config::default());
    }
    let conf = Ini::load_from_file(path).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let cfg = Config::from_ini(&conf);
    info!("Loaded config from '{}'.", path.display());
    Ok(cfg)
}
