use crate::error::{Error, Result};
use crate::game::timing::{ScrollVelocityPoint, TimingPoint};
use log::info;
use serde::Deserialize;
use std::path::Path;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum GameMode {
    #[default]
    Keys4,
    Keys7,
}

impl GameMode {
    #[inline(always)]
    pub const fn lane_count(self) -> usize {
        match self {
            Self::Keys4 => 4,
            Self::Keys7 => 7,
        }
    }
}

/// One hit object as it appears in the chart file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HitObjectInfo {
    pub start_time: f32,
    /// 0 for tap notes.
    #[serde(default)]
    pub end_time: f32,
    /// 1-based lane.
    pub lane: usize,
    #[serde(default)]
    pub hit_sound: u8,
}

impl HitObjectInfo {
    #[inline(always)]
    pub fn is_long_note(&self) -> bool {
        self.end_time > 0.0
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub mode: GameMode,
    /// Length of the audio in milliseconds; 0 when unknown.
    #[serde(default)]
    pub length_ms: f32,
    #[serde(default)]
    pub timing_points: Vec<TimingPoint>,
    #[serde(default)]
    pub slider_velocities: Vec<ScrollVelocityPoint>,
    #[serde(default)]
    pub hit_objects: Vec<HitObjectInfo>,
}

impl ChartData {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut chart: Self = serde_json::from_str(json)?;
        chart.sort_timelines();
        Ok(chart)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let chart = Self::from_json_str(&content)?;
        info!(
            "Loaded chart '{}' [{}]: {} hit objects, {} timing points, {} SVs.",
            chart.title,
            chart.difficulty,
            chart.hit_objects.len(),
            chart.timing_points.len(),
            chart.slider_velocities.len()
        );
        Ok(chart)
    }

    /// Timelines must be ascending for index lookups. Hit objects keep file order.
    pub fn sort_timelines(&mut self) {
        self.timing_points
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        self.slider_velocities
            .sort_by(|a, b| a.target_time.total_cmp(&b.target_time));
    }

    /// Falls back to the latest object time when the audio length is unknown.
    pub fn song_length_ms(&self) -> f32 {
        if self.length_ms.is_finite() && self.length_ms > 0.0 {
            return self.length_ms;
        }
        self.hit_objects
            .iter()
            .map(|h| h.start_time.max(h.end_time))
            .fold(0.0_f32, f32::max)
    }
}
