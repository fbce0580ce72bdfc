// Late miss windows shared by the note pool and the scoring side.

// All windows are in milliseconds of song time.
pub const DEFAULT_PRESS_WINDOW_LATEST_MS: f32 = 164.0;
pub const DEFAULT_RELEASE_WINDOW_LATEST_MS: f32 = 246.0; // 1.5x the press window

// How long a missed note keeps rendering before it is destroyed, at 1.0x rate.
pub const BASE_REMOVE_TIME_AFTER_MISS_MS: f32 = 1000.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MissWindows {
    /// A note that is still unhit this long after its start time is missed.
    pub press_latest_ms: f32,
    /// A held long note that is still unreleased this long after its end time is missed.
    pub release_latest_ms: f32,
    pub remove_after_miss_ms: f32,
}

impl Default for MissWindows {
    fn default() -> Self {
        Self {
            press_latest_ms: DEFAULT_PRESS_WINDOW_LATEST_MS,
            release_latest_ms: DEFAULT_RELEASE_WINDOW_LATEST_MS,
            remove_after_miss_ms: BASE_REMOVE_TIME_AFTER_MISS_MS,
        }
    }
}

impl MissWindows {
    pub fn new(press_latest_ms: f32, release_latest_ms: f32, playback_rate: f32) -> Self {
        Self {
            press_latest_ms,
            release_latest_ms,
            remove_after_miss_ms: remove_time_after_miss_ms(playback_rate),
        }
    }

    #[inline(always)]
    pub fn is_press_missed(&self, song_time_ms: f64, start_time_ms: f32) -> bool {
        song_time_ms > f64::from(start_time_ms) + f64::from(self.press_latest_ms)
    }

    #[inline(always)]
    pub fn is_release_missed(&self, song_time_ms: f64, end_time_ms: f32) -> bool {
        song_time_ms > f64::from(end_time_ms) + f64::from(self.release_latest_ms)
    }

    /// Both the head and the tail must be past the removal delay.
    #[inline(always)]
    pub fn is_removable(&self, song_time_ms: f64, start_time_ms: f32, end_time_ms: f32) -> bool {
        let delay = f64::from(self.remove_after_miss_ms);
        song_time_ms > f64::from(end_time_ms) + delay
            && song_time_ms > f64::from(start_time_ms) + delay
    }
}

#[inline(always)]
pub fn remove_time_after_miss_ms(playback_rate: f32) -> f32 {
    let rate = if playback_rate.is_finite() && playback_rate > 0.0 {
        playback_rate
    } else {
        1.0
    };
    BASE_REMOVE_TIME_AFTER_MISS_MS * rate
}
