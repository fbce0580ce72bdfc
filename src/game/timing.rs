use crate::game::modifiers::Modifiers;
use serde::Deserialize;

/// Track positions are signed fixed point: `OFFSET_SCALE` units per millisecond
/// of 1.0x scroll. i64 covers roughly +/-2.9 million years of chart time at 1.0x,
/// so negative multipliers and pre-roll times never leave the range.
pub type TrackOffset = i64;
pub const OFFSET_SCALE: f64 = 100.0;

// Snap divisors of a 48-row beat: 1/1, 1/2, 1/3, 1/4, 1/6, 1/8, 1/12, 1/16.
pub const BEAT_SNAPS: [i64; 8] = [48, 24, 16, 12, 8, 6, 4, 3];
pub const UNSNAPPED_INDEX: u8 = 8;
// Notes up to this many ms early still count as on the snap.
const SNAP_BUFFER_MS: f64 = 2.0;

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct TimingPoint {
    pub start_time: f32,
    pub bpm: f32,
}

impl TimingPoint {
    #[inline(always)]
    pub fn beat_length_ms(&self) -> f32 {
        60000.0 / self.bpm
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct ScrollVelocityPoint {
    pub target_time: f32,
    pub multiplier: f32,
}

/// Anything ordered on the song timeline.
pub trait TimedPoint {
    fn time(&self) -> f32;
}

impl TimedPoint for TimingPoint {
    #[inline(always)]
    fn time(&self) -> f32 {
        self.start_time
    }
}

impl TimedPoint for ScrollVelocityPoint {
    #[inline(always)]
    fn time(&self) -> f32 {
        self.target_time
    }
}

/// Index of the segment governing `time_ms`: the `i` with
/// `points[i] <= time_ms < points[i + 1]`, the last index past the end, and 0
/// before the first point or for timelines of length 0 or 1.
#[inline(always)]
pub fn index_for_time<P: TimedPoint>(time_ms: f64, points: &[P]) -> usize {
    if points.len() <= 1 {
        return 0;
    }
    let idx = points.partition_point(|p| f64::from(p.time()) <= time_ms);
    idx.saturating_sub(1)
}

#[inline(always)]
pub fn flat_offset(time_ms: f64) -> TrackOffset {
    (time_ms * OFFSET_SCALE).round() as TrackOffset
}

#[inline(always)]
pub fn offset_to_ms(offset: TrackOffset) -> f64 {
    offset as f64 / OFFSET_SCALE
}

/// Scroll velocity points with the cumulative track offset at each point.
#[derive(Clone, Debug, Default)]
pub struct SvTimeline {
    points: Vec<ScrollVelocityPoint>,
    table: Vec<TrackOffset>,
}

impl SvTimeline {
    pub fn new(points: &[ScrollVelocityPoint]) -> Self {
        let mut table = Vec::with_capacity(points.len());
        let mut cumulative: TrackOffset = 0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                let prev = points[i - 1];
                let span =
                    f64::from(point.target_time - prev.target_time) * f64::from(prev.multiplier);
                cumulative += (span * OFFSET_SCALE).round() as TrackOffset;
            }
            table.push(cumulative);
        }
        Self {
            points: points.to_vec(),
            table,
        }
    }

    #[inline(always)]
    pub fn points(&self) -> &[ScrollVelocityPoint] {
        &self.points
    }

    #[inline(always)]
    pub fn table(&self) -> &[TrackOffset] {
        &self.table
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline(always)]
    pub fn index_for_time(&self, time_ms: f64) -> usize {
        index_for_time(time_ms, &self.points)
    }

    /// Start time of segment `sv_index`, or `None` when the timeline is flat.
    #[inline(always)]
    pub fn segment_start(&self, sv_index: usize) -> Option<f32> {
        self.points.get(sv_index).map(|p| p.target_time)
    }

    /// Track offset at `time_ms` evaluated on segment `sv_index`.
    pub fn offset_from_time(&self, time_ms: f64, sv_index: usize, mods: Modifiers) -> TrackOffset {
        if mods.no_slider_velocity() || self.points.is_empty() {
            return flat_offset(time_ms);
        }
        let i = sv_index.min(self.points.len() - 1);
        let point = self.points[i];
        let delta = (time_ms - f64::from(point.target_time)) * f64::from(point.multiplier);
        self.table[i] + (delta * OFFSET_SCALE).round() as TrackOffset
    }

    #[inline(always)]
    pub fn offset_at(&self, time_ms: f64, mods: Modifiers) -> TrackOffset {
        self.offset_from_time(time_ms, self.index_for_time(time_ms), mods)
    }
}

/// Colour bucket for a note `offset_ms` after its timing point.
pub fn snap_index(offset_ms: f32, bpm: f32) -> u8 {
    if !bpm.is_finite() || bpm <= 0.0 || !offset_ms.is_finite() {
        return UNSNAPPED_INDEX;
    }
    let beat_length = 60000.0 / f64::from(bpm);
    let pos = (f64::from(offset_ms) + SNAP_BUFFER_MS).rem_euclid(beat_length);
    let index = (48.0 * pos / beat_length).floor() as i64;
    BEAT_SNAPS
        .iter()
        .position(|snap| index % snap == 0)
        .map_or(UNSNAPPED_INDEX, |i| i as u8)
}
