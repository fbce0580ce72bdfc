use crate::game::modifiers::Modifiers;
use crate::game::scroll::ScrollParams;
use crate::game::timing::{SvTimeline, TimingPoint, TrackOffset};
use log::{info, warn};

pub const BEATS_PER_MEASURE: f32 = 4.0;

#[derive(Clone, Debug, PartialEq)]
pub struct BarObject {
    pub time_ms: f32,
    pub offset_from_receptor: TrackOffset,
    pub position_y: f32,
}

/// Measure divider lines. All bars are built up front; there are far fewer of
/// them than notes, so they are not streamed.
#[derive(Clone, Debug, Default)]
pub struct MeasureBarManager {
    bars: Vec<BarObject>,
    /// Pixel nudge applied after positioning, to centre the line on the note.
    bar_offset: f32,
}

impl MeasureBarManager {
    pub fn new(
        timing_points: &[TimingPoint],
        song_length_ms: f32,
        timeline: &SvTimeline,
        mods: Modifiers,
        bar_offset: f32,
    ) -> Self {
        let mut bars = Vec::new();
        for (i, point) in timing_points.iter().enumerate() {
            let interval = BEATS_PER_MEASURE * point.beat_length_ms();
            if !interval.is_finite() || interval <= 0.0 {
                warn!(
                    "Skipping measure bars for timing point at {:.2}ms with BPM {}",
                    point.start_time, point.bpm
                );
                continue;
            }
            let end_time = timing_points
                .get(i + 1)
                .map_or(song_length_ms, |next| next.start_time);

            let mut cur = f64::from(point.start_time);
            let mut n = 0u32;
            while cur < f64::from(end_time) - 1.0 {
                bars.push(BarObject {
                    time_ms: cur as f32,
                    offset_from_receptor: timeline.offset_at(cur, mods),
                    position_y: 0.0,
                });
                n += 1;
                cur = f64::from(point.start_time) + f64::from(n) * f64::from(interval);
            }
        }
        info!("Built {} measure bars.", bars.len());
        Self { bars, bar_offset }
    }

    #[inline(always)]
    pub fn bars(&self) -> &[BarObject] {
        &self.bars
    }

    #[inline(always)]
    pub fn bar_offset(&self) -> f32 {
        self.bar_offset
    }

    pub fn update(&mut self, scroll: &ScrollParams, track_position: TrackOffset) {
        for bar in &mut self.bars {
            bar.position_y =
                scroll.pos_from_offset(bar.offset_from_receptor, track_position) + self.bar_offset;
        }
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scroll::ScrollDirection;
    use crate::game::timing::ScrollVelocityPoint;

    fn tp(start_time: f32, bpm: f32) -> TimingPoint {
        TimingPoint { start_time, bpm }
    }

    #[test]
    fn one_bar_per_measure_until_next_point() {
        let timeline = SvTimeline::new(&[]);
        let points = [tp(0.0, 120.0), tp(5000.0, 240.0)];
        let mgr = MeasureBarManager::new(&points, 7000.0, &timeline, Modifiers::empty(), 0.0);
        let times: Vec<f32> = mgr.bars().iter().map(|b| b.time_ms).collect();
        // 2000ms measures up to 5000, then 1000ms measures up to 7000.
        assert_eq!(times, vec![0.0, 2000.0, 4000.0, 5000.0, 6000.0]);
    }

    #[test]
    fn bars_use_sv_offsets_and_follow_the_track() {
        let timeline = SvTimeline::new(&[
            ScrollVelocityPoint {
                target_time: 0.0,
                multiplier: 1.0,
            },
            ScrollVelocityPoint {
                target_time: 2000.0,
                multiplier: 2.0,
            },
        ]);
        let mut mgr =
            MeasureBarManager::new(&[tp(0.0, 120.0)], 6000.0, &timeline, Modifiers::empty(), 5.0);
        assert_eq!(mgr.bars()[2].offset_from_receptor, 200_000 + 400_000);

        let scroll = ScrollParams {
            speed: 0.1,
            direction: ScrollDirection::Down,
            hit_position_offset: 700.0,
        };
        mgr.update(&scroll, 200_000);
        assert_eq!(mgr.bars()[1].position_y, 705.0);
        assert!((mgr.bars()[0].position_y - (700.0 + 200.0 + 5.0)).abs() < 1e-3);
    }

    #[test]
    fn invalid_bpm_segments_produce_no_bars() {
        let timeline = SvTimeline::new(&[]);
        let points = [tp(0.0, 0.0), tp(1000.0, f32::NAN)];
        let mgr = MeasureBarManager::new(&points, 9000.0, &timeline, Modifiers::empty(), 0.0);
        assert!(mgr.bars().is_empty());
    }
}
