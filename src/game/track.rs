use crate::game::modifiers::Modifiers;
use crate::game::timing::{SvTimeline, TrackOffset};
use log::debug;

/// Scroll cursor that follows the song clock.
#[derive(Debug, Clone, Default)]
pub struct TrackPositionClock {
    current_sv_index: usize,
    song_time_ms: f64,
    position: TrackOffset,
}

impl TrackPositionClock {
    pub fn new(timeline: &SvTimeline, song_time_ms: f64, mods: Modifiers) -> Self {
        let mut clock = Self::default();
        clock.current_sv_index = timeline.index_for_time(song_time_ms);
        clock.update(timeline, song_time_ms, mods);
        clock
    }

    #[inline(always)]
    pub fn current_sv_index(&self) -> usize {
        self.current_sv_index
    }

    #[inline(always)]
    pub fn song_time_ms(&self) -> f64 {
        self.song_time_ms
    }

    #[inline(always)]
    pub fn position(&self) -> TrackOffset {
        self.position
    }

    /// Moves the cursor to `song_time_ms` and returns the new track position.
    pub fn update(&mut self, timeline: &SvTimeline, song_time_ms: f64, mods: Modifiers) -> TrackOffset {
        self.song_time_ms = song_time_ms;
        self.resolve_index(timeline, song_time_ms);
        self.position = self.current_position(timeline, mods);
        self.position
    }

    #[inline(always)]
    pub fn current_position(&self, timeline: &SvTimeline, mods: Modifiers) -> TrackOffset {
        timeline.offset_from_time(self.song_time_ms, self.current_sv_index, mods)
    }

    fn resolve_index(&mut self, timeline: &SvTimeline, t: f64) {
        let len = timeline.len();
        if len <= 1 {
            self.current_sv_index = 0;
            return;
        }
        let last = len - 1;
        let points = timeline.points();
        if t >= f64::from(points[last].target_time) {
            self.current_sv_index = last;
            return;
        }
        let idx = self.current_sv_index.min(last);
        if idx > 0 && t < f64::from(points[idx].target_time) {
            // Seeked backwards past the cached segment.
            let resolved = timeline.index_for_time(t);
            debug!("Track clock rewound to {t:.2}ms, SV index {idx} -> {resolved}");
            self.current_sv_index = resolved;
            return;
        }
        let mut idx = idx;
        while idx < last && t >= f64::from(points[idx + 1].target_time) {
            idx += 1;
        }
        self.current_sv_index = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::timing::ScrollVelocityPoint;

    fn timeline() -> SvTimeline {
        let points: Vec<_> = [(0.0, 1.0), (1000.0, 2.0), (2000.0, 0.5), (3000.0, 1.0)]
            .iter()
            .map(|&(target_time, multiplier)| ScrollVelocityPoint {
                target_time,
                multiplier,
            })
            .collect();
        SvTimeline::new(&points)
    }

    #[test]
    fn advances_incrementally_and_matches_fresh_lookup() {
        let timeline = timeline();
        let mods = Modifiers::empty();
        let mut clock = TrackPositionClock::new(&timeline, 0.0, mods);
        let mut last = clock.position();
        let mut t = 0.0;
        while t < 4000.0 {
            let pos = clock.update(&timeline, t, mods);
            assert_eq!(clock.current_sv_index(), timeline.index_for_time(t), "time {t}");
            assert_eq!(pos, timeline.offset_at(t, mods), "time {t}");
            assert!(pos >= last, "position regressed at {t}");
            last = pos;
            t += 16.0;
        }
    }

    #[test]
    fn can_jump_several_segments_in_one_frame() {
        let timeline = timeline();
        let mods = Modifiers::empty();
        let mut clock = TrackPositionClock::new(&timeline, 0.0, mods);
        clock.update(&timeline, 2500.0, mods);
        assert_eq!(clock.current_sv_index(), 2);
    }

    #[test]
    fn backwards_seek_regresses_the_cached_index() {
        let timeline = timeline();
        let mods = Modifiers::empty();
        let mut clock = TrackPositionClock::new(&timeline, 3500.0, mods);
        assert_eq!(clock.current_sv_index(), 3);
        let pos = clock.update(&timeline, 500.0, mods);
        assert_eq!(clock.current_sv_index(), 0);
        assert_eq!(pos, 50_000);
        assert_eq!(clock.song_time_ms(), 500.0);
    }

    #[test]
    fn no_sv_position_is_raw_time() {
        let timeline = timeline();
        let mut clock = TrackPositionClock::new(&timeline, 0.0, Modifiers::NO_SLIDER_VELOCITY);
        assert_eq!(
            clock.update(&timeline, 2500.0, Modifiers::NO_SLIDER_VELOCITY),
            250_000
        );
    }

    #[test]
    fn pre_roll_times_extrapolate_below_zero() {
        let timeline = timeline();
        let clock = TrackPositionClock::new(&timeline, -2000.0, Modifiers::empty());
        assert_eq!(clock.current_sv_index(), 0);
        assert_eq!(clock.position(), -200_000);
    }
}
