use crate::config::Config;
use crate::game::chart::ChartData;
use crate::game::measure::MeasureBarManager;
use crate::game::modifiers::Modifiers;
use crate::game::note::{HitObject, LaneGeometry, NoteEvent, NoteId};
use crate::game::pool::HitObjectPool;
use crate::game::scroll::ScrollParams;
use crate::game::timing::{SvTimeline, TrackOffset, index_for_time, snap_index};
use crate::game::timing_windows::MissWindows;
use crate::game::track::TrackPositionClock;
use log::{debug, info, warn};
use std::sync::Arc;

/// Everything a note manager is built from.
#[derive(Clone, Debug)]
pub struct GameplayContext {
    pub chart: Arc<ChartData>,
    pub config: Config,
    pub modifiers: Modifiers,
}

impl GameplayContext {
    /// Uses the modifiers selected in `config`.
    pub fn new(chart: Arc<ChartData>, config: Config) -> Self {
        Self {
            modifiers: config.modifiers,
            chart,
            config,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReceptorRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteSprite {
    pub id: NoteId,
    pub lane: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    /// Remaining body length in pixels; 0 for taps.
    pub long_note_size: f32,
    pub snap_index: u8,
    pub held: bool,
    pub killed: bool,
}

impl NoteSprite {
    fn from_note(note: &HitObject, held: bool) -> Self {
        Self {
            id: note.id,
            lane: note.lane,
            x: note.x,
            y: note.position_y,
            width: note.width,
            long_note_size: note.current_long_note_size,
            snap_index: note.snap_index,
            held,
            killed: note.is_killed(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BarSprite {
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

/// One frame's worth of render state.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    pub notes: Vec<NoteSprite>,
    pub bars: Vec<BarSprite>,
}

type Listener = Box<dyn FnMut(&NoteEvent)>;

pub struct NoteManager {
    chart: Arc<ChartData>,
    config: Config,
    mods: Modifiers,
    lane_count: usize,

    timeline: SvTimeline,
    clock: TrackPositionClock,
    pool: HitObjectPool,
    bars: MeasureBarManager,

    listeners: Vec<Listener>,
    events: Vec<NoteEvent>,
    log_timer: f32,
}

impl NoteManager {
    pub fn new(ctx: GameplayContext) -> Self {
        let GameplayContext {
            chart,
            config,
            modifiers: mods,
        } = ctx;
        info!(
            "Initializing note manager for '{}' [{}] with modifiers {mods}...",
            chart.title, chart.difficulty
        );

        let lane_count = chart.mode.lane_count();
        let timeline = SvTimeline::new(&chart.slider_velocities);
        let clock = TrackPositionClock::new(&timeline, 0.0, mods);
        let scroll = ScrollParams {
            speed: config.scroll_speed,
            direction: config.scroll_direction,
            hit_position_offset: config.hit_position_offset,
        };
        let lanes: Vec<LaneGeometry> = (1..=lane_count)
            .map(|lane| LaneGeometry {
                x: config.receptor_x(lane),
                width: config.lane_width,
            })
            .collect();

        let mut notes = Vec::with_capacity(chart.hit_objects.len());
        for (i, info) in chart.hit_objects.iter().enumerate() {
            if info.lane == 0 || info.lane > lane_count {
                warn!(
                    "Skipping hit object {i} at {:.2}ms: lane {} is outside 1..={lane_count}",
                    info.start_time, info.lane
                );
                continue;
            }
            let offset = timeline.offset_at(f64::from(info.start_time), mods);
            let ln_offset = if info.is_long_note() {
                timeline.offset_at(f64::from(info.end_time), mods)
            } else {
                offset
            };
            let snap = if config.color_by_snap && !chart.timing_points.is_empty() {
                let point =
                    chart.timing_points[index_for_time(f64::from(info.start_time), &chart.timing_points)];
                snap_index(info.start_time - point.start_time, point.bpm)
            } else {
                0
            };
            notes.push(HitObject::from_info(NoteId(i), info, offset, ln_offset, snap, &scroll));
        }
        info!("Parsed {} notes from chart data.", notes.len());

        let windows = MissWindows::new(
            config.press_window_latest_ms,
            config.release_window_latest_ms,
            config.playback_rate,
        );
        let pool = HitObjectPool::new(
            notes,
            config.active_pool_capacity,
            scroll,
            lanes,
            windows,
            clock.position(),
        );
        let bars = if config.measure_bars {
            MeasureBarManager::new(
                &chart.timing_points,
                chart.song_length_ms(),
                &timeline,
                mods,
                config.bar_offset,
            )
        } else {
            MeasureBarManager::default()
        };

        info!(
            "Note manager ready: {} notes ({} in window), {} measure bars, {} SV points.",
            pool.loaded(),
            pool.active().len(),
            bars.bars().len(),
            timeline.len()
        );

        Self {
            chart,
            config,
            mods,
            lane_count,
            timeline,
            clock,
            pool,
            bars,
            listeners: Vec::new(),
            events: Vec::new(),
            log_timer: 0.0,
        }
    }

    #[inline(always)]
    pub fn chart(&self) -> &ChartData {
        &self.chart
    }

    #[inline(always)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline(always)]
    pub fn modifiers(&self) -> Modifiers {
        self.mods
    }

    #[inline(always)]
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    #[inline(always)]
    pub fn timeline(&self) -> &SvTimeline {
        &self.timeline
    }

    #[inline(always)]
    pub fn clock(&self) -> &TrackPositionClock {
        &self.clock
    }

    #[inline(always)]
    pub fn track_position(&self) -> TrackOffset {
        self.clock.position()
    }

    #[inline(always)]
    pub fn pool(&self) -> &HitObjectPool {
        &self.pool
    }

    #[inline(always)]
    pub fn bars(&self) -> &MeasureBarManager {
        &self.bars
    }

    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.pool.is_finished()
    }

    /// Registers a callback run for every event, in order, during `update`.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&NoteEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Events raised since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<NoteEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn update(&mut self, song_time_ms: f64, delta_time: f32) {
        let track_position = self.clock.update(&self.timeline, song_time_ms, self.mods);
        self.bars.update(self.pool.scroll(), track_position);
        self.pool.update(song_time_ms, track_position);
        self.dispatch_events();

        self.log_timer += delta_time;
        if self.log_timer >= 1.0 {
            info!(
                "Time: {:.2}ms, SV index: {}, Window: {}, Pending: {}, Held: {}, Dead: {}, Destroyed: {}/{}",
                song_time_ms,
                self.clock.current_sv_index(),
                self.pool.active().len(),
                self.pool.pending_len(),
                self.pool.held().len(),
                self.pool.dead().len(),
                self.pool.destroyed(),
                self.pool.loaded()
            );
            self.log_timer -= 1.0;
        }
    }

    fn dispatch_events(&mut self) {
        let events = self.pool.take_events();
        if events.is_empty() {
            return;
        }
        for event in &events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        self.events.extend(events);
    }

    pub fn draw(&self) -> DrawList {
        let pool = &self.pool;
        let mut notes = Vec::with_capacity(pool.active().len() + pool.held().len() + pool.dead().len());
        notes.extend(pool.dead().iter().map(|n| NoteSprite::from_note(n, false)));
        notes.extend(pool.active().iter().map(|n| NoteSprite::from_note(n, false)));
        notes.extend(pool.held().iter().map(|n| NoteSprite::from_note(n, true)));

        let x = self.config.playfield_x;
        let width = self.playfield_width();
        let bars = self
            .bars
            .bars()
            .iter()
            .map(|bar| BarSprite {
                x,
                y: bar.position_y,
                width,
            })
            .collect();
        DrawList { notes, bars }
    }

    fn playfield_width(&self) -> f32 {
        let lanes = self.lane_count as f32;
        (lanes * (self.config.lane_width + self.config.lane_spacing) - self.config.lane_spacing).max(0.0)
    }

    pub fn receptor_rect(&self, lane: usize) -> Option<ReceptorRect> {
        if lane == 0 || lane > self.lane_count {
            return None;
        }
        Some(ReceptorRect {
            x: self.config.receptor_x(lane),
            y: self.config.hit_position_offset,
            width: self.config.lane_width,
        })
    }

    #[inline(always)]
    pub fn first_in_lane(&self, lane: usize) -> Option<usize> {
        self.pool.first_in_lane(lane)
    }

    #[inline(always)]
    pub fn first_held_in_lane(&self, lane: usize) -> Option<usize> {
        self.pool.first_held_in_lane(lane)
    }

    pub fn hit_note(&mut self, index: usize) -> Option<NoteId> {
        let id = self.pool.hit_note(index);
        if let Some(id) = id {
            debug!("HIT: note {} at {:.2}ms", id.0, self.clock.song_time_ms());
        }
        id
    }

    pub fn hold_note(&mut self, index: usize) -> Option<NoteId> {
        let id = self.pool.hold_note(index);
        if let Some(id) = id {
            debug!("HOLD: note {} at {:.2}ms", id.0, self.clock.song_time_ms());
        }
        id
    }

    /// Early release of the held note at `index`.
    pub fn kill_hold(&mut self, index: usize, destroy: bool) -> Option<NoteId> {
        let release_offset = self.timeline.offset_at(self.clock.song_time_ms(), self.mods);
        let id = self.pool.kill_hold(index, destroy, release_offset);
        if let Some(id) = id {
            debug!(
                "RELEASE: note {} at {:.2}ms (destroyed: {destroy})",
                id.0,
                self.clock.song_time_ms()
            );
        }
        id
    }

    pub fn unload(&mut self) {
        self.pool.clear();
        self.bars.clear();
        self.events.clear();
        self.listeners.clear();
        self.log_timer = 0.0;
        info!("Note manager unloaded.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::{GameMode, HitObjectInfo};
    use crate::game::scroll::ScrollDirection;
    use crate::game::timing::TimingPoint;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn obj(start_time: f32, end_time: f32, lane: usize) -> HitObjectInfo {
        HitObjectInfo {
            start_time,
            end_time,
            lane,
            hit_sound: 0,
        }
    }

    fn manager(hit_objects: Vec<HitObjectInfo>, config: Config) -> NoteManager {
        let chart = ChartData {
            title: "Test".to_string(),
            mode: GameMode::Keys4,
            timing_points: vec![TimingPoint {
                start_time: 0.0,
                bpm: 120.0,
            }],
            hit_objects,
            ..Default::default()
        };
        NoteManager::new(GameplayContext::new(Arc::new(chart), config))
    }

    #[test]
    fn events_reach_listeners_and_the_queue() {
        let mut mgr = manager(vec![obj(1000.0, 0.0, 2)], Config::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        mgr.subscribe(move |e| sink.borrow_mut().push(*e));

        mgr.update(1164.0, 0.016);
        assert!(mgr.drain_events().is_empty(), "miss fired on the window edge");
        mgr.update(1165.0, 0.016);

        assert_eq!(*seen.borrow(), vec![NoteEvent::PressMissed(NoteId(0))]);
        assert_eq!(mgr.drain_events(), vec![NoteEvent::PressMissed(NoteId(0))]);
        assert!(mgr.drain_events().is_empty(), "drain should empty the queue");
    }

    #[test]
    fn every_listener_sees_the_same_ordered_events() {
        let mut mgr = manager(vec![obj(1000.0, 2000.0, 1), obj(1010.0, 0.0, 2)], Config::default());
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&first);
        mgr.subscribe(move |e| sink.borrow_mut().push(*e));
        let sink = Rc::clone(&second);
        mgr.subscribe(move |e| sink.borrow_mut().push(*e));

        mgr.update(1200.0, 0.016);
        let expected = vec![
            NoteEvent::PressMissed(NoteId(0)),
            NoteEvent::ReleaseSkipped(NoteId(0)),
            NoteEvent::PressMissed(NoteId(1)),
        ];
        assert_eq!(*first.borrow(), expected);
        assert_eq!(*second.borrow(), expected, "listeners should agree");
        assert_eq!(mgr.drain_events(), expected);
    }

    #[test]
    fn out_of_range_lanes_are_skipped_but_ids_follow_file_order() {
        let mgr = manager(vec![obj(500.0, 0.0, 5), obj(600.0, 0.0, 4), obj(700.0, 0.0, 0)], Config::default());
        assert_eq!(mgr.pool().loaded(), 1);
        assert_eq!(mgr.pool().active()[0].id, NoteId(1));
    }

    #[test]
    fn notes_are_coloured_by_snap() {
        let mgr = manager(
            vec![obj(500.0, 0.0, 1), obj(250.0, 0.0, 1), obj(125.0, 0.0, 1)],
            Config::default(),
        );
        let snaps: Vec<u8> = mgr.pool().active().iter().map(|n| n.snap_index).collect();
        assert_eq!(snaps, vec![0, 1, 3]);

        let plain = manager(
            vec![obj(250.0, 0.0, 1)],
            Config {
                color_by_snap: false,
                ..Config::default()
            },
        );
        assert_eq!(plain.pool().active()[0].snap_index, 0);
    }

    #[test]
    fn draw_lists_notes_in_their_lanes() {
        let mut mgr = manager(vec![obj(1000.0, 0.0, 2)], Config::default());
        mgr.update(0.0, 0.0);
        let list = mgr.draw();
        assert_eq!(list.notes.len(), 1);
        let sprite = list.notes[0];
        assert_eq!(sprite.x, 448.0 + 96.0);
        assert_eq!(mgr.config().scroll_direction, ScrollDirection::Down);
        assert_eq!(sprite.y, 600.0 - 1000.0);
        assert!(!sprite.held && !sprite.killed);
        assert!(!list.bars.is_empty(), "measure bars should be drawn");
        assert_eq!(list.bars[0].width, 4.0 * 96.0);
    }

    #[test]
    fn measure_bars_can_be_disabled() {
        let mgr = manager(
            vec![obj(5000.0, 0.0, 1)],
            Config {
                measure_bars: false,
                ..Config::default()
            },
        );
        assert!(mgr.bars().bars().is_empty());
    }

    #[test]
    fn early_release_kills_the_hold_at_the_current_time() {
        let mut mgr = manager(vec![obj(1000.0, 3000.0, 1)], Config::default());
        mgr.update(1000.0, 0.016);
        let index = mgr.first_in_lane(1).expect("long note should be in the window");
        assert_eq!(mgr.hold_note(index), Some(NoteId(0)));
        assert_eq!(mgr.first_in_lane(1), None);

        mgr.update(1500.0, 0.016);
        let held = mgr.first_held_in_lane(1).expect("note should be held");
        assert_eq!(mgr.kill_hold(held, false), Some(NoteId(0)));
        let dead = &mgr.pool().dead()[0];
        assert!(dead.is_killed());
        assert_eq!(dead.start_time, 1500.0);
        assert_eq!(dead.offset_from_receptor, 150_000);

        mgr.update(4000.0, 0.016);
        assert_eq!(mgr.pool().dead().len(), 1, "removal needs strictly more than the delay");
        mgr.update(4001.0, 0.016);
        assert!(mgr.is_finished());
        assert!(mgr.drain_events().is_empty(), "an early release is judged elsewhere");
    }

    #[test]
    fn hit_destroys_the_note() {
        let mut mgr = manager(vec![obj(1000.0, 0.0, 3), obj(1200.0, 0.0, 3)], Config::default());
        mgr.update(990.0, 0.016);
        let index = mgr.first_in_lane(3).unwrap();
        assert_eq!(mgr.hit_note(index), Some(NoteId(0)));
        assert_eq!(mgr.pool().destroyed(), 1);
        assert_eq!(mgr.pool().active()[0].id, NoteId(1));
    }

    #[test]
    fn receptor_rects_cover_only_real_lanes() {
        let mgr = manager(Vec::new(), Config::default());
        assert_eq!(mgr.receptor_rect(0), None);
        assert_eq!(mgr.receptor_rect(5), None);
        let rect = mgr.receptor_rect(4).unwrap();
        assert_eq!(rect.x, 448.0 + 3.0 * 96.0);
        assert_eq!(rect.y, 600.0);
    }

    #[test]
    fn unload_clears_everything() {
        let mut mgr = manager(vec![obj(1000.0, 0.0, 1), obj(1000.0, 2000.0, 2)], Config::default());
        mgr.update(2000.0, 0.016);
        mgr.unload();
        assert!(mgr.is_finished());
        assert!(mgr.bars().bars().is_empty());
        assert!(mgr.drain_events().is_empty());
    }
}
