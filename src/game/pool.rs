use crate::game::note::{HitObject, LaneGeometry, NoteEvent, NoteId};
use crate::game::scroll::ScrollParams;
use crate::game::timing::TrackOffset;
use crate::game::timing_windows::MissWindows;
use log::debug;
use smallvec::SmallVec;
use std::collections::VecDeque;

pub const DEFAULT_ACTIVE_POOL_CAPACITY: usize = 255;

pub type EventBuffer = SmallVec<[NoteEvent; 8]>;

/// Owns every live note in one of three lifecycle collections.
///
/// The active collection is a render window of at most `capacity` initialized
/// notes followed by a pending tail that is streamed into the window, in chart
/// order, as slots free up. Held notes are long notes whose head was hit; dead
/// notes are missed notes still fading out. Moves between collections are by
/// value, so a note can never sit in two of them.
#[derive(Debug)]
pub struct HitObjectPool {
    capacity: usize,
    scroll: ScrollParams,
    lanes: Vec<LaneGeometry>,
    windows: MissWindows,

    active: Vec<HitObject>,
    pending: VecDeque<HitObject>,
    held: Vec<HitObject>,
    dead: Vec<HitObject>,

    loaded: usize,
    destroyed: usize,
    song_time_ms: f64,
    track_position: TrackOffset,
    events: EventBuffer,
}

impl HitObjectPool {
    pub fn new(
        notes: Vec<HitObject>,
        capacity: usize,
        scroll: ScrollParams,
        lanes: Vec<LaneGeometry>,
        windows: MissWindows,
        track_position: TrackOffset,
    ) -> Self {
        let capacity = capacity.max(1);
        let loaded = notes.len();
        let mut pool = Self {
            capacity,
            scroll,
            lanes,
            windows,
            active: Vec::with_capacity(capacity.min(loaded)),
            pending: VecDeque::from(notes),
            held: Vec::new(),
            dead: Vec::new(),
            loaded,
            destroyed: 0,
            song_time_ms: 0.0,
            track_position,
            events: EventBuffer::new(),
        };
        while pool.active.len() < capacity && !pool.pending.is_empty() {
            pool.create_note();
        }
        pool
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn scroll(&self) -> &ScrollParams {
        &self.scroll
    }

    #[inline(always)]
    pub fn lanes(&self) -> &[LaneGeometry] {
        &self.lanes
    }

    #[inline(always)]
    pub fn windows(&self) -> &MissWindows {
        &self.windows
    }

    /// Initialized notes in the render window.
    #[inline(always)]
    pub fn active(&self) -> &[HitObject] {
        &self.active
    }

    /// Notes waiting for a window slot.
    pub fn pending(&self) -> impl Iterator<Item = &HitObject> {
        self.pending.iter()
    }

    #[inline(always)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Window plus pending tail.
    #[inline(always)]
    pub fn active_len(&self) -> usize {
        self.active.len() + self.pending.len()
    }

    #[inline(always)]
    pub fn held(&self) -> &[HitObject] {
        &self.held
    }

    #[inline(always)]
    pub fn dead(&self) -> &[HitObject] {
        &self.dead
    }

    #[inline(always)]
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    #[inline(always)]
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    #[inline(always)]
    pub fn live_len(&self) -> usize {
        self.active_len() + self.held.len() + self.dead.len()
    }

    #[inline(always)]
    pub fn is_finished(&self) -> bool {
        self.live_len() == 0
    }

    pub fn take_events(&mut self) -> EventBuffer {
        std::mem::take(&mut self.events)
    }

    /// Index in the active window of the earliest note in `lane`.
    pub fn first_in_lane(&self, lane: usize) -> Option<usize> {
        self.active.iter().position(|n| n.lane == lane)
    }

    pub fn first_held_in_lane(&self, lane: usize) -> Option<usize> {
        self.held.iter().position(|n| n.lane == lane)
    }

    /// Runs one frame of lifecycle transitions.
    pub fn update(&mut self, song_time_ms: f64, track_position: TrackOffset) {
        self.song_time_ms = song_time_ms;
        self.track_position = track_position;
        self.update_active();
        self.update_held();
        self.update_dead();
    }

    fn update_active(&mut self) {
        let mut i = 0;
        while i < self.active.len() {
            if self
                .windows
                .is_press_missed(self.song_time_ms, self.active[i].start_time)
            {
                let mut note = self.active.remove(i);
                note.kill();
                self.events.push(NoteEvent::PressMissed(note.id));
                if note.is_long_note {
                    self.events.push(NoteEvent::ReleaseSkipped(note.id));
                }
                debug!(
                    "MISSED: note {} lane {} at {:.2}ms (start {:.2}ms)",
                    note.id.0, note.lane, self.song_time_ms, note.start_time
                );
                self.dead.push(note);
                self.create_note();
                // The next note slid into slot i.
                continue;
            }
            self.active[i].reposition(&self.scroll, self.track_position);
            i += 1;
        }
    }

    fn update_held(&mut self) {
        let mut i = 0;
        while i < self.held.len() {
            if self
                .windows
                .is_release_missed(self.song_time_ms, self.held[i].end_time)
            {
                let mut note = self.held.remove(i);
                note.kill();
                self.events.push(NoteEvent::ReleaseMissed(note.id));
                debug!(
                    "RELEASE MISSED: note {} lane {} at {:.2}ms (end {:.2}ms)",
                    note.id.0, note.lane, self.song_time_ms, note.end_time
                );
                self.dead.push(note);
                continue;
            }

            let note = &mut self.held[i];
            if self.song_time_ms > f64::from(note.start_time) {
                note.current_long_note_size = self
                    .scroll
                    .span_to_pixels(note.ln_offset_from_receptor - self.track_position)
                    .max(0.0);
                note.position_y = self.scroll.hit_position_offset;
            } else {
                note.current_long_note_size = note.initial_long_note_size;
                note.reposition(&self.scroll, self.track_position);
            }
            i += 1;
        }
    }

    fn update_dead(&mut self) {
        let mut i = 0;
        while i < self.dead.len() {
            let note = &self.dead[i];
            if self
                .windows
                .is_removable(self.song_time_ms, note.start_time, note.end_time)
            {
                let note = self.dead.remove(i);
                debug!("Removed dead note {}", note.id.0);
                self.destroyed += 1;
                continue;
            }
            self.dead[i].reposition(&self.scroll, self.track_position);
            i += 1;
        }
    }

    /// Streams the next pending note into the render window.
    fn create_note(&mut self) {
        if self.active.len() >= self.capacity {
            return;
        }
        let Some(mut note) = self.pending.pop_front() else {
            return;
        };
        let lane = self
            .lanes
            .get(note.lane.wrapping_sub(1))
            .copied()
            .unwrap_or(LaneGeometry { x: 0.0, width: 0.0 });
        note.initialize(lane, &self.scroll, self.track_position);
        self.active.push(note);
    }

    /// Successful tap: the note at `index` in the window is destroyed.
    pub fn hit_note(&mut self, index: usize) -> Option<NoteId> {
        if index >= self.active.len() {
            return None;
        }
        let note = self.active.remove(index);
        self.destroyed += 1;
        self.create_note();
        Some(note.id)
    }

    /// Long note head hit: moves the note at `index` into the hold pool.
    /// Tap notes have no release and are left in place.
    pub fn hold_note(&mut self, index: usize) -> Option<NoteId> {
        if !self.active.get(index).is_some_and(|n| n.is_long_note) {
            return None;
        }
        let note = self.active.remove(index);
        let id = note.id;
        self.held.push(note);
        self.create_note();
        Some(id)
    }

    /// Ends a hold early. The body is cut at `release_offset`, the track
    /// offset of the current song time. With `destroy` the note is gone
    /// (successful release); otherwise it fades out in the dead pool.
    pub fn kill_hold(&mut self, index: usize, destroy: bool, release_offset: TrackOffset) -> Option<NoteId> {
        if index >= self.held.len() {
            return None;
        }
        let mut note = self.held.remove(index);
        let id = note.id;
        if destroy {
            self.destroyed += 1;
            return Some(id);
        }
        note.start_time = self.song_time_ms as f32;
        note.offset_from_receptor = release_offset;
        note.current_long_note_size = self
            .scroll
            .span_to_pixels(note.ln_offset_from_receptor - release_offset)
            .max(0.0);
        note.kill();
        note.reposition(&self.scroll, self.track_position);
        self.dead.push(note);
        Some(id)
    }

    /// Drops every note; nothing is reported as destroyed.
    pub fn clear(&mut self) {
        self.active.clear();
        self.pending.clear();
        self.held.clear();
        self.dead.clear();
        self.events.clear();
    }
}
