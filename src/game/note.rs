use crate::game::chart::HitObjectInfo;
use crate::game::scroll::ScrollParams;
use crate::game::timing::TrackOffset;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HitSounds: u8 {
        const NORMAL = 1 << 0;
        const WHISTLE = 1 << 1;
        const FINISH = 1 << 2;
        const CLAP = 1 << 3;
    }
}

/// Index of a hit object in chart file order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub usize);

/// Lifecycle notifications raised by the note pool. Hits are judged by the
/// scoring side and never reported here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteEvent {
    PressMissed(NoteId),
    ReleaseSkipped(NoteId),
    ReleaseMissed(NoteId),
}

impl NoteEvent {
    #[inline(always)]
    pub const fn note(self) -> NoteId {
        match self {
            Self::PressMissed(id) | Self::ReleaseSkipped(id) | Self::ReleaseMissed(id) => id,
        }
    }
}

/// Horizontal placement of one lane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LaneGeometry {
    pub x: f32,
    pub width: f32,
}

/// One note instance. Deliberately not `Clone`: a note lives in exactly one
/// pool and changes pools by move.
#[derive(Debug)]
pub struct HitObject {
    pub id: NoteId,
    pub start_time: f32,
    /// 0 for tap notes.
    pub end_time: f32,
    /// 1-based lane.
    pub lane: usize,
    pub is_long_note: bool,
    pub hit_sounds: HitSounds,
    pub offset_from_receptor: TrackOffset,
    pub ln_offset_from_receptor: TrackOffset,
    /// Body length in pixels.
    pub initial_long_note_size: f32,
    pub current_long_note_size: f32,
    pub snap_index: u8,

    pub x: f32,
    pub width: f32,
    pub position_y: f32,
    initialized: bool,
    killed: bool,
}

impl HitObject {
    pub fn from_info(
        id: NoteId,
        info: &HitObjectInfo,
        offset_from_receptor: TrackOffset,
        ln_offset_from_receptor: TrackOffset,
        snap_index: u8,
        scroll: &ScrollParams,
    ) -> Self {
        let is_long_note = info.is_long_note();
        let initial_long_note_size = if is_long_note {
            scroll
                .span_to_pixels(ln_offset_from_receptor - offset_from_receptor)
                .max(0.0)
        } else {
            0.0
        };
        Self {
            id,
            start_time: info.start_time,
            end_time: info.end_time,
            lane: info.lane,
            is_long_note,
            hit_sounds: HitSounds::from_bits_truncate(info.hit_sound),
            offset_from_receptor,
            ln_offset_from_receptor: if is_long_note {
                ln_offset_from_receptor
            } else {
                offset_from_receptor
            },
            initial_long_note_size,
            current_long_note_size: initial_long_note_size,
            snap_index,
            x: 0.0,
            width: 0.0,
            position_y: scroll.hit_position_offset,
            initialized: false,
            killed: false,
        }
    }

    /// Render-ready setup, deferred until the note enters the active window.
    pub fn initialize(&mut self, lane: LaneGeometry, scroll: &ScrollParams, track_position: TrackOffset) {
        self.x = lane.x;
        self.width = lane.width;
        self.position_y = scroll.pos_from_offset(self.offset_from_receptor, track_position);
        self.initialized = true;
    }

    /// Marks the note as missed; it keeps rendering until removed.
    #[inline(always)]
    pub fn kill(&mut self) {
        self.killed = true;
    }

    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline(always)]
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    #[inline(always)]
    pub fn reposition(&mut self, scroll: &ScrollParams, track_position: TrackOffset) {
        self.position_y = scroll.pos_from_offset(self.offset_from_receptor, track_position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scroll::ScrollDirection;

    fn scroll() -> ScrollParams {
        ScrollParams {
            speed: 0.5,
            direction: ScrollDirection::Up,
            hit_position_offset: 100.0,
        }
    }

    #[test]
    fn long_note_size_follows_offset_span() {
        let info = HitObjectInfo {
            start_time: 1000.0,
            end_time: 3000.0,
            lane: 2,
            hit_sound: 0b1010,
        };
        let note = HitObject::from_info(NoteId(4), &info, 100_000, 300_000, 0, &scroll());
        assert!(note.is_long_note);
        assert_eq!(note.initial_long_note_size, 1000.0);
        assert_eq!(note.current_long_note_size, 1000.0);
        assert_eq!(note.hit_sounds, HitSounds::WHISTLE | HitSounds::CLAP);
        assert!(!note.is_initialized());
    }

    #[test]
    fn initialize_places_note_in_its_lane() {
        let info = HitObjectInfo {
            start_time: 1000.0,
            lane: 1,
            ..Default::default()
        };
        let mut note = HitObject::from_info(NoteId(0), &info, 100_000, 0, 0, &scroll());
        assert_eq!(note.initial_long_note_size, 0.0);
        assert_eq!(note.ln_offset_from_receptor, note.offset_from_receptor);
        note.initialize(LaneGeometry { x: 64.0, width: 32.0 }, &scroll(), 0);
        assert!(note.is_initialized());
        assert_eq!(note.x, 64.0);
        assert_eq!(note.position_y, 100.0 + 500.0);
    }

    #[test]
    fn events_expose_note_identity() {
        assert_eq!(NoteEvent::ReleaseMissed(NoteId(9)).note(), NoteId(9));
    }
}
