use crate::game::timing::{OFFSET_SCALE, TrackOffset};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    #[default]
    Up,
    Down,
}

impl ScrollDirection {
    #[inline(always)]
    pub const fn from_downscroll(downscroll: bool) -> Self {
        if downscroll { Self::Down } else { Self::Up }
    }

    #[inline(always)]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Down)
    }

    #[inline(always)]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "Up",
            Self::Down => "Down",
        })
    }
}

impl FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "0" | "false" => Ok(Self::Up),
            "down" | "1" | "true" => Ok(Self::Down),
            other => Err(format!("Scroll direction '{other}' must be Up or Down")),
        }
    }
}

/// Static layout of the note field along the scroll axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollParams {
    /// Pixels per millisecond of 1.0x scroll.
    pub speed: f32,
    pub direction: ScrollDirection,
    /// Receptor Y in pixels.
    pub hit_position_offset: f32,
}

impl ScrollParams {
    #[inline(always)]
    pub fn pos_from_offset(&self, object_offset: TrackOffset, track_position: TrackOffset) -> f32 {
        pos_from_offset(
            object_offset,
            track_position,
            self.speed,
            self.direction,
            self.hit_position_offset,
        )
    }

    /// Pixel length covered by a span of track offset.
    #[inline(always)]
    pub fn span_to_pixels(&self, span: TrackOffset) -> f32 {
        (span as f64 / OFFSET_SCALE) as f32 * self.speed
    }
}

/// Screen Y of an object `object_offset` on a track currently at `track_position`.
/// Pure: the same inputs always give the same bits.
#[inline(always)]
pub fn pos_from_offset(
    object_offset: TrackOffset,
    track_position: TrackOffset,
    scroll_speed: f32,
    direction: ScrollDirection,
    hit_position_offset: f32,
) -> f32 {
    let distance_ms = ((object_offset - track_position) as f64 / OFFSET_SCALE) as f32;
    hit_position_offset + distance_ms * direction.sign() * scroll_speed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_deterministic() {
        let a = pos_from_offset(123_456, 100_000, 0.85, ScrollDirection::Down, 640.0);
        let b = pos_from_offset(123_456, 100_000, 0.85, ScrollDirection::Down, 640.0);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn flipping_direction_negates_only_the_distance_term() {
        let hit = 50.0;
        let up = pos_from_offset(250_000, 200_000, 1.5, ScrollDirection::Up, hit);
        let down = pos_from_offset(250_000, 200_000, 1.5, ScrollDirection::Down, hit);
        assert!((up - hit - 750.0).abs() < 1e-3, "up = {up}");
        assert!(((up - hit) + (down - hit)).abs() < 1e-3, "up = {up}, down = {down}");
    }

    #[test]
    fn object_on_track_position_sits_on_receptor() {
        for direction in [ScrollDirection::Up, ScrollDirection::Down] {
            let y = pos_from_offset(77_700, 77_700, 2.0, direction, 123.0);
            assert_eq!(y, 123.0);
        }
    }

    #[test]
    fn parses_direction_strings() {
        assert_eq!("Down".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert_eq!("0".parse::<ScrollDirection>(), Ok(ScrollDirection::Up));
        assert!("sideways".parse::<ScrollDirection>().is_err());
        assert!(ScrollDirection::from_downscroll(true).is_down());
    }
}
