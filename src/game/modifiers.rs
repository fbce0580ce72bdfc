use std::fmt;
use std::str::FromStr;

bitflags::bitflags! {
    /// Gameplay modifiers that change how the note field is laid out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        /// Ignore the chart's scroll velocities and scroll at a flat 1.0x.
        const NO_SLIDER_VELOCITY = 1 << 0;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

impl Modifiers {
    #[inline(always)]
    pub const fn no_slider_velocity(self) -> bool {
        self.contains(Self::NO_SLIDER_VELOCITY)
    }
}

impl FromStr for Modifiers {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mods = Self::empty();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "none" => {}
                "nosv" | "noslidervelocity" | "no_slider_velocity" => {
                    mods |= Self::NO_SLIDER_VELOCITY;
                }
                _ => return Err(format!("Unknown modifier '{token}'")),
            }
        }
        Ok(mods)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.no_slider_velocity() {
            f.write_str("NoSV")
        } else {
            f.write_str("None")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Modifiers;
    use std::str::FromStr;

    #[test]
    fn parses_no_sv_aliases_case_insensitively() {
        for text in ["NoSV", "nosv", " NoSliderVelocity ", "None, NoSV"] {
            let mods = Modifiers::from_str(text).expect("modifier list should parse");
            assert!(
                mods.no_slider_velocity(),
                "'{text}' should enable NO_SLIDER_VELOCITY"
            );
        }
    }

    #[test]
    fn empty_and_none_lists_are_empty() {
        assert_eq!(Modifiers::from_str("").unwrap(), Modifiers::empty());
        assert_eq!(Modifiers::from_str("None").unwrap(), Modifiers::empty());
        assert_eq!(Modifiers::default(), Modifiers::empty());
    }

    #[test]
    fn rejects_unknown_tokens() {
        let err = Modifiers::from_str("NoSV,Mirror").unwrap_err();
        assert!(err.contains("Mirror"), "error should name the bad token: {err}");
    }
}
