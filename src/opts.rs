use std::{
    fmt::{self, Display},
    str::FromStr,
};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoiseLevel {
    Polite,
    LoudAndProud,
    FranklyQuitePedantic,
}

impl NoiseLevel {
    pub fn from_occurrences(occurrences: u64) -> Self {
        match occurrences {
            0 => Self::Polite,
            1 => Self::LoudAndProud,
            _ => Self::FranklyQuitePedantic,
        }
    }
}

/// Which flavor of host app the pods get integrated into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    ObjC,
    Swift,
}

impl Mode {
    pub const POSSIBLE_VALUES: &'static [&'static str] = &["objc", "objective-c", "swift"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ObjC => "objc",
            Self::Swift => "swift",
        }
    }

    pub fn swift(self) -> bool {
        matches!(self, Self::Swift)
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("{mode:?} isn't a known mode; expected one of `objc`, `objective-c`, or `swift`")]
pub struct ModeInvalid {
    mode: String,
}

impl FromStr for Mode {
    type Err = ModeInvalid;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "objc" | "objective-c" => Ok(Self::ObjC),
            "swift" => Ok(Self::Swift),
            _ => Err(ModeInvalid {
                mode: mode.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest(
        input,
        expected,
        case("objc", Mode::ObjC),
        case("objective-c", Mode::ObjC),
        case("swift", Mode::Swift)
    )]
    fn test_mode_from_str(input: &str, expected: Mode) {
        assert_eq!(input.parse::<Mode>().unwrap(), expected);
    }

    #[test]
    fn test_mode_from_str_rejects_unknown() {
        assert_eq!(
            "kotlin".parse::<Mode>().unwrap_err(),
            ModeInvalid {
                mode: "kotlin".to_owned()
            }
        );
    }

    #[rstest(
        occurrences,
        expected,
        case(0, NoiseLevel::Polite),
        case(1, NoiseLevel::LoudAndProud),
        case(2, NoiseLevel::FranklyQuitePedantic),
        case(7, NoiseLevel::FranklyQuitePedantic)
    )]
    fn test_noise_level_from_occurrences(occurrences: u64, expected: NoiseLevel) {
        assert_eq!(NoiseLevel::from_occurrences(occurrences), expected);
    }
}
