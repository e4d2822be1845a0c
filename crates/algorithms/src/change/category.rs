//! Change categories and their class-map codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class-map code of an unchanged pixel
pub const NO_CHANGE_CODE: u8 = 0;

/// Land-cover change category, in fixed model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeCategory {
    Deforestation,
    Water,
    Urban,
    Agriculture,
}

impl ChangeCategory {
    pub const COUNT: usize = 4;

    /// Model output order; ties in argmax resolve toward the front
    pub const ALL: [ChangeCategory; Self::COUNT] =
        [Self::Deforestation, Self::Water, Self::Urban, Self::Agriculture];

    /// Position in model output order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Class-map code (1..=4)
    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1..=4 => Some(Self::ALL[usize::from(code - 1)]),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Deforestation => "Deforestation",
            Self::Water => "Water",
            Self::Urban => "Urban",
            Self::Agriculture => "Agriculture",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for category in ChangeCategory::ALL {
            assert_eq!(ChangeCategory::from_code(category.code()), Some(category));
        }
        assert_eq!(ChangeCategory::Deforestation.code(), 1);
        assert_eq!(ChangeCategory::Agriculture.code(), 4);
        assert_eq!(ChangeCategory::from_code(NO_CHANGE_CODE), None);
        assert_eq!(ChangeCategory::from_code(5), None);
    }

    #[test]
    fn names() {
        let names: Vec<_> = ChangeCategory::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, ["Deforestation", "Water", "Urban", "Agriculture"]);
    }
}
