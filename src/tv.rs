//! The four physical displays (and the set-top box behind each).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tv {
    Tv1,
    Tv2,
    Tv3,
    Tv4,
}

impl Tv {
    pub const ALL: [Tv; 4] = [Tv::Tv1, Tv::Tv2, Tv::Tv3, Tv::Tv4];

    pub fn to_int(self) -> u8 {
        match self {
            Tv::Tv1 => 1,
            Tv::Tv2 => 2,
            Tv::Tv3 => 3,
            Tv::Tv4 => 4,
        }
    }

    pub fn of_int(n: u8) -> Option<Tv> {
        match n {
            1 => Some(Tv::Tv1),
            2 => Some(Tv::Tv2),
            3 => Some(Tv::Tv3),
            4 => Some(Tv::Tv4),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_int() {
        for tv in Tv::ALL {
            assert_eq!(Tv::of_int(tv.to_int()), Some(tv));
        }
    }
}
