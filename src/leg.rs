use std::fmt;
use std::str::FromStr;

use crate::error::ParseLegError;

/// The four logical legs of the robot.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Leg {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

/// Diagonal pairs used by the trot. Front-left moves with rear-right and
/// front-right moves with rear-left.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DiagonalPair {
    LeftFront,
    RightFront,
}

impl Leg {
    pub const ALL: [Leg; 4] = [Leg::FrontLeft, Leg::FrontRight, Leg::RearLeft, Leg::RearRight];

    /// Index into per-leg arrays.
    pub fn index(self) -> usize {
        match self {
            Leg::FrontLeft => 0,
            Leg::FrontRight => 1,
            Leg::RearLeft => 2,
            Leg::RearRight => 3,
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Leg::FrontLeft => "FL",
            Leg::FrontRight => "FR",
            Leg::RearLeft => "RL",
            Leg::RearRight => "RR",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Leg::FrontLeft => "front-left",
            Leg::FrontRight => "front-right",
            Leg::RearLeft => "rear-left",
            Leg::RearRight => "rear-right",
        }
    }

    /// The diagonal pair this leg trots with.
    pub fn pair(self) -> DiagonalPair {
        match self {
            Leg::FrontLeft | Leg::RearRight => DiagonalPair::LeftFront,
            Leg::FrontRight | Leg::RearLeft => DiagonalPair::RightFront,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl FromStr for Leg {
    type Err = ParseLegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FL" | "FRONT-LEFT" => Ok(Leg::FrontLeft),
            "FR" | "FRONT-RIGHT" => Ok(Leg::FrontRight),
            "RL" | "REAR-LEFT" => Ok(Leg::RearLeft),
            "RR" | "REAR-RIGHT" => Ok(Leg::RearRight),
            _ => Err(ParseLegError(s.to_string())),
        }
    }
}

impl DiagonalPair {
    pub fn legs(self) -> [Leg; 2] {
        match self {
            DiagonalPair::LeftFront => [Leg::FrontLeft, Leg::RearRight],
            DiagonalPair::RightFront => [Leg::FrontRight, Leg::RearLeft],
        }
    }

    /// The pair that is planted while this one swings.
    pub fn other(self) -> DiagonalPair {
        match self {
            DiagonalPair::LeftFront => DiagonalPair::RightFront,
            DiagonalPair::RightFront => DiagonalPair::LeftFront,
        }
    }
}

impl fmt::Display for DiagonalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.legs();
        write!(f, "{}+{}", a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_keys_parse() {
        assert_eq!("FL".parse::<Leg>(), Ok(Leg::FrontLeft));
        assert_eq!("rr".parse::<Leg>(), Ok(Leg::RearRight));
        assert_eq!(" rear-left ".parse::<Leg>(), Ok(Leg::RearLeft));
        assert!("XX".parse::<Leg>().is_err());
    }

    #[test]
    fn test_indices_are_distinct() {
        let mut seen = [false; 4];
        for leg in Leg::ALL {
            assert!(!seen[leg.index()]);
            seen[leg.index()] = true;
        }
    }

    #[test]
    fn test_diagonal_pairs_partition_legs() {
        let a = DiagonalPair::LeftFront.legs();
        let b = DiagonalPair::LeftFront.other().legs();

        for leg in Leg::ALL {
            let in_a = a.contains(&leg);
            let in_b = b.contains(&leg);
            assert!(in_a ^ in_b, "{} must be in exactly one pair", leg);
            assert_eq!(leg.pair() == DiagonalPair::LeftFront, in_a);
        }
        assert_eq!(format!("{}", DiagonalPair::RightFront), "FR+RL");
    }
}
