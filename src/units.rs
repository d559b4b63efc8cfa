use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// A distance or elevation in meters.
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd)]
pub struct Meters(pub f64);

impl Meters {
    pub fn to_feet(self) -> Feet {
        Feet(self)
    }

    pub fn to_miles(self) -> Miles {
        Miles(self)
    }

    pub fn abs(self) -> Self {
        Meters(self.0.abs())
    }
}

impl FromStr for Meters {
    type Err = std::num::ParseFloatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Meters)
    }
}

impl Add for Meters {
    type Output = Meters;
    fn add(self, rhs: Meters) -> Meters {
        Meters(self.0 + rhs.0)
    }
}

impl AddAssign for Meters {
    fn add_assign(&mut self, rhs: Meters) {
        self.0 += rhs.0;
    }
}

impl Sub for Meters {
    type Output = Meters;
    fn sub(self, rhs: Meters) -> Meters {
        Meters(self.0 - rhs.0)
    }
}

impl Display for Meters {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.1} m", self.0)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Feet(pub Meters);

impl Display for Feet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.1} ft", (self.0).0 * 3.2808399)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Miles(pub Meters);

impl Display for Miles {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.2} mi", (self.0).0 * 0.00062137119)
    }
}
