//! This module defines various unit types and their conversions.

macro_rules! unit_struct {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            derive_more::Add,
            derive_more::Sub,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::SubAssign for $name {
            fn sub_assign(&mut self, rhs: $name) {
                self.0 -= rhs.0;
            }
        }

        impl std::ops::Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl std::iter::Sum for $name {
            // `f64::sum` of nothing is -0.0
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                $name(iter.fold(0.0, |sum, x| sum + x.0))
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity (efficiencies, shares, rates).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    derive_more::Add,
    derive_more::Sub,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub fn new(val: f64) -> Self {
        Self(val)
    }

    /// Returns the value as a f64
    pub fn value(self) -> f64 {
        self.0
    }

    /// Raise to an integer power
    pub fn powi(self, rhs: i32) -> Self {
        Self(self.0.powi(rhs))
    }

    /// Whether the underlying value is finite
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl std::fmt::Display for Dimensionless {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Base quantities
unit_struct!(Capacity, "Electrical capacity in MW");
unit_struct!(Energy, "Energy in MWh");
unit_struct!(FullLoadHours, "Annual full load hours (h/year)");

// Derived quantities
unit_struct!(PerYear, "A rate per year");
unit_struct!(MoneyPerCapacity, "Specific investment cost in EUR/MW");
unit_struct!(
    MoneyPerCapacityPerYear,
    "Specific annual cost in EUR/MW/year"
);
unit_struct!(MoneyPerEnergy, "Specific cost of energy in EUR/MWh");

// Division rules
impl_div!(MoneyPerCapacityPerYear, FullLoadHours, MoneyPerEnergy);

// Multiplication rules
impl_mul!(MoneyPerCapacity, PerYear, MoneyPerCapacityPerYear);
impl_mul!(Capacity, FullLoadHours, Energy);
