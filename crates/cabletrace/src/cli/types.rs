//! CLI value enums and their domain conversions.

use clap::ValueEnum;

use crate::domain::{CableStatus, CircuitSide, LengthUnit};

/// Cable status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CableStatusArg {
    /// Installed and carrying signal
    Connected,
    /// Not yet installed
    Planned,
    /// Being removed
    Decommissioning,
}

impl From<CableStatusArg> for CableStatus {
    fn from(arg: CableStatusArg) -> Self {
        match arg {
            CableStatusArg::Connected => Self::Connected,
            CableStatusArg::Planned => Self::Planned,
            CableStatusArg::Decommissioning => Self::Decommissioning,
        }
    }
}

/// Cable length unit for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnitArg {
    /// Kilometers
    Km,
    /// Meters
    M,
    /// Centimeters
    Cm,
    /// Miles
    Mi,
    /// Feet
    Ft,
    /// Inches
    In,
}

impl From<LengthUnitArg> for LengthUnit {
    fn from(arg: LengthUnitArg) -> Self {
        match arg {
            LengthUnitArg::Km => Self::Km,
            LengthUnitArg::M => Self::M,
            LengthUnitArg::Cm => Self::Cm,
            LengthUnitArg::Mi => Self::Mi,
            LengthUnitArg::Ft => Self::Ft,
            LengthUnitArg::In => Self::In,
        }
    }
}

/// Circuit side for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitSideArg {
    /// A side
    #[value(alias = "A")]
    A,
    /// Z side
    #[value(alias = "Z")]
    Z,
}

impl From<CircuitSideArg> for CircuitSide {
    fn from(arg: CircuitSideArg) -> Self {
        match arg {
            CircuitSideArg::A => Self::A,
            CircuitSideArg::Z => Self::Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CableStatusArg::Connected, CableStatus::Connected)]
    #[case(CableStatusArg::Planned, CableStatus::Planned)]
    #[case(CableStatusArg::Decommissioning, CableStatus::Decommissioning)]
    fn status_args_convert(#[case] arg: CableStatusArg, #[case] status: CableStatus) {
        assert_eq!(CableStatus::from(arg), status);
    }

    #[test]
    fn unit_args_convert_to_meters() {
        let unit = LengthUnit::from(LengthUnitArg::Km);

        assert!((unit.to_meters(1.5) - 1500.0).abs() < f64::EPSILON);
    }
}
