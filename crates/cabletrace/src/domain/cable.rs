//! Cables and the ends they attach to.

use super::TerminationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric cable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CableId(pub u64);

impl fmt::Display for CableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl std::str::FromStr for CableId {
    type Err = String;

    /// Accepts `12` or `#12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .strip_prefix('#')
            .unwrap_or(trimmed)
            .parse()
            .map(Self)
            .map_err(|_| format!("invalid cable id: {s}"))
    }
}

/// The two ends of a cable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CableEnd {
    /// The A end
    A,
    /// The B end
    B,
}

impl CableEnd {
    /// The far end
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for CableEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Lifecycle status of a cable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableStatus {
    /// Installed and carrying signal
    #[default]
    Connected,
    /// Recorded but not yet installed
    Planned,
    /// Scheduled for removal
    Decommissioning,
}

impl CableStatus {
    /// Only connected cables make a path active.
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Planned => "planned",
            Self::Decommissioning => "decommissioning",
        }
    }
}

impl fmt::Display for CableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connected" => Ok(Self::Connected),
            "planned" => Ok(Self::Planned),
            "decommissioning" => Ok(Self::Decommissioning),
            other => Err(format!("unknown cable status: {other}")),
        }
    }
}

/// Unit a cable length is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
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

impl LengthUnit {
    /// Convert `value` in this unit to meters.
    #[must_use]
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Km => value * 1000.0,
            Self::M => value,
            Self::Cm => value / 100.0,
            Self::Mi => value * 1609.344,
            Self::Ft => value * 0.3048,
            Self::In => value * 0.0254,
        }
    }
}

/// A recorded cable length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CableLength {
    /// Magnitude
    pub value: f64,
    /// Unit of `value`
    pub unit: LengthUnit,
}

impl CableLength {
    /// Length in meters
    #[must_use]
    pub fn meters(&self) -> f64 {
        self.unit.to_meters(self.value)
    }
}

/// A cable joining one or more terminations at its A end to one or more at its B end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cable {
    /// Cable identifier
    pub id: CableId,

    /// Lifecycle status
    #[serde(default)]
    pub status: CableStatus,

    /// Terminations on the A end
    pub a_terminations: Vec<TerminationId>,

    /// Terminations on the B end
    pub b_terminations: Vec<TerminationId>,

    /// Optional printed label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Optional recorded length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<CableLength>,
}

impl Cable {
    /// Create an unlabelled cable with no recorded length.
    #[must_use]
    pub fn new(
        id: CableId,
        status: CableStatus,
        a_terminations: Vec<TerminationId>,
        b_terminations: Vec<TerminationId>,
    ) -> Self {
        Self {
            id,
            status,
            a_terminations,
            b_terminations,
            label: None,
            length: None,
        }
    }

    /// Set the recorded length.
    #[must_use]
    pub fn with_length(mut self, value: f64, unit: LengthUnit) -> Self {
        self.length = Some(CableLength { value, unit });
        self
    }

    /// Terminations on `end`.
    #[must_use]
    pub fn end(&self, end: CableEnd) -> &[TerminationId] {
        match end {
            CableEnd::A => &self.a_terminations,
            CableEnd::B => &self.b_terminations,
        }
    }

    pub(crate) fn end_mut(&mut self, end: CableEnd) -> &mut Vec<TerminationId> {
        match end {
            CableEnd::A => &mut self.a_terminations,
            CableEnd::B => &mut self.b_terminations,
        }
    }

    /// Which end `termination` sits on, if any.
    #[must_use]
    pub fn end_of(&self, termination: TerminationId) -> Option<CableEnd> {
        if self.a_terminations.contains(&termination) {
            Some(CableEnd::A)
        } else if self.b_terminations.contains(&termination) {
            Some(CableEnd::B)
        } else {
            None
        }
    }

    /// Every termination on either end, A first.
    pub fn terminations(&self) -> impl Iterator<Item = TerminationId> + '_ {
        self.a_terminations
            .iter()
            .chain(self.b_terminations.iter())
            .copied()
    }
}

/// Join record: termination `termination` sits on end `end` of cable `cable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CableTermination {
    /// The cable
    pub cable: CableId,
    /// Which end of it
    pub end: CableEnd,
    /// The termination attached there
    pub termination: TerminationId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TerminationKind;
    use rstest::rstest;

    fn iface(id: u64) -> TerminationId {
        TerminationId::new(TerminationKind::Interface, id)
    }

    #[rstest]
    #[case(LengthUnit::Km, 1.5, 1500.0)]
    #[case(LengthUnit::M, 3.0, 3.0)]
    #[case(LengthUnit::Cm, 250.0, 2.5)]
    #[case(LengthUnit::Mi, 1.0, 1609.344)]
    #[case(LengthUnit::Ft, 10.0, 3.048)]
    #[case(LengthUnit::In, 100.0, 2.54)]
    fn converts_lengths_to_meters(#[case] unit: LengthUnit, #[case] value: f64, #[case] meters: f64) {
        assert!((unit.to_meters(value) - meters).abs() < 1e-9);
    }

    #[test]
    fn locates_terminations_by_end() {
        let cable = Cable::new(CableId(1), CableStatus::Connected, vec![iface(1)], vec![iface(2), iface(3)]);

        assert_eq!(cable.end_of(iface(1)), Some(CableEnd::A));
        assert_eq!(cable.end_of(iface(3)), Some(CableEnd::B));
        assert_eq!(cable.end_of(iface(4)), None);
        assert_eq!(cable.end(CableEnd::A.opposite()), &[iface(2), iface(3)]);
        assert_eq!(cable.terminations().count(), 3);
    }

    #[test]
    fn status_defaults_to_connected_when_omitted() {
        let json = r#"{"id":5,"a_terminations":[],"b_terminations":[]}"#;
        let cable: Cable = serde_json::from_str(json).unwrap();

        assert_eq!(cable.status, CableStatus::Connected);
        assert_eq!(cable.id.to_string(), "#5");
    }

    #[rstest]
    #[case("7", CableId(7))]
    #[case("#7", CableId(7))]
    #[case(" #12 ", CableId(12))]
    fn parses_cable_ids(#[case] input: &str, #[case] expected: CableId) {
        assert_eq!(input.parse::<CableId>(), Ok(expected));
    }

    #[test]
    fn parses_statuses_case_insensitively() {
        assert_eq!("Planned".parse::<CableStatus>(), Ok(CableStatus::Planned));
        assert!("cut".parse::<CableStatus>().is_err());
    }
}
