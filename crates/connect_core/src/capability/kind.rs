//! Host-visible capability catalogue.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Capability an app may implement for its host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapabilityKind {
    Connect,
    CreateShipment,
    CancelShipments,
    RateShipment,
    TrackShipment,
    CreateManifest,
    SchedulePickup,
    CancelPickups,
}

impl CapabilityKind {
    pub const ALL: &'static [CapabilityKind] = &[
        Self::Connect,
        Self::CreateShipment,
        Self::CancelShipments,
        Self::RateShipment,
        Self::TrackShipment,
        Self::CreateManifest,
        Self::SchedulePickup,
        Self::CancelPickups,
    ];

    /// Stable string id used by hosts and manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => CAPABILITY_CONNECT,
            Self::CreateShipment => CAPABILITY_CREATE_SHIPMENT,
            Self::CancelShipments => CAPABILITY_CANCEL_SHIPMENTS,
            Self::RateShipment => CAPABILITY_RATE_SHIPMENT,
            Self::TrackShipment => CAPABILITY_TRACK_SHIPMENT,
            Self::CreateManifest => CAPABILITY_CREATE_MANIFEST,
            Self::SchedulePickup => CAPABILITY_SCHEDULE_PICKUP,
            Self::CancelPickups => CAPABILITY_CANCEL_PICKUPS,
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Connect => "Connect a user account to the carrier.",
            Self::CreateShipment => "Create a shipment and return its labels.",
            Self::CancelShipments => "Cancel previously created shipments.",
            Self::RateShipment => "Quote rates for a prospective shipment.",
            Self::TrackShipment => "Report the tracking history of a shipment.",
            Self::CreateManifest => "Close out the day's shipments in a manifest.",
            Self::SchedulePickup => "Schedule a package pickup.",
            Self::CancelPickups => "Cancel previously scheduled pickups.",
        }
    }

    /// Parses one capability from its string id.
    pub fn parse(value: &str) -> Result<Self, CapabilityKindError> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(CapabilityKindError::Empty);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| CapabilityKindError::Unsupported(normalized.to_string()))
    }
}

impl Display for CapabilityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const CAPABILITY_CONNECT: &str = "connect";
pub const CAPABILITY_CREATE_SHIPMENT: &str = "createShipment";
pub const CAPABILITY_CANCEL_SHIPMENTS: &str = "cancelShipments";
pub const CAPABILITY_RATE_SHIPMENT: &str = "rateShipment";
pub const CAPABILITY_TRACK_SHIPMENT: &str = "trackShipment";
pub const CAPABILITY_CREATE_MANIFEST: &str = "createManifest";
pub const CAPABILITY_SCHEDULE_PICKUP: &str = "schedulePickup";
pub const CAPABILITY_CANCEL_PICKUPS: &str = "cancelPickups";

/// Returns every capability string id, in catalogue order.
pub fn supported_capability_strings() -> Vec<&'static str> {
    CapabilityKind::ALL.iter().map(|kind| kind.as_str()).collect()
}

/// Capability parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityKindError {
    Empty,
    Unsupported(String),
}

impl Display for CapabilityKindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "capability name must not be empty"),
            Self::Unsupported(value) => write!(f, "capability is unsupported: {value}"),
        }
    }
}

impl Error for CapabilityKindError {}

#[cfg(test)]
mod tests {
    use super::{supported_capability_strings, CapabilityKind, CapabilityKindError};

    #[test]
    fn parses_every_catalogued_capability() {
        for kind in CapabilityKind::ALL {
            assert_eq!(
                CapabilityKind::parse(kind.as_str()).expect("catalogued capability parse"),
                *kind
            );
        }
        assert_eq!(
            CapabilityKind::parse(" rateShipment ").expect("trimmed parse"),
            CapabilityKind::RateShipment
        );
    }

    #[test]
    fn rejects_empty_capability() {
        let err = CapabilityKind::parse("   ").expect_err("empty capability must fail");
        assert_eq!(err, CapabilityKindError::Empty);
    }

    #[test]
    fn capability_ids_are_case_sensitive() {
        let err = CapabilityKind::parse("RateShipment").expect_err("wrong case must fail");
        assert_eq!(
            err,
            CapabilityKindError::Unsupported("RateShipment".to_string())
        );
    }

    #[test]
    fn exposes_descriptions_and_strings() {
        assert!(CapabilityKind::SchedulePickup
            .description()
            .contains("pickup"));
        let values = supported_capability_strings();
        assert_eq!(values.len(), CapabilityKind::ALL.len());
        assert!(values.contains(&"cancelShipments"));
    }
}
