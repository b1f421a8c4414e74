//! Building-block shipping entities and the operations built on them.
//!
//! Definition entities (`Packaging`, `DeliveryService`, `Carrier`) are built
//! once per app and linked through its reference map; request and response
//! entities are built per invocation against the sealed map.

pub mod cancellation;
pub mod carrier;
pub mod charge;
pub mod delivery_service;
pub mod measure;
pub mod money;
pub mod packaging;
pub mod pickup;
pub mod rate;
pub mod text;

pub use cancellation::{
    CancelShipments, CancellationOutcome, CancellationOutcomes, CancellationRequest,
    CancellationStatus, ShipmentCancellation,
};
pub use carrier::Carrier;
pub use charge::{total_charges, Charge, ChargeKind};
pub use delivery_service::{DeliveryService, ServiceClass};
pub use measure::{Quantity, Weight, WeightUnit};
pub use money::{CurrencyMismatchError, MonetaryValue};
pub use packaging::Packaging;
pub use pickup::{PickupConfirmation, PickupRequest, PickupShipment, SchedulePickup};
pub use rate::{Rate, RateCriteria, RateList, RatePackage, RateShipment};
pub use text::{DisplayText, LocalizedText};
