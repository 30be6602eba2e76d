//! Generation and storage technologies.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The technology of a generation or storage unit.
///
/// The declaration order is the natural ordering used for sorting output tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Technology {
    #[allow(missing_docs)]
    Lignite,
    #[allow(missing_docs)]
    Hardcoal,
    #[allow(missing_docs)]
    Gas,
    #[allow(missing_docs)]
    Nuclear,
    #[allow(missing_docs)]
    Oil,
    #[allow(missing_docs)]
    Biomass,
    #[allow(missing_docs)]
    WindOnshore,
    #[allow(missing_docs)]
    WindOffshore,
    #[allow(missing_docs)]
    SolarPv,
    /// Hydro storage with natural inflow
    HydroReservoir,
    /// Pumped-storage hydro
    HydroPumped,
    /// Anything not covered by the other variants
    Other,
}
