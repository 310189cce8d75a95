//! Destination reference data: regions, sub-regions, carrier desks and
//! shipping rates.

use serde::{Deserialize, Serialize};
use souk_core::{Cents, DeskId, RegionId, SubRegionId};

/// A region (e.g. a province) in the local reference cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub code: Option<String>,
    pub is_active: bool,
}

/// A sub-region (e.g. a municipality) belonging to a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SubRegion {
    pub id: SubRegionId,
    pub region_id: RegionId,
    pub name: String,
    pub is_active: bool,
}

/// A carrier-operated pickup desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Desk {
    pub id: DeskId,
    pub region_id: RegionId,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
}

/// Shipping price table for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingRate {
    pub region_id: RegionId,
    /// Base price for home delivery.
    pub home_cents: Cents,
    /// Base price for desk pickup.
    pub desk_cents: Cents,
    /// Weight covered by the base price.
    pub included_kg: i32,
    /// Surcharge per kilogram above `included_kg`.
    pub extra_kg_cents: Cents,
}

/// Reference data loaded by `souk-cli seed locations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSeed {
    pub regions: Vec<RegionSeed>,
}

/// One region with everything that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSeed {
    pub id: RegionId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sub_regions: Vec<SubRegionSeed>,
    #[serde(default)]
    pub desks: Vec<DeskSeed>,
    #[serde(default)]
    pub rate: Option<RateSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRegionSeed {
    pub id: SubRegionId,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskSeed {
    pub id: DeskId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSeed {
    pub home_cents: Cents,
    pub desk_cents: Cents,
    #[serde(default = "default_included_kg")]
    pub included_kg: i32,
    #[serde(default)]
    pub extra_kg_cents: Cents,
}

/// Rows written by a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedCounts {
    pub regions: usize,
    pub sub_regions: usize,
    pub desks: usize,
    pub rates: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_included_kg() -> i32 {
    5
}

/// Case-insensitive exact match on trimmed names.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
