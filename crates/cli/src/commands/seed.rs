//! Seed the location reference cache from YAML.
//!
//! ```yaml
//! regions:
//!   - id: 16
//!     name: Alger
//!     code: "16"
//!     sub_regions:
//!       - { id: 1601, name: Alger }
//!       - { id: 1602, name: Bab El Oued }
//!     desks:
//!       - { id: 501, name: Alger Centre, address: "12 rue Didouche Mourad" }
//!     rate: { home_cents: 60000, desk_cents: 40000, included_kg: 5, extra_kg_cents: 5000 }
//! ```

use std::collections::HashSet;
use std::path::Path;

use souk_storefront::db::{PgLocationStore, create_pool};
use souk_storefront::models::LocationSeed;
use tracing::{error, info};

use super::database_url;

/// Check a seed file for mistakes the database would not catch, or would
/// only report one at a time.
#[must_use]
pub fn validate_seed(seed: &LocationSeed) -> Vec<String> {
    let mut errors = Vec::new();
    let mut region_ids = HashSet::new();
    let mut region_names = HashSet::new();
    let mut sub_region_ids = HashSet::new();
    let mut desk_ids = HashSet::new();

    if seed.regions.is_empty() {
        errors.push("no regions defined".to_string());
    }

    for region in &seed.regions {
        let label = format!("region {}", region.id);
        if !region_ids.insert(region.id) {
            errors.push(format!("{label}: duplicate id"));
        }
        if region.name.trim().is_empty() {
            errors.push(format!("{label}: name is empty"));
        } else if !region_names.insert(region.name.trim().to_lowercase()) {
            errors.push(format!("{label}: duplicate name '{}'", region.name));
        }

        for sub_region in &region.sub_regions {
            if !sub_region_ids.insert(sub_region.id) {
                errors.push(format!("{label}: duplicate sub-region id {}", sub_region.id));
            }
            if sub_region.name.trim().is_empty() {
                errors.push(format!("{label}: sub-region {} has no name", sub_region.id));
            }
        }

        for desk in &region.desks {
            if !desk_ids.insert(desk.id) {
                errors.push(format!("{label}: duplicate desk id {}", desk.id));
            }
            if desk.name.trim().is_empty() {
                errors.push(format!("{label}: desk {} has no name", desk.id));
            }
        }

        if let Some(rate) = &region.rate {
            if rate.home_cents.is_negative()
                || rate.desk_cents.is_negative()
                || rate.extra_kg_cents.is_negative()
            {
                errors.push(format!("{label}: shipping rate amounts must not be negative"));
            }
            if rate.included_kg < 0 {
                errors.push(format!("{label}: included_kg must not be negative"));
            }
        }
    }

    errors
}

/// Seed locations from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the database write fails.
pub async fn locations(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading locations from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: LocationSeed = serde_yaml::from_str(&content)?;

    info!(regions = seed.regions.len(), "Parsed seed file");

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if dry_run {
        info!("Seed file is valid (dry run, nothing written)");
        return Ok(());
    }

    let pool = create_pool(&database_url()?).await?;
    info!("Connected to database");

    let counts = PgLocationStore::new(pool).seed_locations(&seed).await?;

    info!("Seeding complete!");
    info!("  Regions: {}", counts.regions);
    info!("  Sub-regions: {}", counts.sub_regions);
    info!("  Desks: {}", counts.desks);
    info!("  Shipping rates: {}", counts.rates);

    Ok(())
}
