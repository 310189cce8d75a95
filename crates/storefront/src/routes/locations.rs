//! Location route handlers for the address form.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use souk_core::RegionId;

use super::ApiResponse;
use crate::error::Result;
use crate::models::{Desk, Region, SubRegion};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RegionList {
    pub regions: Vec<Region>,
}

#[derive(Debug, Serialize)]
pub struct SubRegionList {
    pub sub_regions: Vec<SubRegion>,
}

#[derive(Debug, Serialize)]
pub struct DeskList {
    pub desks: Vec<Desk>,
}

/// List active regions.
pub async fn regions(State(state): State<AppState>) -> Result<Json<ApiResponse<RegionList>>> {
    let regions = state.locations().active_regions().await?;
    Ok(Json(ApiResponse::ok(RegionList { regions })))
}

/// List active sub-regions of a region.
pub async fn sub_regions(
    State(state): State<AppState>,
    Path(region_id): Path<RegionId>,
) -> Result<Json<ApiResponse<SubRegionList>>> {
    let sub_regions = state.locations().active_sub_regions(region_id).await?;
    Ok(Json(ApiResponse::ok(SubRegionList { sub_regions })))
}

/// List active pickup desks of a region.
pub async fn desks(
    State(state): State<AppState>,
    Path(region_id): Path<RegionId>,
) -> Result<Json<ApiResponse<DeskList>>> {
    let desks = state.locations().active_desks(region_id).await?;
    Ok(Json(ApiResponse::ok(DeskList { desks })))
}
