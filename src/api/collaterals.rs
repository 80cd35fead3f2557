//! Collateral counter lookups.

use crate::api::AppState;
use crate::domain::{Address, Amount, Collateral};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralDto {
    pub address: Address,
    pub split_amount: Amount,
    pub redeemed_amount: Amount,
}

impl From<Collateral> for CollateralDto {
    fn from(collateral: Collateral) -> Self {
        CollateralDto {
            address: collateral.address,
            split_amount: collateral.split_amount,
            redeemed_amount: collateral.redeemed_amount,
        }
    }
}

pub async fn get_collateral(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CollateralDto>, AppError> {
    let address = Address::from_str(&address)
        .map_err(|_| AppError::BadRequest("invalid collateral address".into()))?;
    let collateral = state
        .repo
        .get_collateral(&address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("collateral {}", address)))?;
    Ok(Json(collateral.into()))
}
