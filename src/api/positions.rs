//! Position and collection lookups.

use crate::api::AppState;
use crate::domain::{
    Address, Amount, Collection, CollectionId, ConditionId, IndexSet, Position, PositionId,
};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDto {
    pub id: CollectionId,
    pub conditions: Vec<ConditionId>,
    pub index_sets: Vec<IndexSet>,
}

impl From<Collection> for CollectionDto {
    fn from(collection: Collection) -> Self {
        CollectionDto {
            id: collection.id,
            conditions: collection.conditions,
            index_sets: collection.index_sets,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: PositionId,
    pub collateral_token: Address,
    pub collection_id: CollectionId,
    pub conditions: Vec<ConditionId>,
    pub index_sets: Vec<IndexSet>,
    pub active_value: Amount,
    pub lifetime_value: Amount,
}

impl From<Position> for PositionDto {
    fn from(position: Position) -> Self {
        PositionDto {
            id: position.id,
            collateral_token: position.collateral_token,
            collection_id: position.collection_id,
            conditions: position.conditions,
            index_sets: position.index_sets,
            active_value: position.active_value,
            lifetime_value: position.lifetime_value,
        }
    }
}

pub async fn get_collection(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CollectionDto>, AppError> {
    let id = CollectionId::from_str(&id)
        .map_err(|_| AppError::BadRequest("invalid collection id".into()))?;
    let collection = state
        .repo
        .get_collection(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("collection {}", id)))?;
    Ok(Json(collection.into()))
}

pub async fn get_position(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PositionDto>, AppError> {
    let id = PositionId::from_str(&id)
        .map_err(|_| AppError::BadRequest("invalid position id".into()))?;
    let position = state
        .repo
        .get_position(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("position {}", id)))?;
    Ok(Json(position.into()))
}
