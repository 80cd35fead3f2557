//! User and per-user balance lookups.

use crate::api::AppState;
use crate::domain::{Address, Amount, ConditionId, PositionId, User, UserPosition, UserPositionId};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub address: Address,
    pub first_participation: i64,
    pub last_active: i64,
    pub participated_conditions: Vec<ConditionId>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            address: user.address,
            first_participation: user.first_participation,
            last_active: user.last_active,
            participated_conditions: user.participated_conditions.into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPositionDto {
    pub id: UserPositionId,
    pub user: Address,
    pub position_id: PositionId,
    pub balance: Amount,
}

impl From<UserPosition> for UserPositionDto {
    fn from(user_position: UserPosition) -> Self {
        UserPositionDto {
            id: user_position.id,
            user: user_position.user,
            position_id: user_position.position_id,
            balance: user_position.balance,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPositionsResponse {
    pub positions: Vec<UserPositionDto>,
}

fn parse_address(s: &str) -> Result<Address, AppError> {
    Address::from_str(s).map_err(|_| AppError::BadRequest("invalid address".into()))
}

pub async fn get_user(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserDto>, AppError> {
    let address = parse_address(&address)?;
    let user = state
        .repo
        .get_user(&address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", address)))?;
    Ok(Json(user.into()))
}

pub async fn get_user_positions(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserPositionsResponse>, AppError> {
    let address = parse_address(&address)?;
    let positions = state
        .repo
        .query_user_positions(&address)
        .await?
        .into_iter()
        .map(UserPositionDto::from)
        .collect();
    Ok(Json(UserPositionsResponse { positions }))
}
