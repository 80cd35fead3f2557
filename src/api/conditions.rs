//! Condition lookups.

use crate::api::AppState;
use crate::domain::{Address, Bytes32, Condition, ConditionId};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    pub id: ConditionId,
    pub oracle: Address,
    pub question_id: Bytes32,
    pub outcome_slot_count: u32,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_numerators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_denominator: Option<String>,
    pub creator: Address,
    pub create_tx_hash: Bytes32,
    pub create_block: u64,
    pub create_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_tx_hash: Option<Bytes32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_timestamp: Option<i64>,
}

impl From<Condition> for ConditionDto {
    fn from(condition: Condition) -> Self {
        let (payout_numerators, payout_denominator) = if condition.resolved {
            (
                Some(
                    condition
                        .payout_numerators
                        .iter()
                        .map(|n| n.to_string())
                        .collect(),
                ),
                Some(condition.payout_denominator.to_string()),
            )
        } else {
            (None, None)
        };
        ConditionDto {
            id: condition.id,
            oracle: condition.oracle,
            question_id: condition.question_id,
            outcome_slot_count: condition.outcome_slot_count,
            resolved: condition.resolved,
            payout_numerators,
            payout_denominator,
            creator: condition.creator,
            create_tx_hash: condition.create_tx_hash,
            create_block: condition.create_block,
            create_timestamp: condition.create_timestamp,
            resolve_tx_hash: condition.resolve_tx_hash,
            resolve_block: condition.resolve_block,
            resolve_timestamp: condition.resolve_timestamp,
        }
    }
}

pub async fn get_condition(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ConditionDto>, AppError> {
    let id = ConditionId::from_str(&id)
        .map_err(|_| AppError::BadRequest("invalid condition id".into()))?;
    let condition = state
        .repo
        .get_condition(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("condition {}", id)))?;
    Ok(Json(condition.into()))
}
