//! Repository layer for database operations.
//!
//! Entities persist as one row per identifier, amounts as decimal strings,
//! and defining lists as JSON arrays of hex strings. The repository only
//! ever sees consistent snapshots: the indexer hands it the dirty keys of
//! fully applied events and everything lands in one transaction together
//! with the checkpoint.

use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::query::Query;
use sqlx::{Row, Sqlite};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::{
    Address, Bytes32, Collateral, Collection, CollectionId, Condition, ConditionId, EventKey,
    Position, PositionId, User, UserPosition, UserPositionId,
};
use crate::engine::{DirtySets, Ledger};

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

fn decode_err(what: &str, detail: impl Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("{}: {}", what, detail).into())
}

fn encode_err(what: &str, detail: impl Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("{}: {}", what, detail).into())
}

fn parse<T: FromStr>(s: &str, what: &str) -> Result<T, sqlx::Error>
where
    T::Err: Display,
{
    s.parse().map_err(|e| decode_err(what, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(s: &str, what: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(s).map_err(|e| decode_err(what, e))
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| encode_err(what, e))
}

type SqliteQuery = Query<'static, Sqlite, SqliteArguments<'static>>;

fn condition_upsert(condition: &Condition) -> Result<SqliteQuery, sqlx::Error> {
    let numerators: Vec<String> = condition
        .payout_numerators
        .iter()
        .map(|n| n.to_string())
        .collect();
    Ok(sqlx::query(
        r#"
        INSERT OR REPLACE INTO conditions
            (id, oracle, question_id, outcome_slot_count, resolved,
             payout_numerators, payout_denominator, creator, create_tx_hash,
             create_block, create_timestamp, resolve_tx_hash, resolve_block,
             resolve_timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(condition.id.to_string())
    .bind(condition.oracle.to_string())
    .bind(condition.question_id.to_string())
    .bind(condition.outcome_slot_count as i64)
    .bind(condition.resolved)
    .bind(to_json(&numerators, "payout_numerators")?)
    .bind(condition.payout_denominator.to_string())
    .bind(condition.creator.to_string())
    .bind(condition.create_tx_hash.to_string())
    .bind(condition.create_block as i64)
    .bind(condition.create_timestamp)
    .bind(condition.resolve_tx_hash.map(|h| h.to_string()))
    .bind(condition.resolve_block.map(|b| b as i64))
    .bind(condition.resolve_timestamp))
}

fn condition_from_row(row: &SqliteRow) -> Result<Condition, sqlx::Error> {
    let numerators: Vec<String> =
        parse_json(&row.try_get::<String, _>("payout_numerators")?, "payout_numerators")?;
    let payout_numerators = numerators
        .iter()
        .map(|n| parse::<u128>(n, "payout_numerator"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Condition {
        id: parse(&row.try_get::<String, _>("id")?, "condition id")?,
        oracle: parse(&row.try_get::<String, _>("oracle")?, "oracle")?,
        question_id: parse(&row.try_get::<String, _>("question_id")?, "question_id")?,
        outcome_slot_count: row.try_get::<i64, _>("outcome_slot_count")? as u32,
        resolved: row.try_get("resolved")?,
        payout_numerators,
        payout_denominator: parse(
            &row.try_get::<String, _>("payout_denominator")?,
            "payout_denominator",
        )?,
        creator: parse(&row.try_get::<String, _>("creator")?, "creator")?,
        create_tx_hash: parse(&row.try_get::<String, _>("create_tx_hash")?, "create_tx_hash")?,
        create_block: row.try_get::<i64, _>("create_block")? as u64,
        create_timestamp: row.try_get("create_timestamp")?,
        resolve_tx_hash: row
            .try_get::<Option<String>, _>("resolve_tx_hash")?
            .map(|s| parse::<Bytes32>(&s, "resolve_tx_hash"))
            .transpose()?,
        resolve_block: row
            .try_get::<Option<i64>, _>("resolve_block")?
            .map(|b| b as u64),
        resolve_timestamp: row.try_get("resolve_timestamp")?,
    })
}

fn collection_upsert(collection: &Collection) -> Result<SqliteQuery, sqlx::Error> {
    Ok(sqlx::query(
        "INSERT OR REPLACE INTO collections (id, conditions, index_sets) VALUES (?, ?, ?)",
    )
    .bind(collection.id.to_string())
    .bind(to_json(&collection.conditions, "collection conditions")?)
    .bind(to_json(&collection.index_sets, "collection index_sets")?))
}

fn collection_from_row(row: &SqliteRow) -> Result<Collection, sqlx::Error> {
    Ok(Collection {
        id: parse(&row.try_get::<String, _>("id")?, "collection id")?,
        conditions: parse_json(&row.try_get::<String, _>("conditions")?, "conditions")?,
        index_sets: parse_json(&row.try_get::<String, _>("index_sets")?, "index_sets")?,
    })
}

fn position_upsert(position: &Position) -> Result<SqliteQuery, sqlx::Error> {
    Ok(sqlx::query(
        r#"
        INSERT OR REPLACE INTO positions
            (id, collateral_token, collection_id, conditions, index_sets,
             active_value, lifetime_value)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(position.id.to_string())
    .bind(position.collateral_token.to_string())
    .bind(position.collection_id.to_string())
    .bind(to_json(&position.conditions, "position conditions")?)
    .bind(to_json(&position.index_sets, "position index_sets")?)
    .bind(position.active_value.to_string())
    .bind(position.lifetime_value.to_string()))
}

fn position_from_row(row: &SqliteRow) -> Result<Position, sqlx::Error> {
    Ok(Position {
        id: parse(&row.try_get::<String, _>("id")?, "position id")?,
        collateral_token: parse(
            &row.try_get::<String, _>("collateral_token")?,
            "collateral_token",
        )?,
        collection_id: parse(&row.try_get::<String, _>("collection_id")?, "collection_id")?,
        conditions: parse_json(&row.try_get::<String, _>("conditions")?, "conditions")?,
        index_sets: parse_json(&row.try_get::<String, _>("index_sets")?, "index_sets")?,
        active_value: parse(&row.try_get::<String, _>("active_value")?, "active_value")?,
        lifetime_value: parse(&row.try_get::<String, _>("lifetime_value")?, "lifetime_value")?,
    })
}

fn user_upsert(user: &User) -> Result<SqliteQuery, sqlx::Error> {
    Ok(sqlx::query(
        r#"
        INSERT OR REPLACE INTO users
            (address, first_participation, last_active, participated_conditions)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user.address.to_string())
    .bind(user.first_participation)
    .bind(user.last_active)
    .bind(to_json(&user.participated_conditions, "participated_conditions")?))
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        address: parse(&row.try_get::<String, _>("address")?, "user address")?,
        first_participation: row.try_get("first_participation")?,
        last_active: row.try_get("last_active")?,
        participated_conditions: parse_json::<BTreeSet<ConditionId>>(
            &row.try_get::<String, _>("participated_conditions")?,
            "participated_conditions",
        )?,
    })
}

fn user_position_upsert(user_position: &UserPosition) -> SqliteQuery {
    sqlx::query(
        "INSERT OR REPLACE INTO user_positions (id, user, position_id, balance) VALUES (?, ?, ?, ?)",
    )
    .bind(user_position.id.to_string())
    .bind(user_position.user.to_string())
    .bind(user_position.position_id.to_string())
    .bind(user_position.balance.to_string())
}

fn user_position_from_row(row: &SqliteRow) -> Result<UserPosition, sqlx::Error> {
    Ok(UserPosition {
        id: parse(&row.try_get::<String, _>("id")?, "user position id")?,
        user: parse(&row.try_get::<String, _>("user")?, "user")?,
        position_id: parse(&row.try_get::<String, _>("position_id")?, "position_id")?,
        balance: parse(&row.try_get::<String, _>("balance")?, "balance")?,
    })
}

fn collateral_upsert(collateral: &Collateral) -> SqliteQuery {
    sqlx::query(
        "INSERT OR REPLACE INTO collaterals (address, split_amount, redeemed_amount) VALUES (?, ?, ?)",
    )
    .bind(collateral.address.to_string())
    .bind(collateral.split_amount.to_string())
    .bind(collateral.redeemed_amount.to_string())
}

fn collateral_from_row(row: &SqliteRow) -> Result<Collateral, sqlx::Error> {
    Ok(Collateral {
        address: parse(&row.try_get::<String, _>("address")?, "collateral address")?,
        split_amount: parse(&row.try_get::<String, _>("split_amount")?, "split_amount")?,
        redeemed_amount: parse(
            &row.try_get::<String, _>("redeemed_amount")?,
            "redeemed_amount",
        )?,
    })
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Lookups (query surface)
    // =========================================================================

    pub async fn get_condition(&self, id: &ConditionId) -> Result<Option<Condition>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM conditions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(condition_from_row).transpose()
    }

    pub async fn get_collection(
        &self,
        id: &CollectionId,
    ) -> Result<Option<Collection>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM collections WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    pub async fn get_position(&self, id: &PositionId) -> Result<Option<Position>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM positions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(position_from_row).transpose()
    }

    pub async fn get_user(&self, address: &Address) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM users WHERE address = ?")
            .bind(address.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_user_position(
        &self,
        id: &UserPositionId,
    ) -> Result<Option<UserPosition>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM user_positions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_position_from_row).transpose()
    }

    /// All of a user's position balances, ordered by composite key.
    pub async fn query_user_positions(
        &self,
        user: &Address,
    ) -> Result<Vec<UserPosition>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM user_positions WHERE user = ? ORDER BY id ASC")
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_position_from_row).collect()
    }

    pub async fn get_collateral(
        &self,
        address: &Address,
    ) -> Result<Option<Collateral>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM collaterals WHERE address = ?")
            .bind(address.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(collateral_from_row).transpose()
    }

    /// The ingestion cursor, if any batch has been persisted.
    pub async fn get_checkpoint(&self) -> Result<Option<EventKey>, sqlx::Error> {
        let row = sqlx::query("SELECT block_number, tx_index, log_index FROM checkpoint WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| {
            EventKey::new(
                row.get::<i64, _>("block_number") as u64,
                row.get::<i64, _>("tx_index") as u32,
                row.get::<i64, _>("log_index") as u32,
            )
        }))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write every dirty entity plus the new checkpoint in one transaction.
    pub async fn persist_batch(
        &self,
        ledger: &Ledger,
        dirty: &DirtySets,
        checkpoint: Option<EventKey>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for id in &dirty.conditions {
            if let Some(condition) = ledger.condition(id) {
                condition_upsert(condition)?.execute(&mut *tx).await?;
            }
        }
        for id in &dirty.collections {
            if let Some(collection) = ledger.collection(id) {
                collection_upsert(collection)?.execute(&mut *tx).await?;
            }
        }
        for id in &dirty.positions {
            if let Some(position) = ledger.position(id) {
                position_upsert(position)?.execute(&mut *tx).await?;
            }
        }
        for address in &dirty.users {
            if let Some(user) = ledger.user(address) {
                user_upsert(user)?.execute(&mut *tx).await?;
            }
        }
        for id in &dirty.user_positions {
            if let Some(user_position) = ledger.user_position(id) {
                user_position_upsert(user_position).execute(&mut *tx).await?;
            }
        }
        for address in &dirty.collaterals {
            if let Some(collateral) = ledger.collateral(address) {
                collateral_upsert(collateral).execute(&mut *tx).await?;
            }
        }

        if let Some(key) = checkpoint {
            sqlx::query(
                "INSERT OR REPLACE INTO checkpoint (id, block_number, tx_index, log_index) VALUES (1, ?, ?, ?)",
            )
            .bind(key.block_number as i64)
            .bind(key.tx_index as i64)
            .bind(key.log_index as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Rebuild the full in-memory ledger, e.g. at startup.
    pub async fn load_ledger(&self) -> Result<Ledger, sqlx::Error> {
        let mut ledger = Ledger::new();

        let rows = sqlx::query("SELECT * FROM conditions")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            ledger.insert_condition(condition_from_row(row)?);
        }

        let rows = sqlx::query("SELECT * FROM collections")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            ledger.insert_collection(collection_from_row(row)?);
        }

        let rows = sqlx::query("SELECT * FROM positions")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            let position = position_from_row(row)?;
            ledger.or_create_position(position.id, || position);
        }

        let rows = sqlx::query("SELECT * FROM users")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            ledger.insert_user(user_from_row(row)?);
        }

        let rows = sqlx::query("SELECT * FROM user_positions")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            ledger.insert_user_position(user_position_from_row(row)?);
        }

        let rows = sqlx::query("SELECT * FROM collaterals")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            ledger.insert_collateral(collateral_from_row(row)?);
        }

        // Loading is not a mutation; start with a clean dirty set.
        ledger.take_dirty();
        Ok(ledger)
    }
}
