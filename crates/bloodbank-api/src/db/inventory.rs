//! Inventory persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `inventory` table.
//! Balance changes are single conditional statements, so concurrent
//! writers from several processes cannot drive a balance below zero.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bloodbank_core::{BankId, BloodGroup, InventoryKey};
use bloodbank_engine::InventoryEntry;

/// Largest balance the `units` column admits.
const MAX_UNITS: i64 = u32::MAX as i64;

/// Fetch the entry for `key`.
pub async fn get(pool: &PgPool, key: InventoryKey) -> Result<Option<InventoryEntry>, sqlx::Error> {
    let row = sqlx::query_as::<_, InventoryRow>(
        "SELECT bank_id, blood_group, units, updated_at
         FROM inventory WHERE bank_id = $1 AND blood_group = $2",
    )
    .bind(key.bank_id.as_uuid())
    .bind(key.blood_group.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(InventoryRow::into_entry).transpose()
}

/// Add `delta` to the balance for `key`.
///
/// A positive delta upserts. A negative delta only updates an existing row
/// whose balance covers it. Returns `None` without writing when the result
/// would leave `0..=u32::MAX`.
pub async fn apply_delta(
    pool: &PgPool,
    key: InventoryKey,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<Option<InventoryEntry>, sqlx::Error> {
    let row = if delta >= 0 {
        sqlx::query_as::<_, InventoryRow>(
            "INSERT INTO inventory (bank_id, blood_group, units, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (bank_id, blood_group) DO UPDATE
                SET units = inventory.units + EXCLUDED.units,
                    updated_at = EXCLUDED.updated_at
                WHERE inventory.units + EXCLUDED.units <= $5
             RETURNING bank_id, blood_group, units, updated_at",
        )
        .bind(key.bank_id.as_uuid())
        .bind(key.blood_group.as_str())
        .bind(delta)
        .bind(now)
        .bind(MAX_UNITS)
        .fetch_optional(pool)
        .await?
    } else {
        sqlx::query_as::<_, InventoryRow>(
            "UPDATE inventory
                SET units = units + $3, updated_at = $4
              WHERE bank_id = $1 AND blood_group = $2 AND units + $3 >= 0
             RETURNING bank_id, blood_group, units, updated_at",
        )
        .bind(key.bank_id.as_uuid())
        .bind(key.blood_group.as_str())
        .bind(delta)
        .bind(now)
        .fetch_optional(pool)
        .await?
    };

    row.map(InventoryRow::into_entry).transpose()
}

/// Every inventory row, ordered by key.
pub async fn list(pool: &PgPool) -> Result<Vec<InventoryEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, InventoryRow>(
        "SELECT bank_id, blood_group, units, updated_at
         FROM inventory ORDER BY bank_id, blood_group",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(InventoryRow::into_entry).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct InventoryRow {
    bank_id: Uuid,
    blood_group: String,
    units: i64,
    updated_at: DateTime<Utc>,
}

impl InventoryRow {
    /// Rows that violate the domain rules are decode errors, never defaulted.
    fn into_entry(self) -> Result<InventoryEntry, sqlx::Error> {
        let blood_group: BloodGroup = self.blood_group.parse().map_err(|e| {
            tracing::error!(bank_id = %self.bank_id, blood_group = %self.blood_group, "unknown blood group in inventory row");
            sqlx::Error::Decode(Box::new(e))
        })?;
        let units = u32::try_from(self.units).map_err(|e| {
            tracing::error!(bank_id = %self.bank_id, units = self.units, "inventory balance out of range");
            sqlx::Error::Decode(Box::new(e))
        })?;
        Ok(InventoryEntry {
            bank_id: BankId::from_uuid(self.bank_id),
            blood_group,
            units,
            updated_at: self.updated_at,
        })
    }
}
