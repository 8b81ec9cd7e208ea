//! Blood request persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `blood_requests`
//! table. Lifecycle rules are enforced by the engine; the only guard here
//! is the status compare-and-set in [`update`].

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bloodbank_core::{BankId, BloodGroup, RecipientId, RequestId, Units};
use bloodbank_state::{BloodRequest, RequestStatus, RequestTransitionRecord};

const COLUMNS: &str = "id, recipient_id, bank_id, blood_group, units, required_by, purpose, \
                       status, notes, transitions, created_at, updated_at";

/// Serialize a transition log to JSON for persistence.
fn serialize_transitions(log: &[RequestTransitionRecord]) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(log).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize request transitions");
        sqlx::Error::Encode(Box::new(e))
    })
}

/// Insert a newly submitted request.
pub async fn insert(pool: &PgPool, request: &BloodRequest) -> Result<(), sqlx::Error> {
    let transitions = serialize_transitions(&request.transitions)?;

    sqlx::query(
        "INSERT INTO blood_requests
            (id, recipient_id, bank_id, blood_group, units, required_by, purpose,
             status, notes, transitions, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(request.id.as_uuid())
    .bind(request.recipient_id.as_uuid())
    .bind(request.bank_id.as_uuid())
    .bind(request.blood_group.as_str())
    .bind(i64::from(request.units.get()))
    .bind(request.required_by)
    .bind(&request.purpose)
    .bind(request.status.as_str())
    .bind(&request.notes)
    .bind(&transitions)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite the mutable fields of a request if its stored status is still
/// `expected`. Returns whether a row was written.
pub async fn update(
    pool: &PgPool,
    request: &BloodRequest,
    expected: RequestStatus,
) -> Result<bool, sqlx::Error> {
    let transitions = serialize_transitions(&request.transitions)?;

    let result = sqlx::query(
        "UPDATE blood_requests
            SET status = $1, notes = $2, transitions = $3, updated_at = $4
          WHERE id = $5 AND status = $6",
    )
    .bind(request.status.as_str())
    .bind(&request.notes)
    .bind(&transitions)
    .bind(request.updated_at)
    .bind(request.id.as_uuid())
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch a request by ID.
pub async fn get_by_id(pool: &PgPool, id: RequestId) -> Result<Option<BloodRequest>, sqlx::Error> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {COLUMNS} FROM blood_requests WHERE id = $1"
    ))
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    row.map(RequestRow::into_record).transpose()
}

/// Every request, oldest first.
pub async fn list(pool: &PgPool) -> Result<Vec<BloodRequest>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {COLUMNS} FROM blood_requests ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RequestRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    recipient_id: Uuid,
    bank_id: Uuid,
    blood_group: String,
    units: i64,
    required_by: NaiveDate,
    purpose: String,
    status: String,
    notes: Option<String>,
    transitions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    /// Unknown statuses or groups are decode errors. A request read back
    /// under the wrong status could be approved twice.
    fn into_record(self) -> Result<BloodRequest, sqlx::Error> {
        let id = self.id;
        let corrupt = |field: &'static str, reason: String| {
            tracing::error!(request_id = %id, field, %reason, "corrupt blood request row");
            sqlx::Error::Decode(format!("blood_requests.{field}: {reason}").into())
        };

        let blood_group: BloodGroup = self
            .blood_group
            .parse()
            .map_err(|e: bloodbank_core::ValidationError| corrupt("blood_group", e.to_string()))?;
        let units = Units::new(self.units).map_err(|e| corrupt("units", e.to_string()))?;
        let status: RequestStatus = self.status.parse().map_err(|e| corrupt("status", e))?;
        let transitions: Vec<RequestTransitionRecord> = serde_json::from_value(self.transitions)
            .map_err(|e| corrupt("transitions", e.to_string()))?;

        Ok(BloodRequest {
            id: RequestId::from_uuid(self.id),
            recipient_id: RecipientId::from_uuid(self.recipient_id),
            bank_id: BankId::from_uuid(self.bank_id),
            blood_group,
            units,
            required_by: self.required_by,
            purpose: self.purpose,
            status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            transitions,
        })
    }
}
