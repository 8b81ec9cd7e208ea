//! # Request Lifecycle Controller
//!
//! Applies status transitions to blood requests and adjusts the inventory
//! ledger as a side effect of approval.
//!
//! ## Approval protocol
//!
//! 1. Take the request's lock, so concurrent reviews of the same request
//!    run one after another (the second sees a non-pending status).
//! 2. Load the request and apply the transition in memory. Illegal moves
//!    fail here with nothing written.
//! 3. Debit the ledger. On insufficient stock the transition is abandoned;
//!    the stored status is still `pending`.
//! 4. Persist the request with a status compare-and-set. If that fails the
//!    debit is credited back before the error is returned.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BankId, BloodBankError, BloodGroup, InventoryKey, RequestId, Units};
use bloodbank_state::{BloodRequest, RequestDraft, RequestStatus};

use crate::ledger::{InventoryEntry, InventoryLedger};
use crate::lock::KeyedMutex;
use crate::store::RequestStore;

/// Outcome of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    /// Approve and debit stock.
    Approve,
    /// Reject with mandatory notes.
    Reject,
}

impl std::str::FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown decision \"{other}\" (expected approve or reject)"
            )),
        }
    }
}

/// Optional constraints for listing requests. Empty matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    /// Only requests in this status.
    pub status: Option<RequestStatus>,
    /// Only requests against this bank.
    pub bank_id: Option<BankId>,
    /// Only requests for this blood group.
    pub blood_group: Option<BloodGroup>,
}

impl RequestFilter {
    /// Whether `request` satisfies every set constraint.
    pub fn matches(&self, request: &BloodRequest) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self.bank_id.map_or(true, |b| request.bank_id == b)
            && self.blood_group.map_or(true, |g| request.blood_group == g)
    }
}

/// Owns every blood request transition.
pub struct LifecycleController {
    requests: Arc<dyn RequestStore>,
    ledger: Arc<InventoryLedger>,
    locks: KeyedMutex<RequestId>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("ledger", &self.ledger)
            .field("locked_requests", &self.locks.active_keys())
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    /// Build a controller over a request store and a ledger.
    pub fn new(requests: Arc<dyn RequestStore>, ledger: Arc<InventoryLedger>) -> Self {
        Self {
            requests,
            ledger,
            locks: KeyedMutex::new(),
        }
    }

    /// The ledger this controller debits.
    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    /// Validate a submission and store it as a pending request.
    ///
    /// Stock is not checked: a request may be submitted against a bank that
    /// currently holds none of the group.
    pub async fn submit_request(&self, draft: RequestDraft) -> Result<BloodRequest, BloodBankError> {
        self.submit_request_on(draft, Utc::now().date_naive()).await
    }

    /// [`submit_request`](Self::submit_request) with an explicit "today".
    pub async fn submit_request_on(
        &self,
        draft: RequestDraft,
        today: NaiveDate,
    ) -> Result<BloodRequest, BloodBankError> {
        let request = draft.validate(today, Utc::now()).map_err(|err| {
            tracing::debug!(error = %err, "blood request submission rejected");
            err
        })?;
        self.requests.insert_request(&request).await?;

        metrics::counter!("bloodbank_requests_submitted_total").increment(1);
        tracing::info!(
            request_id = %request.id,
            bank_id = %request.bank_id,
            blood_group = %request.blood_group,
            units = request.units.get(),
            "blood request submitted"
        );
        Ok(request)
    }

    /// Approve or reject a pending request.
    ///
    /// Approval debits the request's units from its bank. If stock is short
    /// the request stays `pending` and
    /// [`BloodBankError::InsufficientInventory`] is returned.
    pub async fn review_request(
        &self,
        id: RequestId,
        decision: ReviewDecision,
        notes: Option<String>,
    ) -> Result<BloodRequest, BloodBankError> {
        let _guard = self.locks.lock(&id).await;
        let mut request = self.load(id).await?;
        let from = request.status;

        match decision {
            ReviewDecision::Reject => {
                request.reject(notes.as_deref().unwrap_or_default())?;
                self.persist(&request, from).await?;
            }
            ReviewDecision::Approve => {
                request.approve(notes)?;
                let key = request.inventory_key();
                self.ledger.debit(key, request.units).await?;
                if let Err(err) = self.persist(&request, from).await {
                    self.compensate(id, key, request.units).await;
                    return Err(err);
                }
            }
        }

        self.record_transition(&request, from);
        Ok(request)
    }

    /// Mark an approved request fulfilled.
    pub async fn fulfill_request(
        &self,
        id: RequestId,
        notes: Option<String>,
    ) -> Result<BloodRequest, BloodBankError> {
        let _guard = self.locks.lock(&id).await;
        let mut request = self.load(id).await?;
        let from = request.status;

        request.fulfill(notes)?;
        self.persist(&request, from).await?;

        self.record_transition(&request, from);
        Ok(request)
    }

    /// Fetch one request.
    pub async fn get_request(&self, id: RequestId) -> Result<BloodRequest, BloodBankError> {
        self.load(id).await
    }

    /// Requests matching `filter`, oldest first.
    pub async fn list_requests(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<BloodRequest>, BloodBankError> {
        let mut requests: Vec<_> = self
            .requests
            .list_requests()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    /// Donation intake: credit `units` of `blood_group` to `bank_id`.
    pub async fn record_donation(
        &self,
        bank_id: BankId,
        blood_group: BloodGroup,
        units: i64,
    ) -> Result<InventoryEntry, BloodBankError> {
        let units = Units::new(units)?;
        self.ledger
            .credit(InventoryKey::new(bank_id, blood_group), units)
            .await
    }

    async fn load(&self, id: RequestId) -> Result<BloodRequest, BloodBankError> {
        self.requests
            .get_request(id)
            .await?
            .ok_or_else(|| BloodBankError::NotFound {
                kind: "blood request",
                id: id.to_string(),
            })
    }

    /// Write `request` if the stored status is still `from`.
    ///
    /// A mismatch means another writer moved the request first; the caller
    /// gets the transition conflict against the status now stored.
    async fn persist(&self, request: &BloodRequest, from: RequestStatus) -> Result<(), BloodBankError> {
        if self.requests.update_request(request, from).await? {
            return Ok(());
        }
        let current = self.load(request.id).await?;
        tracing::warn!(
            request_id = %request.id,
            expected = %from,
            found = %current.status,
            "request changed concurrently"
        );
        Err(BloodBankError::InvalidState {
            id: request.id.to_string(),
            from: current.status.to_string(),
            to: request.status.to_string(),
        })
    }

    async fn compensate(&self, id: RequestId, key: InventoryKey, units: Units) {
        match self.ledger.credit(key, units).await {
            Ok(_) => tracing::warn!(
                request_id = %id,
                %key,
                units = units.get(),
                "approval not persisted; debit credited back"
            ),
            Err(err) => tracing::error!(
                request_id = %id,
                %key,
                units = units.get(),
                error = %err,
                "approval not persisted and compensating credit failed; inventory is short"
            ),
        }
    }

    fn record_transition(&self, request: &BloodRequest, from: RequestStatus) {
        metrics::counter!(
            "bloodbank_request_transitions_total",
            "to" => request.status.as_str()
        )
        .increment(1);
        tracing::info!(
            request_id = %request.id,
            from = %from,
            to = %request.status,
            "blood request transitioned"
        );
    }
}
