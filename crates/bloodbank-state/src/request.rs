//! # Blood Request Lifecycle State Machine
//!
//! Models a request for blood units from submission through review and
//! fulfillment.
//!
//! ## Design Decision
//!
//! The lifecycle uses an enum with validated transitions rather than
//! typestate types. Requests are loaded from storage with whatever status
//! was persisted, so the state is only known at runtime; `approve()`,
//! `reject()` and `fulfill()` return `Result` and reject illegal moves with
//! a structured error naming both states.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bloodbank_core::{
    BankId, BloodBankError, BloodGroup, InventoryKey, RecipientId, RequestId, Units,
    ValidationError,
};

/// Maximum length of the free-text purpose, in characters.
pub const MAX_PURPOSE_CHARS: usize = 500;

// ─── Status ──────────────────────────────────────────────────────────

/// The lifecycle status of a blood request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Submitted, awaiting review.
    Pending,
    /// Approved; stock has been debited from the bank's inventory.
    Approved,
    /// Rejected with a reason. Terminal state.
    Rejected,
    /// Units handed over to the recipient. Terminal state.
    Fulfilled,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [RequestStatus; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Fulfilled,
    ];

    /// The wire/storage name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Fulfilled => "fulfilled",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Fulfilled)
    }

    /// The statuses reachable from this one in a single transition.
    pub fn valid_transitions(&self) -> &'static [RequestStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Fulfilled],
            Self::Rejected | Self::Fulfilled => &[],
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown request status \"{s}\""))
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during request lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid request transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// The request identifier.
        id: RequestId,
        /// Current state.
        from: RequestStatus,
        /// Attempted target state.
        to: RequestStatus,
    },

    /// The request is in a terminal state.
    #[error("request {id} is {state} and cannot transition to {to}")]
    AlreadyTerminal {
        /// The request identifier.
        id: RequestId,
        /// The terminal state it is in.
        state: RequestStatus,
        /// Attempted target state.
        to: RequestStatus,
    },

    /// A rejection was attempted without notes.
    #[error("notes are required when rejecting a request")]
    MissingRejectionNotes,
}

impl From<RequestError> for BloodBankError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::InvalidTransition { id, from, to } => Self::InvalidState {
                id: id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            },
            RequestError::AlreadyTerminal { id, state, to } => Self::InvalidState {
                id: id.to_string(),
                from: state.to_string(),
                to: to.to_string(),
            },
            RequestError::MissingRejectionNotes => {
                Self::Validation(ValidationError::MissingRejectionNotes)
            }
        }
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a single status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTransitionRecord {
    /// Status before the transition.
    pub from_state: RequestStatus,
    /// Status after the transition.
    pub to_state: RequestStatus,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reviewer notes attached to the transition, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ─── Submission ──────────────────────────────────────────────────────

/// Raw submission input, before validation.
///
/// Blood group and units arrive as the caller sent them so that
/// validation failures can name the offending value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDraft {
    /// Who the blood is for.
    pub recipient_id: RecipientId,
    /// The bank the units will be drawn from.
    pub bank_id: BankId,
    /// Requested blood group, in conventional notation.
    pub blood_group: String,
    /// Requested number of units.
    pub units: i64,
    /// Date by which the units are needed.
    pub required_by: NaiveDate,
    /// Free-text clinical purpose.
    pub purpose: String,
}

impl RequestDraft {
    /// Validate the draft and build a pending request.
    ///
    /// `today` is the calendar date the submission is evaluated against;
    /// a `required_by` of today is accepted, anything earlier is not.
    pub fn validate(
        self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<BloodRequest, ValidationError> {
        let units = Units::new(self.units)?;
        let blood_group: BloodGroup = self.blood_group.parse()?;
        if self.required_by < today {
            return Err(ValidationError::RequiredByInPast {
                required_by: self.required_by,
                today,
            });
        }
        let purpose = self.purpose.trim();
        if purpose.is_empty() {
            return Err(ValidationError::EmptyPurpose);
        }
        let len = purpose.chars().count();
        if len > MAX_PURPOSE_CHARS {
            return Err(ValidationError::PurposeTooLong {
                len,
                max: MAX_PURPOSE_CHARS,
            });
        }

        Ok(BloodRequest {
            id: RequestId::new(),
            recipient_id: self.recipient_id,
            bank_id: self.bank_id,
            blood_group,
            units,
            required_by: self.required_by,
            purpose: purpose.to_string(),
            status: RequestStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        })
    }
}

// ─── Blood Request ───────────────────────────────────────────────────

/// A blood request with its lifecycle status and transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Who the blood is for.
    pub recipient_id: RecipientId,
    /// The bank the units are drawn from.
    pub bank_id: BankId,
    /// Requested blood group.
    pub blood_group: BloodGroup,
    /// Requested number of units.
    pub units: Units,
    /// Date by which the units are needed.
    pub required_by: NaiveDate,
    /// Free-text clinical purpose.
    pub purpose: String,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Most recent reviewer notes.
    pub notes: Option<String>,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the request last changed.
    pub updated_at: DateTime<Utc>,
    /// Ordered log of all status transitions.
    #[serde(default)]
    pub transitions: Vec<RequestTransitionRecord>,
}

impl BloodRequest {
    /// The inventory entry this request debits on approval.
    pub fn inventory_key(&self) -> InventoryKey {
        InventoryKey::new(self.bank_id, self.blood_group)
    }

    /// Approve the request (PENDING → APPROVED).
    ///
    /// Notes are optional on approval.
    pub fn approve(&mut self, notes: Option<String>) -> Result<(), RequestError> {
        self.require_state(RequestStatus::Pending, RequestStatus::Approved)?;
        self.do_transition(RequestStatus::Approved, normalize_notes(notes));
        Ok(())
    }

    /// Reject the request (PENDING → REJECTED).
    ///
    /// Notes are mandatory. The state check runs first, so re-reviewing a
    /// decided request reports the state conflict even with empty notes.
    pub fn reject(&mut self, notes: &str) -> Result<(), RequestError> {
        self.require_state(RequestStatus::Pending, RequestStatus::Rejected)?;
        let notes =
            normalize_notes(Some(notes.to_string())).ok_or(RequestError::MissingRejectionNotes)?;
        self.do_transition(RequestStatus::Rejected, Some(notes));
        Ok(())
    }

    /// Mark the request fulfilled (APPROVED → FULFILLED).
    pub fn fulfill(&mut self, notes: Option<String>) -> Result<(), RequestError> {
        self.require_state(RequestStatus::Approved, RequestStatus::Fulfilled)?;
        self.do_transition(RequestStatus::Fulfilled, normalize_notes(notes));
        Ok(())
    }

    /// Whether the request can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn require_state(
        &self,
        expected: RequestStatus,
        target: RequestStatus,
    ) -> Result<(), RequestError> {
        if self.status.is_terminal() {
            return Err(RequestError::AlreadyTerminal {
                id: self.id,
                state: self.status,
                to: target,
            });
        }
        if self.status != expected {
            return Err(RequestError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: RequestStatus, notes: Option<String>) {
        let now = Utc::now();
        self.transitions.push(RequestTransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: now,
            notes: notes.clone(),
        });
        if notes.is_some() {
            self.notes = notes;
        }
        self.status = to;
        self.updated_at = now;
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn draft() -> RequestDraft {
        RequestDraft {
            recipient_id: RecipientId::new(),
            bank_id: BankId::new(),
            blood_group: "A+".to_string(),
            units: 4,
            required_by: today(),
            purpose: "elective hip replacement".to_string(),
        }
    }

    fn make_request() -> BloodRequest {
        draft().validate(today(), Utc::now()).unwrap()
    }

    fn make_approved_request() -> BloodRequest {
        let mut r = make_request();
        r.approve(None).unwrap();
        r
    }

    // ── Submission validation ────────────────────────────────────────

    #[test]
    fn test_valid_draft_is_pending() {
        let r = make_request();
        assert_eq!(r.status, RequestStatus::Pending);
        assert_eq!(r.blood_group, BloodGroup::APos);
        assert_eq!(r.units.get(), 4);
        assert!(r.transitions.is_empty());
        assert!(r.notes.is_none());
    }

    #[test]
    fn test_valid_drafts_get_unique_ids() {
        assert_ne!(make_request().id, make_request().id);
    }

    #[test]
    fn test_zero_units_rejected() {
        let mut d = draft();
        d.units = 0;
        let err = d.validate(today(), Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveUnits(0));
    }

    #[test]
    fn test_negative_units_rejected() {
        let mut d = draft();
        d.units = -2;
        assert!(d.validate(today(), Utc::now()).is_err());
    }

    #[test]
    fn test_unknown_blood_group_rejected() {
        let mut d = draft();
        d.blood_group = "C+".to_string();
        let err = d.validate(today(), Utc::now()).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownBloodGroup(_)));
    }

    #[test]
    fn test_past_required_by_rejected() {
        let mut d = draft();
        d.required_by = today().pred_opt().unwrap();
        let err = d.validate(today(), Utc::now()).unwrap_err();
        assert!(matches!(err, ValidationError::RequiredByInPast { .. }));
    }

    #[test]
    fn test_future_required_by_accepted() {
        let mut d = draft();
        d.required_by = today().succ_opt().unwrap();
        assert!(d.validate(today(), Utc::now()).is_ok());
    }

    #[test]
    fn test_blank_purpose_rejected() {
        let mut d = draft();
        d.purpose = "   ".to_string();
        let err = d.validate(today(), Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyPurpose);
    }

    #[test]
    fn test_overlong_purpose_rejected() {
        let mut d = draft();
        d.purpose = "x".repeat(MAX_PURPOSE_CHARS + 1);
        let err = d.validate(today(), Utc::now()).unwrap_err();
        assert!(matches!(err, ValidationError::PurposeTooLong { .. }));
    }

    #[test]
    fn test_purpose_is_trimmed() {
        let mut d = draft();
        d.purpose = "  trauma  ".to_string();
        let r = d.validate(today(), Utc::now()).unwrap();
        assert_eq!(r.purpose, "trauma");
    }

    // ── Transitions ──────────────────────────────────────────────────

    #[test]
    fn test_pending_to_approved() {
        let mut r = make_request();
        r.approve(Some("crossmatch ok".to_string())).unwrap();
        assert_eq!(r.status, RequestStatus::Approved);
        assert_eq!(r.notes.as_deref(), Some("crossmatch ok"));
        assert_eq!(r.transitions.len(), 1);
    }

    #[test]
    fn test_pending_to_rejected_requires_notes() {
        let mut r = make_request();
        assert_eq!(r.reject(""), Err(RequestError::MissingRejectionNotes));
        assert_eq!(r.reject("  \t"), Err(RequestError::MissingRejectionNotes));
        assert_eq!(r.status, RequestStatus::Pending);
        assert!(r.transitions.is_empty());

        r.reject("duplicate request").unwrap();
        assert_eq!(r.status, RequestStatus::Rejected);
        assert_eq!(r.notes.as_deref(), Some("duplicate request"));
    }

    #[test]
    fn test_approved_to_fulfilled() {
        let mut r = make_approved_request();
        r.fulfill(None).unwrap();
        assert_eq!(r.status, RequestStatus::Fulfilled);
        assert!(r.is_terminal());
    }

    #[test]
    fn test_cannot_fulfill_pending() {
        let mut r = make_request();
        let err = r.fulfill(None).unwrap_err();
        assert!(matches!(
            err,
            RequestError::InvalidTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::Fulfilled,
                ..
            }
        ));
    }

    #[test]
    fn test_cannot_review_twice() {
        let mut r = make_approved_request();
        assert!(matches!(
            r.approve(None),
            Err(RequestError::InvalidTransition { .. })
        ));
        assert!(matches!(
            r.reject("changed mind"),
            Err(RequestError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_rejected_is_terminal() {
        let mut r = make_request();
        r.reject("no crossmatch").unwrap();
        match r.approve(None).unwrap_err() {
            RequestError::AlreadyTerminal { state, .. } => {
                assert_eq!(state, RequestStatus::Rejected)
            }
            other => panic!("Expected AlreadyTerminal, got: {other:?}"),
        }
        // State is checked before notes.
        assert!(matches!(
            r.reject(""),
            Err(RequestError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn test_fulfilled_is_terminal() {
        let mut r = make_approved_request();
        r.fulfill(None).unwrap();
        assert!(matches!(
            r.fulfill(None),
            Err(RequestError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn test_transitions_follow_valid_transitions_table() {
        for status in RequestStatus::ALL {
            assert_eq!(status.is_terminal(), status.valid_transitions().is_empty());
        }
        assert!(RequestStatus::Pending
            .valid_transitions()
            .contains(&RequestStatus::Approved));
        assert!(!RequestStatus::Pending
            .valid_transitions()
            .contains(&RequestStatus::Fulfilled));
    }

    // ── Transition log ───────────────────────────────────────────────

    #[test]
    fn test_transition_log_records_all_changes() {
        let mut r = make_request();
        r.approve(Some("ok".to_string())).unwrap();
        r.fulfill(Some("collected by ward 4".to_string())).unwrap();

        assert_eq!(r.transitions.len(), 2);
        assert_eq!(r.transitions[0].from_state, RequestStatus::Pending);
        assert_eq!(r.transitions[0].to_state, RequestStatus::Approved);
        assert_eq!(r.transitions[1].from_state, RequestStatus::Approved);
        assert_eq!(r.transitions[1].to_state, RequestStatus::Fulfilled);
        assert_eq!(r.notes.as_deref(), Some("collected by ward 4"));
    }

    #[test]
    fn test_approve_without_notes_keeps_previous_notes() {
        let mut r = make_request();
        r.approve(Some("   ".to_string())).unwrap();
        assert!(r.notes.is_none());
        assert!(r.transitions[0].notes.is_none());
    }

    // ── Conversions ──────────────────────────────────────────────────

    #[test]
    fn test_request_error_maps_to_taxonomy() {
        let r = make_request();
        let invalid: BloodBankError = RequestError::InvalidTransition {
            id: r.id,
            from: RequestStatus::Pending,
            to: RequestStatus::Fulfilled,
        }
        .into();
        assert!(matches!(invalid, BloodBankError::InvalidState { .. }));

        let missing: BloodBankError = RequestError::MissingRejectionNotes.into();
        assert!(matches!(
            missing,
            BloodBankError::Validation(ValidationError::MissingRejectionNotes)
        ));
    }

    #[test]
    fn test_inventory_key_resolves_bank_and_group() {
        let r = make_request();
        let key = r.inventory_key();
        assert_eq!(key.bank_id, r.bank_id);
        assert_eq!(key.blood_group, r.blood_group);
    }

    // ── Display / serde ──────────────────────────────────────────────

    #[test]
    fn test_status_display_and_parse() {
        for status in RequestStatus::ALL {
            assert_eq!(status.to_string().parse::<RequestStatus>().unwrap(), status);
        }
        assert_eq!(
            "APPROVED".parse::<RequestStatus>().unwrap(),
            RequestStatus::Approved
        );
        assert!("cancelled".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_request_serialization() {
        let r = make_approved_request();
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"status\":\"approved\""));
        assert!(json.contains("\"blood_group\":\"A+\""));
        let parsed: BloodRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }
}
