//! Buyer requests and their fulfillment state machine.
//!
//! The status table is explicit: only forward-adjacent transitions plus a
//! direct jump to Cancelled are legal, and re-issuing the current status is a
//! permitted no-op. Everything else is rejected before any side effect runs.

use crate::error::{TransitionError, ValidationError};
use crate::timestamp::TimeStamp;
use chrono::Utc;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum RequestStatus {
    #[n(0)]
    New,
    #[n(1)]
    Reviewed,
    #[n(2)]
    Confirmed,
    #[n(3)]
    Dispatched,
    #[n(4)]
    Completed,
    #[n(5)]
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::New => "New",
            RequestStatus::Reviewed => "Reviewed",
            RequestStatus::Confirmed => "Confirmed",
            RequestStatus::Dispatched => "Dispatched",
            RequestStatus::Completed => "Completed",
            RequestStatus::Cancelled => "Cancelled",
        }
    }

    /// Parse a wire status value. Unrecognized strings must be rejected
    /// before any side effect, so this is the first check on the status
    /// update path.
    pub fn parse(raw: &str) -> Result<Self, TransitionError> {
        match raw.to_ascii_lowercase().as_str() {
            "new" => Ok(RequestStatus::New),
            "reviewed" => Ok(RequestStatus::Reviewed),
            "confirmed" => Ok(RequestStatus::Confirmed),
            "dispatched" => Ok(RequestStatus::Dispatched),
            "completed" => Ok(RequestStatus::Completed),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(TransitionError::UnknownStatus(raw.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// The single forward step in the sequential progression, if any.
    fn next(self) -> Option<RequestStatus> {
        match self {
            RequestStatus::New => Some(RequestStatus::Reviewed),
            RequestStatus::Reviewed => Some(RequestStatus::Confirmed),
            RequestStatus::Confirmed => Some(RequestStatus::Dispatched),
            RequestStatus::Dispatched => Some(RequestStatus::Completed),
            RequestStatus::Completed | RequestStatus::Cancelled => None,
        }
    }

    pub fn can_transition(self, to: RequestStatus) -> bool {
        if self == to {
            return true; // same-status reissue is a no-op
        }
        if to == RequestStatus::Cancelled {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, minicbor::Encode, minicbor::Decode)]
pub struct BuyerContact {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub company_name: String,
    #[n(2)]
    pub email: Option<String>,
    #[n(3)]
    pub mobile: Option<String>,
    #[n(4)]
    pub country_code: Option<String>,
}

impl BuyerContact {
    /// A request with both email and mobile absent is invalid at creation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("buyerName"));
        }
        if self.company_name.trim().is_empty() {
            return Err(ValidationError::MissingField("companyName"));
        }

        let has_email = self.email.as_deref().is_some_and(|e| !e.trim().is_empty());
        let has_mobile = self.mobile.as_deref().is_some_and(|m| !m.trim().is_empty());
        if !has_email && !has_mobile {
            return Err(ValidationError::MissingContactMethod);
        }

        Ok(())
    }
}

/// Append-only audit comment; never edited or removed.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct AdminNote {
    #[n(0)]
    pub note: String,
    #[n(1)]
    pub author: String,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, minicbor::Encode, minicbor::Decode)]
pub struct Request {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub request_code: String, // human code, generated once, immutable
    #[n(2)]
    pub buyer: BuyerContact,
    #[n(3)]
    pub listing_id: String,
    #[n(4)]
    pub industry_id: String, // snapshot copied from the listing at creation
    #[n(5)]
    pub requested_quantity: Option<u64>, // material requests only
    #[n(6)]
    pub specifications: Option<String>,
    #[n(7)]
    pub status: RequestStatus,
    #[n(8)]
    pub stock_deducted: bool, // set true exactly once, by the first successful deduct
    #[n(9)]
    pub quantity_fulfilled: Option<u64>,
    #[n(10)]
    pub admin_notes: Vec<AdminNote>,
    #[n(11)]
    pub confirmed_at: Option<TimeStamp<Utc>>,
    #[n(12)]
    pub dispatched_at: Option<TimeStamp<Utc>>,
    #[n(13)]
    pub completed_at: Option<TimeStamp<Utc>>,
    #[n(14)]
    pub created_at: TimeStamp<Utc>,
    #[n(15)]
    pub updated_at: TimeStamp<Utc>,
}

impl Request {
    pub fn append_note(&mut self, note: &str, author: &str) {
        self.admin_notes.push(AdminNote {
            note: note.to_string(),
            author: author.to_string(),
            timestamp: TimeStamp::new(),
        });
    }

    /// Record the first entry into a state; each marker is set at most once.
    pub fn mark_entered(&mut self, status: RequestStatus) {
        let now = TimeStamp::new();
        match status {
            RequestStatus::Confirmed => {
                if self.confirmed_at.is_none() {
                    self.confirmed_at = Some(now);
                }
            }
            RequestStatus::Dispatched => {
                if self.dispatched_at.is_none() {
                    self.dispatched_at = Some(now);
                }
            }
            RequestStatus::Completed => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
            }
            _ => {}
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = TimeStamp::new();
    }
}
