use thiserror::Error;
use uuid::Uuid;

use super::lead::LeadStatus;

/// How a failure should be surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    StateConflict,
    NotFound,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum DomainError {
    // ── validation ───────────────────────────────────────────────────────────
    #[error("Invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("Quote must contain at least one item")]
    EmptyQuote,
    #[error("Invalid ranking weights: {0}")]
    InvalidWeightConfiguration(String),
    #[error("Cannot compute subtotal for item '{concept}': {reason}")]
    SubtotalMismatch { concept: String, reason: String },
    #[error("Invalid quote item '{concept}': {reason}")]
    InvalidQuoteItem { concept: String, reason: String },
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Field {field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("Invalid search radius: {0}")]
    InvalidRadius(f64),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    // ── authorization ────────────────────────────────────────────────────────
    #[error("Only the bid owner can do this")]
    NotBidOwner,
    #[error("Only the lead owner can do this")]
    NotLeadOwner,
    #[error("Only the assigned professional can do this")]
    NotAssignedProfessional,
    #[error("Only the lead client can do this")]
    NotLeadClient,

    // ── state conflict ───────────────────────────────────────────────────────
    #[error("Lead already has an assigned professional")]
    LeadAlreadyAssigned,
    #[error("Bid is no longer active")]
    BidNotActive,
    #[error("Lead is not accepting bids")]
    LeadNotAcceptingBids,
    #[error("Professional already has an active bid on this lead")]
    DuplicateActiveBid,
    #[error("Quote already accepted")]
    AlreadyAccepted,
    #[error("No quote is pending acceptance")]
    NoQuotePending,
    #[error("Cannot {action} a lead that is {from}")]
    IllegalTransition { from: LeadStatus, action: &'static str },
    #[error("Lead {0} was modified concurrently")]
    ConcurrentUpdate(Uuid),

    // ── not found ────────────────────────────────────────────────────────────
    #[error("Lead not found")]
    LeadNotFound,
    #[error("Bid not found")]
    BidNotFound,

    // ── infrastructure ───────────────────────────────────────────────────────
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    pub fn category(&self) -> ErrorCategory {
        use DomainError::*;
        match self {
            InvalidCoordinate { .. }
            | EmptyQuote
            | InvalidWeightConfiguration(_)
            | SubtotalMismatch { .. }
            | InvalidQuoteItem { .. }
            | MissingField(_)
            | FieldTooLong { .. }
            | InvalidRadius(_)
            | InvalidPrice(_) => ErrorCategory::Validation,
            NotBidOwner | NotLeadOwner | NotAssignedProfessional | NotLeadClient => {
                ErrorCategory::Authorization
            }
            LeadAlreadyAssigned
            | BidNotActive
            | LeadNotAcceptingBids
            | DuplicateActiveBid
            | AlreadyAccepted
            | NoQuotePending
            | IllegalTransition { .. }
            | ConcurrentUpdate(_) => ErrorCategory::StateConflict,
            LeadNotFound | BidNotFound => ErrorCategory::NotFound,
            Infrastructure(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Stable machine-readable code returned to API callers.
    pub fn code(&self) -> &'static str {
        use DomainError::*;
        match self {
            InvalidCoordinate { .. } => "INVALID_COORDINATE",
            EmptyQuote => "EMPTY_QUOTE",
            InvalidWeightConfiguration(_) => "INVALID_WEIGHT_CONFIGURATION",
            SubtotalMismatch { .. } => "SUBTOTAL_MISMATCH",
            InvalidQuoteItem { .. } => "INVALID_QUOTE_ITEM",
            MissingField(_) => "MISSING_FIELD",
            FieldTooLong { .. } => "FIELD_TOO_LONG",
            InvalidRadius(_) => "INVALID_RADIUS",
            InvalidPrice(_) => "INVALID_PRICE",
            NotBidOwner => "NOT_BID_OWNER",
            NotLeadOwner => "NOT_LEAD_OWNER",
            NotAssignedProfessional => "NOT_ASSIGNED_PROFESSIONAL",
            NotLeadClient => "NOT_LEAD_CLIENT",
            LeadAlreadyAssigned => "LEAD_ALREADY_ASSIGNED",
            BidNotActive => "BID_NOT_ACTIVE",
            LeadNotAcceptingBids => "LEAD_NOT_ACCEPTING_BIDS",
            DuplicateActiveBid => "DUPLICATE_ACTIVE_BID",
            AlreadyAccepted => "ALREADY_ACCEPTED",
            NoQuotePending => "NO_QUOTE_PENDING",
            IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            ConcurrentUpdate(_) => "CONCURRENT_UPDATE",
            LeadNotFound => "LEAD_NOT_FOUND",
            BidNotFound => "BID_NOT_FOUND",
            Infrastructure(_) => "STORE_UNAVAILABLE",
        }
    }
}
