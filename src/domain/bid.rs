use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

/// `active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BidStatus {
    Active,
    Selected,
    Rejected,
    Withdrawn,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Selected => "selected",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BidStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "selected" => Ok(Self::Selected),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            other => Err(DomainError::Infrastructure(format!(
                "unknown bid status '{other}'"
            ))),
        }
    }
}

/// Price and message are fixed at creation; a correction is withdraw + re-bid.
#[derive(Debug, Clone, PartialEq)]
pub struct Bid {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub professional_id: Uuid,
    pub proposed_price: BigDecimal,
    /// Estimated duration in hours.
    pub estimated_time: Option<i32>,
    pub message: Option<String>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    pub fn is_active(&self) -> bool {
        self.status == BidStatus::Active
    }
}

/// What a professional offers when bidding.
#[derive(Debug, Clone)]
pub struct BidOffer {
    pub proposed_price: BigDecimal,
    pub estimated_time: Option<i32>,
    pub message: Option<String>,
}

impl BidOffer {
    pub fn validate(self) -> Result<Self, DomainError> {
        if self.proposed_price <= BigDecimal::zero() {
            return Err(DomainError::InvalidPrice(format!(
                "proposed price must be positive, got {}",
                self.proposed_price
            )));
        }
        let estimated_time = self.estimated_time.filter(|h| *h > 0);
        let message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        Ok(Self {
            estimated_time,
            message,
            ..self
        })
    }
}

/// A validated bid waiting to be placed on a lead.
#[derive(Debug, Clone)]
pub struct NewBid {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub offer: BidOffer,
}
