use uuid::Uuid;

use super::geo::{Coordinate, Located};
use super::lead::normalize_category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl From<&str> for VerificationStatus {
    fn from(s: &str) -> Self {
        match s {
            "verified" => Self::Verified,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// Read-only snapshot of a professional as published by the profile store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfessionalStats {
    pub professional_id: Uuid,
    /// 0.0 – 5.0
    pub average_rating: f64,
    pub total_jobs_completed: u32,
    pub verification_status: VerificationStatus,
    pub location: Option<Coordinate>,
    pub service_categories: Vec<String>,
}

impl ProfessionalStats {
    /// Stats used for a bidder the profile store does not know about.
    pub fn unknown(professional_id: Uuid) -> Self {
        Self {
            professional_id,
            average_rating: 0.0,
            total_jobs_completed: 0,
            verification_status: VerificationStatus::Pending,
            location: None,
            service_categories: Vec::new(),
        }
    }

    pub fn offers(&self, category: &str) -> bool {
        let wanted = normalize_category(category);
        self.service_categories
            .iter()
            .any(|c| normalize_category(c) == wanted)
    }
}

impl Located for ProfessionalStats {
    fn location(&self) -> Option<Coordinate> {
        self.location
    }
}
