//! Composite bid scoring.
//!
//! Scores are derived on every read and never stored, so a change of weights
//! re-orders historical views without touching persisted data.

use std::cmp::Ordering;
use std::collections::HashMap;

use bigdecimal::ToPrimitive;
use uuid::Uuid;

use super::bid::Bid;
use super::errors::DomainError;
use super::geo::distance_km;
use super::lead::Lead;
use super::professional::ProfessionalStats;

/// Jobs beyond this count add no further experience credit.
const EXPERIENCE_CAP: u32 = 100;
const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    rating: f64,
    experience: f64,
    price: f64,
    proximity: f64,
}

impl RankingWeights {
    pub fn new(rating: f64, experience: f64, price: f64, proximity: f64) -> Result<Self, DomainError> {
        let all = [rating, experience, price, proximity];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::InvalidWeightConfiguration(
                "weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(DomainError::InvalidWeightConfiguration(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(Self {
            rating,
            experience,
            price,
            proximity,
        })
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn proximity(&self) -> f64 {
        self.proximity
    }
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            rating: 0.35,
            experience: 0.15,
            price: 0.35,
            proximity: 0.15,
        }
    }
}

/// Per-component values in `[0, 1]` and their weighted total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub rating: f64,
    pub experience: f64,
    pub price: f64,
    pub proximity: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedBid {
    pub bid: Bid,
    pub score: ScoreBreakdown,
    /// `None` when the professional's location is unknown.
    pub distance_km: Option<f64>,
}

/// Everything about the bid set that a single score depends on.
#[derive(Debug, Clone, Copy)]
pub struct RankingContext {
    pub weights: RankingWeights,
    pub radius_km: f64,
    lowest_price: Option<f64>,
}

impl RankingContext {
    pub fn for_bids(bids: &[Bid], weights: RankingWeights, radius_km: f64) -> Self {
        let lowest_price = bids
            .iter()
            .filter_map(|b| b.proposed_price.to_f64())
            .filter(|p| *p > 0.0)
            .min_by(f64::total_cmp);
        Self {
            weights,
            radius_km,
            lowest_price,
        }
    }

    /// The cheapest bid gets 1.0, others `lowest / price`, so a lone bid is 1.0.
    fn price_component(&self, bid: &Bid) -> f64 {
        match (self.lowest_price, bid.proposed_price.to_f64()) {
            (Some(lowest), Some(price)) if price > 0.0 => (lowest / price).clamp(0.0, 1.0),
            _ => 1.0,
        }
    }
}

/// Composite score of one bid; higher is better.
pub fn score(
    bid: &Bid,
    stats: &ProfessionalStats,
    lead: &Lead,
    ctx: &RankingContext,
) -> (ScoreBreakdown, Option<f64>) {
    let rating = (stats.average_rating / 5.0).clamp(0.0, 1.0);
    let experience = f64::from(stats.total_jobs_completed.min(EXPERIENCE_CAP)) / f64::from(EXPERIENCE_CAP);
    let price = ctx.price_component(bid);

    let distance = stats.location.map(|loc| distance_km(lead.location, loc));
    let proximity = match distance {
        Some(d) if ctx.radius_km > 0.0 => 1.0 - d.min(ctx.radius_km) / ctx.radius_km,
        _ => 0.0,
    };

    let w = &ctx.weights;
    let total = w.rating * rating + w.experience * experience + w.price * price + w.proximity * proximity;

    (
        ScoreBreakdown {
            rating,
            experience,
            price,
            proximity,
            total,
        },
        distance,
    )
}

/// Orders the active bids by score, highest first. Ties go to the earliest
/// bid, then to the lowest id, so the result never depends on input order.
pub fn rank_bids(
    bids: &[Bid],
    stats: &HashMap<Uuid, ProfessionalStats>,
    lead: &Lead,
    weights: RankingWeights,
    radius_km: f64,
) -> Vec<RankedBid> {
    let active: Vec<Bid> = bids.iter().filter(|b| b.is_active()).cloned().collect();
    let ctx = RankingContext::for_bids(&active, weights, radius_km);

    let mut ranked: Vec<RankedBid> = active
        .into_iter()
        .map(|bid| {
            let fallback;
            let pro = match stats.get(&bid.professional_id) {
                Some(s) => s,
                None => {
                    fallback = ProfessionalStats::unknown(bid.professional_id);
                    &fallback
                }
            };
            let (score, distance_km) = score(&bid, pro, lead, &ctx);
            RankedBid {
                bid,
                score,
                distance_km,
            }
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedBid, b: &RankedBid) -> Ordering {
    b.score
        .total
        .total_cmp(&a.score.total)
        .then_with(|| a.bid.created_at.cmp(&b.bid.created_at))
        .then_with(|| a.bid.id.cmp(&b.bid.id))
}
