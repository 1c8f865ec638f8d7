//! Spend-versus-progress scoring on a `0..=100` scale.

use super::{
    round2, RiskAssessment, RiskDetails, RiskError, RiskInput, RiskLevel, RiskScore, RiskStrategy,
};

const BASELINE: i32 = 50;
const OVERSPEND_MARGIN: f64 = 0.10;
const OVERSPEND_PENALTY: i32 = 25;
const HEAVY_RISK_PROGRESS_BELOW: f64 = 50.0;
const HEAVY_RISK_RATIO_ABOVE: f64 = 0.80;
const HEAVY_RISK_PENALTY: i32 = 25;
const EFFICIENCY_MARGIN: f64 = 0.05;
const EFFICIENCY_BONUS: i32 = 20;

/// Scores spend against progress.
///
/// # Errors
/// - `RiskError::InvalidBudget` when `budget <= 0`.
pub fn evaluate_percentage(input: &RiskInput) -> Result<RiskAssessment, RiskError> {
    let spent_ratio = input
        .spent_ratio()
        .ok_or(RiskError::InvalidBudget(input.budget))?;
    let progress_fraction = input.progress_percent / 100.0;

    let mut score = BASELINE;

    if spent_ratio > progress_fraction + OVERSPEND_MARGIN {
        score += OVERSPEND_PENALTY;
    }
    if input.progress_percent < HEAVY_RISK_PROGRESS_BELOW && spent_ratio > HEAVY_RISK_RATIO_ABOVE {
        score += HEAVY_RISK_PENALTY;
    }
    if spent_ratio < progress_fraction - EFFICIENCY_MARGIN {
        score -= EFFICIENCY_BONUS;
    }

    let clamped = score.clamp(0, 100);
    let score = u8::try_from(clamped).unwrap_or(100);

    Ok(RiskAssessment {
        strategy: RiskStrategy::PercentageRisk,
        score: RiskScore::Percentage(score),
        level: RiskLevel::from_percentage(f64::from(score)),
        details: RiskDetails {
            spent_ratio: Some(round2(spent_ratio)),
            progress: input.progress_percent,
        },
    })
}
