//! Additive flag scoring on a `0.0..=1.0` scale.

use super::{round2, RiskAssessment, RiskDetails, RiskInput, RiskLevel, RiskScore, RiskStrategy};

// Points are hundredths of the final score so sums stay exact.
const OVERSPEND_POINTS: u32 = 40;
const SCHEDULE_SLIP_POINTS: u32 = 30;
const MANY_COMPLAINTS_POINTS: u32 = 30;
const SOME_COMPLAINTS_POINTS: u32 = 15;
const MANY_COMPLAINTS_MIN: u32 = 3;
const MAX_POINTS: u32 = 100;

/// Scores overspend, schedule slip and complaint tiers.
///
/// Input ranges are checked by [`super::evaluate`]; this function is total.
pub fn evaluate_fractional(input: &RiskInput) -> RiskAssessment {
    let mut points = 0;

    if input.spent > input.budget {
        points += OVERSPEND_POINTS;
    }

    if let Some(planned) = input.planned_end_date {
        let finished_or_today = input.actual_end_date.unwrap_or(input.today);
        if finished_or_today > planned {
            points += SCHEDULE_SLIP_POINTS;
        }
    }

    if input.negative_feedback_count >= MANY_COMPLAINTS_MIN {
        points += MANY_COMPLAINTS_POINTS;
    } else if input.negative_feedback_count > 0 {
        points += SOME_COMPLAINTS_POINTS;
    }

    let points = points.min(MAX_POINTS);
    let score = f64::from(points) / 100.0;

    RiskAssessment {
        strategy: RiskStrategy::FractionalRisk,
        score: RiskScore::Fraction(score),
        level: RiskLevel::from_percentage(f64::from(points)),
        details: RiskDetails {
            spent_ratio: input.spent_ratio().map(round2),
            progress: input.progress_percent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::evaluate_fractional;
    use crate::risk::{RiskInput, RiskLevel, RiskScore};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn all_flags_cap_at_one() {
        let mut input = RiskInput::new(10.0, 100.0, 150.0, date(2025, 6, 1));
        input.planned_end_date = Some(date(2025, 1, 1));
        input.negative_feedback_count = 5;

        let assessment = evaluate_fractional(&input);
        assert_eq!(assessment.score, RiskScore::Fraction(1.0));
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn actual_end_date_takes_precedence_over_today() {
        let mut input = RiskInput::new(100.0, 100.0, 90.0, date(2025, 6, 1));
        input.planned_end_date = Some(date(2025, 3, 1));
        input.actual_end_date = Some(date(2025, 2, 20));

        let assessment = evaluate_fractional(&input);
        assert_eq!(assessment.score, RiskScore::Fraction(0.0));
    }

    #[test]
    fn unfinished_project_past_plan_slips() {
        let mut input = RiskInput::new(60.0, 100.0, 50.0, date(2025, 6, 1));
        input.planned_end_date = Some(date(2025, 5, 31));

        let assessment = evaluate_fractional(&input);
        assert_eq!(assessment.score, RiskScore::Fraction(0.3));
    }

    #[test]
    fn single_complaint_uses_lower_tier() {
        let mut input = RiskInput::new(60.0, 100.0, 50.0, date(2025, 6, 1));
        input.negative_feedback_count = 1;

        let assessment = evaluate_fractional(&input);
        assert_eq!(assessment.score, RiskScore::Fraction(0.15));
        assert_eq!(assessment.level, RiskLevel::Low);
    }
}
