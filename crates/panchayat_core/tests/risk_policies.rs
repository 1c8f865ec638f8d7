use chrono::NaiveDate;
use panchayat_core::{evaluate, RiskError, RiskInput, RiskLevel, RiskScore, RiskStrategy};
use proptest::prelude::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn date_from_offset(days: i64) -> NaiveDate {
    today() + chrono::Duration::days(days)
}

#[test]
fn on_track_project_scores_zero_and_baseline() {
    let input = RiskInput::new(40.0, 500_000.0, 200_000.0, today());

    let fractional = evaluate(RiskStrategy::FractionalRisk, &input).unwrap();
    assert_eq!(fractional.score, RiskScore::Fraction(0.0));
    assert_eq!(fractional.level, RiskLevel::Low);

    let percentage = evaluate(RiskStrategy::PercentageRisk, &input).unwrap();
    assert_eq!(percentage.score, RiskScore::Percentage(50));
    assert_eq!(percentage.level, RiskLevel::Medium);
    assert_eq!(percentage.details.spent_ratio, Some(0.4));
    assert_eq!(percentage.details.progress, 40.0);
}

#[test]
fn delayed_project_near_progress_stays_at_baseline() {
    let input = RiskInput::new(75.0, 800_000.0, 650_000.0, today());

    let assessment = evaluate(RiskStrategy::PercentageRisk, &input).unwrap();
    assert_eq!(assessment.score, RiskScore::Percentage(50));
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert_eq!(assessment.details.spent_ratio, Some(0.81));
}

#[test]
fn efficient_spend_earns_bonus() {
    let input = RiskInput::new(60.0, 100.0, 30.0, today());
    let assessment = evaluate(RiskStrategy::PercentageRisk, &input).unwrap();
    assert_eq!(assessment.score, RiskScore::Percentage(30));
    assert_eq!(assessment.level, RiskLevel::Low);
}

#[test]
fn fractional_tiers_for_negative_feedback() {
    let mut input = RiskInput::new(50.0, 100.0, 50.0, today());

    input.negative_feedback_count = 2;
    let some = evaluate(RiskStrategy::FractionalRisk, &input).unwrap();
    assert_eq!(some.score, RiskScore::Fraction(0.15));

    input.negative_feedback_count = 3;
    let many = evaluate(RiskStrategy::FractionalRisk, &input).unwrap();
    assert_eq!(many.score, RiskScore::Fraction(0.3));
}

#[test]
fn overspend_and_slip_give_high_fraction() {
    let mut input = RiskInput::new(90.0, 100.0, 120.0, today());
    input.planned_end_date = Some(date_from_offset(-30));

    let assessment = evaluate(RiskStrategy::FractionalRisk, &input).unwrap();
    assert_eq!(assessment.score, RiskScore::Fraction(0.7));
    assert_eq!(assessment.level, RiskLevel::Medium);
}

#[test]
fn out_of_range_inputs_are_rejected() {
    for strategy in [RiskStrategy::FractionalRisk, RiskStrategy::PercentageRisk] {
        let negative = RiskInput::new(10.0, -1.0, 0.0, today());
        assert!(matches!(
            evaluate(strategy, &negative),
            Err(RiskError::InvalidAmount { field: "budget", .. })
        ));

        let progress = RiskInput::new(101.0, 10.0, 0.0, today());
        assert!(matches!(
            evaluate(strategy, &progress),
            Err(RiskError::InvalidProgress(_))
        ));

        let nan = RiskInput::new(10.0, 10.0, f64::NAN, today());
        assert!(evaluate(strategy, &nan).is_err());
    }
}

#[test]
fn zero_budget_only_fails_percentage_scoring() {
    let input = RiskInput::new(10.0, 0.0, 0.0, today());
    assert!(evaluate(RiskStrategy::FractionalRisk, &input).is_ok());
    assert_eq!(
        evaluate(RiskStrategy::PercentageRisk, &input).unwrap_err(),
        RiskError::InvalidBudget(0.0)
    );
}

fn risk_input() -> impl Strategy<Value = RiskInput> {
    (
        0.0f64..=100.0,
        1.0f64..1_000_000.0,
        0.0f64..2_000_000.0,
        proptest::option::of(-400i64..400),
        proptest::option::of(-400i64..400),
        0u32..10,
    )
        .prop_map(|(progress, budget, spent, planned, actual, negative)| RiskInput {
            progress_percent: progress,
            budget,
            spent,
            planned_end_date: planned.map(date_from_offset),
            actual_end_date: actual.map(date_from_offset),
            negative_feedback_count: negative,
            today: today(),
        })
}

fn fraction(score: RiskScore) -> f64 {
    match score {
        RiskScore::Fraction(value) => value,
        RiskScore::Percentage(_) => panic!("expected a fractional score"),
    }
}

proptest! {
    #[test]
    fn fractional_score_stays_in_unit_range(input in risk_input()) {
        let assessment = evaluate(RiskStrategy::FractionalRisk, &input).unwrap();
        let score = fraction(assessment.score);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn percentage_score_stays_in_range_with_matching_level(input in risk_input()) {
        let assessment = evaluate(RiskStrategy::PercentageRisk, &input).unwrap();
        let RiskScore::Percentage(score) = assessment.score else {
            panic!("expected a percentage score");
        };
        prop_assert!(score <= 100);
        prop_assert_eq!(assessment.level, RiskLevel::from_percentage(f64::from(score)));
    }

    #[test]
    fn evaluation_is_deterministic(input in risk_input()) {
        for strategy in [RiskStrategy::FractionalRisk, RiskStrategy::PercentageRisk] {
            prop_assert_eq!(evaluate(strategy, &input), evaluate(strategy, &input));
        }
    }

    #[test]
    fn more_negative_feedback_never_lowers_fractional_score(input in risk_input(), extra in 1u32..5) {
        let mut worse = input.clone();
        worse.negative_feedback_count += extra;

        let before = fraction(evaluate(RiskStrategy::FractionalRisk, &input).unwrap().score);
        let after = fraction(evaluate(RiskStrategy::FractionalRisk, &worse).unwrap().score);
        prop_assert!(after >= before);
    }

    #[test]
    fn more_spend_never_lowers_fractional_score(input in risk_input(), extra in 0.0f64..500_000.0) {
        let mut worse = input.clone();
        worse.spent += extra;

        let before = fraction(evaluate(RiskStrategy::FractionalRisk, &input).unwrap().score);
        let after = fraction(evaluate(RiskStrategy::FractionalRisk, &worse).unwrap().score);
        prop_assert!(after >= before);
    }

    #[test]
    fn later_completion_never_lowers_fractional_score(input in risk_input(), delay in 0i64..400) {
        let finished = input.actual_end_date.unwrap_or(input.today);
        let mut worse = input.clone();
        worse.actual_end_date = Some(finished + chrono::Duration::days(delay));

        let before = fraction(evaluate(RiskStrategy::FractionalRisk, &input).unwrap().score);
        let after = fraction(evaluate(RiskStrategy::FractionalRisk, &worse).unwrap().score);
        prop_assert!(after >= before);
    }
}
