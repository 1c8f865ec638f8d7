//! Rule-based project risk evaluation.
//!
//! # Responsibility
//! - Score a project from budget, spend, schedule and complaint signals.
//! - Expose two named strategies with incompatible scales; callers pick one
//!   explicitly.
//!
//! # Invariants
//! - Evaluation is pure: same input, same assessment.
//! - `FractionalRisk` scores stay within `0.0..=1.0`.
//! - `PercentageRisk` scores stay within `0..=100`.

mod fractional;
mod percentage;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use fractional::evaluate_fractional;
pub use percentage::evaluate_percentage;

const LOW_MAX_PERCENT: f64 = 40.0;
const MEDIUM_MAX_PERCENT: f64 = 70.0;

/// Scoring policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStrategy {
    /// Additive flags for overspend, schedule slip and complaints, capped at 1.0.
    FractionalRisk,
    /// Baseline 50, spend-vs-progress penalties and efficiency bonus, clamped to 0..=100.
    PercentageRisk,
}

impl RiskStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FractionalRisk => "fractional",
            Self::PercentageRisk => "percentage",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fractional" | "fractional_risk" => Some(Self::FractionalRisk),
            "percentage" | "percentage_risk" => Some(Self::PercentageRisk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Maps a `0..=100` score onto levels: `<= 40` Low, `<= 70` Medium, else High.
    pub fn from_percentage(score: f64) -> Self {
        if score <= LOW_MAX_PERCENT {
            Self::Low
        } else if score <= MEDIUM_MAX_PERCENT {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// Score on the scale of the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scale", content = "value", rename_all = "snake_case")]
pub enum RiskScore {
    Fraction(f64),
    Percentage(u8),
}

impl RiskScore {
    /// Score normalized to `0.0..=1.0`, the shape persisted on projects.
    pub fn normalized(self) -> f64 {
        match self {
            Self::Fraction(value) => value,
            Self::Percentage(value) => f64::from(value) / 100.0,
        }
    }
}

/// Scalar signals for one project.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInput {
    pub progress_percent: f64,
    pub budget: f64,
    pub spent: f64,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub negative_feedback_count: u32,
    /// Stand-in for the completion date while the project is unfinished.
    pub today: NaiveDate,
}

impl RiskInput {
    pub fn new(progress_percent: f64, budget: f64, spent: f64, today: NaiveDate) -> Self {
        Self {
            progress_percent,
            budget,
            spent,
            planned_end_date: None,
            actual_end_date: None,
            negative_feedback_count: 0,
            today,
        }
    }

    fn validate(&self) -> Result<(), RiskError> {
        for (field, value) in [("budget", self.budget), ("spent", self.spent)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RiskError::InvalidAmount { field, value });
            }
        }
        if !self.progress_percent.is_finite() || !(0.0..=100.0).contains(&self.progress_percent) {
            return Err(RiskError::InvalidProgress(self.progress_percent));
        }
        Ok(())
    }

    fn spent_ratio(&self) -> Option<f64> {
        (self.budget > 0.0).then(|| self.spent / self.budget)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDetails {
    /// `spent / budget` rounded to two decimals; absent when budget is zero.
    pub spent_ratio: Option<f64>,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub strategy: RiskStrategy,
    pub score: RiskScore,
    pub level: RiskLevel,
    pub details: RiskDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskError {
    /// Percentage scoring divides by the budget, so it must be positive.
    InvalidBudget(f64),
    InvalidAmount { field: &'static str, value: f64 },
    InvalidProgress(f64),
}

impl Display for RiskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBudget(value) => write!(f, "invalid budget: {value} (must be > 0)"),
            Self::InvalidAmount { field, value } => {
                write!(f, "invalid {field}: {value} (must be finite and >= 0)")
            }
            Self::InvalidProgress(value) => {
                write!(f, "invalid progress_percent: {value} (must be within 0..=100)")
            }
        }
    }
}

impl Error for RiskError {}

/// Evaluates `input` with the chosen strategy.
///
/// # Errors
/// - `InvalidAmount` / `InvalidProgress` for out-of-range inputs.
/// - `InvalidBudget` when `PercentageRisk` is asked to score a non-positive budget.
pub fn evaluate(strategy: RiskStrategy, input: &RiskInput) -> Result<RiskAssessment, RiskError> {
    input.validate()?;
    match strategy {
        RiskStrategy::FractionalRisk => Ok(evaluate_fractional(input)),
        RiskStrategy::PercentageRisk => evaluate_percentage(input),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
