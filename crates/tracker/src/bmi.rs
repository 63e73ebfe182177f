use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use storage::models::{Measurement, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: Decimal) -> Self {
        if bmi < Decimal::new(185, 1) {
            Self::Underweight
        } else if bmi < Decimal::from(25) {
            Self::Normal
        } else if bmi < Decimal::from(30) {
            Self::Overweight
        } else {
            Self::Obese
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        })
    }
}

/// weight (kg) / height (m)²; `None` unless both are positive
pub fn bmi(weight: Decimal, height_cm: Decimal) -> Option<Decimal> {
    if weight <= Decimal::ZERO || height_cm <= Decimal::ZERO {
        return None;
    }

    let meters = height_cm / Decimal::ONE_HUNDRED;
    weight.checked_div(meters * meters)
}

/// Position on a 0–100 gauge split into four equal bands:
/// 15–18.5, 18.5–25, 25–30 and 30–40.
pub fn gauge_position(bmi: Decimal) -> Decimal {
    let band = |low: Decimal, high: Decimal, offset: i64| {
        Decimal::from(offset) + (bmi - low) / (high - low) * Decimal::from(25)
    };

    let position = match BmiCategory::from_bmi(bmi) {
        BmiCategory::Underweight => band(Decimal::from(15), Decimal::new(185, 1), 0),
        BmiCategory::Normal => band(Decimal::new(185, 1), Decimal::from(25), 25),
        BmiCategory::Overweight => band(Decimal::from(25), Decimal::from(30), 50),
        BmiCategory::Obese => band(Decimal::from(30), Decimal::from(40), 75),
    };

    position.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BmiReport {
    /// Rounded to one decimal
    pub value: Decimal,
    pub category: BmiCategory,
    pub gauge: Decimal,
}

pub fn report(profile: &Profile) -> Option<BmiReport> {
    let value = bmi(profile.weight?, profile.height?)?;

    Some(BmiReport {
        value: value.round_dp(1),
        category: BmiCategory::from_bmi(value),
        gauge: gauge_position(value).round_dp(1),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: Decimal,
}

/// One point per day, keeping that day's latest sample, oldest first
pub fn weight_series(measurements: &[Measurement]) -> Vec<WeightPoint> {
    let mut latest: BTreeMap<NaiveDate, &Measurement> = BTreeMap::new();

    for m in measurements {
        let day = m.created_at.date_naive();
        match latest.get(&day) {
            Some(kept) if kept.created_at > m.created_at => {}
            _ => {
                latest.insert(day, m);
            }
        }
    }

    latest
        .into_iter()
        .map(|(date, m)| WeightPoint {
            date,
            weight: m.weight,
        })
        .collect()
}
