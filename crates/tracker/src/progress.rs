use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use storage::models::{Workout, WorkoutExercise};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Week,
    #[default]
    Month,
    Year,
    All,
}

impl TimeRange {
    /// Workouts must fall strictly after this date
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Week => today.checked_sub_days(Days::new(7)),
            Self::Month => today.checked_sub_months(Months::new(1)),
            Self::Year => today.checked_sub_months(Months::new(12)),
            Self::All => None,
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(format!("unknown time range '{}'", other)),
        }
    }
}

pub fn in_range<'a>(workouts: &'a [Workout], range: TimeRange, today: NaiveDate) -> Vec<&'a Workout> {
    match range.cutoff(today) {
        Some(cutoff) => workouts.iter().filter(|w| w.date > cutoff).collect(),
        None => workouts.iter().collect(),
    }
}

/// Every exercise name that appears, sorted and unique
pub fn exercise_names(workouts: &[&Workout]) -> Vec<String> {
    workouts
        .iter()
        .flat_map(|w| w.exercises.iter().map(|ex| ex.name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn exercise_volume(exercise: &WorkoutExercise) -> Decimal {
    exercise.sets.iter().map(|s| s.volume()).sum()
}

/// Heaviest set, or zero for an exercise without sets
pub fn max_weight(exercise: &WorkoutExercise) -> Decimal {
    exercise
        .sets
        .iter()
        .map(|s| s.weight)
        .max()
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExercisePoint {
    pub date: NaiveDate,
    pub max_weight: Decimal,
    pub volume: Decimal,
}

/// Per-day max weight and volume of one exercise, oldest first
pub fn exercise_progress(workouts: &[&Workout], name: &str) -> Vec<ExercisePoint> {
    let mut points: Vec<ExercisePoint> = workouts
        .iter()
        .filter_map(|w| {
            w.exercises
                .iter()
                .find(|ex| ex.name == name)
                .map(|ex| ExercisePoint {
                    date: w.date,
                    max_weight: max_weight(ex),
                    volume: exercise_volume(ex),
                })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutPoint {
    pub date: NaiveDate,
    pub volume: Decimal,
    pub sets: usize,
}

/// Total volume and set count of each workout, oldest first
pub fn workout_totals(workouts: &[&Workout]) -> Vec<WorkoutPoint> {
    let mut points: Vec<WorkoutPoint> = workouts
        .iter()
        .map(|w| WorkoutPoint {
            date: w.date,
            volume: w.exercises.iter().map(exercise_volume).sum(),
            sets: w.exercises.iter().map(|ex| ex.sets.len()).sum(),
        })
        .collect();

    points.sort_by_key(|p| p.date);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Legs,
    Abs,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 7] = [
        Self::Chest,
        Self::Back,
        Self::Shoulders,
        Self::Biceps,
        Self::Triceps,
        Self::Legs,
        Self::Abs,
    ];

    /// `None` for body parts outside the tracked groups
    pub fn from_body_part(body_part: &str) -> Option<Self> {
        match body_part.to_lowercase().as_str() {
            "chest" => Some(Self::Chest),
            "back" | "lats" | "middle back" | "lower back" => Some(Self::Back),
            "shoulders" | "traps" => Some(Self::Shoulders),
            "upper arms" | "lower arms" | "biceps" | "forearms" => Some(Self::Biceps),
            "triceps" => Some(Self::Triceps),
            "upper legs" | "lower legs" | "quadriceps" | "hamstrings" | "glutes" | "calves"
            | "abductors" | "adductors" => Some(Self::Legs),
            "waist" | "abdominals" => Some(Self::Abs),
            _ => None,
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Chest => "Chest",
            Self::Back => "Back",
            Self::Shoulders => "Shoulders",
            Self::Biceps => "Biceps",
            Self::Triceps => "Triceps",
            Self::Legs => "Legs",
            Self::Abs => "Abs",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuscleDistribution {
    /// One entry per group, in [`MuscleGroup::ALL`] order
    pub volumes: Vec<(MuscleGroup, Decimal)>,
}

impl MuscleDistribution {
    pub fn max(&self) -> Decimal {
        self.volumes
            .iter()
            .map(|(_, v)| *v)
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn has_data(&self) -> bool {
        self.max() > Decimal::ZERO
    }

    pub fn volume(&self, group: MuscleGroup) -> Decimal {
        self.volumes
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, v)| *v)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Volume per major muscle group; exercises without a known body part are left out
pub fn muscle_distribution(workouts: &[&Workout]) -> MuscleDistribution {
    let mut volumes: Vec<(MuscleGroup, Decimal)> =
        MuscleGroup::ALL.iter().map(|g| (*g, Decimal::ZERO)).collect();

    for exercise in workouts.iter().flat_map(|w| &w.exercises) {
        let Some(group) = exercise
            .body_part
            .as_deref()
            .and_then(MuscleGroup::from_body_part)
        else {
            continue;
        };

        if let Some((_, total)) = volumes.iter_mut().find(|(g, _)| *g == group) {
            *total += exercise_volume(exercise);
        }
    }

    MuscleDistribution { volumes }
}
