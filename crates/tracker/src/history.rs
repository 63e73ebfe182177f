use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use storage::models::{Routine, Workout, WorkoutExercise};

use crate::progress::{exercise_volume, max_weight};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup<'a> {
    pub year: i32,
    pub month: u32,
    pub workouts: Vec<&'a Workout>,
}

impl MonthGroup<'_> {
    /// e.g. "May 2024"
    pub fn title(&self) -> String {
        let name = MONTH_NAMES
            .get(self.month as usize - 1)
            .copied()
            .unwrap_or("?");
        format!("{} {}", name, self.year)
    }

    pub fn total_sets(&self) -> usize {
        self.workouts.iter().map(|w| workout_stats(w).sets).sum()
    }
}

/// Newest month first, newest workout first within a month
pub fn group_by_month(workouts: &[Workout]) -> Vec<MonthGroup<'_>> {
    let mut sorted: Vec<&Workout> = workouts.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut groups: Vec<MonthGroup<'_>> = Vec::new();
    for workout in sorted {
        let (year, month) = (workout.date.year(), workout.date.month());
        match groups.last_mut() {
            Some(group) if group.year == year && group.month == month => {
                group.workouts.push(workout)
            }
            _ => groups.push(MonthGroup {
                year,
                month,
                workouts: vec![workout],
            }),
        }
    }
    groups
}

/// The `n` most recent workouts
pub fn recent(workouts: &[Workout], n: usize) -> Vec<&Workout> {
    let mut sorted: Vec<&Workout> = workouts.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(n);
    sorted
}

pub fn workout_on(workouts: &[Workout], date: NaiveDate) -> Option<&Workout> {
    workouts.iter().find(|w| w.date == date)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WorkoutStats {
    pub sets: usize,
    pub volume: Decimal,
    /// Exercises with at least one set
    pub exercises: usize,
}

pub fn workout_stats(workout: &Workout) -> WorkoutStats {
    workout
        .exercises
        .iter()
        .filter(|ex| !ex.sets.is_empty())
        .fold(WorkoutStats::default(), |acc, ex| WorkoutStats {
            sets: acc.sets + ex.sets.len(),
            volume: acc.volume + exercise_volume(ex),
            exercises: acc.exercises + 1,
        })
}

/// Most recent earlier workout containing an exercise of that name
/// (case-insensitive)
pub fn previous_exercise<'a>(
    workouts: &'a [Workout],
    name: &str,
    before: NaiveDate,
) -> Option<(&'a Workout, &'a WorkoutExercise)> {
    if name.trim().is_empty() {
        return None;
    }
    let name = name.to_lowercase();

    let mut earlier: Vec<&Workout> = workouts.iter().filter(|w| w.date < before).collect();
    earlier.sort_by(|a, b| b.date.cmp(&a.date));

    earlier.into_iter().find_map(|w| {
        w.exercises
            .iter()
            .find(|ex| ex.name.to_lowercase() == name)
            .map(|ex| (w, ex))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub previous_date: NaiveDate,
    pub max_weight: Decimal,
    pub previous_max_weight: Decimal,
    pub volume: Decimal,
    pub previous_volume: Decimal,
}

impl Comparison {
    pub fn max_weight_change(&self) -> Decimal {
        self.max_weight - self.previous_max_weight
    }

    pub fn volume_change(&self) -> Decimal {
        self.volume - self.previous_volume
    }
}

/// How an exercise in `workout` compares with its last earlier appearance
pub fn compare_with_previous(
    workouts: &[Workout],
    workout: &Workout,
    exercise: &WorkoutExercise,
) -> Option<Comparison> {
    let (previous_workout, previous) = previous_exercise(workouts, &exercise.name, workout.date)?;

    Some(Comparison {
        previous_date: previous_workout.date,
        max_weight: max_weight(exercise),
        previous_max_weight: max_weight(previous),
        volume: exercise_volume(exercise),
        previous_volume: exercise_volume(previous),
    })
}

/// Name of the routine a workout was started from
pub fn routine_name<'a>(workout: &Workout, routines: &'a [Routine]) -> Option<&'a str> {
    let id = workout.routine_id?;
    routines
        .iter()
        .find(|r| r.id == id)
        .map(|r| r.name.as_str())
}

/// `"1h 5m"`, `"42m"`; `None` for no recorded duration
pub fn format_duration(seconds: Option<i64>) -> Option<String> {
    let seconds = seconds.filter(|s| *s > 0)?;
    let (hours, minutes) = (seconds / 3600, (seconds % 3600) / 60);

    Some(if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    })
}

/// Stopwatch display: `"H:MM:SS"` past an hour, `"MM:SS"` below
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::models::ExerciseSet;
    use uuid::Uuid;

    fn workout(id: i64, y: i32, m: u32, d: u32, exercises: Vec<WorkoutExercise>) -> Workout {
        Workout {
            id,
            user_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            start_time: None,
            end_time: None,
            duration: None,
            routine_id: None,
            exercises,
        }
    }

    fn exercise(name: &str, sets: &[(i32, i64)]) -> WorkoutExercise {
        WorkoutExercise {
            id: format!("manual-{}", name),
            name: name.to_string(),
            body_part: None,
            sets: sets
                .iter()
                .map(|(reps, weight)| ExerciseSet {
                    reps: *reps,
                    weight: Decimal::from(*weight),
                    completed: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_group_by_month_newest_first() {
        let workouts = vec![
            workout(1, 2024, 4, 28, vec![exercise("Squat", &[(5, 100)])]),
            workout(2, 2024, 5, 2, vec![exercise("Squat", &[(5, 105), (5, 105)])]),
            workout(3, 2024, 5, 9, vec![]),
            workout(4, 2023, 5, 9, vec![]),
        ];

        let groups = group_by_month(&workouts);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].title(), "May 2024");
        assert_eq!(groups[0].workouts[0].id, 3);
        assert_eq!(groups[0].total_sets(), 2);
        assert_eq!(groups[1].title(), "April 2024");
        assert_eq!(groups[2].title(), "May 2023");

        let ids: Vec<i64> = recent(&workouts, 2).iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_stats_skip_exercises_without_sets() {
        let w = workout(
            1,
            2024,
            5,
            1,
            vec![exercise("Squat", &[(5, 100), (3, 120)]), exercise("Dips", &[])],
        );
        let stats = workout_stats(&w);
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.volume, Decimal::from(860));
        assert_eq!(stats.exercises, 1);
    }

    #[test]
    fn test_previous_exercise_is_most_recent_earlier() {
        let workouts = vec![
            workout(3, 2024, 5, 10, vec![exercise("Squat", &[(5, 120)])]),
            workout(2, 2024, 5, 5, vec![exercise("squat", &[(5, 110)])]),
            workout(1, 2024, 5, 1, vec![exercise("Squat", &[(5, 100)])]),
        ];

        let before = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let (w, ex) = previous_exercise(&workouts, "SQUAT", before).unwrap();
        assert_eq!(w.id, 2);
        assert_eq!(ex.sets[0].weight, Decimal::from(110));

        assert!(previous_exercise(&workouts, "Bench", before).is_none());
        assert!(previous_exercise(&workouts, "", before).is_none());

        let cmp = compare_with_previous(&workouts, &workouts[0], &workouts[0].exercises[0]).unwrap();
        assert_eq!(cmp.max_weight_change(), Decimal::from(10));
        assert_eq!(cmp.volume_change(), Decimal::from(50));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_duration(Some(3900)).as_deref(), Some("1h 5m"));
        assert_eq!(format_duration(Some(2520)).as_deref(), Some("42m"));
        assert_eq!(format_duration(Some(0)), None);
        assert_eq!(format_duration(None), None);

        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(3725), "1:02:05");
    }
}
