use chrono::NaiveDate;
use rust_decimal::Decimal;
use storage::dto::routine::SaveRoutineRequest;
use storage::models::{
    ExerciseSet, LibraryExercise, Routine, RoutineExercise, Workout, WorkoutExercise,
};

use crate::library;

/// The workout being edited: exercises and sets not yet saved.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDraft {
    /// Stored row this draft writes to, if one exists already
    pub workout_id: Option<i64>,
    pub date: NaiveDate,
    pub exercises: Vec<WorkoutExercise>,
    pub routine_id: Option<i64>,
}

/// One edit to a [`WorkoutDraft`]
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    AddLibraryExercise { exercise: LibraryExercise, millis: i64 },
    AddManualExercise { millis: i64 },
    RenameExercise { id: String, name: String },
    RemoveExercise { id: String },
    AddSet { exercise_id: String },
    RemoveSet { exercise_id: String, index: usize },
    UpdateSet { exercise_id: String, index: usize, update: SetUpdate },
    ApplyRoutine { routine: Routine, library: Vec<LibraryExercise>, millis: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetUpdate {
    Reps(i32),
    Weight(Decimal),
    Completed(bool),
}

impl WorkoutDraft {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            workout_id: None,
            date,
            exercises: Vec::new(),
            routine_id: None,
        }
    }

    pub fn from_workout(workout: &Workout) -> Self {
        Self {
            workout_id: Some(workout.id),
            date: workout.date,
            exercises: workout.exercises.clone(),
            routine_id: workout.routine_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Case-insensitive name match
    pub fn contains_exercise(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.exercises.iter().any(|ex| ex.name.to_lowercase() == name)
    }

    /// Returns false (and changes nothing) when the edit targets something
    /// that does not exist or is not allowed.
    pub fn edit(&mut self, edit: DraftEdit) -> bool {
        match edit {
            DraftEdit::AddLibraryExercise { exercise, millis } => {
                self.add_library_exercise(&exercise, millis)
            }
            DraftEdit::AddManualExercise { millis } => {
                self.add_manual_exercise(millis);
                true
            }
            DraftEdit::RenameExercise { id, name } => self.rename_exercise(&id, name),
            DraftEdit::RemoveExercise { id } => self.remove_exercise(&id),
            DraftEdit::AddSet { exercise_id } => self.add_set(&exercise_id),
            DraftEdit::RemoveSet { exercise_id, index } => self.remove_set(&exercise_id, index),
            DraftEdit::UpdateSet {
                exercise_id,
                index,
                update,
            } => self.update_set(&exercise_id, index, update),
            DraftEdit::ApplyRoutine {
                routine,
                library,
                millis,
            } => self.apply_routine(&routine, &library, millis) > 0,
        }
    }

    /// Prepends the exercise with one empty set; duplicates by name are refused
    pub fn add_library_exercise(&mut self, exercise: &LibraryExercise, millis: i64) -> bool {
        if self.contains_exercise(&exercise.name) {
            return false;
        }

        self.exercises.insert(0, from_library(exercise, millis));
        true
    }

    /// Prepends a blank, renameable exercise and returns its id
    pub fn add_manual_exercise(&mut self, millis: i64) -> String {
        let id = format!("{}{}", WorkoutExercise::MANUAL_PREFIX, millis);
        self.exercises.insert(
            0,
            WorkoutExercise {
                id: id.clone(),
                name: String::new(),
                body_part: None,
                sets: vec![ExerciseSet::default()],
            },
        );
        id
    }

    pub fn rename_exercise(&mut self, id: &str, name: impl Into<String>) -> bool {
        match self.exercise_mut(id) {
            Some(ex) if ex.is_manual() => {
                ex.name = name.into();
                true
            }
            _ => false,
        }
    }

    pub fn remove_exercise(&mut self, id: &str) -> bool {
        let before = self.exercises.len();
        self.exercises.retain(|ex| ex.id != id);
        self.exercises.len() != before
    }

    /// Appends a copy of the last set, unticked
    pub fn add_set(&mut self, exercise_id: &str) -> bool {
        let Some(ex) = self.exercise_mut(exercise_id) else {
            return false;
        };

        let next = ex
            .sets
            .last()
            .map(|last| ExerciseSet {
                completed: false,
                ..*last
            })
            .unwrap_or_default();
        ex.sets.push(next);
        true
    }

    pub fn remove_set(&mut self, exercise_id: &str, index: usize) -> bool {
        match self.exercise_mut(exercise_id) {
            Some(ex) if index < ex.sets.len() => {
                ex.sets.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn update_set(&mut self, exercise_id: &str, index: usize, update: SetUpdate) -> bool {
        let Some(set) = self
            .exercise_mut(exercise_id)
            .and_then(|ex| ex.sets.get_mut(index))
        else {
            return false;
        };

        match update {
            SetUpdate::Reps(reps) => set.reps = reps,
            SetUpdate::Weight(weight) => set.weight = weight,
            SetUpdate::Completed(completed) => set.completed = completed,
        }
        true
    }

    /// Appends the routine's exercises that are not already in the draft.
    ///
    /// The draft is linked to the routine only if something was added.
    pub fn apply_routine(
        &mut self,
        routine: &Routine,
        library: &[LibraryExercise],
        millis: i64,
    ) -> usize {
        let added: Vec<WorkoutExercise> = exercises_from_routine(routine, library, millis)
            .into_iter()
            .filter(|ex| !self.contains_exercise(&ex.name))
            .collect();

        let count = added.len();
        if count > 0 {
            self.exercises.extend(added);
            self.routine_id = Some(routine.id);
        }
        count
    }

    /// Exercises as they should be persisted: unnamed exercises and sets
    /// with nothing entered are dropped.
    pub fn prepared_exercises(&self) -> Vec<WorkoutExercise> {
        self.exercises
            .iter()
            .filter(|ex| !ex.name.trim().is_empty())
            .map(|ex| WorkoutExercise {
                sets: ex.sets.iter().filter(|s| !s.is_blank()).copied().collect(),
                ..ex.clone()
            })
            .collect()
    }

    /// At least one named exercise with at least one entered set
    pub fn has_saveable_data(&self) -> bool {
        self.prepared_exercises().iter().any(|ex| !ex.sets.is_empty())
    }

    fn exercise_mut(&mut self, id: &str) -> Option<&mut WorkoutExercise> {
        self.exercises.iter_mut().find(|ex| ex.id == id)
    }
}

pub fn from_library(exercise: &LibraryExercise, millis: i64) -> WorkoutExercise {
    WorkoutExercise {
        id: format!("lib-{}-{}", exercise.id, millis),
        name: exercise.name.clone(),
        body_part: (!exercise.body_part.is_empty()).then(|| exercise.body_part.clone()),
        sets: vec![ExerciseSet::default()],
    }
}

/// One workout exercise per routine entry, each with a single zero set.
/// A missing body part is taken from the library entry of the same name.
pub fn exercises_from_routine(
    routine: &Routine,
    library: &[LibraryExercise],
    millis: i64,
) -> Vec<WorkoutExercise> {
    routine
        .exercises
        .iter()
        .enumerate()
        .map(|(i, re)| WorkoutExercise {
            id: format!("routine-{}-{}", re.id, millis + i as i64),
            name: re.name.clone(),
            body_part: backfill_body_part(re, library),
            sets: vec![ExerciseSet::default()],
        })
        .collect()
}

fn backfill_body_part(exercise: &RoutineExercise, library: &[LibraryExercise]) -> Option<String> {
    exercise.body_part.clone().or_else(|| {
        library::find_by_name(library, &exercise.name)
            .map(|lib| lib.body_part.clone())
            .filter(|part| !part.is_empty())
    })
}

/// A routine being created, edited or copied
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutineDraft {
    /// `None` until saved for the first time
    pub id: Option<i64>,
    pub name: String,
    pub exercises: Vec<RoutineExercise>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutineEdit {
    Rename(String),
    AddLibraryExercise(LibraryExercise),
    AddManualExercise { name: String, millis: i64 },
    RemoveExercise(String),
    MoveExercise { from: usize, to: usize },
}

impl RoutineDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit_existing(routine: &Routine, library: &[LibraryExercise]) -> Self {
        Self {
            id: Some(routine.id),
            name: routine.name.clone(),
            exercises: routine
                .exercises
                .iter()
                .map(|ex| RoutineExercise {
                    body_part: backfill_body_part(ex, library),
                    ..ex.clone()
                })
                .collect(),
        }
    }

    /// Unsaved duplicate named `"<name> (Copy)"`
    pub fn copy_of(routine: &Routine, library: &[LibraryExercise]) -> Self {
        let mut draft = Self::edit_existing(routine, library);
        draft.id = None;
        draft.name = format!("{} (Copy)", routine.name);
        draft
    }

    pub fn contains_exercise(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.exercises.iter().any(|ex| ex.name.to_lowercase() == name)
    }

    pub fn edit(&mut self, edit: RoutineEdit) -> bool {
        match edit {
            RoutineEdit::Rename(name) => {
                self.name = name;
                true
            }
            RoutineEdit::AddLibraryExercise(exercise) => {
                if self.contains_exercise(&exercise.name) {
                    return false;
                }
                self.exercises.push(RoutineExercise {
                    id: exercise.id.clone(),
                    name: exercise.name.clone(),
                    body_part: (!exercise.body_part.is_empty()).then_some(exercise.body_part),
                });
                true
            }
            RoutineEdit::AddManualExercise { name, millis } => {
                let name = name.trim();
                if name.is_empty() || self.contains_exercise(name) {
                    return false;
                }
                self.exercises.push(RoutineExercise {
                    id: format!("{}{}", WorkoutExercise::MANUAL_PREFIX, millis),
                    name: name.to_string(),
                    body_part: None,
                });
                true
            }
            RoutineEdit::RemoveExercise(id) => {
                let before = self.exercises.len();
                self.exercises.retain(|ex| ex.id != id);
                self.exercises.len() != before
            }
            RoutineEdit::MoveExercise { from, to } => {
                if from >= self.exercises.len() || to >= self.exercises.len() {
                    return false;
                }
                let exercise = self.exercises.remove(from);
                self.exercises.insert(to, exercise);
                true
            }
        }
    }

    pub fn to_request(&self) -> SaveRoutineRequest {
        SaveRoutineRequest {
            name: self.name.clone(),
            exercises: self.exercises.clone(),
        }
    }
}
