mod library_exercise;
mod measurement;
mod profile;
mod routine;
mod workout;

pub use library_exercise::LibraryExercise;
pub use measurement::Measurement;
pub use profile::Profile;
pub use routine::{Routine, RoutineExercise};
pub use workout::{ExerciseSet, Workout, WorkoutExercise};

use serde::{Deserialize, Deserializer};

/// JSON columns come back as `null` rather than missing when unset
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
