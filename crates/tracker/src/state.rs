use chrono::NaiveDate;
use storage::backend::AuthUser;
use storage::models::{LibraryExercise, Measurement, Profile, Routine, Workout};

use crate::draft::{DraftEdit, RoutineDraft, RoutineEdit, WorkoutDraft};
use crate::session::SessionTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Calendar,
    Editor,
    Details,
    Progress,
    Routines,
    RoutineEditor,
    Library,
    Profile,
}

/// The open workout editor
#[derive(Debug, Clone, PartialEq)]
pub struct Editor {
    pub draft: WorkoutDraft,
    pub timer: SessionTimer,
}

/// Everything fetched by one full refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub workouts: Vec<Workout>,
    pub routines: Vec<Routine>,
    pub library: Vec<LibraryExercise>,
    pub profile: Option<Profile>,
    pub measurements: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SignedIn(AuthUser),
    SignedOut,
    Loading,
    Loaded(Snapshot),
    Navigate(View),
    SelectDate(NaiveDate),
    OpenEditor(Editor),
    EditDraft(DraftEdit),
    CloseEditor,
    /// Drop a workout locally ahead of the backend delete
    RemoveWorkout(i64),
    SetFavorites(Vec<String>),
    OpenRoutineEditor(RoutineDraft),
    EditRoutine(RoutineEdit),
    CloseRoutineEditor,
}

/// Client state. Changed only through [`AppState::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub user: Option<AuthUser>,
    pub loading: bool,
    pub view: View,
    pub selected_date: Option<NaiveDate>,
    pub workouts: Vec<Workout>,
    pub routines: Vec<Routine>,
    pub library: Vec<LibraryExercise>,
    pub profile: Option<Profile>,
    pub favorites: Vec<String>,
    pub measurements: Vec<Measurement>,
    pub editor: Option<Editor>,
    pub routine_editor: Option<RoutineDraft>,
}

impl AppState {
    /// Returns false when the action had nothing to act on
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::SignedIn(user) => {
                self.user = Some(user);
            }
            Action::SignedOut => {
                *self = AppState::default();
            }
            Action::Loading => {
                self.loading = true;
            }
            Action::Loaded(snapshot) => {
                self.favorites = snapshot
                    .profile
                    .as_ref()
                    .map(|p| p.favorite_exercises.clone())
                    .unwrap_or_default();
                self.workouts = snapshot.workouts;
                self.routines = snapshot.routines;
                self.library = snapshot.library;
                self.profile = snapshot.profile;
                self.measurements = snapshot.measurements;
                self.loading = false;
            }
            Action::Navigate(view) => {
                self.view = view;
            }
            Action::SelectDate(date) => {
                self.selected_date = Some(date);
                self.view = if self.workout_on(date).is_some() {
                    View::Details
                } else {
                    View::Editor
                };
            }
            Action::OpenEditor(editor) => {
                self.selected_date = Some(editor.draft.date);
                self.editor = Some(editor);
                self.view = View::Editor;
            }
            Action::EditDraft(edit) => {
                return match self.editor.as_mut() {
                    Some(editor) => editor.draft.edit(edit),
                    None => false,
                };
            }
            Action::CloseEditor => {
                self.editor = None;
                self.view = View::Calendar;
            }
            Action::RemoveWorkout(id) => {
                let before = self.workouts.len();
                self.workouts.retain(|w| w.id != id);
                if self.editor_workout_id() == Some(id) {
                    self.editor = None;
                }
                self.view = View::Calendar;
                return self.workouts.len() != before;
            }
            Action::SetFavorites(favorites) => {
                self.favorites = favorites;
            }
            Action::OpenRoutineEditor(draft) => {
                self.routine_editor = Some(draft);
                self.view = View::RoutineEditor;
            }
            Action::EditRoutine(edit) => {
                return match self.routine_editor.as_mut() {
                    Some(draft) => draft.edit(edit),
                    None => false,
                };
            }
            Action::CloseRoutineEditor => {
                self.routine_editor = None;
                self.view = View::Routines;
            }
        }
        true
    }

    pub fn workout(&self, id: i64) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id == id)
    }

    pub fn workout_on(&self, date: NaiveDate) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.date == date)
    }

    pub fn routine(&self, id: i64) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }

    pub fn library_exercise(&self, id: &str) -> Option<&LibraryExercise> {
        self.library.iter().find(|ex| ex.id == id)
    }

    pub fn is_favorite(&self, library_id: &str) -> bool {
        self.favorites.iter().any(|id| id == library_id)
    }

    /// Today's workout, if its session is running
    pub fn active_session(&self, today: NaiveDate) -> Option<&Workout> {
        self.workout_on(today).filter(|w| w.is_in_progress())
    }

    pub fn editor_workout_id(&self) -> Option<i64> {
        self.editor.as_ref().and_then(|e| e.draft.workout_id)
    }
}
