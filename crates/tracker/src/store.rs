use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use storage::backend::{AuthSession, Backend, OAuthProvider, SessionStore, SignUpOutcome};
use storage::dto::auth::{SignInRequest, SignUpRequest};
use storage::dto::measurement::NewMeasurementRequest;
use storage::dto::profile::UpdateProfileRequest;
use storage::dto::workout::{BeginSessionUpdate, FinishWorkoutRequest, WorkoutPayload};
use storage::error::StorageError;
use storage::models::{LibraryExercise, Measurement, Profile, Routine, Workout, WorkoutExercise};
use storage::repository::library::LibraryRepository;
use storage::repository::measurement::MeasurementRepository;
use storage::repository::profile::ProfileRepository;
use storage::repository::routine::RoutineRepository;
use storage::repository::workout::WorkoutRepository;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::clock::{Clock, SystemClock};
use crate::draft::{self, DraftEdit, RoutineDraft, RoutineEdit, SetUpdate, WorkoutDraft};
use crate::error::{Result, TrackerError};
use crate::history;
use crate::library;
use crate::session::{self, SessionPlan, SessionTimer, TickerExit};
use crate::state::{Action, AppState, Editor, Snapshot, View};

pub const DEFAULT_IMAGE_BUCKET: &str = "images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineStart {
    Started,
    /// Today already has a workout; call again with `append = true` to add
    /// the routine's exercises to it
    NeedsConfirmation,
}

/// The application service: owns the state and performs every operation
/// against the backend.
///
/// Each mutation is followed by a full refresh of the user's data.
pub struct Store<C: Clock = SystemClock> {
    backend: Backend,
    sessions: Arc<dyn SessionStore>,
    clock: C,
    image_bucket: String,
    state: AppState,
    last_millis: i64,
}

impl<C: Clock> Store<C> {
    /// The backend refreshes expired tokens by this store's clock and saves
    /// rotated sessions to `sessions`.
    pub fn new(backend: Backend, sessions: Arc<dyn SessionStore>, clock: C) -> Self
    where
        C: Clone + 'static,
    {
        let token_clock = clock.clone();
        backend.keep_session(sessions.clone(), move || token_clock.now());

        Self {
            backend,
            sessions,
            clock,
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            state: AppState::default(),
            last_millis: 0,
        }
    }

    pub fn with_image_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.image_bucket = bucket.into();
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn navigate(&mut self, view: View) {
        self.dispatch(Action::Navigate(view));
    }

    fn dispatch(&mut self, action: Action) -> bool {
        self.state.apply(action)
    }

    fn user_id(&self) -> Result<Uuid> {
        self.backend.user_id().map_err(|_| TrackerError::NotSignedIn)
    }

    /// Millisecond stamps for synthesized ids, unique within this store
    fn reserve_millis(&mut self, count: usize) -> i64 {
        let now = self.clock.now().timestamp_millis();
        let first = now.max(self.last_millis + 1);
        self.last_millis = first + count.max(1) as i64 - 1;
        first
    }

    // --- auth ---

    /// Sign back in from the stored session, if there is one
    pub async fn restore_session(&mut self) -> Result<bool> {
        let restored = self
            .backend
            .auth()
            .restore(self.sessions.as_ref(), self.clock.now())
            .await?;

        match restored {
            Some(session) => {
                self.dispatch(Action::SignedIn(session.user));
                self.load().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn sign_in(&mut self, req: &SignInRequest) -> Result<()> {
        req.validate()?;

        let session = match self
            .backend
            .auth()
            .sign_in_with_password(&req.email, &req.password)
            .await
        {
            Ok(session) => session,
            Err(e) if e.is_email_not_confirmed() => {
                warn!("Sign-in refused, email not confirmed");
                return Err(TrackerError::EmailNotConfirmed(req.email.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        self.signed_in(session).await
    }

    pub async fn sign_up(&mut self, req: &SignUpRequest) -> Result<SignUpOutcome> {
        req.validate()?;

        let outcome = self.backend.auth().sign_up(&req.email, &req.password).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.signed_in(session.clone()).await?;
        }
        Ok(outcome)
    }

    pub async fn sign_in_anonymously(&mut self) -> Result<()> {
        let session = self.backend.auth().sign_in_anonymously().await?;
        self.signed_in(session).await
    }

    pub fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<String> {
        Ok(self.backend.auth().authorize_url(provider, redirect_to)?)
    }

    /// Finish a federated sign-in from the URL the browser was sent back to
    pub async fn complete_oauth(&mut self, redirect_url: &str) -> Result<()> {
        let session = self.backend.auth().session_from_redirect(redirect_url).await?;
        self.signed_in(session).await
    }

    async fn signed_in(&mut self, session: AuthSession) -> Result<()> {
        self.sessions.save(&session).await?;
        self.dispatch(Action::SignedIn(session.user));
        self.load().await
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        self.backend.auth().sign_out().await?;
        self.sessions.clear().await?;
        self.dispatch(Action::SignedOut);
        info!("Signed out");
        Ok(())
    }

    // --- loading ---

    /// Fetch everything, then reopen today's session if one is running
    pub async fn load(&mut self) -> Result<()> {
        self.refresh().await?;

        let today = self.today();
        if self.state.editor.is_none() && self.state.active_session(today).is_some() {
            info!("Resuming the session in progress");
            self.open_editor(today).await?;
        }
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        self.dispatch(Action::Loading);

        let snapshot = self.fetch_snapshot(user_id).await.inspect_err(|e| {
            error!("Failed to load data: {}", e);
        })?;
        self.dispatch(Action::Loaded(snapshot));
        Ok(())
    }

    async fn fetch_snapshot(&self, user_id: Uuid) -> Result<Snapshot> {
        let workouts = WorkoutRepository::new(&self.backend)
            .list_for_user(user_id)
            .await?;
        let routines = RoutineRepository::new(&self.backend)
            .list_for_user(user_id)
            .await?;
        let library = LibraryRepository::new(&self.backend)
            .list()
            .await
            .unwrap_or_else(|e| {
                warn!("Exercise library unavailable: {}", e);
                Vec::new()
            });
        let profile = ProfileRepository::new(&self.backend).find(user_id).await?;
        let measurements = MeasurementRepository::new(&self.backend)
            .list_for_user(user_id)
            .await?;

        Ok(Snapshot {
            workouts,
            routines,
            library,
            profile,
            measurements,
        })
    }

    // --- workout editor ---

    /// Open the editor on a date, starting a session when it is today
    pub async fn open_editor(&mut self, date: NaiveDate) -> Result<()> {
        let draft = match self.state.workout_on(date) {
            Some(workout) => WorkoutDraft::from_workout(workout),
            None => WorkoutDraft::new(date),
        };
        self.open_editor_with(draft).await
    }

    pub async fn start_or_continue_today(&mut self) -> Result<()> {
        self.open_editor(self.today()).await
    }

    /// Details for a logged date, the editor for an empty one
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<()> {
        if self.state.workout_on(date).is_some() {
            self.dispatch(Action::SelectDate(date));
            Ok(())
        } else {
            self.open_editor(date).await
        }
    }

    async fn open_editor_with(&mut self, mut draft: WorkoutDraft) -> Result<()> {
        let now = self.clock.now();
        let is_today = draft.date == self.today();
        let stored = draft
            .workout_id
            .and_then(|id| self.state.workout(id))
            .cloned();

        let plan = SessionPlan::for_workout(stored.as_ref(), is_today, now);
        if let SessionPlan::Begin { start } = plan {
            draft.workout_id = Some(self.mark_started(&draft, start).await?);
        }

        let timer = SessionTimer::from_plan(plan, now);
        self.dispatch(Action::OpenEditor(Editor { draft, timer }));
        Ok(())
    }

    /// Store the session start on the workout row, creating the row if needed.
    ///
    /// The draft's exercises go with it, so a routine started here is on the
    /// row even if the editor is never saved.
    async fn mark_started(&mut self, draft: &WorkoutDraft, start: DateTime<Utc>) -> Result<i64> {
        let user_id = self.user_id()?;
        let repo = WorkoutRepository::new(&self.backend);
        let mut exercises = draft.prepared_exercises();

        let existing = match draft.workout_id {
            Some(id) => Some(id),
            None => repo.find_by_date(user_id, draft.date).await?.map(|stored| {
                let mut merged = stored.exercises;
                merged.append(&mut exercises);
                exercises = merged;
                stored.id
            }),
        };

        let id = match existing {
            Some(id) => {
                repo.begin_session(id, &BeginSessionUpdate::new(start, exercises))
                    .await?
                    .id
            }
            None => {
                let payload = WorkoutPayload {
                    user_id,
                    date: draft.date,
                    exercises,
                    start_time: Some(start),
                    end_time: None,
                    duration: None,
                    routine_id: draft.routine_id,
                };
                repo.create(&payload).await?.id
            }
        };

        info!("Workout session started at {}", start);
        self.refresh().await?;
        Ok(id)
    }

    fn editor(&self) -> Result<&Editor> {
        self.state
            .editor
            .as_ref()
            .ok_or_else(|| TrackerError::rejected("No workout is open"))
    }

    fn edit(&mut self, edit: DraftEdit, refused: &str) -> Result<()> {
        self.editor()?;
        if self.dispatch(Action::EditDraft(edit)) {
            Ok(())
        } else {
            Err(TrackerError::rejected(refused))
        }
    }

    /// Seconds on the editor's clock right now
    pub fn elapsed(&self) -> Option<i64> {
        let now = self.clock.now();
        self.state.editor.as_ref().map(|e| e.timer.elapsed(now))
    }

    /// Add a catalog exercise to the open workout
    pub fn add_library_exercise(&mut self, library_id: &str) -> Result<()> {
        let exercise = self.find_library_exercise(library_id)?;
        if self.editor()?.draft.contains_exercise(&exercise.name) {
            warn!("{} is already in this workout", exercise.name);
            return Err(duplicate(&exercise.name));
        }

        let millis = self.reserve_millis(1);
        self.edit(
            DraftEdit::AddLibraryExercise { exercise, millis },
            "Exercise could not be added",
        )
    }

    /// Add a catalog exercise to today's workout, opening it if needed
    pub async fn log_library_exercise(&mut self, library_id: &str) -> Result<()> {
        let exercise = self.find_library_exercise(library_id)?;
        let today = self.today();
        let millis = self.reserve_millis(1);

        let editing_today = self
            .state
            .editor
            .as_ref()
            .is_some_and(|e| e.draft.date == today);

        if editing_today {
            if self.editor()?.draft.contains_exercise(&exercise.name) {
                warn!("{} is already in today's workout", exercise.name);
                return Err(duplicate(&exercise.name));
            }
            self.edit(
                DraftEdit::AddLibraryExercise { exercise, millis },
                "Exercise could not be added",
            )?;
            self.dispatch(Action::Navigate(View::Editor));
            return Ok(());
        }

        let mut draft = match self.state.workout_on(today) {
            Some(workout) => WorkoutDraft::from_workout(workout),
            None => WorkoutDraft::new(today),
        };
        if !draft.add_library_exercise(&exercise, millis) {
            warn!("{} is already in today's workout", exercise.name);
            return Err(duplicate(&exercise.name));
        }

        self.open_editor_with(draft).await
    }

    /// Returns the id of the new, unnamed exercise
    pub fn add_manual_exercise(&mut self) -> Result<String> {
        self.editor()?;
        let millis = self.reserve_millis(1);
        self.edit(DraftEdit::AddManualExercise { millis }, "Exercise could not be added")?;
        Ok(format!("{}{}", WorkoutExercise::MANUAL_PREFIX, millis))
    }

    pub fn rename_exercise(&mut self, exercise_id: &str, name: &str) -> Result<()> {
        self.edit(
            DraftEdit::RenameExercise {
                id: exercise_id.to_string(),
                name: name.to_string(),
            },
            "Only exercises added by hand can be renamed",
        )
    }

    pub fn remove_exercise(&mut self, exercise_id: &str) -> Result<()> {
        self.edit(
            DraftEdit::RemoveExercise {
                id: exercise_id.to_string(),
            },
            "No such exercise in this workout",
        )
    }

    pub fn add_set(&mut self, exercise_id: &str) -> Result<()> {
        self.edit(
            DraftEdit::AddSet {
                exercise_id: exercise_id.to_string(),
            },
            "No such exercise in this workout",
        )
    }

    pub fn remove_set(&mut self, exercise_id: &str, index: usize) -> Result<()> {
        self.edit(
            DraftEdit::RemoveSet {
                exercise_id: exercise_id.to_string(),
                index,
            },
            "No such set",
        )
    }

    pub fn update_set(&mut self, exercise_id: &str, index: usize, update: SetUpdate) -> Result<()> {
        self.edit(
            DraftEdit::UpdateSet {
                exercise_id: exercise_id.to_string(),
                index,
                update,
            },
            "No such set",
        )
    }

    /// Append a routine's missing exercises to the open workout
    pub fn apply_routine(&mut self, routine_id: i64) -> Result<usize> {
        let routine = self.find_routine(routine_id)?;
        let before = self.editor()?.draft.exercises.len();
        let millis = self.reserve_millis(routine.exercises.len());

        self.dispatch(Action::EditDraft(DraftEdit::ApplyRoutine {
            routine,
            library: self.state.library.clone(),
            millis,
        }));

        Ok(self.editor()?.draft.exercises.len() - before)
    }

    /// What was done last time for an exercise in the open workout
    pub fn previous_performance(&self, name: &str) -> Option<&WorkoutExercise> {
        let date = self.state.editor.as_ref()?.draft.date;
        history::previous_exercise(&self.state.workouts, name, date).map(|(_, ex)| ex)
    }

    /// Save without finishing; the session keeps running and resumes later
    pub async fn save_and_exit(&mut self) -> Result<Workout> {
        let editor = self.editor()?.clone();
        if !editor.draft.has_saveable_data() {
            warn!("Nothing to save");
            return Err(TrackerError::rejected(
                "Add at least one exercise with one set before saving",
            ));
        }

        let elapsed = editor.timer.elapsed(self.clock.now());
        let (start_time, end_time) = match editor.timer.start_time() {
            Some(start) => (Some(start), None),
            None => self.stored_times(&editor.draft),
        };

        let saved = self
            .persist(&editor.draft, start_time, end_time, Some(elapsed))
            .await?;
        info!("Saved workout {} ({}s)", saved.id, elapsed);

        self.dispatch(Action::CloseEditor);
        self.refresh().await?;
        Ok(saved)
    }

    /// Save and close a session that ran past the limit
    pub async fn auto_finish(&mut self, elapsed: i64) -> Result<Workout> {
        let editor = self.editor()?.clone();
        let now = self.clock.now();

        let saved = self
            .persist(&editor.draft, editor.timer.start_time(), Some(now), Some(elapsed))
            .await?;
        warn!(
            "Workout {} finished automatically after {}s",
            saved.id, elapsed
        );

        self.dispatch(Action::CloseEditor);
        self.refresh().await?;
        Ok(saved)
    }

    /// Leave the editor without saving.
    ///
    /// An empty editor also ends the session; one with exercises keeps it
    /// running so it resumes on the next launch.
    pub async fn cancel_editor(&mut self) -> Result<()> {
        let Some(editor) = self.state.editor.clone() else {
            return Ok(());
        };
        self.dispatch(Action::CloseEditor);

        if !editor.draft.is_empty() || !editor.timer.is_running() {
            return Ok(());
        }
        let Some(id) = editor.draft.workout_id else {
            return Ok(());
        };

        self.clear_marker(id).await?;
        self.refresh().await
    }

    async fn clear_marker(&self, id: i64) -> Result<()> {
        let repo = WorkoutRepository::new(&self.backend);
        let has_exercises = self
            .state
            .workout(id)
            .is_some_and(|w| !w.exercises.is_empty());

        if has_exercises {
            repo.set_start_time(id, None).await?;
            info!("Session on workout {} cleared", id);
        } else {
            repo.delete(id).await?;
            info!("Empty workout {} discarded", id);
        }
        Ok(())
    }

    /// Tick the open editor's timer until it expires or `shutdown` resolves;
    /// an expired session is saved and closed.
    pub async fn watch_session<S, F>(&mut self, shutdown: S, on_tick: F) -> Result<TickerExit>
    where
        S: Future<Output = ()>,
        F: FnMut(i64),
    {
        let mut timer = self.editor()?.timer.clone();
        let exit = session::run_ticker(&mut timer, &self.clock, shutdown, on_tick).await;

        if let TickerExit::Expired(elapsed) = exit {
            self.auto_finish(elapsed).await?;
        }
        Ok(exit)
    }

    fn stored_times(&self, draft: &WorkoutDraft) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        draft
            .workout_id
            .and_then(|id| self.state.workout(id))
            .map(|w| (w.start_time, w.end_time))
            .unwrap_or((None, None))
    }

    /// Write the draft to its row; one workout per date, so an unknown row
    /// is looked up by date before inserting.
    async fn persist(
        &self,
        draft: &WorkoutDraft,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        duration: Option<i64>,
    ) -> Result<Workout> {
        let user_id = self.user_id()?;
        let payload = WorkoutPayload {
            user_id,
            date: draft.date,
            exercises: draft.prepared_exercises(),
            start_time,
            end_time,
            duration,
            routine_id: draft.routine_id,
        };

        let repo = WorkoutRepository::new(&self.backend);
        let target = match draft.workout_id {
            Some(id) => Some(id),
            None => repo.find_by_date(user_id, draft.date).await?.map(|w| w.id),
        };

        let result = match target {
            Some(id) => repo.update(id, &payload).await,
            None => repo.create(&payload).await,
        };

        result.map_err(|e| {
            error!("Failed to save workout for {}: {}", draft.date, e);
            e.into()
        })
    }

    // --- calendar ---

    /// Close a session from outside the editor
    pub async fn finish_workout(&mut self, id: i64) -> Result<Workout> {
        let workout = self
            .state
            .workout(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("Workout {}", id)))?;

        let now = self.clock.now();
        let duration = match workout.start_time {
            Some(start) => (now - start).num_seconds().max(0),
            None => workout.duration.unwrap_or(0),
        };

        let finished = WorkoutRepository::new(&self.backend)
            .finish(
                id,
                &FinishWorkoutRequest {
                    end_time: now,
                    duration,
                },
            )
            .await?;
        info!("Workout {} finished ({}s)", id, duration);

        if self.state.editor_workout_id() == Some(id) {
            self.dispatch(Action::CloseEditor);
        }
        self.refresh().await?;
        Ok(finished)
    }

    /// Removed locally first; a failed delete restores it by refetching
    pub async fn delete_workout(&mut self, id: i64) -> Result<()> {
        if self.state.workout(id).is_none() {
            return Err(TrackerError::NotFound(format!("Workout {}", id)));
        }
        self.dispatch(Action::RemoveWorkout(id));

        let result = WorkoutRepository::new(&self.backend).delete(id).await;
        if let Err(e) = result {
            error!("Failed to delete workout {}: {}", id, e);
            if let Err(refetch) = self.refresh().await {
                warn!("Refetch after failed delete also failed: {}", refetch);
            }
            return Err(e.into());
        }

        info!("Workout {} deleted", id);
        self.refresh().await
    }

    // --- routines ---

    /// Open today's workout prefilled from a routine
    pub async fn start_routine(&mut self, routine_id: i64, append: bool) -> Result<RoutineStart> {
        let routine = self.find_routine(routine_id)?;
        let today = self.today();
        let millis = self.reserve_millis(routine.exercises.len());
        let exercises = draft::exercises_from_routine(&routine, &self.state.library, millis);

        let draft = match self.state.workout_on(today) {
            Some(_) if !append => return Ok(RoutineStart::NeedsConfirmation),
            Some(existing) => {
                let mut draft = WorkoutDraft::from_workout(existing);
                draft.exercises.extend(exercises);
                draft
            }
            None => WorkoutDraft {
                exercises,
                routine_id: Some(routine.id),
                ..WorkoutDraft::new(today)
            },
        };

        info!("Starting routine {}", routine.name);
        self.open_editor_with(draft).await?;
        Ok(RoutineStart::Started)
    }

    pub fn new_routine(&mut self) {
        self.dispatch(Action::OpenRoutineEditor(RoutineDraft::new()));
    }

    pub fn edit_routine(&mut self, routine_id: i64) -> Result<()> {
        let routine = self.find_routine(routine_id)?;
        let draft = RoutineDraft::edit_existing(&routine, &self.state.library);
        self.dispatch(Action::OpenRoutineEditor(draft));
        Ok(())
    }

    /// Open an unsaved copy of a routine in the routine editor
    pub fn copy_routine(&mut self, routine_id: i64) -> Result<()> {
        let routine = self.find_routine(routine_id)?;
        let draft = RoutineDraft::copy_of(&routine, &self.state.library);
        self.dispatch(Action::OpenRoutineEditor(draft));
        Ok(())
    }

    pub fn edit_routine_draft(&mut self, edit: RoutineEdit) -> Result<()> {
        if self.state.routine_editor.is_none() {
            return Err(TrackerError::rejected("No routine is open"));
        }
        if self.dispatch(Action::EditRoutine(edit)) {
            Ok(())
        } else {
            Err(TrackerError::rejected("The routine was not changed"))
        }
    }

    pub fn add_library_exercise_to_routine(&mut self, library_id: &str) -> Result<()> {
        let exercise = self.find_library_exercise(library_id)?;
        self.edit_routine_draft(RoutineEdit::AddLibraryExercise(exercise))
    }

    pub fn add_manual_exercise_to_routine(&mut self, name: &str) -> Result<()> {
        let millis = self.reserve_millis(1);
        self.edit_routine_draft(RoutineEdit::AddManualExercise {
            name: name.to_string(),
            millis,
        })
    }

    pub fn cancel_routine_editor(&mut self) {
        self.dispatch(Action::CloseRoutineEditor);
    }

    /// Insert or update the routine being edited
    pub async fn save_routine(&mut self) -> Result<Routine> {
        let draft = self
            .state
            .routine_editor
            .clone()
            .ok_or_else(|| TrackerError::rejected("No routine is open"))?;
        let req = draft.to_request();
        req.validate()?;

        let user_id = self.user_id()?;
        let repo = RoutineRepository::new(&self.backend);
        let saved = match draft.id {
            Some(id) => repo.update(id, user_id, &req).await?,
            None => repo.create(user_id, &req).await?,
        };
        info!("Saved routine {} ({})", saved.name, saved.id);

        self.dispatch(Action::CloseRoutineEditor);
        self.refresh().await?;
        Ok(saved)
    }

    pub async fn delete_routine(&mut self, routine_id: i64) -> Result<()> {
        RoutineRepository::new(&self.backend)
            .delete(routine_id)
            .await?;
        info!("Routine {} deleted", routine_id);
        self.refresh().await
    }

    // --- library & profile ---

    /// Flip a favorite locally, then on the backend; rolled back on failure
    pub async fn toggle_favorite(&mut self, library_id: &str) -> Result<bool> {
        let user_id = self.user_id()?;
        let previous = self.state.favorites.clone();

        let now_favorite = !previous.iter().any(|id| id == library_id);
        let updated: Vec<String> = if now_favorite {
            previous
                .iter()
                .cloned()
                .chain(std::iter::once(library_id.to_string()))
                .collect()
        } else {
            previous.iter().filter(|id| *id != library_id).cloned().collect()
        };

        self.dispatch(Action::SetFavorites(updated.clone()));

        let result = ProfileRepository::new(&self.backend)
            .set_favorites(user_id, &updated)
            .await;
        if let Err(e) = result {
            warn!("Favorite update failed, rolling back: {}", e);
            self.dispatch(Action::SetFavorites(previous));
            return Err(e.into());
        }

        self.refresh().await?;
        Ok(now_favorite)
    }

    pub fn image_url(&self, exercise: &LibraryExercise) -> String {
        library::image_url(&self.backend, &self.image_bucket, exercise)
    }

    pub async fn update_profile(&mut self, req: &UpdateProfileRequest) -> Result<Profile> {
        req.validate()?;
        let user_id = self.user_id()?;

        let profile = ProfileRepository::new(&self.backend)
            .upsert(user_id, req)
            .await?;
        info!("Profile updated");

        self.refresh().await?;
        Ok(profile)
    }

    /// Record today's weight and height; a second entry on the same day
    /// replaces the first. The profile carries the latest values.
    pub async fn add_measurement(&mut self, req: &NewMeasurementRequest) -> Result<Measurement> {
        let (Some(weight), Some(height)) = (req.weight, req.height) else {
            warn!("Measurement without both weight and height");
            return Err(TrackerError::rejected("Please enter both height and weight"));
        };
        req.validate()?;

        let user_id = self.user_id()?;
        let now = self.clock.now();
        let day_start = self.today().and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1) - Duration::milliseconds(1);

        let repo = MeasurementRepository::new(&self.backend);
        let saved = match repo.find_between(user_id, day_start, day_end).await? {
            Some(existing) => repo.update(existing.id, weight, height, now).await?,
            None => repo.create(user_id, weight, height).await?,
        };

        let synced = ProfileRepository::new(&self.backend)
            .set_body_metrics(user_id, weight, height)
            .await;
        match synced {
            Ok(_) => {}
            Err(StorageError::NotFound) => warn!("No profile row to copy body metrics onto"),
            Err(e) => return Err(e.into()),
        }
        info!("Measurement recorded");

        self.refresh().await?;
        Ok(saved)
    }

    fn find_routine(&self, id: i64) -> Result<Routine> {
        self.state
            .routine(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("Routine {}", id)))
    }

    fn find_library_exercise(&self, id: &str) -> Result<LibraryExercise> {
        self.state
            .library_exercise(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("Exercise {}", id)))
    }
}

fn duplicate(name: &str) -> TrackerError {
    TrackerError::rejected(format!("\"{}\" is already in this workout", name))
}
