use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use storage::backend::SignUpOutcome;
use storage::dto::auth::{SignInRequest, SignUpRequest};
use storage::models::{ExerciseSet, Measurement, Profile, Workout};
use tracker::bmi::{self, BmiReport, WeightPoint};
use tracker::draft::{RoutineEdit, SetUpdate};
use tracker::history;
use tracker::library::{self, LibraryFilter};
use tracker::progress::{self, TimeRange};
use tracker::session::TickerExit;
use tracker::{RoutineStart, Store};

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Prints `value` as JSON when asked to; returns whether it did
    fn json<T: Serialize>(&self, value: &T) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }
}

/// `8x62.5` → 8 reps at 62.5
pub fn parse_set(value: &str) -> Result<(i32, Decimal), String> {
    let (reps, weight) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected REPSxWEIGHT, got '{}'", value))?;

    let reps = reps
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid reps '{}': {}", reps, e))?;
    let weight = weight
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid weight '{}': {}", weight, e))?;

    if reps < 0 || weight < Decimal::ZERO {
        return Err("reps and weight cannot be negative".to_string());
    }
    Ok((reps, weight))
}

fn format_weight(weight: Decimal) -> String {
    weight.normalize().to_string()
}

// --- auth ---

pub async fn login(store: &mut Store, email: String, password: String) -> Result<()> {
    store.sign_in(&SignInRequest { email, password }).await?;
    if let Some(user) = &store.state().user {
        println!("Signed in as {}", user.email.as_deref().unwrap_or("guest"));
    }
    Ok(())
}

pub async fn signup(
    store: &mut Store,
    email: String,
    password: String,
    confirm_password: String,
) -> Result<()> {
    let req = SignUpRequest {
        email,
        password,
        confirm_password,
    };

    match store.sign_up(&req).await? {
        SignUpOutcome::SignedIn(_) => println!("Account created; signed in as {}", req.email),
        SignUpOutcome::ConfirmationRequired(_) => {
            println!("Check {} for a confirmation link, then sign in", req.email)
        }
    }
    Ok(())
}

pub fn whoami(store: &Store, out: Output) -> Result<()> {
    let user = &store.state().user;
    if out.json(user)? {
        return Ok(());
    }

    match user {
        Some(user) if user.is_anonymous => println!("Guest ({})", user.id),
        Some(user) => println!("{} ({})", user.email.as_deref().unwrap_or("-"), user.id),
        None => println!("Not signed in"),
    }
    Ok(())
}

// --- workouts ---

pub fn list_workouts(store: &Store, recent: Option<usize>, out: Output) -> Result<()> {
    let state = store.state();

    if let Some(n) = recent {
        let workouts = history::recent(&state.workouts, n);
        if out.json(&workouts)? {
            return Ok(());
        }
        for workout in workouts {
            print_workout_line(store, workout);
        }
        return Ok(());
    }

    if out.json(&state.workouts)? {
        return Ok(());
    }
    if state.workouts.is_empty() {
        println!("No workouts yet");
    }

    for group in history::group_by_month(&state.workouts) {
        println!(
            "{}: {} workouts, {} sets",
            group.title(),
            group.workouts.len(),
            group.total_sets()
        );
        for workout in &group.workouts {
            print_workout_line(store, workout);
        }
    }
    Ok(())
}

fn print_workout_line(store: &Store, workout: &Workout) {
    let stats = history::workout_stats(workout);
    let mut line = format!(
        "  [{}] {}  {} exercises, {} sets, {} kg",
        workout.id,
        workout.date,
        stats.exercises,
        stats.sets,
        format_weight(stats.volume)
    );

    if let Some(duration) = history::format_duration(workout.duration) {
        line.push_str(&format!(", {}", duration));
    }
    if let Some(routine) = history::routine_name(workout, &store.state().routines) {
        line.push_str(&format!(" ({})", routine));
    }
    if workout.is_in_progress() {
        line.push_str("  in progress");
    }
    println!("{}", line);
}

pub fn show_workout(store: &Store, date: NaiveDate, out: Output) -> Result<()> {
    let workout = store
        .state()
        .workout_on(date)
        .with_context(|| format!("No workout on {}", date))?;
    print_workout(store, workout, out)
}

pub fn print_workout(store: &Store, workout: &Workout, out: Output) -> Result<()> {
    if out.json(workout)? {
        return Ok(());
    }

    print_workout_line(store, workout);
    for exercise in &workout.exercises {
        let sets: Vec<String> = exercise
            .sets
            .iter()
            .map(|s| format!("{}x{}", s.reps, format_weight(s.weight)))
            .collect();
        println!("    {}: {}", exercise.name, sets.join(", "));

        if let Some(cmp) =
            history::compare_with_previous(&store.state().workouts, workout, exercise)
        {
            println!(
                "      vs {}: max {:+} kg, volume {:+} kg",
                cmp.previous_date,
                cmp.max_weight_change().normalize(),
                cmp.volume_change().normalize()
            );
        }
    }
    Ok(())
}

// --- session ---

pub fn print_editor(store: &Store, out: Output) -> Result<()> {
    let editor = store
        .state()
        .editor
        .as_ref()
        .context("No workout is open")?;
    if out.json(&editor.draft.exercises)? {
        return Ok(());
    }

    let elapsed = store.elapsed().unwrap_or(0);
    println!(
        "Workout {} [{}]{}",
        editor.draft.date,
        history::format_clock(elapsed),
        if editor.timer.is_running() { "" } else { " (not timed)" }
    );

    for exercise in &editor.draft.exercises {
        println!("  {} ({} sets)", exercise.name, exercise.sets.len());
        if let Some(previous) = store.previous_performance(&exercise.name) {
            let sets: Vec<String> = previous
                .sets
                .iter()
                .map(|s| format!("{}x{}", s.reps, format_weight(s.weight)))
                .collect();
            println!("    last time: {}", sets.join(", "));
        }
    }
    Ok(())
}

pub async fn log_exercise(
    store: &mut Store,
    library_id: Option<String>,
    name: Option<String>,
    sets: Vec<(i32, Decimal)>,
    out: Output,
) -> Result<()> {
    if store.state().editor.is_none() {
        store.start_or_continue_today().await?;
    }

    let exercise_id = match (library_id, name) {
        (Some(library_id), _) => {
            let name = store
                .state()
                .library_exercise(&library_id)
                .map(|ex| ex.name.clone())
                .with_context(|| format!("No library exercise {}", library_id))?;
            match editor_exercise(store, &name) {
                Some(id) => id,
                None => {
                    store.add_library_exercise(&library_id)?;
                    editor_exercise(store, &name).context("Exercise was not added")?
                }
            }
        }
        (None, Some(name)) => match editor_exercise(store, &name) {
            Some(id) => id,
            None => {
                let id = store.add_manual_exercise()?;
                store.rename_exercise(&id, &name)?;
                id
            }
        },
        (None, None) => bail!("Pass --library <id> or --name <name>"),
    };

    // an exercise seeded from a routine starts with one empty set
    let existing = editor_sets(store, &exercise_id);
    let mut index = match existing.as_slice() {
        [only] if only.is_blank() => 0,
        sets => sets.len(),
    };
    let mut len = existing.len();

    for (reps, weight) in sets {
        if index >= len {
            store.add_set(&exercise_id)?;
            len += 1;
        }
        store.update_set(&exercise_id, index, SetUpdate::Reps(reps))?;
        store.update_set(&exercise_id, index, SetUpdate::Weight(weight))?;
        index += 1;
    }

    let saved = store.save_and_exit().await?;
    print_workout(store, &saved, out)
}

/// Id of the open workout's exercise with this name, ignoring case
fn editor_exercise(store: &Store, name: &str) -> Option<String> {
    let name = name.to_lowercase();
    store
        .state()
        .editor
        .as_ref()?
        .draft
        .exercises
        .iter()
        .find(|ex| ex.name.to_lowercase() == name)
        .map(|ex| ex.id.clone())
}

fn editor_sets(store: &Store, exercise_id: &str) -> Vec<ExerciseSet> {
    store
        .state()
        .editor
        .as_ref()
        .and_then(|e| e.draft.exercises.iter().find(|ex| ex.id == exercise_id))
        .map(|ex| ex.sets.clone())
        .unwrap_or_default()
}

pub async fn watch(store: &mut Store) -> Result<()> {
    if store.state().editor.is_none() {
        store.start_or_continue_today().await?;
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let exit = store
        .watch_session(shutdown, |elapsed| {
            print!("\r{}  ", history::format_clock(elapsed));
            std::io::stdout().flush().ok();
        })
        .await?;
    println!();

    match exit {
        TickerExit::Expired(elapsed) => println!(
            "Session ran {} and was saved and finished",
            history::format_clock(elapsed)
        ),
        TickerExit::Shutdown => println!("Timer stopped; the session keeps running"),
        TickerExit::Idle => println!("This workout is not being timed"),
    }
    Ok(())
}

pub async fn finish_today(store: &mut Store, out: Output) -> Result<()> {
    let today = store.today();
    let id = store
        .state()
        .workout_on(today)
        .map(|w| w.id)
        .context("No workout today")?;

    let workout = store.finish_workout(id).await?;
    print_workout(store, &workout, out)
}

// --- routines ---

pub fn list_routines(store: &Store, out: Output) -> Result<()> {
    let routines = &store.state().routines;
    if out.json(routines)? {
        return Ok(());
    }

    if routines.is_empty() {
        println!("No routines yet");
    }
    for routine in routines {
        println!(
            "[{}] {} ({} exercises)",
            routine.id,
            routine.name,
            routine.exercises.len()
        );
    }
    Ok(())
}

pub fn show_routine(store: &Store, id: i64, out: Output) -> Result<()> {
    let routine = store
        .state()
        .routine(id)
        .with_context(|| format!("Routine {} not found", id))?;
    if out.json(routine)? {
        return Ok(());
    }

    println!("{}", routine.name);
    for (i, exercise) in routine.exercises.iter().enumerate() {
        match &exercise.body_part {
            Some(part) => println!("  {}. {} [{}]", i + 1, exercise.name, library::display_name(part)),
            None => println!("  {}. {}", i + 1, exercise.name),
        }
    }
    Ok(())
}

/// Library ids become catalog exercises; anything else is taken as a name
pub async fn create_routine(
    store: &mut Store,
    name: String,
    exercises: Vec<String>,
    out: Output,
) -> Result<()> {
    store.new_routine();
    store.edit_routine_draft(RoutineEdit::Rename(name))?;

    for exercise in exercises {
        if store.state().library_exercise(&exercise).is_some() {
            store.add_library_exercise_to_routine(&exercise)?;
        } else {
            store.add_manual_exercise_to_routine(&exercise)?;
        }
    }

    let saved = store.save_routine().await?;
    show_routine(store, saved.id, out)
}

pub async fn start_routine(store: &mut Store, id: i64, append: bool, out: Output) -> Result<()> {
    match store.start_routine(id, append).await? {
        RoutineStart::Started => {
            print_editor(store, out)?;
            if !out.json {
                println!("Log sets with `ironlog session log`");
            }
            Ok(())
        }
        RoutineStart::NeedsConfirmation => {
            println!("Today already has a workout; pass --append to add this routine to it");
            Ok(())
        }
    }
}

// --- library ---

pub fn search_library(store: &Store, query: &str, filter: &str, out: Output) -> Result<()> {
    let state = store.state();
    let found = library::filter(
        &state.library,
        query,
        &LibraryFilter::parse(filter),
        &state.favorites,
    );
    if out.json(&found)? {
        return Ok(());
    }

    for exercise in found {
        println!(
            "{}{}  {} [{}]",
            if state.is_favorite(&exercise.id) { "* " } else { "  " },
            exercise.id,
            exercise.name,
            library::display_name(&exercise.body_part)
        );
    }
    Ok(())
}

pub fn body_parts(store: &Store, out: Output) -> Result<()> {
    let parts = library::body_parts(&store.state().library);
    if out.json(&parts)? {
        return Ok(());
    }

    for part in parts {
        println!("{}", library::display_name(&part));
    }
    Ok(())
}

pub fn show_library_exercise(store: &Store, id: &str, out: Output) -> Result<()> {
    let exercise = store
        .state()
        .library_exercise(id)
        .with_context(|| format!("Exercise {} not found", id))?;
    if out.json(exercise)? {
        return Ok(());
    }

    println!("{}", exercise.name);
    println!("  body part: {}", library::display_name(&exercise.body_part));
    println!("  equipment: {}", exercise.equipment);
    println!("  target:    {}", exercise.target);
    println!("  image:     {}", store.image_url(exercise));
    for (i, step) in exercise.instructions.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    Ok(())
}

// --- profile & progress ---

#[derive(Serialize)]
struct ProfileView<'a> {
    profile: Option<&'a Profile>,
    bmi: Option<BmiReport>,
    weights: Vec<WeightPoint>,
    measurements: &'a [Measurement],
}

pub fn show_profile(store: &Store, out: Output) -> Result<()> {
    let state = store.state();
    let view = ProfileView {
        profile: state.profile.as_ref(),
        bmi: state.profile.as_ref().and_then(bmi::report),
        weights: bmi::weight_series(&state.measurements),
        measurements: &state.measurements,
    };
    if out.json(&view)? {
        return Ok(());
    }

    let Some(profile) = view.profile else {
        println!("No profile yet; set one with `ironlog profile update`");
        return Ok(());
    };

    println!("{}", profile.full_name.as_deref().unwrap_or("(no name)"));
    if let Some(age) = profile.age {
        println!("  age:    {}", age);
    }
    if let Some(height) = profile.height {
        println!("  height: {} cm", format_weight(height));
    }
    if let Some(weight) = profile.weight {
        println!("  weight: {} kg", format_weight(weight));
    }
    if let Some(report) = view.bmi {
        println!("  BMI:    {} ({}, gauge {}%)", report.value, report.category, report.gauge);
    }
    if !view.weights.is_empty() {
        println!("  weight history:");
        for point in &view.weights {
            println!("    {}  {} kg", point.date, format_weight(point.weight));
        }
    }
    Ok(())
}

pub fn progress(store: &Store, range: TimeRange, exercise: Option<&str>, out: Output) -> Result<()> {
    let workouts = progress::in_range(&store.state().workouts, range, store.today());

    if let Some(name) = exercise {
        let points = progress::exercise_progress(&workouts, name);
        if out.json(&points)? {
            return Ok(());
        }
        if points.is_empty() {
            println!("No sets of {} in this range", name);
        }
        for point in points {
            println!(
                "{}  max {} kg, volume {} kg",
                point.date,
                format_weight(point.max_weight),
                format_weight(point.volume)
            );
        }
        return Ok(());
    }

    let totals = progress::workout_totals(&workouts);
    let distribution = progress::muscle_distribution(&workouts);
    if out.json(&serde_json::json!({
        "range": range,
        "workouts": totals,
        "muscles": distribution,
        "exercises": progress::exercise_names(&workouts),
    }))? {
        return Ok(());
    }

    println!("{} workouts", totals.len());
    for point in &totals {
        println!("  {}  {} sets, {} kg", point.date, point.sets, format_weight(point.volume));
    }
    if distribution.has_data() {
        println!("Volume by muscle group:");
        for (group, volume) in &distribution.volumes {
            println!("  {:<10} {} kg", group.to_string(), format_weight(*volume));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        assert_eq!(parse_set("8x62.5"), Ok((8, Decimal::new(625, 1))));
        assert_eq!(parse_set("10X0"), Ok((10, Decimal::ZERO)));
        assert_eq!(parse_set(" 5 x 100 "), Ok((5, Decimal::from(100))));
        assert!(parse_set("eight").is_err());
        assert!(parse_set("8x").is_err());
        assert!(parse_set("-1x20").is_err());
    }

    #[test]
    fn test_format_weight_trims_zeros() {
        assert_eq!(format_weight(Decimal::new(6250, 2)), "62.5");
        assert_eq!(format_weight(Decimal::new(1000, 1)), "100");
    }
}
