use std::collections::{BTreeSet, HashSet};

use storage::backend::{Backend, PLACEHOLDER_IMAGE_URL};
use storage::models::LibraryExercise;

/// Which slice of the catalog to show
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LibraryFilter {
    #[default]
    All,
    Favorites,
    BodyPart(String),
}

impl LibraryFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "all" => Self::All,
            "favorites" => Self::Favorites,
            part => Self::BodyPart(part.to_string()),
        }
    }
}

pub fn find_by_name<'a>(library: &'a [LibraryExercise], name: &str) -> Option<&'a LibraryExercise> {
    let name = name.to_lowercase();
    library.iter().find(|ex| ex.name.to_lowercase() == name)
}

fn matches_query(exercise: &LibraryExercise, query: &str) -> bool {
    exercise.name.to_lowercase().contains(query)
}

/// Case-insensitive substring search combined with a filter
pub fn filter<'a>(
    library: &'a [LibraryExercise],
    query: &str,
    filter: &LibraryFilter,
    favorites: &[String],
) -> Vec<&'a LibraryExercise> {
    let query = query.trim().to_lowercase();

    library
        .iter()
        .filter(|ex| query.is_empty() || matches_query(ex, &query))
        .filter(|ex| match filter {
            LibraryFilter::All => true,
            LibraryFilter::Favorites => favorites.contains(&ex.id),
            LibraryFilter::BodyPart(part) => ex.body_part.eq_ignore_ascii_case(part),
        })
        .collect()
}

/// Search results for an editor: blank queries find nothing and exercises
/// already picked are hidden.
pub fn search_excluding<'a>(
    library: &'a [LibraryExercise],
    query: &str,
    picked: &[&str],
) -> Vec<&'a LibraryExercise> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let picked = lowercase_set(picked);
    library
        .iter()
        .filter(|ex| !picked.contains(&ex.name.to_lowercase()) && matches_query(ex, &query))
        .collect()
}

/// `(favorites, others)`, skipping exercises already picked
pub fn split_favorites<'a>(
    library: &'a [LibraryExercise],
    favorites: &[String],
    picked: &[&str],
) -> (Vec<&'a LibraryExercise>, Vec<&'a LibraryExercise>) {
    let picked = lowercase_set(picked);
    library
        .iter()
        .filter(|ex| !picked.contains(&ex.name.to_lowercase()))
        .partition(|ex| favorites.contains(&ex.id))
}

fn lowercase_set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|name| name.to_lowercase()).collect()
}

/// Unique, sorted, without blanks
pub fn body_parts(library: &[LibraryExercise]) -> Vec<String> {
    library
        .iter()
        .map(|ex| ex.body_part.as_str())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `"upper legs"` → `"Upper Legs"`
pub fn display_name(body_part: &str) -> String {
    body_part
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Object path of the still frame shown for an exercise
pub fn image_path(gif_url: &str) -> String {
    format!("exercises/{}", gif_url.replacen("0.jpg", "1.jpg", 1))
}

pub fn image_url(backend: &Backend, bucket: &str, exercise: &LibraryExercise) -> String {
    match exercise.gif_url.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => backend.public_object_url(bucket, &image_path(path)),
        None => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}
