pub mod library;
pub mod measurement;
pub mod profile;
pub mod routine;
pub mod workout;
