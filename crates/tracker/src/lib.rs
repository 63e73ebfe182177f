pub mod bmi;
pub mod clock;
pub mod draft;
pub mod error;
pub mod history;
pub mod library;
pub mod progress;
pub mod session;
pub mod state;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, TrackerError};
pub use state::{Action, AppState, View};
pub use store::{RoutineStart, Store};
