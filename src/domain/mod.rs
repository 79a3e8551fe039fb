pub mod entrants;
pub mod models;
pub mod seeding;

pub use entrants::{resolve_entrants, Entrant, Slot};
pub use models::*;
pub use seeding::PlannedMatch;
