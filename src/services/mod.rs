pub mod access;
pub mod brackets;
pub mod notifier;
pub mod payments;
pub mod progression;
pub mod queue;
pub mod reconcile;
pub mod results;
pub mod reveal;
pub mod server;
pub mod settlement;

pub use brackets::BracketService;
pub use notifier::Notifier;
pub use payments::PaymentService;
pub use progression::ProgressionEngine;
pub use queue::ProgressionQueue;
pub use reconcile::Reconciler;
pub use results::ResultService;
pub use reveal::RoomRevealScheduler;
