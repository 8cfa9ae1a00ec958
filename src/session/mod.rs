mod controller;
mod state;

pub use controller::CheckinController;
pub use state::{CheckinPhase, CheckinSnapshot, TerminalOutcome};
