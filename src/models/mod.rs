mod attendance;
mod event;
mod frame;

pub use attendance::{AttendanceRequest, ConfirmOutcome, LocationBlob};
pub use event::EventSummary;
pub use frame::ScanFrame;
