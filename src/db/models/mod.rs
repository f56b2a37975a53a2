pub mod reminder;
pub mod safety_event;
pub mod vitals;

pub use reminder::{MarkOutcome, Reminder};
pub use safety_event::SafetyEvent;
pub use vitals::VitalsRecord;
