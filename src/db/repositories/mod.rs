pub mod reminders;
pub mod safety_events;
pub mod vitals;
