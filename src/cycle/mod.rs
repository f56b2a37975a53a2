pub mod coordinator;
pub mod result;

pub use coordinator::CycleCoordinator;
pub use result::{AdvisoryNote, CycleResult, DispatchedReminder};
