pub mod cache;
pub mod deadline;
pub mod gate;
pub mod schedule;

pub use cache::TimedCache;
pub use deadline::DeadlineGuard;
pub use gate::ConcurrencyGate;
pub use schedule::ScheduledAction;
