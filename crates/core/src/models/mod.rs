pub mod calendar;
pub mod event;
pub mod job;
pub mod run;
pub mod schedule;
pub mod worker;

pub use calendar::BusinessCalendar;
pub use event::DispatchEvent;
pub use job::{BackoffPolicy, BackoffStrategy, Job};
pub use run::{Run, RunMetrics, RunStatus};
pub use schedule::{CalendarRef, QueueSpec, Schedule, Target, Trigger};
pub use worker::{CapabilityRequirement, Worker, WorkerCapabilities, WorkerStatus};
