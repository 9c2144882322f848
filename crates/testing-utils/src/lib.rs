//! Testing utilities: in-memory mocks and entity builders
//!
//! Everything here is for tests only. The mocks honor the same
//! contracts as the real repositories (optimistic-lock updates,
//! dedupe-key uniqueness) so service tests exercise real failure
//! paths without a database.

pub mod builders;
pub mod mocks;

pub use builders::{
    CalendarBuilder, JobBuilder, RunBuilder, ScheduleBuilder, WorkerBuilder,
};
pub use mocks::{
    MockCalendarRepository, MockEventPublisher, MockJobRepository, MockRunRepository,
    MockScheduleRepository, MockWorkerRepository,
};
