pub mod event_publisher;
pub mod repository;

pub use event_publisher::*;
pub use repository::*;
