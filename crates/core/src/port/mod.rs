// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod processor;
pub mod status_repository;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use processor::Processor;
pub use status_repository::StatusRepository;
pub use time_provider::TimeProvider;
