pub mod entity;

// Re-export the core types to provide a clean public API.
pub use entity::{BaseEntity, Entity};
