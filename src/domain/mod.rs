//! Domain events shared across services, the audit log, and SSE.

pub mod events;

pub use events::DomainEvent;
