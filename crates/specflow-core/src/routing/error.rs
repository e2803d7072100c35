//! Error types for section routing.

use crate::spec::SectionId;

/// Errors produced by the section router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("no section policy registered for consumer {consumer}")]
    UnknownConsumer { consumer: String },

    #[error("specification is missing sections required by {consumer}: {}", join(.missing))]
    MissingRequiredSection {
        consumer: String,
        missing: Vec<SectionId>,
    },
}

fn join(ids: &[SectionId]) -> String {
    ids.iter()
        .map(SectionId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for routing operations.
pub type RoutingResult<T> = std::result::Result<T, RoutingError>;
