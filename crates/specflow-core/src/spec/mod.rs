//! Specification model: the section catalog and the read-only document
//! agents are routed against.
//!
//! - [`section`]: `SectionId`, `SectionContent`, `Section`
//! - [`document`]: `Specification`, `SpecInfo`
//! - [`error`]: `SpecError`, `SpecResult`

pub mod document;
pub mod error;
pub mod section;

pub use document::{SpecInfo, Specification};
pub use error::{SpecError, SpecResult};
pub use section::{Section, SectionContent, SectionId};
