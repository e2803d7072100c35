//! Section routing: which parts of a specification each consumer sees.
//!
//! - [`policy`]: `SectionPolicy`, `SectionPolicyRegistry`
//! - [`router`]: `SectionRouter`, `RoutedSpec`
//! - [`error`]: `RoutingError`, `RoutingResult`

pub mod error;
pub mod policy;
pub mod router;

pub use error::{RoutingError, RoutingResult};
pub use policy::{SectionPolicy, SectionPolicyRegistry};
pub use router::{RoutedSpec, SectionRouter};
