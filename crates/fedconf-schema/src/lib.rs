#![deny(missing_docs)]
//! # fedconf-schema — Parameters Document Validation
//!
//! Decides whether a private or shared parameters document satisfies the
//! rules of one configuration version.
//!
//! ## Layers
//!
//! - **Schema:** one JSON Schema (Draft 2020-12) per kind and version,
//!   embedded from `schemas/`. Structural shape, required fields, formats.
//! - **Semantic:** cross-references the schema cannot express. Clients and
//!   group members resolve to registered members and subsystems, server
//!   identities are unique, certificates decode as X.509, and in v2 the
//!   private parameters describe only the operator's own servers.
//!
//! A document is accepted only if both layers pass. Violations carry JSON
//! Pointers into the document.

pub mod semantic;
pub mod validator;

pub use validator::{ParameterValidator, SchemaLoadError};
