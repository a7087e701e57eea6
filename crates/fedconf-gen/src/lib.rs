#![deny(missing_docs)]
//! # fedconf-gen — Configuration Generation
//!
//! Turns registry state into published, versioned configuration bundles.
//!
//! ## Pipeline
//!
//! ```text
//! Registry ──snapshot──▶ ConfigurationGenerator(v) ──▶ ParameterValidator(v)
//!                                                            │
//!                        current.json ◀── Publisher ◀── ValidatedBundle
//! ```
//!
//! - [`registry`]: the [`Registry`] collaborator and its snapshot model.
//! - [`generator`]: the per-version [`ConfigurationGenerator`] contract and
//!   the [`GeneratorSet`] dispatching to it.
//! - [`v1`], [`v2`]: built-in generators.
//! - [`policy`]: [`VersionPolicy`], choosing the current version.
//! - [`orchestrator`]: [`GenerationOrchestrator`], running the pipeline.
//! - [`publish`]: [`Publisher`] and the atomic [`DirectoryPublisher`].
//!
//! ## Design Principles
//!
//! - Every version in a run reads the same snapshot.
//! - Only validated documents reach a publisher; [`ValidatedBundle`] cannot
//!   be constructed outside this crate.
//! - A failing version is reported and skipped. Other versions still
//!   publish.

mod body;
pub mod generator;
pub mod orchestrator;
pub mod policy;
pub mod publish;
pub mod registry;
pub mod v1;
pub mod v2;

pub use generator::{
    ConfigurationGenerator, Eligibility, GenerationError, GeneratorError, GeneratorOperation,
    GeneratorSet,
};
pub use orchestrator::{
    CancellationFlag, GenerationOrchestrator, OrchestratorError, Rejection, RejectionStage,
    RunReport, RunState, VersionOutcome, VersionState,
};
pub use policy::{PolicyError, VersionPolicy};
pub use publish::{
    CurrentIndex, DirectoryPublisher, Manifest, PublishError, Publisher, ValidatedBundle,
};
pub use registry::{
    verify_certificates, CaInfo, CertificationAuthority, ConfigurationSource, FileRegistry,
    GlobalGroup, GlobalSettings, InMemoryRegistry, ManagementService, Member, MemberClass,
    OcspResponder, Registry, RegistryError, RegistrySnapshot, SecurityServer,
    TimestampingAuthority,
};
pub use v1::V1Generator;
pub use v2::V2Generator;
