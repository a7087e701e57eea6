//! # Generation Orchestrator
//!
//! Drives one generation run: snapshot the registry, pick the current
//! version, generate and validate every registered version, publish what
//! passes, and point the index at the current version.
//!
//! ## Version lifecycle
//!
//! ```text
//! Pending ──▶ Generating ──▶ Validating ──▶ Published
//!    │             │              │
//!    ▼             └──────────────┴──────▶ Rejected
//! Abandoned
//! ```
//!
//! Runs are serialized by a run lock. Within a run every version reads the
//! same snapshot, and versions proceed in parallel. A cancelled run lets
//! versions already started finish; versions not yet started end
//! `Abandoned`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use fedconf_core::{ConfigurationVersion, ContentDigest};
use fedconf_schema::ParameterValidator;

use crate::generator::{GeneratorOperation, GeneratorSet};
use crate::policy::{PolicyError, VersionPolicy};
use crate::publish::{PublishError, Publisher, ValidatedBundle};
use crate::registry::{Registry, RegistryError, RegistrySnapshot};

/// Per-version lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VersionState {
    /// Not started.
    Pending,
    /// Documents are being generated.
    Generating,
    /// Documents are being validated.
    Validating,
    /// Bundle published. Terminal state.
    Published,
    /// Generation, validation or publication failed. Terminal state.
    Rejected,
    /// Never started because the run was cancelled. Terminal state.
    Abandoned,
}

impl VersionState {
    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Rejected | Self::Abandoned)
    }

    fn can_advance_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Generating)
                | (Self::Pending, Self::Abandoned)
                | (Self::Generating, Self::Validating)
                | (Self::Generating, Self::Rejected)
                | (Self::Validating, Self::Published)
                | (Self::Validating, Self::Rejected)
        )
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// Every version reached a terminal state other than `Abandoned`.
    Completed,
    /// Cancellation was observed during the run.
    Cancelled,
}

/// The step at which a version was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionStage {
    /// Building a document from the snapshot.
    Generation,
    /// Checking a document against its version's rules.
    Validation,
    /// Writing the bundle.
    Publication,
}

impl std::fmt::Display for RejectionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Publication => "publication",
        })
    }
}

/// Why a version was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Failing step.
    pub stage: RejectionStage,
    /// Error message.
    pub error: String,
}

/// The result of one version within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionOutcome {
    /// Configuration version.
    pub version: ConfigurationVersion,
    /// Terminal state reached.
    pub state: VersionState,
    /// Digest of the private parameters body, once generated.
    pub private_digest: Option<ContentDigest>,
    /// Digest of the shared parameters body, once generated.
    pub shared_digest: Option<ContentDigest>,
    /// Set when `state` is `Rejected`.
    pub rejection: Option<Rejection>,
}

/// Summary of a generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run acquired the run lock.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// How the run ended.
    pub state: RunState,
    /// The version selected as current, if any.
    pub current_version: Option<ConfigurationVersion>,
    /// Whether the index was moved to `current_version` by this run.
    pub current_marked: bool,
    /// Run-level fault. When set, no version was processed.
    pub fault: Option<PolicyError>,
    /// Per-version outcomes, ascending by version.
    pub outcomes: Vec<VersionOutcome>,
}

impl RunReport {
    /// The outcome for `version`, if it took part in the run.
    pub fn outcome(&self, version: ConfigurationVersion) -> Option<&VersionOutcome> {
        self.outcomes.iter().find(|o| o.version == version)
    }

    /// Versions published by this run.
    pub fn published(&self) -> Vec<ConfigurationVersion> {
        self.versions_in(VersionState::Published)
    }

    /// Versions rejected by this run.
    pub fn rejected(&self) -> Vec<ConfigurationVersion> {
        self.versions_in(VersionState::Rejected)
    }

    fn versions_in(&self, state: VersionState) -> Vec<ConfigurationVersion> {
        self.outcomes
            .iter()
            .filter(|o| o.state == state)
            .map(|o| o.version)
            .collect()
    }
}

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The registry snapshot could not be taken.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The current-version index could not be updated.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// A version was driven through an illegal transition.
    #[error("invalid transition for {version} from {from:?} to {to:?}")]
    InvalidTransition {
        /// Version being processed.
        version: ConfigurationVersion,
        /// Current state.
        from: VersionState,
        /// Attempted target state.
        to: VersionState,
    },
}

/// Shared flag requesting that a run stop starting new versions.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tracks one version through its lifecycle.
struct VersionRun {
    outcome: VersionOutcome,
}

impl VersionRun {
    fn new(version: ConfigurationVersion) -> Self {
        Self {
            outcome: VersionOutcome {
                version,
                state: VersionState::Pending,
                private_digest: None,
                shared_digest: None,
                rejection: None,
            },
        }
    }

    fn advance(&mut self, to: VersionState) -> Result<(), OrchestratorError> {
        let from = self.outcome.state;
        if !from.can_advance_to(to) {
            return Err(OrchestratorError::InvalidTransition {
                version: self.outcome.version,
                from,
                to,
            });
        }
        tracing::debug!(version = %self.outcome.version, ?from, ?to, "version transition");
        self.outcome.state = to;
        Ok(())
    }

    fn reject(
        mut self,
        stage: RejectionStage,
        error: impl std::fmt::Display,
    ) -> Result<VersionOutcome, OrchestratorError> {
        self.advance(VersionState::Rejected)?;
        let error = error.to_string();
        tracing::warn!(version = %self.outcome.version, %stage, %error, "configuration version rejected");
        self.outcome.rejection = Some(Rejection { stage, error });
        Ok(self.outcome)
    }
}

/// Runs generation against a registry and publisher.
///
/// A bundle is published only after both of its documents declare the
/// version being processed and pass the orchestrator's own
/// [`ParameterValidator`] for that version, in addition to the generator's
/// checks.
pub struct GenerationOrchestrator<R, P> {
    registry: R,
    publisher: P,
    generators: GeneratorSet,
    validator: Arc<ParameterValidator>,
    policy: VersionPolicy,
    parallel: bool,
    run_lock: Mutex<()>,
}

impl<R: Registry, P: Publisher> GenerationOrchestrator<R, P> {
    /// An orchestrator processing versions in parallel.
    pub fn new(
        registry: R,
        generators: GeneratorSet,
        validator: Arc<ParameterValidator>,
        policy: VersionPolicy,
        publisher: P,
    ) -> Self {
        Self {
            registry,
            publisher,
            generators,
            validator,
            policy,
            parallel: true,
            run_lock: Mutex::new(()),
        }
    }

    /// Process versions one after another instead of in parallel.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// The registered generators.
    pub fn generators(&self) -> &GeneratorSet {
        &self.generators
    }

    /// The version policy.
    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// The publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Execute one run.
    ///
    /// Per-version failures are recorded in the report. A missing current
    /// version is a run-level fault recorded in [`RunReport::fault`].
    ///
    /// # Errors
    ///
    /// Fails if the registry cannot be read, the index cannot be written, or
    /// a lifecycle invariant is violated.
    pub fn run(&self, cancel: &CancellationFlag) -> Result<RunReport, OrchestratorError> {
        let _guard = self.run_lock.lock();
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = tracing::info_span!("generation_run", %run_id);
        let _entered = span.enter();

        let snapshot = self.registry.snapshot()?;
        tracing::info!(
            versions = ?self.generators.versions(),
            held_back = ?self.policy.held_back().collect::<Vec<_>>(),
            "starting generation run"
        );

        let current = match self.policy.current_version(&self.generators) {
            Ok(version) => version,
            Err(fault) => {
                tracing::error!(error = %fault, "generation run aborted");
                return Ok(RunReport {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    state: RunState::Completed,
                    current_version: None,
                    current_marked: false,
                    fault: Some(fault),
                    outcomes: Vec::new(),
                });
            }
        };

        let versions = self.generators.versions();
        let outcomes: Vec<VersionOutcome> = if self.parallel {
            versions
                .par_iter()
                .map(|v| self.process_version(*v, &snapshot, cancel))
                .collect::<Result<_, _>>()?
        } else {
            versions
                .iter()
                .map(|v| self.process_version(*v, &snapshot, cancel))
                .collect::<Result<_, _>>()?
        };

        let state = if cancel.is_cancelled() {
            RunState::Cancelled
        } else {
            RunState::Completed
        };

        let current_published = outcomes
            .iter()
            .any(|o| o.version == current && o.state == VersionState::Published);
        let current_marked = state == RunState::Completed && current_published;
        if current_marked {
            self.publisher.mark_current(current)?;
        } else {
            tracing::warn!(
                version = %current,
                ?state,
                "current version not published in this run, index left unchanged"
            );
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            state,
            current_version: Some(current),
            current_marked,
            fault: None,
            outcomes,
        };
        tracing::info!(
            state = ?report.state,
            published = ?report.published(),
            rejected = ?report.rejected(),
            "generation run finished"
        );
        Ok(report)
    }

    fn process_version(
        &self,
        version: ConfigurationVersion,
        snapshot: &RegistrySnapshot,
        cancel: &CancellationFlag,
    ) -> Result<VersionOutcome, OrchestratorError> {
        let mut run = VersionRun::new(version);
        if cancel.is_cancelled() {
            run.advance(VersionState::Abandoned)?;
            tracing::info!(%version, "version abandoned by cancellation");
            return Ok(run.outcome);
        }

        run.advance(VersionState::Generating)?;
        let generator = match self
            .generators
            .get(version, GeneratorOperation::GeneratePrivateParameters)
        {
            Ok(generator) => generator,
            Err(e) => return run.reject(RejectionStage::Generation, e),
        };
        let private = match generator.generate_private_parameters(snapshot) {
            Ok(doc) => doc,
            Err(e) => return run.reject(RejectionStage::Generation, e),
        };
        let shared = match generator.generate_shared_parameters(snapshot) {
            Ok(doc) => doc,
            Err(e) => return run.reject(RejectionStage::Generation, e),
        };
        let digests = private
            .content_digest()
            .and_then(|p| shared.content_digest().map(|s| (p, s)));
        let (private_digest, shared_digest) = match digests {
            Ok(pair) => pair,
            Err(e) => return run.reject(RejectionStage::Generation, e),
        };
        run.outcome.private_digest = Some(private_digest.clone());
        run.outcome.shared_digest = Some(shared_digest.clone());

        run.advance(VersionState::Validating)?;
        if let Err(e) = generator.validate_private_parameters(&private) {
            return run.reject(RejectionStage::Validation, e);
        }
        if let Err(e) = generator.validate_shared_parameters(&shared) {
            return run.reject(RejectionStage::Validation, e);
        }
        let bundle = match ValidatedBundle::new(
            version,
            private,
            shared,
            private_digest,
            shared_digest,
        ) {
            Ok(bundle) => bundle,
            Err(e) => return run.reject(RejectionStage::Validation, e),
        };
        if let Err(e) = self
            .validator
            .validate_private(bundle.private_parameters(), version)
            .and_then(|()| self.validator.validate_shared(bundle.shared_parameters(), version))
        {
            return run.reject(RejectionStage::Validation, e);
        }

        if let Err(e) = self.publisher.publish(&bundle) {
            return run.reject(RejectionStage::Publication, e);
        }
        run.advance(VersionState::Published)?;
        Ok(run.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use VersionState::*;
        assert!(Pending.can_advance_to(Generating));
        assert!(Pending.can_advance_to(Abandoned));
        assert!(Validating.can_advance_to(Published));
        assert!(!Pending.can_advance_to(Published));
        assert!(!Generating.can_advance_to(Published));
        assert!(!Published.can_advance_to(Rejected));
        assert!(!Abandoned.can_advance_to(Generating));
        for terminal in [Published, Rejected, Abandoned] {
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn version_run_rejects_illegal_transition() {
        let mut run = VersionRun::new(ConfigurationVersion::V1);
        let err = run.advance(VersionState::Published).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidTransition {
                from: VersionState::Pending,
                to: VersionState::Published,
                ..
            }
        ));
    }

    #[test]
    fn rejection_records_stage() {
        let mut run = VersionRun::new(ConfigurationVersion::V2);
        run.advance(VersionState::Generating).unwrap();
        let outcome = run.reject(RejectionStage::Generation, "boom").unwrap();
        assert_eq!(outcome.state, VersionState::Rejected);
        assert_eq!(
            outcome.rejection,
            Some(Rejection {
                stage: RejectionStage::Generation,
                error: "boom".to_string()
            })
        );
    }

    #[test]
    fn cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
