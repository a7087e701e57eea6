//! # fedconf-cli — Trust-Configuration Toolchain
//!
//! Provides the `fedconf` command-line interface.
//!
//! ## Subcommands
//!
//! - `fedconf generate`: run generation and publish every passing version.
//! - `fedconf validate`: check a parameters document against a version.
//! - `fedconf cert validate`: run the certificate upload gate on a file.
//! - `fedconf registry check`: validate a registry export and dry-run
//!   generation without publishing.
//!
//! ## Exit codes
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | success                                        |
//! | 1    | an item was rejected (document, certificate, version) |
//! | 2    | run-level fault or operational error           |
//!
//! ```bash
//! fedconf --config fedconf.yaml generate --hold-back 2
//! fedconf validate --kind shared --version 2 out/v2/shared-params.json
//! fedconf cert validate --ca upload.tmp --name root-ca.pem
//! ```

pub mod cert;
pub mod config;
pub mod generate;
pub mod registry;
pub mod validate;

use std::path::PathBuf;

/// Exit code for success.
pub const EXIT_OK: u8 = 0;
/// Exit code when an item was rejected.
pub const EXIT_REJECTED: u8 = 1;
/// Exit code for run-level faults and operational errors.
pub const EXIT_FAULT: u8 = 2;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Publication root override.
    pub output_dir: Option<PathBuf>,
}
