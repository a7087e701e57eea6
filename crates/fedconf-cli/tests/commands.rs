//! Subcommand handlers driven against files on disk.

use std::path::{Path, PathBuf};

use fedconf_cli::cert::{run_cert, CertArgs, CertCommand, CertValidateArgs};
use fedconf_cli::config::Settings;
use fedconf_cli::generate::{execute, exit_code};
use fedconf_cli::registry::{run_registry, RegistryArgs, RegistryCommand};
use fedconf_cli::validate::{run_validate, ValidateArgs};
use fedconf_cli::{GlobalOpts, EXIT_FAULT, EXIT_OK, EXIT_REJECTED};
use fedconf_core::{CertificateBytes, ClientId, ConfigurationVersion, DocumentKind, MemberId};
use fedconf_gen::{
    CaInfo, CertificationAuthority, ConfigurationSource, CurrentIndex, GlobalSettings,
    ManagementService, Member, MemberClass, RegistrySnapshot, SecurityServer,
    TimestampingAuthority,
};

fn cert(host: &str) -> CertificateBytes {
    let ck = rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap();
    CertificateBytes::new(ck.cert.der().to_vec())
}

fn operator() -> MemberId {
    MemberId::new("GOV", "70000001").unwrap()
}

fn snapshot() -> RegistrySnapshot {
    RegistrySnapshot {
        instance_identifier: "EE".to_string(),
        member_classes: vec![MemberClass {
            code: "GOV".to_string(),
            description: "Government".to_string(),
        }],
        members: vec![Member {
            id: operator(),
            name: "Operator".to_string(),
            subsystems: vec!["management".to_string()],
        }],
        security_servers: vec![SecurityServer {
            owner: operator(),
            server_code: "central-ss".to_string(),
            address: "ss.central.example.org".to_string(),
            auth_certs: vec![cert("ss.central.example.org")],
            clients: vec!["GOV/70000001/management".parse::<ClientId>().unwrap()],
        }],
        certification_authorities: vec![CertificationAuthority {
            name: "Test CA".to_string(),
            authentication_only: false,
            top_ca: CaInfo {
                cert: cert("ca.example.org"),
                ocsp: vec![],
            },
            intermediate_cas: vec![],
            certificate_profile_info: None,
        }],
        timestamping_authorities: vec![TimestampingAuthority {
            name: "Test TSA".to_string(),
            url: "http://tsa.example.org".to_string(),
            cert: cert("tsa.example.org"),
        }],
        global_groups: vec![],
        configuration_sources: vec![ConfigurationSource {
            download_url: "http://central.example.org/internalconf".to_string(),
            verification_certs: vec![cert("conf.example.org")],
        }],
        management_service: ManagementService {
            auth_cert_reg_service_address: "https://central.example.org:4002/managementservice/"
                .to_string(),
            auth_cert_reg_service_cert: cert("mgmt.example.org"),
            service_provider: "GOV/70000001/management".parse().unwrap(),
            security_server: None,
        },
        global_settings: GlobalSettings::default(),
    }
}

fn write_registry(dir: &Path, snapshot: &RegistrySnapshot) -> PathBuf {
    let path = dir.join("registry.yaml");
    std::fs::write(&path, serde_yaml::to_string(snapshot).unwrap()).unwrap();
    path
}

fn v(n: u32) -> ConfigurationVersion {
    ConfigurationVersion::new(n).unwrap()
}

#[test]
fn generate_publishes_every_version_and_marks_highest() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &snapshot());
    let out = dir.path().join("out");

    let report = execute(&Settings::default(), registry, out.clone()).unwrap();
    assert_eq!(exit_code(&report), EXIT_OK);
    assert_eq!(report.current_version, Some(v(2)));

    for version in [v(1), v(2)] {
        let version_dir = out.join(version.to_string());
        assert!(version_dir.join(DocumentKind::Private.file_name()).is_file());
        assert!(version_dir.join(DocumentKind::Shared.file_name()).is_file());
    }
    let index: CurrentIndex =
        serde_json::from_slice(&std::fs::read(out.join("current.json")).unwrap()).unwrap();
    assert_eq!(index.current_version, v(2));
}

#[test]
fn held_back_setting_changes_current_version() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &snapshot());
    let settings = Settings {
        held_back_versions: vec![v(2)],
        parallel: false,
        ..Settings::default()
    };

    let report = execute(&settings, registry, dir.path().join("out")).unwrap();
    assert_eq!(report.current_version, Some(v(1)));
    assert_eq!(exit_code(&report), EXIT_OK);
}

#[test]
fn every_version_held_back_is_a_fault() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &snapshot());
    let out = dir.path().join("out");
    let settings = Settings {
        held_back_versions: vec![v(1), v(2)],
        ..Settings::default()
    };

    let report = execute(&settings, registry, out.clone()).unwrap();
    assert!(report.fault.is_some());
    assert_eq!(exit_code(&report), EXIT_FAULT);
    assert!(!out.join("current.json").exists());
}

#[test]
fn unreadable_registry_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = execute(
        &Settings::default(),
        dir.path().join("missing.yaml"),
        dir.path().join("out"),
    );
    assert!(result.is_err());
}

#[test]
fn validate_accepts_published_documents_and_rejects_edits() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &snapshot());
    let out = dir.path().join("out");
    execute(&Settings::default(), registry, out.clone()).unwrap();

    let shared = out.join("v2").join(DocumentKind::Shared.file_name());
    let args = ValidateArgs {
        kind: DocumentKind::Shared,
        version: None,
        path: shared.clone(),
    };
    assert_eq!(run_validate(&args, &GlobalOpts::default()).unwrap(), EXIT_OK);

    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&shared).unwrap()).unwrap();
    doc["instanceIdentifier"] = serde_json::Value::Null;
    let edited = dir.path().join("edited.json");
    std::fs::write(&edited, serde_json::to_vec(&doc).unwrap()).unwrap();
    let args = ValidateArgs {
        kind: DocumentKind::Shared,
        version: None,
        path: edited,
    };
    assert_eq!(run_validate(&args, &GlobalOpts::default()).unwrap(), EXIT_REJECTED);
}

#[test]
fn validate_rejects_non_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not json").unwrap();
    let args = ValidateArgs {
        kind: DocumentKind::Private,
        version: Some(v(2)),
        path,
    };
    assert_eq!(run_validate(&args, &GlobalOpts::default()).unwrap(), EXIT_REJECTED);
}

fn cert_args(path: PathBuf, ca: bool) -> CertArgs {
    CertArgs {
        command: CertCommand::Validate(CertValidateArgs {
            path,
            name: Some("upload.pem".to_string()),
            ca,
            current: false,
            json: true,
        }),
    }
}

#[test]
fn cert_validate_accepts_pem_and_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let ck = rcgen::generate_simple_self_signed(vec!["leaf.example.org".to_string()]).unwrap();
    let pem = dir.path().join("leaf.pem");
    std::fs::write(&pem, ck.cert.pem()).unwrap();
    assert_eq!(run_cert(&cert_args(pem.clone(), false), &GlobalOpts::default()).unwrap(), EXIT_OK);
    assert_eq!(
        run_cert(&cert_args(pem, true), &GlobalOpts::default()).unwrap(),
        EXIT_REJECTED
    );

    let junk = dir.path().join("junk.pem");
    std::fs::write(&junk, b"-----BEGIN CERTIFICATE-----\nnope\n").unwrap();
    assert_eq!(
        run_cert(&cert_args(junk, false), &GlobalOpts::default()).unwrap(),
        EXIT_REJECTED
    );
}

#[test]
fn registry_check_dry_runs_every_version() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &snapshot());
    let args = RegistryArgs {
        command: RegistryCommand::Check {
            path: Some(registry),
        },
    };
    assert_eq!(run_registry(&args, &GlobalOpts::default()).unwrap(), EXIT_OK);
    // Nothing is published by a check.
    assert!(!dir.path().join("out").exists());
}

#[test]
fn registry_check_rejects_bad_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let mut snapshot = snapshot();
    snapshot.timestamping_authorities[0].cert = CertificateBytes::new(b"not a certificate".to_vec());
    let registry = write_registry(dir.path(), &snapshot);
    let args = RegistryArgs {
        command: RegistryCommand::Check {
            path: Some(registry),
        },
    };
    assert_eq!(run_registry(&args, &GlobalOpts::default()).unwrap(), EXIT_REJECTED);
}

#[test]
fn registry_check_with_unparseable_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.yaml");
    std::fs::write(&path, "instanceIdentifier: [unterminated").unwrap();
    let args = RegistryArgs {
        command: RegistryCommand::Check { path: Some(path) },
    };
    assert!(run_registry(&args, &GlobalOpts::default()).is_err());
}
