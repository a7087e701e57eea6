//! Whole-document validation with real certificates.

use fedconf_core::{CertificateBytes, ConfigurationVersion, ParameterValidationError};
use fedconf_schema::ParameterValidator;
use serde_json::{json, Value};

fn cert_b64(host: &str) -> String {
    let ck = rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap();
    CertificateBytes::new(ck.cert.der().to_vec()).to_base64()
}

fn private_v2() -> Value {
    json!({
        "version": 2,
        "generatedAt": "2026-03-01T12:00:00Z",
        "instanceIdentifier": "EE",
        "operator": {"memberClass": "GOV", "memberCode": "70000001"},
        "securityServers": [{
            "owner": {"memberClass": "GOV", "memberCode": "70000001"},
            "serverCode": "central-ss",
            "address": "ss.central.example.org",
            "authCertHashes": ["0f".repeat(32)]
        }],
        "configurationAnchor": {
            "sources": [{
                "downloadUrl": "http://central.example.org/internalconf",
                "verificationCerts": [cert_b64("central.example.org")]
            }]
        },
        "managementService": {
            "authCertRegServiceAddress": "https://central.example.org:4002/managementservice/",
            "authCertRegServiceCert": cert_b64("mgmt.example.org"),
            "managementRequestServiceProviderId": {
                "memberClass": "GOV",
                "memberCode": "70000001",
                "subsystemCode": "management"
            },
            "managementRequestServiceServerCode": "central-ss"
        },
        "timeStampingIntervalSeconds": 60
    })
}

fn shared_v2() -> Value {
    json!({
        "version": 2,
        "generatedAt": "2026-03-01T12:00:00Z",
        "instanceIdentifier": "EE",
        "approvedCAs": [{
            "name": "Test CA",
            "authenticationOnly": false,
            "topCA": {
                "cert": cert_b64("ca.example.org"),
                "ocsp": [{"url": "http://ocsp.example.org"}]
            },
            "intermediateCAs": [],
            "certificateProfileInfo": "ee.fedconf.profile.Default"
        }],
        "approvedTSAs": [{
            "name": "Test TSA",
            "url": "http://tsa.example.org",
            "cert": cert_b64("tsa.example.org")
        }],
        "members": [
            {"memberClass": "GOV", "memberCode": "70000001", "name": "Operator", "subsystems": ["management"]},
            {"memberClass": "COM", "memberCode": "12345", "name": "Acme", "subsystems": []}
        ],
        "securityServers": [{
            "owner": {"memberClass": "GOV", "memberCode": "70000001"},
            "serverCode": "central-ss",
            "address": "ss.central.example.org",
            "authCertHashes": ["0f".repeat(32)],
            "clients": [
                {"memberClass": "GOV", "memberCode": "70000001", "subsystemCode": "management"},
                {"memberClass": "COM", "memberCode": "12345"}
            ]
        }],
        "globalGroups": [{
            "groupCode": "security-server-owners",
            "description": "Security server owners",
            "members": [{"memberClass": "GOV", "memberCode": "70000001"}]
        }],
        "globalSettings": {
            "ocspFreshnessSeconds": 600,
            "memberClasses": [
                {"code": "GOV", "description": "Government"},
                {"code": "COM", "description": "Commercial"}
            ]
        }
    })
}

fn semantic_paths(err: ParameterValidationError) -> Vec<String> {
    match err {
        ParameterValidationError::Semantic { violations, .. } => {
            violations.into_iter().map(|v| v.path).collect()
        }
        other => panic!("expected semantic violations, got {other}"),
    }
}

#[test]
fn well_formed_v2_documents_pass() {
    let validator = ParameterValidator::new().unwrap();
    validator
        .validate_private_value(ConfigurationVersion::V2, &private_v2())
        .unwrap();
    validator
        .validate_shared_value(ConfigurationVersion::V2, &shared_v2())
        .unwrap();
}

#[test]
fn operator_server_reference_must_resolve() {
    let validator = ParameterValidator::new().unwrap();
    let mut doc = private_v2();
    doc["managementService"]["managementRequestServiceServerCode"] = json!("elsewhere");
    let paths = semantic_paths(
        validator
            .validate_private_value(ConfigurationVersion::V2, &doc)
            .unwrap_err(),
    );
    assert_eq!(paths, vec!["/managementService/managementRequestServiceServerCode"]);
}

#[test]
fn foreign_server_in_private_parameters_is_rejected() {
    let validator = ParameterValidator::new().unwrap();
    let mut doc = private_v2();
    doc["securityServers"][0]["owner"] = json!({"memberClass": "COM", "memberCode": "12345"});
    let paths = semantic_paths(
        validator
            .validate_private_value(ConfigurationVersion::V2, &doc)
            .unwrap_err(),
    );
    assert!(paths.contains(&"/securityServers/0/owner".to_string()));
}

#[test]
fn undecodable_certificate_is_a_semantic_violation() {
    let validator = ParameterValidator::new().unwrap();
    let mut doc = shared_v2();
    // valid base64, not a certificate
    doc["approvedCAs"][0]["topCA"]["cert"] = json!("Ym9ndXMgY2VydGlmaWNhdGU=");
    let paths = semantic_paths(
        validator
            .validate_shared_value(ConfigurationVersion::V2, &doc)
            .unwrap_err(),
    );
    assert_eq!(paths, vec!["/approvedCAs/0/topCA/cert"]);
}

#[test]
fn every_violation_is_collected() {
    let validator = ParameterValidator::new().unwrap();
    let mut doc = shared_v2();
    doc["securityServers"][0]["clients"][1] = json!({"memberClass": "COM", "memberCode": "999"});
    doc["globalGroups"][0]["members"][0] =
        json!({"memberClass": "GOV", "memberCode": "70000001", "subsystemCode": "missing"});
    let err = validator
        .validate_shared_value(ConfigurationVersion::V2, &doc)
        .unwrap_err();
    assert_eq!(err.violations().len(), 2);
    assert!(err.to_string().contains("2 semantic violation(s)"));
}

#[test]
fn v2_document_is_not_a_v1_document() {
    let validator = ParameterValidator::new().unwrap();
    let mut doc = private_v2();
    doc["version"] = json!(1);
    let err = validator
        .validate_private_value(ConfigurationVersion::V1, &doc)
        .unwrap_err();
    assert!(matches!(err, ParameterValidationError::Schema { .. }));
}
