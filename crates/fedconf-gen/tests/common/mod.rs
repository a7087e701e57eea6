//! Registry fixtures backed by freshly minted certificates.

#![allow(dead_code)]

use std::sync::Arc;

use fedconf_core::{CertificateBytes, ClientId, MemberId};
use fedconf_gen::{
    CaInfo, CertificationAuthority, ConfigurationSource, GeneratorSet, GlobalGroup,
    GlobalSettings, ManagementService, Member, MemberClass, OcspResponder, RegistrySnapshot,
    SecurityServer, TimestampingAuthority,
};
use fedconf_schema::ParameterValidator;

pub fn cert(host: &str) -> CertificateBytes {
    let ck = rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap();
    CertificateBytes::new(ck.cert.der().to_vec())
}

pub fn member(class: &str, code: &str) -> MemberId {
    MemberId::new(class, code).unwrap()
}

pub fn client(s: &str) -> ClientId {
    s.parse().unwrap()
}

pub fn operator() -> MemberId {
    member("GOV", "70000001")
}

pub fn validator() -> Arc<ParameterValidator> {
    Arc::new(ParameterValidator::new().unwrap())
}

pub fn generators() -> GeneratorSet {
    GeneratorSet::with_builtin(validator())
}

/// A small but complete federation: an operator with its central server,
/// one commercial member with a client subsystem, one CA and one TSA.
pub fn snapshot() -> RegistrySnapshot {
    RegistrySnapshot {
        instance_identifier: "EE".to_string(),
        member_classes: vec![
            MemberClass {
                code: "GOV".to_string(),
                description: "Government".to_string(),
            },
            MemberClass {
                code: "COM".to_string(),
                description: "Commercial".to_string(),
            },
        ],
        members: vec![
            Member {
                id: member("COM", "12345"),
                name: "Acme".to_string(),
                subsystems: vec!["billing".to_string()],
            },
            Member {
                id: operator(),
                name: "Operator".to_string(),
                subsystems: vec!["management".to_string()],
            },
        ],
        security_servers: vec![
            SecurityServer {
                owner: member("COM", "12345"),
                server_code: "ss1".to_string(),
                address: "ss1.acme.example.org".to_string(),
                auth_certs: vec![cert("ss1.acme.example.org")],
                clients: vec![client("COM/12345/billing"), client("COM/12345")],
            },
            SecurityServer {
                owner: operator(),
                server_code: "central-ss".to_string(),
                address: "ss.central.example.org".to_string(),
                auth_certs: vec![cert("ss.central.example.org")],
                clients: vec![client("GOV/70000001/management")],
            },
        ],
        certification_authorities: vec![CertificationAuthority {
            name: "Test CA".to_string(),
            authentication_only: false,
            top_ca: CaInfo {
                cert: cert("ca.example.org"),
                ocsp: vec![OcspResponder {
                    url: "http://ocsp.example.org".to_string(),
                    cert: None,
                }],
            },
            intermediate_cas: vec![],
            certificate_profile_info: None,
        }],
        timestamping_authorities: vec![TimestampingAuthority {
            name: "Test TSA".to_string(),
            url: "http://tsa.example.org".to_string(),
            cert: cert("tsa.example.org"),
        }],
        global_groups: vec![GlobalGroup {
            group_code: "security-server-owners".to_string(),
            description: "Security server owners".to_string(),
            members: vec![client("COM/12345"), client("GOV/70000001")],
        }],
        configuration_sources: vec![ConfigurationSource {
            download_url: "http://central.example.org/internalconf".to_string(),
            verification_certs: vec![cert("conf-a.example.org"), cert("conf-b.example.org")],
        }],
        management_service: ManagementService {
            auth_cert_reg_service_address: "https://central.example.org:4002/managementservice/"
                .to_string(),
            auth_cert_reg_service_cert: cert("mgmt.example.org"),
            service_provider: client("GOV/70000001/management"),
            security_server: None,
        },
        global_settings: GlobalSettings::default(),
    }
}
