//! # Semantic Rules
//!
//! Cross-reference checks that JSON Schema cannot express. They run only on
//! documents that already passed their schema, so structural shape is
//! guaranteed; lookups still degrade to "absent" rather than panicking.
//!
//! Every violation carries the JSON Pointer of the offending element.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use fedconf_core::{CertificateBytes, ConfigurationVersion, Violation};

/// `(memberClass, memberCode)`
type MemberKey = (String, String);

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn items<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = (usize, &'a Value)> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.as_slice())
        .unwrap_or_default()
        .iter()
        .enumerate()
}

fn member_key(value: &Value) -> MemberKey {
    (
        text(value, "memberClass").to_string(),
        text(value, "memberCode").to_string(),
    )
}

fn describe(key: &MemberKey) -> String {
    format!("{}/{}", key.0, key.1)
}

/// Checks that a base64 certificate decodes and parses as X.509.
fn check_certificate(value: Option<&Value>, path: String, out: &mut Vec<Violation>) {
    let Some(encoded) = value.and_then(Value::as_str) else {
        return;
    };
    let Ok(bytes) = CertificateBytes::from_base64(encoded) else {
        out.push(Violation::new(path, "certificate is not valid base64"));
        return;
    };
    if fedconf_cert::parse_der(bytes.as_bytes()).is_err() {
        out.push(Violation::new(path, "certificate is not a well-formed X.509 certificate"));
    }
}

/// Semantic rules for private parameters.
pub fn check_private(version: ConfigurationVersion, doc: &Value) -> Vec<Violation> {
    let mut out = Vec::new();
    let anchor = doc.get("configurationAnchor").unwrap_or(&Value::Null);
    for (i, source) in items(anchor, "sources") {
        if version == ConfigurationVersion::V1 {
            check_certificate(
                source.get("verificationCert"),
                format!("/configurationAnchor/sources/{i}/verificationCert"),
                &mut out,
            );
        } else {
            for (j, cert) in items(source, "verificationCerts") {
                check_certificate(
                    Some(cert),
                    format!("/configurationAnchor/sources/{i}/verificationCerts/{j}"),
                    &mut out,
                );
            }
        }
    }

    let management = doc.get("managementService").unwrap_or(&Value::Null);
    check_certificate(
        management.get("authCertRegServiceCert"),
        "/managementService/authCertRegServiceCert".to_string(),
        &mut out,
    );

    if version >= ConfigurationVersion::V2 {
        check_private_operator(doc, management, &mut out);
    }
    out
}

fn check_private_operator(doc: &Value, management: &Value, out: &mut Vec<Violation>) {
    let operator = member_key(doc.get("operator").unwrap_or(&Value::Null));

    let mut server_codes = HashSet::new();
    for (i, server) in items(doc, "securityServers") {
        let owner = member_key(server.get("owner").unwrap_or(&Value::Null));
        if owner != operator {
            out.push(Violation::new(
                format!("/securityServers/{i}/owner"),
                format!(
                    "server owner {} is not the operator {}",
                    describe(&owner),
                    describe(&operator)
                ),
            ));
        }
        let code = text(server, "serverCode");
        if !server_codes.insert(code) {
            out.push(Violation::new(
                format!("/securityServers/{i}/serverCode"),
                format!("duplicate server code \"{code}\""),
            ));
        }
    }

    let provider = member_key(
        management
            .get("managementRequestServiceProviderId")
            .unwrap_or(&Value::Null),
    );
    if provider != operator {
        out.push(Violation::new(
            "/managementService/managementRequestServiceProviderId",
            format!(
                "management service provider {} is not the operator {}",
                describe(&provider),
                describe(&operator)
            ),
        ));
    }

    let server_code = text(management, "managementRequestServiceServerCode");
    if !server_codes.contains(server_code) {
        out.push(Violation::new(
            "/managementService/managementRequestServiceServerCode",
            format!("server code \"{server_code}\" does not reference a listed security server"),
        ));
    }
}

/// Semantic rules for shared parameters.
pub fn check_shared(version: ConfigurationVersion, doc: &Value) -> Vec<Violation> {
    let mut out = Vec::new();

    let declared_classes: Option<HashSet<&str>> = if version >= ConfigurationVersion::V2 {
        let settings = doc.get("globalSettings").unwrap_or(&Value::Null);
        let mut classes = HashSet::new();
        for (i, class) in items(settings, "memberClasses") {
            let code = text(class, "code");
            if !classes.insert(code) {
                out.push(Violation::new(
                    format!("/globalSettings/memberClasses/{i}/code"),
                    format!("duplicate member class \"{code}\""),
                ));
            }
        }
        Some(classes)
    } else {
        None
    };

    // member -> its subsystems
    let mut members: HashMap<MemberKey, HashSet<&str>> = HashMap::new();
    for (i, member) in items(doc, "members") {
        let key = member_key(member);
        if let Some(classes) = &declared_classes {
            if !classes.contains(key.0.as_str()) {
                out.push(Violation::new(
                    format!("/members/{i}/memberClass"),
                    format!("member class \"{}\" is not declared in globalSettings", key.0),
                ));
            }
        }
        let subsystems = items(member, "subsystems")
            .filter_map(|(_, s)| s.as_str())
            .collect();
        if members.insert(key.clone(), subsystems).is_some() {
            out.push(Violation::new(
                format!("/members/{i}"),
                format!("duplicate member {}", describe(&key)),
            ));
        }
    }

    let resolve_client = |client: &Value, path: String, out: &mut Vec<Violation>| {
        let key = member_key(client);
        match members.get(&key) {
            None => out.push(Violation::new(
                path,
                format!("member {} is not registered", describe(&key)),
            )),
            Some(subsystems) => {
                if let Some(sub) = client.get("subsystemCode").and_then(Value::as_str) {
                    if !subsystems.contains(sub) {
                        out.push(Violation::new(
                            path,
                            format!("subsystem \"{sub}\" is not registered for {}", describe(&key)),
                        ));
                    }
                }
            }
        }
    };

    let mut servers = HashSet::new();
    let mut hashes: HashMap<&str, usize> = HashMap::new();
    for (i, server) in items(doc, "securityServers") {
        let owner = member_key(server.get("owner").unwrap_or(&Value::Null));
        if !members.contains_key(&owner) {
            out.push(Violation::new(
                format!("/securityServers/{i}/owner"),
                format!("owner {} is not a registered member", describe(&owner)),
            ));
        }
        let code = text(server, "serverCode");
        if !servers.insert((owner.clone(), code)) {
            out.push(Violation::new(
                format!("/securityServers/{i}/serverCode"),
                format!("duplicate security server {}/{code}", describe(&owner)),
            ));
        }
        for (j, hash) in items(server, "authCertHashes") {
            let Some(hash) = hash.as_str() else { continue };
            if let Some(first) = hashes.insert(hash, i) {
                if first != i {
                    out.push(Violation::new(
                        format!("/securityServers/{i}/authCertHashes/{j}"),
                        format!("authentication certificate already registered to /securityServers/{first}"),
                    ));
                }
            }
        }
        for (j, client) in items(server, "clients") {
            resolve_client(client, format!("/securityServers/{i}/clients/{j}"), &mut out);
        }
    }

    let mut groups = HashSet::new();
    for (i, group) in items(doc, "globalGroups") {
        let code = text(group, "groupCode");
        if !groups.insert(code) {
            out.push(Violation::new(
                format!("/globalGroups/{i}/groupCode"),
                format!("duplicate global group \"{code}\""),
            ));
        }
        for (j, member) in items(group, "members") {
            resolve_client(member, format!("/globalGroups/{i}/members/{j}"), &mut out);
        }
    }

    check_trust_services(doc, &mut out);
    out
}

fn check_trust_services(doc: &Value, out: &mut Vec<Violation>) {
    let mut names = HashSet::new();
    for (i, ca) in items(doc, "approvedCAs") {
        let name = text(ca, "name");
        if !names.insert(name) {
            out.push(Violation::new(
                format!("/approvedCAs/{i}/name"),
                format!("duplicate certification authority \"{name}\""),
            ));
        }
        let top = ca.get("topCA").unwrap_or(&Value::Null);
        check_ca_info(top, format!("/approvedCAs/{i}/topCA"), out);
        for (k, intermediate) in items(ca, "intermediateCAs") {
            check_ca_info(intermediate, format!("/approvedCAs/{i}/intermediateCAs/{k}"), out);
        }
    }
    for (i, tsa) in items(doc, "approvedTSAs") {
        check_certificate(tsa.get("cert"), format!("/approvedTSAs/{i}/cert"), out);
    }
}

fn check_ca_info(info: &Value, path: String, out: &mut Vec<Violation>) {
    check_certificate(info.get("cert"), format!("{path}/cert"), out);
    for (m, responder) in items(info, "ocsp") {
        check_certificate(responder.get("cert"), format!("{path}/ocsp/{m}/cert"), out);
    }
}
