//! Builders for document body fragments common to several versions.
//!
//! Every list is emitted in a normalized order so that two generations from
//! the same snapshot produce identical bodies.

use serde_json::{json, Map, Value};

use fedconf_core::{ClientId, ConfigurationVersion, DocumentKind};

use crate::generator::GenerationError;
use crate::registry::{
    CaInfo, CertificationAuthority, GlobalGroup, Member, RegistrySnapshot, SecurityServer,
    TimestampingAuthority,
};

pub(crate) fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub(crate) fn sorted_clients(clients: &[ClientId]) -> Vec<&ClientId> {
    let mut out: Vec<&ClientId> = clients.iter().collect();
    out.sort();
    out.dedup();
    out
}

pub(crate) fn auth_cert_hashes(server: &SecurityServer) -> Vec<String> {
    let mut hashes: Vec<String> = server.auth_certs.iter().map(|c| c.sha256_hex()).collect();
    hashes.sort();
    hashes.dedup();
    hashes
}

pub(crate) fn sorted_servers<'a>(
    servers: impl IntoIterator<Item = &'a SecurityServer>,
) -> Vec<&'a SecurityServer> {
    let mut out: Vec<&SecurityServer> = servers.into_iter().collect();
    out.sort_by(|a, b| (&a.owner, &a.server_code).cmp(&(&b.owner, &b.server_code)));
    out
}

pub(crate) fn members(snapshot: &RegistrySnapshot) -> Vec<Value> {
    let mut members: Vec<&Member> = snapshot.members.iter().collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));
    members
        .into_iter()
        .map(|m| {
            let mut subsystems = m.subsystems.clone();
            subsystems.sort();
            subsystems.dedup();
            json!({
                "memberClass": m.id.member_class(),
                "memberCode": m.id.member_code(),
                "name": m.name,
                "subsystems": subsystems,
            })
        })
        .collect()
}

pub(crate) fn security_servers(snapshot: &RegistrySnapshot) -> Vec<Value> {
    sorted_servers(&snapshot.security_servers)
        .into_iter()
        .map(|s| {
            json!({
                "owner": s.owner,
                "serverCode": s.server_code,
                "address": s.address,
                "authCertHashes": auth_cert_hashes(s),
                "clients": sorted_clients(&s.clients),
            })
        })
        .collect()
}

pub(crate) fn global_groups(snapshot: &RegistrySnapshot) -> Vec<Value> {
    let mut groups: Vec<&GlobalGroup> = snapshot.global_groups.iter().collect();
    groups.sort_by(|a, b| a.group_code.cmp(&b.group_code));
    groups
        .into_iter()
        .map(|g| {
            json!({
                "groupCode": g.group_code,
                "description": g.description,
                "members": sorted_clients(&g.members),
            })
        })
        .collect()
}

fn ca_info(info: &CaInfo) -> Value {
    let mut ocsp: Vec<Value> = info
        .ocsp
        .iter()
        .map(|r| match &r.cert {
            Some(cert) => json!({"url": r.url, "cert": cert}),
            None => json!({"url": r.url}),
        })
        .collect();
    ocsp.sort_by(|a, b| a["url"].as_str().cmp(&b["url"].as_str()));
    json!({"cert": info.cert, "ocsp": ocsp})
}

/// Approved CAs. `profile_default` is `Some` for versions that carry a
/// certificate profile, and is used when the registry holds none.
pub(crate) fn approved_cas(snapshot: &RegistrySnapshot, profile_default: Option<&str>) -> Vec<Value> {
    let mut cas: Vec<&CertificationAuthority> = snapshot.certification_authorities.iter().collect();
    cas.sort_by(|a, b| a.name.cmp(&b.name));
    cas.into_iter()
        .map(|ca| {
            let mut entry = json!({
                "name": ca.name,
                "authenticationOnly": ca.authentication_only,
                "topCA": ca_info(&ca.top_ca),
                "intermediateCAs": ca.intermediate_cas.iter().map(ca_info).collect::<Vec<_>>(),
            });
            if let Some(default) = profile_default {
                let profile = ca.certificate_profile_info.as_deref().unwrap_or(default);
                entry["certificateProfileInfo"] = json!(profile);
            }
            entry
        })
        .collect()
}

pub(crate) fn approved_tsas(snapshot: &RegistrySnapshot) -> Vec<Value> {
    let mut tsas: Vec<&TimestampingAuthority> = snapshot.timestamping_authorities.iter().collect();
    tsas.sort_by(|a, b| (&a.name, &a.url).cmp(&(&b.name, &b.url)));
    tsas.into_iter()
        .map(|t| json!({"name": t.name, "url": t.url, "cert": t.cert}))
        .collect()
}

/// Fails when the registry holds no configuration source; every version
/// needs at least one anchor source.
pub(crate) fn require_sources(
    version: ConfigurationVersion,
    snapshot: &RegistrySnapshot,
) -> Result<(), GenerationError> {
    if snapshot.configuration_sources.is_empty() {
        return Err(unrepresentable(
            DocumentKind::Private,
            version,
            "configurationSources",
            "no configuration source is registered",
        ));
    }
    Ok(())
}

/// Passes `value` through when it is a usable interval (at least one second).
pub(crate) fn positive_seconds(
    kind: DocumentKind,
    version: ConfigurationVersion,
    path: &str,
    value: u64,
) -> Result<u64, GenerationError> {
    if value == 0 {
        return Err(unrepresentable(kind, version, path, "must be at least 1 second"));
    }
    Ok(value)
}

pub(crate) fn unrepresentable(
    kind: DocumentKind,
    version: ConfigurationVersion,
    path: impl Into<String>,
    reason: impl Into<String>,
) -> GenerationError {
    GenerationError::Unrepresentable {
        kind,
        version,
        path: path.into(),
        reason: reason.into(),
    }
}
