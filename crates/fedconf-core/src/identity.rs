//! # Identifiers
//!
//! Federation participants are identified by `(memberClass, memberCode)`,
//! optionally narrowed to a subsystem. Security servers are identified by
//! their owner plus a server code unique within that owner.
//!
//! Identifier parts are validated at construction time, including when
//! deserialized: a part must be non-empty and must not contain `/`, which is
//! the separator of the textual form `CLASS/CODE[/SUBSYSTEM]`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn check_part(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.contains('/') {
        return Err(ValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Identifies a federation member.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawMemberId")]
pub struct MemberId {
    member_class: String,
    member_code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMemberId {
    member_class: String,
    member_code: String,
}

impl TryFrom<RawMemberId> for MemberId {
    type Error = ValidationError;

    fn try_from(raw: RawMemberId) -> Result<Self, Self::Error> {
        Self::new(raw.member_class, raw.member_code)
    }
}

impl MemberId {
    /// Construct a member identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidIdentifier`] for an empty part or a
    /// part containing `/`.
    pub fn new(
        member_class: impl Into<String>,
        member_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let member_class = member_class.into();
        let member_code = member_code.into();
        check_part("memberClass", &member_class)?;
        check_part("memberCode", &member_code)?;
        Ok(Self {
            member_class,
            member_code,
        })
    }

    /// The member class (e.g. `GOV`, `COM`).
    pub fn member_class(&self) -> &str {
        &self.member_class
    }

    /// The member code, unique within its class.
    pub fn member_code(&self) -> &str {
        &self.member_code
    }

    /// A client identifier for the member itself (no subsystem).
    pub fn as_client(&self) -> ClientId {
        ClientId {
            member: self.clone(),
            subsystem_code: None,
        }
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.member_class, self.member_code)
    }
}

/// Identifies a member or one of its subsystems as a service client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawClientId")]
pub struct ClientId {
    #[serde(flatten)]
    member: MemberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subsystem_code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientId {
    member_class: String,
    member_code: String,
    #[serde(default)]
    subsystem_code: Option<String>,
}

impl TryFrom<RawClientId> for ClientId {
    type Error = ValidationError;

    fn try_from(raw: RawClientId) -> Result<Self, Self::Error> {
        let member = MemberId::new(raw.member_class, raw.member_code)?;
        match raw.subsystem_code {
            Some(code) => Self::subsystem(member, code),
            None => Ok(member.as_client()),
        }
    }
}

impl ClientId {
    /// A client identifier naming a subsystem of `member`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidIdentifier`] for an invalid code.
    pub fn subsystem(
        member: MemberId,
        subsystem_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let subsystem_code = subsystem_code.into();
        check_part("subsystemCode", &subsystem_code)?;
        Ok(Self {
            member,
            subsystem_code: Some(subsystem_code),
        })
    }

    /// The owning member.
    pub fn member(&self) -> &MemberId {
        &self.member
    }

    /// The subsystem code, if this identifies a subsystem.
    pub fn subsystem_code(&self) -> Option<&str> {
        self.subsystem_code.as_deref()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subsystem_code {
            Some(sub) => write!(f, "{}/{sub}", self.member),
            None => write!(f, "{}", self.member),
        }
    }
}

impl std::str::FromStr for ClientId {
    type Err = ValidationError;

    /// Parses `CLASS/CODE` or `CLASS/CODE/SUBSYSTEM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [class, code] => Ok(MemberId::new(*class, *code)?.as_client()),
            [class, code, sub] => Self::subsystem(MemberId::new(*class, *code)?, *sub),
            _ => Err(ValidationError::InvalidIdentifier {
                field: "clientId",
                value: s.to_string(),
            }),
        }
    }
}

/// Identifies a security server by owner and server code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityServerId {
    /// The member operating the server.
    pub owner: MemberId,
    /// Server code, unique within the owner.
    pub server_code: String,
}

impl std::fmt::Display for SecurityServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.server_code)
    }
}
