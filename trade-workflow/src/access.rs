//! Role-based access control
//!
//! Each [`Role`] maps to exactly one [`Credential`]. An operation names the
//! roles it accepts; a caller is authorized when its (organization, issuer)
//! pair equals the credential of any of them, both fields at once.

use crate::identity::CallerIdentity;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Organizational roles that can invoke workflow operations.
///
/// Banks authenticate with their organization's credential: the Importer's
/// Bank as [`Role::Importer`], the Exporter's Bank as [`Role::Exporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Buyer side, including the issuing bank
    Importer,
    /// Seller side bank
    Exporter,
    /// Seller side party requesting documents and payment
    ExportingEntity,
    /// Shipping company
    Carrier,
    /// Export licensing authority
    RegulatoryAuthority,
}

impl Role {
    /// Organization name used in denial messages
    pub fn org_label(&self) -> &'static str {
        match self {
            Role::Importer => "Importer",
            Role::Exporter => "Exporter",
            Role::ExportingEntity => "Exporting Entity",
            Role::Carrier => "Carrier",
            Role::RegulatoryAuthority => "Regulator",
        }
    }
}

/// An (organization, certificate issuer) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Organization (membership service) identifier
    pub organization: String,

    /// Certificate issuer common name
    pub issuer: String,
}

impl Credential {
    /// Create credential
    pub fn new(organization: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            issuer: issuer.into(),
        }
    }

    /// Strict equality on both fields
    pub fn matches(&self, caller: &CallerIdentity) -> bool {
        self.organization == caller.org_id && self.issuer == caller.cert_issuer
    }
}

/// The credential accepted for each role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialTable {
    /// Importer organization
    pub importer: Credential,

    /// Exporter organization
    pub exporter: Credential,

    /// Exporting entity organization
    pub exporting_entity: Credential,

    /// Carrier organization
    pub carrier: Credential,

    /// Regulator organization
    pub regulator: Credential,
}

impl Default for CredentialTable {
    fn default() -> Self {
        Self {
            importer: Credential::new("ImporterOrgMSP", "ca.importerorg.trade.com"),
            exporter: Credential::new("ExporterOrgMSP", "ca.exporterorg.trade.com"),
            exporting_entity: Credential::new(
                "ExportingEntityOrgMSP",
                "ca.exportingentityorg.trade.com",
            ),
            carrier: Credential::new("CarrierOrgMSP", "ca.carrierorg.trade.com"),
            regulator: Credential::new("RegulatorOrgMSP", "ca.regulatororg.trade.com"),
        }
    }
}

/// Which organization plays the exporting-entity role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportingEntityMode {
    /// A dedicated exporting entity organization
    #[default]
    Separate,
    /// The exporter organization itself
    Exporter,
}

impl ExportingEntityMode {
    /// Parse from a configuration string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "separate" => Some(ExportingEntityMode::Separate),
            "exporter" => Some(ExportingEntityMode::Exporter),
            _ => None,
        }
    }
}

/// Authorization strategy placed in front of every operation
#[derive(Debug, Clone)]
pub enum AccessGate {
    /// Compare the caller against the credential table
    Enforced {
        /// Role credentials
        credentials: CredentialTable,
        /// Exporting-entity resolution
        exporting_entity: ExportingEntityMode,
    },
    /// Admit every caller; only for isolated test harnesses
    Bypass,
}

impl AccessGate {
    /// Enforcing gate
    pub fn enforced(credentials: CredentialTable, exporting_entity: ExportingEntityMode) -> Self {
        AccessGate::Enforced {
            credentials,
            exporting_entity,
        }
    }

    /// Whether every caller is admitted
    pub fn is_bypass(&self) -> bool {
        matches!(self, AccessGate::Bypass)
    }

    /// Credential accepted for `role`
    pub fn credential_for(&self, role: Role) -> Option<&Credential> {
        match self {
            AccessGate::Bypass => None,
            AccessGate::Enforced {
                credentials,
                exporting_entity,
            } => Some(match role {
                Role::Importer => &credentials.importer,
                Role::Exporter => &credentials.exporter,
                Role::ExportingEntity => match exporting_entity {
                    ExportingEntityMode::Separate => &credentials.exporting_entity,
                    ExportingEntityMode::Exporter => &credentials.exporter,
                },
                Role::Carrier => &credentials.carrier,
                Role::RegulatoryAuthority => &credentials.regulator,
            }),
        }
    }

    /// Whether `caller` holds `role`
    pub fn holds(&self, caller: Option<&CallerIdentity>, role: Role) -> bool {
        match (self.credential_for(role), caller) {
            (None, _) => self.is_bypass(),
            (Some(credential), Some(caller)) => credential.matches(caller),
            (Some(_), None) => false,
        }
    }

    /// Admit the caller if it holds any of `allowed`
    pub fn authorize(&self, caller: Option<&CallerIdentity>, allowed: &[Role]) -> Result<()> {
        if self.is_bypass() || allowed.iter().any(|role| self.holds(caller, *role)) {
            return Ok(());
        }

        Err(Error::Unauthorized(denial_message(allowed)))
    }
}

/// `Caller not a member of Importer or Exporter Org. Access denied.`
pub fn denial_message(allowed: &[Role]) -> String {
    let orgs: Vec<&str> = allowed.iter().map(Role::org_label).collect();
    format!("Caller not a member of {} Org. Access denied.", orgs.join(" or "))
}
