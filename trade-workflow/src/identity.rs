//! Caller identity extraction
//!
//! The host hands every invocation an opaque creator credential. An
//! [`IdentityProvider`] turns it into the (organization, certificate issuer)
//! pair that access control compares against. Certificate verification is the
//! host's job; providers here only decode what the host already verified.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Per-invocation context supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Serialized creator credential
    pub creator: Vec<u8>,
}

impl InvocationContext {
    /// Wrap a raw creator credential
    pub fn new(creator: impl Into<Vec<u8>>) -> Self {
        Self {
            creator: creator.into(),
        }
    }

    /// Context for a member of `organization` whose certificate was issued by `issuer`
    pub fn for_member(organization: &str, issuer: &str) -> Self {
        let creator = serde_json::json!({
            "mspid": organization,
            "issuerCommonName": issuer,
        });
        Self::new(creator.to_string().into_bytes())
    }
}

/// Identity of the invoking party
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Organization (membership service) identifier
    pub org_id: String,

    /// Common name of the certificate issuer
    pub cert_issuer: String,
}

/// Extracts the caller identity from an invocation context
pub trait IdentityProvider: Send + Sync {
    /// Fails when the credential is empty or malformed
    fn identify(&self, ctx: &InvocationContext) -> Result<CallerIdentity>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedCreator {
    mspid: String,
    #[serde(rename = "issuerCommonName")]
    issuer_common_name: String,
}

/// Decodes a JSON creator record `{"mspid": ..., "issuerCommonName": ...}`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedCreatorProvider;

impl IdentityProvider for SerializedCreatorProvider {
    fn identify(&self, ctx: &InvocationContext) -> Result<CallerIdentity> {
        if ctx.creator.is_empty() {
            return Err(Error::Identity("Empty creator credential".to_string()));
        }

        let creator: SerializedCreator = serde_json::from_slice(&ctx.creator)
            .map_err(|e| Error::Identity(format!("Malformed creator credential: {}", e)))?;

        if creator.mspid.is_empty() {
            return Err(Error::Identity("Creator has no MSP identifier".to_string()));
        }
        if creator.issuer_common_name.is_empty() {
            return Err(Error::Identity("Creator certificate has no issuer".to_string()));
        }

        Ok(CallerIdentity {
            org_id: creator.mspid,
            cert_issuer: creator.issuer_common_name,
        })
    }
}
