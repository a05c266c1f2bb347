//! Trade documents and their lifecycle states
//!
//! Documents are stored as JSON. Status values serialize as `REQUESTED`,
//! `ACCEPTED`, and `ISSUED`; each document only admits the states its
//! lifecycle can reach.

use crate::{Error, Result};
use ledger_core::LedgerContext;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Value stored under the payment request key
pub const PAYMENT_REQUESTED: &[u8] = b"REQUESTED";

/// Trade agreement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Requested by the importer
    Requested,
    /// Accepted by the exporting side
    Accepted,
}

/// Letter of credit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LetterOfCreditStatus {
    /// Requested by the importer
    Requested,
    /// Issued by the importer's bank
    Issued,
    /// Accepted by the exporter's bank
    Accepted,
}

/// Export license status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportLicenseStatus {
    /// Requested by the exporting entity
    Requested,
    /// Issued by the regulatory authority
    Issued,
}

macro_rules! status_display {
    ($($ty:ty { $($variant:ident => $text:literal),+ $(,)? })+) => {
        $(
            impl $ty {
                /// Wire representation
                pub fn as_str(&self) -> &'static str {
                    match self {
                        $(Self::$variant => $text,)+
                    }
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

status_display! {
    TradeStatus { Requested => "REQUESTED", Accepted => "ACCEPTED" }
    LetterOfCreditStatus { Requested => "REQUESTED", Issued => "ISSUED", Accepted => "ACCEPTED" }
    ExportLicenseStatus { Requested => "REQUESTED", Issued => "ISSUED" }
}

/// Trade agreement between importer and exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAgreement {
    /// Total price
    pub amount: i64,

    /// Goods being traded
    #[serde(rename = "descriptionOfGoods")]
    pub description_of_goods: String,

    /// Status
    pub status: TradeStatus,

    /// Amount paid so far; never exceeds `amount`
    #[serde(rename = "payment")]
    pub payment_to_date: i64,
}

impl TradeAgreement {
    /// Amount still owed
    pub fn outstanding(&self) -> i64 {
        (self.amount - self.payment_to_date).max(0)
    }

    /// Whether the full amount has been paid
    pub fn is_settled(&self) -> bool {
        self.payment_to_date >= self.amount
    }
}

/// Letter of credit issued by the importer's bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterOfCredit {
    /// L/C identifier (empty until issued)
    pub id: String,

    /// Expiration date (empty until issued)
    pub expiration_date: String,

    /// Exporter name
    pub beneficiary: String,

    /// Trade amount
    pub amount: i64,

    /// Documents required for payment, in order
    pub documents: Vec<String>,

    /// Status
    pub status: LetterOfCreditStatus,
}

/// Export license granted by the regulatory authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLicense {
    /// E/L identifier (empty until issued)
    pub id: String,

    /// Expiration date (empty until issued)
    pub expiration_date: String,

    /// Exporter name
    pub exporter: String,

    /// Carrier name
    pub carrier: String,

    /// Goods being exported
    pub description_of_goods: String,

    /// Regulatory authority name
    pub approver: String,

    /// Status
    pub status: ExportLicenseStatus,
}

/// Bill of lading issued by the carrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillOfLading {
    /// B/L identifier
    pub id: String,

    /// Expiration date
    pub expiration_date: String,

    /// Exporter name
    pub exporter: String,

    /// Carrier name
    pub carrier: String,

    /// Goods shipped
    pub description_of_goods: String,

    /// Trade amount
    pub amount: i64,

    /// Importer's bank, holder of title once paid
    pub beneficiary: String,

    /// Port of loading
    pub source_port: String,

    /// Port of discharge
    pub destination_port: String,
}

/// Where a prepared shipment currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipmentLocation {
    /// Prepared, not yet departed
    Source,
    /// Arrived
    Destination,
    /// Any other reported location
    Other(String),
}

impl ShipmentLocation {
    const SOURCE: &'static str = "SOURCE";
    const DESTINATION: &'static str = "DESTINATION";

    /// Interpret a location token
    pub fn parse(token: &str) -> Self {
        match token {
            Self::SOURCE => ShipmentLocation::Source,
            Self::DESTINATION => ShipmentLocation::Destination,
            other => ShipmentLocation::Other(other.to_string()),
        }
    }

    /// Interpret stored bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Location token
    pub fn as_str(&self) -> &str {
        match self {
            ShipmentLocation::Source => Self::SOURCE,
            ShipmentLocation::Destination => Self::DESTINATION,
            ShipmentLocation::Other(token) => token,
        }
    }
}

impl fmt::Display for ShipmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read and decode a JSON document
pub fn load<T: DeserializeOwned>(ctx: &dyn LedgerContext, key: &str) -> Result<Option<T>> {
    match ctx.get_state(key)? {
        Some(bytes) if !bytes.is_empty() => Ok(Some(serde_json::from_slice(&bytes)?)),
        _ => Ok(None),
    }
}

/// Encode and write a JSON document
pub fn save<T: Serialize>(ctx: &mut dyn LedgerContext, key: &str, document: &T) -> Result<()> {
    let bytes = serde_json::to_vec(document)?;
    ctx.put_state(key, bytes)?;
    Ok(())
}

/// Read the shipment location, `None` when the shipment is not prepared
pub fn load_location(ctx: &dyn LedgerContext, key: &str) -> Result<Option<ShipmentLocation>> {
    match ctx.get_state(key)? {
        Some(bytes) if !bytes.is_empty() => Ok(Some(ShipmentLocation::from_bytes(&bytes))),
        _ => Ok(None),
    }
}

/// Single-field query payload such as `{"Status":"ISSUED"}`
pub fn projection(field: &str, value: &str) -> Result<Vec<u8>> {
    let mut object = serde_json::Map::new();
    object.insert(field.to_string(), serde_json::Value::String(value.to_string()));
    serde_json::to_vec(&object).map_err(Error::from)
}
