//! Ledger key space for trade documents
//!
//! Every document of a trade lives under a composite key built from its
//! document tag and the trade identifier. Role registry slots use plain keys,
//! which never collide with composite keys.

use crate::Result;
use ledger_core::LedgerContext;

/// Document types stored per trade identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// Trade agreement
    Trade,
    /// Letter of credit
    LetterOfCredit,
    /// Export license
    ExportLicense,
    /// Shipment location marker
    ShipmentLocation,
    /// Bill of lading
    BillOfLading,
    /// Payment request marker
    Payment,
}

impl DocumentType {
    /// Every document type
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Trade,
        DocumentType::LetterOfCredit,
        DocumentType::ExportLicense,
        DocumentType::ShipmentLocation,
        DocumentType::BillOfLading,
        DocumentType::Payment,
    ];

    /// Composite key object type
    pub fn tag(&self) -> &'static str {
        match self {
            DocumentType::Trade => "Trade",
            DocumentType::LetterOfCredit => "LetterOfCredit",
            DocumentType::ExportLicense => "ExportLicense",
            DocumentType::ShipmentLocation => "Shipment",
            DocumentType::BillOfLading => "BillOfLading",
            DocumentType::Payment => "Payment",
        }
    }

    /// Short name used in messages
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Trade => "trade",
            DocumentType::LetterOfCredit => "L/C",
            DocumentType::ExportLicense => "E/L",
            DocumentType::ShipmentLocation => "shipment location",
            DocumentType::BillOfLading => "B/L",
            DocumentType::Payment => "payment request",
        }
    }

    /// Ledger key of this document for `trade_id`
    pub fn key<C: LedgerContext + ?Sized>(&self, ctx: &C, trade_id: &str) -> Result<String> {
        let key = match self {
            DocumentType::ShipmentLocation => {
                ctx.create_composite_key(self.tag(), &["Location", trade_id])?
            }
            _ => ctx.create_composite_key(self.tag(), &[trade_id])?,
        };
        Ok(key)
    }
}
