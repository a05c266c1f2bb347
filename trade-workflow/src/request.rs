//! Typed invocation requests
//!
//! The host delivers a function name and a flat list of string arguments.
//! This module turns them into an [`Operation`] and a typed [`Invocation`]
//! so argument validation happens once, before any handler runs.

use crate::access::Role;
use crate::documents::ShipmentLocation;
use crate::roles::RoleSlot;
use crate::{Error, Result};
use std::fmt;

/// Workflow operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Importer requests a trade
    RequestTrade,
    /// Exporting entity accepts a trade
    AcceptTrade,
    /// Importer requests a letter of credit
    RequestLc,
    /// Importer's bank issues the letter of credit
    IssueLc,
    /// Exporter's bank accepts the letter of credit
    AcceptLc,
    /// Exporting entity requests an export license
    RequestEl,
    /// Regulatory authority issues the export license
    IssueEl,
    /// Exporting entity prepares the shipment
    PrepareShipment,
    /// Carrier accepts the shipment and issues a bill of lading
    AcceptShipmentAndIssueBl,
    /// Carrier reports a new shipment location
    UpdateShipmentLocation,
    /// Exporting entity requests a payment tranche
    RequestPayment,
    /// Importer's bank pays the requested tranche
    MakePayment,
    /// Trade agreement status
    GetTradeStatus,
    /// Letter of credit status
    GetLcStatus,
    /// Export license status
    GetElStatus,
    /// Shipment location
    GetShipmentLocation,
    /// Bill of lading
    GetBillOfLading,
    /// Exporter or importer account balance
    GetAccountBalance,
}

const SHIPMENT_OBSERVERS: &[Role] = &[
    Role::Importer,
    Role::Exporter,
    Role::ExportingEntity,
    Role::Carrier,
];
const TRADE_OBSERVERS: &[Role] = &[Role::Importer, Role::Exporter, Role::ExportingEntity];

impl Operation {
    /// Every operation
    pub const ALL: [Operation; 18] = [
        Operation::RequestTrade,
        Operation::AcceptTrade,
        Operation::RequestLc,
        Operation::IssueLc,
        Operation::AcceptLc,
        Operation::RequestEl,
        Operation::IssueEl,
        Operation::PrepareShipment,
        Operation::AcceptShipmentAndIssueBl,
        Operation::UpdateShipmentLocation,
        Operation::RequestPayment,
        Operation::MakePayment,
        Operation::GetTradeStatus,
        Operation::GetLcStatus,
        Operation::GetElStatus,
        Operation::GetShipmentLocation,
        Operation::GetBillOfLading,
        Operation::GetAccountBalance,
    ];

    /// Parse a function name
    pub fn parse(function: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == function)
            .ok_or_else(|| Error::UnknownFunction(function.to_string()))
    }

    /// Function name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RequestTrade => "requestTrade",
            Operation::AcceptTrade => "acceptTrade",
            Operation::RequestLc => "requestLC",
            Operation::IssueLc => "issueLC",
            Operation::AcceptLc => "acceptLC",
            Operation::RequestEl => "requestEL",
            Operation::IssueEl => "issueEL",
            Operation::PrepareShipment => "prepareShipment",
            Operation::AcceptShipmentAndIssueBl => "acceptShipmentAndIssueBL",
            Operation::UpdateShipmentLocation => "updateShipmentLocation",
            Operation::RequestPayment => "requestPayment",
            Operation::MakePayment => "makePayment",
            Operation::GetTradeStatus => "getTradeStatus",
            Operation::GetLcStatus => "getLCStatus",
            Operation::GetElStatus => "getELStatus",
            Operation::GetShipmentLocation => "getShipmentLocation",
            Operation::GetBillOfLading => "getBillOfLading",
            Operation::GetAccountBalance => "getAccountBalance",
        }
    }

    /// Roles admitted before arguments are known.
    ///
    /// `getAccountBalance` admits the union here; the balance holder narrows
    /// it once parsed (see [`Invocation::allowed_roles`]).
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::RequestTrade
            | Operation::RequestLc
            | Operation::IssueLc
            | Operation::MakePayment => &[Role::Importer],
            Operation::AcceptTrade
            | Operation::RequestEl
            | Operation::PrepareShipment
            | Operation::RequestPayment => &[Role::ExportingEntity],
            Operation::AcceptLc => &[Role::Exporter],
            Operation::IssueEl => &[Role::RegulatoryAuthority],
            Operation::AcceptShipmentAndIssueBl | Operation::UpdateShipmentLocation => {
                &[Role::Carrier]
            }
            Operation::GetTradeStatus | Operation::GetLcStatus => TRADE_OBSERVERS,
            Operation::GetElStatus => &[Role::ExportingEntity, Role::RegulatoryAuthority],
            Operation::GetShipmentLocation | Operation::GetBillOfLading => SHIPMENT_OBSERVERS,
            Operation::GetAccountBalance => {
                &[Role::Exporter, Role::ExportingEntity, Role::Importer]
            }
        }
    }

    /// Whether the operation only reads
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Operation::GetTradeStatus
                | Operation::GetLcStatus
                | Operation::GetElStatus
                | Operation::GetShipmentLocation
                | Operation::GetBillOfLading
                | Operation::GetAccountBalance
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations addressing a trade by identifier only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRef {
    /// Trade identifier
    pub trade_id: String,
}

/// `requestTrade` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTrade {
    /// Trade identifier
    pub trade_id: String,
    /// Trade amount
    pub amount: i64,
    /// Goods being traded
    pub description_of_goods: String,
}

/// `issueLC` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLc {
    /// Trade identifier
    pub trade_id: String,
    /// L/C identifier
    pub lc_id: String,
    /// Expiration date
    pub expiration_date: String,
    /// Required documents, in order
    pub documents: Vec<String>,
}

/// `issueEL` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEl {
    /// Trade identifier
    pub trade_id: String,
    /// E/L identifier
    pub el_id: String,
    /// Expiration date
    pub expiration_date: String,
}

/// `acceptShipmentAndIssueBL` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueBillOfLading {
    /// Trade identifier
    pub trade_id: String,
    /// B/L identifier
    pub bl_id: String,
    /// Expiration date
    pub expiration_date: String,
    /// Port of loading
    pub source_port: String,
    /// Port of discharge
    pub destination_port: String,
}

/// `updateShipmentLocation` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateLocation {
    /// Trade identifier
    pub trade_id: String,
    /// New location
    pub location: ShipmentLocation,
}

/// Whose balance `getAccountBalance` reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountHolder {
    /// Exporter's account
    Exporter,
    /// Importer's account
    Importer,
}

impl AccountHolder {
    /// Case-insensitive `exporter` / `importer`
    pub fn parse(entity: &str) -> Result<Self> {
        match entity.to_lowercase().as_str() {
            "exporter" => Ok(AccountHolder::Exporter),
            "importer" => Ok(AccountHolder::Importer),
            _ => Err(Error::InvalidArguments(format!(
                "Invalid entity {}; Permissible values: {{exporter, importer}}",
                entity
            ))),
        }
    }

    /// Registry slot holding the balance
    pub fn slot(&self) -> RoleSlot {
        match self {
            AccountHolder::Exporter => RoleSlot::ExportersAccountBalance,
            AccountHolder::Importer => RoleSlot::ImportersAccountBalance,
        }
    }

    /// Roles allowed to read this balance
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            AccountHolder::Exporter => &[Role::Exporter, Role::ExportingEntity],
            AccountHolder::Importer => &[Role::Importer],
        }
    }
}

/// `getAccountBalance` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceQuery {
    /// Trade identifier (not used to locate the balance)
    pub trade_id: String,
    /// Account holder
    pub holder: AccountHolder,
}

/// A parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `requestTrade`
    RequestTrade(RequestTrade),
    /// `acceptTrade`
    AcceptTrade(TradeRef),
    /// `requestLC`
    RequestLc(TradeRef),
    /// `issueLC`
    IssueLc(IssueLc),
    /// `acceptLC`
    AcceptLc(TradeRef),
    /// `requestEL`
    RequestEl(TradeRef),
    /// `issueEL`
    IssueEl(IssueEl),
    /// `prepareShipment`
    PrepareShipment(TradeRef),
    /// `acceptShipmentAndIssueBL`
    AcceptShipmentAndIssueBl(IssueBillOfLading),
    /// `updateShipmentLocation`
    UpdateShipmentLocation(UpdateLocation),
    /// `requestPayment`
    RequestPayment(TradeRef),
    /// `makePayment`
    MakePayment(TradeRef),
    /// `getTradeStatus`
    GetTradeStatus(TradeRef),
    /// `getLCStatus`
    GetLcStatus(TradeRef),
    /// `getELStatus`
    GetElStatus(TradeRef),
    /// `getShipmentLocation`
    GetShipmentLocation(TradeRef),
    /// `getBillOfLading`
    GetBillOfLading(TradeRef),
    /// `getAccountBalance`
    GetAccountBalance(BalanceQuery),
}

fn expect_args(args: &[String], count: usize, signature: &str) -> Result<()> {
    if args.len() != count {
        return Err(Error::InvalidArguments(format!(
            "Incorrect number of arguments. Expecting {}: {}. Found {}",
            count,
            signature,
            args.len()
        )));
    }
    Ok(())
}

fn trade_ref(args: &[String], signature: &str) -> Result<TradeRef> {
    expect_args(args, 1, signature)?;
    Ok(TradeRef {
        trade_id: args[0].clone(),
    })
}

fn parse_amount(raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(amount) if amount >= 0 => Ok(amount),
        _ => Err(Error::InvalidArguments(format!(
            "Amount must be a non-negative integer. Found {}",
            raw
        ))),
    }
}

impl Invocation {
    /// Validate and type the arguments of `operation`
    pub fn parse(operation: Operation, args: &[String]) -> Result<Self> {
        const TRADE_ID: &str = "{Trade ID}";
        const QUERY: &str = "<trade ID>";

        let invocation = match operation {
            Operation::RequestTrade => {
                expect_args(args, 3, "{ID, Amount, Description of Goods}")?;
                Invocation::RequestTrade(RequestTrade {
                    trade_id: args[0].clone(),
                    amount: parse_amount(&args[1])?,
                    description_of_goods: args[2].clone(),
                })
            }
            Operation::AcceptTrade => Invocation::AcceptTrade(trade_ref(args, "{ID}")?),
            Operation::RequestLc => Invocation::RequestLc(trade_ref(args, TRADE_ID)?),
            Operation::IssueLc => {
                if args.len() < 3 {
                    return Err(Error::InvalidArguments(format!(
                        "Incorrect number of arguments. Expecting at least 3: {{Trade ID, L/C ID, Expiry Date}} [List of Documents]. Found {}",
                        args.len()
                    )));
                }
                Invocation::IssueLc(IssueLc {
                    trade_id: args[0].clone(),
                    lc_id: args[1].clone(),
                    expiration_date: args[2].clone(),
                    documents: args[3..].to_vec(),
                })
            }
            Operation::AcceptLc => Invocation::AcceptLc(trade_ref(args, TRADE_ID)?),
            Operation::RequestEl => Invocation::RequestEl(trade_ref(args, TRADE_ID)?),
            Operation::IssueEl => {
                expect_args(args, 3, "{Trade ID, E/L ID, Expiry Date}")?;
                Invocation::IssueEl(IssueEl {
                    trade_id: args[0].clone(),
                    el_id: args[1].clone(),
                    expiration_date: args[2].clone(),
                })
            }
            Operation::PrepareShipment => Invocation::PrepareShipment(trade_ref(args, TRADE_ID)?),
            Operation::AcceptShipmentAndIssueBl => {
                expect_args(
                    args,
                    5,
                    "{Trade ID, B/L ID, Expiration Date, Source Port, Destination Port}",
                )?;
                Invocation::AcceptShipmentAndIssueBl(IssueBillOfLading {
                    trade_id: args[0].clone(),
                    bl_id: args[1].clone(),
                    expiration_date: args[2].clone(),
                    source_port: args[3].clone(),
                    destination_port: args[4].clone(),
                })
            }
            Operation::UpdateShipmentLocation => {
                expect_args(args, 2, "{Trade ID, Location}")?;
                if args[1].is_empty() {
                    return Err(Error::InvalidArguments(
                        "Location must not be empty".to_string(),
                    ));
                }
                Invocation::UpdateShipmentLocation(UpdateLocation {
                    trade_id: args[0].clone(),
                    location: ShipmentLocation::parse(&args[1]),
                })
            }
            Operation::RequestPayment => Invocation::RequestPayment(trade_ref(args, TRADE_ID)?),
            Operation::MakePayment => Invocation::MakePayment(trade_ref(args, TRADE_ID)?),
            Operation::GetTradeStatus => Invocation::GetTradeStatus(trade_ref(args, QUERY)?),
            Operation::GetLcStatus => Invocation::GetLcStatus(trade_ref(args, QUERY)?),
            Operation::GetElStatus => Invocation::GetElStatus(trade_ref(args, QUERY)?),
            Operation::GetShipmentLocation => {
                Invocation::GetShipmentLocation(trade_ref(args, QUERY)?)
            }
            Operation::GetBillOfLading => Invocation::GetBillOfLading(trade_ref(args, QUERY)?),
            Operation::GetAccountBalance => {
                expect_args(args, 2, "{Trade ID, Entity}")?;
                Invocation::GetAccountBalance(BalanceQuery {
                    trade_id: args[0].clone(),
                    holder: AccountHolder::parse(&args[1])?,
                })
            }
        };

        Ok(invocation)
    }

    /// The operation this invocation performs
    pub fn operation(&self) -> Operation {
        match self {
            Invocation::RequestTrade(_) => Operation::RequestTrade,
            Invocation::AcceptTrade(_) => Operation::AcceptTrade,
            Invocation::RequestLc(_) => Operation::RequestLc,
            Invocation::IssueLc(_) => Operation::IssueLc,
            Invocation::AcceptLc(_) => Operation::AcceptLc,
            Invocation::RequestEl(_) => Operation::RequestEl,
            Invocation::IssueEl(_) => Operation::IssueEl,
            Invocation::PrepareShipment(_) => Operation::PrepareShipment,
            Invocation::AcceptShipmentAndIssueBl(_) => Operation::AcceptShipmentAndIssueBl,
            Invocation::UpdateShipmentLocation(_) => Operation::UpdateShipmentLocation,
            Invocation::RequestPayment(_) => Operation::RequestPayment,
            Invocation::MakePayment(_) => Operation::MakePayment,
            Invocation::GetTradeStatus(_) => Operation::GetTradeStatus,
            Invocation::GetLcStatus(_) => Operation::GetLcStatus,
            Invocation::GetElStatus(_) => Operation::GetElStatus,
            Invocation::GetShipmentLocation(_) => Operation::GetShipmentLocation,
            Invocation::GetBillOfLading(_) => Operation::GetBillOfLading,
            Invocation::GetAccountBalance(_) => Operation::GetAccountBalance,
        }
    }

    /// Trade identifier addressed by this invocation
    pub fn trade_id(&self) -> &str {
        match self {
            Invocation::RequestTrade(r) => &r.trade_id,
            Invocation::IssueLc(r) => &r.trade_id,
            Invocation::IssueEl(r) => &r.trade_id,
            Invocation::AcceptShipmentAndIssueBl(r) => &r.trade_id,
            Invocation::UpdateShipmentLocation(r) => &r.trade_id,
            Invocation::GetAccountBalance(r) => &r.trade_id,
            Invocation::AcceptTrade(r)
            | Invocation::RequestLc(r)
            | Invocation::AcceptLc(r)
            | Invocation::RequestEl(r)
            | Invocation::PrepareShipment(r)
            | Invocation::RequestPayment(r)
            | Invocation::MakePayment(r)
            | Invocation::GetTradeStatus(r)
            | Invocation::GetLcStatus(r)
            | Invocation::GetElStatus(r)
            | Invocation::GetShipmentLocation(r)
            | Invocation::GetBillOfLading(r) => &r.trade_id,
        }
    }

    /// Roles admitted once arguments are known
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Invocation::GetAccountBalance(query) => query.holder.allowed_roles(),
            other => other.operation().allowed_roles(),
        }
    }
}

/// Typed role registry setup: nothing (keep current state) or all eight slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySetup {
    /// Exporter name
    pub exporter: String,
    /// Exporter's bank name
    pub exporters_bank: String,
    /// Exporter's opening balance
    pub exporters_balance: i64,
    /// Importer name
    pub importer: String,
    /// Importer's bank name
    pub importers_bank: String,
    /// Importer's opening balance
    pub importers_balance: i64,
    /// Carrier name
    pub carrier: String,
    /// Regulatory authority name
    pub regulator: String,
}

impl RegistrySetup {
    /// Parse setup arguments; `None` for an empty list
    pub fn parse(args: &[String]) -> Result<Option<Self>> {
        if args.is_empty() {
            return Ok(None);
        }

        expect_args(
            args,
            8,
            "{Exporter, Exporter's Bank, Exporter's Account Balance, Importer, Importer's Bank, Importer's Account Balance, Carrier, Regulatory Authority}",
        )?;

        let balance = |raw: &str, whose: &str| {
            raw.parse::<i64>().map_err(|_| {
                Error::InvalidArguments(format!(
                    "{} account balance must be an integer. Found {}",
                    whose, raw
                ))
            })
        };

        Ok(Some(Self {
            exporter: args[0].clone(),
            exporters_bank: args[1].clone(),
            exporters_balance: balance(&args[2], "Exporter's")?,
            importer: args[3].clone(),
            importers_bank: args[4].clone(),
            importers_balance: balance(&args[5], "Importer's")?,
            carrier: args[6].clone(),
            regulator: args[7].clone(),
        }))
    }

    /// Slot values in setup order
    pub fn entries(&self) -> Vec<(RoleSlot, String)> {
        vec![
            (RoleSlot::Exporter, self.exporter.clone()),
            (RoleSlot::ExportersBank, self.exporters_bank.clone()),
            (RoleSlot::ExportersAccountBalance, self.exporters_balance.to_string()),
            (RoleSlot::Importer, self.importer.clone()),
            (RoleSlot::ImportersBank, self.importers_bank.clone()),
            (RoleSlot::ImportersAccountBalance, self.importers_balance.to_string()),
            (RoleSlot::Carrier, self.carrier.clone()),
            (RoleSlot::RegulatoryAuthority, self.regulator.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.name()).unwrap(), op);
        }
        assert!(matches!(
            Operation::parse("delete"),
            Err(Error::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_request_trade_argument_checks() {
        let err = Invocation::parse(Operation::RequestTrade, &args(&["t1", "100"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incorrect number of arguments. Expecting 3: {ID, Amount, Description of Goods}. Found 2"
        );

        assert!(Invocation::parse(Operation::RequestTrade, &args(&["t1", "ten", "x"])).is_err());
        assert!(Invocation::parse(Operation::RequestTrade, &args(&["t1", "-5", "x"])).is_err());

        let parsed =
            Invocation::parse(Operation::RequestTrade, &args(&["t1", "50000", "Wood"])).unwrap();
        assert_eq!(parsed.trade_id(), "t1");
        assert_eq!(parsed.operation(), Operation::RequestTrade);
    }

    #[test]
    fn test_issue_lc_collects_documents_in_order() {
        let parsed = Invocation::parse(
            Operation::IssueLc,
            &args(&["t1", "lc1", "12/31/2099", "docA", "docB"]),
        )
        .unwrap();

        match parsed {
            Invocation::IssueLc(issue) => assert_eq!(issue.documents, vec!["docA", "docB"]),
            other => panic!("unexpected invocation {:?}", other),
        }

        assert!(Invocation::parse(Operation::IssueLc, &args(&["t1", "lc1"])).is_err());
    }

    #[test]
    fn test_update_location_rejects_empty() {
        let err =
            Invocation::parse(Operation::UpdateShipmentLocation, &args(&["t1", ""])).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Argument);
    }

    #[test]
    fn test_account_balance_entity() {
        let parsed =
            Invocation::parse(Operation::GetAccountBalance, &args(&["t1", "EXPORTER"])).unwrap();
        assert_eq!(parsed.allowed_roles(), &[Role::Exporter, Role::ExportingEntity]);

        let err = Invocation::parse(Operation::GetAccountBalance, &args(&["t1", "carrier"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid entity carrier; Permissible values: {exporter, importer}"
        );
    }

    #[test]
    fn test_registry_setup() {
        assert_eq!(RegistrySetup::parse(&[]).unwrap(), None);

        let err = RegistrySetup::parse(&args(&["a", "b", "c"])).unwrap_err();
        assert!(err.to_string().ends_with("Found 3"));

        let err = RegistrySetup::parse(&args(&["a", "b", "lots", "d", "e", "1", "g", "h"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Exporter's account balance must be an integer. Found lots"
        );

        let setup = RegistrySetup::parse(&args(&["a", "b", "10", "d", "e", "20", "g", "h"]))
            .unwrap()
            .unwrap();
        assert_eq!(setup.entries().len(), 8);
        assert_eq!(setup.importers_balance, 20);
    }
}
