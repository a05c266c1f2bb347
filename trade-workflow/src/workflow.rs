//! Document lifecycle engine
//!
//! One handler per operation. Every handler reads the documents it depends
//! on, checks its preconditions, and only then writes; a rejected call
//! leaves no writes behind.
//!
//! # Lifecycle
//!
//! ```text
//! Trade:      REQUESTED ──acceptTrade──▶ ACCEPTED
//! L/C:        REQUESTED ──issueLC──▶ ISSUED ──acceptLC──▶ ACCEPTED
//! E/L:        REQUESTED ──issueEL──▶ ISSUED
//! Shipment:   (unset) ──prepareShipment──▶ SOURCE ──updateShipmentLocation──▶ ...
//! Payment:    (unset) ──requestPayment──▶ REQUESTED ──makePayment──▶ (unset)
//! ```

use crate::documents::{
    self, BillOfLading, ExportLicense, ExportLicenseStatus, LetterOfCredit, LetterOfCreditStatus,
    ShipmentLocation, TradeAgreement, TradeStatus, PAYMENT_REQUESTED,
};
use crate::keys::DocumentType;
use crate::payment::{self, InsufficientFundsPolicy, Tranche};
use crate::request::{
    BalanceQuery, Invocation, IssueBillOfLading, IssueEl, IssueLc, RequestTrade, TradeRef,
    UpdateLocation,
};
use crate::roles::{self, AccountBalances, RoleSlot};
use crate::{Error, Result};
use ledger_core::LedgerContext;

/// How an invocation concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State was written
    Applied,
    /// Target state already held; nothing written
    AlreadyDone,
    /// Read-only query
    Query,
}

impl Outcome {
    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::AlreadyDone => "already_done",
            Outcome::Query => "query",
        }
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Payload returned to the caller (empty for transitions)
    pub payload: Vec<u8>,

    /// How the invocation concluded
    pub outcome: Outcome,
}

impl Response {
    fn applied() -> Self {
        Self {
            payload: Vec::new(),
            outcome: Outcome::Applied,
        }
    }

    fn already_done() -> Self {
        Self {
            payload: Vec::new(),
            outcome: Outcome::AlreadyDone,
        }
    }

    fn query(payload: Vec<u8>) -> Self {
        Self {
            payload,
            outcome: Outcome::Query,
        }
    }
}

/// Executes typed invocations against a ledger context
#[derive(Debug, Clone, Default)]
pub struct LifecycleEngine {
    insufficient_funds: InsufficientFundsPolicy,
    reject_duplicate_trades: bool,
}

fn not_found(document: DocumentType, trade_id: &str) -> Error {
    match document {
        DocumentType::Trade => Error::NotFound(format!("No record found for trade ID {}", trade_id)),
        DocumentType::Payment => Error::NotFound("No payment request found".to_string()),
        other => Error::NotFound(format!("No {} found for trade ID {}", other.label(), trade_id)),
    }
}

fn precondition(message: &str) -> Error {
    Error::PreconditionFailed(message.to_string())
}

fn require<T>(document: Option<T>, kind: DocumentType, trade_id: &str) -> Result<T> {
    document.ok_or_else(|| not_found(kind, trade_id))
}

impl LifecycleEngine {
    /// Create engine
    pub fn new(insufficient_funds: InsufficientFundsPolicy, reject_duplicate_trades: bool) -> Self {
        Self {
            insufficient_funds,
            reject_duplicate_trades,
        }
    }

    /// Run one invocation
    pub fn execute(&self, ctx: &mut dyn LedgerContext, invocation: &Invocation) -> Result<Response> {
        match invocation {
            Invocation::RequestTrade(r) => self.request_trade(ctx, r),
            Invocation::AcceptTrade(r) => self.accept_trade(ctx, r),
            Invocation::RequestLc(r) => self.request_lc(ctx, r),
            Invocation::IssueLc(r) => self.issue_lc(ctx, r),
            Invocation::AcceptLc(r) => self.accept_lc(ctx, r),
            Invocation::RequestEl(r) => self.request_el(ctx, r),
            Invocation::IssueEl(r) => self.issue_el(ctx, r),
            Invocation::PrepareShipment(r) => self.prepare_shipment(ctx, r),
            Invocation::AcceptShipmentAndIssueBl(r) => self.accept_shipment_and_issue_bl(ctx, r),
            Invocation::UpdateShipmentLocation(r) => self.update_shipment_location(ctx, r),
            Invocation::RequestPayment(r) => self.request_payment(ctx, r),
            Invocation::MakePayment(r) => self.make_payment(ctx, r),
            Invocation::GetTradeStatus(r) => self.get_trade_status(ctx, r),
            Invocation::GetLcStatus(r) => self.get_lc_status(ctx, r),
            Invocation::GetElStatus(r) => self.get_el_status(ctx, r),
            Invocation::GetShipmentLocation(r) => self.get_shipment_location(ctx, r),
            Invocation::GetBillOfLading(r) => self.get_bill_of_lading(ctx, r),
            Invocation::GetAccountBalance(r) => self.get_account_balance(ctx, r),
        }
    }

    fn load_trade(&self, ctx: &dyn LedgerContext, trade_id: &str) -> Result<(String, TradeAgreement)> {
        let key = DocumentType::Trade.key(ctx, trade_id)?;
        let trade = require(documents::load(ctx, &key)?, DocumentType::Trade, trade_id)?;
        Ok((key, trade))
    }

    fn load_lc(&self, ctx: &dyn LedgerContext, trade_id: &str) -> Result<(String, LetterOfCredit)> {
        let key = DocumentType::LetterOfCredit.key(ctx, trade_id)?;
        let lc = require(documents::load(ctx, &key)?, DocumentType::LetterOfCredit, trade_id)?;
        Ok((key, lc))
    }

    fn load_el(&self, ctx: &dyn LedgerContext, trade_id: &str) -> Result<(String, ExportLicense)> {
        let key = DocumentType::ExportLicense.key(ctx, trade_id)?;
        let el = require(documents::load(ctx, &key)?, DocumentType::ExportLicense, trade_id)?;
        Ok((key, el))
    }

    fn load_prepared_location(
        &self,
        ctx: &dyn LedgerContext,
        trade_id: &str,
    ) -> Result<(String, ShipmentLocation)> {
        let key = DocumentType::ShipmentLocation.key(ctx, trade_id)?;
        match documents::load_location(ctx, &key)? {
            Some(location) => Ok((key, location)),
            None => {
                tracing::info!(trade_id, "Shipment has not been prepared yet");
                Err(precondition("Shipment not prepared yet"))
            }
        }
    }

    fn request_trade(&self, ctx: &mut dyn LedgerContext, req: &RequestTrade) -> Result<Response> {
        let key = DocumentType::Trade.key(&*ctx, &req.trade_id)?;

        if ctx.get_state(&key)?.is_some() {
            if self.reject_duplicate_trades {
                return Err(Error::PreconditionFailed(format!(
                    "Trade {} already exists",
                    req.trade_id
                )));
            }
            tracing::warn!(trade_id = %req.trade_id, "Overwriting existing trade agreement");
        }

        let trade = TradeAgreement {
            amount: req.amount,
            description_of_goods: req.description_of_goods.clone(),
            status: TradeStatus::Requested,
            payment_to_date: 0,
        };
        documents::save(ctx, &key, &trade)?;

        tracing::info!(trade_id = %req.trade_id, amount = req.amount, "Trade request recorded");
        Ok(Response::applied())
    }

    fn accept_trade(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (key, mut trade) = self.load_trade(&*ctx, &req.trade_id)?;

        match trade.status {
            TradeStatus::Accepted => {
                tracing::info!(trade_id = %req.trade_id, "Trade already accepted");
                Ok(Response::already_done())
            }
            TradeStatus::Requested => {
                trade.status = TradeStatus::Accepted;
                documents::save(ctx, &key, &trade)?;
                tracing::info!(trade_id = %req.trade_id, "Trade acceptance recorded");
                Ok(Response::applied())
            }
        }
    }

    fn request_lc(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (_, trade) = self.load_trade(&*ctx, &req.trade_id)?;
        if trade.status != TradeStatus::Accepted {
            return Err(precondition("Trade has not been accepted by the parties"));
        }

        let beneficiary = roles::name(&*ctx, RoleSlot::Exporter)?;
        let lc = LetterOfCredit {
            id: String::new(),
            expiration_date: String::new(),
            beneficiary,
            amount: trade.amount,
            documents: Vec::new(),
            status: LetterOfCreditStatus::Requested,
        };

        let key = DocumentType::LetterOfCredit.key(&*ctx, &req.trade_id)?;
        documents::save(ctx, &key, &lc)?;

        tracing::info!(trade_id = %req.trade_id, "Letter of Credit request recorded");
        Ok(Response::applied())
    }

    fn issue_lc(&self, ctx: &mut dyn LedgerContext, req: &IssueLc) -> Result<Response> {
        let (key, mut lc) = self.load_lc(&*ctx, &req.trade_id)?;

        match lc.status {
            LetterOfCreditStatus::Issued | LetterOfCreditStatus::Accepted => {
                tracing::info!(trade_id = %req.trade_id, status = %lc.status, "L/C already issued");
                Ok(Response::already_done())
            }
            LetterOfCreditStatus::Requested => {
                lc.id = req.lc_id.clone();
                lc.expiration_date = req.expiration_date.clone();
                lc.documents = req.documents.clone();
                lc.status = LetterOfCreditStatus::Issued;
                documents::save(ctx, &key, &lc)?;

                tracing::info!(
                    trade_id = %req.trade_id,
                    lc_id = %req.lc_id,
                    documents = req.documents.len(),
                    "L/C issuance recorded"
                );
                Ok(Response::applied())
            }
        }
    }

    fn accept_lc(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (key, mut lc) = self.load_lc(&*ctx, &req.trade_id)?;

        match lc.status {
            LetterOfCreditStatus::Accepted => {
                tracing::info!(trade_id = %req.trade_id, "L/C already accepted");
                Ok(Response::already_done())
            }
            LetterOfCreditStatus::Requested => {
                tracing::info!(trade_id = %req.trade_id, "L/C has not been issued");
                Err(precondition("L/C not issued yet"))
            }
            LetterOfCreditStatus::Issued => {
                lc.status = LetterOfCreditStatus::Accepted;
                documents::save(ctx, &key, &lc)?;
                tracing::info!(trade_id = %req.trade_id, "L/C acceptance recorded");
                Ok(Response::applied())
            }
        }
    }

    fn request_el(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (_, lc) = self.load_lc(&*ctx, &req.trade_id)?;
        if lc.status != LetterOfCreditStatus::Accepted {
            tracing::info!(trade_id = %req.trade_id, status = %lc.status, "L/C has not been accepted");
            return Err(precondition("L/C not accepted yet"));
        }

        let (_, trade) = self.load_trade(&*ctx, &req.trade_id)?;
        let el = ExportLicense {
            id: String::new(),
            expiration_date: String::new(),
            exporter: roles::name(&*ctx, RoleSlot::Exporter)?,
            carrier: roles::name(&*ctx, RoleSlot::Carrier)?,
            description_of_goods: trade.description_of_goods,
            approver: roles::name(&*ctx, RoleSlot::RegulatoryAuthority)?,
            status: ExportLicenseStatus::Requested,
        };

        let key = DocumentType::ExportLicense.key(&*ctx, &req.trade_id)?;
        documents::save(ctx, &key, &el)?;

        tracing::info!(trade_id = %req.trade_id, "Export License request recorded");
        Ok(Response::applied())
    }

    fn issue_el(&self, ctx: &mut dyn LedgerContext, req: &IssueEl) -> Result<Response> {
        let (key, mut el) = self.load_el(&*ctx, &req.trade_id)?;

        match el.status {
            ExportLicenseStatus::Issued => {
                tracing::info!(trade_id = %req.trade_id, "E/L has already been issued");
                Ok(Response::already_done())
            }
            ExportLicenseStatus::Requested => {
                el.id = req.el_id.clone();
                el.expiration_date = req.expiration_date.clone();
                el.status = ExportLicenseStatus::Issued;
                documents::save(ctx, &key, &el)?;

                tracing::info!(trade_id = %req.trade_id, el_id = %req.el_id, "Export License issuance recorded");
                Ok(Response::applied())
            }
        }
    }

    fn prepare_shipment(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let location_key = DocumentType::ShipmentLocation.key(&*ctx, &req.trade_id)?;

        match documents::load_location(&*ctx, &location_key)? {
            Some(ShipmentLocation::Source) => {
                tracing::info!(trade_id = %req.trade_id, "Shipment has already been prepared");
                return Ok(Response::already_done());
            }
            Some(location) => {
                tracing::info!(trade_id = %req.trade_id, %location, "Shipment has passed the preparation stage");
                return Err(precondition("Shipment past the preparation stage"));
            }
            None => {}
        }

        let (_, el) = self.load_el(&*ctx, &req.trade_id)?;
        if el.status != ExportLicenseStatus::Issued {
            tracing::info!(trade_id = %req.trade_id, "E/L has not been issued");
            return Err(precondition("E/L not issued yet"));
        }

        ctx.put_state(
            &location_key,
            ShipmentLocation::Source.as_str().as_bytes().to_vec(),
        )?;

        tracing::info!(trade_id = %req.trade_id, "Shipment preparation recorded");
        Ok(Response::applied())
    }

    fn accept_shipment_and_issue_bl(
        &self,
        ctx: &mut dyn LedgerContext,
        req: &IssueBillOfLading,
    ) -> Result<Response> {
        let (_, location) = self.load_prepared_location(&*ctx, &req.trade_id)?;
        if location != ShipmentLocation::Source {
            tracing::info!(trade_id = %req.trade_id, %location, "Shipment has passed the preparation stage");
            return Err(precondition("Shipment past the preparation stage"));
        }

        let bl_key = DocumentType::BillOfLading.key(&*ctx, &req.trade_id)?;
        if ctx.get_state(&bl_key)?.is_some() {
            tracing::info!(trade_id = %req.trade_id, "Bill of Lading already issued");
            return Ok(Response::already_done());
        }

        let (_, trade) = self.load_trade(&*ctx, &req.trade_id)?;
        let bill = BillOfLading {
            id: req.bl_id.clone(),
            expiration_date: req.expiration_date.clone(),
            exporter: roles::name(&*ctx, RoleSlot::Exporter)?,
            carrier: roles::name(&*ctx, RoleSlot::Carrier)?,
            description_of_goods: trade.description_of_goods,
            amount: trade.amount,
            beneficiary: roles::name(&*ctx, RoleSlot::ImportersBank)?,
            source_port: req.source_port.clone(),
            destination_port: req.destination_port.clone(),
        };
        documents::save(ctx, &bl_key, &bill)?;

        tracing::info!(trade_id = %req.trade_id, bl_id = %req.bl_id, "Bill of Lading recorded");
        Ok(Response::applied())
    }

    fn update_shipment_location(
        &self,
        ctx: &mut dyn LedgerContext,
        req: &UpdateLocation,
    ) -> Result<Response> {
        let (key, current) = self.load_prepared_location(&*ctx, &req.trade_id)?;
        if current == req.location {
            tracing::info!(trade_id = %req.trade_id, location = %req.location, "Shipment is already in location");
        }

        ctx.put_state(&key, req.location.as_str().as_bytes().to_vec())?;

        tracing::info!(trade_id = %req.trade_id, location = %req.location, "Shipment location recorded");
        Ok(Response::applied())
    }

    fn request_payment(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (_, trade) = self.load_trade(&*ctx, &req.trade_id)?;
        let (_, location) = self.load_prepared_location(&*ctx, &req.trade_id)?;

        let payment_key = DocumentType::Payment.key(&*ctx, &req.trade_id)?;
        if ctx.get_state(&payment_key)?.is_some() {
            tracing::info!(trade_id = %req.trade_id, "Payment request already pending");
            return Err(precondition("Payment request already pending"));
        }

        tracing::info!(
            trade_id = %req.trade_id,
            paid = trade.payment_to_date,
            required = trade.amount,
            "Checking payment progress"
        );
        if trade.is_settled() {
            return Err(precondition("Payment already settled"));
        }
        if location == ShipmentLocation::Source && trade.payment_to_date != 0 {
            return Err(precondition("Partial payment already made"));
        }

        ctx.put_state(&payment_key, PAYMENT_REQUESTED.to_vec())?;

        tracing::info!(trade_id = %req.trade_id, "Payment request recorded");
        Ok(Response::applied())
    }

    fn make_payment(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let payment_key = DocumentType::Payment.key(&*ctx, &req.trade_id)?;
        if ctx.get_state(&payment_key)?.is_none() {
            tracing::info!(trade_id = %req.trade_id, "No payment request found");
            return Err(not_found(DocumentType::Payment, &req.trade_id));
        }

        let (trade_key, mut trade) = self.load_trade(&*ctx, &req.trade_id)?;
        let (_, location) = self.load_prepared_location(&*ctx, &req.trade_id)?;
        let mut balances = AccountBalances::load(&*ctx)?;

        let tranche = Tranche::compute(&location, &trade);
        payment::settle(&mut trade, &mut balances, tranche, self.insufficient_funds)?;

        documents::save(ctx, &trade_key, &trade)?;
        balances.store(ctx)?;
        ctx.del_state(&payment_key)?;

        tracing::info!(
            trade_id = %req.trade_id,
            tranche = tranche.amount(),
            paid = trade.payment_to_date,
            exporter_balance = balances.exporter,
            importer_balance = balances.importer,
            "Payment recorded"
        );
        Ok(Response::applied())
    }

    fn get_trade_status(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (_, trade) = self.load_trade(&*ctx, &req.trade_id)?;
        Ok(Response::query(documents::projection("Status", trade.status.as_str())?))
    }

    fn get_lc_status(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (_, lc) = self.load_lc(&*ctx, &req.trade_id)?;
        Ok(Response::query(documents::projection("Status", lc.status.as_str())?))
    }

    fn get_el_status(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let (_, el) = self.load_el(&*ctx, &req.trade_id)?;
        Ok(Response::query(documents::projection("Status", el.status.as_str())?))
    }

    fn get_shipment_location(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let key = DocumentType::ShipmentLocation.key(&*ctx, &req.trade_id)?;
        let location = require(
            documents::load_location(&*ctx, &key)?,
            DocumentType::ShipmentLocation,
            &req.trade_id,
        )?;
        Ok(Response::query(documents::projection("Location", location.as_str())?))
    }

    fn get_bill_of_lading(&self, ctx: &mut dyn LedgerContext, req: &TradeRef) -> Result<Response> {
        let key = DocumentType::BillOfLading.key(&*ctx, &req.trade_id)?;
        match ctx.get_state(&key)? {
            Some(bytes) if !bytes.is_empty() => Ok(Response::query(bytes)),
            _ => Err(not_found(DocumentType::BillOfLading, &req.trade_id)),
        }
    }

    fn get_account_balance(&self, ctx: &mut dyn LedgerContext, req: &BalanceQuery) -> Result<Response> {
        let balance = roles::balance(&*ctx, req.holder.slot())?;
        Ok(Response::query(documents::projection("Balance", &balance.to_string())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Operation, RegistrySetup};
    use ledger_core::{MemoryStore, StateStore, Transaction};

    fn run(store: &MemoryStore, function: &str, args: &[&str]) -> Result<Response> {
        let engine = LifecycleEngine::default();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let invocation = Invocation::parse(Operation::parse(function)?, &args)?;
        ledger_core::run_transaction(store, function, |tx: &mut Transaction<'_>| {
            engine.execute(tx, &invocation)
        })
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let args: Vec<String> = [
            "LumberInc",
            "LumberBank",
            "100000",
            "WoodenToys",
            "ToyBank",
            "200000",
            "UniversalFreight",
            "ForestryDepartment",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let setup = RegistrySetup::parse(&args).unwrap().unwrap();
        ledger_core::run_transaction(&store, "init", |tx: &mut Transaction<'_>| {
            roles::initialize(tx, &setup)
        })
        .unwrap();
        store
    }

    fn through_accepted_lc(store: &MemoryStore) {
        run(store, "requestTrade", &["t1", "50000", "Wood for Toys"]).unwrap();
        run(store, "acceptTrade", &["t1"]).unwrap();
        run(store, "requestLC", &["t1"]).unwrap();
        run(store, "issueLC", &["t1", "lc1", "12/31/2099", "docA"]).unwrap();
        run(store, "acceptLC", &["t1"]).unwrap();
    }

    #[test]
    fn test_accept_trade_missing_trade() {
        let store = seeded();
        let err = run(&store, "acceptTrade", &["nope"]).unwrap_err();
        assert_eq!(err.to_string(), "No record found for trade ID nope");
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn test_request_lc_requires_accepted_trade() {
        let store = seeded();
        run(&store, "requestTrade", &["t1", "100", "Goods"]).unwrap();

        let err = run(&store, "requestLC", &["t1"]).unwrap_err();
        assert_eq!(err.to_string(), "Trade has not been accepted by the parties");
    }

    #[test]
    fn test_issue_lc_is_idempotent_once_issued() {
        let store = seeded();
        through_accepted_lc(&store);

        let response = run(&store, "issueLC", &["t1", "lc2", "01/01/2100"]).unwrap();
        assert_eq!(response.outcome, Outcome::AlreadyDone);

        let status = run(&store, "getLCStatus", &["t1"]).unwrap();
        assert_eq!(status.payload, br#"{"Status":"ACCEPTED"}"#.to_vec());
    }

    #[test]
    fn test_request_el_copies_registry_names() {
        let store = seeded();
        through_accepted_lc(&store);
        run(&store, "requestEL", &["t1"]).unwrap();

        let tx = Transaction::begin(&store, "read").unwrap();
        let key = DocumentType::ExportLicense.key(&tx, "t1").unwrap();
        let el: ExportLicense = documents::load(&tx, &key).unwrap().unwrap();
        assert_eq!(el.exporter, "LumberInc");
        assert_eq!(el.carrier, "UniversalFreight");
        assert_eq!(el.approver, "ForestryDepartment");
        assert_eq!(el.description_of_goods, "Wood for Toys");
        assert_eq!(el.status, ExportLicenseStatus::Requested);
    }

    #[test]
    fn test_prepare_shipment_rules() {
        let store = seeded();
        through_accepted_lc(&store);
        run(&store, "requestEL", &["t1"]).unwrap();

        let err = run(&store, "prepareShipment", &["t1"]).unwrap_err();
        assert_eq!(err.to_string(), "E/L not issued yet");

        run(&store, "issueEL", &["t1", "el1", "12/31/2099"]).unwrap();
        assert_eq!(run(&store, "prepareShipment", &["t1"]).unwrap().outcome, Outcome::Applied);
        assert_eq!(
            run(&store, "prepareShipment", &["t1"]).unwrap().outcome,
            Outcome::AlreadyDone
        );

        run(&store, "updateShipmentLocation", &["t1", "DESTINATION"]).unwrap();
        let err = run(&store, "prepareShipment", &["t1"]).unwrap_err();
        assert_eq!(err.to_string(), "Shipment past the preparation stage");

        let err = run(
            &store,
            "acceptShipmentAndIssueBL",
            &["t1", "bl1", "12/31/2099", "Seattle", "Tokyo"],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Shipment past the preparation stage");
    }

    #[test]
    fn test_payment_requires_prepared_shipment() {
        let store = seeded();
        run(&store, "requestTrade", &["t1", "100", "Goods"]).unwrap();

        let err = run(&store, "requestPayment", &["t1"]).unwrap_err();
        assert_eq!(err.to_string(), "Shipment not prepared yet");

        let err = run(&store, "makePayment", &["t1"]).unwrap_err();
        assert_eq!(err.to_string(), "No payment request found");
    }

    #[test]
    fn test_rejected_payment_request_writes_nothing() {
        let store = seeded();
        through_accepted_lc(&store);
        run(&store, "requestEL", &["t1"]).unwrap();
        run(&store, "issueEL", &["t1", "el1", "12/31/2099"]).unwrap();
        run(&store, "prepareShipment", &["t1"]).unwrap();
        run(&store, "requestPayment", &["t1"]).unwrap();
        run(&store, "makePayment", &["t1"]).unwrap();

        let height = store.latest_commit().unwrap().unwrap().height;
        let err = run(&store, "requestPayment", &["t1"]).unwrap_err();
        assert_eq!(err.to_string(), "Partial payment already made");
        assert_eq!(store.latest_commit().unwrap().unwrap().height, height);
    }

    #[test]
    fn test_duplicate_trade_policy() {
        let store = seeded();
        run(&store, "requestTrade", &["t1", "100", "Goods"]).unwrap();
        run(&store, "requestTrade", &["t1", "200", "Other goods"]).unwrap();

        let status = run(&store, "getTradeStatus", &["t1"]).unwrap();
        assert_eq!(status.payload, br#"{"Status":"REQUESTED"}"#.to_vec());

        let strict = LifecycleEngine::new(InsufficientFundsPolicy::Warn, true);
        let invocation = Invocation::parse(
            Operation::RequestTrade,
            &["t1".to_string(), "300".to_string(), "More".to_string()],
        )
        .unwrap();
        let err = ledger_core::run_transaction(&store, "requestTrade", |tx: &mut Transaction<'_>| {
            strict.execute(tx, &invocation)
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Trade t1 already exists");
    }

    #[test]
    fn test_account_balance_query() {
        let store = seeded();
        let response = run(&store, "getAccountBalance", &["t1", "Importer"]).unwrap();
        assert_eq!(response.payload, br#"{"Balance":"200000"}"#.to_vec());
        assert_eq!(response.outcome, Outcome::Query);
    }
}
