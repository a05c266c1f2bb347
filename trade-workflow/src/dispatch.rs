//! Invocation dispatch
//!
//! [`TradeWorkflowService`] is the single entry point: it resolves the
//! function name, identifies and authorizes the caller, parses the
//! arguments, and runs the lifecycle engine. Authorization happens before
//! any document is read.

use crate::access::AccessGate;
use crate::config::Config;
use crate::identity::{CallerIdentity, IdentityProvider, InvocationContext, SerializedCreatorProvider};
use crate::metrics::WorkflowMetrics;
use crate::request::{Invocation, Operation, RegistrySetup};
use crate::roles;
use crate::workflow::{LifecycleEngine, Response};
use crate::Result;
use ledger_core::LedgerContext;
use std::sync::Arc;

/// Metric label for names that resolve to no operation
const UNKNOWN_FUNCTION: &str = "unknown";

/// Trade workflow service
pub struct TradeWorkflowService {
    gate: AccessGate,
    identity: Arc<dyn IdentityProvider>,
    engine: LifecycleEngine,
    metrics: WorkflowMetrics,
}

impl std::fmt::Debug for TradeWorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeWorkflowService")
            .field("bypass", &self.gate.is_bypass())
            .field("engine", &self.engine)
            .finish()
    }
}

impl TradeWorkflowService {
    /// Build from configuration with the serialized-creator identity provider
    pub fn new(config: &Config) -> Result<Self> {
        let gate = config.access.gate();
        if gate.is_bypass() {
            tracing::warn!("Access control disabled: every caller is admitted");
        }

        Ok(Self {
            gate,
            identity: Arc::new(SerializedCreatorProvider),
            engine: LifecycleEngine::new(
                config.payment.insufficient_funds,
                config.workflow.reject_duplicate_trades,
            ),
            metrics: WorkflowMetrics::new()?,
        })
    }

    /// Replace the identity provider
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = provider;
        self
    }

    /// Workflow metrics
    pub fn metrics(&self) -> &WorkflowMetrics {
        &self.metrics
    }

    /// Record the role registry.
    ///
    /// No arguments is a successful no-op; otherwise exactly eight are required.
    pub fn init(&self, ctx: &mut dyn LedgerContext, args: &[String]) -> Result<()> {
        match RegistrySetup::parse(args)? {
            Some(setup) => {
                roles::initialize(ctx, &setup)?;
                tracing::info!(
                    exporter = %setup.exporter,
                    importer = %setup.importer,
                    carrier = %setup.carrier,
                    "Trade workflow initialized"
                );
            }
            None => tracing::info!("Trade workflow initialized without a role registry"),
        }
        Ok(())
    }

    /// Handle one invocation
    pub fn invoke(
        &self,
        ctx: &mut dyn LedgerContext,
        invocation: &InvocationContext,
        function: &str,
        args: &[String],
    ) -> Result<Response> {
        let operation = match Operation::parse(function) {
            Ok(operation) => operation,
            Err(e) => {
                tracing::warn!(function, "Invalid invoke function name");
                self.metrics.record_rejection(UNKNOWN_FUNCTION, e.kind());
                return Err(e);
            }
        };

        let result = self.dispatch(ctx, invocation, operation, args);
        match &result {
            Ok(response) => {
                self.metrics.record_success(operation.name(), response.outcome);
                tracing::debug!(function = %operation, outcome = response.outcome.as_str(), "Invocation completed");
            }
            Err(e) => {
                self.metrics.record_rejection(operation.name(), e.kind());
                tracing::info!(function = %operation, kind = e.kind().as_str(), error = %e, "Invocation rejected");
            }
        }
        result
    }

    fn dispatch(
        &self,
        ctx: &mut dyn LedgerContext,
        invocation: &InvocationContext,
        operation: Operation,
        args: &[String],
    ) -> Result<Response> {
        let caller = self.identify(invocation)?;
        self.gate.authorize(caller.as_ref(), operation.allowed_roles())?;

        let parsed = Invocation::parse(operation, args)?;
        let allowed = parsed.allowed_roles();
        if allowed != operation.allowed_roles() {
            self.gate.authorize(caller.as_ref(), allowed)?;
        }

        tracing::debug!(
            function = %operation,
            trade_id = parsed.trade_id(),
            read_only = operation.is_query(),
            "Executing invocation"
        );
        self.engine.execute(ctx, &parsed)
    }

    fn identify(&self, invocation: &InvocationContext) -> Result<Option<CallerIdentity>> {
        if self.gate.is_bypass() {
            return Ok(None);
        }
        self.identity.identify(invocation).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ErrorKind};
    use ledger_core::{MemoryStore, StateStore, Transaction};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn importer() -> InvocationContext {
        InvocationContext::for_member("ImporterOrgMSP", "ca.importerorg.trade.com")
    }

    fn exporter() -> InvocationContext {
        InvocationContext::for_member("ExporterOrgMSP", "ca.exporterorg.trade.com")
    }

    fn call(
        service: &TradeWorkflowService,
        store: &MemoryStore,
        caller: InvocationContext,
        function: &str,
        values: &[&str],
    ) -> Result<Response> {
        let values = args(values);
        ledger_core::run_transaction(store, function, |tx: &mut Transaction<'_>| {
            service.invoke(tx, &caller, function, &values)
        })
    }

    fn service_with_registry(config: &Config) -> (TradeWorkflowService, MemoryStore) {
        let service = TradeWorkflowService::new(config).unwrap();
        let store = MemoryStore::new();
        let setup = args(&[
            "LumberInc",
            "LumberBank",
            "100000",
            "WoodenToys",
            "ToyBank",
            "200000",
            "UniversalFreight",
            "ForestryDepartment",
        ]);
        ledger_core::run_transaction(&store, "init", |tx: &mut Transaction<'_>| {
            service.init(tx, &setup)
        })
        .unwrap();
        (service, store)
    }

    #[test]
    fn test_init_without_arguments_writes_nothing() {
        let service = TradeWorkflowService::new(&Config::in_memory()).unwrap();
        let store = MemoryStore::new();
        ledger_core::run_transaction(&store, "init", |tx: &mut Transaction<'_>| {
            service.init(tx, &[])
        })
        .unwrap();
        assert!(store.latest_commit().unwrap().is_none());

        let err = ledger_core::run_transaction(&store, "init", |tx: &mut Transaction<'_>| {
            service.init(tx, &args(&["only", "three", "args"]))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_unknown_function() {
        let (service, store) = service_with_registry(&Config::in_memory());
        let err = call(&service, &store, importer(), "shipGoods", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownFunction(_)));
        assert_eq!(
            service
                .metrics()
                .rejections_total
                .with_label_values(&["unknown", "argument"])
                .get(),
            1
        );
    }

    #[test]
    fn test_authorization_precedes_argument_checks() {
        let (service, store) = service_with_registry(&Config::in_memory());

        let err = call(&service, &store, exporter(), "requestTrade", &["t1"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Caller not a member of Importer Org. Access denied."
        );

        let err = call(&service, &store, importer(), "requestTrade", &["t1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_malformed_credential_is_collaborator_failure() {
        let (service, store) = service_with_registry(&Config::in_memory());
        let err = call(
            &service,
            &store,
            InvocationContext::new(b"not json".to_vec()),
            "getTradeStatus",
            &["t1"],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
    }

    #[test]
    fn test_account_balance_restricted_to_holder() {
        let (service, store) = service_with_registry(&Config::in_memory());

        let response = call(&service, &store, importer(), "getAccountBalance", &["t1", "importer"]).unwrap();
        assert_eq!(response.payload, br#"{"Balance":"200000"}"#.to_vec());

        let err = call(&service, &store, importer(), "getAccountBalance", &["t1", "exporter"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Caller not a member of Exporter or Exporting Entity Org. Access denied."
        );
    }

    #[derive(Debug)]
    struct FixedProvider(CallerIdentity);

    impl IdentityProvider for FixedProvider {
        fn identify(&self, _ctx: &InvocationContext) -> Result<CallerIdentity> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_custom_identity_provider() {
        let (service, store) = service_with_registry(&Config::in_memory());
        let service = service.with_identity_provider(Arc::new(FixedProvider(CallerIdentity {
            org_id: "CarrierOrgMSP".to_string(),
            cert_issuer: "ca.carrierorg.trade.com".to_string(),
        })));

        let err = call(&service, &store, importer(), "requestTrade", &["t1", "100", "Goods"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_bypass_admits_anonymous_callers() {
        let mut config = Config::in_memory();
        config.access.test_mode = true;
        let (service, store) = service_with_registry(&config);

        call(
            &service,
            &store,
            InvocationContext::default(),
            "requestTrade",
            &["t1", "100", "Goods"],
        )
        .unwrap();
        let response = call(&service, &store, InvocationContext::default(), "getTradeStatus", &["t1"]).unwrap();
        assert_eq!(response.payload, br#"{"Status":"REQUESTED"}"#.to_vec());
    }
}
