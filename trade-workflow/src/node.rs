//! Trade node: the workflow service bound to a running ledger

use crate::config::Config;
use crate::dispatch::TradeWorkflowService;
use crate::identity::InvocationContext;
use crate::workflow::Response;
use crate::Result;
use ledger_core::Ledger;
use std::sync::Arc;

/// Workflow service plus the ledger it executes against
#[derive(Debug)]
pub struct TradeNode {
    ledger: Ledger,
    service: Arc<TradeWorkflowService>,
}

impl TradeNode {
    /// Open the configured ledger and build the service
    pub async fn open(config: Config) -> Result<Self> {
        let ledger = Ledger::open(config.ledger.clone()).await?;
        let service = TradeWorkflowService::new(&config)?;
        Ok(Self::with_ledger(ledger, service))
    }

    /// Bind an existing service to an existing ledger
    pub fn with_ledger(ledger: Ledger, service: TradeWorkflowService) -> Self {
        Self {
            ledger,
            service: Arc::new(service),
        }
    }

    /// Record the role registry in one transaction
    pub async fn init(&self, args: Vec<String>) -> Result<()> {
        let service = self.service.clone();
        self.ledger
            .execute("init", move |tx| service.init(tx, &args))
            .await
    }

    /// Execute one invocation in its own transaction
    pub async fn invoke(
        &self,
        ctx: InvocationContext,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Response> {
        let function = function.into();
        let service = self.service.clone();
        self.ledger
            .execute(function.clone(), move |tx| {
                service.invoke(tx, &ctx, &function, &args)
            })
            .await
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Workflow service
    pub fn service(&self) -> &TradeWorkflowService {
        &self.service
    }

    /// Stop the ledger actor
    pub async fn shutdown(self) -> Result<()> {
        self.ledger.shutdown().await?;
        Ok(())
    }
}
