//! Trade Workflow
//!
//! Multi-party trade settlement executed as a deterministic workflow against
//! the append-only ledger in `ledger-core`.
//!
//! # Architecture
//!
//! An invocation carries a function name, its arguments, and the caller's
//! credential:
//!
//! 1. **Dispatch**: The function name is parsed into an [`Operation`]
//! 2. **Identity**: The caller's (organization, certificate issuer) is extracted
//! 3. **Access control**: The caller must hold one of the operation's roles
//! 4. **Parsing**: Arguments become a typed [`Invocation`]
//! 5. **Lifecycle**: Documents are read, preconditions checked, new state written
//! 6. **Settlement**: Payments move funds between the two shared balance slots
//!
//! Every invocation runs as one ledger transaction: it commits all of its
//! writes or none of them.
//!
//! # Documents
//!
//! Per trade identifier: a trade agreement, a letter of credit, an export
//! license, a shipment location, a bill of lading, and a transient payment
//! request marker.
//!
//! # Example
//!
//! ```no_run
//! use trade_workflow::{Config, InvocationContext, TradeNode};
//!
//! #[tokio::main]
//! async fn main() -> trade_workflow::Result<()> {
//!     let node = TradeNode::open(Config::default()).await?;
//!
//!     let importer = InvocationContext::for_member("ImporterOrgMSP", "ca.importerorg.trade.com");
//!     node.invoke(
//!         importer,
//!         "requestTrade",
//!         vec!["trade-1".into(), "50000".into(), "Wood for Toys".into()],
//!     )
//!     .await?;
//!
//!     node.shutdown().await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod access;
pub mod config;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod identity;
pub mod keys;
pub mod metrics;
pub mod node;
pub mod payment;
pub mod request;
pub mod roles;
pub mod workflow;

// Re-exports
pub use access::{AccessGate, Credential, CredentialTable, ExportingEntityMode, Role};
pub use config::Config;
pub use dispatch::TradeWorkflowService;
pub use error::{Error, ErrorKind, Result};
pub use identity::{CallerIdentity, IdentityProvider, InvocationContext, SerializedCreatorProvider};
pub use node::TradeNode;
pub use payment::{InsufficientFundsPolicy, Tranche};
pub use request::{Invocation, Operation, RegistrySetup};
pub use workflow::{LifecycleEngine, Outcome, Response};
