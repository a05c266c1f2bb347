//! Payment settlement
//!
//! A trade is paid in two tranches: half when the shipment leaves its source,
//! the remainder once it is anywhere else. Each tranche moves funds from the
//! importer's balance to the exporter's and raises the trade's paid amount.

use crate::documents::{ShipmentLocation, TradeAgreement};
use crate::roles::AccountBalances;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One installment of a trade payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tranche {
    /// Half the trade amount, paid while the shipment is at its source
    HalfOnDeparture(i64),
    /// Whatever is still owed
    Remainder(i64),
}

impl Tranche {
    /// Tranche due for `trade` given the shipment's location.
    ///
    /// Never more than what is still owed, so the paid amount cannot pass
    /// the trade amount.
    pub fn compute(location: &ShipmentLocation, trade: &TradeAgreement) -> Self {
        let outstanding = trade.outstanding();
        match location {
            ShipmentLocation::Source => Tranche::HalfOnDeparture((trade.amount / 2).min(outstanding)),
            _ => Tranche::Remainder(outstanding),
        }
    }

    /// Amount transferred
    pub fn amount(&self) -> i64 {
        match self {
            Tranche::HalfOnDeparture(amount) | Tranche::Remainder(amount) => *amount,
        }
    }
}

/// Handling of an importer balance too small for the tranche
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientFundsPolicy {
    /// Log and transfer anyway; the importer balance may go negative
    #[default]
    Warn,
    /// Refuse the payment
    Reject,
}

/// Apply `tranche` to the trade and balances.
///
/// On error neither `trade` nor `balances` is modified.
pub fn settle(
    trade: &mut TradeAgreement,
    balances: &mut AccountBalances,
    tranche: Tranche,
    policy: InsufficientFundsPolicy,
) -> Result<()> {
    let amount = tranche.amount();

    if balances.importer < amount {
        match policy {
            InsufficientFundsPolicy::Warn => {
                tracing::warn!(
                    importer_balance = balances.importer,
                    payment = amount,
                    "Importer balance is insufficient to cover payment"
                );
            }
            InsufficientFundsPolicy::Reject => {
                return Err(Error::PreconditionFailed(
                    "Insufficient importer balance".to_string(),
                ));
            }
        }
    }

    let overflow = || Error::PreconditionFailed("Account balance overflow".to_string());
    let payment_to_date = trade.payment_to_date.checked_add(amount).ok_or_else(overflow)?;
    let exporter = balances.exporter.checked_add(amount).ok_or_else(overflow)?;
    let importer = balances.importer.checked_sub(amount).ok_or_else(overflow)?;

    trade.payment_to_date = payment_to_date;
    balances.exporter = exporter;
    balances.importer = importer;

    Ok(())
}
