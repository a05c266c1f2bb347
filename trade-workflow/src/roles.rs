//! Role registry
//!
//! Eight fixed slots naming the trade participants and holding the two
//! account balances. Names are written once at setup. Balances change only
//! through payment settlement, and every trade shares them.

use crate::request::RegistrySetup;
use crate::{Error, Result};
use ledger_core::LedgerContext;

/// Registry slots and their ledger keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSlot {
    /// Exporter name
    Exporter,
    /// Exporter's bank name
    ExportersBank,
    /// Exporter's account balance
    ExportersAccountBalance,
    /// Importer name
    Importer,
    /// Importer's bank name
    ImportersBank,
    /// Importer's account balance
    ImportersAccountBalance,
    /// Carrier name
    Carrier,
    /// Regulatory authority name
    RegulatoryAuthority,
}

impl RoleSlot {
    /// All slots in setup argument order
    pub const ALL: [RoleSlot; 8] = [
        RoleSlot::Exporter,
        RoleSlot::ExportersBank,
        RoleSlot::ExportersAccountBalance,
        RoleSlot::Importer,
        RoleSlot::ImportersBank,
        RoleSlot::ImportersAccountBalance,
        RoleSlot::Carrier,
        RoleSlot::RegulatoryAuthority,
    ];

    /// Ledger key
    pub fn key(&self) -> &'static str {
        match self {
            RoleSlot::Exporter => "Exporter",
            RoleSlot::ExportersBank => "ExportersBank",
            RoleSlot::ExportersAccountBalance => "ExportersAccountBalance",
            RoleSlot::Importer => "Importer",
            RoleSlot::ImportersBank => "ImportersBank",
            RoleSlot::ImportersAccountBalance => "ImportersAccountBalance",
            RoleSlot::Carrier => "Carrier",
            RoleSlot::RegulatoryAuthority => "RegulatoryAuthority",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            RoleSlot::Exporter => "Exporter",
            RoleSlot::ExportersBank => "Exporter's Bank",
            RoleSlot::ExportersAccountBalance => "Exporter's Account Balance",
            RoleSlot::Importer => "Importer",
            RoleSlot::ImportersBank => "Importer's Bank",
            RoleSlot::ImportersAccountBalance => "Importer's Account Balance",
            RoleSlot::Carrier => "Carrier",
            RoleSlot::RegulatoryAuthority => "Regulatory Authority",
        }
    }
}

/// Write all eight slots
pub fn initialize(ctx: &mut dyn LedgerContext, setup: &RegistrySetup) -> Result<()> {
    for (slot, value) in setup.entries() {
        ctx.put_state(slot.key(), value.into_bytes())?;
        tracing::info!(slot = slot.label(), "Role registry entry recorded");
    }
    Ok(())
}

/// Participant name held in a slot
pub fn name(ctx: &dyn LedgerContext, slot: RoleSlot) -> Result<String> {
    let bytes = ctx
        .get_state(slot.key())?
        .ok_or_else(|| Error::NotFound(format!("No record found for {}", slot.label())))?;

    String::from_utf8(bytes)
        .map_err(|_| Error::InvalidState(format!("{} is not valid UTF-8", slot.label())))
}

/// Balance held in a slot
pub fn balance(ctx: &dyn LedgerContext, slot: RoleSlot) -> Result<i64> {
    let raw = name(ctx, slot)?;
    raw.parse::<i64>()
        .map_err(|_| Error::InvalidState(format!("{} is not an integer: {}", slot.label(), raw)))
}

/// The two shared balance slots, read and written together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalances {
    /// Exporter's account balance
    pub exporter: i64,

    /// Importer's account balance
    pub importer: i64,
}

impl AccountBalances {
    /// Read both balances
    pub fn load(ctx: &dyn LedgerContext) -> Result<Self> {
        Ok(Self {
            exporter: balance(ctx, RoleSlot::ExportersAccountBalance)?,
            importer: balance(ctx, RoleSlot::ImportersAccountBalance)?,
        })
    }

    /// Write both balances
    pub fn store(&self, ctx: &mut dyn LedgerContext) -> Result<()> {
        ctx.put_state(
            RoleSlot::ExportersAccountBalance.key(),
            self.exporter.to_string().into_bytes(),
        )?;
        ctx.put_state(
            RoleSlot::ImportersAccountBalance.key(),
            self.importer.to_string().into_bytes(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{MemoryStore, Transaction};

    fn setup() -> RegistrySetup {
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
        RegistrySetup::parse(&args).unwrap().unwrap()
    }

    #[test]
    fn test_initialize_and_read() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store, "init").unwrap();

        initialize(&mut tx, &setup()).unwrap();

        assert_eq!(name(&tx, RoleSlot::ImportersBank).unwrap(), "ToyBank");
        assert_eq!(
            AccountBalances::load(&tx).unwrap(),
            AccountBalances {
                exporter: 100000,
                importer: 200000
            }
        );
        assert_eq!(tx.write_set().len(), 8);
    }

    #[test]
    fn test_setup_covers_every_slot() {
        let entries = setup().entries();
        let slots: Vec<RoleSlot> = entries.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, RoleSlot::ALL.to_vec());
    }

    #[test]
    fn test_missing_slot_is_not_found() {
        let store = MemoryStore::new();
        let tx = Transaction::begin(&store, "read").unwrap();

        let err = name(&tx, RoleSlot::Carrier).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_balances_round_trip() {
        let store = MemoryStore::new();
        let mut tx = Transaction::begin(&store, "pay").unwrap();
        initialize(&mut tx, &setup()).unwrap();

        let balances = AccountBalances {
            exporter: 125000,
            importer: -5,
        };
        balances.store(&mut tx).unwrap();
        assert_eq!(AccountBalances::load(&tx).unwrap(), balances);
    }
}
