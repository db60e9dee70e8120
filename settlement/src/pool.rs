//! Liquidity pool interface
//!
//! The pool is an external collaborator: the rail only needs to know whether
//! a debit or a credit leg succeeded. Implementations must make each leg
//! all-or-nothing.

use protocol_core::Address;
use std::collections::HashMap;
use std::fmt;

/// Liquidity pool consumed by the settlement controller
pub trait LiquidityPool: fmt::Debug + Send {
    /// Draw `amount` of `asset` from the pool reserve
    fn debit(&mut self, asset: &Address, amount: u128) -> bool;

    /// Credit `amount` of `asset` to `beneficiary`
    fn credit(&mut self, asset: &Address, amount: u128, beneficiary: &Address) -> bool;

    /// Return a previously debited amount to the reserve. Must not fail.
    fn restore(&mut self, asset: &Address, amount: u128);

    /// Undo a completed debit and credit pair: take `amount` back from
    /// `beneficiary` and return it to the reserve. Must not fail.
    fn reverse(&mut self, asset: &Address, amount: u128, beneficiary: &Address);

    /// Reserve available for `asset`
    fn available(&self, asset: &Address) -> u128;

    /// Amount of `asset` credited to `account`
    fn balance_of(&self, asset: &Address, account: &Address) -> u128;

    /// Clone into a box
    fn clone_box(&self) -> Box<dyn LiquidityPool>;
}

impl Clone for Box<dyn LiquidityPool> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// In-memory pool: per-asset reserves and per-account credited balances
#[derive(Debug, Clone, Default)]
pub struct InMemoryLiquidityPool {
    reserves: HashMap<Address, u128>,
    balances: HashMap<(Address, Address), u128>,
}

impl InMemoryLiquidityPool {
    /// Create empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add reserve for an asset
    pub fn fund(&mut self, asset: Address, amount: u128) -> &mut Self {
        let reserve = self.reserves.entry(asset).or_insert(0);
        *reserve = reserve.saturating_add(amount);
        self
    }

    /// Builder-style funding
    pub fn with_reserve(mut self, asset: Address, amount: u128) -> Self {
        self.fund(asset, amount);
        self
    }

    /// Sum of reserve and credited balances for an asset
    pub fn total_supply(&self, asset: &Address) -> u128 {
        let credited: u128 = self
            .balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .map(|(_, v)| *v)
            .sum();
        self.available(asset) + credited
    }
}

impl LiquidityPool for InMemoryLiquidityPool {
    fn debit(&mut self, asset: &Address, amount: u128) -> bool {
        match self.reserves.get_mut(asset) {
            Some(reserve) if *reserve >= amount => {
                *reserve -= amount;
                true
            }
            _ => false,
        }
    }

    fn credit(&mut self, asset: &Address, amount: u128, beneficiary: &Address) -> bool {
        if beneficiary.is_zero() {
            return false;
        }
        let balance = self.balances.entry((*asset, *beneficiary)).or_insert(0);
        match balance.checked_add(amount) {
            Some(next) => {
                *balance = next;
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, asset: &Address, amount: u128) {
        self.fund(*asset, amount);
    }

    fn reverse(&mut self, asset: &Address, amount: u128, beneficiary: &Address) {
        let key = (*asset, *beneficiary);
        let taken = match self.balances.get_mut(&key) {
            Some(balance) => {
                let taken = amount.min(*balance);
                *balance -= taken;
                if *balance == 0 {
                    self.balances.remove(&key);
                }
                taken
            }
            None => 0,
        };
        self.fund(*asset, taken);
    }

    fn available(&self, asset: &Address) -> u128 {
        self.reserves.get(asset).copied().unwrap_or(0)
    }

    fn balance_of(&self, asset: &Address, account: &Address) -> u128 {
        self.balances.get(&(*asset, *account)).copied().unwrap_or(0)
    }

    fn clone_box(&self) -> Box<dyn LiquidityPool> {
        Box::new(self.clone())
    }
}
