//! State views that are not backed by a live interpreter
//!
//! `StaticState` serves recorded or synthetic event streams (and unit tests);
//! `DetachedState` is handed to hooks for which the source has no state access.

use crate::{
    errors::StateError,
    traits::StateView,
    types::{AccountSnapshot, Address, Bytes, U256},
};
use std::collections::BTreeMap;

/// Account with storage, as held by `StaticState`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAccount {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub storage: BTreeMap<U256, U256>,
}

impl StaticAccount {
    fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot { balance: self.balance, nonce: self.nonce, code: self.code.clone() }
    }
}

/// In-memory state with separate pre-transaction and current views
#[derive(Debug, Clone, Default)]
pub struct StaticState {
    original: BTreeMap<Address, StaticAccount>,
    current: BTreeMap<Address, Option<StaticAccount>>,
}

impl StaticState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account that existed before the transaction
    pub fn with_account(mut self, address: Address, account: StaticAccount) -> Self {
        self.original.insert(address, account);
        self
    }

    /// Overrides the current view of an account; `None` removes it
    pub fn set_current(&mut self, address: Address, account: Option<StaticAccount>) {
        self.current.insert(address, account);
    }

    /// Overrides one current storage slot
    pub fn set_current_storage(&mut self, address: Address, slot: U256, value: U256) {
        let base = self.original.get(&address).cloned().unwrap_or_default();
        let entry = self.current.entry(address).or_insert_with(|| Some(base));
        entry.get_or_insert_with(StaticAccount::default).storage.insert(slot, value);
    }

    fn current_account(&self, address: &Address) -> Option<&StaticAccount> {
        match self.current.get(address) {
            Some(account) => account.as_ref(),
            None => self.original.get(address),
        }
    }
}

impl StateView for StaticState {
    fn account(&mut self, address: Address) -> Result<Option<AccountSnapshot>, StateError> {
        Ok(self.current_account(&address).map(StaticAccount::snapshot))
    }

    fn storage(&mut self, address: Address, slot: U256) -> Result<U256, StateError> {
        Ok(self
            .current_account(&address)
            .and_then(|account| account.storage.get(&slot).copied())
            .unwrap_or_default())
    }

    fn original_account(&mut self, address: Address) -> Result<Option<AccountSnapshot>, StateError> {
        Ok(self.original.get(&address).map(StaticAccount::snapshot))
    }

    fn original_storage(&mut self, address: Address, slot: U256) -> Result<U256, StateError> {
        Ok(self
            .original
            .get(&address)
            .and_then(|account| account.storage.get(&slot).copied())
            .unwrap_or_default())
    }
}

/// State view that refuses every query
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedState;

impl StateView for DetachedState {
    fn account(&mut self, _address: Address) -> Result<Option<AccountSnapshot>, StateError> {
        Err(StateError::Unavailable)
    }

    fn storage(&mut self, _address: Address, _slot: U256) -> Result<U256, StateError> {
        Err(StateError::Unavailable)
    }

    fn original_account(&mut self, _address: Address) -> Result<Option<AccountSnapshot>, StateError> {
        Err(StateError::Unavailable)
    }

    fn original_storage(&mut self, _address: Address, _slot: U256) -> Result<U256, StateError> {
        Err(StateError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_current_overrides_original() {
        let contract = address!("00000000000000000000000000000000000c0de1");
        let mut state = StaticState::new().with_account(
            contract,
            StaticAccount { balance: U256::from(7), ..Default::default() },
        );
        state.set_current_storage(contract, U256::ZERO, U256::from(42));

        assert_eq!(state.storage(contract, U256::ZERO).unwrap(), U256::from(42));
        assert_eq!(state.original_storage(contract, U256::ZERO).unwrap(), U256::ZERO);
        assert_eq!(state.account(contract).unwrap().unwrap().balance, U256::from(7));

        state.set_current(contract, None);
        assert_eq!(state.account(contract).unwrap(), None);
        assert!(state.original_account(contract).unwrap().is_some());
    }

    #[test]
    fn test_detached_refuses_queries() {
        assert_eq!(DetachedState.account(Address::ZERO), Err(StateError::Unavailable));
    }
}
