//! Account state as seen from inside an inspector callback
//!
//! Current values come from the journal first and fall back to the database;
//! original values come from the database alone, which the interpreter does
//! not write until the transaction is committed.

use crate::{
    errors::StateError,
    traits::StateView,
    types::{AccountSnapshot, Address, Bytes, U256},
};
use revm::{
    context::ContextTr,
    database::Database,
    inspector::JournalExt,
    primitives::{B256, KECCAK_EMPTY},
    state::AccountInfo,
};

/// `StateView` over a live revm context
pub struct RevmState<'a, CTX> {
    context: &'a mut CTX,
}

impl<'a, CTX> RevmState<'a, CTX>
where
    CTX: ContextTr,
    CTX::Journal: JournalExt,
{
    pub fn new(context: &'a mut CTX) -> Self {
        Self { context }
    }

    fn code(&mut self, info: &AccountInfo) -> Result<Bytes, StateError> {
        if let Some(code) = &info.code {
            return Ok(code.original_bytes());
        }
        if info.code_hash == KECCAK_EMPTY || info.code_hash == B256::ZERO {
            return Ok(Bytes::new());
        }
        self.context
            .db()
            .code_by_hash(info.code_hash)
            .map(|code| code.original_bytes())
            .map_err(|e| StateError::Database(e.to_string()))
    }

    fn snapshot(&mut self, info: Option<AccountInfo>) -> Result<Option<AccountSnapshot>, StateError> {
        match info {
            Some(info) if !info.is_empty() => Ok(Some(AccountSnapshot {
                balance: info.balance,
                nonce: info.nonce,
                code: self.code(&info)?,
            })),
            _ => Ok(None),
        }
    }
}

impl<CTX> StateView for RevmState<'_, CTX>
where
    CTX: ContextTr,
    CTX::Journal: JournalExt,
{
    fn account(&mut self, address: Address) -> Result<Option<AccountSnapshot>, StateError> {
        let journaled = self.context.journal_ref().evm_state().get(&address).map(|account| {
            if account.is_selfdestructed() {
                None
            } else {
                Some(account.info.clone())
            }
        });
        match journaled {
            Some(info) => self.snapshot(info),
            None => self.original_account(address),
        }
    }

    fn storage(&mut self, address: Address, slot: U256) -> Result<U256, StateError> {
        if let Some(account) = self.context.journal_ref().evm_state().get(&address) {
            if let Some(value) = account.storage.get(&slot) {
                return Ok(value.present_value);
            }
            if account.is_created() || account.is_selfdestructed() {
                return Ok(U256::ZERO);
            }
        }
        self.original_storage(address, slot)
    }

    fn original_account(&mut self, address: Address) -> Result<Option<AccountSnapshot>, StateError> {
        let info = self
            .context
            .db()
            .basic(address)
            .map_err(|e| StateError::Database(e.to_string()))?;
        self.snapshot(info)
    }

    fn original_storage(&mut self, address: Address, slot: U256) -> Result<U256, StateError> {
        self.context
            .db()
            .storage(address, slot)
            .map_err(|e| StateError::Database(e.to_string()))
    }
}
