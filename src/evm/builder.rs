//! Builds an EVM over in-memory genesis state

use crate::{
    dispatcher::Tracer,
    errors::{EvmError, InitError},
    evm::TraceEvm,
    inspectors::HookInspector,
    types::{GenesisAlloc, TraceContext, U256},
    utils::block_utils::create_block_env,
};
use revm::{
    bytecode::Bytecode,
    context::Context,
    database::{CacheDB, EmptyDB},
    handler::{MainBuilder, MainContext},
    state::AccountInfo,
};
use tracing::debug;

/// EVM over a fresh in-memory state, ready to be traced
pub type TracingEvm = TraceEvm<CacheDB<EmptyDB>, HookInspector<Tracer>>;

/// Seeds a `CacheDB` with the genesis allocation
fn genesis_db(alloc: &GenesisAlloc) -> Result<CacheDB<EmptyDB>, InitError> {
    let mut db = CacheDB::new(EmptyDB::default());
    for (address, account) in alloc {
        let code = Bytecode::new_raw(account.code.clone());
        let info = AccountInfo::new(account.balance, account.nonce, code.hash_slow(), code);
        db.insert_account_info(*address, info);
        for (slot, value) in &account.storage {
            db.insert_account_storage(
                *address,
                U256::from_be_bytes(slot.0),
                U256::from_be_bytes(value.0),
            )
            .map_err(|e| InitError::Database(format!("storage of {address}: {e}")))?;
        }
    }
    Ok(db)
}

/// Create an EVM over the genesis allocation, in the given block context
///
/// The configuration follows a simulation setup: EIP-3607 disabled, no code
/// size limit, no block gas limit and no base fee.
///
/// # Example
/// ```rust
/// use revm_tracers::{create_evm, types::{GenesisAlloc, TraceContext}};
///
/// let context = TraceContext { number: 1, ..Default::default() };
/// let evm = create_evm(&GenesisAlloc::new(), &context).unwrap();
/// assert_eq!(evm.ctx.block.number, 1);
/// ```
pub fn create_evm(alloc: &GenesisAlloc, context: &TraceContext) -> Result<TracingEvm, EvmError> {
    let db = genesis_db(alloc)?;
    let mut ctx = Context::mainnet().with_db(db);
    let cfg = &mut ctx.cfg;
    cfg.chain_id = context.chain_id;
    cfg.disable_eip3607 = true;
    cfg.limit_contract_code_size = None;
    cfg.disable_block_gas_limit = true;
    cfg.disable_base_fee = true;
    ctx.block = create_block_env(context);

    debug!(
        target: "revm_tracers::evm",
        accounts = alloc.len(),
        block = context.number,
        chain_id = context.chain_id,
        "evm created"
    );
    let evm = ctx.build_mainnet_with_inspector(HookInspector::default());
    Ok(TraceEvm::new(evm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Bytes, GenesisAccount, B256};
    use alloy::primitives::address;
    use revm::database::Database;

    #[test]
    fn test_genesis_is_loaded() {
        let contract = address!("00000000000000000000000000000000000000a1");
        let mut alloc = GenesisAlloc::new();
        alloc.insert(
            contract,
            GenesisAccount {
                balance: U256::from(7),
                nonce: 1,
                code: Bytes::from(vec![0x60, 0x00]),
                storage: [(B256::with_last_byte(1), B256::with_last_byte(2))].into_iter().collect(),
            },
        );

        let mut db = genesis_db(&alloc).unwrap();
        let info = db.basic(contract).unwrap().unwrap();
        assert_eq!(info.balance, U256::from(7));
        assert_eq!(info.nonce, 1);
        assert_eq!(db.storage(contract, U256::from(1)).unwrap(), U256::from(2));
        assert!(db.basic(Address::ZERO).unwrap().is_none());
    }

    #[test]
    fn test_block_context_applied() {
        let context = TraceContext {
            number: 8_000_000,
            timestamp: 1_700_000_000,
            chain_id: 5,
            ..Default::default()
        };
        let evm = create_evm(&GenesisAlloc::new(), &context).unwrap();
        assert_eq!(evm.ctx.block.number, 8_000_000);
        assert_eq!(evm.ctx.block.timestamp, 1_700_000_000);
        assert_eq!(evm.ctx.cfg.chain_id, 5);
        assert!(evm.inspector.hooks().is_none());
    }
}
