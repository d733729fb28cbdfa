//! Prestate collector
//!
//! Records every account and storage slot the transaction touches, with the
//! values they held before the transaction. In diff mode the touched set is
//! re-read when the root frame ends and only the differences are reported.

use crate::{
    errors::ProgramError,
    host::HostContext,
    traits::TracerProgram,
    types::{Address, Bytes, ExecutionStep, FrameEnd, FrameStart, B256, U256},
    utils::{
        address_utils::{create2_address, word_to_b256},
        hex_utils,
    },
};
use revm::bytecode::opcode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrestateConfig {
    /// Report `pre`/`post` differences instead of a snapshot
    #[serde(default)]
    pub diff_mode: bool,
}

/// Account fields and touched slots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub balance: U256,
    pub nonce: u64,
    pub code: Option<Bytes>,
    pub storage: BTreeMap<B256, B256>,
}

impl AccountState {
    fn artifact(&self) -> PrestateAccount {
        PrestateAccount {
            balance: Some(self.balance),
            nonce: Some(self.nonce),
            code: self.code.clone(),
            storage: self.storage.clone(),
        }
    }
}

/// One account of a prestate artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestateAccount {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_utils::quantity_opt")]
    pub balance: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Bytes>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<B256, B256>,
}

/// Snapshot artifact keyed by lower-case `0x` address
pub type PrestateArtifact = BTreeMap<String, PrestateAccount>;

/// Diff-mode artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestateDiffArtifact {
    pub pre: PrestateArtifact,
    pub post: PrestateArtifact,
}

#[derive(Debug, Default)]
pub struct PrestateTracer {
    config: PrestateConfig,
    /// Pre-transaction values, first touch wins
    accounts: BTreeMap<Address, AccountState>,
    /// Touched addresses that did not exist before the transaction
    absent: BTreeSet<Address>,
    /// Values read when the root frame ended, diff mode only
    post: BTreeMap<Address, Option<AccountState>>,
    root_created: Option<Address>,
    depth: usize,
}

impl PrestateTracer {
    pub fn new(config: PrestateConfig) -> Self {
        Self { config, ..Default::default() }
    }

    fn touch(&mut self, ctx: &mut HostContext<'_>, address: Address) -> Result<(), ProgramError> {
        if self.accounts.contains_key(&address) {
            return Ok(());
        }
        let state = match ctx.original_account(address)? {
            Some(account) => AccountState {
                balance: account.balance,
                nonce: account.nonce,
                code: (!account.code.is_empty()).then_some(account.code),
                storage: BTreeMap::new(),
            },
            None => {
                self.absent.insert(address);
                AccountState::default()
            }
        };
        self.accounts.insert(address, state);
        Ok(())
    }

    fn touch_slot(&mut self, ctx: &mut HostContext<'_>, address: Address, slot: U256) -> Result<(), ProgramError> {
        self.touch(ctx, address)?;
        let key = word_to_b256(slot);
        let known = self.accounts.get(&address).is_some_and(|account| account.storage.contains_key(&key));
        if known {
            return Ok(());
        }
        let value = word_to_b256(ctx.original_storage(address, slot)?);
        if let Some(account) = self.accounts.get_mut(&address) {
            account.storage.insert(key, value);
        }
        Ok(())
    }

    fn touch_create2(&mut self, ctx: &mut HostContext<'_>, step: &ExecutionStep<'_>) -> Result<(), ProgramError> {
        let (Some(offset), Some(size), Some(salt)) = (step.stack.peek(1), step.stack.peek(2), step.stack.peek(3)) else {
            return Ok(());
        };
        let (Ok(offset), Ok(size)) = (usize::try_from(offset), usize::try_from(size)) else {
            return Ok(());
        };
        let init_code = if size == 0 { Some(&[][..]) } else { step.memory.slice(offset, size) };
        match init_code {
            Some(code) => self.touch(ctx, create2_address(step.address, word_to_b256(salt), code)),
            None => Ok(()),
        }
    }

    /// Re-reads every touched account at the current point of execution
    fn capture_post(&mut self, ctx: &mut HostContext<'_>) -> Result<(), ProgramError> {
        for (address, pre) in &self.accounts {
            let current = match ctx.account(*address)? {
                Some(account) => {
                    let mut storage = BTreeMap::new();
                    for key in pre.storage.keys() {
                        let value = ctx.storage(*address, U256::from_be_bytes(key.0))?;
                        storage.insert(*key, word_to_b256(value));
                    }
                    Some(AccountState {
                        balance: account.balance,
                        nonce: account.nonce,
                        code: (!account.code.is_empty()).then_some(account.code),
                        storage,
                    })
                }
                None => None,
            };
            self.post.insert(*address, current);
        }
        Ok(())
    }

    fn snapshot(&self) -> PrestateArtifact {
        self.accounts
            .iter()
            .filter(|(address, _)| self.root_created != Some(**address))
            .map(|(address, state)| (hex_utils::address_to_hex(address), state.artifact()))
            .collect()
    }

    fn diff(&self) -> PrestateDiffArtifact {
        let mut out = PrestateDiffArtifact::default();
        for (address, pre) in &self.accounts {
            let existed = !self.absent.contains(address);
            let post = self.post.get(address).cloned().flatten();
            let key = hex_utils::address_to_hex(address);

            match (existed, post) {
                (false, None) => {}
                (false, Some(created)) => {
                    let mut account = created.artifact();
                    account.storage.retain(|_, value| !value.is_zero());
                    out.post.insert(key, account);
                }
                (true, None) => {
                    out.pre.insert(key, pre.artifact());
                }
                (true, Some(post)) => {
                    let mut changed_slots = BTreeMap::new();
                    for (slot, value) in &post.storage {
                        if pre.storage.get(slot) != Some(value) {
                            changed_slots.insert(*slot, *value);
                        }
                    }
                    let balance = (pre.balance != post.balance).then_some(post.balance);
                    let nonce = (pre.nonce != post.nonce).then_some(post.nonce);
                    let code = (pre.code != post.code).then(|| post.code.clone().unwrap_or_default());
                    if balance.is_none() && nonce.is_none() && code.is_none() && changed_slots.is_empty() {
                        continue;
                    }

                    let mut before = pre.artifact();
                    before.storage.retain(|slot, _| changed_slots.contains_key(slot));
                    out.pre.insert(key.clone(), before);

                    let storage = changed_slots.into_iter().filter(|(_, value)| !value.is_zero()).collect();
                    out.post.insert(key, PrestateAccount { balance, nonce, code, storage });
                }
            }
        }
        out
    }
}

impl TracerProgram for PrestateTracer {
    fn on_start(&mut self, ctx: &mut HostContext<'_>, frame: &FrameStart<'_>) -> Result<(), ProgramError> {
        self.depth += 1;
        self.touch(ctx, frame.from)?;
        let to = frame
            .to
            .or_else(|| frame.salt.map(|salt| create2_address(frame.from, salt, frame.input)));
        if let Some(to) = to {
            self.touch(ctx, to)?;
        }
        Ok(())
    }

    fn on_step(&mut self, ctx: &mut HostContext<'_>, step: &ExecutionStep<'_>) -> Result<(), ProgramError> {
        match step.op {
            opcode::SLOAD | opcode::SSTORE => match step.stack.peek(0) {
                Some(slot) => self.touch_slot(ctx, step.address, slot),
                None => Ok(()),
            },
            opcode::BALANCE
            | opcode::EXTCODESIZE
            | opcode::EXTCODECOPY
            | opcode::EXTCODEHASH
            | opcode::SELFDESTRUCT => match step.stack.peek_address(0) {
                Some(address) => self.touch(ctx, address),
                None => Ok(()),
            },
            opcode::CALL | opcode::CALLCODE | opcode::DELEGATECALL | opcode::STATICCALL => {
                match step.stack.peek_address(1) {
                    Some(address) => self.touch(ctx, address),
                    None => Ok(()),
                }
            }
            opcode::CREATE => {
                let nonce = ctx.nonce(step.address)?;
                self.touch(ctx, step.address.create(nonce))
            }
            opcode::CREATE2 => self.touch_create2(ctx, step),
            _ => Ok(()),
        }
    }

    fn on_end(&mut self, ctx: &mut HostContext<'_>, frame: &FrameEnd<'_>) -> Result<(), ProgramError> {
        self.depth = self.depth.saturating_sub(1);
        if let Some(created) = frame.created {
            self.touch(ctx, created)?;
            if self.depth == 0 {
                self.root_created = Some(created);
            }
        }
        if self.depth == 0 && self.config.diff_mode {
            self.capture_post(ctx)?;
        }
        Ok(())
    }

    fn result(&mut self) -> Result<serde_json::Value, ProgramError> {
        let value = if self.config.diff_mode {
            serde_json::to_value(self.diff())
        } else {
            serde_json::to_value(self.snapshot())
        };
        value.map_err(|e| ProgramError::Encoding(e.to_string()))
    }
}
