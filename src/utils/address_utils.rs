//! Contract address derivation
//!
//! - CREATE2: `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`

use alloy::primitives::{keccak256, Address, B256, U256};

/// Address of a contract deployed with CREATE2
///
/// # Arguments
/// * `sender` - Account executing CREATE2
/// * `salt` - 32-byte salt taken from the stack
/// * `init_code` - Init code read from memory
pub fn create2_address(sender: Address, salt: B256, init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);
    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(sender.as_slice());
    preimage[21..53].copy_from_slice(salt.as_slice());
    preimage[53..85].copy_from_slice(code_hash.as_slice());
    Address::from_slice(&keccak256(preimage)[12..])
}

/// Low 20 bytes of a stack word
pub fn word_to_address(word: U256) -> Address {
    let bytes = word.to_be_bytes::<32>();
    Address::from_slice(&bytes[12..])
}

/// Stack word as a 32-byte big-endian value
pub fn word_to_b256(word: U256) -> B256 {
    B256::from(word.to_be_bytes::<32>())
}

/// Whether the address is in the precompile range (0x01..=0x11)
pub fn is_precompile(address: Address) -> bool {
    let bytes = address.as_slice();
    bytes[..19].iter().all(|b| *b == 0) && (1..=0x11).contains(&bytes[19])
}
