//! Canonical locking-script templates for the standard output types.

use crate::script::{encode_num, Opcode, Script};
use crate::ScriptError;

/// Ceiling on multisig participants, matching the consensus limit.
pub const MAX_MULTISIG_KEYS: usize = 20;

/// The four standard output shapes, each carrying the digest committed
/// on-chain. A template renders deterministically to exactly one canonical
/// [`Script`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptTemplate {
    P2pkh { pubkey_hash: [u8; 20] },
    P2sh { script_hash: [u8; 20] },
    P2wpkh { pubkey_hash: [u8; 20] },
    P2wsh { script_hash: [u8; 32] },
}

impl ScriptTemplate {
    /// Template wrapping `redeem_script` in a P2SH output.
    pub fn p2sh_of(redeem_script: &Script) -> Self {
        ScriptTemplate::P2sh {
            script_hash: redeem_script.script_hash(),
        }
    }

    /// Template wrapping `witness_script` in a P2WSH output.
    pub fn p2wsh_of(witness_script: &Script) -> Self {
        ScriptTemplate::P2wsh {
            script_hash: witness_script.witness_hash(),
        }
    }

    /// Renders the canonical locking script.
    pub fn locking_script(&self) -> Script {
        match *self {
            ScriptTemplate::P2pkh { pubkey_hash } => Script::new(vec![
                Opcode::Dup,
                Opcode::Hash160,
                Opcode::PushData(pubkey_hash.to_vec()),
                Opcode::EqualVerify,
                Opcode::CheckSig,
            ]),
            ScriptTemplate::P2sh { script_hash } => Script::new(vec![
                Opcode::Hash160,
                Opcode::PushData(script_hash.to_vec()),
                Opcode::Equal,
            ]),
            // Witness programs: version byte 0 followed by the program.
            ScriptTemplate::P2wpkh { pubkey_hash } => Script::new(vec![
                Opcode::Zero,
                Opcode::PushData(pubkey_hash.to_vec()),
            ]),
            ScriptTemplate::P2wsh { script_hash } => Script::new(vec![
                Opcode::Zero,
                Opcode::PushData(script_hash.to_vec()),
            ]),
        }
    }
}

/// Locking script paying to a 20-byte public key hash.
pub fn p2pkh(pubkey_hash: [u8; 20]) -> Script {
    ScriptTemplate::P2pkh { pubkey_hash }.locking_script()
}

/// Locking script paying to a 20-byte redeem script hash.
pub fn p2sh(script_hash: [u8; 20]) -> Script {
    ScriptTemplate::P2sh { script_hash }.locking_script()
}

/// Version-0 witness program over a 20-byte public key hash.
pub fn p2wpkh(pubkey_hash: [u8; 20]) -> Script {
    ScriptTemplate::P2wpkh { pubkey_hash }.locking_script()
}

/// Version-0 witness program over a 32-byte witness script hash.
pub fn p2wsh(script_hash: [u8; 32]) -> Script {
    ScriptTemplate::P2wsh { script_hash }.locking_script()
}

/// An `m`-of-`n` signing policy over an ordered set of public keys.
///
/// Validated at construction so malformed parameters never reach the
/// executor. The key order is significant: spending signatures must appear
/// in the same relative order as their keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigPolicy {
    required: usize,
    pubkeys: Vec<Vec<u8>>,
}

impl MultisigPolicy {
    /// Builds the policy, rejecting parameters outside
    /// `1 <= m <= n <= 20` with [`ScriptError::InvalidPolicy`].
    pub fn new(required: usize, pubkeys: Vec<Vec<u8>>) -> Result<Self, ScriptError> {
        if required == 0 || required > pubkeys.len() || pubkeys.len() > MAX_MULTISIG_KEYS {
            return Err(ScriptError::InvalidPolicy);
        }
        Ok(Self { required, pubkeys })
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn pubkeys(&self) -> &[Vec<u8>] {
        &self.pubkeys
    }

    /// Renders the canonical `OP_m <pk...> OP_n OP_CHECKMULTISIG` script,
    /// used as the redeem script for P2SH or the witness script for P2WSH.
    pub fn redeem_script(&self) -> Script {
        let mut ops = Vec::with_capacity(self.pubkeys.len() + 3);
        ops.push(push_count(self.required));
        for key in &self.pubkeys {
            ops.push(Opcode::PushData(key.clone()));
        }
        ops.push(push_count(self.pubkeys.len()));
        ops.push(Opcode::CheckMultiSig);
        Script::new(ops)
    }
}

// Counts above 16 fall outside the OP_1..OP_16 range and are encoded as
// literal number pushes.
fn push_count(count: usize) -> Opcode {
    if (1..=16).contains(&count) {
        Opcode::PushNum(count as u8)
    } else {
        Opcode::PushData(encode_num(count as i64))
    }
}

/// Redeem/witness script for an `m`-of-`n` multisig policy.
pub fn multisig(required: usize, pubkeys: Vec<Vec<u8>>) -> Result<Script, ScriptError> {
    MultisigPolicy::new(required, pubkeys).map(|policy| policy.redeem_script())
}
