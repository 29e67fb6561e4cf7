//! Locking-script classification.
//!
//! The classifier decides which execution path a spend attempt takes and
//! which data source feeds the interpreter: the scriptSig bytes for legacy
//! spends, the witness stack for version-0 witness programs. Priority is
//! fixed: witness-program shapes win over the P2SH shape, which wins over
//! direct execution.

use crate::script::{Opcode, Script};

/// Result of classifying a locking script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// Version-0 witness program with a 20-byte public key hash.
    P2wpkh([u8; 20]),
    /// Version-0 witness program with a 32-byte script hash.
    P2wsh([u8; 32]),
    /// `HASH160 <20 bytes> EQUAL`; the spender supplies the redeem script.
    P2sh([u8; 20]),
    /// Anything else: scriptSig and locking script run as one sequence.
    Bare,
}

impl ScriptClass {
    /// True for classes whose unlocking data lives on the witness stack.
    pub fn is_witness_program(&self) -> bool {
        matches!(self, ScriptClass::P2wpkh(_) | ScriptClass::P2wsh(_))
    }
}

/// Classifies a locking script by shape. First match wins.
pub fn classify(script: &Script) -> ScriptClass {
    match script.ops() {
        [Opcode::Zero, Opcode::PushData(program)] => match program.len() {
            20 => {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(program);
                ScriptClass::P2wpkh(hash)
            }
            32 => {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(program);
                ScriptClass::P2wsh(hash)
            }
            _ => ScriptClass::Bare,
        },
        [Opcode::Hash160, Opcode::PushData(hash), Opcode::Equal] if hash.len() == 20 => {
            let mut script_hash = [0u8; 20];
            script_hash.copy_from_slice(hash);
            ScriptClass::P2sh(script_hash)
        }
        _ => ScriptClass::Bare,
    }
}
