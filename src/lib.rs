//! Stack-machine validation of standard Bitcoin spend scripts.
//!
//! The crate implements the script execution model behind the four standard
//! output types: P2PKH, P2SH, P2WPKH and P2WSH, including the P2SH-wrapped
//! witness variants. A locking script is classified, the matching unlocking
//! data (scriptSig or witness stack) is resolved, and the resulting script
//! sequence is run through a byte-string stack machine whose final state
//! decides whether the spend is authorized.
//!
//! Signature checking is a capability injected by the caller: production
//! code uses [`Secp256k1Verifier`], unit tests can substitute any
//! [`SignatureVerifier`] implementation. Message digests are derived from
//! the spending transaction through [`SigningContext`], which wraps the
//! `bitcoin` crate's sighash machinery.
//!
//! Consensus rules outside the standard spend paths are out of scope:
//! no Taproot, no time locks, no sigop accounting and no soft-fork flag
//! plumbing. Stack depth and element size ceilings are enforced for
//! realism.

mod interpreter;
mod resolve;
mod script;
mod sig;
mod stack;
mod templates;
mod verify;

pub use crate::resolve::{classify, ScriptClass};
pub use crate::script::{Opcode, Script};
pub use crate::sig::{Secp256k1Verifier, SignatureVerifier, SigningContext};
pub use crate::stack::Stack;
pub use crate::templates::{
    multisig, p2pkh, p2sh, p2wpkh, p2wsh, MultisigPolicy, ScriptTemplate,
};
pub use crate::verify::verify;

use thiserror::Error;

/// Failure modes of script construction, resolution and execution.
///
/// Everything here is a returned value; an invalid script never panics and
/// never prevents validation of unrelated scripts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// An opcode required more stack items than were present.
    #[error("an opcode required more stack items than present")]
    StackUnderflow,
    /// The stack depth limit was exceeded.
    #[error("stack depth limit exceeded")]
    StackOverflow,
    /// A pushed element exceeds the per-element size limit.
    #[error("stack element exceeds the size limit")]
    PushSize,
    /// The script contains a byte with no assigned instruction.
    #[error("script contains unassigned opcode byte 0x{0:02x}")]
    UnknownOpcode(u8),
    /// The script bytes end in the middle of a data push, or a stack
    /// element could not be read back as a script number.
    #[error("malformed script encoding")]
    MalformedScript,
    /// A P2SH/P2WSH program does not match the supplied redeem or witness
    /// script.
    #[error("redeem or witness script does not hash to the committed program")]
    HashMismatch,
    /// A CHECKSIG verification left a false result on the stack and the
    /// script failed because of it.
    #[error("signature check failed")]
    SignatureInvalid,
    /// CHECKMULTISIG could not match the required number of signatures in
    /// key order.
    #[error("multisig threshold not met in key order")]
    ThresholdNotMet,
    /// Malformed multisig parameters (`m`/`n` outside `1 <= m <= n <= 20`).
    #[error("invalid multisig policy parameters")]
    InvalidPolicy,
    /// The witness stack has the wrong number or shape of elements for the
    /// classified program type, or a witness was supplied where none is
    /// expected.
    #[error("witness stack has the wrong shape for the program type")]
    MalformedWitness,
    /// The scriptSig of a P2SH spend contained non-push instructions, or a
    /// native witness spend carried a non-empty scriptSig.
    #[error("scriptSig must contain only data pushes")]
    MalformedScriptSig,
    /// OP_EQUALVERIFY compared two unequal elements.
    #[error("OP_EQUALVERIFY failed")]
    EqualVerify,
    /// OP_VERIFY consumed a false element.
    #[error("OP_VERIFY failed")]
    VerifyFailed,
    /// The script ran to completion but did not leave exactly one true
    /// element on the stack.
    #[error("script finished with a false or unclean final stack")]
    EvalFalse,
}
