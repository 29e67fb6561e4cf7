//! End-to-end spend verification.
//!
//! Classification decides the execution plan; the interpreter supplies the
//! opcode semantics; this module wires the two together and applies the
//! final-state acceptance rule. Verification is side-effect free and
//! deterministic: identical inputs always yield identical results, and
//! independent calls share no state.

use bitcoin::hashes::{sha256, Hash};

use crate::interpreter::{Interpreter, SigVersion};
use crate::resolve::{classify, ScriptClass};
use crate::script::Script;
use crate::sig::{SignatureVerifier, SigningContext};
use crate::stack::{cast_to_bool, Stack};
use crate::templates;
use crate::ScriptError;

/// Verifies that the unlocking data authorizes spending the output locked
/// by `locking_script`.
///
/// `witness` is the witness stack of the spending input, bottom element
/// first; it must be empty unless the spend resolves to a version-0
/// witness program. `ctx` supplies digest derivation over the spending
/// transaction and `verifier` the signature-checking capability.
pub fn verify<V: SignatureVerifier>(
    locking_script: &Script,
    script_sig: &Script,
    witness: &[Vec<u8>],
    ctx: &SigningContext<'_>,
    verifier: &V,
) -> Result<(), ScriptError> {
    let class = classify(locking_script);
    log::debug!(
        "verifying input {} as {:?}, scriptSig {} op(s), witness {} item(s)",
        ctx.input_index(),
        class,
        script_sig.ops().len(),
        witness.len()
    );
    let mut interp = Interpreter::new(ctx, verifier);
    match class {
        ScriptClass::P2wpkh(program) => {
            // Native witness program: the scriptSig plays no role and
            // must be empty.
            if !script_sig.is_empty() {
                return Err(ScriptError::MalformedScriptSig);
            }
            run_v0_keyhash(&mut interp, program, witness)
        }
        ScriptClass::P2wsh(program) => {
            if !script_sig.is_empty() {
                return Err(ScriptError::MalformedScriptSig);
            }
            run_v0_scripthash(&mut interp, program, witness)
        }
        ScriptClass::P2sh(_) => run_script_hash(&mut interp, locking_script, script_sig, witness),
        ScriptClass::Bare => {
            if !witness.is_empty() {
                return Err(ScriptError::MalformedWitness);
            }
            // scriptSig and locking script form one continuous run over
            // one stack.
            let mut stack = Stack::new();
            interp.run(&mut stack, script_sig, SigVersion::Base)?;
            interp.run(&mut stack, locking_script, SigVersion::Base)?;
            interp.finish(&stack)
        }
    }
}

/// P2WPKH: the witness must be exactly `[signature, pubkey]`; execution is
/// the canonical P2PKH script over those two items with witness digests.
fn run_v0_keyhash<V: SignatureVerifier>(
    interp: &mut Interpreter<'_, '_, V>,
    program: [u8; 20],
    witness: &[Vec<u8>],
) -> Result<(), ScriptError> {
    if witness.len() != 2 {
        return Err(ScriptError::MalformedWitness);
    }
    let mut stack = Stack::from_items(witness.to_vec())?;
    let script = templates::p2pkh(program);
    interp.run(&mut stack, &script, SigVersion::WitnessV0)?;
    interp.finish(&stack)
}

/// P2WSH: the last witness item is the witness script; it must hash to
/// the program, and it executes over the remaining items.
fn run_v0_scripthash<V: SignatureVerifier>(
    interp: &mut Interpreter<'_, '_, V>,
    program: [u8; 32],
    witness: &[Vec<u8>],
) -> Result<(), ScriptError> {
    let Some((script_bytes, rest)) = witness.split_last() else {
        return Err(ScriptError::MalformedWitness);
    };
    if sha256::Hash::hash(script_bytes).to_byte_array() != program {
        return Err(ScriptError::HashMismatch);
    }
    let witness_script = Script::parse(script_bytes)?;
    let mut stack = Stack::from_items(rest.to_vec())?;
    interp.run(&mut stack, &witness_script, SigVersion::WitnessV0)?;
    interp.finish(&stack)
}

/// P2SH: the scriptSig pushes run first, the locking script checks the
/// redeem script against the committed hash, then the redeem script is
/// re-classified and executed: directly on the remaining stack for a
/// legacy redeem script, or through the witness rules when it is itself a
/// witness program (P2SH-P2WPKH / P2SH-P2WSH).
fn run_script_hash<V: SignatureVerifier>(
    interp: &mut Interpreter<'_, '_, V>,
    locking_script: &Script,
    script_sig: &Script,
    witness: &[Vec<u8>],
) -> Result<(), ScriptError> {
    if !script_sig.is_push_only() {
        return Err(ScriptError::MalformedScriptSig);
    }
    let mut stack = Stack::new();
    interp.run(&mut stack, script_sig, SigVersion::Base)?;

    // Run the locking script over a copy so the redeem script push
    // survives for the inner execution.
    let mut outer = stack.clone();
    interp.run(&mut outer, locking_script, SigVersion::Base)?;
    if !matches!(outer.peek(), Ok(top) if cast_to_bool(top)) {
        return Err(ScriptError::HashMismatch);
    }

    let redeem_bytes = stack.pop()?;
    let redeem_script = Script::parse(&redeem_bytes)?;
    match classify(&redeem_script) {
        ScriptClass::P2wpkh(program) => {
            // Nested witness spend: the scriptSig must be exactly the
            // redeem script push; the real data lives on the witness.
            if !stack.is_empty() {
                return Err(ScriptError::MalformedScriptSig);
            }
            run_v0_keyhash(interp, program, witness)
        }
        ScriptClass::P2wsh(program) => {
            if !stack.is_empty() {
                return Err(ScriptError::MalformedScriptSig);
            }
            run_v0_scripthash(interp, program, witness)
        }
        _ => {
            if !witness.is_empty() {
                return Err(ScriptError::MalformedWitness);
            }
            interp.run(&mut stack, &redeem_script, SigVersion::Base)?;
            interp.finish(&stack)
        }
    }
}
