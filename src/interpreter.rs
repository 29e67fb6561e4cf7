//! The opcode executor: a single dispatch loop over the closed opcode set.

use bitcoin::hashes::{hash160, ripemd160, sha256, sha256d, Hash};

use crate::script::{decode_num, encode_num, Opcode, Script};
use crate::sig::{SignatureVerifier, SigningContext};
use crate::stack::{cast_to_bool, Stack};
use crate::templates::MAX_MULTISIG_KEYS;
use crate::ScriptError;

/// Which digest algorithm signature checks in a script use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SigVersion {
    /// Legacy sighash over the modified transaction serialization.
    Base,
    /// BIP143 sighash committing to the spent output's value.
    WitnessV0,
}

/// Execution state for one validation attempt.
///
/// Owns no stack itself; the verifier threads stacks through `run` so the
/// P2SH path can preserve and resume intermediate stack states. A failed
/// signature or threshold check pushes a false result and records a
/// diagnostic; the diagnostic is surfaced only if the run ultimately fails
/// the final-stack rule.
pub(crate) struct Interpreter<'a, 'tx, V: SignatureVerifier> {
    ctx: &'a SigningContext<'tx>,
    verifier: &'a V,
    diagnostic: Option<ScriptError>,
}

impl<'a, 'tx, V: SignatureVerifier> Interpreter<'a, 'tx, V> {
    pub(crate) fn new(ctx: &'a SigningContext<'tx>, verifier: &'a V) -> Self {
        Self {
            ctx,
            verifier,
            diagnostic: None,
        }
    }

    /// Executes every opcode of `script` against `stack`.
    ///
    /// Structural failures (underflow, size ceilings, aborting VERIFY
    /// variants) terminate the run immediately.
    pub(crate) fn run(
        &mut self,
        stack: &mut Stack,
        script: &Script,
        sig_version: SigVersion,
    ) -> Result<(), ScriptError> {
        log::trace!(
            "running {} opcode(s), {:?} digests, {} stack item(s) in",
            script.ops().len(),
            sig_version,
            stack.len()
        );
        for op in script.ops() {
            self.execute(stack, op, script, sig_version)?;
        }
        Ok(())
    }

    /// Applies the final acceptance rule: exactly one element remains and
    /// it is truthy. A falsy outcome reports the recorded diagnostic when
    /// one exists, so a failed signature surfaces as `SignatureInvalid`
    /// rather than a bare `EvalFalse`.
    pub(crate) fn finish(&self, stack: &Stack) -> Result<(), ScriptError> {
        match stack.peek() {
            Ok(top) if stack.len() == 1 && cast_to_bool(top) => Ok(()),
            _ => Err(self.diagnostic.unwrap_or(ScriptError::EvalFalse)),
        }
    }

    fn flag(&mut self, error: ScriptError) {
        self.diagnostic = Some(error);
    }

    fn execute(
        &mut self,
        stack: &mut Stack,
        op: &Opcode,
        script: &Script,
        sig_version: SigVersion,
    ) -> Result<(), ScriptError> {
        match op {
            Opcode::PushData(data) => stack.push(data.clone())?,
            Opcode::Zero => stack.push(Vec::new())?,
            Opcode::PushNum(n) => stack.push(encode_num(*n as i64))?,
            Opcode::Nop => {}
            Opcode::Drop => {
                stack.pop()?;
            }
            Opcode::Dup => {
                let top = stack.peek()?.to_vec();
                stack.push(top)?;
            }
            Opcode::Swap => stack.swap_top()?,
            Opcode::Verify => self.op_verify(stack, ScriptError::VerifyFailed)?,
            Opcode::Equal => self.op_equal(stack)?,
            Opcode::EqualVerify => {
                self.op_equal(stack)?;
                self.op_verify(stack, ScriptError::EqualVerify)?;
            }
            Opcode::Ripemd160 => {
                let data = stack.pop()?;
                stack.push(ripemd160::Hash::hash(&data).to_byte_array().to_vec())?;
            }
            Opcode::Sha256 => {
                let data = stack.pop()?;
                stack.push(sha256::Hash::hash(&data).to_byte_array().to_vec())?;
            }
            Opcode::Hash160 => {
                let data = stack.pop()?;
                stack.push(hash160::Hash::hash(&data).to_byte_array().to_vec())?;
            }
            Opcode::Hash256 => {
                let data = stack.pop()?;
                stack.push(sha256d::Hash::hash(&data).to_byte_array().to_vec())?;
            }
            Opcode::CheckSig => {
                self.op_checksig(stack, script, sig_version)?;
            }
            Opcode::CheckSigVerify => {
                self.op_checksig(stack, script, sig_version)?;
                self.op_verify(stack, ScriptError::SignatureInvalid)?;
            }
            Opcode::CheckMultiSig => {
                self.op_checkmultisig(stack, script, sig_version)?;
            }
            Opcode::CheckMultiSigVerify => {
                self.op_checkmultisig(stack, script, sig_version)?;
                self.op_verify(stack, ScriptError::ThresholdNotMet)?;
            }
        }
        Ok(())
    }

    /// EQUAL never aborts on content; it reduces two elements to a
    /// boolean. Only the VERIFY variant turns a mismatch into an abort.
    fn op_equal(&mut self, stack: &mut Stack) -> Result<(), ScriptError> {
        let a = stack.pop()?;
        let b = stack.pop()?;
        stack.push_bool(a == b)
    }

    fn op_verify(&mut self, stack: &mut Stack, error: ScriptError) -> Result<(), ScriptError> {
        let value = stack.pop()?;
        if !cast_to_bool(&value) {
            return Err(error);
        }
        Ok(())
    }

    fn op_checksig(
        &mut self,
        stack: &mut Stack,
        script: &Script,
        sig_version: SigVersion,
    ) -> Result<(), ScriptError> {
        let pubkey = stack.pop()?;
        let sig = stack.pop()?;
        let valid = self.check_signature(&sig, &pubkey, script, sig_version);
        if !valid {
            self.flag(ScriptError::SignatureInvalid);
        }
        stack.push_bool(valid)
    }

    /// Splits the trailing sighash-type byte, derives the digest for the
    /// executed script and asks the injected verifier. Malformed
    /// signatures and keys are a false verdict, never an abort: legacy
    /// scripts treat them as an ordinary failed check.
    fn check_signature(
        &mut self,
        sig: &[u8],
        pubkey: &[u8],
        script: &Script,
        sig_version: SigVersion,
    ) -> bool {
        if sig.is_empty() {
            return false;
        }
        let (der, ty) = sig.split_at(sig.len() - 1);
        let sighash_type = ty[0] as u32;
        // Legacy digests delete pushes of the checked signature from the
        // script code (Core's FindAndDelete).
        let script_code = match sig_version {
            SigVersion::Base => script.without_push(sig),
            SigVersion::WitnessV0 => script.clone(),
        };
        let Some(digest) = self.ctx.digest(&script_code, sighash_type, sig_version) else {
            return false;
        };
        self.verifier.verify_signature(&digest, der, pubkey)
    }

    /// Pops `n`, `n` keys, `m`, `m` signatures and one ignored dummy
    /// element, then matches signatures to keys strictly in order: each
    /// key is tried once, each signature must verify against some later
    /// key than the previous one. Out-of-order signatures fail.
    fn op_checkmultisig(
        &mut self,
        stack: &mut Stack,
        script: &Script,
        sig_version: SigVersion,
    ) -> Result<(), ScriptError> {
        let key_count = decode_num(&stack.pop()?)?;
        if key_count < 0 || key_count as usize > MAX_MULTISIG_KEYS {
            return Err(ScriptError::InvalidPolicy);
        }
        let key_count = key_count as usize;
        let mut pubkeys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            pubkeys.push(stack.pop()?);
        }

        let sig_count = decode_num(&stack.pop()?)?;
        if sig_count < 0 || sig_count as usize > key_count {
            return Err(ScriptError::InvalidPolicy);
        }
        let sig_count = sig_count as usize;
        let mut sigs = Vec::with_capacity(sig_count);
        for _ in 0..sig_count {
            sigs.push(stack.pop()?);
        }

        // Off-by-one artifact of the original CHECKMULTISIG: one extra
        // element is consumed and ignored.
        stack.pop()?;

        // Both vectors were popped top-first, so relative order between
        // signatures and keys is preserved.
        let mut success = true;
        let mut sig_index = 0usize;
        let mut key_index = 0usize;
        while success && sig_index < sigs.len() {
            if pubkeys.len() - key_index < sigs.len() - sig_index {
                success = false;
                break;
            }
            if self.check_signature(&sigs[sig_index], &pubkeys[key_index], script, sig_version) {
                sig_index += 1;
            }
            key_index += 1;
        }

        if !success {
            self.flag(ScriptError::ThresholdNotMet);
        }
        stack.push_bool(success)
    }
}
