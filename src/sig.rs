//! Signature checking capability and message digest derivation.
//!
//! The interpreter never talks to secp256k1 directly. It derives a 32-byte
//! digest through [`SigningContext`] and hands it, together with the raw
//! signature and public key bytes, to an injected [`SignatureVerifier`].
//! Production code uses [`Secp256k1Verifier`]; tests can substitute an
//! in-memory fake.

use core::cell::RefCell;
use std::sync::OnceLock;

use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::{self, ecdsa::Signature as EcdsaSignature, Message, PublicKey, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SegwitV0Sighash, SighashCache};
use bitcoin::{Amount, Transaction};

use crate::interpreter::SigVersion;
use crate::script::Script;

/// Boolean verdict over a message digest, a DER-encoded ECDSA signature
/// (sighash-type byte already stripped) and a SEC1 public key.
pub trait SignatureVerifier {
    fn verify_signature(&self, digest: &[u8; 32], signature: &[u8], pubkey: &[u8]) -> bool;
}

static SECP256K1: OnceLock<Secp256k1<secp256k1::VerifyOnly>> = OnceLock::new();

fn secp_ctx() -> &'static Secp256k1<secp256k1::VerifyOnly> {
    SECP256K1.get_or_init(Secp256k1::verification_only)
}

/// Real ECDSA verification over secp256k1.
///
/// Malformed signature or public key encodings are a `false` verdict, not
/// an error: legacy script treats them as a failed check and pushes zero.
/// Lax DER parsing plus S normalization matches the permissive pre-BIP66
/// consensus behaviour.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn verify_signature(&self, digest: &[u8; 32], signature: &[u8], pubkey: &[u8]) -> bool {
        let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
            return false;
        };
        let Ok(mut sig) = EcdsaSignature::from_der_lax(signature) else {
            return false;
        };
        sig.normalize_s();
        let message = Message::from_digest(*digest);
        secp_ctx().verify_ecdsa(&message, &sig, &pubkey).is_ok()
    }
}

/// Per-spend digest derivation over the spending transaction.
///
/// Legacy digests cover the modified transaction serialization with other
/// inputs' scripts blanked; witness-v0 digests additionally commit to the
/// spent output's value (BIP143). Both are delegated to the `bitcoin`
/// crate's sighash cache.
pub struct SigningContext<'tx> {
    cache: RefCell<SighashCache<&'tx Transaction>>,
    input_index: usize,
    amount: Amount,
}

impl<'tx> SigningContext<'tx> {
    /// `amount` is the value of the output being spent; it only enters
    /// witness-v0 digests and may be zero for legacy-only validation.
    pub fn new(tx: &'tx Transaction, input_index: usize, amount: Amount) -> Self {
        Self {
            cache: RefCell::new(SighashCache::new(tx)),
            input_index,
            amount,
        }
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    /// Derives the signed digest for `script_code` under the given sighash
    /// type. `None` means the digest cannot be computed (for example an
    /// out-of-range input index) and the signature check must fail.
    pub(crate) fn digest(
        &self,
        script_code: &Script,
        sighash_type: u32,
        sig_version: SigVersion,
    ) -> Option<[u8; 32]> {
        let code = ScriptBuf::from_bytes(script_code.to_bytes());
        match sig_version {
            SigVersion::Base => {
                let sighash = self
                    .cache
                    .borrow()
                    .legacy_signature_hash(self.input_index, &code, sighash_type)
                    .ok()?;
                Some(sighash.to_byte_array())
            }
            SigVersion::WitnessV0 => {
                let ty = EcdsaSighashType::from_consensus(sighash_type);
                let mut engine = SegwitV0Sighash::engine();
                self.cache
                    .borrow_mut()
                    .segwit_v0_encode_signing_data_to(
                        &mut engine,
                        self.input_index,
                        &code,
                        self.amount,
                        ty,
                    )
                    .ok()?;
                Some(SegwitV0Sighash::from_engine(engine).to_byte_array())
            }
        }
    }
}
