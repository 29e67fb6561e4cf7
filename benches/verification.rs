use bitcoin::absolute::LockTime;
use bitcoin::hashes::{hash160, Hash};
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness};
use criterion::{criterion_group, criterion_main, Criterion};

use spendscript::{
    multisig, p2pkh, p2wsh, verify, Opcode, Script, ScriptTemplate, Secp256k1Verifier,
    SigningContext,
};

struct BenchCase {
    name: &'static str,
    locking: Script,
    script_sig: Script,
    witness: Vec<Vec<u8>>,
    amount: Amount,
}

fn keypair(secp: &Secp256k1<All>, seed: u8) -> (SecretKey, PublicKey) {
    let sk = SecretKey::from_slice(&[seed; 32]).expect("valid seed");
    (sk, PublicKey::from_secret_key(secp, &sk))
}

fn spending_tx() -> Transaction {
    Transaction {
        version: Version(2),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::default(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(40_000),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

fn p2pkh_case(secp: &Secp256k1<All>, tx: &Transaction) -> BenchCase {
    let (sk, pk) = keypair(secp, 1);
    let locking = p2pkh(hash160::Hash::hash(&pk.serialize()).to_byte_array());
    let code = ScriptBuf::from_bytes(locking.to_bytes());
    let sighash = SighashCache::new(tx)
        .legacy_signature_hash(0, &code, EcdsaSighashType::All.to_u32())
        .expect("legacy sighash");
    let mut sig = secp
        .sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), &sk)
        .serialize_der()
        .to_vec();
    sig.push(EcdsaSighashType::All.to_u32() as u8);
    BenchCase {
        name: "p2pkh",
        script_sig: Script::new(vec![
            Opcode::PushData(sig),
            Opcode::PushData(pk.serialize().to_vec()),
        ]),
        locking,
        witness: Vec::new(),
        amount: Amount::ZERO,
    }
}

fn p2wsh_multisig_case(secp: &Secp256k1<All>, tx: &Transaction) -> BenchCase {
    let amount = Amount::from_sat(90_000);
    let keys: Vec<_> = [11u8, 12, 13].iter().map(|s| keypair(secp, *s)).collect();
    let witness_script = multisig(
        2,
        keys.iter().map(|(_, pk)| pk.serialize().to_vec()).collect(),
    )
    .expect("valid policy");
    let code = ScriptBuf::from_bytes(witness_script.to_bytes());
    let mut witness = vec![Vec::new()];
    for (sk, _) in &keys[..2] {
        let sighash = SighashCache::new(tx)
            .p2wsh_signature_hash(0, &code, amount, EcdsaSighashType::All)
            .expect("segwit sighash");
        let mut sig = secp
            .sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), sk)
            .serialize_der()
            .to_vec();
        sig.push(EcdsaSighashType::All.to_u32() as u8);
        witness.push(sig);
    }
    witness.push(witness_script.to_bytes());
    BenchCase {
        name: "p2sh_p2wsh_multisig",
        locking: ScriptTemplate::p2sh_of(&p2wsh(witness_script.witness_hash())).locking_script(),
        script_sig: Script::new(vec![Opcode::PushData(
            p2wsh(witness_script.witness_hash()).to_bytes(),
        )]),
        witness,
        amount,
    }
}

pub fn verification_bench(c: &mut Criterion) {
    let secp = Secp256k1::new();
    let tx = spending_tx();
    let cases = vec![p2pkh_case(&secp, &tx), p2wsh_multisig_case(&secp, &tx)];

    let mut group = c.benchmark_group("verify");
    for case in &cases {
        let ctx = SigningContext::new(&tx, 0, case.amount);
        group.bench_function(case.name, |b| {
            b.iter(|| {
                verify(
                    &case.locking,
                    &case.script_sig,
                    &case.witness,
                    &ctx,
                    &Secp256k1Verifier,
                )
                .expect("bench case verifies")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, verification_bench);
criterion_main!(benches);
