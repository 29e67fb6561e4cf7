//! Script representation and its wire encoding.
//!
//! A [`Script`] is an immutable sequence of [`Opcode`] values. The opcode
//! set is closed: it covers exactly what the standard spend paths need.
//! Scripts round-trip through the standard Bitcoin byte encoding, using
//! the opcode table from `bitcoin::opcodes` and minimal-length push
//! prefixes (direct length for pushes of up to 75 bytes, OP_PUSHDATA1/2/4
//! beyond that).

use core::fmt;

use bitcoin::hashes::{hash160, sha256, Hash};
use bitcoin::opcodes::all;

use crate::ScriptError;

/// One script instruction. Carries no mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// Pushes the literal bytes verbatim (OP_PUSHBYTES / OP_PUSHDATA).
    PushData(Vec<u8>),
    /// OP_0: pushes the empty element.
    Zero,
    /// OP_1 through OP_16: pushes the small number `1..=16`.
    PushNum(u8),
    Nop,
    Drop,
    Dup,
    Swap,
    Verify,
    Equal,
    EqualVerify,
    Ripemd160,
    Sha256,
    Hash160,
    Hash256,
    CheckSig,
    CheckSigVerify,
    CheckMultiSig,
    CheckMultiSigVerify,
}

impl Opcode {
    fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            Opcode::PushData(data) => {
                match data.len() {
                    0..=75 => out.push(data.len() as u8),
                    76..=0xff => {
                        out.push(all::OP_PUSHDATA1.to_u8());
                        out.push(data.len() as u8);
                    }
                    0x100..=0xffff => {
                        out.push(all::OP_PUSHDATA2.to_u8());
                        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
                    }
                    _ => {
                        out.push(all::OP_PUSHDATA4.to_u8());
                        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                    }
                }
                out.extend_from_slice(data);
            }
            Opcode::Zero => out.push(all::OP_PUSHBYTES_0.to_u8()),
            Opcode::PushNum(n) => out.push(all::OP_PUSHNUM_1.to_u8() + (n - 1)),
            Opcode::Nop => out.push(all::OP_NOP.to_u8()),
            Opcode::Drop => out.push(all::OP_DROP.to_u8()),
            Opcode::Dup => out.push(all::OP_DUP.to_u8()),
            Opcode::Swap => out.push(all::OP_SWAP.to_u8()),
            Opcode::Verify => out.push(all::OP_VERIFY.to_u8()),
            Opcode::Equal => out.push(all::OP_EQUAL.to_u8()),
            Opcode::EqualVerify => out.push(all::OP_EQUALVERIFY.to_u8()),
            Opcode::Ripemd160 => out.push(all::OP_RIPEMD160.to_u8()),
            Opcode::Sha256 => out.push(all::OP_SHA256.to_u8()),
            Opcode::Hash160 => out.push(all::OP_HASH160.to_u8()),
            Opcode::Hash256 => out.push(all::OP_HASH256.to_u8()),
            Opcode::CheckSig => out.push(all::OP_CHECKSIG.to_u8()),
            Opcode::CheckSigVerify => out.push(all::OP_CHECKSIGVERIFY.to_u8()),
            Opcode::CheckMultiSig => out.push(all::OP_CHECKMULTISIG.to_u8()),
            Opcode::CheckMultiSigVerify => out.push(all::OP_CHECKMULTISIGVERIFY.to_u8()),
        }
    }

    /// True for instructions that only move literal data onto the stack.
    pub fn is_push(&self) -> bool {
        matches!(
            self,
            Opcode::PushData(_) | Opcode::Zero | Opcode::PushNum(_)
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::PushData(data) => {
                for byte in data {
                    write!(f, "{:02x}", byte)?;
                }
                if data.is_empty() {
                    f.write_str("<empty>")?;
                }
                Ok(())
            }
            Opcode::Zero => f.write_str("OP_0"),
            Opcode::PushNum(n) => write!(f, "OP_{}", n),
            Opcode::Nop => f.write_str("OP_NOP"),
            Opcode::Drop => f.write_str("OP_DROP"),
            Opcode::Dup => f.write_str("OP_DUP"),
            Opcode::Swap => f.write_str("OP_SWAP"),
            Opcode::Verify => f.write_str("OP_VERIFY"),
            Opcode::Equal => f.write_str("OP_EQUAL"),
            Opcode::EqualVerify => f.write_str("OP_EQUALVERIFY"),
            Opcode::Ripemd160 => f.write_str("OP_RIPEMD160"),
            Opcode::Sha256 => f.write_str("OP_SHA256"),
            Opcode::Hash160 => f.write_str("OP_HASH160"),
            Opcode::Hash256 => f.write_str("OP_HASH256"),
            Opcode::CheckSig => f.write_str("OP_CHECKSIG"),
            Opcode::CheckSigVerify => f.write_str("OP_CHECKSIGVERIFY"),
            Opcode::CheckMultiSig => f.write_str("OP_CHECKMULTISIG"),
            Opcode::CheckMultiSigVerify => f.write_str("OP_CHECKMULTISIGVERIFY"),
        }
    }
}

/// An ordered, immutable sequence of opcodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    ops: Vec<Opcode>,
}

impl Script {
    pub fn new(ops: Vec<Opcode>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[Opcode] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// True when every instruction is a data push. Required of P2SH
    /// scriptSigs.
    pub fn is_push_only(&self) -> bool {
        self.ops.iter().all(Opcode::is_push)
    }

    /// Serializes to the standard Bitcoin script byte encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for op in &self.ops {
            op.serialize_into(&mut out);
        }
        out
    }

    /// Parses the standard byte encoding back into opcodes.
    ///
    /// Bytes outside the supported instruction set yield
    /// [`ScriptError::UnknownOpcode`]; a push whose declared length runs
    /// past the end of the script yields [`ScriptError::MalformedScript`].
    pub fn parse(bytes: &[u8]) -> Result<Self, ScriptError> {
        let mut ops = Vec::new();
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            let byte = bytes[cursor];
            cursor += 1;
            if (0x01..=0x4b).contains(&byte) {
                let len = byte as usize;
                ops.push(Opcode::PushData(read_push(bytes, &mut cursor, len)?));
                continue;
            }
            let op = bitcoin::opcodes::Opcode::from(byte);
            if matches!(op, all::OP_PUSHDATA1 | all::OP_PUSHDATA2 | all::OP_PUSHDATA4) {
                let width = match op {
                    all::OP_PUSHDATA1 => 1,
                    all::OP_PUSHDATA2 => 2,
                    _ => 4,
                };
                let len = read_push_length(bytes, &mut cursor, width)?;
                ops.push(Opcode::PushData(read_push(bytes, &mut cursor, len)?));
                continue;
            }
            if byte >= all::OP_PUSHNUM_1.to_u8() && byte <= all::OP_PUSHNUM_16.to_u8() {
                ops.push(Opcode::PushNum(byte - all::OP_PUSHNUM_1.to_u8() + 1));
                continue;
            }
            let decoded = match op {
                all::OP_PUSHBYTES_0 => Opcode::Zero,
                all::OP_NOP => Opcode::Nop,
                all::OP_DROP => Opcode::Drop,
                all::OP_DUP => Opcode::Dup,
                all::OP_SWAP => Opcode::Swap,
                all::OP_VERIFY => Opcode::Verify,
                all::OP_EQUAL => Opcode::Equal,
                all::OP_EQUALVERIFY => Opcode::EqualVerify,
                all::OP_RIPEMD160 => Opcode::Ripemd160,
                all::OP_SHA256 => Opcode::Sha256,
                all::OP_HASH160 => Opcode::Hash160,
                all::OP_HASH256 => Opcode::Hash256,
                all::OP_CHECKSIG => Opcode::CheckSig,
                all::OP_CHECKSIGVERIFY => Opcode::CheckSigVerify,
                all::OP_CHECKMULTISIG => Opcode::CheckMultiSig,
                all::OP_CHECKMULTISIGVERIFY => Opcode::CheckMultiSigVerify,
                _ => return Err(ScriptError::UnknownOpcode(byte)),
            };
            ops.push(decoded);
        }
        Ok(Self { ops })
    }

    /// HASH160 of the serialized script, as committed by P2SH outputs.
    pub fn script_hash(&self) -> [u8; 20] {
        hash160::Hash::hash(&self.to_bytes()).to_byte_array()
    }

    /// SHA256 of the serialized script, as committed by P2WSH outputs.
    pub fn witness_hash(&self) -> [u8; 32] {
        sha256::Hash::hash(&self.to_bytes()).to_byte_array()
    }

    /// Returns a copy with every push of exactly `data` removed. The
    /// legacy sighash algorithm strips the checked signature from the
    /// script code this way (Core's `FindAndDelete`).
    pub(crate) fn without_push(&self, data: &[u8]) -> Script {
        let ops = self
            .ops
            .iter()
            .filter(|op| !matches!(op, Opcode::PushData(d) if d.as_slice() == data))
            .cloned()
            .collect();
        Script { ops }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

fn read_push_length(
    bytes: &[u8],
    cursor: &mut usize,
    width: usize,
) -> Result<usize, ScriptError> {
    if bytes.len() < *cursor + width {
        return Err(ScriptError::MalformedScript);
    }
    let mut len = 0usize;
    for i in 0..width {
        len |= (bytes[*cursor + i] as usize) << (8 * i);
    }
    *cursor += width;
    Ok(len)
}

fn read_push(bytes: &[u8], cursor: &mut usize, len: usize) -> Result<Vec<u8>, ScriptError> {
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or(ScriptError::MalformedScript)?;
    let data = bytes[*cursor..end].to_vec();
    *cursor = end;
    Ok(data)
}

/// Encodes a number in the minimal little-endian sign-magnitude form used
/// on the stack.
pub(crate) fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut abs_value = value.unsigned_abs();
    while abs_value > 0 {
        result.push((abs_value & 0xff) as u8);
        abs_value >>= 8;
    }

    if let Some(last) = result.last_mut() {
        if *last & 0x80 != 0 {
            result.push(if value < 0 { 0x80 } else { 0x00 });
        } else if value < 0 {
            *last |= 0x80;
        }
    }

    result
}

/// Decodes a stack element back into a number. Elements longer than four
/// bytes are rejected, matching the interpreter's numeric range.
pub(crate) fn decode_num(bytes: &[u8]) -> Result<i64, ScriptError> {
    if bytes.len() > 4 {
        return Err(ScriptError::MalformedScript);
    }
    if bytes.is_empty() {
        return Ok(0);
    }

    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }

    let last = bytes[bytes.len() - 1];
    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
        Ok(-(result & mask))
    } else {
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_shape_round_trips() {
        let script = Script::new(vec![
            Opcode::Dup,
            Opcode::Hash160,
            Opcode::PushData(vec![0xab; 20]),
            Opcode::EqualVerify,
            Opcode::CheckSig,
        ]);
        let bytes = script.to_bytes();
        assert_eq!(bytes[0], all::OP_DUP.to_u8());
        assert_eq!(bytes[1], all::OP_HASH160.to_u8());
        assert_eq!(bytes[2], 20);
        assert_eq!(Script::parse(&bytes).unwrap(), script);
    }

    #[test]
    fn large_pushes_use_pushdata_prefixes() {
        let script = Script::new(vec![Opcode::PushData(vec![7; 300])]);
        let bytes = script.to_bytes();
        assert_eq!(bytes[0], all::OP_PUSHDATA2.to_u8());
        assert_eq!(&bytes[1..3], &300u16.to_le_bytes());
        assert_eq!(Script::parse(&bytes).unwrap(), script);
    }

    #[test]
    fn pushnum_round_trips_through_single_bytes() {
        for n in 1..=16u8 {
            let bytes = Script::new(vec![Opcode::PushNum(n)]).to_bytes();
            assert_eq!(bytes, vec![all::OP_PUSHNUM_1.to_u8() + n - 1]);
            assert_eq!(
                Script::parse(&bytes).unwrap().ops(),
                &[Opcode::PushNum(n)]
            );
        }
    }

    #[test]
    fn unassigned_byte_is_unknown_opcode() {
        let err = Script::parse(&[all::OP_CAT.to_u8()]).unwrap_err();
        assert_eq!(err, ScriptError::UnknownOpcode(all::OP_CAT.to_u8()));
    }

    #[test]
    fn truncated_push_is_malformed() {
        assert_eq!(
            Script::parse(&[0x4b, 0x01]),
            Err(ScriptError::MalformedScript)
        );
        assert_eq!(
            Script::parse(&[all::OP_PUSHDATA1.to_u8()]),
            Err(ScriptError::MalformedScript)
        );
    }

    #[test]
    fn push_only_classification() {
        let pushes = Script::new(vec![
            Opcode::Zero,
            Opcode::PushNum(3),
            Opcode::PushData(vec![1, 2]),
        ]);
        assert!(pushes.is_push_only());
        let with_dup = Script::new(vec![Opcode::PushData(vec![1]), Opcode::Dup]);
        assert!(!with_dup.is_push_only());
    }

    #[test]
    fn without_push_strips_whole_pushes_only() {
        let script = Script::new(vec![
            Opcode::PushData(vec![2, 3]),
            Opcode::Dup,
            Opcode::PushData(vec![2, 3, 4]),
            Opcode::PushData(vec![2, 3]),
        ]);
        let stripped = script.without_push(&[2, 3]);
        assert_eq!(
            stripped.ops(),
            &[Opcode::Dup, Opcode::PushData(vec![2, 3, 4])]
        );
    }

    #[test]
    fn scriptnum_round_trip() {
        for value in [0i64, 1, -1, 127, 128, -128, 0x7fff, -0x7fff, 0x7fffffff] {
            let encoded = encode_num(value);
            assert_eq!(decode_num(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn scriptnum_overflow_is_rejected() {
        assert_eq!(
            decode_num(&[0, 0, 0, 0x80, 0]),
            Err(ScriptError::MalformedScript)
        );
    }
}
