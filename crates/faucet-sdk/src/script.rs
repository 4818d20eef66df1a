//! Script-level encoding helpers: minimal data pushes, script numbers,
//! compact sizes and the standard locking script templates.

use bitcoin::hashes::{Hash as _, sha256d};

pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1NEGATE: u8 = 0x4f;
    pub const OP_1: u8 = 0x51;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_HASH256: u8 = 0xaa;
    pub const OP_CHECKSIG: u8 = 0xac;
}

use opcodes::*;

/// Append a minimally-encoded push of `data` to `script`.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    match data {
        [] => script.push(OP_0),
        [n @ 1..=16] => script.push(OP_1 + n - 1),
        [0x81] => script.push(OP_1NEGATE),
        _ => {
            let len = data.len();
            if len <= 75 {
                script.push(len as u8);
            } else if len <= 0xff {
                script.push(OP_PUSHDATA1);
                script.push(len as u8);
            } else if len <= 0xffff {
                script.push(OP_PUSHDATA2);
                script.extend_from_slice(&(len as u16).to_le_bytes());
            } else {
                script.push(OP_PUSHDATA4);
                script.extend_from_slice(&(len as u32).to_le_bytes());
            }
            script.extend_from_slice(data);
        }
    }
}

/// Encode an integer as a minimal little-endian script number with sign bit.
pub fn encode_script_number(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

/// Number of bytes a compact-size (varint) prefix of `n` occupies.
pub fn compact_size_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

pub fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Write `bytes` prefixed by its compact-size length.
pub fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Double SHA-256, in internal byte order.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// `OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_locking_script(pubkey_hash: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_HASH160 <hash> OP_EQUAL` for 20-byte script hashes, `OP_HASH256 <hash> OP_EQUAL`
/// for 32-byte ones.
pub fn p2sh_locking_script(script_hash: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(script_hash.len() + 3);
    script.push(if script_hash.len() == 32 {
        OP_HASH256
    } else {
        OP_HASH160
    });
    push_data(&mut script, script_hash);
    script.push(OP_EQUAL);
    script
}
