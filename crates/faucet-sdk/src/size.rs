//! Byte-size estimation for fee calculation.

use crate::contract::{FunctionArg, FunctionCall};
use crate::plan::Output;
use crate::script::{compact_size_len, encode_script_number, push_data};

/// Largest DER signature with the sighash byte appended.
pub const SIGNATURE_PLACEHOLDER_LEN: usize = 71;

/// outpoint txid + vout
const OUTPOINT_LEN: usize = 32 + 4;
const SEQUENCE_LEN: usize = 4;
const VERSION_LEN: usize = 4;
const LOCKTIME_LEN: usize = 4;
const VALUE_LEN: usize = 8;

/// Unlocking script for a contract input: arguments last-first, then the selector,
/// then the redeem script. `signature` fills every signature argument.
pub fn input_script(redeem_script: &[u8], call: &FunctionCall, signature: &[u8]) -> Vec<u8> {
    unlocking_script(redeem_script, call.selector, &call.args, signature)
}

fn unlocking_script(
    redeem_script: &[u8],
    selector: Option<usize>,
    args: &[FunctionArg],
    signature: &[u8],
) -> Vec<u8> {
    let mut script = Vec::new();
    for arg in args.iter().rev() {
        match arg {
            FunctionArg::Bytes(bytes) => push_data(&mut script, bytes),
            FunctionArg::Signature => push_data(&mut script, signature),
        }
    }
    if let Some(selector) = selector {
        push_data(&mut script, &encode_script_number(selector as i64));
    }
    push_data(&mut script, redeem_script);
    script
}

/// Serialized size of an input carrying `script`.
pub fn input_size(script_len: usize) -> usize {
    OUTPOINT_LEN + compact_size_len(script_len as u64) + script_len + SEQUENCE_LEN
}

/// Size of an input spending the contract, with signatures at their maximum length.
pub fn estimate_input_size(
    redeem_script: &[u8],
    selector: Option<usize>,
    args: &[FunctionArg],
) -> usize {
    let placeholder = [0u8; SIGNATURE_PLACEHOLDER_LEN];
    let script = unlocking_script(redeem_script, selector, args, &placeholder);
    input_size(script.len())
}

/// Size of a P2PKH input: signature placeholder plus compressed key.
pub fn p2pkh_input_size() -> usize {
    input_size(1 + SIGNATURE_PLACEHOLDER_LEN + 1 + 33)
}

/// Serialized size of an output: value, script length, token prefix and locking script.
pub fn output_size(output: &Output) -> usize {
    let script_len = output.payload.prefix_len() + output.locking_script().len();
    VALUE_LEN + compact_size_len(script_len as u64) + script_len
}

/// Transaction size excluding inputs. The output count leaves room for one
/// change output.
pub fn tx_size_without_inputs(outputs: &[Output]) -> usize {
    VERSION_LEN
        + LOCKTIME_LEN
        + compact_size_len(outputs.len() as u64 + 1)
        + outputs.iter().map(output_size).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Destination;
    use crate::token::{Category, Payload};

    #[test]
    fn input_size_grows_with_argument_length() {
        let redeem = vec![0x51; 60];
        let short = estimate_input_size(&redeem, Some(0), &[FunctionArg::Bytes(b"ab".to_vec())]);
        let long = estimate_input_size(&redeem, Some(0), &[FunctionArg::Bytes(b"abcd".to_vec())]);
        assert_eq!(long - short, 2);
    }

    #[test]
    fn signature_uses_placeholder() {
        let redeem = vec![0x51; 60];
        let size = estimate_input_size(
            &redeem,
            Some(1),
            &[FunctionArg::Signature, FunctionArg::Bytes(vec![2; 33])],
        );
        // push(pk) + push(sig) + OP_1 + push(redeem)
        let script_len = 34 + 72 + 1 + 61;
        assert_eq!(size, 32 + 4 + 1 + script_len + 4);
    }

    #[test]
    fn selector_is_optional() {
        let redeem = vec![0x51; 10];
        let with = estimate_input_size(&redeem, Some(0), &[]);
        let without = estimate_input_size(&redeem, None, &[]);
        assert_eq!(with - without, 1);
    }

    #[test]
    fn long_scripts_use_wider_varint() {
        let redeem = vec![0x51; 300];
        let size = estimate_input_size(&redeem, None, &[]);
        // PUSHDATA2 + 2 length bytes, varint of 303 is 3 bytes.
        assert_eq!(size, 36 + 3 + 303 + 4);
    }

    #[test]
    fn outputs_and_frame() {
        let plain = Output::new(Destination::Script(vec![0; 25]), 1000);
        assert_eq!(output_size(&plain), 8 + 1 + 25);

        let token = Output::new(Destination::Script(vec![0; 35]), 1000).with_payload(
            Payload::Fungible {
                category: Category([1; 32]),
                amount: 10,
            },
        );
        assert_eq!(output_size(&token), 8 + 1 + 35 + 35);

        assert_eq!(
            tx_size_without_inputs(&[plain.clone(), token.clone()]),
            4 + 4 + 1 + 34 + 79
        );
        assert_eq!(tx_size_without_inputs(&[]), 9);
    }
}
