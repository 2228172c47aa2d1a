//! Auto-params codec
//!
//! Both shapes travel as `abi.encode(struct)`: a single dynamic tuple
//! parameter, so the payload starts with the `0x20` offset word. Decoding is
//! strict: the input must re-encode to exactly the same bytes, which rejects
//! truncated payloads, trailing garbage, dirty padding and non-canonical
//! offsets instead of reading shifted fields.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolValue;

use crate::contracts::{
    SubmissionAutoParamsFrom as AbiAutoParamsFrom, SubmissionAutoParamsTo as AbiAutoParamsTo,
};
use crate::error::DecodeError;
use crate::flags::FlagSet;

const TO_SHAPE: &str = "SubmissionAutoParamsTo";
const FROM_SHAPE: &str = "SubmissionAutoParamsFrom";
const ADDRESS_LEN: usize = 20;

/// Origin-side auto-params, as attached to a `Sent` event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionAutoParamsTo {
    pub execution_fee: U256,
    pub flags: FlagSet,
    pub fallback_address: Bytes,
    pub data: Bytes,
}

/// Destination-side auto-params, as consumed by `claim`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionAutoParamsFrom {
    pub execution_fee: U256,
    pub flags: FlagSet,
    pub fallback_address: Address,
    pub data: Bytes,
    pub native_sender: Bytes,
}

impl SubmissionAutoParamsTo {
    /// Extend with the origin sender to obtain the claim shape.
    ///
    /// An empty fallback becomes the zero address.
    pub fn into_claim_params(
        self,
        native_sender: Bytes,
    ) -> Result<SubmissionAutoParamsFrom, DecodeError> {
        let fallback_address = match self.fallback_address.len() {
            0 => Address::ZERO,
            ADDRESS_LEN => Address::from_slice(&self.fallback_address),
            len => return Err(DecodeError::FallbackAddressLength(len)),
        };
        Ok(SubmissionAutoParamsFrom {
            execution_fee: self.execution_fee,
            flags: self.flags,
            fallback_address,
            data: self.data,
            native_sender,
        })
    }
}

pub fn encode_to(params: &SubmissionAutoParamsTo) -> Bytes {
    AbiAutoParamsTo {
        executionFee: params.execution_fee,
        flags: params.flags.to_raw(),
        fallbackAddress: params.fallback_address.clone(),
        data: params.data.clone(),
    }
    .abi_encode()
    .into()
}

pub fn encode_from(params: &SubmissionAutoParamsFrom) -> Bytes {
    AbiAutoParamsFrom {
        executionFee: params.execution_fee,
        flags: params.flags.to_raw(),
        fallbackAddress: params.fallback_address,
        data: params.data.clone(),
        nativeSender: params.native_sender.clone(),
    }
    .abi_encode()
    .into()
}

pub fn decode_to(data: &[u8]) -> Result<SubmissionAutoParamsTo, DecodeError> {
    let abi = AbiAutoParamsTo::abi_decode(data, true).map_err(|e| DecodeError::Malformed {
        shape: TO_SHAPE,
        reason: e.to_string(),
    })?;
    if abi.abi_encode() != data {
        return Err(DecodeError::NonCanonical {
            shape: TO_SHAPE,
            len: data.len(),
        });
    }
    Ok(SubmissionAutoParamsTo {
        execution_fee: abi.executionFee,
        flags: FlagSet::from_raw(abi.flags),
        fallback_address: abi.fallbackAddress,
        data: abi.data,
    })
}

pub fn decode_from(data: &[u8]) -> Result<SubmissionAutoParamsFrom, DecodeError> {
    let abi = AbiAutoParamsFrom::abi_decode(data, true).map_err(|e| DecodeError::Malformed {
        shape: FROM_SHAPE,
        reason: e.to_string(),
    })?;
    if abi.abi_encode() != data {
        return Err(DecodeError::NonCanonical {
            shape: FROM_SHAPE,
            len: data.len(),
        });
    }
    Ok(SubmissionAutoParamsFrom {
        execution_fee: abi.executionFee,
        flags: FlagSet::from_raw(abi.flags),
        fallback_address: abi.fallbackAddress,
        data: abi.data,
        native_sender: abi.nativeSender,
    })
}

/// Convert an origin auto-params blob into the blob `claim` expects.
///
/// An empty origin blob means the submission was sent without auto-params;
/// the claim then carries an empty blob as well.
pub fn convert_to_claim_params(
    origin_auto_params: &[u8],
    native_sender: &[u8],
) -> Result<Bytes, DecodeError> {
    if origin_auto_params.is_empty() {
        return Ok(Bytes::new());
    }
    let to = decode_to(origin_auto_params)?;
    let from = to.into_claim_params(Bytes::copy_from_slice(native_sender))?;
    Ok(encode_from(&from))
}

// Known-good encodings produced by the gate's own ABI coder:
// executionFee = 1000, flags = UNWRAP_ETH|PROXY_WITH_SENDER,
// fallbackAddress = 0xaa..aa, data = 0xdeadbeef, nativeSender = 0xbb..bb
const SAMPLE_TO_HEX: &str = concat!(
    "0000000000000000000000000000000000000000000000000000000000000020",
    "00000000000000000000000000000000000000000000000000000000000003e8",
    "0000000000000000000000000000000000000000000000000000000000000005",
    "0000000000000000000000000000000000000000000000000000000000000080",
    "00000000000000000000000000000000000000000000000000000000000000c0",
    "0000000000000000000000000000000000000000000000000000000000000014",
    "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000004",
    "deadbeef00000000000000000000000000000000000000000000000000000000",
);

const SAMPLE_FROM_HEX: &str = concat!(
    "0000000000000000000000000000000000000000000000000000000000000020",
    "00000000000000000000000000000000000000000000000000000000000003e8",
    "0000000000000000000000000000000000000000000000000000000000000005",
    "000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
    "00000000000000000000000000000000000000000000000000000000000000a0",
    "00000000000000000000000000000000000000000000000000000000000000e0",
    "0000000000000000000000000000000000000000000000000000000000000004",
    "deadbeef00000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000014",
    "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb000000000000000000000000",
);

/// Decode known-good samples of both shapes and compare every field.
///
/// Run before relying on the codec: a layout mismatch with the deployed gate
/// would otherwise misread fields without failing.
pub fn self_check() -> eyre::Result<()> {
    let to_bytes = hex::decode(SAMPLE_TO_HEX)?;
    let from_bytes = hex::decode(SAMPLE_FROM_HEX)?;
    let fallback = [0xaau8; 20];
    let native_sender = [0xbbu8; 20];
    let data = [0xde, 0xad, 0xbe, 0xef];

    let to = decode_to(&to_bytes)?;
    eyre::ensure!(to.execution_fee == U256::from(1000u64), "executionFee mismatch in To sample");
    eyre::ensure!(to.flags.to_raw() == U256::from(5u64), "flags mismatch in To sample");
    eyre::ensure!(to.fallback_address[..] == fallback[..], "fallbackAddress mismatch in To sample");
    eyre::ensure!(to.data[..] == data[..], "data mismatch in To sample");

    let from = decode_from(&from_bytes)?;
    eyre::ensure!(from.execution_fee == U256::from(1000u64), "executionFee mismatch in From sample");
    eyre::ensure!(from.flags.to_raw() == U256::from(5u64), "flags mismatch in From sample");
    eyre::ensure!(from.fallback_address == Address::from(fallback), "fallbackAddress mismatch in From sample");
    eyre::ensure!(from.data[..] == data[..], "data mismatch in From sample");
    eyre::ensure!(from.native_sender[..] == native_sender[..], "nativeSender mismatch in From sample");

    let converted = convert_to_claim_params(&to_bytes, &native_sender)?;
    eyre::ensure!(
        converted[..] == from_bytes[..],
        "To -> From conversion does not reproduce the From sample"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    fn sample_to() -> SubmissionAutoParamsTo {
        SubmissionAutoParamsTo {
            execution_fee: U256::from(1000u64),
            flags: FlagSet::with_flags(&[Flag::UnwrapEth, Flag::ProxyWithSender]),
            fallback_address: Bytes::from(vec![0xaa; 20]),
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
        }
    }

    #[test]
    fn test_self_check_passes() {
        self_check().unwrap();
    }

    #[test]
    fn test_encode_to_matches_sample() {
        assert_eq!(hex::encode(encode_to(&sample_to())), SAMPLE_TO_HEX);
    }

    #[test]
    fn test_round_trip_to_with_unknown_bits() {
        let mut params = sample_to();
        params.execution_fee = U256::MAX;
        params.flags = FlagSet::from_raw((U256::from(1u64) << 255) | U256::from(0x41u64));
        params.fallback_address = Bytes::from(vec![0x01; 33]);
        params.data = Bytes::from(vec![0x7f; 65]);

        let decoded = decode_to(&encode_to(&params)).unwrap();
        assert_eq!(decoded, params);
        assert!(decoded.flags.is_set(255));
    }

    #[test]
    fn test_round_trip_from() {
        let params = SubmissionAutoParamsFrom {
            execution_fee: U256::from(7u64),
            flags: FlagSet::from_raw(U256::from(1u64) << 130),
            fallback_address: Address::repeat_byte(0x42),
            data: Bytes::new(),
            native_sender: Bytes::from(vec![0x99; 32]),
        };
        assert_eq!(decode_from(&encode_from(&params)).unwrap(), params);
    }

    #[test]
    fn test_conversion_keeps_shared_fields() {
        let to = sample_to();
        let sender = Bytes::from(vec![0xbb; 20]);
        let blob = convert_to_claim_params(&encode_to(&to), &sender).unwrap();
        let from = decode_from(&blob).unwrap();

        assert_eq!(from.execution_fee, to.execution_fee);
        assert_eq!(from.flags, to.flags);
        assert_eq!(from.fallback_address.as_slice(), &to.fallback_address[..]);
        assert_eq!(from.data, to.data);
        assert_eq!(from.native_sender, sender);
    }

    #[test]
    fn test_conversion_rejects_non_address_fallback() {
        let mut to = sample_to();
        to.fallback_address = Bytes::from(vec![0x01; 32]);
        let err = convert_to_claim_params(&encode_to(&to), &[0xbb; 20]).unwrap_err();
        assert_eq!(err, DecodeError::FallbackAddressLength(32));
    }

    #[test]
    fn test_empty_fallback_becomes_zero_address() {
        let mut to = sample_to();
        to.fallback_address = Bytes::new();
        let blob = convert_to_claim_params(&encode_to(&to), &[0xbb; 20]).unwrap();
        assert_eq!(decode_from(&blob).unwrap().fallback_address, Address::ZERO);
    }

    #[test]
    fn test_empty_origin_blob_converts_to_empty() {
        assert!(convert_to_claim_params(&[], &[0xbb; 20]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_input_rejected() {
        let encoded = encode_to(&sample_to());
        let err = decode_to(&encoded[..encoded.len() - 32]).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert!(decode_to(&[]).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = encode_to(&sample_to()).to_vec();
        encoded.extend_from_slice(&[0u8; 32]);
        assert!(decode_to(&encoded).is_err());
    }

    #[test]
    fn test_dirty_address_padding_rejected() {
        let mut encoded = hex::decode(SAMPLE_FROM_HEX).unwrap();
        // High byte of the fallbackAddress word (word 3 including the offset)
        encoded[3 * 32] = 0xff;
        assert!(decode_from(&encoded).is_err());
    }

    #[test]
    fn test_from_shape_does_not_decode_as_to() {
        let encoded = hex::decode(SAMPLE_FROM_HEX).unwrap();
        assert!(decode_to(&encoded).is_err());
    }
}
