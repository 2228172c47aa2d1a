//! deBridgeGate ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the parts of the
//! gate the emulator touches: the `Sent`/`Claimed` events, `claim` and the
//! `isSubmissionUsed` state read.
//!
//! IMPORTANT: the auto-params structs must match the deployed gate exactly.
//! `fallbackAddress` is `bytes` in the origin shape and `address` in the
//! destination shape; swapping them silently shifts every following field.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Auto-params attached to `send` on the origin chain
    struct SubmissionAutoParamsTo {
        uint256 executionFee;
        uint256 flags;
        bytes fallbackAddress;
        bytes data;
    }

    /// Auto-params expected by `claim` on the destination chain
    struct SubmissionAutoParamsFrom {
        uint256 executionFee;
        uint256 flags;
        address fallbackAddress;
        bytes data;
        bytes nativeSender;
    }

    #[sol(rpc)]
    contract DeBridgeGate {
        struct FeeParams {
            uint256 receivedAmount;
            uint256 fixFee;
            uint256 transferFee;
            bool useAssetFee;
            bool isNativeToken;
        }

        /// Emitted by `send` on the origin chain
        event Sent(
            bytes32 submissionId,
            bytes32 indexed debridgeId,
            uint256 amount,
            bytes receiver,
            uint256 nonce,
            uint256 indexed chainIdTo,
            uint32 referralCode,
            FeeParams feeParams,
            bytes autoParams,
            address nativeSender
        );

        /// Emitted by `claim` on the destination chain
        event Claimed(
            bytes32 submissionId,
            bytes32 indexed debridgeId,
            uint256 amount,
            address indexed receiver,
            uint256 nonce,
            uint256 indexed chainIdFrom,
            bytes autoParams,
            bool isNativeToken
        );

        /// Finalize a submission on the destination chain
        function claim(
            bytes32 _debridgeId,
            uint256 _amount,
            uint256 _chainIdFrom,
            address _receiver,
            uint256 _nonce,
            bytes calldata _signatures,
            bytes calldata _autoParams
        ) external;

        /// Whether a submission has already been claimed
        function isSubmissionUsed(bytes32 submissionId) external view returns (bool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;
    use alloy::sol_types::SolEvent;

    #[test]
    fn test_event_signatures() {
        // Tuple components are expanded in the canonical signature
        assert_eq!(
            DeBridgeGate::Sent::SIGNATURE_HASH,
            keccak256(
                "Sent(bytes32,bytes32,uint256,bytes,uint256,uint256,uint32,(uint256,uint256,uint256,bool,bool),bytes,address)"
            )
        );
        assert_eq!(
            DeBridgeGate::Claimed::SIGNATURE_HASH,
            keccak256("Claimed(bytes32,bytes32,uint256,address,uint256,uint256,bytes,bool)")
        );
    }
}
