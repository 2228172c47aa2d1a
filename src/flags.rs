//! Submission flag set
//!
//! The gate carries submission options as a `uint256` bitmask. Only the low
//! bits are assigned today, but the full width is kept so that bits the
//! catalogue does not know about survive a decode/encode cycle untouched.

use alloy::primitives::U256;
use std::fmt;

/// Width of the on-chain flags field in bits
pub const FLAG_BITS: usize = 256;

/// Known submission flags (bit index → meaning)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Flag {
    /// Unwrap the wrapped native asset on the destination chain
    UnwrapEth = 0,
    /// Revert the claim if the external call fails
    RevertIfExternalFail = 1,
    /// Call the proxy together with the sender
    ProxyWithSender = 2,
    /// `data` carries a hash instead of the call payload
    SendHashedData = 3,
    /// First bytes of `data` hold the gas limit for the external call
    SendExternalCallGasLimit = 4,
    /// Multi-send external call
    MultiSend = 5,
}

impl Flag {
    /// Every known flag, ascending by bit index
    pub const ALL: [Flag; 6] = [
        Flag::UnwrapEth,
        Flag::RevertIfExternalFail,
        Flag::ProxyWithSender,
        Flag::SendHashedData,
        Flag::SendExternalCallGasLimit,
        Flag::MultiSend,
    ];

    /// Bit index of the flag
    pub fn bit(self) -> usize {
        self as usize
    }

    /// Protocol name of the flag
    pub fn label(self) -> &'static str {
        match self {
            Flag::UnwrapEth => "UNWRAP_ETH",
            Flag::RevertIfExternalFail => "REVERT_IF_EXTERNAL_FAIL",
            Flag::ProxyWithSender => "PROXY_WITH_SENDER",
            Flag::SendHashedData => "SEND_HASHED_DATA",
            Flag::SendExternalCallGasLimit => "SEND_EXTERNAL_CALL_GAS_LIMIT",
            Flag::MultiSend => "MULTI_SEND",
        }
    }

    /// Look up a known flag by bit index
    pub fn from_bit(bit: usize) -> Option<Flag> {
        Flag::ALL.iter().copied().find(|f| f.bit() == bit)
    }
}

/// Bitset over the submission flags, backed by the raw `uint256`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagSet(U256);

impl FlagSet {
    /// Wrap a raw flags value as read from the wire
    pub fn from_raw(raw: U256) -> Self {
        FlagSet(raw)
    }

    /// Build a set from a list of known flags
    pub fn with_flags(flags: &[Flag]) -> Self {
        let mut set = FlagSet::default();
        for flag in flags {
            set.set_flag(flag.bit());
        }
        set
    }

    /// Raw value, including bits outside the catalogue
    pub fn to_raw(&self) -> U256 {
        self.0
    }

    /// Set bit `bit`. Indices past the field width are ignored.
    pub fn set_flag(&mut self, bit: usize) {
        if bit < FLAG_BITS {
            self.0.set_bit(bit, true);
        }
    }

    /// Clear bit `bit`. Indices past the field width are ignored.
    pub fn unset_flag(&mut self, bit: usize) {
        if bit < FLAG_BITS {
            self.0.set_bit(bit, false);
        }
    }

    /// Whether bit `bit` is set
    pub fn is_set(&self, bit: usize) -> bool {
        bit < FLAG_BITS && self.0.bit(bit)
    }

    /// Whether a known flag is set
    pub fn contains(&self, flag: Flag) -> bool {
        self.is_set(flag.bit())
    }

    /// Names of the known flags currently set, ascending by bit
    pub fn to_label_list(&self) -> Vec<&'static str> {
        Flag::ALL
            .iter()
            .filter(|f| self.contains(**f))
            .map(|f| f.label())
            .collect()
    }

    /// Labels joined with `|`, or `NONE` when no known flag is set
    pub fn to_human_readable(&self) -> String {
        let labels = self.to_label_list();
        if labels.is_empty() {
            "NONE".to_string()
        } else {
            labels.join("|")
        }
    }
}

impl From<U256> for FlagSet {
    fn from(raw: U256) -> Self {
        FlagSet(raw)
    }
}

impl From<FlagSet> for U256 {
    fn from(flags: FlagSet) -> Self {
        flags.0
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_unset_every_known_flag() {
        for flag in Flag::ALL {
            let mut set = FlagSet::default();
            assert!(!set.is_set(flag.bit()));
            set.set_flag(flag.bit());
            assert!(set.is_set(flag.bit()));
            assert_eq!(set.to_raw(), U256::from(1u64) << flag.bit());
            set.unset_flag(flag.bit());
            assert!(!set.is_set(flag.bit()));
            assert_eq!(set.to_raw(), U256::ZERO);
        }
    }

    #[test]
    fn test_unknown_bits_preserved() {
        let raw = (U256::from(1u64) << 200) | (U256::from(1u64) << 64) | U256::from(0b101u64);
        let mut set = FlagSet::from_raw(raw);
        assert_eq!(set.to_raw(), raw);
        assert!(set.is_set(200));
        assert!(set.is_set(64));

        // Touching a known bit must not disturb the others
        assert!(!set.contains(Flag::MultiSend));
        set.set_flag(Flag::MultiSend.bit());
        assert!(set.contains(Flag::MultiSend));
        set.unset_flag(Flag::MultiSend.bit());
        assert_eq!(set.to_raw(), raw);
        assert!(set.contains(Flag::UnwrapEth));
        assert!(set.contains(Flag::ProxyWithSender));
    }

    #[test]
    fn test_label_list_only_names_known_bits() {
        let mut set = FlagSet::with_flags(&[Flag::MultiSend, Flag::UnwrapEth]);
        set.set_flag(100);
        assert_eq!(set.to_label_list(), vec!["UNWRAP_ETH", "MULTI_SEND"]);
        assert_eq!(set.to_human_readable(), "UNWRAP_ETH|MULTI_SEND");
    }

    #[test]
    fn test_empty_set() {
        let set = FlagSet::default();
        assert!(set.to_label_list().is_empty());
        assert_eq!(set.to_human_readable(), "NONE");
        assert_eq!(set.to_string(), "0");
    }

    #[test]
    fn test_out_of_range_bit() {
        let mut set = FlagSet::default();
        set.set_flag(300);
        assert_eq!(set.to_raw(), U256::ZERO);
        assert!(!set.is_set(300));
    }

    #[test]
    fn test_highest_bit() {
        let mut set = FlagSet::default();
        set.set_flag(255);
        assert!(set.is_set(255));
        assert_eq!(set.to_raw(), U256::from(1u64) << 255);
    }

    #[test]
    fn test_from_bit() {
        assert_eq!(Flag::from_bit(3), Some(Flag::SendHashedData));
        assert_eq!(Flag::from_bit(6), None);
    }
}
