//! Epoch bookkeeping for round-robin delegated proof of stake

use super::Protocol;
use fugue_types::BlockHeader;

/// Roll-DPoS protocol ID
pub const ROLLDPOS_PROTOCOL_ID: &str = "rolldpos";

/// Maps heights to epochs: each epoch spans `num_delegates * num_sub_epochs`
/// blocks, starting at height 1
#[derive(Debug, Clone, Copy)]
pub struct RollDposProtocol {
    num_delegates: u64,
    num_sub_epochs: u64,
}

impl RollDposProtocol {
    /// Create the protocol; zero counts are treated as one
    pub fn new(num_delegates: u64, num_sub_epochs: u64) -> Self {
        Self {
            num_delegates: num_delegates.max(1),
            num_sub_epochs: num_sub_epochs.max(1),
        }
    }

    // Saturates for counts whose product does not fit
    fn epoch_length(&self) -> u64 {
        self.num_delegates.saturating_mul(self.num_sub_epochs)
    }

    /// Epoch of `height` (genesis is epoch 0)
    pub fn epoch_number(&self, height: u64) -> u64 {
        if height == 0 {
            return 0;
        }
        (height - 1) / self.epoch_length() + 1
    }

    /// First height of `epoch`
    pub fn epoch_height(&self, epoch: u64) -> u64 {
        if epoch == 0 {
            return 0;
        }
        (epoch - 1).saturating_mul(self.epoch_length()).saturating_add(1)
    }

    /// Sub-epoch of `height` within its epoch
    pub fn sub_epoch_number(&self, height: u64) -> u64 {
        if height == 0 {
            return 0;
        }
        (height - 1) % self.epoch_length() / self.num_delegates
    }

    /// Round-robin slot of the delegate producing `height`
    pub fn delegate_slot(&self, height: u64) -> u64 {
        if height == 0 {
            return 0;
        }
        (height - 1) % self.num_delegates
    }
}

impl Protocol for RollDposProtocol {
    fn id(&self) -> &'static str {
        ROLLDPOS_PROTOCOL_ID
    }

    fn finalize_header(&self, header: &mut BlockHeader) {
        header.epoch = self.epoch_number(header.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_number() {
        let rp = RollDposProtocol::new(24, 1);
        assert_eq!(rp.epoch_number(0), 0);
        assert_eq!(rp.epoch_number(1), 1);
        assert_eq!(rp.epoch_number(24), 1);
        assert_eq!(rp.epoch_number(25), 2);
        assert_eq!(rp.epoch_height(2), 25);
    }

    #[test]
    fn test_sub_epochs() {
        let rp = RollDposProtocol::new(4, 2);
        assert_eq!(rp.epoch_number(8), 1);
        assert_eq!(rp.epoch_number(9), 2);
        assert_eq!(rp.sub_epoch_number(4), 0);
        assert_eq!(rp.sub_epoch_number(5), 1);
        assert_eq!(rp.delegate_slot(5), 0);
        assert_eq!(rp.delegate_slot(7), 2);
    }

    #[test]
    fn test_zero_counts() {
        let rp = RollDposProtocol::new(0, 0);
        assert_eq!(rp.epoch_number(3), 3);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let rp = RollDposProtocol::new(u64::MAX, 3);
        assert_eq!(rp.epoch_number(1), 1);
        assert_eq!(rp.epoch_number(u64::MAX), 1);
        assert_eq!(rp.epoch_height(3), u64::MAX);
        assert_eq!(rp.sub_epoch_number(10), 0);
    }
}
