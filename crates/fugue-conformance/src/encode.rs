//! Payload encoding

use fugue_primitives::Address;

/// Address as a 32-byte ABI word: 12 zero bytes followed by the 20 address
/// bytes
pub fn encode_address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// `code` with the ABI word of `address` appended
pub fn append_address(code: &[u8], address: &Address) -> Vec<u8> {
    let mut payload = Vec::with_capacity(code.len() + 32);
    payload.extend_from_slice(code);
    payload.extend_from_slice(&encode_address_word(address));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_address_word_layout() {
        let address = Address::from_hex("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap();
        let word = encode_address_word(&address);
        assert_eq!(
            hex::encode(word),
            "00000000000000000000000070997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn test_append_to_empty_code() {
        let payload = append_address(&[], &Address::ZERO);
        assert_eq!(payload, vec![0u8; 32]);
    }

    proptest! {
        #[test]
        fn test_append_keeps_code_prefix(
            code in prop::collection::vec(any::<u8>(), 0..128),
            raw in any::<[u8; 20]>(),
        ) {
            let address = Address::from_bytes(raw);
            let payload = append_address(&code, &address);
            prop_assert_eq!(payload.len(), code.len() + 32);
            prop_assert_eq!(&payload[..code.len()], &code[..]);
            prop_assert!(payload[code.len()..code.len() + 12].iter().all(|b| *b == 0));
            prop_assert_eq!(&payload[code.len() + 12..], &raw[..]);
        }
    }
}
