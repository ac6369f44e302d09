/// Convert byte to bit array (MSB first)
pub fn byte_to_bits(byte: u8) -> [u8; 8] {
    let mut bits = [0u8; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> (7 - i)) & 1;
    }
    bits
}

/// Convert up to 8 bits to a byte (MSB first); any non-zero value counts as 1
pub fn bits_to_byte(bits: &[u8]) -> u8 {
    let mut byte = 0u8;
    for (i, &bit) in bits.iter().enumerate().take(8) {
        if bit != 0 {
            byte |= 1 << (7 - i);
        }
    }
    byte
}

/// Pack bits into bytes, MSB first. Trailing bits that do not fill a whole
/// byte are dropped.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8).map(bits_to_byte).collect()
}

/// Unpack bytes into bits, MSB first
pub fn unpack_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        bits.extend_from_slice(&byte_to_bits(byte));
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first_order() {
        assert_eq!(byte_to_bits(0xA1), [1, 0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(bits_to_byte(&[1, 0, 1, 0, 0, 0, 0, 1]), 0xA1);
    }

    #[test]
    fn test_pack_drops_partial_byte() {
        let bits = [1, 1, 1, 1, 0, 0, 0, 0, 1, 0, 1];
        assert_eq!(pack_bits(&bits), vec![0xF0]);
        assert!(pack_bits(&[1, 0, 1]).is_empty());
    }

    #[test]
    fn test_unpack() {
        assert_eq!(
            unpack_bits(&[0x80, 0x01]),
            vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]
        );
    }
}
