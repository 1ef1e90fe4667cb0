use byteorder::{
    ByteOrder,
    NetworkEndian,
};

/// Adds a buffer to a running one's complement sum of 16 bit words.
///
/// An odd trailing byte is padded with a zero byte as in
/// [RFC1071](https://tools.ietf.org/html/rfc1071).
pub fn sum_words(mut acc: u32, buffer: &[u8]) -> u32 {
    let mut chunks = buffer.chunks_exact(2);

    for word in &mut chunks {
        acc += NetworkEndian::read_u16(word) as u32;
    }

    if let [x] = chunks.remainder() {
        acc += (*x as u32) << 8;
    }

    acc
}

/// Folds a running sum into the complemented 16 bit checksum.
pub fn fold(mut acc: u32) -> u16 {
    while acc > 0xFFFF {
        acc = (acc & 0xFFFF) + (acc >> 16);
    }

    !acc as u16
}

/// Calculates the Internet Checksum from [RFC1071](https://tools.ietf.org/html/rfc1071).
///
/// See [IPv4 header checksum](https://en.wikipedia.org/wiki/IPv4_header_checksum) for an example.
/// Running the checksum over a buffer which already carries a correct
/// checksum yields zero.
pub fn internet_checksum(buffer: &[u8]) -> u16 {
    fold(sum_words(0, buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internet_checksum() {
        let buffer: [u8; 20] = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(0xB861, internet_checksum(&buffer));
    }

    #[test]
    fn test_internet_checksum_verifies_to_zero() {
        let mut buffer: [u8; 20] = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xB8, 0x61, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(0, internet_checksum(&buffer));

        buffer[19] ^= 0x01;
        assert_ne!(0, internet_checksum(&buffer));
    }

    #[test]
    fn test_internet_checksum_odd_length() {
        assert_eq!(!0x0100u16, internet_checksum(&[0x01]));
        assert_eq!(sum_words(sum_words(0, &[0x12, 0x34]), &[0x56]), 0x1234 + 0x5600);
    }
}
