//! Length-prefixed framing used by the stream-socket (TCP) handler: each
//! payload is preceded by its length as a 4-byte big-endian unsigned
//! integer, so a reader never has to scan for a delimiter.

pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 4);
    framed.extend((payload.len() as u32).to_be_bytes());
    framed.extend(payload);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_with_big_endian_length() {
        let framed = encode_frame(b"abc");
        assert_eq!(&framed[..4], &[0, 0, 0, 3]);
        assert_eq!(&framed[4..], b"abc");
    }

    #[test]
    fn round_trips_through_the_prefix() {
        let framed = encode_frame(b"hello world");
        let len = u32::from_be_bytes(framed[..4].try_into().unwrap()) as usize;
        assert_eq!(&framed[4..4 + len], b"hello world");
    }
}
