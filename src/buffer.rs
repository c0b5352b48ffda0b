/// Rewrites each 4-byte big-endian word of `buffer` in host byte order.
///
/// Trailing bytes that do not make up a whole word are left as they are.
pub fn swap_buffer_endianness(buffer: &mut [u8]) {
    for word in buffer.chunks_exact_mut(4) {
        let value = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        word.copy_from_slice(&value.to_ne_bytes());
    }
}
