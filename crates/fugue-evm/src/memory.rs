//! Frame memory

/// Byte-addressable memory, grown in 32-byte words
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes (always a multiple of 32)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Grow to cover `end` bytes, rounded up to a whole word. Gas for the
    /// expansion must be charged by the caller beforehand.
    pub fn resize(&mut self, end: usize) {
        let aligned = end.div_ceil(32) * 32;
        if aligned > self.data.len() {
            self.data.resize(aligned, 0);
        }
    }

    /// Load a 32-byte word
    pub fn load_word(&self, offset: usize) -> [u8; 32] {
        let mut word = [0u8; 32];
        word.copy_from_slice(&self.data[offset..offset + 32]);
        word
    }

    /// Store a 32-byte word
    pub fn store_word(&mut self, offset: usize, word: &[u8; 32]) {
        self.data[offset..offset + 32].copy_from_slice(word);
    }

    /// Store a single byte
    pub fn store_byte(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    /// Copy `size` bytes starting at `offset`
    pub fn slice(&self, offset: usize, size: usize) -> &[u8] {
        if size == 0 {
            return &[];
        }
        &self.data[offset..offset + size]
    }

    /// Write `size` bytes at `offset` from `source[src_offset..]`, padding
    /// with zeros past the end of `source`
    pub fn copy_padded(&mut self, offset: usize, source: &[u8], src_offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        let dest = &mut self.data[offset..offset + size];
        let available = source.len().saturating_sub(src_offset).min(size);
        if available > 0 {
            dest[..available].copy_from_slice(&source[src_offset..src_offset + available]);
        }
        dest[available..].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_aligns_to_words() {
        let mut mem = Memory::new();
        assert_eq!(mem.size(), 0);
        mem.resize(1);
        assert_eq!(mem.size(), 32);
        mem.resize(65);
        assert_eq!(mem.size(), 96);
        mem.resize(10);
        assert_eq!(mem.size(), 96);
    }

    #[test]
    fn test_word_store_load() {
        let mut mem = Memory::new();
        mem.resize(64);
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        mem.store_word(32, &word);
        assert_eq!(mem.load_word(32), word);
        assert_eq!(mem.load_word(0), [0u8; 32]);
    }

    #[test]
    fn test_copy_padded() {
        let mut mem = Memory::new();
        mem.resize(32);
        mem.store_byte(4, 0xff);
        mem.copy_padded(0, &[1, 2, 3], 1, 5);
        assert_eq!(mem.slice(0, 6), &[2, 3, 0, 0, 0, 0]);

        mem.copy_padded(0, &[1, 2, 3], 10, 2);
        assert_eq!(mem.slice(0, 2), &[0, 0]);
    }
}
