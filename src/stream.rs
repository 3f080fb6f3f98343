//! Bounded binary streams
//!
//! Readers fail with [`Error::StreamBounds`] instead of truncating. All
//! multi-byte values are little-endian, words are 32 bits.

use crate::error::{Error, Result};

/// Source of little-endian words
pub trait StreamReader {
    fn read_byte(&mut self) -> Result<u8>;

    fn read_word(&mut self) -> Result<u32> {
        let b0 = self.read_byte()? as u32;
        let b1 = self.read_byte()? as u32;
        let b2 = self.read_byte()? as u32;
        let b3 = self.read_byte()? as u32;
        Ok(b0 | b1 << 8 | b2 << 16 | b3 << 24)
    }

    /// Two words, low word first
    fn read_dword(&mut self) -> Result<u64> {
        let low = self.read_word()? as u64;
        let high = self.read_word()? as u64;
        Ok(low | high << 32)
    }

    /// Fill `dst` with words. On failure the contents of `dst` are unspecified.
    fn read_buffer(&mut self, dst: &mut [u32]) -> Result<()> {
        for word in dst.iter_mut() {
            *word = self.read_word()?;
        }
        Ok(())
    }
}

/// Append-only sink of words
pub trait StreamWriter {
    fn write_word(&mut self, word: u32);

    fn write_dword(&mut self, value: u64) {
        self.write_word(value as u32);
        self.write_word((value >> 32) as u32);
    }

    fn write_buffer(&mut self, words: &[u32]) {
        for &word in words {
            self.write_word(word);
        }
    }
}

impl<S: StreamReader + ?Sized> StreamReader for &mut S {
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn read_word(&mut self) -> Result<u32> {
        (**self).read_word()
    }
}

impl<S: StreamWriter + ?Sized> StreamWriter for &mut S {
    fn write_word(&mut self, word: u32) {
        (**self).write_word(word)
    }
}

/// Cursor over a byte buffer that refuses to read past its end
#[derive(Clone, Debug)]
pub struct CheckedStreamReader<B = Vec<u8>> {
    buffer: B,
    cursor: usize,
}

impl<B: AsRef<[u8]>> CheckedStreamReader<B> {
    pub fn new(buffer: B) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.buffer.as_ref().len() - self.cursor
    }

    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.buffer
    }
}

impl<B: AsRef<[u8]>> StreamReader for CheckedStreamReader<B> {
    fn read_byte(&mut self) -> Result<u8> {
        let buffer = self.buffer.as_ref();
        match buffer.get(self.cursor) {
            Some(&byte) => {
                self.cursor += 1;
                Ok(byte)
            }
            None => Err(Error::StreamBounds {
                cursor: self.cursor,
                len: buffer.len(),
            }),
        }
    }
}

/// Word sink backed by a vector
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VectorStreamWriter {
    words: Vec<u32>,
}

impl VectorStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

impl StreamWriter for VectorStreamWriter {
    fn write_word(&mut self, word: u32) {
        self.words.push(word);
    }
}
