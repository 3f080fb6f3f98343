//! Typed archive layer over word streams
//!
//! Every value is a sequence of little-endian words. Variable-length values
//! (vectors, byte buffers) carry an explicit element count word first.

use crate::error::Result;
use crate::stream::{StreamReader, StreamWriter};
use crate::WORD_SIZE;

/// Pack bytes into little-endian words. A trailing partial word is padded
/// with zeros in its high-order bytes.
pub fn pack_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(WORD_SIZE)
        .map(|chunk| {
            let mut word = [0u8; WORD_SIZE];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect()
}

/// Inverse of [`pack_words`], truncated to `len` bytes
pub fn unpack_words(words: &[u32], len: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    bytes.truncate(len);
    bytes
}

/// A value with a fixed archive encoding
pub trait Archive: Sized {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>);

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self>;
}

/// Structured reader over any [`StreamReader`]
///
/// Pass `&mut stream` to keep ownership of the stream with the caller.
#[derive(Debug)]
pub struct ArchiveReader<R> {
    stream: R,
}

impl<R: StreamReader> ArchiveReader<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }

    pub fn read_word(&mut self) -> Result<u32> {
        self.stream.read_word()
    }

    pub fn read_dword(&mut self) -> Result<u64> {
        self.stream.read_dword()
    }

    /// Fixed number of raw words, no count prefix
    pub fn read_words(&mut self, dst: &mut [u32]) -> Result<()> {
        self.stream.read_buffer(dst)
    }

    /// Count-prefixed byte buffer
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_word()? as usize;
        let count = len.div_ceil(WORD_SIZE);
        // The count is untrusted; let the stream bound the allocation.
        let mut words = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            words.push(self.stream.read_word()?);
        }
        Ok(unpack_words(&words, len))
    }

    pub fn read<T: Archive>(&mut self) -> Result<T> {
        T::unarchive(self)
    }

    pub fn into_inner(self) -> R {
        self.stream
    }
}

/// Structured writer over any [`StreamWriter`]
#[derive(Debug)]
pub struct ArchiveWriter<W> {
    stream: W,
}

impl<W: StreamWriter> ArchiveWriter<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    pub fn write_word(&mut self, word: u32) {
        self.stream.write_word(word);
    }

    pub fn write_dword(&mut self, value: u64) {
        self.stream.write_dword(value);
    }

    /// Raw words, no count prefix
    pub fn write_words(&mut self, words: &[u32]) {
        self.stream.write_buffer(words);
    }

    /// Byte count followed by the packed bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.stream.write_word(bytes.len() as u32);
        self.stream.write_buffer(&pack_words(bytes));
    }

    pub fn write<T: Archive>(&mut self, value: &T) {
        value.archive(self);
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

impl Archive for u32 {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>) {
        writer.write_word(*self);
    }

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        reader.read_word()
    }
}

impl Archive for i32 {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>) {
        writer.write_word(*self as u32);
    }

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        Ok(reader.read_word()? as i32)
    }
}

impl Archive for u64 {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>) {
        writer.write_dword(*self);
    }

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        reader.read_dword()
    }
}

impl<T: Archive + Default + Copy, const N: usize> Archive for [T; N] {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>) {
        for item in self {
            item.archive(writer);
        }
    }

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        let mut out = [T::default(); N];
        for slot in out.iter_mut() {
            *slot = T::unarchive(reader)?;
        }
        Ok(out)
    }
}

impl<T: Archive> Archive for Vec<T> {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>) {
        writer.write_word(self.len() as u32);
        for item in self {
            item.archive(writer);
        }
    }

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        let count = reader.read_word()? as usize;
        // The count is untrusted; let the stream bound the allocation.
        let mut out = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            out.push(T::unarchive(reader)?);
        }
        Ok(out)
    }
}

impl<A: Archive, B: Archive> Archive for (A, B) {
    fn archive<W: StreamWriter>(&self, writer: &mut ArchiveWriter<W>) {
        self.0.archive(writer);
        self.1.archive(writer);
    }

    fn unarchive<R: StreamReader>(reader: &mut ArchiveReader<R>) -> Result<Self> {
        Ok((A::unarchive(reader)?, B::unarchive(reader)?))
    }
}
