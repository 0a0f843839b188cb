use byteorder::{BigEndian, ByteOrder};
use std::io;

/// Append-only big-endian byte sink
///
/// Everything in a class file is big-endian and most of it is written strictly left to right.
/// The two exceptions are branch offsets and length/count prefixes, which are only known after
/// the thing they describe has been written. For those, a placeholder gets written first and
/// later overwritten with one of the `patch_*` methods.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct CodeStream {
    data: Vec<u8>,
}

impl CodeStream {
    pub fn new() -> CodeStream {
        CodeStream { data: vec![] }
    }

    pub fn with_capacity(capacity: usize) -> CodeStream {
        CodeStream {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far (also the offset of the next byte)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Make sure at least `additional` more bytes fit without reallocating
    pub fn ensure_capacity(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    /// Drop all written bytes (capacity is kept)
    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn byte_at(&self, position: usize) -> Option<u8> {
        self.data.get(position).copied()
    }

    /// Reserve `width` zeroed bytes at the end and return a mutable view of them
    fn grow(&mut self, width: usize) -> &mut [u8] {
        let start = self.data.len();
        self.data.resize(start + width, 0);
        &mut self.data[start..]
    }

    pub fn put_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    pub fn put_u16(&mut self, value: u16) {
        BigEndian::write_u16(self.grow(2), value);
    }

    pub fn put_i16(&mut self, value: i16) {
        BigEndian::write_i16(self.grow(2), value);
    }

    pub fn put_u32(&mut self, value: u32) {
        BigEndian::write_u32(self.grow(4), value);
    }

    pub fn put_i32(&mut self, value: i32) {
        BigEndian::write_i32(self.grow(4), value);
    }

    pub fn put_u64(&mut self, value: u64) {
        BigEndian::write_u64(self.grow(8), value);
    }

    pub fn put_i64(&mut self, value: i64) {
        BigEndian::write_i64(self.grow(8), value);
    }

    pub fn put_f32(&mut self, value: f32) {
        BigEndian::write_f32(self.grow(4), value);
    }

    pub fn put_f64(&mut self, value: f64) {
        BigEndian::write_f64(self.grow(8), value);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Overwrite two already-written bytes
    ///
    /// Panics if `position + 2` is past the end of the stream.
    pub fn patch_u16(&mut self, position: usize, value: u16) {
        BigEndian::write_u16(&mut self.data[position..position + 2], value);
    }

    pub fn patch_i16(&mut self, position: usize, value: i16) {
        BigEndian::write_i16(&mut self.data[position..position + 2], value);
    }

    /// Overwrite four already-written bytes
    ///
    /// Panics if `position + 4` is past the end of the stream.
    pub fn patch_u32(&mut self, position: usize, value: u32) {
        BigEndian::write_u32(&mut self.data[position..position + 4], value);
    }

    pub fn patch_i32(&mut self, position: usize, value: i32) {
        BigEndian::write_i32(&mut self.data[position..position + 4], value);
    }
}

/// Lets anything implementing [`crate::jvm::class_file::Serialize`] write straight into the
/// stream
impl io::Write for CodeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for CodeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CodeStream({} bytes)", self.data.len())
    }
}
