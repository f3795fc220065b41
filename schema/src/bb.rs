use crate::error::WireError;
use std::str;

/// Marker written before an optional field whose value follows.
pub const PRESENT: u8 = 0;

/// Marker written in place of an optional field that has no value.
pub const ABSENT: u8 = 255;

/// Marker written after a message's own fields when its base message follows.
pub const CONTINUE: u8 = 1;

/// Marker written after a message's own fields at the end of an extension chain.
pub const END: u8 = 0;

/// How many messages may nest inside each other before decoding gives up.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A Helium byte buffer meant for reading.
///
/// All multi-byte values are fixed-width and little-endian. Strings and byte
/// arrays carry a 32-bit length prefix.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_helium_schema::ByteBuffer::new(&[4, 0, 0, 0, 240, 159, 141, 149, 0, 0, 0, 63]);
/// assert_eq!(bb.read_string(), Ok("🍕".to_owned()));
/// assert_eq!(bb.read_float32(), Ok(0.5));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
    depth: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0, depth: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Runs `read` one message level deeper. Fails with
    /// `WireError::NestingTooDeep` once `MAX_NESTING_DEPTH` levels are open.
    pub fn read_nested<T>(
        &mut self,
        read: impl FnOnce(&mut ByteBuffer<'a>) -> Result<T, WireError>,
    ) -> Result<T, WireError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(WireError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    /// Try to read a boolean value starting at the current index. Any nonzero
    /// byte is true.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_byte()? != 0)
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        if self.index >= self.data.len() {
            Err(WireError::UnexpectedEof { offset: self.index, needed: 1 })
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            Err(WireError::UnexpectedEof {
                offset: self.index,
                needed: len - self.remaining(),
            })
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    /// Try to read a signed 16-bit integer starting at the current index.
    pub fn read_int16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Try to read an unsigned 16-bit integer starting at the current index.
    pub fn read_uint16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Try to read a signed 32-bit integer starting at the current index.
    pub fn read_int32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Try to read an unsigned 32-bit integer starting at the current index.
    pub fn read_uint32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Try to read a signed 64-bit integer starting at the current index.
    pub fn read_int64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Try to read an unsigned 64-bit integer starting at the current index.
    pub fn read_uint64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Try to read a 32-bit floating-point number starting at the current index.
    pub fn read_float32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Try to read a 64-bit floating-point number starting at the current index.
    pub fn read_float64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Try to read a date, stored as signed milliseconds since the Unix epoch.
    pub fn read_date(&mut self) -> Result<i64, WireError> {
        self.read_int64()
    }

    /// Try to read a 32-bit length or element count.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        Ok(self.read_uint32()? as usize)
    }

    /// Try to read a length-prefixed UTF-8 string starting at the current index.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_len()?;
        let start = self.index;
        let bytes = self.read_bytes(len)?;
        match str::from_utf8(bytes) {
            Ok(value) => Ok(value.to_owned()),
            Err(_) => Err(WireError::InvalidUtf8(start)),
        }
    }

    /// Try to read a length-prefixed byte array starting at the current index.
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.read_len()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Reads the presence marker of an optional field. Returns `true` when a
    /// value follows.
    pub fn read_presence(&mut self) -> Result<bool, WireError> {
        match self.read_byte()? {
            PRESENT => Ok(true),
            ABSENT => Ok(false),
            other => Err(WireError::InvalidPresenceMarker(other)),
        }
    }

    /// Reads the continuation marker that ends a message's own fields. Returns
    /// `true` when the base message's fields follow.
    pub fn read_continuation(&mut self) -> Result<bool, WireError> {
        match self.read_byte()? {
            END => Ok(false),
            CONTINUE => Ok(true),
            other => Err(WireError::InvalidContinuationMarker(other)),
        }
    }
}

#[test]
fn read_bool() {
    let read = |bytes| ByteBuffer::new(bytes).read_bool();
    assert!(read(&[]).is_err());
    assert_eq!(read(&[0]), Ok(false));
    assert_eq!(read(&[1]), Ok(true));
    assert_eq!(read(&[2]), Ok(true));
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(WireError::UnexpectedEof { offset: 0, needed: 1 }));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(WireError::UnexpectedEof { offset: 0, needed: 1 }));
    assert_eq!(read(&[0], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(read(&[0], 3), Err(WireError::UnexpectedEof { offset: 0, needed: 2 }));
}

#[test]
fn read_fixed_width() {
    assert_eq!(ByteBuffer::new(&[255, 255]).read_int16(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[2, 1]).read_uint16(), Ok(258));
    assert_eq!(ByteBuffer::new(&[5, 0, 0, 0]).read_int32(), Ok(5));
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 128]).read_int32(), Ok(i32::MIN));
    assert_eq!(ByteBuffer::new(&[255, 255, 255, 255]).read_uint32(), Ok(u32::MAX));
    assert_eq!(
        ByteBuffer::new(&[254, 255, 255, 255, 255, 255, 255, 255]).read_int64(),
        Ok(-2)
    );
    assert_eq!(
        ByteBuffer::new(&[255, 255, 255, 255, 255, 255, 255, 255]).read_uint64(),
        Ok(u64::MAX)
    );
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 63]).read_float32(), Ok(0.5));
    assert_eq!(
        ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 224, 63]).read_float64(),
        Ok(0.5)
    );
    assert!(ByteBuffer::new(&[1, 2, 3]).read_int32().is_err());
}

#[test]
fn read_int64_keeps_precision() {
    let big: i64 = (1 << 53) + 1;
    assert_eq!(ByteBuffer::new(&big.to_le_bytes()).read_int64(), Ok(big));
    assert_eq!(ByteBuffer::new(&i64::MAX.to_le_bytes()).read_int64(), Ok(i64::MAX));
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert!(read(&[]).is_err());
    assert_eq!(read(&[0, 0, 0, 0]), Ok("".to_owned()));
    assert_eq!(read(&[2, 0, 0, 0, 104, 105]), Ok("hi".to_owned()));
    assert!(read(&[3, 0, 0, 0, 104, 105]).is_err());
    assert_eq!(read(&[1, 0, 0, 0, 255]), Err(WireError::InvalidUtf8(4)));
}

#[test]
fn read_byte_array() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte_array();
    assert_eq!(read(&[0, 0, 0, 0]), Ok(vec![]));
    assert_eq!(read(&[3, 0, 0, 0, 1, 2, 3]), Ok(vec![1, 2, 3]));
    assert!(read(&[3, 0, 0, 0, 1]).is_err());
}

#[test]
fn read_markers() {
    assert_eq!(ByteBuffer::new(&[0]).read_presence(), Ok(true));
    assert_eq!(ByteBuffer::new(&[255]).read_presence(), Ok(false));
    assert_eq!(
        ByteBuffer::new(&[7]).read_presence(),
        Err(WireError::InvalidPresenceMarker(7))
    );
    assert_eq!(ByteBuffer::new(&[0]).read_continuation(), Ok(false));
    assert_eq!(ByteBuffer::new(&[1]).read_continuation(), Ok(true));
    assert_eq!(
        ByteBuffer::new(&[2]).read_continuation(),
        Err(WireError::InvalidContinuationMarker(2))
    );
}

#[test]
fn read_nested() {
    fn open(bb: &mut ByteBuffer, levels: usize) -> Result<usize, WireError> {
        if levels == 0 {
            return Ok(0);
        }
        Ok(bb.read_nested(|bb| open(bb, levels - 1))? + 1)
    }

    let mut bb = ByteBuffer::new(&[]);
    assert_eq!(open(&mut bb, MAX_NESTING_DEPTH), Ok(MAX_NESTING_DEPTH));
    assert_eq!(open(&mut bb, MAX_NESTING_DEPTH + 1), Err(WireError::NestingTooDeep(MAX_NESTING_DEPTH)));

    // Levels are closed again after an error.
    assert_eq!(open(&mut bb, MAX_NESTING_DEPTH), Ok(MAX_NESTING_DEPTH));
}

#[test]
fn read_sequence() {
    let mut bb = ByteBuffer::new(&[1, 2, 0, 0, 0, 104, 105, 255, 0]);
    assert_eq!(bb.read_bool(), Ok(true));
    assert_eq!(bb.read_string(), Ok("hi".to_owned()));
    assert_eq!(bb.read_presence(), Ok(false));
    assert_eq!(bb.read_continuation(), Ok(false));
    assert_eq!(bb.remaining(), 0);
    assert!(bb.read_byte().is_err());
}

/// A Helium byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_helium_schema::ByteBufferMut::new();
/// bb.write_string("🍕").unwrap();
/// bb.write_float32(0.5);
/// assert_eq!(bb.data(), [4, 0, 0, 0, 240, 159, 141, 149, 0, 0, 0, 63]);
/// ```
///
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a boolean value to the end of the buffer.
    pub fn write_bool(&mut self, value: bool) {
        self.data.push(if value { 1 } else { 0 });
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer, without a length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_int16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_uint16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_int32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_uint32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_int64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_uint64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_float32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_float64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a date as signed milliseconds since the Unix epoch.
    pub fn write_date(&mut self, value: i64) {
        self.write_int64(value);
    }

    /// Write a 32-bit length or element count. Fails if `len` does not fit.
    pub fn write_len(&mut self, len: usize) -> Result<(), WireError> {
        let len = u32::try_from(len).map_err(|_| WireError::LengthOverflow(len))?;
        self.write_uint32(len);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string to the end of the buffer.
    pub fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.write_len(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Write a length-prefixed byte array to the end of the buffer.
    pub fn write_byte_array(&mut self, value: &[u8]) -> Result<(), WireError> {
        self.write_len(value.len())?;
        self.write_bytes(value);
        Ok(())
    }

    /// Write the presence marker of an optional field.
    pub fn write_presence(&mut self, present: bool) {
        self.write_byte(if present { PRESENT } else { ABSENT });
    }

    /// Write the continuation marker that ends a message's own fields.
    pub fn write_continuation(&mut self, has_base: bool) {
        self.write_byte(if has_base { CONTINUE } else { END });
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_bool() {
    assert_eq!(write_once(|bb| bb.write_bool(false)), [0]);
    assert_eq!(write_once(|bb| bb.write_bool(true)), [1]);
}

#[test]
fn write_byte() {
    assert_eq!(write_once(|bb| bb.write_byte(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_byte(1)), [1]);
    assert_eq!(write_once(|bb| bb.write_byte(254)), [254]);
    assert_eq!(write_once(|bb| bb.write_byte(255)), [255]);
}

#[test]
fn write_bytes() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&[1, 2, 3]);
    bb.write_bytes(&[]);
    bb.write_bytes(&[4, 5]);
    assert_eq!(bb.data(), [1, 2, 3, 4, 5]);
}

#[test]
fn write_fixed_width() {
    assert_eq!(write_once(|bb| bb.write_int16(-1)), [255, 255]);
    assert_eq!(write_once(|bb| bb.write_uint16(258)), [2, 1]);
    assert_eq!(write_once(|bb| bb.write_int32(5)), [5, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_int32(i32::MIN)), [0, 0, 0, 128]);
    assert_eq!(write_once(|bb| bb.write_uint32(u32::MAX)), [255, 255, 255, 255]);
    assert_eq!(
        write_once(|bb| bb.write_int64(-2)),
        [254, 255, 255, 255, 255, 255, 255, 255]
    );
    assert_eq!(
        write_once(|bb| bb.write_uint64(1)),
        [1, 0, 0, 0, 0, 0, 0, 0]
    );
    assert_eq!(write_once(|bb| bb.write_float32(0.5)), [0, 0, 0, 63]);
    assert_eq!(
        write_once(|bb| bb.write_float64(0.5)),
        [0, 0, 0, 0, 0, 0, 224, 63]
    );
    assert_eq!(
        write_once(|bb| bb.write_date(1000)),
        [232, 3, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("").unwrap()), [0, 0, 0, 0]);
    assert_eq!(
        write_once(|bb| bb.write_string("hi").unwrap()),
        [2, 0, 0, 0, 104, 105]
    );
    assert_eq!(
        write_once(|bb| bb.write_string("🍕").unwrap()),
        [4, 0, 0, 0, 240, 159, 141, 149]
    );
}

#[test]
fn write_byte_array() {
    assert_eq!(
        write_once(|bb| bb.write_byte_array(&[9, 8]).unwrap()),
        [2, 0, 0, 0, 9, 8]
    );
}

#[test]
fn write_markers() {
    assert_eq!(write_once(|bb| bb.write_presence(true)), [0]);
    assert_eq!(write_once(|bb| bb.write_presence(false)), [255]);
    assert_eq!(write_once(|bb| bb.write_continuation(true)), [1]);
    assert_eq!(write_once(|bb| bb.write_continuation(false)), [0]);
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_int32(5);
    bb.write_presence(true);
    bb.write_string("hi").unwrap();
    bb.write_continuation(false);
    assert_eq!(bb.len(), 12);
    assert_eq!(bb.data(), [5, 0, 0, 0, 0, 2, 0, 0, 0, 104, 105, 0]);
}
