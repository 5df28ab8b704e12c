//! AMF0 decoder

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use num_traits::FromPrimitive;

use crate::{Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// AMF0 decoder.
///
/// Provides various functions to decode different types of AMF0 values from
/// a byte slice. Truncated input surfaces as an [`Amf0Error::Io`] with
/// [`std::io::ErrorKind::UnexpectedEof`].
#[derive(Debug, Clone)]
pub struct Amf0Decoder<'a> {
    cursor: io::Cursor<&'a [u8]>,
}

impl<'a> Amf0Decoder<'a> {
    /// Create a new decoder over a byte slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: io::Cursor::new(buf),
        }
    }

    /// Check if there are remaining bytes to read.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        (self.cursor.position() as usize) < self.cursor.get_ref().len()
    }

    fn read_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.cursor.read_u8()?;
        Amf0Marker::from_u8(marker).ok_or(Amf0Error::UnknownMarker(marker))
    }

    /// Peek the next marker in the buffer without consuming it.
    pub fn peek_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        let position = self.cursor.position();
        let marker = self.read_marker();
        self.cursor.set_position(position);
        marker
    }

    fn expect_marker(&mut self, expect: &'static [Amf0Marker]) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;

        if !expect.contains(&marker) {
            Err(Amf0Error::UnexpectedType {
                expected: expect,
                got: marker,
            })
        } else {
            Ok(marker)
        }
    }

    /// Decode a single [`Amf0Value`] from the buffer.
    pub fn decode_value(&mut self) -> Result<Amf0Value, Amf0Error> {
        let marker = self.peek_marker()?;

        match marker {
            Amf0Marker::Number => self.decode_number().map(Into::into),
            Amf0Marker::Boolean => self.decode_boolean().map(Into::into),
            Amf0Marker::String | Amf0Marker::LongString => self.decode_string().map(Into::into),
            Amf0Marker::Object => {
                self.read_marker()?;
                self.decode_object_entries().map(Amf0Value::Object)
            }
            Amf0Marker::Null => {
                self.read_marker()?;
                Ok(Amf0Value::Null)
            }
            Amf0Marker::Undefined => {
                self.read_marker()?;
                Ok(Amf0Value::Undefined)
            }
            Amf0Marker::EcmaArray => {
                self.read_marker()?;
                // The associative count is advisory, entries run until the
                // object end marker like a normal object.
                self.cursor.read_u32::<BigEndian>()?;
                self.decode_object_entries().map(Amf0Value::EcmaArray)
            }
            Amf0Marker::StrictArray => {
                self.read_marker()?;
                let size = self.cursor.read_u32::<BigEndian>()?;

                let mut array = Vec::with_capacity(size.min(1024) as usize);
                for _ in 0..size {
                    array.push(self.decode_value()?);
                }

                Ok(Amf0Value::StrictArray(array))
            }
            Amf0Marker::Date => {
                self.read_marker()?;
                let value = self.cursor.read_f64::<BigEndian>()?;
                let timezone = self.cursor.read_i16::<BigEndian>()?;
                Ok(Amf0Value::Date { value, timezone })
            }
            Amf0Marker::TypedObject => {
                self.read_marker()?;
                let class_name = self.decode_normal_string()?;
                let object = self.decode_object_entries()?;
                Ok(Amf0Value::TypedObject { class_name, object })
            }
            _ => Err(Amf0Error::UnsupportedMarker(marker)),
        }
    }

    /// Decode all values from the buffer until the end.
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>, Amf0Error> {
        let mut values = Vec::new();

        while self.has_remaining() {
            values.push(self.decode_value()?);
        }

        Ok(values)
    }

    /// Decode a number from the buffer.
    pub fn decode_number(&mut self) -> Result<f64, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Number])?;
        Ok(self.cursor.read_f64::<BigEndian>()?)
    }

    /// Decode a boolean from the buffer.
    pub fn decode_boolean(&mut self) -> Result<bool, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Boolean])?;
        Ok(self.cursor.read_u8()? != 0)
    }

    fn decode_normal_string(&mut self) -> Result<String, Amf0Error> {
        let len = self.cursor.read_u16::<BigEndian>()? as usize;
        self.read_string_bytes(len)
    }

    /// Decode a string from the buffer.
    ///
    /// This function can decode both normal strings and long strings.
    pub fn decode_string(&mut self) -> Result<String, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::String, Amf0Marker::LongString])?;

        let len = if marker == Amf0Marker::String {
            self.cursor.read_u16::<BigEndian>()? as usize
        } else {
            self.cursor.read_u32::<BigEndian>()? as usize
        };

        self.read_string_bytes(len)
    }

    fn read_string_bytes(&mut self, len: usize) -> Result<String, Amf0Error> {
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }

    fn decode_object_entries(&mut self) -> Result<Amf0Object, Amf0Error> {
        let mut object = Amf0Object::new();

        loop {
            let key = self.decode_normal_string()?;

            // The object end marker is preceded by an empty key
            if key.is_empty() && self.peek_marker()? == Amf0Marker::ObjectEnd {
                self.read_marker()?;
                return Ok(object);
            }

            let value = self.decode_value()?;
            object.push(key, value);
        }
    }
}
