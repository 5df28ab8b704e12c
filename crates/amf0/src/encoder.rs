//! AMF0 encoder

use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// AMF0 encoder.
///
/// Provides various functions to encode different types of AMF0 values into a writer.
#[derive(Debug)]
pub struct Amf0Encoder<W> {
    writer: W,
}

impl<W> Amf0Encoder<W> {
    /// Create a new encoder from a writer.
    pub fn new(writer: W) -> Self {
        Amf0Encoder { writer }
    }
}

impl<W> Amf0Encoder<W>
where
    W: io::Write,
{
    /// Encode a [`bool`] as a AMF0 boolean value.
    pub fn encode_boolean(&mut self, value: bool) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Boolean as u8)?;
        self.writer.write_u8(value as u8)?;
        Ok(())
    }

    /// Encode a [`f64`] as a AMF0 number value.
    pub fn encode_number(&mut self, value: f64) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Number as u8)?;
        self.writer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    /// Encode a [`&str`](str) as a AMF0 string value.
    ///
    /// This function decides based on the length of the given string slice whether to use a normal string or a long string.
    pub fn encode_string(&mut self, value: &str) -> Result<(), Amf0Error> {
        let len = value.len();

        if len <= (u16::MAX as usize) {
            // Normal string
            self.writer.write_u8(Amf0Marker::String as u8)?;
            self.writer.write_u16::<BigEndian>(len as u16)?;
            self.writer.write_all(value.as_bytes())?;
        } else {
            // Long string

            // This try_into fails if the length is greater than u32::MAX
            let len: u32 = len.try_into()?;

            self.writer.write_u8(Amf0Marker::LongString as u8)?;
            self.writer.write_u32::<BigEndian>(len)?;
            self.writer.write_all(value.as_bytes())?;
        }

        Ok(())
    }

    /// Encode AMF0 Null value.
    pub fn encode_null(&mut self) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Null as u8)?;
        Ok(())
    }

    /// Encode AMF0 Undefined value.
    pub fn encode_undefined(&mut self) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Undefined as u8)?;
        Ok(())
    }

    /// Encode a [`f64`] and timezone as an AMF0 date value.
    pub fn encode_date(&mut self, value: f64, timezone: i16) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Date as u8)?;
        self.writer.write_f64::<BigEndian>(value)?;
        self.writer.write_i16::<BigEndian>(timezone)?;
        Ok(())
    }

    /// Encode a slice of values as an AMF0 StrictArray value.
    pub fn encode_strict_array(&mut self, values: &[Amf0Value]) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::StrictArray as u8)?;
        self.writer.write_u32::<BigEndian>(values.len().try_into()?)?;

        for value in values {
            self.encode_value(value)?;
        }

        Ok(())
    }

    fn encode_object_key(&mut self, key: &str) -> Result<(), Amf0Error> {
        self.writer.write_u16::<BigEndian>(key.len().try_into()?)?;
        self.writer.write_all(key.as_bytes())?;
        Ok(())
    }

    fn encode_object_entries(&mut self, object: &Amf0Object) -> Result<(), Amf0Error> {
        for (key, value) in object.iter() {
            self.encode_object_key(key)?;
            self.encode_value(value)?;
        }

        // Empty key followed by the object end marker
        self.writer.write_u16::<BigEndian>(0)?;
        self.writer.write_u8(Amf0Marker::ObjectEnd as u8)?;

        Ok(())
    }

    /// Encode an [`Amf0Object`] as an AMF0 Object value.
    pub fn encode_object(&mut self, object: &Amf0Object) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Object as u8)?;
        self.encode_object_entries(object)
    }

    /// Encode an [`Amf0Object`] as an AMF0 ECMA array value.
    pub fn encode_ecma_array(&mut self, object: &Amf0Object) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::EcmaArray as u8)?;
        self.writer.write_u32::<BigEndian>(object.len().try_into()?)?;
        self.encode_object_entries(object)
    }

    /// Encode any [`Amf0Value`].
    pub fn encode_value(&mut self, value: &Amf0Value) -> Result<(), Amf0Error> {
        match value {
            Amf0Value::Number(value) => self.encode_number(*value),
            Amf0Value::Boolean(value) => self.encode_boolean(*value),
            Amf0Value::String(value) => self.encode_string(value),
            Amf0Value::Object(object) => self.encode_object(object),
            Amf0Value::EcmaArray(object) => self.encode_ecma_array(object),
            Amf0Value::StrictArray(values) => self.encode_strict_array(values),
            Amf0Value::TypedObject { class_name, object } => {
                self.writer.write_u8(Amf0Marker::TypedObject as u8)?;
                self.encode_object_key(class_name)?;
                self.encode_object_entries(object)
            }
            Amf0Value::Date { value, timezone } => self.encode_date(*value, *timezone),
            Amf0Value::Null => self.encode_null(),
            Amf0Value::Undefined => self.encode_undefined(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::Amf0Decoder;

    #[test]
    fn encode_object_bytes() {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        let object: Amf0Object = vec![("app".to_string(), Amf0Value::String("live".to_string()))].into();
        encoder.encode_object(&object).unwrap();

        #[rustfmt::skip]
        assert_eq!(
            buf,
            vec![
                0x03, // object marker
                0x00, 0x03, b'a', b'p', b'p', // key "app"
                0x02, 0x00, 0x04, b'l', b'i', b'v', b'e', // value "live"
                0x00, 0x00, 0x09, // object end
            ]
        );
    }

    #[test]
    fn encode_long_string() {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        let value = "x".repeat(u16::MAX as usize + 1);
        encoder.encode_string(&value).unwrap();

        assert_eq!(buf[0], Amf0Marker::LongString as u8);
        assert_eq!(buf[1..5], (u16::MAX as u32 + 1).to_be_bytes());
    }

    fn round_trip(value: Amf0Value) {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);
        encoder.encode_value(&value).unwrap();

        let mut decoder = Amf0Decoder::new(&buf);
        assert_eq!(decoder.decode_value().unwrap(), value);
        assert!(!decoder.has_remaining());

        // Encoding the decoded value again must reproduce the same bytes
        let mut buf2 = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf2);
        encoder.encode_value(&value).unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn round_trip_all_variants() {
        round_trip(Amf0Value::Number(3.5));
        round_trip(Amf0Value::Boolean(false));
        round_trip(Amf0Value::String("stream?token=XYZ".to_string()));
        round_trip(Amf0Value::Null);
        round_trip(Amf0Value::Undefined);
        round_trip(Amf0Value::Date {
            value: 1234.0,
            timezone: -120,
        });
        round_trip(Amf0Value::Object(
            vec![
                ("b".to_string(), Amf0Value::Number(2.0)),
                ("a".to_string(), Amf0Value::Number(1.0)),
            ]
            .into(),
        ));
        round_trip(Amf0Value::EcmaArray(
            vec![("k".to_string(), Amf0Value::String("v".to_string()))].into(),
        ));
        round_trip(Amf0Value::StrictArray(vec![
            Amf0Value::Null,
            Amf0Value::Boolean(true),
            Amf0Value::String("x".to_string()),
        ]));
        round_trip(Amf0Value::TypedObject {
            class_name: "com.example.Thing".to_string(),
            object: vec![("id".to_string(), Amf0Value::Number(7.0))].into(),
        });
    }
}
