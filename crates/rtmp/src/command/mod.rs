//! AMF0 command messages and the publish rewrite rules.

mod error;
mod rewrite;

pub use error::CommandError;
pub use rewrite::{RewriteOutcome, RewriteRules};
use rtmpproxy_amf0::{Amf0Decoder, Amf0Encoder, Amf0Value};

/// A decoded AMF0 command message.
///
/// The payload of a command message is the command name, the transaction id
/// and a free-form sequence of arguments. Decoding keeps every argument so
/// that commands the relay does not recognize re-encode byte-identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The command name.
    pub name: String,
    /// The transaction id.
    pub transaction_id: f64,
    /// The command arguments, in order.
    pub args: Vec<Amf0Value>,
}

impl Command {
    /// Reads a [`Command`] from a message payload.
    pub fn read(payload: &[u8]) -> Result<Self, CommandError> {
        let mut decoder = Amf0Decoder::new(payload);

        let name = decoder.decode_string()?;
        let transaction_id = decoder.decode_number()?;
        let args = decoder.decode_all()?;

        Ok(Self {
            name,
            transaction_id,
            args,
        })
    }

    /// Re-encodes the command into a message payload.
    pub fn write(&self) -> Result<Vec<u8>, CommandError> {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        encoder.encode_string(&self.name)?;
        encoder.encode_number(self.transaction_id)?;
        for arg in &self.args {
            encoder.encode_value(arg)?;
        }

        Ok(buf)
    }
}
