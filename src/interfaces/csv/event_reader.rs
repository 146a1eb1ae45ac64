use crate::error::{RegistrationError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventOp {
    Init,
    Field,
    File,
    Bulk,
    Order,
    Delete,
}

/// One recorded interaction of the registration flow.
///
/// `name` and `value` are op-specific: the field name and its value for
/// `field`, the semantic type and a file path for `file`, a JSON object in
/// `value` for `init` (creation hints) and `bulk`, and the supplied order
/// id in `value` for `order`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct FormEvent {
    pub op: EventOp,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Reads form events from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<FormEvent>`. It handles whitespace trimming and flexible record
/// lengths automatically.
pub struct FormEventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> FormEventReader<R> {
    /// Creates a new `FormEventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes events, so
    /// long recordings stream without loading everything into memory.
    pub fn events(self) -> impl Iterator<Item = Result<FormEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(RegistrationError::from))
    }
}
