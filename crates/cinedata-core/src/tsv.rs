//! Tab-separated tables as published in the IMDb dataset dumps.
//!
//! The format has a header row, one record per line, and no quoting: a
//! field never contains a tab or a newline, and a `"` is plain text. Both
//! directions go through `csv` configured for exactly that. Staged files
//! mark missing values with [`NULL_SENTINEL`]; processed files leave the
//! field empty.

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// The literal token the dataset uses for "no value".
pub const NULL_SENTINEL: &str = "\\N";

const DELIMITER: u8 = b'\t';

/// Streams records out of a tab-separated table.
///
/// The header is read eagerly by [`TsvReader::new`]; iteration yields the
/// remaining rows as raw fields. A row whose width differs from the header
/// is an [`Error::MalformedRow`].
#[derive(Debug)]
pub struct TsvReader<R> {
    inner: csv::Reader<R>,
    header: Vec<String>,
    record: StringRecord,
}

impl<R: Read> TsvReader<R> {
    /// Read the header row.
    ///
    /// # Errors
    /// Returns [`Error::MissingHeader`] if the input is empty.
    pub fn new(inner: R) -> Result<Self> {
        let mut inner = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .quoting(false)
            .has_headers(true)
            .flexible(false)
            .from_reader(inner);
        let header: Vec<String> = inner.headers()?.iter().map(str::to_string).collect();
        if header.is_empty() {
            return Err(Error::MissingHeader);
        }
        Ok(Self {
            inner,
            header,
            record: StringRecord::new(),
        })
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }
}

impl<R: Read> Iterator for TsvReader<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.record.iter().map(str::to_string).collect())),
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Writes records as a tab-separated table, nulls as empty fields.
#[derive(Debug)]
pub struct TsvWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> TsvWriter<W> {
    #[must_use]
    pub fn new(inner: W) -> Self {
        let inner = WriterBuilder::new()
            .delimiter(DELIMITER)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(inner);
        Self { inner }
    }

    /// Write the header row.
    pub fn write_header<S: AsRef<str>>(&mut self, header: &[S]) -> Result<()> {
        self.inner
            .write_record(header.iter().map(AsRef::<str>::as_ref))?;
        Ok(())
    }

    /// Write one record; `None` becomes an empty field.
    pub fn write_record<'a, I>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        self.inner
            .write_record(record.into_iter().map(Option::unwrap_or_default))?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.inner.into_inner().map_err(|e| Error::Io(e.into_error()))
    }
}

/// Map a staged field to its normalized value.
#[must_use]
pub fn from_sentinel(field: &str) -> Option<&str> {
    if field == NULL_SENTINEL {
        None
    } else {
        Some(field)
    }
}

/// Map a processed field to its stored value.
#[must_use]
pub fn from_empty(field: &str) -> Option<&str> {
    if field.is_empty() {
        None
    } else {
        Some(field)
    }
}
