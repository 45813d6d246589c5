use crate::data::Record;
use crate::mapping::CategoryMap;
use crate::read::RecordSink;
use rust_decimal::Decimal;
use serde::Serialize;

/// Serialization proxy for the enriched CSV row: the four record columns
/// plus the category looked up by payee, empty when the payee is unmapped.
#[derive(Serialize)]
struct EnrichedRow<'a> {
    payee: &'a str,
    amount: &'a Decimal,
    notes: &'a str,
    transaction_date: &'a str,
    category: &'a str,
}

/// CSV emitter for `Record`s, one row per record in arrival order. MMEX
/// wants no header row, comma delimiters and quotes only where needed,
/// which is the csv crate's default quoting with headers turned off.
/// Rows are written as they arrive, so a failing run leaves a truncated
/// file behind.
pub(crate) struct CsvEmitter<'m, W: std::io::Write> {
    writer: csv::Writer<W>,
    mapping: Option<&'m CategoryMap>,
}

impl<'m, W: std::io::Write> CsvEmitter<'m, W> {
    /// With a mapping, every row gets a trailing category column; without
    /// one, the plain four-column layout is emitted.
    pub fn new(writer: W, mapping: Option<&'m CategoryMap>) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(writer),
            mapping,
        }
    }

    pub fn flush(&mut self) -> Result<(), anyhow::Error> {
        Ok(self.writer.flush()?)
    }
}

impl<W: std::io::Write> RecordSink for CsvEmitter<'_, W> {
    fn use_record(&mut self, record: Record) -> Result<(), anyhow::Error> {
        match self.mapping {
            Some(mapping) => self.writer.serialize(EnrichedRow {
                payee: &record.payee,
                amount: &record.amount,
                notes: &record.notes,
                transaction_date: &record.transaction_date,
                category: mapping.get(&record.payee).unwrap_or(""),
            })?,
            None => self.writer.serialize(&record)?,
        }
        Ok(())
    }
}
