use crate::data::{Error, Options, RawRow, Record, MIN_CELLS};
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Trait for doing something with a `Record` extracted from the HTML table.
/// The CSV emitter and the payee counter both implement it, as do the mock
/// sinks in tests, so the extraction loop never touches a real file.
pub(crate) trait RecordSink {
    fn use_record(&mut self, record: Record) -> Result<(), anyhow::Error>;
}

fn tr_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("invalid tr selector"))
}

fn td_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").expect("invalid td selector"))
}

/// First non-empty text node of a cell, trimmed. Bank exports wrap the value
/// of interest in the first text child and bury markup after it.
fn first_text(cell: ElementRef) -> String {
    cell.text()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Full text content of a cell. The amount cell sometimes splits its value
/// across inline elements, so all text nodes are joined for it.
fn full_text(cell: ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join("").trim().to_string()
}

fn raw_row(row: ElementRef) -> Result<RawRow, Error> {
    let cells: Vec<ElementRef> = row.select(td_selector()).collect();
    if cells.len() < MIN_CELLS {
        return Err(Error::MalformedRow { found: cells.len() });
    }
    // Cell 2 is skipped: its meaning is undocumented in the export.
    Ok(RawRow {
        payee: first_text(cells[0]),
        amount: full_text(cells[1]),
        notes: first_text(cells[3]),
        transaction_date: first_text(cells[4]),
    })
}

/// Walk every table row of the document in document order, normalize and
/// validate it, and push the resulting `Record` into the sink. The first bad
/// row aborts the whole run; rows already handed to the sink stay handed
/// (for the CSV emitter that means a truncated output file on failure).
/// Returns the number of records produced.
pub(crate) fn extract_records<S: RecordSink>(
    html: &str,
    options: &Options,
    sink: &mut S,
) -> Result<usize, anyhow::Error> {
    let document = Html::parse_document(html);
    let mut count = 0;
    for row in document.select(tr_selector()) {
        let record = Record::from_raw(raw_row(row)?, options)?;
        sink.use_record(record)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    pub(crate) struct RecordStorage {
        pub records: Vec<Record>,
    }

    impl RecordSink for RecordStorage {
        fn use_record(&mut self, record: Record) -> Result<(), anyhow::Error> {
            self.records.push(record);
            Ok(())
        }
    }

    const STATEMENT: &str = r#"
        <html><body><table><tbody>
        <tr>
            <td>REWE Markt</td>
            <td><span>1.234</span><span>,56</span></td>
            <td>ref 0001</td>
            <td>weekly shopping</td>
            <td>03.01.2023</td>
        </tr>
        <tr>
            <td>Stadtwerke</td>
            <td>89,90</td>
            <td>ref 0002</td>
            <td>electricity</td>
            <td>05.01.2023</td>
        </tr>
        </tbody></table></body></html>"#;

    #[test]
    fn extracts_rows_in_document_order() {
        let mut storage = RecordStorage::default();
        let count = extract_records(STATEMENT, &Options::default(), &mut storage).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            storage.records,
            [
                Record {
                    payee: "REWE Markt".to_string(),
                    amount: dec!(1234.56),
                    notes: "weekly shopping".to_string(),
                    transaction_date: "03.01.2023".to_string(),
                },
                Record {
                    payee: "Stadtwerke".to_string(),
                    amount: dec!(89.90),
                    notes: "electricity".to_string(),
                    transaction_date: "05.01.2023".to_string(),
                },
            ]
        );
    }

    #[test]
    fn short_row_fails_loudly() {
        let html = "<table><tr><td>REWE Markt</td><td>10,00</td><td>x</td></tr></table>";
        let mut storage = RecordStorage::default();
        let err = extract_records(html, &Options::default(), &mut storage).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::MalformedRow { found: 3 })
        );
        assert!(storage.records.is_empty());
    }

    #[test]
    fn bad_row_aborts_after_earlier_rows_were_sunk() {
        let html = "<table>\
            <tr><td>A</td><td>10,00</td><td></td><td>ok</td><td>d</td></tr>\
            <tr><td>B</td><td>oops</td><td></td><td>ok</td><td>d</td></tr>\
            </table>";
        let mut storage = RecordStorage::default();
        let err = extract_records(html, &Options::default(), &mut storage).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidAmount {
                raw: "oops".to_string()
            })
        );
        // The first row already reached the sink before the failure.
        assert_eq!(storage.records.len(), 1);
    }

    #[test]
    fn document_without_rows_yields_nothing() {
        let mut storage = RecordStorage::default();
        let count = extract_records("<html><body></body></html>", &Options::default(), &mut storage)
            .unwrap();
        assert_eq!(count, 0);
    }
}
