// src/output_format.rs
use crate::dataset::Dataset;
use crate::error::Result;
use std::io::Write;

/// Write a dataset as comma-separated UTF-8: header row first, one row per
/// record, quoting only where a field needs it. Missing cells are empty.
pub fn write_csv<W: Write>(dataset: &Dataset, output: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(output);

    writer.write_record(dataset.columns())?;
    for record in dataset.records() {
        writer.write_record(record.cells().iter().map(|cell| cell.render()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialized artifact bytes for a dataset
pub fn to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(dataset, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;
    use chrono::NaiveDate;

    #[test]
    fn test_quotes_embedded_delimiters() {
        let ds = Dataset::new(
            vec!["Nome".to_string(), "Endereço".to_string()],
            vec![vec![Cell::from_raw("Ana"), Cell::from_raw("Rua A, 10")]],
        );
        let out = String::from_utf8(to_csv_bytes(&ds).unwrap()).unwrap();
        assert_eq!(out, "Nome,Endereço\nAna,\"Rua A, 10\"\n");
    }

    #[test]
    fn test_missing_and_datetime_cells() {
        let login = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let ds = Dataset::new(
            vec!["Nome".to_string(), "Login".to_string(), "Obs".to_string()],
            vec![vec![Cell::from_raw("A"), Cell::DateTime(login), Cell::Missing]],
        );
        let out = String::from_utf8(to_csv_bytes(&ds).unwrap()).unwrap();
        assert_eq!(out, "Nome,Login,Obs\nA,2020-01-01 10:00:00,\n");
    }

    #[test]
    fn test_header_only_for_empty_dataset() {
        let ds = Dataset::new(vec!["a".to_string(), "b".to_string()], Vec::new());
        let out = String::from_utf8(to_csv_bytes(&ds).unwrap()).unwrap();
        assert_eq!(out, "a,b\n");
    }
}
