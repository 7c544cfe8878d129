use std::error::Error;

use super::file::resolve_path;

/// A header row plus text records, exactly as uploaded.
pub type TextTable = (Vec<String>, Vec<Vec<String>>);

/// Read a CSV upload. Rows may have fewer cells than the header.
pub fn read_csv_table(path: &str) -> Result<TextTable, Box<dyn Error>> {
    read_csv_table_from(path, 1)
}

/// Read a CSV upload whose header sits on `header_row` (1-based); the lines
/// above it are report preamble and are dropped. Cells that are not UTF-8
/// are read as Latin-1, the encoding of the daily price files.
pub fn read_csv_table_from(path: &str, header_row: usize) -> Result<TextTable, Box<dyn Error>> {
    if header_row == 0 {
        return Err("header row is 1-based".into());
    }
    let canonical = resolve_path(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let mut lines = Vec::new();
    for record in rdr.byte_records() {
        let record =
            record.map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
        lines.push(record.iter().map(decode_cell).collect::<Vec<String>>());
    }

    let mut lines = lines.into_iter().skip(header_row - 1);
    let headers: Vec<String> = lines
        .next()
        .ok_or_else(|| format!("'{}' has no header on row {}", canonical.display(), header_row))?
        .iter()
        // Spreadsheet exports often start with a byte order mark.
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let records: Vec<Vec<String>> = lines.collect();

    tracing::info!(path = %canonical.display(), records = records.len(), "csv table read");
    Ok((headers, records))
}

fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Write a header row and records to `path`, replacing any existing file.
pub fn write_csv_table(
    path: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_cells_decoded() {
        assert_eq!(decode_cell(b"Obligasi \xe9"), "Obligasi \u{e9}");
        assert_eq!(decode_cell("ISIN CODE".as_bytes()), "ISIN CODE");
    }

    #[test]
    fn test_header_row_skips_preamble() {
        let path = std::env::temp_dir().join("hccl_repo_preamble.csv");
        std::fs::write(
            &path,
            "Reverse Repo Bonds Daily Position\nDate,2025-03-14\nNo,Instrument Code,Nominal Amount\n1,IDG000012345,1000\n",
        )
        .unwrap();
        let (headers, records) = read_csv_table_from(path.to_str().unwrap(), 3).unwrap();
        assert_eq!(headers, vec!["No", "Instrument Code", "Nominal Amount"]);
        assert_eq!(records, vec![vec!["1", "IDG000012345", "1000"]]);
        std::fs::remove_file(&path).ok();
    }
}
