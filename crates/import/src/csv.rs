use releve_core::RawRow;
use std::io::Read;
use thiserror::Error;
use tracing::info;

pub const DELIMITER: u8 = b';';

/// Header names of the columns the builder needs.
pub const OPERATION_DATE_COLUMN: &str = "dateOp";
pub const VALUE_DATE_COLUMN: &str = "dateVal";
pub const LABEL_COLUMN: &str = "label";
pub const AMOUNT_COLUMN: &str = "amount";

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("Line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    operation_date: usize,
    value_date: usize,
    label: usize,
    amount: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CsvError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or(CsvError::MissingColumn(name))
        };
        Ok(ColumnMap {
            operation_date: find(OPERATION_DATE_COLUMN)?,
            value_date: find(VALUE_DATE_COLUMN)?,
            label: find(LABEL_COLUMN)?,
            amount: find(AMOUNT_COLUMN)?,
        })
    }

    fn row(&self, record: &csv::StringRecord) -> RawRow {
        let cell = |i: usize| record.get(i).unwrap_or_default();
        RawRow::new(
            cell(self.operation_date),
            cell(self.value_date),
            cell(self.label),
            cell(self.amount),
        )
    }
}

/// Reads the bank's `;`-separated export. Columns are located by header name;
/// extra columns and short records are tolerated. Blank lines are skipped.
pub fn read_rows<R: Read>(data: R) -> Result<Vec<RawRow>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| CsvError::Row {
            line: source.position().map(|p| p.line()).unwrap_or_default(),
            source,
        })?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(columns.row(&record));
    }

    info!(count = rows.len(), "read export rows");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "dateOp;dateVal;label;category;categoryParent;supplierFound;amount;comment;accountNum;accountLabel;accountbalance\n";

    fn export(lines: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for line in lines {
            s.push_str(line);
            s.push('\n');
        }
        s
    }

    #[test]
    fn reads_named_columns() {
        let data = export(&[
            "2022-06-10;2022-06-11;\"CARTE 09/06/22 SNCF INTERNET CB*5537\";Transports;Auto;sncf;-7,50;;0001;Compte;1000,00",
            "2022-06-12;2022-06-12;\"VIR Loyer\";Logement;Logement;;-850,00;;0001;Compte;150,00",
        ]);
        let rows = read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            RawRow::new("2022-06-10", "2022-06-11", "CARTE 09/06/22 SNCF INTERNET CB*5537", "-7,50")
        );
        assert_eq!(rows[1].label.as_deref(), Some("VIR Loyer"));
        assert_eq!(rows[1].amount.as_deref(), Some("-850,00"));
    }

    #[test]
    fn columns_in_any_order() {
        let data = "amount;label;dateVal;dateOp\n1,00;VIR Loyer;2022-06-11;2022-06-10\n";
        let rows = read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows, vec![RawRow::new("2022-06-10", "2022-06-11", "VIR Loyer", "1,00")]);
    }

    #[test]
    fn byte_order_mark_in_header() {
        let data = "\u{feff}dateOp;dateVal;label;amount\n2022-06-10;;VIR Loyer;1\n";
        let rows = read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows[0].operation_date.as_deref(), Some("2022-06-10"));
        assert_eq!(rows[0].value_date, None);
    }

    #[test]
    fn short_records_leave_cells_empty() {
        let data = "dateOp;dateVal;label;amount\n2022-06-10;2022-06-10;VIR Loyer\n";
        let rows = read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows[0].amount, None);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let data = "dateOp;dateVal;label;amount\n;;;\n2022-06-10;;VIR Loyer;1\n";
        assert_eq!(read_rows(data.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn missing_column_is_reported() {
        let data = "dateOp;dateVal;libelle;amount\n";
        assert!(matches!(
            read_rows(data.as_bytes()),
            Err(CsvError::MissingColumn(LABEL_COLUMN))
        ));
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert!(read_rows(HEADER.as_bytes()).unwrap().is_empty());
    }
}
