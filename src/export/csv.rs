//! CSV出力（UTF-8 BOM付き、Excelでそのまま開ける形式）

use crate::error::{MallAiError, Result};
use mall_ai_common::CanonicalRecord;
use std::io::{self, Write};
use std::path::Path;

pub const BOM: &str = "\u{feff}";

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// 1行を書き出す
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// ヘッダ行（フィールド順）+ レコード行。null は空欄。
pub fn records_to_csv(records: &[CanonicalRecord]) -> Vec<u8> {
    let mut buf = Vec::from(BOM.as_bytes());
    let header: Vec<String> = CanonicalRecord::FIELDS.iter().map(|f| f.to_string()).collect();
    // Vec<u8> への書き込みは失敗しない
    let _ = write_row(&mut buf, &header);

    for record in records {
        let row: Vec<String> = CanonicalRecord::FIELDS
            .iter()
            .map(|f| record.value(f).unwrap_or_default())
            .collect();
        let _ = write_row(&mut buf, &row);
    }
    buf
}

pub fn write_records_csv(records: &[CanonicalRecord], path: &Path) -> Result<()> {
    std::fs::write(path, records_to_csv(records))
        .map_err(|e| MallAiError::Export(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mall_ai_common::FloorCode;

    #[test]
    fn test_write_row_quoting() {
        let mut buf = Vec::new();
        write_row(
            &mut buf,
            &["plain".into(), "a,b".into(), "say \"hi\"".into(), "".into()],
        )
        .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "plain,\"a,b\",\"say \"\"hi\"\"\",\n");
    }

    #[test]
    fn test_records_to_csv() {
        let record = CanonicalRecord {
            name: Some("Cafe, Lumiere".into()),
            floor: Some(FloorCode::Basement(2)),
            shop_number: Some("B2-05".into()),
            ..Default::default()
        };
        let csv = String::from_utf8(records_to_csv(&[record])).unwrap();
        assert!(csv.starts_with(BOM));

        let lines: Vec<&str> = csv.trim_start_matches(BOM).lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("name,floor,shop_number,category,"));
        assert_eq!(lines[0].split(',').count(), CanonicalRecord::FIELDS.len());
        assert!(lines[1].starts_with("\"Cafe, Lumiere\",B2,B2-05,,"));
    }
}
