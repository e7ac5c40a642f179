// ==========================================
// 数据管道 - CSV 写出
// ==========================================
// 职责: 把数据集写成带表头的 CSV（自检流程、样例数据生成共用）
// 空值写为空串，回读时按空值处理
// ==========================================

use crate::domain::Dataset;
use crate::pipeline::error::PipelineResult;
use std::fs::File;
use std::io;
use std::path::Path;

/// 写出数据集到任意 Writer
pub fn write_csv<W: io::Write>(dataset: &Dataset, writer: W) -> PipelineResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(dataset.column_names())?;

    let mut record = Vec::with_capacity(dataset.column_count());
    for row in 0..dataset.row_count() {
        record.clear();
        for column in dataset.columns() {
            let cell = column
                .data()
                .get(row)
                .map(|value| value.to_string())
                .unwrap_or_default();
            record.push(cell);
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// 写出数据集到文件（覆盖已有文件）
pub fn write_csv_file(dataset: &Dataset, path: &Path) -> PipelineResult<()> {
    let file = File::create(path)?;
    write_csv(dataset, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnData};
    use crate::pipeline::extractor::CsvExtractor;
    use tempfile::NamedTempFile;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::new("id", ColumnData::Integer(vec![Some(1), Some(2)])),
            Column::new("amount", ColumnData::Float(vec![Some(100.0), None])),
            Column::new(
                "product",
                ColumnData::Text(vec![Some("A".to_string()), Some("B".to_string())]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_write_csv_text() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "id,amount,product\n1,100.0,A\n2,,B\n");
    }

    #[test]
    fn test_written_file_reads_back_with_same_types() {
        let file = NamedTempFile::new().unwrap();
        write_csv_file(&sample(), file.path()).unwrap();

        let back = CsvExtractor.extract(file.path()).unwrap();
        assert_eq!(back, sample());
    }
}
