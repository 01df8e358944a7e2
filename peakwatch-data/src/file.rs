//! 基于本地 CSV 文件的收盘价数据源。
//!
//! 文件至少需要包含 `Date` 和 `Close` 两列（其他列，例如 `Open`、`High`、`Volume`，会被忽略），
//! 因此可以直接读取常见行情下载工具导出的日线文件。

use crate::{PricePoint, PriceSeries, PriceSource, Validator, error::DataError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CSV 文件中的单行记录。
#[derive(Debug, Deserialize)]
struct CsvPriceRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Close")]
    close: f64,
}

impl From<CsvPriceRecord> for PricePoint {
    fn from(record: CsvPriceRecord) -> Self {
        PricePoint::new(record.date, record.close)
    }
}

/// 从本地 CSV 文件读取收盘价的 [`PriceSource`]。
///
/// 每次请求都会重新读取整个文件，因此外部进程追加的新行会在下一次更新时被看到。
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<PriceSeries, DataError> {
        let mut reader = csv::Reader::from_path(&self.path)?;

        let series = reader
            .deserialize::<CsvPriceRecord>()
            .map(|record| record.map(PricePoint::from))
            .collect::<Result<PriceSeries, _>>()?
            .validate()?;

        debug!(path = %self.path.display(), rows = series.len(), "read CSV price file");
        Ok(series)
    }
}

impl PriceSource for CsvPriceSource {
    async fn fetch_history(&self) -> Result<PriceSeries, DataError> {
        self.read()
    }

    async fn fetch_since(&self, start: NaiveDate) -> Result<PriceSeries, DataError> {
        self.read().map(|series| series.since(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_csv_price_source_ignores_extra_columns() {
        let file = write_csv(
            "Date,Close,High,Low,Open,Volume\n\
             2024-01-02,16543.94,16800.1,16500.0,16780.2,100\n\
             2024-01-03,16368.49,16500.0,16300.0,16450.0,200\n\
             2024-01-04,16282.01,16400.0,16250.0,16370.0,300\n",
        );
        let source = CsvPriceSource::new(file.path());

        let history = source.fetch_history().await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.points()[0],
            PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 16543.94)
        );

        let since = source
            .fetch_since(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(since.len(), 2);
        assert_eq!(since.last_date(), NaiveDate::from_ymd_opt(2024, 1, 4));
    }

    #[tokio::test]
    async fn test_csv_price_source_no_new_data_is_empty() {
        let file = write_csv("Date,Close\n2024-01-02,100.0\n");
        let source = CsvPriceSource::new(file.path());

        let actual = source
            .fetch_since(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .await
            .unwrap();

        assert!(actual.is_empty());
    }

    #[tokio::test]
    async fn test_csv_price_source_rejects_unordered_rows() {
        let file = write_csv("Date,Close\n2024-01-03,100.0\n2024-01-02,101.0\n");
        let source = CsvPriceSource::new(file.path());

        let actual = source.fetch_history().await;

        assert!(matches!(actual, Err(DataError::InvalidSeries(_))));
    }
}
