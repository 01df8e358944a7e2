//! Yahoo Finance v8 图表 API 的响应模型。

use crate::{PricePoint, PriceSeries, error::DataError};
use chrono::DateTime;
use serde::Deserialize;

/// `GET /v8/finance/chart/{symbol}` 的顶层响应。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    /// 区间内没有交易日时，Yahoo 会省略此字段。
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    /// 交易所时区相对 UTC 的偏移（秒）。
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    /// 停牌或数据缺失的交易日为 `null`。
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

/// Yahoo 对没有数据的区间返回的错误码。
const CODE_NOT_FOUND: &str = "Not Found";

impl TryFrom<ChartResponse> for PriceSeries {
    type Error = DataError;

    fn try_from(response: ChartResponse) -> Result<Self, Self::Error> {
        let Chart { result, error } = response.chart;

        if let Some(error) = error {
            return match error.code.as_str() {
                CODE_NOT_FOUND => Ok(PriceSeries::default()),
                _ => Err(DataError::Upstream {
                    code: error.code,
                    description: error.description,
                }),
            };
        }

        let Some(result) = result.and_then(|results| results.into_iter().next()) else {
            return Ok(PriceSeries::default());
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|quote| quote.close)
            .unwrap_or_default();

        if timestamps.len() != closes.len() {
            return Err(DataError::InvalidSeries(format!(
                "{} timestamps but {} closes for {}",
                timestamps.len(),
                closes.len(),
                result.meta.symbol
            )));
        }

        let gmtoffset = result.meta.gmtoffset;
        timestamps
            .into_iter()
            .zip(closes)
            .filter_map(|(timestamp, close)| close.map(|close| (timestamp, close)))
            .map(|(timestamp, close)| {
                DateTime::from_timestamp(timestamp + gmtoffset, 0)
                    .map(|time| PricePoint::new(time.date_naive(), close))
                    .ok_or_else(|| {
                        DataError::InvalidSeries(format!("timestamp out of range: {timestamp}"))
                    })
            })
            .collect()
    }
}
