//! Yahoo Finance 图表 API 数据源。
//!
//! 使用 `GET https://query1.finance.yahoo.com/v8/finance/chart/{symbol}` 获取日线收盘价。
//! 默认跟踪纳斯达克 100 指数（`^NDX`）。

use crate::{
    PriceSeries, PriceSource, Validator,
    error::DataError,
    yahoo::model::ChartResponse,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use smol_str::SmolStr;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Yahoo 图表 API 响应模型。
pub mod model;

/// 默认 API 基础 URL。
pub const BASE_URL_YAHOO_CHART: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

/// 纳斯达克 100 指数代码。
pub const SYMBOL_NASDAQ_100: &str = "^NDX";

/// 不带浏览器 User-Agent 的请求会被 Yahoo 拒绝。
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) peakwatch";

/// 单次请求超时时间。
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Yahoo Finance 图表 API 客户端。
#[derive(Debug, Clone)]
pub struct YahooChart {
    client: Client,
    base_url: Url,
    symbol: SmolStr,
    /// "全量历史" 请求的起始日期。
    start: NaiveDate,
}

impl YahooChart {
    /// 构造指定代码的客户端，全量历史从 `start` 开始请求。
    pub fn new(symbol: impl Into<SmolStr>, start: NaiveDate) -> Result<Self, DataError> {
        Self::with_base_url(symbol, start, BASE_URL_YAHOO_CHART)
    }

    /// 使用自定义基础 URL 构造客户端（例如本地代理或测试服务器）。
    pub fn with_base_url(
        symbol: impl Into<SmolStr>,
        start: NaiveDate,
        base_url: &str,
    ) -> Result<Self, DataError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            symbol: symbol.into(),
            start,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// 构造 `[start, now]` 区间的日线请求 URL。
    fn url(&self, start: NaiveDate) -> Result<Url, DataError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = Utc::now().timestamp();

        let mut url = self.base_url.join(&self.symbol)?;
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");

        Ok(url)
    }

    async fn fetch(&self, start: NaiveDate) -> Result<PriceSeries, DataError> {
        if start > Utc::now().date_naive() {
            debug!(symbol = %self.symbol, %start, "requested range starts in the future");
            return Ok(PriceSeries::default());
        }

        let url = self.url(start)?;
        debug!(%url, "requesting Yahoo chart");

        let response = tokio::time::timeout(REQUEST_TIMEOUT, self.client.get(url.clone()).send())
            .await
            .map_err(|_| DataError::Timeout(REQUEST_TIMEOUT))??;

        // Yahoo 对不存在的区间返回 404 加错误体，交给模型解析
        let status = response.status();
        if !status.is_success() && status.as_u16() != 404 {
            return Err(DataError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        let chart = serde_json::from_slice::<ChartResponse>(&body)?;
        let series = PriceSeries::try_from(chart)?.since(start).validate()?;

        info!(
            symbol = %self.symbol,
            %start,
            rows = series.len(),
            last = ?series.last_date(),
            "fetched closing prices"
        );

        Ok(series)
    }
}

impl PriceSource for YahooChart {
    async fn fetch_history(&self) -> Result<PriceSeries, DataError> {
        self.fetch(self.start).await
    }

    async fn fetch_since(&self, start: NaiveDate) -> Result<PriceSeries, DataError> {
        self.fetch(start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yahoo_chart_url() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let chart = YahooChart::new(SYMBOL_NASDAQ_100, start).unwrap();

        let url = chart.url(start).unwrap();

        assert_eq!(url.host_str(), Some("query1.finance.yahoo.com"));
        assert!(url.path().starts_with("/v8/finance/chart/"));
        assert!(url.path().ends_with("NDX"));
        let pairs = url.query_pairs().collect::<Vec<_>>();
        assert_eq!(pairs[0].0, "period1");
        assert_eq!(pairs[0].1, "1704153600");
        assert!(pairs.iter().any(|(key, value)| key == "interval" && value == "1d"));
    }

    #[tokio::test]
    async fn test_yahoo_chart_future_start_is_empty() {
        let chart = YahooChart::new(SYMBOL_NASDAQ_100, NaiveDate::MIN).unwrap();
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();

        let actual = chart.fetch_since(tomorrow).await.unwrap();

        assert!(actual.is_empty());
    }
}
