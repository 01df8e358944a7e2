//! 仪表盘 HTTP 服务。
//!
//! 每个请求都重新读取持久化存储（按请求渲染），从不获取更新锁：
//! 读者可能看到稍旧的数据，但原子写入保证永远不会看到半写的文件。

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use peakwatch::{
    statistic::summary::{DrawdownSummary, chart::ChartSeries},
    store::{DrawdownStore, StoreError},
    update::DrawdownState,
};
use std::sync::Arc;
use tracing::{error, warn};

const MESSAGE_NOT_FOUND: &str = "Data file not found. Run `peakwatch init` first.";

/// 仪表盘请求产生的错误。
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("timeline not initialised")]
    NotFound,

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, MESSAGE_NOT_FOUND).into_response(),
            error => {
                error!(?error, "dashboard failed to load persisted state");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

#[derive(Debug)]
pub struct DashboardState<Store> {
    store: Arc<Store>,
}

impl<Store> Clone for DashboardState<Store> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<Store> DashboardState<Store>
where
    Store: DrawdownStore + Send + Sync + 'static,
{
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    async fn load(&self) -> Result<DrawdownState, DashboardError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.load())
            .await??
            .ok_or(DashboardError::NotFound)
    }

    async fn view(&self) -> Result<(DrawdownSummary, ChartSeries), DashboardError> {
        let mut state = self.load().await?;
        if state.reconcile_minimums() {
            warn!("persisted section minimums disagree with the timeline, serving rebuilt table");
        }
        let summary = DrawdownSummary::generate(&state.timeline, &state.minimums);
        let chart = ChartSeries::generate(&state.timeline, &summary);
        Ok((summary, chart))
    }
}

/// 构造仪表盘路由：`/`、`/api/summary`、`/api/series`。
pub fn router<Store>(store: Store) -> Router
where
    Store: DrawdownStore + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index::<Store>))
        .route("/api/summary", get(summary::<Store>))
        .route("/api/series", get(series::<Store>))
        .with_state(DashboardState::new(store))
}

pub async fn index<Store>(
    State(state): State<DashboardState<Store>>,
) -> Result<Html<String>, DashboardError>
where
    Store: DrawdownStore + Send + Sync + 'static,
{
    let (summary, chart) = state.view().await?;
    Ok(Html(render_page(&summary, &chart)))
}

pub async fn summary<Store>(
    State(state): State<DashboardState<Store>>,
) -> Result<Json<DrawdownSummary>, DashboardError>
where
    Store: DrawdownStore + Send + Sync + 'static,
{
    state.view().await.map(|(summary, _)| Json(summary))
}

pub async fn series<Store>(
    State(state): State<DashboardState<Store>>,
) -> Result<Json<ChartSeries>, DashboardError>
where
    Store: DrawdownStore + Send + Sync + 'static,
{
    state.view().await.map(|(_, chart)| Json(chart))
}

fn render_page(summary: &DrawdownSummary, chart: &ChartSeries) -> String {
    let chart_json = serde_json::to_string(chart).unwrap_or_else(|error| {
        warn!(?error, "failed to encode chart series");
        "null".to_string()
    });

    let rows = [
        ("Last Date", summary.last_date.map_or_else(|| "N/A".to_string(), |date| date.to_string())),
        ("Last Close", summary.last_close.to_string()),
        ("Daily Change", summary.daily_change_pct.percent()),
        ("Current Drawdown", summary.current_drawdown_pct.percent()),
        ("Current Section Min Drawdown", summary.last_section_min_drawdown.percent()),
        ("Current Section Percentile", summary.last_section_percentile.percent()),
        ("10th Percentile", summary.percentile_10.percent()),
        ("1st Percentile", summary.percentile_1.percent()),
    ]
    .iter()
    .map(|(label, value)| format!("<tr><th>{label}</th><td>{value}</td></tr>"))
    .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Nasdaq-100 Drawdown Dashboard</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
table {{ border-collapse: collapse; margin-bottom: 2rem; }}
th, td {{ border: 1px solid #ccc; padding: 0.4rem 0.8rem; text-align: left; }}
.chart {{ max-width: 1000px; margin-bottom: 2rem; }}
</style>
</head>
<body>
<h1>Nasdaq-100 Drawdown Dashboard</h1>
<table>{rows}</table>
<div class="chart"><canvas id="close"></canvas></div>
<div class="chart"><canvas id="drawdown"></canvas></div>
<script>
const series = {chart_json};
if (series && typeof Chart !== "undefined") {{
  const reference = (value, label, color, dash) => value === null ? [] : [{{
    label: `${{label}} (${{value.toFixed(2)}}%)`,
    data: series.dates.map(() => value),
    borderColor: color,
    borderDash: dash,
    pointRadius: 0,
  }}];
  new Chart(document.getElementById("close"), {{
    type: "line",
    data: {{ labels: series.dates, datasets: [{{ label: "Nasdaq-100 Close", data: series.close, pointRadius: 0 }}] }},
    options: {{ plugins: {{ title: {{ display: true, text: "Nasdaq-100 Index Over Time" }} }} }},
  }});
  new Chart(document.getElementById("drawdown"), {{
    type: "line",
    data: {{
      labels: series.dates,
      datasets: [
        {{ label: "Drawdown %", data: series.drawdown, borderColor: "red", pointRadius: 0 }},
        ...reference(series.percentile_10, "10th Percentile", "green", [6, 4]),
        ...reference(series.percentile_1, "1st Percentile", "orange", [2, 2]),
      ],
    }},
    options: {{ plugins: {{ title: {{ display: true, text: "Drawdown Over Time" }} }} }},
  }});
}}
</script>
</body>
</html>"#
    )
}
