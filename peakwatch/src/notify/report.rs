use crate::statistic::summary::DrawdownSummary;

/// 将 [`DrawdownSummary`] 渲染为纯文本报告正文。
///
/// 不可用的字段渲染为 `N/A`。
pub fn render(summary: &DrawdownSummary) -> String {
    format!(
        "Nasdaq-100 drawdown analysis{date}

Daily
  - Daily change: {daily_change}
  - Current drawdown: {current_drawdown}

Current section
  - Minimum drawdown: {section_min}
  - Percentile vs history: {section_percentile}

Historical reference
  - 10th percentile: {percentile_10}
  - 1st percentile: {percentile_1}

Note: exit when the current section drawdown falls below the 10th percentile.
Re-enter when the current section drawdown falls below the 1st percentile, or when
it is below the 10th percentile while today's drawdown is back above the 10th percentile.

This report was generated automatically.",
        date = summary
            .last_date
            .map(|date| format!(" for {date}"))
            .unwrap_or_default(),
        daily_change = summary.daily_change_pct.percent(),
        current_drawdown = summary.current_drawdown_pct.percent(),
        section_min = summary.last_section_min_drawdown.percent(),
        section_percentile = summary.last_section_percentile.percent(),
        percentile_10 = summary.percentile_10.percent(),
        percentile_1 = summary.percentile_1.percent(),
    )
}
