use crate::statistic::summary::DrawdownSummary;
use prettytable::{Table, row};

impl DrawdownSummary {
    /// 以 [`Table`] 形式展示摘要。
    pub fn table(&self) -> Table {
        let mut table = Table::new();

        table.set_titles(row!["Metric", "Value"]);

        table.add_row(row![
            "Last Date",
            self.last_date
                .map_or_else(|| "N/A".to_string(), |date| date.to_string())
        ]);
        table.add_row(row!["Last Close", self.last_close]);
        table.add_row(row!["Daily Change", self.daily_change_pct.percent()]);
        table.add_row(row!["Current Drawdown", self.current_drawdown_pct.percent()]);
        table.add_row(row![
            "Current Section",
            self.last_section
                .map_or_else(|| "N/A".to_string(), |section| section.to_string())
        ]);
        table.add_row(row![
            "Section Min Drawdown",
            self.last_section_min_drawdown.percent()
        ]);
        table.add_row(row![
            "Section Percentile",
            self.last_section_percentile.percent()
        ]);
        table.add_row(row!["10th Percentile", self.percentile_10.percent()]);
        table.add_row(row!["1st Percentile", self.percentile_1.percent()]);

        table
    }

    /// 将摘要表格打印到标准输出。
    pub fn print(&self) {
        self.table().printstd();
    }
}
