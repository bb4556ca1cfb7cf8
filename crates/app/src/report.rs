use candlecast_core::forecast::entity::{ErrorSummary, Reconciliation};
use candlecast_engine::live::SessionReport;

/// 时间列的展示格式
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// 单条对账记录的展示行
pub fn record_line(record: &Reconciliation) -> String {
    format!(
        "{}  last {:>12.4}  predicted {:>12.4}  actual {:>12.4}  error {:>+10.4} ({:>+8.4}%)",
        record.target_time.format(TIME_FORMAT),
        record.last_close,
        record.predicted,
        record.actual,
        record.abs_error,
        record.pct_error
    )
}

pub fn summary_line(label: &str, summary: &ErrorSummary) -> String {
    format!(
        "{}: {} points, MAE {:.4}, RMSE {:.4}, MAPE {:.4}%",
        label, summary.count, summary.mae, summary.rmse, summary.mape
    )
}

pub fn print_records(records: &[Reconciliation]) {
    for record in records {
        println!("{}", record_line(record));
    }
}

pub fn print_summary(label: &str, summary: &ErrorSummary) {
    println!("{}", summary_line(label, summary));
}

pub fn print_session(report: &SessionReport) {
    println!(
        "Session {} ({} -> {}): {} reconciliations, {} failed fetches",
        report.session_id,
        report.started_at.format(TIME_FORMAT),
        report.finished_at.format(TIME_FORMAT),
        report.records.len(),
        report.failed_fetches
    );
    print_summary("Live", &report.summary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_record_line() {
        let t = Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 0).unwrap();
        let line = record_line(&Reconciliation::new(t, 10.0, 11.0, 10.0));
        assert!(line.starts_with("2025-05-06 07:08"));
        assert!(line.contains("+1.0000"));
        assert!(line.contains("+10.0000%"));
    }

    #[test]
    fn test_summary_line() {
        let summary = ErrorSummary::from_pairs([(2.0, 1.0), (1.0, 1.0)]);
        assert_eq!(
            summary_line("Test", &summary),
            "Test: 2 points, MAE 0.5000, RMSE 0.7071, MAPE 50.0000%"
        );
    }
}
