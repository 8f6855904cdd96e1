use crate::storage::{SessionRecord, StoreStats};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Session")]
    id: String,
    #[tabled(rename = "Bytes")]
    size: usize,
    #[tabled(rename = "Last write")]
    time: i64,
}

/// Namespace statistics as a two-column table
pub fn stats_table(stats: &StoreStats) -> String {
    let fmt_time = |t: Option<i64>| t.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
    let rows = vec![
        MetricRow { metric: "Namespace".to_string(), value: stats.namespace.clone() },
        MetricRow { metric: "Sessions".to_string(), value: stats.sessions.to_string() },
        MetricRow { metric: "Payload bytes".to_string(), value: stats.payload_bytes.to_string() },
        MetricRow { metric: "Oldest write".to_string(), value: fmt_time(stats.oldest) },
        MetricRow { metric: "Newest write".to_string(), value: fmt_time(stats.newest) },
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Session listing; empty string when there is nothing to show
pub fn sessions_table(records: &[SessionRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let rows = records.iter().map(|r| SessionRow {
        id: r.id.clone(),
        size: r.size,
        time: r.time,
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_table() {
        assert!(sessions_table(&[]).is_empty());

        let table = sessions_table(&[SessionRecord { id: "abc123".to_string(), size: 10, time: 42 }]);
        assert!(table.contains("abc123"));
        assert!(table.contains("Last write"));
    }

    #[test]
    fn test_stats_table() {
        let stats = StoreStats {
            namespace: "phpsessid".to_string(),
            sessions: 2,
            oldest: None,
            newest: Some(7),
            payload_bytes: 128,
        };
        let table = stats_table(&stats);
        assert!(table.contains("phpsessid"));
        assert!(table.contains("128"));
    }
}
