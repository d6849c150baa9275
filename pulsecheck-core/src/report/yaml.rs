//! Structured (YAML) rendering of a health report

use crate::error::Result;
use crate::types::HealthReport;

/// Serialize the whole report, fields in declaration order.
pub fn render_yaml(report: &HealthReport) -> Result<String> {
    Ok(serde_yaml::to_string(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metrics::tests::{message, ts};
    use crate::report::{assemble_report, ReportOptions};
    use serde_yaml::Value;

    #[test]
    fn test_yaml_mirrors_report() {
        let messages: Vec<_> = (1..=20)
            .map(|d| {
                message(
                    "bob",
                    "help",
                    ts(&format!("2026-05-{:02}", d), "14:30"),
                    "compiler error",
                )
            })
            .collect();
        let report = assemble_report(
            messages,
            Vec::new(),
            &ReportOptions::new("99", "Yaml Guild").with_days(19),
            ts("2026-05-20", "20:00"),
        );

        let text = render_yaml(&report).unwrap();
        let doc: Value = serde_yaml::from_str(&text).unwrap();

        assert_eq!(doc["server_name"].as_str(), Some("Yaml Guild"));
        assert_eq!(doc["message_count"].as_u64(), Some(20));
        assert_eq!(doc["analysis_period"]["days"].as_u64(), Some(19));
        assert_eq!(doc["activity"]["total_messages"].as_u64(), Some(20));
        assert_eq!(doc["benchmarks"]["source"].as_str(), Some("default"));
        assert!(doc["health_scores"]["overall"].as_u64().is_some());
        assert!(doc["partial_report"].as_bool() == Some(false));
        assert!(doc["partial_reason"].is_null());

        // Top-level keys keep declaration order
        let id_pos = text.find("report_id:").unwrap();
        let scores_pos = text.find("health_scores:").unwrap();
        let recs_pos = text.find("recommendations:").unwrap();
        assert!(id_pos < scores_pos && scores_pos < recs_pos);
    }

    #[test]
    fn test_empty_report_serializes() {
        let report = assemble_report(
            Vec::new(),
            Vec::new(),
            &ReportOptions::new("1", "Quiet"),
            ts("2026-05-20", "20:00"),
        );
        let doc: Value = serde_yaml::from_str(&render_yaml(&report).unwrap()).unwrap();
        assert_eq!(doc["partial_report"].as_bool(), Some(true));
        assert!(doc["trends"].is_null());
        assert_eq!(doc["topics"].as_sequence().map(Vec::len), Some(0));
    }
}
