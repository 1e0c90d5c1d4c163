//! Text and JSON rendering of mined rules.

use crate::config::{MiningConfig, MiningParams, RuleOrder};
use crate::mining::{Item, MiningOutcome, OrderedStatistic, RelationRecord};
use crate::types::LabelKind;
use chrono::Local;
use serde::Serialize;

/// Printed instead of a rule list when nothing survives the filters.
pub const NO_RULES_MESSAGE: &str =
    "No rules found - try adjusting the support and confidence values!";

const SEPARATOR_WIDTH: usize = 50;

/// Render rules in the plain text layout:
///
/// ```text
/// Rule: ['22423', 'Monday'] | Support: 0.0312
///    -> 22423, Monday | Confidence: 0.0312 | Lift: 1.0000
///   22423 -> Monday | Confidence: 0.2110 | Lift: 1.0344
/// --------------------------------------------------
/// ```
pub fn render_rules(rules: &[RelationRecord]) -> String {
    if rules.is_empty() {
        return format!("{}\n", NO_RULES_MESSAGE);
    }

    let mut lines = Vec::new();
    for rule in rules {
        let items: Vec<String> = rule.items.iter().map(|item| format!("'{}'", item)).collect();
        lines.push(format!(
            "Rule: [{}] | Support: {:.4}",
            items.join(", "),
            rule.support
        ));
        lines.extend(rule.ordered_statistics.iter().map(render_statistic));
        lines.push("-".repeat(SEPARATOR_WIDTH));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn render_statistic(statistic: &OrderedStatistic) -> String {
    let join = |items: &[Item]| {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "  {} -> {} | Confidence: {:.4} | Lift: {:.4}",
        join(&statistic.items_base),
        join(&statistic.items_add),
        statistic.confidence,
        statistic.lift
    )
}

/// JSON form of a mining run.
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport<'a> {
    pub generated_at: String,
    pub input_file: String,
    pub params: MiningParams,
    pub label: LabelKind,
    pub order: RuleOrder,
    pub transactions: usize,
    pub rules_mined: usize,
    pub rules_retained: usize,
    pub duration_ms: u64,
    pub rules: &'a [RelationRecord],
    /// Set when no rule survived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<'a> RuleReport<'a> {
    pub fn new(input_file: &str, config: &MiningConfig, outcome: &'a MiningOutcome) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.to_string(),
            params: config.params,
            label: config.label,
            order: config.order,
            transactions: outcome.transactions,
            rules_mined: outcome.rules_mined,
            rules_retained: outcome.rules_retained,
            duration_ms: outcome.duration_ms,
            rules: &outcome.rules,
            message: outcome.rules.is_empty().then_some(NO_RULES_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DayOfWeek, TemporalLabel};
    use pretty_assertions::assert_eq;

    fn sample_rule() -> RelationRecord {
        let a = Item::Product("22423".to_string());
        let monday = Item::Temporal(TemporalLabel::Day(DayOfWeek::Monday));
        RelationRecord {
            items: vec![a.clone(), monday.clone()],
            support: 0.03126,
            ordered_statistics: vec![OrderedStatistic {
                items_base: vec![a],
                items_add: vec![monday],
                confidence: 0.211,
                lift: 1.03444,
            }],
        }
    }

    #[test]
    fn test_render_rules_layout() {
        let text = render_rules(&[sample_rule()]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Rule: ['22423', 'Monday'] | Support: 0.0313",
                "  22423 -> Monday | Confidence: 0.2110 | Lift: 1.0344",
                "--------------------------------------------------",
            ]
        );
    }

    #[test]
    fn test_render_multiple_rules() {
        let mut second = sample_rule();
        second.items.reverse();
        second.ordered_statistics.push(OrderedStatistic {
            items_base: vec![],
            items_add: second.items.clone(),
            confidence: 0.5,
            lift: 1.0,
        });

        let text = render_rules(&[sample_rule(), second]);

        assert!(text.ends_with("-\n"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[3], "Rule: ['Monday', '22423'] | Support: 0.0313");
        assert_eq!(lines[5], "   -> Monday, 22423 | Confidence: 0.5000 | Lift: 1.0000");
        assert_eq!(lines[2], lines[6]);
    }

    #[test]
    fn test_render_no_rules() {
        assert_eq!(render_rules(&[]).trim_end(), NO_RULES_MESSAGE);
    }

    #[test]
    fn test_rule_report_json() {
        let outcome = MiningOutcome {
            transactions: 3,
            rules_mined: 2,
            rules_retained: 1,
            rules: vec![sample_rule()],
            duration_ms: 4,
        };
        let config = MiningConfig::default();
        let report = RuleReport::new("cleaned.csv", &config, &outcome);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["transactions"], 3);
        assert_eq!(json["rules"][0]["items"][1], "Monday");
        assert_eq!(json["label"], "DayOfWeek");
        assert!(json.get("message").is_none());
    }
}
