use crate::domain::model::{Lead, Stage};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct StageCount {
    pub stage: Stage,
    pub count: usize,
    pub percentage: f64,
}

/// Lead totals per pipeline stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageStatistics {
    pub total: usize,
    pub by_stage: Vec<StageCount>,
}

impl StageStatistics {
    /// 只列出至少有一筆 lead 的階段，依 pipeline 順序排列
    pub fn from_leads(leads: &[Lead]) -> Self {
        let mut counts: BTreeMap<Stage, usize> = BTreeMap::new();
        for lead in leads {
            *counts.entry(lead.stage()).or_insert(0) += 1;
        }

        let total = leads.len();
        let by_stage = counts
            .into_iter()
            .map(|(stage, count)| StageCount {
                stage,
                count,
                percentage: count as f64 / total as f64 * 100.0,
            })
            .collect();

        Self { total, by_stage }
    }

    pub fn count_for(&self, stage: Stage) -> usize {
        self.by_stage
            .iter()
            .find(|entry| entry.stage == stage)
            .map_or(0, |entry| entry.count)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Total leads: {}", self.total)];
        if self.total > 0 {
            lines.push("Leads by stage:".to_string());
            for entry in &self.by_stage {
                lines.push(format!(
                    "  - {}: {} ({:.1}%)",
                    capitalize(entry.stage.as_str()),
                    entry.count,
                    entry.percentage
                ));
            }
        }
        lines
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
