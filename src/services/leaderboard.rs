use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ScoreRow {
    pub(crate) student_code: String,
    pub(crate) name: String,
    pub(crate) assignment: String,
    pub(crate) level: String,
    pub(crate) score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct LeaderboardEntry {
    pub(crate) student_code: String,
    pub(crate) name: String,
    pub(crate) total_score: f64,
    pub(crate) completed: usize,
}

/// One row per (student, assignment): the highest score wins, ties keep the
/// earlier row. Output keeps first-appearance order.
pub(crate) fn select_best_attempts(rows: Vec<ScoreRow>) -> Vec<ScoreRow> {
    let mut best: Vec<ScoreRow> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        let key = (row.student_code.trim().to_lowercase(), row.assignment.trim().to_string());
        match index.get(&key) {
            Some(&slot) => {
                let current = best[slot].score.unwrap_or(f64::NEG_INFINITY);
                if row.score.unwrap_or(f64::NEG_INFINITY) > current {
                    best[slot] = row;
                }
            }
            None => {
                index.insert(key, best.len());
                best.push(row);
            }
        }
    }

    best
}

pub(crate) fn build_leaderboard(rows: Vec<ScoreRow>, level: &str) -> Vec<LeaderboardEntry> {
    let level = level.trim();
    let mut totals: Vec<LeaderboardEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in select_best_attempts(rows) {
        if !row.level.trim().eq_ignore_ascii_case(level) {
            continue;
        }
        let key = row.student_code.trim().to_lowercase();
        let slot = *index.entry(key).or_insert_with(|| {
            totals.push(LeaderboardEntry {
                student_code: row.student_code.trim().to_string(),
                name: row.name.clone(),
                total_score: 0.0,
                completed: 0,
            });
            totals.len() - 1
        });
        let entry = &mut totals[slot];
        entry.total_score += row.score.unwrap_or(0.0);
        entry.completed += 1;
    }

    totals.sort_by(|a, b| {
        b.total_score.total_cmp(&a.total_score).then_with(|| a.name.cmp(&b.name))
    });
    totals
}
