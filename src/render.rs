//! Plain-text rendering of analysis state for the terminal.

use std::fmt::Write;

use crate::models::{AnalysisPlan, AnalysisTag};
use crate::state::AppState;

const SHADE_HUE: u32 = 3;
const SHADE_SATURATION: u32 = 80;
const SHADE_MIN_LIGHTNESS: f32 = 80.0;
const SHADE_MAX_LIGHTNESS: f32 = 40.0;

/// Lightness (percent) of a tag chip: paler for low confidence
pub fn confidence_lightness(confidence: f32) -> f32 {
    SHADE_MIN_LIGHTNESS - confidence * (SHADE_MIN_LIGHTNESS - SHADE_MAX_LIGHTNESS)
}

/// CSS-style colour for a tag chip
pub fn confidence_color(confidence: f32) -> String {
    format!(
        "hsl({}, {}%, {}%)",
        SHADE_HUE,
        SHADE_SATURATION,
        confidence_lightness(confidence).round()
    )
}

fn render_tag(tag: &AnalysisTag) -> String {
    format!("{} ({:.2})", tag.name, tag.confidence)
}

pub fn render_progress_bar(progress: u8, width: usize) -> String {
    let filled = (progress.min(100) as usize * width) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        progress.min(100)
    )
}

/// Plan selector line, active plan in brackets
pub fn render_plan_tabs(plan_count: usize, active: usize) -> String {
    (0..plan_count)
        .map(|i| {
            if i == active {
                format!("[Plan {}]", i + 1)
            } else {
                format!(" Plan {} ", i + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Table of one plan; tags below `threshold` are hidden
pub fn render_plan(plan: &AnalysisPlan, plan_index: usize, threshold: f32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Analysis plan {}", plan_index + 1);

    if plan.is_empty() {
        let _ = writeln!(out, "  (no rows)");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>3} | {:<20} | {:<8} | {:<8} | {:<40} | Tags",
        "#", "Chapter", "Start", "End", "Content"
    );
    let _ = writeln!(out, "{}", "-".repeat(100));

    for row in &plan.rows {
        let tags = row
            .visible_tags(threshold)
            .map(render_tag)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{:>3} | {:<20} | {:<8} | {:<8} | {:<40} | {}",
            row.sequence_number,
            truncate(&row.chapter_label, 20),
            row.start_time,
            row.end_time,
            truncate(&row.content, 40),
            tags
        );
    }

    let _ = writeln!(out, "(showing tags with confidence >= {:.2})", threshold);
    out
}

/// One-line status of the analysis view
pub fn render_status(state: &AppState) -> String {
    if state.is_analyzing {
        return format!("Analysing... {}", render_progress_bar(state.progress, 30));
    }
    if let Some(error) = &state.last_error {
        return format!("Failed: {}", error);
    }
    if !state.results.is_empty() {
        return format!("{} plan(s) ready", state.results.plan_count());
    }
    if state.is_waiting_for_results() {
        return "Waiting for analysis results...".to_string();
    }
    "Idle".to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
