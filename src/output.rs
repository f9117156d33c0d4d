// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output and color utilities for consistent terminal formatting
//!
//! Provides shared color functions respecting NO_COLOR environment variable.

use colored::Colorize;

use crate::assemble::RankedOutput;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize document name (cyan)
pub fn colorize_path(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize page number (yellow)
pub fn colorize_page(num: u32, use_color: bool) -> String {
    if use_color {
        num.to_string().yellow().to_string()
    } else {
        num.to_string()
    }
}

/// Colorize rank (green bold)
pub fn colorize_rank(rank: usize, use_color: bool) -> String {
    let text = format!("{:>3}.", rank);
    if use_color {
        text.green().bold().to_string()
    } else {
        text
    }
}

/// Colorize section title (bold)
pub fn colorize_title(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize secondary text (dimmed)
pub fn colorize_dim(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Renders the top `limit` sections as a human-readable listing.
pub fn render_sections(output: &RankedOutput, limit: usize, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(colorize_dim(
        &format!(
            "{} | {}",
            output.metadata.persona, output.metadata.job_to_be_done
        ),
        use_color,
    ));

    for section in output.extracted_sections.iter().take(limit) {
        lines.push(format!(
            "{} {} {}:{}",
            colorize_rank(section.importance_rank, use_color),
            colorize_title(&section.section_title, use_color),
            colorize_path(&section.document, use_color),
            colorize_page(section.page_number, use_color),
        ));
    }

    let total = output.extracted_sections.len();
    if total > limit {
        lines.push(colorize_dim(
            &format!("... {} more sections", total - limit),
            use_color,
        ));
    } else if total == 0 {
        lines.push(colorize_dim("No sections extracted", use_color));
    }

    lines.join("\n")
}
