// src/utils/log.rs

//! Structured log blocks on top of the `log` facade.
//!
//! Record-level logging uses the `log` macros directly; these helpers only
//! format multi-line blocks such as run summaries.

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    ::log::info!("{}", format_summary(title, items));
}

fn format_summary(title: &str, items: &[(&str, String)]) -> String {
    let mut out = format!("[SUMMARY] {}", title);
    for (key, value) in items {
        out.push_str(&format!("\n    {}: {}", key, value));
    }
    out
}
