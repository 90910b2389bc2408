//! Progress lines for long-running loads.
//!
//! Progress is written to **stderr** so stdout stays parseable. Human
//! progress is on by default only when stderr is a terminal.

use std::io::{IsTerminal, Write};

/// Human-friendly progress on stderr:
/// "load-docs typesense_docs  upserting  1,234 / 5,000 documents".
pub struct StderrProgress {
    label: String,
    enabled: bool,
}

impl StderrProgress {
    pub fn new(label: impl Into<String>, enabled: bool) -> Self {
        Self {
            label: label.into(),
            enabled,
        }
    }

    /// Enabled when stderr is a terminal.
    pub fn for_tty(label: impl Into<String>) -> Self {
        Self::new(label, std::io::stderr().is_terminal())
    }

    pub fn report(&self, n: usize, total: usize) {
        if !self.enabled {
            return;
        }
        let line = progress_line(&self.label, n, total);
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

fn progress_line(label: &str, n: usize, total: usize) -> String {
    format!(
        "load-docs {}  upserting  {} / {} documents\n",
        label,
        format_number(n as u64),
        format_number(total as u64)
    )
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
