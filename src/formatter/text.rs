use std::io::Write;
use std::path::PathBuf;

use crate::diagnostic::Diagnostic;
use crate::formatter::Formatter;

pub struct TextFormatter;

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

impl Formatter for TextFormatter {
    fn format_to(&self, diagnostics: &[Diagnostic], files: &[PathBuf], out: &mut dyn Write) {
        for d in diagnostics {
            let _ = writeln!(out, "{d}");
        }
        let corrected = diagnostics.iter().filter(|d| d.corrected).count();
        let mut summary = format!(
            "\n{} inspected, {} detected",
            plural(files.len(), "file"),
            plural(diagnostics.len(), "offense"),
        );
        if corrected > 0 {
            summary.push_str(&format!(", {corrected} corrected"));
        }
        let _ = writeln!(out, "{summary}");
    }
}
