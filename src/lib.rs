pub mod cli;
pub mod config;
pub mod cop;
pub mod correction;
pub mod diagnostic;
pub mod formatter;
pub mod fs;
pub mod linter;
pub mod parse;
pub mod regexp;

#[cfg(test)]
pub mod testutil;

use std::io::{Read, Write};

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::Args;
use config::load_config;
use cop::registry::CopRegistry;
use diagnostic::Diagnostic;
use formatter::create_formatter;
use fs::discover_files;
use linter::{lint_source, run_linter};
use parse::source::SourceFile;

/// Separates the offense report from the corrected source in `--stdin -a`.
const STDIN_SEPARATOR: &str = "====================";

/// Install the stderr log subscriber. `RUST_LOG` wins; otherwise `warn`,
/// or `debug` with `--debug`.
pub fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the linter. Returns the exit code: 0 = clean, 1 = offenses remain.
pub fn run(args: Args) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    match config.config_dir() {
        Some(dir) => debug!("config loaded from {}", dir.display()),
        None => debug!("no config file found"),
    }
    debug!(excludes = ?config.global_excludes(), "global excludes");

    let registry = CopRegistry::default_registry();

    if args.list_cops {
        let mut names = registry.names();
        names.sort_unstable();
        for name in names {
            println!("{name}");
        }
        return Ok(0);
    }

    for name in args.only.iter().chain(&args.except) {
        if !registry.contains(name) {
            anyhow::bail!("unknown cop: {name}");
        }
    }

    let formatter = create_formatter(&args.format);

    // --stdin: read from stdin and lint a single file
    if let Some(ref display_path) = args.stdin {
        let mut input = Vec::new();
        std::io::stdin()
            .read_to_end(&mut input)
            .context("failed to read stdin")?;
        let source = SourceFile::from_vec(display_path.clone(), input);
        let (result, corrected) = lint_source(&source, &config, &registry, &args);
        formatter.print(&result.diagnostics, std::slice::from_ref(display_path));
        if args.autocorrect {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{STDIN_SEPARATOR}")?;
            out.write_all(corrected.as_deref().unwrap_or(source.as_bytes()))?;
        }
        return Ok(exit_code(&result.diagnostics));
    }

    let files = discover_files(&args.paths, &config)?;
    debug!(files = files.len(), cops = registry.len(), "starting lint");

    let result = run_linter(&files, &config, &registry, &args);
    formatter.print(&result.diagnostics, &files);
    Ok(exit_code(&result.diagnostics))
}

fn exit_code(diagnostics: &[Diagnostic]) -> i32 {
    if diagnostics.iter().all(|d| d.corrected) {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Location, Severity};

    fn diag(corrected: bool) -> Diagnostic {
        Diagnostic {
            path: "a.rb".to_string(),
            location: Location { line: 1, column: 0 },
            severity: Severity::Convention,
            cop_name: "Style/RedundantRegexpCharacterClass".to_string(),
            message: "m".to_string(),
            corrected,
        }
    }

    #[test]
    fn exit_code_ignores_corrected_offenses() {
        assert_eq!(exit_code(&[]), 0);
        assert_eq!(exit_code(&[diag(true)]), 0);
        assert_eq!(exit_code(&[diag(true), diag(false)]), 1);
    }
}
