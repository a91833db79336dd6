use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use ruby_prism::Visit;
use tracing::{debug, error, warn};

use crate::cli::Args;
use crate::config::ResolvedConfig;
use crate::cop::registry::CopRegistry;
use crate::cop::walker::{ActiveCop, BatchedCopWalker};
use crate::cop::{Cop, CopConfig};
use crate::correction::{Correction, CorrectionSet};
use crate::diagnostic::Diagnostic;
use crate::parse::source::SourceFile;

/// Upper bound on correct-then-relint rounds for one file.
const MAX_ITERATIONS: usize = 200;

pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
    pub file_count: usize,
    pub corrected_count: usize,
}

/// Registry cops that survive `--only`/`--except`, with their base configs.
struct CopPlan<'a> {
    cops: Vec<(usize, &'a dyn Cop, CopConfig)>,
    autocorrect: bool,
}

impl<'a> CopPlan<'a> {
    fn new(config: &ResolvedConfig, registry: &'a CopRegistry, args: &Args) -> Self {
        let cops = registry
            .cops()
            .iter()
            .enumerate()
            .filter(|(_, cop)| args.selects(cop.name()))
            .map(|(i, cop)| (i, &**cop, config.cop_config(cop.name())))
            .collect();
        Self {
            cops,
            autocorrect: args.autocorrect,
        }
    }

    /// Cops enabled for `path`.
    fn active_for<'p>(&'p self, config: &ResolvedConfig, path: &Path) -> Vec<ActiveCop<'p>> {
        self.cops
            .iter()
            .filter(|(_, cop, _)| config.is_cop_enabled(*cop, path))
            .map(|(index, cop, cop_config)| ActiveCop {
                cop: *cop,
                config: cop_config,
                index: *index,
                autocorrect: self.autocorrect && cop.supports_autocorrect(),
            })
            .collect()
    }
}

/// Lint a single SourceFile (already loaded into memory). Used for --stdin
/// mode. With autocorrect, the corrected source is returned alongside.
pub fn lint_source(
    source: &SourceFile,
    config: &ResolvedConfig,
    registry: &CopRegistry,
    args: &Args,
) -> (LintResult, Option<Vec<u8>>) {
    let plan = CopPlan::new(config, registry, args);
    let (mut diagnostics, corrected_bytes, corrected_count) =
        lint_source_inner(source, config, &plan);
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let result = LintResult {
        diagnostics,
        file_count: 1,
        corrected_count,
    };
    (result, corrected_bytes)
}

pub fn run_linter(
    files: &[std::path::PathBuf],
    config: &ResolvedConfig,
    registry: &CopRegistry,
    args: &Args,
) -> LintResult {
    let plan = CopPlan::new(config, registry, args);
    let found_offense = AtomicBool::new(false);
    let total_corrected = AtomicUsize::new(0);

    let diagnostics: Vec<Diagnostic> = files
        .par_iter()
        .flat_map(|path| {
            // --fail-fast: skip remaining files once an offense is found
            if args.fail_fast && found_offense.load(Ordering::Relaxed) {
                return Vec::new();
            }
            let result = lint_file(path, config, &plan, &total_corrected);
            if args.fail_fast && !result.is_empty() {
                found_offense.store(true, Ordering::Relaxed);
            }
            result
        })
        .collect();

    let mut sorted = diagnostics;
    sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let stats = crate::regexp::cache::global().stats();
    debug!(
        files = files.len(),
        offenses = sorted.len(),
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        cache_entries = stats.entries,
        "lint finished"
    );

    LintResult {
        diagnostics: sorted,
        file_count: files.len(),
        corrected_count: total_corrected.load(Ordering::Relaxed),
    }
}

fn lint_file(
    path: &Path,
    config: &ResolvedConfig,
    plan: &CopPlan<'_>,
    total_corrected: &AtomicUsize,
) -> Vec<Diagnostic> {
    let source = match SourceFile::from_path(path) {
        Ok(s) => s,
        Err(e) => {
            error!("{e:#}");
            return Vec::new();
        }
    };

    let (result, corrected_bytes, corrected_count) = lint_source_inner(&source, config, plan);
    if corrected_count > 0 {
        total_corrected.fetch_add(corrected_count, Ordering::Relaxed);
    }

    if let Some(bytes) = corrected_bytes {
        if let Err(e) = std::fs::write(path, &bytes) {
            error!("failed to write corrected file {}: {e}", path.display());
        }
    }

    result
}

/// Validate that corrected bytes are still valid Ruby by re-parsing with Prism.
/// Returns `None` (discarding corrections) if parse errors are found.
fn validate_corrected_bytes(original_bytes: &[u8], current_bytes: Vec<u8>, path: &Path) -> Option<Vec<u8>> {
    if current_bytes == original_bytes {
        return None;
    }
    // Scope the parse_result so its borrow of current_bytes ends before we return.
    let has_errors = {
        let parse_result = crate::parse::parse_source(&current_bytes);
        parse_result.errors().count() > 0
    };
    if has_errors {
        warn!(
            path = %path.display(),
            "autocorrect produced invalid syntax, skipping corrections"
        );
        return None;
    }
    Some(current_bytes)
}

/// Returns (diagnostics, corrected_bytes, corrected_count).
fn lint_source_inner(
    source: &SourceFile,
    config: &ResolvedConfig,
    plan: &CopPlan<'_>,
) -> (Vec<Diagnostic>, Option<Vec<u8>>, usize) {
    let active = plan.active_for(config, &source.path);
    if !plan.autocorrect {
        let (diags, _) = lint_source_once(source, &active);
        return (diags, None, 0);
    }

    let original_bytes = source.as_bytes();
    let mut current_bytes = original_bytes.to_vec();
    let path = source.path.clone();
    let mut corrected_diags: Vec<Diagnostic> = Vec::new();

    for iteration in 0..MAX_ITERATIONS {
        let iter_source = SourceFile::from_vec(path.clone(), current_bytes.clone());
        let (diags, corrections) = lint_source_once(&iter_source, &active);

        if corrections.is_empty() {
            // Converged. Offenses fixed in earlier rounds plus what remains now.
            let mut all_diags = corrected_diags;
            all_diags.extend(diags);
            let total_corrected = all_diags.iter().filter(|d| d.corrected).count();
            let corrected_bytes = validate_corrected_bytes(original_bytes, current_bytes, &path);
            return (all_diags, corrected_bytes, total_corrected);
        }

        corrected_diags.extend(diags.into_iter().filter(|d| d.corrected));

        let new_bytes = CorrectionSet::from_vec(corrections).apply(&current_bytes);
        if new_bytes == current_bytes {
            let total_corrected = corrected_diags.len();
            return (corrected_diags, None, total_corrected);
        }
        debug!(path = %path.display(), iteration, "applied corrections");
        current_bytes = new_bytes;
    }

    // Out of rounds: one last pass without corrections for the remaining offenses.
    warn!(path = %path.display(), "autocorrect did not converge after {MAX_ITERATIONS} rounds");
    let final_source = SourceFile::from_vec(path.clone(), current_bytes.clone());
    let report_only: Vec<ActiveCop<'_>> = active
        .iter()
        .map(|a| ActiveCop {
            autocorrect: false,
            ..*a
        })
        .collect();
    let (diags, _) = lint_source_once(&final_source, &report_only);
    let mut all_diags = corrected_diags;
    all_diags.extend(diags);
    let total_corrected = all_diags.iter().filter(|d| d.corrected).count();
    let corrected_bytes = validate_corrected_bytes(original_bytes, current_bytes, &path);
    (all_diags, corrected_bytes, total_corrected)
}

/// Run the active cops once on a source file. Returns (diagnostics, corrections).
fn lint_source_once(source: &SourceFile, active: &[ActiveCop<'_>]) -> (Vec<Diagnostic>, Vec<Correction>) {
    if active.is_empty() {
        return (Vec::new(), Vec::new());
    }
    // Parse on this thread (ParseResult is !Send)
    let parse_result = crate::parse::parse_source(source.as_bytes());

    // The AST from error recovery is unreliable; report nothing for files
    // Prism cannot parse.
    if parse_result.errors().count() > 0 {
        debug!(path = %source.path.display(), "skipping file with syntax errors");
        return (Vec::new(), Vec::new());
    }

    let cops: Vec<ActiveCop<'_>> = active.to_vec();
    let mut walker = BatchedCopWalker::new(cops, source, &parse_result);
    walker.visit(&parse_result.node());
    (walker.diagnostics, walker.corrections)
}
