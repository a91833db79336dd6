//! Process-wide memo of parsed regexp trees.
//!
//! Identical patterns show up over and over across a codebase (and across
//! cops looking at the same literal), so each distinct normalized pattern
//! is parsed once. Failures are remembered too: a pattern that cannot be
//! parsed is answered with the same `MalformedPattern` every time.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use super::expression::Expression;
use super::parser::parse;

/// The pattern could not be turned into a tree. Never shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed pattern: {reason}")]
pub struct MalformedPattern {
    pub reason: String,
}

pub type ParseResult = Result<Arc<Expression>, MalformedPattern>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Pattern → parse result. Entries live as long as the cache.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: RwLock<HashMap<String, ParseResult>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

static GLOBAL: LazyLock<ParseCache> = LazyLock::new(ParseCache::new);

/// The cache shared by every cop in the process.
pub fn global() -> &'static ParseCache {
    &GLOBAL
}

/// Look up `pattern` in the global cache, parsing it on first use.
pub fn get_or_parse(pattern: &str) -> ParseResult {
    GLOBAL.get_or_parse(pattern)
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(&self, pattern: &str) -> ParseResult {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = entries.get(pattern) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return found.clone();
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Parse without holding the lock. Two threads may race on the same
        // new pattern; parsing is pure, so the loser's result is identical
        // and simply dropped.
        let parsed = parse_isolated(pattern);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(pattern.to_string()).or_insert(parsed).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Run the parser, turning both parse errors and panics into `MalformedPattern`.
fn parse_isolated(pattern: &str) -> ParseResult {
    match catch_unwind(AssertUnwindSafe(|| parse(pattern))) {
        Ok(Ok(tree)) => Ok(Arc::new(tree)),
        Ok(Err(e)) => {
            debug!(pattern, error = %e, "regexp pattern not parsable; skipping");
            Err(MalformedPattern {
                reason: e.to_string(),
            })
        }
        Err(_) => {
            warn!(pattern, "regexp parser panicked; treating pattern as malformed");
            Err(MalformedPattern {
                reason: "parser panicked".to_string(),
            })
        }
    }
}
