use ruby_prism::Visit;

use crate::cop::{Cop, CopConfig};
use crate::correction::Correction;
use crate::diagnostic::Diagnostic;
use crate::parse::source::SourceFile;

/// A cop selected to run on the current file.
#[derive(Clone, Copy)]
pub struct ActiveCop<'a> {
    pub cop: &'a dyn Cop,
    pub config: &'a CopConfig,
    /// Registry index, stamped on the cop's corrections.
    pub index: usize,
    pub autocorrect: bool,
}

/// Walks the AST once and hands every node to every active cop.
pub struct BatchedCopWalker<'a, 'pr> {
    cops: Vec<ActiveCop<'a>>,
    source: &'a SourceFile,
    parse_result: &'a ruby_prism::ParseResult<'pr>,
    pub diagnostics: Vec<Diagnostic>,
    pub corrections: Vec<Correction>,
}

impl<'a, 'pr> BatchedCopWalker<'a, 'pr> {
    pub fn new(
        cops: Vec<ActiveCop<'a>>,
        source: &'a SourceFile,
        parse_result: &'a ruby_prism::ParseResult<'pr>,
    ) -> Self {
        Self {
            cops,
            source,
            parse_result,
            diagnostics: Vec::new(),
            corrections: Vec::new(),
        }
    }

    fn check(&mut self, node: &ruby_prism::Node<'pr>) {
        for active in &self.cops {
            let first_diag = self.diagnostics.len();
            let first_correction = self.corrections.len();
            let corrections = active.autocorrect.then_some(&mut self.corrections);
            active.cop.check_node(
                self.source,
                node,
                self.parse_result,
                active.config,
                &mut self.diagnostics,
                corrections,
            );

            if let Some(severity) = active.config.severity {
                for d in &mut self.diagnostics[first_diag..] {
                    d.severity = severity;
                }
            }
            for c in &mut self.corrections[first_correction..] {
                c.cop_index = active.index;
            }
        }
    }
}

impl<'pr> Visit<'pr> for BatchedCopWalker<'_, 'pr> {
    fn visit_branch_node_enter(&mut self, node: ruby_prism::Node<'pr>) {
        self.check(&node);
    }

    fn visit_leaf_node_enter(&mut self, node: ruby_prism::Node<'pr>) {
        self.check(&node);
    }
}
