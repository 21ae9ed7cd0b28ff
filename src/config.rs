/*
    Typed configuration shared by the library and the command line
*/

use clap::ValueEnum;

/// What to do with a grammar line that fails to lex or parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LineRecovery {
    /// Log the error and continue with the remaining lines
    #[default]
    Skip,
    /// Fail grammar construction on the first bad line
    Abort,
}

/// Interaction order between clear/delete pruning and fullresolve splicing
/// during tree refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RefineOrder {
    /// Replace clear/delete children with empty leaves, splice, then drop
    /// delete children
    #[default]
    PruneFirst,
    /// Splice first, then replace clear children and drop delete children
    ResolveFirst,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrammarConfig {
    pub recovery: LineRecovery,
    pub refine_order: RefineOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Probability of choosing one of the `*>` rules of a nonterminal
    pub preferred: f64,
    /// Depth after which only terminating rules are chosen
    pub max_depth: usize,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            preferred: 0.8,
            max_depth: 50,
            seed: None,
        }
    }
}
