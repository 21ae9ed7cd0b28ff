use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use super::analysis::{nullable_map, termination_map};
use super::cnf::to_cnf;
use super::verifier::undefined_nonterminals;
use super::*;
use crate::config::{GrammarConfig, LineRecovery, RefineOrder};
use crate::parser::{self, LineResult};

/// Owns a grammar together with its names and refinement annotations.
#[derive(Debug, Clone, Default)]
pub struct GrammarManager {
    grammar: Grammar,
    names: NameTable,
    annotations: Annotations,
    termination: BTreeMap<Nonterminal, bool>,
    config: GrammarConfig,
}

impl GrammarManager {
    pub fn new(config: GrammarConfig) -> Self {
        GrammarManager {
            config,
            ..Default::default()
        }
    }

    /// Wraps an already built grammar. Nonterminals are named by their ids.
    pub fn from_grammar(grammar: Grammar, config: GrammarConfig) -> Self {
        let mut names = NameTable::new();
        names.reserve_above(&grammar);
        GrammarManager {
            grammar,
            names,
            config,
            ..Default::default()
        }
    }

    /// Parses, builds and checks a grammar from rule text.
    pub fn from_source(source: &str, config: GrammarConfig) -> Result<Self, GrammarError> {
        let mut manager = Self::new(config);
        let lines = parser::parse_source(source, Path::new(""), &mut manager.names);
        manager.build(lines)?;
        manager.check_grammar()?;
        Ok(manager)
    }

    pub fn from_file(path: &Path, config: GrammarConfig) -> Result<Self, GrammarError> {
        let mut manager = Self::new(config);
        let lines = parser::parse_file(path, &mut manager.names).map_err(GrammarError::Malformed)?;
        manager.build(lines)?;
        manager.check_grammar()?;
        info!(file = %path.display(), nonterminals = manager.grammar.len(), "grammar loaded");
        Ok(manager)
    }

    /// Adds the productions of every parsed line. Failed lines are skipped
    /// or abort the build, depending on the configured recovery.
    pub fn build<I>(&mut self, lines: I) -> Result<(), GrammarError>
    where
        I: IntoIterator<Item = LineResult<Vec<Production>>>,
    {
        for line in lines {
            let productions = match line {
                Ok(productions) => productions,
                Err(error) => match self.config.recovery {
                    LineRecovery::Skip => {
                        warn!(%error, "skipping grammar line");
                        continue;
                    }
                    LineRecovery::Abort => return Err(GrammarError::Malformed(error)),
                },
            };

            for production in productions {
                self.annotations.record(&production);
                self.grammar.entry(production.from).or_default().push(production.rule);
            }
        }
        Ok(())
    }

    pub fn check_grammar(&mut self) -> Result<(), GrammarError> {
        if let Some(&undefined) = undefined_nonterminals(&self.grammar).first() {
            return Err(GrammarError::UndefinedNonterminal(self.names.name(undefined)));
        }
        if !self.terminates() {
            return Err(GrammarError::NonTerminating);
        }
        Ok(())
    }

    /// Whether `S` derives some string of terminals. The map for every
    /// nonterminal is kept, see [`GrammarManager::termination_map`].
    pub fn terminates(&mut self) -> bool {
        self.termination = termination_map(&self.grammar);
        self.termination.get(&START).copied().unwrap_or(false)
    }

    pub fn termination_map(&self) -> &BTreeMap<Nonterminal, bool> {
        &self.termination
    }

    pub fn nullable_map(&self) -> BTreeMap<Nonterminal, bool> {
        nullable_map(&self.grammar)
    }

    /// A new manager holding the grammar in Chomsky Normal Form
    pub fn to_cnf(&self) -> GrammarManager {
        let mut names = self.names.clone();
        let grammar = to_cnf(&self.grammar, &mut names);
        info!(
            before = self.grammar.values().map(Vec::len).sum::<usize>(),
            after = grammar.values().map(Vec::len).sum::<usize>(),
            "converted grammar to CNF"
        );

        let mut cnf = GrammarManager {
            grammar,
            names,
            annotations: self.annotations.clone(),
            termination: BTreeMap::new(),
            config: self.config.clone(),
        };
        cnf.terminates();
        cnf
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    pub fn name(&self, n: Nonterminal) -> String {
        self.names.name(n)
    }

    /// Applies the clear, delete and fullresolve annotations to a raw parse
    /// tree, bottom-up. The input tree is left untouched.
    pub fn refine_tree(&self, tree: &ProductionTree) -> Result<ProductionTree, TreeError> {
        tree.check_shape()?;

        match self.config.refine_order {
            RefineOrder::PruneFirst => {
                let subtrees = tree
                    .subtrees
                    .iter()
                    .map(|subtree| {
                        if self.is_pruned(subtree.from) {
                            Ok(ProductionTree::leaf(subtree.from))
                        } else {
                            self.refine_tree(subtree)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let node = self.resolve(ProductionTree {
                    from: tree.from,
                    rule: tree.rule.clone(),
                    subtrees,
                })?;
                Ok(self.drop_deleted(node))
            }
            RefineOrder::ResolveFirst => {
                let subtrees = tree
                    .subtrees
                    .iter()
                    .map(|subtree| self.refine_tree(subtree))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut node = self.resolve(ProductionTree {
                    from: tree.from,
                    rule: tree.rule.clone(),
                    subtrees,
                })?;
                for subtree in node.subtrees.iter_mut() {
                    if self.annotations.is_cleared(subtree.from) {
                        *subtree = ProductionTree::leaf(subtree.from);
                    }
                }
                Ok(self.drop_deleted(node))
            }
        }
    }

    fn is_pruned(&self, n: Nonterminal) -> bool {
        self.annotations.is_cleared(n) || self.annotations.is_deleted(n)
    }

    // Splices the subtrees into the node while its rule is marked with `*>`
    fn resolve(&self, mut node: ProductionTree) -> Result<ProductionTree, TreeError> {
        while self.annotations.resolves(node.from, &node.rule)
            && node.rule.iter().any(|symbol| matches!(symbol, Symbol::Nonterminal(_)))
        {
            let mut rule = Rule::new();
            let mut subtrees = Vec::new();
            let mut children = node.subtrees.into_iter();

            for symbol in node.rule {
                match symbol {
                    Symbol::Terminal(_) => rule.push(symbol),
                    Symbol::Nonterminal(n) => {
                        let child = children.next().ok_or(TreeError::MissingSubtree {
                            nonterminal: node.from,
                            expected: 1,
                            found: 0,
                        })?;
                        debug_assert_eq!(child.from, n);
                        rule.extend(child.rule);
                        subtrees.extend(child.subtrees);
                    }
                }
            }

            node = ProductionTree {
                from: node.from,
                rule,
                subtrees,
            };
            node.check_shape()?;
        }
        Ok(node)
    }

    // Removes the subtrees of delete-marked nonterminals along with their
    // symbols in the rule
    fn drop_deleted(&self, node: ProductionTree) -> ProductionTree {
        let mut rule = Rule::new();
        let mut subtrees = Vec::new();
        let mut children = node.subtrees.into_iter();

        for symbol in node.rule {
            match symbol {
                Symbol::Terminal(_) => rule.push(symbol),
                Symbol::Nonterminal(n) => {
                    let child = children.next();
                    if !self.annotations.is_deleted(n) {
                        rule.push(symbol);
                        subtrees.extend(child);
                    }
                }
            }
        }

        ProductionTree {
            from: node.from,
            rule,
            subtrees,
        }
    }

    pub fn print_tree(&self, tree: &ProductionTree) -> Result<String, TreeError> {
        tree.render(&self.names)
    }

    /// Every rule of the grammar, plus whether its nonterminal terminates.
    pub fn debug_info(&self) -> String {
        let termination = termination_map(&self.grammar);
        let mut info = GrammarDisplay {
            grammar: &self.grammar,
            names: &self.names,
        }
        .to_string();

        for (n, terminates) in termination {
            info.push_str(&format!("{} terminates? {}\n", self.names.name(n), if terminates { "Y" } else { "N" }));
        }
        debug!(lines = info.lines().count(), "rendered grammar");
        info
    }
}
