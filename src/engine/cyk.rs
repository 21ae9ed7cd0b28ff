use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use tracing::{debug, trace};

use super::Recognizer;
use crate::grammar::{GrammarError, GrammarManager, Nonterminal, Symbol, Terminal, START};

// One row per substring length, one cell per start offset
type Table = Vec<Vec<BTreeSet<Nonterminal>>>;

/// CYK recognizer over a Chomsky Normal Form copy of a grammar.
#[derive(Debug, Clone, Default)]
pub struct CykParser {
    cnf: GrammarManager,
    terminals: HashMap<Terminal, BTreeSet<Nonterminal>>,
    pairs: HashMap<(Nonterminal, Nonterminal), Vec<Nonterminal>>,
    accepts_empty: bool,
}

impl CykParser {
    /// Converts `manager`'s grammar to CNF and indexes its rules.
    pub fn new(manager: &GrammarManager) -> Self {
        let cnf = manager.to_cnf();
        let mut terminals: HashMap<Terminal, BTreeSet<Nonterminal>> = HashMap::new();
        let mut pairs: HashMap<(Nonterminal, Nonterminal), Vec<Nonterminal>> = HashMap::new();
        let mut accepts_empty = false;

        for (&n, rewrite) in cnf.grammar() {
            for rule in rewrite {
                match rule.as_slice() {
                    [] => accepts_empty |= n == START,
                    [Symbol::Terminal(c)] => {
                        terminals.entry(*c).or_default().insert(n);
                    }
                    [Symbol::Nonterminal(b), Symbol::Nonterminal(c)] => {
                        pairs.entry((*b, *c)).or_default().push(n);
                    }
                    _ => debug!(nonterminal = %cnf.name(n), "ignoring rule outside CNF"),
                }
            }
        }
        debug!(terminals = terminals.len(), pairs = pairs.len(), "indexed CNF grammar");

        CykParser {
            cnf,
            terminals,
            pairs,
            accepts_empty,
        }
    }

    /// The CNF grammar the recognizer runs on
    pub fn grammar(&self) -> &GrammarManager {
        &self.cnf
    }

    fn cell(&self, table: &Table, len: usize, start: usize) -> BTreeSet<Nonterminal> {
        let mut cell = BTreeSet::new();
        for split in 1..len {
            let left = &table[split - 1][start];
            let right = &table[len - split - 1][start + split];
            for (b, c) in left.iter().cartesian_product(right) {
                if let Some(heads) = self.pairs.get(&(*b, *c)) {
                    cell.extend(heads);
                }
            }
        }
        cell
    }
}

impl Recognizer for CykParser {
    fn init_grammar(&mut self, source: &str) -> Result<(), GrammarError> {
        let manager = GrammarManager::from_source(source, self.cnf.config().clone())?;
        *self = CykParser::new(&manager);
        Ok(())
    }

    fn parse_input(&self, input: &[char]) -> bool {
        if input.is_empty() {
            debug!(accepted = self.accepts_empty, "empty input");
            return self.accepts_empty;
        }

        let base = input
            .iter()
            .map(|c| self.terminals.get(c).cloned().unwrap_or_default())
            .collect();
        let mut table: Table = vec![base];

        for len in 2..=input.len() {
            let row = (0..=input.len() - len).map(|start| self.cell(&table, len, start)).collect();
            table.push(row);
        }
        trace!(?table, "CYK table");

        let accepted = table[input.len() - 1][0].contains(&START);
        debug!(len = input.len(), accepted, "CYK parse");
        accepted
    }
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use super::*;
    use crate::config::GrammarConfig;

    fn parser(source: &str) -> CykParser {
        CykParser::new(&GrammarManager::from_source(source, GrammarConfig::default()).unwrap())
    }

    #[test]
    fn recognizes_balanced_strings() {
        let cyk = parser("S -> \"a\" S \"b\" | €\n");
        let inputs = vec!["", "ab", "aabb", "aaabbb", "aab", "abb", "ba", "abab"];
        let answers = vec![true, true, true, true, false, false, false, false];

        for (input, answer) in zip(inputs, answers) {
            assert_eq!(cyk.parse_input(&input.chars().collect::<Vec<_>>()), answer, "{:?}", input);
        }
    }

    #[test]
    fn empty_input_needs_empty_start_rule() {
        assert!(!parser("S -> \"a\"\n").parse_input(&[]));
        assert!(parser("S -> A\nA -> B B\nB -> € | \"b\"\n").parse_input(&[]));
    }

    #[test]
    fn unknown_characters_are_rejected() {
        let cyk = parser("S -> S \"+\" S | \"1\"\n");
        assert!(cyk.parse_input(&['1', '+', '1']));
        assert!(!cyk.parse_input(&['1', '-', '1']));
    }

    #[test]
    fn indexes_are_built_from_cnf() {
        let cyk = parser("S -> \"x\" \"y\"\n");
        assert!(crate::grammar::cnf::is_cnf(cyk.grammar().grammar()));
        assert!(cyk.terminals.contains_key(&'x'));
        assert!(cyk.terminals.contains_key(&'y'));
        assert_eq!(cyk.pairs.len(), 1);
    }
}
