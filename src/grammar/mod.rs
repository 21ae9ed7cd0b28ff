/*
    This module is for storing and manipulating grammars
*/

pub mod analysis;
pub mod cleanup;
pub mod cnf;
pub mod manager;
pub mod tree;
pub mod verifier;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use itertools::Itertools;
use thiserror::Error;

use crate::parser::CompileError;

pub use manager::GrammarManager;
pub use tree::{ProductionTree, TreeError};

pub type Terminal = char;
pub type Nonterminal = u32;

/// The start symbol `S` always has id 0
pub const START: Nonterminal = 0;
pub const START_NAME: &str = "S";

// The base unit in a grammar rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(Terminal),
    Nonterminal(Nonterminal),
}

impl Symbol {
    pub fn nonterminal(&self) -> Option<Nonterminal> {
        match self {
            Symbol::Nonterminal(n) => Some(*n),
            Symbol::Terminal(_) => None,
        }
    }
}

// The symbols in a single alternative, empty for epsilon
pub type Rule = Vec<Symbol>;

// The alternatives of a nonterminal, in declaration order
pub type Rewrite = Vec<Rule>;

pub type Grammar = BTreeMap<Nonterminal, Rewrite>;

pub fn rules(grammar: &Grammar, n: Nonterminal) -> impl Iterator<Item = &Rule> {
    grammar.get(&n).into_iter().flatten()
}

pub fn symbols_mut(grammar: &mut Grammar) -> impl Iterator<Item = &mut Symbol> {
    grammar.values_mut().flatten().flatten()
}

/// Largest nonterminal id that is defined or referenced
pub fn max_nonterminal(grammar: &Grammar) -> Nonterminal {
    grammar
        .iter()
        .flat_map(|(n, rewrite)| {
            std::iter::once(*n).chain(rewrite.iter().flatten().filter_map(Symbol::nonterminal))
        })
        .max()
        .unwrap_or(START)
}

#[derive(Debug, Error, PartialEq)]
pub enum GrammarError {
    #[error("Malformed grammar line {0}")]
    Malformed(CompileError),
    #[error("Nonterminal `{0}` undefined")]
    UndefinedNonterminal(String),
    #[error("Grammar doesn't terminate")]
    NonTerminating,
}

/// Interned nonterminal names. `S` is always id 0.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTable {
    ids: HashMap<String, Nonterminal>,
    names: BTreeMap<Nonterminal, String>,
    next: Nonterminal,
}

impl Default for NameTable {
    fn default() -> Self {
        let mut table = NameTable {
            ids: HashMap::new(),
            names: BTreeMap::new(),
            next: START,
        };
        table.intern(START_NAME);
        table
    }
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Nonterminal {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        id
    }

    pub fn lookup(&self, name: &str) -> Option<Nonterminal> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, n: Nonterminal) -> String {
        self.names.get(&n).cloned().unwrap_or_else(|| n.to_string())
    }

    /// Makes sure fresh ids are minted above every id used by `grammar`.
    pub fn reserve_above(&mut self, grammar: &Grammar) {
        self.next = self.next.max(max_nonterminal(grammar) + 1);
    }

    /// Mints a new nonterminal named after `hint`, priming the name until it
    /// is unused.
    pub fn fresh(&mut self, hint: &str) -> Nonterminal {
        let mut name = hint.to_string();
        while self.ids.contains_key(&name) {
            name.push('\'');
        }
        self.intern(&name)
    }
}

/// Refinement marker written in front of a rule's left-hand name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `&`: subtrees are replaced by an empty leaf
    Clear,
    /// `%`: subtrees are removed from their parent
    Delete,
}

impl Marker {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '&' => Some(Marker::Clear),
            '%' => Some(Marker::Delete),
            _ => None,
        }
    }
}

/// One alternative of a parsed grammar line
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub from: Nonterminal,
    pub rule: Rule,
    /// Written with `*>`
    pub resolve: bool,
    pub marker: Option<Marker>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub clear: BTreeSet<Nonterminal>,
    pub delete: BTreeSet<Nonterminal>,
    pub fullresolve: BTreeMap<Nonterminal, Rewrite>,
}

impl Annotations {
    pub fn record(&mut self, production: &Production) {
        if production.resolve {
            self.fullresolve
                .entry(production.from)
                .or_default()
                .push(production.rule.clone());
        }
        match production.marker {
            Some(Marker::Clear) => {
                self.clear.insert(production.from);
            }
            Some(Marker::Delete) => {
                self.delete.insert(production.from);
            }
            None => {}
        }
    }

    pub fn is_cleared(&self, n: Nonterminal) -> bool {
        self.clear.contains(&n)
    }

    pub fn is_deleted(&self, n: Nonterminal) -> bool {
        self.delete.contains(&n)
    }

    pub fn resolves(&self, n: Nonterminal, rule: &Rule) -> bool {
        self.fullresolve.get(&n).is_some_and(|rules| rules.contains(rule))
    }

    pub fn preferred(&self, n: Nonterminal) -> &[Rule] {
        self.fullresolve.get(&n).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Renders a rule with names, e.g. `'a'<A>'b'`, or `€` for epsilon.
pub fn rule_text(rule: &Rule, names: &NameTable) -> String {
    if rule.is_empty() {
        return "€".to_string();
    }
    rule.iter()
        .map(|symbol| match symbol {
            Symbol::Terminal(c) => format!("'{}'", c.escape_default()),
            Symbol::Nonterminal(n) => format!("<{}>", names.name(*n)),
        })
        .join("")
}

/// Displays a grammar one alternative per line.
pub struct GrammarDisplay<'a> {
    pub grammar: &'a Grammar,
    pub names: &'a NameTable,
}

impl Display for GrammarDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (n, rewrite) in self.grammar {
            for rule in rewrite {
                writeln!(f, "[{}: {}] -> {}", n, self.names.name(*n), rule_text(rule, self.names))?;
            }
        }
        Ok(())
    }
}
