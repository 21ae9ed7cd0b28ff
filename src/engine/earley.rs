use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, trace};

use super::{ParseError, Recognizer};
use crate::grammar::analysis::{null_trees, nullable_set};
use crate::grammar::{
    rules, GrammarError, GrammarManager, Nonterminal, ProductionTree, Symbol, TreeError, START,
};

// The rule of the synthetic root item
static ROOT_RULE: [Symbol; 1] = [Symbol::Nonterminal(START)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Head {
    Root,
    Rule(Nonterminal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ItemRef {
    column: usize,
    row: usize,
}

// How an item came to be, pointing at the items it was built from
#[derive(Debug, Clone, Copy)]
enum Derivation {
    Root,
    Scan(ItemRef),
    NullableScan(ItemRef),
    Predict(ItemRef),
    Complete { waiting: ItemRef, completed: ItemRef },
}

#[derive(Debug, Clone, Copy)]
struct Item<'g> {
    start: usize,
    head: Head,
    rule: &'g [Symbol],
    dot: usize,
    derivation: Derivation,
}

impl<'g> Item<'g> {
    fn next(&self) -> Option<Symbol> {
        self.rule.get(self.dot).copied()
    }

    fn advance(&self, derivation: Derivation) -> Self {
        Item {
            dot: self.dot + 1,
            derivation,
            ..*self
        }
    }

    // Items are the same if they only differ in how they were derived
    fn key(&self) -> (usize, Head, &'g [Symbol], usize) {
        (self.start, self.head, self.rule, self.dot)
    }
}

#[derive(Debug, Default)]
struct Column<'g> {
    items: Vec<Item<'g>>,
    seen: HashSet<(usize, Head, &'g [Symbol], usize)>,
    predicted: HashSet<Nonterminal>,
}

impl<'g> Column<'g> {
    // Duplicates are dropped here, so the first derivation of an item is the
    // one kept and every backpointer stays valid
    fn push(&mut self, item: Item<'g>) {
        if self.seen.insert(item.key()) {
            self.items.push(item);
        }
    }
}

type Chart<'g> = Vec<Column<'g>>;

/// Earley parser over a grammar as written.
#[derive(Debug, Clone, Default)]
pub struct EarleyParser {
    manager: GrammarManager,
    nullable: BTreeSet<Nonterminal>,
    null_trees: BTreeMap<Nonterminal, ProductionTree>,
}

impl EarleyParser {
    pub fn new(manager: GrammarManager) -> Self {
        let nullable = nullable_set(manager.grammar());
        let null_trees = null_trees(manager.grammar());
        EarleyParser {
            manager,
            nullable,
            null_trees,
        }
    }

    pub fn manager(&self) -> &GrammarManager {
        &self.manager
    }

    /// Parses `input` and returns its tree rooted at `S`, refined by the
    /// grammar's annotations.
    pub fn parse_tree(&self, input: &[char]) -> Result<ProductionTree, ParseError> {
        let raw = self.raw_tree(input)?;
        Ok(self.manager.refine_tree(&raw)?)
    }

    fn raw_tree(&self, input: &[char]) -> Result<ProductionTree, ParseError> {
        let chart = self.fill_chart(input);
        let accepted = accepting(&chart).ok_or(ParseError::NoParse)?;

        // the root item has S as its only child
        self.subtrees(&chart, accepted)?
            .pop()
            .ok_or(ParseError::Tree(TreeError::MissingSubtree {
                nonterminal: START,
                expected: 1,
                found: 0,
            }))
    }

    fn fill_chart<'g>(&'g self, input: &[char]) -> Chart<'g> {
        let grammar = self.manager.grammar();
        let mut chart: Chart = (0..=input.len()).map(|_| Column::default()).collect();
        chart[0].push(Item {
            start: 0,
            head: Head::Root,
            rule: &ROOT_RULE,
            dot: 0,
            derivation: Derivation::Root,
        });

        for column in 0..=input.len() {
            // the column grows while it is processed
            let mut row = 0;
            while row < chart[column].items.len() {
                let item = chart[column].items[row];
                let here = ItemRef { column, row };

                match item.next() {
                    Some(Symbol::Terminal(c)) => {
                        if input.get(column) == Some(&c) {
                            chart[column + 1].push(item.advance(Derivation::Scan(here)));
                        }
                    }
                    Some(Symbol::Nonterminal(n)) => {
                        if self.nullable.contains(&n) {
                            chart[column].push(item.advance(Derivation::NullableScan(here)));
                        }
                        if chart[column].predicted.insert(n) {
                            for rule in rules(grammar, n) {
                                chart[column].push(Item {
                                    start: column,
                                    head: Head::Rule(n),
                                    rule,
                                    dot: 0,
                                    derivation: Derivation::Predict(here),
                                });
                            }
                        }
                    }
                    None => complete(&mut chart, item, here),
                }
                row += 1;
            }
            trace!(column, items = ?chart[column].items, "filled column");
        }

        debug!(
            len = input.len(),
            items = chart.iter().map(|column| column.items.len()).sum::<usize>(),
            "filled Earley chart"
        );
        chart
    }

    // The children of the node an item belongs to, found by walking the
    // derivations back to the item's prediction
    fn subtrees(&self, chart: &Chart, item: ItemRef) -> Result<Vec<ProductionTree>, ParseError> {
        let mut children = Vec::new();
        let mut cursor = item;

        loop {
            let current = &chart[cursor.column].items[cursor.row];
            match current.derivation {
                Derivation::Root | Derivation::Predict(_) => break,
                Derivation::Scan(previous) => cursor = previous,
                Derivation::NullableScan(previous) => {
                    let skipped = current.dot.checked_sub(1).and_then(|dot| current.rule[dot].nonterminal());
                    let tree = skipped.and_then(|n| self.null_trees.get(&n)).ok_or(TreeError::MissingSubtree {
                        nonterminal: skipped.unwrap_or(START),
                        expected: 1,
                        found: 0,
                    })?;
                    children.push(tree.clone());
                    cursor = previous;
                }
                Derivation::Complete { waiting, completed } => {
                    children.push(self.tree(chart, completed)?);
                    cursor = waiting;
                }
            }
        }

        children.reverse();
        Ok(children)
    }

    fn tree(&self, chart: &Chart, item: ItemRef) -> Result<ProductionTree, ParseError> {
        let completed = &chart[item.column].items[item.row];
        let from = match completed.head {
            Head::Rule(n) => n,
            Head::Root => START,
        };

        let tree = ProductionTree {
            from,
            rule: completed.rule.to_vec(),
            subtrees: self.subtrees(chart, item)?,
        };
        tree.check_shape()?;
        Ok(tree)
    }
}

// Advances every item of the completed item's start column that waits for
// its nonterminal
fn complete(chart: &mut Chart, item: Item, here: ItemRef) {
    let Head::Rule(n) = item.head else {
        return;
    };

    let waiting: Vec<(usize, Item)> = chart[item.start]
        .items
        .iter()
        .enumerate()
        .filter(|(_, waiting)| waiting.next() == Some(Symbol::Nonterminal(n)))
        .map(|(row, waiting)| (row, *waiting))
        .collect();

    for (row, waiting) in waiting {
        let derivation = Derivation::Complete {
            waiting: ItemRef {
                column: item.start,
                row,
            },
            completed: here,
        };
        chart[here.column].push(waiting.advance(derivation));
    }
}

fn accepting(chart: &Chart) -> Option<ItemRef> {
    let column = chart.len().checked_sub(1)?;
    chart[column]
        .items
        .iter()
        .position(|item| item.head == Head::Root && item.next().is_none())
        .map(|row| ItemRef { column, row })
}

impl Recognizer for EarleyParser {
    fn init_grammar(&mut self, source: &str) -> Result<(), GrammarError> {
        let manager = GrammarManager::from_source(source, self.manager.config().clone())?;
        *self = EarleyParser::new(manager);
        Ok(())
    }

    fn parse_input(&self, input: &[char]) -> bool {
        let accepted = accepting(&self.fill_chart(input)).is_some();
        debug!(len = input.len(), accepted, "Earley parse");
        accepted
    }
}
