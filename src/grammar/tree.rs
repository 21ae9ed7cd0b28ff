use std::fmt::Write;

use thiserror::Error;

use super::{rule_text, NameTable, Nonterminal, Rule, Symbol};

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    // A node's rule does not line up with its subtrees.
    // This is a problem with cfparse, not the grammar
    #[error("Rule of nonterminal {nonterminal} has {expected} nonterminals but {found} subtrees")]
    MissingSubtree {
        nonterminal: Nonterminal,
        expected: usize,
        found: usize,
    },
}

/// A derivation: the rule chosen for `from` and one subtree per nonterminal
/// of that rule, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionTree {
    pub from: Nonterminal,
    pub rule: Rule,
    pub subtrees: Vec<ProductionTree>,
}

impl ProductionTree {
    /// A placeholder node with no content
    pub fn leaf(from: Nonterminal) -> Self {
        ProductionTree {
            from,
            rule: Rule::new(),
            subtrees: Vec::new(),
        }
    }

    pub fn check_shape(&self) -> Result<(), TreeError> {
        let expected = self.rule.iter().filter(|s| matches!(s, Symbol::Nonterminal(_))).count();
        if expected == self.subtrees.len() {
            Ok(())
        } else {
            Err(TreeError::MissingSubtree {
                nonterminal: self.from,
                expected,
                found: self.subtrees.len(),
            })
        }
    }

    /// The terminals at the leaves of the tree, left to right.
    pub fn yield_string(&self) -> Result<String, TreeError> {
        let mut result = String::new();
        self.write_yield(&mut result)?;
        Ok(result)
    }

    fn write_yield(&self, out: &mut String) -> Result<(), TreeError> {
        self.check_shape()?;
        let mut subtrees = self.subtrees.iter();
        for symbol in &self.rule {
            match symbol {
                Symbol::Terminal(c) => out.push(*c),
                Symbol::Nonterminal(_) => {
                    if let Some(subtree) = subtrees.next() {
                        subtree.write_yield(out)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Indented rendering of the tree, one node per line, with terminals on
    /// their own lines below the node that matched them.
    pub fn render(&self, names: &NameTable) -> Result<String, TreeError> {
        let mut out = String::new();
        self.render_into(names, "", &mut out)?;
        Ok(out)
    }

    fn render_into(&self, names: &NameTable, indent: &str, out: &mut String) -> Result<(), TreeError> {
        self.check_shape()?;
        // writing into a String cannot fail
        let _ = writeln!(out, "{}{} -> {}:", indent, names.name(self.from), rule_text(&self.rule, names));

        let inner = format!("{}    ", indent);
        let mut subtrees = self.subtrees.iter();
        for symbol in &self.rule {
            match symbol {
                Symbol::Terminal(c) => {
                    let _ = writeln!(out, "{}{}", inner, c.escape_default());
                }
                Symbol::Nonterminal(_) => {
                    if let Some(subtree) = subtrees.next() {
                        subtree.render_into(names, &inner, out)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::tests::{n, t};
    use crate::grammar::START;

    fn sample() -> (ProductionTree, NameTable) {
        let mut names = NameTable::new();
        let a = names.intern("A");
        let tree = ProductionTree {
            from: START,
            rule: vec![t('x'), n(a), t('y')],
            subtrees: vec![ProductionTree { from: a, rule: vec![t('a')], subtrees: vec![] }],
        };
        (tree, names)
    }

    #[test]
    fn tree_yield() {
        let (tree, _) = sample();
        assert_eq!(tree.yield_string(), Ok("xay".to_string()));
    }

    #[test]
    fn tree_rendering() {
        let (tree, names) = sample();
        assert_eq!(
            tree.render(&names).unwrap(),
            "S -> 'x'<A>'y':\n    x\n    A -> 'a':\n        a\n    y\n"
        );
    }

    #[test]
    fn missing_subtree_is_reported() {
        let (mut tree, names) = sample();
        tree.subtrees.clear();

        let error = TreeError::MissingSubtree { nonterminal: START, expected: 1, found: 0 };
        assert_eq!(tree.yield_string(), Err(error));
        assert!(tree.render(&names).is_err());
    }
}
