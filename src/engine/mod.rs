/*
    This module holds the two recognition engines
*/

pub mod cyk;
pub mod earley;

use thiserror::Error;

use crate::grammar::{GrammarError, TreeError};

pub use cyk::CykParser;
pub use earley::EarleyParser;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    // The input is not in the language, a normal negative result
    #[error("Input is not in the language of the grammar")]
    NoParse,
    // A reconstructed tree did not line up with its rules
    // This is a problem with cfparse, not the grammar
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A membership test against a grammar given in rule text.
pub trait Recognizer {
    /// Replaces the grammar of the recognizer. On error the previous grammar
    /// is kept.
    fn init_grammar(&mut self, source: &str) -> Result<(), GrammarError>;

    fn parse_input(&self, input: &[char]) -> bool;
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use itertools::Itertools;

    use super::*;

    fn engines(source: &str) -> (CykParser, EarleyParser) {
        let mut cyk = CykParser::default();
        let mut earley = EarleyParser::default();
        cyk.init_grammar(source).unwrap();
        earley.init_grammar(source).unwrap();
        (cyk, earley)
    }

    // Every string over `alphabet` of length at most `max_len`
    fn strings(alphabet: &str, max_len: usize) -> Vec<Vec<char>> {
        let letters: Vec<char> = alphabet.chars().collect();
        let mut all = vec![Vec::new()];
        for len in 1..=max_len {
            all.extend((0..len).map(|_| letters.iter().copied()).multi_cartesian_product());
        }
        all
    }

    #[test]
    fn documented_examples() {
        let grammars = vec![
            "S -> A\nA -> \"a\" A | €\n",
            "S -> S \"+\" S | \"1\"\n",
            "S -> \"a\" S \"b\" | €\n",
        ];
        // (input, accepted)
        let answers = vec![
            vec![("", true), ("a", true), ("aaa", true), ("b", false)],
            vec![("1+1+1", true), ("1", true), ("1+", false), ("+1", false)],
            vec![("ab", true), ("aabb", true), ("", true), ("aab", false), ("ba", false)],
        ];

        for (source, cases) in zip(grammars, answers) {
            let (cyk, earley) = engines(source);
            for (input, accepted) in cases {
                let input: Vec<char> = input.chars().collect();
                assert_eq!(cyk.parse_input(&input), accepted, "cyk {:?} on {:?}", input, source);
                assert_eq!(earley.parse_input(&input), accepted, "earley {:?} on {:?}", input, source);
            }
        }
    }

    #[test]
    fn engines_agree_on_short_strings() {
        let grammars = vec![
            ("S -> A\nA -> \"a\" A | €\n", "ab", 5),
            ("S -> S \"+\" S | \"1\"\n", "1+", 6),
            ("S -> \"a\" S \"b\" | €\n", "ab", 6),
            ("S -> \"(\" S \")\" S | €\n", "()", 6),
            ("S -> A B\nA -> \"a\" | €\nB -> \"b\" B | A\n", "ab", 5),
            ("S -> A | \"x\"\nA -> B | \"a\"\nB -> A | \"b\" S\n", "abx", 4),
            ("S -> A A \"c\" A\nA -> B B | \"a\"\nB -> € | \"b\"\n", "abc", 5),
            ("S -> E\nE -> E \"+\" T | T\nT -> T \"*\" F | F\nF -> \"(\" E \")\" | \"x\"\n", "x+*()", 4),
            ("S -> L\nL -> L L | \"ab\" | €\n", "ab", 6),
        ];

        for (source, alphabet, max_len) in grammars {
            let (cyk, earley) = engines(source);
            for input in strings(alphabet, max_len) {
                assert_eq!(
                    cyk.parse_input(&input),
                    earley.parse_input(&input),
                    "engines disagree on {:?} for {:?}",
                    input.iter().collect::<String>(),
                    source
                );
            }
        }
    }

    #[test]
    fn accepted_trees_yield_their_input() {
        let grammars = vec![
            ("S -> S \"+\" S | \"1\"\n", "1+", 5),
            ("S -> \"(\" S \")\" S | €\n", "()", 6),
            ("S -> A A \"c\" A\nA -> B B | \"a\"\nB -> € | \"b\"\n", "abc", 5),
        ];

        for (source, alphabet, max_len) in grammars {
            let (_, earley) = engines(source);
            for input in strings(alphabet, max_len) {
                if let Ok(tree) = earley.parse_tree(&input) {
                    assert_eq!(tree.yield_string(), Ok(input.iter().collect::<String>()));
                }
            }
        }
    }

    #[test]
    fn failed_init_keeps_grammar() {
        let (mut cyk, mut earley) = engines("S -> \"a\"\n");

        assert_eq!(cyk.init_grammar("S -> B\nB -> B\n"), Err(GrammarError::NonTerminating));
        assert_eq!(earley.init_grammar("S -> B\nB -> B\n"), Err(GrammarError::NonTerminating));
        assert!(cyk.parse_input(&['a']));
        assert!(earley.parse_input(&['a']));
    }
}
