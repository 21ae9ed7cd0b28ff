/*
    This module generates sentences
*/

use std::collections::BTreeMap;

use rand::prelude::*;
use thiserror::Error;
use tracing::trace;

use crate::config::GeneratorConfig;
use crate::grammar::analysis::terminating_rules;
use crate::grammar::*;

#[derive(Debug, Error, PartialEq)]
pub enum GenerateError {
    // An undefined nonterminal was used
    #[error("No definition for nonterminal `{0}`")]
    UndefinedNonterminal(String),
    // A nonterminal has no rules, or none that ever finishes
    #[error("No usable production for nonterminal `{0}`")]
    NoProductions(String),
}

pub type GenResult = Result<String, GenerateError>;

/// Random sentences of a grammar, starting from `S`.
pub struct Generator<'m> {
    manager: &'m GrammarManager,
    config: GeneratorConfig,
    terminating: BTreeMap<Nonterminal, usize>,
    rng: StdRng,
}

impl<'m> Generator<'m> {
    pub fn new(manager: &'m GrammarManager, config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Generator {
            manager,
            terminating: terminating_rules(manager.grammar()),
            config,
            rng,
        }
    }

    pub fn generate(&mut self) -> GenResult {
        let mut sentence = String::new();
        self.generate_nonterminal(START, 0, &mut sentence)?;
        Ok(sentence)
    }

    fn generate_nonterminal(&mut self, n: Nonterminal, depth: usize, out: &mut String) -> Result<(), GenerateError> {
        let rule = self.choose(n, depth)?;
        trace!(nonterminal = %self.manager.name(n), depth, rule = %rule_text(rule, self.manager.names()), "expanding");

        for symbol in rule {
            match symbol {
                Symbol::Terminal(c) => out.push(*c),
                Symbol::Nonterminal(m) => self.generate_nonterminal(*m, depth + 1, out)?,
            }
        }
        Ok(())
    }

    // Past the depth limit only rules known to finish are taken. Before it,
    // the `*>` rules of a nonterminal win with the configured probability.
    fn choose(&mut self, n: Nonterminal, depth: usize) -> Result<&'m Rule, GenerateError> {
        let manager = self.manager;
        let rewrite = manager
            .grammar()
            .get(&n)
            .ok_or_else(|| GenerateError::UndefinedNonterminal(manager.name(n)))?;

        if depth >= self.config.max_depth {
            return self
                .terminating
                .get(&n)
                .and_then(|&index| rewrite.get(index))
                .ok_or_else(|| GenerateError::NoProductions(manager.name(n)));
        }

        let preferred = manager.annotations().preferred(n);
        if !preferred.is_empty() && self.rng.gen_bool(self.config.preferred.clamp(0.0, 1.0)) {
            if let Some(rule) = preferred.choose(&mut self.rng) {
                return Ok(rule);
            }
        }

        rewrite
            .choose(&mut self.rng)
            .ok_or_else(|| GenerateError::NoProductions(manager.name(n)))
    }
}
