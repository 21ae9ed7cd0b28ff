use itertools::Itertools;

use super::{Grammar, Nonterminal, Rewrite, Rule, Symbol};

fn get_rule_undefined_symbols<'a>(rule: &'a Rule, grammar: &'a Grammar) -> impl Iterator<Item = Nonterminal> + 'a {
    // Keep the nonterminals of the rule that have no rewrite
    rule.iter()
        .filter_map(Symbol::nonterminal)
        .filter(move |n| !grammar.contains_key(n))
}

fn get_rewrite_undefined_symbols<'a>(rewrite: &'a Rewrite, grammar: &'a Grammar) -> impl Iterator<Item = Nonterminal> + 'a {
    rewrite.iter()
        .flat_map(move |rule| get_rule_undefined_symbols(rule, grammar))
}

/// Every nonterminal that is referenced but not defined, in order of first
/// reference.
pub fn undefined_nonterminals(grammar: &Grammar) -> Vec<Nonterminal> {
    grammar.values()
        .flat_map(|rewrite| get_rewrite_undefined_symbols(rewrite, grammar))
        .unique()
        .collect()
}
