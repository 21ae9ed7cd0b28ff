/*
    Removal of useless nonterminals and rules
*/

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use itertools::Itertools;

use super::analysis::termination_map;
use super::{rules, symbols_mut, Grammar, Nonterminal, Rewrite, Symbol, START};

/// Cleans `grammar` until a pass changes nothing: drops nonterminals that
/// never terminate or are unreachable from `S`, the rules that use them,
/// duplicate rules, and merges nonterminals with the same set of rules.
pub fn remove_useless_rules(grammar: &mut Grammar) {
    loop {
        let next = cleanup_step(grammar);
        if next == *grammar {
            return;
        }
        *grammar = next;
    }
}

fn cleanup_step(grammar: &Grammar) -> Grammar {
    let mut result = grammar.clone();

    remove_doomed(&mut result);
    remove_unreachable(&mut result);
    for rewrite in result.values_mut() {
        *rewrite = std::mem::take(rewrite).into_iter().unique().collect();
    }
    merge_equivalent(&mut result);

    result
}

// Every rule repeats the nonterminal itself and nothing else
fn is_self_replicating(n: Nonterminal, rewrite: &Rewrite) -> bool {
    rewrite.iter().all(|rule| {
        !rule.is_empty() && rule.iter().all(|symbol| *symbol == Symbol::Nonterminal(n))
    })
}

fn remove_doomed(grammar: &mut Grammar) {
    let termination = termination_map(grammar);
    let mut doomed: BTreeSet<Nonterminal> = grammar
        .iter()
        .filter(|(n, rewrite)| is_self_replicating(**n, rewrite) || !termination[*n])
        .map(|(n, _)| *n)
        .collect();

    // Rules using a doomed nonterminal go, which can leave more nonterminals
    // without rules
    let mut changed = true;
    while changed {
        changed = false;
        for (n, rewrite) in grammar.iter_mut() {
            if *n != START && doomed.contains(n) {
                continue;
            }
            let before = rewrite.len();
            rewrite.retain(|rule| {
                !rule.iter().any(|symbol| matches!(symbol, Symbol::Nonterminal(m) if doomed.contains(m)))
            });
            changed |= rewrite.len() != before;
            if rewrite.is_empty() && doomed.insert(*n) {
                changed = true;
            }
        }
    }

    grammar.retain(|n, _| *n == START || !doomed.contains(n));
}

fn remove_unreachable(grammar: &mut Grammar) {
    let mut reachable = BTreeSet::new();
    let mut queue = VecDeque::from([START]);

    while let Some(n) = queue.pop_front() {
        if !grammar.contains_key(&n) || !reachable.insert(n) {
            continue;
        }
        queue.extend(rules(grammar, n).flatten().filter_map(Symbol::nonterminal));
    }

    grammar.retain(|n, _| reachable.contains(n));
}

// Nonterminals other than `S` with equal rule sets are merged into the one
// with the smallest id
fn merge_equivalent(grammar: &mut Grammar) {
    let rule_sets: Vec<(Nonterminal, BTreeSet<_>)> = grammar
        .iter()
        .filter(|(n, _)| **n != START)
        .map(|(n, rewrite)| (*n, rewrite.iter().collect()))
        .collect();

    let mut replaced: BTreeMap<Nonterminal, Nonterminal> = BTreeMap::new();
    for (i, (keep, keep_rules)) in rule_sets.iter().enumerate() {
        if replaced.contains_key(keep) {
            continue;
        }
        for (other, other_rules) in &rule_sets[i + 1..] {
            if !replaced.contains_key(other) && keep_rules == other_rules {
                replaced.insert(*other, *keep);
            }
        }
    }

    if replaced.is_empty() {
        return;
    }
    grammar.retain(|n, _| !replaced.contains_key(n));
    for symbol in symbols_mut(grammar) {
        if let Symbol::Nonterminal(n) = symbol {
            if let Some(keep) = replaced.get(&*n) {
                *n = *keep;
            }
        }
    }
}
