/*
    Memoized recursive analyses over the nonterminals of a grammar
*/

use std::collections::{BTreeMap, BTreeSet};

use super::{rules, Grammar, Nonterminal, ProductionTree, Rule, Symbol};

/// Looks up the witness of another nonterminal while a rule is examined.
pub type Resolve<'a, T> = dyn FnMut(Nonterminal) -> Option<T> + 'a;

/// Finds a witness for every nonterminal that has one.
///
/// `witness` is asked about the rules of a nonterminal in order and may
/// resolve the nonterminals of the rule recursively. A nonterminal that is
/// already on the call stack resolves to `None`, which can hide a witness
/// reached through a cycle, so passes are repeated with the witnesses found
/// so far until no new one shows up.
pub fn witnesses<T, F>(grammar: &Grammar, witness: F) -> BTreeMap<Nonterminal, T>
where
    T: Clone,
    F: Fn(Nonterminal, usize, &Rule, &mut Resolve<'_, T>) -> Option<T>,
{
    let mut settled = BTreeMap::new();
    loop {
        let mut visiting = BTreeSet::new();
        let mut memo = BTreeMap::new();
        for &n in grammar.keys() {
            visit(grammar, &witness, n, &settled, &mut visiting, &mut memo);
        }

        let before = settled.len();
        for (n, found) in memo {
            if let Some(found) = found {
                settled.entry(n).or_insert(found);
            }
        }
        if settled.len() == before {
            return settled;
        }
    }
}

fn visit<T, F>(
    grammar: &Grammar,
    witness: &F,
    n: Nonterminal,
    settled: &BTreeMap<Nonterminal, T>,
    visiting: &mut BTreeSet<Nonterminal>,
    memo: &mut BTreeMap<Nonterminal, Option<T>>,
) -> Option<T>
where
    T: Clone,
    F: Fn(Nonterminal, usize, &Rule, &mut Resolve<'_, T>) -> Option<T>,
{
    if let Some(found) = settled.get(&n) {
        return Some(found.clone());
    }
    if let Some(found) = memo.get(&n) {
        return found.clone();
    }
    // cycle guard
    if !visiting.insert(n) {
        return None;
    }

    let mut found = None;
    for (index, rule) in rules(grammar, n).enumerate() {
        let mut resolve = |m| visit(grammar, witness, m, settled, visiting, memo);
        if let Some(result) = witness(n, index, rule, &mut resolve) {
            found = Some(result);
            break;
        }
    }

    visiting.remove(&n);
    memo.insert(n, found.clone());
    found
}

fn as_map(grammar: &Grammar, found: &BTreeMap<Nonterminal, ()>) -> BTreeMap<Nonterminal, bool> {
    grammar.keys().map(|n| (*n, found.contains_key(n))).collect()
}

/// Whether each nonterminal derives at least one string of terminals.
pub fn termination_map(grammar: &Grammar) -> BTreeMap<Nonterminal, bool> {
    let found = witnesses(grammar, |_, _, rule, resolve| {
        rule.iter()
            .all(|symbol| match symbol {
                Symbol::Terminal(_) => true,
                Symbol::Nonterminal(m) => resolve(*m).is_some(),
            })
            .then_some(())
    });
    as_map(grammar, &found)
}

/// Whether each nonterminal derives the empty string.
pub fn nullable_map(grammar: &Grammar) -> BTreeMap<Nonterminal, bool> {
    let found = witnesses(grammar, |_, _, rule, resolve| {
        rule.iter()
            .all(|symbol| match symbol {
                Symbol::Terminal(_) => false,
                Symbol::Nonterminal(m) => resolve(*m).is_some(),
            })
            .then_some(())
    });
    as_map(grammar, &found)
}

pub fn nullable_set(grammar: &Grammar) -> BTreeSet<Nonterminal> {
    nullable_map(grammar)
        .into_iter()
        .filter_map(|(n, nullable)| nullable.then_some(n))
        .collect()
}

/// Index of the first rule of each nonterminal that leads to a finite
/// derivation. Nonterminals that never terminate are absent.
pub fn terminating_rules(grammar: &Grammar) -> BTreeMap<Nonterminal, usize> {
    witnesses(grammar, |_, index, rule, resolve| {
        rule.iter()
            .all(|symbol| match symbol {
                Symbol::Terminal(_) => true,
                Symbol::Nonterminal(m) => resolve(*m).is_some(),
            })
            .then_some(index)
    })
}

/// One concrete derivation of the empty string for every nullable
/// nonterminal.
pub fn null_trees(grammar: &Grammar) -> BTreeMap<Nonterminal, ProductionTree> {
    witnesses(grammar, |n, _, rule, resolve| {
        let mut subtrees = Vec::with_capacity(rule.len());
        for symbol in rule {
            match symbol {
                Symbol::Terminal(_) => return None,
                Symbol::Nonterminal(m) => subtrees.push(resolve(*m)?),
            }
        }
        Some(ProductionTree {
            from: n,
            rule: rule.clone(),
            subtrees,
        })
    })
}
