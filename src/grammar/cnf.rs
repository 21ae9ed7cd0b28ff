/*
    Conversion of a grammar into Chomsky Normal Form
*/

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::analysis::nullable_set;
use super::cleanup::remove_useless_rules;
use super::{rules, symbols_mut, Grammar, NameTable, Nonterminal, Rewrite, Rule, Symbol, Terminal, START};

/// Converts a terminating grammar without undefined nonterminals into CNF.
///
/// Every rule of the result is either one terminal or two nonterminals,
/// except that `S` may also have an empty rule. Fresh nonterminals are
/// registered in `names`.
pub fn to_cnf(grammar: &Grammar, names: &mut NameTable) -> Grammar {
    names.reserve_above(grammar);
    let mut converter = Converter {
        grammar: grammar.clone(),
        names,
    };

    converter.isolate_start();
    converter.isolate_terminals();
    converter.binarize();
    converter.eliminate_epsilon();
    converter.eliminate_unit_rules();

    converter.grammar
}

struct Converter<'a> {
    grammar: Grammar,
    names: &'a mut NameTable,
}

impl Converter<'_> {
    // S takes the single rule S -> S', and S' every former rule and use of S
    fn isolate_start(&mut self) {
        let hint = format!("{}'", self.names.name(START));
        let fresh = self.names.fresh(&hint);

        let rewrite = self.grammar.remove(&START).unwrap_or_default();
        self.grammar.insert(fresh, rewrite);
        for symbol in symbols_mut(&mut self.grammar) {
            if *symbol == Symbol::Nonterminal(START) {
                *symbol = Symbol::Nonterminal(fresh);
            }
        }
        self.grammar.insert(START, vec![vec![Symbol::Nonterminal(fresh)]]);
        trace!(start = %self.names.name(fresh), "isolated start symbol");
    }

    // Terminals in rules longer than one symbol become a nonterminal deriving
    // only that terminal, one per distinct character
    fn isolate_terminals(&mut self) {
        let mut isolated: BTreeMap<Terminal, Nonterminal> = BTreeMap::new();
        let names = &mut *self.names;

        for rule in self.grammar.values_mut().flatten() {
            if rule.len() <= 1 {
                continue;
            }
            for symbol in rule.iter_mut() {
                if let Symbol::Terminal(c) = *symbol {
                    let n = *isolated
                        .entry(c)
                        .or_insert_with(|| names.fresh(&format!("<{}>", c.escape_default())));
                    *symbol = Symbol::Nonterminal(n);
                }
            }
        }

        for (c, n) in isolated {
            self.grammar.insert(n, vec![vec![Symbol::Terminal(c)]]);
        }
    }

    // A -> X1 X2 ... Xn becomes A -> X1 Y, Y -> X2 ... Xn until no rule is
    // longer than two symbols
    fn binarize(&mut self) {
        let mut pending: Vec<Nonterminal> = self.grammar.keys().copied().collect();

        while let Some(n) = pending.pop() {
            let hint = format!("{}.", self.names.name(n));
            let Some(rewrite) = self.grammar.get_mut(&n) else {
                continue;
            };

            let mut created: Vec<(Nonterminal, Rule)> = Vec::new();
            for rule in rewrite.iter_mut().filter(|rule| rule.len() > 2) {
                let tail = rule.split_off(1);
                let fresh = self.names.fresh(&hint);
                rule.push(Symbol::Nonterminal(fresh));
                created.push((fresh, tail));
            }

            for (fresh, tail) in created {
                self.grammar.insert(fresh, vec![tail]);
                pending.push(fresh);
            }
        }
    }

    // Removes every empty rule except the one of S, adding the rules that
    // skip over the nullable nonterminals instead
    fn eliminate_epsilon(&mut self) {
        remove_useless_rules(&mut self.grammar);

        while self.has_inner_epsilon() {
            let nullable = nullable_set(&self.grammar);
            trace!(?nullable, "eliminating epsilon rules");

            for rewrite in self.grammar.values_mut() {
                // rules added here are examined as well
                let mut index = 0;
                while index < rewrite.len() {
                    for derived in skip_nullable(&rewrite[index], &nullable) {
                        if !rewrite.contains(&derived) {
                            rewrite.push(derived);
                        }
                    }
                    index += 1;
                }
            }

            for (n, rewrite) in self.grammar.iter_mut() {
                if *n != START {
                    rewrite.retain(|rule| !rule.is_empty());
                }
            }
            remove_useless_rules(&mut self.grammar);
        }
    }

    fn has_inner_epsilon(&self) -> bool {
        self.grammar
            .iter()
            .any(|(n, rewrite)| *n != START && rewrite.iter().any(Rule::is_empty))
    }

    // A -> B is replaced by the rules of B, and of everything B reaches
    // through unit rules
    fn eliminate_unit_rules(&mut self) {
        let inlined: Grammar = self
            .grammar
            .keys()
            .map(|&n| {
                let mut rewrite = Rewrite::new();
                for m in unit_closure(&self.grammar, n) {
                    for rule in rules(&self.grammar, m).filter(|rule| !is_unit(rule)) {
                        if !rewrite.contains(rule) {
                            rewrite.push(rule.clone());
                        }
                    }
                }
                (n, rewrite)
            })
            .collect();

        self.grammar = inlined;
        remove_useless_rules(&mut self.grammar);
    }
}

// The rules obtained from `rule` by leaving out nullable nonterminals, for
// rules of at most two symbols
fn skip_nullable(rule: &Rule, nullable: &BTreeSet<Nonterminal>) -> Vec<Rule> {
    let is_nullable = |symbol: &Symbol| matches!(symbol, Symbol::Nonterminal(n) if nullable.contains(n));

    match rule.as_slice() {
        [single] if is_nullable(single) => vec![Rule::new()],
        [first, second] => {
            let mut derived = Vec::new();
            if is_nullable(first) {
                derived.push(vec![*second]);
            }
            if is_nullable(second) {
                derived.push(vec![*first]);
            }
            if is_nullable(first) && is_nullable(second) {
                derived.push(Rule::new());
            }
            derived
        }
        _ => Vec::new(),
    }
}

fn is_unit(rule: &Rule) -> bool {
    matches!(rule.as_slice(), [Symbol::Nonterminal(_)])
}

// Nonterminals reachable from `n` through unit rules, `n` first. Each one is
// listed once, so unit cycles end.
fn unit_closure(grammar: &Grammar, n: Nonterminal) -> Vec<Nonterminal> {
    let mut closure = vec![n];
    let mut index = 0;
    while let Some(&m) = closure.get(index) {
        for rule in rules(grammar, m) {
            if let [Symbol::Nonterminal(target)] = rule.as_slice() {
                if !closure.contains(target) {
                    closure.push(*target);
                }
            }
        }
        index += 1;
    }
    closure
}

/// Whether every rule is one terminal, two nonterminals, or the empty rule
/// of `S`.
pub fn is_cnf(grammar: &Grammar) -> bool {
    grammar.iter().all(|(n, rewrite)| {
        rewrite.iter().all(|rule| match rule.as_slice() {
            [] => *n == START,
            [Symbol::Terminal(_)] => true,
            [Symbol::Nonterminal(_), Symbol::Nonterminal(_)] => true,
            _ => false,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::analysis::termination_map;
    use crate::grammar::tests::{grammar, n, t};

    fn converter(g: &Grammar, names: &mut NameTable) -> Grammar {
        to_cnf(g, names)
    }

    #[test]
    fn start_isolation() {
        // S -> 'a' S | 'b'
        let mut names = NameTable::new();
        names.reserve_above(&grammar(vec![(START, vec![])]));
        let mut c = Converter {
            grammar: grammar(vec![(START, vec![vec![t('a'), n(START)], vec![t('b')]])]),
            names: &mut names,
        };
        c.isolate_start();

        assert_eq!(c.grammar, grammar(vec![
            (START, vec![vec![n(1)]]),
            (1, vec![vec![t('a'), n(1)], vec![t('b')]]),
        ]));
        assert_eq!(names.name(1), "S'");
    }

    #[test]
    fn terminal_isolation_shares_nonterminals() {
        // S -> 'a' 'b' | 'a' | A 'a' ; A -> 'b'
        let mut names = NameTable::new();
        let a = names.intern("A");
        let mut c = Converter {
            grammar: grammar(vec![
                (START, vec![vec![t('a'), t('b')], vec![t('a')], vec![n(a), t('a')]]),
                (a, vec![vec![t('b')]]),
            ]),
            names: &mut names,
        };
        c.isolate_terminals();

        assert_eq!(c.grammar, grammar(vec![
            (START, vec![vec![n(2), n(3)], vec![t('a')], vec![n(a), n(2)]]),
            (a, vec![vec![t('b')]]),
            (2, vec![vec![t('a')]]),
            (3, vec![vec![t('b')]]),
        ]));
    }

    #[test]
    fn binarization() {
        // S -> A A A A ; A -> 'a'
        let mut names = NameTable::new();
        let a = names.intern("A");
        let mut c = Converter {
            grammar: grammar(vec![(START, vec![vec![n(a), n(a), n(a), n(a)]]), (a, vec![vec![t('a')]])]),
            names: &mut names,
        };
        c.binarize();

        assert!(c.grammar.values().flatten().all(|rule| rule.len() <= 2));
        assert_eq!(c.grammar.len(), 4);
        assert_eq!(c.grammar[&START], vec![vec![n(a), n(2)]]);
    }

    #[test]
    fn epsilon_only_left_on_start() {
        // S -> A B ; A -> 'a' | € ; B -> A A | 'b'
        let mut names = NameTable::new();
        let g = grammar(vec![
            (START, vec![vec![n(1), n(2)]]),
            (1, vec![vec![t('a')], vec![]]),
            (2, vec![vec![n(1), n(1)], vec![t('b')]]),
        ]);
        let cnf = converter(&g, &mut names);

        assert!(is_cnf(&cnf));
        assert!(cnf[&START].contains(&vec![]));
    }

    #[test]
    fn unit_cycles_are_resolved() {
        // S -> A | 'x' ; A -> B | 'a' ; B -> A | 'b' S
        let mut names = NameTable::new();
        let g = grammar(vec![
            (START, vec![vec![n(1)], vec![t('x')]]),
            (1, vec![vec![n(2)], vec![t('a')]]),
            (2, vec![vec![n(1)], vec![t('b'), n(START)]]),
        ]);
        let cnf = converter(&g, &mut names);

        assert!(is_cnf(&cnf));
        assert!(cnf[&START].contains(&vec![t('x')]));
        assert!(cnf[&START].contains(&vec![t('a')]));
        assert!(!cnf[&START].contains(&vec![]));
    }

    #[test]
    fn unit_cycle_members_get_every_rule() {
        // S -> A ; A -> B | 'a' ; B -> C | 'b' ; C -> A | 'c'
        let mut names = NameTable::new();
        let g = grammar(vec![
            (START, vec![vec![n(1)]]),
            (1, vec![vec![n(2)], vec![t('a')]]),
            (2, vec![vec![n(3)], vec![t('b')]]),
            (3, vec![vec![n(1)], vec![t('c')]]),
        ]);
        let cnf = converter(&g, &mut names);

        assert_eq!(cnf, grammar(vec![(START, vec![vec![t('a')], vec![t('b')], vec![t('c')]])]));
    }

    #[test]
    fn unit_closure_stops_on_cycles() {
        let g = grammar(vec![
            (START, vec![vec![n(1)], vec![t('x')]]),
            (1, vec![vec![n(2)]]),
            (2, vec![vec![n(1)], vec![n(START)]]),
        ]);
        assert_eq!(unit_closure(&g, 1), vec![1, 2, START]);
    }

    #[test]
    fn cnf_shape_holds() {
        let sources = vec![
            grammar(vec![(START, vec![vec![n(1)]]), (1, vec![vec![t('a'), n(1)], vec![]])]),
            grammar(vec![(START, vec![vec![n(START), t('+'), n(START)], vec![t('1')]])]),
            grammar(vec![(START, vec![vec![t('a'), n(START), t('b')], vec![]])]),
            grammar(vec![
                (START, vec![vec![t('('), n(START), t(')'), n(START)], vec![]]),
            ]),
            grammar(vec![
                (START, vec![vec![n(1), n(2), n(1), t('c')]]),
                (1, vec![vec![n(2)], vec![]]),
                (2, vec![vec![n(1)], vec![t('d'), t('d')]]),
            ]),
        ];

        for g in sources {
            let mut names = NameTable::new();
            let cnf = converter(&g, &mut names);

            assert!(is_cnf(&cnf), "not in CNF: {:?}", cnf);
            assert!(termination_map(&cnf).values().all(|terminates| *terminates));
        }
    }

    #[test]
    fn conversion_leaves_input_untouched() {
        let g = grammar(vec![(START, vec![vec![t('a'), n(START), t('b')], vec![]])]);
        let copy = g.clone();
        let mut names = NameTable::new();
        let _ = to_cnf(&g, &mut names);

        assert_eq!(g, copy);
    }
}
