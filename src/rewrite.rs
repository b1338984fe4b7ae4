use indexmap::IndexSet;

use crate::expr::Expr;
use crate::matching::{match_pattern, subst, Bindings, Fresh};

/// All terms reachable from `target` by replacing subterms that match one
/// side of the equation `lhs == rhs` with the other side, at any set of
/// positions. `target` itself is always included.
pub fn rewrite(
    target: &Expr,
    bindings: &Bindings,
    lhs: &Expr,
    rhs: &Expr,
    fresh: &mut Fresh,
) -> Vec<Expr> {
    let candidates = rewrites(target, bindings, lhs, rhs, fresh);
    log::trace!("{} rewrite candidates for {target}", candidates.len());
    candidates.into_iter().collect()
}

fn rewrites(
    e: &Expr,
    bindings: &Bindings,
    lhs: &Expr,
    rhs: &Expr,
    fresh: &mut Fresh,
) -> IndexSet<Expr> {
    let mut acc = IndexSet::new();
    acc.insert(e.clone());
    for (from, to) in [(lhs, rhs), (rhs, lhs)] {
        let mut extended = bindings.clone();
        if match_pattern(from, e, &mut extended).is_ok() {
            acc.insert(subst(to, &mut extended, fresh));
        }
    }
    match e {
        Expr::Var(_) | Expr::Int(_) | Expr::True => {}
        Expr::Not(inner) => {
            for inner in rewrites(inner, bindings, lhs, rhs, fresh) {
                acc.insert(Expr::Not(Box::new(inner)));
            }
        }
        Expr::Binary(op, l, r) => {
            let ls = rewrites(l, bindings, lhs, rhs, fresh);
            let rs = rewrites(r, bindings, lhs, rhs, fresh);
            for l in &ls {
                for r in &rs {
                    acc.insert(Expr::Binary(*op, Box::new(l.clone()), Box::new(r.clone())));
                }
            }
        }
        Expr::Call(callee, args) => {
            let mut tuples: Vec<Vec<Expr>> = vec![vec![]];
            for arg in args {
                let choices = rewrites(arg, bindings, lhs, rhs, fresh);
                let mut next = Vec::with_capacity(tuples.len() * choices.len());
                for prefix in &tuples {
                    for choice in &choices {
                        let mut tuple = prefix.clone();
                        tuple.push(choice.clone());
                        next.push(tuple);
                    }
                }
                tuples = next;
            }
            for args in tuples {
                acc.insert(Expr::Call(callee.clone(), args));
            }
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;
    use crate::matching::{matches, reflexive_bindings};

    #[test]
    fn rewrites_constant_back_to_variable() {
        // i == 0 used right to left inside 1 <= 0 + 1
        let eq_lhs = mk_var("i");
        let eq_rhs = mk_int(0);
        let bindings = reflexive_bindings(&mk_eq(eq_lhs.clone(), eq_rhs.clone()));
        let target = mk_le(mk_int(1), mk_add(mk_int(0), mk_int(1)));
        let mut fresh = Fresh::default();
        let out = rewrite(&target, &bindings, &eq_lhs, &eq_rhs, &mut fresh);
        assert_eq!(out[0], target);
        assert!(out.contains(&mk_le(mk_int(1), mk_add(mk_var("i"), mk_int(1)))));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn rewrites_every_combination_of_positions() {
        let eq_lhs = mk_var("a");
        let eq_rhs = mk_var("b");
        let bindings = reflexive_bindings(&mk_eq(eq_lhs.clone(), eq_rhs.clone()));
        let target = mk_call("f", vec![mk_var("a"), mk_var("a")]);
        let mut fresh = Fresh::default();
        let out = rewrite(&target, &bindings, &eq_lhs, &eq_rhs, &mut fresh);
        for (x, y) in [("a", "a"), ("a", "b"), ("b", "a"), ("b", "b")] {
            assert!(out.contains(&mk_call("f", vec![mk_var(x), mk_var(y)])));
        }
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn law_patterns_bind_during_rewriting() {
        // xs[:len(xs)] == xs with no premises
        let xs = mk_var("xs");
        let eq_lhs = mk_slice(xs.clone(), mk_int(0), mk_call("len", vec![xs.clone()]));
        let eq_rhs = xs;
        let ys = mk_var("ys");
        let target = mk_eq(
            mk_var("m"),
            mk_call(
                "max",
                vec![mk_slice(ys.clone(), mk_int(0), mk_call("len", vec![ys.clone()]))],
            ),
        );
        let mut fresh = Fresh::default();
        let out = rewrite(&target, &Bindings::new(), &eq_lhs, &eq_rhs, &mut fresh);
        assert!(out.contains(&mk_eq(mk_var("m"), mk_call("max", vec![ys]))));
    }

    #[test]
    fn direction_of_the_equation_does_not_matter() {
        let eq_lhs = mk_var("n");
        let eq_rhs = mk_add(mk_var("i"), mk_int(1));
        let bindings = reflexive_bindings(&mk_eq(eq_lhs.clone(), eq_rhs.clone()));
        let target = mk_le(mk_var("n"), mk_add(mk_var("i"), mk_int(1)));
        let mut fresh = Fresh::default();
        let forward = rewrite(&target, &bindings, &eq_lhs, &eq_rhs, &mut fresh);
        let backward = rewrite(&target, &bindings, &eq_rhs, &eq_lhs, &mut fresh);
        for candidate in &backward {
            assert!(forward.contains(candidate));
        }
        let goal = mk_le(mk_var("n"), mk_var("n"));
        assert!(forward
            .iter()
            .any(|candidate| matches(&goal, candidate, &reflexive_bindings(candidate))));
    }
}
