//! One-directional pattern matching and substitution.
//!
//! Matching binds the variables of a pattern to subterms of a concrete term.
//! Symmetric operators are matched in both operand orders. Failure is a plain
//! value, `MatchFailure`, since callers routinely try many candidates.

use std::collections::HashMap;

use crate::expr::{Expr, Name};

pub type Bindings = HashMap<Name, Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFailure;

/// Extends `bindings` so that `subst(pattern, bindings) == term`.
///
/// On failure `bindings` is left untouched.
pub fn match_pattern(
    pattern: &Expr,
    term: &Expr,
    bindings: &mut Bindings,
) -> Result<(), MatchFailure> {
    let mut attempt = bindings.clone();
    match_help(pattern, term, &mut attempt)?;
    *bindings = attempt;
    Ok(())
}

fn match_help(pattern: &Expr, term: &Expr, bindings: &mut Bindings) -> Result<(), MatchFailure> {
    match (pattern, term) {
        (Expr::Var(x), _) => {
            if let Some(bound) = bindings.get(x) {
                if bound != term {
                    return Err(MatchFailure);
                }
            } else {
                bindings.insert(x.clone(), term.clone());
            }
            Ok(())
        }
        (Expr::Int(v1), Expr::Int(v2)) => {
            if v1 == v2 {
                Ok(())
            } else {
                Err(MatchFailure)
            }
        }
        (Expr::True, Expr::True) => Ok(()),
        (Expr::Not(p), Expr::Not(t)) => match_help(p, t, bindings),
        (Expr::Binary(op1, pl, pr), Expr::Binary(op2, tl, tr)) => {
            if op1 != op2 {
                return Err(MatchFailure);
            }
            if !op1.is_symmetric() {
                match_help(pl, tl, bindings)?;
                return match_help(pr, tr, bindings);
            }
            let mut straight = bindings.clone();
            if match_help(pl, tl, &mut straight).is_ok() && match_help(pr, tr, &mut straight).is_ok()
            {
                *bindings = straight;
                return Ok(());
            }
            // the swapped attempt restarts from the original bindings
            let mut swapped = bindings.clone();
            match_help(pl, tr, &mut swapped)?;
            match_help(pr, tl, &mut swapped)?;
            *bindings = swapped;
            Ok(())
        }
        (Expr::Call(f, pargs), Expr::Call(g, targs)) => {
            if f != g || pargs.len() != targs.len() {
                return Err(MatchFailure);
            }
            for (p, t) in pargs.iter().zip(targs) {
                match_help(p, t, bindings)?;
            }
            Ok(())
        }
        _ => Err(MatchFailure),
    }
}

/// Whether `bindings` can be extended so that `subst(pattern, ..) == term`.
pub fn matches(term: &Expr, pattern: &Expr, bindings: &Bindings) -> bool {
    let mut bindings = bindings.clone();
    match_help(pattern, term, &mut bindings).is_ok()
}

/// Binds every free variable of `e` to itself.
pub fn reflexive_bindings(e: &Expr) -> Bindings {
    e.free_vars()
        .into_iter()
        .map(|x| (x.clone(), Expr::Var(x)))
        .collect()
}

/// Source of fresh variable names, unique for the lifetime of one checking
/// context.
#[derive(Debug, Default, Clone)]
pub struct Fresh {
    next: usize,
}

impl Fresh {
    pub fn name(&mut self) -> Name {
        let name = Name::intern(&format!("#x{}", self.next));
        self.next += 1;
        name
    }
}

/// Replaces bound variables. An unbound variable is replaced by a fresh one,
/// which is recorded in `bindings` so later occurrences agree.
pub fn subst(e: &Expr, bindings: &mut Bindings, fresh: &mut Fresh) -> Expr {
    match e {
        Expr::Var(x) => {
            if let Some(bound) = bindings.get(x) {
                return bound.clone();
            }
            let witness = Expr::Var(fresh.name());
            bindings.insert(x.clone(), witness.clone());
            witness
        }
        Expr::Int(_) | Expr::True => e.clone(),
        Expr::Not(inner) => Expr::Not(Box::new(subst(inner, bindings, fresh))),
        Expr::Binary(op, lhs, rhs) => Expr::Binary(
            *op,
            Box::new(subst(lhs, bindings, fresh)),
            Box::new(subst(rhs, bindings, fresh)),
        ),
        Expr::Call(callee, args) => Expr::Call(
            callee.clone(),
            args.iter().map(|arg| subst(arg, bindings, fresh)).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;

    fn x() -> Expr {
        mk_var("x")
    }

    fn y() -> Expr {
        mk_var("y")
    }

    #[test]
    fn variable_binds_once() {
        let pattern = mk_le(x(), x());
        let mut bindings = Bindings::new();
        assert!(match_pattern(&pattern, &mk_le(mk_var("a"), mk_var("a")), &mut bindings).is_ok());
        assert_eq!(bindings[&Name::intern("x")], mk_var("a"));
        assert!(!matches(
            &mk_le(mk_var("a"), mk_var("b")),
            &pattern,
            &Bindings::new()
        ));
    }

    #[test]
    fn symmetric_operators_match_swapped() {
        let pattern = mk_eq(mk_call("max", vec![x(), y()]), y());
        let term = mk_eq(mk_var("b"), mk_call("max", vec![mk_var("a"), mk_var("b")]));
        let mut bindings = Bindings::new();
        match_pattern(&pattern, &term, &mut bindings).expect("swapped match");
        assert_eq!(bindings[&Name::intern("x")], mk_var("a"));
        assert_eq!(bindings[&Name::intern("y")], mk_var("b"));
    }

    #[test]
    fn swapped_attempt_does_not_see_partial_bindings() {
        // straight order binds x := b + 1 before failing; the swapped order
        // must bind x := b from scratch
        let pattern = mk_add(x(), mk_add(x(), y()));
        let term = mk_add(mk_add(mk_var("b"), mk_int(1)), mk_var("b"));
        let mut bindings = Bindings::new();
        match_pattern(&pattern, &term, &mut bindings).expect("swapped match");
        assert_eq!(bindings[&Name::intern("x")], mk_var("b"));
        assert_eq!(bindings[&Name::intern("y")], mk_int(1));
    }

    #[test]
    fn non_symmetric_operators_are_positional() {
        let pattern = mk_le(x(), mk_int(0));
        assert!(!matches(&mk_le(mk_int(0), mk_var("a")), &pattern, &Bindings::new()));
        assert!(matches(&mk_le(mk_var("a"), mk_int(0)), &pattern, &Bindings::new()));
    }

    #[test]
    fn call_arity_mismatch_fails() {
        let pattern = mk_call("max", vec![x(), y()]);
        let term = mk_call("max", vec![mk_var("a")]);
        let mut bindings = Bindings::new();
        assert_eq!(
            match_pattern(&pattern, &term, &mut bindings),
            Err(MatchFailure)
        );
        assert!(bindings.is_empty());
        assert!(!matches(&mk_call("min", vec![x(), y()]), &pattern, &Bindings::new()));
    }

    #[test]
    fn builtin_heads_only_match_themselves() {
        let pattern = mk_subscript(x(), y());
        assert!(!matches(&mk_call("sub", vec![x(), y()]), &pattern, &Bindings::new()));
        assert!(matches(&mk_subscript(mk_var("xs"), mk_int(0)), &pattern, &Bindings::new()));
    }

    #[test]
    fn failed_match_leaves_bindings_untouched() {
        let mut bindings = Bindings::new();
        let pattern = mk_le(x(), mk_int(1));
        let result = match_pattern(&pattern, &mk_le(mk_var("a"), mk_int(2)), &mut bindings);
        assert!(result.is_err());
        assert!(bindings.is_empty());
    }

    #[test]
    fn subst_mints_one_witness_per_variable() {
        let mut fresh = Fresh::default();
        let mut bindings = Bindings::new();
        bindings.insert(Name::intern("x"), mk_int(3));
        let e = subst(&mk_le(x(), mk_add(y(), y())), &mut bindings, &mut fresh);
        let (lhs, rhs) = e.as_binary(BinOp::Le).expect("comparison");
        assert_eq!(lhs, &mk_int(3));
        let (a, b) = rhs.as_binary(BinOp::Add).expect("sum");
        assert_eq!(a, b);
        assert!(matches!(a, Expr::Var(name) if name.is_fresh()));
    }

    #[test]
    fn fresh_names_are_unique() {
        let mut fresh = Fresh::default();
        let a = fresh.name();
        let b = fresh.name();
        assert_ne!(a, b);
    }
}
