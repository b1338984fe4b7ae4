//! Step entailment and proof checking.
//!
//! ```text
//! j ::= (none)              every new conjunct already holds verbatim
//!     | Z                   every new conjunct is an arithmetic tautology
//!     | Z op f              every new conjunct follows arithmetically from f
//!     | Herschrijven met f in k
//!                           every new conjunct is antecedent conjunct k with
//!                           some occurrences rewritten by the equation f
//!     | f                   every new conjunct is an instance of the law
//!                           conclusion f resolves to
//!     | j of j              either justification, per conjunct
//! ```

use thiserror::Error;

use crate::arith::{entails, is_tautology};
use crate::expr::{BinOp, Expr};
use crate::law::{FactSpec, LawTable, Resolver};
use crate::lex::SourceInfo;
use crate::matching::{matches, Bindings, Fresh};
use crate::rewrite::rewrite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Justification {
    None,
    ArithmeticFact(Option<FactSpec>),
    /// equation, 1-based index of the antecedent conjunct to rewrite
    Rewrite(FactSpec, usize),
    LawApplication(FactSpec),
    Alternative(Box<Justification>, Box<Justification>),
}

#[derive(Debug, Clone)]
pub struct ProofStep {
    /// the whole `assert` line
    pub source_info: SourceInfo,
    pub expr: Expr,
    pub justification: Justification,
    /// the text after `#`, if any
    pub justification_info: Option<SourceInfo>,
}

#[derive(Debug, Clone)]
pub struct Proof {
    pub source_info: SourceInfo,
    pub steps: Vec<ProofStep>,
}

#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// The justification itself is malformed.
    #[error("{0}")]
    Structural(String),
    #[error("conjunct not proved: {conjunct}{}", fmt_details(.details))]
    Unproved {
        conjunct: Expr,
        details: Vec<String>,
    },
}

fn fmt_details(details: &[String]) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" ({})", details.join("; "))
    }
}

impl StepError {
    fn unproved(conjunct: &Expr) -> StepError {
        StepError::Unproved {
            conjunct: conjunct.clone(),
            details: vec![],
        }
    }

    fn into_details(self) -> Vec<String> {
        match self {
            StepError::Structural(message) => vec![message],
            StepError::Unproved { details, .. } => details,
        }
    }
}

/// A failed step together with where to report it.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct ProofError {
    pub error: StepError,
    pub source_info: SourceInfo,
}

/// A justification resolved against one antecedent, ready to be asked about
/// each new conjunct.
#[derive(Debug)]
enum Checker {
    Identity,
    Tautology,
    Entailed(Expr),
    Rewritten(Vec<Expr>),
    Conclusion { bindings: Bindings, conclusion: Expr },
    Either(Result<Box<Checker>, StepError>, Result<Box<Checker>, StepError>),
}

impl Checker {
    fn prepare(
        justification: &Justification,
        resolver: &Resolver<'_>,
        fresh: &mut Fresh,
    ) -> Result<Checker, StepError> {
        match justification {
            Justification::None => Ok(Checker::Identity),
            Justification::ArithmeticFact(None) => Ok(Checker::Tautology),
            Justification::ArithmeticFact(Some(spec)) => {
                Ok(Checker::Entailed(resolver.resolve_closed(spec, fresh)?))
            }
            Justification::Rewrite(spec, index) => {
                let fact = resolver.resolve(spec, fresh)?;
                let Some((lhs, rhs)) = fact.term.as_binary(BinOp::Eq) else {
                    return Err(StepError::Structural(format!(
                        "cannot rewrite with {}: not an equality",
                        fact.term
                    )));
                };
                let target = resolver.conjunct(*index)?;
                Ok(Checker::Rewritten(rewrite(
                    target,
                    &fact.bindings,
                    lhs,
                    rhs,
                    fresh,
                )))
            }
            Justification::LawApplication(spec) => {
                let fact = resolver.resolve(spec, fresh)?;
                Ok(Checker::Conclusion {
                    bindings: fact.bindings,
                    conclusion: fact.term,
                })
            }
            Justification::Alternative(first, second) => {
                let first = Checker::prepare(first, resolver, fresh).map(Box::new);
                let second = Checker::prepare(second, resolver, fresh).map(Box::new);
                match (first, second) {
                    (Err(e1), Err(e2)) => {
                        let mut messages = e1.into_details();
                        messages.extend(e2.into_details());
                        Err(StepError::Structural(messages.join("; ")))
                    }
                    (first, second) => Ok(Checker::Either(first, second)),
                }
            }
        }
    }

    fn check(&self, conjunct: &Expr) -> Result<(), StepError> {
        match self {
            Checker::Identity => Err(StepError::unproved(conjunct)),
            Checker::Tautology => {
                if is_tautology(conjunct) {
                    Ok(())
                } else {
                    Err(StepError::unproved(conjunct))
                }
            }
            Checker::Entailed(fact) => {
                if entails(conjunct, fact) {
                    Ok(())
                } else {
                    Err(StepError::unproved(conjunct))
                }
            }
            Checker::Rewritten(candidates) => {
                // only freshly minted witnesses may stand for anything
                let found = candidates.iter().any(|candidate| {
                    let rigid: Bindings = candidate
                        .free_vars()
                        .into_iter()
                        .filter(|x| !x.is_fresh())
                        .map(|x| (x.clone(), Expr::Var(x)))
                        .collect();
                    matches(conjunct, candidate, &rigid)
                });
                if found {
                    Ok(())
                } else {
                    let shown = candidates
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    Err(StepError::Unproved {
                        conjunct: conjunct.clone(),
                        details: vec![format!("rewrites = [{shown}]")],
                    })
                }
            }
            Checker::Conclusion {
                bindings,
                conclusion,
            } => {
                if matches(conjunct, conclusion, bindings) {
                    Ok(())
                } else {
                    Err(StepError::unproved(conjunct))
                }
            }
            Checker::Either(first, second) => {
                let attempt = |branch: &Result<Box<Checker>, StepError>| match branch {
                    Ok(checker) => checker.check(conjunct),
                    Err(e) => Err(e.clone()),
                };
                let e1 = match attempt(first) {
                    Ok(()) => return Ok(()),
                    Err(e) => e,
                };
                let e2 = match attempt(second) {
                    Ok(()) => return Ok(()),
                    Err(e) => e,
                };
                let mut details = e1.into_details();
                details.extend(e2.into_details());
                Err(StepError::Unproved {
                    conjunct: conjunct.clone(),
                    details,
                })
            }
        }
    }
}

/// Checks that every conjunct of `consequent` missing from `antecedent`
/// follows under `justification`. Stops at the first unproved conjunct.
pub fn check_entailment(
    antecedent: &[Expr],
    consequent: &[Expr],
    justification: &Justification,
    laws: &LawTable,
    fresh: &mut Fresh,
) -> Result<(), StepError> {
    let resolver = Resolver::new(laws, antecedent);
    let checker = Checker::prepare(justification, &resolver, fresh)?;
    for conjunct in consequent {
        if antecedent.contains(conjunct) {
            continue;
        }
        checker.check(conjunct)?;
    }
    Ok(())
}

/// Folds over the steps, each step's conjuncts becoming the next antecedent.
pub fn check_proof(proof: &Proof, laws: &LawTable, fresh: &mut Fresh) -> Result<(), ProofError> {
    let Some((first, rest)) = proof.steps.split_first() else {
        return Err(ProofError {
            error: StepError::Structural("a proof needs at least one assert".to_owned()),
            source_info: proof.source_info.clone(),
        });
    };
    let mut antecedent = first.expr.conjuncts();
    for step in rest {
        let consequent = step.expr.conjuncts();
        log::debug!(
            "line {}: {} # {}",
            step.source_info.line_column().0,
            step.expr,
            step.justification
        );
        if let Err(error) =
            check_entailment(&antecedent, &consequent, &step.justification, laws, fresh)
        {
            let source_info = match &error {
                StepError::Structural(_) => step
                    .justification_info
                    .clone()
                    .unwrap_or_else(|| step.source_info.clone()),
                StepError::Unproved { .. } => step.source_info.clone(),
            };
            return Err(ProofError { error, source_info });
        }
        antecedent = consequent;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;
    use crate::law::FactSpec::{AntecedentRef, LawRef};

    fn i() -> Expr {
        mk_var("i")
    }

    fn n() -> Expr {
        mk_var("n")
    }

    fn laws() -> LawTable {
        let (x, y) = (mk_var("x"), mk_var("y"));
        let mut laws = LawTable::default();
        laws.add(
            Name::intern("LeAntisym"),
            &mk_implies(
                mk_and(mk_le(x.clone(), y.clone()), mk_le(y.clone(), x.clone())),
                mk_eq(x.clone(), y.clone()),
            ),
        );
        laws.add(
            Name::intern("Max2"),
            &mk_implies(
                mk_le(x.clone(), y.clone()),
                mk_eq(mk_call("max", vec![x.clone(), y.clone()]), y.clone()),
            ),
        );
        laws
    }

    fn check(antecedent: &[Expr], consequent: &[Expr], j: &Justification) -> Result<(), StepError> {
        check_entailment(antecedent, consequent, j, &laws(), &mut Fresh::default())
    }

    #[test]
    fn identity_step() {
        let a = vec![mk_eq(i(), mk_int(0)), mk_le(mk_int(0), n())];
        assert!(check(&a, &a, &Justification::None).is_ok());
        assert!(check(&a, &a[..1], &Justification::None).is_ok());
        let err = check(&a, &[mk_le(i(), n())], &Justification::None).expect_err("unproved");
        assert!(matches!(err, StepError::Unproved { .. }));
    }

    #[test]
    fn arithmetic_without_fact_needs_tautologies() {
        let a = vec![mk_eq(i(), mk_int(0))];
        let c = vec![mk_eq(i(), mk_int(0)), mk_le(mk_int(1), mk_add(mk_int(0), mk_int(1)))];
        assert!(check(&a, &c, &Justification::ArithmeticFact(None)).is_ok());
        let err = check(&a, &[mk_eq(i(), mk_int(2))], &Justification::ArithmeticFact(None))
            .expect_err("unproved");
        insta::assert_snapshot!(err.to_string(), @"conjunct not proved: i == 2");
    }

    #[test]
    fn arithmetic_from_antecedent_conjunct() {
        let a = vec![mk_le(i(), n()), mk_lt(i(), n())];
        let c = vec![mk_le(mk_add(i(), mk_int(1)), n())];
        let j = Justification::ArithmeticFact(Some(AntecedentRef(2)));
        assert!(check(&a, &c, &j).is_ok());
        let j = Justification::ArithmeticFact(Some(AntecedentRef(1)));
        assert!(check(&a, &c, &j).is_err());
    }

    #[test]
    fn rewrite_with_antecedent_equation() {
        let a = vec![mk_le(mk_int(0), n()), mk_eq(i(), mk_int(0))];
        let c = vec![mk_le(i(), n())];
        assert!(check(&a, &c, &Justification::Rewrite(AntecedentRef(2), 1)).is_ok());
    }

    #[test]
    fn rewrite_candidates_do_not_generalize_user_variables() {
        let a = vec![mk_le(mk_int(0), n()), mk_eq(i(), mk_int(0))];
        let c = vec![mk_le(mk_int(5), n())];
        let err = check(&a, &c, &Justification::Rewrite(AntecedentRef(2), 1))
            .expect_err("5 is not i");
        insta::assert_snapshot!(err.to_string(), @"conjunct not proved: 5 <= n (rewrites = [0 <= n, i <= n])");
    }

    #[test]
    fn rewrite_with_inequality_is_structural() {
        let a = vec![mk_eq(i(), mk_int(0)), mk_le(mk_int(1), mk_add(mk_int(0), mk_int(1)))];
        let c = vec![mk_le(mk_int(1), mk_add(i(), mk_int(1)))];
        let err = check(&a, &c, &Justification::Rewrite(AntecedentRef(2), 1))
            .expect_err("not an equality");
        insta::assert_snapshot!(err.to_string(), @"cannot rewrite with 1 <= 0 + 1: not an equality");
        assert!(check(&a, &c, &Justification::Rewrite(AntecedentRef(1), 2)).is_ok());
    }

    #[test]
    fn bad_justification_fails_even_without_new_conjuncts() {
        let a = vec![mk_eq(i(), mk_int(0)), mk_le(mk_int(0), n())];
        let err = check(&a, &a, &Justification::Rewrite(AntecedentRef(1), 5))
            .expect_err("index out of range");
        assert!(matches!(err, StepError::Structural(_)));
    }

    #[test]
    fn law_application() {
        let a = vec![mk_le(i(), n()), mk_le(n(), i())];
        let j = Justification::LawApplication(LawRef(
            Name::intern("LeAntisym"),
            vec![AntecedentRef(1), AntecedentRef(2)],
        ));
        assert!(check(&a, &[mk_eq(i(), n())], &j).is_ok());
        assert!(check(&a, &[mk_eq(n(), i())], &j).is_ok());
        assert!(check(&a, &[mk_eq(i(), mk_int(0))], &j).is_err());
    }

    #[test]
    fn alternative_recovers_from_structural_failure() {
        let a = vec![mk_lt(i(), n())];
        let c = vec![mk_le(i(), n())];
        let j = Justification::Alternative(
            Box::new(Justification::LawApplication(LawRef(
                Name::intern("Unknown"),
                vec![],
            ))),
            Box::new(Justification::ArithmeticFact(Some(AntecedentRef(1)))),
        );
        assert!(check(&a, &c, &j).is_ok());
    }

    #[test]
    fn alternative_reports_both_failures() {
        let a = vec![mk_lt(i(), n())];
        let c = vec![mk_eq(i(), n())];
        let j = Justification::Alternative(
            Box::new(Justification::LawApplication(LawRef(
                Name::intern("Unknown"),
                vec![],
            ))),
            Box::new(Justification::Rewrite(AntecedentRef(1), 1)),
        );
        let err = check(&a, &c, &j).expect_err("both fail");
        insta::assert_snapshot!(err.to_string(), @"no such law: Unknown; cannot rewrite with i < n: not an equality");
        let j = Justification::Alternative(
            Box::new(Justification::LawApplication(LawRef(
                Name::intern("Unknown"),
                vec![],
            ))),
            Box::new(Justification::ArithmeticFact(None)),
        );
        let err = check(&a, &c, &j).expect_err("both fail");
        insta::assert_snapshot!(err.to_string(), @"conjunct not proved: i == n (no such law: Unknown)");
    }
}
