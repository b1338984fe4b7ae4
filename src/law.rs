use std::collections::HashMap;

use crate::expr::{BinOp, Expr, Name};
use crate::matching::{match_pattern, reflexive_bindings, subst, Bindings, Fresh};
use crate::proof::StepError;

/// A derived inference rule: `p₁ and ⋯ and pₙ ==> conclusion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Law {
    pub premises: Vec<Expr>,
    pub conclusion: Expr,
}

impl Law {
    /// Peels `==>` left to right. `A and B ==> C ==> D` has premises
    /// `[A, B, C]` and conclusion `D`.
    pub fn from_implication(target: &Expr) -> Law {
        let mut premises = vec![];
        let mut current = target;
        while let Some((lhs, rhs)) = current.as_binary(BinOp::Implies) {
            premises.extend(lhs.conjuncts());
            current = rhs;
        }
        Law {
            premises,
            conclusion: current.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LawTable {
    laws: HashMap<Name, Law>,
}

impl LawTable {
    /// Registers `name`. A previous law of the same name is replaced and
    /// returned.
    pub fn add(&mut self, name: Name, target: &Expr) -> Option<Law> {
        self.laws.insert(name, Law::from_implication(target))
    }

    pub fn get(&self, name: &Name) -> Option<&Law> {
        self.laws.get(name)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.laws.len()
    }
}

/// A reference to evidence, resolved against the current antecedent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactSpec {
    /// 1-based index into the antecedent's conjuncts
    AntecedentRef(usize),
    LawRef(Name, Vec<FactSpec>),
}

/// A resolved fact. `term` is a pattern; `bindings` instantiate it.
#[derive(Debug, Clone)]
pub struct Fact {
    pub bindings: Bindings,
    pub term: Expr,
}

impl Fact {
    /// Free variables of the term that the bindings leave open.
    pub fn uninstantiated(&self) -> Vec<Name> {
        self.term
            .free_vars()
            .into_iter()
            .filter(|x| !self.bindings.contains_key(x))
            .collect()
    }

    pub fn is_instantiated(&self) -> bool {
        self.uninstantiated().is_empty()
    }

    pub fn instantiate(mut self, fresh: &mut Fresh) -> Expr {
        subst(&self.term, &mut self.bindings, fresh)
    }
}

fn fmt_names(names: &[Name]) -> String {
    names
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct Resolver<'a> {
    laws: &'a LawTable,
    antecedent: &'a [Expr],
}

impl<'a> Resolver<'a> {
    pub fn new(laws: &'a LawTable, antecedent: &'a [Expr]) -> Self {
        Self { laws, antecedent }
    }

    pub fn conjunct(&self, index: usize) -> Result<&'a Expr, StepError> {
        if index == 0 || index > self.antecedent.len() {
            return Err(StepError::Structural(format!(
                "antecedent conjunct index {index} out of range (the antecedent has {} conjuncts)",
                self.antecedent.len()
            )));
        }
        Ok(&self.antecedent[index - 1])
    }

    pub fn resolve(&self, spec: &FactSpec, fresh: &mut Fresh) -> Result<Fact, StepError> {
        match spec {
            FactSpec::AntecedentRef(index) => {
                let conjunct = self.conjunct(*index)?;
                Ok(Fact {
                    bindings: reflexive_bindings(conjunct),
                    term: conjunct.clone(),
                })
            }
            FactSpec::LawRef(name, args) => {
                let law = self
                    .laws
                    .get(name)
                    .ok_or_else(|| StepError::Structural(format!("no such law: {name}")))?;
                if args.len() != law.premises.len() {
                    return Err(StepError::Structural(format!(
                        "law {name} expects {} arguments; {} given",
                        law.premises.len(),
                        args.len()
                    )));
                }
                let mut bindings = Bindings::new();
                for (k, (premise, arg)) in law.premises.iter().zip(args).enumerate() {
                    let fact = self.resolve(arg, fresh)?;
                    let open = fact.uninstantiated();
                    if !open.is_empty() {
                        return Err(StepError::Structural(format!(
                            "law application requires fully instantiated arguments; argument {} ({arg}) leaves {} uninstantiated",
                            k + 1,
                            fmt_names(&open)
                        )));
                    }
                    let instance = fact.instantiate(fresh);
                    if match_pattern(premise, &instance, &mut bindings).is_err() {
                        return Err(StepError::Structural(format!(
                            "argument {} of law {name} ({instance}) does not match premise {premise}",
                            k + 1
                        )));
                    }
                }
                Ok(Fact {
                    bindings,
                    term: law.conclusion.clone(),
                })
            }
        }
    }

    /// Resolves `spec` and requires the result to be closed.
    pub fn resolve_closed(&self, spec: &FactSpec, fresh: &mut Fresh) -> Result<Expr, StepError> {
        let fact = self.resolve(spec, fresh)?;
        let open = fact.uninstantiated();
        if !open.is_empty() {
            return Err(StepError::Structural(format!(
                "{spec} must be fully instantiated, but {} leaves {} uninstantiated",
                fact.term,
                fmt_names(&open)
            )));
        }
        Ok(fact.instantiate(fresh))
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

    fn table() -> LawTable {
        let mut laws = LawTable::default();
        laws.add(
            Name::intern("LeAntisym"),
            &mk_implies(mk_and(mk_le(x(), y()), mk_le(y(), x())), mk_eq(x(), y())),
        );
        laws.add(
            Name::intern("Max1"),
            &mk_implies(mk_le(y(), x()), mk_eq(mk_call("max", vec![x(), y()]), x())),
        );
        laws.add(
            Name::intern("NotLt"),
            &mk_implies(mk_not(mk_lt(x(), y())), mk_le(y(), x())),
        );
        laws
    }

    #[test]
    fn implication_chain_is_peeled() {
        let a = mk_var("a");
        let b = mk_var("b");
        let c = mk_var("c");
        let d = mk_var("d");
        let law = Law::from_implication(&mk_implies(
            mk_and(a.clone(), b.clone()),
            mk_implies(c.clone(), d.clone()),
        ));
        assert_eq!(law.premises, vec![a, b, c]);
        assert_eq!(law.conclusion, d);
        let law = Law::from_implication(&mk_eq(x(), x()));
        assert!(law.premises.is_empty());
    }

    #[test]
    fn redefinition_replaces() {
        let mut laws = table();
        let previous = laws.add(Name::intern("Max1"), &mk_true());
        assert!(previous.is_some());
        assert_eq!(
            laws.get(&Name::intern("Max1")).map(|law| &law.conclusion),
            Some(&mk_true())
        );
        assert_eq!(laws.len(), 3);
    }

    #[test]
    fn law_round_trip() {
        let laws = table();
        let antecedent = vec![
            mk_le(mk_var("i"), mk_var("n")),
            mk_le(mk_var("n"), mk_var("i")),
        ];
        let resolver = Resolver::new(&laws, &antecedent);
        let spec = FactSpec::LawRef(
            Name::intern("LeAntisym"),
            vec![FactSpec::AntecedentRef(1), FactSpec::AntecedentRef(2)],
        );
        let mut fresh = Fresh::default();
        let fact = resolver.resolve(&spec, &mut fresh).expect("resolves");
        assert_eq!(
            fact.instantiate(&mut fresh),
            mk_eq(mk_var("i"), mk_var("n"))
        );
    }

    #[test]
    fn nested_law_application() {
        let laws = table();
        let antecedent = vec![mk_true(), mk_not(mk_lt(mk_var("a"), mk_var("b")))];
        let resolver = Resolver::new(&laws, &antecedent);
        let spec = FactSpec::LawRef(
            Name::intern("Max1"),
            vec![FactSpec::LawRef(
                Name::intern("NotLt"),
                vec![FactSpec::AntecedentRef(2)],
            )],
        );
        let mut fresh = Fresh::default();
        let fact = resolver.resolve_closed(&spec, &mut fresh).expect("resolves");
        assert_eq!(
            fact,
            mk_eq(mk_call("max", vec![mk_var("a"), mk_var("b")]), mk_var("a"))
        );
    }

    #[test]
    fn premises_share_bindings() {
        let laws = table();
        let antecedent = vec![
            mk_le(mk_var("i"), mk_var("n")),
            mk_le(mk_var("m"), mk_var("i")),
        ];
        let resolver = Resolver::new(&laws, &antecedent);
        let spec = FactSpec::LawRef(
            Name::intern("LeAntisym"),
            vec![FactSpec::AntecedentRef(1), FactSpec::AntecedentRef(2)],
        );
        let err = resolver
            .resolve(&spec, &mut Fresh::default())
            .expect_err("x is bound to i and then to m");
        insta::assert_snapshot!(err.to_string(), @"argument 2 of law LeAntisym (m <= i) does not match premise y <= x");
    }

    #[test]
    fn structural_errors() {
        let laws = table();
        let antecedent = vec![mk_le(mk_var("i"), mk_var("n"))];
        let resolver = Resolver::new(&laws, &antecedent);
        let mut fresh = Fresh::default();
        let cases = [
            FactSpec::AntecedentRef(0),
            FactSpec::AntecedentRef(2),
            FactSpec::LawRef(Name::intern("Nope"), vec![]),
            FactSpec::LawRef(Name::intern("Max1"), vec![]),
        ];
        let messages: Vec<_> = cases
            .iter()
            .map(|spec| {
                resolver
                    .resolve(spec, &mut fresh)
                    .expect_err("structural error")
                    .to_string()
            })
            .collect();
        insta::assert_snapshot!(messages.join("\n"), @r"
        antecedent conjunct index 0 out of range (the antecedent has 1 conjuncts)
        antecedent conjunct index 2 out of range (the antecedent has 1 conjuncts)
        no such law: Nope
        law Max1 expects 1 arguments; 0 given
        ");
    }

    #[test]
    fn premise_free_law_is_not_closed() {
        let mut laws = LawTable::default();
        let xs = mk_var("xs");
        laws.add(
            Name::intern("SliceFull"),
            &mk_eq(
                mk_slice(xs.clone(), mk_int(0), mk_call("len", vec![xs.clone()])),
                xs,
            ),
        );
        let antecedent = vec![];
        let resolver = Resolver::new(&laws, &antecedent);
        let spec = FactSpec::LawRef(Name::intern("SliceFull"), vec![]);
        let mut fresh = Fresh::default();
        assert!(!resolver
            .resolve(&spec, &mut fresh)
            .expect("resolves")
            .is_instantiated());
        assert!(resolver.resolve_closed(&spec, &mut fresh).is_err());
    }
}
