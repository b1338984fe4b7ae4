//! Linear integer arithmetic over opaque atoms.
//!
//! A comparison is reduced to `p + c <op> 0` where `p` is a sparse linear
//! polynomial whose monomials are variables or opaque subterms, and `op` is
//! one of `==`, `<=` (read as `0 <= p + c`) or `!=`. Entailment is decided
//! between single canonical atoms only.

use std::collections::BTreeMap;

use num::{BigInt, BigRational, Integer, One, Signed, Zero};

use crate::expr::{mk_int, mk_le, mk_sub, BinOp, Expr};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Monomial {
    One,
    Atom(Expr),
}

/// Sparse polynomial. Zero coefficients are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Poly {
    terms: BTreeMap<Monomial, BigInt>,
}

impl Poly {
    pub fn constant(value: BigInt) -> Poly {
        let mut p = Poly::default();
        p.insert(Monomial::One, value);
        p
    }

    pub fn atom(e: Expr) -> Poly {
        let mut p = Poly::default();
        p.insert(Monomial::Atom(e), BigInt::one());
        p
    }

    fn insert(&mut self, key: Monomial, coef: BigInt) {
        let entry = self.terms.entry(key).or_insert_with(BigInt::zero);
        *entry += coef;
        if entry.is_zero() {
            self.terms.retain(|_, c| !c.is_zero());
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut result = self.clone();
        for (key, coef) in &other.terms {
            result.insert(key.clone(), coef.clone());
        }
        result
    }

    pub fn scale(&self, factor: &BigInt) -> Poly {
        if factor.is_zero() {
            return Poly::default();
        }
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(key, coef)| (key.clone(), coef * factor))
                .collect(),
        }
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.scale(&-BigInt::one()))
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    #[cfg(test)]
    fn coefficient(&self, key: &Monomial) -> Option<&BigInt> {
        self.terms.get(key)
    }

    /// Splits off the constant term.
    fn split_constant(mut self) -> (BigInt, Poly) {
        let c = self.terms.remove(&Monomial::One).unwrap_or_else(BigInt::zero);
        (c, self)
    }

    fn as_constant(&self) -> Option<BigInt> {
        match self.terms.len() {
            0 => Some(BigInt::zero()),
            1 => self.terms.get(&Monomial::One).cloned(),
            _ => None,
        }
    }
}

pub fn poly(e: &Expr) -> Poly {
    match e {
        Expr::Int(v) => Poly::constant(v.clone()),
        Expr::Binary(BinOp::Add, lhs, rhs) => poly(lhs).add(&poly(rhs)),
        Expr::Binary(BinOp::Sub, lhs, rhs) => poly(lhs).sub(&poly(rhs)),
        _ => Poly::atom(e.clone()),
    }
}

/// Rewrites a comparison so it only uses `==`, `<=` and `!=`.
pub fn normalize_eq(e: &Expr) -> Expr {
    let e = match e {
        Expr::Not(inner) => match normalize_eq(inner) {
            Expr::Not(a) => *a,
            Expr::Binary(BinOp::Eq, a, b) => Expr::Binary(BinOp::Neq, a, b),
            Expr::Binary(BinOp::Neq, a, b) => Expr::Binary(BinOp::Eq, a, b),
            // not (a <= b)  ~>  b <= a - 1
            Expr::Binary(BinOp::Le, a, b) => mk_le(*b, mk_sub(*a, mk_int(1))),
            _ => return e.clone(),
        },
        _ => e.clone(),
    };
    match e {
        // a < b  ~>  a <= b - 1
        Expr::Binary(BinOp::Lt, a, b) => mk_le(*a, mk_sub(*b, mk_int(1))),
        e => e,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Le,
    Neq,
}

impl CmpOp {
    fn of(op: BinOp) -> Option<CmpOp> {
        match op {
            BinOp::Eq => Some(CmpOp::Eq),
            BinOp::Le => Some(CmpOp::Le),
            BinOp::Neq => Some(CmpOp::Neq),
            _ => None,
        }
    }

    #[cfg(test)]
    fn to_binop(self) -> BinOp {
        match self {
            CmpOp::Eq => BinOp::Eq,
            CmpOp::Le => BinOp::Le,
            CmpOp::Neq => BinOp::Neq,
        }
    }
}

/// `poly + constant <op> 0`, with the polynomial's coefficients coprime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub op: CmpOp,
    pub constant: BigRational,
    pub poly: Poly,
}

impl Canonical {
    /// An expression whose canonical form is `self`. Each atom is repeated
    /// as often as its coefficient says, since `*` is an atom of its own.
    #[cfg(test)]
    fn to_expr(&self) -> Expr {
        use crate::expr::mk_add;

        let denom = self.constant.denom().clone();
        let mut sum = mk_int(self.constant.numer().clone());
        for (key, coef) in &self.poly.terms {
            let Monomial::Atom(atom) = key else {
                continue;
            };
            let mut remaining = (coef * &denom).abs();
            while remaining.is_positive() {
                sum = if coef.is_negative() {
                    mk_sub(sum, atom.clone())
                } else {
                    mk_add(sum, atom.clone())
                };
                remaining -= BigInt::one();
            }
        }
        Expr::Binary(self.op.to_binop(), Box::new(mk_int(0)), Box::new(sum))
    }
}

/// Canonical form of a comparison, or `None` when `e` is not one.
pub fn canonical(e: &Expr) -> Option<Canonical> {
    let Expr::Binary(op, lhs, rhs) = normalize_eq(e) else {
        return None;
    };
    let op = CmpOp::of(op)?;
    let (c, mut p) = poly(&rhs).sub(&poly(&lhs)).split_constant();
    let mut constant = BigRational::from_integer(c);
    if let Some(first) = p.terms.values().next().cloned() {
        let mut gcd = p
            .terms
            .values()
            .fold(BigInt::zero(), |acc, coef| acc.gcd(coef));
        if matches!(op, CmpOp::Eq | CmpOp::Neq) && first.is_negative() {
            gcd = -gcd;
        }
        for coef in p.terms.values_mut() {
            *coef = &*coef / &gcd;
        }
        constant /= BigRational::from_integer(gcd);
    }
    Some(Canonical {
        op,
        constant,
        poly: p,
    })
}

/// Whether `e` is a comparison that holds for every valuation of its atoms,
/// without looking at any hypothesis.
pub fn is_tautology(e: &Expr) -> bool {
    let Expr::Binary(op, lhs, rhs) = normalize_eq(e) else {
        return false;
    };
    let diff = poly(&rhs).sub(&poly(&lhs));
    match CmpOp::of(op) {
        Some(CmpOp::Eq) => diff.is_zero(),
        Some(CmpOp::Neq) => diff.as_constant().is_some_and(|c| !c.is_zero()),
        Some(CmpOp::Le) => diff.as_constant().is_some_and(|c| !c.is_negative()),
        None => false,
    }
}

/// Whether the single hypothesis `antecedent` entails `consequent`.
pub fn entails(consequent: &Expr, antecedent: &Expr) -> bool {
    let (Some(ante), Some(cons)) = (canonical(antecedent), canonical(consequent)) else {
        return false;
    };
    match (cons.op, ante.op) {
        (CmpOp::Eq, CmpOp::Eq) => (&cons.constant, &cons.poly) == (&ante.constant, &ante.poly),
        (CmpOp::Eq, _) => false,
        (CmpOp::Neq, CmpOp::Neq) => (&cons.constant, &cons.poly) == (&ante.constant, &ante.poly),
        (CmpOp::Neq, CmpOp::Eq) => cons.poly == ante.poly && ante.constant != cons.constant,
        (CmpOp::Neq, CmpOp::Le) => cons.poly == ante.poly && ante.constant < cons.constant,
        (CmpOp::Le, CmpOp::Le) => cons.poly == ante.poly && ante.constant <= cons.constant,
        (CmpOp::Le, CmpOp::Eq) => {
            (cons.poly == ante.poly && ante.constant <= cons.constant)
                || (cons.poly == ante.poly.scale(&-BigInt::one())
                    && -&ante.constant <= cons.constant)
        }
        (CmpOp::Le, CmpOp::Neq) => false,
    }
}
