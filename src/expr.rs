use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use num::BigInt;
use once_cell::sync::Lazy;

/// Interned identifier. Equality and hashing are by pointer.
#[derive(Debug, Clone, Ord, PartialOrd)]
pub struct Name(Arc<String>);

static NAME_TABLE: Lazy<Mutex<HashMap<String, Weak<String>>>> = Lazy::new(Default::default);

impl Name {
    pub fn intern(value: &str) -> Name {
        let mut table = NAME_TABLE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.get(value).and_then(|weak| weak.upgrade()) {
            return Name(existing);
        }
        let owned = Arc::new(value.to_owned());
        table.insert(value.to_owned(), Arc::downgrade(&owned));
        Name(owned)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Names minted by `matching::Fresh`. The lexer can never produce them.
    pub fn is_fresh(&self) -> bool {
        self.0.starts_with('#')
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::intern(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinOp {
    Implies,
    And,
    Eq,
    Neq,
    Le,
    Lt,
    Add,
    Sub,
    Mul,
}

impl BinOp {
    /// Operators whose operands may be swapped when matching.
    pub fn is_symmetric(self) -> bool {
        matches!(self, BinOp::And | BinOp::Eq | BinOp::Add | BinOp::Mul)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Implies => "==>",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Le => "<=",
            BinOp::Lt => "<",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        }
    }
}

/// Head of an application. The built-in heads have a fixed arity which the
/// `mk_*` constructors establish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Callee {
    User(Name),
    /// args: condition, then-branch, else-branch
    IfThenElse,
    /// args: sequence, start, end
    Slice,
    /// args: sequence, index
    Subscript,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    Var(Name),
    Int(BigInt),
    True,
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Callee, Vec<Expr>),
}

pub fn mk_var(name: impl Into<Name>) -> Expr {
    Expr::Var(name.into())
}

pub fn mk_int(value: impl Into<BigInt>) -> Expr {
    Expr::Int(value.into())
}

pub fn mk_true() -> Expr {
    Expr::True
}

pub fn mk_not(e: Expr) -> Expr {
    Expr::Not(Box::new(e))
}

pub fn mk_binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary(op, Box::new(lhs), Box::new(rhs))
}

pub fn mk_implies(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Implies, lhs, rhs)
}

pub fn mk_and(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::And, lhs, rhs)
}

pub fn mk_eq(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Eq, lhs, rhs)
}

pub fn mk_neq(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Neq, lhs, rhs)
}

pub fn mk_le(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Le, lhs, rhs)
}

pub fn mk_lt(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Lt, lhs, rhs)
}

pub fn mk_add(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Add, lhs, rhs)
}

pub fn mk_sub(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Sub, lhs, rhs)
}

pub fn mk_mul(lhs: Expr, rhs: Expr) -> Expr {
    mk_binary(BinOp::Mul, lhs, rhs)
}

pub fn mk_call(name: impl Into<Name>, args: Vec<Expr>) -> Expr {
    Expr::Call(Callee::User(name.into()), args)
}

pub fn mk_if_then_else(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::Call(Callee::IfThenElse, vec![cond, then, otherwise])
}

pub fn mk_slice(seq: Expr, start: Expr, end: Expr) -> Expr {
    Expr::Call(Callee::Slice, vec![seq, start, end])
}

pub fn mk_subscript(seq: Expr, index: Expr) -> Expr {
    Expr::Call(Callee::Subscript, vec![seq, index])
}

impl Expr {
    pub fn free_vars(&self) -> BTreeSet<Name> {
        let mut acc = BTreeSet::new();
        self.collect_free_vars(&mut acc);
        acc
    }

    fn collect_free_vars(&self, acc: &mut BTreeSet<Name>) {
        match self {
            Expr::Var(x) => {
                acc.insert(x.clone());
            }
            Expr::Int(_) | Expr::True => {}
            Expr::Not(e) => e.collect_free_vars(acc),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_free_vars(acc);
                rhs.collect_free_vars(acc);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_free_vars(acc);
                }
            }
        }
    }

    /// Top-level operands of a chain of `and`s, left to right.
    pub fn conjuncts(&self) -> Vec<Expr> {
        let mut acc = vec![];
        self.collect_conjuncts(&mut acc);
        acc
    }

    fn collect_conjuncts(&self, acc: &mut Vec<Expr>) {
        match self {
            Expr::Binary(BinOp::And, lhs, rhs) => {
                lhs.collect_conjuncts(acc);
                rhs.collect_conjuncts(acc);
            }
            _ => acc.push(self.clone()),
        }
    }

    pub fn as_binary(&self, op: BinOp) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::Binary(found, lhs, rhs) if *found == op => Some((lhs, rhs)),
            _ => None,
        }
    }
}
