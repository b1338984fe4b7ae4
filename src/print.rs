use std::fmt::{self, Display};

use crate::expr::{BinOp, Callee, Expr};
use crate::law::FactSpec;
use crate::proof::Justification;

// binding strength; higher binds tighter
const PREC_IMPLIES: usize = 1;
const PREC_IF: usize = 2;
const PREC_AND: usize = 3;
const PREC_CMP: usize = 4;
const PREC_ADD: usize = 5;
const PREC_MUL: usize = 6;
const PREC_SUFFIX: usize = 7;

fn binary_prec(op: BinOp) -> usize {
    match op {
        BinOp::Implies => PREC_IMPLIES,
        BinOp::And => PREC_AND,
        BinOp::Eq | BinOp::Neq | BinOp::Le | BinOp::Lt => PREC_CMP,
        BinOp::Add | BinOp::Sub => PREC_ADD,
        BinOp::Mul => PREC_MUL,
    }
}

struct Printer;

impl Printer {
    fn fmt_expr(&self, e: &Expr, prec: usize, f: &mut fmt::Formatter) -> fmt::Result {
        match e {
            Expr::Var(x) => write!(f, "{x}"),
            Expr::Int(v) => write!(f, "{v}"),
            Expr::True => write!(f, "True"),
            Expr::Not(inner) => {
                // `not` swallows a whole comparison
                self.paren_open(prec > PREC_CMP, f)?;
                write!(f, "not ")?;
                self.fmt_expr(inner, PREC_CMP, f)?;
                self.paren_close(prec > PREC_CMP, f)
            }
            Expr::Binary(op, lhs, rhs) => {
                let op_prec = binary_prec(*op);
                let (lprec, rprec) = match op {
                    BinOp::Implies | BinOp::And => (op_prec + 1, op_prec),
                    BinOp::Eq | BinOp::Neq | BinOp::Le | BinOp::Lt => (op_prec + 1, op_prec + 1),
                    BinOp::Add | BinOp::Sub | BinOp::Mul => (op_prec, op_prec + 1),
                };
                self.paren_open(prec > op_prec, f)?;
                self.fmt_expr(lhs, lprec, f)?;
                write!(f, " {} ", op.symbol())?;
                self.fmt_expr(rhs, rprec, f)?;
                self.paren_close(prec > op_prec, f)
            }
            Expr::Call(callee, args) => match (callee, args.as_slice()) {
                (Callee::IfThenElse, [cond, then, otherwise]) => {
                    self.paren_open(prec > PREC_IF, f)?;
                    self.fmt_expr(then, PREC_AND, f)?;
                    write!(f, " if ")?;
                    self.fmt_expr(cond, PREC_IMPLIES, f)?;
                    write!(f, " else ")?;
                    self.fmt_expr(otherwise, PREC_IF, f)?;
                    self.paren_close(prec > PREC_IF, f)
                }
                (Callee::Slice, [seq, start, end]) => {
                    self.fmt_expr(seq, PREC_SUFFIX, f)?;
                    write!(f, "[")?;
                    if !matches!(start, Expr::Int(v) if v == &num::BigInt::from(0)) {
                        self.fmt_expr(start, PREC_IMPLIES, f)?;
                    }
                    write!(f, ":")?;
                    self.fmt_expr(end, PREC_IMPLIES, f)?;
                    write!(f, "]")
                }
                (Callee::Subscript, [seq, index]) => {
                    self.fmt_expr(seq, PREC_SUFFIX, f)?;
                    write!(f, "[")?;
                    self.fmt_expr(index, PREC_IMPLIES, f)?;
                    write!(f, "]")
                }
                (Callee::User(name), args) => {
                    write!(f, "{name}(")?;
                    self.fmt_args(args, f)?;
                    write!(f, ")")
                }
                // only reachable for hand-built terms with a wrong arity
                (callee, args) => {
                    write!(f, "{callee:?}(")?;
                    self.fmt_args(args, f)?;
                    write!(f, ")")
                }
            },
        }
    }

    fn fmt_args(&self, args: &[Expr], f: &mut fmt::Formatter) -> fmt::Result {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.fmt_expr(arg, PREC_IMPLIES, f)?;
        }
        Ok(())
    }

    fn paren_open(&self, needed: bool, f: &mut fmt::Formatter) -> fmt::Result {
        if needed {
            write!(f, "(")?;
        }
        Ok(())
    }

    fn paren_close(&self, needed: bool, f: &mut fmt::Formatter) -> fmt::Result {
        if needed {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer.fmt_expr(self, 0, f)
    }
}

impl Display for FactSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactSpec::AntecedentRef(index) => write!(f, "{index}"),
            FactSpec::LawRef(name, args) => {
                write!(f, "{name}")?;
                for (i, arg) in args.iter().enumerate() {
                    write!(f, "{}", if i == 0 { " op " } else { ", " })?;
                    match arg {
                        FactSpec::LawRef(_, inner) if !inner.is_empty() => write!(f, "({arg})")?,
                        _ => write!(f, "{arg}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Justification::None => write!(f, "(none)"),
            Justification::ArithmeticFact(None) => write!(f, "Z"),
            Justification::ArithmeticFact(Some(spec)) => write!(f, "Z op {spec}"),
            Justification::Rewrite(spec, index) => {
                write!(f, "Herschrijven met {spec} in {index}")
            }
            Justification::LawApplication(spec) => write!(f, "{spec}"),
            Justification::Alternative(first, second) => write!(f, "{first} of {second}"),
        }
    }
}
