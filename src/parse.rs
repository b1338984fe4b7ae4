use num::BigInt;
use thiserror::Error;

use crate::cmd::{Cmd, CmdLaw, CmdProof, Document};
use crate::expr::{
    mk_and, mk_binary, mk_call, mk_if_then_else, mk_implies, mk_int, mk_not, mk_slice,
    mk_subscript, mk_true, BinOp, Callee, Expr, Name,
};
use crate::law::FactSpec;
use crate::lex::{Lex, LexError, SourceInfo, Token, TokenKind};
use crate::proof::{Justification, Proof, ProofStep};

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("{lex_error}")]
    Lex {
        #[from]
        lex_error: LexError,
    },
    #[error("{message}")]
    Parse {
        message: String,
        source_info: SourceInfo,
    },
    #[error("unexpected end of input")]
    Eof { source_info: SourceInfo },
}

impl ParseError {
    pub fn source_info(&self) -> &SourceInfo {
        match self {
            ParseError::Lex { lex_error } => lex_error.source_info(),
            ParseError::Parse { source_info, .. } | ParseError::Eof { source_info } => source_info,
        }
    }
}

pub struct Parser<'a> {
    lex: &'a mut Lex,
    /// the most recently consumed token
    last: Option<SourceInfo>,
}

impl<'a> Parser<'a> {
    pub fn new(lex: &'a mut Lex) -> Self {
        Self { lex, last: None }
    }

    fn fail<R>(token: Token, message: impl Into<String>) -> Result<R, ParseError> {
        Err(ParseError::Parse {
            message: message.into(),
            source_info: token.source_info,
        })
    }

    fn eof_error(&self) -> ParseError {
        ParseError::Eof {
            source_info: SourceInfo::eof(self.lex.input().clone()),
        }
    }

    fn peek_opt(&self) -> Result<Option<Token>, ParseError> {
        Ok(self.lex.clone().next().transpose()?)
    }

    fn peek(&self) -> Result<Token, ParseError> {
        self.peek_opt()?.ok_or_else(|| self.eof_error())
    }

    fn any_token(&mut self) -> Result<Token, ParseError> {
        let token = self
            .lex
            .next()
            .transpose()?
            .ok_or_else(|| self.eof_error())?;
        self.last = Some(token.source_info.clone());
        Ok(token)
    }

    /// From `start` up to the end of the last consumed token.
    fn since(&self, start: &SourceInfo) -> SourceInfo {
        match &self.last {
            Some(last) => start.join(last),
            None => start.clone(),
        }
    }

    fn peek_is(&self, kind: TokenKind, text: &str) -> Result<bool, ParseError> {
        Ok(self
            .peek_opt()?
            .is_some_and(|token| token.kind == kind && token.as_str() == text))
    }

    fn expect_opt(&mut self, kind: TokenKind, text: &str) -> Result<Option<Token>, ParseError> {
        if self.peek_is(kind, text)? {
            return self.any_token().map(Some);
        }
        Ok(None)
    }

    fn expect(&mut self, kind: TokenKind, text: &str) -> Result<Token, ParseError> {
        let token = self.any_token()?;
        if token.kind == kind && token.as_str() == text {
            return Ok(token);
        }
        let message = format!("expected `{}`, found {}", text, token.describe());
        Self::fail(token, message)
    }

    fn expect_symbol_opt(&mut self, sym: &str) -> Result<Option<Token>, ParseError> {
        self.expect_opt(TokenKind::Symbol, sym)
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<Token, ParseError> {
        self.expect(TokenKind::Symbol, sym)
    }

    fn expect_keyword_opt(&mut self, kw: &str) -> Result<Option<Token>, ParseError> {
        self.expect_opt(TokenKind::Keyword, kw)
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<Token, ParseError> {
        self.expect(TokenKind::Keyword, kw)
    }

    fn ident(&mut self) -> Result<Token, ParseError> {
        let token = self.any_token()?;
        if !token.is_ident() {
            let message = format!("expected identifier, found {}", token.describe());
            return Self::fail(token, message);
        }
        Ok(token)
    }

    fn name(&mut self) -> Result<Name, ParseError> {
        Ok(Name::intern(self.ident()?.as_str()))
    }

    fn index(&mut self) -> Result<usize, ParseError> {
        let token = self.any_token()?;
        if !token.is_num_lit() {
            let message = format!("expected conjunct number, found {}", token.describe());
            return Self::fail(token, message);
        }
        match token.as_str().parse() {
            Ok(index) => Ok(index),
            Err(_) => Self::fail(token, "conjunct number too large"),
        }
    }

    /// A line ends at a newline or at the end of the input.
    fn end_of_line(&mut self) -> Result<(), ParseError> {
        match self.peek_opt()? {
            None => Ok(()),
            Some(token) if token.is_eol() => {
                self.any_token()?;
                Ok(())
            }
            Some(token) => {
                let message = format!("expected end of line, found {}", token.describe());
                Self::fail(token, message)
            }
        }
    }

    pub fn document(&mut self) -> Result<Document, ParseError> {
        let mut cmds = vec![];
        while let Some(token) = self.peek_opt()? {
            if token.is_eol() {
                self.any_token()?;
                continue;
            }
            cmds.push(self.cmd()?);
        }
        Ok(Document { cmds })
    }

    pub fn cmd(&mut self) -> Result<Cmd, ParseError> {
        let token = self.peek()?;
        if token.kind == TokenKind::Symbol && token.as_str() == "#" {
            return Ok(Cmd::Law(self.law_cmd()?));
        }
        if token.kind == TokenKind::Keyword && token.as_str() == "assert" {
            return Ok(Cmd::Proof(self.proof_cmd()?));
        }
        let message = format!(
            "expected `assert` or a law declaration, found {}",
            token.describe()
        );
        Self::fail(token, message)
    }

    fn law_cmd(&mut self) -> Result<CmdLaw, ParseError> {
        let hash = self.expect_symbol("#")?;
        self.expect_keyword("Wet")?;
        let name = self.name()?;
        self.expect_symbol(":")?;
        let target = self.expr()?;
        let source_info = self.since(&hash.source_info);
        self.end_of_line()?;
        Ok(CmdLaw {
            name,
            target,
            source_info,
        })
    }

    /// Consecutive `assert` lines.
    fn proof_cmd(&mut self) -> Result<CmdProof, ParseError> {
        let start = self.peek()?.source_info;
        let mut steps = vec![];
        while self.peek_is(TokenKind::Keyword, "assert")? {
            steps.push(self.step()?);
        }
        let source_info = match steps.last() {
            Some(last) => start.join(&last.source_info),
            None => start,
        };
        Ok(CmdProof {
            proof: Proof { source_info, steps },
        })
    }

    fn step(&mut self) -> Result<ProofStep, ParseError> {
        let keyword = self.expect_keyword("assert")?;
        let expr = self.expr()?;
        let mut justification = Justification::None;
        let mut justification_info = None;
        if self.expect_symbol_opt("#")?.is_some() {
            let start = self.peek()?.source_info;
            justification = self.justification()?;
            justification_info = Some(self.since(&start));
        }
        let source_info = self.since(&keyword.source_info);
        self.end_of_line()?;
        Ok(ProofStep {
            source_info,
            expr,
            justification,
            justification_info,
        })
    }

    pub fn justification(&mut self) -> Result<Justification, ParseError> {
        let first = self.primary_justification()?;
        if self.expect_keyword_opt("of")?.is_some() {
            let second = self.justification()?;
            return Ok(Justification::Alternative(Box::new(first), Box::new(second)));
        }
        Ok(first)
    }

    fn primary_justification(&mut self) -> Result<Justification, ParseError> {
        if self.expect_keyword_opt("Z")?.is_some() {
            if self.expect_keyword_opt("op")?.is_some() {
                return Ok(Justification::ArithmeticFact(Some(self.fact_spec()?)));
            }
            return Ok(Justification::ArithmeticFact(None));
        }
        if self.expect_keyword_opt("Herschrijven")?.is_some() {
            self.expect_keyword("met")?;
            let equation = self.fact_spec()?;
            self.expect_keyword("in")?;
            let target = self.index()?;
            return Ok(Justification::Rewrite(equation, target));
        }
        let token = self.peek()?;
        if token.is_ident() {
            return Ok(Justification::LawApplication(self.fact_spec()?));
        }
        let message = format!("expected justification, found {}", token.describe());
        Self::fail(token, message)
    }

    pub fn fact_spec(&mut self) -> Result<FactSpec, ParseError> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::NumLit => Ok(FactSpec::AntecedentRef(self.index()?)),
            TokenKind::Symbol if token.as_str() == "(" => {
                self.any_token()?;
                let spec = self.fact_spec()?;
                self.expect_symbol(")")?;
                Ok(spec)
            }
            TokenKind::Ident => {
                let name = self.name()?;
                let mut args = vec![];
                if self.expect_keyword_opt("op")?.is_some() {
                    args.push(self.fact_spec()?);
                    while self.expect_symbol_opt(",")?.is_some()
                        || self.expect_keyword_opt("en")?.is_some()
                    {
                        args.push(self.fact_spec()?);
                    }
                }
                Ok(FactSpec::LawRef(name, args))
            }
            _ => {
                let message = format!("expected fact, found {}", token.describe());
                Self::fail(token, message)
            }
        }
    }

    pub fn expr(&mut self) -> Result<Expr, ParseError> {
        self.implication()
    }

    fn implication(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.if_then_else()?;
        if self.expect_symbol_opt("==>")?.is_some() {
            let rhs = self.implication()?;
            return Ok(mk_implies(lhs, rhs));
        }
        Ok(lhs)
    }

    fn if_then_else(&mut self) -> Result<Expr, ParseError> {
        let then = self.conjunction()?;
        if self.expect_keyword_opt("if")?.is_some() {
            let cond = self.implication()?;
            self.expect_keyword("else")?;
            let otherwise = self.if_then_else()?;
            return Ok(mk_if_then_else(cond, then, otherwise));
        }
        Ok(then)
    }

    fn conjunction(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.comparison()?;
        if self.expect_keyword_opt("and")?.is_some() {
            let rhs = self.conjunction()?;
            return Ok(mk_and(lhs, rhs));
        }
        Ok(lhs)
    }

    fn comparison_op(&mut self) -> Result<Option<BinOp>, ParseError> {
        for op in [BinOp::Eq, BinOp::Neq, BinOp::Le, BinOp::Lt] {
            if self.expect_symbol_opt(op.symbol())?.is_some() {
                return Ok(Some(op));
            }
        }
        Ok(None)
    }

    /// `a <= b < c` is `a <= b and b < c`.
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.addition()?;
        let mut chain: Option<Expr> = None;
        while let Some(op) = self.comparison_op()? {
            let rhs = self.addition()?;
            let link = mk_binary(op, lhs, rhs.clone());
            chain = Some(match chain {
                None => link,
                Some(prev) => mk_and(prev, link),
            });
            lhs = rhs;
        }
        Ok(chain.unwrap_or(lhs))
    }

    fn addition(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.multiplication()?;
        loop {
            let op = if self.expect_symbol_opt("+")?.is_some() {
                BinOp::Add
            } else if self.expect_symbol_opt("-")?.is_some() {
                BinOp::Sub
            } else {
                return Ok(e);
            };
            let rhs = self.multiplication()?;
            e = mk_binary(op, e, rhs);
        }
    }

    fn multiplication(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.suffix()?;
        while self.expect_symbol_opt("*")?.is_some() {
            let rhs = self.suffix()?;
            e = mk_binary(BinOp::Mul, e, rhs);
        }
        Ok(e)
    }

    fn suffix(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.primary()?;
        while self.expect_symbol_opt("[")?.is_some() {
            if self.expect_symbol_opt(":")?.is_some() {
                let end = self.slice_end(&e)?;
                e = mk_slice(e, mk_int(0), end);
                continue;
            }
            let index = self.expr()?;
            if self.expect_symbol_opt(":")?.is_some() {
                let end = self.slice_end(&e)?;
                e = mk_slice(e, index, end);
            } else {
                self.expect_symbol("]")?;
                e = mk_subscript(e, index);
            }
        }
        Ok(e)
    }

    /// The part of `xs[a:b]` after the colon. A missing end is `len(xs)`.
    fn slice_end(&mut self, seq: &Expr) -> Result<Expr, ParseError> {
        let end = if self.peek_is(TokenKind::Symbol, "]")? {
            mk_call("len", vec![seq.clone()])
        } else {
            self.expr()?
        };
        self.expect_symbol("]")?;
        Ok(end)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.any_token()?;
        match token.kind {
            TokenKind::Ident => {
                let name = Name::intern(token.as_str());
                if self.expect_symbol_opt("(")?.is_none() {
                    return Ok(Expr::Var(name));
                }
                let mut args = vec![];
                if self.expect_symbol_opt(")")?.is_none() {
                    args.push(self.expr()?);
                    while self.expect_symbol_opt(",")?.is_some() {
                        args.push(self.expr()?);
                    }
                    self.expect_symbol(")")?;
                }
                Ok(Expr::Call(Callee::User(name), args))
            }
            TokenKind::NumLit => match token.as_str().parse::<BigInt>() {
                Ok(value) => Ok(mk_int(value)),
                Err(_) => Self::fail(token, "malformed number"),
            },
            TokenKind::Keyword if token.as_str() == "True" => Ok(mk_true()),
            TokenKind::Keyword if token.as_str() == "not" => Ok(mk_not(self.comparison()?)),
            TokenKind::Symbol if token.as_str() == "(" => {
                let e = self.expr()?;
                self.expect_symbol(")")?;
                Ok(e)
            }
            _ => {
                let message = format!("expected expression, found {}", token.describe());
                Self::fail(token, message)
            }
        }
    }
}
