use crate::expr::{Expr, Name};
use crate::law::LawTable;
use crate::lex::SourceInfo;
use crate::matching::Fresh;
use crate::proof::{check_proof, Proof, ProofError};

#[derive(Debug, Clone)]
pub enum Cmd {
    Law(CmdLaw),
    Proof(CmdProof),
}

/// `# Wet Name: premises ==> conclusion`
#[derive(Debug, Clone)]
pub struct CmdLaw {
    pub name: Name,
    pub target: Expr,
    pub source_info: SourceInfo,
}

#[derive(Debug, Clone)]
pub struct CmdProof {
    pub proof: Proof,
}

/// A parsed source unit. Laws and proofs keep their textual order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub cmds: Vec<Cmd>,
}

impl Document {
    pub fn laws(&self) -> impl Iterator<Item = &CmdLaw> {
        self.cmds.iter().filter_map(|cmd| match cmd {
            Cmd::Law(inner) => Some(inner),
            Cmd::Proof(_) => None,
        })
    }

    pub fn proofs(&self) -> impl Iterator<Item = &CmdProof> {
        self.cmds.iter().filter_map(|cmd| match cmd {
            Cmd::Proof(inner) => Some(inner),
            Cmd::Law(_) => None,
        })
    }
}

/// Checking context: the laws seen so far and the supply of fresh names.
#[derive(Debug, Default)]
pub struct Eval {
    laws: LawTable,
    fresh: Fresh,
}

impl Eval {
    pub fn laws(&self) -> &LawTable {
        &self.laws
    }

    pub fn run_cmd(&mut self, cmd: &Cmd) -> Result<(), ProofError> {
        match cmd {
            Cmd::Law(inner) => {
                self.run_law_cmd(inner);
                Ok(())
            }
            Cmd::Proof(inner) => self.run_proof_cmd(inner),
        }
    }

    /// Registers every law of the document, then checks its proofs in order,
    /// so a proof may cite a law declared further down.
    pub fn run_document(&mut self, document: &Document) -> Result<(), ProofError> {
        for cmd in document.laws() {
            self.run_law_cmd(cmd);
        }
        for cmd in document.proofs() {
            self.run_proof_cmd(cmd)?;
        }
        Ok(())
    }

    fn run_law_cmd(&mut self, cmd: &CmdLaw) {
        let CmdLaw {
            name,
            target,
            source_info,
        } = cmd;
        log::debug!("law {name}: {target}");
        if self.laws.add(name.clone(), target).is_some() {
            let (line, _) = source_info.line_column();
            log::warn!("law {name} redefined at line {line}; the earlier definition is replaced");
        }
    }

    fn run_proof_cmd(&mut self, cmd: &CmdProof) -> Result<(), ProofError> {
        let CmdProof { proof } = cmd;
        check_proof(proof, &self.laws, &mut self.fresh)?;
        let (line, _) = proof.source_info.line_column();
        log::info!(
            "proof at line {line} is valid ({} steps)",
            proof.steps.len()
        );
        Ok(())
    }
}
