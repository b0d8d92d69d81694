//! Displaying IR, in the same text format the frontend parses.

use super::{FuncDecl, FunctionBody, Module, SourceLoc, Terminator, Value, ValueDef};

use std::fmt::{Display, Formatter, Result as FmtResult};

/// A value as it appears in operand position.
pub struct OperandDisplay<'a> {
    pub(crate) body: &'a FunctionBody,
    pub(crate) module: &'a Module,
    pub(crate) value: Value,
}

impl<'a> Display for OperandDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self.body.values.get(self.value) {
            Some(ValueDef::Const(c)) => write!(f, "{}", c),
            Some(ValueDef::Undef) => write!(f, "undef"),
            Some(&ValueDef::Global(global)) => match self.module.globals.get(global) {
                Some(data) => write!(f, "@{}", data.name),
                None => write!(f, "@{}", global),
            },
            Some(_) => match &self.body.value_names[self.value] {
                Some(name) => write!(f, "%{}", name),
                None => write!(f, "%{}", self.value),
            },
            None => write!(f, "%<invalid {}>", self.value),
        }
    }
}

/// One instruction, without indentation or trailing newline.
pub struct InstDisplay<'a> {
    pub(crate) body: &'a FunctionBody,
    pub(crate) module: &'a Module,
    pub(crate) value: Value,
}

impl<'a> InstDisplay<'a> {
    fn operand(&self, value: Value) -> OperandDisplay<'a> {
        OperandDisplay {
            body: self.body,
            module: self.module,
            value,
        }
    }

    fn operand_list(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|&v| format!("{}", self.operand(v)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> Display for InstDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let def = match self.body.values.get(self.value) {
            Some(def) => def,
            None => return write!(f, "<invalid {}>", self.value),
        };
        let named = self.body.value_names[self.value].is_some();
        let has_result = match def {
            ValueDef::Store { .. } => false,
            ValueDef::Call { .. } => named,
            _ => true,
        };
        if has_result {
            write!(f, "{} = ", self.operand(self.value))?;
        }
        match def {
            ValueDef::Alloca => write!(f, "alloca"),
            &ValueDef::Load(addr) => write!(f, "load {}", self.operand(addr)),
            &ValueDef::Store { value, addr } => {
                write!(f, "store {}, {}", self.operand(value), self.operand(addr))
            }
            &ValueDef::Call { callee, ref args } => {
                let name = self
                    .module
                    .funcs
                    .get(callee)
                    .map(|decl| decl.name().to_owned())
                    .unwrap_or_else(|| format!("{}", callee));
                write!(f, "call @{}({})", name, self.operand_list(args))
            }
            ValueDef::Phi(incoming) => {
                let incoming = incoming
                    .iter()
                    .map(|&(block, value)| {
                        let label = self
                            .body
                            .blocks
                            .get(block)
                            .map(|data| data.name.clone())
                            .unwrap_or_else(|| format!("{}", block));
                        format!("[{}: {}]", label, self.operand(value))
                    })
                    .collect::<Vec<_>>();
                write!(f, "phi {}", incoming.join(", "))
            }
            ValueDef::Operator(opcode, args) => {
                if args.is_empty() {
                    write!(f, "{}", opcode)
                } else {
                    write!(f, "{} {}", opcode, self.operand_list(args))
                }
            }
            ValueDef::Param(..) | ValueDef::Global(..) | ValueDef::Const(..) | ValueDef::Undef => {
                write!(f, "{}", self.operand(self.value))
            }
        }
    }
}

fn write_loc(f: &mut Formatter, module: &Module, loc: Option<SourceLoc>) -> FmtResult {
    if let Some(data) = loc.and_then(|loc| module.debug.source_locs.get(loc)) {
        write!(f, " !{}:{}:{}", data.file, data.line, data.col)?;
    }
    Ok(())
}

pub struct FunctionBodyDisplay<'a> {
    pub(crate) body: &'a FunctionBody,
    pub(crate) name: &'a str,
    pub(crate) indent: &'a str,
    pub(crate) module: &'a Module,
}

impl<'a> Display for FunctionBodyDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let params = self
            .body
            .params
            .iter()
            .map(|&param| {
                format!(
                    "{}",
                    OperandDisplay {
                        body: self.body,
                        module: self.module,
                        value: param,
                    }
                )
            })
            .collect::<Vec<_>>();
        writeln!(
            f,
            "{}func @{}({}) {{",
            self.indent,
            self.name,
            params.join(", ")
        )?;

        let label = |block| {
            self.body
                .blocks
                .get(block)
                .map(|data| data.name.clone())
                .unwrap_or_else(|| format!("{}", block))
        };
        let operand = |value| OperandDisplay {
            body: self.body,
            module: self.module,
            value,
        };

        for block in self.body.blocks.values() {
            writeln!(f, "{}{}:", self.indent, block.name)?;
            for &inst in &block.insts {
                write!(
                    f,
                    "{}  {}",
                    self.indent,
                    InstDisplay {
                        body: self.body,
                        module: self.module,
                        value: inst,
                    }
                )?;
                write_loc(f, self.module, self.body.value_locs[inst])?;
                writeln!(f)?;
            }
            write!(f, "{}  ", self.indent)?;
            match &block.terminator {
                &Terminator::Br { target } => write!(f, "br {}", label(target))?,
                &Terminator::CondBr {
                    cond,
                    if_true,
                    if_false,
                } => write!(
                    f,
                    "br_if {}, {}, {}",
                    operand(cond),
                    label(if_true),
                    label(if_false)
                )?,
                &Terminator::Return { value: Some(value) } => write!(f, "ret {}", operand(value))?,
                &Terminator::Return { value: None } => write!(f, "ret")?,
                Terminator::Unreachable => write!(f, "unreachable")?,
                Terminator::None => write!(f, "; no terminator")?,
            }
            write_loc(f, self.module, block.terminator_loc)?;
            writeln!(f)?;
        }

        writeln!(f, "{}}}", self.indent)?;

        Ok(())
    }
}

pub struct ModuleDisplay<'a>(pub(crate) &'a Module);

impl<'a> Display for ModuleDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        for (file, data) in self.0.debug.source_files.entries() {
            writeln!(
                f,
                "file {} = \"{}\", \"{}\"",
                file, data.directory, data.file
            )?;
        }
        for global in self.0.globals.values() {
            writeln!(f, "global @{}", global.name)?;
        }
        for decl in self.0.funcs.values() {
            if let FuncDecl::Import(name) = decl {
                writeln!(f, "declare @{}", name)?;
            }
        }
        for decl in self.0.funcs.values() {
            if let FuncDecl::Body(name, body) = decl {
                writeln!(f)?;
                write!(f, "{}", body.display(name, "", self.0))?;
            }
        }
        Ok(())
    }
}
