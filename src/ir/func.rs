use super::{Block, FunctionBodyDisplay, Global, Module, SourceLoc, Value, ValueDef};
use crate::entity::{EntityRef, EntityVec, PerEntity};
use anyhow::{bail, Result};
use fxhash::FxHashMap;

#[derive(Clone, Debug)]
pub enum FuncDecl {
    /// An external function known only by name (e.g. `scanf`).
    Import(String),
    Body(String, FunctionBody),
}

impl FuncDecl {
    pub fn name(&self) -> &str {
        match self {
            FuncDecl::Import(name) => &name[..],
            FuncDecl::Body(name, ..) => &name[..],
        }
    }

    pub fn body(&self) -> Option<&FunctionBody> {
        match self {
            FuncDecl::Body(_, body) => Some(body),
            _ => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut FunctionBody> {
        match self {
            FuncDecl::Body(_, body) => Some(body),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FunctionBody {
    /// Parameter values, in declaration order.
    pub params: Vec<Value>,
    /// Entry block.
    pub entry: Block,
    /// Block bodies.
    pub blocks: EntityVec<Block, BlockDef>,
    /// Value definitions, indexed by `Value`.
    pub values: EntityVec<Value, ValueDef>,
    /// Blocks in which values are computed. Each may be
    /// `Block::invalid()` if not placed.
    pub value_blocks: PerEntity<Value, Block>,
    /// Source location attached to each instruction, if any.
    pub value_locs: PerEntity<Value, Option<SourceLoc>>,
    /// Names given to values in the text format.
    pub value_names: PerEntity<Value, Option<String>>,
    /// One value per global referenced from this body.
    pub global_values: FxHashMap<Global, Value>,
}

impl FunctionBody {
    pub fn new(n_params: usize) -> FunctionBody {
        let mut body = FunctionBody::default();
        body.entry = body.add_block("entry");
        for i in 0..n_params {
            let value = body.add_value(ValueDef::Param(i));
            body.params.push(value);
        }
        body
    }

    pub fn add_block(&mut self, name: &str) -> Block {
        let id = self.blocks.push(BlockDef {
            name: name.to_owned(),
            ..BlockDef::default()
        });
        log::trace!("add_block: block {} ({})", id, name);
        id
    }

    pub fn add_value(&mut self, value: ValueDef) -> Value {
        log::trace!("add_value: def {:?}", value);
        let value = self.values.push(value);
        log::trace!(" -> {}", value);
        value
    }

    /// Returns the value standing for the address of `global`,
    /// creating it on first reference.
    pub fn global_value(&mut self, global: Global) -> Value {
        if let Some(&value) = self.global_values.get(&global) {
            return value;
        }
        let value = self.add_value(ValueDef::Global(global));
        self.global_values.insert(global, value);
        value
    }

    pub fn set_name(&mut self, value: Value, name: &str) {
        self.value_names[value] = Some(name.to_owned());
    }

    pub fn append_to_block(&mut self, block: Block, value: Value) {
        self.blocks[block].insts.push(value);
        self.value_blocks[value] = block;
    }

    pub fn set_loc(&mut self, value: Value, loc: SourceLoc) {
        self.value_locs[value] = Some(loc);
    }

    pub fn end_block(&mut self, block: Block, terminator: Terminator) {
        terminator.visit_successors(|succ| {
            self.blocks[block].succs.push(succ);
            self.blocks[succ].preds.push(block);
            log::trace!("add_edge: from {} to {}", block, succ);
        });
        self.blocks[block].terminator = terminator;
    }

    pub fn display<'a>(
        &'a self,
        name: &'a str,
        indent: &'a str,
        module: &'a Module,
    ) -> FunctionBodyDisplay<'a> {
        FunctionBodyDisplay {
            body: self,
            name,
            indent,
            module,
        }
    }

    /// Checks the structural invariants the tracer and the printer
    /// rely on.
    pub fn validate(&self) -> Result<()> {
        for (block, data) in self.blocks.entries() {
            if let Terminator::None = data.terminator {
                bail!("block {} ({}) has no terminator", block, data.name);
            }
            let mut in_head = true;
            for &inst in &data.insts {
                match &self.values[inst] {
                    ValueDef::Phi(incoming) => {
                        if !in_head {
                            bail!("phi {} is not at the head of block {}", inst, data.name);
                        }
                        for &(pred, _) in incoming {
                            if !data.preds.contains(&pred) {
                                bail!(
                                    "phi {} names block {} which is not a predecessor of {}",
                                    inst,
                                    pred,
                                    data.name
                                );
                            }
                        }
                    }
                    def if !def.is_inst() => {
                        bail!("non-instruction value {} placed in block {}", inst, data.name);
                    }
                    _ => in_head = false,
                }
            }
        }

        let mut result = Ok(());
        for (value, def) in self.values.entries() {
            def.visit_uses(|used| {
                if result.is_ok() && self.values.get(used).is_none() {
                    result = Err(anyhow::anyhow!("value {} uses undefined value {}", value, used));
                }
            });
        }
        for (block, data) in self.blocks.entries() {
            data.terminator.visit_uses(|used| {
                if result.is_ok() && self.values.get(used).is_none() {
                    result = Err(anyhow::anyhow!(
                        "terminator of block {} uses undefined value {}",
                        block,
                        used
                    ));
                }
            });
        }
        result
    }

    /// Iterates over all placed instructions, block by block.
    pub fn insts(&self) -> impl Iterator<Item = (Block, Value)> + '_ {
        self.blocks
            .entries()
            .flat_map(|(block, data)| data.insts.iter().map(move |&inst| (block, inst)))
    }

    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.blocks
            .entries()
            .find(|(_, data)| data.name == name)
            .map(|(block, _)| block)
    }

    pub fn value_by_name(&self, name: &str) -> Option<Value> {
        self.values
            .iter()
            .find(|&value| self.value_names[value].as_deref() == Some(name))
    }

    pub fn is_placed(&self, value: Value) -> bool {
        self.value_blocks[value].is_valid()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlockDef {
    /// Label used in the text format.
    pub name: String,
    /// Instructions in this block.
    pub insts: Vec<Value>,
    /// Terminator: branch or return.
    pub terminator: Terminator,
    /// Source location of the terminator, if any.
    pub terminator_loc: Option<SourceLoc>,
    /// Successor blocks.
    pub succs: Vec<Block>,
    /// Predecessor blocks.
    pub preds: Vec<Block>,
}

#[derive(Clone, Debug)]
pub enum Terminator {
    Br {
        target: Block,
    },
    CondBr {
        cond: Value,
        if_true: Block,
        if_false: Block,
    },
    Return {
        value: Option<Value>,
    },
    Unreachable,
    None,
}

impl std::default::Default for Terminator {
    fn default() -> Self {
        Terminator::None
    }
}

impl Terminator {
    pub fn visit_successors<F: FnMut(Block)>(&self, mut f: F) {
        match self {
            &Terminator::Br { target } => f(target),
            &Terminator::CondBr {
                if_true, if_false, ..
            } => {
                f(if_true);
                f(if_false);
            }
            Terminator::Return { .. } | Terminator::Unreachable | Terminator::None => {}
        }
    }

    pub fn visit_uses<F: FnMut(Value)>(&self, mut f: F) {
        match self {
            &Terminator::CondBr { cond, .. } => f(cond),
            &Terminator::Return { value: Some(value) } => f(value),
            _ => {}
        }
    }

    /// The branch condition, for conditional branches.
    pub fn condition(&self) -> Option<Value> {
        match self {
            &Terminator::CondBr { cond, .. } => Some(cond),
            _ => None,
        }
    }
}
