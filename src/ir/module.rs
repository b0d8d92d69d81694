use super::{Debug, Func, FuncDecl, Global, ModuleDisplay, ModuleGraph};
use crate::entity::EntityVec;
use crate::frontend;
use anyhow::{Context, Result};

/// A program, represented as a collection of IR entities.
///
/// The ordinary flow for a tool that traces a program is:
///
/// - Parse text IR with `Module::from_text()`.
/// - Build a `ModuleGraph` over it with `Module::graph()`.
/// - Discover seeds and trace them with `passes::seeds::run()`.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// The functions in this module: imports (known by name only)
    /// and bodies.
    pub funcs: EntityVec<Func, FuncDecl>,
    /// Global variables in this module.
    pub globals: EntityVec<Global, GlobalData>,
    /// Debug-info associated with function bodies: interning pools
    /// for source files and locations in those files.
    pub debug: Debug,
}

/// A global-variable definition.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalData {
    pub name: String,
}

impl Module {
    pub fn empty() -> Module {
        Module::default()
    }

    pub fn from_text(text: &str) -> Result<Module> {
        frontend::text_to_ir(text)
    }

    pub fn func_by_name(&self, name: &str) -> Option<Func> {
        self.funcs
            .entries()
            .find(|(_, decl)| decl.name() == name)
            .map(|(func, _)| func)
    }

    pub fn global_by_name(&self, name: &str) -> Option<Global> {
        self.globals
            .entries()
            .find(|(_, data)| data.name == name)
            .map(|(global, _)| global)
    }

    pub fn graph(&self) -> ModuleGraph<'_> {
        ModuleGraph::new(self)
    }

    pub fn validate(&self) -> Result<()> {
        for decl in self.funcs.values() {
            if let FuncDecl::Body(name, body) = decl {
                body.validate()
                    .with_context(|| format!("in function @{}", name))?;
            }
        }
        Ok(())
    }

    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay(self)
    }
}
