use super::{Block, Func, Global, Value};
use smallvec::SmallVec;

/// The definition of an SSA value.
///
/// Values that are not instructions (`Param`, `Global`, `Const`,
/// `Undef`) are never placed in a block. `Store` and calls whose
/// result is never named are placed in a block like any other
/// instruction but have no users.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// The `index`th formal parameter of the enclosing function.
    Param(usize),
    /// A stack slot; the value is its address.
    Alloca,
    /// The address of a module-level global.
    Global(Global),
    Const(i64),
    Undef,
    Load(Value),
    Store { value: Value, addr: Value },
    Call { callee: Func, args: Vec<Value> },
    /// One `(predecessor, value)` pair per incoming edge.
    Phi(Vec<(Block, Value)>),
    /// Any other computation: arithmetic, comparisons, casts,
    /// address arithmetic. The opcode is kept as written.
    Operator(String, Vec<Value>),
}

impl std::default::Default for ValueDef {
    fn default() -> Self {
        ValueDef::Undef
    }
}

impl ValueDef {
    /// Is this definition an instruction, i.e., something that lives
    /// in a block and may carry a source location?
    pub fn is_inst(&self) -> bool {
        !matches!(
            self,
            ValueDef::Param(..) | ValueDef::Global(..) | ValueDef::Const(..) | ValueDef::Undef
        )
    }

    pub fn visit_uses<F: FnMut(Value)>(&self, mut f: F) {
        match self {
            &ValueDef::Param(..)
            | &ValueDef::Alloca
            | &ValueDef::Global(..)
            | &ValueDef::Const(..)
            | &ValueDef::Undef => {}
            &ValueDef::Load(addr) => f(addr),
            &ValueDef::Store { value, addr } => {
                f(value);
                f(addr);
            }
            &ValueDef::Call { ref args, .. } | &ValueDef::Operator(_, ref args) => {
                for &arg in args {
                    f(arg);
                }
            }
            &ValueDef::Phi(ref incoming) => {
                for &(_, value) in incoming {
                    f(value);
                }
            }
        }
    }

    /// Operands in order. Phi operands are the incoming values in
    /// edge order.
    pub fn operands(&self) -> SmallVec<[Value; 4]> {
        let mut ret = SmallVec::new();
        self.visit_uses(|value| ret.push(value));
        ret
    }
}
