//! Seed discovery: find the values worth tracing in a module and
//! trace each one.

use crate::ir::*;
use crate::trace::{InstructionGraph, TraceConfig, TraceResult, Tracer};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Why a value was chosen as a seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedKind {
    /// The condition of the conditional branch ending `block`.
    BranchCondition { block: Block },
    /// The `index`th argument of `call`, a call to an input routine.
    InputArgument { call: Value, index: usize },
}

/// A value worth tracing. `node` is the node handed to the tracer,
/// canonical for global references, so it may live outside `site`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Seed {
    pub node: Node,
    /// The function the seed was found in.
    pub site: Func,
    pub kind: SeedKind,
}

impl Seed {
    pub fn display<'a>(&'a self, module: &'a Module) -> SeedDisplay<'a> {
        SeedDisplay { seed: self, module }
    }
}

pub struct SeedDisplay<'a> {
    seed: &'a Seed,
    module: &'a Module,
}

impl<'a> Display for SeedDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let decl = &self.module.funcs[self.seed.site];
        let body = match decl.body() {
            Some(body) => body,
            None => return write!(f, "{}", self.seed.node),
        };
        // A global argument's canonical node may live in another body.
        let operand_body = match self.module.funcs[self.seed.node.func].body() {
            Some(body) => body,
            None => return write!(f, "{}", self.seed.node),
        };
        let operand = OperandDisplay {
            body: operand_body,
            module: self.module,
            value: self.seed.node.value,
        };
        match self.seed.kind {
            SeedKind::BranchCondition { block } => write!(
                f,
                "@{}: {} (condition of branch in {})",
                decl.name(),
                operand,
                body.blocks[block].name
            ),
            SeedKind::InputArgument { call, index } => write!(
                f,
                "@{}: {} (argument {} of `{}`)",
                decl.name(),
                operand,
                index,
                InstDisplay {
                    body,
                    module: self.module,
                    value: call,
                }
            ),
        }
    }
}

/// A seed and its trace.
#[derive(Clone, Debug)]
pub struct SeedTrace {
    pub seed: Seed,
    pub result: TraceResult<Node>,
}

/// Collects seeds in program order: function by function, block by
/// block, the arguments of input-routine calls in instruction order
/// and then the block's branch condition.
pub fn collect(module: &Module, config: &TraceConfig) -> Vec<Seed> {
    collect_in(&module.graph(), config)
}

/// Like `collect`, over a graph the caller already built.
pub fn collect_in(graph: &ModuleGraph, config: &TraceConfig) -> Vec<Seed> {
    let module = graph.module();
    let mut seeds = vec![];
    for (func, decl) in module.funcs.entries() {
        let body = match decl.body() {
            Some(body) => body,
            None => continue,
        };
        for (block, data) in body.blocks.entries() {
            for &inst in &data.insts {
                let call = Node { func, value: inst };
                let name = match graph.callee_name(call) {
                    Some(name) if config.input_routines.matches(name) => name,
                    _ => continue,
                };
                log::trace!("seeds: call to input routine @{} at {}", name, inst);
                let args = (0..).map_while(|index| graph.call_argument(call, index));
                for (index, node) in args.enumerate() {
                    seeds.push(Seed {
                        node,
                        site: func,
                        kind: SeedKind::InputArgument { call: inst, index },
                    });
                }
            }
            if let Some(cond) = data.terminator.condition() {
                seeds.push(Seed {
                    node: graph.canonical(Node { func, value: cond }),
                    site: func,
                    kind: SeedKind::BranchCondition { block },
                });
            }
        }
        log::debug!("seeds: @{}: {} seeds so far", decl.name(), seeds.len());
    }
    seeds
}

/// Traces every seed of `module` with a single tracer, so that a
/// per-module ledger carries across seeds.
pub fn run(module: &Module, config: &TraceConfig) -> Vec<SeedTrace> {
    let graph = module.graph();
    let mut tracer = Tracer::new(&graph, config);
    collect_in(&graph, config)
        .into_iter()
        .map(|seed| SeedTrace {
            seed,
            result: tracer.trace(seed.node),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::{CallOrigin, Category, LedgerScope};

    const PROGRAM: &str = r#"
declare @scanf
declare @puts

func @main(%argc) {
entry:
  %x = alloca
  %n = call @scanf(%argc, %x)
  call @puts(%argc)
  %v = load %x
  %c = icmp.slt %v, 10
  br_if %c, small, done
small:
  %d = icmp.eq %v, 0
  br_if %d, done, done
done:
  ret
}
"#;

    #[test]
    fn collects_conditions_and_input_arguments() {
        let _ = env_logger::try_init();
        let module = Module::from_text(PROGRAM).unwrap();
        let config = TraceConfig::default();
        let seeds = collect(&module, &config);

        let main = module.func_by_name("main").unwrap();
        let body = module.funcs[main].body().unwrap();
        let value = |name| body.value_by_name(name).unwrap();
        let n = value("n");
        assert_eq!(
            seeds.iter().map(|seed| seed.kind).collect::<Vec<_>>(),
            vec![
                SeedKind::InputArgument { call: n, index: 0 },
                SeedKind::InputArgument { call: n, index: 1 },
                SeedKind::BranchCondition { block: body.entry },
                SeedKind::BranchCondition {
                    block: body.block_by_name("small").unwrap()
                },
            ]
        );
        assert_eq!(seeds[1].node, Node { func: main, value: value("x") });
        assert_eq!(seeds[3].node, Node { func: main, value: value("d") });
        assert_eq!(
            seeds[1].display(&module).to_string(),
            "@main: %x (argument 1 of `%n = call @scanf(%argc, %x)`)"
        );
        assert_eq!(
            seeds[2].display(&module).to_string(),
            "@main: %c (condition of branch in entry)"
        );
    }

    #[test]
    fn global_arguments_use_the_canonical_node() {
        let _ = env_logger::try_init();
        let module = Module::from_text(
            r#"
global @buf
declare @scanf

func @clear() {
entry:
  store 0, @buf
  ret
}

func @read() {
entry:
  %n = call @scanf(@buf)
  br_if %n, done, done
done:
  ret
}
"#,
        )
        .unwrap();
        let graph = module.graph();
        let seeds = collect_in(&graph, &TraceConfig::default());
        assert_eq!(seeds.len(), 2);

        let clear = module.func_by_name("clear").unwrap();
        let read = module.func_by_name("read").unwrap();
        let n = module.funcs[read].body().unwrap().value_by_name("n").unwrap();
        let arg = seeds[0];
        assert_eq!(arg.kind, SeedKind::InputArgument { call: n, index: 0 });
        assert_eq!(arg.site, read);
        assert_eq!(arg.node.func, clear);
        assert_eq!(graph.call_argument(Node { func: read, value: n }, 0), Some(arg.node));
        assert_eq!(
            arg.display(&module).to_string(),
            "@read: @buf (argument 0 of `%n = call @scanf(@buf)`)"
        );
    }

    #[test]
    fn run_traces_every_seed() {
        let _ = env_logger::try_init();
        let module = Module::from_text(PROGRAM).unwrap();
        let traces = run(&module, &TraceConfig::default());
        assert_eq!(traces.len(), 4);

        // The alloca handed to scanf is linked to the call by the
        // forward scan, from the branch condition's trace.
        let cond = &traces[2];
        let seminal = cond.result.seminal_inputs().collect::<Vec<_>>();
        assert_eq!(seminal.len(), 1);
        assert_eq!(
            seminal[0].category,
            Category::Call(CallOrigin::Input {
                callee: "scanf".to_owned()
            })
        );
    }

    #[test]
    fn module_scope_shares_the_ledger() {
        let _ = env_logger::try_init();
        let module = Module::from_text(PROGRAM).unwrap();
        let config = TraceConfig {
            scope: LedgerScope::PerModule,
            ..TraceConfig::default()
        };
        let traces = run(&module, &config);

        // `%d` depends on `%v`, which the previous seed expanded.
        let last = &traces[3].result;
        let main = module.func_by_name("main").unwrap();
        let v = module.funcs[main].body().unwrap().value_by_name("v").unwrap();
        let v = Node { func: main, value: v };
        assert!(last.visit_of(v).is_none());
        assert!(last.entries().iter().any(|entry| entry.node == v && entry.revisit));
    }

    #[test]
    fn no_input_routines_means_no_argument_seeds() {
        let module = Module::from_text(PROGRAM).unwrap();
        let mut config = TraceConfig::default();
        config.input_routines = crate::trace::InputRoutines::none();
        let seeds = collect(&module, &config);
        assert_eq!(seeds.len(), 2);
        assert!(seeds
            .iter()
            .all(|seed| matches!(seed.kind, SeedKind::BranchCondition { .. })));
    }
}
