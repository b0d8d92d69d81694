//! Rendering trace results for diagnostic output.

use super::{Edge, InstructionGraph, LocationDisplay, TraceResult};
use std::fmt::{Display, Formatter, Result as FmtResult};

impl<N: Copy + Eq> TraceResult<N> {
    pub fn display<'a, G: InstructionGraph<Node = N>>(
        &'a self,
        graph: &'a G,
    ) -> TraceDisplay<'a, G> {
        TraceDisplay {
            result: self,
            graph,
        }
    }
}

/// One line per entry, indented by depth:
///
/// ```plain
/// trace of `%c = icmp.slt %v, 10` in @main
///   `%c = icmp.slt %v, 10` in @main: computation @ /src/main.c:6:9
///     operand 0: `%v = load %x` in @main: computation @ /src/main.c:6:7
///       operand 0: `%x = alloca` in @main: local variable @ /src/main.c:4:7
///         used by: `%n = call @scanf(@fmt, %x)` in @main: external input from `scanf` @ /src/main.c:5:3
///         used by: `%v = load %x` in @main: computation @ /src/main.c:6:7
///     operand 1: 10: constant @ no debug info available
///   2 origin(s), 1 seminal input(s)
/// ```
pub struct TraceDisplay<'a, G: InstructionGraph> {
    result: &'a TraceResult<G::Node>,
    graph: &'a G,
}

impl<'a, G: InstructionGraph> Display for TraceDisplay<'a, G> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(f, "trace of {}", self.graph.describe(self.result.seed()))?;
        for entry in self.result.entries() {
            write!(f, "{:width$}", "", width = 2 * (entry.depth + 1))?;
            match &entry.edge {
                Edge::Seed => {}
                Edge::Operand(index) => write!(f, "operand {}: ", index)?,
                Edge::Incoming(block) => write!(f, "from {}: ", block)?,
                Edge::Use { .. } => write!(f, "used by: ")?,
                Edge::StoredValue { .. } => write!(f, "stored value: ")?,
            }
            write!(f, "{}", self.graph.describe(entry.node))?;
            if entry.revisit {
                writeln!(f, " (already traced)")?;
                continue;
            }
            writeln!(
                f,
                ": {} @ {}",
                entry.category.label(),
                LocationDisplay(entry.location.as_ref())
            )?;
        }
        let origins = self.result.origins().count();
        let seminal = self.result.seminal_inputs().count();
        writeln!(f, "  {} origin(s), {} seminal input(s)", origins, seminal)?;
        Ok(())
    }
}
