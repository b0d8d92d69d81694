//! Source-location resolution.

use super::{InstructionGraph, NodeKind};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A complete source coordinate. Partial locations do not exist: a
/// node either has all four fields or no location at all.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub directory: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.directory.is_empty() {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        } else {
            write!(
                f,
                "{}/{}:{}:{}",
                self.directory.trim_end_matches('/'),
                self.file,
                self.line,
                self.column
            )
        }
    }
}

/// Resolves the source location of `node`. Only instructions carry
/// locations; parameters, globals and constants always resolve to
/// `None`, whatever the host reports for them.
pub fn resolve<G: InstructionGraph>(graph: &G, node: G::Node) -> Option<Location> {
    match graph.kind(node) {
        NodeKind::Parameter(..) | NodeKind::Global | NodeKind::Constant => None,
        _ => graph.debug_location(node),
    }
}

/// Renders an optional location, spelling out its absence.
pub struct LocationDisplay<'a>(pub Option<&'a Location>);

impl<'a> Display for LocationDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self.0 {
            Some(loc) => write!(f, "{}", loc),
            None => write!(f, "no debug info available"),
        }
    }
}
