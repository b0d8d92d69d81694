//! Debug info: interning pools for source files and source locations.

use crate::declare_entity;
use crate::entity::EntityVec;
use crate::trace::Location;
use fxhash::FxHashMap;
use std::collections::hash_map::Entry as HashEntry;

declare_entity!(SourceFile, "f");
declare_entity!(SourceLoc, "loc");

#[derive(Clone, Debug, Default)]
pub struct Debug {
    pub source_files: EntityVec<SourceFile, SourceFileData>,
    source_file_dedup: FxHashMap<SourceFileData, SourceFile>,
    pub source_locs: EntityVec<SourceLoc, SourceLocData>,
    source_loc_dedup: FxHashMap<SourceLocData, SourceLoc>,
}

/// A source file as recorded by the compiler: the compilation
/// directory and the file name relative to it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceFileData {
    pub directory: String,
    pub file: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocData {
    pub file: SourceFile,
    pub line: u32,
    pub col: u32,
}

impl Debug {
    pub fn intern_file(&mut self, directory: &str, file: &str) -> SourceFile {
        let data = SourceFileData {
            directory: directory.to_owned(),
            file: file.to_owned(),
        };
        match self.source_file_dedup.entry(data) {
            HashEntry::Vacant(v) => {
                let id = self.source_files.push(v.key().clone());
                *v.insert(id)
            }
            HashEntry::Occupied(o) => *o.get(),
        }
    }

    pub fn intern_loc(&mut self, file: SourceFile, line: u32, col: u32) -> SourceLoc {
        let data = SourceLocData { file, line, col };
        match self.source_loc_dedup.entry(data) {
            HashEntry::Vacant(v) => {
                let id = self.source_locs.push(data);
                *v.insert(id)
            }
            HashEntry::Occupied(o) => *o.get(),
        }
    }

    /// Expands an interned location into the full coordinate. Returns
    /// `None` for locations (or files) this pool never handed out.
    pub fn location(&self, loc: SourceLoc) -> Option<Location> {
        let data = self.source_locs.get(loc)?;
        let file = self.source_files.get(data.file)?;
        Some(Location {
            directory: file.directory.clone(),
            file: file.file.clone(),
            line: data.line,
            column: data.col,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn interning_dedups() {
        let mut debug = Debug::default();
        let a = debug.intern_file("/src", "main.c");
        let b = debug.intern_file("/src", "util.c");
        assert_ne!(a, b);
        assert_eq!(a, debug.intern_file("/src", "main.c"));

        let l1 = debug.intern_loc(a, 3, 7);
        assert_eq!(l1, debug.intern_loc(a, 3, 7));
        assert_ne!(l1, debug.intern_loc(b, 3, 7));
        assert_eq!(debug.source_locs.len(), 2);

        let loc = debug.location(l1).unwrap();
        assert_eq!(loc.directory, "/src");
        assert_eq!(loc.file, "main.c");
        assert_eq!((loc.line, loc.column), (3, 7));
    }

    #[test]
    fn unknown_loc_is_none() {
        let debug = Debug::default();
        assert!(debug.location(SourceLoc::new(4)).is_none());
        assert!(debug.location(SourceLoc::invalid()).is_none());
    }
}
