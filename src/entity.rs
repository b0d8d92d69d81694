//! Typed indices for IR entities, and the tables keyed by them.
//!
//! Every function, block, value, global and debug-info record is
//! named by a small `Copy` index. `EntityVec` owns the records and
//! hands out indices on `push`; `PerEntity` attaches optional side
//! data (names, locations, use lists) without touching the owner.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

pub trait EntityRef: Copy + Eq + Ord + Hash + Debug {
    fn new(index: usize) -> Self;
    fn index(self) -> usize;

    /// A sentinel that never names a real entity.
    fn invalid() -> Self;

    fn is_valid(self) -> bool {
        self != Self::invalid()
    }
    fn is_invalid(self) -> bool {
        !self.is_valid()
    }
}

/// Declares a `u32`-backed index type that prints as `{prefix}{index}`
/// and defaults to the invalid sentinel.
#[macro_export]
macro_rules! declare_entity {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $crate::entity::EntityRef for $name {
            fn new(index: usize) -> Self {
                assert!(
                    index < u32::MAX as usize,
                    "too many {} entities",
                    stringify!($name)
                );
                $name(index as u32)
            }
            fn index(self) -> usize {
                self.0 as usize
            }
            fn invalid() -> Self {
                $name(u32::MAX)
            }
        }

        impl std::convert::From<u32> for $name {
            fn from(index: u32) -> Self {
                <$name as $crate::entity::EntityRef>::new(index as usize)
            }
        }

        impl std::default::Default for $name {
            fn default() -> Self {
                <$name as $crate::entity::EntityRef>::invalid()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                if self.0 == u32::MAX {
                    write!(f, "{}<invalid>", $prefix)
                } else {
                    write!(f, "{}{}", $prefix, self.0)
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Display::fmt(self, f)
            }
        }
    };
}

/// The owning table for one kind of entity.
#[derive(Clone, Debug)]
pub struct EntityVec<Idx, T> {
    items: Vec<T>,
    _index: PhantomData<fn(Idx) -> Idx>,
}

impl<Idx, T> Default for EntityVec<Idx, T> {
    fn default() -> Self {
        EntityVec {
            items: Vec::new(),
            _index: PhantomData,
        }
    }
}

impl<Idx: EntityRef, T> EntityVec<Idx, T> {
    /// Appends `item` and returns its index.
    pub fn push(&mut self, item: T) -> Idx {
        let id = Idx::new(self.items.len());
        self.items.push(item);
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All indices, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = Idx> {
        (0..self.items.len()).map(Idx::new)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Idx, &T)> {
        self.iter().zip(self.items.iter())
    }

    /// Looks up `id`, which may be invalid or belong to another table.
    pub fn get(&self, id: Idx) -> Option<&T> {
        if id.is_invalid() {
            None
        } else {
            self.items.get(id.index())
        }
    }
}

impl<Idx: EntityRef, T> Index<Idx> for EntityVec<Idx, T> {
    type Output = T;
    fn index(&self, id: Idx) -> &T {
        &self.items[id.index()]
    }
}

impl<Idx: EntityRef, T> IndexMut<Idx> for EntityVec<Idx, T> {
    fn index_mut(&mut self, id: Idx) -> &mut T {
        &mut self.items[id.index()]
    }
}

/// Side data for entities owned elsewhere. Entities never written
/// read as `T::default()`; writing grows the table as needed.
#[derive(Clone, Debug)]
pub struct PerEntity<Idx, T> {
    items: Vec<T>,
    fallback: T,
    _index: PhantomData<fn(Idx) -> Idx>,
}

impl<Idx, T: Default> Default for PerEntity<Idx, T> {
    fn default() -> Self {
        PerEntity {
            items: Vec::new(),
            fallback: T::default(),
            _index: PhantomData,
        }
    }
}

impl<Idx: EntityRef, T> Index<Idx> for PerEntity<Idx, T> {
    type Output = T;
    fn index(&self, id: Idx) -> &T {
        self.items.get(id.index()).unwrap_or(&self.fallback)
    }
}

impl<Idx: EntityRef, T: Default> IndexMut<Idx> for PerEntity<Idx, T> {
    fn index_mut(&mut self, id: Idx) -> &mut T {
        let index = id.index();
        if index >= self.items.len() {
            self.items.resize_with(index + 1, T::default);
        }
        &mut self.items[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    crate::declare_entity!(Thing, "t");

    #[test]
    fn push_hands_out_indices() {
        let mut things: EntityVec<Thing, &str> = EntityVec::default();
        let a = things.push("a");
        let b = things.push("b");
        assert_eq!((a.to_string(), b.to_string()), ("t0".to_owned(), "t1".to_owned()));
        assert_eq!(things[b], "b");
        assert_eq!(things.entries().collect::<Vec<_>>(), vec![(a, &"a"), (b, &"b")]);
        assert_eq!(things.get(Thing::invalid()), None);
        assert_eq!(things.get(Thing::from(7)), None);
        assert_eq!(Thing::default().to_string(), "t<invalid>");
    }

    #[test]
    fn side_table_reads_default() {
        let mut names: PerEntity<Thing, Option<String>> = PerEntity::default();
        let far = Thing::from(10);
        assert_eq!(names[far], None);
        names[far] = Some("far".to_owned());
        assert_eq!(names[far].as_deref(), Some("far"));
        assert_eq!(names[Thing::from(3)], None);
    }
}
