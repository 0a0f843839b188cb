use std::fmt;

/// Number of index slots a value occupies
///
/// `long` and `double` take two slots, both in the constant pool and in local variables.
pub trait Width {
    fn width(&self) -> usize;
}

/// Index into an [`OffsetVec`], counted in slots rather than in entries
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// Append-only vector whose entries are addressed by the total width of the entries before them
#[derive(Clone)]
pub struct OffsetVec<T> {
    entries: Vec<(Offset, T)>,
    next: Offset,
}

impl<T: Width> OffsetVec<T> {
    pub fn new() -> OffsetVec<T> {
        OffsetVec::new_starting_at(Offset(0))
    }

    /// Empty vector whose first entry lands at `first` (the constant pool starts at 1)
    pub fn new_starting_at(first: Offset) -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            next: first,
        }
    }

    /// Number of entries, regardless of their width
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset the next pushed entry will get
    pub fn offset_len(&self) -> Offset {
        self.next
    }

    pub fn push(&mut self, entry: T) -> Offset {
        let offset = self.next;
        self.next.0 += entry.width();
        self.entries.push((offset, entry));
        offset
    }

    /// Entry starting exactly at `offset`
    ///
    /// The second slot of a wide entry resolves to nothing.
    pub fn get_offset(&self, offset: Offset) -> Option<&T> {
        let found = self
            .entries
            .binary_search_by_key(&offset, |(start, _)| *start)
            .ok()?;
        Some(&self.entries[found].1)
    }

    /// Entries along with their offsets, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Offset, &T)> {
        self.entries.iter().map(|(offset, entry)| (*offset, entry))
    }
}

impl<T: Width> Default for OffsetVec<T> {
    fn default() -> Self {
        OffsetVec::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(offset, entry)| (offset.0, entry)))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Slot {
        Int(i32),
        Long(i64),
    }

    impl Width for Slot {
        fn width(&self) -> usize {
            match self {
                Slot::Int(_) => 1,
                Slot::Long(_) => 2,
            }
        }
    }

    #[test]
    fn wide_entries_take_two_offsets() {
        let mut slots = OffsetVec::new();
        slots.push(Slot::Int(1));
        slots.push(Slot::Long(2));
        slots.push(Slot::Int(3));
        assert_eq!(
            slots.iter().map(|(offset, slot)| (offset, *slot)).collect::<Vec<_>>(),
            vec![
                (Offset(0), Slot::Int(1)),
                (Offset(1), Slot::Long(2)),
                (Offset(3), Slot::Int(3)),
            ]
        );
        assert_eq!(slots.offset_len(), Offset(4));
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn lookup_by_offset() {
        let mut slots = OffsetVec::new_starting_at(Offset(1));
        assert_eq!(slots.push(Slot::Long(7)), Offset(1));
        assert_eq!(slots.push(Slot::Int(8)), Offset(3));

        assert_eq!(slots.get_offset(Offset(0)), None);
        assert_eq!(slots.get_offset(Offset(1)), Some(&Slot::Long(7)));
        assert_eq!(slots.get_offset(Offset(2)), None);
        assert_eq!(slots.get_offset(Offset(3)), Some(&Slot::Int(8)));
        assert_eq!(slots.get_offset(Offset(4)), None);
    }
}
