use crate::jvm::Error;
use crate::util::CodeStream;
use std::fmt;

/// Opaque jump target inside one method body
///
/// Labels start out unbound and get bound to a code offset exactly once with
/// [`LabelTable::mark`]. Branches can refer to a label before it is bound.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(usize);

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}

/// Pending patch of a branch operand
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fixup {
    pub label: Label,

    /// Offset of the instruction the jump is relative to
    pub origin: usize,

    /// Offset of the placeholder bytes
    pub position: usize,

    /// Width of the placeholder (2 or 4 bytes)
    pub size: u8,
}

/// Labels of a method along with the branch operands waiting for them
#[derive(Default, Debug)]
pub struct LabelTable {
    offsets: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable::default()
    }

    /// Fresh unbound label
    pub fn define(&mut self) -> Label {
        let label = Label(self.offsets.len());
        self.offsets.push(None);
        label
    }

    /// Bind a label to an offset
    pub fn mark(&mut self, label: Label, offset: usize) -> Result<(), Error> {
        match self.offsets.get_mut(label.0) {
            Some(Some(_)) => Err(Error::LabelAlreadyMarked(label)),
            Some(slot) => {
                log::trace!("Marking {:?} at {}", label, offset);
                *slot = Some(offset);
                Ok(())
            }
            None => Err(Error::UnmarkedLabel(label)),
        }
    }

    pub fn offset_of(&self, label: Label) -> Option<usize> {
        self.offsets.get(label.0).copied().flatten()
    }

    pub fn is_marked(&self, label: Label) -> bool {
        self.offset_of(label).is_some()
    }

    /// Number of labels defined so far
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn add_fixup(&mut self, label: Label, origin: usize, position: usize, size: u8) {
        self.fixups.push(Fixup {
            label,
            origin,
            position,
            size,
        });
    }

    pub fn fixups(&self) -> &[Fixup] {
        &self.fixups
    }

    /// Patch every branch operand with `label offset - origin`
    ///
    /// Two byte operands must fit in an `i16`: there is no automatic widening.
    pub fn resolve(&self, code: &mut CodeStream) -> Result<(), Error> {
        for fixup in &self.fixups {
            let target = self
                .offset_of(fixup.label)
                .ok_or(Error::UnmarkedLabel(fixup.label))?;
            let offset = target as isize - fixup.origin as isize;
            log::trace!(
                "Resolving {:?} at {} (origin {}) to {:+}",
                fixup.label,
                fixup.position,
                fixup.origin,
                offset
            );
            if fixup.size == 2 {
                if offset < i16::MIN as isize || offset > i16::MAX as isize {
                    return Err(Error::BranchOffsetOverflow {
                        label: fixup.label,
                        origin: fixup.origin,
                        offset,
                    });
                }
                code.patch_i16(fixup.position, offset as i16);
            } else {
                code.patch_i32(fixup.position, offset as i32);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_bind_once() {
        let mut labels = LabelTable::new();
        let label = labels.define();
        assert!(!labels.is_marked(label));
        labels.mark(label, 7).unwrap();
        assert_eq!(labels.offset_of(label), Some(7));
        assert!(matches!(
            labels.mark(label, 9),
            Err(Error::LabelAlreadyMarked(l)) if l == label
        ));
    }

    #[test]
    fn forward_and_backward_fixups() {
        let mut code = CodeStream::new();
        let mut labels = LabelTable::new();
        let back = labels.define();
        let forward = labels.define();

        labels.mark(back, 0).unwrap();
        code.put_u8(0x00);
        code.put_u8(0xA7);
        code.put_i16(0);
        labels.add_fixup(back, 1, 2, 2);
        code.put_u8(0xC8);
        code.put_i32(0);
        labels.add_fixup(forward, 4, 5, 4);
        labels.mark(forward, code.len()).unwrap();

        labels.resolve(&mut code).unwrap();
        assert_eq!(
            code.as_slice(),
            &[0x00, 0xA7, 0xFF, 0xFF, 0xC8, 0x00, 0x00, 0x00, 0x05]
        );
    }

    #[test]
    fn unmarked_labels_are_rejected() {
        let mut code = CodeStream::new();
        code.put_u8(0xA7);
        code.put_i16(0);
        let mut labels = LabelTable::new();
        let label = labels.define();
        labels.add_fixup(label, 0, 1, 2);
        assert!(matches!(
            labels.resolve(&mut code),
            Err(Error::UnmarkedLabel(l)) if l == label
        ));
    }

    #[test]
    fn short_branches_do_not_widen() {
        let mut code = CodeStream::new();
        code.put_u8(0xA7);
        code.put_i16(0);
        let mut labels = LabelTable::new();
        let label = labels.define();
        labels.add_fixup(label, 0, 1, 2);
        labels.mark(label, 40_000).unwrap();
        assert!(matches!(
            labels.resolve(&mut code),
            Err(Error::BranchOffsetOverflow { offset: 40_000, .. })
        ));
    }
}
