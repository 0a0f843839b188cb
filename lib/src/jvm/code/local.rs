use crate::jvm::Type;

/// Handle to a local variable declared in a [`super::CodeGenerator`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Local(pub(super) usize);

impl Local {
    /// Position in declaration order
    pub fn index(self) -> usize {
        self.0
    }
}

/// Declared local variable
///
/// Locals don't store their slot: that is computed from the receiver, the parameters, and the
/// width of every local declared before this one.
#[derive(Clone, Debug)]
pub struct LocalBuilder {
    pub index: usize,
    pub name: Option<String>,
    pub local_type: Type,

    /// Offset right after the initializing store (or of the first access, if that is a read)
    pub start: Option<usize>,

    /// Offset right after the last instruction accessing the local
    pub end: Option<usize>,
}

impl LocalBuilder {
    pub fn new(index: usize, name: Option<String>, local_type: Type) -> LocalBuilder {
        LocalBuilder {
            index,
            name,
            local_type,
            start: None,
            end: None,
        }
    }

    /// Extend the range of validity to cover an access spanning `start..end`
    ///
    /// The local only holds a value once its first store completes, so a leading store opens the
    /// range at `end`.
    pub fn record_access(&mut self, start: usize, end: usize, is_store: bool) {
        if self.start.is_none() {
            self.start = Some(if is_store { end } else { start });
        }
        self.end = Some(end);
    }
}
