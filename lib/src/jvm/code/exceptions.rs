//! Structured exception regions
//!
//! Code generation opens and closes `try`/`catch`/`finally` blocks as a lexical nest. Each block
//! is tracked as an [`ExceptionRegion`] that moves through
//! `Try -> (Filter | Catch)* -> Finally? -> Done`. Once the method is finished, every region is
//! lowered into flat rows of the `Code` attribute's exception table.

use super::{Label, OpCode};
use crate::jvm::{Error, Type};
use std::cmp::Ordering;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Catch,
    Filter,
    Finally,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegionState {
    Try,
    Filter,
    Catch,
    Finally,
    Done,
}

/// One handler of an exception region
#[derive(Clone, Debug)]
pub struct Handler {
    pub kind: HandlerKind,

    /// Start of the handler code
    pub address: usize,

    /// End of the handler code (exclusive), known once the next handler starts
    pub end_address: Option<usize>,

    /// Caught type (`None` for finally handlers)
    pub catch_type: Option<Type>,
}

/// Flattened exception table row, before the catch type is interned
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionRow {
    pub start: usize,
    pub end: usize,
    pub handler: usize,

    /// `None` catches everything
    pub catch_type: Option<Type>,
}

/// `try` block along with all of its handlers
#[derive(Clone, Debug)]
pub struct ExceptionRegion {
    start_address: usize,

    /// End of the `try` section (exclusive)
    try_end: Option<usize>,

    end_label: Label,
    finally_end_label: Option<Label>,
    finally_address: Option<usize>,
    handlers: Vec<Handler>,
    state: RegionState,
}

impl ExceptionRegion {
    pub fn new(start_address: usize, end_label: Label) -> ExceptionRegion {
        ExceptionRegion {
            start_address,
            try_end: None,
            end_label,
            finally_end_label: None,
            finally_address: None,
            handlers: vec![],
            state: RegionState::Try,
        }
    }

    pub fn start_address(&self) -> usize {
        self.start_address
    }

    /// End of the `try` section
    ///
    /// Unless set explicitly with [`ExceptionRegion::mark_try_end`], this is the address of the
    /// first handler.
    pub fn end_address(&self) -> usize {
        self.try_end.unwrap_or(self.start_address)
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn end_label(&self) -> Label {
        self.end_label
    }

    pub fn finally_end_label(&self) -> Option<Label> {
        self.finally_end_label
    }

    pub fn set_finally_end_label(&mut self, label: Label) {
        self.finally_end_label = Some(label);
    }

    pub fn finally_address(&self) -> Option<usize> {
        self.finally_address
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn mark_try_end(&mut self, address: usize) {
        self.try_end = Some(address);
    }

    /// Start a new handler, closing off the previous one at `previous_end`
    fn mark_handler(
        &mut self,
        address: usize,
        previous_end: usize,
        catch_type: Option<Type>,
        kind: HandlerKind,
    ) {
        if kind != HandlerKind::Filter {
            if let Some(previous) = self.handlers.last_mut() {
                previous.end_address = Some(previous_end);
            }
        }
        self.handlers.push(Handler {
            kind,
            address,
            end_address: None,
            catch_type,
        });
        if self.try_end.is_none() {
            self.try_end = Some(address);
        }
    }

    pub fn mark_filter_address(&mut self, address: usize) {
        self.state = RegionState::Filter;
        self.mark_handler(address, address, None, HandlerKind::Filter);
    }

    pub fn mark_catch_address(&mut self, address: usize, catch_type: Type) {
        self.state = RegionState::Catch;
        self.mark_handler(address, address, Some(catch_type), HandlerKind::Catch);
    }

    /// Start the finally handler at `address`, ending the previous handler at `catch_end`
    pub fn mark_finally_address(&mut self, address: usize, catch_end: usize) -> Result<(), Error> {
        if self.finally_address.is_some() {
            return Err(Error::DuplicateFinallyBlock);
        }
        self.state = RegionState::Finally;
        self.finally_address = Some(address);
        self.mark_handler(address, catch_end, None, HandlerKind::Finally);
        Ok(())
    }

    /// Close the region, ending the last handler at `end_address`
    pub fn done(&mut self, end_address: usize) {
        if let Some(last) = self.handlers.last_mut() {
            last.end_address = Some(end_address);
        }
        self.state = RegionState::Done;
    }

    fn last_handler_end(&self) -> usize {
        self.handlers
            .last()
            .and_then(|handler| handler.end_address)
            .unwrap_or_else(|| self.end_address())
    }

    /// Whether an exception of the given type thrown inside the `try` section is caught here
    pub fn catches(&self, thrown: &Type) -> bool {
        self.handlers.iter().any(|handler| match &handler.catch_type {
            Some(caught) => handler.kind == HandlerKind::Catch && caught.is_assignable_from(thrown),
            None => false,
        })
    }

    /// Ordering used for the exception table: regions that are nested in others come first
    ///
    /// A region sorts first if its last handler ends earlier. On a tie, the region whose `try`
    /// section ends later comes first.
    pub fn nesting_order(&self, other: &ExceptionRegion) -> Ordering {
        self.last_handler_end()
            .cmp(&other.last_handler_end())
            .then_with(|| other.end_address().cmp(&self.end_address()))
    }

    /// Whether `other` must precede this region in the exception table
    pub fn is_inner(&self, other: &ExceptionRegion) -> bool {
        other.nesting_order(self) == Ordering::Less
    }

    /// Lower into exception table rows
    ///
    /// Each catch gets its own row. When there is also a finally handler, both the `try` section
    /// and every catch handler get an extra row jumping to it. A lone finally handler covers the
    /// `try` section and the instruction storing the exception at the start of the handler.
    pub fn table_rows(&self, code: &[u8]) -> Vec<ExceptionRow> {
        let mut rows: Vec<ExceptionRow> = vec![];
        // the JVM rejects empty ranges
        let mut push = |row: ExceptionRow| {
            if row.start < row.end && !rows.contains(&row) {
                rows.push(row);
            }
        };

        let start = self.start_address;
        let try_end = self.end_address();
        let region_end = self.last_handler_end();

        for handler in &self.handlers {
            if handler.kind != HandlerKind::Catch {
                continue;
            }
            push(ExceptionRow {
                start,
                end: try_end,
                handler: handler.address,
                catch_type: handler.catch_type.clone(),
            });
            if let Some(finally) = self.finally_address {
                push(ExceptionRow {
                    start,
                    end: try_end,
                    handler: finally,
                    catch_type: None,
                });
                push(ExceptionRow {
                    start: handler.address,
                    end: handler.end_address.unwrap_or(region_end),
                    handler: finally,
                    catch_type: None,
                });
            }
        }

        if let (Some(finally), 1) = (self.finally_address, self.handlers.len()) {
            push(ExceptionRow {
                start,
                end: try_end,
                handler: finally,
                catch_type: None,
            });
            let store_size = store_instruction_size(code, finally);
            if store_size > 0 {
                push(ExceptionRow {
                    start: finally,
                    end: finally + store_size,
                    handler: finally,
                    catch_type: None,
                });
            }
        }

        log::trace!(
            "Lowered exception region at {} into {} rows",
            self.start_address,
            rows.len()
        );
        rows
    }
}

/// Size of the `astore` at `offset` (or `0` if there isn't one there)
fn store_instruction_size(code: &[u8], offset: usize) -> usize {
    let opcode = match code.get(offset).copied().and_then(OpCode::from_code) {
        Some(opcode) => opcode,
        None => return 0,
    };
    match opcode {
        OpCode::ASTORE => 2,
        OpCode::ASTORE_0 | OpCode::ASTORE_1 | OpCode::ASTORE_2 | OpCode::ASTORE_3 => 1,
        OpCode::WIDE if code.get(offset + 1) == Some(&OpCode::ASTORE.code()) => 4,
        _ => 0,
    }
}

/// Sort regions so that inner regions precede the regions enclosing them
pub fn sort_regions(regions: &mut [ExceptionRegion]) {
    regions.sort_by(ExceptionRegion::nesting_order);
}
