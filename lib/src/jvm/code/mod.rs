//! Method body generation
//!
//! ### Structure
//!
//! Method code is generated top to bottom by a [`CodeGenerator`], which encodes instructions
//! directly into a byte buffer. The generator keeps track of enough state to produce everything
//! else the `Code` attribute needs:
//!
//!   - [`LabelTable`] for forward jumps, whose operands are patched once all labels are marked
//!   - [`ExceptionRegion`] for structured `try`/`catch`/`finally` blocks, lowered into the flat
//!     exception table only at the very end
//!   - [`LocalBuilder`] for local variables, whose slots are derived from declaration order
//!   - a running estimate of the maximum operand stack depth
//!
//! Higher level lowerings (switches, boxing, and conversions) are also on [`CodeGenerator`], but
//! live in their own modules.

mod code_generator;
mod conversions;
mod exceptions;
mod label;
mod local;
mod opcode;
mod switch;

pub use code_generator::*;
pub use exceptions::*;
pub use label::*;
pub use local::*;
pub use opcode::*;
pub use switch::*;
