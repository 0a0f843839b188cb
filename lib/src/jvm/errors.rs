use super::class_file::ConstantPoolOverflow;
use super::code::{Label, OpCode};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    ConstantPoolOverflow(ConstantPoolOverflow),

    /// Constant pool index doesn't exist, or points at a different kind of constant
    BadConstantIndex {
        index: u16,
        expected: &'static str,
    },

    /// Name isn't a valid class, method, or field name
    MalformedName(String),

    /// Label was marked a second time
    LabelAlreadyMarked(Label),

    /// Branch targets a label that was never marked
    UnmarkedLabel(Label),

    /// Branch offset doesn't fit in the two byte operand
    ///
    /// Branches are not widened automatically: use `goto_w` explicitly for long jumps.
    BranchOffsetOverflow {
        label: Label,
        origin: usize,
        offset: isize,
    },

    /// Instruction needs operands: use the dedicated `emit_*` method for it instead
    UnexpectedOperand(OpCode),

    /// Local variable handle doesn't belong to this method
    UnknownLocal(usize),

    MethodCodeOverflow(usize),
    MethodCodeMaxStackOverflow(usize),
    MethodCodeMaxLocalsOverflow(usize),

    /// Method takes more than 255 parameter slots, counting `this`
    TooManyParameterSlots(usize),

    /// Count doesn't fit in the width of its class file field
    CountOverflow {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Exception block operation without an open exception block
    NotInExceptionBlock,

    /// Exception block closed while still in its `try` (or filter) section
    IncompleteExceptionBlock,

    /// Handler started before any instruction was emitted in the `try` section
    EmptyTryBlock,

    /// Method finalized while an exception block is still open
    UnclosedExceptionBlock,

    /// Second `finally` in the same exception block
    DuplicateFinallyBlock,

    /// Catch type is not a subtype of `java.lang.Throwable`
    CatchRequiresThrowable(String),

    /// `this` was requested in a static method
    NoThisInStaticMethod,

    ArgumentIndexOutOfRange {
        index: usize,
        count: usize,
    },

    /// Type can't be used here (eg. storing `void` into an array)
    InvalidType(String),

    /// No conversion exists from one type to the other
    InvalidConversion {
        from: String,
        to: String,
    },

    /// Can't instantiate a type that still has unbound type parameters
    UnboundGenericType(String),

    /// Array creation asks for more dimensions than the array type has
    ArrayDimensionsTooLarge {
        requested: usize,
        rank: usize,
    },

    /// Value's type doesn't match what is required of a constant
    ConstantTypeMismatch {
        expected: String,
        found: String,
    },

    TypeNameTooLong(usize),
    InvalidBaseType(String),
    InvalidInterface(String),
    InterfaceCannotHaveConstructor,
    GenericParametersAlreadyDefined,

    AbstractMethodInConcreteType(String),
    AbstractMethodWithBody(String),
    MethodHasEmptyBody(String),

    /// Signature verification failed (only when verification is enabled)
    Verification {
        message: String,

        /// Innermost context last
        context: Vec<String>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::ConstantPoolOverflow(ConstantPoolOverflow::PoolFull { constant, offset }) => {
                write!(
                    f,
                    "constant pool overflow at offset {} inserting {:?}",
                    offset, constant
                )
            }
            Error::ConstantPoolOverflow(ConstantPoolOverflow::Utf8TooLong(len)) => write!(
                f,
                "utf8 constant encodes to {} bytes (at most 65535)",
                len
            ),
            Error::BadConstantIndex { index, expected } => {
                write!(f, "constant #{} is not a {} constant", index, expected)
            }
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::LabelAlreadyMarked(label) => write!(f, "label {:?} is already marked", label),
            Error::UnmarkedLabel(label) => write!(f, "label {:?} was never marked", label),
            Error::BranchOffsetOverflow {
                label,
                origin,
                offset,
            } => write!(
                f,
                "branch at {} to label {:?} has offset {}, which overflows a 16-bit operand",
                origin, label, offset
            ),
            Error::UnexpectedOperand(opcode) => {
                write!(f, "{} cannot be emitted with this operand", opcode)
            }
            Error::UnknownLocal(index) => write!(f, "local #{} is not declared", index),
            Error::MethodCodeOverflow(len) => write!(f, "method code is {} bytes long", len),
            Error::MethodCodeMaxStackOverflow(size) => {
                write!(f, "method needs a stack of {} entries", size)
            }
            Error::MethodCodeMaxLocalsOverflow(size) => {
                write!(f, "method needs {} local variable slots", size)
            }
            Error::TooManyParameterSlots(slots) => {
                write!(f, "method takes {} parameter slots (at most 255)", slots)
            }
            Error::CountOverflow { what, count, max } => {
                write!(f, "{} {} do not fit in a class file (at most {})", count, what, max)
            }
            Error::NotInExceptionBlock => f.write_str("not inside an exception block"),
            Error::IncompleteExceptionBlock => {
                f.write_str("exception block needs at least one catch or finally block")
            }
            Error::EmptyTryBlock => f.write_str("try block contains no instructions"),
            Error::UnclosedExceptionBlock => f.write_str("exception block was never closed"),
            Error::DuplicateFinallyBlock => {
                f.write_str("exception block already has a finally block")
            }
            Error::CatchRequiresThrowable(typ) => {
                write!(f, "catch type {} is not a java.lang.Throwable", typ)
            }
            Error::NoThisInStaticMethod => f.write_str("static methods have no `this`"),
            Error::ArgumentIndexOutOfRange { index, count } => write!(
                f,
                "argument index {} is out of range for {} parameters",
                index, count
            ),
            Error::InvalidType(typ) => write!(f, "type {} is not valid here", typ),
            Error::InvalidConversion { from, to } => {
                write!(f, "no conversion from {} to {}", from, to)
            }
            Error::UnboundGenericType(typ) => {
                write!(f, "cannot instantiate {} with unbound type parameters", typ)
            }
            Error::ArrayDimensionsTooLarge { requested, rank } => write!(
                f,
                "cannot initialize {} dimensions of an array of rank {}",
                requested, rank
            ),
            Error::ConstantTypeMismatch { expected, found } => {
                write!(f, "expected a constant of type {}, found {}", expected, found)
            }
            Error::TypeNameTooLong(len) => {
                write!(f, "type name is {} characters long (at most 1023)", len)
            }
            Error::InvalidBaseType(typ) => write!(f, "{} cannot be used as a base type", typ),
            Error::InvalidInterface(typ) => write!(f, "{} cannot be implemented", typ),
            Error::InterfaceCannotHaveConstructor => {
                f.write_str("interfaces cannot define constructors")
            }
            Error::GenericParametersAlreadyDefined => {
                f.write_str("generic parameters are already defined")
            }
            Error::AbstractMethodInConcreteType(method) => {
                write!(f, "abstract method {} declared in a non-abstract type", method)
            }
            Error::AbstractMethodWithBody(method) => {
                write!(f, "abstract or native method {} has a body", method)
            }
            Error::MethodHasEmptyBody(method) => write!(f, "method {} has no body", method),
            Error::Verification { message, context } => {
                write!(f, "verification failed: {}", message)?;
                for frame in context.iter().rev() {
                    write!(f, "\n  in {}", frame)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<ConstantPoolOverflow> for Error {
    fn from(overflow: ConstantPoolOverflow) -> Error {
        Error::ConstantPoolOverflow(overflow)
    }
}
