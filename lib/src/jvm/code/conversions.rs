//! Boxing, unboxing, and numeric conversions
//!
//! Conversions follow the usual rules for assignment and casting contexts: primitives widen or
//! narrow through the `x2y` instructions, box classes get unboxed and reboxed, and reference
//! types that aren't statically assignable get a `checkcast`.

use super::{CodeGenerator, OpCode};
use crate::jvm::{BaseType, Error, MethodRef, Type};

/// Numeric class of a primitive on the operand stack
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StackKind {
    Int,
    Long,
    Float,
    Double,
}

impl StackKind {
    fn of(base_type: BaseType) -> StackKind {
        match base_type {
            BaseType::Long => StackKind::Long,
            BaseType::Float => StackKind::Float,
            BaseType::Double => StackKind::Double,
            _ => StackKind::Int,
        }
    }
}

/// Instructions converting a primitive value from one type to another
///
/// Returns `None` if there is no such conversion (anything involving `boolean`, except the
/// identity conversion).
fn primitive_conversion(from: BaseType, to: BaseType) -> Option<Vec<OpCode>> {
    if from == to {
        return Some(vec![]);
    }
    if from == BaseType::Boolean || to == BaseType::Boolean {
        return None;
    }

    let mut opcodes = vec![];
    let to_int = match StackKind::of(from) {
        StackKind::Int => None,
        StackKind::Long => Some(OpCode::L2I),
        StackKind::Float => Some(OpCode::F2I),
        StackKind::Double => Some(OpCode::D2I),
    };
    match (StackKind::of(from), to) {
        (StackKind::Int, BaseType::Long) => opcodes.push(OpCode::I2L),
        (StackKind::Int, BaseType::Float) => opcodes.push(OpCode::I2F),
        (StackKind::Int, BaseType::Double) => opcodes.push(OpCode::I2D),
        (StackKind::Long, BaseType::Float) => opcodes.push(OpCode::L2F),
        (StackKind::Long, BaseType::Double) => opcodes.push(OpCode::L2D),
        (StackKind::Float, BaseType::Long) => opcodes.push(OpCode::F2L),
        (StackKind::Float, BaseType::Double) => opcodes.push(OpCode::F2D),
        (StackKind::Double, BaseType::Long) => opcodes.push(OpCode::D2L),
        (StackKind::Double, BaseType::Float) => opcodes.push(OpCode::D2F),
        (_, BaseType::Int) => opcodes.extend(to_int),
        (_, BaseType::Byte) => {
            opcodes.extend(to_int);
            opcodes.push(OpCode::I2B);
        }
        (_, BaseType::Short) => {
            opcodes.extend(to_int);
            if from != BaseType::Byte {
                opcodes.push(OpCode::I2S);
            }
        }
        (_, BaseType::Char) => {
            opcodes.extend(to_int);
            opcodes.push(OpCode::I2C);
        }
        _ => return None,
    }
    Some(opcodes)
}

impl<'a> CodeGenerator<'a> {
    /// Box the primitive on top of the stack into its box class
    pub fn emit_box(&mut self, primitive: &Type) -> Result<(), Error> {
        match primitive.as_primitive() {
            Some(base_type) => self.call(&MethodRef::box_value_of(base_type)),
            None => Err(Error::InvalidType(primitive.to_string())),
        }
    }

    /// Unbox the box class instance on top of the stack
    pub fn emit_unbox(&mut self, boxed: &Type) -> Result<(), Error> {
        match boxed.unboxed_primitive() {
            Some(base_type) => self.call(&MethodRef::unbox_value(base_type)),
            None => Err(Error::InvalidType(boxed.to_string())),
        }
    }

    /// Convert the value on top of the stack from `source` to `target`
    pub fn emit_conversion(&mut self, source: &Type, target: &Type) -> Result<(), Error> {
        let invalid = || Error::InvalidConversion {
            from: source.to_string(),
            to: target.to_string(),
        };

        if source.is_void() || target.is_void() {
            return if source.is_void() && target.is_void() {
                Ok(())
            } else {
                Err(invalid())
            };
        }
        if source.is_equivalent_to(target) {
            return Ok(());
        }

        match (source.as_primitive(), target.as_primitive()) {
            (Some(from), Some(to)) => {
                let opcodes = primitive_conversion(from, to).ok_or_else(invalid)?;
                for opcode in opcodes {
                    self.emit(opcode)?;
                }
                Ok(())
            }

            // Unbox, either directly or after casting to the box class
            (None, Some(to)) => {
                let from = match source.unboxed_primitive() {
                    Some(from) => from,
                    None => {
                        let boxed = Type::boxed_class(to);
                        self.emit_cast(&boxed)?;
                        to
                    }
                };
                let opcodes = primitive_conversion(from, to).ok_or_else(invalid)?;
                self.emit_unbox(&Type::boxed_class(from))?;
                for opcode in opcodes {
                    self.emit(opcode)?;
                }
                Ok(())
            }

            // Box, converting first if the target is a different box class
            (Some(from), None) => {
                let boxed_as = match target.unboxed_primitive() {
                    Some(to) => to,
                    None => from,
                };
                let boxed = Type::boxed_class(boxed_as);
                if !target.is_assignable_from(&boxed) {
                    return Err(invalid());
                }
                let opcodes = primitive_conversion(from, boxed_as).ok_or_else(invalid)?;
                for opcode in opcodes {
                    self.emit(opcode)?;
                }
                self.emit_box(&Type::Primitive(boxed_as))
            }

            (None, None) => {
                if let (Some(from), Some(to)) =
                    (source.unboxed_primitive(), target.unboxed_primitive())
                {
                    let opcodes = primitive_conversion(from, to).ok_or_else(invalid)?;
                    self.emit_unbox(source)?;
                    for opcode in opcodes {
                        self.emit(opcode)?;
                    }
                    self.emit_box(&Type::Primitive(to))
                } else if target.is_assignable_from(source) {
                    Ok(())
                } else {
                    self.emit_cast(target)
                }
            }
        }
    }
}
