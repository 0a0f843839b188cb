use super::exceptions::sort_regions;
use super::{
    ExceptionRegion, Label, LabelTable, Local, LocalBuilder, OpCode, OperandType, RegionState,
};
use crate::jvm::class_file::{ConstantData, ConstantsPool, ConstantsWriter};
use crate::jvm::{BaseType, Error, FieldRef, MethodRef, Type};
use crate::util::{CodeStream, Width};

/// Code of one method as it is being generated
///
/// This holds everything that outlives a single [`CodeGenerator`]: the bytes emitted so far, the
/// labels, locals, exception regions, and the running stack accounting. It lives in the method
/// builder so that a generator can be requested more than once.
#[derive(Debug)]
pub struct MethodCode {
    pub(super) code: CodeStream,
    pub(super) labels: LabelTable,

    /// Current stack depth
    stack_size: i32,

    /// Largest stack depth seen in the current block
    block_max_stack: i32,

    /// Sum of the maximum stack depths of all finished blocks
    max_stack_size: i32,

    locals: Vec<LocalBuilder>,

    /// Regions that have been closed
    exceptions: Vec<ExceptionRegion>,

    /// Regions still open (innermost last)
    exception_stack: Vec<ExceptionRegion>,

    /// Checked exceptions thrown inside the `try` section of each open region
    pending_exceptions: Vec<Vec<Type>>,

    /// Checked exceptions thrown by callees and not caught locally
    unhandled_exceptions: Vec<Type>,

    /// Type of `this` (`None` in static methods)
    this_type: Option<Type>,

    parameters: Vec<Type>,
}

/// Final form of a method's code
#[derive(Debug)]
pub struct BakedCode {
    pub bytes: Vec<u8>,
    pub max_stack: u16,
    pub max_locals: u16,

    /// Sorted so that inner regions come first
    pub exceptions: Vec<ExceptionRegion>,

    pub locals: Vec<LocalBuilder>,
}

impl MethodCode {
    pub fn new(this_type: Option<Type>, parameters: Vec<Type>) -> MethodCode {
        MethodCode {
            code: CodeStream::with_capacity(64),
            labels: LabelTable::new(),
            stack_size: 0,
            block_max_stack: 0,
            max_stack_size: 0,
            locals: vec![],
            exceptions: vec![],
            exception_stack: vec![],
            pending_exceptions: vec![],
            unhandled_exceptions: vec![],
            this_type,
            parameters,
        }
    }

    /// Current write position
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn is_static(&self) -> bool {
        self.this_type.is_none()
    }

    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    pub fn this_type(&self) -> Option<&Type> {
        self.this_type.as_ref()
    }

    pub fn locals(&self) -> &[LocalBuilder] {
        &self.locals
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Checked exceptions that escape the method body
    pub fn unhandled_exceptions(&self) -> &[Type] {
        &self.unhandled_exceptions
    }

    /// Stack depth bound accumulated so far
    pub fn max_stack(&self) -> usize {
        (self.max_stack_size + self.block_max_stack) as usize
    }

    /// Slot of the parameter at `index`
    pub fn translate_parameter(&self, index: usize) -> usize {
        let receiver = if self.is_static() { 0 } else { 1 };
        receiver
            + self.parameters[..index.min(self.parameters.len())]
                .iter()
                .map(Width::width)
                .sum::<usize>()
    }

    /// Slot of the local declared at position `index`
    pub fn translate_local(&self, index: usize) -> usize {
        self.translate_parameter(self.parameters.len())
            + self.locals[..index.min(self.locals.len())]
                .iter()
                .map(|local| local.local_type.width())
                .sum::<usize>()
    }

    /// Total number of local slots used (receiver, parameters, and locals)
    pub fn max_locals(&self) -> usize {
        self.translate_local(self.locals.len())
    }

    /// Record a checked exception thrown while the first `depth` regions are open
    ///
    /// The exception is attributed to the innermost of those regions still in its `try` section.
    /// Only once that region closes do we know whether one of its `catch` handlers covers it.
    fn register_thrown(&mut self, thrown: Type, depth: usize) {
        let in_try = self.exception_stack[..depth]
            .iter()
            .rposition(|region| region.state() == RegionState::Try);
        let pending = match in_try {
            Some(index) => &mut self.pending_exceptions[index],
            None => &mut self.unhandled_exceptions,
        };
        if pending.iter().any(|existing| existing.is_assignable_from(&thrown)) {
            return;
        }
        pending.retain(|existing| !thrown.is_assignable_from(existing));
        pending.push(thrown);
    }

    fn update_stack_size(&mut self, opcode: OpCode, stack_change: i32) {
        self.stack_size += stack_change;
        if self.stack_size > self.block_max_stack {
            self.block_max_stack = self.stack_size;
        } else if self.stack_size < 0 {
            self.stack_size = 0;
        }

        if opcode.ends_unconditional_block() {
            self.max_stack_size += self.block_max_stack;
            self.block_max_stack = 0;
            self.stack_size = 0;
        }
    }

    /// Set the stack to hold just the exception object, at the start of a handler
    fn enter_handler(&mut self) {
        self.stack_size = 1;
        if self.block_max_stack < 1 {
            self.block_max_stack = 1;
        }
    }

    /// Resolve branches and finish off the method code
    ///
    /// Returns `None` if no code was ever emitted.
    pub fn bake(&self) -> Result<Option<BakedCode>, Error> {
        if !self.exception_stack.is_empty() {
            return Err(Error::UnclosedExceptionBlock);
        }
        if self.code.is_empty() {
            return Ok(None);
        }

        let mut code = self.code.clone();
        self.labels.resolve(&mut code)?;

        if code.len() > u16::MAX as usize {
            return Err(Error::MethodCodeOverflow(code.len()));
        }
        let max_stack = self.max_stack();
        if max_stack > u16::MAX as usize {
            return Err(Error::MethodCodeMaxStackOverflow(max_stack));
        }
        let max_locals = self.max_locals();
        if max_locals > u16::MAX as usize {
            return Err(Error::MethodCodeMaxLocalsOverflow(max_locals));
        }

        let mut exceptions = self.exceptions.clone();
        sort_regions(&mut exceptions);

        Ok(Some(BakedCode {
            bytes: code.into_vec(),
            max_stack: max_stack as u16,
            max_locals: max_locals as u16,
            exceptions,
            locals: self.locals.clone(),
        }))
    }
}

/// Instruction-level code generator for one method
///
/// Every `emit_*` method appends instructions to the method's code and keeps track of the
/// operand stack depth. Constants needed by instructions are interned into the pool of the
/// enclosing type as they are emitted.
pub struct CodeGenerator<'a> {
    pub(super) constants: &'a mut ConstantsPool,
    pub(super) code: &'a mut MethodCode,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(constants: &'a mut ConstantsPool, code: &'a mut MethodCode) -> CodeGenerator<'a> {
        CodeGenerator { constants, code }
    }

    /// Current write position
    pub fn offset(&self) -> usize {
        self.code.offset()
    }

    /// Current operand stack depth (as tracked)
    pub fn stack_size(&self) -> i32 {
        self.code.stack_size
    }

    pub fn constants(&mut self) -> &mut ConstantsPool {
        self.constants
    }

    pub fn method_code(&self) -> &MethodCode {
        self.code
    }

    pub(super) fn internal_emit(&mut self, opcode: OpCode) {
        self.code.code.put_u8(opcode.code());
        self.code.update_stack_size(opcode, opcode.stack_change());
    }

    /// Emit an instruction with no operands
    pub fn emit(&mut self, opcode: OpCode) -> Result<(), Error> {
        if opcode.operand_type() != OperandType::None {
            return Err(Error::UnexpectedOperand(opcode));
        }
        self.internal_emit(opcode);
        Ok(())
    }

    /// Emit an instruction with a one byte operand (eg. `bipush`, `newarray`)
    pub fn emit_byte_operand(&mut self, opcode: OpCode, operand: i8) -> Result<(), Error> {
        if !matches!(
            opcode.operand_type(),
            OperandType::Byte | OperandType::PrimitiveType
        ) {
            return Err(Error::UnexpectedOperand(opcode));
        }
        self.internal_emit(opcode);
        self.code.code.put_i8(operand);
        Ok(())
    }

    /// Emit an instruction with a two byte operand (eg. `sipush`)
    pub fn emit_short_operand(&mut self, opcode: OpCode, operand: i16) -> Result<(), Error> {
        if opcode.operand_type() != OperandType::Short {
            return Err(Error::UnexpectedOperand(opcode));
        }
        self.internal_emit(opcode);
        self.code.code.put_i16(operand);
        Ok(())
    }

    fn emit_class_operand(&mut self, opcode: OpCode, typ: &Type) -> Result<(), Error> {
        let class = typ.constant_index(self.constants)?;
        self.internal_emit(opcode);
        self.code.code.put_u16((class.0).0);
        Ok(())
    }

    // Labels and branches

    pub fn define_label(&mut self) -> Label {
        self.code.labels.define()
    }

    /// Bind the label to the current offset
    pub fn mark_label(&mut self, label: Label) -> Result<(), Error> {
        let offset = self.offset();
        self.code.labels.mark(label, offset)
    }

    pub fn is_marked(&self, label: Label) -> bool {
        self.code.labels.is_marked(label)
    }

    /// Emit a branch to a label, which may not be bound yet
    ///
    /// Regular branches have a two byte operand, `goto_w` and `jsr_w` have a four byte one.
    pub fn emit_branch(&mut self, opcode: OpCode, label: Label) -> Result<(), Error> {
        let size = match opcode.operand_type() {
            OperandType::Branch => 2,
            OperandType::WideBranch => 4,
            _ => return Err(Error::UnexpectedOperand(opcode)),
        };
        let origin = self.offset();
        self.internal_emit(opcode);
        let position = self.offset();
        self.code.labels.add_fixup(label, origin, position, size);
        if size == 2 {
            self.code.code.put_i16(0);
        } else {
            self.code.code.put_i32(0);
        }
        Ok(())
    }

    pub fn emit_goto(&mut self, label: Label) -> Result<(), Error> {
        self.emit_branch(OpCode::GOTO, label)
    }

    // Stack manipulation

    pub fn dup(&mut self) {
        self.internal_emit(OpCode::DUP);
    }

    /// Duplicate a value of the given type (`dup2` for `long` and `double`)
    pub fn dup_type(&mut self, typ: &Type) -> Result<(), Error> {
        let opcode = match typ.width() {
            0 => return Err(Error::InvalidType(typ.to_string())),
            1 => OpCode::DUP,
            _ => OpCode::DUP2,
        };
        self.internal_emit(opcode);
        Ok(())
    }

    pub fn pop(&mut self) {
        self.internal_emit(OpCode::POP);
    }

    /// Pop a value of the given type (nothing for `void`)
    pub fn pop_type(&mut self, typ: &Type) {
        match typ.width() {
            0 => (),
            1 => self.internal_emit(OpCode::POP),
            _ => self.internal_emit(OpCode::POP2),
        }
    }

    pub fn swap(&mut self) {
        self.internal_emit(OpCode::SWAP);
    }

    // Locals and arguments

    pub fn declare_local(&mut self, name: Option<&str>, local_type: Type) -> Local {
        let index = self.code.locals.len();
        self.code
            .locals
            .push(LocalBuilder::new(index, name.map(String::from), local_type));
        Local(index)
    }

    fn local_type(&self, local: Local) -> Result<Type, Error> {
        self.code
            .locals
            .get(local.0)
            .map(|builder| builder.local_type.clone())
            .ok_or(Error::UnknownLocal(local.0))
    }

    /// `xload` or `xstore` for a slot, in the shortest encoding
    fn emit_slot_instruction(&mut self, opcode: OpCode, slot: usize) -> Result<(), Error> {
        if slot > u16::MAX as usize {
            return Err(Error::MethodCodeMaxLocalsOverflow(slot));
        }
        let slot = slot as u16;
        if let Some(short) = opcode.short_form(slot) {
            self.internal_emit(short);
        } else if slot <= u8::MAX as u16 {
            self.internal_emit(opcode);
            self.code.code.put_u8(slot as u8);
        } else {
            self.code.code.put_u8(OpCode::WIDE.code());
            self.internal_emit(opcode);
            self.code.code.put_u16(slot);
        }
        Ok(())
    }

    pub fn emit_load(&mut self, local: Local) -> Result<(), Error> {
        let local_type = self.local_type(local)?;
        let slot = self.code.translate_local(local.0);
        let start = self.offset();
        self.emit_slot_instruction(OpCode::load(&local_type), slot)?;
        let end = self.offset();
        self.code.locals[local.0].record_access(start, end, false);
        Ok(())
    }

    pub fn emit_store(&mut self, local: Local) -> Result<(), Error> {
        let local_type = self.local_type(local)?;
        let slot = self.code.translate_local(local.0);
        let start = self.offset();
        self.emit_slot_instruction(OpCode::store(&local_type), slot)?;
        let end = self.offset();
        self.code.locals[local.0].record_access(start, end, true);
        Ok(())
    }

    /// Push `this`
    pub fn emit_this(&mut self) -> Result<(), Error> {
        if self.code.is_static() {
            return Err(Error::NoThisInStaticMethod);
        }
        self.internal_emit(OpCode::ALOAD_0);
        Ok(())
    }

    fn argument_type(&self, index: usize) -> Result<Type, Error> {
        self.code
            .parameters
            .get(index)
            .cloned()
            .ok_or(Error::ArgumentIndexOutOfRange {
                index,
                count: self.code.parameters.len(),
            })
    }

    pub fn emit_load_argument(&mut self, index: usize) -> Result<(), Error> {
        let argument_type = self.argument_type(index)?;
        let slot = self.code.translate_parameter(index);
        self.emit_slot_instruction(OpCode::load(&argument_type), slot)
    }

    pub fn emit_store_argument(&mut self, index: usize) -> Result<(), Error> {
        let argument_type = self.argument_type(index)?;
        let slot = self.code.translate_parameter(index);
        self.emit_slot_instruction(OpCode::store(&argument_type), slot)
    }

    /// Add a constant to an `int` local
    ///
    /// Uses `iinc` when possible, `wide iinc` for larger slots or deltas, and falls back to
    /// load/add/store for deltas that don't fit in 16 bits.
    pub fn increment(&mut self, local: Local, delta: i32) -> Result<(), Error> {
        let local_type = self.local_type(local)?;
        if !local_type.as_primitive().map_or(false, BaseType::is_int_like) {
            return Err(Error::InvalidType(local_type.to_string()));
        }
        let slot = self.code.translate_local(local.0);
        let start = self.offset();
        if slot <= u8::MAX as usize && i8::try_from(delta).is_ok() {
            self.internal_emit(OpCode::IINC);
            self.code.code.put_u8(slot as u8);
            self.code.code.put_i8(delta as i8);
        } else if slot <= u16::MAX as usize && i16::try_from(delta).is_ok() {
            self.code.code.put_u8(OpCode::WIDE.code());
            self.internal_emit(OpCode::IINC);
            self.code.code.put_u16(slot as u16);
            self.code.code.put_i16(delta as i16);
        } else {
            self.emit_load(local)?;
            self.emit_integer(delta)?;
            self.internal_emit(OpCode::IADD);
            self.emit_store(local)?;
        }
        let end = self.offset();
        self.code.locals[local.0].record_access(start, end, false);
        Ok(())
    }

    // Arrays

    pub fn emit_load_element(&mut self, element_type: &Type) -> Result<(), Error> {
        if element_type.is_void() {
            return Err(Error::InvalidType(element_type.to_string()));
        }
        self.internal_emit(OpCode::array_load(element_type));
        Ok(())
    }

    pub fn emit_store_element(&mut self, element_type: &Type) -> Result<(), Error> {
        if element_type.is_void() {
            return Err(Error::InvalidType(element_type.to_string()));
        }
        self.internal_emit(OpCode::array_store(element_type));
        Ok(())
    }

    pub fn emit_array_length(&mut self) {
        self.internal_emit(OpCode::ARRAYLENGTH);
    }

    /// Allocate an array, with the sizes of the first `dimensions` dimensions on the stack
    pub fn emit_new_array(&mut self, array_type: &Type, dimensions: usize) -> Result<(), Error> {
        let rank = array_type.array_rank();
        if rank == 0 || dimensions == 0 {
            return Err(Error::InvalidType(array_type.to_string()));
        }
        if dimensions > rank {
            return Err(Error::ArrayDimensionsTooLarge {
                requested: dimensions,
                rank,
            });
        }

        if dimensions == 1 {
            let element_type = match array_type.element_type() {
                Some(element_type) => element_type,
                None => return Err(Error::InvalidType(array_type.to_string())),
            };
            match element_type.as_primitive() {
                Some(base_type) => {
                    self.internal_emit(OpCode::NEWARRAY);
                    self.code.code.put_u8(base_type.array_type_code());
                }
                None => self.emit_class_operand(OpCode::ANEWARRAY, element_type)?,
            }
        } else {
            if dimensions > u8::MAX as usize {
                return Err(Error::ArrayDimensionsTooLarge {
                    requested: dimensions,
                    rank: u8::MAX as usize,
                });
            }
            let class = array_type.constant_index(self.constants)?;
            self.code.code.put_u8(OpCode::MULTIANEWARRAY.code());
            self.code
                .update_stack_size(OpCode::MULTIANEWARRAY, 1 - dimensions as i32);
            self.code.code.put_u16((class.0).0);
            self.code.code.put_u8(dimensions as u8);
        }
        Ok(())
    }

    /// Create a one dimensional array of `count` elements, each initialized by `element`
    ///
    /// The callback is called with the index of the element and must push exactly one value of
    /// the element type.
    pub fn emit_array<F>(&mut self, element_type: &Type, count: usize, mut element: F) -> Result<(), Error>
    where
        F: FnMut(&mut CodeGenerator<'a>, usize) -> Result<(), Error>,
    {
        let count_i32 =
            i32::try_from(count).map_err(|_| Error::InvalidType(element_type.to_string()))?;
        self.emit_integer(count_i32)?;
        self.emit_new_array(&Type::array_of(element_type.clone()), 1)?;
        for index in 0..count {
            self.dup();
            self.emit_integer(index as i32)?;
            element(self, index)?;
            self.emit_store_element(element_type)?;
        }
        Ok(())
    }

    // Objects

    /// Allocate an uninitialized object (or push the default value of a primitive)
    pub fn emit_new(&mut self, typ: &Type) -> Result<(), Error> {
        if typ.contains_generic_parameters() {
            return Err(Error::UnboundGenericType(typ.to_string()));
        }
        if typ.is_primitive() {
            return self.emit_default_value(typ);
        }
        if typ.is_void() || typ.is_array() {
            return Err(Error::InvalidType(typ.to_string()));
        }
        self.emit_class_operand(OpCode::NEW, typ)
    }

    pub fn emit_instance_of(&mut self, typ: &Type) -> Result<(), Error> {
        if !typ.is_reference() {
            return Err(Error::InvalidType(typ.to_string()));
        }
        self.emit_class_operand(OpCode::INSTANCEOF, typ)
    }

    /// `checkcast` to a reference type
    pub fn emit_cast(&mut self, typ: &Type) -> Result<(), Error> {
        if !typ.is_reference() {
            return Err(Error::InvalidType(typ.to_string()));
        }
        self.emit_class_operand(OpCode::CHECKCAST, typ)
    }

    // Fields

    pub fn get_field(&mut self, field: &FieldRef) -> Result<(), Error> {
        let (opcode, receiver) = if field.is_static {
            (OpCode::GETSTATIC, 0)
        } else {
            (OpCode::GETFIELD, 1)
        };
        self.emit_field_instruction(opcode, field, field.field_type.width() as i32 - receiver)
    }

    pub fn put_field(&mut self, field: &FieldRef) -> Result<(), Error> {
        let (opcode, receiver) = if field.is_static {
            (OpCode::PUTSTATIC, 0)
        } else {
            (OpCode::PUTFIELD, 1)
        };
        self.emit_field_instruction(opcode, field, -(field.field_type.width() as i32) - receiver)
    }

    fn emit_field_instruction(
        &mut self,
        opcode: OpCode,
        field: &FieldRef,
        stack_change: i32,
    ) -> Result<(), Error> {
        let index = field.constant_index(self.constants)?;
        self.code.code.put_u8(opcode.code());
        self.code.update_stack_size(opcode, stack_change);
        self.code.code.put_u16((index.0).0);
        Ok(())
    }

    // Methods

    /// Call a method, picking the invoke instruction from the kind of method
    ///
    /// Static methods use `invokestatic`, constructors and private methods use `invokespecial`,
    /// methods on interfaces use `invokeinterface`, and everything else uses `invokevirtual`.
    pub fn call(&mut self, method: &MethodRef) -> Result<(), Error> {
        let opcode = if method.is_static() {
            OpCode::INVOKESTATIC
        } else if method.is_private() || method.is_constructor() {
            OpCode::INVOKESPECIAL
        } else if method.owner.is_interface() {
            OpCode::INVOKEINTERFACE
        } else {
            OpCode::INVOKEVIRTUAL
        };
        self.emit_invoke(opcode, method)
    }

    /// Call a constructor on an object already on the stack
    pub fn call_constructor(&mut self, constructor: &MethodRef) -> Result<(), Error> {
        if !constructor.is_constructor() {
            return Err(Error::InvalidType(format!(
                "{}.{}",
                constructor.owner, constructor.name
            )));
        }
        self.emit_invoke(OpCode::INVOKESPECIAL, constructor)
    }

    /// Non-virtual call (eg. to a super class implementation)
    pub fn call_special(&mut self, method: &MethodRef) -> Result<(), Error> {
        if method.is_static() {
            return Err(Error::InvalidType(format!("{}.{}", method.owner, method.name)));
        }
        self.emit_invoke(OpCode::INVOKESPECIAL, method)
    }

    fn emit_invoke(&mut self, opcode: OpCode, method: &MethodRef) -> Result<(), Error> {
        let receiver = if opcode == OpCode::INVOKESTATIC { 0 } else { 1 };
        let slots = method.parameter_slots() + receiver as usize;
        if slots > u8::MAX as usize {
            return Err(Error::TooManyParameterSlots(slots));
        }
        let index = method.constant_index(self.constants)?;

        let parameter_slots = method.parameter_slots() as i32;
        let stack_change = method.return_type.width() as i32 - parameter_slots - receiver;

        self.code.code.put_u8(opcode.code());
        self.code.update_stack_size(opcode, stack_change);
        self.code.code.put_u16((index.0).0);
        if opcode == OpCode::INVOKEINTERFACE {
            self.code.code.put_u8(slots as u8);
            self.code.code.put_u8(0);
        }

        self.register_checked_exceptions(method);
        Ok(())
    }

    /// Track checked exceptions a callee declares
    fn register_checked_exceptions(&mut self, method: &MethodRef) {
        for thrown in &method.thrown {
            if thrown.is_checked_exception() {
                let depth = self.code.exception_stack.len();
                self.code.register_thrown(thrown.clone(), depth);
            }
        }
    }

    // Constants

    fn emit_load_constant(&mut self, index: u16, wide: bool) {
        if wide {
            self.internal_emit(OpCode::LDC2_W);
            self.code.code.put_u16(index);
        } else if index <= u8::MAX as u16 {
            self.internal_emit(OpCode::LDC);
            self.code.code.put_u8(index as u8);
        } else {
            self.internal_emit(OpCode::LDC_W);
            self.code.code.put_u16(index);
        }
    }

    pub fn emit_null(&mut self) {
        self.internal_emit(OpCode::ACONST_NULL);
    }

    pub fn emit_boolean(&mut self, value: bool) {
        self.internal_emit(if value {
            OpCode::ICONST_1
        } else {
            OpCode::ICONST_0
        });
    }

    pub fn emit_byte(&mut self, value: i8) -> Result<(), Error> {
        self.emit_integer(value as i32)
    }

    pub fn emit_short(&mut self, value: i16) -> Result<(), Error> {
        self.emit_integer(value as i32)
    }

    pub fn emit_char(&mut self, value: u16) -> Result<(), Error> {
        if value <= i8::MAX as u16 {
            self.internal_emit(OpCode::BIPUSH);
            self.code.code.put_i8(value as i8);
            Ok(())
        } else {
            self.emit_integer(value as i32)
        }
    }

    /// Push an `int` using the shortest encoding
    pub fn emit_integer(&mut self, value: i32) -> Result<(), Error> {
        match value {
            -1 => self.internal_emit(OpCode::ICONST_M1),
            0 => self.internal_emit(OpCode::ICONST_0),
            1 => self.internal_emit(OpCode::ICONST_1),
            2 => self.internal_emit(OpCode::ICONST_2),
            3 => self.internal_emit(OpCode::ICONST_3),
            4 => self.internal_emit(OpCode::ICONST_4),
            5 => self.internal_emit(OpCode::ICONST_5),
            _ if i8::try_from(value).is_ok() => {
                self.internal_emit(OpCode::BIPUSH);
                self.code.code.put_i8(value as i8);
            }
            _ if i16::try_from(value).is_ok() => {
                self.internal_emit(OpCode::SIPUSH);
                self.code.code.put_i16(value as i16);
            }
            _ => {
                let index = self.constants.get_integer(value)?;
                self.emit_load_constant(index.0, false);
            }
        }
        Ok(())
    }

    pub fn emit_long(&mut self, value: i64) -> Result<(), Error> {
        match value {
            0 => self.internal_emit(OpCode::LCONST_0),
            1 => self.internal_emit(OpCode::LCONST_1),
            _ => {
                let index = self.constants.get_long(value)?;
                self.emit_load_constant(index.0, true);
            }
        }
        Ok(())
    }

    /// Only positive zero has a short form: `-0.0` goes through the constant pool
    pub fn emit_float(&mut self, value: f32) -> Result<(), Error> {
        if value.to_bits() == 0f32.to_bits() {
            self.internal_emit(OpCode::FCONST_0);
        } else if value == 1.0 {
            self.internal_emit(OpCode::FCONST_1);
        } else if value == 2.0 {
            self.internal_emit(OpCode::FCONST_2);
        } else {
            let index = self.constants.get_float(value)?;
            self.emit_load_constant(index.0, false);
        }
        Ok(())
    }

    pub fn emit_double(&mut self, value: f64) -> Result<(), Error> {
        if value.to_bits() == 0f64.to_bits() {
            self.internal_emit(OpCode::DCONST_0);
        } else if value == 1.0 {
            self.internal_emit(OpCode::DCONST_1);
        } else {
            let index = self.constants.get_double(value)?;
            self.emit_load_constant(index.0, true);
        }
        Ok(())
    }

    pub fn emit_string(&mut self, value: &str) -> Result<(), Error> {
        let utf8 = self.constants.get_utf8(value)?;
        let index = self.constants.get_string(utf8)?;
        self.emit_load_constant((index.0).0, false);
        Ok(())
    }

    pub fn emit_constant(&mut self, value: &ConstantData) -> Result<(), Error> {
        match value {
            ConstantData::Boolean(boolean) => {
                self.emit_boolean(*boolean);
                Ok(())
            }
            ConstantData::Byte(byte) => self.emit_byte(*byte),
            ConstantData::Short(short) => self.emit_short(*short),
            ConstantData::Char(character) => self.emit_char(*character),
            ConstantData::Integer(integer) => self.emit_integer(*integer),
            ConstantData::Long(long) => self.emit_long(*long),
            ConstantData::Float(float) => self.emit_float(*float),
            ConstantData::Double(double) => self.emit_double(*double),
            ConstantData::String(string) => self.emit_string(string),
            ConstantData::Class(class) => {
                let index = class.constant_index(self.constants)?;
                self.emit_load_constant((index.0).0, false);
                Ok(())
            }
        }
    }

    /// Push the zero value of a type (`null` for references)
    pub fn emit_default_value(&mut self, typ: &Type) -> Result<(), Error> {
        match typ {
            Type::Void => return Err(Error::InvalidType(typ.to_string())),
            Type::Primitive(BaseType::Long) => self.internal_emit(OpCode::LCONST_0),
            Type::Primitive(BaseType::Float) => self.internal_emit(OpCode::FCONST_0),
            Type::Primitive(BaseType::Double) => self.internal_emit(OpCode::DCONST_0),
            Type::Primitive(_) => self.internal_emit(OpCode::ICONST_0),
            _ => self.internal_emit(OpCode::ACONST_NULL),
        }
        Ok(())
    }

    // Returns and throws

    pub fn emit_return(&mut self, return_type: &Type) {
        self.internal_emit(OpCode::return_for(return_type));
    }

    pub fn emit_throw(&mut self) {
        self.internal_emit(OpCode::ATHROW);
    }

    // Exception blocks

    /// Open a `try` block, returning the label marking the end of the whole block
    pub fn begin_exception_block(&mut self) -> Label {
        let end_label = self.define_label();
        let region = ExceptionRegion::new(self.offset(), end_label);
        self.code.exception_stack.push(region);
        self.code.pending_exceptions.push(vec![]);
        end_label
    }

    fn current_region(&mut self) -> Result<&mut ExceptionRegion, Error> {
        self.code
            .exception_stack
            .last_mut()
            .ok_or(Error::NotInExceptionBlock)
    }

    /// Explicitly end the `try` section (it otherwise ends at the first handler)
    pub fn end_try_block(&mut self) -> Result<(), Error> {
        let offset = self.offset();
        self.current_region()?.mark_try_end(offset);
        Ok(())
    }

    /// Start a handler for exceptions of the given type
    ///
    /// The previous section jumps to the end of the block. On entry to the handler, the caught
    /// exception is on the stack.
    pub fn begin_catch_block(&mut self, catch_type: &Type) -> Result<(), Error> {
        let end_label = self.current_region()?.end_label();
        if !Type::throwable().is_assignable_from(catch_type) {
            return Err(Error::CatchRequiresThrowable(catch_type.to_string()));
        }
        self.emit_goto(end_label)?;
        let offset = self.offset();
        self.current_region()?
            .mark_catch_address(offset, catch_type.clone());
        self.code.enter_handler();
        Ok(())
    }

    /// Start the `finally` handler
    ///
    /// The code that follows runs only when an exception escapes the `try` or `catch` sections
    /// (normal completion is expected to inline the `finally` code). On entry to the handler, the
    /// escaping exception is on the stack.
    pub fn begin_finally_block(&mut self) -> Result<(), Error> {
        let (state, end_label) = {
            let region = self.current_region()?;
            (region.state(), region.end_label())
        };
        let mut catch_end = if state != RegionState::Try {
            Some(self.offset())
        } else {
            None
        };

        let finally_end_label = self.define_label();
        self.current_region()?
            .set_finally_end_label(finally_end_label);
        self.mark_label(end_label)?;
        self.emit_goto(finally_end_label)?;

        let offset = self.offset();
        let catch_end = *catch_end.get_or_insert(offset);
        self.current_region()?
            .mark_finally_address(offset, catch_end)?;
        self.code.enter_handler();
        Ok(())
    }

    /// Close the innermost exception block
    pub fn end_exception_block(&mut self) -> Result<(), Error> {
        let mut region = self
            .code
            .exception_stack
            .pop()
            .ok_or(Error::NotInExceptionBlock)?;
        let pending = self.code.pending_exceptions.pop().unwrap_or_default();
        if matches!(region.state(), RegionState::Filter | RegionState::Try) {
            return Err(Error::IncompleteExceptionBlock);
        }
        if region.end_address() <= region.start_address() {
            return Err(Error::EmptyTryBlock);
        }

        let end_label = region.end_label();
        if !self.is_marked(end_label) {
            self.mark_label(end_label)?;
        } else if let Some(finally_end_label) = region.finally_end_label() {
            self.mark_label(finally_end_label)?;
        }

        region.done(self.offset());
        let depth = self.code.exception_stack.len();
        for thrown in pending {
            if !region.catches(&thrown) {
                self.code.register_thrown(thrown, depth);
            }
        }
        self.code.exceptions.push(region);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Constant;
    use crate::jvm::UnqualifiedName;

    fn static_code(parameters: Vec<Type>) -> MethodCode {
        MethodCode::new(None, parameters)
    }

    #[test]
    fn stack_accounting() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        for _ in 0..5 {
            gen.emit_integer(1).unwrap();
        }
        gen.emit_return(&Type::VOID);
        assert_eq!(code.max_stack(), 5);
    }

    #[test]
    fn blocks_are_summed() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let label = gen.define_label();
        gen.emit_long(5).unwrap();
        gen.pop_type(&Type::LONG);
        gen.emit_goto(label).unwrap();
        gen.mark_label(label).unwrap();
        gen.emit_integer(0).unwrap();
        gen.emit_return(&Type::INT);
        assert_eq!(code.max_stack(), 3);
    }

    #[test]
    fn integer_encodings() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_integer(-1).unwrap();
        gen.emit_integer(5).unwrap();
        gen.emit_integer(42).unwrap();
        gen.emit_integer(-129).unwrap();
        gen.emit_integer(100_000).unwrap();
        assert_eq!(
            code.code.as_slice(),
            &[0x02, 0x08, 0x10, 42, 0x11, 0xFF, 0x7F, 0x12, 0x01]
        );
        assert_eq!(pool.lookup(crate::jvm::class_file::ConstantIndex(1), "Integer").unwrap(), &Constant::Integer(100_000));
    }

    #[test]
    fn wide_constants_use_ldc2_w() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_long(1).unwrap();
        gen.emit_long(7).unwrap();
        gen.emit_double(0.0).unwrap();
        gen.emit_double(-0.0).unwrap();
        gen.emit_float(2.0).unwrap();
        assert_eq!(
            code.code.as_slice(),
            &[0x0A, 0x14, 0x00, 0x01, 0x0E, 0x14, 0x00, 0x03, 0x0D]
        );
    }

    #[test]
    fn char_constants() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_char('A' as u16).unwrap();
        gen.emit_char(0x00E9).unwrap();
        gen.emit_char(0xFFFF).unwrap();
        assert_eq!(
            code.code.as_slice(),
            &[0x10, 0x41, 0x11, 0x00, 0xE9, 0x12, 0x01]
        );
    }

    #[test]
    fn local_slots_skip_wide_values() {
        let mut pool = ConstantsPool::new();
        let mut code = MethodCode::new(Some(Type::object()), vec![Type::LONG, Type::INT]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let first = gen.declare_local(Some("first"), Type::DOUBLE);
        let second = gen.declare_local(None, Type::string());
        gen.emit_load_argument(0).unwrap();
        gen.emit_load_argument(1).unwrap();
        gen.emit_load(first).unwrap();
        gen.emit_store(second).unwrap();
        gen.emit_this().unwrap();
        assert_eq!(
            code.code.as_slice(),
            &[0x1F, 0x1D, 0x18, 0x04, 0x3A, 0x06, 0x2A]
        );
        assert_eq!(code.max_locals(), 7);
        assert_eq!(code.locals()[0].start, Some(2));
        assert_eq!(code.locals()[0].end, Some(4));
        assert_eq!((code.locals()[1].start, code.locals()[1].end), (Some(6), Some(6)));
    }

    #[test]
    fn wide_locals() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let locals: Vec<Local> = (0..300)
            .map(|_| gen.declare_local(None, Type::INT))
            .collect();
        gen.emit_load(locals[299]).unwrap();
        gen.increment(locals[299], 1).unwrap();
        gen.increment(locals[2], 1000).unwrap();
        gen.increment(locals[2], -3).unwrap();
        assert_eq!(
            code.code.as_slice(),
            &[
                0xC4, 0x15, 0x01, 0x2B, // wide iload 299
                0xC4, 0x84, 0x01, 0x2B, 0x00, 0x01, // wide iinc 299 1
                0xC4, 0x84, 0x00, 0x02, 0x03, 0xE8, // wide iinc 2 1000
                0x84, 0x02, 0xFD, // iinc 2 -3
            ]
        );
    }

    #[test]
    fn static_methods_have_no_this() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![Type::INT]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        assert!(matches!(gen.emit_this(), Err(Error::NoThisInStaticMethod)));
        assert!(matches!(
            gen.emit_load_argument(1),
            Err(Error::ArgumentIndexOutOfRange { index: 1, count: 1 })
        ));
        gen.emit_load_argument(0).unwrap();
        assert_eq!(code.code.as_slice(), &[0x1A]);
    }

    #[test]
    fn invocations_track_the_receiver() {
        let mut pool = ConstantsPool::new();
        let mut code = MethodCode::new(Some(Type::object()), vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_this().unwrap();
        gen.emit_this().unwrap();
        gen.call(&MethodRef::object_equals()).unwrap();
        assert_eq!(gen.stack_size(), 1);

        gen.emit_string("abc").unwrap();
        let char_sequence_length = MethodRef::virtual_method(
            Type::char_sequence(),
            UnqualifiedName::LENGTH,
            vec![],
            Type::INT,
        );
        gen.call(&char_sequence_length).unwrap();
        assert_eq!(gen.stack_size(), 2);
        let bytes = &code.code.as_slice()[code.offset() - 5..];
        assert_eq!(bytes[0], 0xB9);
        assert_eq!(&bytes[3..], &[1, 0]);
    }

    #[test]
    fn invocations_are_limited_to_255_slots() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        // 255 parameter slots, plus the receiver
        let too_wide = MethodRef::virtual_method(
            Type::char_sequence(),
            UnqualifiedName::LENGTH,
            vec![Type::INT; 255],
            Type::INT,
        );
        let offset = gen.offset();
        assert!(matches!(gen.call(&too_wide), Err(Error::TooManyParameterSlots(256))));
        assert_eq!(gen.offset(), offset);
    }

    #[test]
    fn fields() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.get_field(&FieldRef::system_out()).unwrap();
        assert_eq!(gen.stack_size(), 1);
        gen.emit_long(3).unwrap();
        let field = FieldRef::new(
            Type::object(),
            UnqualifiedName::LENGTH,
            Type::LONG,
            false,
        );
        gen.put_field(&field).unwrap();
        assert_eq!(gen.stack_size(), 0);
    }

    #[test]
    fn arrays() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_integer(3).unwrap();
        gen.emit_new_array(&Type::array_of(Type::INT), 1).unwrap();
        assert_eq!(&code.code.as_slice()[1..], &[0xBC, 10]);

        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let matrix = Type::array_of(Type::array_of(Type::string()));
        gen.emit_integer(2).unwrap();
        gen.emit_integer(2).unwrap();
        gen.emit_new_array(&matrix, 2).unwrap();
        assert_eq!(gen.stack_size(), 2);
        assert!(matches!(
            gen.emit_new_array(&matrix, 3),
            Err(Error::ArrayDimensionsTooLarge { requested: 3, rank: 2 })
        ));
        let bytes = code.code.as_slice();
        assert_eq!(bytes[bytes.len() - 4], 0xC5);
        assert_eq!(bytes[bytes.len() - 1], 2);
    }

    #[test]
    fn array_initializer() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_array(&Type::INT, 2, |gen, index| gen.emit_integer(10 + index as i32))
            .unwrap();
        assert_eq!(
            code.code.as_slice(),
            &[0x05, 0xBC, 10, 0x59, 0x03, 0x10, 10, 0x4F, 0x59, 0x04, 0x10, 11, 0x4F]
        );
        assert_eq!(code.max_stack(), 4);
    }

    #[test]
    fn new_objects() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.emit_new(&Type::LONG).unwrap();
        gen.emit_new(&Type::object()).unwrap();
        gen.dup();
        gen.call_constructor(&MethodRef::object_init()).unwrap();
        assert_eq!(gen.stack_size(), 3);
        assert_eq!(code.code.as_slice()[0], 0x09);
        assert_eq!(code.code.as_slice()[1], 0xBB);
        assert_eq!(code.code.as_slice()[5], 0xB7);
    }

    #[test]
    fn checked_exceptions_are_tracked() {
        let io_exception = Type::class(
            crate::jvm::BinaryName::from_dotted("java.io.IOException").unwrap(),
            Some(Type::exception()),
            vec![],
        );
        let read = MethodRef::static_method(
            Type::object(),
            UnqualifiedName::VALUEOF,
            vec![],
            Type::VOID,
        )
        .with_thrown(vec![io_exception.clone(), Type::runtime_exception()]);
        let risky = read.clone().with_thrown(vec![Type::exception()]);

        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.call(&read).unwrap();
        assert_eq!(gen.method_code().unhandled_exceptions(), &[io_exception.clone()]);
        gen.call(&risky).unwrap();
        assert_eq!(gen.method_code().unhandled_exceptions(), &[Type::exception()]);

        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.begin_exception_block();
        gen.call(&read).unwrap();
        gen.begin_catch_block(&Type::exception()).unwrap();
        gen.call(&read).unwrap();
        gen.end_exception_block().unwrap();
        assert_eq!(gen.method_code().unhandled_exceptions(), &[io_exception.clone()]);

        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.begin_exception_block();
        gen.begin_exception_block();
        gen.call(&risky).unwrap();
        gen.begin_catch_block(&io_exception).unwrap();
        gen.pop();
        gen.end_exception_block().unwrap();
        gen.begin_catch_block(&Type::throwable()).unwrap();
        gen.pop();
        gen.end_exception_block().unwrap();
        assert!(gen.method_code().unhandled_exceptions().is_empty());
    }

    #[test]
    fn exception_block_states() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        assert!(matches!(gen.end_exception_block(), Err(Error::NotInExceptionBlock)));
        assert!(matches!(gen.begin_finally_block(), Err(Error::NotInExceptionBlock)));

        gen.begin_exception_block();
        gen.emit_integer(1).unwrap();
        gen.pop();
        assert!(matches!(
            gen.begin_catch_block(&Type::string()),
            Err(Error::CatchRequiresThrowable(_))
        ));
        assert!(matches!(
            gen.end_exception_block(),
            Err(Error::IncompleteExceptionBlock)
        ));

        gen.begin_exception_block();
        gen.emit_return(&Type::VOID);
        assert!(matches!(code.bake(), Err(Error::UnclosedExceptionBlock)));
    }

    #[test]
    fn empty_try_blocks_are_rejected() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        gen.begin_exception_block();
        gen.end_try_block().unwrap();
        gen.begin_catch_block(&Type::exception()).unwrap();
        gen.pop();
        assert!(matches!(gen.end_exception_block(), Err(Error::EmptyTryBlock)));
    }

    #[test]
    fn try_catch_finally() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);

        gen.begin_exception_block();
        gen.emit(OpCode::NOP).unwrap();
        gen.begin_catch_block(&Type::exception()).unwrap();
        gen.pop();
        gen.begin_finally_block().unwrap();
        gen.emit_throw();
        gen.end_exception_block().unwrap();
        gen.emit_return(&Type::VOID);

        // 0: nop
        // 1: goto 5
        // 4: pop
        // 5: goto 9
        // 8: athrow
        // 9: return
        let baked = code.bake().unwrap().unwrap();
        assert_eq!(baked.bytes, vec![0x00, 0xA7, 0x00, 0x04, 0x57, 0xA7, 0x00, 0x04, 0xBF, 0xB1]);

        let region = &baked.exceptions[0];
        let rows = region.table_rows(&baked.bytes);
        let finally_rows: Vec<_> = rows.iter().filter(|row| row.handler == 8).collect();
        assert_eq!(finally_rows.len(), 2);
        assert_eq!((rows[0].start, rows[0].end, rows[0].handler), (0, 4, 4));
        assert_eq!((finally_rows[1].start, finally_rows[1].end), (4, 5));
    }

    #[test]
    fn operands_are_checked() {
        let mut pool = ConstantsPool::new();
        let mut code = static_code(vec![]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        assert!(matches!(gen.emit(OpCode::BIPUSH), Err(Error::UnexpectedOperand(_))));
        let label = gen.define_label();
        assert!(matches!(
            gen.emit_branch(OpCode::NOP, label),
            Err(Error::UnexpectedOperand(_))
        ));
        gen.emit_byte_operand(OpCode::BIPUSH, -2).unwrap();
        gen.emit_short_operand(OpCode::SIPUSH, 300).unwrap();
        assert_eq!(code.code.as_slice(), &[0x10, 0xFE, 0x11, 0x01, 0x2C]);
    }

    #[test]
    fn empty_bodies_bake_to_nothing() {
        let code = static_code(vec![]);
        assert!(code.bake().unwrap().is_none());
    }
}
