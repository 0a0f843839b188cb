use crate::jvm::{BaseType, Type};
use std::fmt;

/// Shape of the operand that follows an opcode in the bytecode stream
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperandType {
    None,

    /// Signed byte (`bipush`)
    Byte,

    /// Signed short (`sipush`)
    Short,

    /// One byte constant pool index (`ldc`)
    Constant,

    /// Two byte constant pool index (`ldc_w`, `ldc2_w`)
    WideConstant,

    /// Local variable slot (two bytes when prefixed by `wide`)
    Local,

    /// Local slot and signed delta (`iinc`)
    Increment,

    /// Two byte relative jump
    Branch,

    /// Four byte relative jump
    WideBranch,

    /// Padded jump table (`tableswitch`, `lookupswitch`)
    Switch,

    Field,
    Method,

    /// Method index followed by an argument count and a zero byte
    InterfaceMethod,

    /// Call site index followed by two zero bytes
    DynamicCallSite,

    /// Class constant (`new`, `checkcast`, ...)
    Type,

    /// Array type code (`newarray`)
    PrimitiveType,

    /// Class constant followed by a dimension count
    MultiArray,
}

impl OperandType {
    /// Number of bytes taken by the operand, if that is fixed
    pub fn size(self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Byte | OperandType::Constant | OperandType::PrimitiveType => Some(1),
            OperandType::Local => Some(1),
            OperandType::Short
            | OperandType::WideConstant
            | OperandType::Increment
            | OperandType::Branch
            | OperandType::Field
            | OperandType::Method
            | OperandType::Type => Some(2),
            OperandType::MultiArray => Some(3),
            OperandType::WideBranch
            | OperandType::InterfaceMethod
            | OperandType::DynamicCallSite => Some(4),
            OperandType::Switch => None,
        }
    }
}

struct OpInfo {
    name: &'static str,
    operand_type: OperandType,
    stack_change: i8,
}

impl OpInfo {
    const fn new(name: &'static str, operand_type: OperandType, stack_change: i8) -> OpInfo {
        OpInfo {
            name,
            operand_type,
            stack_change,
        }
    }
}

/// JVM opcode
///
/// Every opcode knows the shape of its operand and the net effect it has on the operand stack
/// (counted in slots, so `long` and `double` values count twice). Instructions whose effect
/// depends on their operand (field access, invocations, `multianewarray`) report `0` here and
/// have their effect accounted for separately by the code generator.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpCode(u8);

impl OpCode {
    pub const NOP: OpCode = OpCode(0x00);
    pub const ACONST_NULL: OpCode = OpCode(0x01);
    pub const ICONST_M1: OpCode = OpCode(0x02);
    pub const ICONST_0: OpCode = OpCode(0x03);
    pub const ICONST_1: OpCode = OpCode(0x04);
    pub const ICONST_2: OpCode = OpCode(0x05);
    pub const ICONST_3: OpCode = OpCode(0x06);
    pub const ICONST_4: OpCode = OpCode(0x07);
    pub const ICONST_5: OpCode = OpCode(0x08);
    pub const LCONST_0: OpCode = OpCode(0x09);
    pub const LCONST_1: OpCode = OpCode(0x0A);
    pub const FCONST_0: OpCode = OpCode(0x0B);
    pub const FCONST_1: OpCode = OpCode(0x0C);
    pub const FCONST_2: OpCode = OpCode(0x0D);
    pub const DCONST_0: OpCode = OpCode(0x0E);
    pub const DCONST_1: OpCode = OpCode(0x0F);
    pub const BIPUSH: OpCode = OpCode(0x10);
    pub const SIPUSH: OpCode = OpCode(0x11);
    pub const LDC: OpCode = OpCode(0x12);
    pub const LDC_W: OpCode = OpCode(0x13);
    pub const LDC2_W: OpCode = OpCode(0x14);
    pub const ILOAD: OpCode = OpCode(0x15);
    pub const LLOAD: OpCode = OpCode(0x16);
    pub const FLOAD: OpCode = OpCode(0x17);
    pub const DLOAD: OpCode = OpCode(0x18);
    pub const ALOAD: OpCode = OpCode(0x19);
    pub const ILOAD_0: OpCode = OpCode(0x1A);
    pub const ILOAD_1: OpCode = OpCode(0x1B);
    pub const ILOAD_2: OpCode = OpCode(0x1C);
    pub const ILOAD_3: OpCode = OpCode(0x1D);
    pub const LLOAD_0: OpCode = OpCode(0x1E);
    pub const LLOAD_1: OpCode = OpCode(0x1F);
    pub const LLOAD_2: OpCode = OpCode(0x20);
    pub const LLOAD_3: OpCode = OpCode(0x21);
    pub const FLOAD_0: OpCode = OpCode(0x22);
    pub const FLOAD_1: OpCode = OpCode(0x23);
    pub const FLOAD_2: OpCode = OpCode(0x24);
    pub const FLOAD_3: OpCode = OpCode(0x25);
    pub const DLOAD_0: OpCode = OpCode(0x26);
    pub const DLOAD_1: OpCode = OpCode(0x27);
    pub const DLOAD_2: OpCode = OpCode(0x28);
    pub const DLOAD_3: OpCode = OpCode(0x29);
    pub const ALOAD_0: OpCode = OpCode(0x2A);
    pub const ALOAD_1: OpCode = OpCode(0x2B);
    pub const ALOAD_2: OpCode = OpCode(0x2C);
    pub const ALOAD_3: OpCode = OpCode(0x2D);
    pub const IALOAD: OpCode = OpCode(0x2E);
    pub const LALOAD: OpCode = OpCode(0x2F);
    pub const FALOAD: OpCode = OpCode(0x30);
    pub const DALOAD: OpCode = OpCode(0x31);
    pub const AALOAD: OpCode = OpCode(0x32);
    pub const BALOAD: OpCode = OpCode(0x33);
    pub const CALOAD: OpCode = OpCode(0x34);
    pub const SALOAD: OpCode = OpCode(0x35);
    pub const ISTORE: OpCode = OpCode(0x36);
    pub const LSTORE: OpCode = OpCode(0x37);
    pub const FSTORE: OpCode = OpCode(0x38);
    pub const DSTORE: OpCode = OpCode(0x39);
    pub const ASTORE: OpCode = OpCode(0x3A);
    pub const ISTORE_0: OpCode = OpCode(0x3B);
    pub const ISTORE_1: OpCode = OpCode(0x3C);
    pub const ISTORE_2: OpCode = OpCode(0x3D);
    pub const ISTORE_3: OpCode = OpCode(0x3E);
    pub const LSTORE_0: OpCode = OpCode(0x3F);
    pub const LSTORE_1: OpCode = OpCode(0x40);
    pub const LSTORE_2: OpCode = OpCode(0x41);
    pub const LSTORE_3: OpCode = OpCode(0x42);
    pub const FSTORE_0: OpCode = OpCode(0x43);
    pub const FSTORE_1: OpCode = OpCode(0x44);
    pub const FSTORE_2: OpCode = OpCode(0x45);
    pub const FSTORE_3: OpCode = OpCode(0x46);
    pub const DSTORE_0: OpCode = OpCode(0x47);
    pub const DSTORE_1: OpCode = OpCode(0x48);
    pub const DSTORE_2: OpCode = OpCode(0x49);
    pub const DSTORE_3: OpCode = OpCode(0x4A);
    pub const ASTORE_0: OpCode = OpCode(0x4B);
    pub const ASTORE_1: OpCode = OpCode(0x4C);
    pub const ASTORE_2: OpCode = OpCode(0x4D);
    pub const ASTORE_3: OpCode = OpCode(0x4E);
    pub const IASTORE: OpCode = OpCode(0x4F);
    pub const LASTORE: OpCode = OpCode(0x50);
    pub const FASTORE: OpCode = OpCode(0x51);
    pub const DASTORE: OpCode = OpCode(0x52);
    pub const AASTORE: OpCode = OpCode(0x53);
    pub const BASTORE: OpCode = OpCode(0x54);
    pub const CASTORE: OpCode = OpCode(0x55);
    pub const SASTORE: OpCode = OpCode(0x56);
    pub const POP: OpCode = OpCode(0x57);
    pub const POP2: OpCode = OpCode(0x58);
    pub const DUP: OpCode = OpCode(0x59);
    pub const DUP_X1: OpCode = OpCode(0x5A);
    pub const DUP_X2: OpCode = OpCode(0x5B);
    pub const DUP2: OpCode = OpCode(0x5C);
    pub const DUP2_X1: OpCode = OpCode(0x5D);
    pub const DUP2_X2: OpCode = OpCode(0x5E);
    pub const SWAP: OpCode = OpCode(0x5F);
    pub const IADD: OpCode = OpCode(0x60);
    pub const LADD: OpCode = OpCode(0x61);
    pub const FADD: OpCode = OpCode(0x62);
    pub const DADD: OpCode = OpCode(0x63);
    pub const ISUB: OpCode = OpCode(0x64);
    pub const LSUB: OpCode = OpCode(0x65);
    pub const FSUB: OpCode = OpCode(0x66);
    pub const DSUB: OpCode = OpCode(0x67);
    pub const IMUL: OpCode = OpCode(0x68);
    pub const LMUL: OpCode = OpCode(0x69);
    pub const FMUL: OpCode = OpCode(0x6A);
    pub const DMUL: OpCode = OpCode(0x6B);
    pub const IDIV: OpCode = OpCode(0x6C);
    pub const LDIV: OpCode = OpCode(0x6D);
    pub const FDIV: OpCode = OpCode(0x6E);
    pub const DDIV: OpCode = OpCode(0x6F);
    pub const IREM: OpCode = OpCode(0x70);
    pub const LREM: OpCode = OpCode(0x71);
    pub const FREM: OpCode = OpCode(0x72);
    pub const DREM: OpCode = OpCode(0x73);
    pub const INEG: OpCode = OpCode(0x74);
    pub const LNEG: OpCode = OpCode(0x75);
    pub const FNEG: OpCode = OpCode(0x76);
    pub const DNEG: OpCode = OpCode(0x77);
    pub const ISHL: OpCode = OpCode(0x78);
    pub const LSHL: OpCode = OpCode(0x79);
    pub const ISHR: OpCode = OpCode(0x7A);
    pub const LSHR: OpCode = OpCode(0x7B);
    pub const IUSHR: OpCode = OpCode(0x7C);
    pub const LUSHR: OpCode = OpCode(0x7D);
    pub const IAND: OpCode = OpCode(0x7E);
    pub const LAND: OpCode = OpCode(0x7F);
    pub const IOR: OpCode = OpCode(0x80);
    pub const LOR: OpCode = OpCode(0x81);
    pub const IXOR: OpCode = OpCode(0x82);
    pub const LXOR: OpCode = OpCode(0x83);
    pub const IINC: OpCode = OpCode(0x84);
    pub const I2L: OpCode = OpCode(0x85);
    pub const I2F: OpCode = OpCode(0x86);
    pub const I2D: OpCode = OpCode(0x87);
    pub const L2I: OpCode = OpCode(0x88);
    pub const L2F: OpCode = OpCode(0x89);
    pub const L2D: OpCode = OpCode(0x8A);
    pub const F2I: OpCode = OpCode(0x8B);
    pub const F2L: OpCode = OpCode(0x8C);
    pub const F2D: OpCode = OpCode(0x8D);
    pub const D2I: OpCode = OpCode(0x8E);
    pub const D2L: OpCode = OpCode(0x8F);
    pub const D2F: OpCode = OpCode(0x90);
    pub const I2B: OpCode = OpCode(0x91);
    pub const I2C: OpCode = OpCode(0x92);
    pub const I2S: OpCode = OpCode(0x93);
    pub const LCMP: OpCode = OpCode(0x94);
    pub const FCMPL: OpCode = OpCode(0x95);
    pub const FCMPG: OpCode = OpCode(0x96);
    pub const DCMPL: OpCode = OpCode(0x97);
    pub const DCMPG: OpCode = OpCode(0x98);
    pub const IFEQ: OpCode = OpCode(0x99);
    pub const IFNE: OpCode = OpCode(0x9A);
    pub const IFLT: OpCode = OpCode(0x9B);
    pub const IFGE: OpCode = OpCode(0x9C);
    pub const IFGT: OpCode = OpCode(0x9D);
    pub const IFLE: OpCode = OpCode(0x9E);
    pub const IF_ICMPEQ: OpCode = OpCode(0x9F);
    pub const IF_ICMPNE: OpCode = OpCode(0xA0);
    pub const IF_ICMPLT: OpCode = OpCode(0xA1);
    pub const IF_ICMPGE: OpCode = OpCode(0xA2);
    pub const IF_ICMPGT: OpCode = OpCode(0xA3);
    pub const IF_ICMPLE: OpCode = OpCode(0xA4);
    pub const IF_ACMPEQ: OpCode = OpCode(0xA5);
    pub const IF_ACMPNE: OpCode = OpCode(0xA6);
    pub const GOTO: OpCode = OpCode(0xA7);
    pub const JSR: OpCode = OpCode(0xA8);
    pub const RET: OpCode = OpCode(0xA9);
    pub const TABLESWITCH: OpCode = OpCode(0xAA);
    pub const LOOKUPSWITCH: OpCode = OpCode(0xAB);
    pub const IRETURN: OpCode = OpCode(0xAC);
    pub const LRETURN: OpCode = OpCode(0xAD);
    pub const FRETURN: OpCode = OpCode(0xAE);
    pub const DRETURN: OpCode = OpCode(0xAF);
    pub const ARETURN: OpCode = OpCode(0xB0);
    pub const RETURN: OpCode = OpCode(0xB1);
    pub const GETSTATIC: OpCode = OpCode(0xB2);
    pub const PUTSTATIC: OpCode = OpCode(0xB3);
    pub const GETFIELD: OpCode = OpCode(0xB4);
    pub const PUTFIELD: OpCode = OpCode(0xB5);
    pub const INVOKEVIRTUAL: OpCode = OpCode(0xB6);
    pub const INVOKESPECIAL: OpCode = OpCode(0xB7);
    pub const INVOKESTATIC: OpCode = OpCode(0xB8);
    pub const INVOKEINTERFACE: OpCode = OpCode(0xB9);
    pub const INVOKEDYNAMIC: OpCode = OpCode(0xBA);
    pub const NEW: OpCode = OpCode(0xBB);
    pub const NEWARRAY: OpCode = OpCode(0xBC);
    pub const ANEWARRAY: OpCode = OpCode(0xBD);
    pub const ARRAYLENGTH: OpCode = OpCode(0xBE);
    pub const ATHROW: OpCode = OpCode(0xBF);
    pub const CHECKCAST: OpCode = OpCode(0xC0);
    pub const INSTANCEOF: OpCode = OpCode(0xC1);
    pub const MONITORENTER: OpCode = OpCode(0xC2);
    pub const MONITOREXIT: OpCode = OpCode(0xC3);
    pub const WIDE: OpCode = OpCode(0xC4);
    pub const MULTIANEWARRAY: OpCode = OpCode(0xC5);
    pub const IFNULL: OpCode = OpCode(0xC6);
    pub const IFNONNULL: OpCode = OpCode(0xC7);
    pub const GOTO_W: OpCode = OpCode(0xC8);
    pub const JSR_W: OpCode = OpCode(0xC9);
    pub const BREAKPOINT: OpCode = OpCode(0xCA);

    /// Look up an opcode from its byte
    pub fn from_code(code: u8) -> Option<OpCode> {
        if (code as usize) < OPCODES.len() {
            Some(OpCode(code))
        } else {
            None
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// Mnemonic, as printed by `javap`
    pub fn name(self) -> &'static str {
        OPCODES[self.0 as usize].name
    }

    pub fn operand_type(self) -> OperandType {
        OPCODES[self.0 as usize].operand_type
    }

    /// Net change in operand stack depth
    pub fn stack_change(self) -> i32 {
        OPCODES[self.0 as usize].stack_change as i32
    }

    /// Full instruction length (opcode included), when it doesn't depend on the position
    pub fn size(self) -> Option<usize> {
        self.operand_type().size().map(|operand| operand + 1)
    }

    /// Whether control never falls through to the next instruction
    pub fn ends_unconditional_block(self) -> bool {
        matches!(
            self,
            OpCode::GOTO
                | OpCode::GOTO_W
                | OpCode::JSR
                | OpCode::JSR_W
                | OpCode::RET
                | OpCode::IRETURN
                | OpCode::LRETURN
                | OpCode::FRETURN
                | OpCode::DRETURN
                | OpCode::ARETURN
                | OpCode::RETURN
                | OpCode::ATHROW
        )
    }

    pub fn is_branch(self) -> bool {
        matches!(
            self.operand_type(),
            OperandType::Branch | OperandType::WideBranch
        )
    }

    /// Short form of a load or store with the slot built into the opcode (eg. `aload_2`)
    ///
    /// Only the `xload` and `xstore` opcodes for slots 0 to 3 have short forms.
    pub fn short_form(self, slot: u16) -> Option<OpCode> {
        if slot > 3 {
            return None;
        }
        let slot = slot as u8;
        match self.0 {
            code @ 0x15..=0x19 => Some(OpCode(0x1A + (code - 0x15) * 4 + slot)),
            code @ 0x36..=0x3A => Some(OpCode(0x3B + (code - 0x36) * 4 + slot)),
            _ => None,
        }
    }

    /// `xload` for a local of the given type
    pub fn load(typ: &Type) -> OpCode {
        match typ.as_primitive() {
            Some(BaseType::Long) => OpCode::LLOAD,
            Some(BaseType::Float) => OpCode::FLOAD,
            Some(BaseType::Double) => OpCode::DLOAD,
            Some(_) => OpCode::ILOAD,
            None => OpCode::ALOAD,
        }
    }

    /// `xstore` for a local of the given type
    pub fn store(typ: &Type) -> OpCode {
        match typ.as_primitive() {
            Some(BaseType::Long) => OpCode::LSTORE,
            Some(BaseType::Float) => OpCode::FSTORE,
            Some(BaseType::Double) => OpCode::DSTORE,
            Some(_) => OpCode::ISTORE,
            None => OpCode::ASTORE,
        }
    }

    /// `xaload` for an array with the given element type
    pub fn array_load(element: &Type) -> OpCode {
        match element.as_primitive() {
            Some(BaseType::Boolean | BaseType::Byte) => OpCode::BALOAD,
            Some(BaseType::Char) => OpCode::CALOAD,
            Some(BaseType::Short) => OpCode::SALOAD,
            Some(BaseType::Int) => OpCode::IALOAD,
            Some(BaseType::Long) => OpCode::LALOAD,
            Some(BaseType::Float) => OpCode::FALOAD,
            Some(BaseType::Double) => OpCode::DALOAD,
            None => OpCode::AALOAD,
        }
    }

    /// `xastore` for an array with the given element type
    pub fn array_store(element: &Type) -> OpCode {
        match element.as_primitive() {
            Some(BaseType::Boolean | BaseType::Byte) => OpCode::BASTORE,
            Some(BaseType::Char) => OpCode::CASTORE,
            Some(BaseType::Short) => OpCode::SASTORE,
            Some(BaseType::Int) => OpCode::IASTORE,
            Some(BaseType::Long) => OpCode::LASTORE,
            Some(BaseType::Float) => OpCode::FASTORE,
            Some(BaseType::Double) => OpCode::DASTORE,
            None => OpCode::AASTORE,
        }
    }

    /// `xreturn` for the given return type (`return` for `void`)
    pub fn return_for(typ: &Type) -> OpCode {
        match typ {
            Type::Void => OpCode::RETURN,
            Type::Primitive(BaseType::Long) => OpCode::LRETURN,
            Type::Primitive(BaseType::Float) => OpCode::FRETURN,
            Type::Primitive(BaseType::Double) => OpCode::DRETURN,
            Type::Primitive(_) => OpCode::IRETURN,
            _ => OpCode::ARETURN,
        }
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static OPCODES: [OpInfo; 203] = [
    OpInfo::new("nop", OperandType::None, 0),
    OpInfo::new("aconst_null", OperandType::None, 1),
    OpInfo::new("iconst_m1", OperandType::None, 1),
    OpInfo::new("iconst_0", OperandType::None, 1),
    OpInfo::new("iconst_1", OperandType::None, 1),
    OpInfo::new("iconst_2", OperandType::None, 1),
    OpInfo::new("iconst_3", OperandType::None, 1),
    OpInfo::new("iconst_4", OperandType::None, 1),
    OpInfo::new("iconst_5", OperandType::None, 1),
    OpInfo::new("lconst_0", OperandType::None, 2),
    OpInfo::new("lconst_1", OperandType::None, 2),
    OpInfo::new("fconst_0", OperandType::None, 1),
    OpInfo::new("fconst_1", OperandType::None, 1),
    OpInfo::new("fconst_2", OperandType::None, 1),
    OpInfo::new("dconst_0", OperandType::None, 2),
    OpInfo::new("dconst_1", OperandType::None, 2),
    OpInfo::new("bipush", OperandType::Byte, 1),
    OpInfo::new("sipush", OperandType::Short, 1),
    OpInfo::new("ldc", OperandType::Constant, 1),
    OpInfo::new("ldc_w", OperandType::WideConstant, 1),
    OpInfo::new("ldc2_w", OperandType::WideConstant, 2),
    OpInfo::new("iload", OperandType::Local, 1),
    OpInfo::new("lload", OperandType::Local, 2),
    OpInfo::new("fload", OperandType::Local, 1),
    OpInfo::new("dload", OperandType::Local, 2),
    OpInfo::new("aload", OperandType::Local, 1),
    OpInfo::new("iload_0", OperandType::None, 1),
    OpInfo::new("iload_1", OperandType::None, 1),
    OpInfo::new("iload_2", OperandType::None, 1),
    OpInfo::new("iload_3", OperandType::None, 1),
    OpInfo::new("lload_0", OperandType::None, 2),
    OpInfo::new("lload_1", OperandType::None, 2),
    OpInfo::new("lload_2", OperandType::None, 2),
    OpInfo::new("lload_3", OperandType::None, 2),
    OpInfo::new("fload_0", OperandType::None, 1),
    OpInfo::new("fload_1", OperandType::None, 1),
    OpInfo::new("fload_2", OperandType::None, 1),
    OpInfo::new("fload_3", OperandType::None, 1),
    OpInfo::new("dload_0", OperandType::None, 2),
    OpInfo::new("dload_1", OperandType::None, 2),
    OpInfo::new("dload_2", OperandType::None, 2),
    OpInfo::new("dload_3", OperandType::None, 2),
    OpInfo::new("aload_0", OperandType::None, 1),
    OpInfo::new("aload_1", OperandType::None, 1),
    OpInfo::new("aload_2", OperandType::None, 1),
    OpInfo::new("aload_3", OperandType::None, 1),
    OpInfo::new("iaload", OperandType::None, -1),
    OpInfo::new("laload", OperandType::None, 0),
    OpInfo::new("faload", OperandType::None, -1),
    OpInfo::new("daload", OperandType::None, 0),
    OpInfo::new("aaload", OperandType::None, -1),
    OpInfo::new("baload", OperandType::None, -1),
    OpInfo::new("caload", OperandType::None, -1),
    OpInfo::new("saload", OperandType::None, -1),
    OpInfo::new("istore", OperandType::Local, -1),
    OpInfo::new("lstore", OperandType::Local, -2),
    OpInfo::new("fstore", OperandType::Local, -1),
    OpInfo::new("dstore", OperandType::Local, -2),
    OpInfo::new("astore", OperandType::Local, -1),
    OpInfo::new("istore_0", OperandType::None, -1),
    OpInfo::new("istore_1", OperandType::None, -1),
    OpInfo::new("istore_2", OperandType::None, -1),
    OpInfo::new("istore_3", OperandType::None, -1),
    OpInfo::new("lstore_0", OperandType::None, -2),
    OpInfo::new("lstore_1", OperandType::None, -2),
    OpInfo::new("lstore_2", OperandType::None, -2),
    OpInfo::new("lstore_3", OperandType::None, -2),
    OpInfo::new("fstore_0", OperandType::None, -1),
    OpInfo::new("fstore_1", OperandType::None, -1),
    OpInfo::new("fstore_2", OperandType::None, -1),
    OpInfo::new("fstore_3", OperandType::None, -1),
    OpInfo::new("dstore_0", OperandType::None, -2),
    OpInfo::new("dstore_1", OperandType::None, -2),
    OpInfo::new("dstore_2", OperandType::None, -2),
    OpInfo::new("dstore_3", OperandType::None, -2),
    OpInfo::new("astore_0", OperandType::None, -1),
    OpInfo::new("astore_1", OperandType::None, -1),
    OpInfo::new("astore_2", OperandType::None, -1),
    OpInfo::new("astore_3", OperandType::None, -1),
    OpInfo::new("iastore", OperandType::None, -3),
    OpInfo::new("lastore", OperandType::None, -4),
    OpInfo::new("fastore", OperandType::None, -3),
    OpInfo::new("dastore", OperandType::None, -4),
    OpInfo::new("aastore", OperandType::None, -3),
    OpInfo::new("bastore", OperandType::None, -3),
    OpInfo::new("castore", OperandType::None, -3),
    OpInfo::new("sastore", OperandType::None, -3),
    OpInfo::new("pop", OperandType::None, -1),
    OpInfo::new("pop2", OperandType::None, -2),
    OpInfo::new("dup", OperandType::None, 1),
    OpInfo::new("dup_x1", OperandType::None, 1),
    OpInfo::new("dup_x2", OperandType::None, 1),
    OpInfo::new("dup2", OperandType::None, 2),
    OpInfo::new("dup2_x1", OperandType::None, 2),
    OpInfo::new("dup2_x2", OperandType::None, 2),
    OpInfo::new("swap", OperandType::None, 0),
    OpInfo::new("iadd", OperandType::None, -1),
    OpInfo::new("ladd", OperandType::None, -2),
    OpInfo::new("fadd", OperandType::None, -1),
    OpInfo::new("dadd", OperandType::None, -2),
    OpInfo::new("isub", OperandType::None, -1),
    OpInfo::new("lsub", OperandType::None, -2),
    OpInfo::new("fsub", OperandType::None, -1),
    OpInfo::new("dsub", OperandType::None, -2),
    OpInfo::new("imul", OperandType::None, -1),
    OpInfo::new("lmul", OperandType::None, -2),
    OpInfo::new("fmul", OperandType::None, -1),
    OpInfo::new("dmul", OperandType::None, -2),
    OpInfo::new("idiv", OperandType::None, -1),
    OpInfo::new("ldiv", OperandType::None, -2),
    OpInfo::new("fdiv", OperandType::None, -1),
    OpInfo::new("ddiv", OperandType::None, -2),
    OpInfo::new("irem", OperandType::None, -1),
    OpInfo::new("lrem", OperandType::None, -2),
    OpInfo::new("frem", OperandType::None, -1),
    OpInfo::new("drem", OperandType::None, -2),
    OpInfo::new("ineg", OperandType::None, 0),
    OpInfo::new("lneg", OperandType::None, 0),
    OpInfo::new("fneg", OperandType::None, 0),
    OpInfo::new("dneg", OperandType::None, 0),
    OpInfo::new("ishl", OperandType::None, -1),
    OpInfo::new("lshl", OperandType::None, -1),
    OpInfo::new("ishr", OperandType::None, -1),
    OpInfo::new("lshr", OperandType::None, -1),
    OpInfo::new("iushr", OperandType::None, -1),
    OpInfo::new("lushr", OperandType::None, -1),
    OpInfo::new("iand", OperandType::None, -1),
    OpInfo::new("land", OperandType::None, -2),
    OpInfo::new("ior", OperandType::None, -1),
    OpInfo::new("lor", OperandType::None, -2),
    OpInfo::new("ixor", OperandType::None, -1),
    OpInfo::new("lxor", OperandType::None, -2),
    OpInfo::new("iinc", OperandType::Increment, 0),
    OpInfo::new("i2l", OperandType::None, 1),
    OpInfo::new("i2f", OperandType::None, 0),
    OpInfo::new("i2d", OperandType::None, 1),
    OpInfo::new("l2i", OperandType::None, -1),
    OpInfo::new("l2f", OperandType::None, -1),
    OpInfo::new("l2d", OperandType::None, 0),
    OpInfo::new("f2i", OperandType::None, 0),
    OpInfo::new("f2l", OperandType::None, 1),
    OpInfo::new("f2d", OperandType::None, 1),
    OpInfo::new("d2i", OperandType::None, -1),
    OpInfo::new("d2l", OperandType::None, 0),
    OpInfo::new("d2f", OperandType::None, -1),
    OpInfo::new("i2b", OperandType::None, 0),
    OpInfo::new("i2c", OperandType::None, 0),
    OpInfo::new("i2s", OperandType::None, 0),
    OpInfo::new("lcmp", OperandType::None, -3),
    OpInfo::new("fcmpl", OperandType::None, -1),
    OpInfo::new("fcmpg", OperandType::None, -1),
    OpInfo::new("dcmpl", OperandType::None, -3),
    OpInfo::new("dcmpg", OperandType::None, -3),
    OpInfo::new("ifeq", OperandType::Branch, -1),
    OpInfo::new("ifne", OperandType::Branch, -1),
    OpInfo::new("iflt", OperandType::Branch, -1),
    OpInfo::new("ifge", OperandType::Branch, -1),
    OpInfo::new("ifgt", OperandType::Branch, -1),
    OpInfo::new("ifle", OperandType::Branch, -1),
    OpInfo::new("if_icmpeq", OperandType::Branch, -2),
    OpInfo::new("if_icmpne", OperandType::Branch, -2),
    OpInfo::new("if_icmplt", OperandType::Branch, -2),
    OpInfo::new("if_icmpge", OperandType::Branch, -2),
    OpInfo::new("if_icmpgt", OperandType::Branch, -2),
    OpInfo::new("if_icmple", OperandType::Branch, -2),
    OpInfo::new("if_acmpeq", OperandType::Branch, -2),
    OpInfo::new("if_acmpne", OperandType::Branch, -2),
    OpInfo::new("goto", OperandType::Branch, 0),
    OpInfo::new("jsr", OperandType::Branch, 1),
    OpInfo::new("ret", OperandType::Local, 0),
    OpInfo::new("tableswitch", OperandType::Switch, -1),
    OpInfo::new("lookupswitch", OperandType::Switch, -1),
    OpInfo::new("ireturn", OperandType::None, -1),
    OpInfo::new("lreturn", OperandType::None, -2),
    OpInfo::new("freturn", OperandType::None, -1),
    OpInfo::new("dreturn", OperandType::None, -2),
    OpInfo::new("areturn", OperandType::None, -1),
    OpInfo::new("return", OperandType::None, 0),
    OpInfo::new("getstatic", OperandType::Field, 0),
    OpInfo::new("putstatic", OperandType::Field, 0),
    OpInfo::new("getfield", OperandType::Field, 0),
    OpInfo::new("putfield", OperandType::Field, 0),
    OpInfo::new("invokevirtual", OperandType::Method, 0),
    OpInfo::new("invokespecial", OperandType::Method, 0),
    OpInfo::new("invokestatic", OperandType::Method, 0),
    OpInfo::new("invokeinterface", OperandType::InterfaceMethod, 0),
    OpInfo::new("invokedynamic", OperandType::DynamicCallSite, 0),
    OpInfo::new("new", OperandType::Type, 1),
    OpInfo::new("newarray", OperandType::PrimitiveType, 0),
    OpInfo::new("anewarray", OperandType::Type, 0),
    OpInfo::new("arraylength", OperandType::None, 0),
    OpInfo::new("athrow", OperandType::None, -1),
    OpInfo::new("checkcast", OperandType::Type, 0),
    OpInfo::new("instanceof", OperandType::Type, 0),
    OpInfo::new("monitorenter", OperandType::None, -1),
    OpInfo::new("monitorexit", OperandType::None, -1),
    OpInfo::new("wide", OperandType::None, 0),
    OpInfo::new("multianewarray", OperandType::MultiArray, 0),
    OpInfo::new("ifnull", OperandType::Branch, -1),
    OpInfo::new("ifnonnull", OperandType::Branch, -1),
    OpInfo::new("goto_w", OperandType::WideBranch, 0),
    OpInfo::new("jsr_w", OperandType::WideBranch, 1),
    OpInfo::new("breakpoint", OperandType::None, 0),
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_indexed_by_code() {
        assert_eq!(OpCode::NOP.name(), "nop");
        assert_eq!(OpCode::IINC.code(), 0x84);
        assert_eq!(OpCode::GOTO.code(), 0xA7);
        assert_eq!(OpCode::INVOKEINTERFACE.code(), 0xB9);
        assert_eq!(OpCode::WIDE.code(), 0xC4);
        assert_eq!(OpCode::GOTO_W.code(), 0xC8);
        assert_eq!(OpCode::from_code(0xCA), Some(OpCode::BREAKPOINT));
        assert_eq!(OpCode::from_code(0xCB), None);
    }

    #[test]
    fn sizes() {
        assert_eq!(OpCode::RETURN.size(), Some(1));
        assert_eq!(OpCode::BIPUSH.size(), Some(2));
        assert_eq!(OpCode::GOTO.size(), Some(3));
        assert_eq!(OpCode::GOTO_W.size(), Some(5));
        assert_eq!(OpCode::INVOKEINTERFACE.size(), Some(5));
        assert_eq!(OpCode::MULTIANEWARRAY.size(), Some(4));
        assert_eq!(OpCode::TABLESWITCH.size(), None);
    }

    #[test]
    fn stack_changes() {
        assert_eq!(OpCode::LCONST_1.stack_change(), 2);
        assert_eq!(OpCode::LADD.stack_change(), -2);
        assert_eq!(OpCode::LSHL.stack_change(), -1);
        assert_eq!(OpCode::LCMP.stack_change(), -3);
        assert_eq!(OpCode::IASTORE.stack_change(), -3);
        assert_eq!(OpCode::DASTORE.stack_change(), -4);
        assert_eq!(OpCode::I2L.stack_change(), 1);
        assert_eq!(OpCode::D2F.stack_change(), -1);
    }

    #[test]
    fn short_forms() {
        assert_eq!(OpCode::ALOAD.short_form(0), Some(OpCode::ALOAD_0));
        assert_eq!(OpCode::DLOAD.short_form(3), Some(OpCode::DLOAD_3));
        assert_eq!(OpCode::ISTORE.short_form(1), Some(OpCode::ISTORE_1));
        assert_eq!(OpCode::ASTORE.short_form(3), Some(OpCode::ASTORE_3));
        assert_eq!(OpCode::ASTORE.short_form(4), None);
        assert_eq!(OpCode::IINC.short_form(0), None);
    }

    #[test]
    fn block_ends() {
        assert!(OpCode::GOTO.ends_unconditional_block());
        assert!(OpCode::ATHROW.ends_unconditional_block());
        assert!(OpCode::ARETURN.ends_unconditional_block());
        assert!(!OpCode::IFEQ.ends_unconditional_block());
        assert!(OpCode::IFEQ.is_branch());
        assert!(!OpCode::TABLESWITCH.is_branch());
    }

    #[test]
    fn typed_selection() {
        assert_eq!(OpCode::load(&Type::BOOLEAN), OpCode::ILOAD);
        assert_eq!(OpCode::store(&Type::string()), OpCode::ASTORE);
        assert_eq!(OpCode::array_load(&Type::BOOLEAN), OpCode::BALOAD);
        assert_eq!(OpCode::array_store(&Type::CHAR), OpCode::CASTORE);
        assert_eq!(OpCode::return_for(&Type::VOID), OpCode::RETURN);
        assert_eq!(OpCode::return_for(&Type::LONG), OpCode::LRETURN);
    }
}
