use super::Serialize;
use crate::jvm::{Error, FieldRef, MethodRef, RenderDescriptor, Type};
use crate::util::{Offset, OffsetVec, Width};
use byteorder::WriteBytesExt;
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::result::Result;

/// Class file constants pool builder
///
/// The pool is append only: every constant is interned on first use and keeps its index for the
/// rest of the type build. Composite constants are built bottom-up, so two structurally equal
/// constants always resolve to the same index. Use [`ConstantsWriter`] to intern whole types and
/// members in one go.
#[derive(Debug)]
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    utf8s: HashMap<String, Utf8ConstantIndex>,
    integers: HashMap<i32, ConstantIndex>,
    floats: HashMap<u32, ConstantIndex>,
    longs: HashMap<i64, ConstantIndex>,
    doubles: HashMap<u64, ConstantIndex>,
    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    strings: HashMap<Utf8ConstantIndex, StringConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    field_refs: HashMap<(ClassConstantIndex, NameAndTypeConstantIndex), FieldRefConstantIndex>,
    method_refs:
        HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, bool), MethodRefConstantIndex>,
    method_handles: HashMap<(HandleKind, ConstantIndex), ConstantIndex>,
    method_types: HashMap<Utf8ConstantIndex, MethodTypeConstantIndex>,
    invoke_dynamics: HashMap<(u16, NameAndTypeConstantIndex), InvokeDynamicConstantIndex>,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            utf8s: HashMap::new(),
            integers: HashMap::new(),
            floats: HashMap::new(),
            longs: HashMap::new(),
            doubles: HashMap::new(),
            classes: HashMap::new(),
            strings: HashMap::new(),
            name_and_types: HashMap::new(),
            field_refs: HashMap::new(),
            method_refs: HashMap::new(),
            method_handles: HashMap::new(),
            method_types: HashMap::new(),
            invoke_dynamics: HashMap::new(),
        }
    }

    /// Value of the `constant_pool_count` field (one more than the last usable index)
    pub fn count(&self) -> u16 {
        self.constants.offset_len().0 as u16
    }

    /// Number of entries (wide constants count once)
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> {
        self.constants
            .iter()
            .map(|(offset, constant)| (ConstantIndex(offset.0 as u16), constant))
    }

    /// Look up a constant, checking that it has the expected kind
    ///
    /// Indices that are out of bounds, or that land on the unusable second slot of a wide
    /// constant, are rejected the same way as indices of the wrong kind.
    pub fn lookup(&self, index: ConstantIndex, expected: &'static str) -> Result<&Constant, Error> {
        match self.constants.get_offset(Offset(index.0 as usize)) {
            Some(constant) if constant.kind_name() == expected => Ok(constant),
            _ => Err(Error::BadConstantIndex {
                index: index.0,
                expected,
            }),
        }
    }

    /// Look up the string in a utf8 constant
    pub fn lookup_utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.lookup(index.0, "Utf8")? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::BadConstantIndex {
                index: (index.0).0,
                expected: "Utf8",
            }),
        }
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, ConstantPoolOverflow> {
        let offset = self.constants.offset_len().0;
        if offset + constant.width() > u16::MAX as usize {
            return Err(ConstantPoolOverflow::PoolFull {
                constant,
                offset: offset as u16,
            });
        }

        self.constants.push(constant);
        Ok(ConstantIndex(offset as u16))
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, ConstantPoolOverflow> {
        let cow = utf8.into();

        if let Some(idx) = self.utf8s.get::<str>(cow.borrow()) {
            Ok(*idx)
        } else {
            let encoded_len = encode_modified_utf8(&cow).len();
            if encoded_len > u16::MAX as usize {
                return Err(ConstantPoolOverflow::Utf8TooLong(encoded_len));
            }

            let owned = cow.into_owned();
            let constant = Constant::Utf8(owned.clone());
            let idx = Utf8ConstantIndex(self.push_constant(constant)?);
            self.utf8s.insert(owned, idx);
            Ok(idx)
        }
    }

    pub fn get_integer(&mut self, integer: i32) -> Result<ConstantIndex, ConstantPoolOverflow> {
        if let Some(idx) = self.integers.get(&integer) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Integer(integer))?;
            self.integers.insert(integer, idx);
            Ok(idx)
        }
    }

    /// Floats are keyed by their bits: `0.0` and `-0.0` are distinct, and NaN matches itself
    pub fn get_float(&mut self, float: f32) -> Result<ConstantIndex, ConstantPoolOverflow> {
        let key = float.to_bits();
        if let Some(idx) = self.floats.get(&key) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Float(float))?;
            self.floats.insert(key, idx);
            Ok(idx)
        }
    }

    pub fn get_long(&mut self, long: i64) -> Result<ConstantIndex, ConstantPoolOverflow> {
        if let Some(idx) = self.longs.get(&long) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Long(long))?;
            self.longs.insert(long, idx);
            Ok(idx)
        }
    }

    pub fn get_double(&mut self, double: f64) -> Result<ConstantIndex, ConstantPoolOverflow> {
        let key = double.to_bits();
        if let Some(idx) = self.doubles.get(&key) {
            Ok(*idx)
        } else {
            let idx = self.push_constant(Constant::Double(double))?;
            self.doubles.insert(key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a class constant, given its internal name (or array descriptor)
    pub fn get_class(&mut self, name: &str) -> Result<ClassConstantIndex, ConstantPoolOverflow> {
        let name = self.get_utf8(name)?;
        if let Some(idx) = self.classes.get(&name) {
            Ok(*idx)
        } else {
            let idx = ClassConstantIndex(self.push_constant(Constant::Class(name))?);
            self.classes.insert(name, idx);
            Ok(idx)
        }
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string(
        &mut self,
        utf8: Utf8ConstantIndex,
    ) -> Result<StringConstantIndex, ConstantPoolOverflow> {
        if let Some(idx) = self.strings.get(&utf8) {
            Ok(*idx)
        } else {
            let constant = Constant::String(utf8);
            let idx = StringConstantIndex(self.push_constant(constant)?);
            self.strings.insert(utf8, idx);
            Ok(idx)
        }
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    ) -> Result<NameAndTypeConstantIndex, ConstantPoolOverflow> {
        let name_and_type_key = (name, descriptor);
        if let Some(idx) = self.name_and_types.get(&name_and_type_key) {
            Ok(*idx)
        } else {
            let constant = Constant::NameAndType { name, descriptor };
            let idx = NameAndTypeConstantIndex(self.push_constant(constant)?);
            self.name_and_types.insert(name_and_type_key, idx);
            Ok(idx)
        }
    }

    pub fn get_field_ref(
        &mut self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    ) -> Result<FieldRefConstantIndex, ConstantPoolOverflow> {
        let key = (class, name_and_type);
        if let Some(idx) = self.field_refs.get(&key) {
            Ok(*idx)
        } else {
            let constant = Constant::FieldRef(class, name_and_type);
            let idx = FieldRefConstantIndex(self.push_constant(constant)?);
            self.field_refs.insert(key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a `Methodref` (or `InterfaceMethodref` if `is_interface`)
    pub fn get_method_ref(
        &mut self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    ) -> Result<MethodRefConstantIndex, ConstantPoolOverflow> {
        let key = (class, name_and_type, is_interface);
        if let Some(idx) = self.method_refs.get(&key) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            };
            let idx = MethodRefConstantIndex(self.push_constant(constant)?);
            self.method_refs.insert(key, idx);
            Ok(idx)
        }
    }

    /// Get or insert a method handle constant from the constant pool
    pub fn get_method_handle(
        &mut self,
        handle_kind: HandleKind,
        member: ConstantIndex,
    ) -> Result<ConstantIndex, ConstantPoolOverflow> {
        let handle_key = (handle_kind, member);
        if let Some(idx) = self.method_handles.get(&handle_key) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodHandle {
                handle_kind,
                member,
            };
            let idx = self.push_constant(constant)?;
            self.method_handles.insert(handle_key, idx);
            Ok(idx)
        }
    }

    pub fn get_method_type(
        &mut self,
        descriptor: Utf8ConstantIndex,
    ) -> Result<MethodTypeConstantIndex, ConstantPoolOverflow> {
        if let Some(idx) = self.method_types.get(&descriptor) {
            Ok(*idx)
        } else {
            let constant = Constant::MethodType { descriptor };
            let idx = MethodTypeConstantIndex(self.push_constant(constant)?);
            self.method_types.insert(descriptor, idx);
            Ok(idx)
        }
    }

    /// Get or insert an invoke dynamic constant from the constant pool
    pub fn get_invoke_dynamic(
        &mut self,
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    ) -> Result<InvokeDynamicConstantIndex, ConstantPoolOverflow> {
        let indy_key = (bootstrap_method, method_descriptor);
        if let Some(idx) = self.invoke_dynamics.get(&indy_key) {
            Ok(*idx)
        } else {
            let constant = Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            };
            let idx = InvokeDynamicConstantIndex(self.push_constant(constant)?);
            self.invoke_dynamics.insert(indy_key, idx);
            Ok(idx)
        }
    }
}

impl Default for ConstantsPool {
    fn default() -> ConstantsPool {
        ConstantsPool::new()
    }
}

/// Count first, followed by every constant in index order
impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count().serialize(writer)?;
        for (_, constant) in self.constants.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConstantPoolOverflow {
    /// No index left in the pool for the constant
    PoolFull { constant: Constant, offset: u16 },

    /// Modified UTF-8 encoding is longer than the two byte length prefix allows
    Utf8TooLong(usize),
}

/// Constants as in the constant pool
///
/// Note: some constant types added after Java 8 are not included (since we don't generate them)
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the method kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },
}

impl Constant {
    /// Name of the kind of constant, as used in [`ConstantsPool::lookup`]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::Class(_) => "Class",
            Constant::FieldRef(_, _) => "Fieldref",
            Constant::MethodRef {
                is_interface: false,
                ..
            } => "Methodref",
            Constant::MethodRef {
                is_interface: true, ..
            } => "InterfaceMethodref",
            Constant::String(_) => "String",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::Utf8(_) => "Utf8",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(string) => {
                1u8.serialize(writer)?;
                let buffer: Vec<u8> = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(float) => {
                4u8.serialize(writer)?;
                float.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(double) => {
                6u8.serialize(writer)?;
                double.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(bytes) => {
                8u8.serialize(writer)?;
                bytes.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct StringConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct MethodTypeConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct FieldRefConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct MethodRefConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct InvokeDynamicConstantIndex(pub ConstantIndex);

macro_rules! constant_index_newtype {
    ($($index:ident),*) => {
        $(
            impl From<$index> for ConstantIndex {
                fn from(index: $index) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $index {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }
        )*
    };
}

constant_index_newtype!(
    Utf8ConstantIndex,
    StringConstantIndex,
    NameAndTypeConstantIndex,
    MethodTypeConstantIndex,
    ClassConstantIndex,
    FieldRefConstantIndex,
    MethodRefConstantIndex,
    InvokeDynamicConstantIndex
);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

/// Constant values: what can be pushed with `ldc` or attached to a static final field
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantData {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),

    /// Class literal (`Foo.class`)
    Class(Type),
}

impl ConstantData {
    /// Type of the value once pushed on the stack
    pub fn value_type(&self) -> Type {
        match self {
            ConstantData::Boolean(_) => Type::BOOLEAN,
            ConstantData::Byte(_) => Type::BYTE,
            ConstantData::Short(_) => Type::SHORT,
            ConstantData::Char(_) => Type::CHAR,
            ConstantData::Integer(_) => Type::INT,
            ConstantData::Long(_) => Type::LONG,
            ConstantData::Float(_) => Type::FLOAT,
            ConstantData::Double(_) => Type::DOUBLE,
            ConstantData::String(_) => Type::string(),
            ConstantData::Class(_) => Type::named(crate::jvm::BinaryName::CLASS),
        }
    }
}

pub trait ConstantsWriter<Index = ConstantIndex> {
    /// Get or insert a constant into the constant pool and return the associated index
    fn constant_index(&self, constants_pool: &mut ConstantsPool)
        -> Result<Index, ConstantPoolOverflow>;
}

/// When making a `CONSTANT_Class_info`, reference types are almost always objects. However,
/// there are a handful of places where an array type needs to be fit in (eg. for a `checkcast`
/// to an array type). See [this section of the JVM specification][0] for more.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.1
impl ConstantsWriter<ClassConstantIndex> for Type {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ClassConstantIndex, ConstantPoolOverflow> {
        constants.get_class(&self.internal_name())
    }
}

/// Write a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
impl ConstantsWriter<MethodRefConstantIndex> for MethodRef {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<MethodRefConstantIndex, ConstantPoolOverflow> {
        let class_idx = self.owner.constant_index(constants)?;
        let method_utf8 = constants.get_utf8(self.name.as_ref())?;
        let desc_utf8 = constants.get_utf8(self.descriptor())?;
        let name_and_type_idx = constants.get_name_and_type(method_utf8, desc_utf8)?;
        constants.get_method_ref(class_idx, name_and_type_idx, self.owner.is_interface())
    }
}

/// Write a `CONSTANT_Fieldref_info`
impl ConstantsWriter<FieldRefConstantIndex> for FieldRef {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<FieldRefConstantIndex, ConstantPoolOverflow> {
        let class_idx = self.owner.constant_index(constants)?;
        let field_utf8 = constants.get_utf8(self.name.as_ref())?;
        let desc_utf8 = constants.get_utf8(self.field_type.render())?;
        let name_and_type_idx = constants.get_name_and_type(field_utf8, desc_utf8)?;
        constants.get_field_ref(class_idx, name_and_type_idx)
    }
}

/// Write a constant which can be loaded up using `ldc` or `ldc2_w`
///
/// Sub-`int` values are all stored as `CONSTANT_Integer_info`.
impl ConstantsWriter<ConstantIndex> for ConstantData {
    fn constant_index(
        &self,
        constants: &mut ConstantsPool,
    ) -> Result<ConstantIndex, ConstantPoolOverflow> {
        match self {
            ConstantData::Boolean(boolean) => constants.get_integer(*boolean as i32),
            ConstantData::Byte(byte) => constants.get_integer(*byte as i32),
            ConstantData::Short(short) => constants.get_integer(*short as i32),
            ConstantData::Char(character) => constants.get_integer(*character as i32),
            ConstantData::Integer(integer) => constants.get_integer(*integer),
            ConstantData::Long(long) => constants.get_long(*long),
            ConstantData::Float(float) => constants.get_float(*float),
            ConstantData::Double(double) => constants.get_double(*double),
            ConstantData::String(string) => {
                let str_utf8 = constants.get_utf8(string.as_str())?;
                Ok(constants.get_string(str_utf8)?.into())
            }
            ConstantData::Class(class) => Ok(class.constant_index(constants)?.into()),
        }
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x1F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

#[cfg(test)]
mod encode_modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(
            encode_modified_utf8("hel10_World"),
            vec![104, 101, 108, 49, 48, 95, 87, 111, 114, 108, 100]
        );
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(
            encode_modified_utf8("ĄǍǞǠǺȀȂȦȺӐӒ"),
            vec![
                196, 132, 199, 141, 199, 158, 199, 160, 199, 186, 200, 128, 200, 130, 200, 166,
                200, 186, 211, 144, 211, 146
            ]
        );
        assert_eq!(
            encode_modified_utf8("ऄअॲঅਅઅଅஅఅಅഅะະ༁ཨ"),
            vec![
                224, 164, 132, 224, 164, 133, 224, 165, 178, 224, 166, 133, 224, 168, 133, 224,
                170, 133, 224, 172, 133, 224, 174, 133, 224, 176, 133, 224, 178, 133, 224, 180,
                133, 224, 184, 176, 224, 186, 176, 224, 188, 129, 224, 189, 168
            ]
        );
    }

    #[test]
    fn supplementary_characters() {
        assert_eq!(
            encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}"),
            vec![
                237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237,
                191, 191
            ]
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{BinaryName, UnqualifiedName};

    #[test]
    fn interning_is_structural() {
        let mut pool = ConstantsPool::new();
        let a = pool.get_utf8("hello").unwrap();
        let b = pool.get_utf8(String::from("hello")).unwrap();
        let c = pool.get_utf8("world").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        assert_eq!(pool.get_integer(42).unwrap(), pool.get_integer(42).unwrap());
        assert_ne!(pool.get_integer(42).unwrap(), pool.get_integer(43).unwrap());

        let string = Type::string();
        let first = string.constant_index(&mut pool).unwrap();
        let second = Type::named(BinaryName::STRING).constant_index(&mut pool).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn utf8_length_is_measured_encoded() {
        let mut pool = ConstantsPool::new();
        assert!(pool.get_utf8("x".repeat(u16::MAX as usize)).is_ok());
        assert!(matches!(
            pool.get_utf8("x".repeat(70_000)),
            Err(ConstantPoolOverflow::Utf8TooLong(70_000))
        ));

        // `\0` takes two bytes, so this one is too long even though it has 65535 chars
        let nulls = "\0".repeat(u16::MAX as usize);
        assert!(matches!(
            pool.get_utf8(nulls),
            Err(ConstantPoolOverflow::Utf8TooLong(131_070))
        ));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn floats_are_keyed_by_bits() {
        let mut pool = ConstantsPool::new();
        let zero = pool.get_float(0.0).unwrap();
        let negative_zero = pool.get_float(-0.0).unwrap();
        assert_ne!(zero, negative_zero);
        assert_eq!(pool.get_float(f32::NAN).unwrap(), pool.get_float(f32::NAN).unwrap());
        assert_eq!(pool.get_double(1.5).unwrap(), pool.get_double(1.5).unwrap());
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantsPool::new();
        assert_eq!(pool.get_long(1).unwrap(), ConstantIndex(1));
        assert_eq!(pool.get_integer(1).unwrap(), ConstantIndex(3));
        assert_eq!(pool.get_double(1.0).unwrap(), ConstantIndex(4));
        assert_eq!(pool.count(), 6);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn lookups_check_the_kind() {
        let mut pool = ConstantsPool::new();
        let long = pool.get_long(7).unwrap();
        let name = pool.get_utf8("name").unwrap();

        assert_eq!(pool.lookup(long, "Long").unwrap(), &Constant::Long(7));
        assert_eq!(pool.lookup_utf8(name).unwrap(), "name");
        assert!(matches!(
            pool.lookup(long, "Integer"),
            Err(Error::BadConstantIndex { index: 1, .. })
        ));
        assert!(pool.lookup(ConstantIndex(2), "Long").is_err());
        assert!(pool.lookup(ConstantIndex(0), "Utf8").is_err());
        assert!(pool.lookup(ConstantIndex(99), "Utf8").is_err());
    }

    #[test]
    fn member_references() {
        let mut pool = ConstantsPool::new();
        let hash_code = MethodRef::object_hash_code().constant_index(&mut pool).unwrap();
        assert_eq!(hash_code, MethodRef::object_hash_code().constant_index(&mut pool).unwrap());
        match pool.lookup(hash_code.into(), "Methodref").unwrap() {
            Constant::MethodRef { is_interface, .. } => assert!(!is_interface),
            other => panic!("unexpected constant {:?}", other),
        }

        let char_sequence_length = MethodRef::virtual_method(
            Type::char_sequence(),
            UnqualifiedName::LENGTH,
            vec![],
            Type::INT,
        );
        let idx = char_sequence_length.constant_index(&mut pool).unwrap();
        assert!(pool.lookup(idx.into(), "InterfaceMethodref").is_ok());

        let out = FieldRef::system_out().constant_index(&mut pool).unwrap();
        assert!(pool.lookup(out.into(), "Fieldref").is_ok());
    }

    #[test]
    fn small_constants_share_integer_entries() {
        let mut pool = ConstantsPool::new();
        let from_char = ConstantData::Char(65).constant_index(&mut pool).unwrap();
        let from_int = ConstantData::Integer(65).constant_index(&mut pool).unwrap();
        let from_bool = ConstantData::Boolean(true).constant_index(&mut pool).unwrap();
        assert_eq!(from_char, from_int);
        assert_eq!(from_bool, pool.get_integer(1).unwrap());
    }

    #[test]
    fn handles_and_dynamic_call_sites() {
        let mut pool = ConstantsPool::new();
        let method = MethodRef::object_hash_code().constant_index(&mut pool).unwrap();
        let handle = pool
            .get_method_handle(HandleKind::InvokeVirtual, method.into())
            .unwrap();
        assert_eq!(
            handle,
            pool.get_method_handle(HandleKind::InvokeVirtual, method.into())
                .unwrap()
        );

        let descriptor = pool.get_utf8("()I").unwrap();
        let method_type = pool.get_method_type(descriptor).unwrap();
        assert_eq!(method_type, pool.get_method_type(descriptor).unwrap());

        let name = pool.get_utf8("call").unwrap();
        let name_and_type = pool.get_name_and_type(name, descriptor).unwrap();
        let indy = pool.get_invoke_dynamic(0, name_and_type).unwrap();
        assert_eq!(indy, pool.get_invoke_dynamic(0, name_and_type).unwrap());
        assert_ne!(indy, pool.get_invoke_dynamic(1, name_and_type).unwrap());
    }

    #[test]
    fn serialized_pool() {
        let mut pool = ConstantsPool::new();
        pool.get_integer(42).unwrap();
        pool.get_utf8("ab").unwrap();
        assert_eq!(
            pool.to_bytes().unwrap(),
            vec![0, 3, 3, 0, 0, 0, 42, 1, 0, 2, b'a', b'b']
        );
    }
}
