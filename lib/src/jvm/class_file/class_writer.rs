use super::{
    AttributeLike, ConstantValue, ConstantsPool, ConstantsWriter, Deprecated, EnclosingMethod,
    ExceptionHandler, Exceptions, InnerClass, InnerClasses, LocalVariable, LocalVariableTable,
    LocalVariableTypeTable, Serialize, Signature, Synthetic, Utf8ConstantIndex,
};
use crate::jvm::builder::{
    AnnotationBuilder, AnnotationValue, FieldBuilder, MethodBuilder, Retention, TypeBuilder,
};
use crate::jvm::code::BakedCode;
use crate::jvm::{Error, FieldAccessFlags, MethodAccessFlags, Name, RenderDescriptor, Type};
use crate::util::CodeStream;

/// Magic header bytes that go at the front of every class file
const MAGIC: u32 = 0xCAFE_BABE;

/// Serializes a finished [`TypeBuilder`] into class file bytes
///
/// Everything after the constant pool is written first, since writing it interns the names,
/// descriptors, and values it refers to. The header and the (now complete) pool get prepended
/// at the end.
///
/// Length and count prefixes are written as placeholders and patched once what they describe
/// is done.
pub struct ClassWriter<'a> {
    constants: &'a mut ConstantsPool,
    data: CodeStream,

    /// Open attribute lists: position of the count, and entries seen so far
    counts: Vec<(usize, u16)>,
}

impl<'a> ClassWriter<'a> {
    pub fn new(constants: &'a mut ConstantsPool) -> ClassWriter<'a> {
        ClassWriter {
            constants,
            data: CodeStream::with_capacity(1024),
            counts: vec![],
        }
    }

    fn utf8<S: AsRef<str>>(&mut self, string: S) -> Result<Utf8ConstantIndex, Error> {
        Ok(self.constants.get_utf8(string.as_ref())?)
    }

    fn begin_attributes(&mut self) {
        self.counts.push((self.data.len(), 0));
        self.data.put_u16(0);
    }

    fn end_attributes(&mut self) {
        if let Some((position, count)) = self.counts.pop() {
            self.data.patch_u16(position, count);
        }
    }

    /// Write the attribute header and return where its payload starts
    fn begin_attribute(&mut self, name: &str) -> Result<usize, Error> {
        let name = self.utf8(name)?;
        if let Some((_, count)) = self.counts.last_mut() {
            *count += 1;
        }
        name.serialize(&mut self.data)?;
        self.data.put_u32(0);
        Ok(self.data.len())
    }

    fn end_attribute(&mut self, payload_start: usize) {
        let length = self.data.len() - payload_start;
        self.data.patch_u32(payload_start - 4, length as u32);
    }

    /// Write a two byte count, failing if `count` doesn't fit
    fn put_count(&mut self, what: &'static str, count: usize) -> Result<(), Error> {
        if count > u16::MAX as usize {
            return Err(Error::CountOverflow {
                what,
                count,
                max: u16::MAX as usize,
            });
        }
        self.data.put_u16(count as u16);
        Ok(())
    }

    fn write_attribute<A: AttributeLike>(&mut self, attribute: &A) -> Result<(), Error> {
        let start = self.begin_attribute(A::NAME)?;
        attribute.serialize(&mut self.data)?;
        self.end_attribute(start);
        Ok(())
    }

    fn write_signature(&mut self, signature: Option<String>) -> Result<(), Error> {
        if let Some(signature) = signature {
            let signature = self.utf8(signature)?;
            self.write_attribute(&Signature { signature })?;
        }
        Ok(())
    }

    /// Write out the whole class file
    ///
    /// `baked` holds the finished code of every method, in declaration order.
    pub fn write_type(
        mut self,
        builder: &TypeBuilder,
        baked: &[Option<BakedCode>],
    ) -> Result<Vec<u8>, Error> {
        let this_class = builder.as_type().constant_index(self.constants)?;
        let super_class = builder
            .base_type()
            .cloned()
            .unwrap_or_else(Type::object)
            .constant_index(self.constants)?;

        builder
            .access_flags()
            .for_class_file()
            .serialize(&mut self.data)?;
        this_class.serialize(&mut self.data)?;
        super_class.serialize(&mut self.data)?;

        self.put_count("interfaces", builder.interfaces().len())?;
        for interface in builder.interfaces() {
            interface
                .constant_index(self.constants)?
                .serialize(&mut self.data)?;
        }

        self.put_count("fields", builder.fields().len())?;
        for field in builder.fields() {
            self.write_field(field)?;
        }

        self.put_count("methods", builder.methods().len())?;
        for (method, code) in builder.methods().iter().zip(baked) {
            self.write_method(method, code.as_ref())?;
        }

        self.begin_attributes();
        self.write_signature(builder.signature())?;
        self.write_annotations(builder.annotations())?;
        if let Some(enclosing) = builder.enclosing_method() {
            let class = enclosing.class.constant_index(self.constants)?;
            let method = match &enclosing.method {
                Some((name, descriptor)) => {
                    let name = self.utf8(name.as_str())?;
                    let descriptor = self.utf8(descriptor)?;
                    Some(self.constants.get_name_and_type(name, descriptor)?)
                }
                None => None,
            };
            self.write_attribute(&EnclosingMethod { class, method })?;
        }
        if !builder.inner_classes().is_empty() {
            let mut inner_classes = vec![];
            for entry in builder.inner_classes() {
                let inner_class = entry.inner_class.constant_index(self.constants)?;
                let outer_class = match &entry.outer_class {
                    Some(outer) => Some(outer.constant_index(self.constants)?),
                    None => None,
                };
                let inner_name = match &entry.simple_name {
                    Some(name) => Some(self.utf8(name)?),
                    None => None,
                };
                inner_classes.push(InnerClass {
                    inner_class,
                    outer_class,
                    inner_name,
                    access_flags: entry.access_flags,
                });
            }
            self.write_attribute(&InnerClasses(inner_classes))?;
        }
        self.end_attributes();

        let mut class_file = CodeStream::with_capacity(self.data.len() + 1024);
        class_file.put_u32(MAGIC);
        builder.settings().version.serialize(&mut class_file)?;
        self.constants.serialize(&mut class_file)?;
        class_file.put_bytes(self.data.as_slice());
        Ok(class_file.into_vec())
    }

    fn write_field(&mut self, field: &FieldBuilder) -> Result<(), Error> {
        field.access_flags().serialize(&mut self.data)?;
        self.utf8(field.name().as_str())?.serialize(&mut self.data)?;
        self.utf8(field.field_type().render())?
            .serialize(&mut self.data)?;

        self.begin_attributes();
        if let Some(value) = field.constant_value() {
            let index = value.constant_index(self.constants)?;
            self.write_attribute(&ConstantValue(index))?;
        }
        self.write_signature(field.signature())?;
        if field.is_deprecated() {
            self.write_attribute(&Deprecated)?;
        }
        if field.access_flags().contains(FieldAccessFlags::SYNTHETIC) {
            self.write_attribute(&Synthetic)?;
        }
        self.write_annotations(field.annotations())?;
        self.end_attributes();
        Ok(())
    }

    fn write_method(&mut self, method: &MethodBuilder, code: Option<&BakedCode>) -> Result<(), Error> {
        method.access_flags().serialize(&mut self.data)?;
        self.utf8(method.name().as_str())?
            .serialize(&mut self.data)?;
        self.utf8(method.descriptor())?.serialize(&mut self.data)?;

        self.begin_attributes();
        if let Some(code) = code {
            self.write_code(method, code)?;
        }
        if !method.thrown_types().is_empty() {
            let mut thrown = vec![];
            for typ in method.thrown_types() {
                thrown.push(typ.constant_index(self.constants)?);
            }
            self.write_attribute(&Exceptions(thrown))?;
        }
        self.write_signature(method.signature())?;
        if method.is_deprecated() {
            self.write_attribute(&Deprecated)?;
        }
        if method.access_flags().contains(MethodAccessFlags::SYNTHETIC) {
            self.write_attribute(&Synthetic)?;
        }
        if let Some(default) = method.annotation_default() {
            let start = self.begin_attribute("AnnotationDefault")?;
            self.write_element_value(default)?;
            self.end_attribute(start);
        }
        self.write_annotations(method.annotations())?;
        self.write_parameter_annotations(method)?;
        self.end_attributes();
        Ok(())
    }

    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
    fn write_code(&mut self, method: &MethodBuilder, code: &BakedCode) -> Result<(), Error> {
        let start = self.begin_attribute("Code")?;
        self.data.put_u16(code.max_stack);
        self.data.put_u16(code.max_locals);
        self.data.put_u32(code.bytes.len() as u32);
        self.data.put_bytes(&code.bytes);

        let mut handlers: Vec<ExceptionHandler> = vec![];
        for region in &code.exceptions {
            for row in region.table_rows(&code.bytes) {
                let catch_type = match &row.catch_type {
                    Some(typ) => Some(typ.constant_index(self.constants)?),
                    None => None,
                };
                let handler = ExceptionHandler {
                    start_pc: row.start as u16,
                    end_pc: row.end as u16,
                    handler_pc: row.handler as u16,
                    catch_type,
                };
                if !handlers.contains(&handler) {
                    handlers.push(handler);
                }
            }
        }
        self.put_count("exception handlers", handlers.len())?;
        for handler in &handlers {
            handler.serialize(&mut self.data)?;
        }

        self.begin_attributes();
        self.write_local_variables(method, code)?;
        self.end_attributes();

        self.end_attribute(start);
        Ok(())
    }

    /// `LocalVariableTable` and `LocalVariableTypeTable` for `this`, named parameters, and named
    /// locals that were actually used
    fn write_local_variables(&mut self, method: &MethodBuilder, code: &BakedCode) -> Result<(), Error> {
        let method_code = method.code();

        // name, type, slot, start, end
        let mut entries: Vec<(&str, &Type, usize, usize, usize)> = vec![];
        if let Some(this_type) = method_code.this_type() {
            entries.push(("this", this_type, 0, 0, code.bytes.len()));
        }
        for (index, parameter) in method.parameters().iter().enumerate() {
            if let Some(name) = &parameter.name {
                let slot = method_code.translate_parameter(index);
                entries.push((name.as_str(), &parameter.parameter_type, slot, 0, code.bytes.len()));
            }
        }
        for local in &code.locals {
            if let (Some(name), Some(start), Some(end)) = (&local.name, local.start, local.end) {
                let slot = method_code.translate_local(local.index);
                entries.push((name.as_str(), &local.local_type, slot, start, end));
            }
        }
        if entries.is_empty() {
            return Ok(());
        }

        let mut variables = vec![];
        let mut typed_variables = vec![];
        for (index, (name, typ, slot, start, end)) in entries.into_iter().enumerate() {
            let length = end.min(code.bytes.len()).saturating_sub(start);
            if length == 0 {
                continue;
            }
            let name = self.utf8(name)?;
            let start_pc = start as u16;
            let length = length as u16;
            variables.push(LocalVariable {
                start_pc,
                length,
                name,
                descriptor: self.utf8(typ.render())?,
                index: slot as u16,
            });

            let is_this = index == 0 && method_code.this_type().is_some();
            if typ.is_generic() && !is_this {
                typed_variables.push(LocalVariable {
                    start_pc,
                    length,
                    name,
                    descriptor: self.utf8(typ.signature())?,
                    index: slot as u16,
                });
            }
        }

        if variables.is_empty() {
            return Ok(());
        }
        self.write_attribute(&LocalVariableTable(variables))?;
        if !typed_variables.is_empty() {
            self.write_attribute(&LocalVariableTypeTable(typed_variables))?;
        }
        Ok(())
    }

    /// `RuntimeVisibleAnnotations` and `RuntimeInvisibleAnnotations`
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16
    fn write_annotations(&mut self, annotations: &[AnnotationBuilder]) -> Result<(), Error> {
        for (retention, name) in [
            (Retention::Runtime, "RuntimeVisibleAnnotations"),
            (Retention::Class, "RuntimeInvisibleAnnotations"),
        ] {
            let retained: Vec<&AnnotationBuilder> = annotations
                .iter()
                .filter(|annotation| annotation.retention() == retention)
                .collect();
            if retained.is_empty() {
                continue;
            }

            let start = self.begin_attribute(name)?;
            self.put_count("annotations", retained.len())?;
            for annotation in retained {
                self.write_annotation(annotation)?;
            }
            self.end_attribute(start);
        }
        Ok(())
    }

    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.18
    fn write_parameter_annotations(&mut self, method: &MethodBuilder) -> Result<(), Error> {
        for (retention, name) in [
            (Retention::Runtime, "RuntimeVisibleParameterAnnotations"),
            (Retention::Class, "RuntimeInvisibleParameterAnnotations"),
        ] {
            let any_retained = method.parameters().iter().any(|parameter| {
                parameter
                    .annotations
                    .iter()
                    .any(|annotation| annotation.retention() == retention)
            });
            if !any_retained {
                continue;
            }

            let parameter_count = method.parameters().len();
            if parameter_count > u8::MAX as usize {
                return Err(Error::CountOverflow {
                    what: "annotated parameters",
                    count: parameter_count,
                    max: u8::MAX as usize,
                });
            }
            let start = self.begin_attribute(name)?;
            self.data.put_u8(parameter_count as u8);
            for parameter in method.parameters() {
                let retained: Vec<&AnnotationBuilder> = parameter
                    .annotations
                    .iter()
                    .filter(|annotation| annotation.retention() == retention)
                    .collect();
                self.put_count("parameter annotations", retained.len())?;
                for annotation in retained {
                    self.write_annotation(annotation)?;
                }
            }
            self.end_attribute(start);
        }
        Ok(())
    }

    fn write_annotation(&mut self, annotation: &AnnotationBuilder) -> Result<(), Error> {
        self.utf8(annotation.annotation_type().render())?
            .serialize(&mut self.data)?;
        self.put_count("element values", annotation.values().len())?;
        for (name, value) in annotation.values() {
            self.utf8(name)?.serialize(&mut self.data)?;
            self.write_element_value(value)?;
        }
        Ok(())
    }

    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16.1
    fn write_element_value(&mut self, value: &AnnotationValue) -> Result<(), Error> {
        self.data.put_u8(value.tag());
        let constant = match value {
            AnnotationValue::Byte(byte) => Some(self.constants.get_integer(*byte as i32)?),
            AnnotationValue::Char(character) => {
                Some(self.constants.get_integer(*character as i32)?)
            }
            AnnotationValue::Short(short) => Some(self.constants.get_integer(*short as i32)?),
            AnnotationValue::Int(int) => Some(self.constants.get_integer(*int)?),
            AnnotationValue::Boolean(boolean) => {
                Some(self.constants.get_integer(*boolean as i32)?)
            }
            AnnotationValue::Long(long) => Some(self.constants.get_long(*long)?),
            AnnotationValue::Float(float) => Some(self.constants.get_float(*float)?),
            AnnotationValue::Double(double) => Some(self.constants.get_double(*double)?),
            _ => None,
        };
        if let Some(constant) = constant {
            constant.serialize(&mut self.data)?;
            return Ok(());
        }

        match value {
            AnnotationValue::String(string) => self.utf8(string)?.serialize(&mut self.data)?,
            AnnotationValue::Enum {
                enum_type,
                constant,
            } => {
                self.utf8(enum_type.render())?.serialize(&mut self.data)?;
                self.utf8(constant)?.serialize(&mut self.data)?;
            }
            AnnotationValue::Class(class) => self.utf8(class.render())?.serialize(&mut self.data)?,
            AnnotationValue::Annotation(annotation) => self.write_annotation(annotation)?,
            AnnotationValue::Array(values) => {
                self.put_count("array elements", values.len())?;
                for value in values {
                    self.write_element_value(value)?;
                }
            }
            _ => (),
        }
        Ok(())
    }
}
