use super::{
    verify, AnnotationBuilder, ClassSink, DirectoryDump, FieldBuilder, MethodBuilder,
};
use crate::jvm::class_file::{ClassWriter, ConstantData, ConstantsPool};
use crate::jvm::code::CodeGenerator;
use crate::jvm::{
    BinaryName, ClassAccessFlags, ClassInfo, Error, FieldAccessFlags, GenericParameter,
    InnerClassAccessFlags, MethodAccessFlags, MethodRef, Name, Settings, Type, UnqualifiedName,
};
use crate::util::Width;
use std::sync::Arc;

/// Longest type name accepted
const MAX_NAME_LENGTH: usize = 1023;

/// Handle to a field defined on a [`TypeBuilder`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldId(usize);

/// Handle to a method defined on a [`TypeBuilder`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodId(usize);

/// Entry of the `InnerClasses` attribute
#[derive(Clone, Debug)]
pub struct InnerClassEntry {
    pub inner_class: Type,

    /// `None` for local and anonymous classes
    pub outer_class: Option<Type>,

    /// `None` for anonymous classes
    pub simple_name: Option<String>,

    pub access_flags: InnerClassAccessFlags,
}

/// Method (or initializer) enclosing a local or anonymous class
#[derive(Clone, Debug)]
pub struct EnclosingMethod {
    pub class: Type,

    /// Name and descriptor of the method, unless the class is enclosed by an initializer
    pub method: Option<(UnqualifiedName, String)>,
}

/// Result of [`TypeBuilder::create_type`]
#[derive(Clone, Debug)]
pub struct CreatedType {
    pub name: BinaryName,
    pub created_type: Type,
    pub bytes: Arc<[u8]>,
}

/// Class or interface being built
///
/// Members are defined on the builder and method bodies are generated through
/// [`TypeBuilder::code_generator`]. Once [`TypeBuilder::create_type`] succeeds the type and all of
/// its members are frozen: any further mutation panics.
#[derive(Debug)]
pub struct TypeBuilder {
    name: BinaryName,
    access_flags: ClassAccessFlags,

    /// `None` only for interfaces
    base_type: Option<Type>,

    interfaces: Vec<Type>,
    generic_parameters: Vec<Arc<GenericParameter>>,
    generic_parameters_defined: bool,
    fields: Vec<FieldBuilder>,
    methods: Vec<MethodBuilder>,
    annotations: Vec<AnnotationBuilder>,
    enclosing_method: Option<EnclosingMethod>,
    inner_classes: Vec<InnerClassEntry>,
    constants: ConstantsPool,
    settings: Settings,
    created: Option<CreatedType>,
}

impl TypeBuilder {
    /// Start building a type from its dotted name (eg. `com.example.Foo`)
    pub fn new(
        name: &str,
        access_flags: ClassAccessFlags,
        settings: Settings,
    ) -> Result<TypeBuilder, Error> {
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::TypeNameTooLong(name.chars().count()));
        }
        let name = BinaryName::from_dotted(name).map_err(Error::MalformedName)?;

        let is_interface = access_flags.contains(ClassAccessFlags::INTERFACE);
        let access_flags = if is_interface {
            access_flags | ClassAccessFlags::ABSTRACT
        } else {
            access_flags
        };
        let base_type = if is_interface {
            None
        } else {
            Some(Type::object())
        };

        Ok(TypeBuilder {
            name,
            access_flags,
            base_type,
            interfaces: vec![],
            generic_parameters: vec![],
            generic_parameters_defined: false,
            fields: vec![],
            methods: vec![],
            annotations: vec![],
            enclosing_method: None,
            inner_classes: vec![],
            constants: ConstantsPool::new(),
            settings,
            created: None,
        })
    }

    fn assert_not_created(&self) {
        assert!(
            self.created.is_none(),
            "type {} cannot be modified after it was created",
            self.name
        );
    }

    pub fn name(&self) -> &BinaryName {
        &self.name
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ABSTRACT)
    }

    pub fn base_type(&self) -> Option<&Type> {
        self.base_type.as_ref()
    }

    pub fn interfaces(&self) -> &[Type] {
        &self.interfaces
    }

    pub fn generic_parameters(&self) -> &[Arc<GenericParameter>] {
        &self.generic_parameters
    }

    pub fn fields(&self) -> &[FieldBuilder] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodBuilder] {
        &self.methods
    }

    pub fn field(&self, field: FieldId) -> &FieldBuilder {
        &self.fields[field.0]
    }

    pub fn field_mut(&mut self, field: FieldId) -> &mut FieldBuilder {
        &mut self.fields[field.0]
    }

    pub fn method(&self, method: MethodId) -> &MethodBuilder {
        &self.methods[method.0]
    }

    pub fn method_mut(&mut self, method: MethodId) -> &mut MethodBuilder {
        &mut self.methods[method.0]
    }

    pub fn annotations(&self) -> &[AnnotationBuilder] {
        &self.annotations
    }

    pub fn enclosing_method(&self) -> Option<&EnclosingMethod> {
        self.enclosing_method.as_ref()
    }

    pub fn inner_classes(&self) -> &[InnerClassEntry] {
        &self.inner_classes
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn constants(&self) -> &ConstantsPool {
        &self.constants
    }

    pub fn is_created(&self) -> bool {
        self.created.is_some()
    }

    /// Snapshot of the type as it currently stands, usable in descriptors and in code
    pub fn as_type(&self) -> Type {
        Type::Builder(Arc::new(ClassInfo {
            name: self.name.clone(),
            is_interface: self.is_interface(),
            super_class: self.base_type.clone(),
            interfaces: self.interfaces.clone(),
            type_parameters: self.generic_parameters.clone(),
        }))
    }

    /// Generic signature of the class, if it has type parameters or generic super types
    pub fn signature(&self) -> Option<String> {
        let is_generic = !self.generic_parameters.is_empty()
            || self.base_type.as_ref().map_or(false, Type::is_generic)
            || self.interfaces.iter().any(Type::is_generic);
        if !is_generic {
            return None;
        }

        let mut signature = String::new();
        crate::jvm::render_type_parameters(&self.generic_parameters, &mut signature);
        self.base_type
            .clone()
            .unwrap_or_else(Type::object)
            .signature_to(&mut signature);
        for interface in &self.interfaces {
            interface.signature_to(&mut signature);
        }
        Some(signature)
    }

    fn is_self(&self, typ: &Type) -> bool {
        typ.class_info().map_or(false, |info| info.name == self.name)
    }

    pub fn set_base_type(&mut self, base_type: Type) -> Result<(), Error> {
        self.assert_not_created();
        if self.is_interface()
            || base_type.is_interface()
            || base_type.class_info().is_none()
            || self.is_self(&base_type)
        {
            return Err(Error::InvalidBaseType(base_type.to_string()));
        }
        self.base_type = Some(base_type);
        Ok(())
    }

    pub fn add_interface(&mut self, interface: Type) -> Result<(), Error> {
        self.assert_not_created();
        if !interface.is_interface() || self.is_self(&interface) {
            return Err(Error::InvalidInterface(interface.to_string()));
        }
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        Ok(())
    }

    /// Replace all implemented (or extended) interfaces
    pub fn set_interfaces(&mut self, interfaces: Vec<Type>) -> Result<(), Error> {
        self.assert_not_created();
        let previous = std::mem::take(&mut self.interfaces);
        for interface in interfaces {
            if let Err(err) = self.add_interface(interface) {
                self.interfaces = previous;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Declare the type's type variables (at most once)
    pub fn define_generic_parameters(
        &mut self,
        parameters: Vec<GenericParameter>,
    ) -> Result<Vec<Type>, Error> {
        self.assert_not_created();
        if self.generic_parameters_defined {
            return Err(Error::GenericParametersAlreadyDefined);
        }
        self.generic_parameters_defined = true;
        self.generic_parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(position, mut parameter)| {
                parameter.position = position;
                Arc::new(parameter)
            })
            .collect();
        Ok(self
            .generic_parameters
            .iter()
            .cloned()
            .map(Type::GenericParameter)
            .collect())
    }

    pub fn define_field(
        &mut self,
        name: &str,
        field_type: Type,
        access_flags: FieldAccessFlags,
    ) -> Result<FieldId, Error> {
        self.assert_not_created();
        if field_type.is_void() {
            return Err(Error::InvalidType(field_type.to_string()));
        }
        let name = UnqualifiedName::from_string(name.to_owned()).map_err(Error::MalformedName)?;
        self.fields
            .push(FieldBuilder::new(name, field_type, access_flags, None));
        Ok(FieldId(self.fields.len() - 1))
    }

    /// Define a `static final` field initialized with a compile-time constant
    pub fn define_constant(
        &mut self,
        name: &str,
        value: ConstantData,
        access_flags: FieldAccessFlags,
    ) -> Result<FieldId, Error> {
        self.assert_not_created();
        let field_type = value.value_type();
        if let ConstantData::Class(_) = value {
            return Err(Error::ConstantTypeMismatch {
                expected: String::from("primitive or java.lang.String"),
                found: field_type.to_string(),
            });
        }
        let name = UnqualifiedName::from_string(name.to_owned()).map_err(Error::MalformedName)?;
        let access_flags = access_flags | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL;
        self.fields
            .push(FieldBuilder::new(name, field_type, access_flags, Some(value)));
        Ok(FieldId(self.fields.len() - 1))
    }

    pub fn define_method(
        &mut self,
        name: &str,
        access_flags: MethodAccessFlags,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> Result<MethodId, Error> {
        self.assert_not_created();
        let name = UnqualifiedName::from_string(name.to_owned()).map_err(Error::MalformedName)?;
        if name.is_init() || name.is_clinit() {
            return Err(Error::MalformedName(format!(
                "{} must be defined as a constructor or type initializer",
                name
            )));
        }
        self.push_method(name, access_flags, parameters, return_type)
    }

    fn push_method(
        &mut self,
        name: UnqualifiedName,
        access_flags: MethodAccessFlags,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> Result<MethodId, Error> {
        let receiver = if access_flags.contains(MethodAccessFlags::STATIC) { 0 } else { 1 };
        let slots = receiver + parameters.iter().map(Width::width).sum::<usize>();
        if slots > u8::MAX as usize {
            return Err(Error::TooManyParameterSlots(slots));
        }

        let owner = self.as_type();
        self.methods.push(MethodBuilder::new(
            name,
            access_flags,
            owner,
            parameters,
            return_type,
        ));
        Ok(MethodId(self.methods.len() - 1))
    }

    pub fn define_constructor(
        &mut self,
        access_flags: MethodAccessFlags,
        parameters: Vec<Type>,
    ) -> Result<MethodId, Error> {
        self.assert_not_created();
        if self.is_interface() {
            return Err(Error::InterfaceCannotHaveConstructor);
        }
        let access_flags = access_flags - MethodAccessFlags::STATIC;
        self.push_method(UnqualifiedName::INIT, access_flags, parameters, Type::VOID)
    }

    /// Define a no-argument constructor which just calls the base type's constructor
    pub fn define_default_constructor(
        &mut self,
        access_flags: MethodAccessFlags,
    ) -> Result<MethodId, Error> {
        let constructor = self.define_constructor(access_flags, vec![])?;
        let super_init = MethodRef::constructor(
            self.base_type.clone().unwrap_or_else(Type::object),
            vec![],
        );
        let mut code = self.code_generator(constructor);
        code.emit_this()?;
        code.call_special(&super_init)?;
        code.emit_return(&Type::VOID);
        Ok(constructor)
    }

    /// Define the static initializer (`<clinit>`)
    pub fn define_type_initializer(&mut self) -> Result<MethodId, Error> {
        self.assert_not_created();
        self.push_method(
            UnqualifiedName::CLINIT,
            MethodAccessFlags::STATIC,
            vec![],
            Type::VOID,
        )
    }

    /// Code generator for the body of a method of this type
    pub fn code_generator(&mut self, method: MethodId) -> CodeGenerator<'_> {
        self.assert_not_created();
        let method = &mut self.methods[method.0];
        CodeGenerator::new(&mut self.constants, &mut method.code)
    }

    pub fn add_annotation(&mut self, annotation: AnnotationBuilder) {
        self.assert_not_created();
        self.annotations.push(annotation);
    }

    pub fn set_enclosing_method(&mut self, enclosing_method: EnclosingMethod) {
        self.assert_not_created();
        self.enclosing_method = Some(enclosing_method);
    }

    pub fn add_inner_class(&mut self, inner_class: InnerClassEntry) {
        self.assert_not_created();
        self.inner_classes.push(inner_class);
    }

    /// Structural checks on a method, before its body gets baked
    fn check_method(&self, method: &MethodBuilder) -> Result<(), Error> {
        let describe = || format!("{}.{}{}", self.name, method.name(), method.descriptor());
        let has_body = !method.code().is_empty();
        if method.is_abstract() && !self.is_abstract() {
            return Err(Error::AbstractMethodInConcreteType(describe()));
        }
        if (method.is_abstract() || method.is_native()) && has_body {
            return Err(Error::AbstractMethodWithBody(describe()));
        }
        if !method.is_abstract() && !method.is_native() && !has_body {
            return Err(Error::MethodHasEmptyBody(describe()));
        }
        Ok(())
    }

    /// Finish the type, write it out, and hand it to the sink
    ///
    /// Creating a type more than once returns the first result without writing it again.
    pub fn create_type(&mut self, sink: &mut dyn ClassSink) -> Result<CreatedType, Error> {
        if let Some(created) = &self.created {
            return Ok(created.clone());
        }

        if !self.is_interface() && !self.methods.iter().any(MethodBuilder::is_constructor) {
            log::trace!("Adding a default constructor to {}", self.name);
            self.define_default_constructor(MethodAccessFlags::PUBLIC)?;
        }

        let mut baked = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            self.check_method(method)?;
            baked.push(method.code().bake()?);

            for undeclared in method.undeclared_exceptions() {
                log::warn!(
                    "{}.{}{} throws {} without declaring it",
                    self.name,
                    method.name(),
                    method.descriptor(),
                    undeclared
                );
            }
        }

        if self.settings.verify {
            verify::verify_type(self)?;
        }

        let mut constants = std::mem::take(&mut self.constants);
        let written = ClassWriter::new(&mut constants).write_type(self, &baked);
        self.constants = constants;
        let bytes = written?;

        log::debug!(
            "Created {} with {} fields, {} methods, and {} constants ({} bytes)",
            self.name,
            self.fields.len(),
            self.methods.len(),
            self.constants.len(),
            bytes.len()
        );

        sink.define_class(&self.name, &bytes)?;
        if let Some(directory) = &self.settings.dump_directory {
            DirectoryDump::new(directory.clone()).define_class(&self.name, &bytes)?;
        }

        for field in &mut self.fields {
            field.freeze();
        }
        for method in &mut self.methods {
            method.freeze();
        }
        let created = CreatedType {
            name: self.name.clone(),
            created_type: self.as_type(),
            bytes: Arc::from(bytes),
        };
        self.created = Some(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::builder::InMemoryClasses;

    fn class(name: &str) -> TypeBuilder {
        TypeBuilder::new(name, ClassAccessFlags::PUBLIC, Settings::new()).unwrap()
    }

    fn runnable() -> Type {
        Type::interface(BinaryName::from_dotted("java.lang.Runnable").unwrap(), vec![])
    }

    #[test]
    fn names() {
        assert_eq!(class("com.example.Foo").name().as_str(), "com/example/Foo");
        assert!(matches!(
            TypeBuilder::new(&"a".repeat(1024), ClassAccessFlags::PUBLIC, Settings::new()),
            Err(Error::TypeNameTooLong(1024))
        ));
        assert!(matches!(
            TypeBuilder::new("a;b", ClassAccessFlags::PUBLIC, Settings::new()),
            Err(Error::MalformedName(_))
        ));
    }

    #[test]
    fn interfaces_are_abstract() {
        let mut builder = TypeBuilder::new(
            "com.example.Api",
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE,
            Settings::new(),
        )
        .unwrap();
        assert!(builder.is_abstract());
        assert!(builder.base_type().is_none());
        assert!(matches!(
            builder.define_constructor(MethodAccessFlags::PUBLIC, vec![]),
            Err(Error::InterfaceCannotHaveConstructor)
        ));
        assert!(matches!(
            builder.set_base_type(Type::object()),
            Err(Error::InvalidBaseType(_))
        ));
    }

    #[test]
    fn hierarchy_checks() {
        let mut builder = class("com.example.Task");
        assert!(builder.set_base_type(runnable()).is_err());
        assert!(builder.set_base_type(Type::INT).is_err());
        let own_type = builder.as_type();
        assert!(builder.set_base_type(own_type).is_err());
        assert!(builder.add_interface(Type::object()).is_err());
        builder.add_interface(runnable()).unwrap();
        builder.add_interface(runnable()).unwrap();
        assert_eq!(builder.interfaces().len(), 1);
        assert!(builder.set_interfaces(vec![Type::string()]).is_err());
        assert_eq!(builder.interfaces().len(), 1);
    }

    #[test]
    fn parameter_slots_include_the_receiver() {
        let mut builder = class("com.example.Wide");
        let static_flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        builder
            .define_method("longs", static_flags, vec![Type::LONG; 127], Type::VOID)
            .unwrap();
        builder
            .define_method("ints", static_flags, vec![Type::INT; 255], Type::VOID)
            .unwrap();
        assert!(matches!(
            builder.define_method("more", static_flags, vec![Type::LONG; 128], Type::VOID),
            Err(Error::TooManyParameterSlots(256))
        ));
        assert!(matches!(
            builder.define_method("ints", MethodAccessFlags::PUBLIC, vec![Type::INT; 255], Type::VOID),
            Err(Error::TooManyParameterSlots(256))
        ));
        assert!(matches!(
            builder.define_constructor(MethodAccessFlags::PUBLIC, vec![Type::DOUBLE; 128]),
            Err(Error::TooManyParameterSlots(257))
        ));
        assert_eq!(builder.methods().len(), 2);
    }

    #[test]
    fn default_constructor_is_added() {
        let mut builder = class("com.example.Empty");
        let mut classes = InMemoryClasses::new();
        let created = builder.create_type(&mut classes).unwrap();
        assert_eq!(builder.methods().len(), 1);
        assert!(builder.methods()[0].is_constructor());
        // aload_0, invokespecial, return
        assert_eq!(builder.methods()[0].code().offset(), 5);
        assert_eq!(&created.bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(classes.get(builder.name()), Some(&created.bytes[..]));
    }

    #[test]
    fn created_types_are_cached() {
        let mut builder = class("com.example.Once");
        let mut classes = InMemoryClasses::new();
        let first = builder.create_type(&mut classes).unwrap();
        let second = builder.create_type(&mut classes).unwrap();
        assert!(Arc::ptr_eq(&first.bytes, &second.bytes));
    }

    #[test]
    #[should_panic]
    fn created_types_are_frozen() {
        let mut builder = class("com.example.Frozen");
        builder.create_type(&mut InMemoryClasses::new()).unwrap();
        builder
            .define_field("late", Type::INT, FieldAccessFlags::PUBLIC)
            .unwrap();
    }

    #[test]
    fn structural_checks() {
        let mut builder = class("com.example.Concrete");
        builder
            .define_method(
                "run",
                MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
                vec![],
                Type::VOID,
            )
            .unwrap();
        assert!(matches!(
            builder.create_type(&mut InMemoryClasses::new()),
            Err(Error::AbstractMethodInConcreteType(_))
        ));

        let mut builder = class("com.example.Hollow");
        builder
            .define_method("run", MethodAccessFlags::PUBLIC, vec![], Type::VOID)
            .unwrap();
        assert!(matches!(
            builder.create_type(&mut InMemoryClasses::new()),
            Err(Error::MethodHasEmptyBody(_))
        ));

        let mut builder = class("com.example.Native");
        let method = builder
            .define_method(
                "run",
                MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE,
                vec![],
                Type::VOID,
            )
            .unwrap();
        builder.code_generator(method).emit_return(&Type::VOID);
        assert!(matches!(
            builder.create_type(&mut InMemoryClasses::new()),
            Err(Error::AbstractMethodWithBody(_))
        ));
    }

    #[test]
    fn constants() {
        let mut builder = class("com.example.Constants");
        let field = builder
            .define_constant("ANSWER", ConstantData::Integer(42), FieldAccessFlags::PUBLIC)
            .unwrap();
        assert!(builder.field(field).is_static());
        assert_eq!(builder.field(field).field_type(), &Type::INT);
        assert!(matches!(
            builder.define_constant(
                "CLASS",
                ConstantData::Class(Type::object()),
                FieldAccessFlags::PUBLIC
            ),
            Err(Error::ConstantTypeMismatch { .. })
        ));
    }

    #[test]
    fn generic_signature() {
        let mut builder = class("com.example.Box");
        assert_eq!(builder.signature(), None);
        let params = builder
            .define_generic_parameters(vec![GenericParameter::new("T")])
            .unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(builder.signature().as_deref(), Some("<T:Ljava/lang/Object;>Ljava/lang/Object;"));
        assert!(builder.define_generic_parameters(vec![]).is_err());
    }
}
