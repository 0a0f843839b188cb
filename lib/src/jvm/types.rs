use super::{BaseType, BinaryName, Name, ParseDescriptor, RenderDescriptor};
use crate::util::Width;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Error, ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

/// Types that can appear in signatures, on the operand stack, or in locals
///
/// This is a closed set of shapes: most code only cares about the erasure (which is what ends up
/// in descriptors and on the stack) and uses the generic shapes only to render `Signature`
/// attributes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Only valid as a return type
    Void,

    Primitive(BaseType),

    /// Array of the inner element type
    Array(Box<Type>),

    /// A class or interface that already exists (eg. in the JDK)
    Class(Arc<ClassInfo>),

    /// Type variable declared on a type or method being built
    GenericParameter(Arc<GenericParameter>),

    /// Generic class applied to type arguments (eg. `List<String>`)
    GenericInstance {
        definition: Arc<ClassInfo>,
        arguments: Vec<Type>,
    },

    /// Class or interface currently being built
    ///
    /// The hierarchy information is a snapshot taken from the builder when the type was requested.
    Builder(Arc<ClassInfo>),
}

/// What is known about a class or interface: just enough to render descriptors and answer
/// assignability questions along declared super types
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: BinaryName,
    pub is_interface: bool,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub type_parameters: Vec<Arc<GenericParameter>>,
}

/// Classes are identified by their name
impl PartialEq for ClassInfo {
    fn eq(&self, other: &ClassInfo) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassInfo {}

impl Hash for ClassInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

/// Declared type variable along with its bounds
#[derive(Clone, Debug)]
pub struct GenericParameter {
    pub name: String,

    /// Position in the declaring type or method's parameter list
    pub position: usize,

    pub class_bound: Option<Type>,
    pub interface_bounds: Vec<Type>,
}

impl PartialEq for GenericParameter {
    fn eq(&self, other: &GenericParameter) -> bool {
        self.name == other.name && self.position == other.position
    }
}

impl Eq for GenericParameter {}

impl Hash for GenericParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.position.hash(state);
    }
}

impl GenericParameter {
    pub fn new(name: impl Into<String>) -> GenericParameter {
        GenericParameter {
            name: name.into(),
            position: 0,
            class_bound: None,
            interface_bounds: vec![],
        }
    }

    pub fn with_class_bound(mut self, bound: Type) -> GenericParameter {
        self.class_bound = Some(bound);
        self
    }

    pub fn with_interface_bound(mut self, bound: Type) -> GenericParameter {
        self.interface_bounds.push(bound);
        self
    }

    /// Render the declaration form used in `<...>` prefixes of class and method signatures
    ///
    /// For instance, `T:Ljava/lang/Number;` or `U::Ljava/lang/CharSequence;`
    pub fn render_declaration_to(&self, write_to: &mut String) {
        write_to.push_str(&self.name);
        write_to.push(':');
        match &self.class_bound {
            Some(bound) => bound.signature_to(write_to),
            None if self.interface_bounds.is_empty() => {
                BinaryName::OBJECT.render_to(write_to);
            }
            None => (),
        }
        for bound in &self.interface_bounds {
            write_to.push(':');
            bound.signature_to(write_to);
        }
    }

    /// Erasure of the type variable: its leftmost bound
    pub fn erasure(&self) -> Type {
        match (&self.class_bound, self.interface_bounds.first()) {
            (Some(bound), _) | (None, Some(bound)) => bound.erasure(),
            (None, None) => Type::object(),
        }
    }
}

/// Render a list of type parameter declarations (or nothing if the list is empty)
pub fn render_type_parameters(parameters: &[Arc<GenericParameter>], write_to: &mut String) {
    if parameters.is_empty() {
        return;
    }
    write_to.push('<');
    for parameter in parameters {
        parameter.render_declaration_to(write_to);
    }
    write_to.push('>');
}

impl Type {
    pub const VOID: Type = Type::Void;
    pub const BOOLEAN: Type = Type::Primitive(BaseType::Boolean);
    pub const BYTE: Type = Type::Primitive(BaseType::Byte);
    pub const CHAR: Type = Type::Primitive(BaseType::Char);
    pub const SHORT: Type = Type::Primitive(BaseType::Short);
    pub const INT: Type = Type::Primitive(BaseType::Int);
    pub const LONG: Type = Type::Primitive(BaseType::Long);
    pub const FLOAT: Type = Type::Primitive(BaseType::Float);
    pub const DOUBLE: Type = Type::Primitive(BaseType::Double);

    /// Existing class with the given super class and interfaces
    pub fn class(name: BinaryName, super_class: Option<Type>, interfaces: Vec<Type>) -> Type {
        Type::Class(Arc::new(ClassInfo {
            name,
            is_interface: false,
            super_class,
            interfaces,
            type_parameters: vec![],
        }))
    }

    /// Existing interface extending the given interfaces
    pub fn interface(name: BinaryName, interfaces: Vec<Type>) -> Type {
        Type::Class(Arc::new(ClassInfo {
            name,
            is_interface: true,
            super_class: None,
            interfaces,
            type_parameters: vec![],
        }))
    }

    pub fn array_of(element_type: Type) -> Type {
        Type::Array(Box::new(element_type))
    }

    pub fn object() -> Type {
        Type::class(BinaryName::OBJECT, None, vec![])
    }

    pub fn char_sequence() -> Type {
        Type::interface(BinaryName::CHARSEQUENCE, vec![])
    }

    pub fn string() -> Type {
        Type::class(
            BinaryName::STRING,
            Some(Type::object()),
            vec![Type::char_sequence()],
        )
    }

    pub fn throwable() -> Type {
        Type::class(BinaryName::THROWABLE, Some(Type::object()), vec![])
    }

    pub fn exception() -> Type {
        Type::class(BinaryName::EXCEPTION, Some(Type::throwable()), vec![])
    }

    pub fn runtime_exception() -> Type {
        Type::class(BinaryName::RUNTIMEEXCEPTION, Some(Type::exception()), vec![])
    }

    pub fn error() -> Type {
        Type::class(BinaryName::ERROR, Some(Type::throwable()), vec![])
    }

    pub fn number() -> Type {
        Type::class(BinaryName::NUMBER, Some(Type::object()), vec![])
    }

    /// Box class for a primitive type (eg. `java.lang.Integer` for `int`)
    pub fn boxed_class(base_type: BaseType) -> Type {
        let super_class = match base_type {
            BaseType::Boolean | BaseType::Char => Type::object(),
            _ => Type::number(),
        };
        Type::class(base_type.boxed_name(), Some(super_class), vec![])
    }

    /// Look up one of the JDK classes whose hierarchy is known, otherwise assume a plain class
    /// extending `java.lang.Object`
    pub fn named(name: BinaryName) -> Type {
        if let Some(base_type) = BaseType::from_boxed_name(&name) {
            return Type::boxed_class(base_type);
        }
        match name.as_str() {
            "java/lang/Object" => Type::object(),
            "java/lang/String" => Type::string(),
            "java/lang/CharSequence" => Type::char_sequence(),
            "java/lang/Throwable" => Type::throwable(),
            "java/lang/Exception" => Type::exception(),
            "java/lang/RuntimeException" => Type::runtime_exception(),
            "java/lang/Error" => Type::error(),
            "java/lang/Number" => Type::number(),
            _ => Type::class(name, Some(Type::object()), vec![]),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn as_primitive(&self) -> Option<BaseType> {
        match self {
            Type::Primitive(base_type) => Some(*base_type),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        !self.is_void() && !self.is_primitive()
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// Takes up two slots (locals) or two stack entries
    pub fn is_wide(&self) -> bool {
        self.width() == 2
    }

    /// Class or interface information, if this is a class-like type
    pub fn class_info(&self) -> Option<&ClassInfo> {
        match self {
            Type::Class(info) | Type::Builder(info) => Some(info),
            Type::GenericInstance { definition, .. } => Some(definition),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.class_info().map_or(false, |info| info.is_interface)
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Number of array dimensions (`0` for non-arrays)
    pub fn array_rank(&self) -> usize {
        let mut rank = 0;
        let mut typ = self;
        while let Type::Array(element) = typ {
            rank += 1;
            typ = element;
        }
        rank
    }

    /// Super class, after erasure (no super class for `Object`, interfaces, and non-classes)
    pub fn super_class(&self) -> Option<Type> {
        match self {
            Type::Array(_) => Some(Type::object()),
            Type::GenericParameter(param) => Some(param.erasure()),
            _ => self
                .class_info()
                .and_then(|info| info.super_class.as_ref().map(Type::erasure)),
        }
    }

    pub fn interfaces(&self) -> &[Type] {
        match self.class_info() {
            Some(info) => &info.interfaces,
            None => &[],
        }
    }

    /// Type with all generic information removed
    pub fn erasure(&self) -> Type {
        match self {
            Type::GenericParameter(param) => param.erasure(),
            Type::GenericInstance { definition, .. } => Type::Class(definition.clone()),
            Type::Array(element) => Type::array_of(element.erasure()),
            other => other.clone(),
        }
    }

    /// Whether the type mentions an unbound type variable or is an uninstantiated generic
    /// definition
    pub fn contains_generic_parameters(&self) -> bool {
        match self {
            Type::GenericParameter(_) => true,
            Type::Array(element) => element.contains_generic_parameters(),
            Type::GenericInstance { arguments, .. } => {
                arguments.iter().any(Type::contains_generic_parameters)
            }
            Type::Class(info) | Type::Builder(info) => !info.type_parameters.is_empty(),
            Type::Void | Type::Primitive(_) => false,
        }
    }

    /// Whether the signature differs from the erased descriptor
    pub fn is_generic(&self) -> bool {
        match self {
            Type::GenericParameter(_) | Type::GenericInstance { .. } => true,
            Type::Array(element) => element.is_generic(),
            _ => false,
        }
    }

    /// Name used in `CONSTANT_Class_info` entries
    ///
    /// This is the binary name for classes, but the full descriptor for array types.
    pub fn internal_name(&self) -> String {
        match self.erasure() {
            Type::Array(element) => Type::Array(element).render(),
            erased => match erased.class_info() {
                Some(info) => info.name.as_str().to_owned(),
                None => erased.render(),
            },
        }
    }

    /// Render the generic signature of the type
    pub fn signature(&self) -> String {
        let mut out = String::new();
        self.signature_to(&mut out);
        out
    }

    pub fn signature_to(&self, write_to: &mut String) {
        match self {
            Type::Void | Type::Primitive(_) | Type::Class(_) | Type::Builder(_) => {
                self.render_to(write_to)
            }
            Type::Array(element) => {
                write_to.push('[');
                element.signature_to(write_to);
            }
            Type::GenericParameter(param) => {
                write_to.push('T');
                write_to.push_str(&param.name);
                write_to.push(';');
            }
            Type::GenericInstance {
                definition,
                arguments,
            } => {
                write_to.push('L');
                write_to.push_str(definition.name.as_str());
                if !arguments.is_empty() {
                    write_to.push('<');
                    for argument in arguments {
                        argument.signature_to(write_to);
                    }
                    write_to.push('>');
                }
                write_to.push(';');
            }
        }
    }

    /// Primitive type this class boxes, if any
    pub fn unboxed_primitive(&self) -> Option<BaseType> {
        match self {
            Type::Class(info) => BaseType::from_boxed_name(&info.name),
            _ => None,
        }
    }

    pub fn is_boxed(&self) -> bool {
        self.unboxed_primitive().is_some()
    }

    /// Box class for primitives
    pub fn boxed(&self) -> Option<Type> {
        self.as_primitive().map(Type::boxed_class)
    }

    /// Whether both types erase to the same thing
    pub fn is_equivalent_to(&self, other: &Type) -> bool {
        let (this, that) = (self.erasure(), other.erasure());
        match (this.class_info(), that.class_info()) {
            (Some(a), Some(b)) => a.name == b.name,
            _ => this == that,
        }
    }

    /// Whether `this` is `other` or transitively extends/implements it (only considers erasures)
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self.is_equivalent_to(other) {
            return true;
        }
        if let Some(super_class) = self.super_class() {
            if super_class.is_subtype_of(other) {
                return true;
            }
        }
        self.interfaces()
            .iter()
            .any(|interface| interface.is_subtype_of(other))
    }

    /// Whether a value of type `source` can be stored where `self` is expected without a cast
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        let target = self.erasure();
        let source = source.erasure();
        match (&target, &source) {
            (Type::Void, Type::Void) => true,
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Void | Type::Primitive(_), _) | (_, Type::Void | Type::Primitive(_)) => false,
            (Type::Array(target_elem), Type::Array(source_elem)) => {
                match (target_elem.as_primitive(), source_elem.as_primitive()) {
                    (Some(a), Some(b)) => a == b,
                    (None, None) => target_elem.is_assignable_from(source_elem),
                    _ => false,
                }
            }
            (_, Type::Array(_)) => {
                let name = target.internal_name();
                name == "java/lang/Object" || name == "java/lang/Cloneable" || name == "java/io/Serializable"
            }
            _ if target.internal_name() == "java/lang/Object" => true,
            _ => source.is_subtype_of(&target),
        }
    }

    /// Throwable that isn't an unchecked exception (`RuntimeException` or `Error`)
    pub fn is_checked_exception(&self) -> bool {
        Type::throwable().is_assignable_from(self)
            && !Type::runtime_exception().is_assignable_from(self)
            && !Type::error().is_assignable_from(self)
    }
}

impl Width for Type {
    fn width(&self) -> usize {
        match self {
            Type::Void => 0,
            Type::Primitive(base_type) => base_type.width(),
            _ => 1,
        }
    }
}

/// Descriptors are always rendered from the erasure
impl RenderDescriptor for Type {
    fn render_to(&self, write_to: &mut String) {
        match self {
            Type::Void => write_to.push('V'),
            Type::Primitive(base_type) => base_type.render_to(write_to),
            Type::Array(element) => {
                write_to.push('[');
                element.render_to(write_to);
            }
            Type::Class(info) | Type::Builder(info) => info.name.render_to(write_to),
            Type::GenericInstance { definition, .. } => definition.name.render_to(write_to),
            Type::GenericParameter(param) => param.erasure().render_to(write_to),
        }
    }
}

/// Parsed class types are resolved through [`Type::named`]
impl ParseDescriptor for Type {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek().copied() {
            Some('V') => {
                source.next();
                Ok(Type::Void)
            }
            Some('[') => {
                source.next();
                let element = Type::parse_from(source)?;
                if element.is_void() {
                    return Err(Error::new(ErrorKind::InvalidInput, "Array of void"));
                }
                Ok(Type::array_of(element))
            }
            Some('L') => BinaryName::parse_from(source).map(Type::named),
            Some(_) => BaseType::parse_from(source).map(Type::Primitive),
            None => Err(Error::new(ErrorKind::UnexpectedEof, "Missing type")),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Primitive(base_type) => f.write_str(base_type.keyword()),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::Class(info) | Type::Builder(info) => write!(f, "{}", info.name),
            Type::GenericParameter(param) => f.write_str(&param.name),
            Type::GenericInstance {
                definition,
                arguments,
            } => {
                write!(f, "{}<", definition.name)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                f.write_str(">")
            }
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn list_of(argument: Type) -> Type {
        let element = Arc::new(GenericParameter::new("E"));
        let definition = Arc::new(ClassInfo {
            name: BinaryName::from_dotted("java.util.List").unwrap(),
            is_interface: true,
            super_class: None,
            interfaces: vec![],
            type_parameters: vec![element],
        });
        Type::GenericInstance {
            definition,
            arguments: vec![argument],
        }
    }

    #[test]
    fn descriptors() {
        assert_eq!(Type::INT.render(), "I");
        assert_eq!(Type::VOID.render(), "V");
        assert_eq!(Type::string().render(), "Ljava/lang/String;");
        assert_eq!(
            Type::array_of(Type::array_of(Type::DOUBLE)).render(),
            "[[D"
        );
        assert_eq!(list_of(Type::string()).render(), "Ljava/util/List;");
    }

    #[test]
    fn signatures() {
        let param = Type::GenericParameter(Arc::new(GenericParameter::new("T")));
        assert_eq!(param.signature(), "TT;");
        assert_eq!(param.render(), "Ljava/lang/Object;");
        assert_eq!(
            list_of(Type::string()).signature(),
            "Ljava/util/List<Ljava/lang/String;>;"
        );
        assert_eq!(Type::array_of(param.clone()).signature(), "[TT;");
        assert!(Type::array_of(param).is_generic());
        assert!(!Type::string().is_generic());
    }

    #[test]
    fn type_parameter_declarations() {
        let mut out = String::new();
        render_type_parameters(
            &[
                Arc::new(GenericParameter::new("T")),
                Arc::new(GenericParameter::new("N").with_class_bound(Type::number())),
                Arc::new(GenericParameter::new("S").with_interface_bound(Type::char_sequence())),
            ],
            &mut out,
        );
        assert_eq!(
            out,
            "<T:Ljava/lang/Object;N:Ljava/lang/Number;S::Ljava/lang/CharSequence;>"
        );
    }

    #[test]
    fn erasure_uses_leftmost_bound() {
        let bounded = Type::GenericParameter(Arc::new(
            GenericParameter::new("N").with_class_bound(Type::number()),
        ));
        assert!(bounded.erasure().is_equivalent_to(&Type::number()));
        assert_eq!(bounded.internal_name(), "java/lang/Number");
    }

    #[test]
    fn internal_names() {
        assert_eq!(Type::string().internal_name(), "java/lang/String");
        assert_eq!(
            Type::array_of(Type::string()).internal_name(),
            "[Ljava/lang/String;"
        );
        assert_eq!(Type::array_of(Type::INT).internal_name(), "[I");
    }

    #[test]
    fn assignability() {
        assert!(Type::object().is_assignable_from(&Type::string()));
        assert!(Type::char_sequence().is_assignable_from(&Type::string()));
        assert!(!Type::string().is_assignable_from(&Type::object()));
        assert!(Type::throwable().is_assignable_from(&Type::runtime_exception()));
        assert!(!Type::runtime_exception().is_assignable_from(&Type::exception()));
        assert!(Type::object().is_assignable_from(&Type::array_of(Type::INT)));
        assert!(Type::array_of(Type::object()).is_assignable_from(&Type::array_of(Type::string())));
        assert!(!Type::array_of(Type::LONG).is_assignable_from(&Type::array_of(Type::INT)));
        assert!(!Type::INT.is_assignable_from(&Type::LONG));
        assert!(!Type::object().is_assignable_from(&Type::INT));
        assert!(Type::number().is_assignable_from(&Type::boxed_class(BaseType::Int)));
    }

    #[test]
    fn checked_exceptions() {
        assert!(Type::exception().is_checked_exception());
        assert!(Type::throwable().is_checked_exception());
        assert!(!Type::runtime_exception().is_checked_exception());
        assert!(!Type::error().is_checked_exception());
        assert!(!Type::string().is_checked_exception());
    }

    #[test]
    fn boxing() {
        assert_eq!(Type::boxed_class(BaseType::Char).unboxed_primitive(), Some(BaseType::Char));
        assert_eq!(Type::string().unboxed_primitive(), None);
        assert!(Type::LONG.boxed().unwrap().is_equivalent_to(&Type::named(BinaryName::LONG)));
    }

    #[test]
    fn parsing() {
        let parsed = Type::parse("[Ljava/lang/Integer;").unwrap();
        assert_eq!(parsed.array_rank(), 1);
        assert_eq!(
            parsed.element_type().and_then(Type::unboxed_primitive),
            Some(BaseType::Int)
        );
        assert!(Type::parse("[V").is_err());
        assert_eq!(Type::parse("J").unwrap(), Type::LONG);
    }
}
