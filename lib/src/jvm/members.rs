use super::{BaseType, BinaryName, MethodAccessFlags, RenderDescriptor, Type, UnqualifiedName};
use crate::util::Width;

/// Reference to a method (or constructor), enough to emit an invoke instruction for it
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: Type,
    pub name: UnqualifiedName,
    pub parameters: Vec<Type>,
    pub return_type: Type,
    pub access_flags: MethodAccessFlags,

    /// Declared thrown types (only used to track unhandled checked exceptions)
    pub thrown: Vec<Type>,
}

impl MethodRef {
    pub fn new(
        owner: Type,
        name: UnqualifiedName,
        parameters: Vec<Type>,
        return_type: Type,
        access_flags: MethodAccessFlags,
    ) -> MethodRef {
        MethodRef {
            owner,
            name,
            parameters,
            return_type,
            access_flags,
            thrown: vec![],
        }
    }

    /// Public instance method
    pub fn virtual_method(
        owner: Type,
        name: UnqualifiedName,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> MethodRef {
        MethodRef::new(owner, name, parameters, return_type, MethodAccessFlags::PUBLIC)
    }

    /// Public static method
    pub fn static_method(
        owner: Type,
        name: UnqualifiedName,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> MethodRef {
        let flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        MethodRef::new(owner, name, parameters, return_type, flags)
    }

    /// Public constructor
    pub fn constructor(owner: Type, parameters: Vec<Type>) -> MethodRef {
        MethodRef::new(
            owner,
            UnqualifiedName::INIT,
            parameters,
            Type::VOID,
            MethodAccessFlags::PUBLIC,
        )
    }

    pub fn with_thrown(mut self, thrown: Vec<Type>) -> MethodRef {
        self.thrown = thrown;
        self
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_private(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::PRIVATE)
    }

    pub fn is_constructor(&self) -> bool {
        self.name.is_init()
    }

    /// Total slots taken by the parameters (excluding any receiver)
    pub fn parameter_slots(&self) -> usize {
        self.parameters.iter().map(Width::width).sum()
    }

    /// Erased method descriptor, eg. `(ILjava/lang/String;)V`
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for parameter in &self.parameters {
            parameter.render_to(&mut out);
        }
        out.push(')');
        self.return_type.render_to(&mut out);
        out
    }

    /// `Object.<init>()`
    pub fn object_init() -> MethodRef {
        MethodRef::constructor(Type::object(), vec![])
    }

    /// `Object.hashCode()`
    pub fn object_hash_code() -> MethodRef {
        MethodRef::virtual_method(Type::object(), UnqualifiedName::HASHCODE, vec![], Type::INT)
    }

    /// `Object.equals(Object)`
    pub fn object_equals() -> MethodRef {
        MethodRef::virtual_method(
            Type::object(),
            UnqualifiedName::EQUALS,
            vec![Type::object()],
            Type::BOOLEAN,
        )
    }

    /// `String.length()`
    pub fn string_length() -> MethodRef {
        MethodRef::virtual_method(Type::string(), UnqualifiedName::LENGTH, vec![], Type::INT)
    }

    /// `String.charAt(int)`
    pub fn string_char_at() -> MethodRef {
        MethodRef::virtual_method(
            Type::string(),
            UnqualifiedName::CHARAT,
            vec![Type::INT],
            Type::CHAR,
        )
    }

    /// Static boxing method on the box class (eg. `Integer.valueOf(int)`)
    pub fn box_value_of(base_type: BaseType) -> MethodRef {
        let boxed = Type::boxed_class(base_type);
        MethodRef::static_method(
            boxed.clone(),
            UnqualifiedName::VALUEOF,
            vec![Type::Primitive(base_type)],
            boxed,
        )
    }

    /// Unboxing method on the box class (eg. `Integer.intValue()`)
    pub fn unbox_value(base_type: BaseType) -> MethodRef {
        MethodRef::virtual_method(
            Type::boxed_class(base_type),
            base_type.unbox_method_name(),
            vec![],
            Type::Primitive(base_type),
        )
    }

    /// `PrintStream.println(String)`
    pub fn print_stream_println() -> MethodRef {
        MethodRef::virtual_method(
            Type::named(BinaryName::PRINTSTREAM),
            UnqualifiedName::PRINTLN,
            vec![Type::string()],
            Type::VOID,
        )
    }
}

/// Reference to a field, enough to emit a field instruction for it
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: Type,
    pub name: UnqualifiedName,
    pub field_type: Type,
    pub is_static: bool,
}

impl FieldRef {
    pub fn new(owner: Type, name: UnqualifiedName, field_type: Type, is_static: bool) -> FieldRef {
        FieldRef {
            owner,
            name,
            field_type,
            is_static,
        }
    }

    pub fn descriptor(&self) -> String {
        self.field_type.render()
    }

    /// `System.out`
    pub fn system_out() -> FieldRef {
        FieldRef::new(
            Type::named(BinaryName::SYSTEM),
            UnqualifiedName::OUT,
            Type::named(BinaryName::PRINTSTREAM),
            true,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptors() {
        assert_eq!(MethodRef::object_init().descriptor(), "()V");
        assert_eq!(MethodRef::string_char_at().descriptor(), "(I)C");
        assert_eq!(
            MethodRef::box_value_of(BaseType::Long).descriptor(),
            "(J)Ljava/lang/Long;"
        );
        assert_eq!(MethodRef::unbox_value(BaseType::Boolean).name.as_ref(), "booleanValue");
        assert_eq!(FieldRef::system_out().descriptor(), "Ljava/io/PrintStream;");
    }

    #[test]
    fn parameter_slots() {
        let method = MethodRef::static_method(
            Type::object(),
            UnqualifiedName::VALUEOF,
            vec![Type::LONG, Type::INT, Type::DOUBLE],
            Type::VOID,
        );
        assert_eq!(method.parameter_slots(), 5);
        assert!(method.is_static());
        assert!(!MethodRef::object_init().is_static());
        assert!(MethodRef::object_init().is_constructor());
    }
}
