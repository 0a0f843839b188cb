use super::{AnnotationBuilder, AnnotationValue};
use crate::jvm::code::MethodCode;
use crate::jvm::{
    render_type_parameters, Error, GenericParameter, MethodAccessFlags, MethodRef, Type,
    UnqualifiedName,
};
use std::sync::Arc;

/// Declared parameter of a method
#[derive(Clone, Debug)]
pub struct ParameterBuilder {
    pub parameter_type: Type,
    pub name: Option<String>,
    pub annotations: Vec<AnnotationBuilder>,
}

/// Method, constructor, or type initializer of a type being built
#[derive(Debug)]
pub struct MethodBuilder {
    name: UnqualifiedName,
    access_flags: MethodAccessFlags,
    return_type: Type,
    parameters: Vec<ParameterBuilder>,
    thrown: Vec<Type>,
    generic_parameters: Vec<Arc<GenericParameter>>,
    generic_parameters_defined: bool,
    annotations: Vec<AnnotationBuilder>,

    /// Default value, for elements of annotation interfaces
    annotation_default: Option<AnnotationValue>,

    deprecated: bool,
    pub(super) code: MethodCode,
    frozen: bool,
}

impl MethodBuilder {
    pub(super) fn new(
        name: UnqualifiedName,
        access_flags: MethodAccessFlags,
        owner: Type,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> MethodBuilder {
        let this_type = if access_flags.contains(MethodAccessFlags::STATIC) {
            None
        } else {
            Some(owner)
        };
        let code = MethodCode::new(this_type, parameters.clone());
        MethodBuilder {
            name,
            access_flags,
            return_type,
            parameters: parameters
                .into_iter()
                .map(|parameter_type| ParameterBuilder {
                    parameter_type,
                    name: None,
                    annotations: vec![],
                })
                .collect(),
            thrown: vec![],
            generic_parameters: vec![],
            generic_parameters_defined: false,
            annotations: vec![],
            annotation_default: None,
            deprecated: false,
            code,
            frozen: false,
        }
    }

    fn assert_not_frozen(&self) {
        assert!(
            !self.frozen,
            "method {} cannot be modified after its type was created",
            self.name
        );
    }

    pub(super) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn name(&self) -> &UnqualifiedName {
        &self.name
    }

    pub fn access_flags(&self) -> MethodAccessFlags {
        self.access_flags
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn parameters(&self) -> &[ParameterBuilder] {
        &self.parameters
    }

    pub fn parameter_types(&self) -> Vec<Type> {
        self.parameters
            .iter()
            .map(|parameter| parameter.parameter_type.clone())
            .collect()
    }

    pub fn thrown_types(&self) -> &[Type] {
        &self.thrown
    }

    pub fn generic_parameters(&self) -> &[Arc<GenericParameter>] {
        &self.generic_parameters
    }

    pub fn annotations(&self) -> &[AnnotationBuilder] {
        &self.annotations
    }

    pub fn annotation_default(&self) -> Option<&AnnotationValue> {
        self.annotation_default.as_ref()
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::NATIVE)
    }

    pub fn is_constructor(&self) -> bool {
        self.name.is_init()
    }

    pub fn code(&self) -> &MethodCode {
        &self.code
    }

    /// Checked exceptions thrown by the body that nothing catches
    pub fn unhandled_exceptions(&self) -> &[Type] {
        self.code.unhandled_exceptions()
    }

    /// Unhandled checked exceptions that aren't covered by a declared thrown type
    pub fn undeclared_exceptions(&self) -> Vec<&Type> {
        self.unhandled_exceptions()
            .iter()
            .filter(|unhandled| {
                !self
                    .thrown
                    .iter()
                    .any(|declared| declared.is_assignable_from(unhandled))
            })
            .collect()
    }

    /// Erased method descriptor
    pub fn descriptor(&self) -> String {
        self.method_ref(Type::object()).descriptor()
    }

    /// Generic signature, if any type in the method's declaration is generic
    pub fn signature(&self) -> Option<String> {
        let is_generic = !self.generic_parameters.is_empty()
            || self.return_type.is_generic()
            || self
                .parameters
                .iter()
                .any(|parameter| parameter.parameter_type.is_generic())
            || self.thrown.iter().any(Type::is_generic);
        if !is_generic {
            return None;
        }

        let mut signature = String::new();
        render_type_parameters(&self.generic_parameters, &mut signature);
        signature.push('(');
        for parameter in &self.parameters {
            parameter.parameter_type.signature_to(&mut signature);
        }
        signature.push(')');
        self.return_type.signature_to(&mut signature);
        if self.thrown.iter().any(Type::is_generic) {
            for thrown in &self.thrown {
                signature.push('^');
                thrown.signature_to(&mut signature);
            }
        }
        Some(signature)
    }

    /// Reference to this method, as it would be called from code
    pub fn method_ref(&self, owner: Type) -> MethodRef {
        MethodRef::new(
            owner,
            self.name.clone(),
            self.parameter_types(),
            self.return_type.clone(),
            self.access_flags,
        )
        .with_thrown(self.thrown.clone())
    }

    pub fn set_parameter_name(&mut self, index: usize, name: impl Into<String>) -> Result<(), Error> {
        self.assert_not_frozen();
        let count = self.parameters.len();
        match self.parameters.get_mut(index) {
            Some(parameter) => {
                parameter.name = Some(name.into());
                Ok(())
            }
            None => Err(Error::ArgumentIndexOutOfRange { index, count }),
        }
    }

    pub fn add_parameter_annotation(
        &mut self,
        index: usize,
        annotation: AnnotationBuilder,
    ) -> Result<(), Error> {
        self.assert_not_frozen();
        let count = self.parameters.len();
        match self.parameters.get_mut(index) {
            Some(parameter) => {
                parameter.annotations.push(annotation);
                Ok(())
            }
            None => Err(Error::ArgumentIndexOutOfRange { index, count }),
        }
    }

    pub fn add_thrown_type(&mut self, thrown: Type) -> Result<(), Error> {
        self.assert_not_frozen();
        if !Type::throwable().is_assignable_from(&thrown) {
            return Err(Error::InvalidType(thrown.to_string()));
        }
        if !self.thrown.contains(&thrown) {
            self.thrown.push(thrown);
        }
        Ok(())
    }

    /// Declare the method's type variables (at most once)
    pub fn define_generic_parameters(
        &mut self,
        parameters: Vec<GenericParameter>,
    ) -> Result<Vec<Type>, Error> {
        self.assert_not_frozen();
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

    pub fn add_annotation(&mut self, annotation: AnnotationBuilder) {
        self.assert_not_frozen();
        self.annotations.push(annotation);
    }

    pub fn set_annotation_default(&mut self, value: AnnotationValue) {
        self.assert_not_frozen();
        self.annotation_default = Some(value);
    }

    pub fn set_deprecated(&mut self, deprecated: bool) {
        self.assert_not_frozen();
        self.deprecated = deprecated;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantsPool;
    use crate::jvm::code::CodeGenerator;
    use crate::jvm::BinaryName;

    fn method(parameters: Vec<Type>, return_type: Type) -> MethodBuilder {
        MethodBuilder::new(
            UnqualifiedName::VALUEOF,
            MethodAccessFlags::PUBLIC,
            Type::object(),
            parameters,
            return_type,
        )
    }

    #[test]
    fn descriptors_and_signatures() {
        let mut builder = method(vec![Type::INT, Type::string()], Type::VOID);
        assert_eq!(builder.descriptor(), "(ILjava/lang/String;)V");
        assert_eq!(builder.signature(), None);

        let type_vars = builder
            .define_generic_parameters(vec![GenericParameter::new("T")])
            .unwrap();
        assert_eq!(builder.signature().as_deref(), Some("<T:Ljava/lang/Object;>(ILjava/lang/String;)V"));
        assert!(matches!(
            builder.define_generic_parameters(vec![]),
            Err(Error::GenericParametersAlreadyDefined)
        ));
        assert_eq!(type_vars.len(), 1);
    }

    #[test]
    fn generic_parameters_are_defined_once() {
        let mut builder = method(vec![], Type::VOID);
        assert!(builder.define_generic_parameters(vec![]).unwrap().is_empty());
        assert!(matches!(
            builder.define_generic_parameters(vec![GenericParameter::new("T")]),
            Err(Error::GenericParametersAlreadyDefined)
        ));
        assert_eq!(builder.signature(), None);
    }

    #[test]
    fn undeclared_exceptions() {
        let io_exception = Type::class(
            BinaryName::from_dotted("java.io.IOException").unwrap(),
            Some(Type::exception()),
            vec![],
        );
        let mut builder = method(vec![], Type::VOID);
        assert!(builder.add_thrown_type(Type::string()).is_err());
        builder.add_thrown_type(Type::exception()).unwrap();

        let read = MethodRef::static_method(Type::object(), UnqualifiedName::VALUEOF, vec![], Type::VOID)
            .with_thrown(vec![io_exception]);
        let mut pool = ConstantsPool::new();
        CodeGenerator::new(&mut pool, &mut builder.code)
            .call(&read)
            .unwrap();
        assert_eq!(builder.unhandled_exceptions().len(), 1);
        assert!(builder.undeclared_exceptions().is_empty());
    }

    #[test]
    #[should_panic]
    fn frozen_methods_panic() {
        let mut builder = method(vec![], Type::VOID);
        builder.freeze();
        builder.set_deprecated(true);
    }
}
