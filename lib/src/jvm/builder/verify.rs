use super::{MethodBuilder, TypeBuilder};
use crate::jvm::{Error, GenericParameter, Name, Type};
use std::sync::Arc;

/// Walks every signature of a type, checking that type variables are in scope and that generic
/// instances have the right number of arguments
struct SignatureVerifier<'a> {
    /// Type variables visible at this point
    scope: Vec<&'a Arc<GenericParameter>>,

    /// What is being checked, outermost first
    context: Vec<String>,
}

impl<'a> SignatureVerifier<'a> {
    fn fail(&self, message: String) -> Error {
        Error::Verification {
            message,
            context: self.context.clone(),
        }
    }

    fn in_context<T>(
        &mut self,
        context: String,
        check: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.context.push(context);
        let result = check(self);
        self.context.pop();
        result
    }

    fn check_type(&self, typ: &Type) -> Result<(), Error> {
        match typ {
            Type::Void | Type::Primitive(_) | Type::Class(_) | Type::Builder(_) => Ok(()),
            Type::Array(element) => self.check_type(element),
            Type::GenericParameter(parameter) => {
                if self.scope.iter().any(|in_scope| *in_scope == parameter) {
                    Ok(())
                } else {
                    Err(self.fail(format!("type variable {} is not in scope", parameter.name)))
                }
            }
            Type::GenericInstance {
                definition,
                arguments,
            } => {
                let expected = definition.type_parameters.len();
                if expected != arguments.len() {
                    return Err(self.fail(format!(
                        "{} expects {} type arguments, got {}",
                        definition.name,
                        expected,
                        arguments.len()
                    )));
                }
                arguments
                    .iter()
                    .try_for_each(|argument| self.check_type(argument))
            }
        }
    }

    fn declare(&mut self, parameters: &'a [Arc<GenericParameter>]) -> Result<(), Error> {
        self.scope.extend(parameters);
        for parameter in parameters {
            self.in_context(format!("bounds of {}", parameter.name), |verifier| {
                if let Some(bound) = &parameter.class_bound {
                    verifier.check_type(bound)?;
                }
                parameter
                    .interface_bounds
                    .iter()
                    .try_for_each(|bound| verifier.check_type(bound))
            })?;
        }
        Ok(())
    }

    fn check_method(&mut self, method: &'a MethodBuilder) -> Result<(), Error> {
        // Static methods can't see the type's type variables
        let outer_scope = if method.is_static() {
            std::mem::take(&mut self.scope)
        } else {
            self.scope.clone()
        };
        let result = self.declare(method.generic_parameters()).and_then(|()| {
            self.check_type(method.return_type())?;
            for parameter in method.parameters() {
                self.check_type(&parameter.parameter_type)?;
            }
            for local in method.code().locals() {
                self.check_type(&local.local_type)?;
            }
            method
                .thrown_types()
                .iter()
                .try_for_each(|thrown| self.check_type(thrown))
        });
        self.scope = outer_scope;
        result
    }
}

/// Check that every signature in the type only mentions type variables that are in scope
pub fn verify_type(builder: &TypeBuilder) -> Result<(), Error> {
    let mut verifier = SignatureVerifier {
        scope: vec![],
        context: vec![format!("type {}", builder.name().as_str())],
    };

    verifier.declare(builder.generic_parameters())?;
    if let Some(base_type) = builder.base_type() {
        verifier.check_type(base_type)?;
    }
    for interface in builder.interfaces() {
        verifier.check_type(interface)?;
    }

    for field in builder.fields() {
        verifier.in_context(format!("field {}", field.name()), |verifier| {
            if field.is_static() {
                let saved = std::mem::take(&mut verifier.scope);
                let result = verifier.check_type(field.field_type());
                verifier.scope = saved;
                result
            } else {
                verifier.check_type(field.field_type())
            }
        })?;
    }

    for method in builder.methods() {
        let context = format!("method {}{}", method.name(), method.descriptor());
        verifier.in_context(context, |verifier| verifier.check_method(method))?;
    }

    log::trace!("Verified signatures of {}", builder.name());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags, Settings};

    fn generic_class() -> (TypeBuilder, Type) {
        let mut builder = TypeBuilder::new(
            "com.example.Holder",
            ClassAccessFlags::PUBLIC,
            Settings::new(),
        )
        .unwrap();
        let type_vars = builder
            .define_generic_parameters(vec![GenericParameter::new("T")])
            .unwrap();
        (builder, type_vars[0].clone())
    }

    #[test]
    fn instance_members_see_type_variables() {
        let (mut builder, t) = generic_class();
        builder
            .define_field("value", t.clone(), FieldAccessFlags::PRIVATE)
            .unwrap();
        builder
            .define_method("get", MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT, vec![], t)
            .unwrap();
        assert!(verify_type(&builder).is_ok());
    }

    #[test]
    fn static_members_do_not() {
        let (mut builder, t) = generic_class();
        builder
            .define_field("shared", t, FieldAccessFlags::STATIC)
            .unwrap();
        match verify_type(&builder) {
            Err(Error::Verification { context, .. }) => {
                assert_eq!(context.last().map(String::as_str), Some("field shared"));
            }
            other => panic!("expected a verification error, got {:?}", other),
        }
    }

    #[test]
    fn foreign_type_variables() {
        let (mut builder, _) = generic_class();
        let stranger = Type::GenericParameter(Arc::new(GenericParameter::new("U")));
        builder
            .define_method("make", MethodAccessFlags::PUBLIC, vec![stranger], Type::VOID)
            .unwrap();
        assert!(matches!(
            verify_type(&builder),
            Err(Error::Verification { .. })
        ));
    }

    #[test]
    fn method_type_variables() {
        let (mut builder, _) = generic_class();
        let method = builder
            .define_method("identity", MethodAccessFlags::STATIC, vec![], Type::VOID)
            .unwrap();
        let u = builder
            .method_mut(method)
            .define_generic_parameters(vec![GenericParameter::new("U")])
            .unwrap();
        builder
            .code_generator(method)
            .declare_local(Some("u"), u[0].clone());
        assert!(verify_type(&builder).is_ok());
    }
}
