use super::AnnotationBuilder;
use crate::jvm::class_file::ConstantData;
use crate::jvm::{FieldAccessFlags, FieldRef, Type, UnqualifiedName};

/// Field of a type being built
#[derive(Debug)]
pub struct FieldBuilder {
    name: UnqualifiedName,
    field_type: Type,
    access_flags: FieldAccessFlags,

    /// Initial value for `static final` constants
    constant_value: Option<ConstantData>,

    annotations: Vec<AnnotationBuilder>,
    deprecated: bool,
    frozen: bool,
}

impl FieldBuilder {
    pub(super) fn new(
        name: UnqualifiedName,
        field_type: Type,
        access_flags: FieldAccessFlags,
        constant_value: Option<ConstantData>,
    ) -> FieldBuilder {
        FieldBuilder {
            name,
            field_type,
            access_flags,
            constant_value,
            annotations: vec![],
            deprecated: false,
            frozen: false,
        }
    }

    fn assert_not_frozen(&self) {
        assert!(
            !self.frozen,
            "field {} cannot be modified after its type was created",
            self.name
        );
    }

    pub(super) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn name(&self) -> &UnqualifiedName {
        &self.name
    }

    pub fn field_type(&self) -> &Type {
        &self.field_type
    }

    pub fn access_flags(&self) -> FieldAccessFlags {
        self.access_flags
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }

    pub fn constant_value(&self) -> Option<&ConstantData> {
        self.constant_value.as_ref()
    }

    pub fn annotations(&self) -> &[AnnotationBuilder] {
        &self.annotations
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// Generic signature, if the field type is generic
    pub fn signature(&self) -> Option<String> {
        if self.field_type.is_generic() {
            Some(self.field_type.signature())
        } else {
            None
        }
    }

    /// Reference to this field, as it would be accessed from code
    pub fn field_ref(&self, owner: Type) -> FieldRef {
        FieldRef::new(owner, self.name.clone(), self.field_type.clone(), self.is_static())
    }

    pub fn add_annotation(&mut self, annotation: AnnotationBuilder) {
        self.assert_not_frozen();
        self.annotations.push(annotation);
    }

    pub fn set_deprecated(&mut self, deprecated: bool) {
        self.assert_not_frozen();
        self.deprecated = deprecated;
    }
}
