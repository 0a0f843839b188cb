use crate::jvm::Type;

/// How long an annotation is kept around
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Retention {
    /// Discarded by the compiler: never written to the class file
    Source,

    /// Written as an invisible annotation
    Class,

    /// Written as a visible annotation (and available through reflection)
    Runtime,
}

/// Value of an annotation element
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16.1
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(String),
    Enum { enum_type: Type, constant: String },
    Class(Type),
    Annotation(AnnotationBuilder),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    /// Tag identifying the kind of element value
    pub fn tag(&self) -> u8 {
        match self {
            AnnotationValue::Byte(_) => b'B',
            AnnotationValue::Char(_) => b'C',
            AnnotationValue::Double(_) => b'D',
            AnnotationValue::Float(_) => b'F',
            AnnotationValue::Int(_) => b'I',
            AnnotationValue::Long(_) => b'J',
            AnnotationValue::Short(_) => b'S',
            AnnotationValue::Boolean(_) => b'Z',
            AnnotationValue::String(_) => b's',
            AnnotationValue::Enum { .. } => b'e',
            AnnotationValue::Class(_) => b'c',
            AnnotationValue::Annotation(_) => b'@',
            AnnotationValue::Array(_) => b'[',
        }
    }
}

/// Annotation applied to a type, member, or parameter
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationBuilder {
    annotation_type: Type,
    retention: Retention,
    values: Vec<(String, AnnotationValue)>,
}

impl AnnotationBuilder {
    pub fn new(annotation_type: Type, retention: Retention) -> AnnotationBuilder {
        AnnotationBuilder {
            annotation_type,
            retention,
            values: vec![],
        }
    }

    /// Set an element, replacing any previous value for the same element
    pub fn with_value(mut self, name: impl Into<String>, value: AnnotationValue) -> AnnotationBuilder {
        self.set_value(name, value);
        self
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: AnnotationValue) {
        let name = name.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn annotation_type(&self) -> &Type {
        &self.annotation_type
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn values(&self) -> &[(String, AnnotationValue)] {
        &self.values
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::BinaryName;

    #[test]
    fn values_are_replaced() {
        let annotation = AnnotationBuilder::new(
            Type::named(BinaryName::from_dotted("com.example.Marker").unwrap()),
            Retention::Runtime,
        )
        .with_value("value", AnnotationValue::Int(1))
        .with_value("name", AnnotationValue::String(String::from("x")))
        .with_value("value", AnnotationValue::Int(2));

        assert_eq!(annotation.values().len(), 2);
        assert_eq!(annotation.values()[0].1, AnnotationValue::Int(2));
        assert_eq!(annotation.values()[1].1.tag(), b's');
    }
}
