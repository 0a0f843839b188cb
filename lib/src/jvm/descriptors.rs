use super::{BinaryName, Name, UnqualifiedName};
use crate::util::Width;
use std::io::{Error, ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => {
                let msg = format!("Unexpected leftover input '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum BaseType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Byte
            | BaseType::Char
            | BaseType::Float
            | BaseType::Int
            | BaseType::Short
            | BaseType::Boolean => 1,
            BaseType::Double | BaseType::Long => 2,
        }
    }
}

impl BaseType {
    pub const ALL: [BaseType; 8] = [
        BaseType::Boolean,
        BaseType::Byte,
        BaseType::Char,
        BaseType::Short,
        BaseType::Int,
        BaseType::Long,
        BaseType::Float,
        BaseType::Double,
    ];

    /// Source-level keyword
    pub fn keyword(self) -> &'static str {
        match self {
            BaseType::Boolean => "boolean",
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Short => "short",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Float => "float",
            BaseType::Double => "double",
        }
    }

    /// Types that live as an `int` on the operand stack
    pub fn is_int_like(self) -> bool {
        matches!(
            self,
            BaseType::Boolean | BaseType::Byte | BaseType::Char | BaseType::Short | BaseType::Int
        )
    }

    pub fn is_numeric(self) -> bool {
        self != BaseType::Boolean
    }

    /// Class used to box a value of this type
    pub fn boxed_name(self) -> BinaryName {
        match self {
            BaseType::Boolean => BinaryName::BOOLEAN,
            BaseType::Byte => BinaryName::BYTE,
            BaseType::Char => BinaryName::CHARACTER,
            BaseType::Short => BinaryName::SHORT,
            BaseType::Int => BinaryName::INTEGER,
            BaseType::Long => BinaryName::LONG,
            BaseType::Float => BinaryName::FLOAT,
            BaseType::Double => BinaryName::DOUBLE,
        }
    }

    /// Inverse of [`BaseType::boxed_name`]
    pub fn from_boxed_name(name: &BinaryName) -> Option<BaseType> {
        BaseType::ALL
            .iter()
            .copied()
            .find(|base_type| &base_type.boxed_name() == name)
    }

    /// Instance method on the box class which returns the primitive value (eg. `intValue`)
    pub fn unbox_method_name(self) -> UnqualifiedName {
        match self {
            BaseType::Boolean => UnqualifiedName::BOOLEANVALUE,
            BaseType::Byte => UnqualifiedName::BYTEVALUE,
            BaseType::Char => UnqualifiedName::CHARVALUE,
            BaseType::Short => UnqualifiedName::SHORTVALUE,
            BaseType::Int => UnqualifiedName::INTVALUE,
            BaseType::Long => UnqualifiedName::LONGVALUE,
            BaseType::Float => UnqualifiedName::FLOATVALUE,
            BaseType::Double => UnqualifiedName::DOUBLEVALUE,
        }
    }

    /// `atype` operand of the `newarray` instruction
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html#jvms-6.5.newarray
    pub fn array_type_code(self) -> u8 {
        match self {
            BaseType::Boolean => 4,
            BaseType::Char => 5,
            BaseType::Float => 6,
            BaseType::Double => 7,
            BaseType::Byte => 8,
            BaseType::Short => 9,
            BaseType::Int => 10,
            BaseType::Long => 11,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => {
                let msg = format!("Invalid base type character '{}'", c);
                return Err(Error::new(ErrorKind::InvalidInput, msg));
            }
            None => {
                let msg = "Missing base type character";
                return Err(Error::new(ErrorKind::UnexpectedEof, msg));
            }
        };
        Ok(typ)
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        if let Some('L') = source.next() {
            let mut class_name = String::new();
            loop {
                let c: char = source.next().ok_or_else(|| {
                    let msg = format!("Missing terminator for 'L{}'", class_name);
                    Error::new(ErrorKind::UnexpectedEof, msg)
                })?;
                if c == ';' {
                    return BinaryName::from_string(class_name)
                        .map_err(|msg| Error::new(ErrorKind::InvalidInput, msg));
                } else {
                    class_name.push(c)
                }
            }
        } else {
            Err(Error::new(
                ErrorKind::InvalidInput,
                "Expected object type to start with `L`",
            ))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip<T: RenderDescriptor + ParseDescriptor + std::fmt::Debug + Eq>(
        rendered: &str,
        parsed: T,
    ) {
        assert_eq!(rendered, parsed.render());
        assert_eq!(T::parse(rendered).unwrap(), parsed);
    }

    #[test]
    fn base_types() {
        round_trip("B", BaseType::Byte);
        round_trip("C", BaseType::Char);
        round_trip("D", BaseType::Double);
        round_trip("F", BaseType::Float);
        round_trip("I", BaseType::Int);
        round_trip("J", BaseType::Long);
        round_trip("S", BaseType::Short);
        round_trip("Z", BaseType::Boolean);
    }

    #[test]
    fn class_names() {
        round_trip("Ljava/lang/Object;", BinaryName::OBJECT);
        assert!(BinaryName::parse("Ljava/lang/Object").is_err());
        assert!(BinaryName::parse("Ljava/lang/Object;I").is_err());
    }

    #[test]
    fn boxing_names() {
        for base_type in BaseType::ALL {
            assert_eq!(
                BaseType::from_boxed_name(&base_type.boxed_name()),
                Some(base_type)
            );
        }
        assert_eq!(BaseType::from_boxed_name(&BinaryName::STRING), None);
    }

    #[test]
    fn widths() {
        assert_eq!(BaseType::Long.width(), 2);
        assert_eq!(BaseType::Double.width(), 2);
        assert_eq!(BaseType::Boolean.width(), 1);
    }
}
