//! Minimal class file reader, independent of the library's own writer

#![allow(dead_code)]

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    InvokeDynamic(u16, u16),

    /// Unusable slot after a `long` or `double`
    Gap,
}

#[derive(Debug)]
pub struct Attribute {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct Member {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<Attribute>,
}

impl Member {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct HandlerRow {
    pub start: u16,
    pub end: u16,
    pub handler: u16,
    pub catch_type: u16,
}

#[derive(Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytes: Vec<u8>,
    pub handlers: Vec<HandlerRow>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,

    /// Index 0 is a placeholder, so that entries can be indexed directly
    pub pool: Vec<PoolEntry>,

    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
        let mut cursor = Cursor::new(bytes);
        let magic = cursor.read_u32::<BigEndian>()?;
        assert_eq!(magic, 0xCAFE_BABE, "bad magic");
        let minor_version = cursor.read_u16::<BigEndian>()?;
        let major_version = cursor.read_u16::<BigEndian>()?;

        let pool_count = cursor.read_u16::<BigEndian>()?;
        let mut pool = vec![PoolEntry::Gap];
        while pool.len() < pool_count as usize {
            let entry = read_pool_entry(&mut cursor)?;
            let wide = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
            pool.push(entry);
            if wide {
                pool.push(PoolEntry::Gap);
            }
        }

        let access_flags = cursor.read_u16::<BigEndian>()?;
        let this_class = cursor.read_u16::<BigEndian>()?;
        let super_class = cursor.read_u16::<BigEndian>()?;
        let interface_count = cursor.read_u16::<BigEndian>()?;
        let interfaces = (0..interface_count)
            .map(|_| cursor.read_u16::<BigEndian>())
            .collect::<Result<Vec<u16>>>()?;

        let fields = read_members(&mut cursor, &pool)?;
        let methods = read_members(&mut cursor, &pool)?;
        let attributes = read_attributes(&mut cursor, &pool)?;
        assert_eq!(cursor.position() as usize, bytes.len(), "trailing bytes");

        Ok(ClassFile {
            minor_version,
            major_version,
            pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn utf8(&self, index: u16) -> &str {
        match &self.pool[index as usize] {
            PoolEntry::Utf8(string) => string,
            other => panic!("#{} is not a utf8 constant: {:?}", index, other),
        }
    }

    pub fn class_name(&self, index: u16) -> &str {
        match &self.pool[index as usize] {
            PoolEntry::Class(name) => self.utf8(*name),
            other => panic!("#{} is not a class constant: {:?}", index, other),
        }
    }

    pub fn method(&self, name: &str) -> &Member {
        self.methods
            .iter()
            .find(|method| method.name == name)
            .unwrap_or_else(|| panic!("no method named {}", name))
    }

    pub fn field(&self, name: &str) -> &Member {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .unwrap_or_else(|| panic!("no field named {}", name))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Pool entries that are not gaps
    pub fn constants(&self) -> impl Iterator<Item = &PoolEntry> {
        self.pool
            .iter()
            .skip(1)
            .filter(|entry| **entry != PoolEntry::Gap)
    }

    pub fn code(&self, method: &str) -> Code {
        let attribute = self
            .method(method)
            .attribute("Code")
            .unwrap_or_else(|| panic!("{} has no code", method));
        Code::parse(&attribute.data, &self.pool).expect("malformed Code attribute")
    }
}

impl Code {
    fn parse(data: &[u8], pool: &[PoolEntry]) -> Result<Code> {
        let mut cursor = Cursor::new(data);
        let max_stack = cursor.read_u16::<BigEndian>()?;
        let max_locals = cursor.read_u16::<BigEndian>()?;
        let length = cursor.read_u32::<BigEndian>()?;
        let mut bytes = vec![0; length as usize];
        cursor.read_exact(&mut bytes)?;

        let handler_count = cursor.read_u16::<BigEndian>()?;
        let mut handlers = vec![];
        for _ in 0..handler_count {
            handlers.push(HandlerRow {
                start: cursor.read_u16::<BigEndian>()?,
                end: cursor.read_u16::<BigEndian>()?,
                handler: cursor.read_u16::<BigEndian>()?,
                catch_type: cursor.read_u16::<BigEndian>()?,
            });
        }
        let attributes = read_attributes(&mut cursor, pool)?;
        Ok(Code {
            max_stack,
            max_locals,
            bytes,
            handlers,
            attributes,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

fn read_pool_entry(cursor: &mut Cursor<&[u8]>) -> Result<PoolEntry> {
    let entry = match cursor.read_u8()? {
        1 => {
            let length = cursor.read_u16::<BigEndian>()?;
            let mut bytes = vec![0; length as usize];
            cursor.read_exact(&mut bytes)?;
            // Plain ASCII is all the tests use, where modified UTF-8 matches UTF-8
            PoolEntry::Utf8(String::from_utf8_lossy(&bytes).into_owned())
        }
        3 => PoolEntry::Integer(cursor.read_i32::<BigEndian>()?),
        4 => PoolEntry::Float(cursor.read_f32::<BigEndian>()?),
        5 => PoolEntry::Long(cursor.read_i64::<BigEndian>()?),
        6 => PoolEntry::Double(cursor.read_f64::<BigEndian>()?),
        7 => PoolEntry::Class(cursor.read_u16::<BigEndian>()?),
        8 => PoolEntry::String(cursor.read_u16::<BigEndian>()?),
        9 => PoolEntry::FieldRef(cursor.read_u16::<BigEndian>()?, cursor.read_u16::<BigEndian>()?),
        10 => PoolEntry::MethodRef(cursor.read_u16::<BigEndian>()?, cursor.read_u16::<BigEndian>()?),
        11 => PoolEntry::InterfaceMethodRef(
            cursor.read_u16::<BigEndian>()?,
            cursor.read_u16::<BigEndian>()?,
        ),
        12 => PoolEntry::NameAndType(cursor.read_u16::<BigEndian>()?, cursor.read_u16::<BigEndian>()?),
        15 => PoolEntry::MethodHandle(cursor.read_u8()?, cursor.read_u16::<BigEndian>()?),
        16 => PoolEntry::MethodType(cursor.read_u16::<BigEndian>()?),
        18 => PoolEntry::InvokeDynamic(cursor.read_u16::<BigEndian>()?, cursor.read_u16::<BigEndian>()?),
        tag => panic!("unknown constant tag {}", tag),
    };
    Ok(entry)
}

fn utf8_at(pool: &[PoolEntry], index: u16) -> String {
    match &pool[index as usize] {
        PoolEntry::Utf8(string) => string.clone(),
        other => panic!("#{} is not a utf8 constant: {:?}", index, other),
    }
}

fn read_attributes(cursor: &mut Cursor<&[u8]>, pool: &[PoolEntry]) -> Result<Vec<Attribute>> {
    let count = cursor.read_u16::<BigEndian>()?;
    let mut attributes = vec![];
    for _ in 0..count {
        let name = utf8_at(pool, cursor.read_u16::<BigEndian>()?);
        let length = cursor.read_u32::<BigEndian>()?;
        let mut data = vec![0; length as usize];
        cursor.read_exact(&mut data)?;
        attributes.push(Attribute { name, data });
    }
    Ok(attributes)
}

fn read_members(cursor: &mut Cursor<&[u8]>, pool: &[PoolEntry]) -> Result<Vec<Member>> {
    let count = cursor.read_u16::<BigEndian>()?;
    let mut members = vec![];
    for _ in 0..count {
        let access_flags = cursor.read_u16::<BigEndian>()?;
        let name = utf8_at(pool, cursor.read_u16::<BigEndian>()?);
        let descriptor = utf8_at(pool, cursor.read_u16::<BigEndian>()?);
        let attributes = read_attributes(cursor, pool)?;
        members.push(Member {
            access_flags,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}
