//! Low-level class file format: serialization, the constant pool, and attributes
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html

mod attribute;
mod binary_format;
mod class_writer;
mod constants;
mod version;

pub use attribute::*;
pub use binary_format::*;
pub use class_writer::*;
pub use constants::*;
pub use version::*;
