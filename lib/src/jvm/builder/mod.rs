//! Building whole types: declaring members, generating their code, and finalizing class files
//!
//! A [`TypeBuilder`] owns the constant pool of the class being built, along with builders for
//! every field and method. Method bodies are generated through the [`crate::jvm::code`] module,
//! and [`TypeBuilder::create_type`] bakes and serializes everything into a [`ClassSink`].

mod annotation;
mod field_builder;
mod method_builder;
mod sink;
mod type_builder;
mod verify;

pub use annotation::*;
pub use field_builder::*;
pub use method_builder::*;
pub use sink::*;
pub use type_builder::*;
pub use verify::verify_type;
