//! Emit JVM class files from scratch
//!
//! The entry point is [`jvm::builder::TypeBuilder`]: declare a type, define its members, generate
//! method bodies through a [`jvm::code::CodeGenerator`], and finalize the whole thing into class
//! file bytes with [`jvm::builder::TypeBuilder::create_type`].

pub mod jvm;
pub mod util;
