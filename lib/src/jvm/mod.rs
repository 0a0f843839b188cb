//! Build JVM classes
//!
//! ### Simple example
//!
//! Consider the following simple Java class:
//!
//! ```java,ignore,no_run
//! public class Point {
//!     public final int x;
//!     public final int y;
//!
//!     public Point(int x, int y) {
//!         this.x = x;
//!         this.y = y;
//!     }
//! }
//! ```
//!
//! Generating an analogous class file can be done as follows:
//!
//! ```
//! use classgen::jvm::builder::{InMemoryClasses, TypeBuilder};
//! use classgen::jvm::*;
//!
//! # fn generate_class() -> Result<(), Error> {
//! // Declare the class and its fields
//! let mut class = TypeBuilder::new("me.alec.Point", ClassAccessFlags::PUBLIC, Settings::new())?;
//! let field_x = class.define_field("x", Type::INT, FieldAccessFlags::PUBLIC | FieldAccessFlags::FINAL)?;
//! let field_y = class.define_field("y", Type::INT, FieldAccessFlags::PUBLIC | FieldAccessFlags::FINAL)?;
//! let field_x = class.field(field_x).field_ref(class.as_type());
//! let field_y = class.field(field_y).field_ref(class.as_type());
//!
//! // Generate the constructor method body
//! let constructor = class.define_constructor(MethodAccessFlags::PUBLIC, vec![Type::INT, Type::INT])?;
//! let mut code = class.code_generator(constructor);
//! code.emit_this()?;
//! code.call_special(&MethodRef::object_init())?;
//! code.emit_this()?;
//! code.emit_load_argument(0)?;
//! code.put_field(&field_x)?;
//! code.emit_this()?;
//! code.emit_load_argument(1)?;
//! code.put_field(&field_y)?;
//! code.emit_return(&Type::VOID);
//!
//! // Finally, encode the class into bytes
//! let mut classes = InMemoryClasses::new();
//! let created = class.create_type(&mut classes)?;
//! assert_eq!(&created.bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok(())
//! # }
//! # generate_class().unwrap();
//! ```

mod access_flags;
pub mod builder;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
mod members;
mod names;
mod settings;
mod types;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use members::*;
pub use names::*;
pub use settings::*;
pub use types::*;
