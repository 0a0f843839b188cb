mod code_stream;
mod offset_vec;

pub use code_stream::*;
pub use offset_vec::*;
