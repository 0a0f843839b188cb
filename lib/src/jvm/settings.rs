use super::class_file::Version;
use std::path::PathBuf;

/// Knobs that apply to a whole type build
#[derive(Clone, Debug)]
pub struct Settings {
    /// Class file version written into the header
    pub version: Version,

    /// Check that every type variable mentioned in a signature is in scope before writing the
    /// class
    ///
    /// This is off by default since it walks every signature in the type.
    pub verify: bool,

    /// Also write every finalized class to `<dump_directory>/<binary name>.class`
    ///
    /// Useful for inspecting output with `javap`.
    pub dump_directory: Option<PathBuf>,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            version: Version::JAVA8,
            verify: false,
            dump_directory: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
