use crate::jvm::{BinaryName, Error, Name};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for finished classes
///
/// This is where a class goes once its type is created: into memory for a custom class loader,
/// onto disk for a JAR, etc.
pub trait ClassSink {
    fn define_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error>;
}

/// Keeps every class in memory, keyed by binary name
#[derive(Default, Debug)]
pub struct InMemoryClasses {
    classes: HashMap<BinaryName, Vec<u8>>,
}

impl InMemoryClasses {
    pub fn new() -> InMemoryClasses {
        InMemoryClasses::default()
    }

    pub fn get(&self, name: &BinaryName) -> Option<&[u8]> {
        self.classes.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BinaryName, &[u8])> {
        self.classes
            .iter()
            .map(|(name, bytes)| (name, bytes.as_slice()))
    }
}

impl ClassSink for InMemoryClasses {
    fn define_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        self.classes.insert(name.clone(), bytes.to_vec());
        Ok(())
    }
}

/// Writes every class to `<root>/<binary name>.class`, creating package directories as needed
#[derive(Debug)]
pub struct DirectoryDump {
    root: PathBuf,
}

impl DirectoryDump {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryDump {
        DirectoryDump { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the class with the given name ends up
    pub fn class_path(&self, name: &BinaryName) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(name.as_str().split('/'));
        path.set_extension("class");
        path
    }
}

impl ClassSink for DirectoryDump {
    fn define_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        let path = self.class_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        log::info!("Wrote {} ({} bytes) to {}", name, bytes.len(), path.display());
        Ok(())
    }
}
