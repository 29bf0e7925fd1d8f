// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sources of original signed content.

use {
    crate::CadesError,
    std::{
        fs::File,
        io::{Cursor, Read},
        path::{Path, PathBuf},
    },
};

/// An opaque provider of document bytes.
///
/// Only needed when signing, and when a detached signature's content has to
/// be fed into archive time-stamp data.
pub trait Document {
    /// Open a reader over the document content.
    fn open_stream(&self) -> Result<Box<dyn Read + '_>, CadesError>;

    fn name(&self) -> Option<&str>;

    fn mime_type(&self) -> Option<&str>;

    /// Read the entire document into memory.
    fn to_bytes(&self) -> Result<Vec<u8>, CadesError> {
        let mut data = Vec::new();
        self.open_stream()?.read_to_end(&mut data)?;

        Ok(data)
    }
}

/// A document held in memory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InMemoryDocument {
    data: Vec<u8>,
    name: Option<String>,
    mime_type: Option<String>,
}

impl InMemoryDocument {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl ToString) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl ToString) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Document for InMemoryDocument {
    fn open_stream(&self) -> Result<Box<dyn Read + '_>, CadesError> {
        Ok(Box::new(Cursor::new(self.data.as_slice())))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn to_bytes(&self) -> Result<Vec<u8>, CadesError> {
        Ok(self.data.clone())
    }
}

/// A document backed by a filesystem path.
///
/// The file is opened anew on each read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileDocument {
    path: PathBuf,
    name: Option<String>,
    mime_type: Option<String>,
}

impl FileDocument {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());

        Self {
            path,
            name,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl ToString) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Document for FileDocument {
    fn open_stream(&self) -> Result<Box<dyn Read + '_>, CadesError> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn in_memory() {
        let doc = InMemoryDocument::new(b"hello".to_vec())
            .with_name("hello.txt")
            .with_mime_type("text/plain");

        assert_eq!(doc.to_bytes().unwrap(), b"hello");
        assert_eq!(doc.name(), Some("hello.txt"));
        assert_eq!(doc.mime_type(), Some("text/plain"));

        let mut s = String::new();
        doc.open_stream().unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "hello");
    }

    #[test]
    fn file_backed() -> Result<(), CadesError> {
        let td = tempfile::Builder::new()
            .prefix("cades-document-")
            .tempdir()?;
        let path = td.path().join("contract.pdf");
        std::fs::write(&path, b"%PDF-1.7")?;

        let doc = FileDocument::new(&path).with_mime_type("application/pdf");
        assert_eq!(doc.name(), Some("contract.pdf"));
        assert_eq!(doc.to_bytes()?, b"%PDF-1.7");

        std::fs::remove_file(&path)?;
        assert!(matches!(doc.to_bytes(), Err(CadesError::Io(_))));

        Ok(())
    }
}
