//! Rewrites the name of an already finalized class in a copy of its bytes.
//!
//! Only the UTF-8 constant holding the class name is replaced; every other
//! byte is copied through untouched, so pool indexes stay valid.

mod error;

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use brew_class_file::{buffer::ByteArray, ClassFileError, ClassFileReader, ConstantPool, Tag};
use byteorder::{BigEndian, WriteBytesExt};

pub use error::RenameError;

pub type Result<T, E = RenameError> = std::result::Result<T, E>;

/// Separates the real name of a class from a variant suffix, as in
/// `Strings$$$$9`.
pub const DEFAULT_MARKER: &str = "$$$$";

/// Name of the class in `bytes`.
pub fn class_name(bytes: &[u8]) -> Result<String> {
    let reader = ClassFileReader::parse(bytes)?;
    let name = reader.this_class_name()?.into_owned();
    Ok(name)
}

/// Copies `bytes` with the class renamed to `new_name`.
///
/// The UTF-8 constant is rewritten in place, so any other constant sharing
/// it, such as a string literal equal to the class name, changes too.
pub fn rename_class(bytes: &[u8], new_name: &str) -> Result<Vec<u8>> {
    let reader = ClassFileReader::parse(bytes)?;
    let this_class = reader.this_class();
    reader.expect_tag(this_class, Tag::Class)?;
    let name_index = reader.ref_index(this_class);
    reader.expect_tag(name_index, Tag::Utf8)?;
    let range = reader
        .entry_range(name_index)
        .ok_or(ClassFileError::UnexpectedConstantPoolEntry(Tag::Utf8, None))?;

    let mut name = ByteArray::with_capacity(new_name.len());
    let len = name.put_mutf8(new_name);
    let len = u16::try_from(len).map_err(|_| RenameError::NameTooLong(len))?;

    let mut out = Vec::with_capacity(bytes.len() - range.len() + 3 + name.len());
    out.write_all(&bytes[..range.start])?;
    out.write_u8(Tag::Utf8 as u8)?;
    out.write_u16::<BigEndian>(len)?;
    out.write_all(name.as_slice())?;
    out.write_all(&bytes[range.end..])?;

    log::debug!(
        "renamed {} to {} ({} -> {} bytes)",
        reader.utf8(name_index),
        new_name,
        bytes.len(),
        out.len()
    );
    Ok(out)
}

/// A class renamed by [`strip_marker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Renamed {
    /// `Name.class` for a class named `pkg/Name`.
    pub fn file_name(&self) -> String {
        let simple = self.name.rsplit('/').next().unwrap_or(&self.name);
        format!("{simple}.class")
    }
}

/// Renames `pkg/Name<marker>suffix` to `pkg/Name`.
pub fn strip_marker(bytes: &[u8], marker: &str) -> Result<Renamed> {
    let origin = class_name(bytes)?;
    let Some(end) = origin.find(marker) else {
        return Err(RenameError::MarkerNotFound {
            name: origin,
            marker: marker.to_owned(),
        });
    };
    let name = origin[..end].to_owned();
    let bytes = rename_class(bytes, &name)?;
    Ok(Renamed { name, bytes })
}

/// Strips the marker from the class in `input` and writes the result into
/// `out_dir`, named after the new simple name. Returns the written path.
pub fn strip_marker_file(input: &[u8], out_dir: &Path, marker: &str) -> Result<PathBuf> {
    let renamed = strip_marker(input, marker)?;
    let path = out_dir.join(renamed.file_name());
    fs::write(&path, &renamed.bytes)?;
    log::info!("{} written to {}", renamed.name, path.display());
    Ok(path)
}
