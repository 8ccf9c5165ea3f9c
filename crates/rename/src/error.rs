use brew_class_file::ClassFileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenameError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
    #[error("Class {name} has no {marker} marker")]
    MarkerNotFound { name: String, marker: String },
    #[error("New class name is {0} bytes long, at most 65535 allowed")]
    NameTooLong(usize),
}
