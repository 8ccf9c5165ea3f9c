// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html

mod access_flags;
pub mod attribute_writer;
pub mod attributes;
pub mod buffer;
mod constant_pool;
mod error;
pub mod mutf8;
mod names;
pub mod pack;
mod parser;
mod reader;
pub mod tag;
pub mod validate;
mod visitor;
mod writer;

pub use access_flags::AccessFlags;
pub use attribute_writer::{
    AttrContainer, Attributable, AttributeWriter, CompAttributeWriter, RawAttributes,
};
pub use attributes::{Attributes, CodeAttribute, Member, RawAttribute};
pub use constant_pool::{ConstantPool, ConstantPoolBuilder, ConstantSink};
pub use error::ClassFileError;
pub use names::AttributeName;
pub use parser::Parser;
pub use reader::ClassFileReader;
pub use tag::{ClassVersion, Tag};
pub use visitor::{ClassVisitor, MemberVisitor};
pub use writer::{ClassFileWriter, MemberWriter, WriterOptions};

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

pub const MAGIC: u32 = 0xCAFE_BABE;
