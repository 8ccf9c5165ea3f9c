use std::fmt;

use crate::{
    pack::{BytePack, Pack},
    parser::Parser,
    AccessFlags, ConstantPool, Result, Tag,
};

/// One `attribute_info`, borrowed from the class file bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub name_index: u16,
    pub info: &'a [u8],
}

impl fmt::Debug for RawAttribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAttribute")
            .field("name_index", &self.name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

/// An attribute list whose bounds have already been checked. `bytes` starts
/// right after `attributes_count`.
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'a> {
    count: u16,
    bytes: &'a [u8],
}

impl<'a> Attributes<'a> {
    pub(crate) fn new(count: u16, bytes: &'a [u8]) -> Self {
        Self { count, bytes }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> AttributeIter<'a> {
        AttributeIter {
            remaining: self.count,
            bytes: self.bytes,
        }
    }

    pub fn find_by_name(&self, name: &str, pool: &impl ConstantPool) -> Option<RawAttribute<'a>> {
        self.iter().find(|a| {
            pool.tag(a.name_index) == Some(Tag::Utf8) && pool.utf8(a.name_index) == name
        })
    }

    /// Parses the `Code` attribute, if there is one.
    pub fn code_attribute(&self, pool: &impl ConstantPool) -> Result<Option<CodeAttribute<'a>>> {
        self.find_by_name("Code", pool)
            .map(|a| Parser::new(a.info).parse_code_attribute())
            .transpose()
    }
}

impl<'a> IntoIterator for Attributes<'a> {
    type Item = RawAttribute<'a>;
    type IntoIter = AttributeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct AttributeIter<'a> {
    remaining: u16,
    bytes: &'a [u8],
}

impl<'a> Iterator for AttributeIter<'a> {
    type Item = RawAttribute<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let name_index = Pack::get_u16(self.bytes, 0);
        let length = Pack::get_u32(self.bytes, 2) as usize;
        let info = &self.bytes[6..6 + length];
        self.bytes = &self.bytes[6 + length..];
        Some(RawAttribute { name_index, info })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for AttributeIter<'_> {}

/// A `field_info` or `method_info`.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes<'a>,
}

/// Iterates a checked run of `field_info` or `method_info` structures.
#[derive(Debug, Clone)]
pub struct MemberIter<'a> {
    remaining: u16,
    bytes: &'a [u8],
}

impl<'a> MemberIter<'a> {
    pub(crate) fn new(count: u16, bytes: &'a [u8]) -> Self {
        Self {
            remaining: count,
            bytes,
        }
    }
}

impl<'a> Iterator for MemberIter<'a> {
    type Item = Member<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let access_flags = AccessFlags::from_bits_truncate(Pack::get_u16(self.bytes, 0));
        let name_index = Pack::get_u16(self.bytes, 2);
        let descriptor_index = Pack::get_u16(self.bytes, 4);
        let count = Pack::get_u16(self.bytes, 6);

        let mut end = 8;
        for _ in 0..count {
            end += 6 + Pack::get_u32(self.bytes, end + 2) as usize;
        }
        let attributes = Attributes::new(count, &self.bytes[8..end]);
        self.bytes = &self.bytes[end..];

        Some(Member {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for MemberIter<'_> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug, Clone)]
pub struct CodeAttribute<'a> {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: &'a [u8],
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes<'a>,
}
