use std::{borrow::Cow, collections::HashMap};

use crate::{
    buffer::{ByteArray, GrowthPolicy, IntArray},
    error::preview,
    mutf8,
    names::{AttributeName, NameCache},
    ClassFileError, Result, Tag,
};

/// Read access shared by the pool builder and the class file reader.
///
/// Indexes are trusted: asking for the value of an index whose tag does not
/// match the accessor, or of an index out of range, yields garbage or panics.
/// Only [`ConstantPool::tag`] is total.
pub trait ConstantPool {
    /// `constant_pool_count`: one more than the number of usable slots,
    /// index 0 being reserved.
    fn count(&self) -> usize;

    /// Tag of the entry at `index`, `None` for index 0, the unusable slot
    /// after a long or double, and indexes out of range.
    fn tag(&self, index: u16) -> Option<Tag>;

    fn utf8(&self, index: u16) -> Cow<'_, str>;

    fn int_value(&self, index: u16) -> i32;

    fn long_value(&self, index: u16) -> i64;

    /// Index of a `Class`, `String`, `MethodType`, `Module` or `Package` entry.
    fn ref_index(&self, index: u16) -> u16;

    /// Both indexes of a member reference, `NameAndType` or (invoke) dynamic entry.
    fn ref_indexes(&self, index: u16) -> (u16, u16);

    /// `(reference_kind, reference_index)` of a method handle.
    fn method_handle(&self, index: u16) -> (u8, u16);

    fn float_value(&self, index: u16) -> f32 {
        f32::from_bits(self.int_value(index) as u32)
    }

    fn double_value(&self, index: u16) -> f64 {
        f64::from_bits(self.long_value(index) as u64)
    }

    /// First index at or after `from` holding `tag`.
    fn find_tag(&self, tag: Tag, from: u16) -> Option<u16> {
        (from as usize..self.count())
            .map(|index| index as u16)
            .find(|&index| self.tag(index) == Some(tag))
    }

    fn expect_tag(&self, index: u16, expected: Tag) -> Result<()> {
        match self.tag(index) {
            Some(tag) if tag == expected => Ok(()),
            found => Err(ClassFileError::UnexpectedConstantPoolEntry(expected, found)),
        }
    }

    /// Name of the class referenced by the `Class` entry at `index`.
    fn class_name(&self, index: u16) -> Result<Cow<'_, str>> {
        self.expect_tag(index, Tag::Class)?;
        let name_index = self.ref_index(index);
        self.expect_tag(name_index, Tag::Utf8)?;
        Ok(self.utf8(name_index))
    }
}

/// Find-or-create interning of constants.
///
/// Every `find_*` returns the index of an existing entry with the same tag
/// and payload, or appends a new one. Asking twice for the same constant
/// always yields the same index.
///
/// Only UTF-8 lookups are hashed. All other shapes are found by a linear scan
/// over the pool, so callers interning the same constant many times should
/// keep the index around.
pub trait ConstantSink {
    fn find_utf8(&mut self, value: &str) -> Result<u16>;

    /// Interns a string given as already encoded modified UTF-8.
    fn find_utf8_encoded(&mut self, bytes: &[u8]) -> Result<u16>;

    /// Interns an entry with a 4 byte payload.
    fn find_u32(&mut self, tag: Tag, data: u32) -> Result<u16>;

    /// Interns an entry with an 8 byte payload, which takes two slots.
    fn find_u64(&mut self, tag: Tag, data: u64) -> Result<u16>;

    /// Interns an entry whose payload is a single pool index.
    fn find_ref1(&mut self, tag: Tag, index: u16) -> Result<u16>;

    fn find_method_handle(&mut self, kind: u8, index: u16) -> Result<u16>;

    /// Interns an entry whose payload is two pool indexes.
    fn find_ref2(&mut self, tag: Tag, index1: u16, index2: u16) -> Result<u16> {
        self.find_u32(tag, (index1 as u32) << 16 | index2 as u32)
    }

    fn find_int(&mut self, value: i32) -> Result<u16> {
        self.find_u32(Tag::Integer, value as u32)
    }

    fn find_float(&mut self, value: f32) -> Result<u16> {
        self.find_u32(Tag::Float, value.to_bits())
    }

    fn find_long(&mut self, value: i64) -> Result<u16> {
        self.find_u64(Tag::Long, value as u64)
    }

    fn find_double(&mut self, value: f64) -> Result<u16> {
        self.find_u64(Tag::Double, value.to_bits())
    }

    fn find_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.find_utf8(name)?;
        self.find_ref1(Tag::Class, name_index)
    }

    fn find_string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.find_utf8(value)?;
        self.find_ref1(Tag::String, string_index)
    }

    fn find_method_type(&mut self, descriptor: &str) -> Result<u16> {
        let descriptor_index = self.find_utf8(descriptor)?;
        self.find_ref1(Tag::MethodType, descriptor_index)
    }

    fn find_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.find_utf8(name)?;
        let descriptor_index = self.find_utf8(descriptor)?;
        self.find_ref2(Tag::NameAndType, name_index, descriptor_index)
    }

    fn find_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        self.find_member_ref(Tag::FieldRef, owner, name, descriptor)
    }

    fn find_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        self.find_member_ref(Tag::MethodRef, owner, name, descriptor)
    }

    fn find_interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        self.find_member_ref(Tag::InterfaceMethodRef, owner, name, descriptor)
    }

    fn find_member_ref(
        &mut self,
        tag: Tag,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let class_index = self.find_class(owner)?;
        let name_and_type_index = self.find_name_and_type(name, descriptor)?;
        self.find_ref2(tag, class_index, name_and_type_index)
    }
}

/// Offset marker of slots that hold no entry.
const UNUSABLE: u32 = u32::MAX;

/// Build side of the constant pool: entries are encoded straight into one
/// byte buffer as they are interned.
#[derive(Debug, Clone)]
pub struct ConstantPoolBuilder {
    /// Encoded `cp_info` entries, without the leading count.
    entries: ByteArray,
    /// Offset of each slot's tag byte in `entries`.
    cp_info: IntArray,
    /// Encoded UTF-8 payload to index.
    utf8: HashMap<Box<[u8]>, u16>,
    names: NameCache,
}

impl ConstantPoolBuilder {
    pub fn new() -> Self {
        Self::with_policy(200, GrowthPolicy::POOL)
    }

    pub fn with_policy(capacity: usize, policy: GrowthPolicy) -> Self {
        let mut cp_info = IntArray::with_capacity(capacity / 4);
        cp_info.push(UNUSABLE);

        Self {
            entries: ByteArray::with_policy(capacity, policy),
            cp_info,
            utf8: HashMap::new(),
            names: NameCache::default(),
        }
    }

    /// Encoded entries, in index order.
    pub fn entries(&self) -> &[u8] {
        self.entries.as_slice()
    }

    /// `constant_pool_count` as written into the class file.
    pub fn encoded_count(&self) -> Result<u16> {
        let count = self.cp_info.len();
        u16::try_from(count).map_err(|_| ClassFileError::ConstantPoolOverflow(count))
    }

    /// Index of a well-known attribute name, interned on first request.
    pub fn attribute_name(&mut self, name: AttributeName) -> Result<u16> {
        if let Some(index) = self.names.get(name) {
            return Ok(index);
        }
        let index = self.find_utf8(name.as_str())?;
        self.names.insert(name, index);
        Ok(index)
    }

    fn next_index(&self) -> Result<u16> {
        let index = self.cp_info.len();
        u16::try_from(index).map_err(|_| ClassFileError::ConstantPoolOverflow(index + 1))
    }

    /// Scans the entries from the newest down for one with `tag` whose payload
    /// satisfies `matches`, given the offset of the payload.
    fn scan(&self, tag: Tag, matches: impl Fn(&ByteArray, usize) -> bool) -> Option<u16> {
        let cp_info = self.cp_info.as_slice();
        (1..cp_info.len()).rev().find_map(|index| {
            let pos = cp_info[index];
            if pos == UNUSABLE {
                return None;
            }
            let pos = pos as usize;
            if self.entries.get(pos) == tag as u8 && matches(&self.entries, pos + 1) {
                Some(index as u16)
            } else {
                None
            }
        })
    }

    /// Registers the entry starting at `pos` and returns its index.
    fn register(&mut self, pos: usize, slots: usize) -> u16 {
        let index = self.cp_info.len() as u16;
        self.cp_info.push(pos as u32);
        for _ in 1..slots {
            self.cp_info.push(UNUSABLE);
        }
        index
    }

    /// Interns the UTF-8 entry that was just written at `pos`, or drops it
    /// again if the same string is already in the pool.
    fn intern_utf8_at(&mut self, pos: usize) -> Result<u16> {
        let len = self.entries.len() - pos - 3;
        if len > u16::MAX as usize {
            let mut scratch = Vec::new();
            let value = mutf8::decode(&self.entries.as_slice()[pos + 3..], &mut scratch);
            self.entries.truncate(pos);
            return Err(ClassFileError::Utf8TooLong {
                preview: preview(&value),
                length: len,
            });
        }

        if let Some(&index) = self.utf8.get(&self.entries.as_slice()[pos + 3..]) {
            self.entries.truncate(pos);
            return Ok(index);
        }

        let index = match self.next_index() {
            Ok(index) => index,
            Err(e) => {
                self.entries.truncate(pos);
                return Err(e);
            }
        };
        self.entries.set_u16(pos + 1, len as u16);
        self.register(pos, 1);
        self.utf8
            .insert(Box::from(&self.entries.as_slice()[pos + 3..]), index);
        Ok(index)
    }

    fn payload(&self, index: u16) -> usize {
        self.cp_info.get(index as usize) as usize + 1
    }
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantSink for ConstantPoolBuilder {
    fn find_utf8(&mut self, value: &str) -> Result<u16> {
        let pos = self.entries.len();
        self.entries.put_12(Tag::Utf8 as u8, 0);
        self.entries.put_mutf8(value);
        self.intern_utf8_at(pos)
    }

    fn find_utf8_encoded(&mut self, bytes: &[u8]) -> Result<u16> {
        let pos = self.entries.len();
        self.entries.put_12(Tag::Utf8 as u8, 0);
        self.entries.extend_from_slice(bytes);
        self.intern_utf8_at(pos)
    }

    fn find_u32(&mut self, tag: Tag, data: u32) -> Result<u16> {
        if let Some(index) = self.scan(tag, |entries, off| entries.match_u32(off, data)) {
            return Ok(index);
        }
        self.next_index()?;
        let pos = self.entries.len();
        self.entries.ensure_free(5);
        self.entries.put_u8(tag as u8);
        self.entries.put_u32(data);
        Ok(self.register(pos, 1))
    }

    fn find_u64(&mut self, tag: Tag, data: u64) -> Result<u16> {
        if let Some(index) = self.scan(tag, |entries, off| entries.match_u64(off, data)) {
            return Ok(index);
        }
        self.next_index()?;
        let pos = self.entries.len();
        self.entries.ensure_free(9);
        self.entries.put_u8(tag as u8);
        self.entries.put_u64(data);
        Ok(self.register(pos, 2))
    }

    fn find_ref1(&mut self, tag: Tag, index: u16) -> Result<u16> {
        if let Some(found) = self.scan(tag, |entries, off| entries.match_u16(off, index)) {
            return Ok(found);
        }
        self.next_index()?;
        let pos = self.entries.len();
        self.entries.put_12(tag as u8, index);
        Ok(self.register(pos, 1))
    }

    fn find_method_handle(&mut self, kind: u8, index: u16) -> Result<u16> {
        let found = self.scan(Tag::MethodHandle, |entries, off| {
            entries.get(off) == kind && entries.match_u16(off + 1, index)
        });
        if let Some(found) = found {
            return Ok(found);
        }
        self.next_index()?;
        let pos = self.entries.len();
        self.entries.put_112(Tag::MethodHandle as u8, kind, index);
        Ok(self.register(pos, 1))
    }
}

impl ConstantPool for ConstantPoolBuilder {
    fn count(&self) -> usize {
        self.cp_info.len()
    }

    fn tag(&self, index: u16) -> Option<Tag> {
        match self.cp_info.as_slice().get(index as usize) {
            Some(&pos) if pos != UNUSABLE => Tag::try_from(self.entries.get(pos as usize)).ok(),
            _ => None,
        }
    }

    fn utf8(&self, index: u16) -> Cow<'_, str> {
        let off = self.payload(index);
        let len = self.entries.u16_at(off) as usize;
        let mut scratch = Vec::new();
        Cow::Owned(mutf8::decode(
            &self.entries.as_slice()[off + 2..off + 2 + len],
            &mut scratch,
        ))
    }

    fn int_value(&self, index: u16) -> i32 {
        self.entries.u32_at(self.payload(index)) as i32
    }

    fn long_value(&self, index: u16) -> i64 {
        self.entries.u64_at(self.payload(index)) as i64
    }

    fn ref_index(&self, index: u16) -> u16 {
        self.entries.u16_at(self.payload(index))
    }

    fn ref_indexes(&self, index: u16) -> (u16, u16) {
        let off = self.payload(index);
        (self.entries.u16_at(off), self.entries.u16_at(off + 2))
    }

    fn method_handle(&self, index: u16) -> (u8, u16) {
        let off = self.payload(index);
        (self.entries.get(off), self.entries.u16_at(off + 1))
    }
}
