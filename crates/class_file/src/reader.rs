use std::{
    borrow::Cow,
    cell::{OnceCell, RefCell},
    ops::Range,
};

use crate::{
    attribute_writer::RawAttributes,
    attributes::{Attributes, Member, MemberIter},
    buffer::{ByteArray, IntArray},
    mutf8,
    pack::{BytePack, Pack},
    parser::Parser,
    visitor::{ClassVisitor, MemberVisitor},
    AccessFlags, ClassFileError, ClassVersion, ConstantPool, ConstantSink, Result, Tag, MAGIC,
};

const UNUSABLE: u32 = u32::MAX;

/// Random access over an encoded class file.
///
/// [`ClassFileReader::parse`] walks the whole file once, checking every
/// length against the buffer and recording where each constant's payload
/// and each section starts. Queries afterwards trust those offsets.
///
/// Decoded UTF-8 constants are cached per index, so a reader is not `Sync`.
pub struct ClassFileReader<'a> {
    bytes: &'a [u8],
    version: ClassVersion,
    /// Offset of each constant's payload, right after its tag.
    cp_info: IntArray,
    header: usize,
    fields: usize,
    methods: usize,
    attributes: usize,
    strings: Vec<OnceCell<String>>,
    scratch: RefCell<Vec<u16>>,
}

impl<'a> ClassFileReader<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut p = Parser::new(bytes);
        match p.read_u32()? {
            MAGIC => {}
            magic => return Err(ClassFileError::InvalidMagicIdentifier(magic)),
        }
        let minor = p.read_u16()?;
        let major = p.read_u16()?;
        let version = ClassVersion::new(major, minor);

        let count = p.read_u16()? as usize;
        let mut cp_info = IntArray::with_capacity(count.max(1));
        cp_info.push(UNUSABLE);
        let mut max_utf8_len = 0;
        let mut last_utf8 = 0;
        while cp_info.len() < count {
            let tag = p.read_u8()?;
            let tag = Tag::try_from(tag).map_err(ClassFileError::InvalidCpInfoTag)?;
            let index = cp_info.len();
            cp_info.push(p.position() as u32);
            match tag.payload_len() {
                Some(len) => p.skip(len)?,
                None => {
                    let len = p.read_u16()? as usize;
                    p.skip(len)?;
                    max_utf8_len = max_utf8_len.max(len);
                    last_utf8 = index;
                }
            }
            if tag.slots() == 2 {
                cp_info.push(UNUSABLE);
            }
        }
        // A long or double in the last slot.
        cp_info.truncate(count.max(1));

        let header = p.position();
        p.skip(6)?;
        let interfaces_count = p.read_u16()? as usize;
        p.skip(2 * interfaces_count)?;

        let fields = p.position();
        for _ in 0..p.read_u16()? {
            p.skip_member()?;
        }
        let methods = p.position();
        for _ in 0..p.read_u16()? {
            p.skip_member()?;
        }
        let attributes = p.position();
        p.parse_attributes()?;

        if p.remaining() > 0 {
            log::warn!("ignoring {} trailing bytes after the class file", p.remaining());
        }
        log::debug!(
            "indexed class file v{}: {} constants, longest utf8 {} bytes",
            version,
            count,
            max_utf8_len,
        );

        Ok(Self {
            bytes,
            version,
            cp_info,
            header,
            fields,
            methods,
            attributes,
            strings: (0..=last_utf8).map(|_| OnceCell::new()).collect(),
            scratch: RefCell::new(Vec::with_capacity(max_utf8_len)),
        })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn version(&self) -> ClassVersion {
        self.version
    }

    pub fn access_flags(&self) -> AccessFlags {
        AccessFlags::from_bits_truncate(self.u16_at(self.header))
    }

    pub fn this_class(&self) -> u16 {
        self.u16_at(self.header + 2)
    }

    /// Index of the super class, 0 for `java/lang/Object` and modules.
    pub fn super_class(&self) -> u16 {
        self.u16_at(self.header + 4)
    }

    pub fn interfaces(&self) -> impl ExactSizeIterator<Item = u16> + 'a {
        let bytes = self.bytes;
        let start = self.header + 8;
        (0..self.u16_at(self.header + 6) as usize).map(move |i| Pack::get_u16(bytes, start + 2 * i))
    }

    pub fn fields(&self) -> MemberIter<'a> {
        self.members(self.fields, self.methods)
    }

    pub fn methods(&self) -> MemberIter<'a> {
        self.members(self.methods, self.attributes)
    }

    pub fn attributes(&self) -> Attributes<'a> {
        let count = self.u16_at(self.attributes);
        Attributes::new(count, &self.bytes[self.attributes + 2..])
    }

    fn members(&self, start: usize, end: usize) -> MemberIter<'a> {
        MemberIter::new(self.u16_at(start), &self.bytes[start + 2..end])
    }

    pub fn this_class_name(&self) -> Result<Cow<'_, str>> {
        self.class_name(self.this_class())
    }

    /// `None` when the class has no super class.
    pub fn super_class_name(&self) -> Result<Option<Cow<'_, str>>> {
        match self.super_class() {
            0 => Ok(None),
            index => self.class_name(index).map(Some),
        }
    }

    pub fn member_name(&self, member: &Member<'_>) -> Result<Cow<'_, str>> {
        self.expect_tag(member.name_index, Tag::Utf8)?;
        Ok(self.utf8(member.name_index))
    }

    pub fn member_descriptor(&self, member: &Member<'_>) -> Result<Cow<'_, str>> {
        self.expect_tag(member.descriptor_index, Tag::Utf8)?;
        Ok(self.utf8(member.descriptor_index))
    }

    /// Byte length of the encoded constant pool entries.
    pub fn pool_len(&self) -> usize {
        self.header - 10
    }

    /// Byte length of the header and fields, up to `methods_count`.
    pub fn body_len(&self) -> usize {
        self.methods - self.header
    }

    /// Bytes of the whole `cp_info` at `index`, tag included.
    pub fn entry_range(&self, index: u16) -> Option<Range<usize>> {
        let tag = self.tag(index)?;
        let off = self.offset(index);
        let len = match tag.payload_len() {
            Some(len) => len,
            None => 2 + self.u16_at(off) as usize,
        };
        Some(off - 1..off + len)
    }

    /// Encoded modified UTF-8 of the string at `index`, without its length.
    pub fn utf8_bytes(&self, index: u16) -> &'a [u8] {
        let off = self.offset(index);
        let len = self.u16_at(off) as usize;
        &self.bytes[off + 2..off + 2 + len]
    }

    /// Decodes the string at `index`, rejecting malformed modified UTF-8.
    pub fn utf8_checked(&self, index: u16) -> Result<String> {
        self.expect_tag(index, Tag::Utf8)?;
        mutf8::decode_checked(self.utf8_bytes(index), &mut self.scratch.borrow_mut())
    }

    pub fn find_utf8(&self, value: &str) -> Option<u16> {
        let mut encoded = ByteArray::with_capacity(value.len());
        encoded.put_mutf8(value);
        self.scan(Tag::Utf8, |index, _| self.utf8_bytes(index) == encoded.as_slice())
    }

    pub fn find_u32(&self, tag: Tag, data: u32) -> Option<u16> {
        self.scan(tag, |_, off| Pack::match_u32(self.bytes, off, data))
    }

    pub fn find_u64(&self, tag: Tag, data: u64) -> Option<u16> {
        self.scan(tag, |_, off| Pack::match_u64(self.bytes, off, data))
    }

    pub fn find_ref1(&self, tag: Tag, index: u16) -> Option<u16> {
        self.scan(tag, |_, off| Pack::match_u16(self.bytes, off, index))
    }

    pub fn find_ref2(&self, tag: Tag, index1: u16, index2: u16) -> Option<u16> {
        self.find_u32(tag, (index1 as u32) << 16 | index2 as u32)
    }

    pub fn find_method_handle(&self, kind: u8, index: u16) -> Option<u16> {
        self.scan(Tag::MethodHandle, |_, off| {
            self.bytes[off] == kind && Pack::match_u16(self.bytes, off + 1, index)
        })
    }

    pub fn find_int(&self, value: i32) -> Option<u16> {
        self.find_u32(Tag::Integer, value as u32)
    }

    pub fn find_float(&self, value: f32) -> Option<u16> {
        self.find_u32(Tag::Float, value.to_bits())
    }

    pub fn find_long(&self, value: i64) -> Option<u16> {
        self.find_u64(Tag::Long, value as u64)
    }

    pub fn find_double(&self, value: f64) -> Option<u16> {
        self.find_u64(Tag::Double, value.to_bits())
    }

    pub fn find_class(&self, name: &str) -> Option<u16> {
        self.find_ref1(Tag::Class, self.find_utf8(name)?)
    }

    pub fn find_string(&self, value: &str) -> Option<u16> {
        self.find_ref1(Tag::String, self.find_utf8(value)?)
    }

    pub fn find_method_type(&self, descriptor: &str) -> Option<u16> {
        self.find_ref1(Tag::MethodType, self.find_utf8(descriptor)?)
    }

    pub fn find_name_and_type(&self, name: &str, descriptor: &str) -> Option<u16> {
        let name = self.find_utf8(name)?;
        let descriptor = self.find_utf8(descriptor)?;
        self.find_ref2(Tag::NameAndType, name, descriptor)
    }

    /// Interns every constant into `sink` in index order and returns how many
    /// ended up at a different index.
    ///
    /// Indexes carry over unchanged as long as this pool holds no duplicates
    /// and `sink` starts out empty, which is what replaying through
    /// [`ClassFileReader::accept`] relies on.
    pub fn copy_pool_to(&self, sink: &mut impl ConstantSink) -> Result<usize> {
        let mut moved = 0;
        for index in 1..self.count() as u16 {
            let Some(tag) = self.tag(index) else {
                continue;
            };
            let off = self.offset(index);
            let copied = match tag {
                Tag::Utf8 => sink.find_utf8_encoded(self.utf8_bytes(index))?,
                Tag::Long | Tag::Double => sink.find_u64(tag, Pack::get_u64(self.bytes, off))?,
                Tag::MethodHandle => {
                    let (kind, reference) = self.method_handle(index);
                    sink.find_method_handle(kind, reference)?
                }
                Tag::Class | Tag::String | Tag::MethodType | Tag::Module | Tag::Package => {
                    sink.find_ref1(tag, self.u16_at(off))?
                }
                Tag::Integer
                | Tag::Float
                | Tag::FieldRef
                | Tag::MethodRef
                | Tag::InterfaceMethodRef
                | Tag::NameAndType
                | Tag::Dynamic
                | Tag::InvokeDynamic => sink.find_u32(tag, Pack::get_u32(self.bytes, off))?,
            };
            if copied != index {
                log::debug!("constant #{} ({}) copied to #{}", index, tag.name(), copied);
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Replays the class structure, in file order, into `visitor`.
    ///
    /// Pool indexes are passed through as they are, so `visitor` must see
    /// the same constants at the same indexes, see
    /// [`ClassFileReader::copy_pool_to`].
    pub fn accept<V: ClassVisitor>(&self, visitor: &mut V) -> Result<()> {
        let interfaces = self.interfaces().collect::<Vec<_>>();
        visitor.visit(
            self.version,
            self.access_flags(),
            self.this_class(),
            self.super_class(),
            &interfaces,
        )?;

        for field in self.fields() {
            let mut v = visitor.visit_field(field.access_flags, field.name_index, field.descriptor_index);
            for attribute in field.attributes {
                v.visit_raw_attribute(attribute.name_index, attribute.info);
            }
            v.visit_end()?;
        }
        for method in self.methods() {
            let mut v =
                visitor.visit_method(method.access_flags, method.name_index, method.descriptor_index);
            for attribute in method.attributes {
                v.visit_raw_attribute(attribute.name_index, attribute.info);
            }
            v.visit_end()?;
        }
        for attribute in self.attributes() {
            visitor.visit_raw_attribute(attribute.name_index, attribute.info);
        }

        visitor.visit_end()
    }

    fn scan(&self, tag: Tag, matches: impl Fn(u16, usize) -> bool) -> Option<u16> {
        (1..self.count() as u16).find(|&index| {
            self.tag(index) == Some(tag) && matches(index, self.offset(index))
        })
    }

    fn offset(&self, index: u16) -> usize {
        self.cp_info.get(index as usize) as usize
    }

    fn u16_at(&self, off: usize) -> u16 {
        Pack::get_u16(self.bytes, off)
    }
}

impl ConstantPool for ClassFileReader<'_> {
    fn count(&self) -> usize {
        self.cp_info.len()
    }

    fn tag(&self, index: u16) -> Option<Tag> {
        match self.cp_info.as_slice().get(index as usize) {
            Some(&off) if off != UNUSABLE => Tag::try_from(self.bytes[off as usize - 1]).ok(),
            _ => None,
        }
    }

    fn utf8(&self, index: u16) -> Cow<'_, str> {
        let decode = || mutf8::decode(self.utf8_bytes(index), &mut self.scratch.borrow_mut());
        match self.strings.get(index as usize) {
            Some(cell) => Cow::Borrowed(cell.get_or_init(decode).as_str()),
            None => Cow::Owned(decode()),
        }
    }

    fn int_value(&self, index: u16) -> i32 {
        Pack::get_u32(self.bytes, self.offset(index)) as i32
    }

    fn long_value(&self, index: u16) -> i64 {
        Pack::get_u64(self.bytes, self.offset(index)) as i64
    }

    fn ref_index(&self, index: u16) -> u16 {
        self.u16_at(self.offset(index))
    }

    fn ref_indexes(&self, index: u16) -> (u16, u16) {
        let off = self.offset(index);
        (self.u16_at(off), self.u16_at(off + 2))
    }

    fn method_handle(&self, index: u16) -> (u8, u16) {
        let off = self.offset(index);
        (self.bytes[off], self.u16_at(off + 1))
    }
}
