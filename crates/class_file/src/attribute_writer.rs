//! Writers for attribute lists and their length and count prefixes.
//!
//! Every prefix is reserved as zeroes when its section opens and backpatched
//! when the section ends. A writer mutably borrows the buffer it writes into,
//! so nested writers must be ended before their parent can be written to
//! again, and `visit_end` consumes the writer.

use crate::{buffer::ByteArray, ClassFileError, ConstantPoolBuilder, Result};

/// Reserved `u4 attribute_length`, patched with the bytes written after it.
#[derive(Debug)]
pub(crate) struct LengthSlot(usize);

impl LengthSlot {
    /// Writes `attribute_name_index` and reserves the length after it.
    pub(crate) fn open(array: &mut ByteArray, name_index: u16) -> Self {
        array.put_u16(name_index);
        Self(array.skip(4))
    }

    pub(crate) fn close(self, array: &mut ByteArray) -> Result<()> {
        let length = array.len() - self.0 - 4;
        let length = u32::try_from(length).map_err(|_| ClassFileError::CountOverflow {
            what: "attribute length",
            count: u32::MAX,
        })?;
        array.set_u32(self.0, length);
        Ok(())
    }
}

/// Reserved `u2` count, patched with the number of entries that followed.
#[derive(Debug, Clone)]
pub(crate) struct CountSlot {
    off: usize,
    pub(crate) count: u32,
}

impl CountSlot {
    pub(crate) fn open(array: &mut ByteArray) -> Self {
        Self {
            off: array.skip(2),
            count: 0,
        }
    }

    pub(crate) fn close(self, array: &mut ByteArray, what: &'static str) -> Result<()> {
        let count = u16::try_from(self.count).map_err(|_| ClassFileError::CountOverflow {
            what,
            count: self.count,
        })?;
        array.set_u16(self.off, count);
        Ok(())
    }
}

/// The buffer an attribute list is appended to, the pool its names come
/// from, and the counter of its enclosing `attributes_count`.
pub struct AttrSink<'a> {
    pub(crate) array: &'a mut ByteArray,
    pub(crate) pool: &'a mut ConstantPoolBuilder,
    pub(crate) count: &'a mut u32,
}

/// Anything that owns an attribute list: a class, a field, a method, or a
/// composite attribute such as `Code`.
pub trait Attributable {
    #[doc(hidden)]
    fn sink(&mut self) -> AttrSink<'_>;

    fn pool(&mut self) -> &mut ConstantPoolBuilder {
        self.sink().pool
    }

    /// An attribute holding a single `u2`, such as `ConstantValue` or
    /// `SourceFile`.
    fn visit_u2_attribute(&mut self, name_index: u16, value: u16) {
        let sink = self.sink();
        *sink.count += 1;
        sink.array.put_242(name_index, 2, value);
    }

    /// An attribute without content, such as `Deprecated` or `Synthetic`.
    fn visit_empty_attribute(&mut self, name_index: u16) {
        let sink = self.sink();
        *sink.count += 1;
        sink.array.put_24(name_index, 0);
    }

    fn visit_attribute(&mut self, name_index: u16) -> AttributeWriter<'_> {
        let AttrSink { array, pool, count } = self.sink();
        *count += 1;
        let length = LengthSlot::open(array, name_index);
        AttributeWriter {
            array,
            pool,
            length,
        }
    }

    /// An attribute whose content ends with a nested attribute list.
    fn visit_comp_attribute(&mut self, name_index: u16) -> CompAttributeWriter<'_> {
        let AttrSink { array, pool, count } = self.sink();
        *count += 1;
        let length = LengthSlot::open(array, name_index);
        CompAttributeWriter {
            array,
            pool,
            length,
            nest: None,
        }
    }
}

/// Writes an already encoded attribute, used when replaying a class file.
pub trait RawAttributes {
    fn visit_raw_attribute(&mut self, name_index: u16, info: &[u8]);
}

impl<T: Attributable + ?Sized> RawAttributes for T {
    fn visit_raw_attribute(&mut self, name_index: u16, info: &[u8]) {
        let sink = self.sink();
        *sink.count += 1;
        sink.array.put_24(name_index, info.len() as u32);
        sink.array.extend_from_slice(info);
    }
}

macro_rules! attribute_body {
    ($writer:ident) => {
        impl<'a> $writer<'a> {
            /// The attribute's content buffer, for the wider `put_*` helpers.
            pub fn buf(&mut self) -> &mut ByteArray {
                self.array
            }

            pub fn pool(&mut self) -> &mut ConstantPoolBuilder {
                self.pool
            }

            pub fn write_u8(&mut self, v: u8) {
                self.array.put_u8(v);
            }

            pub fn write_u16(&mut self, v: u16) {
                self.array.put_u16(v);
            }

            pub fn write_u32(&mut self, v: u32) {
                self.array.put_u32(v);
            }

            pub fn write_bytes(&mut self, bytes: &[u8]) {
                self.array.extend_from_slice(bytes);
            }

            /// Reserves `n` zeroed bytes to be patched through [`Self::buf`].
            pub fn skip(&mut self, n: usize) -> usize {
                self.array.skip(n)
            }
        }
    };
}

/// A simple attribute: free-form content after a backpatched length.
#[must_use = "the attribute length is only written by `visit_end`"]
pub struct AttributeWriter<'a> {
    array: &'a mut ByteArray,
    pool: &'a mut ConstantPoolBuilder,
    length: LengthSlot,
}

attribute_body!(AttributeWriter);

impl AttributeWriter<'_> {
    pub fn visit_end(self) -> Result<()> {
        self.length.close(self.array)
    }
}

/// A composite attribute: free-form content, then a nested attribute list.
///
/// The nested `attributes_count` is reserved by [`visit_attributes`] or,
/// failing that, right before the first nested attribute. Content must not be
/// written after it.
///
/// [`visit_attributes`]: CompAttributeWriter::visit_attributes
#[must_use = "the attribute length is only written by `visit_end`"]
pub struct CompAttributeWriter<'a> {
    array: &'a mut ByteArray,
    pool: &'a mut ConstantPoolBuilder,
    length: LengthSlot,
    nest: Option<CountSlot>,
}

attribute_body!(CompAttributeWriter);

impl CompAttributeWriter<'_> {
    /// Ends the content and opens the nested attribute list.
    pub fn visit_attributes(&mut self) {
        if self.nest.is_none() {
            self.nest = Some(CountSlot::open(self.array));
        }
    }

    pub fn visit_end(self) -> Result<()> {
        match self.nest {
            Some(nest) => nest.close(self.array, "nested attributes")?,
            None => self.array.put_u16(0),
        }
        self.length.close(self.array)
    }
}

impl Attributable for CompAttributeWriter<'_> {
    // Reaching the pool must not reserve the nested count.
    fn pool(&mut self) -> &mut ConstantPoolBuilder {
        self.pool
    }

    fn sink(&mut self) -> AttrSink<'_> {
        let array = &mut *self.array;
        let nest = self.nest.get_or_insert_with(|| CountSlot::open(array));
        AttrSink {
            array,
            pool: self.pool,
            count: &mut nest.count,
        }
    }
}

/// A top-level attribute list: reserves its count on creation.
pub struct AttrContainer<'a> {
    array: &'a mut ByteArray,
    pool: &'a mut ConstantPoolBuilder,
    count: CountSlot,
}

impl<'a> AttrContainer<'a> {
    pub fn new(array: &'a mut ByteArray, pool: &'a mut ConstantPoolBuilder) -> Self {
        let count = CountSlot::open(array);
        Self { array, pool, count }
    }

    pub fn visit_end(self) -> Result<()> {
        self.count.close(self.array, "attributes")
    }
}

impl Attributable for AttrContainer<'_> {
    fn sink(&mut self) -> AttrSink<'_> {
        AttrSink {
            array: self.array,
            pool: self.pool,
            count: &mut self.count.count,
        }
    }
}

#[cfg(test)]
mod attribute_writer_tests {
    use super::*;
    use crate::{names::AttributeName, ConstantPool, ConstantSink};

    #[test]
    fn it_should_count_container_attributes() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        attrs.visit_empty_attribute(1);
        attrs.visit_u2_attribute(2, 0x0304);
        attrs.visit_raw_attribute(5, &[9, 9, 9]);
        attrs.visit_end().unwrap();

        assert_eq!(
            array.as_slice(),
            &[
                0, 3, //
                0, 1, 0, 0, 0, 0, //
                0, 2, 0, 0, 0, 2, 3, 4, //
                0, 5, 0, 0, 0, 3, 9, 9, 9,
            ]
        );
    }

    #[test]
    fn it_should_backpatch_a_zero_length_attribute() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        attrs.visit_attribute(7).visit_end().unwrap();
        attrs.visit_end().unwrap();

        assert_eq!(array.as_slice(), &[0, 1, 0, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn it_should_backpatch_simple_attribute_lengths() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        let mut attr = attrs.visit_attribute(7);
        attr.write_u8(1);
        attr.write_u16(2);
        attr.write_u32(3);
        attr.write_bytes(&[4, 5]);
        attr.visit_end().unwrap();
        attrs.visit_end().unwrap();

        assert_eq!(array.u32_at(4), 9);
        assert_eq!(array.len(), 2 + 6 + 9);
    }

    #[test]
    fn it_should_write_zero_nested_attributes() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        let mut outer = attrs.visit_comp_attribute(1);
        outer.write_u16(0xAAAA);
        let inner = outer.visit_comp_attribute(2);
        inner.visit_end().unwrap();
        outer.visit_end().unwrap();
        attrs.visit_end().unwrap();

        assert_eq!(
            array.as_slice(),
            &[
                0, 1, // one attribute
                0, 1, 0, 0, 0, 12, // outer: content + count + inner + count
                0xAA, 0xAA, //
                0, 1, // one nested attribute
                0, 2, 0, 0, 0, 2, // inner
                0, 0, // inner has no nested attributes
            ]
        );
    }

    #[test]
    fn it_should_reserve_the_nested_count_explicitly() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        let mut code = attrs.visit_comp_attribute(1);
        code.write_u32(0x0102_0304);
        code.visit_attributes();
        code.visit_attributes();
        code.visit_end().unwrap();
        attrs.visit_end().unwrap();

        assert_eq!(
            array.as_slice(),
            &[0, 1, 0, 1, 0, 0, 0, 6, 1, 2, 3, 4, 0, 0]
        );
    }

    #[test]
    fn it_should_intern_names_through_the_writer() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        let name = attrs.pool().attribute_name(AttributeName::SourceFile).unwrap();
        let file = attrs.pool().find_utf8("Main.java").unwrap();
        attrs.visit_u2_attribute(name, file);
        attrs.visit_end().unwrap();

        assert_eq!((name, file), (1, 2));
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn it_should_reach_the_pool_without_opening_nested_attributes() {
        fn intern_line_numbers<A: Attributable>(owner: &mut A) -> u16 {
            owner
                .pool()
                .attribute_name(AttributeName::LineNumberTable)
                .unwrap()
        }

        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let code_name = pool.attribute_name(AttributeName::Code).unwrap();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        let mut code = attrs.visit_comp_attribute(code_name);
        let line_numbers = intern_line_numbers(&mut code);
        code.write_u16(1);
        code.write_u16(1);
        code.write_u32(1);
        code.write_u8(0xB1);
        code.write_u16(0);
        code.visit_end().unwrap();
        attrs.visit_end().unwrap();

        assert_eq!(line_numbers, 2);
        let parsed = crate::Parser::new(&array.as_slice()[8..])
            .parse_code_attribute()
            .unwrap();
        assert_eq!((parsed.max_stack, parsed.max_locals), (1, 1));
        assert_eq!(parsed.code, &[0xB1]);
        assert!(parsed.attributes.is_empty());
        assert_eq!(array.u32_at(4), 13);
    }

    #[test]
    fn it_should_reject_too_many_attributes() {
        let mut array = ByteArray::new();
        let mut pool = ConstantPoolBuilder::new();
        let mut attrs = AttrContainer::new(&mut array, &mut pool);
        for _ in 0..=u16::MAX as u32 {
            attrs.visit_empty_attribute(1);
        }
        assert!(matches!(
            attrs.visit_end(),
            Err(ClassFileError::CountOverflow {
                count: 65536,
                ..
            })
        ));
    }
}
