use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::{Attributes, CodeAttribute, ExceptionTableEntry},
    ClassFileError, Result,
};

type Endian = BigEndian;

/// Bounds-checked big-endian cursor over a borrowed buffer.
///
/// Every read checks the remaining length first and fails with
/// [`ClassFileError::Truncated`], so slices handed out afterwards never need
/// checking again.
pub struct Parser<'a> {
    r: Cursor<&'a [u8]>,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            r: Cursor::new(bytes),
        }
    }

    pub fn position(&self) -> usize {
        self.r.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.len() - self.position()
    }

    fn len(&self) -> usize {
        self.r.get_ref().len()
    }

    fn require(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(ClassFileError::Truncated {
                offset: self.position(),
                needed,
                len: self.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.r.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        Ok(self.r.read_u16::<Endian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.r.read_u32::<Endian>()?)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.r.seek(SeekFrom::Current(n as i64))?;
        Ok(())
    }

    /// Borrows the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let bytes: &'a [u8] = *self.r.get_ref();
        let start = self.position();
        self.r.set_position((start + n) as u64);
        Ok(&bytes[start..start + n])
    }

    /// Walks `attributes_count` and the attributes that follow without
    /// looking inside them.
    pub fn parse_attributes(&mut self) -> Result<Attributes<'a>> {
        let start = self.position();
        let count = self.read_u16()?;
        for _ in 0..count {
            self.skip(2)?;
            let length = self.read_u32()? as usize;
            self.skip(length)?;
        }
        let bytes: &'a [u8] = *self.r.get_ref();
        Ok(Attributes::new(count, &bytes[start + 2..self.position()]))
    }

    /// Walks `access_flags`, `name_index`, `descriptor_index` and the
    /// attributes of one field or method.
    pub fn skip_member(&mut self) -> Result<()> {
        self.skip(6)?;
        self.parse_attributes().map(drop)
    }

    pub fn parse_code_attribute(&mut self) -> Result<CodeAttribute<'a>> {
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()?;
        let code = self.take(code_length as usize)?;
        let exception_table_length = self.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;
        let attributes = self.parse_attributes()?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn it_should_report_truncation() {
        let mut parser = Parser::new(&[0, 1, 2]);
        assert_eq!(parser.read_u16().unwrap(), 1);
        assert!(matches!(
            parser.read_u16(),
            Err(ClassFileError::Truncated {
                offset: 2,
                needed: 2,
                len: 3
            })
        ));
        assert_eq!(parser.position(), 2);
    }

    #[test]
    fn it_should_walk_attribute_lists() {
        let bytes = [0, 2, 0, 7, 0, 0, 0, 1, 0xAA, 0, 8, 0, 0, 0, 0, 0xFF];
        let mut parser = Parser::new(&bytes);
        let attributes = parser.parse_attributes().unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(parser.remaining(), 1);
    }

    #[test]
    fn it_should_reject_attributes_running_past_the_end() {
        let bytes = [0, 1, 0, 7, 0, 0, 0, 9, 0xAA];
        assert!(matches!(
            Parser::new(&bytes).parse_attributes(),
            Err(ClassFileError::Truncated { needed: 9, .. })
        ));
    }

    #[test]
    fn it_should_parse_code_attributes() {
        let bytes = [
            0, 2, 0, 1, // max_stack, max_locals
            0, 0, 0, 1, 0xB1, // return
            0, 1, 0, 0, 0, 1, 0, 1, 0, 9, // one handler
            0, 0, // no attributes
        ];
        let code = Parser::new(&bytes).parse_code_attribute().unwrap();
        assert_eq!((code.max_stack, code.max_locals), (2, 1));
        assert_eq!(code.code, &[0xB1]);
        assert_eq!(code.exception_table[0].catch_type, 9);
        assert!(code.attributes.is_empty());
    }
}
