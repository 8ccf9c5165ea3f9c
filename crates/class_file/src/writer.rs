use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    attribute_writer::{AttrSink, Attributable, CountSlot},
    buffer::{ByteArray, GrowthPolicy},
    visitor::{ClassVisitor, MemberVisitor},
    AccessFlags, ClassFileError, ClassFileReader, ClassVersion, ConstantPool, ConstantPoolBuilder,
    ConstantSink, Result, MAGIC,
};

/// Initial sizes of the writer's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub pool_policy: GrowthPolicy,
    pub pool_capacity: usize,
    pub body_capacity: usize,
    pub method_capacity: usize,
    pub attribute_capacity: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            pool_policy: GrowthPolicy::POOL,
            pool_capacity: 200,
            body_capacity: 75,
            method_capacity: 0,
            attribute_capacity: 100,
        }
    }
}

/// Builds a class file from visitor calls.
///
/// Each section lives in its own buffer: the constant pool, the header and
/// fields, the methods, and the class attributes. They are only concatenated
/// by [`ClassFileWriter::to_bytes`], so the pool may keep growing while
/// members are written.
#[derive(Debug, Clone)]
pub struct ClassFileWriter {
    version: ClassVersion,
    pool: ConstantPoolBuilder,
    body: ByteArray,
    meth: ByteArray,
    attr: ByteArray,
    fields: Option<CountSlot>,
    field_count: u16,
    method_count: u32,
    attr_count: u32,
}

impl ClassFileWriter {
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    pub fn with_options(options: WriterOptions) -> Self {
        Self {
            version: ClassVersion::V1_8,
            pool: ConstantPoolBuilder::with_policy(options.pool_capacity, options.pool_policy),
            body: ByteArray::with_capacity(options.body_capacity),
            meth: ByteArray::with_capacity(options.method_capacity),
            attr: ByteArray::with_capacity(options.attribute_capacity),
            fields: None,
            field_count: 0,
            method_count: 0,
            attr_count: 0,
        }
    }

    /// Rebuilds `reader`'s class: copies its pool, then replays its structure.
    ///
    /// Fails with [`ClassFileError::PoolIndexesMoved`] when the source pool
    /// holds duplicate constants, since replayed indexes would then point at
    /// the wrong entries.
    pub fn from_reader(reader: &ClassFileReader<'_>) -> Result<Self> {
        let mut writer = Self::with_options(WriterOptions {
            pool_capacity: reader.pool_len(),
            body_capacity: reader.body_len(),
            ..WriterOptions::default()
        });
        match reader.copy_pool_to(&mut writer.pool)? {
            0 => {}
            moved => return Err(ClassFileError::PoolIndexesMoved(moved)),
        }
        reader.accept(&mut writer)?;
        Ok(writer)
    }

    pub fn version(&self) -> ClassVersion {
        self.version
    }

    pub fn pool(&self) -> &ConstantPoolBuilder {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ConstantPoolBuilder {
        &mut self.pool
    }

    /// [`ClassVisitor::visit`] with names instead of pool indexes. A missing
    /// super class is written as index 0, as for `java/lang/Object` itself.
    pub fn visit_header(
        &mut self,
        version: ClassVersion,
        access_flags: AccessFlags,
        this_class: &str,
        super_class: Option<&str>,
        interfaces: &[&str],
    ) -> Result<()> {
        let this_class = self.pool.find_class(this_class)?;
        let super_class = match super_class {
            Some(name) => self.pool.find_class(name)?,
            None => 0,
        };
        let interfaces = interfaces
            .iter()
            .map(|name| self.pool.find_class(name))
            .collect::<Result<Vec<_>>>()?;
        self.visit(version, access_flags, this_class, super_class, &interfaces)
    }

    pub fn add_field(
        &mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<MemberWriter<'_>> {
        let name_index = self.pool.find_utf8(name)?;
        let descriptor_index = self.pool.find_utf8(descriptor)?;
        Ok(self.visit_field(access_flags, name_index, descriptor_index))
    }

    pub fn add_method(
        &mut self,
        access_flags: AccessFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<MemberWriter<'_>> {
        let name_index = self.pool.find_utf8(name)?;
        let descriptor_index = self.pool.find_utf8(descriptor)?;
        Ok(self.visit_method(access_flags, name_index, descriptor_index))
    }

    /// Length of the serialized class.
    pub fn encoded_len(&self) -> usize {
        10 + self.pool.entries().len() + self.body.len() + 2 + self.meth.len() + 2 + self.attr.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Serializes the class. Only meaningful after [`ClassVisitor::visit_end`],
    /// and may be repeated.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        let pool_count = self.pool.encoded_count()?;
        let method_count = count_u16("methods", self.method_count)?;
        let attr_count = count_u16("attributes", self.attr_count)?;

        w.write_u32::<BigEndian>(MAGIC)?;
        w.write_u16::<BigEndian>(self.version.minor)?;
        w.write_u16::<BigEndian>(self.version.major)?;
        w.write_u16::<BigEndian>(pool_count)?;
        w.write_all(self.pool.entries())?;
        w.write_all(self.body.as_slice())?;
        w.write_u16::<BigEndian>(method_count)?;
        w.write_all(self.meth.as_slice())?;
        w.write_u16::<BigEndian>(attr_count)?;
        w.write_all(self.attr.as_slice())?;
        Ok(())
    }
}

impl Default for ClassFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn count_u16(what: &'static str, count: u32) -> Result<u16> {
    u16::try_from(count).map_err(|_| ClassFileError::CountOverflow { what, count })
}

impl Attributable for ClassFileWriter {
    fn sink(&mut self) -> AttrSink<'_> {
        AttrSink {
            array: &mut self.attr,
            pool: &mut self.pool,
            count: &mut self.attr_count,
        }
    }
}

impl ClassVisitor for ClassFileWriter {
    type Field<'a> = MemberWriter<'a>;
    type Method<'a> = MemberWriter<'a>;

    fn visit(
        &mut self,
        version: ClassVersion,
        access_flags: AccessFlags,
        this_class: u16,
        super_class: u16,
        interfaces: &[u16],
    ) -> Result<()> {
        let interfaces_count = count_u16("interfaces", interfaces.len() as u32)?;
        self.version = version;
        self.body.put_222(access_flags.bits(), this_class, super_class);
        self.body.put_u16(interfaces_count);
        for &interface in interfaces {
            self.body.put_u16(interface);
        }
        self.fields = Some(CountSlot::open(&mut self.body));
        Ok(())
    }

    fn visit_field(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> MemberWriter<'_> {
        let body = &mut self.body;
        self.fields
            .get_or_insert_with(|| CountSlot::open(body))
            .count += 1;
        MemberWriter::open(body, &mut self.pool, access_flags, name_index, descriptor_index)
    }

    fn visit_method(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> MemberWriter<'_> {
        self.method_count += 1;
        MemberWriter::open(
            &mut self.meth,
            &mut self.pool,
            access_flags,
            name_index,
            descriptor_index,
        )
    }

    fn visit_end(&mut self) -> Result<()> {
        if let Some(fields) = self.fields.take() {
            self.field_count = count_u16("fields", fields.count)?;
            fields.close(&mut self.body, "fields")?;
        }
        log::debug!(
            "finished class file v{}: {} constants, {} fields, {} methods, {} attributes",
            self.version,
            self.pool.count() - 1,
            self.field_count,
            self.method_count,
            self.attr_count,
        );
        self.pool.encoded_count()?;
        count_u16("methods", self.method_count)?;
        count_u16("attributes", self.attr_count)?;
        Ok(())
    }
}

/// Attribute list of one field or method.
#[must_use = "the attributes count is only written by `visit_end`"]
pub struct MemberWriter<'a> {
    array: &'a mut ByteArray,
    pool: &'a mut ConstantPoolBuilder,
    attrs: CountSlot,
}

impl<'a> MemberWriter<'a> {
    fn open(
        array: &'a mut ByteArray,
        pool: &'a mut ConstantPoolBuilder,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> Self {
        array.put_222(access_flags.bits(), name_index, descriptor_index);
        let attrs = CountSlot::open(array);
        Self { array, pool, attrs }
    }
}

impl Attributable for MemberWriter<'_> {
    fn sink(&mut self) -> AttrSink<'_> {
        AttrSink {
            array: self.array,
            pool: self.pool,
            count: &mut self.attrs.count,
        }
    }
}

impl MemberVisitor for MemberWriter<'_> {
    fn visit_end(self) -> Result<()> {
        self.attrs.close(self.array, "attributes")
    }
}
