use brew_class_file::{
    AccessFlags, AttributeName, Attributable, ClassFileReader, ClassFileWriter, ClassVersion,
    ClassVisitor, ConstantPool, ConstantSink, MemberVisitor, MemberWriter, RawAttributes, Result,
    Tag,
};
use quickcheck_macros::quickcheck;

const BIG: i64 = 1 << 40;

fn build_my_class() -> Vec<u8> {
    let _ = pretty_env_logger::try_init();

    let mut writer = ClassFileWriter::new();
    writer
        .visit_header(
            ClassVersion::V1_8,
            AccessFlags::PUBLIC | AccessFlags::SUPER,
            "my/MyClass",
            Some("java/lang/Object"),
            &["java/lang/Runnable"],
        )
        .unwrap();

    let mut field = writer
        .add_field(AccessFlags::PRIVATE | AccessFlags::FINAL, "myField", "I")
        .unwrap();
    let constant_value = field.pool().attribute_name(AttributeName::ConstantValue).unwrap();
    let value = field.pool().find_int(7).unwrap();
    field.visit_u2_attribute(constant_value, value);
    field.visit_end().unwrap();

    let mut field = writer
        .add_field(AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL, "BIG", "J")
        .unwrap();
    let value = field.pool().find_long(BIG).unwrap();
    field.visit_u2_attribute(constant_value, value);
    let deprecated = field.pool().attribute_name(AttributeName::Deprecated).unwrap();
    field.visit_empty_attribute(deprecated);
    field.visit_end().unwrap();

    let mut init = writer.add_method(AccessFlags::PUBLIC, "<init>", "()V").unwrap();
    let code_name = init.pool().attribute_name(AttributeName::Code).unwrap();
    let line_numbers = init.pool().attribute_name(AttributeName::LineNumberTable).unwrap();
    let super_init = init
        .pool()
        .find_method_ref("java/lang/Object", "<init>", "()V")
        .unwrap();
    let mut code = init.visit_comp_attribute(code_name);
    code.write_u16(1); // max_stack
    code.write_u16(1); // max_locals
    code.write_u32(5);
    code.write_bytes(&[0x2A, 0xB7]); // aload_0, invokespecial
    code.write_u16(super_init);
    code.write_u8(0xB1); // return
    code.write_u16(0);
    let mut lines = code.visit_attribute(line_numbers);
    lines.write_u16(1);
    lines.write_u16(0);
    lines.write_u16(3);
    lines.visit_end().unwrap();
    code.visit_end().unwrap();
    init.visit_end().unwrap();

    let mut run = writer.add_method(AccessFlags::PUBLIC, "run", "()V").unwrap();
    let mut code = run.visit_comp_attribute(code_name);
    code.write_u16(0);
    code.write_u16(1);
    code.write_u32(1);
    code.write_u8(0xB1);
    code.write_u16(0);
    code.visit_attributes();
    code.visit_end().unwrap();
    run.visit_end().unwrap();

    let source_file = writer.pool_mut().attribute_name(AttributeName::SourceFile).unwrap();
    let file = writer.pool_mut().find_utf8("MyClass.java").unwrap();
    writer.visit_u2_attribute(source_file, file);

    writer.visit_end().unwrap();
    writer.to_bytes().unwrap()
}

fn with_class_file(f: impl FnOnce(ClassFileReader<'_>)) {
    let bytes = build_my_class();
    f(ClassFileReader::parse(&bytes).unwrap());
}

#[test]
fn test_super_class() {
    with_class_file(|class_file| {
        assert_eq!(
            Some("java/lang/Object"),
            class_file.super_class_name().unwrap().as_deref()
        )
    });
}

#[test]
fn test_class_name() {
    with_class_file(|class_file| assert_eq!("my/MyClass", class_file.this_class_name().unwrap()));
}

#[test]
fn test_header() {
    with_class_file(|class_file| {
        assert_eq!(ClassVersion::V1_8, class_file.version());
        assert_eq!(AccessFlags::PUBLIC | AccessFlags::SUPER, class_file.access_flags());
        let interfaces = class_file.interfaces().collect::<Vec<_>>();
        assert_eq!(1, interfaces.len());
        assert_eq!("java/lang/Runnable", class_file.class_name(interfaces[0]).unwrap());
    });
}

#[test]
fn test_field_name() {
    with_class_file(|class_file| {
        let field = class_file.fields().next().unwrap();
        assert_eq!("myField", class_file.member_name(&field).unwrap())
    });
}

#[test]
fn test_int_field_type() {
    with_class_file(|class_file| {
        let field = class_file.fields().next().unwrap();
        assert_eq!("I", class_file.member_descriptor(&field).unwrap())
    });
}

#[test]
fn test_field_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(
            AccessFlags::FINAL | AccessFlags::PRIVATE,
            class_file.fields().next().unwrap().access_flags
        )
    });
}

#[test]
fn test_constant_value() {
    with_class_file(|class_file| {
        let fields = class_file.fields().collect::<Vec<_>>();
        let value = fields[0]
            .attributes
            .find_by_name("ConstantValue", &class_file)
            .unwrap();
        assert_eq!(7, class_file.int_value(u16::from_be_bytes([value.info[0], value.info[1]])));

        let value = fields[1]
            .attributes
            .find_by_name("ConstantValue", &class_file)
            .unwrap();
        let index = u16::from_be_bytes([value.info[0], value.info[1]]);
        assert_eq!(Some(Tag::Long), class_file.tag(index));
        assert_eq!(BIG, class_file.long_value(index));
        assert!(fields[1].attributes.find_by_name("Deprecated", &class_file).is_some());
    });
}

#[test]
fn test_long_takes_two_slots() {
    with_class_file(|class_file| {
        let index = class_file.find_long(BIG).unwrap();
        assert_eq!(None, class_file.tag(index + 1));
        assert_eq!(None, class_file.entry_range(index + 1));
        assert_eq!(Some(Tag::Utf8), class_file.tag(index + 2));
    });
}

#[test]
fn test_constructor_name() {
    with_class_file(|class_file| {
        let method = class_file.methods().next().unwrap();
        assert_eq!("<init>", class_file.member_name(&method).unwrap());
        assert_eq!("()V", class_file.member_descriptor(&method).unwrap());
    });
}

#[test]
fn test_code_attribute() {
    with_class_file(|class_file| {
        let method = class_file.methods().next().unwrap();
        let code = method.attributes.code_attribute(&class_file).unwrap().unwrap();
        assert_eq!(1, code.max_stack);
        assert_eq!(1, code.max_locals);
        assert_eq!(5, code.code.len());
        assert!(code.exception_table.is_empty());

        let invoked = u16::from_be_bytes([code.code[2], code.code[3]]);
        let (class, name_and_type) = class_file.ref_indexes(invoked);
        assert_eq!("java/lang/Object", class_file.class_name(class).unwrap());
        assert_eq!("<init>", class_file.utf8(class_file.ref_indexes(name_and_type).0));

        let lines = code
            .attributes
            .find_by_name("LineNumberTable", &class_file)
            .unwrap();
        assert_eq!(&[0, 1, 0, 0, 0, 3], lines.info);
    });
}

#[test]
fn test_code_without_nested_attributes() {
    with_class_file(|class_file| {
        let method = class_file.methods().nth(1).unwrap();
        let code = method.attributes.code_attribute(&class_file).unwrap().unwrap();
        assert_eq!(&[0xB1], code.code);
        assert!(code.attributes.is_empty());
        let raw = method.attributes.iter().next().unwrap();
        assert_eq!(2 + 2 + 4 + 1 + 2 + 2, raw.info.len());
    });
}

#[test]
fn test_source_file() {
    with_class_file(|class_file| {
        let attributes = class_file.attributes();
        assert_eq!(1, attributes.len());
        let source_file = attributes.find_by_name("SourceFile", &class_file).unwrap();
        let index = u16::from_be_bytes([source_file.info[0], source_file.info[1]]);
        assert_eq!("MyClass.java", class_file.utf8(index));
    });
}

#[test]
fn test_no_code_for_fields() {
    with_class_file(|class_file| {
        let field = class_file.fields().next().unwrap();
        assert!(field.attributes.code_attribute(&class_file).unwrap().is_none());
    });
}

#[test]
fn test_main_method_scenario() {
    let mut writer = ClassFileWriter::new();
    writer
        .visit_header(
            ClassVersion::from_packed(0x0034),
            AccessFlags::PUBLIC,
            "C",
            Some("java/lang/Object"),
            &[],
        )
        .unwrap();
    writer
        .add_method(
            AccessFlags::PUBLIC | AccessFlags::STATIC,
            "main",
            "([Ljava/lang/String;)V",
        )
        .unwrap()
        .visit_end()
        .unwrap();
    writer.visit_end().unwrap();
    let bytes = writer.to_bytes().unwrap();

    let header = 4 + 2 + 2 + 2;
    let pool = (3 + 1) + 3 + (3 + 16) + 3 + (3 + 4) + (3 + 22);
    let body = 2 + 2 + 2 + 2 + 2;
    let methods = 2 + 6 + 2;
    let attributes = 2;
    assert_eq!(header + pool + body + methods + attributes, bytes.len());
    assert_eq!(93, bytes.len());

    let reader = ClassFileReader::parse(&bytes).unwrap();
    assert_eq!(ClassVersion::V1_8, reader.version());
    assert_eq!(0, reader.fields().len());
    assert_eq!(1, reader.methods().len());
    let method = reader.methods().next().unwrap();
    assert_eq!("main", reader.member_name(&method).unwrap());
    assert_eq!(AccessFlags::PUBLIC | AccessFlags::STATIC, method.access_flags);
    assert!(method.attributes.is_empty());
    assert!(reader.attributes().is_empty());
}

#[test]
fn test_round_trip() {
    let bytes = build_my_class();
    let reader = ClassFileReader::parse(&bytes).unwrap();
    let rebuilt = ClassFileWriter::from_reader(&reader).unwrap();

    assert_eq!(reader.count(), rebuilt.pool().count());
    assert_eq!(bytes, rebuilt.to_bytes().unwrap());
}

#[test]
fn test_copy_pool_preserves_indexes() {
    let bytes = build_my_class();
    let reader = ClassFileReader::parse(&bytes).unwrap();
    let mut pool = brew_class_file::ConstantPoolBuilder::new();
    assert_eq!(0, reader.copy_pool_to(&mut pool).unwrap());

    for index in 0..reader.count() as u16 {
        assert_eq!(reader.tag(index), pool.tag(index), "#{index}");
        if reader.tag(index) == Some(Tag::Utf8) {
            assert_eq!(reader.utf8(index), pool.utf8(index));
        }
    }
    assert_eq!(reader.find_class("my/MyClass").unwrap(), pool.find_class("my/MyClass").unwrap());
}

/// Replays into a writer while dropping attributes by name.
struct Strip<'w> {
    inner: &'w mut ClassFileWriter,
    dropped: &'w [u16],
}

struct StripMember<'a> {
    inner: MemberWriter<'a>,
    dropped: &'a [u16],
}

impl RawAttributes for StripMember<'_> {
    fn visit_raw_attribute(&mut self, name_index: u16, info: &[u8]) {
        if !self.dropped.contains(&name_index) {
            self.inner.visit_raw_attribute(name_index, info);
        }
    }
}

impl MemberVisitor for StripMember<'_> {
    fn visit_end(self) -> Result<()> {
        self.inner.visit_end()
    }
}

impl RawAttributes for Strip<'_> {
    fn visit_raw_attribute(&mut self, name_index: u16, info: &[u8]) {
        if !self.dropped.contains(&name_index) {
            self.inner.visit_raw_attribute(name_index, info);
        }
    }
}

impl<'w> ClassVisitor for Strip<'w> {
    type Field<'a> = StripMember<'a> where Self: 'a;
    type Method<'a> = StripMember<'a> where Self: 'a;

    fn visit(
        &mut self,
        version: ClassVersion,
        access_flags: AccessFlags,
        this_class: u16,
        super_class: u16,
        interfaces: &[u16],
    ) -> Result<()> {
        self.inner
            .visit(version, access_flags, this_class, super_class, interfaces)
    }

    fn visit_field(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> StripMember<'_> {
        StripMember {
            inner: self.inner.visit_field(access_flags, name_index, descriptor_index),
            dropped: self.dropped,
        }
    }

    fn visit_method(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> StripMember<'_> {
        StripMember {
            inner: self.inner.visit_method(access_flags, name_index, descriptor_index),
            dropped: self.dropped,
        }
    }

    fn visit_end(&mut self) -> Result<()> {
        self.inner.visit_end()
    }
}

#[test]
fn test_replay_through_a_filter() {
    let bytes = build_my_class();
    let reader = ClassFileReader::parse(&bytes).unwrap();
    let dropped = [
        reader.find_utf8("SourceFile").unwrap(),
        reader.find_utf8("Deprecated").unwrap(),
    ];

    let mut writer = ClassFileWriter::new();
    reader.copy_pool_to(writer.pool_mut()).unwrap();
    reader
        .accept(&mut Strip {
            inner: &mut writer,
            dropped: &dropped,
        })
        .unwrap();
    let stripped = writer.to_bytes().unwrap();

    assert_eq!(bytes.len() - 8 - 6, stripped.len());
    let reader = ClassFileReader::parse(&stripped).unwrap();
    assert!(reader.attributes().is_empty());
    let fields = reader.fields().collect::<Vec<_>>();
    assert_eq!(1, fields[1].attributes.len());
    assert_eq!(2, reader.methods().len());
}

#[quickcheck]
fn round_trips_any_members(fields: Vec<(u16, String)>, methods: Vec<String>) -> bool {
    let mut writer = ClassFileWriter::new();
    writer
        .visit_header(ClassVersion::V17, AccessFlags::PUBLIC, "Q", None, &[])
        .unwrap();
    for (flags, name) in &fields {
        writer
            .add_field(AccessFlags::from_bits_truncate(*flags), name, "Ljava/lang/String;")
            .unwrap()
            .visit_end()
            .unwrap();
    }
    for name in &methods {
        let mut method = writer.add_method(AccessFlags::PUBLIC, name, "()V").unwrap();
        let signature = method.pool().attribute_name(AttributeName::Signature).unwrap();
        let value = method.pool().find_utf8(name).unwrap();
        method.visit_u2_attribute(signature, value);
        method.visit_end().unwrap();
    }
    writer.visit_end().unwrap();
    let bytes = writer.to_bytes().unwrap();

    let reader = ClassFileReader::parse(&bytes).unwrap();
    let rebuilt = ClassFileWriter::from_reader(&reader).unwrap();
    reader.fields().len() == fields.len()
        && reader
            .methods()
            .zip(&methods)
            .all(|(method, name)| reader.member_name(&method).unwrap() == name.as_str())
        && rebuilt.to_bytes().unwrap() == bytes
}
