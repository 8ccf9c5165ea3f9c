// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4

use std::{convert::TryFrom, fmt};

/// Discriminator byte of a constant pool entry.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl Tag {
    /// Size of the payload following the tag byte, `None` for `Utf8` whose
    /// payload is a u2 length followed by that many bytes.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            Tag::Utf8 => None,
            Tag::Long | Tag::Double => Some(8),
            Tag::Integer
            | Tag::Float
            | Tag::FieldRef
            | Tag::MethodRef
            | Tag::InterfaceMethodRef
            | Tag::NameAndType
            | Tag::Dynamic
            | Tag::InvokeDynamic => Some(4),
            Tag::MethodHandle => Some(3),
            Tag::Class | Tag::String | Tag::MethodType | Tag::Module | Tag::Package => Some(2),
        }
    }

    /// Number of pool slots the entry occupies. Long and double take two,
    /// the second one being unusable.
    pub fn slots(self) -> usize {
        match self {
            Tag::Long | Tag::Double => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Utf8 => "Utf8",
            Tag::Integer => "Integer",
            Tag::Float => "Float",
            Tag::Long => "Long",
            Tag::Double => "Double",
            Tag::Class => "Class",
            Tag::String => "String",
            Tag::FieldRef => "Fieldref",
            Tag::MethodRef => "Methodref",
            Tag::InterfaceMethodRef => "InterfaceMethodref",
            Tag::NameAndType => "NameAndType",
            Tag::MethodHandle => "MethodHandle",
            Tag::MethodType => "MethodType",
            Tag::Dynamic => "Dynamic",
            Tag::InvokeDynamic => "InvokeDynamic",
            Tag::Module => "Module",
            Tag::Package => "Package",
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tag::Utf8),
            3 => Ok(Tag::Integer),
            4 => Ok(Tag::Float),
            5 => Ok(Tag::Long),
            6 => Ok(Tag::Double),
            7 => Ok(Tag::Class),
            8 => Ok(Tag::String),
            9 => Ok(Tag::FieldRef),
            10 => Ok(Tag::MethodRef),
            11 => Ok(Tag::InterfaceMethodRef),
            12 => Ok(Tag::NameAndType),
            15 => Ok(Tag::MethodHandle),
            16 => Ok(Tag::MethodType),
            17 => Ok(Tag::Dynamic),
            18 => Ok(Tag::InvokeDynamic),
            19 => Ok(Tag::Module),
            20 => Ok(Tag::Package),
            _ => Err(value),
        }
    }
}

/// `reference_kind` values of a `CONSTANT_MethodHandle_info`.
pub mod reference_kind {
    pub const GET_FIELD: u8 = 1;
    pub const GET_STATIC: u8 = 2;
    pub const PUT_FIELD: u8 = 3;
    pub const PUT_STATIC: u8 = 4;
    pub const INVOKE_VIRTUAL: u8 = 5;
    pub const INVOKE_STATIC: u8 = 6;
    pub const INVOKE_SPECIAL: u8 = 7;
    pub const NEW_INVOKE_SPECIAL: u8 = 8;
    pub const INVOKE_INTERFACE: u8 = 9;
}

/// Class file format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl ClassVersion {
    pub const V1_1: ClassVersion = ClassVersion::new(45, 3);
    pub const V1_2: ClassVersion = ClassVersion::new(46, 0);
    pub const V1_3: ClassVersion = ClassVersion::new(47, 0);
    pub const V1_4: ClassVersion = ClassVersion::new(48, 0);
    pub const V1_5: ClassVersion = ClassVersion::new(49, 0);
    pub const V1_6: ClassVersion = ClassVersion::new(50, 0);
    pub const V1_7: ClassVersion = ClassVersion::new(51, 0);
    pub const V1_8: ClassVersion = ClassVersion::new(52, 0);
    pub const V9: ClassVersion = ClassVersion::new(53, 0);
    pub const V10: ClassVersion = ClassVersion::new(54, 0);
    pub const V11: ClassVersion = ClassVersion::new(55, 0);
    pub const V17: ClassVersion = ClassVersion::new(61, 0);
    pub const V21: ClassVersion = ClassVersion::new(65, 0);
    pub const V25: ClassVersion = ClassVersion::new(69, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Unpacks a version whose minor part sits in the high 16 bits.
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            major: packed as u16,
            minor: (packed >> 16) as u16,
        }
    }

    /// Packs the version the way it is laid out in the class file header:
    /// minor in the high 16 bits, major in the low 16 bits.
    pub const fn packed(self) -> u32 {
        (self.minor as u32) << 16 | self.major as u32
    }
}

impl fmt::Display for ClassVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tag_tests {
    use super::*;

    #[test]
    fn it_should_convert_every_known_tag() {
        for byte in 0..=u8::MAX {
            if let Ok(tag) = Tag::try_from(byte) {
                assert_eq!(tag as u8, byte);
            }
        }
        assert_eq!(Tag::try_from(2), Err(2));
        assert_eq!(Tag::try_from(13), Err(13));
        assert_eq!(Tag::try_from(21), Err(21));
    }

    #[test]
    fn it_should_give_long_and_double_two_slots() {
        assert_eq!(Tag::Long.slots(), 2);
        assert_eq!(Tag::Double.slots(), 2);
        assert_eq!(Tag::Integer.slots(), 1);
    }

    #[test]
    fn it_should_pack_the_version_like_the_header() {
        let version = ClassVersion::new(0x34, 0);
        assert_eq!(version.packed(), 0x0000_0034);
        assert_eq!(ClassVersion::from_packed(0x0003_002D), ClassVersion::V1_1);
        assert_eq!(ClassVersion::V1_1.to_string(), "45.3");
    }
}
