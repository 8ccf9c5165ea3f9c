//! Legality checks that callers may run between visitor calls. Neither the
//! writer nor the reader runs them on its own.

use crate::{
    tag::reference_kind, AccessFlags, ClassFileError, ClassVersion, ConstantPool, Result, Tag,
};

fn invalid(flags: AccessFlags, reason: &str) -> ClassFileError {
    ClassFileError::Validation(format!(
        "0x{:04X} is an invalid access flags value: {reason}",
        flags.bits()
    ))
}

fn require(feature: &'static str, required: ClassVersion, found: ClassVersion) -> Result<()> {
    if found.major < required.major {
        return Err(ClassFileError::VersionGated {
            feature,
            required: required.major,
            found,
        });
    }
    Ok(())
}

/// Fails if constants with `tag` did not exist yet in `version`.
pub fn validate_tag(tag: Tag, version: ClassVersion) -> Result<()> {
    match tag {
        Tag::MethodHandle | Tag::MethodType | Tag::InvokeDynamic => {
            require(tag.name(), ClassVersion::V1_7, version)
        }
        Tag::Module | Tag::Package => require(tag.name(), ClassVersion::V9, version),
        Tag::Dynamic => require(tag.name(), ClassVersion::V11, version),
        _ => Ok(()),
    }
}

pub fn validate_method_handle_kind(kind: u8) -> Result<()> {
    match kind {
        reference_kind::GET_FIELD..=reference_kind::INVOKE_INTERFACE => Ok(()),
        _ => Err(ClassFileError::Validation(format!(
            "{kind} is not a method handle reference kind"
        ))),
    }
}

fn validate_visibility(flags: AccessFlags) -> Result<()> {
    if (flags & AccessFlags::VISIBILITY).bits().count_ones() > 1 {
        return Err(invalid(flags, "more than one visibility flag"));
    }
    Ok(())
}

pub fn validate_class_access(flags: AccessFlags, version: ClassVersion) -> Result<()> {
    if flags.contains(AccessFlags::MODULE) {
        require("ACC_MODULE", ClassVersion::V9, version)?;
        if flags - AccessFlags::SYNTHETIC != AccessFlags::MODULE {
            return Err(invalid(flags, "ACC_MODULE must stand alone"));
        }
        return Ok(());
    }
    if flags.intersects(AccessFlags::PRIVATE | AccessFlags::PROTECTED) {
        return Err(invalid(flags, "classes are either public or package-private"));
    }
    if flags.contains(AccessFlags::INTERFACE) {
        if !flags.contains(AccessFlags::ABSTRACT) {
            return Err(invalid(flags, "ACC_INTERFACE requires ACC_ABSTRACT"));
        }
        if flags.intersects(AccessFlags::FINAL | AccessFlags::SUPER | AccessFlags::ENUM) {
            return Err(invalid(
                flags,
                "ACC_INTERFACE excludes ACC_FINAL, ACC_SUPER and ACC_ENUM",
            ));
        }
    } else if flags.contains(AccessFlags::ANNOTATION) {
        return Err(invalid(flags, "ACC_ANNOTATION requires ACC_INTERFACE"));
    } else if flags.contains(AccessFlags::FINAL | AccessFlags::ABSTRACT) {
        return Err(invalid(flags, "ACC_FINAL and ACC_ABSTRACT are exclusive"));
    }
    Ok(())
}

pub fn validate_field_access(flags: AccessFlags) -> Result<()> {
    validate_visibility(flags)?;
    if flags.contains(AccessFlags::FINAL | AccessFlags::VOLATILE) {
        return Err(invalid(flags, "ACC_FINAL and ACC_VOLATILE are exclusive"));
    }
    Ok(())
}

/// Method flags, with the extra rules of `<init>` and `<clinit>`.
pub fn validate_method_access(flags: AccessFlags, name: &str, version: ClassVersion) -> Result<()> {
    validate_visibility(flags)?;
    match name {
        "<init>" => {
            let forbidden = AccessFlags::STATIC
                | AccessFlags::FINAL
                | AccessFlags::SYNCHRONIZED
                | AccessFlags::BRIDGE
                | AccessFlags::NATIVE
                | AccessFlags::ABSTRACT;
            if flags.intersects(forbidden) {
                return Err(invalid(flags, "not allowed on an instance initializer"));
            }
        }
        "<clinit>" if version >= ClassVersion::V1_7 && !flags.contains(AccessFlags::STATIC) => {
            return Err(invalid(flags, "<clinit> must be ACC_STATIC"));
        }
        _ => {}
    }
    if flags.contains(AccessFlags::ABSTRACT) {
        let forbidden = AccessFlags::PRIVATE
            | AccessFlags::STATIC
            | AccessFlags::FINAL
            | AccessFlags::SYNCHRONIZED
            | AccessFlags::NATIVE;
        if flags.intersects(forbidden) {
            return Err(invalid(
                flags,
                "ACC_ABSTRACT excludes ACC_PRIVATE, ACC_STATIC, ACC_FINAL, ACC_SYNCHRONIZED and ACC_NATIVE",
            ));
        }
        if flags.contains(AccessFlags::STRICT)
            && version >= ClassVersion::V1_2
            && version < ClassVersion::V17
        {
            return Err(invalid(flags, "ACC_ABSTRACT excludes ACC_STRICT"));
        }
    }
    Ok(())
}

/// Checks every constant of `pool` against `version` and the tags its
/// references point at. `in_module` allows `Module` and `Package` constants,
/// which only a `module-info` class may hold.
pub fn validate_pool(pool: &impl ConstantPool, version: ClassVersion, in_module: bool) -> Result<()> {
    for index in 1..pool.count() as u16 {
        let Some(tag) = pool.tag(index) else {
            continue;
        };
        validate_tag(tag, version)?;
        match tag {
            Tag::Module | Tag::Package if !in_module => {
                return Err(ClassFileError::Validation(format!(
                    "#{index}: {} constants only appear in module-info",
                    tag.name()
                )));
            }
            Tag::Class | Tag::String | Tag::MethodType | Tag::Module | Tag::Package => {
                pool.expect_tag(pool.ref_index(index), Tag::Utf8)?;
            }
            Tag::NameAndType => {
                let (name, descriptor) = pool.ref_indexes(index);
                pool.expect_tag(name, Tag::Utf8)?;
                pool.expect_tag(descriptor, Tag::Utf8)?;
            }
            Tag::FieldRef | Tag::MethodRef | Tag::InterfaceMethodRef => {
                let (class, name_and_type) = pool.ref_indexes(index);
                pool.expect_tag(class, Tag::Class)?;
                pool.expect_tag(name_and_type, Tag::NameAndType)?;
            }
            Tag::Dynamic | Tag::InvokeDynamic => {
                let (_, name_and_type) = pool.ref_indexes(index);
                pool.expect_tag(name_and_type, Tag::NameAndType)?;
            }
            Tag::MethodHandle => {
                let (kind, reference) = pool.method_handle(index);
                validate_method_handle_kind(kind)?;
                let expected = match kind {
                    reference_kind::GET_FIELD..=reference_kind::PUT_STATIC => Tag::FieldRef,
                    reference_kind::INVOKE_INTERFACE => Tag::InterfaceMethodRef,
                    _ => Tag::MethodRef,
                };
                let found = pool.tag(reference);
                let interface_ok = matches!(
                    (kind, found),
                    (
                        reference_kind::INVOKE_STATIC | reference_kind::INVOKE_SPECIAL,
                        Some(Tag::InterfaceMethodRef)
                    )
                ) && version >= ClassVersion::V1_8;
                if found != Some(expected) && !interface_ok {
                    return Err(ClassFileError::UnexpectedConstantPoolEntry(expected, found));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
