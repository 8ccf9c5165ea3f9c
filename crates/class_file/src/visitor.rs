//! The ordered call sequence that builds, or replays, a class file.
//!
//! `visit` → `visit_field`* → `visit_method`* → class attributes → `visit_end`.
//! Each member visitor is ended before the next sibling is opened, which the
//! borrow on the class visitor enforces. Field visitors may not follow method
//! visitors in replay order, but a [`ClassFileWriter`] keeps them apart
//! regardless.
//!
//! [`ClassFileWriter`]: crate::ClassFileWriter

use crate::{attribute_writer::RawAttributes, AccessFlags, ClassVersion, Result};

/// A field or a method, receiving its attribute list.
pub trait MemberVisitor: RawAttributes {
    fn visit_end(self) -> Result<()>;
}

pub trait ClassVisitor: RawAttributes {
    type Field<'a>: MemberVisitor
    where
        Self: 'a;
    type Method<'a>: MemberVisitor
    where
        Self: 'a;

    /// The class header. Every index refers to the destination's own pool.
    fn visit(
        &mut self,
        version: ClassVersion,
        access_flags: AccessFlags,
        this_class: u16,
        super_class: u16,
        interfaces: &[u16],
    ) -> Result<()>;

    fn visit_field(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> Self::Field<'_>;

    fn visit_method(
        &mut self,
        access_flags: AccessFlags,
        name_index: u16,
        descriptor_index: u16,
    ) -> Self::Method<'_>;

    fn visit_end(&mut self) -> Result<()>;
}
