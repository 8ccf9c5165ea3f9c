//! Append-only growable storage with absolute-offset backpatching.

use std::ops::Range;

use crate::pack::{BytePack, Pack};

/// How a buffer picks its next capacity once it runs out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// `max(required, capacity * 2)`.
    Doubling,
    /// Doubles until the length passes `threshold`, then grows by `increment`
    /// at a time: `max(required, len + increment)`.
    Capped { threshold: usize, increment: usize },
}

impl GrowthPolicy {
    /// The default policy of the constant pool buffer.
    pub const POOL: GrowthPolicy = GrowthPolicy::Capped {
        threshold: 10_000,
        increment: 3_200,
    };

    pub fn new_capacity(&self, len: usize, capacity: usize, required: usize) -> usize {
        match *self {
            GrowthPolicy::Capped {
                threshold,
                increment,
            } if len > threshold => required.max(len + increment),
            _ => required.max(capacity * 2),
        }
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        GrowthPolicy::Doubling
    }
}

/// Growable array whose capacity is managed by a [`GrowthPolicy`] instead of
/// `Vec`'s own amortization.
#[derive(Debug, Clone)]
pub struct Array<T> {
    data: Vec<T>,
    policy: GrowthPolicy,
}

pub type ByteArray = Array<u8>;
pub type IntArray = Array<u32>;

impl<T: Copy> Array<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_policy(capacity, GrowthPolicy::Doubling)
    }

    pub fn with_policy(capacity: usize, policy: GrowthPolicy) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// Makes room for at least `n` more elements.
    pub fn ensure_free(&mut self, n: usize) {
        self.try_expand(n);
    }

    /// Makes room for at least `n` more elements and reports whether the
    /// storage was reallocated.
    pub fn try_expand(&mut self, n: usize) -> bool {
        let len = self.data.len();
        let required = len + n;
        let capacity = self.data.capacity();
        if required <= capacity {
            return false;
        }

        let target = self.policy.new_capacity(len, capacity, required);
        log::trace!("growing buffer from {} to {} elements", capacity, target);
        self.data.reserve_exact(target - len);
        true
    }

    pub fn push(&mut self, v: T) {
        self.ensure_free(1);
        self.data.push(v);
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.ensure_free(values.len());
        self.data.extend_from_slice(values);
    }

    /// Appends `range` of another array.
    pub fn extend_from(&mut self, other: &Array<T>, range: Range<usize>) {
        self.extend_from_slice(&other.data[range]);
    }

    pub fn get(&self, index: usize) -> T {
        self.data[index]
    }

    pub fn set(&mut self, index: usize, v: T) {
        self.data[index] = v;
    }

    pub fn last(&self) -> Option<T> {
        self.data.last().copied()
    }

    pub fn remove_last(&mut self) -> Option<T> {
        self.data.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Copy> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteArray {
    /// Reserves `n` zeroed bytes and returns the offset of the first one.
    pub fn skip(&mut self, n: usize) -> usize {
        let off = self.data.len();
        self.ensure_free(n);
        self.data.resize(off + n, 0);
        off
    }

    pub fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    /// u2 + u2 + u2, the shape of a member header.
    pub fn put_222(&mut self, v1: u16, v2: u16, v3: u16) {
        self.ensure_free(6);
        self.data.extend_from_slice(&v1.to_be_bytes());
        self.data.extend_from_slice(&v2.to_be_bytes());
        self.data.extend_from_slice(&v3.to_be_bytes());
    }

    /// u2 + u4, the shape of an attribute header.
    pub fn put_24(&mut self, v1: u16, v2: u32) {
        self.ensure_free(6);
        self.data.extend_from_slice(&v1.to_be_bytes());
        self.data.extend_from_slice(&v2.to_be_bytes());
    }

    /// u2 + u4 + u2, a whole attribute carrying a single u2.
    pub fn put_242(&mut self, v1: u16, v2: u32, v3: u16) {
        self.ensure_free(8);
        self.data.extend_from_slice(&v1.to_be_bytes());
        self.data.extend_from_slice(&v2.to_be_bytes());
        self.data.extend_from_slice(&v3.to_be_bytes());
    }

    /// u1 + u2, the shape of a single-reference constant.
    pub fn put_12(&mut self, v1: u8, v2: u16) {
        self.ensure_free(3);
        self.data.push(v1);
        self.data.extend_from_slice(&v2.to_be_bytes());
    }

    /// u1 + u1 + u2, the shape of a method handle constant.
    pub fn put_112(&mut self, v1: u8, v2: u8, v3: u16) {
        self.ensure_free(4);
        self.data.push(v1);
        self.data.push(v2);
        self.data.extend_from_slice(&v3.to_be_bytes());
    }

    pub fn set_u16(&mut self, off: usize, v: u16) {
        Pack::set_u16(&mut self.data, off, v)
    }

    pub fn set_u32(&mut self, off: usize, v: u32) {
        Pack::set_u32(&mut self.data, off, v)
    }

    pub fn set_u64(&mut self, off: usize, v: u64) {
        Pack::set_u64(&mut self.data, off, v)
    }

    pub fn u16_at(&self, off: usize) -> u16 {
        Pack::get_u16(&self.data, off)
    }

    pub fn u32_at(&self, off: usize) -> u32 {
        Pack::get_u32(&self.data, off)
    }

    pub fn u64_at(&self, off: usize) -> u64 {
        Pack::get_u64(&self.data, off)
    }

    pub fn match_u16(&self, off: usize, v: u16) -> bool {
        Pack::match_u16(&self.data, off, v)
    }

    pub fn match_u32(&self, off: usize, v: u32) -> bool {
        Pack::match_u32(&self.data, off, v)
    }

    pub fn match_u64(&self, off: usize, v: u64) -> bool {
        Pack::match_u64(&self.data, off, v)
    }

    /// Writes `value` as modified UTF-8 at the end, without a length prefix.
    /// Returns the number of bytes written.
    pub fn put_mutf8(&mut self, value: &str) -> usize {
        crate::mutf8::encode(value, self)
    }

    pub(crate) fn raw_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

#[cfg(test)]
mod buffer_tests {
    use super::*;

    #[test]
    fn it_should_double_below_the_threshold() {
        let policy = GrowthPolicy::POOL;
        assert_eq!(policy.new_capacity(100, 200, 201), 400);
        assert_eq!(policy.new_capacity(100, 200, 1000), 1000);
    }

    #[test]
    fn it_should_cap_growth_above_the_threshold() {
        let policy = GrowthPolicy::POOL;
        assert_eq!(policy.new_capacity(20_000, 20_000, 20_010), 23_200);
        assert_eq!(policy.new_capacity(20_000, 20_000, 30_000), 30_000);
    }

    #[test]
    fn it_should_report_reallocation() {
        let mut array = ByteArray::with_capacity(4);
        assert!(!array.try_expand(4));
        array.put_u32(1);
        assert!(array.try_expand(1));
        assert!(array.capacity() >= 8);
        assert!(!array.try_expand(4));
    }

    #[test]
    fn it_should_write_packed_headers() {
        let mut array = ByteArray::new();
        array.put_222(1, 2, 3);
        array.put_24(4, 5);
        array.put_242(6, 2, 7);
        array.put_12(8, 9);
        array.put_112(15, 6, 10);
        assert_eq!(
            array.as_slice(),
            &[
                0, 1, 0, 2, 0, 3, //
                0, 4, 0, 0, 0, 5, //
                0, 6, 0, 0, 0, 2, 0, 7, //
                8, 0, 9, //
                15, 6, 0, 10,
            ]
        );
    }

    #[test]
    fn it_should_backpatch_reserved_offsets() {
        let mut array = ByteArray::new();
        array.put_u8(0xFF);
        let off = array.skip(4);
        array.put_u16(0xABCD);
        array.set_u32(off, 0x0102_0304);

        assert_eq!(array.as_slice(), &[0xFF, 1, 2, 3, 4, 0xAB, 0xCD]);
        assert!(array.match_u32(off, 0x0102_0304));
        assert_eq!(array.u16_at(5), 0xABCD);
    }

    #[test]
    fn it_should_truncate_without_shifting() {
        let mut array = IntArray::new();
        array.push(1);
        array.push(2);
        array.push(3);
        assert_eq!(array.remove_last(), Some(3));
        assert_eq!(array.as_slice(), &[1, 2]);
        array.clear();
        assert!(array.is_empty());
    }

    #[test]
    fn it_should_append_a_range_of_another_array() {
        let mut source = ByteArray::new();
        source.extend_from_slice(&[1, 2, 3, 4, 5]);
        let mut target = ByteArray::new();
        target.extend_from(&source, 1..4);
        assert_eq!(target.as_slice(), &[2, 3, 4]);
    }
}
