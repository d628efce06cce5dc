//! Attribute tables for filtered object parsing.
//!
//! An [`ObjDesc`] names the keys a caller wants extracted from an object,
//! each with its expected [`Type`]. The table must be sorted by key in
//! ascending byte order; lookups are binary searches.

use core::cmp::Ordering;

use crate::val::Type;

/// One expected object attribute: a key and the type its value must have.
///
/// Declaring [`Type::Float`] also matches integer values (integers are a
/// subset of floats); declaring [`Type::Void`] matches any type.
#[derive(Debug, Clone, Copy)]
pub struct ObjAttr {
    pub key: &'static str,
    pub ty: Type,
}

impl ObjAttr {
    #[must_use]
    pub const fn new(key: &'static str, ty: Type) -> Self {
        Self { key, ty }
    }
}

/// A description of the attributes to extract from an object.
#[derive(Debug, Clone, Copy)]
pub struct ObjDesc<'a> {
    /// Attribute list, sorted by key in ascending byte order.
    pub attrs: &'a [ObjAttr],
}

impl<'a> ObjDesc<'a> {
    #[must_use]
    pub const fn new(attrs: &'a [ObjAttr]) -> Self {
        Self { attrs }
    }

    /// Index of `key` in the attribute list.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<usize> {
        lookup(self.attrs, key, |attr| attr.key)
    }
}

/// The empty attribute list.
///
/// Distinguishable from "no list at all": passed as the ignore list it makes
/// every unknown key produce a warning, while passing `None` accepts all
/// unknown keys silently.
pub const EMPTY: ObjDesc<'static> = ObjDesc::new(&[]);

/// Binary search over a key-sorted slice.
///
/// Half-open-interval search that finishes by checking both remaining
/// endpoints; this keeps the loop body free of off-by-one adjustments and
/// works unchanged on zero, one and two element slices.
pub fn lookup<T>(arr: &[T], key: &str, key_of: impl Fn(&T) -> &str) -> Option<usize> {
    if arr.is_empty() {
        return None;
    }

    let mut l = 0;
    let mut r = arr.len() - 1;
    let mut mid = usize::MAX;

    while r - l > 1 {
        mid = (l + r) / 2;

        match key_of(&arr[mid]).cmp(key) {
            Ordering::Equal => return Some(mid),
            Ordering::Less => l = mid,
            Ordering::Greater => r = mid,
        }
    }

    if r != mid && key_of(&arr[r]) == key {
        return Some(r);
    }

    if l != mid && key_of(&arr[l]) == key {
        return Some(l);
    }

    None
}
