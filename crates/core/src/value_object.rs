//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Each value object lists its attributes once, in declaration
//! order, through [`ValueObject::fields`]; equality and hashing are derived from that list.
//!
//! ## Comparison rules
//!
//! - The same instance on both sides is always equal.
//! - Every attribute pair must match. A [`Field::Null`] on either side never matches,
//!   not even another `Null`.
//! - Attributes that hold a value object of the same family are declared with
//!   [`Field::same_family`] and compare by instance identity. This keeps self-referencing
//!   graphs from recursing.
//!
//! ## Hashing
//!
//! Starting from a seed of 31, each present attribute folds in as
//! `hash * multiplier + value_hash`, with the multiplier alternating 114, 59, 114, ...
//! between present attributes. An absent attribute XORs `13 * position` (1-based) into the
//! running hash instead, so `{a, null, null, a}` and `{null, a, a, null}` hash apart.

use core::any::Any;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::hash::DefaultHasher;

use crate::validation::Validate;

const HASH_SEED: i32 = 31;
const FIRST_MULTIPLIER: i32 = 114;
const SECOND_MULTIPLIER: i32 = 59;
const NULL_POSITION_FACTOR: i32 = 13;

/// An attribute value that can take part in structural comparison.
///
/// Implemented for every `PartialEq + Hash + Debug + 'static` type, so strings, numbers,
/// enums and nested value objects all qualify.
pub trait FieldValue: fmt::Debug {
    /// Compares against another attribute value. Values of a different concrete type are
    /// never equal.
    fn eq_field(&self, other: &dyn FieldValue) -> bool;

    /// Deterministic hash of the value.
    fn field_hash(&self) -> i32;

    fn as_any(&self) -> &dyn Any;
}

impl<T> FieldValue for T
where
    T: PartialEq + Hash + fmt::Debug + 'static,
{
    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn field_hash(&self) -> i32 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        // Truncation is intended: the engine works on 32-bit hash codes.
        hasher.finish() as i32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One attribute of a value object, tagged with how it takes part in comparison.
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    /// Absent attribute. Never equal to anything.
    Null,
    /// Present attribute compared by value.
    Value(&'a dyn FieldValue),
    /// Attribute of the owning value object's family, compared by instance identity.
    Identity(&'a dyn Any),
}

impl<'a> Field<'a> {
    pub fn value<T: FieldValue>(value: &'a T) -> Self {
        Field::Value(value)
    }

    /// Maps `None` to [`Field::Null`].
    pub fn optional<T: FieldValue>(value: Option<&'a T>) -> Self {
        match value {
            Some(v) => Field::Value(v),
            None => Field::Null,
        }
    }

    /// Declares a self-referencing attribute (a value object of the same family).
    pub fn same_family<T: ValueObject>(value: Option<&'a T>) -> Self {
        match value {
            Some(v) => Field::Identity(v),
            None => Field::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    fn matches(&self, other: &Field<'_>) -> bool {
        match (self, other) {
            (Field::Value(left), Field::Value(right)) => left.eq_field(*right),
            (Field::Identity(left), Field::Identity(right)) => {
                core::ptr::addr_eq(*left as *const dyn Any, *right as *const dyn Any)
            }
            _ => false,
        }
    }

    fn hash_part(&self) -> Option<i32> {
        match self {
            Field::Null => None,
            Field::Value(value) => Some(value.field_hash()),
            Field::Identity(value) => {
                let address = (*value as *const dyn Any).cast::<()>() as usize;
                Some(address.field_hash())
            }
        }
    }
}

/// Value object: immutable by contract, compared by its attribute values.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Implementors usually wire `PartialEq` and `Hash` through [`value_semantics!`](crate::value_semantics):
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Money {
///     amount: Option<i64>,
///     currency: Option<String>,
/// }
///
/// impl ValueObject for Money {
///     fn fields(&self) -> Vec<Field<'_>> {
///         vec![
///             Field::optional(self.amount.as_ref()),
///             Field::optional(self.currency.as_ref()),
///         ]
///     }
/// }
///
/// nlayer_core::value_semantics!(Money);
/// ```
pub trait ValueObject: Validate + fmt::Debug + 'static {
    /// Every public attribute, in declaration order.
    fn fields(&self) -> Vec<Field<'_>>;

    /// Compares against an arbitrary value; other types are simply not equal.
    fn equals_any(&self, other: &dyn Any) -> bool
    where
        Self: Sized,
    {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| equals(self, other))
    }

    fn hash_code(&self) -> i32 {
        hash_code(self)
    }
}

/// Structural equality of two value objects of the same type.
pub fn equals<T: ValueObject + ?Sized>(left: &T, right: &T) -> bool {
    if core::ptr::addr_eq(left, right) {
        return true;
    }

    let left_fields = left.fields();
    let right_fields = right.fields();
    if left_fields.len() != right_fields.len() {
        return false;
    }

    left_fields
        .iter()
        .zip(right_fields.iter())
        .all(|(l, r)| l.matches(r))
}

/// Structural hash code of a value object.
pub fn hash_code<T: ValueObject + ?Sized>(value: &T) -> i32 {
    let mut hash = HASH_SEED;
    let mut use_second = false;

    for (position, field) in (1i32..).zip(value.fields().iter()) {
        match field.hash_part() {
            Some(part) => {
                let multiplier = if use_second {
                    SECOND_MULTIPLIER
                } else {
                    FIRST_MULTIPLIER
                };
                hash = hash.wrapping_mul(multiplier).wrapping_add(part);
                use_second = !use_second;
            }
            None => hash ^= position.wrapping_mul(NULL_POSITION_FACTOR),
        }
    }

    hash
}

/// Implements `PartialEq` and `Hash` for a [`ValueObject`] using the structural engine.
///
/// No `Eq`: absent attributes make equality non-reflexive between distinct instances.
#[macro_export]
macro_rules! value_semantics {
    ($t:ty) => {
        impl ::core::cmp::PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::value_object::equals(self, other)
            }
        }

        impl ::core::hash::Hash for $t {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                state.write_i32($crate::value_object::hash_code(self));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::validation::ValidationResult;

    #[derive(Debug, Clone)]
    struct Quad {
        a: Option<String>,
        b: Option<String>,
        c: Option<String>,
        d: Option<String>,
    }

    impl Quad {
        fn new(a: Option<&str>, b: Option<&str>, c: Option<&str>, d: Option<&str>) -> Self {
            Self {
                a: a.map(str::to_string),
                b: b.map(str::to_string),
                c: c.map(str::to_string),
                d: d.map(str::to_string),
            }
        }
    }

    impl Validate for Quad {
        fn validate(&self) -> Vec<ValidationResult> {
            Vec::new()
        }
    }

    impl ValueObject for Quad {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::optional(self.a.as_ref()),
                Field::optional(self.b.as_ref()),
                Field::optional(self.c.as_ref()),
                Field::optional(self.d.as_ref()),
            ]
        }
    }

    crate::value_semantics!(Quad);

    #[derive(Debug)]
    struct Node {
        label: Option<String>,
        parent: Option<Arc<Node>>,
    }

    impl Validate for Node {
        fn validate(&self) -> Vec<ValidationResult> {
            Vec::new()
        }
    }

    impl ValueObject for Node {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::optional(self.label.as_ref()),
                Field::same_family(self.parent.as_deref()),
            ]
        }
    }

    crate::value_semantics!(Node);

    #[derive(Debug)]
    struct Empty;

    impl Validate for Empty {
        fn validate(&self) -> Vec<ValidationResult> {
            Vec::new()
        }
    }

    impl ValueObject for Empty {
        fn fields(&self) -> Vec<Field<'_>> {
            Vec::new()
        }
    }

    fn node(label: &str, parent: Option<Arc<Node>>) -> Node {
        Node {
            label: Some(label.to_string()),
            parent,
        }
    }

    #[test]
    fn identical_values_are_equal() {
        let left = Quad::new(Some("a"), Some("b"), Some("c"), Some("d"));
        let right = Quad::new(Some("a"), Some("b"), Some("c"), Some("d"));

        assert!(left == right);
        assert_eq!(left.hash_code(), right.hash_code());
    }

    #[test]
    fn one_differing_attribute_is_not_equal() {
        let left = Quad::new(Some("a"), Some("b"), Some("c"), Some("d"));
        let right = Quad::new(Some("a"), Some("x"), Some("c"), Some("d"));

        assert!(left != right);
    }

    #[test]
    fn null_never_equals_null() {
        let left = Quad::new(Some("a"), None, Some("c"), Some("d"));
        let right = Quad::new(Some("a"), None, Some("c"), Some("d"));

        assert!(left != right);
    }

    #[test]
    fn null_on_one_side_is_not_equal() {
        let left = Quad::new(Some("a"), Some("b"), Some("c"), Some("d"));
        let right = Quad::new(Some("a"), None, Some("c"), Some("d"));

        assert!(left != right);
        assert!(right != left);
    }

    #[test]
    fn same_instance_is_equal_even_with_nulls() {
        let value = Quad::new(None, None, None, None);

        assert!(equals(&value, &value));
    }

    #[test]
    fn mirrored_null_positions_hash_differently() {
        let left = Quad::new(Some("A"), None, None, Some("A"));
        let right = Quad::new(None, Some("A"), Some("A"), None);

        assert_ne!(left.hash_code(), right.hash_code());
    }

    #[test]
    fn hash_of_all_null_attributes_folds_positions() {
        let value = Quad::new(None, None, None, None);

        assert_eq!(value.hash_code(), 31 ^ 13 ^ 26 ^ 39 ^ 52);
    }

    #[test]
    fn hash_uses_alternating_multipliers() {
        let value = Quad::new(Some("a"), Some("b"), None, Some("d"));
        let a = "a".to_string().field_hash();
        let b = "b".to_string().field_hash();
        let d = "d".to_string().field_hash();

        let mut expected = 31i32.wrapping_mul(114).wrapping_add(a);
        expected = expected.wrapping_mul(59).wrapping_add(b);
        expected ^= 3 * 13;
        expected = expected.wrapping_mul(114).wrapping_add(d);

        assert_eq!(value.hash_code(), expected);
    }

    #[test]
    fn same_family_attributes_compare_by_identity() {
        let shared = Arc::new(node("root", None));
        let left = node("child", Some(shared.clone()));
        let right = node("child", Some(shared));

        assert!(left == right);
        assert_eq!(left.hash_code(), right.hash_code());
    }

    #[test]
    fn equal_but_distinct_parents_are_not_equal() {
        let left = node("child", Some(Arc::new(node("root", None))));
        let right = node("child", Some(Arc::new(node("root", None))));

        assert!(left != right);
    }

    #[test]
    fn incompatible_types_are_not_equal() {
        let quad = Quad::new(Some("a"), Some("b"), Some("c"), Some("d"));

        assert!(!quad.equals_any(&"a"));
        assert!(!quad.equals_any(&Empty));
        assert!(quad.equals_any(&quad.clone()));
    }

    #[test]
    fn value_objects_without_attributes_are_equal() {
        assert!(equals(&Empty, &Empty));
        assert_eq!(Empty.hash_code(), 31);
    }

    #[test]
    fn values_of_different_types_do_not_match() {
        let number = 1i32;
        let text = "1".to_string();

        assert!(!Field::value(&number).matches(&Field::value(&text)));
    }

    proptest! {
        #[test]
        fn equal_attribute_values_give_equal_hashes(
            a in "[a-z]{1,8}",
            b in "[a-z]{1,8}",
            c in "[a-z]{1,8}",
            d in "[a-z]{1,8}",
        ) {
            let left = Quad::new(Some(a.as_str()), Some(b.as_str()), Some(c.as_str()), Some(d.as_str()));
            let right = Quad::new(Some(a.as_str()), Some(b.as_str()), Some(c.as_str()), Some(d.as_str()));

            prop_assert!(left == right);
            prop_assert_eq!(left.hash_code(), right.hash_code());
        }

        #[test]
        fn changing_one_attribute_breaks_equality(
            values in proptest::collection::vec("[a-z]{1,8}", 4),
            position in 0usize..4,
        ) {
            let mut changed = values.clone();
            changed[position].push('!');
            let at = |list: &[String], i: usize| Some(list[i].clone());
            let left = Quad { a: at(&values, 0), b: at(&values, 1), c: at(&values, 2), d: at(&values, 3) };
            let right = Quad { a: at(&changed, 0), b: at(&changed, 1), c: at(&changed, 2), d: at(&changed, 3) };

            prop_assert!(left != right);
        }

        #[test]
        fn any_null_attribute_breaks_equality(
            values in proptest::collection::vec("[a-z]{1,8}", 4),
            position in 0usize..4,
        ) {
            let pick = |i: usize| if i == position { None } else { Some(values[i].as_str()) };
            let left = Quad::new(pick(0), pick(1), pick(2), pick(3));
            let right = Quad::new(pick(0), pick(1), pick(2), pick(3));

            prop_assert!(left != right);
            prop_assert!(equals(&left, &left));
        }
    }
}
