//! Type-erased collider objects
//!
//! A [`ColliderObject`] holds exactly one value from the closed catalogue of
//! collision subjects. Its [`ColliderKind`] tag always matches the held
//! value and indexes the dispatch tables in [`crate::physics::dispatch`].
//! Typed access goes through [`ColliderVariant`] and fails with
//! [`CollisionError::InvalidType`] on a mismatch.

use crate::error::CollisionError;
use crate::foundation::math::Mat3;
use crate::physics::bvh::{Bvh, TBvh};
use crate::physics::compound::{Compound, TCompound};
use crate::physics::primitive::{Primitive, TPrimitive};
use crate::physics::shapes::{Aabb, Kdop2, Kdop3, Kdop4, Obb};

/// Kind tag of a collider object
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColliderKind {
    /// Single untransformed primitive
    Primitive,
    /// Single primitive with its own transform
    TPrimitive,
    /// Set of primitives
    Compound,
    /// Set of primitives with a shared transform
    TCompound,
    /// Hierarchy bounded by boxes
    BvhAabb,
    /// Hierarchy bounded by oriented boxes
    BvhObb,
    /// Hierarchy bounded by box k-DOPs
    BvhKdop2,
    /// Hierarchy bounded by hexagonal k-DOPs
    BvhKdop3,
    /// Hierarchy bounded by octagonal k-DOPs
    BvhKdop4,
    /// Transformed hierarchy bounded by boxes
    TBvhAabb,
    /// Transformed hierarchy bounded by oriented boxes
    TBvhObb,
    /// Transformed hierarchy bounded by box k-DOPs
    TBvhKdop2,
    /// Transformed hierarchy bounded by hexagonal k-DOPs
    TBvhKdop3,
    /// Transformed hierarchy bounded by octagonal k-DOPs
    TBvhKdop4,
}

impl ColliderKind {
    /// Number of kinds (dispatch table dimension)
    pub const COUNT: usize = 14;

    /// Every kind in tag order
    pub const ALL: [ColliderKind; Self::COUNT] = [
        Self::Primitive,
        Self::TPrimitive,
        Self::Compound,
        Self::TCompound,
        Self::BvhAabb,
        Self::BvhObb,
        Self::BvhKdop2,
        Self::BvhKdop3,
        Self::BvhKdop4,
        Self::TBvhAabb,
        Self::TBvhObb,
        Self::TBvhKdop2,
        Self::TBvhKdop3,
        Self::TBvhKdop4,
    ];

    /// Dispatch table index
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primitive => "Primitive",
            Self::TPrimitive => "TPrimitive",
            Self::Compound => "Compound",
            Self::TCompound => "TCompound",
            Self::BvhAabb => "Bvh<Aabb>",
            Self::BvhObb => "Bvh<Obb>",
            Self::BvhKdop2 => "Bvh<Kdop2>",
            Self::BvhKdop3 => "Bvh<Kdop3>",
            Self::BvhKdop4 => "Bvh<Kdop4>",
            Self::TBvhAabb => "TBvh<Aabb>",
            Self::TBvhObb => "TBvh<Obb>",
            Self::TBvhKdop2 => "TBvh<Kdop2>",
            Self::TBvhKdop3 => "TBvh<Kdop3>",
            Self::TBvhKdop4 => "TBvh<Kdop4>",
        }
    }

    /// Whether objects of this kind carry their own transform
    pub const fn is_transformed(self) -> bool {
        matches!(
            self,
            Self::TPrimitive
                | Self::TCompound
                | Self::TBvhAabb
                | Self::TBvhObb
                | Self::TBvhKdop2
                | Self::TBvhKdop3
                | Self::TBvhKdop4
        )
    }
}

/// One value from the closed catalogue of collision subjects
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderObject {
    /// Single untransformed primitive
    Primitive(Primitive),
    /// Single primitive with its own transform
    TPrimitive(TPrimitive),
    /// Set of primitives
    Compound(Compound),
    /// Set of primitives with a shared transform
    TCompound(TCompound),
    /// Hierarchy bounded by boxes
    BvhAabb(Bvh<Aabb>),
    /// Hierarchy bounded by oriented boxes
    BvhObb(Bvh<Obb>),
    /// Hierarchy bounded by box k-DOPs
    BvhKdop2(Bvh<Kdop2>),
    /// Hierarchy bounded by hexagonal k-DOPs
    BvhKdop3(Bvh<Kdop3>),
    /// Hierarchy bounded by octagonal k-DOPs
    BvhKdop4(Bvh<Kdop4>),
    /// Transformed hierarchy bounded by boxes
    TBvhAabb(TBvh<Aabb>),
    /// Transformed hierarchy bounded by oriented boxes
    TBvhObb(TBvh<Obb>),
    /// Transformed hierarchy bounded by box k-DOPs
    TBvhKdop2(TBvh<Kdop2>),
    /// Transformed hierarchy bounded by hexagonal k-DOPs
    TBvhKdop3(TBvh<Kdop3>),
    /// Transformed hierarchy bounded by octagonal k-DOPs
    TBvhKdop4(TBvh<Kdop4>),
}

/// A concrete type that a [`ColliderObject`] can hold
pub trait ColliderVariant: Sized {
    /// Tag of objects holding this type
    const KIND: ColliderKind;

    /// Borrow the held value if the tag matches
    fn extract(object: &ColliderObject) -> Option<&Self>;

    /// Mutably borrow the held value if the tag matches
    fn extract_mut(object: &mut ColliderObject) -> Option<&mut Self>;

    /// Wrap a value into an object
    fn into_object(self) -> ColliderObject;
}

macro_rules! collider_variants {
    ($($variant:ident => $ty:ty,)*) => {
        $(
            impl ColliderVariant for $ty {
                const KIND: ColliderKind = ColliderKind::$variant;

                fn extract(object: &ColliderObject) -> Option<&Self> {
                    match object {
                        ColliderObject::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn extract_mut(object: &mut ColliderObject) -> Option<&mut Self> {
                    match object {
                        ColliderObject::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn into_object(self) -> ColliderObject {
                    ColliderObject::$variant(self)
                }
            }

            impl From<$ty> for ColliderObject {
                fn from(value: $ty) -> Self {
                    ColliderObject::$variant(value)
                }
            }
        )*

        impl ColliderObject {
            /// Kind tag of the held value
            pub fn kind(&self) -> ColliderKind {
                match self {
                    $(Self::$variant(_) => ColliderKind::$variant,)*
                }
            }
        }
    };
}

collider_variants! {
    Primitive => Primitive,
    TPrimitive => TPrimitive,
    Compound => Compound,
    TCompound => TCompound,
    BvhAabb => Bvh<Aabb>,
    BvhObb => Bvh<Obb>,
    BvhKdop2 => Bvh<Kdop2>,
    BvhKdop3 => Bvh<Kdop3>,
    BvhKdop4 => Bvh<Kdop4>,
    TBvhAabb => TBvh<Aabb>,
    TBvhObb => TBvh<Obb>,
    TBvhKdop2 => TBvh<Kdop2>,
    TBvhKdop3 => TBvh<Kdop3>,
    TBvhKdop4 => TBvh<Kdop4>,
}

impl ColliderObject {
    /// Create an object holding `value`
    pub fn new<T: ColliderVariant>(value: T) -> Self {
        value.into_object()
    }

    /// Borrow the held value as `T`
    pub fn get<T: ColliderVariant>(&self) -> Result<&T, CollisionError> {
        let found = self.kind().name();
        T::extract(self).ok_or(CollisionError::InvalidType {
            expected: T::KIND.name(),
            found,
        })
    }

    /// Mutably borrow the held value as `T`
    pub fn get_mut<T: ColliderVariant>(&mut self) -> Result<&mut T, CollisionError> {
        let found = self.kind().name();
        T::extract_mut(self).ok_or(CollisionError::InvalidType {
            expected: T::KIND.name(),
            found,
        })
    }

    /// Replace the held value with another value of the same kind
    pub fn set<T: ColliderVariant>(&mut self, value: T) -> Result<(), CollisionError> {
        *self.get_mut::<T>()? = value;
        Ok(())
    }

    /// Whether the held value is a `T`
    pub fn is<T: ColliderVariant>(&self) -> bool {
        self.kind() == T::KIND
    }

    /// Current world matrix of a transformed object
    pub fn matrix(&self) -> Result<&Mat3, CollisionError> {
        match self {
            Self::TPrimitive(t) => Ok(t.matrix()),
            Self::TCompound(t) => Ok(t.matrix()),
            Self::TBvhAabb(t) => Ok(t.matrix()),
            Self::TBvhObb(t) => Ok(t.matrix()),
            Self::TBvhKdop2(t) => Ok(t.matrix()),
            Self::TBvhKdop3(t) => Ok(t.matrix()),
            Self::TBvhKdop4(t) => Ok(t.matrix()),
            other => Err(CollisionError::InvalidType {
                expected: "transformed collider",
                found: other.kind().name(),
            }),
        }
    }

    /// Replace the world matrix of a transformed object
    ///
    /// The object is marked dirty and its world-space shape is rebaked on
    /// the next read.
    pub fn set_matrix(&mut self, matrix: Mat3) -> Result<(), CollisionError> {
        match self {
            Self::TPrimitive(t) => t.set_matrix(matrix),
            Self::TCompound(t) => t.set_matrix(matrix),
            Self::TBvhAabb(t) => t.set_matrix(matrix),
            Self::TBvhObb(t) => t.set_matrix(matrix),
            Self::TBvhKdop2(t) => t.set_matrix(matrix),
            Self::TBvhKdop3(t) => t.set_matrix(matrix),
            Self::TBvhKdop4(t) => t.set_matrix(matrix),
            other => {
                return Err(CollisionError::InvalidType {
                    expected: "transformed collider",
                    found: other.kind().name(),
                })
            }
        }
        Ok(())
    }
}
