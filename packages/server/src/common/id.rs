//! Typed UUID wrappers for compile-time type safety.
//!
//! `Id<T>` wraps a `uuid::Uuid` with a phantom entity marker so that IDs of
//! different entities cannot be mixed up (e.g. passing a `ListingId` where a
//! `CategoryId` was expected is a compile error). V7 UUIDs are used for
//! primary keys to keep index locality and natural chronological ordering.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// UUID version 7 marker (time-ordered UUIDs).
pub struct V7;

/// A typed wrapper around `Uuid`.
///
/// The type parameter `T` is the entity marker this ID belongs to.
#[repr(transparent)]
pub struct Id<T, V = V7>(Uuid, PhantomData<fn() -> (T, V)>);

impl<T> Id<T, V7> {
    /// Creates a new V7 UUID (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7(), PhantomData)
    }
}

impl<T> Default for Id<T, V7> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> Id<T, V> {
    /// Creates an `Id` from a raw `Uuid` (database loads, deserialization).
    #[inline]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, PhantomData)
    }

    /// Returns the inner `Uuid`.
    #[inline]
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Parses an `Id` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    #[inline]
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?, PhantomData))
    }

    /// Returns a reference to the inner `Uuid`.
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Creates a nil (all zeros) ID. Useful for tests and sentinels.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil(), PhantomData)
    }
}

// ============================================================================
// Standard trait implementations
// ============================================================================

impl<T, V> Clone for Id<T, V> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Id<T, V> {}

impl<T, V> Debug for Id<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Id<{}>", std::any::type_name::<T>()))
            .field(&self.0)
            .finish()
    }
}

impl<T, V> Display for Id<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T, V> PartialEq for Id<T, V> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T, V> Eq for Id<T, V> {}

impl<T, V> PartialOrd for Id<T, V> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, V> Ord for Id<T, V> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T, V> Hash for Id<T, V> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T, V> AsRef<Uuid> for Id<T, V> {
    #[inline]
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl<T, V> From<Uuid> for Id<T, V> {
    #[inline]
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T, V> From<Id<T, V>> for Uuid {
    #[inline]
    fn from(id: Id<T, V>) -> Self {
        id.0
    }
}

impl<T, V> FromStr for Id<T, V> {
    type Err = uuid::Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Serde support
// ============================================================================

impl<T, V> Serialize for Id<T, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T, V> Deserialize<'de> for Id<T, V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

// ============================================================================
// sqlx support
// ============================================================================

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgHasArrayType, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, Type};

impl<T, V> Type<Postgres> for Id<T, V> {
    fn type_info() -> PgTypeInfo {
        <Uuid as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <Uuid as Type<Postgres>>::compatible(ty)
    }
}

impl<T, V> PgHasArrayType for Id<T, V> {
    fn array_type_info() -> PgTypeInfo {
        <Uuid as PgHasArrayType>::array_type_info()
    }
}

impl<T, V> Encode<'_, Postgres> for Id<T, V> {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <Uuid as Encode<Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<T, V> Decode<'_, Postgres> for Id<T, V> {
    fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
        <Uuid as Decode<Postgres>>::decode(value).map(Self::from_uuid)
    }
}
