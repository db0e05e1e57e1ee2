use serde::{Deserialize, Deserializer};

/// A PATCH field that may be absent, explicitly `null`, or set.
///
/// Use with `#[serde(default, deserialize_with = "patch::nullable")]`:
/// absent stays `None`, `null` becomes `Some(None)`.
pub type Nullable<T> = Option<Option<T>>;

pub fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Splits a field into the "was sent" flag and the value to store.
pub fn split<T>(field: &Nullable<T>) -> (bool, Option<&T>) {
    (field.is_some(), field.as_ref().and_then(Option::as_ref))
}
