//! Row models. Enum columns are kept as text here and converted into the
//! core's closed enums with `TryFrom`, so a schema mismatch surfaces as a
//! [`CoreError::UnknownVariant`](shiftwatch_core::CoreError::UnknownVariant).

pub mod notification;
pub mod user_preference;
