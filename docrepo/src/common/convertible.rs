use crate::common::{Document, ObjectId, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, Utc};

/// Conversion between a Rust type and the [Value] form the store works with.
///
/// Every stored type implements this trait, usually through `#[derive(Convertible)]`
/// from the `docrepo_derive` crate. Struct types convert to [`Value::Document`].
pub trait Convertible {
    type Output;

    fn to_value(&self) -> RepoResult<Value>;
    fn from_value(value: &Value) -> RepoResult<Self::Output>;
}

fn mapping_error(expected: &str, value: &Value) -> RepoError {
    log::error!("Value {} is not {}", value, expected);
    RepoError::new(
        &format!("Value is not {}, found {}", expected, value.kind_name()),
        ErrorKind::ObjectMappingError,
    )
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value.as_bool().ok_or_else(|| mapping_error("a bool", value))
    }
}

macro_rules! impl_convertible_for_int {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl Convertible for $ty {
                type Output = $ty;

                fn to_value(&self) -> RepoResult<Value> {
                    let wide = i64::try_from(*self)?;
                    match i32::try_from(wide) {
                        Ok(narrow) if std::mem::size_of::<$ty>() <= 4 => Ok(Value::I32(narrow)),
                        _ => Ok(Value::I64(wide)),
                    }
                }

                fn from_value(value: &Value) -> RepoResult<Self> {
                    let wide = value.as_integer().ok_or_else(|| mapping_error($name, value))?;
                    Ok(<$ty>::try_from(wide)?)
                }
            }
        )+
    };
}

impl_convertible_for_int! {
    i8 => "an i8",
    i16 => "an i16",
    i32 => "an i32",
    i64 => "an i64",
    u8 => "a u8",
    u16 => "a u16",
    u32 => "a u32",
    u64 => "a u64",
    usize => "a usize",
    isize => "an isize",
}

impl Convertible for f32 {
    type Output = f32;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::F64(*self as f64))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| mapping_error("an f32", value))
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value.as_f64().ok_or_else(|| mapping_error("an f64", value))
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| mapping_error("a string", value))
    }
}

impl Convertible for ObjectId {
    type Output = ObjectId;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::ObjectId(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::ObjectId(id) => Ok(*id),
            Value::String(hex) => hex.parse(),
            _ => Err(mapping_error("an object id", value)),
        }
    }
}

impl Convertible for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value
            .as_datetime()
            .copied()
            .ok_or_else(|| mapping_error("a datetime", value))
    }
}

impl Convertible for Document {
    type Output = Document;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value
            .as_document()
            .cloned()
            .ok_or_else(|| mapping_error("a document", value))
    }
}

impl Convertible for Value {
    type Output = Value;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        Ok(value.clone())
    }
}

impl<T> Convertible for Option<T>
where
    T: Convertible,
{
    type Output = Option<T::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}

impl<T> Convertible for Box<T>
where
    T: Convertible,
{
    type Output = Box<T::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        self.as_ref().to_value()
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        Ok(Box::new(T::from_value(value)?))
    }
}

impl<T> Convertible for Vec<T>
where
    T: Convertible,
{
    type Output = Vec<T::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        let mut arr = Vec::with_capacity(self.len());
        for item in self {
            arr.push(item.to_value()?);
        }
        Ok(Value::Array(arr))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Array(arr) => arr.iter().map(T::from_value).collect(),
            _ => Err(mapping_error("an array", value)),
        }
    }
}

pub fn from_value<T>(value: &Value) -> RepoResult<T::Output>
where
    T: Convertible,
{
    T::from_value(value)
}

pub fn to_value<T>(data: &T) -> RepoResult<Value>
where
    T: Convertible,
{
    data.to_value()
}

/// Converts a typed value into a [Document], failing if it does not convert to one.
pub fn to_document<T>(data: &T) -> RepoResult<Document>
where
    T: Convertible,
{
    match data.to_value()? {
        Value::Document(doc) => Ok(doc),
        other => Err(mapping_error("a document", &other)),
    }
}

/// Reads field `name` of `doc` as `T`, treating a missing or null field as `T::default()`.
///
/// Used by the `Convertible` derive so that documents written by older versions of a type,
/// or fields omitted because they were zero, still decode.
pub fn field_or_default<T>(doc: &Document, name: &str) -> RepoResult<T>
where
    T: Convertible<Output = T> + Default,
{
    match doc.get(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::from_value(value).map_err(|err| {
            RepoError::new_with_cause(
                &format!("Failed to decode field '{}'", name),
                ErrorKind::ObjectMappingError,
                err,
            )
        }),
    }
}
