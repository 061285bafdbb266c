//! Dynamic column values.
//!
//! [`Value`] is what the facade binds as statement parameters and what it
//! decodes result columns into. Binding is driven by the parameter type the
//! server reports for each placeholder, so an `Int` bound to an `int4` column
//! is sent as a 32-bit integer and a `Text` bound to an integer column is
//! parsed first.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Numeric(v) => v.to_f64(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Int(v) => Some(Decimal::from(*v)),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Numeric(_) => "numeric",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to a JSON value. Dates and UUIDs become strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            // Kept as a string so no precision is lost.
            Value::Numeric(v) => Json::String(v.to_string()),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(v) => Json::Array(v.iter().map(|b| Json::from(*b)).collect()),
            Value::Json(v) => v.clone(),
            Value::Uuid(v) => Json::String(v.to_string()),
            Value::Date(v) => Json::String(v.to_string()),
            Value::Timestamp(v) => Json::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::TimestampTz(v) => Json::String(v.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Json(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampTz(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Numeric,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn is_text_type(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn mismatch(value: &Value, ty: &Type) -> Result<IsNull, BoxError> {
    Err(format!("cannot bind {} value to parameter of type {ty}", value.type_name()).into())
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => mismatch(&Value::Int(v), ty),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => mismatch(&Value::Float(v), ty),
    }
}

fn decimal_to_sql(v: &Decimal, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::NUMERIC => v.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID if v.fract().is_zero() => {
            let int = v
                .to_i64()
                .ok_or_else(|| format!("numeric {v} out of range for {ty}"))?;
            int_to_sql(int, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => {
            let float = v
                .to_f64()
                .ok_or_else(|| format!("numeric {v} out of range for {ty}"))?;
            float_to_sql(float, ty, out)
        }
        _ if is_text_type(ty) => v.to_string().to_sql(ty, out),
        _ => mismatch(&Value::Numeric(*v), ty),
    }
}

fn text_to_sql(v: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let trimmed = v.trim();
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            int_to_sql(trimmed.parse::<i64>()?, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => float_to_sql(trimmed.parse::<f64>()?, ty, out),
        Type::NUMERIC => trimmed.parse::<Decimal>()?.to_sql(ty, out),
        Type::BOOL => match trimmed.to_ascii_lowercase().as_str() {
            "t" | "true" | "1" | "yes" | "on" => true.to_sql(ty, out),
            "f" | "false" | "0" | "no" | "off" => false.to_sql(ty, out),
            _ => Err(format!("invalid boolean literal: {v}").into()),
        },
        Type::UUID => Uuid::parse_str(trimmed)?.to_sql(ty, out),
        Type::DATE => trimmed.parse::<NaiveDate>()?.to_sql(ty, out),
        Type::TIMESTAMP => trimmed.parse::<NaiveDateTime>()?.to_sql(ty, out),
        Type::TIMESTAMPTZ => trimmed.parse::<DateTime<Utc>>()?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out),
        Type::BYTEA => v.as_bytes().to_sql(ty, out),
        // Enums and domains over text take the raw string.
        _ => v.to_sql(ty, out),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(v) => int_to_sql(*v, ty, out),
            Value::Float(v) => float_to_sql(*v, ty, out),
            Value::Numeric(v) => decimal_to_sql(v, ty, out),
            Value::Text(v) => text_to_sql(v, ty, out),
            Value::Bytes(v) if *ty == Type::BYTEA => v.to_sql(ty, out),
            Value::Bytes(_) => mismatch(self, ty),
            _ if is_text_type(ty) => self.to_string().to_sql(ty, out),
            Value::Bool(v) if *ty == Type::BOOL => v.to_sql(ty, out),
            Value::Json(v) if matches!(*ty, Type::JSON | Type::JSONB) => v.to_sql(ty, out),
            Value::Uuid(v) if *ty == Type::UUID => v.to_sql(ty, out),
            Value::Date(v) if *ty == Type::DATE => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.to_sql(ty, out),
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                _ => mismatch(self, ty),
            },
            Value::TimestampTz(v) => match *ty {
                Type::TIMESTAMPTZ => v.to_sql(ty, out),
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => mismatch(self, ty),
            },
            _ => mismatch(self, ty),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Numeric(Decimal::from_sql(ty, raw)?),
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(Uuid::from_sql(ty, raw)?),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?),
            _ if is_text_type(ty) || matches!(ty.kind(), Kind::Enum(_)) => {
                Value::Text(String::from_sql(ty, raw)?)
            }
            _ => return Err(format!("unsupported column type {ty}").into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf)?;
        Ok(buf.to_vec())
    }

    #[test]
    fn int_is_narrowed_to_column_width() {
        assert_eq!(encode(&Value::Int(7), &Type::INT4).unwrap(), 7i32.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT2).unwrap(), 7i16.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT8).unwrap(), 7i64.to_be_bytes());
    }

    #[test]
    fn int_out_of_range_fails() {
        assert!(encode(&Value::Int(i64::from(i32::MAX) + 1), &Type::INT4).is_err());
    }

    #[test]
    fn text_is_parsed_for_numeric_columns() {
        assert_eq!(
            encode(&Value::from("42"), &Type::INT4).unwrap(),
            42i32.to_be_bytes()
        );
        assert!(encode(&Value::from("forty-two"), &Type::INT4).is_err());
    }

    #[test]
    fn text_to_text_column_is_raw_bytes() {
        assert_eq!(encode(&Value::from("John"), &Type::TEXT).unwrap(), b"John");
    }

    #[test]
    fn null_writes_nothing() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn option_none_is_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn numeric_binds_through_decimal() {
        let price: Decimal = "12345.50".parse().unwrap();
        let mut expected = BytesMut::new();
        price.to_sql(&Type::NUMERIC, &mut expected).unwrap();

        assert_eq!(encode(&Value::Numeric(price), &Type::NUMERIC).unwrap(), expected);
        assert_eq!(encode(&Value::from("12345.50"), &Type::NUMERIC).unwrap(), expected);

        let decoded = Value::from_sql(&Type::NUMERIC, &expected).unwrap();
        assert_eq!(decoded, Value::Numeric(price));
        assert_eq!(decoded.to_string(), "12345.50");
    }

    #[test]
    fn int_and_float_bind_to_numeric() {
        let decoded = |bytes: Vec<u8>| Value::from_sql(&Type::NUMERIC, &bytes).unwrap();
        assert_eq!(
            decoded(encode(&Value::Int(42), &Type::NUMERIC).unwrap()),
            Value::Numeric(Decimal::from(42))
        );
        assert_eq!(
            decoded(encode(&Value::Float(2.5), &Type::NUMERIC).unwrap()),
            Value::Numeric("2.5".parse().unwrap())
        );
        assert!(encode(&Value::Float(f64::NAN), &Type::NUMERIC).is_err());
    }

    #[test]
    fn numeric_rejects_garbage() {
        assert!(encode(&Value::from("1.2.3"), &Type::NUMERIC).is_err());
        assert!(encode(&Value::from("abc"), &Type::NUMERIC).is_err());
    }

    #[test]
    fn whole_numeric_binds_to_integer_column() {
        let ten = Value::Numeric(Decimal::from(10));
        assert_eq!(encode(&ten, &Type::INT4).unwrap(), 10i32.to_be_bytes());
        assert!(encode(&Value::Numeric("1.5".parse().unwrap()), &Type::INT4).is_err());
    }

    #[test]
    fn incompatible_parameter_types_fail_cleanly() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let cases = [
            (Value::Bool(true), Type::INT4),
            (Value::Date(day), Type::INT8),
            (Value::Timestamp(day.and_hms_opt(12, 0, 0).unwrap()), Type::DATE),
            (Value::TimestampTz(Utc::now()), Type::BOOL),
            (Value::Uuid(Uuid::nil()), Type::INT4),
            (Value::Bytes(vec![1, 2]), Type::TEXT),
            (Value::Json(serde_json::json!({"a": 1})), Type::INT4),
        ];
        for (value, ty) in cases {
            let err = encode(&value, &ty).unwrap_err();
            assert!(
                err.to_string().contains(value.type_name()),
                "{value:?} as {ty}: {err}"
            );
        }
    }

    #[test]
    fn values_bind_as_text_for_text_columns() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(encode(&Value::Bool(true), &Type::TEXT).unwrap(), b"true");
        assert_eq!(encode(&Value::Date(day), &Type::VARCHAR).unwrap(), b"2024-02-29");
    }

    #[test]
    fn timestamps_convert_between_zoned_and_naive() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let mut expected = BytesMut::new();
        naive.and_utc().to_sql(&Type::TIMESTAMPTZ, &mut expected).unwrap();
        assert_eq!(encode(&Value::Timestamp(naive), &Type::TIMESTAMPTZ).unwrap(), expected);
    }

    #[test]
    fn decode_common_types() {
        let v = Value::from_sql(&Type::INT4, &5i32.to_be_bytes()).unwrap();
        assert_eq!(v, Value::Int(5));

        let v = Value::from_sql(&Type::VARCHAR, b"John").unwrap();
        assert_eq!(v, Value::Text("John".into()));

        let v = Value::from_sql(&Type::BOOL, &[1]).unwrap();
        assert_eq!(v, Value::Bool(true));

        assert_eq!(Value::from_sql_null(&Type::TEXT).unwrap(), Value::Null);
    }

    #[test]
    fn decode_unsupported_type_fails() {
        assert!(Value::from_sql(&Type::POINT, &[0; 16]).is_err());
    }

    #[test]
    fn json_conversion() {
        assert_eq!(Value::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
        assert_eq!(Value::from("a").to_json(), serde_json::json!("a"));
    }
}
