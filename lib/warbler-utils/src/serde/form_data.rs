//! Deserializer for `application/x-www-form-urlencoded` bodies and query
//! strings into plain structs of `String` / `Option<String>` fields.
//! Decodes percent escapes and `+` as space. A key without text after the
//! `=` yields an empty string.

use std::fmt::Display;

use serde::{de, Deserialize};

pub fn from_str<'a, T>(s: &'a str) -> Result<T, Error>
where
    T: Deserialize<'a>,
{
    let deserializer = FormDataDeserializer::new(s);
    let t = T::deserialize(deserializer)?;
    Ok(t)
}

#[derive(Debug, PartialEq)]
pub enum Error {
    CustomMessage(String),
    Unsupported(&'static str),
    MissingKey(String),
    ValueWithoutKey,
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::CustomMessage(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::CustomMessage(msg) => formatter.write_str(msg),
            Error::Unsupported(s) => write!(formatter, "unsupported operation: {s}"),
            Error::MissingKey(s) => write!(formatter, "can't parse key from: {s}"),
            Error::ValueWithoutKey => formatter.write_str("value requested before key"),
        }
    }
}

impl std::error::Error for Error {}

macro_rules! de_unsupported {
    ($func_name:ident) => {
        fn $func_name<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
        where
            V: de::Visitor<'de>,
        {
            Err(Error::Unsupported(stringify!($func_name)))
        }
    };
    ($func_name:ident, $($arg:ident: $arg_type:ty),*) => {
        fn $func_name<V>(self, $($arg: $arg_type,)* _visitor: V) -> Result<V::Value, Self::Error>
        where
            V: de::Visitor<'de>,
        {
            Err(Error::Unsupported(stringify!($func_name)))
        }
    };
}

struct FormDataDeserializer<'de> {
    str: &'de str,
}

impl<'de> FormDataDeserializer<'de> {
    fn new(s: &'de str) -> Self {
        FormDataDeserializer { str: s }
    }
}

impl<'de> de::Deserializer<'de> for FormDataDeserializer<'de> {
    type Error = Error;

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_map(KeyValuePairs::new(self.str))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    de_unsupported!(deserialize_any);
    de_unsupported!(deserialize_bool);
    de_unsupported!(deserialize_i8);
    de_unsupported!(deserialize_i16);
    de_unsupported!(deserialize_i32);
    de_unsupported!(deserialize_i64);
    de_unsupported!(deserialize_u8);
    de_unsupported!(deserialize_u16);
    de_unsupported!(deserialize_u32);
    de_unsupported!(deserialize_u64);
    de_unsupported!(deserialize_f32);
    de_unsupported!(deserialize_f64);
    de_unsupported!(deserialize_char);
    de_unsupported!(deserialize_bytes);
    de_unsupported!(deserialize_byte_buf);
    de_unsupported!(deserialize_option);
    de_unsupported!(deserialize_unit);
    de_unsupported!(deserialize_seq);
    de_unsupported!(deserialize_str);
    de_unsupported!(deserialize_string);
    de_unsupported!(deserialize_identifier);
    de_unsupported!(deserialize_ignored_any);
    de_unsupported!(deserialize_tuple, _len: usize);
    de_unsupported!(deserialize_unit_struct, _name: &'static str);
    de_unsupported!(deserialize_newtype_struct, _name: &'static str);
    de_unsupported!(deserialize_tuple_struct, _name: &'static str, _len: usize);
    de_unsupported!(deserialize_enum, _name: &'static str, _variants: &'static [&'static str]);
}

/// Walks `key=value` pairs split on `&`. The value of the current pair is
/// parked between the key and value calls so that empty values survive.
struct KeyValuePairs<'de> {
    pairs: std::str::Split<'de, char>,
    pending_value: Option<&'de str>,
}

impl<'de> KeyValuePairs<'de> {
    fn new(str: &'de str) -> Self {
        KeyValuePairs {
            pairs: str.split('&'),
            pending_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for KeyValuePairs<'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        let pair = loop {
            match self.pairs.next() {
                Some("") => continue,
                Some(pair) => break pair,
                None => return Ok(None),
            }
        };

        match pair.split_once('=') {
            Some((key, value)) => {
                self.pending_value = Some(value);
                seed.deserialize(StringValue(key)).map(Some)
            }
            None => Err(Error::MissingKey(pair.into())),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.pending_value.take() {
            Some(value) => seed.deserialize(StringValue(value)),
            None => Err(Error::ValueWithoutKey),
        }
    }
}

struct StringValue<'de>(&'de str);

impl<'de> de::Deserializer<'de> for StringValue<'de> {
    type Error = Error;

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(decode(self.0))
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(decode(self.0))
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_str("")
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    de_unsupported!(deserialize_str);
    de_unsupported!(deserialize_any);
    de_unsupported!(deserialize_bool);
    de_unsupported!(deserialize_i8);
    de_unsupported!(deserialize_i16);
    de_unsupported!(deserialize_i32);
    de_unsupported!(deserialize_i64);
    de_unsupported!(deserialize_u8);
    de_unsupported!(deserialize_u16);
    de_unsupported!(deserialize_u32);
    de_unsupported!(deserialize_u64);
    de_unsupported!(deserialize_f32);
    de_unsupported!(deserialize_f64);
    de_unsupported!(deserialize_char);
    de_unsupported!(deserialize_bytes);
    de_unsupported!(deserialize_byte_buf);
    de_unsupported!(deserialize_unit);
    de_unsupported!(deserialize_seq);
    de_unsupported!(deserialize_map);
    de_unsupported!(deserialize_tuple, _len: usize);
    de_unsupported!(deserialize_unit_struct, _name: &'static str);
    de_unsupported!(deserialize_newtype_struct, _name: &'static str);
    de_unsupported!(deserialize_tuple_struct, _name: &'static str, _len: usize);
    de_unsupported!(deserialize_enum, _name: &'static str, _variants: &'static [&'static str]);
    de_unsupported!(deserialize_struct, _name: &'static str, _fields: &'static [&'static str]);
}

fn decode(text: &str) -> String {
    let mut res = String::new();
    url_escape::decode_to_string(text.replace('+', " "), &mut res);
    res
}
