//! AMF0 values as found in FLV script tags.

use std::io::{self, Read, Write};

use bytes::Bytes;

use crate::error::{FlvError, Result};
use crate::io::{ReadFlvExt, WriteFlvExt};

pub const MARKER_NUMBER: u8 = 0;
pub const MARKER_BOOLEAN: u8 = 1;
pub const MARKER_STRING: u8 = 2;
pub const MARKER_OBJECT: u8 = 3;
pub const MARKER_NULL: u8 = 5;
pub const MARKER_UNDEFINED: u8 = 6;
pub const MARKER_REFERENCE: u8 = 7;
pub const MARKER_ECMA_ARRAY: u8 = 8;
pub const MARKER_OBJECT_END: u8 = 9;
pub const MARKER_STRICT_ARRAY: u8 = 10;
pub const MARKER_DATE: u8 = 11;
pub const MARKER_LONG_STRING: u8 = 12;

const OBJECT_END: [u8; 3] = [0, 0, MARKER_OBJECT_END];
const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(Bytes),
    Object(Properties),
    Null,
    Undefined,
    Reference(u16),
    EcmaArray(Properties),
    ObjectEnd,
    StrictArray(Vec<Value>),
    Date { millis: f64, time_zone: i16 },
    LongString(Bytes),
}

impl Value {
    pub fn string(s: impl Into<Bytes>) -> Self {
        Value::String(s.into())
    }

    pub fn marker(&self) -> u8 {
        match self {
            Value::Number(_) => MARKER_NUMBER,
            Value::Boolean(_) => MARKER_BOOLEAN,
            Value::String(_) => MARKER_STRING,
            Value::Object(_) => MARKER_OBJECT,
            Value::Null => MARKER_NULL,
            Value::Undefined => MARKER_UNDEFINED,
            Value::Reference(_) => MARKER_REFERENCE,
            Value::EcmaArray(_) => MARKER_ECMA_ARRAY,
            Value::ObjectEnd => MARKER_OBJECT_END,
            Value::StrictArray(_) => MARKER_STRICT_ARRAY,
            Value::Date { .. } => MARKER_DATE,
            Value::LongString(_) => MARKER_LONG_STRING,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) | Value::LongString(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Properties of an Object or EcmaArray.
    pub fn as_properties(&self) -> Option<&Properties> {
        match self {
            Value::Object(p) | Value::EcmaArray(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::StrictArray(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Re-tags an Object as an EcmaArray with the same properties.
    /// Any other value is returned unchanged.
    pub fn into_ecma_array(self) -> Value {
        match self {
            Value::Object(p) => Value::EcmaArray(p),
            other => other,
        }
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        read_value(r, 0)
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_ui8(self.marker())?;
        match self {
            Value::Number(v) => w.write_double(*v),
            Value::Boolean(v) => w.write_ui8(*v as u8),
            Value::String(s) => write_short_string(w, s),
            Value::Object(p) => p.write_members(w),
            Value::Null | Value::Undefined | Value::ObjectEnd => Ok(()),
            Value::Reference(v) => w.write_ui16(*v),
            Value::EcmaArray(p) => {
                w.write_ui32(p.len() as u32)?;
                p.write_members(w)
            }
            Value::StrictArray(values) => {
                w.write_ui32(values.len() as u32)?;
                values.iter().try_for_each(|v| v.write_to(w))
            }
            Value::Date { millis, time_zone } => {
                w.write_double(*millis)?;
                w.write_si16(*time_zone)
            }
            Value::LongString(s) => {
                w.write_ui32(s.len() as u32)?;
                w.write_all(s)
            }
        }
    }
}

fn read_value<R: Read + ?Sized>(r: &mut R, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(FlvError::TooDeep(MAX_DEPTH));
    }
    let marker = r.read_ui8()?;
    let value = match marker {
        MARKER_NUMBER => Value::Number(r.read_double()?),
        MARKER_BOOLEAN => Value::Boolean(r.read_ui8()? != 0),
        MARKER_STRING => Value::String(read_short_string(r)?),
        MARKER_OBJECT => Value::Object(Properties::read_members(r, depth + 1)?),
        MARKER_NULL => Value::Null,
        MARKER_UNDEFINED => Value::Undefined,
        MARKER_REFERENCE => Value::Reference(r.read_ui16()?),
        MARKER_ECMA_ARRAY => {
            // advisory only, producers are known to get it wrong
            let _count = r.read_ui32()?;
            Value::EcmaArray(Properties::read_members(r, depth + 1)?)
        }
        MARKER_OBJECT_END => Value::ObjectEnd,
        MARKER_STRICT_ARRAY => {
            let count = r.read_ui32()? as usize;
            let mut values = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                values.push(read_value(r, depth + 1)?);
            }
            Value::StrictArray(values)
        }
        MARKER_DATE => Value::Date {
            millis: r.read_double()?,
            time_zone: r.read_si16()?,
        },
        MARKER_LONG_STRING => {
            let len = r.read_ui32()? as usize;
            Value::LongString(r.read_bytes(len)?)
        }
        other => {
            tracing::trace!("unknown AMF0 marker {}, decoded as null", other);
            Value::Null
        }
    };
    Ok(value)
}

fn read_short_string<R: Read + ?Sized>(r: &mut R) -> Result<Bytes> {
    let len = r.read_ui16()? as usize;
    Ok(r.read_bytes(len)?)
}

/// Writes a UI16-length string without a type marker, as used for
/// property names.
pub fn write_short_string<W: Write + ?Sized>(w: &mut W, s: &[u8]) -> io::Result<()> {
    w.write_ui16(s.len() as u16)?;
    w.write_all(s)
}

pub fn write_object_end<W: Write + ?Sized>(w: &mut W) -> io::Result<()> {
    w.write_all(&OBJECT_END)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub name: Bytes,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<Bytes>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name_is(&self, name: &str) -> bool {
        self.name.as_ref() == name.as_bytes()
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_short_string(w, &self.name)?;
        self.value.write_to(w)
    }
}

/// Ordered named members of an Object or EcmaArray.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    items: Vec<Property>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.items.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.iter().find(|p| p.name_is(name)).map(|p| &p.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.items
            .iter_mut()
            .find(|p| p.name_is(name))
            .map(|p| &mut p.value)
    }

    /// Returns the value stored under `name`, appending a Null member first
    /// if there is none.
    pub fn entry(&mut self, name: &str) -> &mut Value {
        let idx = match self.items.iter().position(|p| p.name_is(name)) {
            Some(idx) => idx,
            None => {
                self.items
                    .push(Property::new(Bytes::copy_from_slice(name.as_bytes()), Value::Null));
                self.items.len() - 1
            }
        };
        &mut self.items[idx].value
    }

    /// Overwrites the member in place, keeping its position, or appends it.
    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        match self.get_mut(name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.items
                    .push(Property::new(Bytes::copy_from_slice(name.as_bytes()), value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.items.iter().position(|p| p.name_is(name))?;
        Some(self.items.remove(idx).value)
    }

    fn read_members<R: Read + ?Sized>(r: &mut R, depth: usize) -> Result<Self> {
        let mut items = Vec::new();
        loop {
            let name = read_short_string(r)?;
            let value = read_value(r, depth)?;
            if name.is_empty() && value == Value::ObjectEnd {
                return Ok(Self { items });
            }
            items.push(Property { name, value });
        }
    }

    fn write_members<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        for p in &self.items {
            p.write_to(w)?;
        }
        write_object_end(w)
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// The name/value pair carried by a script tag.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptBody {
    pub name: Value,
    pub value: Value,
}

impl ScriptBody {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        Ok(Self {
            name: Value::read_from(r)?,
            value: Value::read_from(r)?,
        })
    }

    pub fn is_on_metadata(&self) -> bool {
        matches!(&self.name, Value::String(s) if s.as_ref() == b"onMetaData")
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.name.write_to(w)?;
        self.value.write_to(w)
    }
}
