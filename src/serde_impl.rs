use core::fmt;
use core::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::compare::ValueAccess;
use crate::refcount::{OwningRefCount, RefCount};
use crate::{Buffer, Heap, Kind, Packet};

struct Access<'a, V: ?Sized>(&'a V);

impl<V: ValueAccess + ?Sized> Serialize for Access<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        match v.kind() {
            Kind::Null => serializer.serialize_unit(),
            Kind::Boolean => serializer.serialize_bool(v.as_bool().unwrap_or_default()),
            Kind::Integer => serializer.serialize_i64(v.as_i64().unwrap_or_default()),
            Kind::Decimal => serializer.serialize_f64(v.as_f64().unwrap_or_default()),
            Kind::String => serializer.serialize_str(v.as_str().unwrap_or_default()),
            Kind::Array => {
                let n = v.element_count();
                let mut seq = serializer.serialize_seq(Some(n))?;
                for i in 0..n {
                    let child = v
                        .child_at(i)
                        .ok_or_else(|| S::Error::custom("missing array element"))?;
                    seq.serialize_element(&Access(&child))?;
                }
                seq.end()
            }
            Kind::Object => {
                let n = v.element_count();
                let mut m = serializer.serialize_map(Some(n))?;
                for i in 0..n {
                    let (Some(k), Some(child)) = (v.key_at(i), v.child_at(i)) else {
                        return Err(S::Error::custom("missing object entry"));
                    };
                    m.serialize_entry(k, &Access(&child))?;
                }
                m.end()
            }
        }
    }
}

impl<R: OwningRefCount> Serialize for Heap<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Access(self).serialize(serializer)
    }
}

impl<R: RefCount> Serialize for Buffer<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Access(self).serialize(serializer)
    }
}

impl<R: OwningRefCount> Serialize for Packet<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Access(self).serialize(serializer)
    }
}

impl<'de, R: OwningRefCount> Deserialize<'de> for Heap<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HeapVisitor(PhantomData))
    }
}

impl<'de, R: OwningRefCount> Deserialize<'de> for Packet<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Heap::deserialize(deserializer).map(Packet::Heap)
    }
}

struct HeapVisitor<R>(PhantomData<R>);

impl<'de, R: OwningRefCount> Visitor<'de> for HeapVisitor<R> {
    type Value = Heap<R>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a JSON-like value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Heap::make_boolean(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Heap::make_integer(v))
    }

    fn visit_i128<E>(self, v: i128) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        i64::try_from(v)
            .map(Heap::make_integer)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        i64::try_from(v)
            .map(Heap::make_integer)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_u128<E>(self, v: u128) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        i64::try_from(v)
            .map(Heap::make_integer)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Heap::make_decimal(v))
    }

    fn visit_char<E>(self, v: char) -> Result<Self::Value, E> {
        let mut buf = [0u8; 4];
        Ok(Heap::make_string(v.encode_utf8(&mut buf)))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Heap::make_string(v))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Heap::make_null())
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(Heap::make_null())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Heap::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items: Vec<Heap<R>> = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(v) = seq.next_element::<Heap<R>>()? {
            items.push(v);
        }
        Ok(Heap::from_array(items))
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut entries: IndexMap<String, Heap<R>> = IndexMap::new();
        // Repeated keys keep their first position and the last value.
        while let Some((k, v)) = map.next_entry::<String, Heap<R>>()? {
            entries.insert(k, v);
        }
        Ok(Heap::from_object(entries))
    }
}
