use serde::{Deserialize, Serialize};

/// A self-describing structured value used for tool input and as the
/// decoded form of a tool's input handed to SDK handler authors.
///
/// Maps are ordered (`Vec` of pairs, not a hash map) so that a plugin's
/// view of its own input preserves the caller's field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    #[must_use]
    pub fn map() -> Self {
        Self::Map(Vec::new())
    }

    /// Insert or replace a key in a `Map` value. No-op on other variants.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let Self::Map(entries) = self else { return };
        let key = key.into();
        let value = value.into();
        if let Some(existing) = entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            entries.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Map(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    #[expect(clippy::cast_precision_loss, reason = "tool inputs are not expected to carry integers beyond f64's exact range")]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_insert_replaces_existing_key() {
        let mut v = Value::map();
        v.insert("a", 1i64);
        v.insert("a", 2i64);
        assert_eq!(v.as_map().unwrap().len(), 1);
        assert_eq!(v.get("a"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn map_preserves_insertion_order() {
        let mut v = Value::map();
        v.insert("z", "first");
        v.insert("a", "second");
        let entries = v.as_map().unwrap();
        assert_eq!(entries[0].0, "z");
        assert_eq!(entries[1].0, "a");
    }

    #[test]
    fn bincode_round_trip() {
        let mut v = Value::map();
        v.insert("nested", Value::from(vec!["a", "b"]));
        v.insert("n", 3.5);
        v.insert("flag", true);
        v.insert("nothing", Value::Null);

        let encoded = bincode::encode_to_vec(&v, bincode::config::standard()).unwrap();
        let (decoded, _): (Value, usize) =
            bincode::decode_from_slice(&encoded, bincode::config::standard()).unwrap();
        assert_eq!(decoded, v);
    }
}
