use serde::{Deserialize, Serialize};

/// Ordered set of named string fields exchanged between message ports.
///
/// Values are always strings; interpretation is left to the reader so that
/// either side can change without breaking the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    entries: Vec<(Box<str>, Box<str>)>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<Box<str>>, value: impl Into<Box<str>>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<Box<str>>, value: impl Into<Box<str>>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| &**v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Box<str>> {
        let idx = self.entries.iter().position(|(k, _)| &**k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (&**k, &**v))
    }
}

impl<K, V> FromIterator<(K, V)> for Bundle
where
    K: Into<Box<str>>,
    V: Into<Box<str>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bundle = Bundle::new();
        for (k, v) in iter {
            bundle.insert(k, v);
        }
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut bundle = Bundle::new().with("a", "1").with("b", "2");
        bundle.insert("a", "3");

        let items: Vec<_> = bundle.iter().collect();
        assert_eq!(items, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn remove_returns_value() {
        let mut bundle: Bundle = [("x", "1"), ("y", "2")].into_iter().collect();

        assert_eq!(bundle.remove("x").as_deref(), Some("1"));
        assert_eq!(bundle.get("x"), None);
        assert_eq!(bundle.len(), 1);
        assert!(bundle.remove("x").is_none());
    }
}
