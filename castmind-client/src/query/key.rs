//! Structural query keys.

use std::fmt;

/// One component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl From<i32> for KeyPart {
    fn from(value: i32) -> Self {
        KeyPart::Int(i64::from(value))
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        KeyPart::Int(i64::from(value))
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        KeyPart::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for KeyPart {
    fn from(value: usize) -> Self {
        KeyPart::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyPart::Null)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Null => f.write_str("null"),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Identity of a cached read: a name followed by its parameters, compared
/// part by part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new(name: impl Into<KeyPart>) -> Self {
        Self(vec![name.into()])
    }

    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `prefix` matches the leading parts of this key. The empty
    /// key is a prefix of every key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", part)?;
        }
        f.write_str("]")
    }
}

/// Build a [`QueryKey`] from heterogeneous parts: `query_key!["articles", 1, "all"]`.
#[macro_export]
macro_rules! query_key {
    ($($part:expr),+ $(,)?) => {
        $crate::query::QueryKey::from_parts(vec![$($crate::query::KeyPart::from($part)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn structural_equality() {
        let a = crate::query_key!["articles", 1, "all"];
        let b = QueryKey::new("articles").with(1u32).with("all".to_string());
        assert_eq!(a, b);
        assert_ne!(a, crate::query_key!["articles", 2, "all"]);
    }

    #[test]
    fn prefix_matching_is_part_wise() {
        let key = crate::query_key!["articles", 1, "all"];
        assert!(key.starts_with(&QueryKey::new("articles")));
        assert!(key.starts_with(&crate::query_key!["articles", 1]));
        assert!(!key.starts_with(&QueryKey::new("article")));
        assert!(!key.starts_with(&crate::query_key!["articles", 1, "all", 0]));
        assert!(!crate::query_key!["article-stats"].starts_with(&QueryKey::new("articles")));
    }

    #[test]
    fn display_is_readable() {
        let key = crate::query_key!["excerpts", 2, "unread", None::<i64>];
        assert_eq!(key.to_string(), r#"["excerpts", 2, "unread", null]"#);
    }

    fn part() -> impl Strategy<Value = KeyPart> {
        prop_oneof![
            Just(KeyPart::Null),
            any::<bool>().prop_map(KeyPart::Bool),
            any::<i64>().prop_map(KeyPart::Int),
            "[a-z-]{0,8}".prop_map(KeyPart::Str),
        ]
    }

    proptest! {
        #[test]
        fn every_key_starts_with_its_own_prefixes(parts in prop::collection::vec(part(), 0..6), cut in 0usize..6) {
            let key = QueryKey::from_parts(parts.clone());
            let cut = cut.min(parts.len());
            let prefix = QueryKey::from_parts(parts[..cut].to_vec());
            prop_assert!(key.starts_with(&prefix));
            prop_assert!(key.starts_with(&key.clone()));
        }

        #[test]
        fn equal_parts_make_equal_keys(parts in prop::collection::vec(part(), 0..6)) {
            let a = QueryKey::from_parts(parts.clone());
            let b = QueryKey::from_parts(parts);
            prop_assert_eq!(a, b);
        }
    }
}
