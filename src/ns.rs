use std::{fmt, str::FromStr};

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// The longest full namespace, in bytes, that can be addressed on the wire.
const MAX_NAMESPACE_LENGTH: usize = 127;

/// A struct modeling the canonical name for a collection.
///
/// The namespace of a collection is the concatenation of the name of the database
/// containing it, the '.' character, and the name of the collection itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    /// The name of the database associated with this namespace.
    pub db: String,

    /// The name of the collection this namespace corresponds to.
    pub coll: String,
}

impl Namespace {
    /// Construct a `Namespace` with the given database and collection.
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }

    /// Whether this namespace can be addressed on the wire: a non-empty database name
    /// free of separator characters, a non-empty collection name, and a full name that
    /// fits the wire limit.
    pub fn is_valid(&self) -> bool {
        !self.db.is_empty()
            && !self.db.contains(['.', ' ', '/', '\\', '\0'])
            && !self.coll.is_empty()
            && !self.coll.contains('\0')
            && self.db.len() + 1 + self.coll.len() <= MAX_NAMESPACE_LENGTH
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{}", self.db, self.coll)
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        let mut parts = s.split('.');

        let db = parts.next();
        let coll = parts.collect::<Vec<_>>().join(".");

        match (db, coll) {
            (Some(db), coll) if !coll.is_empty() => Ok(Self {
                db: db.to_string(),
                coll,
            }),
            _ => Err(Error::invalid_argument(
                "missing one or more fields in namespace",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| D::Error::custom("missing one or more fields in namespace"))
    }
}

impl Serialize for Namespace {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::Namespace;

    #[test]
    fn from_str_splits_at_first_dot() {
        let ns: Namespace = "db.a.b".parse().unwrap();
        assert_eq!(ns.db, "db");
        assert_eq!(ns.coll, "a.b");
        assert_eq!(ns.to_string(), "db.a.b");

        assert!("nodot".parse::<Namespace>().is_err());
        assert!("db.".parse::<Namespace>().is_err());
    }

    #[test]
    fn validity() {
        assert!(Namespace::new("db", "coll").is_valid());
        assert!(Namespace::new("db", "system.$cmd").is_valid());

        assert!(!Namespace::new("", "coll").is_valid());
        assert!(!Namespace::new("db", "").is_valid());
        assert!(!Namespace::new("d b", "coll").is_valid());
        assert!(!Namespace::new("d.b", "coll").is_valid());
        assert!(!Namespace::new("d/b", "coll").is_valid());
        assert!(!Namespace::new("db", "a\0b").is_valid());
        assert!(!Namespace::new("db", "c".repeat(130)).is_valid());
    }
}
