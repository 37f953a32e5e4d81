use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The delimiter between key segments in string form.
pub const DELIMITER: char = '/';

/// A hierarchical storage key.
///
/// A key is an ordered sequence of non-empty path segments. Its string form
/// joins the segments with `/`. [`Key::ROOT`] has no segments and an empty
/// string form. Keys are immutable value objects: equality and hashing are
/// structural, and ordering compares string forms so that listings are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// The root key, parent of all other keys.
    pub const ROOT: Key = Key {
        segments: Vec::new(),
    };

    /// Create a key from the given segments.
    ///
    /// Segments containing the `/` delimiter are split into their parts, so
    /// `Key::new(["a/b", "c"])` equals `Key::new(["a", "b", "c"])`. An empty
    /// segment is rejected with [`Error::InvalidKey`].
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = Vec::new();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() {
                return Err(Error::InvalidKey(String::from(
                    "empty segments are not allowed",
                )));
            }
            for part in segment.split(DELIMITER) {
                if part.is_empty() {
                    return Err(Error::InvalidKey(format!("invalid segment: `{segment}`")));
                }
                parts.push(part.to_owned());
            }
        }
        Ok(Key { segments: parts })
    }

    /// Build a key from segments already known to be valid.
    pub(crate) fn from_parts(segments: Vec<String>) -> Self {
        Key { segments }
    }

    /// Create a key by appending `segment` to this key.
    pub fn child(&self, segment: &str) -> Result<Self> {
        let mut segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        segments.push(segment);
        Key::new(segments)
    }

    /// Create a key by appending all segments of `other` to this key.
    pub fn join(&self, other: &Key) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Key { segments }
    }

    /// The segments of this key.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The parent of this key, or `None` for [`Key::ROOT`].
    pub fn parent(&self) -> Option<Key> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Key {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Return `true` if this is the root key.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Return `true` if `prefix` is a structural ancestor of this key or
    /// equal to it.
    ///
    /// This compares whole segments, so `pre` is not a prefix of `pref`.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Strip a structural `prefix` from this key, if present.
    pub fn strip_prefix(&self, prefix: &Key) -> Option<Key> {
        if self.starts_with(prefix) {
            Some(Key {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for Key {
    type Err = Error;

    /// Parse a `/`-delimited string into a key.
    ///
    /// The empty string parses to [`Key::ROOT`]. Strings with empty segments,
    /// such as `a//b` or `/a`, are rejected.
    fn from_str(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Ok(Key::ROOT);
        }
        let mut segments = Vec::new();
        for part in value.split(DELIMITER) {
            if part.is_empty() {
                return Err(Error::InvalidKey(format!("invalid key string: `{value}`")));
            }
            segments.push(part.to_owned());
        }
        Ok(Key { segments })
    }
}

impl Ord for Key {
    /// Keys order lexicographically by their string form.
    ///
    /// This differs from segment-wise ordering: `a/b` sorts after `a-`,
    /// because `/` compares against `-` as a character. Compared lazily,
    /// without building the joined strings.
    fn cmp(&self, other: &Self) -> Ordering {
        joined_bytes(self).cmp(joined_bytes(other))
    }
}

/// The bytes of the key's string form, yielded without allocating it.
fn joined_bytes(key: &Key) -> impl Iterator<Item = u8> + '_ {
    key.segments.iter().enumerate().flat_map(|(index, segment)| {
        let delimiter = if index == 0 { None } else { Some(b'/') };
        delimiter.into_iter().chain(segment.bytes())
    })
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_empty_string_form() {
        assert_eq!(Key::ROOT.to_string(), "");
        assert!(Key::ROOT.is_root());
        assert!(Key::ROOT.parent().is_none());
    }

    #[test]
    fn joins_segments_with_delimiter() -> Result<()> {
        let key = Key::new(["one", "two", "three"])?;
        assert_eq!(key.to_string(), "one/two/three");
        Ok(())
    }

    #[test]
    fn splits_segments_containing_delimiter() -> Result<()> {
        assert_eq!(Key::new(["a/b", "c"])?, Key::new(["a", "b", "c"])?);
        Ok(())
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(matches!(Key::new(["a", ""]), Err(Error::InvalidKey(_))));
        assert!(matches!(Key::new(["a//b"]), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn parses_string_form() -> Result<()> {
        let key: Key = "one/two".parse()?;
        assert_eq!(key.segments(), ["one", "two"]);
        assert_eq!("".parse::<Key>()?, Key::ROOT);
        assert!("a//b".parse::<Key>().is_err());
        Ok(())
    }

    #[test]
    fn parent_drops_last_segment() -> Result<()> {
        let key: Key = "one/two/three".parse()?;
        assert_eq!(key.parent(), Some("one/two".parse()?));
        assert_eq!("one".parse::<Key>()?.parent(), Some(Key::ROOT));
        Ok(())
    }

    #[test]
    fn prefix_matches_whole_segments() -> Result<()> {
        let key: Key = "pref/file".parse()?;
        assert!(key.starts_with(&"pref".parse()?));
        assert!(key.starts_with(&Key::ROOT));
        assert!(key.starts_with(&key.clone()));
        assert!(!key.starts_with(&"pre".parse()?));
        Ok(())
    }

    #[test]
    fn strips_prefix() -> Result<()> {
        let key: Key = "a/b/c".parse()?;
        assert_eq!(key.strip_prefix(&"a/b".parse()?), Some("c".parse()?));
        assert_eq!(key.strip_prefix(&Key::ROOT), Some(key.clone()));
        assert_eq!(key.strip_prefix(&"x".parse()?), None);
        Ok(())
    }

    #[test]
    fn orders_by_string_form() -> Result<()> {
        let slash: Key = "a/b".parse()?;
        let dash: Key = "a-".parse()?;
        assert!(slash > dash);
        Ok(())
    }

    #[test]
    fn ordering_agrees_with_joined_strings() -> Result<()> {
        let mut keys: Vec<Key> = ["a/b", "a-", "a", "ab", "a/b/c", "b"]
            .iter()
            .map(|value| value.parse())
            .collect::<Result<_>>()?;
        keys.sort();
        let sorted: Vec<String> = keys.iter().map(Key::to_string).collect();
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
        assert_eq!("a".parse::<Key>()?.cmp(&"a".parse()?), Ordering::Equal);
        Ok(())
    }
}
