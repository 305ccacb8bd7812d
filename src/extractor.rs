//! Grouping key extraction.
//!
//! An extractor maps one [Record] to the ordered list of keys it contributes to a tally. A record
//! may contribute no keys, one key, or the same key several times.

use crate::models::Record;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A mention is the run of word characters directly after an `@`.
    static ref MENTION: Regex = Regex::new(r"@([0-9A-Za-z_]+)").expect("valid mention pattern");
}

/// Returns the mention targets in `text`, in order of appearance.
///
/// Duplicates are preserved and matching is case-sensitive, so `@Bob` and `@bob` are different
/// targets. An `@` that is not followed by a word character is not a mention.
pub fn mentions(text: &str) -> impl Iterator<Item = &str> {
    MENTION
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|target| target.as_str())
}

/// Returns whether `text` contains at least one mention.
pub fn contains_mention(text: &str) -> bool {
    MENTION.is_match(text)
}

/// Trait for grouping key extractors.
///
/// Implementations must be stateless so that one extractor can serve concurrent aggregations.
pub trait KeyExtractor: Send + Sync {
    /// Returns the keys contributed by `record`, in order.
    fn extract<'r>(&self, record: &'r Record) -> Vec<&'r str>;
}

/// Groups by the users mentioned in the tweet text.
#[derive(Clone, Copy, Debug, Default)]
pub struct MentionExtractor;

impl KeyExtractor for MentionExtractor {
    fn extract<'r>(&self, record: &'r Record) -> Vec<&'r str> {
        mentions(&record.text).collect()
    }
}

/// Groups by the author of the tweet.
///
/// Stores group by author natively, so this is only needed by in-memory sources that aggregate
/// by owner themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnerExtractor;

impl KeyExtractor for OwnerExtractor {
    fn extract<'r>(&self, record: &'r Record) -> Vec<&'r str> {
        vec![record.user.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<&str> {
        mentions(text).collect()
    }

    #[test]
    fn no_mentions() {
        assert!(extract("").is_empty());
        assert!(extract("just a tweet").is_empty());
        assert!(!contains_mention("just a tweet"));
    }

    #[test]
    fn mentions_in_order_with_duplicates() {
        assert_eq!(
            vec!["alice", "Bob", "alice"],
            extract("hi @alice and @Bob and @alice again")
        );
    }

    #[test]
    fn bare_sigil() {
        assert!(extract("@ nobody").is_empty());
        assert!(extract("trailing @").is_empty());
        assert!(extract("@!?").is_empty());
        assert!(!contains_mention("@ nobody"));
    }

    #[test]
    fn adjacent_mentions() {
        assert_eq!(vec!["a", "b"], extract("@a@b"));
        assert_eq!(vec!["a"], extract("@@a"));
    }

    #[test]
    fn case_sensitive() {
        assert_eq!(vec!["Bob", "bob"], extract("@Bob @bob"));
    }

    #[test]
    fn word_characters() {
        assert_eq!(vec!["user_01"], extract("@user_01, hello"));
        assert_eq!(vec!["bar"], extract("foo@bar.com"));
        // Only ASCII word characters are part of a mention.
        assert_eq!(vec!["caf"], extract("@café"));
    }

    #[test]
    fn mention_extractor() {
        let record = Record::new("carol", "@dave @erin @dave", 4);
        assert_eq!(vec!["dave", "erin", "dave"], MentionExtractor.extract(&record));
    }

    #[test]
    fn owner_extractor() {
        let record = Record::new("carol", "@dave", 0);
        assert_eq!(vec!["carol"], OwnerExtractor.extract(&record));
    }
}
