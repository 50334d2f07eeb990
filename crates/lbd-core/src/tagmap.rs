//! Tag name to column index mapping

use crate::format::{FormatToken, ValueToken};
use crate::types::{LbdError, Result};
use indexmap::IndexMap;

/// Ordered mapping from tag name to column index.
///
/// Indices are dense (`0..len`) and follow token order. A repeated value tag
/// gets the smallest unused numeric suffix (`pm`, `pm1`, `pm2`, ...); lists are
/// named `l0`, `l1`, ... in order of appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMap {
    tags: IndexMap<String, usize>,
}

impl TagMap {
    /// Build the top-level map: one entry per value and one per list
    pub fn from_tokens(tokens: &[FormatToken]) -> Self {
        let mut map = TagMap::default();
        let mut lists = 0usize;
        for token in tokens {
            match token {
                FormatToken::Skip { .. } => {}
                FormatToken::Value(value) => map.push_unique(value.tag_name()),
                FormatToken::List { .. } => {
                    map.push_unique(format!("l{}", lists));
                    lists += 1;
                }
            }
        }
        map
    }

    /// Build the subtag map of a single list
    pub fn from_values(values: &[ValueToken]) -> Self {
        let mut map = TagMap::default();
        for value in values {
            map.push_unique(value.tag_name());
        }
        map
    }

    fn push_unique(&mut self, base: String) {
        let mut name = base.clone();
        let mut suffix = 1usize;
        while self.tags.contains_key(&name) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        let index = self.tags.len();
        self.tags.insert(name, index);
    }

    #[inline]
    pub fn get(&self, tag: &str) -> Option<usize> {
        self.tags.get(tag).copied()
    }

    /// Column index of `tag`, or `UnknownTag`
    pub fn index_of(&self, tag: &str) -> Result<usize> {
        self.get(tag)
            .ok_or_else(|| LbdError::UnknownTag(tag.to_string()))
    }

    /// Tag name of the column at `index`
    pub fn name(&self, index: usize) -> Option<&str> {
        self.tags.get_index(index).map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag names in column order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// `(name, index)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tags.iter().map(|(name, &index)| (name.as_str(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_format;

    #[test]
    fn test_columns_in_token_order() {
        let tokens = parse_format("#sn #st, {#pm #px} #sdt").unwrap();
        let map = TagMap::from_tokens(&tokens);
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("sn", 0), ("st", 1), ("l0", 2), ("sdt", 3)]);
    }

    #[test]
    fn test_duplicate_tags_get_suffixes() {
        let tokens = parse_format("#st #st #sdt #st").unwrap();
        let map = TagMap::from_tokens(&tokens);
        assert_eq!(map.get("st"), Some(0));
        assert_eq!(map.get("st1"), Some(1));
        assert_eq!(map.get("sdt"), Some(2));
        assert_eq!(map.get("st2"), Some(3));
    }

    #[test]
    fn test_lists_are_numbered() {
        let tokens = parse_format("{#pm} {} {#px}").unwrap();
        let map = TagMap::from_tokens(&tokens);
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["l0", "l1", "l2"]);
    }

    #[test]
    fn test_subtag_map_is_scoped_to_list() {
        let tokens = parse_format("#pm {#pm #px #px}").unwrap();
        let FormatToken::List { children } = &tokens[2] else {
            panic!("expected a list token");
        };
        let sub = TagMap::from_values(children);
        assert_eq!(sub.names().collect::<Vec<_>>(), vec!["pm", "px", "px1"]);
        assert_eq!(sub.index_of("px1").unwrap(), 2);
    }

    #[test]
    fn test_unknown_tag() {
        let map = TagMap::from_tokens(&parse_format("#st").unwrap());
        assert!(matches!(map.index_of("sn"), Err(LbdError::UnknownTag(t)) if t == "sn"));
        assert_eq!(map.name(0), Some("st"));
        assert_eq!(map.name(1), None);
    }
}
