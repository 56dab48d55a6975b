//! Annotation containers: string lists and simple string dictionaries.
//!
//! Both are counted arrays of RVAs pointing at [`Utf8String`] children. The
//! strings are laid out right after the array, in array order.

use std::collections::BTreeMap;

use crate::error::{checked_count, CinderResult};
use crate::format::{encode_counted, record_size, DictionaryEntry};
use crate::nodes::Utf8String;
use crate::sink::FileWriter;
use crate::writable::{Children, ChildrenMut, Writable, WritableState};

/// An ordered list of UTF-8 strings
///
/// Layout: `u32` count, then one `u32` RVA per string.
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::StringList;
///
/// let mut list = StringList::new();
/// list.push("abort() called");
/// list.push("in worker thread");
/// assert_eq!(list.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StringList
{
    state: WritableState,
    strings: Vec<Utf8String>,
    rvas: Vec<u32>,
}

impl StringList
{
    /// Create an empty list
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a string
    pub fn push(&mut self, value: &str)
    {
        self.state.assert_mutable();
        self.strings.push(Utf8String::new(value));
    }

    /// Number of strings
    pub fn len(&self) -> usize
    {
        self.strings.len()
    }

    /// Whether the list has no strings
    pub fn is_empty(&self) -> bool
    {
        self.strings.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for StringList
{
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self
    {
        let mut list = StringList::new();
        for value in iter {
            list.push(value);
        }
        list
    }
}

impl Writable for StringList
{
    fn state(&self) -> &WritableState
    {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WritableState
    {
        &mut self.state
    }

    fn freeze_object(&mut self) -> CinderResult<()>
    {
        checked_count("string list count", self.strings.len())?;
        self.rvas = vec![0; self.strings.len()];
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.strings.len() * 4
    }

    fn children(&self) -> Children<'_>
    {
        self.strings.iter().map(|s| s as &dyn Writable).collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.strings.iter_mut().map(|s| s as &mut dyn Writable).collect()
    }

    fn record_child_locations(&mut self)
    {
        for (rva, string) in self.rvas.iter_mut().zip(&self.strings) {
            *rva = string.rva();
        }
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let count = checked_count("string list count", self.rvas.len())?;
        sink.write(&encode_counted(count, &self.rvas)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct DictionaryNodes
{
    key: Utf8String,
    value: Utf8String,
}

/// A string-to-string map, written sorted by key
///
/// Layout: `u32` count, then one [`DictionaryEntry`] (key RVA, value RVA) per
/// entry. Setting a key that is already present replaces its value.
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::SimpleStringDictionary;
///
/// let mut annotations = SimpleStringDictionary::new();
/// annotations.set("product", "cinder");
/// annotations.set("channel", "nightly");
/// annotations.set("channel", "beta");
/// assert_eq!(annotations.len(), 2);
/// assert_eq!(annotations.get("channel"), Some("beta"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimpleStringDictionary
{
    state: WritableState,
    entries: BTreeMap<String, DictionaryNodes>,
    records: Vec<DictionaryEntry>,
}

impl SimpleStringDictionary
{
    /// Create an empty dictionary
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn set(&mut self, key: &str, value: &str)
    {
        self.state.assert_mutable();
        self.entries.insert(
            key.to_owned(),
            DictionaryNodes {
                key: Utf8String::new(key),
                value: Utf8String::new(value),
            },
        );
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str>
    {
        self.entries.get(key).map(|nodes| nodes.value.value())
    }

    /// Number of entries
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether the dictionary has no entries
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

impl Writable for SimpleStringDictionary
{
    fn state(&self) -> &WritableState
    {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WritableState
    {
        &mut self.state
    }

    fn freeze_object(&mut self) -> CinderResult<()>
    {
        checked_count("dictionary entry count", self.entries.len())?;
        self.records = vec![DictionaryEntry::default(); self.entries.len()];
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.entries.len() * record_size::<DictionaryEntry>()
    }

    fn children(&self) -> Children<'_>
    {
        self.entries
            .values()
            .flat_map(|nodes| [&nodes.key as &dyn Writable, &nodes.value as &dyn Writable])
            .collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.entries
            .values_mut()
            .flat_map(|nodes| [&mut nodes.key as &mut dyn Writable, &mut nodes.value as &mut dyn Writable])
            .collect()
    }

    fn record_child_locations(&mut self)
    {
        for (record, nodes) in self.records.iter_mut().zip(self.entries.values()) {
            record.key = nodes.key.rva();
            record.value = nodes.value.rva();
        }
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let count = checked_count("dictionary entry count", self.records.len())?;
        sink.write(&encode_counted(count, &self.records)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::writable::{child_nodes, freeze, lay_out, write_tree, LayoutCursor};

    #[test]
    fn test_dictionary_children_are_sorted_key_value_pairs()
    {
        let mut dictionary = SimpleStringDictionary::new();
        dictionary.set("zeta", "1");
        dictionary.set("alpha", "2");
        freeze(&mut dictionary).unwrap();

        let children = child_nodes(&dictionary);
        assert_eq!(children.len(), 4);
        // "alpha" = 4 + 5 + 1
        assert_eq!(children[0].size_of_object(), 10);
    }

    #[test]
    fn test_dictionary_records_point_at_strings()
    {
        let mut dictionary = SimpleStringDictionary::new();
        dictionary.set("k", "v");
        freeze(&mut dictionary).unwrap();
        lay_out(&mut dictionary, &mut LayoutCursor::at(100)).unwrap();

        // object: 100..112, key at 112 (6 bytes), value aligned to 120
        assert_eq!(dictionary.records[0], DictionaryEntry { key: 112, value: 120 });

        let mut sink = vec![0u8; 100];
        write_tree(&mut dictionary, &mut sink).unwrap();
        assert_eq!(sink.len(), 126);
    }

    #[test]
    fn test_empty_string_list_is_just_a_count()
    {
        let mut list = StringList::new();
        freeze(&mut list).unwrap();
        assert_eq!(list.size_of_object(), 4);
        assert!(child_nodes(&list).is_empty());
    }
}
