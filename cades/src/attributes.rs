// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Ordered, copy-on-write attribute tables.

An [AttributeTable] is never modified once constructed. Every "mutation"
returns a new table and leaves the receiver untouched, so a signer record
that handed out its table can rely on it staying as it was.

Insertion order is preserved exactly. Several CAdES computations hash
attributes in table order, and an attribute type may legitimately occur
more than once (archive time-stamps being the common case).
*/

use {
    crate::asn1::{common::RawValue, rfc5652::Attribute},
    bcder::Oid,
    std::sync::Arc,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AttributeTable {
    entries: Arc<Vec<Attribute>>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        Self {
            entries: Arc::new(attributes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.entries
    }

    /// The first attribute of the given type.
    pub fn get(&self, typ: &impl AsRef<[u8]>) -> Option<&Attribute> {
        self.entries
            .iter()
            .find(|attr| attr.typ.as_ref() == typ.as_ref())
    }

    /// Every attribute of the given type, in table order.
    pub fn get_all<'a>(
        &'a self,
        typ: &'a impl AsRef<[u8]>,
    ) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.entries
            .iter()
            .filter(move |attr| attr.typ.as_ref() == typ.as_ref())
    }

    /// The first value of the first attribute of the given type.
    pub fn first_value(&self, typ: &impl AsRef<[u8]>) -> Option<&RawValue> {
        self.get(typ).and_then(|attr| attr.values.first())
    }

    pub fn contains(&self, typ: &impl AsRef<[u8]>) -> bool {
        self.get(typ).is_some()
    }

    pub fn count(&self, typ: &impl AsRef<[u8]>) -> usize {
        self.entries
            .iter()
            .filter(|attr| attr.typ.as_ref() == typ.as_ref())
            .count()
    }

    fn with_entries(&self, f: impl FnOnce(&mut Vec<Attribute>)) -> Self {
        let mut entries = self.entries.as_ref().clone();
        f(&mut entries);

        Self {
            entries: Arc::new(entries),
        }
    }

    /// A table with `attribute` appended.
    pub fn with_added(&self, attribute: Attribute) -> Self {
        self.with_entries(|entries| entries.push(attribute))
    }

    /// A table with a single-valued attribute of the given type appended.
    pub fn with_value(&self, typ: Oid, value: RawValue) -> Self {
        self.with_added(Attribute::new(typ, value))
    }

    /// A table where `attribute` takes the place of every attribute of its type.
    ///
    /// The replacement lands at the position of the first attribute it
    /// replaces, or at the end if there was none.
    pub fn with_replaced(&self, attribute: Attribute) -> Self {
        self.with_entries(|entries| {
            let position = entries.iter().position(|attr| attr.typ == attribute.typ);
            entries.retain(|attr| attr.typ != attribute.typ);

            match position {
                Some(position) => entries.insert(position, attribute),
                None => entries.push(attribute),
            }
        })
    }

    /// A table with the attribute at `index` swapped for `attribute`.
    ///
    /// An out of range index leaves the table as it was.
    pub fn with_entry(&self, index: usize, attribute: Attribute) -> Self {
        self.with_entries(|entries| {
            if let Some(entry) = entries.get_mut(index) {
                *entry = attribute;
            }
        })
    }

    /// A table with only the attributes for which `keep` returns true.
    pub fn filtered(&self, mut keep: impl FnMut(usize, &Attribute) -> bool) -> Self {
        let entries = self
            .entries
            .iter()
            .enumerate()
            .filter(|(index, attr)| keep(*index, attr))
            .map(|(_, attr)| attr.clone())
            .collect::<Vec<_>>();

        Self::from_attributes(entries)
    }

    pub fn to_vec(&self) -> Vec<Attribute> {
        self.entries.as_ref().clone()
    }
}

impl From<Vec<Attribute>> for AttributeTable {
    fn from(attributes: Vec<Attribute>) -> Self {
        Self::from_attributes(attributes)
    }
}
