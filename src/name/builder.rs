// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

/// Builds a [`Name`] one octet at a time.
///
/// The builder validates as it goes, so every call that would produce
/// an over-long label or name fails (leaving the builder unchanged).
/// It starts out holding only the null label; [`NameBuilder::try_push`]
/// appends to the current label and [`NameBuilder::next_label`] starts
/// the next one. A builder is consumed either by
/// [`NameBuilder::finish`], which requires the current label to be
/// null, or by [`NameBuilder::finish_with_suffix`], which appends a
/// zone to the current (non-null) label. The latter is how a record's
/// owner name is formed from its relative name and its zone:
///
/// ```
/// use pdnsgslb::name::{Name, NameBuilder};
/// let zone: Name = "example.com.".parse().unwrap();
/// let mut builder = NameBuilder::new();
/// for octet in b"www" {
///     builder.try_push(*octet).unwrap();
/// }
/// let owner = builder.finish_with_suffix(&zone).unwrap();
/// assert_eq!(owner, "www.example.com.".parse::<Name>().unwrap());
/// ```
pub struct NameBuilder {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    label_offsets: ArrayVec<u8, MAX_N_LABELS>,
    label_start: usize,
    label_len: u8,
}

impl NameBuilder {
    pub fn new() -> Self {
        let mut wire_repr = ArrayVec::new();
        let mut label_offsets = ArrayVec::new();
        wire_repr.push(0);
        label_offsets.push(0);
        Self {
            wire_repr,
            label_offsets,
            label_start: 0,
            label_len: 0,
        }
    }

    /// Appends `octet` to the current label.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len >= (MAX_LABEL_LEN as u8) {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_push(octet).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Ends the current label and starts a new, empty one. Fails with
    /// [`Error::NullNonTerminal`] if the current label is empty.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.label_len == 0 {
            Err(Error::NullNonTerminal)
        } else if self.wire_repr.is_full() {
            Err(Error::NameTooLong)
        } else {
            self.write_label_len();
            self.label_start = self.wire_repr.len();
            self.label_len = 0;

            // Neither push can fail: the buffer had room, and a name
            // whose labels are all non-null fits in MAX_N_LABELS.
            self.wire_repr.push(0);
            self.label_offsets.push(self.label_start as u8);
            Ok(())
        }
    }

    /// Finishes the name. The current label must be the null label.
    pub fn finish(self) -> Result<Name, Error> {
        if self.label_len != 0 {
            Err(Error::NonNullTerminal)
        } else {
            Ok(Name::from_parts(&self.wire_repr, &self.label_offsets))
        }
    }

    /// Ends the current (non-null) label and appends the labels of
    /// `suffix`.
    pub fn finish_with_suffix(mut self, suffix: &Name) -> Result<Name, Error> {
        if self.label_len == 0 {
            return Err(Error::NullNonTerminal);
        }
        self.write_label_len();
        let base = self.wire_repr.len() as u8;
        self.wire_repr
            .try_extend_from_slice(suffix.wire_repr())
            .or(Err(Error::NameTooLong))?;
        for offset in suffix.label_offsets.iter() {
            self.label_offsets
                .try_push(*offset + base)
                .or(Err(Error::NameTooLong))?;
        }
        Ok(Name::from_parts(&self.wire_repr, &self.label_offsets))
    }

    fn write_label_len(&mut self) {
        self.wire_repr[self.label_start] = self.label_len;
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
