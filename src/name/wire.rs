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

//! Implementation of parsing and validation of on-the-wire names.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

////////////////////////////////////////////////////////////////////////
// VALIDATION AND PARSING OF UNCOMPRESSED ON-THE-WIRE NAMES           //
////////////////////////////////////////////////////////////////////////

/// Parses an uncompressed name present at the beginning of `octets`,
/// ignoring anything after it. This is the implementation of
/// [`Name::try_from_uncompressed`], which reads the algorithm name out
/// of TSIG RDATA.
pub fn parse_uncompressed_name(octets: &[u8]) -> Result<(Name, usize), Error> {
    let mut label_offsets = ArrayVec::<u8, MAX_N_LABELS>::new();
    let wire_len = walk_uncompressed_name(octets, |offset| {
        label_offsets.push(offset as u8)
    })?;
    Ok((Name::from_parts(&octets[..wire_len], &label_offsets), wire_len))
}

/// Validates an uncompressed name present at the beginning of `octets`
/// and returns its length. This is the implementation of
/// [`Name::validate_uncompressed`].
pub fn validate_uncompressed_name(octets: &[u8]) -> Result<usize, Error> {
    walk_uncompressed_name(octets, |_| ())
}

/// Walks the labels of an uncompressed name at the beginning of
/// `octets`, calling `on_label` with the offset of each. Returns the
/// on-the-wire length of the name.
fn walk_uncompressed_name(
    octets: &[u8],
    mut on_label: impl FnMut(usize),
) -> Result<usize, Error> {
    let mut offset = 0;
    let mut finished = false;
    while !finished && offset < octets.len() {
        let label_len = octets[offset];
        if label_len > (MAX_LABEL_LEN as u8) {
            return Err(Error::LabelTooLong);
        } else if label_len == 0 {
            finished = true;
        }
        on_label(offset);
        offset += label_len as usize + 1;
        if offset > MAX_WIRE_LEN {
            // Checking on each iteration (as opposed to once at the
            // end) ensures that we never overflow a label-offset
            // buffer sized for MAX_N_LABELS.
            return Err(Error::NameTooLong);
        }
    }

    if !finished || offset > octets.len() {
        Err(Error::UnexpectedEom)
    } else {
        Ok(offset)
    }
}

////////////////////////////////////////////////////////////////////////
// PARSING OF COMPRESSED ON-THE-WIRE NAMES                            //
////////////////////////////////////////////////////////////////////////

/// Parses a compressed name starting at index `start` of `octets`.
/// Pointers are followed. Indices given in pointers are treated as
/// indices of `octets`, so the intention is for an entire DNS message
/// to be passed in `octets`. This is the implementation of
/// [`Name::try_from_compressed`].
pub fn parse_compressed_name(octets: &[u8], start: usize) -> Result<(Name, usize), Error> {
    let mut next_chunk = Some(start);
    let mut wire_len_of_first_chunk = None;

    let mut label_offsets = ArrayVec::<u8, MAX_N_LABELS>::new();
    let mut wire_repr = ArrayVec::<u8, MAX_WIRE_LEN>::new();

    while let Some(chunk_start) = next_chunk {
        let mut finished_with_chunk = false;
        let mut index = chunk_start;

        while !finished_with_chunk {
            let len = *octets.get(index).ok_or(Error::UnexpectedEom)?;
            if len & 0xc0 == 0xc0 {
                next_chunk = Some(parse_pointer(octets, chunk_start, index)? as usize);
                index += 2;
                finished_with_chunk = true;
            } else if len > (MAX_LABEL_LEN as u8) {
                return Err(Error::LabelTooLong);
            } else {
                let end_of_label = index + len as usize + 1;
                if len == 0 {
                    next_chunk = None;
                    finished_with_chunk = true;
                } else if end_of_label >= octets.len() {
                    return Err(Error::UnexpectedEom);
                }
                label_offsets
                    .try_push(wire_repr.len() as u8)
                    .or(Err(Error::NameTooLong))?;
                wire_repr
                    .try_extend_from_slice(&octets[index..end_of_label])
                    .or(Err(Error::NameTooLong))?;
                index = end_of_label;
            }
        }

        wire_len_of_first_chunk.get_or_insert(index - chunk_start);
    }

    let name = Name::from_parts(&wire_repr, &label_offsets);
    Ok((name, wire_len_of_first_chunk.unwrap_or_default()))
}

/// Parses a pointer at `index` in `octets`. This also checks that the
/// pointer refers to an index *earlier* than the start of the chunk it
/// is in (`chunk_start`).
fn parse_pointer(octets: &[u8], chunk_start: usize, index: usize) -> Result<u16, Error> {
    if index + 1 < octets.len() {
        let pointer_bytes = [octets[index], octets[index + 1]];
        let pointer = u16::from_be_bytes(pointer_bytes) & (!0xc000);
        if (pointer as usize) >= chunk_start {
            // According to RFC 1035 § 4.1.4, pointers point to a
            // *prior* occurrence of the name. (Importantly, this
            // prevents loops!)
            Err(Error::InvalidPointer)
        } else {
            Ok(pointer)
        }
    } else {
        Err(Error::UnexpectedEom)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn long_name() -> Vec<u8> {
        let mut octets = b"\x01x".repeat(128);
        octets.push(0);
        octets
    }

    #[test]
    fn parse_uncompressed_name_accepts_valid_names() {
        let wire_repr_and_junk = b"\x03www\x04test\x00junk";
        let target: Name = "www.test.".parse().unwrap();
        assert_eq!(
            parse_uncompressed_name(&wire_repr_and_junk[..10]),
            Ok((target.clone(), 10))
        );
        assert_eq!(parse_uncompressed_name(wire_repr_and_junk), Ok((target, 10)));
    }

    #[test]
    fn parse_uncompressed_name_rejects_bad_input() {
        assert_eq!(
            parse_uncompressed_name(b"\x03www\x04tes"),
            Err(Error::UnexpectedEom)
        );
        assert_eq!(
            parse_uncompressed_name(&long_name()),
            Err(Error::NameTooLong)
        );
        let mut long_label = vec![64];
        long_label.extend_from_slice(&[b'x'; 64]);
        long_label.push(0);
        assert_eq!(
            parse_uncompressed_name(&long_label),
            Err(Error::LabelTooLong)
        );
    }

    #[test]
    fn validate_uncompressed_name_works() {
        assert_eq!(validate_uncompressed_name(b"\x03www\x04test\x00junk"), Ok(10));
        assert_eq!(
            validate_uncompressed_name(b"\x03www\x04te"),
            Err(Error::UnexpectedEom)
        );
    }

    #[test]
    fn parse_compressed_name_follows_pointers() {
        let octets = b"junk\x04test\x00junk\x03www\xc0\x04junk";
        let target: Name = "www.test.".parse().unwrap();
        assert_eq!(parse_compressed_name(octets, 14), Ok((target, 6)));
    }

    #[test]
    fn parse_compressed_name_rejects_pointer_loops() {
        assert_eq!(
            parse_compressed_name(b"\xc0\x00", 0),
            Err(Error::InvalidPointer)
        );
        assert_eq!(
            parse_compressed_name(b"\x01a\x01b\xc0\x00", 2),
            Err(Error::InvalidPointer)
        );
    }

    #[test]
    fn parse_compressed_name_rejects_forward_pointers() {
        assert_eq!(
            parse_compressed_name(b"\x01x\xc0\x08junk\x00", 0),
            Err(Error::InvalidPointer)
        );
    }

    #[test]
    fn parse_compressed_name_rejects_truncation() {
        assert_eq!(
            parse_compressed_name(b"\x03www", 0),
            Err(Error::UnexpectedEom)
        );
        assert_eq!(parse_compressed_name(b"\x03www", 4), Err(Error::UnexpectedEom));
        assert_eq!(parse_compressed_name(&long_name(), 0), Err(Error::NameTooLong));
    }
}
