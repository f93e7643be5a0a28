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

//! Crate-private utilities.

use std::error::Error;
use std::fmt;

/// Displays an error followed by its chain of sources, separated by
/// colons.
pub struct ErrorChain<'a>(pub &'a dyn Error);

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

/// Parses the RFC 3597 § 5 generic form of a numeric mnemonic (e.g.
/// `TYPE65402`). Returns `None` if `text` does not start
/// with `prefix` (compared case-insensitively), and otherwise the
/// result of parsing the remainder as a `u16`.
pub fn parse_generic_mnemonic(text: &str, prefix: &str) -> Option<Result<u16, &'static str>> {
    let head = text.get(0..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(
            text[prefix.len()..]
                .parse::<u16>()
                .or(Err("value is not a valid unsigned 16-bit integer")),
        )
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("outer")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_chain_lists_sources() {
        let error = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        assert_eq!(ErrorChain(&error).to_string(), "outer: inner");
    }

    #[test]
    fn generic_mnemonic_parsing_works() {
        assert_eq!(parse_generic_mnemonic("TYPE65402", "TYPE"), Some(Ok(65402)));
        assert_eq!(parse_generic_mnemonic("class1", "CLASS"), Some(Ok(1)));
        assert!(matches!(
            parse_generic_mnemonic("TYPE70000", "TYPE"),
            Some(Err(_))
        ));
        assert_eq!(parse_generic_mnemonic("LUA", "TYPE"), None);
        assert_eq!(parse_generic_mnemonic("T", "TYPE"), None);
    }
}
