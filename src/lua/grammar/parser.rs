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

//! Recursive-descent parsers for the GSLB function calls.

use std::str::FromStr;

use super::lexer::{tokenize, Spanned, Token};
use super::MismatchError;
use crate::lua::{Policy, Weighted};

/// A cursor over the tokens of one snippet.
pub struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Result<Self, MismatchError> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
            end: text.len(),
        })
    }

    /// `pickrandom({'a','b'})`
    pub fn pickrandom(&mut self) -> Result<Policy, MismatchError> {
        self.call("pickrandom")?;
        let addresses = self.string_list()?;
        self.close_call()?;
        Ok(Policy::PickRandom { addresses })
    }

    /// `pickwrandom({{1, 'a'},{2, 'b'}})`
    pub fn pickwrandom(&mut self) -> Result<Policy, MismatchError> {
        self.call("pickwrandom")?;
        let weighted = self.list(|this| {
            this.expect(Token::LBrace)?;
            let weight = this.integer()?;
            this.expect(Token::Comma)?;
            let address = this.string()?;
            this.expect(Token::RBrace)?;
            Ok(Weighted { weight, address })
        })?;
        self.close_call()?;
        Ok(Policy::PickWeightedRandom { weighted })
    }

    /// `ifportup(443, {'a','b'},{timeout=10})`
    pub fn ifportup(&mut self) -> Result<Policy, MismatchError> {
        self.call("ifportup")?;
        let port = self.integer()?;
        self.expect(Token::Comma)?;
        let addresses = self.string_list()?;
        self.expect(Token::Comma)?;
        self.expect(Token::LBrace)?;
        self.keyword("timeout")?;
        let timeout = self.integer()?;
        self.expect(Token::RBrace)?;
        self.close_call()?;
        Ok(Policy::IfPortUp {
            port,
            addresses,
            timeout,
        })
    }

    /// `ifurlup('URL', {{'p1','p2'}, {'b1'} },{stringmatch='S'})`
    pub fn ifurlup(&mut self) -> Result<Policy, MismatchError> {
        self.call("ifurlup")?;
        let url = self.string()?;
        self.expect(Token::Comma)?;
        self.expect(Token::LBrace)?;
        let primary = self.string_list()?;
        self.expect(Token::Comma)?;
        let backup = self.string_list()?;
        self.expect(Token::RBrace)?;
        self.expect(Token::Comma)?;
        self.expect(Token::LBrace)?;
        self.keyword("stringmatch")?;
        let stringmatch = self.string()?;
        self.expect(Token::RBrace)?;
        self.close_call()?;
        Ok(Policy::IfUrlUp {
            url,
            primary,
            backup,
            stringmatch,
        })
    }

    ////////////////////////////////////////////////////////////////////
    // BUILDING BLOCKS                                                //
    ////////////////////////////////////////////////////////////////////

    /// `function(`
    fn call(&mut self, function: &'static str) -> Result<(), MismatchError> {
        match self.next() {
            Some((_, Token::Ident(name))) if name == function => self.expect(Token::LParen),
            Some((offset, _)) => Err(MismatchError::Expected {
                offset,
                expected: function,
            }),
            None => Err(self.expected_at_end(function)),
        }
    }

    /// `)` followed by the end of the snippet.
    fn close_call(&mut self) -> Result<(), MismatchError> {
        self.expect(Token::RParen)?;
        match self.next() {
            None => Ok(()),
            Some((offset, _)) => Err(MismatchError::Expected {
                offset,
                expected: "end of snippet",
            }),
        }
    }

    /// `keyword=`
    fn keyword(&mut self, keyword: &'static str) -> Result<(), MismatchError> {
        match self.next() {
            Some((_, Token::Ident(name))) if name == keyword => self.expect(Token::Equals),
            Some((offset, _)) => Err(MismatchError::Expected {
                offset,
                expected: keyword,
            }),
            None => Err(self.expected_at_end(keyword)),
        }
    }

    /// `{'a','b'}` or `{}`
    fn string_list(&mut self) -> Result<Vec<String>, MismatchError> {
        self.list(Self::string)
    }

    /// A brace-enclosed, comma-separated list of items parsed by
    /// `item`. The list may be empty.
    fn list<T, F>(&mut self, mut item: F) -> Result<Vec<T>, MismatchError>
    where
        F: FnMut(&mut Self) -> Result<T, MismatchError>,
    {
        self.expect(Token::LBrace)?;
        let mut items = Vec::new();
        if self.peek() == Some(Token::RBrace) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            match self.next() {
                Some((_, Token::Comma)) => continue,
                Some((_, Token::RBrace)) => return Ok(items),
                Some((offset, _)) => {
                    return Err(MismatchError::Expected {
                        offset,
                        expected: "',' or '}'",
                    })
                }
                None => return Err(self.expected_at_end("'}'")),
            }
        }
    }

    fn string(&mut self) -> Result<String, MismatchError> {
        match self.next() {
            Some((_, Token::Str(contents))) => Ok(contents.to_owned()),
            Some((offset, _)) => Err(MismatchError::Expected {
                offset,
                expected: "string",
            }),
            None => Err(self.expected_at_end("string")),
        }
    }

    fn integer<T: FromStr>(&mut self) -> Result<T, MismatchError> {
        match self.next() {
            Some((offset, Token::Int(digits))) => digits
                .parse()
                .or(Err(MismatchError::IntegerOutOfRange { offset })),
            Some((offset, _)) => Err(MismatchError::Expected {
                offset,
                expected: "integer",
            }),
            None => Err(self.expected_at_end("integer")),
        }
    }

    fn expect(&mut self, token: Token<'static>) -> Result<(), MismatchError> {
        match self.next() {
            Some((_, actual)) if actual == token => Ok(()),
            Some((offset, _)) => Err(MismatchError::Expected {
                offset,
                expected: token.describe(),
            }),
            None => Err(self.expected_at_end(token.describe())),
        }
    }

    fn expected_at_end(&self, expected: &'static str) -> MismatchError {
        MismatchError::Expected {
            offset: self.end,
            expected,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|&(_, token)| token)
    }

    fn next(&mut self) -> Option<Spanned<'a>> {
        let spanned = self.tokens.get(self.pos).copied();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }
}
