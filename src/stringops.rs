//! String helpers: ASCII case mapping, trimming, splitting, joining and
//! encoding conversions.

use std::fmt::{Display, Write};
use std::str::FromStr;

use bitflags::bitflags;

use crate::{Result, UtilsError};

const WHITESPACE: &[char] = &[' ', '\t', '\r', '\n'];

bitflags! {
    pub struct SplitOptions: u8 {
        /// Trim surrounding whitespace of every token
        const TRIM = 0b01;
        /// Drop tokens that are empty, after trimming if that is requested
        const NO_EMPTY = 0b10;
    }
}

/// Something a string can be split on: a `char` or a string.
pub trait Delimiter {
    fn split_str<'a>(&self, s: &'a str) -> Vec<&'a str>;
}

impl Delimiter for char {
    fn split_str<'a>(&self, s: &'a str) -> Vec<&'a str> {
        s.split(*self).collect()
    }
}

impl<'d> Delimiter for &'d str {
    fn split_str<'a>(&self, s: &'a str) -> Vec<&'a str> {
        if self.is_empty() {
            return vec![s];
        }
        s.split(*self).collect()
    }
}

impl Delimiter for String {
    fn split_str<'a>(&self, s: &'a str) -> Vec<&'a str> {
        self.as_str().split_str(s)
    }
}

pub fn lowercase(s: &str) -> String {
    s.to_ascii_lowercase()
}

pub fn lowercase_in_place(s: &mut String) {
    s.make_ascii_lowercase();
}

pub fn uppercase(s: &str) -> String {
    s.to_ascii_uppercase()
}

pub fn uppercase_in_place(s: &mut String) {
    s.make_ascii_uppercase();
}

pub fn trimmed_view(s: &str) -> &str {
    s.trim_matches(WHITESPACE)
}

pub fn trim(s: &str) -> String {
    trimmed_view(s).to_owned()
}

pub fn trim_in_place(s: &mut String) {
    let end = s.trim_end_matches(WHITESPACE).len();
    s.truncate(end);
    let start = s.len() - s.trim_start_matches(WHITESPACE).len();
    s.drain(..start);
}

/// Replace every occurrence of `search`, scanning left to right and
/// continuing after each inserted replacement. An empty `search` leaves
/// the string untouched.
pub fn replace(s: &mut String, search: &str, replacement: &str) {
    if search.is_empty() || !s.contains(search) {
        return;
    }
    *s = s.replace(search, replacement);
}

pub fn dos2unix(s: &mut String) {
    replace(s, "\r\n", "\n");
}

pub fn join<I>(items: I, separator: &str) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    itertools::join(items, separator)
}

pub fn starts_with(s: &str, search: &str) -> bool {
    s.starts_with(search)
}

pub fn ends_with(s: &str, search: &str) -> bool {
    s.ends_with(search)
}

/// Percent-encodes every byte outside `[0-9A-Za-z-_.!~*'()]` as a
/// zero-padded lowercase pair (`"\n"` becomes `%0a`); spaces become `+`.
pub fn url_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'0'..=b'9'
            | b'A'..=b'Z'
            | b'a'..=b'z'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            b' ' => encoded.push('+'),
            _ => {
                // writing to a String cannot fail
                let _ = write!(encoded, "%{:02x}", byte);
            }
        }
    }
    encoded
}

/// Split `s` on every occurrence of `delimiter`, borrowing the tokens.
///
/// Leading, trailing and consecutive delimiters produce empty tokens
/// unless [`SplitOptions::NO_EMPTY`] is given.
pub fn splitted_view<'a, D: Delimiter>(
    s: &'a str,
    delimiter: D,
    options: SplitOptions,
) -> Vec<&'a str> {
    delimiter
        .split_str(s)
        .into_iter()
        .map(|token| {
            if options.contains(SplitOptions::TRIM) {
                trimmed_view(token)
            } else {
                token
            }
        })
        .filter(|token| {
            !(options.contains(SplitOptions::NO_EMPTY) && token.is_empty())
        })
        .collect()
}

pub fn split<D: Delimiter>(
    s: &str,
    delimiter: D,
    options: SplitOptions,
) -> Vec<String> {
    splitted_view(s, delimiter, options)
        .into_iter()
        .map(str::to_owned)
        .collect()
}

pub fn to_numeric<T>(s: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    s.trim().parse::<T>().map_err(|e| {
        UtilsError::Parse(format!("'{}' is not a valid number: {}", s, e))
    })
}

pub fn utf8_to_utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

pub fn utf16_to_utf8(wide: &[u16]) -> Result<String> {
    Ok(String::from_utf16(wide)?)
}
