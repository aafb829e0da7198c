// Copyright 2019 The whatwg-url developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! whatwg-url is an implementation of the [URL Standard](https://url.spec.whatwg.org/)
//! for the Rust programming language, producing byte-identical output to
//! browser and JavaScript-runtime URL parsers.
//!
//! A parsed [`Url`] owns one normalized serialization; every component is a
//! substring of it, addressed through a small offset table. Reading a
//! component never allocates.
//!
//! # URL parsing and data structures
//!
//! First, URL parsing may fail for various reasons and therefore returns a
//! `Result`.
//!
//! ```
//! use whatwg_url::{ParseError, Url};
//!
//! assert_eq!(Url::parse("http://[:::1]"), Err(ParseError::InvalidIpv6Address));
//! ```
//!
//! Let's parse a valid URL and look at its components.
//!
//! ```
//! use whatwg_url::Url;
//!
//! let issue_list_url = Url::parse(
//!     "https://github.com/rust-lang/rust/issues?labels=E-easy&state=open"
//! ).unwrap();
//!
//! assert_eq!(issue_list_url.scheme(), "https");
//! assert_eq!(issue_list_url.username(), "");
//! assert_eq!(issue_list_url.hostname(), "github.com");
//! assert_eq!(issue_list_url.pathname(), "/rust-lang/rust/issues");
//! assert_eq!(issue_list_url.search(), "?labels=E-easy&state=open");
//! assert_eq!(issue_list_url.hash(), "");
//! ```
//!
//! # Base URL
//!
//! Many contexts allow URL *references* that can be relative to a *base URL*:
//!
//! ```html
//! <link rel="stylesheet" href="../main.css">
//! ```
//!
//! Since parsed URLs are absolute, giving a base is required for parsing a
//! relative URL:
//!
//! ```
//! use whatwg_url::{ParseError, Url};
//!
//! assert_eq!(Url::parse("../main.css"), Err(ParseError::RelativeUrlWithoutBase));
//!
//! let this_document = Url::parse("http://servo.github.io/rust-url/url/index.html").unwrap();
//! let css_url = this_document.join("../main.css").unwrap();
//! assert_eq!(css_url.as_str(), "http://servo.github.io/rust-url/main.css");
//! ```

#![doc(html_root_url = "https://docs.rs/whatwg-url/0.3.0")]

pub use form_urlencoded;

use std::char;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use percent_encoding::utf8_percent_encode;

use crate::parser::{Parser, StateOverride};
use crate::serializer::{PartType, Serializer, PART_COUNT, PART_START};

mod host;
mod parser;
mod serializer;

pub use crate::host::{Host, HostType};
pub use crate::parser::{ParseError, ParseResult, SyntaxViolation};

use crate::parser::SchemeInfo;

// not-null flags, one per part, plus the cannot-be-a-base-URL flag
pub(crate) const CANNOT_BE_BASE_FLAG: u32 = 1 << PART_COUNT as u32;
const INITIAL_FLAGS: u32 = (1 << PartType::Scheme as u32)
    | (1 << PartType::Username as u32)
    | (1 << PartType::Password as u32)
    | (1 << PartType::Path as u32);

/// A parsed URL record.
#[derive(Clone)]
pub struct Url {
    /// The normalized text of the whole URL; every part is a substring.
    pub(crate) serialization: String,
    /// Cumulative end offset of each part within `serialization`.
    pub(crate) part_end: [u32; PART_COUNT],
    pub(crate) scheme_info: Option<&'static SchemeInfo>,
    pub(crate) flags: u32,
    /// Number of `/`-delimited path segments currently serialized.
    pub(crate) path_segment_count: u32,
}

/// Full configuration for the URL parser.
#[derive(Clone, Copy)]
pub struct ParseOptions<'a> {
    base_url: Option<&'a Url>,
    violation_fn: Option<&'a dyn Fn(SyntaxViolation)>,
}

impl<'a> ParseOptions<'a> {
    /// Change the base URL against which relative references resolve.
    pub fn base_url(mut self, new: Option<&'a Url>) -> Self {
        self.base_url = new;
        self
    }

    /// Call the provided function for each non-fatal syntax violation the
    /// parser recovers from.
    ///
    /// ```
    /// use std::cell::Cell;
    /// use whatwg_url::Url;
    ///
    /// let violations = Cell::new(0);
    /// let url = Url::options()
    ///     .syntax_violation_callback(Some(&|_| violations.set(violations.get() + 1)))
    ///     .parse("http:////example.com/a/../b")
    ///     .unwrap();
    /// assert_eq!(url.as_str(), "http://example.com/b");
    /// assert!(violations.get() > 0);
    /// ```
    pub fn syntax_violation_callback(mut self, new: Option<&'a dyn Fn(SyntaxViolation)>) -> Self {
        self.violation_fn = new;
        self
    }

    /// Parse a URL string with the configuration so far.
    pub fn parse(self, input: &str) -> Result<Url, ParseError> {
        let mut url = Url::empty();
        let mut parser = Parser {
            serializer: Serializer::for_parse(&mut url),
            base: self.base_url,
            violation_fn: self.violation_fn,
            state_override: None,
        };
        parser.parse(input)?;
        Ok(url)
    }

    /// Parse a URL given as UTF-16 code units, substituting U+FFFD for
    /// unpaired surrogates.
    pub fn parse_utf16(self, input: &[u16]) -> Result<Url, ParseError> {
        let decoded: String = char::decode_utf16(input.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        self.parse(&decoded)
    }

    /// Parse a URL given as UTF-32 code units, substituting U+FFFD for
    /// invalid code points.
    pub fn parse_utf32(self, input: &[u32]) -> Result<Url, ParseError> {
        let decoded: String = input
            .iter()
            .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        self.parse(&decoded)
    }
}

impl Url {
    /// Parse an absolute URL from a string.
    #[inline]
    pub fn parse(input: &str) -> Result<Url, ParseError> {
        Url::options().parse(input)
    }

    /// Parse a string as a URL, with this URL as the base URL.
    #[inline]
    pub fn join(&self, input: &str) -> Result<Url, ParseError> {
        Url::options().base_url(Some(self)).parse(input)
    }

    /// Return a default `ParseOptions` that can fully configure the URL
    /// parser before calling one of its `parse` methods.
    pub fn options<'a>() -> ParseOptions<'a> {
        ParseOptions {
            base_url: None,
            violation_fn: None,
        }
    }

    fn empty() -> Url {
        Url {
            serialization: String::new(),
            part_end: [0; PART_COUNT],
            scheme_info: None,
            flags: INITIAL_FLAGS,
            path_segment_count: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.serialization.clear();
        self.part_end = [0; PART_COUNT];
        self.scheme_info = None;
        self.flags = INITIAL_FLAGS;
        self.path_segment_count = 0;
    }

    // getters

    /// Return the serialization of this URL.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.serialization
    }

    /// Return the serialization of this URL; the `href` attribute getter.
    #[inline]
    pub fn href(&self) -> &str {
        &self.serialization
    }

    /// Return the serialization of this URL without its fragment identifier.
    pub fn serialize_no_fragment(&self) -> &str {
        if self.is_null(PartType::Fragment) {
            &self.serialization
        } else {
            &self.serialization[..self.part_end[PartType::Query as usize] as usize]
        }
    }

    /// Return the scheme of this URL, in ASCII lower case, without the `:`
    /// delimiter.
    #[inline]
    pub fn scheme(&self) -> &str {
        self.part_view(PartType::Scheme)
    }

    /// The scheme followed by `:`, as the `protocol` attribute returns it.
    pub fn protocol(&self) -> &str {
        let end = self.part_end[PartType::Scheme as usize] as usize;
        if end == 0 {
            ""
        } else {
            &self.serialization[..end + 1]
        }
    }

    /// The percent-encoded username, or the empty string.
    #[inline]
    pub fn username(&self) -> &str {
        self.part_view(PartType::Username)
    }

    /// The percent-encoded password, or the empty string.
    #[inline]
    pub fn password(&self) -> &str {
        self.part_view(PartType::Password)
    }

    /// The host and, if one is explicitly serialized, the port, joined by
    /// `:`. The empty string if this URL has no host.
    pub fn host(&self) -> &str {
        if self.is_null(PartType::Host) {
            return "";
        }
        let start = self.part_end[PartType::HostStart as usize] as usize;
        let end = if self.is_null(PartType::Port) {
            self.part_end[PartType::Host as usize]
        } else {
            self.part_end[PartType::Port as usize]
        } as usize;
        &self.serialization[start..end]
    }

    /// The canonical host text, without any port. The empty string if this
    /// URL has no host or an empty one.
    #[inline]
    pub fn hostname(&self) -> &str {
        self.part_view(PartType::Host)
    }

    /// Whether this URL has a non-null host.
    ///
    /// URLs in schemes without an authority, such as `mailto:`, have no
    /// host, which is different from having an empty one.
    #[inline]
    pub fn has_host(&self) -> bool {
        !self.is_null(PartType::Host)
    }

    /// Classify the host. The tag is re-derived from the canonical host
    /// text, which is unambiguous after parsing.
    pub fn host_type(&self) -> Option<HostType> {
        if self.is_null(PartType::Host) {
            return None;
        }
        Some(host::classify_host(self.hostname(), self.is_special()))
    }

    /// The explicitly serialized port digits, or the empty string. Default
    /// ports are omitted from the serialization.
    #[inline]
    pub fn port(&self) -> &str {
        self.part_view(PartType::Port)
    }

    /// The explicitly serialized port as an integer.
    pub fn port_number(&self) -> Option<u16> {
        let port = self.part_view(PartType::Port);
        if port.is_empty() {
            None
        } else {
            port.parse::<u16>().ok()
        }
    }

    /// The serialized port, or the scheme's default port.
    pub fn port_or_known_default(&self) -> Option<u16> {
        self.port_number()
            .or_else(|| self.scheme_info.and_then(|info| info.default_port))
    }

    #[inline]
    pub fn has_port(&self) -> bool {
        !self.is_null(PartType::Port)
    }

    /// The percent-encoded path.
    #[inline]
    pub fn pathname(&self) -> &str {
        self.part_view(PartType::Path)
    }

    /// The percent-encoded query, without the `?` delimiter. `None` if the
    /// `?` delimiter was not part of the parsed input.
    pub fn query(&self) -> Option<&str> {
        if self.is_null(PartType::Query) {
            None
        } else {
            Some(self.part_view(PartType::Query))
        }
    }

    /// `?` followed by the query, or the empty string for a null or empty
    /// query, as the `search` attribute returns it.
    pub fn search(&self) -> &str {
        if self.is_empty(PartType::Query) {
            return "";
        }
        let start = self.part_end[PartType::Path as usize] as usize;
        let end = self.part_end[PartType::Query as usize] as usize;
        &self.serialization[start..end]
    }

    #[inline]
    pub fn has_query(&self) -> bool {
        !self.is_null(PartType::Query)
    }

    /// The percent-encoded fragment identifier, without the `#` delimiter.
    /// `None` if the `#` delimiter was not part of the parsed input.
    pub fn fragment(&self) -> Option<&str> {
        if self.is_null(PartType::Fragment) {
            None
        } else {
            Some(self.part_view(PartType::Fragment))
        }
    }

    /// `#` followed by the fragment, or the empty string for a null or
    /// empty fragment, as the `hash` attribute returns it.
    pub fn hash(&self) -> &str {
        if self.is_empty(PartType::Fragment) {
            return "";
        }
        let start = self.part_end[PartType::Query as usize] as usize;
        let end = self.part_end[PartType::Fragment as usize] as usize;
        &self.serialization[start..end]
    }

    #[inline]
    pub fn has_fragment(&self) -> bool {
        !self.is_null(PartType::Fragment)
    }

    /// The ASCII serialization of this URL's origin
    /// (<https://url.spec.whatwg.org/#origin>).
    ///
    /// Special non-file URLs have a tuple origin `scheme://host[:port]`;
    /// `blob:` URLs take the origin of the URL in their path; everything
    /// else serializes as `"null"`.
    pub fn origin(&self) -> String {
        if self.is_special() {
            if self.is_file_scheme() {
                return "null".to_owned();
            }
            let mut origin = String::with_capacity(self.serialization.len());
            origin.push_str(&self.serialization[..self.part_end[PartType::SchemeSep as usize] as usize]);
            let host_start = self.part_end[PartType::HostStart as usize] as usize;
            let port_end = self.part_end[PartType::Port as usize] as usize;
            origin.push_str(&self.serialization[host_start..port_end]);
            origin
        } else if self.scheme() == "blob" {
            // no blob URL store; the origin comes from the URL in the path
            match Url::parse(self.pathname()) {
                Ok(url) => url.origin(),
                Err(_) => "null".to_owned(),
            }
        } else {
            "null".to_owned()
        }
    }

    /// Whether the scheme is one of `ftp`, `file`, `gopher`, `http`,
    /// `https`, `ws`, `wss`.
    #[inline]
    pub fn is_special(&self) -> bool {
        self.scheme_info.map_or(false, |info| info.is_special)
    }

    /// Whether this URL's path is a single opaque string, disallowing
    /// relative resolution and host mutation.
    #[inline]
    pub fn cannot_be_a_base(&self) -> bool {
        self.flags & CANNOT_BE_BASE_FLAG != 0
    }

    /// Whether the URL has a non-empty username or password.
    #[inline]
    pub fn has_credentials(&self) -> bool {
        !self.is_empty(PartType::Username) || !self.is_empty(PartType::Password)
    }

    /// Compare two URLs, ignoring any difference confined to the fragment.
    pub fn eq_excluding_fragment(&self, other: &Url) -> bool {
        self.serialize_no_fragment() == other.serialize_no_fragment()
    }

    /// Parse the query as `application/x-www-form-urlencoded` key/value
    /// pairs.
    pub fn query_pairs(&self) -> form_urlencoded::Parse<'_> {
        form_urlencoded::parse(self.query().unwrap_or("").as_bytes())
    }

    // setters

    /// Replace the whole URL with the result of parsing `input`. The prior
    /// value is preserved on failure.
    pub fn set_href(&mut self, input: &str) -> Result<(), ParseError> {
        let url = Url::parse(input)?;
        *self = url;
        Ok(())
    }

    /// The `protocol` setter.
    ///
    /// A trailing `:` in `input` is allowed but not required. Switching
    /// between special and non-special schemes is ignored, as are switches
    /// to `file:` with credentials or a port, and away from `file:` with an
    /// empty host.
    pub fn set_protocol(&mut self, input: &str) -> Result<(), ParseError> {
        self.mutate(input, StateOverride::SchemeStart)
    }

    /// The `username` setter.
    pub fn set_username(&mut self, input: &str) -> Result<(), ParseError> {
        if !self.can_have_username_password_port() {
            return Err(ParseError::SetterIgnored);
        }
        let mut serializer = Serializer::for_setter(self);
        serializer
            .start_part(PartType::Username)
            .extend(utf8_percent_encode(input, parser::USERINFO));
        serializer.save_part();
        Ok(())
    }

    /// The `password` setter.
    pub fn set_password(&mut self, input: &str) -> Result<(), ParseError> {
        if !self.can_have_username_password_port() {
            return Err(ParseError::SetterIgnored);
        }
        let mut serializer = Serializer::for_setter(self);
        serializer
            .start_part(PartType::Password)
            .extend(utf8_percent_encode(input, parser::USERINFO));
        serializer.save_part();
        Ok(())
    }

    /// The `host` setter: host and, optionally, port.
    pub fn set_host(&mut self, input: &str) -> Result<(), ParseError> {
        if self.cannot_be_a_base() {
            return Err(ParseError::SetHostOnCannotBeABaseUrl);
        }
        self.mutate(input, StateOverride::Host)
    }

    /// The `hostname` setter: host only, a port suffix is ignored.
    pub fn set_hostname(&mut self, input: &str) -> Result<(), ParseError> {
        if self.cannot_be_a_base() {
            return Err(ParseError::SetHostOnCannotBeABaseUrl);
        }
        self.mutate(input, StateOverride::Hostname)
    }

    /// The `port` setter. The empty string removes the port.
    pub fn set_port(&mut self, input: &str) -> Result<(), ParseError> {
        if !self.can_have_username_password_port() {
            return Err(ParseError::SetterIgnored);
        }
        if input.is_empty() {
            Serializer::for_setter(self).clear_part(PartType::Port);
            return Ok(());
        }
        self.mutate(input, StateOverride::Port)
    }

    /// The `pathname` setter.
    pub fn set_pathname(&mut self, input: &str) -> Result<(), ParseError> {
        if self.cannot_be_a_base() {
            return Err(ParseError::SetterIgnored);
        }
        let mut parser = Parser {
            serializer: Serializer::for_setter(self),
            base: None,
            violation_fn: None,
            state_override: Some(StateOverride::PathStart),
        };
        parser.parse_with_override(input)?;
        parser.serializer.commit_path();
        Ok(())
    }

    /// The `search` setter. The empty string removes the query; a leading
    /// `?` is allowed but not required.
    pub fn set_search(&mut self, input: &str) -> Result<(), ParseError> {
        if input.is_empty() {
            Serializer::for_setter(self).clear_part(PartType::Query);
            return Ok(());
        }
        let input = input.strip_prefix('?').unwrap_or(input);
        self.mutate(input, StateOverride::Query)
    }

    /// The `hash` setter. The empty string removes the fragment; a leading
    /// `#` is allowed but not required.
    pub fn set_hash(&mut self, input: &str) -> Result<(), ParseError> {
        if input.is_empty() {
            Serializer::for_setter(self).clear_part(PartType::Fragment);
            return Ok(());
        }
        let input = input.strip_prefix('#').unwrap_or(input);
        self.mutate(input, StateOverride::Fragment)
    }

    fn mutate(&mut self, input: &str, state_override: StateOverride) -> Result<(), ParseError> {
        let mut parser = Parser {
            serializer: Serializer::for_setter(self),
            base: None,
            violation_fn: None,
            state_override: Some(state_override),
        };
        parser.parse_with_override(input)
    }

    fn can_have_username_password_port(&self) -> bool {
        !(self.is_empty(PartType::Host) || self.cannot_be_a_base() || self.is_file_scheme())
    }

    // internals shared with the serializer and parser

    pub(crate) fn part_view(&self, part: PartType) -> &str {
        if part == PartType::Scheme {
            return &self.serialization[..self.part_end[PartType::Scheme as usize] as usize];
        }
        let start =
            (self.part_end[part as usize - 1] + PART_START[part as usize]) as usize;
        let end = self.part_end[part as usize] as usize;
        if end > start {
            &self.serialization[start..end]
        } else {
            ""
        }
    }

    pub(crate) fn part_len(&self, part: PartType) -> u32 {
        debug_assert!(part > PartType::Scheme);
        self.part_end[part as usize] - self.part_end[part as usize - 1]
    }

    pub(crate) fn is_empty(&self, part: PartType) -> bool {
        if part == PartType::Scheme {
            return self.part_end[PartType::Scheme as usize] == 0;
        }
        let start = self.part_end[part as usize - 1] + PART_START[part as usize];
        start >= self.part_end[part as usize]
    }

    pub(crate) fn is_null(&self, part: PartType) -> bool {
        self.flags & (1u32 << part as usize) == 0
    }

    pub(crate) fn is_file_scheme(&self) -> bool {
        self.scheme_info.map_or(false, |info| info.is_file)
    }

    /// The path's first segment, if it is exactly `len` bytes long.
    pub(crate) fn first_path_segment(&self, len: usize) -> &str {
        let path = self.part_view(PartType::Path);
        if path.is_empty() || self.cannot_be_a_base() {
            return path;
        }
        let rest = &path[1..];
        if rest.len() == len || (rest.len() > len && rest.as_bytes()[len] == b'/') {
            &rest[..len]
        } else {
            ""
        }
    }

    /// Bounds of the path with its last segment removed, if any.
    pub(crate) fn path_rem_last(&self) -> Option<(u32, u32)> {
        if self.path_segment_count == 0 {
            return None;
        }
        let path_start = self.part_end[PartType::Port as usize] as usize;
        let path_end = self.part_end[PartType::Path as usize] as usize;
        let new_end = match self.serialization[path_start..path_end].rfind('/') {
            Some(position) => path_start + position,
            None => path_start,
        };
        Some((new_end as u32, self.path_segment_count - 1))
    }

    /// Like `path_rem_last`, except a file URL's path that is a lone
    /// normalized Windows drive letter is not shortened.
    pub(crate) fn shorten_path_bounds(&self) -> Option<(u32, u32)> {
        if self.path_segment_count == 0 {
            return None;
        }
        if self.is_file_scheme() && self.path_segment_count == 1 {
            let segment = self.first_path_segment(2);
            if parser::is_normalized_windows_drive(segment) {
                return None;
            }
        }
        self.path_rem_last()
    }
}

/// Return the serialization of this URL.
impl fmt::Display for Url {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.serialization)
    }
}

impl fmt::Debug for Url {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.serialization)
    }
}

/// Parse a string as a URL, without a base URL.
impl FromStr for Url {
    type Err = ParseError;

    #[inline]
    fn from_str(input: &str) -> Result<Url, ParseError> {
        Url::parse(input)
    }
}

impl TryFrom<&str> for Url {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
    }
}

/// String conversion consumes the URL's serialization.
impl From<Url> for String {
    fn from(value: Url) -> String {
        value.serialization
    }
}

/// URLs compare like their serializations.
impl Eq for Url {}

impl PartialEq for Url {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.serialization == other.serialization
    }
}

impl Ord for Url {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.serialization.cmp(&other.serialization)
    }
}

impl PartialOrd for Url {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// URLs hash like their serializations.
impl Hash for Url {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serialization.hash(state)
    }
}

/// Serializes this URL into a `serde` stream.
#[cfg(feature = "serde")]
impl serde::Serialize for Url {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Deserializes this URL from a `serde` stream.
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Url {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
        use serde::de::{Error, Unexpected};
        let input: std::borrow::Cow<'de, str> = serde::Deserialize::deserialize(deserializer)?;
        Url::parse(&input)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&input), &"a string representing a URL"))
    }
}
