// Copyright 2019 The whatwg-url developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The basic URL parser.
//!
//! <https://url.spec.whatwg.org/#concept-basic-url-parser>

use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Write};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::host;
use crate::serializer::{PartType, PathOp, Serializer};
use crate::Url;

/// <https://url.spec.whatwg.org/#fragment-percent-encode-set>
pub(crate) const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// <https://url.spec.whatwg.org/#query-state>
pub(crate) const QUERY: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'<').add(b'>');
pub(crate) const SPECIAL_QUERY: &AsciiSet = &QUERY.add(b'\'');

/// <https://url.spec.whatwg.org/#path-percent-encode-set>
pub(crate) const PATH: &AsciiSet = &QUERY.add(b'`').add(b'?').add(b'{').add(b'}');

/// <https://url.spec.whatwg.org/#userinfo-percent-encode-set>
pub(crate) const USERINFO: &AsciiSet = &PATH
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'|');

pub type ParseResult<T> = Result<T, ParseError>;

macro_rules! simple_enum_error {
    ($($name: ident => $description: expr,)+) => {
        /// Errors that can occur during parsing.
        ///
        /// Every variant is a deterministic function of the input; none are
        /// transient or retryable.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum ParseError {
            $(
                $name,
            )+
        }

        impl fmt::Display for ParseError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match *self {
                    $(
                        ParseError::$name => f.write_str($description),
                    )+
                }
            }
        }
    }
}

simple_enum_error! {
    InvalidSchemeCharacter => "invalid scheme character",
    EmptyHost => "empty host",
    IdnaError => "invalid international domain name",
    InvalidPort => "invalid port number",
    InvalidIpv4Address => "invalid IPv4 address",
    InvalidIpv6Address => "invalid IPv6 address",
    InvalidDomainCharacter => "invalid domain character",
    RelativeUrlWithoutBase => "relative URL without a base",
    RelativeUrlWithCannotBeABaseBase => "relative URL with a cannot-be-a-base base",
    SetHostOnCannotBeABaseUrl => "a cannot-be-a-base URL doesn't have a host to set",
    Overflow => "URLs more than 4 GB are not supported",
    SetterIgnored => "the setter ignored the given value",
}

impl Error for ParseError {}

macro_rules! syntax_violation_enum {
    ($($name: ident => $description: expr,)+) => {
        /// Non-fatal syntax violations that the parser recovers from.
        ///
        /// These indicate violations of authoring requirements. They are
        /// reported to the callback given in
        /// [`ParseOptions::syntax_violation_callback`](crate::ParseOptions::syntax_violation_callback),
        /// for example to log them in a developer console.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum SyntaxViolation {
            $(
                $name,
            )+
        }

        impl SyntaxViolation {
            pub fn description(&self) -> &'static str {
                match *self {
                    $(
                        SyntaxViolation::$name => $description,
                    )+
                }
            }
        }
    }
}

syntax_violation_enum! {
    Backslash => "backslash",
    C0SpaceIgnored => "leading or trailing control or space character are ignored in URLs",
    EmbeddedCredentials => "embedding authentication information (username or password) \
                            in an URL is not recommended",
    ExpectedDoubleSlash => "expected //",
    ExpectedFileDoubleSlash => "expected // after file:",
    FileWithHostAndWindowsDrive => "file: with host and Windows drive letter",
    NonUrlCodePoint => "non-URL code point",
    NullInFragment => "NULL characters are ignored in URL fragment identifiers",
    PercentDecode => "expected 2 hex digits after %",
    TabOrNewlineIgnored => "tabs or newlines are ignored in URLs",
    UnencodedAtSign => "unencoded @ sign in username or password",
}

impl fmt::Display for SyntaxViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One row of the static special-scheme table.
#[derive(Debug)]
pub(crate) struct SchemeInfo {
    pub scheme: &'static str,
    pub default_port: Option<u16>,
    pub is_special: bool,
    pub is_file: bool,
    pub is_ws: bool,
}

/// <https://url.spec.whatwg.org/#special-scheme>
///
/// Must stay sorted by scheme for the binary search below.
static SCHEMES: [SchemeInfo; 7] = [
    SchemeInfo { scheme: "file", default_port: None, is_special: true, is_file: true, is_ws: false },
    SchemeInfo { scheme: "ftp", default_port: Some(21), is_special: true, is_file: false, is_ws: false },
    SchemeInfo { scheme: "gopher", default_port: Some(70), is_special: true, is_file: false, is_ws: false },
    SchemeInfo { scheme: "http", default_port: Some(80), is_special: true, is_file: false, is_ws: false },
    SchemeInfo { scheme: "https", default_port: Some(443), is_special: true, is_file: false, is_ws: false },
    SchemeInfo { scheme: "ws", default_port: Some(80), is_special: true, is_file: false, is_ws: true },
    SchemeInfo { scheme: "wss", default_port: Some(443), is_special: true, is_file: false, is_ws: true },
];

pub(crate) fn get_scheme_info(scheme: &str) -> Option<&'static SchemeInfo> {
    SCHEMES
        .binary_search_by(|info| info.scheme.cmp(scheme))
        .ok()
        .map(|index| &SCHEMES[index])
}

/// Restricted re-entry point used by the single-part setters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum StateOverride {
    SchemeStart,
    Host,
    Hostname,
    Port,
    PathStart,
    Query,
    Fragment,
}

// The serialization offsets are u32; leave room for the percent-encoding
// expansion of pathological inputs.
const MAX_INPUT_LENGTH: usize = (u32::max_value() / 4) as usize;

pub(crate) struct Parser<'a> {
    pub serializer: Serializer<'a>,
    pub base: Option<&'a Url>,
    pub violation_fn: Option<&'a dyn Fn(SyntaxViolation)>,
    pub state_override: Option<StateOverride>,
}

impl<'a> Parser<'a> {
    fn violation(&self, v: SyntaxViolation) {
        if let Some(f) = self.violation_fn {
            f(v)
        }
    }

    fn is_special(&self) -> bool {
        self.serializer.url().is_special()
    }

    fn is_file(&self) -> bool {
        self.serializer.url().is_file_scheme()
    }

    /// Full parse: trim, strip, run the machine from scheme start.
    pub(crate) fn parse(&mut self, input: &str) -> ParseResult<()> {
        // remove any leading and trailing C0 control or space
        let trimmed = input.trim_matches(|c| c <= ' ');
        if trimmed.len() != input.len() {
            self.violation(SyntaxViolation::C0SpaceIgnored);
        }
        self.parse_preprocessed(trimmed)
    }

    /// Setter re-entry: no trimming, but tabs and newlines are still
    /// stripped, then a single state subset runs.
    pub(crate) fn parse_with_override(&mut self, input: &str) -> ParseResult<()> {
        debug_assert!(self.state_override.is_some());
        self.parse_preprocessed(input)
    }

    fn parse_preprocessed(&mut self, input: &str) -> ParseResult<()> {
        // remove all ASCII tab or newline, anywhere in the input
        let stripped: Cow<'_, str> = if input.chars().any(|c| matches!(c, '\t' | '\n' | '\r')) {
            self.violation(SyntaxViolation::TabOrNewlineIgnored);
            Cow::Owned(
                input
                    .chars()
                    .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
                    .collect(),
            )
        } else {
            Cow::Borrowed(input)
        };
        let base_len = self.base.map_or(0, |base| base.as_str().len());
        if stripped.len() + base_len > MAX_INPUT_LENGTH {
            return Err(ParseError::Overflow);
        }
        match self.state_override {
            None | Some(StateOverride::SchemeStart) => self.parse_scheme_start(&stripped),
            Some(StateOverride::Host) | Some(StateOverride::Hostname) => {
                self.parse_host_state(&stripped)
            }
            Some(StateOverride::Port) => self.parse_port_state(&stripped),
            Some(StateOverride::PathStart) => self.parse_path_start(&stripped),
            Some(StateOverride::Query) => self.parse_query(&stripped),
            Some(StateOverride::Fragment) => self.parse_fragment(&stripped),
        }
    }

    // scheme start state

    fn parse_scheme_start(&mut self, input: &str) -> ParseResult<()> {
        if input
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic())
        {
            self.parse_scheme(input)
        } else if self.state_override.is_none() {
            self.parse_no_scheme(input)
        } else {
            Err(ParseError::InvalidSchemeCharacter)
        }
    }

    // scheme state

    fn parse_scheme(&mut self, input: &str) -> ParseResult<()> {
        let colon = input.find(':');
        // Under a state override the whole input is the scheme candidate,
        // so that the protocol setter works without a trailing ':'.
        if colon.is_none() && self.state_override.is_none() {
            return self.parse_no_scheme(input);
        }
        let end = colon.unwrap_or_else(|| input.len());
        let mut scheme = String::with_capacity(end);
        for c in input[..end].chars() {
            match scheme_canonical(c) {
                Some(c) => scheme.push(c),
                None => {
                    return if self.state_override.is_some() {
                        Err(ParseError::InvalidSchemeCharacter)
                    } else {
                        self.parse_no_scheme(input)
                    };
                }
            }
        }

        if self.state_override.is_some() {
            let new_info = get_scheme_info(&scheme);
            let new_special = new_info.map_or(false, |info| info.is_special);
            let url = self.serializer.url();
            // special and non-special schemes cannot be switched between
            if url.is_special() != new_special {
                return Err(ParseError::SetterIgnored);
            }
            if new_info.map_or(false, |info| info.is_file)
                && (url.has_credentials() || !url.is_null(PartType::Port))
            {
                return Err(ParseError::SetterIgnored);
            }
            if url.is_file_scheme() && url.is_empty(PartType::Host) {
                return Err(ParseError::SetterIgnored);
            }
            self.serializer.start_scheme().push_str(&scheme);
            self.serializer.save_scheme();
            // a port that just became the default is dropped
            if let Some(default_port) = new_info.and_then(|info| info.default_port) {
                if self.serializer.url().port_number() == Some(default_port) {
                    self.serializer.clear_part(PartType::Port);
                }
            }
            return Ok(());
        }

        self.serializer.start_scheme().push_str(&scheme);
        self.serializer.save_scheme();
        let remaining = &input[end + 1..];
        if self.is_file() {
            if !remaining.starts_with("//") {
                self.violation(SyntaxViolation::ExpectedFileDoubleSlash);
            }
            self.parse_file(remaining)
        } else if self.is_special() {
            if let Some(base) = self.base {
                if base.scheme() == self.serializer.url().scheme() {
                    // the base's cannot-be-a-base flag is necessarily unset
                    return self.parse_special_relative_or_authority(remaining, base);
                }
            }
            self.parse_special_authority_slashes(remaining)
        } else if remaining.starts_with('/') {
            self.parse_path_or_authority(&remaining[1..])
        } else {
            self.serializer.set_cannot_be_base();
            self.serializer.start_path_string();
            self.serializer.save_path_string();
            self.parse_cannot_be_base_path(remaining)
        }
    }

    // no scheme state

    fn parse_no_scheme(&mut self, input: &str) -> ParseResult<()> {
        let base = match self.base {
            Some(base) => base,
            None => return Err(ParseError::RelativeUrlWithoutBase),
        };
        if base.cannot_be_a_base() {
            if let Some(fragment) = strip_prefix(input, '#') {
                // the flag must be set before append_parts, which
                // serializes differently under it
                self.serializer.set_cannot_be_base();
                self.serializer.set_scheme_from(base);
                self.serializer
                    .append_parts(base, PartType::Path, PartType::Query, None);
                self.parse_fragment(fragment)
            } else {
                Err(ParseError::RelativeUrlWithCannotBeABaseBase)
            }
        } else if base.is_file_scheme() {
            self.parse_file(input)
        } else {
            self.parse_relative(input, base)
        }
    }

    // special relative or authority state

    fn parse_special_relative_or_authority(
        &mut self,
        input: &str,
        base: &Url,
    ) -> ParseResult<()> {
        if input.starts_with("//") {
            self.parse_special_authority_ignore_slashes(&input[2..])
        } else {
            self.violation(SyntaxViolation::ExpectedDoubleSlash);
            self.parse_relative(input, base)
        }
    }

    // path or authority state

    fn parse_path_or_authority(&mut self, input: &str) -> ParseResult<()> {
        if input.starts_with('/') {
            self.parse_authority(&input[1..])
        } else {
            self.parse_path(input)
        }
    }

    // relative state

    fn parse_relative(&mut self, input: &str, base: &Url) -> ParseResult<()> {
        use self::PartType::*;
        self.serializer.set_scheme_from(base);
        match input.chars().next() {
            None => {
                self.serializer.append_parts(base, Username, Query, None);
                Ok(())
            }
            Some('/') => self.parse_relative_slash(&input[1..], base),
            Some('?') => {
                self.serializer.append_parts(base, Username, Path, None);
                self.parse_query(&input[1..])
            }
            Some('#') => {
                self.serializer.append_parts(base, Username, Query, None);
                self.parse_fragment(&input[1..])
            }
            Some('\\') if self.is_special() => {
                self.violation(SyntaxViolation::Backslash);
                self.parse_relative_slash(&input[1..], base)
            }
            Some(_) => {
                self.serializer
                    .append_parts(base, Username, Path, Some(PathOp::RemoveLast));
                self.parse_path(input)
            }
        }
    }

    // relative slash state

    fn parse_relative_slash(&mut self, input: &str, base: &Url) -> ParseResult<()> {
        match input.chars().next() {
            Some('/') => {
                if self.is_special() {
                    self.parse_special_authority_ignore_slashes(&input[1..])
                } else {
                    self.parse_authority(&input[1..])
                }
            }
            Some('\\') if self.is_special() => {
                self.violation(SyntaxViolation::Backslash);
                self.parse_special_authority_ignore_slashes(&input[1..])
            }
            _ => {
                self.serializer
                    .append_parts(base, PartType::Username, PartType::Port, None);
                self.parse_path(input)
            }
        }
    }

    // special authority slashes / special authority ignore slashes states

    fn parse_special_authority_slashes(&mut self, input: &str) -> ParseResult<()> {
        if input.starts_with("//") {
            self.parse_special_authority_ignore_slashes(&input[2..])
        } else {
            self.violation(SyntaxViolation::ExpectedDoubleSlash);
            self.parse_special_authority_ignore_slashes(input)
        }
    }

    fn parse_special_authority_ignore_slashes(&mut self, input: &str) -> ParseResult<()> {
        let remaining = input.trim_start_matches(|c| c == '/' || c == '\\');
        if remaining.len() != input.len() {
            self.violation(SyntaxViolation::ExpectedDoubleSlash);
        }
        self.parse_authority(remaining)
    }

    // authority state

    fn parse_authority(&mut self, input: &str) -> ParseResult<()> {
        let end_of_authority = self.find_authority_end(input);
        let authority = &input[..end_of_authority];
        // the userinfo ends at the last '@' before the end of the authority
        let last_at = match authority.rfind('@') {
            Some(position) => position,
            None => return self.parse_host_state(input),
        };
        // disallow empty host, as in "http://u:p@/"
        if last_at + 1 == authority.len() {
            return Err(ParseError::EmptyHost);
        }
        self.violation(SyntaxViolation::EmbeddedCredentials);
        let userinfo = &authority[..last_at];
        if userinfo.contains('@') {
            self.violation(SyntaxViolation::UnencodedAtSign);
        }
        if self.violation_fn.is_some() {
            self.check_url_code_points(userinfo);
        }
        let (username, password) = match userinfo.find(':') {
            Some(position) => (&userinfo[..position], &userinfo[position + 1..]),
            None => (userinfo, ""),
        };
        if !username.is_empty() || !password.is_empty() {
            self.serializer
                .start_part(PartType::Username)
                .extend(utf8_percent_encode(username, USERINFO));
            self.serializer.save_part();
            if !password.is_empty() {
                self.serializer
                    .start_part(PartType::Password)
                    .extend(utf8_percent_encode(password, USERINFO));
                self.serializer.save_part();
            }
        }
        self.parse_host_state(&input[last_at + 1..])
    }

    // host and hostname states

    fn parse_host_state(&mut self, input: &str) -> ParseResult<()> {
        if self.state_override.is_some() && self.is_file() {
            return self.parse_file_host(input);
        }
        let end_of_authority = self.find_authority_end(input);
        // find the end of the host at ':', unless it is inside brackets
        let mut host_end = end_of_authority;
        let mut is_port = false;
        let mut in_square_brackets = false;
        for (position, c) in input[..end_of_authority].char_indices() {
            match c {
                ':' if !in_square_brackets => {
                    host_end = position;
                    is_port = true;
                    break;
                }
                '[' => in_square_brackets = true,
                ']' => in_square_brackets = false,
                _ => {}
            }
        }
        let host_input = &input[..host_end];
        if host_input.is_empty() {
            // a port or a special scheme requires a non-empty host
            if is_port || self.is_special() {
                return Err(ParseError::EmptyHost);
            }
            let url = self.serializer.url();
            if self.state_override.is_some()
                && (url.has_credentials() || !url.is_null(PartType::Port))
            {
                return Err(ParseError::SetterIgnored);
            }
        }
        let is_not_special = !self.is_special();
        {
            let output = self.serializer.start_part(PartType::Host);
            host::write_host(output, host_input, is_not_special)?;
        }
        self.serializer.save_part();
        self.serializer.set_flag(PartType::Host);

        if is_port {
            if self.state_override == Some(StateOverride::Hostname) {
                return Ok(());
            }
            self.parse_port_state(&input[host_end + 1..])
        } else {
            if self.state_override.is_some() {
                return Ok(());
            }
            self.parse_path_start(&input[host_end..])
        }
    }

    // port state

    fn parse_port_state(&mut self, input: &str) -> ParseResult<()> {
        let end_of_digits = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or_else(|| input.len());
        let is_end_of_authority = end_of_digits == input.len() || {
            let c = input[end_of_digits..].chars().next().unwrap();
            c == '/' || c == '?' || c == '#' || (c == '\\' && self.is_special())
        };
        if !is_end_of_authority && self.state_override.is_none() {
            return Err(ParseError::InvalidPort);
        }
        if end_of_digits > 0 {
            let mut port: u32 = 0;
            for byte in input[..end_of_digits].bytes() {
                port = port * 10 + (byte - b'0') as u32;
                if port > 0xFFFF {
                    return Err(ParseError::InvalidPort);
                }
            }
            let default_port = self
                .serializer
                .url()
                .scheme_info
                .and_then(|info| info.default_port);
            if default_port != Some(port as u16) {
                write!(self.serializer.start_part(PartType::Port), "{}", port).unwrap();
                self.serializer.save_part();
                self.serializer.set_flag(PartType::Port);
            } else {
                self.serializer.clear_part(PartType::Port);
            }
        }
        if self.state_override.is_some() {
            return Ok(());
        }
        self.parse_path_start(&input[end_of_digits..])
    }

    // file state

    fn parse_file(&mut self, input: &str) -> ParseResult<()> {
        use self::PartType::*;
        if !self.is_file() {
            self.serializer.set_scheme("file");
        }
        match input.chars().next() {
            Some('/') => self.parse_file_slash(&input[1..]),
            Some('\\') => {
                self.violation(SyntaxViolation::Backslash);
                self.parse_file_slash(&input[1..])
            }
            first => {
                let base = match self.base {
                    Some(base) if base.is_file_scheme() => base,
                    _ => return self.parse_path(input),
                };
                match first {
                    None => {
                        self.serializer.append_parts(base, Host, Query, None);
                        Ok(())
                    }
                    Some('?') => {
                        self.serializer.append_parts(base, Host, Path, None);
                        self.parse_query(&input[1..])
                    }
                    Some('#') => {
                        self.serializer.append_parts(base, Host, Query, None);
                        self.parse_fragment(&input[1..])
                    }
                    Some(_) => {
                        if !starts_with_windows_drive(input) {
                            self.serializer.append_parts(
                                base,
                                Host,
                                Path,
                                Some(PathOp::ShortenIfNotRoot),
                            );
                        }
                        self.parse_path(input)
                    }
                }
            }
        }
    }

    // file slash state

    fn parse_file_slash(&mut self, input: &str) -> ParseResult<()> {
        match input.chars().next() {
            Some('/') => self.parse_file_host(&input[1..]),
            Some('\\') => {
                self.violation(SyntaxViolation::Backslash);
                self.parse_file_host(&input[1..])
            }
            _ => {
                if let Some(base) = self.base {
                    if base.is_file_scheme() && !starts_with_windows_drive(input) {
                        let base_drive = base.first_path_segment(2);
                        if is_normalized_windows_drive(base_drive) {
                            // inherit the base's drive; both hosts are
                            // null here, so nothing else is copied
                            self.serializer.start_path_segment().push_str(base_drive);
                            self.serializer.save_path_segment();
                        } else {
                            self.serializer.append_parts(
                                base,
                                PartType::Host,
                                PartType::Host,
                                None,
                            );
                        }
                    }
                }
                self.parse_path(input)
            }
        }
    }

    // file host state

    fn parse_file_host(&mut self, input: &str) -> ParseResult<()> {
        let end_of_authority = input
            .find(|c| matches!(c, '/' | '\\' | '?' | '#'))
            .unwrap_or_else(|| input.len());
        let host_input = &input[..end_of_authority];
        if host_input.is_empty() {
            self.serializer.start_part(PartType::Host);
            self.serializer.save_part();
            self.serializer.set_flag(PartType::Host);
            if self.state_override.is_some() {
                return Ok(());
            }
            return self.parse_path_start(input);
        }
        if self.state_override.is_none() && is_windows_drive_segment(host_input) {
            // the drive letter is a path segment, not a host
            self.violation(SyntaxViolation::FileWithHostAndWindowsDrive);
            return self.parse_path(input);
        }
        {
            let output = self.serializer.start_part(PartType::Host);
            host::write_host(output, host_input, false)?;
        }
        self.serializer.save_part();
        self.serializer.set_flag(PartType::Host);
        if self.serializer.url().part_view(PartType::Host) == "localhost" {
            self.serializer.empty_host();
        }
        if self.state_override.is_some() {
            return Ok(());
        }
        self.parse_path_start(&input[end_of_authority..])
    }

    // path start state

    fn parse_path_start(&mut self, input: &str) -> ParseResult<()> {
        if self.is_special() {
            // one leading slash is consumed unconditionally
            let remaining = match input.chars().next() {
                Some('/') => &input[1..],
                Some('\\') => {
                    self.violation(SyntaxViolation::Backslash);
                    &input[1..]
                }
                _ => input,
            };
            self.parse_path(remaining)
        } else if !input.is_empty() {
            if self.state_override.is_none() {
                match input.as_bytes()[0] {
                    b'?' => return self.parse_query(&input[1..]),
                    b'#' => return self.parse_fragment(&input[1..]),
                    _ => {}
                }
            }
            let remaining = if input.as_bytes()[0] == b'/' {
                &input[1..]
            } else {
                input
            };
            self.parse_path(remaining)
        } else {
            Ok(())
        }
    }

    // path state

    fn parse_path(&mut self, input: &str) -> ParseResult<()> {
        let end_of_path = if self.state_override.is_some() {
            input.len()
        } else {
            input
                .find(|c| c == '?' || c == '#')
                .unwrap_or_else(|| input.len())
        };
        self.write_path(&input[..end_of_path]);

        if self.is_file() {
            self.serializer.remove_leading_path_slashes();
        }

        let remaining = &input[end_of_path..];
        match remaining.chars().next() {
            None => Ok(()),
            Some('?') => self.parse_query(&remaining[1..]),
            Some(_) => self.parse_fragment(&remaining[1..]),
        }
    }

    fn write_path(&mut self, input: &str) {
        let special = self.is_special();
        let mut remaining = input;
        loop {
            let end_of_segment = if special {
                remaining.find(|c| c == '/' || c == '\\')
            } else {
                remaining.find('/')
            };
            let (segment, is_last) = match end_of_segment {
                Some(position) => (&remaining[..position], false),
                None => (remaining, true),
            };
            if let Some(position) = end_of_segment {
                if remaining.as_bytes()[position] == b'\\' {
                    self.violation(SyntaxViolation::Backslash);
                }
            }
            if self.violation_fn.is_some() {
                self.check_url_code_points(segment);
            }

            if is_double_dot(segment) {
                self.serializer.shorten_path();
                if is_last {
                    self.serializer.append_empty_to_path();
                }
            } else if is_single_dot(segment) {
                if is_last {
                    self.serializer.append_empty_to_path();
                }
            } else if self.is_file()
                && self.serializer.is_empty_path()
                && is_windows_drive_segment(segment)
            {
                if !self.serializer.url().is_empty(PartType::Host) {
                    self.violation(SyntaxViolation::FileWithHostAndWindowsDrive);
                    self.serializer.empty_host();
                }
                // normalize the drive separator to ':'
                let drive_letter = segment.as_bytes()[0] as char;
                let output = self.serializer.start_path_segment();
                output.push(drive_letter);
                output.push(':');
                self.serializer.save_path_segment();
            } else {
                self.serializer
                    .start_path_segment()
                    .extend(utf8_percent_encode(segment, PATH));
                self.serializer.save_path_segment();
            }

            if is_last {
                break;
            }
            remaining = &remaining[end_of_segment.unwrap() + 1..];
        }
    }

    // cannot-be-a-base-URL path state

    fn parse_cannot_be_base_path(&mut self, input: &str) -> ParseResult<()> {
        let end_of_path = input
            .find(|c| c == '?' || c == '#')
            .unwrap_or_else(|| input.len());
        if self.violation_fn.is_some() {
            self.check_url_code_points(&input[..end_of_path]);
        }
        self.serializer
            .start_path_string()
            .extend(utf8_percent_encode(&input[..end_of_path], CONTROLS));
        self.serializer.save_path_string();

        let remaining = &input[end_of_path..];
        match remaining.chars().next() {
            None => Ok(()),
            Some('?') => self.parse_query(&remaining[1..]),
            Some(_) => self.parse_fragment(&remaining[1..]),
        }
    }

    // query state

    fn parse_query(&mut self, input: &str) -> ParseResult<()> {
        let end_of_query = if self.state_override.is_some() {
            input.len()
        } else {
            input.find('#').unwrap_or_else(|| input.len())
        };
        let query = &input[..end_of_query];
        if self.violation_fn.is_some() {
            self.check_url_code_points(query);
        }
        let info = self.serializer.url().scheme_info;
        let encode_set = if info.map_or(false, |info| info.is_special && !info.is_ws) {
            SPECIAL_QUERY
        } else {
            QUERY
        };
        self.serializer
            .start_part(PartType::Query)
            .extend(utf8_percent_encode(query, encode_set));
        self.serializer.save_part();
        self.serializer.set_flag(PartType::Query);

        if end_of_query == input.len() {
            return Ok(());
        }
        self.parse_fragment(&input[end_of_query + 1..])
    }

    // fragment state

    fn parse_fragment(&mut self, input: &str) -> ParseResult<()> {
        if self.violation_fn.is_some() {
            self.check_url_code_points(input);
        }
        let stripped: Cow<'_, str> = if input.contains('\0') {
            self.violation(SyntaxViolation::NullInFragment);
            Cow::Owned(input.chars().filter(|&c| c != '\0').collect())
        } else {
            Cow::Borrowed(input)
        };
        self.serializer
            .start_part(PartType::Fragment)
            .extend(utf8_percent_encode(&stripped, FRAGMENT));
        self.serializer.save_part();
        self.serializer.set_flag(PartType::Fragment);
        Ok(())
    }

    // helpers

    fn find_authority_end(&self, input: &str) -> usize {
        let special = self.is_special();
        input
            .find(|c| c == '/' || c == '?' || c == '#' || (special && c == '\\'))
            .unwrap_or_else(|| input.len())
    }

    fn check_url_code_points(&self, input: &str) {
        for (position, c) in input.char_indices() {
            if c == '%' {
                if !starts_with_2_hex(&input[position + 1..]) {
                    self.violation(SyntaxViolation::PercentDecode);
                }
            } else if !is_url_code_point(c) {
                self.violation(SyntaxViolation::NonUrlCodePoint);
            }
        }
    }
}

/// The canonical (lower-cased) version of each code point allowed in a
/// scheme, or `None` if the code point is not allowed.
fn scheme_canonical(c: char) -> Option<char> {
    match c {
        'a'..='z' | '0'..='9' | '+' | '-' | '.' => Some(c),
        'A'..='Z' => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn strip_prefix(input: &str, c: char) -> Option<&str> {
    if input.starts_with(c) {
        Some(&input[c.len_utf8()..])
    } else {
        None
    }
}

// Windows drive letters
// https://url.spec.whatwg.org/#windows-drive-letter

fn is_windows_drive_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && (bytes[1] == b':' || bytes[1] == b'|')
}

pub(crate) fn is_normalized_windows_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// <https://url.spec.whatwg.org/#start-with-a-windows-drive-letter>
fn starts_with_windows_drive(input: &str) -> bool {
    let bytes = input.as_bytes();
    (bytes.len() == 2 || (bytes.len() > 2 && matches!(bytes[2], b'/' | b'\\' | b'?' | b'#')))
        && bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && (bytes[1] == b':' || bytes[1] == b'|')
}

// Dot segment comparison is ASCII case-insensitive and must also match the
// percent-encoded forms.

fn is_escaped_dot(bytes: &[u8]) -> bool {
    bytes[0] == b'%' && bytes[1] == b'2' && (bytes[2] == b'e' || bytes[2] == b'E')
}

fn is_single_dot(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    match bytes.len() {
        1 => bytes[0] == b'.',
        3 => is_escaped_dot(bytes),
        _ => false,
    }
}

fn is_double_dot(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    match bytes.len() {
        2 => bytes == b"..",
        4 => {
            (bytes[0] == b'.' && is_escaped_dot(&bytes[1..]))
                || (is_escaped_dot(bytes) && bytes[3] == b'.')
        }
        6 => is_escaped_dot(bytes) && is_escaped_dot(&bytes[3..]),
        _ => false,
    }
}

#[inline]
fn is_ascii_hex_digit(byte: u8) -> bool {
    matches!(byte, b'a'..=b'f' | b'A'..=b'F' | b'0'..=b'9')
}

#[inline]
fn starts_with_2_hex(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 2 && is_ascii_hex_digit(bytes[0]) && is_ascii_hex_digit(bytes[1])
}

#[inline]
fn is_url_code_point(c: char) -> bool {
    matches!(c,
        'a'..='z'
        | 'A'..='Z'
        | '0'..='9'
        | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | '-'
        | '.' | '/' | ':' | ';' | '=' | '?' | '@' | '_' | '~'
        | '\u{A0}'..='\u{D7FF}' | '\u{E000}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{1FFFD}' | '\u{20000}'..='\u{2FFFD}'
        | '\u{30000}'..='\u{3FFFD}' | '\u{40000}'..='\u{4FFFD}'
        | '\u{50000}'..='\u{5FFFD}' | '\u{60000}'..='\u{6FFFD}'
        | '\u{70000}'..='\u{7FFFD}' | '\u{80000}'..='\u{8FFFD}'
        | '\u{90000}'..='\u{9FFFD}' | '\u{A0000}'..='\u{AFFFD}'
        | '\u{B0000}'..='\u{BFFFD}' | '\u{C0000}'..='\u{CFFFD}'
        | '\u{D0000}'..='\u{DFFFD}' | '\u{E1000}'..='\u{EFFFD}'
        | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}')
}

// Non URL code points:
// U+0000 to U+0020 (space)
// " # % < > [ \ ] ^ ` { | }
// U+007F to U+009F
// surrogates
// U+FDD0 to U+FDEF
// Last two of each plane: U+__FFFE to U+__FFFF for __ in 00 to 10 hex
