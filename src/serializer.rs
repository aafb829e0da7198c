// Copyright 2019 The whatwg-url developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Part-oriented output sink for the URL parser.
//!
//! All writes into a `Url`'s single serialization buffer go through the
//! `Serializer`, which tracks the cumulative end offset of each part. It has
//! two modes: `Build` writes a fresh serialization left to right (used by the
//! parser), and `Patch` buffers one part's replacement text and splices it
//! into an existing serialization, shifting the offsets of everything after
//! it (used by the single-part setters).

use crate::parser::{get_scheme_info, is_normalized_windows_drive};
use crate::Url;

pub(crate) const PART_COUNT: usize = 10;

/// One entry per delimited region of the serialization, in order.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum PartType {
    Scheme = 0,
    SchemeSep,
    Username,
    Password,
    HostStart,
    Host,
    Port,
    Path,
    Query,
    Fragment,
}

/// Width of the fixed separator stored before each part but excluded from
/// its value: `:` before the password and port, `?` and `#` before the
/// query and fragment.
pub(crate) const PART_START: [u32; PART_COUNT] = [0, 0, 0, 1, 0, 0, 1, 0, 1, 1];

impl PartType {
    const ALL: [PartType; PART_COUNT] = [
        PartType::Scheme,
        PartType::SchemeSep,
        PartType::Username,
        PartType::Password,
        PartType::HostStart,
        PartType::Host,
        PartType::Port,
        PartType::Path,
        PartType::Query,
        PartType::Fragment,
    ];

    pub(crate) fn from_index(index: usize) -> PartType {
        Self::ALL[index]
    }

    fn next(self) -> PartType {
        Self::ALL[self as usize + 1]
    }
}

/// Path transform applied while copying a base URL's parts, instead of
/// copying the path verbatim.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PathOp {
    /// Remove the path's last segment, if any.
    RemoveLast,
    /// Remove the last segment unless the path is a lone normalized
    /// Windows drive of a `file:` URL.
    ShortenIfNotRoot,
}

enum Mode {
    Build,
    Patch {
        buf: String,
        /// Whether the current part is being collected in `buf` for a
        /// later splice, as opposed to being appended at the end of the
        /// serialization directly.
        buffered: bool,
        part: PartType,
        path_seg_end: Vec<usize>,
    },
}

pub(crate) struct Serializer<'a> {
    url: &'a mut Url,
    last_part: PartType,
    mode: Mode,
}

impl<'a> Serializer<'a> {
    /// Reset `url` and build a fresh serialization into it.
    pub(crate) fn for_parse(url: &'a mut Url) -> Serializer<'a> {
        url.clear();
        Serializer {
            url,
            last_part: PartType::Scheme,
            mode: Mode::Build,
        }
    }

    /// Patch single parts of an already-parsed `url`, leaving all other
    /// parts byte for byte intact.
    pub(crate) fn for_setter(url: &'a mut Url) -> Serializer<'a> {
        Serializer {
            url,
            last_part: PartType::Scheme,
            mode: Mode::Patch {
                buf: String::new(),
                buffered: true,
                part: PartType::Scheme,
                path_seg_end: Vec::new(),
            },
        }
    }

    pub(crate) fn url(&self) -> &Url {
        self.url
    }

    // scheme

    pub(crate) fn start_scheme(&mut self) -> &mut String {
        match &mut self.mode {
            Mode::Build => {
                self.url.serialization.clear();
                &mut self.url.serialization
            }
            Mode::Patch { buf, buffered, part, .. } => {
                buf.clear();
                *buffered = true;
                *part = PartType::Scheme;
                buf
            }
        }
    }

    pub(crate) fn save_scheme(&mut self) {
        match &mut self.mode {
            Mode::Build => {
                let end = self.url.serialization.len() as u32;
                self.url.part_end[PartType::Scheme as usize] = end;
                self.url.scheme_info = get_scheme_info(&self.url.serialization[..end as usize]);
                self.url.serialization.push(':');
            }
            Mode::Patch { buf, .. } => {
                let scheme = std::mem::take(buf);
                self.replace_part(PartType::Scheme, &scheme);
                self.url.part_end[PartType::Scheme as usize] = scheme.len() as u32;
                self.url.scheme_info = get_scheme_info(&scheme);
            }
        }
    }

    pub(crate) fn clear_scheme(&mut self) {
        match &mut self.mode {
            Mode::Build => {
                self.url.serialization.clear();
                self.url.part_end[PartType::Scheme as usize] = 0;
                self.url.scheme_info = None;
            }
            Mode::Patch { buf, .. } => buf.clear(),
        }
    }

    /// Set the scheme from an already-parsed URL, resetting the
    /// serialization to `scheme:`.
    pub(crate) fn set_scheme_from(&mut self, src: &Url) {
        self.set_scheme_str(src.part_view(PartType::Scheme));
        self.url.scheme_info = src.scheme_info;
    }

    pub(crate) fn set_scheme(&mut self, scheme: &str) {
        self.set_scheme_str(scheme);
        self.url.scheme_info = get_scheme_info(scheme);
    }

    fn set_scheme_str(&mut self, scheme: &str) {
        debug_assert!(matches!(self.mode, Mode::Build));
        self.url.serialization.clear();
        self.url.part_end[PartType::Scheme as usize] = scheme.len() as u32;
        self.url.serialization.push_str(scheme);
        self.url.serialization.push(':');
    }

    // parts

    /// Start the given part, first emitting whatever structural separator
    /// the transition from the previously started part requires. Starting
    /// the path twice in a row keeps appending to it.
    pub(crate) fn start_part(&mut self, new_part: PartType) -> &mut String {
        if let Mode::Patch { .. } = self.mode {
            return self.setter_start_part(new_part);
        }
        self.build_start_part(new_part)
    }

    fn build_start_part(&mut self, new_part: PartType) -> &mut String {
        use self::PartType::*;
        let mut fill_start = self.last_part.next();
        match self.last_part {
            Scheme => {
                if new_part <= Host || self.url.is_file_scheme() {
                    self.url.serialization.push_str("//");
                }
            }
            Username if new_part == Password => self.url.serialization.push(':'),
            Username => {
                // password stays empty
                self.url.part_end[Password as usize] = self.url.serialization.len() as u32;
                fill_start = HostStart;
                self.url.serialization.push('@');
            }
            Password => {
                debug_assert!(new_part == Host);
                self.url.serialization.push('@');
            }
            Host if new_part == Port => self.url.serialization.push(':'),
            Path if new_part == Path => return &mut self.url.serialization,
            _ => {}
        }
        // offsets of empty parts up to the new one are also filled
        let len = self.url.serialization.len() as u32;
        for index in fill_start as usize..new_part as usize {
            self.url.part_end[index] = len;
        }
        match new_part {
            Query => self.url.serialization.push('?'),
            Fragment => self.url.serialization.push('#'),
            _ => {}
        }
        debug_assert!(self.last_part < new_part);
        self.last_part = new_part;
        &mut self.url.serialization
    }

    fn setter_start_part(&mut self, new_part: PartType) -> &mut String {
        use self::PartType::*;
        debug_assert!(new_part > Scheme);
        if self.url.part_end[new_part as usize] != 0 {
            let scheme_sep_len = self.url.part_len(SchemeSep);
            match &mut self.mode {
                Mode::Patch { buf, buffered, part, .. } => {
                    *buffered = true;
                    *part = new_part;
                    buf.clear();
                    match new_part {
                        Host => {
                            if scheme_sep_len < 3 {
                                buf.push_str("://");
                            }
                        }
                        Password | Port => buf.push(':'),
                        Query => buf.push('?'),
                        Fragment => buf.push('#'),
                        _ => {}
                    }
                    buf
                }
                Mode::Build => unreachable!(),
            }
        } else {
            // the part lies beyond everything serialized so far
            if let Mode::Patch { buffered, .. } = &mut self.mode {
                *buffered = false;
            }
            self.last_part = self.find_last_part(new_part);
            self.build_start_part(new_part)
        }
    }

    /// Commit the serialization length as the started part's end offset.
    pub(crate) fn save_part(&mut self) {
        if matches!(self.mode, Mode::Patch { buffered: true, .. }) {
            self.setter_save_part();
        } else {
            self.url.part_end[self.last_part as usize] = self.url.serialization.len() as u32;
        }
    }

    fn setter_save_part(&mut self) {
        use self::PartType::*;
        let (mut buf, part) = match &mut self.mode {
            Mode::Patch { buf, part, .. } => (std::mem::take(buf), *part),
            Mode::Build => unreachable!(),
        };
        if part == Host {
            if self.url.part_len(SchemeSep) < 3 {
                // no authority yet; `://` replaces the lone `:`
                self.replace_part_spanning(Host, &buf, SchemeSep, 3);
            } else {
                self.replace_part(Host, &buf);
            }
            return;
        }
        let empty_value = buf.len() as u32 <= PART_START[part as usize];
        match part {
            Username | Password if !empty_value && !self.url.has_credentials() => {
                buf.push('@');
                let value_len = buf.len() - 1;
                self.replace_part_spanning(HostStart, &buf, part, value_len);
            }
            Username if empty_value && self.url.is_empty(Password) => {
                // both credentials end up empty, so the `@` goes too
                self.replace_part_spanning(HostStart, "", part, 0);
            }
            Password if empty_value && self.url.is_empty(Username) => {
                self.replace_part_spanning(HostStart, "", part, 0);
            }
            _ => {
                if (part == Password || part == Port) && empty_value {
                    buf.clear(); // drop the `:`
                }
                self.replace_part(part, &buf);
            }
        }
    }

    /// Remove a part's text and mark it null. A no-op while building fresh
    /// output, where unwritten parts are null already.
    pub(crate) fn clear_part(&mut self, part: PartType) {
        if let Mode::Patch { .. } = self.mode {
            if self.url.part_end[part as usize] != 0 {
                self.replace_part(part, "");
                self.url.flags &= !(1u32 << part as usize);
            }
        }
    }

    fn empty_part(&mut self, part: PartType) {
        if self.url.part_end[part as usize] != 0 {
            self.replace_part(part, "");
        }
    }

    pub(crate) fn set_flag(&mut self, part: PartType) {
        self.url.flags |= 1u32 << part as usize;
    }

    pub(crate) fn set_cannot_be_base(&mut self) {
        debug_assert!(self.last_part == PartType::Scheme);
        self.url.flags |= crate::CANNOT_BE_BASE_FLAG;
    }

    // path

    pub(crate) fn start_path_segment(&mut self) -> &mut String {
        if matches!(self.mode, Mode::Patch { .. }) {
            if let Mode::Patch { buf, .. } = &mut self.mode {
                buf.push('/');
                return buf;
            }
            unreachable!();
        }
        let serialization = self.build_start_part(PartType::Path);
        serialization.push('/');
        serialization
    }

    pub(crate) fn save_path_segment(&mut self) {
        if let Mode::Patch { buf, path_seg_end, .. } = &mut self.mode {
            path_seg_end.push(buf.len());
            return;
        }
        self.save_part();
        self.url.path_segment_count += 1;
    }

    pub(crate) fn append_empty_to_path(&mut self) {
        self.start_path_segment();
        self.save_path_segment();
    }

    /// The opaque single-string path of a cannot-be-a-base URL; no `/` is
    /// prefixed.
    pub(crate) fn start_path_string(&mut self) -> &mut String {
        debug_assert!(matches!(self.mode, Mode::Build));
        if self.last_part != PartType::Path {
            self.build_start_part(PartType::Path)
        } else {
            &mut self.url.serialization
        }
    }

    pub(crate) fn save_path_string(&mut self) {
        debug_assert!(self.url.path_segment_count <= 1);
        self.save_part();
        self.url.path_segment_count = 1;
    }

    pub(crate) fn is_empty_path(&self) -> bool {
        if let Mode::Patch { path_seg_end, .. } = &self.mode {
            return path_seg_end.is_empty();
        }
        self.url.path_segment_count == 0
    }

    /// Remove the last path segment, unless the path is a file URL's lone
    /// normalized Windows drive.
    pub(crate) fn shorten_path(&mut self) {
        let is_file = self.url.is_file_scheme();
        if let Mode::Patch { buf, path_seg_end, .. } = &mut self.mode {
            match path_seg_end.len() {
                0 => {}
                1 => {
                    if is_file && buf.len() == 3 && is_normalized_windows_drive(&buf[1..]) {
                        return;
                    }
                    path_seg_end.pop();
                    buf.clear();
                }
                _ => {
                    path_seg_end.pop();
                    buf.truncate(*path_seg_end.last().unwrap());
                }
            }
            return;
        }
        debug_assert!(self.last_part <= PartType::Path);
        if let Some((path_end, segment_count)) = self.url.shorten_path_bounds() {
            self.url.serialization.truncate(path_end as usize);
            self.url.part_end[PartType::Path as usize] = path_end;
            self.url.path_segment_count = segment_count;
        }
    }

    /// Collapse a run of leading slashes in a file URL's path down to one.
    pub(crate) fn remove_leading_path_slashes(&mut self) {
        if let Mode::Patch { buf, path_seg_end, .. } = &mut self.mode {
            let count = buf.bytes().take_while(|&b| b == b'/').count();
            if count > 1 {
                let excess = count - 1;
                buf.replace_range(..excess, "");
                path_seg_end.drain(..excess);
                for end in path_seg_end.iter_mut() {
                    *end -= excess;
                }
            }
            return;
        }
        debug_assert!(self.last_part == PartType::Path);
        let path_start = self.url.part_end[PartType::Port as usize] as usize;
        let path_end = self.url.part_end[PartType::Path as usize] as usize;
        let count = self.url.serialization[path_start..path_end]
            .bytes()
            .take_while(|&b| b == b'/')
            .count();
        if count > 1 {
            let excess = (count - 1) as u32;
            self.url
                .serialization
                .replace_range(path_start..path_start + excess as usize, "");
            self.url.part_end[PartType::Path as usize] -= excess;
            self.url.path_segment_count -= excess;
        }
    }

    /// Replace the whole path with the buffered segments collected during a
    /// pathname setter run.
    pub(crate) fn commit_path(&mut self) {
        let len = self.url.serialization.len() as u32;
        for index in (1..=PartType::Path as usize).rev() {
            if self.url.part_end[index] != 0 {
                break;
            }
            self.url.part_end[index] = len;
        }
        let (path, segment_count) = match &mut self.mode {
            Mode::Patch { buf, path_seg_end, .. } => {
                (std::mem::take(buf), path_seg_end.len() as u32)
            }
            Mode::Build => unreachable!(),
        };
        self.replace_part(PartType::Path, &path);
        self.url.path_segment_count = segment_count;
    }

    // host removal

    /// Replace the host with the empty string, keeping it non-null.
    pub(crate) fn empty_host(&mut self) {
        use self::PartType::*;
        if let Mode::Patch { .. } = self.mode {
            self.empty_part(Host);
            return;
        }
        debug_assert!(self.last_part >= Host);
        let host_start = self.url.part_end[HostStart as usize];
        if self.last_part == Host {
            self.url.part_end[Host as usize] = host_start;
            self.url.serialization.truncate(host_start as usize);
        } else {
            let diff = self.url.part_end[Host as usize] - host_start;
            if diff > 0 {
                for index in Host as usize..=self.last_part as usize {
                    self.url.part_end[index] -= diff;
                }
                self.url
                    .serialization
                    .replace_range(host_start as usize..(host_start + diff) as usize, "");
            }
        }
    }

    // base URL inheritance

    /// Copy the contiguous substring of `src` spanning parts `[t1, t2]`,
    /// shifting the copied offsets by the length delta. An optional path
    /// transform is applied during the copy instead of copying the path
    /// verbatim.
    pub(crate) fn append_parts(
        &mut self,
        src: &Url,
        t1: PartType,
        t2: PartType,
        path_op: Option<PathOp>,
    ) {
        use self::PartType::*;
        let ifirst = if t1 <= Host {
            if !src.is_null(Host) {
                if t1 == Username && src.has_credentials() {
                    Username
                } else {
                    Host
                }
            } else {
                Path
            }
        } else {
            t1
        };

        // find the last part of the span that was actually serialized
        let mut ilast_index = t2 as isize;
        while ilast_index >= ifirst as isize {
            if src.part_end[ilast_index as usize] != 0 {
                break;
            }
            ilast_index -= 1;
        }
        if ifirst as isize <= ilast_index {
            let ilast = PartType::from_index(ilast_index as usize);
            self.build_start_part(ifirst);

            let mut last_end = src.part_end[ilast as usize];
            if ilast == Path {
                let mut segment_count = src.path_segment_count;
                if let Some(op) = path_op {
                    let shortened = match op {
                        PathOp::RemoveLast => src.path_rem_last(),
                        PathOp::ShortenIfNotRoot => src.shorten_path_bounds(),
                    };
                    if let Some((end, count)) = shortened {
                        last_end = end;
                        segment_count = count;
                    }
                }
                self.url.path_segment_count = segment_count;
            } else if ifirst <= Path && Path <= ilast {
                self.url.path_segment_count = src.path_segment_count;
            }

            let offset = src.part_end[ifirst as usize - 1] + PART_START[ifirst as usize];
            let delta = self.url.serialization.len() as i64 - offset as i64;
            self.url
                .serialization
                .push_str(&src.serialization[offset as usize..last_end as usize]);
            for index in ifirst as usize..ilast as usize {
                self.url.part_end[index] = (src.part_end[index] as i64 + delta) as u32;
            }
            self.url.part_end[ilast as usize] = (last_end as i64 + delta) as u32;
            self.last_part = ilast;
        }

        // copy the span's not-null flags
        let mut mask = 0u32;
        for index in t1 as usize..=t2 as usize {
            mask |= 1u32 << index;
        }
        self.url.flags = (self.url.flags & !mask) | (src.flags & mask);
    }

    // offset arithmetic for the patch mode

    fn part_pos(&self, part: PartType) -> u32 {
        if part > PartType::Scheme {
            self.url.part_end[part as usize - 1]
        } else {
            0
        }
    }

    fn replace_part(&mut self, part: PartType, new_text: &str) {
        self.replace_part_spanning(part, new_text, part, 0);
    }

    /// Replace everything from the start of `first_part` through the end of
    /// `last_part` with `new_text`, recording the first `value_start` bytes
    /// of it as belonging to the parts before `last_part`.
    fn replace_part_spanning(
        &mut self,
        last_part: PartType,
        new_text: &str,
        first_part: PartType,
        value_start: usize,
    ) {
        let b = self.part_pos(first_part);
        let old_len = self.url.part_end[last_part as usize] - b;
        self.url
            .serialization
            .replace_range(b as usize..(b + old_len) as usize, new_text);
        for index in first_part as usize..last_part as usize {
            self.url.part_end[index] = b + value_start as u32;
        }
        let diff = new_text.len() as i64 - old_len as i64;
        if diff != 0 {
            for index in last_part as usize..PART_COUNT {
                if self.url.part_end[index] == 0 {
                    break;
                }
                self.url.part_end[index] = (self.url.part_end[index] as i64 + diff) as u32;
            }
        }
    }

    fn find_last_part(&self, part: PartType) -> PartType {
        for index in (1..=part as usize).rev() {
            if self.url.part_end[index] != 0 {
                return PartType::from_index(index);
            }
        }
        PartType::Scheme
    }
}
