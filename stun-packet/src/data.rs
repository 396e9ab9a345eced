// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Packet storage
//!
//! A parsed packet borrows the received datagram while a built packet owns its buffer.

/// An owned or borrowed packet buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Data<'a> {
    /// Borrowed from the caller.
    Borrowed(&'a [u8]),
    /// Allocated by this crate.
    Owned(Box<[u8]>),
}

impl std::ops::Deref for Data<'_> {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(data) => data,
            Self::Owned(data) => data,
        }
    }
}

impl Data<'_> {
    /// Copy borrowed data into a new allocation
    pub(crate) fn into_owned<'b>(self) -> Data<'b> {
        match self {
            Self::Borrowed(data) => Data::Owned(data.into()),
            Self::Owned(data) => Data::Owned(data),
        }
    }
}

impl<'a> From<&'a [u8]> for Data<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self::Borrowed(value)
    }
}

impl From<Vec<u8>> for Data<'_> {
    fn from(value: Vec<u8>) -> Self {
        Self::Owned(value.into_boxed_slice())
    }
}
