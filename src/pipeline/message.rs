//! Length-prefixed framing for records passed between pipeline stages
//!
//! Each field is written as an 8-byte little-endian length followed by that
//! many raw bytes. Fields appear in a fixed order per record kind. The
//! encoded length of a record is also its cost against the byte budget.

use crate::WireError;

const LEN_PREFIX: usize = 8;

/// Concatenates fields, each prefixed with its length
pub fn pack(fields: &[&[u8]]) -> Vec<u8> {
    let total = fields.iter().map(|f| LEN_PREFIX + f.len()).sum();
    let mut out = Vec::with_capacity(total);
    for field in fields {
        out.extend_from_slice(&(field.len() as u64).to_le_bytes());
        out.extend_from_slice(field);
    }
    out
}

/// Splits a packed buffer into exactly `count` fields
///
/// # Errors
///
/// Returns [`WireError::Truncated`] if the buffer ends inside a field and
/// [`WireError::TrailingBytes`] if bytes remain after the last field.
pub fn unpack(bytes: &[u8], count: usize) -> Result<Vec<&[u8]>, WireError> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = bytes;

    for field in 0..count {
        if rest.len() < LEN_PREFIX {
            return Err(WireError::Truncated {
                field,
                needed: LEN_PREFIX,
                available: rest.len(),
            });
        }
        let (prefix, tail) = rest.split_at(LEN_PREFIX);
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(prefix);
        let len = u64::from_le_bytes(len_bytes);

        if (tail.len() as u64) < len {
            return Err(WireError::Truncated {
                field,
                needed: usize::try_from(len).unwrap_or(usize::MAX),
                available: tail.len(),
            });
        }
        let (value, remainder) = tail.split_at(len as usize);
        fields.push(value);
        rest = remainder;
    }

    if !rest.is_empty() {
        return Err(WireError::TrailingBytes(rest.len()));
    }
    Ok(fields)
}

/// Splits a packed buffer holding any number of fields
fn unpack_all(bytes: &[u8]) -> Result<Vec<&[u8]>, WireError> {
    let mut count = 0;
    let mut rest = bytes;
    while rest.len() >= LEN_PREFIX {
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(&rest[..LEN_PREFIX]);
        let len = u64::from_le_bytes(len_bytes);
        let available = (rest.len() - LEN_PREFIX) as u64;
        if available < len {
            break;
        }
        rest = &rest[LEN_PREFIX + len as usize..];
        count += 1;
    }
    unpack(bytes, count + usize::from(!rest.is_empty()))
}

fn utf8(field: usize, bytes: &[u8]) -> Result<String, WireError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| WireError::Utf8 { field })
}

fn status(field: usize, bytes: &[u8]) -> Result<u16, WireError> {
    utf8(field, bytes)?
        .parse()
        .map_err(|_| WireError::Utf8 { field })
}

/// A fetched page on its way from a fetch worker to an extraction worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub effective_url: String,
    /// `0` when the request never produced a response
    pub http_status: u16,
    pub body: Vec<u8>,
}

impl FetchedPage {
    const FIELDS: usize = 4;

    pub fn to_wire(&self) -> Vec<u8> {
        let status = self.http_status.to_string();
        pack(&[
            self.url.as_bytes(),
            self.effective_url.as_bytes(),
            status.as_bytes(),
            &self.body,
        ])
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let fields = unpack(bytes, Self::FIELDS)?;
        Ok(Self {
            url: utf8(0, fields[0])?,
            effective_url: utf8(1, fields[1])?,
            http_status: status(2, fields[2])?,
            body: fields[3].to_vec(),
        })
    }
}

/// Extracted page content on its way from an extraction worker to the
/// frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub url: String,
    pub effective_url: String,
    pub http_status: u16,
    pub text: String,
    /// Link targets exactly as they appeared in the markup
    pub raw_links: Vec<String>,
}

impl ParsedPage {
    const FIELDS: usize = 5;

    pub fn to_wire(&self) -> Vec<u8> {
        let status = self.http_status.to_string();
        let links: Vec<&[u8]> = self.raw_links.iter().map(|l| l.as_bytes()).collect();
        let links = pack(&links);
        pack(&[
            self.url.as_bytes(),
            self.effective_url.as_bytes(),
            status.as_bytes(),
            self.text.as_bytes(),
            &links,
        ])
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, WireError> {
        let fields = unpack(bytes, Self::FIELDS)?;
        let raw_links = unpack_all(fields[4])?
            .into_iter()
            .map(|link| String::from_utf8_lossy(link).into_owned())
            .collect();

        Ok(Self {
            url: utf8(0, fields[0])?,
            effective_url: utf8(1, fields[1])?,
            http_status: status(2, fields[2])?,
            text: utf8(3, fields[3])?,
            raw_links,
        })
    }

    /// True if the page was fetched with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}
