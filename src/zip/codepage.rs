//! Entry-name codepage for ZIP archives
//!
//! ZIP entry names are stored in [`NAME_ENCODING`] (GBK) so that archives with
//! Chinese file names open correctly in legacy Windows tools. The writer never
//! sets general purpose flag bit 11 (UTF-8 names); the reader honors it on
//! archives from other tools. Writer and reader both go through this module;
//! changing the codepage on one side only corrupts every non-ASCII name
//! silently.

use super::error::{Result, ZipError};
use encoding_rs::{Encoding, GBK_INIT};
use std::borrow::Cow;

/// Codepage used for every ZIP entry name, on both the write and read paths.
pub static NAME_ENCODING: &Encoding = &GBK_INIT;

/// General purpose flag bit 11: the entry name is UTF-8
pub const UTF8_NAME_FLAG: u16 = 0x0800;

/// Encode an entry name, refusing characters GBK cannot represent.
pub fn encode_name(name: &str) -> Result<Cow<'_, [u8]>> {
    let (bytes, _, unmappable) = NAME_ENCODING.encode(name);
    if unmappable {
        return Err(ZipError::UnmappableName(name.to_string()));
    }
    Ok(bytes)
}

/// Decode a raw entry name. Invalid sequences become U+FFFD.
pub fn decode_name(raw: &[u8]) -> String {
    NAME_ENCODING
        .decode_without_bom_handling(raw)
        .0
        .into_owned()
}

/// Decode a raw entry name according to the entry's general purpose flags.
///
/// Names flagged as UTF-8 must be valid UTF-8; everything else is read in
/// [`NAME_ENCODING`].
pub fn decode_entry_name(raw: &[u8], flags: u16) -> Result<String> {
    if flags & UTF8_NAME_FLAG == 0 {
        return Ok(decode_name(raw));
    }
    String::from_utf8(raw.to_vec()).map_err(|_| {
        ZipError::InvalidFormat(format!(
            "entry name flagged as UTF-8 is not valid UTF-8: {}",
            decode_name(raw)
        ))
    })
}
