//! Image reference types and naming rules.
//!
//! Uploaded images live in two areas:
//! - the temp area, under `temp_<epoch-millis>_<8-hex>[.ext]`
//! - the permanent area, under `room_<room-id>_<epoch-millis>[.ext]`
//!
//! Public URLs are the file name appended to the area's URL prefix.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// File name prefix of temp uploads.
pub const TEMP_PREFIX: &str = "temp_";

/// File name prefix of permanent room images.
pub const PERMANENT_PREFIX: &str = "room_";

/// Longest extension carried over from an uploaded file name.
pub const MAX_EXTENSION_LEN: usize = 10;

const RANDOM_SUFFIX_BYTES: usize = 4;

/// Check whether a declared content type belongs to the `image/*` family.
///
/// Parameters are ignored and the comparison is case-insensitive.
pub fn is_image_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence.split_once('/') {
        Some((kind, subtype)) => kind.eq_ignore_ascii_case("image") && !subtype.is_empty(),
        None => false,
    }
}

/// Extract the extension of an uploaded file name.
///
/// Returns `None` when there is no suffix, or when the suffix is not a short
/// run of ASCII alphanumerics.
pub fn extension_of(filename: &str) -> Option<&str> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || !is_valid_extension(ext) {
        return None;
    }
    Some(ext)
}

fn is_valid_extension(ext: &str) -> bool {
    !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn with_extension(stem: String, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn epoch_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

fn random_hex() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; RANDOM_SUFFIX_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Join a URL prefix and a file name.
pub fn public_url(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name)
}

/// A reference to an upload in the temp area.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TempImageRef(String);

impl TempImageRef {
    /// Generate a fresh name, keeping the extension of `original_filename`.
    pub fn generate(original_filename: &str) -> Self {
        let stem = format!("{TEMP_PREFIX}{}_{}", epoch_millis(), random_hex());
        Self(with_extension(stem, extension_of(original_filename)))
    }

    /// Parse a bare temp file name.
    ///
    /// Anything that is not a well-formed temp name fails with
    /// [`Error::TempAssetMissing`]: such a name can never exist in the area.
    pub fn parse(file_name: &str) -> Result<Self> {
        let missing = || Error::TempAssetMissing(file_name.to_string());

        let rest = file_name.strip_prefix(TEMP_PREFIX).ok_or_else(missing)?;
        let (stem, ext) = match rest.split_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (rest, None),
        };
        if let Some(ext) = ext
            && !is_valid_extension(ext)
        {
            return Err(missing());
        }

        let (millis, random) = stem.split_once('_').ok_or_else(missing)?;
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(missing());
        }
        if random.len() != RANDOM_SUFFIX_BYTES * 2
            || !random.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(missing());
        }

        Ok(Self(file_name.to_string()))
    }

    /// Resolve a client-supplied reference.
    ///
    /// Accepts a bare file name, a public path under `url_prefix`, or a full
    /// URL whose path is under `url_prefix`.
    pub fn resolve(reference: &str, url_prefix: &str) -> Result<Self> {
        let reference = reference.trim();
        let path = match reference.find("://") {
            Some(scheme_end) => {
                let after_scheme = &reference[scheme_end + 3..];
                after_scheme
                    .find('/')
                    .map(|i| &after_scheme[i..])
                    .unwrap_or("")
            }
            None => reference,
        };
        let path = path.split(['?', '#']).next().unwrap_or("");

        if !path.contains('/') {
            return Self::parse(path);
        }

        let prefix = format!("{}/", url_prefix.trim_end_matches('/'));
        match path.strip_prefix(&prefix) {
            Some(file_name) => Self::parse(file_name),
            None => Err(Error::TempAssetMissing(reference.to_string())),
        }
    }

    /// The file name within the temp area.
    pub fn file_name(&self) -> &str {
        &self.0
    }

    /// Extension carried over from the original upload, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, ext)| ext)
    }

    /// Public URL under `url_prefix`.
    pub fn url(&self, url_prefix: &str) -> String {
        public_url(url_prefix, &self.0)
    }
}

impl TryFrom<String> for TempImageRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TempImageRef> for String {
    fn from(value: TempImageRef) -> Self {
        value.0
    }
}

impl fmt::Debug for TempImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TempImageRef({})", self.0)
    }
}

impl fmt::Display for TempImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to a room image in the permanent area.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermanentImageRef {
    room_id: i64,
    file_name: String,
}

impl PermanentImageRef {
    /// Name a new permanent image for `room_id`, carrying `ext` over.
    pub fn for_room(room_id: i64, ext: Option<&str>) -> Self {
        let stem = format!("{PERMANENT_PREFIX}{room_id}_{}", epoch_millis());
        Self {
            room_id,
            file_name: with_extension(stem, ext.filter(|e| is_valid_extension(e))),
        }
    }

    /// Parse a permanent file name. Returns `None` for foreign names.
    pub fn parse(file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(PERMANENT_PREFIX)?;
        let stem = rest.split_once('.').map(|(stem, _)| stem).unwrap_or(rest);
        let (room_id, millis) = stem.split_once('_')?;
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            room_id: room_id.parse().ok()?,
            file_name: file_name.to_string(),
        })
    }

    /// Room the image was finalized for.
    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    /// The file name within the permanent area.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Public URL under `url_prefix`.
    pub fn url(&self, url_prefix: &str) -> String {
        public_url(url_prefix, &self.file_name)
    }
}

impl fmt::Debug for PermanentImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermanentImageRef({})", self.file_name)
    }
}

impl fmt::Display for PermanentImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name)
    }
}

/// Extract the permanent file name from a stored `image_url`.
///
/// Returns `None` when the URL does not point into the permanent area.
pub fn permanent_file_name<'a>(image_url: &'a str, url_prefix: &str) -> Option<&'a str> {
    let prefix = format!("{}/", url_prefix.trim_end_matches('/'));
    let name = image_url.strip_prefix(prefix.as_str())?;
    (!name.is_empty() && !name.contains('/')).then_some(name)
}

/// State of a single upload attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageUploadState {
    /// Bytes are in the temp area and have no owner.
    Uploaded,
    /// Bytes were moved to the permanent area and attached to a room.
    Finalized,
    /// The temp upload was deleted by cleanup.
    Abandoned,
}

impl ImageUploadState {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Finalized => "finalized",
            Self::Abandoned => "abandoned",
        }
    }
}
