//! Route segment obfuscation.
//!
//! # Design
//! Navigation URLs carry opaque tokens instead of screen names. A token is
//! URL-safe base64 (no padding) of `tag || ciphertext`:
//!
//! - `tag` is the first 12 bytes of HMAC-SHA256(key, "tag:" || plaintext),
//! - `ciphertext` is the plaintext XORed with a keystream whose 32-byte
//!   blocks are HMAC-SHA256(key, "ks:" || tag || be32(block index)).
//!
//! Equal plaintexts give equal tokens under one key, and decryption
//! recomputes the tag, so tokens made with another key or typed by hand do
//! not decode. The key ships with the client: this hides names from the
//! address bar and protects nothing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::digest::Key;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

const TAG_LEN: usize = 12;
const MAX_TOKEN_LEN: usize = 512;

/// Built-in route table: logical key -> path segment.
pub const ROUTE_SEGMENTS: &[(&str, &str)] = &[
    ("dashboard", "dashboard"),
    ("masters", "masters"),
    ("bins", "bins"),
    ("vehicles", "vehicles"),
    ("vehicleCreation", "vehicle-creation"),
    ("drivers", "drivers"),
    ("routes", "routes"),
    ("trips", "trips"),
    ("pickups", "pickups"),
    ("complaints", "complaints"),
    ("customers", "customers"),
    ("reports", "reports"),
    ("users", "users"),
    ("settings", "settings"),
];

/// Deterministic reversible string transform keyed by `key`.
#[derive(Clone)]
pub struct RouteCipher {
    mac: HmacSha256,
}

impl RouteCipher {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        // HMAC key block: keys longer than a block are hashed, the rest zero-padded.
        let mut block = Key::<HmacSha256>::default();
        if key.len() > block.len() {
            let digest = Sha256::digest(key);
            block[..digest.len()].copy_from_slice(&digest);
        } else {
            block[..key.len()].copy_from_slice(key);
        }
        Self {
            mac: HmacSha256::new(&block),
        }
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    fn tag(&self, plaintext: &[u8]) -> HmacSha256 {
        let mut mac = self.mac();
        mac.update(b"tag:");
        mac.update(plaintext);
        mac
    }

    fn apply_keystream(&self, tag: &[u8], data: &mut [u8]) {
        for (block, chunk) in data.chunks_mut(32).enumerate() {
            let mut mac = self.mac();
            mac.update(b"ks:");
            mac.update(tag);
            mac.update(&(block as u32).to_be_bytes());
            let stream = mac.finalize().into_bytes();
            for (byte, key) in chunk.iter_mut().zip(stream.iter()) {
                *byte ^= key;
            }
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let full_tag = self.tag(plaintext.as_bytes()).finalize().into_bytes();
        let tag = &full_tag[..TAG_LEN];
        let mut body = plaintext.as_bytes().to_vec();
        self.apply_keystream(tag, &mut body);

        let mut raw = Vec::with_capacity(TAG_LEN + body.len());
        raw.extend_from_slice(tag);
        raw.extend_from_slice(&body);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// `None` for anything that is not a token produced under this key.
    pub fn decrypt(&self, token: &str) -> Option<String> {
        if token.len() > MAX_TOKEN_LEN {
            return None;
        }
        let raw = URL_SAFE_NO_PAD.decode(token).ok()?;
        if raw.len() < TAG_LEN {
            return None;
        }
        let (tag, body) = raw.split_at(TAG_LEN);
        let mut plain = body.to_vec();
        self.apply_keystream(tag, &mut plain);
        self.tag(&plain).verify_truncated_left(tag).ok()?;
        String::from_utf8(plain).ok()
    }
}

/// Where an incoming URL segment leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Logical key of the screen.
    Screen(String),
    NotFound,
}

/// Route keys mapped to tokens, plus the inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    tokens: BTreeMap<String, String>,
    keys: HashMap<String, String>,
}

impl RouteTable {
    /// Encrypt every segment. Segments must be distinct; the cipher is
    /// deterministic and injective, so the tokens are too.
    fn encrypt(cipher: &RouteCipher, segments: &BTreeMap<String, String>) -> Self {
        let mut tokens = BTreeMap::new();
        let mut keys = HashMap::new();
        for (key, segment) in segments {
            let token = cipher.encrypt(segment);
            keys.insert(token.clone(), key.clone());
            tokens.insert(key.clone(), token);
        }
        Self { tokens, keys }
    }

    pub fn token(&self, key: &str) -> Option<&str> {
        self.tokens.get(key).map(String::as_str)
    }

    pub fn resolve(&self, token: &str) -> RouteTarget {
        match self.keys.get(token) {
            Some(key) => RouteTarget::Screen(key.clone()),
            None => RouteTarget::NotFound,
        }
    }

    /// `(key, token)` pairs sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, t)| (k.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Route cache: the default table is encrypted once and reused.
pub struct RouteObfuscator {
    cipher: RouteCipher,
    segments: BTreeMap<String, String>,
    default_table: OnceLock<RouteTable>,
}

impl RouteObfuscator {
    /// Obfuscator over `ROUTE_SEGMENTS`.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        let segments = ROUTE_SEGMENTS
            .iter()
            .map(|(k, s)| (k.to_string(), s.to_string()))
            .collect();
        Self::from_checked(key, segments)
    }

    /// Obfuscator over a custom base table.
    ///
    /// A key listed twice, or two keys sharing a segment, is
    /// `DuplicateRegistration`.
    pub fn with_segments<'a, I>(key: impl AsRef<[u8]>, segments: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut checked = BTreeMap::new();
        for (k, s) in segments {
            if checked.insert(k.to_string(), s.to_string()).is_some() {
                return Err(ApiError::DuplicateRegistration(k.to_string()));
            }
        }
        check_distinct_segments(&checked)?;
        Ok(Self::from_checked(key, checked))
    }

    fn from_checked(key: impl AsRef<[u8]>, segments: BTreeMap<String, String>) -> Self {
        Self {
            cipher: RouteCipher::new(key),
            segments,
            default_table: OnceLock::new(),
        }
    }

    pub fn cipher(&self) -> &RouteCipher {
        &self.cipher
    }

    /// The cached table for the base segments, encrypted on first use.
    pub fn encrypted_table(&self) -> &RouteTable {
        self.default_table.get_or_init(|| {
            tracing::debug!(routes = self.segments.len(), "encrypting route table");
            RouteTable::encrypt(&self.cipher, &self.segments)
        })
    }

    /// A fresh table with `overrides` merged over the base segments.
    ///
    /// Overrides may replace segments or add keys. Two keys ending up with
    /// the same segment is `DuplicateRegistration`.
    pub fn encrypted_table_with<'a, I>(&self, overrides: I) -> Result<RouteTable, ApiError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut merged = self.segments.clone();
        for (key, segment) in overrides {
            merged.insert(key.to_string(), segment.to_string());
        }
        check_distinct_segments(&merged)?;
        Ok(RouteTable::encrypt(&self.cipher, &merged))
    }

    /// Decrypt `token` to a segment of the base table.
    ///
    /// Returns `None` for garbage, for tokens from another key, and for
    /// valid tokens whose segment is not in the base table.
    pub fn decrypt_segment(&self, token: &str) -> Option<String> {
        let segment = self.cipher.decrypt(token)?;
        self.segments.values().any(|s| *s == segment).then_some(segment)
    }

    /// Screen for one URL segment.
    pub fn resolve(&self, token: &str) -> RouteTarget {
        self.encrypted_table().resolve(token)
    }

    /// Screen keys for every segment of `url_path`, or `NotFound` if any
    /// segment is unknown or the path is empty.
    pub fn resolve_path(&self, url_path: &str) -> Result<Vec<String>, RouteTarget> {
        let keys = url_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|token| match self.resolve(token) {
                RouteTarget::Screen(key) => Ok(key),
                RouteTarget::NotFound => Err(RouteTarget::NotFound),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err(RouteTarget::NotFound);
        }
        Ok(keys)
    }

    /// Obfuscated path `/tok/.../tok/` for the given route keys.
    pub fn href<'a, I>(&self, keys: I) -> Result<String, ApiError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let table = self.encrypted_table();
        let mut out = String::from("/");
        for key in keys {
            let token = table
                .token(key)
                .ok_or_else(|| ApiError::UnknownRoute(key.to_string()))?;
            out.push_str(token);
            out.push('/');
        }
        Ok(out)
    }
}

fn check_distinct_segments(segments: &BTreeMap<String, String>) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for segment in segments.values() {
        if !seen.insert(segment.as_str()) {
            return Err(ApiError::DuplicateRegistration(segment.clone()));
        }
    }
    Ok(())
}
