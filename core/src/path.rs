//! Resource path normalization.
//!
//! Every path the server sees has exactly one leading slash, one trailing
//! slash, and no empty segments: `masters//bins` and `/masters/bins/` both
//! become `/masters/bins/`.

use crate::error::ApiError;

/// Normalize `raw` to `/seg/.../seg/`. A path with no segments becomes `/`.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('/');
    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        out.push_str(segment);
        out.push('/');
    }
    out
}

/// Append `segment` (an id or action name) to `base`.
///
/// `segment` must name exactly one path component: empty, `.`, `..` and
/// anything containing `/`, `?` or `#` is rejected.
pub fn join(base: &str, segment: &str) -> Result<String, ApiError> {
    check_segment(segment)?;
    let mut out = normalize(base);
    out.push_str(segment);
    out.push('/');
    Ok(out)
}

fn check_segment(segment: &str) -> Result<(), ApiError> {
    let invalid = matches!(segment, "" | "." | "..") || segment.contains(['/', '?', '#']);
    if invalid {
        return Err(ApiError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

/// True when `path` is `/`, i.e. it names no resource.
pub fn is_root(path: &str) -> bool {
    normalize(path) == "/"
}
