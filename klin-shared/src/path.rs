use percent_encoding::percent_decode_str;

use crate::api;

/// Extracts `{id}` from `/api/v1/households/{id}/...`.
/// Returns a percent-decoded owned [`String`]; `join` is not a household id.
pub fn household_id_from_path(path: &str) -> Option<String> {
    let prefix = format!("{}/households/", api::API_V1_PREFIX);
    let rest = path.strip_prefix(&prefix)?;
    let seg = rest.split('/').next()?;
    if seg.is_empty() || seg == "join" {
        None
    } else {
        Some(percent_decode_str(seg).decode_utf8_lossy().to_string())
    }
}
