//! Content type and encoding headers for object-storage uploads.

use std::path::Path;

const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for a key, chosen by its last extension (case-insensitive).
pub fn content_type_for(path: &str) -> &'static str {
    let Some(ext) = extension(path) else {
        return OCTET_STREAM;
    };

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "json" => "application/json",
        "txt" => "text/plain",
        "js" => "application/javascript",
        "html" => "text/html",
        "css" | "uss" => "text/css",
        "uxml" => "text/xml",
        "wasm" => "application/wasm",
        // .data, .mem and .br are opaque
        _ => OCTET_STREAM,
    }
}

/// `Content-Encoding` to send with a key, if any.
pub fn content_encoding_for(path: &str) -> Option<&'static str> {
    match extension(path).as_deref() {
        Some("br") => Some("br"),
        _ => None,
    }
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}
