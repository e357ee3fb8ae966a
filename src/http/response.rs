//! Decoding of raw HTTP/1.1 response text into a body.

use anyhow::{Context, Result, anyhow};

const HEADER_END: &str = "\r\n\r\n";

/// Extract the body from a raw response (status line, headers, blank line, body).
///
/// Header blocks left over from a proxy `CONNECT` exchange are skipped, and a
/// `Transfer-Encoding: chunked` body is de-chunked.
pub fn decode_body(raw: &str) -> Result<String> {
    let raw = skip_proxy_preamble(raw);
    let (headers, body) = raw
        .split_once(HEADER_END)
        .ok_or_else(|| anyhow!("Malformed HTTP response: no end of headers"))?;

    if is_chunked(headers) {
        dechunk(body)
    } else {
        Ok(body.to_string())
    }
}

/// Drop every header block that is immediately followed by another status line.
fn skip_proxy_preamble(mut raw: &str) -> &str {
    while raw.starts_with("HTTP/") {
        match raw.split_once(HEADER_END) {
            Some((_, rest)) if rest.starts_with("HTTP/") => raw = rest,
            _ => break,
        }
    }
    raw
}

fn is_chunked(headers: &str) -> bool {
    headers.lines().skip(1).any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        })
    })
}

fn dechunk(body: &str) -> Result<String> {
    let mut rest = body.as_bytes();
    let mut out = Vec::with_capacity(rest.len());

    while !rest.is_empty() {
        let line_end = find_crlf(rest).unwrap_or(rest.len());
        let size_line = std::str::from_utf8(&rest[..line_end])?;
        // Chunk extensions (";name=value") are ignored
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .with_context(|| format!("Invalid chunk size {:?}", size_hex))?;
        if size == 0 {
            break;
        }

        let data_start = (line_end + 2).min(rest.len());
        let Some(data_end) = data_start.checked_add(size).filter(|end| *end <= rest.len()) else {
            anyhow::bail!("Truncated chunk: expected {} bytes", size);
        };
        out.extend_from_slice(&rest[data_start..data_end]);

        rest = &rest[data_end..];
        rest = rest.strip_prefix(b"\r\n").unwrap_or(rest);
    }

    String::from_utf8(out).context("Chunked body is not valid UTF-8")
}

fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == b"\r\n")
}
