//! HTTP/1.1 response framing: head parsing and body decoding.

/// Parsed response head.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub status: u16,
    pub content_length: Option<usize>,
    pub chunked: bool,
}

/// Returns the offset of the first body byte if the head terminator
/// (`\r\n\r\n`) is present in `buf`.
pub(crate) fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Parses a response head (status line plus header lines, excluding the
/// terminating blank line). Returns a reason string on failure.
pub(crate) fn parse_head(head: &[u8]) -> Result<ResponseHead, String> {
    let text = std::str::from_utf8(head).map_err(|_| "head is not valid UTF-8".to_string())?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().ok_or_else(|| "empty head".to_string())?;
    if !status_line.starts_with("HTTP/1.") {
        return Err(format!("unexpected status line '{status_line}'"));
    }
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| format!("unexpected status line '{status_line}'"))?;

    let mut content_length = None;
    let mut chunked = false;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(format!("malformed header line '{line}'"));
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(
                value
                    .parse::<usize>()
                    .map_err(|_| format!("unparsable content-length '{value}'"))?,
            );
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && value.to_ascii_lowercase().contains("chunked")
        {
            chunked = true;
        }
    }

    Ok(ResponseHead {
        status,
        content_length,
        chunked,
    })
}

/// Decodes a `Transfer-Encoding: chunked` body that has been read in
/// full (the connection is closed after the response, so the terminal
/// zero-size chunk is always present in `body`).
pub(crate) fn decode_chunked(body: &[u8]) -> Result<Vec<u8>, String> {
    let mut decoded = Vec::new();
    let mut rest = body;

    loop {
        let line_end = rest
            .windows(2)
            .position(|window| window == b"\r\n")
            .ok_or_else(|| "missing chunk size line".to_string())?;
        let size_line = std::str::from_utf8(&rest[..line_end])
            .map_err(|_| "chunk size line is not valid UTF-8".to_string())?;
        // Chunk extensions after ';' are allowed and ignored.
        let size_text = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| format!("unparsable chunk size '{size_text}'"))?;
        rest = &rest[line_end + 2..];

        if size == 0 {
            // Trailers, if any, are ignored.
            return Ok(decoded);
        }
        if rest.len() < size + 2 {
            return Err("chunk shorter than its declared size".to_string());
        }
        decoded.extend_from_slice(&rest[..size]);
        if &rest[size..size + 2] != b"\r\n" {
            return Err("chunk not terminated by CRLF".to_string());
        }
        rest = &rest[size + 2..];
    }
}
