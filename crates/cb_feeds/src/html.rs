/// Strip tags from feed-provided HTML fragments and decode the handful of
/// entities that show up in practice.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let out = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `<img src="...">` URL in an HTML fragment, if any.
///
/// Tag matching is ASCII-case-insensitive over the raw bytes; offsets from
/// a lowercased copy would not be valid in the original for multibyte text.
pub fn extract_image_from_html(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let img_pos = find_ignore_ascii_case(bytes, b"<img")?;
    let rest = &bytes[img_pos..];
    let src_pos = find_ignore_ascii_case(rest, b"src=")?;
    let after = &rest[src_pos + 4..];
    let quote = *after.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let after = &after[1..];
    let end = after.iter().position(|&b| b == quote)?;
    let url = std::str::from_utf8(&after[..end]).ok()?;
    if url.starts_with("http") {
        Some(url.to_string())
    } else {
        None
    }
}

fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
