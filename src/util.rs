use std::fmt;

use http::header::{HeaderValue, InvalidHeaderValue};

pub(crate) fn basic_auth<U, P>(username: U, password: Option<P>) -> Result<HeaderValue, InvalidHeaderValue>
where
    U: fmt::Display,
    P: fmt::Display,
{
    use base64::prelude::BASE64_STANDARD;
    use base64::write::EncoderWriter;
    use std::io::Write;

    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);
        let _ = write!(encoder, "{}:", username);
        if let Some(password) = password {
            let _ = write!(encoder, "{}", password);
        }
    }
    let mut header = HeaderValue::from_bytes(&buf)?;
    header.set_sensitive(true);
    Ok(header)
}

/// Replace every `<name>` placeholder in `input` with the matching variable.
///
/// Unknown placeholders are left untouched.
pub(crate) fn substitute<'a, F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail[1..].find(|c| c == '>' || c == '<') {
            Some(end) if tail.as_bytes()[end + 1] == b'>' => {
                let name = &tail[1..end + 1];
                match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&tail[..end + 2]),
                }
                rest = &tail[end + 2..];
            }
            _ => {
                out.push('<');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
