//! Subject, SID and queue-group validation.
//!
//! Subjects are dot-separated tokens. `*` may only appear as a whole token
//! and `>` only as the whole last token. Tokens may not be empty and may not
//! contain whitespace or control bytes.

/// Check that `subject` is a valid subject, reply-to or wildcard pattern.
pub fn is_valid_subject(subject: &str) -> bool {
    if subject.is_empty() {
        return false;
    }

    let mut tokens = subject.split('.').peekable();
    while let Some(token) = tokens.next() {
        let is_last = tokens.peek().is_none();

        match token {
            "" => return false,
            "*" => {}
            ">" if is_last => {}
            _ => {
                let ok = token
                    .bytes()
                    .all(|b| b.is_ascii_graphic() && b != b'*' && b != b'>');
                if !ok {
                    return false;
                }
            }
        }
    }

    true
}

/// Check that `sid` is a non-empty alphanumeric string.
#[inline]
pub fn is_valid_sid(sid: &str) -> bool {
    !sid.is_empty() && sid.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Queue groups share the SID alphabet.
#[inline]
pub fn is_valid_queue_group(group: &str) -> bool {
    is_valid_sid(group)
}
