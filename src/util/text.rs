use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;

/// Longest reference body we try to resolve. The longest HTML5 entity name
/// is 31 bytes; anything longer between `&` and `;` is plain text.
const MAX_REFERENCE_LEN: usize = 40;

/// Decodes HTML character references in `s`.
///
/// Handles named HTML5 entities (`&amp;`, `&nbsp;`, `&eacute;`, ...), decimal
/// references (`&#8217;`) and hex references (`&#x2019;`). Unknown names,
/// unterminated references and invalid code points are copied through
/// unchanged, so this never fails.
///
/// Feed text is often escaped twice (once for XML, once for HTML); the XML
/// reader removes the first layer and this removes the second.
///
/// # Examples
///
/// ```
/// use gator::util::unescape_html;
///
/// assert_eq!(unescape_html("Fish &amp; Chips"), "Fish & Chips");
/// assert_eq!(unescape_html("it&#8217;s"), "it\u{2019}s");
/// assert_eq!(unescape_html("AT&T"), "AT&T");
/// ```
pub fn unescape_html(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_reference(tail) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Decodes the reference at the start of `s` (which begins with `&`).
///
/// Returns the replacement text and the number of bytes consumed, including
/// the leading `&` and trailing `;`.
fn decode_reference(s: &str) -> Option<(Cow<'static, str>, usize)> {
    let semi = s.get(1..)?.find(';')? + 1;
    if semi - 1 > MAX_REFERENCE_LEN {
        return None;
    }
    let body = &s[1..semi];

    let decoded = match body.strip_prefix('#') {
        Some(number) => Cow::Owned(decode_char_ref(number)?.to_string()),
        None => Cow::Borrowed(resolve_html5_entity(body)?),
    };

    Some((decoded, semi + 1))
}

fn decode_char_ref(number: &str) -> Option<char> {
    let (digits, radix) = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
        Some(hex) => (hex, 16),
        None => (number, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let code = u32::from_str_radix(digits, radix).ok()?;
    if code == 0 {
        return None;
    }
    char::from_u32(code)
}
