//! Repair of mis-encoded text fields.
//!
//! Messenger exports write UTF-8 text as JSON `\u00XX` escapes, one escape per
//! byte. After JSON decoding every char therefore carries one original byte,
//! e.g. "José" arrives as "JosÃ©". Re-packing those chars as bytes and decoding
//! them as UTF-8 recovers the text.
//!
//! Apply exactly once per raw field, at read time. Running it on text that is
//! already correct produces replacement characters.

/// Recover the UTF-8 text carried byte-per-char in `raw`.
///
/// Never fails. Invalid byte sequences become U+FFFD. A value containing a char
/// above U+00FF cannot be in the byte-per-char form and is returned unchanged.
pub fn normalize(raw: &str) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    for c in raw.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(b) => bytes.push(b),
            Err(_) => return raw.to_string(),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
