//! Identifier, code and slug generation

use bech32::Bech32m;
use uuid7::uuid7;

/// Construct a human-readable code under the given prefix. uuid7 leads with a
/// millisecond timestamp followed by random bits, so codes under one prefix
/// sort roughly by creation time. Generation is opportunistic: collisions are
/// not retried.
pub fn new_code(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Opaque entity identifier.
pub fn new_id() -> String {
    uuid7().to_string()
}

/// Lowercase, alphanumerics kept, everything else collapsed to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}
