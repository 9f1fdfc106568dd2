// Handshake authentication token

/// Compute the handshake token: `md5(md5(password) + timestamp)`, both
/// digests rendered as lowercase hex.
///
/// No validation happens here; an empty password still yields a token.
pub fn token(password: &str, timestamp: &str) -> String {
    let hashed_password = format!("{:x}", md5::compute(password.as_bytes()));
    format!("{:x}", md5::compute(format!("{}{}", hashed_password, timestamp)))
}
