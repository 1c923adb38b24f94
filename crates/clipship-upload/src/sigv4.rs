//! AWS Signature Version 4 request signing for a whole-object PUT.
//!
//! Byte-exact by construction: canonical request → SHA-256 → string to sign →
//! four-stage HMAC key chain → hex signature. The region is the fixed `"auto"`
//! and the service `"s3"`, matching R2-style S3-compatible stores. The signed
//! timestamp must be fresh when the request is sent; the receiving server
//! rejects signatures outside its acceptance skew window as expired.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use clipship_core::{ContentDigest, Credentials, SigningError};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const REGION: &str = "auto";
const SERVICE: &str = "s3";

/// Everything except unreserved characters gets escaped within a path
/// segment. `/` separators are handled by encoding segment-by-segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The three headers to attach verbatim to the PUT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub x_amz_date: String,
    pub x_amz_content_sha256: String,
    pub authorization: String,
}

/// Percent-encode a canonical URI path, escaping reserved characters in each
/// segment while keeping `/` separators intact. The request path must match
/// this encoding byte for byte or the signature will not verify.
pub(crate) fn canonical_uri(bucket: &str, key: &str) -> String {
    let mut out = String::new();
    for segment in format!("{}/{}", bucket, key).split('/') {
        out.push('/');
        out.push_str(&utf8_percent_encode(segment, PATH_SEGMENT).to_string());
    }
    out
}

/// Build the canonical header block and signed-header list from name/value
/// pairs. Names are lowercased and sorted, so the result is independent of
/// the order the pairs are supplied in.
fn canonical_headers(headers: &[(&str, &str)]) -> (String, String) {
    let mut sorted: Vec<(String, &str)> = headers
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.trim()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let block = sorted
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect::<String>();
    let list = sorted
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    (block, list)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC-SHA256 accepts keys of any length
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key: AWS4+secret → date → region → service → "aws4_request".
fn signing_key(secret_access_key: &str, date_stamp: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_access_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, REGION.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Sign a whole-object PUT.
///
/// Pure and thread-safe: identical inputs always yield identical output, and
/// unrelated uploads may sign concurrently. The only failure mode is empty
/// credentials. `now` is caller-supplied so tests can pin the clock; callers
/// must sign immediately before sending.
pub fn sign_put(
    host: &str,
    bucket: &str,
    key: &str,
    payload_hash: &ContentDigest,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, SigningError> {
    if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
        return Err(SigningError::MissingCredentials);
    }

    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = timestamp[0..8].to_string();
    let payload_hash = payload_hash.to_hex();

    let uri = canonical_uri(bucket, key);
    let (header_block, signed_list) = canonical_headers(&[
        ("host", host),
        ("x-amz-content-sha256", &payload_hash),
        ("x-amz-date", &timestamp),
    ]);

    // The empty line is the canonical query string.
    let canonical_request = format!(
        "PUT\n{}\n\n{}\n{}\n{}",
        uri, header_block, signed_list, payload_hash
    );

    let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, REGION, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM, timestamp, credential_scope, canonical_request_hash
    );

    let key = signing_key(&credentials.secret_access_key, &date_stamp);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, credential_scope, signed_list, signature
    );

    Ok(SignedHeaders {
        x_amz_date: timestamp,
        x_amz_content_sha256: payload_hash,
        authorization,
    })
}
