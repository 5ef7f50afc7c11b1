//! AWS Signature Version 4 request signing for S3 range requests.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of an empty payload; range GETs and HEADs never carry a body.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Headers to attach to a signed request, including `Authorization`.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// `(name, value)` pairs; names are lowercase.
    pub headers: Vec<(String, String)>,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn timestamp_pair(now: OffsetDateTime) -> (String, String) {
    let date = format!(
        "{:04}{:02}{:02}",
        now.year(),
        now.month() as u8,
        now.day()
    );
    let stamp = format!(
        "{date}T{:02}{:02}{:02}Z",
        now.hour(),
        now.minute(),
        now.second()
    );
    (date, stamp)
}

/// Sign an S3 request and return the headers to attach.
///
/// `uri_path` must already be URI-encoded; range GETs pass their `Range`
/// header separately (it does not participate in signing).
pub fn sign_request(
    method: &str,
    host: &str,
    uri_path: &str,
    region: &str,
    credentials: &Credentials,
    now: OffsetDateTime,
) -> SignedHeaders {
    let (date, amz_date) = timestamp_pair(now);

    let mut canonical_headers: Vec<(String, String)> = vec![
        ("host".into(), host.to_string()),
        ("x-amz-content-sha256".into(), EMPTY_PAYLOAD_SHA256.into()),
        ("x-amz-date".into(), amz_date.clone()),
    ];
    if let Some(token) = &credentials.aws_session_token {
        canonical_headers.push(("x-amz-security-token".into(), token.clone()));
    }
    canonical_headers.sort();

    let signed_header_names = canonical_headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_header_block = canonical_headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect::<String>();

    let canonical_request = format!(
        "{method}\n{uri_path}\n\n{canonical_header_block}\n{signed_header_names}\n{EMPTY_PAYLOAD_SHA256}"
    );

    let scope = format!("{date}/{region}/s3/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex(&Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac(
        format!("AWS4{}", credentials.aws_secret_access_key).as_bytes(),
        date.as_bytes(),
    );
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, b"s3");
    let k_signing = hmac(&k_service, b"aws4_request");
    let signature = hex(&hmac(&k_signing, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
        credentials.aws_access_key_id
    );

    let mut headers = canonical_headers;
    headers.retain(|(k, _)| k != "host"); // the HTTP client sets Host itself
    headers.push(("authorization".into(), authorization));
    SignedHeaders { headers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Date;

    fn fixed_time() -> OffsetDateTime {
        Date::from_calendar_date(2024, time::Month::March, 15)
            .unwrap()
            .with_hms(10, 30, 0)
            .unwrap()
            .assume_utc()
    }

    fn creds() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI")
    }

    #[test]
    fn timestamp_format() {
        let (date, stamp) = timestamp_pair(fixed_time());
        assert_eq!(date, "20240315");
        assert_eq!(stamp, "20240315T103000Z");
    }

    #[test]
    fn signed_headers_present() {
        let signed = sign_request(
            "GET",
            "bucket.s3.us-west-2.amazonaws.com",
            "/key.h5",
            "us-west-2",
            &creds(),
            fixed_time(),
        );
        let names: Vec<&str> = signed.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert!(names.contains(&"authorization"));
        assert!(names.contains(&"x-amz-date"));
        assert!(names.contains(&"x-amz-content-sha256"));
        assert!(!names.contains(&"host"));

        let auth = &signed
            .headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .unwrap()
            .1;
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240315/us-west-2/s3/aws4_request"));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        assert!(auth.contains("Signature="));
    }

    #[test]
    fn session_token_is_signed() {
        let creds = creds().with_session_token("FQoGZXIvYXdzEA");
        let signed = sign_request(
            "GET",
            "bucket.s3.us-east-1.amazonaws.com",
            "/data.h5",
            "us-east-1",
            &creds,
            fixed_time(),
        );
        let names: Vec<&str> = signed.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert!(names.contains(&"x-amz-security-token"));
        let auth = &signed
            .headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .unwrap()
            .1;
        assert!(auth.contains("x-amz-security-token"));
    }

    #[test]
    fn signature_is_deterministic() {
        let a = sign_request("GET", "h.example", "/k", "us-east-1", &creds(), fixed_time());
        let b = sign_request("GET", "h.example", "/k", "us-east-1", &creds(), fixed_time());
        assert_eq!(a.headers, b.headers);
    }

    #[test]
    fn different_paths_differ() {
        let a = sign_request("GET", "h.example", "/k1", "us-east-1", &creds(), fixed_time());
        let b = sign_request("GET", "h.example", "/k2", "us-east-1", &creds(), fixed_time());
        let auth = |s: &SignedHeaders| {
            s.headers
                .iter()
                .find(|(k, _)| k == "authorization")
                .unwrap()
                .1
                .clone()
        };
        assert_ne!(auth(&a), auth(&b));
    }
}
