//! Signed WebSocket connection URLs for the streaming backend.
//!
//! The backend authenticates connections by an HMAC-SHA256 signature over a
//! canonical string of host, RFC-1123 date and HTTP request line. The
//! signature is base64-encoded, wrapped into an authorization value together
//! with the API key and algorithm name, base64-encoded **again**, and
//! URL-encoded into the connection query string.
//!
//! The date is part of the signed content, so the URL must be regenerated
//! for every connection attempt — a reused URL is rejected once its
//! timestamp drifts outside the server's tolerance window.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Current UTC time in RFC-1123 format, e.g. `Tue, 05 Aug 2025 09:14:02 GMT`.
pub fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Build the signed `wss://` connection URL for `host` + `path`.
///
/// `date` is passed in (rather than taken from the clock here) so the
/// signature is deterministic under test; production callers pass
/// [`rfc1123_now`].
pub fn signed_ws_url(host: &str, path: &str, api_key: &str, api_secret: &str, date: &str) -> String {
    let canonical = format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1");

    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(canonical.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        "api_key=\"{api_key}\", algorithm=\"hmac-sha256\", \
         headers=\"host date request-line\", signature=\"{signature}\""
    );
    let authorization = BASE64.encode(authorization_origin.as_bytes());

    format!(
        "wss://{host}{path}?authorization={}&date={}&host={}",
        urlencoding::encode(&authorization),
        urlencoding::encode(date),
        urlencoding::encode(host),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "iat.xf-yun.com";
    const PATH: &str = "/v1";
    const DATE: &str = "Mon, 04 Aug 2025 12:00:00 GMT";

    fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{key}=")))
    }

    #[test]
    fn url_has_scheme_host_path_and_params() {
        let url = signed_ws_url(HOST, PATH, "key", "secret", DATE);

        assert!(url.starts_with("wss://iat.xf-yun.com/v1?"));
        assert!(query_param(&url, "authorization").is_some());
        assert!(query_param(&url, "date").is_some());
        assert_eq!(query_param(&url, "host"), Some("iat.xf-yun.com"));
    }

    #[test]
    fn date_is_url_encoded() {
        let url = signed_ws_url(HOST, PATH, "key", "secret", DATE);
        let date = query_param(&url, "date").unwrap();

        assert!(!date.contains(' '));
        assert_eq!(
            urlencoding::decode(date).unwrap().into_owned(),
            DATE,
        );
    }

    #[test]
    fn authorization_decodes_to_signed_fields() {
        let url = signed_ws_url(HOST, PATH, "my-api-key", "my-secret", DATE);

        let raw = query_param(&url, "authorization").unwrap();
        let decoded = urlencoding::decode(raw).unwrap().into_owned();
        let origin = String::from_utf8(BASE64.decode(decoded.as_bytes()).unwrap()).unwrap();

        assert!(origin.contains("api_key=\"my-api-key\""));
        assert!(origin.contains("algorithm=\"hmac-sha256\""));
        assert!(origin.contains("headers=\"host date request-line\""));

        // The signature itself must be valid standalone base64 of a 32-byte
        // SHA-256 MAC.
        let sig = origin
            .split("signature=\"")
            .nth(1)
            .and_then(|s| s.strip_suffix('"'))
            .expect("signature field present");
        assert_eq!(BASE64.decode(sig).unwrap().len(), 32);
    }

    #[test]
    fn signature_is_deterministic_for_fixed_date() {
        let a = signed_ws_url(HOST, PATH, "key", "secret", DATE);
        let b = signed_ws_url(HOST, PATH, "key", "secret", DATE);
        assert_eq!(a, b);
    }

    #[test]
    fn signature_changes_with_date() {
        let a = signed_ws_url(HOST, PATH, "key", "secret", DATE);
        let b = signed_ws_url(
            HOST,
            PATH,
            "key",
            "secret",
            "Tue, 05 Aug 2025 12:00:00 GMT",
        );
        assert_ne!(a, b);
    }

    #[test]
    fn signature_changes_with_secret() {
        let a = signed_ws_url(HOST, PATH, "key", "secret-a", DATE);
        let b = signed_ws_url(HOST, PATH, "key", "secret-b", DATE);
        assert_ne!(a, b);
    }

    #[test]
    fn rfc1123_now_has_expected_shape() {
        let now = rfc1123_now();
        // e.g. "Thu, 07 Aug 2025 10:30:00 GMT"
        assert!(now.ends_with(" GMT"));
        assert_eq!(now.matches(':').count(), 2);
        assert_eq!(&now[3..5], ", ");
    }
}
