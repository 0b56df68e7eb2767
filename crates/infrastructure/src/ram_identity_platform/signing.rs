//! ACS3-HMAC-SHA256 request signing for RAM RPC calls.

use hmac::{Hmac, Mac};
use keyward_core::{AppError, AppResult};
use sha2::{Digest, Sha256};

pub(super) const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Everything that goes into one signature.
pub(super) struct RpcRequest<'a> {
    pub(super) method: &'a str,
    pub(super) host: &'a str,
    pub(super) action: &'a str,
    pub(super) version: &'a str,
    pub(super) params: &'a [(&'a str, &'a str)],
    pub(super) date: &'a str,
    pub(super) nonce: &'a str,
}

/// Query string and headers to send, `authorization` included.
pub(super) struct SignedRequest {
    pub(super) query: String,
    pub(super) headers: Vec<(&'static str, String)>,
}

pub(super) fn sign(
    request: &RpcRequest<'_>,
    access_key_id: &str,
    access_key_secret: &str,
) -> AppResult<SignedRequest> {
    let query = canonical_query(request.params);
    let payload_hash = hex::encode(Sha256::digest(b""));

    // Sorted by name; the canonical form requires it.
    let signed: [(&'static str, String); 6] = [
        ("host", request.host.to_owned()),
        ("x-acs-action", request.action.to_owned()),
        ("x-acs-content-sha256", payload_hash.clone()),
        ("x-acs-date", request.date.to_owned()),
        ("x-acs-signature-nonce", request.nonce.to_owned()),
        ("x-acs-version", request.version.to_owned()),
    ];

    let canonical_headers = signed
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect::<String>();
    let signed_headers = signed
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n/\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        request.method
    );
    let string_to_sign = format!(
        "{SIGNATURE_ALGORITHM}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(access_key_secret.as_bytes())
        .map_err(|error| AppError::Internal(format!("failed to initialise signer: {error}")))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let mut headers = signed.to_vec();
    headers.push((
        "authorization",
        format!(
            "{SIGNATURE_ALGORITHM} Credential={access_key_id},SignedHeaders={signed_headers},Signature={signature}"
        ),
    ));

    Ok(SignedRequest { query, headers })
}

/// RFC 3986 encoded `key=value` pairs sorted by encoded key.
pub(super) fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut pairs = params
        .iter()
        .map(|(key, value)| (urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>();
    pairs.sort();

    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
