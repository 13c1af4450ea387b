//! HMAC-SHA256 primitives and the chained signing-key derivation.

// crates.io
use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Prefix mixed into the secret before the first derivation round.
const SECRET_PREFIX: &str = "VOLC";
/// Terminal label of the credential scope and of the last derivation round.
pub(crate) const SCOPE_TERMINATOR: &str = "request";

pub(crate) fn sha256_hex(data: &[u8]) -> String {
	hex::encode(Sha256::digest(data))
}

pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], InvalidLength> {
	let mut mac = HmacSha256::new_from_slice(key)?;

	mac.update(data);

	let mut out = [0; 32];

	out.copy_from_slice(&mac.finalize().into_bytes());

	Ok(out)
}

/// Derives the per-day signing key.
///
/// `HMAC(HMAC(HMAC(HMAC("VOLC" + secret, date), region), service), "request")`
pub(crate) fn signing_key(
	secret: &str,
	date: &str,
	region: &str,
	service: &str,
) -> Result<[u8; 32], InvalidLength> {
	let k_date = hmac_sha256(format!("{SECRET_PREFIX}{secret}").as_bytes(), date.as_bytes())?;
	let k_region = hmac_sha256(&k_date, region.as_bytes())?;
	let k_service = hmac_sha256(&k_region, service.as_bytes())?;

	hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_payload_hash_is_well_known() {
		assert_eq!(
			sha256_hex(b""),
			"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
		);
	}

	#[test]
	fn hmac_matches_rfc_4231_case_two() {
		let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?")
			.expect("HMAC should accept a short key.");

		assert_eq!(
			hex::encode(mac),
			"5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
		);
	}

	#[test]
	fn signing_key_depends_on_every_scope_component() {
		let base = signing_key("secret", "20240102", "cn-north-1", "rtc")
			.expect("Signing key should derive.");

		for other in [
			signing_key("secret2", "20240102", "cn-north-1", "rtc"),
			signing_key("secret", "20240103", "cn-north-1", "rtc"),
			signing_key("secret", "20240102", "cn-beijing", "rtc"),
			signing_key("secret", "20240102", "cn-north-1", "im"),
		] {
			assert_ne!(other.expect("Signing key should derive."), base);
		}
	}
}
