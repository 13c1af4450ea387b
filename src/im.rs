//! Encrypted IM session tokens.
//!
//! A token is a 24-byte big-endian record `[version:2][type:2][app_id:4][user_id:8][expire_at:8]`,
//! PKCS#7-padded and AES-CBC encrypted with the app key (the IV is the key's first 16 bytes),
//! prefixed with `[crc32(ciphertext):4][app_id:4]`, and rendered in base 62. Generation is
//! deterministic: the same inputs always produce the same token.

pub mod radix;

pub use radix::{decode as decode_base62, encode as encode_base62};

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockCipher, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7};
// self
use crate::_prelude::*;

/// Record layout version.
pub const FORMAT_VERSION: u16 = 1;
/// Record type for app session tokens.
pub const TOKEN_TYPE: u16 = 1;

const RECORD_LEN: usize = 24;
const HEADER_LEN: usize = 8;
const IV_LEN: usize = 16;

/// Failures while producing or inspecting an IM session token.
#[derive(Debug, ThisError)]
pub enum CodecError {
	/// App key is not standard base64.
	#[error("App key is not valid base64.")]
	AppKey(#[source] base64::DecodeError),
	/// Decoded app key is not an AES-128/192/256 key.
	#[error("App key must decode to 16, 24, or 32 bytes, got {len}.")]
	InvalidKeyLength {
		/// Decoded key length in bytes.
		len: usize,
	},
	/// Token text contains a character outside the base-62 alphabet.
	#[error("Character `{ch}` is not a base-62 digit.")]
	InvalidDigit {
		/// Offending character.
		ch: char,
	},
	/// Decoded token is shorter than its checksum header.
	#[error("Token is too short to carry a checksum header.")]
	TooShort,
}

/// Plain session record before encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionRecord {
	/// Application identifier.
	pub app_id: i32,
	/// User identifier.
	pub user_id: i64,
	/// Expiry as Unix milliseconds.
	pub expire_at_millis: i64,
}
impl SessionRecord {
	/// Serializes the record into its fixed big-endian layout.
	pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
		let mut out = [0; RECORD_LEN];

		out[..2].copy_from_slice(&FORMAT_VERSION.to_be_bytes());
		out[2..4].copy_from_slice(&TOKEN_TYPE.to_be_bytes());
		out[4..8].copy_from_slice(&self.app_id.to_be_bytes());
		out[8..16].copy_from_slice(&self.user_id.to_be_bytes());
		out[16..].copy_from_slice(&self.expire_at_millis.to_be_bytes());

		out
	}
}

/// Unpacked token envelope; the ciphertext stays encrypted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenEnvelope {
	/// CRC-32 (IEEE) carried in the token.
	pub checksum: u32,
	/// Identifier field carried in the clear.
	pub app_id: u32,
	/// Encrypted record.
	pub ciphertext: Vec<u8>,
}
impl TokenEnvelope {
	/// Returns `true` when the carried checksum matches the ciphertext.
	pub fn checksum_matches(&self) -> bool {
		crc32fast::hash(&self.ciphertext) == self.checksum
	}
}

/// Generates an IM session token for `user_id` in `app_id`, valid until `expire_at_millis`.
///
/// `app_key` is the standard-base64 app secret; it must decode to 16, 24, or 32 bytes.
pub fn generate_token(
	app_id: i32,
	user_id: i64,
	expire_at_millis: i64,
	app_key: &str,
) -> Result<String, CodecError> {
	let key = STANDARD.decode(app_key).map_err(CodecError::AppKey)?;
	let record = SessionRecord { app_id, user_id, expire_at_millis };
	let ciphertext = encrypt(&key, &record.to_bytes())?;
	let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());

	out.extend_from_slice(&crc32fast::hash(&ciphertext).to_be_bytes());
	out.extend_from_slice(&app_id.to_be_bytes());
	out.extend_from_slice(&ciphertext);

	Ok(radix::encode(&out))
}

/// Decodes a token into its envelope without decrypting it.
pub fn inspect_token(token: &str) -> Result<TokenEnvelope, CodecError> {
	let bytes = radix::decode(token)?;
	let Some((checksum, rest)) = bytes.split_first_chunk::<4>() else {
		return Err(CodecError::TooShort);
	};
	let Some((app_id, ciphertext)) = rest.split_first_chunk::<4>() else {
		return Err(CodecError::TooShort);
	};

	Ok(TokenEnvelope {
		checksum: u32::from_be_bytes(*checksum),
		app_id: u32::from_be_bytes(*app_id),
		ciphertext: ciphertext.to_vec(),
	})
}

/// Decodes `token` and recomputes the checksum over its ciphertext.
pub fn verify_token_checksum(token: &str) -> Result<bool, CodecError> {
	Ok(inspect_token(token)?.checksum_matches())
}

/// Returns the Unix-millisecond instant `minutes` from now.
pub fn default_expire_at(minutes: i64) -> i64 {
	let at = OffsetDateTime::now_utc() + Duration::minutes(minutes);

	i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn encrypt(key: &[u8], plain: &[u8]) -> Result<Vec<u8>, CodecError> {
	match key.len() {
		16 => encrypt_with::<aes::Aes128>(key, plain),
		24 => encrypt_with::<aes::Aes192>(key, plain),
		32 => encrypt_with::<aes::Aes256>(key, plain),
		len => Err(CodecError::InvalidKeyLength { len }),
	}
}

fn encrypt_with<C>(key: &[u8], plain: &[u8]) -> Result<Vec<u8>, CodecError>
where
	C: BlockEncryptMut + BlockCipher + KeyInit,
{
	let encryptor = cbc::Encryptor::<C>::new_from_slices(key, &key[..IV_LEN])
		.map_err(|_| CodecError::InvalidKeyLength { len: key.len() })?;

	Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain))
}
