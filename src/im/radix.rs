//! Base-256 ↔ base-62 conversion by repeated long division.
//!
//! Leading zero bytes map one-to-one onto leading `0` digits so the conversion is reversible
//! for any input, including checksums whose high byte is zero. An all-zero input of `n` bytes
//! therefore encodes to exactly `n` `0` digits, with no extra digit for the zero value itself.
//! Some base-62 encoders emit `n + 1` digits there; tokens never reach that case since their
//! ciphertext is never all zero.

// self
use crate::im::CodecError;

/// Digit alphabet, in digit-value order.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BYTE_BASE: u32 = 256;
const TEXT_BASE: u32 = 62;

/// Encodes bytes as base-62 text.
pub fn encode(input: &[u8]) -> String {
	let zeros = input.iter().take_while(|byte| **byte == 0).count();
	let digits = convert(&input[zeros..], BYTE_BASE, TEXT_BASE);

	std::iter::repeat_n(0, zeros)
		.chain(digits)
		.map(|digit| char::from(ALPHABET[usize::from(digit)]))
		.collect()
}

/// Decodes base-62 text produced by [`encode`].
pub fn decode(input: &str) -> Result<Vec<u8>, CodecError> {
	let digits = input
		.chars()
		.map(|ch| {
			digit_value(ch).ok_or(CodecError::InvalidDigit { ch })
		})
		.collect::<Result<Vec<_>, _>>()?;
	let zeros = digits.iter().take_while(|digit| **digit == 0).count();
	let bytes = convert(&digits[zeros..], TEXT_BASE, BYTE_BASE);

	Ok(std::iter::repeat_n(0, zeros).chain(bytes).collect())
}

fn digit_value(ch: char) -> Option<u8> {
	let value = match ch {
		'0'..='9' => u32::from(ch) - u32::from('0'),
		'A'..='Z' => u32::from(ch) - u32::from('A') + 10,
		'a'..='z' => u32::from(ch) - u32::from('a') + 36,
		_ => return None,
	};

	u8::try_from(value).ok()
}

/// Converts a most-significant-first digit string without leading zeros between bases.
///
/// Both bases must be at most 256 so every quotient digit fits in a byte.
fn convert(input: &[u8], from: u32, to: u32) -> Vec<u8> {
	let mut dividend = input.to_vec();
	let mut out = Vec::new();

	while !dividend.is_empty() {
		let mut quotient = Vec::with_capacity(dividend.len());
		let mut remainder = 0;

		for digit in &dividend {
			let accumulator = u32::from(*digit) + remainder * from;
			let q = accumulator / to;

			remainder = accumulator % to;

			if !quotient.is_empty() || q > 0 {
				quotient.push(q as u8);
			}
		}

		out.push(remainder as u8);
		dividend = quotient;
	}

	out.reverse();

	out
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn encodes_small_values() {
		assert_eq!(encode(&[]), "");
		assert_eq!(encode(&[61]), "z");
		assert_eq!(encode(&[62]), "10");
		assert_eq!(encode(&[1, 0]), "48");
	}

	#[test]
	fn leading_zero_bytes_become_leading_zero_digits() {
		assert_eq!(encode(&[0, 0, 5]), "005");
		assert_eq!(encode(&[0, 0]), "00");
		assert_eq!(decode("005").expect("Digits should decode."), vec![0, 0, 5]);
		assert_eq!(encode(&[0, 0, 0]), "000");
		assert_eq!(decode("000").expect("Zero digits should decode."), vec![0, 0, 0]);
	}

	#[test]
	fn decode_reverses_encode() {
		let input = [0, 0x8f, 0x11, 0, 0xff, 0x42, 0x07];

		assert_eq!(decode(&encode(&input)).expect("Encoded text should decode."), input);
	}

	#[test]
	fn decode_rejects_foreign_characters() {
		assert!(matches!(decode("ab-c"), Err(CodecError::InvalidDigit { ch: '-' })));
	}
}
