// Copyright 2024-2026 EC4X contributors.
// This file is part of ec4x.

// ec4x is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// ec4x is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with ec4x.  If not, see <http://www.gnu.org/licenses/>.

//! The symmetric wire codec: serialize -> compress -> seal -> armor.
//! Used for on-wire deltas and at-rest blobs alike. Oversized payloads
//! are chunked into numbered fragments sharing a plaintext hash; the
//! receiver reassembles, verifies, then decodes.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chacha20poly1305::{
	aead::{Aead, KeyInit},
	ChaCha20Poly1305, Key, Nonce,
};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use rand::RngCore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{CodecError, Result};

const NONCE_LEN: usize = 12;

/// Symmetric payload key shared between the daemon and one recipient.
#[derive(Clone)]
pub struct PayloadKey([u8; 32]);

impl PayloadKey {
	pub fn from_bytes(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	/// Derive a per-house key from a game secret and the recipient tag.
	pub fn derive(game_secret: &[u8], recipient_tag: &[u8]) -> Self {
		let mut hasher = Sha3_256::new();
		hasher.update(b"ec4x.payload.key.v1");
		hasher.update(game_secret);
		hasher.update(recipient_tag);
		let digest = hasher.finalize();
		let mut key = [0u8; 32];
		key.copy_from_slice(&digest);
		Self(key)
	}
}

/// Serialize, compress, seal with a fresh nonce from `rng`, and armor.
/// Deterministic for a fixed rng stream on the sender side.
pub fn encode<T: Serialize>(value: &T, key: &PayloadKey, rng: &mut impl RngCore) -> Result<String> {
	let plain = bincode::serialize(value).map_err(CodecError::Encode)?;

	let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
	encoder.write_all(&plain).map_err(CodecError::Compress)?;
	let compressed = encoder.finish().map_err(CodecError::Compress)?;

	let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
	let mut nonce = [0u8; NONCE_LEN];
	rng.fill_bytes(&mut nonce);
	let sealed = cipher.encrypt(Nonce::from_slice(&nonce), compressed.as_slice()).map_err(|_| CodecError::Sealed)?;

	let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
	framed.extend_from_slice(&nonce);
	framed.extend_from_slice(&sealed);
	Ok(base64::encode(framed))
}

/// Invert `encode`. Any tampering fails authentication and is rejected.
pub fn decode<T: DeserializeOwned>(armored: &str, key: &PayloadKey) -> Result<T> {
	let framed = base64::decode(armored).map_err(CodecError::Armor)?;
	if framed.len() < NONCE_LEN {
		return Err(CodecError::Truncated.into());
	}
	let (nonce, sealed) = framed.split_at(NONCE_LEN);

	let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
	let compressed = cipher.decrypt(Nonce::from_slice(nonce), sealed).map_err(|_| CodecError::Sealed)?;

	let mut plain = Vec::new();
	ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut plain).map_err(CodecError::Compress)?;
	bincode::deserialize(&plain).map_err(|e| CodecError::Encode(e).into())
}

fn plaintext_hash(data: &[u8]) -> [u8; 32] {
	let mut hasher = Sha3_256::new();
	hasher.update(data);
	let digest = hasher.finalize();
	let mut hash = [0u8; 32];
	hash.copy_from_slice(&digest);
	hash
}

/// One numbered piece of an oversized payload. All fragments of a
/// payload share the hash of the un-split armored text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
	pub index: u32,
	pub total: u32,
	pub payload_hash: [u8; 32],
	pub data: String,
}

/// Split an armored payload into fragments no larger than `ceiling`
/// characters. A payload already under the ceiling yields one fragment.
pub fn chunk(armored: &str, ceiling: usize) -> Vec<Fragment> {
	let ceiling = ceiling.max(1);
	let hash = plaintext_hash(armored.as_bytes());
	let pieces: Vec<&[u8]> = armored.as_bytes().chunks(ceiling).collect();
	let total = pieces.len() as u32;
	pieces
		.into_iter()
		.enumerate()
		.map(|(index, piece)| Fragment {
			index: index as u32,
			total,
			payload_hash: hash,
			data: String::from_utf8(piece.to_vec()).expect("base64 text splits on any boundary"),
		})
		.collect()
}

/// Collects fragments until a payload completes, verifying the shared
/// hash before releasing the reassembled text.
#[derive(Debug, Default)]
pub struct Reassembler {
	partial: BTreeMap<[u8; 32], BTreeMap<u32, Fragment>>,
}

impl Reassembler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feed one fragment; returns the whole armored payload once every
	/// piece has arrived and the hash checks out.
	pub fn feed(&mut self, fragment: Fragment) -> Result<Option<String>> {
		if fragment.index >= fragment.total {
			return Err(CodecError::FragmentIndex { index: fragment.index, total: fragment.total }.into());
		}
		let key = fragment.payload_hash;
		let total = fragment.total as usize;
		let set = self.partial.entry(key).or_default();
		set.insert(fragment.index, fragment);
		if set.len() < total {
			return Ok(None);
		}
		let set = self.partial.remove(&key).expect("present above");
		let mut armored = String::new();
		for (_, piece) in set {
			armored.push_str(&piece.data);
		}
		if plaintext_hash(armored.as_bytes()) != key {
			return Err(CodecError::FragmentHash.into());
		}
		Ok(Some(armored))
	}

	/// Outstanding incomplete payload count, for transport diagnostics.
	pub fn pending(&self) -> usize {
		self.partial.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rng::phase_rng;
	use crate::types::TurnPhase;

	fn key() -> PayloadKey {
		PayloadKey::derive(b"game-secret", b"house-1")
	}

	#[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
	struct Sample {
		turn: u32,
		note: String,
		values: Vec<i64>,
	}

	fn sample() -> Sample {
		Sample { turn: 7, note: "the spice must flow".into(), values: (0..256).collect() }
	}

	#[test]
	fn roundtrip() {
		let mut rng = phase_rng(1, 1, TurnPhase::Production);
		let armored = encode(&sample(), &key(), &mut rng).unwrap();
		let back: Sample = decode(&armored, &key()).unwrap();
		assert_eq!(back, sample());
	}

	#[test]
	fn tampering_is_rejected() {
		let mut rng = phase_rng(1, 1, TurnPhase::Production);
		let armored = encode(&sample(), &key(), &mut rng).unwrap();
		let mut bytes = base64::decode(&armored).unwrap();
		let last = bytes.len() - 1;
		bytes[last] ^= 0x01;
		let tampered = base64::encode(bytes);
		assert!(decode::<Sample>(&tampered, &key()).is_err());
	}

	#[test]
	fn wrong_key_is_rejected() {
		let mut rng = phase_rng(1, 1, TurnPhase::Production);
		let armored = encode(&sample(), &key(), &mut rng).unwrap();
		let other = PayloadKey::derive(b"game-secret", b"house-2");
		assert!(decode::<Sample>(&armored, &other).is_err());
	}

	#[test]
	fn sender_is_deterministic_for_a_fixed_stream() {
		let a = encode(&sample(), &key(), &mut phase_rng(3, 9, TurnPhase::Income)).unwrap();
		let b = encode(&sample(), &key(), &mut phase_rng(3, 9, TurnPhase::Income)).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn chunk_and_reassemble() {
		let mut rng = phase_rng(1, 2, TurnPhase::Production);
		let armored = encode(&sample(), &key(), &mut rng).unwrap();
		let fragments = chunk(&armored, 64);
		assert!(fragments.len() > 1);
		assert!(fragments.iter().all(|f| f.total == fragments.len() as u32));

		let mut reassembler = Reassembler::new();
		// arrival order scrambled
		let mut shuffled = fragments.clone();
		shuffled.reverse();
		let mut result = None;
		for fragment in shuffled {
			if let Some(whole) = reassembler.feed(fragment).unwrap() {
				result = Some(whole);
			}
		}
		let back: Sample = decode(&result.expect("reassembled"), &key()).unwrap();
		assert_eq!(back, sample());
		assert_eq!(reassembler.pending(), 0);
	}

	#[test]
	fn corrupted_fragment_set_fails_the_hash() {
		let mut rng = phase_rng(1, 3, TurnPhase::Production);
		let armored = encode(&sample(), &key(), &mut rng).unwrap();
		let mut fragments = chunk(&armored, 64);
		fragments[1].data = fragments[1].data.replace(|c: char| c.is_ascii_alphanumeric(), "A");
		let mut reassembler = Reassembler::new();
		let mut last = Ok(None);
		for fragment in fragments {
			last = reassembler.feed(fragment);
			if last.is_err() {
				break;
			}
		}
		assert!(last.is_err());
	}
}
