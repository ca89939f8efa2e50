// pahe-dl - AnimePahe stream resolver and downloader
// Copyright (C) 2025 pahe-dl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Packed-code reversal
//!
//! The intermediate player page hides its source URL inside an
//! `eval(function(p,a,c,k,e,d)...)` block: identifiers in the payload are
//! replaced by short positional tokens and the originals shipped alongside
//! as a pipe-delimited dictionary. Reversing it is pure string substitution,
//! so no script runtime is embedded here; we recompute each token from its
//! index and substitute the dictionary entry back in.

use crate::error::{PaheError, Result};

/// One packed-code block as captured from the page
#[derive(Debug, Clone)]
pub struct ObfuscatedPayload {
    /// The substituted program text
    pub packed: String,
    /// Base of the token alphabet
    pub radix: u64,
    /// Number of tokens; must equal the dictionary length
    pub token_count: usize,
    /// Replacement strings, indexed by token value
    pub dictionary: Vec<String>,
}

/// Largest radix the token alphabet can express (`0-9a-zA-Z`)
const MAX_RADIX: u64 = 62;

/// Compute the packer's token for index `n`.
///
/// Digits below 36 use the base-36 alphabet (`0-9a-z`); digits 36 through 61
/// map to codepoint `digit + 29`, which continues the run into `A-Z`. Values
/// at or above the radix are prefixed by the encoding of `n / radix`.
/// Callers validate `radix <= MAX_RADIX` first, so the digit always lands
/// inside the alphabet.
fn encode_token(n: u64, radix: u64) -> String {
    let digit = n % radix;
    let tail = match digit {
        0..=35 => char::from_digit(digit as u32, 36)
            .map(|c| c.to_string())
            .unwrap_or_default(),
        36..=61 => char::from(digit as u8 + 29).to_string(),
        // Out-of-alphabet digits never occur with a validated radix.
        _ => String::new(),
    };
    if n >= radix {
        format!("{}{}", encode_token(n / radix, radix), tail)
    } else {
        tail
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Replace every whole-word occurrence of `key` in `text` with `value`.
///
/// A match only counts when neither neighbor is a word character, so a token
/// like `1a` never fires inside a longer identifier such as `x1ab`.
fn replace_whole_word(text: &str, key: &str, value: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(found) = text[pos..].find(key) {
        let start = pos + found;
        let end = start + key.len();
        let left_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let right_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        out.push_str(&text[pos..start]);
        if left_ok && right_ok {
            out.push_str(value);
        } else {
            out.push_str(key);
        }
        pos = end;
    }
    out.push_str(&text[pos..]);
    out
}

/// Reverse a packed-code block into plaintext.
///
/// Substitution runs from the highest token index down to zero; an empty
/// dictionary entry means the token stands for itself. The result is
/// expected to contain an unobfuscated source-URL assignment, but that check
/// belongs to the caller, which knows what it is looking for.
pub fn deobfuscate(payload: &ObfuscatedPayload) -> Result<String> {
    if payload.radix < 2 {
        return Err(PaheError::DeobfuscationFailed(format!(
            "radix {} is not a usable base",
            payload.radix
        )));
    }
    // The packer's alphabet is 0-9a-zA-Z; a larger radix comes from a
    // malformed page and would produce garbage tokens.
    if payload.radix > MAX_RADIX {
        return Err(PaheError::DeobfuscationFailed(format!(
            "radix {} exceeds the token alphabet",
            payload.radix
        )));
    }
    if payload.dictionary.len() != payload.token_count {
        return Err(PaheError::DeobfuscationFailed(format!(
            "token count {} does not match dictionary length {}",
            payload.token_count,
            payload.dictionary.len()
        )));
    }

    let mut text = payload.packed.clone();
    for index in (0..payload.token_count).rev() {
        let key = encode_token(index as u64, payload.radix);
        let entry = &payload.dictionary[index];
        let value = if entry.is_empty() { key.as_str() } else { entry.as_str() };
        if value != key {
            text = replace_whole_word(&text, &key, value);
        }
    }
    Ok(text)
}
