// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RFC 6238 time-based one-time passwords (HMAC-SHA1).

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use strongroom_core::StrongroomError;
use zeroize::Zeroizing;

use crate::record::Totp;

/// A generated code and how long it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpCode {
    pub code: String,
    pub remaining_secs: u64,
}

/// Compute the code for `totp` at `unix_secs`.
pub fn generate(totp: &Totp, unix_secs: u64) -> Result<TotpCode, StrongroomError> {
    if totp.digits != 6 && totp.digits != 8 {
        return Err(invalid(&totp.name, "digits must be 6 or 8"));
    }
    if totp.period == 0 {
        return Err(invalid(&totp.name, "period must be greater than zero"));
    }
    let secret = decode_secret(&totp.secret)
        .ok_or_else(|| invalid(&totp.name, "secret is not valid base32"))?;

    let counter = unix_secs / totp.period;
    let mut mac = Hmac::<Sha1>::new_from_slice(&secret)
        .map_err(|_| invalid(&totp.name, "secret has an unusable length"))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation.
    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let value = binary % 10u32.pow(totp.digits);

    Ok(TotpCode {
        code: format!("{value:0width$}", width = totp.digits as usize),
        remaining_secs: totp.period - unix_secs % totp.period,
    })
}

fn decode_secret(secret: &str) -> Option<Zeroizing<Vec<u8>>> {
    let normalized: Zeroizing<String> = Zeroizing::new(
        secret
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace() && *ch != '=')
            .map(|ch| ch.to_ascii_uppercase())
            .collect(),
    );
    if normalized.is_empty() {
        return None;
    }
    BASE32_NOPAD.decode(normalized.as_bytes()).ok().map(Zeroizing::new)
}

fn invalid(name: &str, reason: &str) -> StrongroomError {
    StrongroomError::Config(format!("TOTP {name:?}: {reason}"))
}
