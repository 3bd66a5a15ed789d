//! Random tokens for MIME multipart boundaries
//!
//! Tokens are drawn from the operating system CSPRNG and mapped into the
//! chosen alphabet with a modulo reduction. Because 256 is not a multiple of
//! the alphabet sizes, lower alphabet indices are slightly more likely
//! (e.g. for the 62-symbol alphanumeric alphabet the first 8 symbols appear
//! with probability 5/256 instead of 4/256). That bias is accepted: boundaries
//! only need to be unlikely to collide with message content.

use rand::{rngs::OsRng, RngCore};
use std::fmt;
use std::str::FromStr;

use crate::error::GmailError;

/// Length of the boundary token used in spam reports
pub const BOUNDARY_LENGTH: usize = 32;

const NUMERIC: &[u8] = b"0123456789";
const ALPHABETIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Character set a token is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// `0-9A-Za-z`
    Alphanumeric,
    /// `A-Za-z`
    Alphabetic,
    /// `0-9`
    Numeric,
}

impl Alphabet {
    /// The symbols of this alphabet, in index order
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Alphanumeric => ALPHANUMERIC,
            Alphabet::Alphabetic => ALPHABETIC,
            Alphabet::Numeric => NUMERIC,
        }
    }

    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.symbols().contains(&(c as u8))
    }
}

impl FromStr for Alphabet {
    type Err = GmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alphanumeric" | "alphanum" => Ok(Alphabet::Alphanumeric),
            "alphabetic" | "alpha" => Ok(Alphabet::Alphabetic),
            "numeric" | "number" => Ok(Alphabet::Numeric),
            other => Err(GmailError::InvalidAlphabet(format!(
                "'{}'. Must be 'alphanumeric', 'alphabetic' or 'numeric'",
                other
            ))),
        }
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Alphabet::Alphanumeric => "alphanumeric",
            Alphabet::Alphabetic => "alphabetic",
            Alphabet::Numeric => "numeric",
        };
        f.write_str(name)
    }
}

/// Generate a random string of exactly `length` characters from `alphabet`
pub fn generate(length: usize, alphabet: Alphabet) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    map_into_alphabet(&bytes, alphabet)
}

/// Generate a fresh multipart boundary
pub fn boundary() -> String {
    generate(BOUNDARY_LENGTH, Alphabet::Alphanumeric)
}

fn map_into_alphabet(bytes: &[u8], alphabet: Alphabet) -> String {
    let symbols = alphabet.symbols();
    bytes
        .iter()
        .map(|b| symbols[*b as usize % symbols.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_length_and_alphabet() {
        for alphabet in [Alphabet::Alphanumeric, Alphabet::Alphabetic, Alphabet::Numeric] {
            let token = generate(64, alphabet);
            assert_eq!(token.chars().count(), 64);
            assert!(token.chars().all(|c| alphabet.contains(c)), "{}", token);
        }
    }

    #[test]
    fn test_generate_zero_length() {
        assert_eq!(generate(0, Alphabet::Numeric), "");
    }

    #[test]
    fn test_boundary_shape() {
        let b = boundary();
        assert_eq!(b.len(), BOUNDARY_LENGTH);
        assert!(b.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_two_boundaries_differ() {
        // 62^32 possibilities; a collision here means the source is broken
        assert_ne!(boundary(), boundary());
    }

    #[test]
    fn test_modulo_mapping() {
        // 0 -> '0', 61 -> 'z', 62 wraps to '0', 255 % 62 = 7 -> '7'
        assert_eq!(map_into_alphabet(&[0, 61, 62, 255], Alphabet::Alphanumeric), "0z07");
        // 255 % 52 = 47 -> 'v'
        assert_eq!(map_into_alphabet(&[0, 26, 255], Alphabet::Alphabetic), "Aav");
        assert_eq!(map_into_alphabet(&[9, 10, 255], Alphabet::Numeric), "905");
    }

    #[test]
    fn test_alphabet_from_str() {
        assert_eq!("alphanum".parse::<Alphabet>().unwrap(), Alphabet::Alphanumeric);
        assert_eq!("Alphanumeric".parse::<Alphabet>().unwrap(), Alphabet::Alphanumeric);
        assert_eq!("alpha".parse::<Alphabet>().unwrap(), Alphabet::Alphabetic);
        assert_eq!("number".parse::<Alphabet>().unwrap(), Alphabet::Numeric);
        assert_eq!("numeric".parse::<Alphabet>().unwrap(), Alphabet::Numeric);
    }

    #[test]
    fn test_alphabet_from_str_rejects_unknown() {
        let err = "hex".parse::<Alphabet>().unwrap_err();
        assert!(matches!(err, GmailError::InvalidAlphabet(_)));
        assert!("".parse::<Alphabet>().is_err());
    }

    #[test]
    fn test_alphabet_display_parses_back() {
        for alphabet in [Alphabet::Alphanumeric, Alphabet::Alphabetic, Alphabet::Numeric] {
            assert_eq!(alphabet.to_string().parse::<Alphabet>().unwrap(), alphabet);
        }
    }

    proptest! {
        #[test]
        fn prop_generate_respects_length_and_alphabet(
            length in 0usize..512,
            which in 0usize..3,
        ) {
            let alphabet = [Alphabet::Alphanumeric, Alphabet::Alphabetic, Alphabet::Numeric][which];
            let token = generate(length, alphabet);
            prop_assert_eq!(token.chars().count(), length);
            prop_assert!(token.chars().all(|c| alphabet.contains(c)));
        }

        #[test]
        fn prop_mapping_covers_every_byte(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let token = map_into_alphabet(&bytes, Alphabet::Alphanumeric);
            prop_assert_eq!(token.len(), bytes.len());
            prop_assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
