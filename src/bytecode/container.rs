use serde::{Deserialize, Serialize};

// =============================================================================
// Container - serialized bytecode framing and the blinding transform
// =============================================================================

pub const MAGIC: u8 = 0xc3;
pub const VERSION: u8 = 0x04;
pub const DEFAULT_SEED: u32 = 0x13572468;

/// Linear-congruential keystream generator behind the blinding transform.
///
/// Each body byte is XOR-ed with the low 8 bits of the post-step state. The
/// transform is reproducible, not cryptographic: its only purpose is to make
/// the raw bytes non-obvious.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Lcg { state: seed }
    }

    pub fn next_byte(&mut self) -> u8 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.state & 0xff) as u8
    }
}

/// Keystream for a body of `len` bytes. Indexed by body byte offset, so every
/// consumer de-blinds identically no matter what order the bytes are fetched
/// in (the VM takes jumps; the disassembler walks linearly).
pub fn keystream(seed: u32, len: usize) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    (0..len).map(|_| rng.next_byte()).collect()
}

/// XOR the body against the seed's keystream. Involutive: applying it twice
/// returns the original bytes.
pub fn blind(body: &[u8], seed: u32) -> Vec<u8> {
    let pad = keystream(seed, body.len());
    body.iter().zip(pad).map(|(b, k)| b ^ k).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    Truncated { len: usize },
    BadMagic { got: u8 },
    BadVersion { got: u8 },
    LengthMismatch { declared: usize, actual: usize },
}

impl std::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerError::Truncated { len } => {
                write!(f, "container truncated: {} bytes is shorter than the header", len)
            }
            ContainerError::BadMagic { got } => {
                write!(f, "bad container magic: expected 0x{:02x}, got 0x{:02x}", MAGIC, got)
            }
            ContainerError::BadVersion { got } => {
                write!(f, "unsupported container version 0x{:02x} (expected 0x{:02x})", got, VERSION)
            }
            ContainerError::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "container body length mismatch: header declares {} bytes, {} present",
                    declared, actual
                )
            }
        }
    }
}

impl std::error::Error for ContainerError {}

/// A parsed container: header fields plus the de-blinded body.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub seed: u32,
    pub body: Vec<u8>,
}

impl Container {
    /// Parse and de-blind a serialized container.
    ///
    /// Layout (big-endian): magic, version, seed u32, body length u16, then
    /// exactly `length` blinded body bytes. Trailing bytes are a mismatch,
    /// not padding.
    pub fn parse(bytes: &[u8]) -> Result<Container, ContainerError> {
        if bytes.len() < 8 {
            return Err(ContainerError::Truncated { len: bytes.len() });
        }
        if bytes[0] != MAGIC {
            return Err(ContainerError::BadMagic { got: bytes[0] });
        }
        if bytes[1] != VERSION {
            return Err(ContainerError::BadVersion { got: bytes[1] });
        }
        let seed = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        let declared = u16::from_be_bytes([bytes[6], bytes[7]]) as usize;
        let actual = bytes.len() - 8;
        if declared != actual {
            return Err(ContainerError::LengthMismatch { declared, actual });
        }
        Ok(Container {
            seed,
            body: blind(&bytes[8..], seed),
        })
    }

    /// Frame and blind a plain instruction body. The caller guarantees the
    /// body fits the u16 length field (the compiler checks before emitting).
    pub fn encode(body: &[u8], seed: u32) -> Vec<u8> {
        let blinded = blind(body, seed);
        let mut out = Vec::with_capacity(8 + blinded.len());
        out.push(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&seed.to_be_bytes());
        out.extend_from_slice(&(blinded.len() as u16).to_be_bytes());
        out.extend_from_slice(&blinded);
        out
    }
}

/// A compiled program: the serialized container plus the string table the
/// container's instructions index into.
///
/// The table is not embedded in the container itself; this bundle is the
/// versioned artifact that keeps the two bound together on disk, so the VM
/// and the disassembler can never be handed mismatched halves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub container: Vec<u8>,
    pub strings: Vec<String>,
}

impl Program {
    pub fn to_bundle(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bundle(bytes: &[u8]) -> Result<Program, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blind_round_trip() {
        let body: Vec<u8> = (0..=255).collect();
        for seed in [0u32, 1, DEFAULT_SEED, 0xffff_ffff] {
            let blinded = blind(&body, seed);
            assert_ne!(blinded, body, "seed {seed:#x} left the body unchanged");
            assert_eq!(blind(&blinded, seed), body);
        }
    }

    #[test]
    fn test_keystream_matches_reference_sequence() {
        // first values of state = state * 1664525 + 1013904223 from seed 0
        let mut rng = Lcg::new(0);
        assert_eq!(rng.next_byte(), (1013904223u32 & 0xff) as u8);
        let second = 1013904223u32.wrapping_mul(1664525).wrapping_add(1013904223);
        assert_eq!(rng.next_byte(), (second & 0xff) as u8);
    }

    #[test]
    fn test_header_layout() {
        let body = [0x01u8, 0x07, 0x00];
        let bytes = Container::encode(&body, 0xAABBCCDD);
        assert_eq!(bytes[0], 0xc3);
        assert_eq!(bytes[1], 0x04);
        assert_eq!(&bytes[2..6], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&bytes[6..8], &[0x00, 0x03]);
        assert_eq!(bytes.len(), 11);
    }

    #[test]
    fn test_parse_round_trip() {
        let body = vec![0x10, 0x7f, 0xff, 0xff, 0xff, 0x00];
        let encoded = Container::encode(&body, DEFAULT_SEED);
        let parsed = Container::parse(&encoded).unwrap();
        assert_eq!(parsed.seed, DEFAULT_SEED);
        assert_eq!(parsed.body, body);
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = Container::encode(&[0x00], DEFAULT_SEED);
        bytes[0] = 0xc4;
        assert_eq!(
            Container::parse(&bytes),
            Err(ContainerError::BadMagic { got: 0xc4 })
        );
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        let mut bytes = Container::encode(&[0x00], DEFAULT_SEED);
        bytes[1] = 0x05;
        assert_eq!(
            Container::parse(&bytes),
            Err(ContainerError::BadVersion { got: 0x05 })
        );
    }

    #[test]
    fn test_parse_rejects_length_mismatch() {
        let mut bytes = Container::encode(&[0x00, 0x00], DEFAULT_SEED);
        bytes.push(0xee); // trailing garbage
        assert_eq!(
            Container::parse(&bytes),
            Err(ContainerError::LengthMismatch {
                declared: 2,
                actual: 3
            })
        );

        bytes.truncate(9); // one body byte short
        assert_eq!(
            Container::parse(&bytes),
            Err(ContainerError::LengthMismatch {
                declared: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert_eq!(
            Container::parse(&[0xc3, 0x04]),
            Err(ContainerError::Truncated { len: 2 })
        );
    }

    #[test]
    fn test_bundle_round_trip() {
        let program = Program {
            container: Container::encode(&[0x00], DEFAULT_SEED),
            strings: vec!["print".to_string(), "&".to_string()],
        };
        let bytes = program.to_bundle().unwrap();
        assert_eq!(Program::from_bundle(&bytes).unwrap(), program);
    }
}
