use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let value: [u8; 5] = OsRng.gen();
    log::debug!("Initialized object id generator with process value {:02x?}", value);
    value
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(OsRng.gen_range(0..=COUNTER_MASK)));

/// A 12-byte document identifier.
///
/// The layout is a 4-byte big-endian creation time in seconds, 5 bytes chosen at random
/// once per process and a 3-byte counter that starts at a random value. Identifiers
/// generated by one process are therefore unique and roughly ordered by creation time.
///
/// The text form is 24 lowercase hex characters.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::common::ObjectId;
///
/// let id = ObjectId::new();
/// let parsed: ObjectId = id.to_hex().parse()?;
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    /// Generates a new unique `ObjectId`.
    pub fn new() -> Self {
        let timestamp = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        ObjectId { bytes }
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId { bytes }
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.bytes
    }

    /// The creation time encoded in the identifier, with one-second resolution.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let mut secs = [0u8; 4];
        secs.copy_from_slice(&self.bytes[0..4]);
        DateTime::from_timestamp(u32::from_be_bytes(secs) as i64, 0).unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl FromStr for ObjectId {
    type Err = RepoError;

    fn from_str(s: &str) -> RepoResult<Self> {
        if s.len() != 24 || !s.is_ascii() {
            log::error!("Invalid object id {}", s);
            return Err(RepoError::new(
                &format!("Invalid object id '{}': expected 24 hex characters", s),
                ErrorKind::ValidationError,
            ));
        }

        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| {
                log::error!("Invalid object id {}", s);
                RepoError::new(
                    &format!("Invalid object id '{}': not a hex string", s),
                    ErrorKind::ValidationError,
                )
            })?;
        }
        Ok(ObjectId { bytes })
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
