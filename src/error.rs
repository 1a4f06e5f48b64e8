// Error taxonomy shared by the per-module error enums
use serde::{Deserialize, Serialize};

/// Classification of every rejection the engine can produce.
///
/// Each module keeps its own descriptive `thiserror` enum; `kind()` on those
/// enums maps the variant into this taxonomy so callers can branch on the
/// class of failure without matching every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Wrong caller role: not the producer / pool admin / candidate admin / relayer
    Authorization,
    /// Too early or too late: cooldown unexpired, epoch/period not ending,
    /// bail-out outside a jail term
    Timing,
    /// Double action within one block, or nonce/period reuse or regression
    Ordering,
    /// Stake below minimum, credit score insufficient, vault underfunded
    InsufficientResource,
    /// Non-existent or revoked pool, duplicate vote, already relayed
    State,
}
