/*
    A parameter is a single named value read from an acquisition, with a tolerance policy
    A sequence is the set of parameters describing one acquisition
    A protocol is a reference collection of sequences for a session
    Compliance is tolerance-based equality of values plus equality of units
 */

pub mod error;
pub mod value;
pub mod registry;
pub mod parameter;
pub mod sequence;
pub mod protocol;
pub mod imaging;

pub use error::{ErrorKind, ProtocolError, Result};
pub use parameter::{Kind, Parameter, Severity};
pub use protocol::{Modality, Protocol, ProtocolOrigin};
pub use sequence::{Compliance, SessionInfo, Sequence};
pub use value::{RawValue, ValueSource};
