//! An immutable, timezone-aware moment.
//!
//! A [`Moment`] is an instant paired with the zone it is shown in. Moments are
//! built from expressions (`"2009-09-09 09:09:09"`, `"first day of January 2008"`),
//! Unix timestamps or other date values, and every operation returns a new moment.
//! The default zone comes from [`Config`], and "now" can be frozen for tests with
//! [`clock::freeze`].

pub mod clock;
pub mod color;
pub mod config;
pub mod debug;
pub mod errors;
pub mod format;
pub mod moment;
pub mod parse;
pub mod relative;
pub mod zone;

pub use config::Config;
pub use errors::{Error, ErrorKind};
pub use moment::{DateLike, Moment};
pub use zone::{ToZone, Zone};
