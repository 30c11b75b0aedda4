//! Applies tuner output to a file of tunable value declarations.
//!
//! A run is strictly sequential:
//!
//! 1. **Collect** `name,value` records until a blank line ([`collect_updates`]).
//! 2. **Read** the whole tunables file into a line buffer ([`TunablesFile`]).
//! 3. **Patch** the value field of every declaration named in the input
//!    ([`TunablesFile::apply`]).
//! 4. **Write** the buffer back in a single replace ([`TunablesFile::write`]).
//!
//! Any fatal error happens before step 4, so a failed run never leaves a
//! partially patched file behind.

pub mod declaration;
pub mod error;
pub mod input;
pub mod patch;
pub mod report;

pub use declaration::{Declaration, DeclarationParseError, Grammar, ParsedLine};
pub use error::{PatchError, Result};
pub use input::{collect_updates, NameConvention, UpdateRecord, UpdateSet};
pub use patch::{patch_file, TunablesFile};
pub use report::{PatchReport, ValueChange};
