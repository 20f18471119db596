//! Interning tables.
//!
//! Each table maps a request key to a collision-free C identifier, built on
//! first request and reused for the rest of the session, plus the one-time
//! initialization code that must run at module load before any generated
//! function executes.
//!
//! - [`UniqueNames`]: session-wide identifier allocator
//! - [`SymbolTable`]: Ruby symbols → `static ID` variables (`rb_intern`)
//! - [`GlobalTable`]: C initializer expressions → `static VALUE` storage,
//!   optionally shared and optionally registered as GC roots
//!
//! All tables take the session's [`UniqueNames`] by reference so identifiers
//! never collide across tables.

mod globals;
mod names;
mod symbols;

pub use globals::GlobalTable;
pub use names::UniqueNames;
pub use symbols::SymbolTable;
