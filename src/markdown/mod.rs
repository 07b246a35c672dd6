//! The markdown sync core: rendering issue checklists, parsing checkbox
//! edits back into intent, reconciling intent against remote state, and
//! watching the generated file for edits.
//!
//! The inline `<!-- id:... -->` comment is the wire format between the
//! renderer and the parser. It carries the only field trusted for
//! write-back; everything else on a line is display text.

pub mod parse;
pub mod reconcile;
pub mod render;
pub mod watch;
