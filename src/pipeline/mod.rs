//! Pipeline stages for situaciones extraction.
//!
//! Each submodule implements one step; only collection suspends, the rest
//! are plain synchronous transformations.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdfium ──▶ collect ──▶ assemble ──▶ classify ──▶ fields
//! (path/URL) (engine)  (index)     (lines)      (rows)       (records)
//! ```
//!
//! 1. [`input`]    : canonicalise the user-supplied path or URL to a local file
//! 2. [`pdfium`]   : the layout engine, a [`source::FragmentSource`] running
//!    on a blocking thread
//! 3. [`collect`]  : drain fragments into a page → y → x index, racing a
//!    deadline
//! 4. [`assemble`] : join each row's fragments into a line, in reading order
//! 5. [`classify`] : keep lines that open with a scheme label
//! 6. [`fields`]   : dates, residual tokens and the column template

pub mod assemble;
pub mod classify;
pub mod collect;
pub mod fields;
pub mod input;
pub mod pdfium;
pub mod source;
