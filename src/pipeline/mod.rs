//! Pipeline stages for turning chapter Markdown into numbered PDFs.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and the converter can be swapped without touching
//! the PDF stages.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ prepare ──▶ render ──▶ stamp ──▶ merge
//!  (cleanup)   (prologue)  (converter) ("N.i")   (cover + pages)
//!                                                    ▲
//!                                          cover ────┘
//! ```
//!
//! 1. [`normalize`] — strip duplicated metadata headers, idempotent
//! 2. [`prepare`]   — extract the title and write the render-ready copy
//! 3. [`render`]    — drive the external converter with timeout and fallback
//! 4. [`stamp`]     — label every page `"{chapter}.{page}"`
//! 5. [`cover`]     — synthesise chapter and course cover pages
//! 6. [`merge`]     — concatenate PDFs in a caller-given order
//!
//! [`pdf`] holds the `lopdf` helpers the last three stages share.

pub mod cover;
pub mod merge;
pub mod normalize;
pub mod pdf;
pub mod prepare;
pub mod render;
pub mod stamp;
