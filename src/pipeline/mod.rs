//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step, so every
//! heuristic is testable on its own against a [`crate::source::memory::MemoryDocument`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ noise ──▶ classify ──▶ merge ──▶ render ──▶ encode
//! (path)   (pages)   (filter)   (tags)     (order)   (markdown)  (jpeg)
//!                       ▲
//!                   watermark
//! ```
//!
//! 1. [`input`]     — validate the path and derive the output location
//! 2. [`noise`]     — drop headers, footers, decorative images and watermarks
//! 3. [`watermark`] — pattern and rotation checks used by [`noise`]
//! 4. [`classify`]  — ordered rules assigning H1/H2/H3/LI/P/CAPTION
//! 5. [`merge`]     — reading-order sort and paragraph reassembly
//! 6. [`render`]    — Markdown text plus numbered image links
//! 7. [`encode`]    — JPEG encoding of saved images

pub mod classify;
pub mod encode;
pub mod input;
pub mod merge;
pub mod noise;
pub mod render;
pub mod watermark;
