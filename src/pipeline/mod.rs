//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements one step, so each can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! detect ──▶ worker ──▶ render ──▶ encode ──▶ llm ──▶ postprocess
//! (bytes)   (pdf/img)  (pdfium)   (base64)   (VLM)   (unwrap)
//! ```
//!
//! 1. [`detect`] names the input type from its magic bytes
//! 2. [`worker`] wraps the input as a PDF or image worker; [`pages`]
//!    validates the requested range
//! 3. [`render`] extracts and rasterises PDF pages with pdfium; blocking,
//!    so it runs in `spawn_blocking`
//! 4. [`encode`] turns each page image into a base64 data URI
//! 5. [`llm`] sends the prompt and images through a [`provider`], with
//!    [`retry`]; the only stage with network I/O
//! 6. [`postprocess`] strips a stray outer code fence from the reply

pub mod detect;
pub mod encode;
pub mod llm;
pub mod pages;
pub mod postprocess;
pub mod provider;
pub mod render;
pub mod retry;
pub mod worker;
