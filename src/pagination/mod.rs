//! Bidirectional keyset pagination shared by every listing endpoint.
//!
//! The protocol: the caller supplies filters, a page size and optionally an
//! opaque cursor; the repository fetches `limit + 1` rows along the
//! `(created_at, id)` keyset; [`keyset::assemble`] trims the window, restores
//! ascending display order and emits next/prev boundary cursors.

pub mod cursor;
pub mod keyset;

pub use cursor::{Cursor, CursorError};
pub use keyset::{assemble, Page, PageError, PageRequest, Pager, SortKeyed};
