//! Application layer: pages, controls, and the controller that owns them.
//!
//! # What lives here? (for beginners)
//!
//! This layer turns raw device input into meaningful events and decides what
//! the LEDs should show. It draws through the [`monome_core::LedSurface`]
//! trait and never opens a socket itself, so everything here can be tested
//! with an in-memory surface.
//!
//! # Sub-modules
//!
//! - **`page`**        – The [`page::Page`] trait and [`page::VariantSpec`],
//!   the per-control variant tags a page is built from.
//!
//! - **`ring_page`**   – Encoder pages for an arc: one ring per encoder,
//!   scaled by sensitivity, redrawn as a 64-level map on every move.
//!
//! - **`key_page`**    – Button pages for a grid: momentary, toggle, and
//!   radio keys, with radio groups keeping at most one member selected.
//!
//! - **`subscribers`** – Ordered callback lists with removable
//!   [`subscribers::SubscriberId`] handles.
//!
//! - **`controller`**  – Owns the pages of one device, routes input to the
//!   current page, and notifies subscribers outside its lock.

pub mod controller;
pub mod key_page;
pub mod page;
pub mod ring_page;
pub mod subscribers;
