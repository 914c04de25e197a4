//! Storefront source abstraction.
//!
//! This module defines the [`GameSource`] trait and the [`Notification`]
//! payload.  Concrete storefronts live in sub-modules ([`epic`], [`steam`]).
//!
//! ## For contributors — adding a new storefront
//!
//! 1. Create a new file in this directory (e.g. `gog.rs`).
//! 2. Define the raw item type your API yields and a struct (e.g.
//!    `GogSource`) implementing [`GameSource`] for it.
//! 3. Add `mod gog;` below and re-export your struct in the `pub use` block.
//! 4. Construct an instance in `main.rs` and add it to the sources vec.
//!
//! The poll loop, the store and the transport are all source-agnostic: they
//! only ever ask a source to fetch, key, judge and render.

mod client;
mod epic;
mod notification;
mod steam;

pub use client::{CatalogClient, HttpCatalogClient};
pub use epic::EpicSource;
pub use notification::Notification;
pub use steam::SteamSource;

#[cfg(test)]
pub(crate) use client::stub::StubClient;

use chrono::NaiveDate;

use crate::error::{FetchError, StoreError};
use crate::store::NotificationStore;

/// Trait that every storefront must implement.
///
/// The poll loop calls these in a fixed order for each item:
/// [`fetch`](GameSource::fetch) once per cycle, then
/// [`key`](GameSource::key) and [`eligible`](GameSource::eligible) per item,
/// and [`render`](GameSource::render) only for items that were eligible and
/// have just been recorded.
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* config fields */ }
///
/// impl GameSource for MySource {
///     type Item = MyDeal;
///
///     fn name(&self) -> &str { "my-store" }
///     fn fetch(&self) -> Result<Vec<MyDeal>, FetchError> { todo!() }
///     fn key(&self, item: &MyDeal) -> String { item.id.clone() }
///     fn eligible(&self, store: &NotificationStore, key: &str, _today: NaiveDate)
///         -> Result<bool, StoreError> {
///         Ok(store.get(self.name(), key)?.is_none())
///     }
///     fn render(&self, item: &MyDeal) -> Notification { Notification::new(&item.title) }
/// }
/// ```
pub trait GameSource: Send {
    /// The storefront-specific item `fetch` yields.  Never persisted.
    type Item;

    /// Source id, also used as the `source` column in the store.
    fn name(&self) -> &str;

    /// Query the storefront for items that are currently promotional events.
    ///
    /// An error means "nothing from this source this cycle"; other sources
    /// still run.
    fn fetch(&self) -> Result<Vec<Self::Item>, FetchError>;

    /// Stable identity of an item: the same logical event must always map to
    /// the same key, distinct events to distinct keys.
    fn key(&self, item: &Self::Item) -> String;

    /// Whether the entry with `key` should be announced on `today`.
    ///
    /// Must be answered from `store` alone; sources keep no memory of their
    /// own between cycles.
    fn eligible(
        &self,
        store: &NotificationStore,
        key: &str,
        today: NaiveDate,
    ) -> Result<bool, StoreError>;

    /// Build the push payload for an item.
    fn render(&self, item: &Self::Item) -> Notification;
}
