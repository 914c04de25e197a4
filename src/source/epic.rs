//! Epic Games Store: weekly free games.
//!
//! The promotions endpoint lists everything featured on the free-games page,
//! including upcoming and already-expired giveaways.  Only games whose
//! percentage promotion is running right now and whose discounted price is
//! zero count as free.
//!
//! A giveaway is announced once, ever.  If the same title is given away again
//! months later it stays silent: the key is the title and the record is
//! never cleared.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::client::{self, CatalogClient};
use super::{GameSource, Notification};
use crate::error::{FetchError, StoreError};
use crate::store::NotificationStore;

const PROMOTIONS_URL: &str =
    "https://store-site-backend-static-ipv4.ak.epicgames.com/freeGamesPromotions";

/// Preferred banner image types, best first.
const BANNER_IMAGE_TYPES: &[&str] = &["OfferImageWide", "DieselStoreFrontWide", "Thumbnail"];

/// A game that is free to claim right now.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EpicGame {
    pub title: String,
    pub banner_url: Option<String>,
    pub store_url: Option<String>,
}

pub struct EpicSource {
    client: Arc<dyn CatalogClient>,
    /// Store locale, e.g. `de`.  Used for the API query and page links.
    locale: String,
    /// Country whose promotions are queried, e.g. `DE`.
    country: String,
}

impl EpicSource {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        locale: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            client,
            locale: locale.into(),
            country: country.into(),
        }
    }

    fn promotions_url(&self) -> String {
        format!(
            "{PROMOTIONS_URL}?locale={locale}&country={country}&allowCountries={country}",
            locale = self.locale,
            country = self.country,
        )
    }

    /// Pick the games that are free at `now` out of a promotions payload.
    ///
    /// Pure function so the rules can be tested without the network.
    fn free_games(response: PromotionsResponse, now: DateTime<Utc>, locale: &str) -> Vec<EpicGame> {
        response
            .data
            .catalog
            .search_store
            .elements
            .into_iter()
            .filter(|element| element.is_free_at(now))
            .map(|element| EpicGame {
                banner_url: element.banner_url(),
                store_url: element
                    .page_slug()
                    .map(|slug| format!("https://store.epicgames.com/{locale}/p/{slug}")),
                title: element.title,
            })
            .collect()
    }
}

impl GameSource for EpicSource {
    type Item = EpicGame;

    fn name(&self) -> &str {
        "epic"
    }

    fn fetch(&self) -> Result<Vec<EpicGame>, FetchError> {
        let response = client::get_typed(self.client.as_ref(), &self.promotions_url())?;
        Ok(Self::free_games(response, Utc::now(), &self.locale))
    }

    fn key(&self, item: &EpicGame) -> String {
        item.title.clone()
    }

    fn eligible(
        &self,
        store: &NotificationStore,
        key: &str,
        _today: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(store.get(self.name(), key)?.is_none())
    }

    fn render(&self, item: &EpicGame) -> Notification {
        Notification::new(format!("{} is currently free on Epic Games!", item.title))
            .with_image(item.banner_url.clone())
            .with_action(item.store_url.clone())
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PromotionsResponse {
    data: PromotionsData,
}

#[derive(Debug, Deserialize)]
struct PromotionsData {
    #[serde(rename = "Catalog")]
    catalog: Catalog,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    search_store: SearchStore,
}

#[derive(Debug, Deserialize)]
struct SearchStore {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Element {
    title: String,
    #[serde(default)]
    product_slug: Option<String>,
    #[serde(default)]
    catalog_ns: Option<CatalogNamespace>,
    #[serde(default)]
    offer_mappings: Option<Vec<PageMapping>>,
    #[serde(default)]
    key_images: Option<Vec<KeyImage>>,
    #[serde(default)]
    price: Option<Price>,
    // Games that are no longer free mostly have this set to null.
    #[serde(default)]
    promotions: Option<Promotions>,
}

#[derive(Debug, Deserialize)]
struct CatalogNamespace {
    #[serde(default)]
    mappings: Option<Vec<PageMapping>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMapping {
    page_slug: String,
    #[serde(default)]
    page_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyImage {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Price {
    total_price: TotalPrice,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalPrice {
    discount_price: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Promotions {
    #[serde(default)]
    promotional_offers: Option<Vec<OfferGroup>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferGroup {
    #[serde(default)]
    promotional_offers: Vec<PromotionalOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromotionalOffer {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    discount_setting: DiscountSetting,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscountSetting {
    discount_type: String,
}

impl Element {
    fn is_free_at(&self, now: DateTime<Utc>) -> bool {
        let zero_price = self
            .price
            .as_ref()
            .is_some_and(|price| price.total_price.discount_price == 0);
        if !zero_price {
            return false;
        }

        self.promotions
            .iter()
            .flat_map(|promotions| promotions.promotional_offers.iter().flatten())
            .flat_map(|group| &group.promotional_offers)
            .any(|offer| {
                offer.discount_setting.discount_type == "PERCENTAGE"
                    && offer.start_date <= now
                    && now <= offer.end_date
            })
    }

    fn banner_url(&self) -> Option<String> {
        let images = self.key_images.as_deref().unwrap_or_default();
        BANNER_IMAGE_TYPES.iter().find_map(|kind| {
            images
                .iter()
                .find(|image| image.kind == *kind)
                .map(|image| image.url.clone())
        })
    }

    fn page_slug(&self) -> Option<&str> {
        let product_slug = self.product_slug.as_deref();
        let product_home = self
            .catalog_ns
            .as_ref()
            .and_then(|ns| ns.mappings.as_deref())
            .unwrap_or_default()
            .iter()
            .find(|mapping| mapping.page_type.as_deref() == Some("productHome"))
            .map(|mapping| mapping.page_slug.as_str());
        let offer_page = self
            .offer_mappings
            .as_deref()
            .and_then(|mappings| mappings.first())
            .map(|mapping| mapping.page_slug.as_str());

        [product_slug, product_home, offer_page]
            .into_iter()
            .flatten()
            .find(|slug| !slug.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
