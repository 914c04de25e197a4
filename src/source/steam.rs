//! Steam: sales on a fixed watch list of apps.
//!
//! Unlike Epic giveaways, a Steam sale is worth hearing about again: once a
//! week at most, for as long as the app stays discounted.  Suppression is
//! purely date based, so a sale that ends and comes back inside the same
//! week stays quiet until the week is over.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use super::client::{self, CatalogClient};
use super::{GameSource, Notification};
use crate::error::{FetchError, StoreError};
use crate::store::NotificationStore;

const APP_DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";

/// Days after a notification during which the same app stays quiet.
const SUPPRESSION_DAYS: i64 = 7;

/// A watched app that is currently discounted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SteamSaleHit {
    pub appid: u32,
    pub title: String,
    pub discount_percent: u32,
    /// Discounted price, already formatted by Steam for the queried country.
    pub price: String,
    pub banner_url: Option<String>,
    pub store_url: String,
}

pub struct SteamSource {
    client: Arc<dyn CatalogClient>,
    /// App ids to check, in the order they are queried.
    watch_list: Vec<u32>,
    /// Steam `cc` parameter, decides currency and regional pricing.
    country: String,
}

impl SteamSource {
    pub fn new(client: Arc<dyn CatalogClient>, watch_list: Vec<u32>, country: impl Into<String>) -> Self {
        Self {
            client,
            watch_list,
            country: country.into(),
        }
    }

    fn app_details_url(&self, appid: u32) -> String {
        format!("{APP_DETAILS_URL}?appids={appid}&cc={}", self.country)
    }

    /// Turn an `appdetails` response into a sale hit, if the app is on sale.
    fn sale_hit(appid: u32, mut response: AppDetailsResponse) -> Option<SteamSaleHit> {
        let entry = response.remove(&appid.to_string())?;
        if !entry.success {
            tracing::debug!(appid, "steam has no details for app");
            return None;
        }
        let data = entry.data?;
        // Free-to-play and unreleased apps have no price block at all.
        let price = data.price_overview?;
        if price.discount_percent == 0 {
            return None;
        }

        Some(SteamSaleHit {
            appid,
            title: data.name,
            discount_percent: price.discount_percent,
            price: price.final_formatted,
            banner_url: data.header_image.filter(|url| !url.is_empty()),
            store_url: format!("https://store.steampowered.com/app/{appid}"),
        })
    }
}

impl GameSource for SteamSource {
    type Item = SteamSaleHit;

    fn name(&self) -> &str {
        "steam"
    }

    /// One lookup per watched app.  A failed lookup skips that app for this
    /// cycle; the fetch only fails when every lookup did.
    fn fetch(&self) -> Result<Vec<SteamSaleHit>, FetchError> {
        let mut hits = Vec::new();
        let mut last_error = None;
        let mut failed = 0;
        for &appid in &self.watch_list {
            match client::get_typed(self.client.as_ref(), &self.app_details_url(appid)) {
                Ok(response) => hits.extend(Self::sale_hit(appid, response)),
                Err(e) => {
                    tracing::warn!(appid, error = %e, "steam lookup failed, skipping app");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if failed == self.watch_list.len() => Err(e),
            _ => Ok(hits),
        }
    }

    fn key(&self, item: &SteamSaleHit) -> String {
        item.appid.to_string()
    }

    fn eligible(
        &self,
        store: &NotificationStore,
        key: &str,
        today: NaiveDate,
    ) -> Result<bool, StoreError> {
        let eligible = match store.get(self.name(), key)? {
            None => true,
            Some(last_notified) => {
                today.signed_duration_since(last_notified).num_days() >= SUPPRESSION_DAYS
            }
        };
        Ok(eligible)
    }

    fn render(&self, item: &SteamSaleHit) -> Notification {
        Notification::new(format!(
            "{} is on sale for {}! (-{}%)",
            item.title, item.price, item.discount_percent
        ))
        .with_image(item.banner_url.clone())
        .with_action(Some(item.store_url.clone()))
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// `appdetails` answers with an object keyed by the requested app id.
type AppDetailsResponse = HashMap<String, AppDetailsEntry>;

#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    success: bool,
    #[serde(default)]
    data: Option<AppData>,
}

#[derive(Debug, Deserialize)]
struct AppData {
    name: String,
    #[serde(default)]
    header_image: Option<String>,
    #[serde(default)]
    price_overview: Option<PriceOverview>,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    discount_percent: u32,
    final_formatted: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StubClient;
    use chrono::Duration;
    use serde_json::{json, Value};

    /// `appdetails` body for an app with the given discount.
    fn app_details(appid: u32, name: &str, discount_percent: u32, price: &str) -> Value {
        json!({
            appid.to_string(): {
                "success": true,
                "data": {
                    "type": "game",
                    "name": name,
                    "steam_appid": appid,
                    "header_image": format!("https://cdn.example/{appid}/header.jpg"),
                    "price_overview": {
                        "currency": "EUR",
                        "initial": 1999,
                        "final": 1599,
                        "discount_percent": discount_percent,
                        "initial_formatted": "19,99€",
                        "final_formatted": price
                    }
                }
            }
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn source_with(client: StubClient, watch_list: Vec<u32>) -> SteamSource {
        SteamSource::new(Arc::new(client), watch_list, "de")
    }

    #[test]
    fn discounted_app_is_a_hit() {
        let client = StubClient::default().with(
            "https://store.steampowered.com/api/appdetails?appids=100&cc=de",
            app_details(100, "Hundred", 20, "15,99€"),
        );

        let hits = source_with(client, vec![100]).fetch().unwrap();
        assert_eq!(
            hits,
            vec![SteamSaleHit {
                appid: 100,
                title: "Hundred".into(),
                discount_percent: 20,
                price: "15,99€".into(),
                banner_url: Some("https://cdn.example/100/header.jpg".into()),
                store_url: "https://store.steampowered.com/app/100".into(),
            }]
        );
    }

    #[test]
    fn zero_discount_is_not_a_hit() {
        let client = StubClient::default().with(
            "https://store.steampowered.com/api/appdetails?appids=200&cc=de",
            app_details(200, "Two Hundred", 0, "19,99€"),
        );
        assert!(source_with(client, vec![200]).fetch().unwrap().is_empty());
    }

    #[test]
    fn unknown_and_free_apps_are_not_hits() {
        let client = StubClient::default()
            .with(
                "https://store.steampowered.com/api/appdetails?appids=1&cc=de",
                json!({ "1": { "success": false } }),
            )
            .with(
                "https://store.steampowered.com/api/appdetails?appids=2&cc=de",
                json!({ "2": { "success": true, "data": { "name": "Free Thing", "is_free": true } } }),
            );
        assert!(source_with(client, vec![1, 2]).fetch().unwrap().is_empty());
    }

    #[test]
    fn failed_lookup_keeps_other_hits() {
        let client = StubClient::default().with(
            "https://store.steampowered.com/api/appdetails?appids=100&cc=de",
            app_details(100, "Hundred", 50, "9,99€"),
        );

        let hits = source_with(client, vec![100, 999]).fetch().unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].appid, 100);
        assert_eq!(hits[0].discount_percent, 50);
    }

    #[test]
    fn every_lookup_failing_fails_the_fetch() {
        let source = source_with(StubClient::default(), vec![100, 300]);
        assert!(source.fetch().is_err());
    }

    #[test]
    fn empty_watch_list_fetches_nothing() {
        let source = source_with(StubClient::default(), vec![]);
        assert!(source.fetch().unwrap().is_empty());
    }

    #[test]
    fn never_notified_is_eligible() {
        let store = NotificationStore::open_in_memory().unwrap();
        let source = source_with(StubClient::default(), vec![]);
        assert!(source.eligible(&store, "100", today()).unwrap());
    }

    #[test]
    fn suppressed_for_seven_days() {
        let store = NotificationStore::open_in_memory().unwrap();
        let source = source_with(StubClient::default(), vec![]);

        store.set("steam", "6", today() - Duration::days(6)).unwrap();
        store.set("steam", "7", today() - Duration::days(7)).unwrap();
        store.set("steam", "0", today()).unwrap();
        store.set("steam", "30", today() - Duration::days(30)).unwrap();

        assert!(!source.eligible(&store, "6", today()).unwrap());
        assert!(source.eligible(&store, "7", today()).unwrap());
        assert!(!source.eligible(&store, "0", today()).unwrap());
        assert!(source.eligible(&store, "30", today()).unwrap());
    }

    #[test]
    fn future_record_is_not_eligible() {
        let store = NotificationStore::open_in_memory().unwrap();
        let source = source_with(StubClient::default(), vec![]);
        store.set("steam", "100", today() + Duration::days(2)).unwrap();
        assert!(!source.eligible(&store, "100", today()).unwrap());
    }

    #[test]
    fn render_formats_price_and_discount() {
        let source = source_with(StubClient::default(), vec![]);
        let hit = SteamSaleHit {
            appid: 100,
            title: "Hundred".into(),
            discount_percent: 20,
            price: "15,99€".into(),
            banner_url: Some("https://cdn.example/100/header.jpg".into()),
            store_url: "https://store.steampowered.com/app/100".into(),
        };

        let notification = source.render(&hit);
        assert_eq!(notification.message, "Hundred is on sale for 15,99€! (-20%)");
        assert_eq!(notification.image_url.as_deref(), Some("https://cdn.example/100/header.jpg"));
        assert_eq!(notification.action_url.as_deref(), Some("https://store.steampowered.com/app/100"));
        assert_eq!(source.key(&hit), "100");
    }
}
