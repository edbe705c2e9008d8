use crate::{
    errors::ServiceError,
    models::catalog::{Catalog, StoreSettings},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Result of a two-phase "attempt load, else defaults" step.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    Loaded(T),
    /// Loading failed; `value` holds the defaults and `reason` the failure.
    Defaulted { value: T, reason: ServiceError },
}

impl<T> LoadOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            LoadOutcome::Loaded(value) => value,
            LoadOutcome::Defaulted { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            LoadOutcome::Loaded(value) => value,
            LoadOutcome::Defaulted { value, .. } => value,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, LoadOutcome::Defaulted { .. })
    }

    pub fn reason(&self) -> Option<&ServiceError> {
        match self {
            LoadOutcome::Loaded(_) => None,
            LoadOutcome::Defaulted { reason, .. } => Some(reason),
        }
    }
}

/// Loads the menu catalog and the store settings once per session, from a
/// local path or an `http(s)` URL.
#[derive(Clone)]
pub struct CatalogService {
    client: reqwest::Client,
}

impl CatalogService {
    pub fn new(timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::CatalogLoad(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Loads the catalog, falling back to an empty catalog.
    #[instrument(skip(self))]
    pub async fn load_catalog(&self, source: Option<&str>) -> LoadOutcome<Catalog> {
        let loaded = match source {
            Some(source) => match self.fetch(source).await {
                Ok(raw) => parse_catalog(&raw),
                Err(e) => Err(ServiceError::CatalogLoad(e)),
            },
            None => Err(ServiceError::CatalogLoad(
                "no catalog source configured".to_string(),
            )),
        };

        match loaded {
            Ok(catalog) => {
                info!(
                    families = catalog.available_families().len(),
                    currency = %catalog.currency,
                    "Menu catalog loaded"
                );
                LoadOutcome::Loaded(catalog)
            }
            Err(reason) => {
                warn!(error = %reason, "Using empty menu catalog");
                LoadOutcome::Defaulted {
                    value: Catalog::default(),
                    reason,
                }
            }
        }
    }

    /// Loads the store settings, falling back to the built-in defaults.
    #[instrument(skip(self))]
    pub async fn load_settings(&self, source: Option<&str>) -> LoadOutcome<StoreSettings> {
        let loaded = match source {
            Some(source) => match self.fetch(source).await {
                Ok(raw) => parse_settings(&raw),
                Err(e) => Err(ServiceError::ConfigLoad(e)),
            },
            None => Err(ServiceError::ConfigLoad(
                "no settings source configured".to_string(),
            )),
        };

        match loaded {
            Ok(settings) => {
                info!(
                    tax_rate = %settings.tax_rate,
                    online_payment = settings.has_online_payment(),
                    "Store settings loaded"
                );
                LoadOutcome::Loaded(settings)
            }
            Err(reason) => {
                warn!(error = %reason, "Using default store settings");
                LoadOutcome::Defaulted {
                    value: StoreSettings::default(),
                    reason,
                }
            }
        }
    }

    async fn fetch(&self, source: &str) -> Result<String, String> {
        if is_url(source) {
            debug!(url = source, "Fetching document");
            let response = self
                .client
                .get(source)
                .header("Cache-Control", "no-cache")
                .send()
                .await
                .map_err(|e| format!("{}: {}", source, e))?;
            if !response.status().is_success() {
                return Err(format!("{}: HTTP {}", source, response.status()));
            }
            response
                .text()
                .await
                .map_err(|e| format!("{}: {}", source, e))
        } else {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| format!("{}: {}", source, e))
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Parses a catalog document. Only a document that is not a JSON object
/// fails as a whole; a family section that does not parse is dropped so the
/// other families stay orderable.
pub fn parse_catalog(raw: &str) -> Result<Catalog, ServiceError> {
    let doc: Value =
        serde_json::from_str(raw).map_err(|e| ServiceError::CatalogLoad(e.to_string()))?;
    let doc = doc
        .as_object()
        .ok_or_else(|| ServiceError::CatalogLoad("catalog must be a JSON object".to_string()))?;

    let defaults = Catalog::default();
    Ok(Catalog {
        currency: doc
            .get("currency")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.currency),
        pizza: section(doc, "pizza"),
        double_deal: section(doc, "doubleDeal"),
        specials: section(doc, "specials"),
        subs: section(doc, "subs"),
        wings: section(doc, "wings"),
        nuggets: section(doc, "nuggets"),
        salads: section(doc, "salads"),
        sides: section(doc, "sides"),
        drinks: section(doc, "drinks"),
    })
}

fn section<T: DeserializeOwned>(doc: &Map<String, Value>, key: &str) -> Option<T> {
    let value = doc.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(section = key, error = %e, "Dropping unreadable menu section");
            None
        }
    }
}

/// Parses and validates a store settings document.
pub fn parse_settings(raw: &str) -> Result<StoreSettings, ServiceError> {
    let settings: StoreSettings =
        serde_json::from_str(raw).map_err(|e| ServiceError::ConfigLoad(e.to_string()))?;
    settings
        .validate()
        .map_err(|e| ServiceError::ConfigLoad(e.to_string()))?;
    Ok(settings)
}
