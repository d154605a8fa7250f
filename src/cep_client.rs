use crate::cache_validator::ValidatedCacheEntry;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::CepAddress;
use crate::validators::{digits_only, CEP_LEN};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Resolves a CEP into an address.
///
/// `Ok(None)` means the service answered but does not know the code.
#[allow(async_fn_in_trait)]
pub trait PostalCodeLookup {
    async fn lookup(&self, cep: &str) -> Result<Option<CepAddress>, AppError>;
}

/// Raw ViaCEP payload. Unknown codes come back as `{"erro": true}`
/// (older deployments send `"true"` as a string).
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    complemento: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn into_address(self) -> CepAddress {
        CepAddress {
            street: self.logradouro,
            complement: Some(self.complemento).filter(|c| !c.trim().is_empty()),
            neighborhood: self.bairro,
            city: self.localidade,
            region: self.uf,
        }
    }
}

/// Client for the ViaCEP address service.
///
/// Found addresses are cached per CEP with an integrity checksum, so repeated
/// blurs on the same code do not hit the network.
#[derive(Clone)]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, String>,
}

impl ViaCepClient {
    /// Creates a new `ViaCepClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Scheme and host of the service (`https://viacep.com.br`).
    /// * `timeout` - Per-request timeout.
    /// * `cache_ttl` - How long a found address is reused.
    pub fn new(base_url: String, timeout: Duration, cache_ttl: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create ViaCEP client: {}", e))
            })?;

        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(10_000)
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.viacep_base_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
            Duration::from_secs(config.cep_cache_ttl_secs),
        )
    }

    fn cache_key(cep: &str) -> String {
        format!("cep:{}", cep)
    }

    async fn cached(&self, cep: &str) -> Option<CepAddress> {
        let key = Self::cache_key(cep);
        let serialized = self.cache.get(&key).await?;

        let address = ValidatedCacheEntry::deserialize_and_validate(&serialized)
            .and_then(|data| serde_json::from_str::<CepAddress>(&data).ok());

        if address.is_none() {
            tracing::warn!("Discarding corrupt cache entry for CEP {}", cep);
            self.cache.invalidate(&key).await;
        }

        address
    }

    async fn fetch(&self, cep: &str) -> Result<Option<CepAddress>, AppError> {
        let url = format!("{}/ws/{}/json/", self.base_url, cep);
        tracing::info!("Fetching address for CEP {}: {}", cep, url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!("ViaCEP request failed for {}: {}", cep, e);
            AppError::from(e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("ViaCEP returned {} for {}: {}", status, cep, error_text);
            return Err(AppError::ExternalApiError(format!(
                "ViaCEP returned {}: {}",
                status, error_text
            )));
        }

        let data: ViaCepResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse ViaCEP response: {}", e))
        })?;

        if data.is_not_found() {
            tracing::warn!("CEP {} not found", cep);
            return Ok(None);
        }

        Ok(Some(data.into_address()))
    }
}

impl PostalCodeLookup for ViaCepClient {
    async fn lookup(&self, cep: &str) -> Result<Option<CepAddress>, AppError> {
        let cep = digits_only(cep);
        if cep.len() != CEP_LEN {
            return Err(AppError::BadRequest(format!(
                "CEP must have {} digits, got {}",
                CEP_LEN,
                cep.len()
            )));
        }

        if let Some(address) = self.cached(&cep).await {
            tracing::debug!("CEP {} served from cache", cep);
            return Ok(Some(address));
        }

        let address = self.fetch(&cep).await?;

        if let Some(ref found) = address {
            match serde_json::to_string(found) {
                Ok(data) => {
                    let entry = ValidatedCacheEntry::new(data);
                    self.cache
                        .insert(Self::cache_key(&cep), entry.serialize())
                        .await;
                }
                Err(e) => tracing::warn!("Could not cache address for CEP {}: {}", cep, e),
            }
        }

        Ok(address)
    }
}
