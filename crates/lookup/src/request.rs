//! Maps an eligible indicator onto a fully specified upstream request.

use serde::Serialize;
use serde_json::{Map, Value};

use voidcheck_core::{ApiConfig, AuthScheme, Indicator, IndicatorKind};

use crate::schema::SchemaDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Where the identifying `ip` / `host` parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamPlacement {
    Query,
    JsonBody,
}

/// An outbound lookup, one per eligible indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupRequest {
    pub indicator: Indicator,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Builds [`LookupRequest`]s from resolved API settings.
///
/// Holds no connection state; the same builder is shared by every batch.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    api_key: String,
    auth: AuthScheme,
    schema: &'static SchemaDescriptor,
}

impl RequestBuilder {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            base_url: api.url.trim_end_matches('/').to_string(),
            api_key: api.api_key.clone().unwrap_or_default(),
            auth: api.auth.clone(),
            schema: SchemaDescriptor::for_requests(api.schema),
        }
    }

    /// Build the request for `indicator`, or `None` for kinds with no endpoint.
    pub fn build(&self, indicator: &Indicator) -> Option<LookupRequest> {
        let (endpoint, param) = match indicator.kind {
            IndicatorKind::Ipv4 => (self.schema.ip_endpoint, "ip"),
            IndicatorKind::Domain => (self.schema.domain_endpoint, "host"),
            IndicatorKind::Other => return None,
        };

        let mut headers = Vec::new();
        let mut query = Vec::new();

        match &self.auth {
            AuthScheme::Header(name) => headers.push((name.clone(), self.api_key.clone())),
            AuthScheme::Query(name) => query.push((name.clone(), self.api_key.clone())),
        }

        let body = match self.schema.placement {
            ParamPlacement::Query => {
                query.push((param.to_string(), indicator.value.clone()));
                None
            }
            ParamPlacement::JsonBody => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                let mut fields = Map::new();
                fields.insert(param.to_string(), Value::String(indicator.value.clone()));
                Some(Value::Object(fields))
            }
        };

        let request = LookupRequest {
            indicator: indicator.clone(),
            method: self.schema.method,
            url: format!("{}{}", self.base_url, endpoint),
            headers,
            query,
            body,
        };

        tracing::trace!(
            indicator = %indicator.value,
            method = ?request.method,
            url = %request.url,
            "request built"
        );

        Some(request)
    }
}
