//! PostgREST client (the REST layer Supabase puts in front of Postgres).

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{Filter, Operation, Query, Row, Store, StoreError, StoreResult};

#[derive(Clone)]
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        info!("Initializing store client for {}", base_url);
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

/// Encodes a query's filters and ordering as PostgREST query parameters.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![];
    if matches!(query.operation, Operation::Select) {
        params.push(("select".to_string(), "*".to_string()));
    }
    for filter in &query.filters {
        let value = match filter {
            Filter::Eq(_, v) => format!("eq.{}", literal(v)),
            Filter::ILike(_, pattern) => format!("ilike.{}", pattern),
        };
        params.push((filter.column().to_string(), value));
    }
    if let Some(ref order) = query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Store for PostgrestClient {
    async fn execute(&self, query: Query) -> StoreResult<Vec<Row>> {
        let url = self.table_url(&query.table);
        let params = query_params(&query);

        let (method, body) = match query.operation {
            Operation::Select => (Method::GET, None),
            Operation::Insert(row) => (Method::POST, Some(row)),
            Operation::Update(changes) => (Method::PATCH, Some(changes)),
            Operation::Delete => (Method::DELETE, None),
        };

        debug!("Store: {} {} {:?}", method, url, params);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .query(&params)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if method != Method::GET {
            request = request.header("Prefer", "return=representation");
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            error!("Store request to {} failed: {}", url, e);
            StoreError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Store responded with {} for {} {}: {}", status, method, url, body);
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows = response.json::<Vec<Row>>().await?;
        debug!("Store: {} row(s) returned", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pairs(q: &Query) -> Vec<(String, String)> {
        query_params(q)
    }

    #[test]
    fn select_params() {
        let q = Query::select("organizations")
            .eq("user_id", "U1")
            .ilike("name", "%acme%")
            .order("created_at", true);
        assert_eq!(
            pairs(&q),
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.U1".to_string()),
                ("name".to_string(), "ilike.%acme%".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn mutation_params_skip_select() {
        let q = Query::delete("organizations").eq("id", 7).eq("user_id", "U1");
        assert_eq!(
            pairs(&q),
            vec![
                ("id".to_string(), "eq.7".to_string()),
                ("user_id".to_string(), "eq.U1".to_string()),
            ]
        );
    }

    #[test]
    fn bool_literal_is_unquoted() {
        let q = Query::select("t").eq("b", json!(false));
        assert_eq!(pairs(&q)[1].1, "eq.false");
    }
}
