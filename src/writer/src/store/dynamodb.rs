use std::collections::{HashMap, HashSet};
use std::future::Future;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, PutRequest, WriteRequest};
use common::config::PersistenceConfig;
use common::model::{Role, StoredPair};
use common::{Error, Result};

use super::{PairStore, WriteOp};

/// Partition key attribute: the need id
pub const PARTITION_KEY: &str = "buying_needs_id";
/// Sort key attribute: `{deal_id}_{role suffix}`
pub const SORT_KEY: &str = "search_sort_key";
pub const DEAL_ID: &str = "deal_id";

type Item = HashMap<String, AttributeValue>;

/// Pair store backed by a DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoDbPairStore {
    client: Client,
    table_name: String,
}

impl DynamoDbPairStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build a client from the default credential chain, using the configured
    /// region and optional endpoint override.
    pub async fn from_config(config: &PersistenceConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        log::info!(
            "Using DynamoDB table {} in {}",
            config.table_name,
            config.region
        );
        Self::new(Client::new(&shared_config), config.table_name.clone())
    }

    async fn query_page(&self, need_id: &str, start_key: Option<Item>) -> Result<Page> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#pk = :need_id")
            .expression_attribute_names("#pk", PARTITION_KEY)
            .expression_attribute_values(":need_id", AttributeValue::S(need_id.to_string()))
            .set_exclusive_start_key(start_key)
            .send()
            .await
            .map_err(|e| {
                Error::store_unavailable(format!(
                    "Query for need {need_id} failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(Page {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
        })
    }

    fn write_request(op: WriteOp, pair: &StoredPair) -> Result<WriteRequest> {
        let request = match op {
            WriteOp::Put => {
                let mut item = key_of(pair);
                item.insert(DEAL_ID.to_string(), AttributeValue::S(pair.deal_id.clone()));
                let put = PutRequest::builder()
                    .set_item(Some(item))
                    .build()
                    .map_err(|e| Error::unknown("Invalid put request").with_source(e))?;
                WriteRequest::builder().put_request(put).build()
            }
            WriteOp::Delete => {
                let delete = DeleteRequest::builder()
                    .set_key(Some(key_of(pair)))
                    .build()
                    .map_err(|e| Error::unknown("Invalid delete request").with_source(e))?;
                WriteRequest::builder().delete_request(delete).build()
            }
        };

        Ok(request)
    }
}

fn key_of(pair: &StoredPair) -> Item {
    HashMap::from([
        (
            PARTITION_KEY.to_string(),
            AttributeValue::S(pair.need_id.clone()),
        ),
        (SORT_KEY.to_string(), AttributeValue::S(pair.sort_key.clone())),
    ])
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::as_str)
}

fn pair_from_item(item: &Item) -> Result<StoredPair> {
    let (Some(need_id), Some(sort_key)) = (string_attr(item, PARTITION_KEY), string_attr(item, SORT_KEY))
    else {
        return Err(Error::unknown(format!(
            "Stored pair is missing {PARTITION_KEY} or {SORT_KEY}"
        )));
    };

    let deal_id = match string_attr(item, DEAL_ID) {
        Some(deal_id) if !deal_id.is_empty() => deal_id,
        _ => deal_id_from_sort_key(sort_key),
    };

    Ok(StoredPair {
        need_id: need_id.to_string(),
        sort_key: sort_key.to_string(),
        deal_id: deal_id.to_string(),
    })
}

/// `{deal_id}_{role suffix}` without the role suffix
fn deal_id_from_sort_key(sort_key: &str) -> &str {
    Role::ALL
        .into_iter()
        .find_map(|role| {
            sort_key
                .strip_suffix(role.sort_suffix())
                .and_then(|rest| rest.strip_suffix('_'))
        })
        .unwrap_or(sort_key)
}

/// One page of query results
#[derive(Debug, Default)]
struct Page {
    items: Vec<Item>,
    last_evaluated_key: Option<Item>,
}

/// Fetch pages until one comes back without a continuation key.
///
/// `fetch` is called with the previous page's last evaluated key.
async fn collect_pages<F, Fut>(mut fetch: F) -> Result<Vec<Item>>
where
    F: FnMut(Option<Item>) -> Fut,
    Fut: Future<Output = Result<Page>>,
{
    let mut items = Vec::new();
    let mut start_key = None;

    loop {
        let page = fetch(start_key.take()).await?;
        items.extend(page.items);

        match page.last_evaluated_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => break,
        }
    }

    Ok(items)
}

/// Key of an unprocessed request as (need id, sort key)
fn request_key(request: &WriteRequest) -> Option<(String, String)> {
    let item = request
        .put_request()
        .map(PutRequest::item)
        .or_else(|| request.delete_request().map(DeleteRequest::key))?;

    Some((
        string_attr(item, PARTITION_KEY)?.to_string(),
        string_attr(item, SORT_KEY)?.to_string(),
    ))
}

#[async_trait]
impl PairStore for DynamoDbPairStore {
    async fn query(&self, need_id: &str) -> Result<Vec<StoredPair>> {
        let items = collect_pages(|start_key| self.query_page(need_id, start_key)).await?;
        let pairs = items.iter().map(pair_from_item).collect::<Result<Vec<_>>>()?;

        log::debug!("Need {need_id} has {} stored pairs", pairs.len());
        Ok(pairs)
    }

    async fn batch_write(&self, op: WriteOp, items: &[StoredPair]) -> Result<Vec<StoredPair>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let requests = items
            .iter()
            .map(|pair| Self::write_request(op, pair))
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(|e| {
                Error::store_unavailable(format!(
                    "Batch {op:?} of {} items failed: {}",
                    items.len(),
                    DisplayErrorContext(&e)
                ))
            })?;

        let unprocessed: HashSet<(String, String)> = output
            .unprocessed_items
            .and_then(|mut tables| tables.remove(&self.table_name))
            .unwrap_or_default()
            .iter()
            .filter_map(request_key)
            .collect();

        Ok(items
            .iter()
            .filter(|pair| unprocessed.contains(&(pair.need_id.clone(), pair.sort_key.clone())))
            .cloned()
            .collect())
    }
}
