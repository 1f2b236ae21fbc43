//! DynamoDB implementation of [`ItemStore`].

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ReturnConsumedCapacity, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, instrument};

use super::convert::{attributes_to_item, item_to_attributes};
use super::{ItemStore, TableDefinition, TableStatus, WriteAck};
use crate::config::Config;
use crate::error::StoreError;
use crate::item::{Item, PRIMARY_KEY};
use crate::metrics::{self, LatencyTimer};

/// DynamoDB client wrapper.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Wrap an existing SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the SDK default chain plus the configured
    /// region and endpoint overrides.
    pub async fn from_config(config: &Config) -> Self {
        debug!(
            region = ?config.aws_region,
            endpoint = ?config.aws_endpoint_url,
            "Creating DynamoDB client"
        );

        let region_provider = RegionProviderChain::first_try(config.aws_region.clone().map(Region::new))
            .or_default_provider();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Some(endpoint) = &config.aws_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

/// Map an SDK failure to [`StoreError::Service`], keeping the store's code and message.
fn service_error<E>(operation: &'static str, err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    metrics::inc_store_errors(operation);
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    StoreError::Service {
        operation,
        code,
        message,
    }
}

fn build_error(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Conversion(format!("building {}: {}", what, err))
}

#[async_trait]
impl ItemStore for DynamoStore {
    #[instrument(skip(self))]
    async fn describe_table(&self, table: &str) -> Result<Option<TableStatus>, StoreError> {
        let _timer = LatencyTimer::store("DescribeTable");

        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => {
                let status = output
                    .table()
                    .and_then(|t| t.table_status())
                    .map(|s| {
                        TableStatus::from_str(s.as_str())
                            .unwrap_or_else(|_| TableStatus::Other(s.as_str().to_string()))
                    })
                    .unwrap_or(TableStatus::Creating);
                debug!(%status, "Table described");
                Ok(Some(status))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(service_error("DescribeTable", err)),
        }
    }

    #[instrument(skip(self, definition), fields(table = %definition.name))]
    async fn create_table(&self, definition: &TableDefinition) -> Result<(), StoreError> {
        let _timer = LatencyTimer::store("CreateTable");

        let key_schema = KeySchemaElement::builder()
            .attribute_name(PRIMARY_KEY)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| build_error("key schema", e))?;
        let attribute = AttributeDefinition::builder()
            .attribute_name(PRIMARY_KEY)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| build_error("attribute definition", e))?;
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(definition.read_capacity)
            .write_capacity_units(definition.write_capacity)
            .build()
            .map_err(|e| build_error("provisioned throughput", e))?;

        let result = self
            .client
            .create_table()
            .table_name(&definition.name)
            .key_schema(key_schema)
            .attribute_definitions(attribute)
            .provisioned_throughput(throughput)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_in_use_exception()) =>
            {
                Err(StoreError::TableAlreadyExists {
                    table: definition.name.clone(),
                })
            }
            Err(err) => Err(service_error("CreateTable", err)),
        }
    }

    #[instrument(skip(self, item), fields(id = %item.id()))]
    async fn put_item(&self, table: &str, item: &Item) -> Result<WriteAck, StoreError> {
        let _timer = LatencyTimer::store("PutItem");

        let output = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item_to_attributes(item)))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await
            .map_err(|e| service_error("PutItem", e))?;

        Ok(WriteAck {
            request_id: output.request_id().map(str::to_string),
            consumed_capacity_units: output.consumed_capacity().and_then(|c| c.capacity_units()),
        })
    }

    #[instrument(skip(self))]
    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        let _timer = LatencyTimer::store("Scan");

        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        let mut pages = 0u32;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| service_error("Scan", e))?;
            pages += 1;

            for attributes in output.items() {
                items.push(attributes_to_item(attributes)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!(pages, count = items.len(), "Scan complete");
        Ok(items)
    }
}
