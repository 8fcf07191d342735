//! DynamoDB adapter implementing the `ProfileRepository` port.
//!
//! - Stores profiles in a single table with string partition key `id` and a
//!   string attribute `email`.
//! - `find_all` and `delete_all` walk every scan page (`LastEvaluatedKey`).
//! - `save` is an unconditional `PutItem`, i.e. a full document replace.

use std::collections::HashMap;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::{types::AttributeValue, Client};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use domain::{CoreError, Profile, ProfileId, ProfileRepository};

type Item = HashMap<String, AttributeValue>;

/// Repository backed by AWS DynamoDB.
#[derive(Clone, Debug)]
pub struct DynamoProfileRepo {
    table: String,
    client: Client,
}

impl DynamoProfileRepo {
    /// Create a new repo from an explicit table name and an AWS SDK client.
    pub fn with_client(table: impl Into<String>, client: Client) -> Self {
        Self {
            table: table.into(),
            client,
        }
    }

    /// Construct with a table name and a default AWS SDK client using env/IMDS.
    pub async fn new(table: impl Into<String>) -> Self {
        let conf = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::with_client(table, Client::new(&conf))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Scan the whole table, following pagination.
    async fn scan_all(&self, projection: Option<&str>) -> Result<Vec<Item>, CoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let out = self
                .client
                .scan()
                .table_name(&self.table)
                .set_projection_expression(projection.map(str::to_string))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(map_sdk_err)?;
            items.extend(out.items().iter().cloned());
            match out.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }
}

fn map_sdk_err<E, R>(e: SdkError<E, R>) -> CoreError
where
    E: ProvideErrorMetadata,
{
    match &e {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            return CoreError::StoreUnavailable(format!("dynamo unreachable: {e}"));
        }
        _ => {}
    }
    if e.code() == Some("ResourceNotFoundException") {
        return CoreError::StoreUnavailable("missing table".into());
    }
    match e.message() {
        Some(msg) => CoreError::Repository(format!("dynamo error: {e}: {msg}")),
        None => CoreError::Repository(format!("dynamo error: {e}")),
    }
}

fn id_key(id: &ProfileId) -> AttributeValue {
    AttributeValue::S(id.as_str().to_string())
}

fn new_id() -> ProfileId {
    ProfileId::new(uuid::Uuid::new_v4().to_string()).expect("uuid strings are non-empty")
}

fn domain_to_item(id: &ProfileId, profile: &Profile) -> Item {
    let mut m = HashMap::new();
    m.insert("id".into(), id_key(id));
    m.insert("email".into(), AttributeValue::S(profile.email.clone()));
    m
}

fn item_to_domain(item: &Item) -> Result<Profile, CoreError> {
    let id = item
        .get("id")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| CoreError::Repository("item missing id".into()))?;
    let email = item
        .get("email")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| CoreError::Repository("item missing email".into()))?;
    let id = ProfileId::new(id.to_string())
        .map_err(|e| CoreError::Repository(format!("bad id in item: {e}")))?;
    Ok(Profile::with_id(id, email.to_string()))
}

impl ProfileRepository for DynamoProfileRepo {
    async fn find_all(&self) -> Result<Vec<Profile>, CoreError> {
        self.scan_all(None)
            .await?
            .iter()
            .map(item_to_domain)
            .collect()
    }

    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, CoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("id", id_key(id))
            .consistent_read(true)
            .send()
            .await
            .map_err(map_sdk_err)?;
        out.item().map(item_to_domain).transpose()
    }

    async fn save(&self, profile: Profile) -> Result<Profile, CoreError> {
        let id = profile.id.clone().unwrap_or_else(new_id);
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(domain_to_item(&id, &profile)))
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(Profile::with_id(id, profile.email))
    }

    async fn delete_by_id(&self, id: &ProfileId) -> Result<(), CoreError> {
        // DeleteItem on a missing key succeeds
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("id", id_key(id))
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        for item in self.scan_all(Some("id")).await? {
            let Some(key) = item.get("id").cloned() else {
                continue;
            };
            self.client
                .delete_item()
                .table_name(&self.table)
                .key("id", key)
                .send()
                .await
                .map_err(map_sdk_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_mapping_uses_id_and_email_attributes() {
        let id = ProfileId::new("abc123").unwrap();
        let profile = Profile::new("user@acme.com");
        let item = domain_to_item(&id, &profile);
        assert_eq!(item.get("id"), Some(&AttributeValue::S("abc123".into())));
        assert_eq!(item.get("email"), Some(&AttributeValue::S("user@acme.com".into())));

        let back = item_to_domain(&item).unwrap();
        assert_eq!(back, Profile::with_id(id, "user@acme.com"));
    }

    #[test]
    fn item_missing_email_is_repository_error() {
        let mut item = HashMap::new();
        item.insert("id".into(), AttributeValue::S("abc".into()));
        let err = item_to_domain(&item).unwrap_err();
        assert!(matches!(err, CoreError::Repository(_)));
    }

    #[test]
    fn item_with_non_string_id_is_rejected() {
        let mut item = HashMap::new();
        item.insert("id".into(), AttributeValue::N("42".into()));
        item.insert("email".into(), AttributeValue::S("a@x.com".into()));
        assert!(item_to_domain(&item).is_err());
    }

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
