//! Zotero Web API v3 client

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Folder, FolderKey, Item, ReferenceStore, RetryPolicy};
use crate::config::ZoteroConfig;
use crate::error::{Result, ZotsortError};
use crate::map_response_err;


const SERVICE: &str = "zotero";
const API_VERSION: &str = "3";

/// Blocking client for one Zotero library
pub struct ZoteroClient {
    agent: ureq::Agent,
    library_url: String,
    api_key: String,
    page_size: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ApiCollection {
    key: String,
    data: ApiCollectionData,
}

#[derive(Debug, Deserialize)]
struct ApiCollectionData {
    name: String,
    /// Either `false` or the parent's key
    #[serde(rename = "parentCollection", default)]
    parent_collection: Value,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    key: String,
    #[serde(default)]
    version: u64,
    data: ApiItemData,
}

#[derive(Debug, Deserialize)]
struct ApiItemData {
    #[serde(rename = "itemType", default)]
    item_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: Vec<ApiTag>,
    #[serde(default)]
    collections: Vec<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(rename = "parentItem", default)]
    parent_item: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    tag: String,
    /// 0 manual, 1 automatic
    #[serde(rename = "type", default)]
    kind: u32,
}

impl From<ApiCollection> for Folder {
    fn from(api: ApiCollection) -> Self {
        let parent = match api.data.parent_collection {
            Value::String(key) if !key.is_empty() => Some(FolderKey::new(key)),
            _ => None,
        };
        Folder {
            key: FolderKey::new(api.key),
            name: api.data.name,
            parent,
        }
    }
}

impl From<ApiItem> for Item {
    fn from(api: ApiItem) -> Self {
        let tag_types = api
            .data
            .tags
            .iter()
            .filter(|t| t.kind != 0)
            .map(|t| (t.tag.clone(), t.kind))
            .collect();
        Item {
            key: api.key,
            version: api.version,
            item_type: api.data.item_type,
            title: api.data.title,
            tags: api.data.tags.into_iter().map(|t| t.tag).collect(),
            tag_types,
            collections: api.data.collections,
            note: api.data.note,
            parent_item: api.data.parent_item,
        }
    }
}

/// Key of the first created object in a multi-object write response
fn created_key(response: &Value) -> Result<FolderKey> {
    if let Some(key) = response
        .pointer("/successful/0/key")
        .or_else(|| response.pointer("/success/0"))
        .and_then(Value::as_str)
    {
        return Ok(FolderKey::new(key));
    }

    let reason = response
        .pointer("/failed/0/message")
        .and_then(Value::as_str)
        .unwrap_or("no created object in response");
    Err(map_response_err!(SERVICE, reason))
}

/// Zotero-Write-Token for one logical create: 32 hex characters, reused
/// across retries so the server drops a duplicate submission
fn write_token() -> String {
    format!("{:032x}", u128::from(ulid::Ulid::new()))
}

/// PATCH body replacing an item's tags; kept tags keep their type
fn tags_body(item: &Item, tags: &[String]) -> Value {
    let tags: Vec<Value> = tags
        .iter()
        .map(|tag| match item.tag_type(tag) {
            0 => json!({ "tag": tag }),
            kind => json!({ "tag": tag, "type": kind }),
        })
        .collect();
    json!({ "tags": tags })
}

fn map_ureq_error(err: ureq::Error) -> ZotsortError {
    match err {
        ureq::Error::Status(status, response) => {
            let retry_after = response
                .header("Retry-After")
                .or_else(|| response.header("Backoff"))
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.into_string().unwrap_or_default();
            ZotsortError::remote_status(SERVICE, status, body).with_retry_after(retry_after)
        }
        ureq::Error::Transport(transport) => ZotsortError::remote_transport(SERVICE, transport),
    }
}

impl ZoteroClient {
    pub fn new(config: &ZoteroConfig, retry: RetryPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build();
        let library_url = format!(
            "{}/{}/{}",
            config.base_url.trim_end_matches('/'),
            config.library_type.path_segment(),
            config.library_id
        );
        Self {
            agent,
            library_url,
            api_key: config.api_key.clone(),
            page_size: config.page_size.clamp(1, 100),
            retry,
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{}", self.library_url, path))
            .set("Zotero-API-Key", &self.api_key)
            .set("Zotero-API-Version", API_VERSION)
    }

    /// GET every page of a listing endpoint
    fn fetch_all<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut start = 0usize;

        loop {
            let (page, total) = self.retry.run(path, |_| {
                let mut request = self
                    .request("GET", path)
                    .query("start", &start.to_string())
                    .query("limit", &self.page_size.to_string());
                for (name, value) in params {
                    request = request.query(name, value);
                }

                let response = request.call().map_err(map_ureq_error)?;
                let total: Option<usize> = response
                    .header("Total-Results")
                    .and_then(|v| v.trim().parse().ok());
                let page: Vec<T> = response
                    .into_json()
                    .map_err(|e| map_response_err!(SERVICE, e))?;
                Ok((page, total))
            })?;

            let count = page.len();
            results.extend(page);
            start += count;
            debug!(path, start, total = ?total, "fetched page");

            let exhausted = total.is_some_and(|total| start >= total);
            if count == 0 || count < self.page_size || exhausted {
                break;
            }
        }

        Ok(results)
    }

    /// PATCH one item, returning the new library version if reported
    fn patch_item(&self, item: &Item, body: Value) -> Result<Option<u64>> {
        let path = format!("/items/{}", item.key);
        self.retry.run("patch item", |_| {
            let response = self
                .request("PATCH", &path)
                .set("If-Unmodified-Since-Version", &item.version.to_string())
                .send_json(body.clone())
                .map_err(map_ureq_error)?;
            Ok(response
                .header("Last-Modified-Version")
                .and_then(|v| v.trim().parse().ok()))
        })
    }
}

impl ReferenceStore for ZoteroClient {
    fn list_folders(&self) -> Result<Vec<Folder>> {
        let collections: Vec<ApiCollection> = self.fetch_all("/collections", &[])?;
        Ok(collections.into_iter().map(Folder::from).collect())
    }

    fn create_folder(&self, name: &str, parent: Option<&FolderKey>) -> Result<FolderKey> {
        let parent_value = match parent {
            Some(key) => json!(key.as_str()),
            None => json!(false),
        };
        let body = json!([{ "name": name, "parentCollection": parent_value }]);
        let token = write_token();

        let response: Value = self.retry.run("create folder", |_| {
            self.request("POST", "/collections")
                .set("Zotero-Write-Token", &token)
                .send_json(body.clone())
                .map_err(map_ureq_error)?
                .into_json()
                .map_err(|e| map_response_err!(SERVICE, e))
        })?;

        let key = created_key(&response)?;
        debug!(name, parent = ?parent, key = %key, "created folder");
        Ok(key)
    }

    fn list_items_by_tag(&self, tag: &str, folder: Option<&FolderKey>) -> Result<Vec<Item>> {
        let path = match folder {
            Some(key) => format!("/collections/{}/items/top", key),
            None => "/items/top".to_string(),
        };
        let items: Vec<ApiItem> = self.fetch_all(&path, &[("tag", tag)])?;
        Ok(items.into_iter().map(Item::from).collect())
    }

    fn list_items(&self) -> Result<Vec<Item>> {
        let items: Vec<ApiItem> = self.fetch_all("/items/top", &[])?;
        Ok(items.into_iter().map(Item::from).collect())
    }

    fn get_children(&self, item_key: &str) -> Result<Vec<Item>> {
        let items: Vec<ApiItem> = self.fetch_all(&format!("/items/{}/children", item_key), &[])?;
        Ok(items.into_iter().map(Item::from).collect())
    }

    fn move_item_to_folder(&self, folder: &FolderKey, item: &mut Item) -> Result<()> {
        if item.in_folder(folder) {
            return Ok(());
        }
        let mut collections = item.collections.clone();
        collections.push(folder.to_string());

        let version = self.patch_item(item, json!({ "collections": collections }))?;
        item.collections = collections;
        if let Some(version) = version {
            item.version = version;
        }
        Ok(())
    }

    fn add_tag(&self, item: &mut Item, tag: &str) -> Result<()> {
        if item.has_tag(tag) {
            return Ok(());
        }
        let mut tags = item.tags.clone();
        tags.push(tag.to_string());
        self.set_tags(item, &tags)
    }

    fn set_tags(&self, item: &mut Item, tags: &[String]) -> Result<()> {
        let version = self.patch_item(item, tags_body(item, tags))?;
        item.replace_tags(tags);
        if let Some(version) = version {
            item.version = version;
        }
        Ok(())
    }
}
