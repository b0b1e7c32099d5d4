// Request and response records for the LangConnect endpoints. Response
// types keep any field they do not name in `extra`, so printing a record
// shows everything the server sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Body of `/auth/signin` and `/auth/signup`.
#[derive(Serialize, Debug)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Token pair returned by sign-in, sign-up and refresh.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `/auth/me`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Collection {
    pub uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// PATCH body; absent fields are left untouched server-side.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateCollectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// A stored document (or chunk) as returned by the listing endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Semantic,
    Keyword,
    Hybrid,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchType::Semantic => "semantic",
            SearchType::Keyword => "keyword",
            SearchType::Hybrid => "hybrid",
        })
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "semantic" => Ok(SearchType::Semantic),
            "keyword" => Ok(SearchType::Keyword),
            "hybrid" => Ok(SearchType::Hybrid),
            other => Err(format!(
                "unknown search type '{other}' (expected semantic, keyword or hybrid)"
            )),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: u32,
    pub search_type: SearchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        SearchRequest {
            query: query.into(),
            limit: 10,
            search_type: SearchType::default(),
            filter: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Form fields sent alongside the files of an upload; chunking itself
/// happens server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub metadatas_json: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            chunk_size: 1000,
            chunk_overlap: 200,
            metadatas_json: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_chunk_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadResponse {
    /// The server may answer 200 and still report that nothing was stored.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}

/// Which identifier `delete_document` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteBy {
    #[default]
    DocumentId,
    FileId,
}

impl DeleteBy {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteBy::DocumentId => "document_id",
            DeleteBy::FileId => "file_id",
        }
    }
}

impl FromStr for DeleteBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document_id" => Ok(DeleteBy::DocumentId),
            "file_id" => Ok(DeleteBy::FileId),
            other => Err(format!("expected document_id or file_id, got '{other}'")),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct BulkDeleteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_keeps_unknown_fields() {
        let raw = json!({
            "uuid": "c1",
            "name": "cie-10-ar",
            "metadata": {"lang": "es"},
            "document_count": 3,
            "table_id": "t-9"
        });
        let c: Collection = serde_json::from_value(raw).unwrap();
        assert_eq!(c.document_count, Some(3));
        assert_eq!(c.chunk_count, None);
        assert_eq!(c.extra.get("table_id"), Some(&json!("t-9")));

        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["table_id"], "t-9");
        assert!(back.get("chunk_count").is_none());
    }

    #[test]
    fn search_request_omits_empty_filter() {
        let mut req = SearchRequest::new("fiebre");
        req.search_type = SearchType::Hybrid;
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body, json!({"query": "fiebre", "limit": 10, "search_type": "hybrid"}));
    }

    #[test]
    fn search_type_parses_case_insensitively() {
        assert_eq!("Keyword".parse::<SearchType>(), Ok(SearchType::Keyword));
        assert!("fuzzy".parse::<SearchType>().is_err());
    }

    #[test]
    fn upload_response_rejection() {
        let ok: UploadResponse = serde_json::from_value(json!({"success": true})).unwrap();
        let bad: UploadResponse =
            serde_json::from_value(json!({"success": false, "message": "no files"})).unwrap();
        let silent: UploadResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!ok.is_rejected());
        assert!(bad.is_rejected());
        assert!(!silent.is_rejected());
    }
}
