// Typed operations on collections and documents, layered over
// `ApiClient::request`. Failed requests have already been logged by the
// request layer and come back here as `None` / `false`.

use crate::api::{ApiClient, Outcome, Payload};
use crate::error::{ClientError, Result};
use crate::models::{
    BulkDeleteRequest, Collection, CreateCollectionRequest, DeleteBy, Document, SearchRequest,
    SearchResult, UpdateCollectionRequest, UploadOptions, UploadResponse, UserInfo,
};
use reqwest::blocking::multipart::Form;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

fn decode<T: DeserializeOwned>(outcome: Outcome) -> Result<Option<T>> {
    match outcome.into_value() {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

fn to_body<T: serde::Serialize>(record: &T) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

impl ApiClient {
    pub fn current_user(&mut self) -> Result<Option<UserInfo>> {
        decode(self.get("auth/me", &[])?)
    }

    pub fn list_collections(&mut self) -> Result<Option<Vec<Collection>>> {
        decode(self.get("collections", &[])?)
    }

    pub fn create_collection(
        &mut self,
        name: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Option<Collection>> {
        let body = CreateCollectionRequest {
            name: name.to_string(),
            metadata: metadata.filter(|m| !m.is_empty()),
        };
        decode(self.post("collections", Payload::Json(to_body(&body)?))?)
    }

    /// Fetch one collection. The single-item endpoint reports stale
    /// `document_count`/`chunk_count`, so the counts are taken from the
    /// collection listing when it contains this id.
    pub fn get_collection(&mut self, collection_id: &str) -> Result<Option<Collection>> {
        let endpoint = format!("collections/{collection_id}");
        let Some(mut collection) = decode::<Collection>(self.get(&endpoint, &[])?)? else {
            return Ok(None);
        };

        // A failed or unreadable listing leaves the direct result as it is.
        let listed = match self.get("collections", &[]) {
            Ok(outcome) => outcome
                .into_value()
                .and_then(|v| serde_json::from_value::<Vec<Collection>>(v).ok()),
            Err(e) => {
                warn!("could not list collections to refresh counts for {}: {}", collection_id, e);
                None
            }
        };
        if let Some(listed) = listed {
            if let Some(entry) = listed.into_iter().find(|c| c.uuid == collection_id) {
                debug!(
                    "overlaying counts for {}: documents {:?}, chunks {:?}",
                    collection_id, entry.document_count, entry.chunk_count
                );
                collection.document_count = Some(entry.document_count.unwrap_or(0));
                collection.chunk_count = Some(entry.chunk_count.unwrap_or(0));
            }
        }
        Ok(Some(collection))
    }

    pub fn update_collection(
        &mut self,
        collection_id: &str,
        update: &UpdateCollectionRequest,
    ) -> Result<Option<Collection>> {
        let body = to_body(update)?;
        decode(self.patch(&format!("collections/{collection_id}"), body)?)
    }

    /// The API answers 204 on success.
    pub fn delete_collection(&mut self, collection_id: &str) -> Result<bool> {
        let endpoint = format!("collections/{collection_id}");
        Ok(self.delete(&endpoint, &[], Payload::Empty)?.is_success())
    }

    pub fn list_documents(
        &mut self,
        collection_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<Vec<Document>>> {
        let params = [
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        decode(self.get(&format!("collections/{collection_id}/documents"), &params)?)
    }

    /// Upload `files` in a single multipart request. A file that cannot be
    /// opened fails the whole call before anything is sent.
    pub fn upload_documents(
        &mut self,
        collection_id: &str,
        files: &[PathBuf],
        options: &UploadOptions,
    ) -> Result<Option<UploadResponse>> {
        if files.is_empty() {
            return Err(ClientError::InvalidArgument("no files to upload".into()));
        }

        let mut form = Form::new()
            .text("chunk_size", options.chunk_size.to_string())
            .text("chunk_overlap", options.chunk_overlap.to_string());
        if let Some(metadatas) = &options.metadatas_json {
            form = form.text("metadatas_json", metadatas.clone());
        }
        for path in files {
            form = form
                .file("files", path)
                .map_err(|e| ClientError::io(path, e))?;
        }

        let endpoint = format!("collections/{collection_id}/documents");
        decode(self.post(&endpoint, Payload::Multipart(form))?)
    }

    pub fn search_documents(
        &mut self,
        collection_id: &str,
        search: &SearchRequest,
    ) -> Result<Option<Vec<SearchResult>>> {
        let endpoint = format!("collections/{collection_id}/documents/search");
        decode(self.post(&endpoint, Payload::Json(to_body(search)?))?)
    }

    /// Delete one document. Returns the raw outcome so callers can show
    /// the server's error record.
    pub fn delete_document(
        &mut self,
        collection_id: &str,
        document_id: &str,
        delete_by: DeleteBy,
    ) -> Result<Outcome> {
        let params = [("delete_by".to_string(), delete_by.as_str().to_string())];
        let endpoint = format!("collections/{collection_id}/documents/{document_id}");
        self.delete(&endpoint, &params, Payload::Empty)
    }

    pub fn bulk_delete_documents(
        &mut self,
        collection_id: &str,
        request: &BulkDeleteRequest,
    ) -> Result<Option<Value>> {
        if request.document_ids.is_none() && request.file_ids.is_none() {
            return Err(ClientError::InvalidArgument(
                "provide document ids or file ids to delete".into(),
            ));
        }
        let endpoint = format!("collections/{collection_id}/documents");
        let outcome = self.delete(&endpoint, &[], Payload::Json(to_body(request)?))?;
        Ok(outcome.into_value())
    }
}
