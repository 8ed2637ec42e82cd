use crate::cache::CacheKey;
use crate::config::KnackConfig;
use crate::dispatch::{DispatchOptions, OperationHandle, RequestDispatcher};
use crate::records::{Filter, Record, RecordPage, RecordQuery, MAX_ROWS_PER_PAGE};
use crate::session::SessionContext;
use crate::transport::ApiRequest;
use crate::{Error, ErrorContext, Result};
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed client for the platform's records API.
///
/// Every call goes through the session's dispatcher: it is paced per object
/// (the object or view key is the throttle resource), retried, and tracked so
/// it can be cancelled. Single-record reads are cached under the record's
/// canonical key.
#[derive(Clone)]
pub struct KnackClient {
    pub(crate) config: Arc<KnackConfig>,
    pub(crate) dispatcher: RequestDispatcher,
    pub(crate) scope: Option<String>,
}

fn object_path(object: &str) -> String {
    format!("objects/{}/records", object)
}

fn record_path(object: &str, id: &str) -> String {
    format!("objects/{}/records/{}", object, id)
}

fn view_path(scene: &str, view: &str) -> String {
    format!("pages/{}/views/{}/records", scene, view)
}

fn require_id(id: &str, field: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::validation_with_context(
            "identifier must not be empty",
            ErrorContext::new()
                .with_field_path(field)
                .with_source("knack_client"),
        ));
    }
    Ok(())
}

impl KnackClient {
    /// Build a client with the default HTTP transport and a fresh session.
    pub fn new(config: KnackConfig) -> Result<Self> {
        crate::client::builder::KnackClientBuilder::new(config).build()
    }

    pub fn builder(config: KnackConfig) -> crate::client::builder::KnackClientBuilder {
        crate::client::builder::KnackClientBuilder::new(config)
    }

    pub fn config(&self) -> &KnackConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.dispatcher.session()
    }

    /// A copy of this client whose calls are tagged with `scope`, so they can
    /// be cancelled together through [`SessionContext::cancel_scope`].
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        let mut c = self.clone();
        c.scope = Some(scope.into());
        c
    }

    fn options(&self, resource: &str) -> DispatchOptions {
        let mut opts = DispatchOptions::new(resource);
        opts.scope = self.scope.clone();
        opts
    }

    pub async fn list_records(&self, object: &str, query: &RecordQuery) -> Result<RecordPage> {
        require_id(object, "object")?;
        let mut req = ApiRequest::get(object_path(object));
        req.query = query.to_pairs()?;
        let value = self.dispatcher.send(req, self.options(object)).await?;
        Ok(RecordPage::from_value(value))
    }

    /// Follow pages until the last one. Each page is a separate paced call.
    pub async fn list_all_records(&self, object: &str, filter: Option<Filter>) -> Result<Vec<Record>> {
        let mut query = RecordQuery::new().rows_per_page(MAX_ROWS_PER_PAGE);
        query.filter = filter;
        let mut out = Vec::new();
        loop {
            let page = self.list_records(object, &query).await?;
            let more = page.has_more() && !page.records.is_empty();
            debug!(
                object,
                page = page.current_page,
                total_pages = page.total_pages,
                "fetched page"
            );
            out.extend(page.records);
            if !more {
                break;
            }
            query.page += 1;
        }
        Ok(out)
    }

    pub async fn get_record(&self, object: &str, id: &str) -> Result<Record> {
        require_id(object, "object")?;
        require_id(id, "id")?;
        let opts = self.options(object).cached(CacheKey::record(object, id));
        let value = self.dispatcher.send(ApiRequest::get(record_path(object, id)), opts).await?;
        Ok(Record::from_value(value))
    }

    /// Fetch several records of one object concurrently. Calls still queue
    /// behind the object's cooldown; cached records cost nothing.
    pub async fn get_records(&self, object: &str, ids: &[&str]) -> Result<Vec<Record>> {
        try_join_all(ids.iter().map(|id| self.get_record(object, id))).await
    }

    /// Like [`get_record`](Self::get_record) but always goes to the network.
    pub async fn refresh_record(&self, object: &str, id: &str) -> Result<Record> {
        require_id(object, "object")?;
        require_id(id, "id")?;
        let opts = self
            .options(object)
            .cached(CacheKey::record(object, id))
            .refresh();
        let value = self.dispatcher.send(ApiRequest::get(record_path(object, id)), opts).await?;
        Ok(Record::from_value(value))
    }

    /// Start a record read in the background, cancellable through the handle.
    pub fn spawn_get_record(&self, object: &str, id: &str) -> OperationHandle {
        let opts = self
            .options(object)
            .cached(CacheKey::record(object, id))
            .request_key(format!("get:{}:{}", object, id));
        self.dispatcher.spawn(ApiRequest::get(record_path(object, id)), opts)
    }

    /// First record whose `field` equals `value`.
    ///
    /// The lookup key is linked to the record's canonical key, so later reads
    /// by id and by this field share one cache entry. A cached record whose
    /// field no longer holds `value` is a miss and its link is dropped.
    pub async fn find_one_by_field(
        &self,
        object: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Record>> {
        require_id(object, "object")?;
        let cache = self.session().cache();
        let alias = CacheKey::record_lookup(object, field, value);
        match cache.get(&alias).await {
            Ok(Some(hit)) => {
                let record = Record::from_value(hit);
                if record.text_opt(field).as_deref() == Some(value) {
                    return Ok(Some(record));
                }
                debug!(key = %alias, "lookup no longer matches cached record");
                cache.unlink_alias(&alias);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %alias, error = %e, "cache read failed"),
        }

        let query = RecordQuery::new()
            .rows_per_page(1)
            .filter(Filter::and().eq(field, value));
        let page = self.list_records(object, &query).await?;
        let Some(record) = page.records.into_iter().next() else {
            return Ok(None);
        };
        if let Some(id) = record.id() {
            let canonical = CacheKey::record(object, id);
            cache.link_alias(&alias, &canonical);
            self.cache_store(&canonical, &record).await;
        }
        Ok(Some(record))
    }

    pub async fn create_record(&self, object: &str, fields: &Value) -> Result<Record> {
        require_id(object, "object")?;
        let req = ApiRequest::post(object_path(object)).with_body(fields.clone());
        let value = self.dispatcher.send(req, self.options(object)).await?;
        let record = Record::from_value(value);
        if let Some(id) = record.id() {
            self.cache_store(&CacheKey::record(object, id), &record).await;
        }
        Ok(record)
    }

    pub async fn update_record(&self, object: &str, id: &str, fields: &Value) -> Result<Record> {
        require_id(object, "object")?;
        require_id(id, "id")?;
        let req = ApiRequest::put(record_path(object, id)).with_body(fields.clone());
        let opts = self
            .options(object)
            .cached(CacheKey::record(object, id))
            .refresh();
        let value = self.dispatcher.send(req, opts).await?;
        Ok(Record::from_value(value))
    }

    pub async fn delete_record(&self, object: &str, id: &str) -> Result<()> {
        require_id(object, "object")?;
        require_id(id, "id")?;
        self.dispatcher
            .send(ApiRequest::delete(record_path(object, id)), self.options(object))
            .await?;
        let key = CacheKey::record(object, id);
        if let Err(e) = self.session().cache().invalidate(&key).await {
            warn!(key = %key, error = %e, "cache invalidate failed");
        }
        Ok(())
    }

    /// Records visible through a page view; uses the configured user token.
    pub async fn view_records(&self, scene: &str, view: &str, query: &RecordQuery) -> Result<RecordPage> {
        require_id(scene, "scene")?;
        require_id(view, "view")?;
        let mut req = ApiRequest::get(view_path(scene, view));
        req.query = query.to_pairs()?;
        let value = self.dispatcher.send(req, self.options(view)).await?;
        Ok(RecordPage::from_value(value))
    }

    pub async fn create_view_record(&self, scene: &str, view: &str, fields: &Value) -> Result<Record> {
        require_id(scene, "scene")?;
        require_id(view, "view")?;
        let req = ApiRequest::post(view_path(scene, view)).with_body(fields.clone());
        let value = self.dispatcher.send(req, self.options(view)).await?;
        Ok(Record::from_value(value))
    }

    // Cache failures after a successful call are logged, not returned.
    async fn cache_store(&self, key: &CacheKey, record: &Record) {
        if let Err(e) = self
            .session()
            .cache()
            .set(key, record.clone().into_value())
            .await
        {
            warn!(key = %key, error = %e, "cache write failed");
        }
    }

    /// Debounce bursts of triggers for one entity; `true` for the trigger that should act.
    pub async fn settle(&self, key: &str) -> bool {
        self.session().debouncer().settle(key).await
    }
}
