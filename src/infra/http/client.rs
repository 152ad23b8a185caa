//! HTTP transport for [`BatchDriver`](crate::application::reorder::BatchDriver).

use async_trait::async_trait;
use reorder_api_types::{BatchRequestForm, BatchResponseBody, SORT_ACTION};
use reqwest::{
    Client, Url,
    header::{CONTENT_TYPE, HeaderName, HeaderValue},
};

use crate::application::reorder::{
    BatchTransport, MovedItem, RenumberBatchRequest, RenumberBatchResponse, TransportError,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Posts batches to a running admin listener.
#[derive(Clone, Debug)]
pub struct HttpBatchTransport {
    client: Client,
    batch_url: Url,
    nonce: String,
    identity: Option<(HeaderName, HeaderValue)>,
}

impl HttpBatchTransport {
    pub fn new(
        client: Client,
        admin_base: &Url,
        nonce: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            batch_url: admin_base.join("/reorder/batch")?,
            nonce: nonce.into(),
            identity: None,
        })
    }

    /// Present `value` in `header` on every request.
    pub fn with_identity(mut self, header: HeaderName, value: HeaderValue) -> Self {
        self.identity = Some((header, value));
        self
    }
}

/// Wire form of a batch request.
pub fn batch_form(request: &RenumberBatchRequest, nonce: &str) -> BatchRequestForm {
    BatchRequestForm {
        action: SORT_ACTION.to_string(),
        nonce: nonce.to_string(),
        post_parent: Some(request.parent_id),
        start: Some(request.start_offset),
        post_id: Some(request.moved.map_or(0, |moved| moved.id)),
        menu_order: Some(request.moved.map_or(0, |moved| moved.ordinal)),
        excluded: request.excluded.clone(),
        post_type: Some(request.item_type.clone()),
    }
}

fn encode_form(form: &BatchRequestForm) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in form.to_form_pairs() {
        serializer.append_pair(key, &value);
    }
    serializer.finish()
}

impl From<BatchResponseBody> for RenumberBatchResponse {
    fn from(body: BatchResponseBody) -> Self {
        Self {
            next_start_offset: body.start,
            moved: (body.post_id > 0).then_some(MovedItem {
                id: body.post_id,
                ordinal: body.menu_order,
            }),
            excluded: body.excluded,
            has_more: body.more_posts,
        }
    }
}

#[async_trait]
impl BatchTransport for HttpBatchTransport {
    async fn send(
        &self,
        request: &RenumberBatchRequest,
    ) -> Result<RenumberBatchResponse, TransportError> {
        let body = encode_form(&batch_form(request, &self.nonce));
        let mut builder = self
            .client
            .post(self.batch_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);
        if let Some((header, value)) = self.identity.as_ref() {
            builder = builder.header(header.clone(), value.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<BatchResponseBody>()
            .await
            .map(RenumberBatchResponse::from)
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}
