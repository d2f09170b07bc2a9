// src/adapters/fetch.rs
//! Adapter for global `fetch`
//!
//! Fetch already receives a parsed URL, so no option resolution is needed.

use crate::interception::emitter::Emitter;
use crate::interception::request::InterceptedRequest;
use crate::interception::response::{InterceptedResponse, ResponseSource};
use crate::transport::fetch::{Fetch, FetchRequest, FetchResponse};
use crate::utils::errors::TransportError;

pub(crate) async fn intercept(
    emitter: &Emitter,
    fetch: &Fetch,
    request: FetchRequest,
) -> Result<FetchResponse, TransportError> {
    let intercepted = to_intercepted(&request);

    if let Some(mocked) = emitter.resolve(&intercepted).await {
        let response = FetchResponse::new(
            mocked.status,
            mocked.status_text.clone(),
            mocked.headers.clone(),
            request.url.clone(),
            mocked.body.clone(),
        );
        emitter.emit_response(&intercepted, mocked, ResponseSource::Mock);
        return Ok(response);
    }

    let response = fetch.fetch_native(request).await?;
    emitter.emit_response(&intercepted, to_intercepted_response(&response), ResponseSource::Network);
    Ok(response)
}

fn to_intercepted(request: &FetchRequest) -> InterceptedRequest {
    InterceptedRequest::builder(request.method.clone(), request.url.clone())
        .headers(request.headers.clone())
        .credentials(request.credentials)
        .body(request.body.clone().unwrap_or_default())
        .build()
}

fn to_intercepted_response(response: &FetchResponse) -> InterceptedResponse {
    InterceptedResponse {
        status: response.status,
        status_text: response.status_text.clone(),
        headers: response.headers.clone(),
        body: response.bytes().clone(),
    }
}
