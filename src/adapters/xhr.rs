// src/adapters/xhr.rs
//! Adapter for XMLHttpRequest
//!
//! A mock goes through the same ready-state walk as a real response, so
//! event listeners on the request cannot tell the two apart.

use crate::interception::emitter::Emitter;
use crate::interception::request::{Credentials, InterceptedRequest};
use crate::interception::response::{InterceptedResponse, ResponseSource};
use crate::transport::xhr::{XhrResponse, XhrSend, XmlHttpRequest};
use crate::utils::errors::TransportError;

pub(crate) async fn intercept(
    emitter: &Emitter,
    xhr: &XmlHttpRequest,
    request: XhrSend,
) -> Result<XhrResponse, TransportError> {
    let credentials = if request.with_credentials {
        Credentials::Include
    } else {
        Credentials::Omit
    };
    let intercepted = InterceptedRequest::builder(request.method.clone(), request.url.clone())
        .headers(request.headers.clone())
        .credentials(credentials)
        .body(request.body.clone())
        .build();

    if let Some(mocked) = emitter.resolve(&intercepted).await {
        let response = XhrResponse {
            status: mocked.status,
            status_text: mocked.status_text.clone(),
            headers: mocked.headers.clone(),
            body: mocked.body.clone(),
        };
        emitter.emit_response(&intercepted, mocked, ResponseSource::Mock);
        return Ok(response);
    }

    let response = xhr.send_native(request).await?;
    emitter.emit_response(
        &intercepted,
        InterceptedResponse {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body.clone(),
        },
        ResponseSource::Network,
    );
    Ok(response)
}
