// src/adapters/client_request.rs
//! Adapter for the socket-level client request
//!
//! The URL is rebuilt from the request options, and every chunk written
//! before `end()` is coalesced into one body before listeners see it.

use crate::interception::emitter::Emitter;
use crate::interception::request::{Credentials, InterceptedRequest};
use crate::interception::response::{InterceptedResponse, ResponseSource};
use crate::transport::client_request::{ClientRequest, IncomingMessage};
use crate::utils::errors::TransportError;
use hyper::Method;

pub(crate) async fn intercept(
    emitter: &Emitter,
    request: ClientRequest,
    method: Method,
) -> Result<IncomingMessage, TransportError> {
    let intercepted = to_intercepted(&request, method.clone());

    if let Some(mocked) = emitter.resolve(&intercepted).await {
        let message = IncomingMessage::new(
            mocked.status,
            mocked.status_text.clone(),
            mocked.headers.clone(),
            mocked.body.clone(),
        );
        emitter.emit_response(&intercepted, mocked, ResponseSource::Mock);
        return Ok(message);
    }

    let message = request.send_native(method).await?;
    emitter.emit_response(
        &intercepted,
        InterceptedResponse {
            status: message.status_code,
            status_text: message.status_message.clone(),
            headers: message.headers.clone(),
            body: message.body().clone(),
        },
        ResponseSource::Network,
    );
    Ok(message)
}

fn to_intercepted(request: &ClientRequest, method: Method) -> InterceptedRequest {
    InterceptedRequest::builder(method, request.url())
        .headers(request.headers().clone())
        .credentials(Credentials::SameOrigin)
        .body(request.body())
        .build()
}
