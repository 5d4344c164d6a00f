use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, AUTHORIZATION, LOCATION};
use hyper::{Method, StatusCode, Uri};
#[cfg(not(feature = "rustls-platform-verifier"))]
use hyper_rustls::ConfigBuilderExt;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use once_cell::sync::Lazy;
use rustls::ClientConfig;
#[cfg(feature = "rustls-platform-verifier")]
use rustls_platform_verifier::BuilderVerifierExt;
use std::{collections::HashMap, fmt, sync::Arc};
use thiserror::Error;

use crate::error::{BoxError, HttpError};

/// Response body as a stream of chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, HttpError>>;

pub const MAX_REDIRECTS: usize = 10;

/// Injectable transport. Implementations perform exactly one logical GET per
/// call (following redirects is part of that call).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        header_map: &HashMap<String, String>,
    ) -> Result<Response, HttpError>;
}

pub struct Response {
    url: String,
    status: StatusCode,
    body: ByteStream,
}

impl Response {
    pub fn new(url: impl Into<String>, status: StatusCode, body: ByteStream) -> Self {
        Self {
            url: url.into(),
            status,
            body,
        }
    }

    /// Response with an in-memory body, mostly useful for custom clients and tests.
    pub fn from_bytes(url: impl Into<String>, status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let chunks = if body.is_empty() {
            vec![]
        } else {
            vec![Ok(body)]
        };
        Self::new(url, status, stream::iter(chunks).boxed())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::remote(&self.url, self.status))
        }
    }

    /// Collects the whole body.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        let mut body = BytesMut::new();
        let mut chunks = self.body;
        while let Some(chunk) = chunks.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body.freeze())
    }

    pub fn into_stream(self) -> ByteStream {
        self.body
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

static PROVIDER: Lazy<Arc<rustls::crypto::CryptoProvider>> =
    Lazy::new(|| Arc::new(rustls::crypto::ring::default_provider()));

#[derive(Debug, Error)]
#[error("HttpsConfigError: {error}")]
pub struct HttpsConfigError {
    error: BoxError,
}

impl HttpsConfigError {
    fn new(error: impl Into<BoxError>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn https_config() -> Result<HttpsConnector<HttpConnector>, HttpsConfigError> {
    let provider = PROVIDER.clone();
    let tls: ClientConfig;
    #[cfg(feature = "rustls-platform-verifier")]
    {
        tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(HttpsConfigError::new)?
            .with_platform_verifier()
            .with_no_client_auth();
    }
    #[cfg(all(feature = "webpki-roots", not(feature = "rustls-platform-verifier")))]
    {
        tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(HttpsConfigError::new)?
            .with_webpki_roots()
            .with_no_client_auth();
    }
    #[cfg(all(
        feature = "native-tokio",
        not(feature = "webpki-roots"),
        not(feature = "rustls-platform-verifier")
    ))]
    {
        tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(HttpsConfigError::new)?
            .with_native_roots()
            .map_err(HttpsConfigError::new)?
            .with_no_client_auth();
    }
    #[cfg(all(
        not(feature = "native-tokio"),
        not(feature = "webpki-roots"),
        not(feature = "rustls-platform-verifier")
    ))]
    {
        compile_error!("No TLS backend enabled");
    }
    Ok(hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build())
}

/// Default [`HttpClient`]: hyper over rustls, plain HTTP allowed.
#[derive(Clone)]
pub struct HyperClient {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
}

impl HyperClient {
    pub fn new() -> Result<Self, HttpsConfigError> {
        let https = https_config()?;
        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(https),
        })
    }
}

impl fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn get(
        &self,
        url: &str,
        header_map: &HashMap<String, String>,
    ) -> Result<Response, HttpError> {
        let mut uri: Uri = url.parse().map_err(|e| HttpError::request(url, e))?;
        let origin = uri.clone();

        for _ in 0..=MAX_REDIRECTS {
            let current = uri.to_string();
            let mut req = hyper::Request::builder()
                .method(Method::GET)
                .uri(uri.clone());
            for (key, value) in header_map {
                // credentials never leave the origin they were meant for
                if key.eq_ignore_ascii_case(AUTHORIZATION.as_str()) && !same_origin(&origin, &uri)
                {
                    continue;
                }
                req = req.header(key, value);
            }
            let req = req
                .body(Empty::<Bytes>::new())
                .map_err(|e| HttpError::request(&current, e))?;

            let res = self
                .client
                .request(req)
                .await
                .map_err(|e| HttpError::transport(&current, e))?;
            let status = res.status();
            if is_followed_redirect(status) {
                if let Some(location) = res.headers().get(LOCATION) {
                    uri = resolve_location(&uri, location)
                        .map_err(|e| HttpError::transport(&current, e))?;
                    continue;
                }
            }
            let body = body_stream(current.clone(), res.into_body());
            return Ok(Response::new(current, status, body));
        }

        Err(HttpError::TooManyRedirects {
            url: url.to_string(),
            limit: MAX_REDIRECTS,
        })
    }
}

/// Scheme and authority both match, so an `https` to `http` hop on the same
/// host counts as a different origin.
fn same_origin(a: &Uri, b: &Uri) -> bool {
    a.scheme() == b.scheme() && a.authority() == b.authority()
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn resolve_location(base: &Uri, location: &HeaderValue) -> Result<Uri, BoxError> {
    let location = location.to_str()?;
    let target: Uri = location.parse()?;
    if target.scheme().is_some() {
        return Ok(target);
    }

    let path = if location.starts_with('/') {
        location.to_string()
    } else {
        let base_path = base.path();
        let dir = &base_path[..base_path.rfind('/').map_or(0, |i| i + 1)];
        if dir.is_empty() {
            format!("/{}", location)
        } else {
            format!("{}{}", dir, location)
        }
    };
    let mut parts = base.clone().into_parts();
    parts.path_and_query = Some(path.parse()?);
    Ok(Uri::from_parts(parts)?)
}

fn body_stream(url: String, body: Incoming) -> ByteStream {
    stream::unfold(Some(body), move |state| {
        let url = url.clone();
        async move {
            let mut body = state?;
            loop {
                match body.frame().await {
                    None => return None,
                    Some(Err(e)) => return Some((Err(HttpError::transport(&url, e)), None)),
                    Some(Ok(frame)) => {
                        // trailers carry no payload
                        if let Ok(chunk) = frame.into_data() {
                            if !chunk.is_empty() {
                                return Some((Ok(chunk), Some(body)));
                            }
                        }
                    }
                }
            }
        }
    })
    .boxed()
}
