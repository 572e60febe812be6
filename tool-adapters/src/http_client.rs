use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde::Serialize;
use tokio::time::timeout;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{RemoteError, RemoteResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

fn trust_store() -> RootCertStore {
    let mut store = RootCertStore::empty();
    store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|root| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            root.subject,
            root.spki,
            root.name_constraints,
        )
    }));
    store
}

/// Builds a pooled client for the executor and health APIs.
///
/// Both plain `http://` (local executors) and `https://` endpoints are accepted.
/// Connecting is bounded separately from the per-call limit in [`post_json`].
pub(crate) fn https_client() -> HyperClient {
    let tls = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(trust_store())
        .with_no_client_auth();

    let mut tcp = HttpConnector::new();
    tcp.enforce_http(false);
    tcp.set_nodelay(true);
    tcp.set_connect_timeout(Some(CONNECT_TIMEOUT));

    let connector = HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(tcp);

    Client::builder()
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .build::<_, Body>(connector)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> RemoteResult<Uri> {
    format!("{base_url}{path}")
        .parse::<Uri>()
        .map_err(|err| RemoteError::configuration(format!("invalid endpoint `{path}`: {err}")))
}

/// POSTs a JSON body and returns the status and raw body, bounded by `limit`.
///
/// The bound covers connecting, sending, and reading the whole response.
pub(crate) async fn post_json<T>(
    client: &HyperClient,
    uri: &Uri,
    payload: &T,
    limit: Duration,
) -> RemoteResult<(StatusCode, Bytes)>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(payload)
        .map_err(|err| RemoteError::configuration(format!("failed to encode request: {err}")))?;

    let req = Request::post(uri.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|err| RemoteError::configuration(format!("failed to build request: {err}")))?;

    let exchange = async {
        let response = client
            .request(req)
            .await
            .map_err(|err| RemoteError::network(format!("request to {uri} failed: {err}")))?;
        let status = response.status();
        let bytes = to_bytes(response.into_body())
            .await
            .map_err(|err| RemoteError::network(format!("failed to read response: {err}")))?;
        Ok::<_, RemoteError>((status, bytes))
    };

    timeout(limit, exchange)
        .await
        .map_err(|_| RemoteError::Timeout { after: limit })?
}
