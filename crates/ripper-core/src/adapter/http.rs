//! Byte fetching for adapters: libcurl GET for http(s), direct reads for file URLs.
//!
//! curl is blocking, so `fetch` moves each request onto tokio's blocking pool.

use std::time::Duration;

use crate::error::AdapterError;

/// Per-request limits for HTTP-backed adapters.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

fn transport(url: &str, err: impl std::fmt::Display) -> AdapterError {
    AdapterError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Fetches the body at `url`. Follows redirects; any non-2xx status is an error.
pub(crate) async fn fetch(url: &str, opts: &HttpOptions) -> Result<Vec<u8>, AdapterError> {
    let parsed = url::Url::parse(url).map_err(|e| transport(url, e))?;
    if parsed.scheme() == "file" {
        let path = parsed
            .to_file_path()
            .map_err(|()| transport(url, "not a local file path"))?;
        return tokio::fs::read(&path).await.map_err(|e| transport(url, e));
    }

    let owned_url = url.to_string();
    let opts = opts.clone();
    tokio::task::spawn_blocking(move || get_blocking(&owned_url, &opts))
        .await
        .map_err(|e| transport(url, format!("request task join: {e}")))?
}

fn get_blocking(url: &str, opts: &HttpOptions) -> Result<Vec<u8>, AdapterError> {
    let mut body = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(|e| transport(url, e))?;
    easy.follow_location(true).map_err(|e| transport(url, e))?;
    easy.connect_timeout(opts.connect_timeout)
        .map_err(|e| transport(url, e))?;
    easy.timeout(opts.timeout).map_err(|e| transport(url, e))?;
    if let Some(ua) = &opts.user_agent {
        easy.useragent(ua).map_err(|e| transport(url, e))?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(|e| transport(url, e))?;
        transfer.perform().map_err(|e| transport(url, e))?;
    }

    let code = easy.response_code().map_err(|e| transport(url, e))?;
    if !(200..300).contains(&code) {
        return Err(AdapterError::Http {
            url: url.to_string(),
            code,
        });
    }
    tracing::trace!(url, bytes = body.len(), "fetched");
    Ok(body)
}
