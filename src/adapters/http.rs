use crate::utils::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use reqwest::Client;
use std::time::Duration;

/// Fetches export files with the browser's identity: its cookies, user agent and referer.
#[derive(Clone)]
pub struct ExportFetcher {
    client: Client,
}

impl ExportFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(
        &self,
        url: &str,
        referer: &str,
        cookies: &[(String, String)],
    ) -> Result<Vec<u8>> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie_header(cookies) {
            headers.insert(COOKIE, cookie);
        }
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }

        tracing::debug!("📥 Fetching export from: {}", url);
        let response = self.client.get(url).headers(headers).send().await?;
        tracing::debug!("Export response status: {}", response.status());

        let bytes = response.error_for_status()?.bytes().await?;
        tracing::debug!("Received {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

fn cookie_header(cookies: &[(String, String)]) -> Option<HeaderValue> {
    if cookies.is_empty() {
        return None;
    }
    let joined = cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");
    HeaderValue::from_str(&joined).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_carries_session_identity() {
        let server = MockServer::start();
        let export = server.mock(|when, then| {
            when.method(GET)
                .path("/journalrank.php")
                .query_param("out", "xls")
                .header("cookie", "cf_clearance=abc; PHPSESSID=42")
                .header("referer", "https://www.scimagojr.com/journalrank.php?area=1200")
                .header("user-agent", "test-agent");
            then.status(200).body("Rank;Title\n1;A\n");
        });

        let fetcher = ExportFetcher::new("test-agent", Duration::from_secs(5)).unwrap();
        let cookies = vec![
            ("cf_clearance".to_string(), "abc".to_string()),
            ("PHPSESSID".to_string(), "42".to_string()),
        ];
        let body = fetcher
            .fetch(
                &server.url("/journalrank.php?area=1200&out=xls"),
                "https://www.scimagojr.com/journalrank.php?area=1200",
                &cookies,
            )
            .await
            .unwrap();

        export.assert();
        assert_eq!(body, b"Rank;Title\n1;A\n");
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/export");
            then.status(403);
        });

        let fetcher = ExportFetcher::new("test-agent", Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch(&server.url("/export"), "", &[]).await;

        assert!(result.is_err());
    }

    #[test]
    fn test_cookie_header() {
        assert!(cookie_header(&[]).is_none());
        let header = cookie_header(&[("a".to_string(), "1".to_string())]).unwrap();
        assert_eq!(header.to_str().unwrap(), "a=1");
    }
}
