//! Pyroscope render API client

use reqwest::{Client, Response};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{async_trait, base_url, ProfileKind, ProfileSource, TimeWindow};
use crate::error::{Error, Result};
use crate::flamebearer::{self, FlamebearerProfile};

/// Flamebearer render client for a Pyroscope-compatible API
pub struct PyroscopeClient {
    client: Client,
    base_url: Url,
}

impl PyroscopeClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url(url)?,
        })
    }

    async fn check(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                backend: "pyroscope",
                message: format!("HTTP {}: {}", status, body),
            });
        }
        Ok(response)
    }
}

/// Application names from `<app>.<profile type>` series names
fn app_names_from(series_names: &[String]) -> Vec<String> {
    series_names
        .iter()
        .filter_map(|name| match name.rfind('.') {
            Some(dot) if dot > 0 => Some(name[..dot].to_string()),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[async_trait]
impl ProfileSource for PyroscopeClient {
    fn endpoint(&self) -> &str {
        self.base_url.as_str()
    }

    async fn app_names(&self, window: TimeWindow) -> Result<Vec<String>> {
        let url = self.base_url.join("pyroscope/label-values")?;
        let from = window.from.to_string();
        let until = window.until.to_string();

        let response = self
            .client
            .get(url)
            .query(&[
                ("label", "__name__"),
                ("from", from.as_str()),
                ("until", until.as_str()),
            ])
            .send()
            .await?;

        let names: Vec<String> = Self::check(response).await?.json().await?;
        let apps = app_names_from(&names);
        debug!(series = names.len(), apps = apps.len(), "Pyroscope apps discovered");
        Ok(apps)
    }

    async fn render(
        &self,
        app: &str,
        kind: ProfileKind,
        window: TimeWindow,
    ) -> Result<Option<FlamebearerProfile>> {
        let url = self.base_url.join("pyroscope/render")?;
        let query = kind.query_for(app);
        let from = window.from.to_string();
        let until = window.until.to_string();

        let response = self
            .client
            .get(url)
            .query(&[
                ("query", query.as_str()),
                ("from", from.as_str()),
                ("until", until.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let body = Self::check(response).await?.text().await?;
        let profile = flamebearer::parse_render(&body);
        debug!(
            app = %app,
            kind = %kind,
            has_data = profile.is_some(),
            "Pyroscope render finished"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopFunction;
    use mockito::Matcher;

    const RENDER_BODY: &str = r#"{
        "flamebearer": {
            "names": ["total", "com/example/Checkout.total", "java.util.HashMap.get"],
            "levels": [[0, 200, 0, 0], [0, 150, 150, 1, 150, 50, 50, 2]],
            "numTicks": 200,
            "maxSelf": 150
        },
        "metadata": {"units": "samples"}
    }"#;

    #[tokio::test]
    async fn test_render_and_top_functions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pyroscope/render")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "query".into(),
                    r#"process_cpu:cpu:nanoseconds:cpu:nanoseconds{service_name="checkout"}"#.into(),
                ),
                Matcher::UrlEncoded("from".into(), "100".into()),
                Matcher::UrlEncoded("until".into(), "200".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_body(RENDER_BODY)
            .expect(2)
            .create_async()
            .await;

        let client = PyroscopeClient::new(&server.url()).unwrap();
        let window = TimeWindow::new(100, 200);

        let profile = client
            .render("checkout", ProfileKind::Cpu, window)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.total_ticks, 200);

        let top = client
            .top_functions("checkout", ProfileKind::Cpu, 1, window)
            .await
            .unwrap();
        assert_eq!(top, vec![TopFunction::new("com.example.Checkout.total", 75.0)]);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_profile_yields_no_functions() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pyroscope/render")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"flamebearer":{"names":[],"levels":[],"numTicks":0}}"#)
            .create_async()
            .await;

        let client = PyroscopeClient::new(&server.url()).unwrap();
        let top = client
            .top_functions("idle", ProfileKind::Wall, 5, TimeWindow::new(0, 1))
            .await
            .unwrap();
        assert!(top.is_empty());
    }

    #[tokio::test]
    async fn test_app_names_strip_profile_suffix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pyroscope/label-values")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("label".into(), "__name__".into()),
                Matcher::UrlEncoded("from".into(), "10".into()),
                Matcher::UrlEncoded("until".into(), "20".into()),
            ]))
            .with_status(200)
            .with_body(r#"["payments-api.cpu", "payments-api.alloc_in_new_tlab_bytes", "orders-svc.cpu", "nodot", ".hidden"]"#)
            .create_async()
            .await;

        let client = PyroscopeClient::new(&server.url()).unwrap();
        let apps = client.app_names(TimeWindow::new(10, 20)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(apps, vec!["orders-svc".to_string(), "payments-api".to_string()]);
    }

    #[tokio::test]
    async fn test_path_prefixed_base_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/profiles/pyroscope/render")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(RENDER_BODY)
            .create_async()
            .await;

        let client = PyroscopeClient::new(&format!("{}/profiles", server.url())).unwrap();
        let profile = client
            .render("checkout", ProfileKind::Cpu, TimeWindow::new(0, 1))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(profile.is_some());
    }

    #[tokio::test]
    async fn test_server_error_is_backend_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pyroscope/render")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = PyroscopeClient::new(&server.url()).unwrap();
        let err = client
            .render("x", ProfileKind::Alloc, TimeWindow::new(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend { backend: "pyroscope", .. }));
    }
}
