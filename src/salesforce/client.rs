//! Salesforce REST API Client
//!
//! HTTP client for the REST query, sObject and describe endpoints. A
//! session is established lazily on first use, either from a configured
//! access token or through the SOAP `login` call, and reused afterwards.

use super::{ObjectDescription, RecordSource, SalesforceError, SalesforceResult};
use crate::config::SalesforceConfig;
use crate::records::Record;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;

/// Salesforce REST API client
pub struct SalesforceClient {
    client: Client,
    config: SalesforceConfig,
    session: OnceCell<Session>,
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq)]
struct Session {
    instance_url: String,
    access_token: String,
}

impl SalesforceClient {
    /// Create a new client with the given configuration
    pub fn new(config: SalesforceConfig) -> SalesforceResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("sfpm/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            session: OnceCell::new(),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &SalesforceConfig {
        &self.config
    }

    fn data_url(&self, session: &Session, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            session.instance_url, self.config.api_version, path
        )
    }

    /// Return the cached session, logging in on first use
    async fn session(&self) -> SalesforceResult<&Session> {
        self.session.get_or_try_init(|| self.login()).await
    }

    async fn login(&self) -> SalesforceResult<Session> {
        if self.config.uses_access_token() {
            tracing::info!(instance = %self.config.instance_url, "Using access token session");
            return Ok(Session {
                instance_url: self.config.instance_url.trim_end_matches('/').to_string(),
                access_token: self.config.access_token.clone(),
            });
        }

        if !self.config.is_configured() {
            return Err(SalesforceError::NotConfigured(
                "set SF_ACCESS_TOKEN + SF_INSTANCE_URL or SF_USERNAME + SF_PASSWORD".to_string(),
            ));
        }

        let url = format!(
            "https://{}.salesforce.com/services/Soap/u/{}",
            self.config.domain, self.config.api_version
        );
        tracing::info!(username = %self.config.username, %url, "Logging in with password");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(login_envelope(
                &self.config.username,
                &self.config.password,
                &self.config.security_token,
            ))
            .send()
            .await?;

        // Login faults come back as HTTP 500 with a SOAP fault body
        let status = response.status();
        let body = response.text().await?;
        let session = parse_login_response(&body).map_err(|e| match e {
            SalesforceError::Decode(_) if !status.is_success() => SalesforceError::Api {
                status: status.as_u16(),
                message: body.clone(),
            },
            other => other,
        })?;

        tracing::debug!(instance = %session.instance_url, "Login succeeded");
        Ok(session)
    }

    async fn send(&self, request: RequestBuilder, session: &Session) -> SalesforceResult<Response> {
        let response = request.bearer_auth(&session.access_token).send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> SalesforceResult<T> {
        let session = self.session().await?;
        let response = self.send(self.client.get(url), session).await?;
        response
            .json()
            .await
            .map_err(|e| SalesforceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RecordSource for SalesforceClient {
    async fn query_all(&self, soql: &str) -> SalesforceResult<Vec<Record>> {
        let session = self.session().await?;
        tracing::debug!(%soql, "Running query");

        let mut url = self.data_url(session, &format!("query?q={}", urlencoding::encode(soql)));
        let mut records = Vec::new();
        let mut pages = 0usize;

        loop {
            let page: QueryPage = self.get_json(&url).await?;
            pages += 1;
            records.extend(page.records);

            match page.next_records_url {
                Some(next) if !page.done => url = format!("{}{}", session.instance_url, next),
                _ => break,
            }
        }

        tracing::debug!(records = records.len(), pages, "Query complete");
        Ok(records)
    }

    async fn create(&self, object: &str, fields: Record) -> SalesforceResult<String> {
        let session = self.session().await?;
        let url = self.data_url(session, &format!("sobjects/{}/", object));

        let response = self.send(self.client.post(&url).json(&fields), session).await?;
        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| SalesforceError::Decode(e.to_string()))?;

        if !created.success {
            return Err(SalesforceError::Api {
                status: 400,
                message: created.errors.join_messages(),
            });
        }

        tracing::info!(object, id = %created.id, "Record created");
        Ok(created.id)
    }

    async fn update(&self, object: &str, id: &str, fields: Record) -> SalesforceResult<()> {
        let session = self.session().await?;
        let url = self.data_url(session, &format!("sobjects/{}/{}", object, id));

        self.send(self.client.patch(&url).json(&fields), session).await?;
        tracing::info!(object, id, "Record updated");
        Ok(())
    }

    async fn describe(&self, object: &str) -> SalesforceResult<ObjectDescription> {
        let session = self.session().await?;
        let url = self.data_url(session, &format!("sobjects/{}/describe", object));
        self.get_json(&url).await
    }
}

/// Map a non-success response to an error
async fn check_status(response: Response) -> SalesforceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Vec<ApiErrorBody>>(&text)
        .map(|errors| errors.join_messages())
        .unwrap_or(text);

    if status.as_u16() == 401 {
        Err(SalesforceError::Auth(message))
    } else {
        Err(SalesforceError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn login_envelope(username: &str, password: &str, security_token: &str) -> String {
    use quick_xml::escape::escape;
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8" ?>"#,
            r#"<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
            r#"xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:urn="urn:partner.soap.sforce.com">"#,
            r#"<env:Body><urn:login>"#,
            r#"<urn:username>{}</urn:username><urn:password>{}{}</urn:password>"#,
            r#"</urn:login></env:Body></env:Envelope>"#
        ),
        escape(username),
        escape(password),
        escape(security_token)
    )
}

/// Read `sessionId` and `serverUrl` (or a fault) from a SOAP login response
fn parse_login_response(xml: &str) -> SalesforceResult<Session> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut current: Option<Vec<u8>> = None;
    let mut session_id = None;
    let mut server_url = None;
    let mut fault = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => current = Some(start.local_name().as_ref().to_vec()),
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| SalesforceError::Decode(e.to_string()))?
                    .into_owned();
                match current.as_deref() {
                    Some(b"sessionId") => session_id = Some(text),
                    Some(b"serverUrl") => server_url = Some(text),
                    Some(b"faultstring") => fault = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(SalesforceError::Decode(e.to_string())),
            _ => {}
        }
    }

    if let Some(fault) = fault {
        return Err(SalesforceError::Auth(fault));
    }

    match (session_id, server_url) {
        (Some(access_token), Some(server_url)) => {
            let url = Url::parse(&server_url).map_err(|e| SalesforceError::Decode(e.to_string()))?;
            Ok(Session {
                instance_url: url.origin().ascii_serialization(),
                access_token,
            })
        }
        _ => Err(SalesforceError::Decode(
            "login response missing sessionId or serverUrl".to_string(),
        )),
    }
}

// ============================================
// Response DTOs
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    #[serde(default = "default_done")]
    done: bool,
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    next_records_url: Option<String>,
}

fn default_done() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

trait JoinMessages {
    fn join_messages(&self) -> String;
}

impl JoinMessages for Vec<ApiErrorBody> {
    fn join_messages(&self) -> String {
        self.iter()
            .map(|e| match &e.error_code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
