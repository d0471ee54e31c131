// ABOUTME: Interactive authorization helpers consumed by `imgup setup`
// ABOUTME: OAuth1 PIN flows, SmugMug album discovery and the GoToSocial OAuth2 code flow

use crate::constants::urls;
use crate::error::{ImgupError, Result};
use crate::http;
use crate::oauth1::{OAuth1Signer, TokenPair};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use secrecy::SecretString;
use serde_json::Value;

use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use tiny_http::{Header, Response, Server};
use url::Url;

pub const REDIRECT_PORT: u16 = 8888;
const REDIRECT_PATH: &str = "/callback";

/// A request token and the page where the user approves it.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub request_token: TokenPair,
    pub authorize_url: String,
}

/// OAuth 1.0a out-of-band (PIN) authorization.
pub struct PinFlow {
    consumer_key: String,
    consumer_secret: SecretString,
    request_token_url: String,
    authorize_url: String,
    access_token_url: String,
    authorize_params: &'static [(&'static str, &'static str)],
    http: reqwest::Client,
}

impl PinFlow {
    pub fn smugmug(consumer_key: &str, consumer_secret: SecretString) -> Result<Self> {
        Ok(Self {
            consumer_key: consumer_key.to_string(),
            consumer_secret,
            request_token_url: urls::SMUGMUG_REQUEST_TOKEN.to_string(),
            authorize_url: urls::SMUGMUG_AUTHORIZE.to_string(),
            access_token_url: urls::SMUGMUG_ACCESS_TOKEN.to_string(),
            authorize_params: &[("Access", "Full"), ("Permissions", "Modify")],
            http: http::client()?,
        })
    }

    pub fn flickr(api_key: &str, api_secret: SecretString) -> Result<Self> {
        Ok(Self {
            consumer_key: api_key.to_string(),
            consumer_secret: api_secret,
            request_token_url: urls::FLICKR_REQUEST_TOKEN.to_string(),
            authorize_url: urls::FLICKR_AUTHORIZE.to_string(),
            access_token_url: urls::FLICKR_ACCESS_TOKEN.to_string(),
            authorize_params: &[("perms", "write")],
            http: http::client()?,
        })
    }

    pub fn with_endpoints(
        mut self,
        request_token_url: impl Into<String>,
        authorize_url: impl Into<String>,
        access_token_url: impl Into<String>,
    ) -> Self {
        self.request_token_url = request_token_url.into();
        self.authorize_url = authorize_url.into();
        self.access_token_url = access_token_url.into();
        self
    }

    fn signer(&self) -> OAuth1Signer {
        OAuth1Signer::new(&self.consumer_key, self.consumer_secret.clone())
    }

    /// Fetch a request token and build the approval URL.
    pub async fn begin(&self) -> Result<PendingAuthorization> {
        let request_token = self
            .signer()
            .request_token(&self.http, &self.request_token_url)
            .await
            .map_err(explain_signature_problem)?;

        let mut url = Url::parse(&self.authorize_url).map_err(|e| {
            ImgupError::Configuration(format!("Invalid authorize URL {}: {e}", self.authorize_url))
        })?;
        url.query_pairs_mut()
            .append_pair("oauth_token", &request_token.token);
        for (key, value) in self.authorize_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(PendingAuthorization {
            request_token,
            authorize_url: url.to_string(),
        })
    }

    /// Trade the approved request token and verifier for an access token.
    pub async fn complete(
        &self,
        pending: &PendingAuthorization,
        verifier: &str,
    ) -> Result<TokenPair> {
        self.signer()
            .with_token(
                &pending.request_token.token,
                pending.request_token.secret.clone(),
            )
            .access_token(&self.http, &self.access_token_url, verifier)
            .await
            .map_err(explain_signature_problem)
    }
}

fn explain_signature_problem(err: ImgupError) -> ImgupError {
    match err {
        ImgupError::Protocol { message, .. } if message.contains("signature_invalid") => {
            ImgupError::Authorization(format!(
                "OAuth signature invalid ({message}). The key or secret may be wrong, or the system clock out of sync"
            ))
        }
        other => other,
    }
}

/// Accept either a bare PIN or a pasted callback URL carrying `oauth_verifier`.
pub fn extract_verifier(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "oauth_verifier")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty()),
        Err(_) if !input.contains(char::is_whitespace) => Some(input.to_string()),
        Err(_) => None,
    }
}

/// A SmugMug album the user can upload into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub name: String,
    pub key: String,
}

/// Signed read access to the SmugMug API for album discovery.
pub struct SmugMugApi {
    signer: OAuth1Signer,
    api_base: String,
    http: reqwest::Client,
}

impl SmugMugApi {
    pub fn new(
        consumer_key: &str,
        consumer_secret: SecretString,
        access: &TokenPair,
    ) -> Result<Self> {
        Ok(Self {
            signer: OAuth1Signer::new(consumer_key, consumer_secret)
                .with_token(&access.token, access.secret.clone()),
            api_base: urls::SMUGMUG_API_BASE.to_string(),
            http: http::client()?,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(&self, path_and_query: &str, context: &'static str) -> Result<Value> {
        let url = format!("{}{}", self.api_base, path_and_query);
        let auth = self.signer.authorization_header(&Method::GET, &url, &[])?;
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        Ok(http::ensure_success(response, context).await?.json().await?)
    }

    /// URI of the authenticated user's root node.
    pub async fn root_node(&self) -> Result<String> {
        let user = self
            .get_json("/api/v2!authuser?_expand=Uris", "SmugMug user lookup")
            .await?;
        user["Response"]["User"]["Uris"]["Node"]["Uri"]
            .as_str()
            .map(String::from)
            .ok_or(ImgupError::MissingField {
                context: "SmugMug user lookup",
                field: "Node URI",
            })
    }

    /// Albums directly under the root node.
    pub async fn albums(&self) -> Result<Vec<Album>> {
        let root = self.root_node().await?;
        let children = self
            .get_json(
                &format!("{root}!children?_expand=Album"),
                "SmugMug album listing",
            )
            .await?;
        Ok(parse_albums(&children))
    }
}

fn parse_albums(children: &Value) -> Vec<Album> {
    children["Response"]["Node"]
        .as_array()
        .map(|nodes| {
            nodes
                .iter()
                .filter(|n| n["Type"] == "Album")
                .filter_map(|n| {
                    let key = n["Uris"]["Album"]["Uri"].as_str()?.rsplit('/').next()?;
                    let name = n["Name"].as_str().map(str::trim).unwrap_or_default();
                    Some(Album {
                        name: if name.is_empty() { "Untitled" } else { name }.to_string(),
                        key: key.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// Type alias for the OAuth client with all its type state parameters
type ConfiguredClient = oauth2::Client<
    oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
    oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Authorization-code flow against a GoToSocial instance with a local
/// callback listener. Blocking: run it off the async runtime.
pub struct GoToSocialAuth {
    client: ConfiguredClient,
    http_client: reqwest::blocking::Client,
}

impl GoToSocialAuth {
    pub fn new(instance_url: &str, client_id: String, client_secret: SecretString) -> Result<Self> {
        use secrecy::ExposeSecret;

        if client_id.trim().is_empty() {
            return Err(ImgupError::Configuration("Client ID is empty".to_string()));
        }

        let config_error =
            |e: url::ParseError| ImgupError::Configuration(format!("Invalid OAuth URL: {e}"));
        let auth_url = AuthUrl::new(format!("{instance_url}/oauth/authorize")).map_err(config_error)?;
        let token_url = TokenUrl::new(format!("{instance_url}/oauth/token")).map_err(config_error)?;

        let client = BasicClient::new(ClientId::new(client_id))
            .set_client_secret(ClientSecret::new(client_secret.expose_secret().to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(
                RedirectUrl::new(redirect_uri()).map_err(config_error)?,
            );

        // Token endpoint must not be followed through redirects
        let http_client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ImgupError::Configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            http_client,
        })
    }

    pub fn authorize_url(&self) -> (Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("read".into()))
            .add_scope(Scope::new("write".into()))
            .url()
    }

    /// Open the browser, wait for the callback and exchange the code.
    pub fn login(&self) -> Result<SecretString> {
        let (auth_url, csrf_token) = self.authorize_url();

        let server = Server::http(("127.0.0.1", REDIRECT_PORT)).map_err(|e| {
            ImgupError::Authorization(format!(
                "Failed to start callback server on port {REDIRECT_PORT}: {e}"
            ))
        })?;

        if let Err(e) = open::that(auth_url.as_str()) {
            log::warn!("Could not open browser ({e}); visit {auth_url} manually");
        }
        log::info!("Waiting for callback on {}", redirect_uri());

        let code = wait_for_code(&server, csrf_token.secret())?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request(&self.http_client)
            .map_err(|e| ImgupError::Authorization(format!("Token exchange failed: {e}")))?;

        Ok(SecretString::from(token.access_token().secret().to_string()))
    }
}

pub fn redirect_uri() -> String {
    format!("http://localhost:{REDIRECT_PORT}{REDIRECT_PATH}")
}

/// Serve requests until the OAuth callback arrives. Returns the code once the
/// state matches.
pub fn wait_for_code(server: &Server, expected_state: &str) -> Result<String> {
    for request in server.incoming_requests() {
        let request_url = request.url().to_string();

        if !request_url.starts_with(REDIRECT_PATH) {
            let _ = request.respond(Response::empty(404));
            continue;
        }

        let params = Url::parse(&format!("http://localhost{request_url}"))
            .map_err(|_| ImgupError::Authorization("Invalid callback URL".to_string()))?;
        let param = |name: &str| {
            params
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        let (body, outcome) = match (param("code"), param("state")) {
            (Some(code), Some(state)) if state == expected_state => (
                "Authorization received! You can close this window.",
                Ok(code),
            ),
            (_, Some(_)) => (
                "Invalid state parameter!",
                Err(ImgupError::Authorization("OAuth state mismatch".to_string())),
            ),
            _ => (
                "Missing OAuth parameters!",
                Err(ImgupError::Authorization(
                    param("error").unwrap_or_else(|| "Missing OAuth parameter".to_string()),
                )),
            ),
        };

        let header = Header::from_bytes(&b"Content-Type"[..], &b"text/plain; charset=utf-8"[..])
            .map_err(|_| ImgupError::Authorization("Failed to create HTTP headers".to_string()))?;
        if let Err(e) = request.respond(Response::from_string(body).with_header(header)) {
            log::debug!("Failed to answer callback: {e}");
        }
        return outcome;
    }

    Err(ImgupError::Authorization(
        "Callback server stopped before authorization completed".to_string(),
    ))
}
