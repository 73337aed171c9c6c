#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use portal_gate::auth::{hash_password, SessionIdentity, TokenService};
use portal_gate::types::Role;
use reqwest::StatusCode;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const COOKIE_NAME: &str = "accessToken";

/// (id, name, email, role, password) of the accounts the server accepts.
pub const USERS: [(&str, &str, &str, &str, &str); 3] = [
    ("c-100", "Casey Client", "casey@client.example", "client", "client-pass"),
    ("a-200", "Ada Admin", "ada@agency.example", "admin", "admin-pass"),
    ("s-300", "Sam Support", "sam@agency.example", "support_admin", "support-pass"),
];

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let users_file = write_users_file(port)?;

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_portal-gate"));
        cmd.env("PORTAL_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("PORTAL_JWT_SECRET", TEST_SECRET)
            .env("PORTAL_USERS_FILE", users_file)
            .env_remove("PORTAL_BACKEND_URL")
            .env_remove("PORTAL_POLICY_FILE")
            .env_remove("PORTAL_COOKIE_NAME")
            .env_remove("PORTAL_TOKEN_TTL_SECS")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline { break; }
            let url = format!("{}/api/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Users file with bcrypt hashes at the lowest cost.
fn write_users_file(port: u16) -> Result<std::path::PathBuf> {
    let mut yaml = String::from("users:\n");
    for (id, name, email, role, password) in USERS {
        let hash = hash_password(password, 4)?;
        yaml.push_str(&format!(
            "  - id: {}\n    name: {}\n    email: {}\n    role: {}\n    password_hash: \"{}\"\n",
            id, name, email, role, hash
        ));
    }
    let path = std::env::temp_dir().join(format!("portal-gate-users-{}.yaml", port));
    std::fs::write(&path, yaml).context("failed to write users file")?;
    Ok(path)
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build http client")
}

pub fn session_cookie(role: Role) -> String {
    let tokens = TokenService::new(TEST_SECRET.as_bytes()).expect("test secret is not empty");
    let token = tokens
        .issue(SessionIdentity::new("it-user", role, "Integration", "it@example.com"), 900)
        .expect("token issue");
    format!("{}={}", COOKIE_NAME, token)
}

/// Value of the `next` query parameter on a login redirect.
pub fn next_param(location: &str) -> Option<String> {
    let url = reqwest::Url::parse(&format!("http://localhost{}", location)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "next")
        .map(|(_, value)| value.into_owned())
}

pub fn location(res: &reqwest::Response) -> String {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Sends the request path verbatim. `reqwest` resolves dot segments before
/// the request leaves the client, so gate checks on such paths go through here.
pub async fn raw_get(server: &TestServer, path: &str, cookie: Option<&str>) -> Result<(u16, Option<String>)> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", server.port)).await?;
    let mut request = format!("GET {} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n", path);
    if let Some(cookie) = cookie {
        request.push_str(&format!("Cookie: {}\r\n", cookie));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let text = String::from_utf8_lossy(&raw);
    let head = text.split("\r\n\r\n").next().unwrap_or_default();

    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .context("response has no status line")?;
    let location = head.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("location")
            .then(|| value.trim().to_string())
    });
    Ok((status, location))
}
