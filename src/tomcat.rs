//! Tomcat manager text API
//!
//! Reloads the deployed IIQ web application through
//! `https://{host}:{port}/manager/text/` using the manager-script account
//! whose password lives in `{SECRETS_HOME}/rpauser.pass`.

use reqwest::blocking::Client;
use tracing::info;

use crate::config::TomcatSettings;
use crate::error::{DeptoolsError, ManagerError};
use crate::validation::read_secret_file;

/// Context path of the IIQ web application
pub const IIQ_CONTEXT_PATH: &str = "/identityiq";

/// Base URL of the manager text interface
pub fn manager_url(host: &str, secure_port: u16) -> String {
    format!("https://{}:{}/manager/text/", host, secure_port)
}

/// Manager account password
pub fn manager_password(settings: &TomcatSettings) -> Result<String, DeptoolsError> {
    Ok(read_secret_file(
        &settings.password_file(),
        "Tomcat manager password",
    )?)
}

/// Ask the manager to reload the application at `context_path`
///
/// Returns the manager's response line.
pub fn reload_webapp(settings: &TomcatSettings, context_path: &str) -> Result<String, DeptoolsError> {
    let password = manager_password(settings)?;
    let base_url = manager_url(&settings.host, settings.secure_port);
    Ok(send_reload(settings, &base_url, &password, context_path)?)
}

/// GET `{base_url}reload?path={context_path}` as the manager user
fn send_reload(
    settings: &TomcatSettings,
    base_url: &str,
    password: &str,
    context_path: &str,
) -> Result<String, ManagerError> {
    let url = format!("{}reload", base_url);
    info!("Reloading {} via {}", context_path, url);

    let client = Client::builder()
        .user_agent(concat!("deptools/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        // The manager runs on this host
        .no_proxy()
        .build()?;

    let response = client
        .get(&url)
        .query(&[("path", context_path)])
        .basic_auth(&settings.manager_user, Some(password))
        .send()?;

    let status = response.status().as_u16();
    let body = response.text()?;

    interpret_response(status, &body)
}

/// The text API answers `OK - ...` or `FAIL - ...` with HTTP 200
pub fn interpret_response(status: u16, body: &str) -> Result<String, ManagerError> {
    let line = body.lines().next().unwrap_or("").trim().to_string();

    if !(200..300).contains(&status) {
        return Err(ManagerError::Http { status, body: line });
    }

    if line.starts_with("OK") {
        Ok(line)
    } else {
        Err(ManagerError::Rejected { body: line })
    }
}
