use std::io::{self, Write};

use anyhow::{Context, Result};
use crmdesk_core::api::{ApiClient, ResourceApi};
use crmdesk_core::models::Credentials;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cli::{Command, ResourceAction};
use crate::config::Config;

pub async fn run(client: &ApiClient, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => login(client, email).await,
        Command::Register { data } => {
            let body: Value = client.auth().register(&parse_data(&data)?).await?;
            print_json(&body)
        }
        Command::Logout => {
            let body: Value = client.auth().logout().await?;
            println!("Signed out.");
            print_json(&body)
        }
        Command::Me => print_json(&client.auth().me::<Value>().await?),
        Command::ResetPassword { data } => {
            let body: Value = client.auth().reset_password(&parse_data(&data)?).await?;
            print_json(&body)
        }
        Command::Clients { action } => resource(client.clients(), action).await,
        Command::Invoices { action } => resource(client.invoices(), action).await,
        Command::Dashboard => dashboard(client).await,
    }
}

async fn resource(api: ResourceApi<'_>, action: ResourceAction) -> Result<()> {
    let body: Value = match action {
        ResourceAction::List => api.get_all().await?,
        ResourceAction::Get { id } => api.get_by_id(&id).await?,
        ResourceAction::Create { data } => api.create(&parse_data(&data)?).await?,
        ResourceAction::Update { id, data } => api.update(&id, &parse_data(&data)?).await?,
        ResourceAction::Delete { id } => api.delete(&id).await?,
    };
    print_json(&body)
}

async fn login(client: &ApiClient, email: Option<String>) -> Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    let email = match email {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    if email.is_empty() {
        return Err(anyhow::anyhow!("Email required"));
    }
    let password = rpassword::prompt_password("Password: ")?;

    let body: Value = client.auth().login(&Credentials::new(&email, password)).await?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    if client.session().is_authenticated() {
        info!("Login successful");
        println!("Login successful!");
    } else {
        println!("Login accepted, but the response carried no token.");
    }
    print_json(&body)
}

async fn dashboard(client: &ApiClient) -> Result<()> {
    let auth = client.auth();
    let clients = client.clients();
    let invoices = client.invoices();

    let (me, clients, invoices) = futures::try_join!(
        auth.me::<Value>(),
        clients.get_all::<Value>(),
        invoices.get_all::<Value>()
    )?;

    print_json(&json!({
        "me": me,
        "clients": clients,
        "invoices": invoices,
    }))
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = email.trim();
    Ok(match (email.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => email.to_string(),
    })
}

fn parse_data(data: &str) -> Result<Value> {
    serde_json::from_str(data).context("--data must be valid JSON")
}

fn print_json(body: &Value) -> Result<()> {
    if !body.is_null() {
        println!("{}", serde_json::to_string_pretty(body)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crmdesk_core::auth::MemoryTokenStore;
    use crmdesk_core::{ApiError, ClientConfig, Session};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ApiClient {
        let session = Session::new(Arc::new(MemoryTokenStore::with_token("abc123")));
        ApiClient::new(ClientConfig::default().with_base_url(server.uri()), session)
            .expect("client builds")
    }

    async fn mount(server: &MockServer, verb: &str, route: &str, template: ResponseTemplate) {
        Mock::given(method(verb))
            .and(path(route))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(template)
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_data() {
        assert_eq!(parse_data(r#"{"name":"Acme"}"#).unwrap(), json!({"name": "Acme"}));
        assert!(parse_data("name=Acme").is_err());
    }

    #[tokio::test]
    async fn test_resource_actions_hit_their_endpoints() {
        let mock_server = MockServer::start().await;
        let ok = || ResponseTemplate::new(200).set_body_json(json!({"ok": true}));
        mount(&mock_server, "GET", "/clients", ok()).await;
        mount(&mock_server, "GET", "/clients/42", ok()).await;
        mount(&mock_server, "PUT", "/clients/42", ok()).await;
        mount(&mock_server, "DELETE", "/clients/42", ResponseTemplate::new(204)).await;
        Mock::given(method("POST"))
            .and(path("/clients"))
            .and(body_json(json!({"name": "Acme"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let actions = [
            ResourceAction::List,
            ResourceAction::Get { id: "42".into() },
            ResourceAction::Create { data: r#"{"name":"Acme"}"#.into() },
            ResourceAction::Update { id: "42".into(), data: r#"{"name":"Acme Ltd"}"#.into() },
            ResourceAction::Delete { id: "42".into() },
        ];
        for action in actions {
            resource(client.clients(), action).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_invoices_command_routes_to_invoices() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "GET",
            "/invoices/7",
            ResponseTemplate::new(200).set_body_json(json!({"id": 7})),
        )
        .await;

        let client = client_for(&mock_server);
        let command = Command::Invoices {
            action: ResourceAction::Get { id: "7".into() },
        };
        run(&client, command).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_data_is_rejected_before_sending() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let action = ResourceAction::Create { data: "name=Acme".into() };
        assert!(resource(client.invoices(), action).await.is_err());
    }

    #[tokio::test]
    async fn test_dashboard_fetches_all_three_concurrently() {
        let mock_server = MockServer::start().await;
        let delay = Duration::from_millis(300);
        for (route, body) in [
            ("/me", json!({"id": 1})),
            ("/clients", json!([{"id": 2}])),
            ("/invoices", json!([{"id": 3}])),
        ] {
            mount(
                &mock_server,
                "GET",
                route,
                ResponseTemplate::new(200).set_body_json(body).set_delay(delay),
            )
            .await;
        }

        let client = client_for(&mock_server);
        let started = std::time::Instant::now();
        dashboard(&client).await.unwrap();

        // Sequential calls would take at least three delays
        assert!(started.elapsed() < delay * 3, "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn test_dashboard_fails_when_any_call_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/invoices"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = dashboard(&client).await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().expect("API error");
        assert_eq!(api_error.status(), Some(500));
    }
}
