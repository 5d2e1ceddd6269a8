use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Administration CLI for the SSO gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "GATEWAY_URL")]
    url: String,

    /// Bearer token of a user holding the admin role.
    #[arg(short, long, env = "GATEWAY_TOKEN")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered applications
    Apps {
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Register an application
    Register {
        prefix: String,
        host: String,
        #[arg(long)]
        name: Option<String>,
        /// Sub-path reachable without a token (repeatable)
        #[arg(long = "anonymous")]
        anonymous_routes: Vec<String>,
    },
    /// Delete an application by id
    Unregister { id: String },
    /// List roles
    Roles,
    /// Create a role with one allow-rule
    CreateRole {
        name: String,
        #[arg(long = "resource", required = true)]
        resources: Vec<String>,
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,
    },
    /// Grant permissions on resources to an existing role
    Grant {
        role: String,
        #[arg(long = "resource", required = true)]
        resources: Vec<String>,
        #[arg(long = "permission", required = true)]
        permissions: Vec<String>,
    },
    /// Assign roles to a user
    Assign {
        user_id: String,
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// Show the roles held by a user
    UserRoles { user_id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );
    let base = cli.url.trim_end_matches('/');
    let request = |method: Method, path: &str| client.request(method, format!("{base}{path}")).headers(headers.clone());

    let builder = match cli.command {
        Commands::Apps { page, limit } => {
            let mut query = Vec::new();
            if let Some(page) = page {
                query.push(("page", page));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit));
            }
            request(Method::GET, "/applications").query(&query)
        }
        Commands::Register {
            prefix,
            host,
            name,
            anonymous_routes,
        } => request(Method::POST, "/applications").json(&json!({
            "prefix": prefix,
            "host": host,
            "name": name,
            "anonymousRoutes": anonymous_routes,
        })),
        Commands::Unregister { id } => request(Method::DELETE, &format!("/applications/{id}")),
        Commands::Roles => request(Method::GET, "/roles"),
        Commands::CreateRole {
            name,
            resources,
            permissions,
        } => request(Method::POST, "/roles").json(&json!({
            "name": name,
            "allows": [{ "resources": resources, "permissions": permissions }],
        })),
        Commands::Grant {
            role,
            resources,
            permissions,
        } => request(Method::POST, &format!("/roles/{role}/resources")).json(&json!({
            "resources": resources,
            "permissions": permissions,
        })),
        Commands::Assign { user_id, roles } => {
            request(Method::POST, &format!("/users/{user_id}/roles")).json(&json!({ "roles": roles }))
        }
        Commands::UserRoles { user_id } => request(Method::GET, &format!("/users/{user_id}/roles")),
    };

    send(builder).await
}

async fn send(builder: RequestBuilder) -> Result<(), Box<dyn std::error::Error>> {
    let res = builder.send().await?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
