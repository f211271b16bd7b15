use anyhow::{bail, Context};
use clap::Args;
use serde_json::{json, Map};
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::{utils::output_success, OutputFormat};
use crate::database::models::UserRole;
use crate::permissions::Permission;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Tenant id the session belongs to")]
    pub tenant: Uuid,

    #[arg(long, help = "User id (defaults to a random id)")]
    pub user: Option<Uuid>,

    #[arg(long, help = "Email carried in the claims")]
    pub email: String,

    #[arg(long, default_value = "ADMIN", help = "Built-in role or the name of a tenant role")]
    pub role: String,

    #[arg(long = "permission", help = "Explicit permission claim (repeatable)")]
    pub permissions: Vec<String>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    for p in &args.permissions {
        if p != "*" && Permission::parse(p).is_none() {
            bail!("unknown permission '{}'", p);
        }
    }

    // Built-in roles are sent in their canonical spelling
    let role = UserRole::from_str(&args.role)
        .map(|r| r.as_str().to_string())
        .unwrap_or(args.role);

    let user_id = args.user.unwrap_or_else(Uuid::new_v4);
    let claims = Claims::new(args.tenant, user_id, args.email, role, args.permissions);
    let token = generate_jwt(&claims).context("failed to sign token")?;

    match output_format {
        OutputFormat::Text => println!("{}", token),
        OutputFormat::Json => {
            let mut data = Map::new();
            data.insert("token".into(), json!(token));
            data.insert("userId".into(), json!(user_id));
            data.insert("expiresAt".into(), json!(claims.exp));
            output_success(output_format, "Token generated", Some(data))?;
        }
    }
    Ok(())
}
