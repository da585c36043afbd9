//! Session commands: login, logout, whoami, refresh, register.

use clap::Args;
use serde::Serialize;

use logiflow_auth::{RegistrationForm, landing_path};
use logiflow_core::error::AppError;
use logiflow_entity::user::{User, UserRole};

use super::Context;
use crate::output::{self, OutputFormat};

/// Arguments for `login`
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Cédula or username (will prompt if not provided)
    pub username: Option<String>,
    /// Password (will prompt if not provided)
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Arguments for `register`
#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Cédula (will prompt if not provided)
    #[arg(long)]
    pub cedula: Option<String>,
    /// Full name (will prompt if not provided)
    #[arg(long)]
    pub nombre: Option<String>,
    /// Role: CLIENTE, REPARTIDOR, SUPERVISOR, GERENTE, ADMIN
    #[arg(long, default_value = "CLIENTE")]
    pub rol: String,
    /// Password (will prompt twice if not provided)
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct WhoAmI<'a> {
    #[serde(flatten)]
    user: &'a User,
    dashboard: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_expires_at: Option<String>,
}

fn prompt_text(prompt: &str) -> Result<String, AppError> {
    dialoguer::Input::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

/// `login`
pub async fn login(args: &LoginArgs, ctx: &Context, format: OutputFormat) -> Result<(), AppError> {
    let username = match &args.username {
        Some(u) => u.clone(),
        None => prompt_text("Cédula")?,
    };
    let password = match &args.password {
        Some(p) => p.clone(),
        None => dialoguer::Password::new()
            .with_prompt("Contraseña")
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
    };

    let user = ctx.session.login(&username, &password).await?;
    output::print_success(&format!(
        "Signed in as {} ({})",
        user.display_name,
        user.role.display_name()
    ));
    print_user(ctx, &user, format);
    Ok(())
}

/// `logout`
pub async fn logout(ctx: &Context) -> Result<(), AppError> {
    if !ctx.session.is_authenticated() {
        output::print_warning("No stored session");
    }
    ctx.session.logout().await;
    output::print_success("Signed out");
    Ok(())
}

/// `whoami`
pub fn whoami(ctx: &Context, format: OutputFormat) -> Result<(), AppError> {
    let user = ctx.require_user()?;
    print_user(ctx, &user, format);
    Ok(())
}

fn print_user(ctx: &Context, user: &User, format: OutputFormat) {
    let claims = ctx.session.claims();
    if claims.as_ref().is_some_and(|c| c.is_expired()) {
        output::print_warning("Access token has expired; run `logiflow refresh`");
    }
    output::print_item(
        &WhoAmI {
            user,
            dashboard: landing_path(user.role),
            token_expires_at: claims.and_then(|c| c.expires_at()).map(|at| at.to_rfc3339()),
        },
        format,
    );
}

/// `refresh`
pub async fn refresh(ctx: &Context) -> Result<(), AppError> {
    ctx.session.refresh().await?;
    let ttl = ctx
        .session
        .claims()
        .map(|c| c.remaining_ttl_seconds())
        .unwrap_or_default();
    output::print_success(&format!("Access token refreshed (valid for {ttl}s)"));
    Ok(())
}

/// `register`
pub async fn register(args: &RegisterArgs, ctx: &Context) -> Result<(), AppError> {
    let rol: UserRole = args.rol.parse()?;
    let cedula = match &args.cedula {
        Some(c) => c.clone(),
        None => prompt_text("Cédula")?,
    };
    let nombre = match &args.nombre {
        Some(n) => n.clone(),
        None => prompt_text("Nombre completo")?,
    };
    let (password, confirm_password) = match &args.password {
        Some(p) => (p.clone(), p.clone()),
        None => {
            let password = dialoguer::Password::new()
                .with_prompt("Contraseña")
                .interact()
                .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
            let confirm = dialoguer::Password::new()
                .with_prompt("Confirmar contraseña")
                .interact()
                .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
            (password, confirm)
        }
    };

    let form = RegistrationForm {
        cedula,
        nombre,
        password,
        confirm_password,
        rol,
    };
    ctx.session.register(&form).await?;
    output::print_success("Account created. Sign in with `logiflow login`.");
    Ok(())
}
