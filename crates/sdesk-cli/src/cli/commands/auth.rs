//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use sdesk_core::AuthContext;
use sdesk_core::auth::LOGIN_FAILED;
use sdesk_core::session::mask_token;

use super::api_error;

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads without echo on a terminal; piped input falls back to [`prompt`].
fn prompt_hidden(label: &str) -> Result<String> {
    if io::stdin().is_terminal() {
        return rpassword::prompt_password(format!("{label}: "))
            .context("Failed to read password");
    }
    prompt(label)
}

pub async fn login(
    auth: &AuthContext,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    if let Some(existing) = auth.principal() {
        println!("Sessão atual de {} será substituída.", existing.email);
    }

    let email = match email {
        Some(email) => email,
        None => prompt("E-mail")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_hidden("Senha")?,
    };

    let principal = auth
        .login(&email, &password)
        .await
        .map_err(|err| api_error(&err, LOGIN_FAILED))?;

    println!("✓ Bem-vindo, {} ({})", principal.name, principal.role.label());
    println!(
        "  Sessão salva em: {}",
        auth.session().store().path().display()
    );
    Ok(())
}

pub async fn logout(auth: &AuthContext, remote: bool) -> Result<()> {
    if !auth.session().is_authenticated() {
        println!("Nenhuma sessão ativa.");
        return Ok(());
    }

    if remote {
        auth.logout_remote().await?;
    } else {
        auth.logout()?;
    }
    println!("✓ Sessão encerrada.");
    Ok(())
}

pub fn whoami(auth: &AuthContext) -> Result<()> {
    let principal = super::require_principal(auth)?;

    println!("{} <{}>", principal.name, principal.email);
    println!("  Perfil:  {} ({})", principal.role.label(), principal.role);
    if let Some(company_id) = principal.company_id {
        println!("  Empresa: #{company_id}");
    }
    println!("  Token:   {}", mask_token(&principal.access_token));
    if principal.is_expired() {
        println!("  Token expirado; será renovado na próxima requisição.");
    } else if principal.expires_in > 0 {
        println!(
            "  Expira:  {}",
            principal.expires_at().format("%d/%m/%Y %H:%M UTC")
        );
    }
    Ok(())
}

pub async fn forgot_password(auth: &AuthContext, email: &str) -> Result<()> {
    let message = auth
        .forgot_password(email)
        .await
        .map_err(|err| api_error(&err, "Erro ao solicitar redefinição de senha"))?;
    println!("{message}");
    Ok(())
}
