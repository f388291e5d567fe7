//! `hd login`, `hd register`, `hd logout`, `hd whoami`.

use std::io::{self, Write};

use clap::Args;
use helpdesk_core::error::ErrorCode;
use helpdesk_core::model::User;
use helpdesk_core::session::Registration;

use crate::context::AppContext;
use crate::output::{CliError, Renderable, pretty_kv, render_item, render_success};
use crate::validate;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email.
    pub email: String,

    /// Account password.
    #[arg(long, short = 'p')]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Email for the new account.
    pub email: String,

    /// Password for the new account.
    #[arg(long, short = 'p')]
    pub password: String,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Optional department.
    #[arg(long)]
    pub department: Option<String>,
}

/// Account view for all output modes. Never carries the credential.
struct AccountView<'a>(&'a User);

impl Renderable for AccountView<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let user = self.0;
        pretty_kv(w, "Name", &user.name)?;
        pretty_kv(w, "Email", &user.email)?;
        pretty_kv(w, "Role", user.role.as_str())?;
        if let Some(department) = &user.department {
            pretty_kv(w, "Department", department)?;
        }
        pretty_kv(w, "ID", &user.id)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, self.0)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let user = self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            user.id,
            user.email,
            user.name,
            user.role,
            user.department.as_deref().unwrap_or("-")
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "EMAIL", "NAME", "ROLE", "DEPARTMENT"]
    }
}

pub fn run_login(args: &LoginArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut session = ctx.session();
    if !session.login(args.email.trim(), &args.password) {
        return Err(ctx.fail(CliError::from_code(
            ErrorCode::AuthRejected,
            format!("login failed for '{}'", args.email.trim()),
        )));
    }
    match session.current() {
        Some(user) => render_item(&AccountView(user), ctx.output)?,
        None => return Err(ctx.fail(CliError::from_code(ErrorCode::InternalUnexpected, "session lost"))),
    }
    Ok(())
}

pub fn run_register(args: &RegisterArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let email = args.email.trim();
    if let Err(e) = validate::validate_email(email) {
        return Err(ctx.fail(e.to_cli_error()));
    }
    if args.name.trim().is_empty() {
        return Err(ctx.fail(CliError::with_details(
            "name must not be empty",
            "pass --name \"Your Name\"",
            ErrorCode::InvalidText.code(),
        )));
    }

    let mut session = ctx.session();
    let accepted = session.register(Registration {
        email: email.to_string(),
        password: args.password.clone(),
        name: args.name.trim().to_string(),
        department: args.department.clone(),
    });
    if !accepted {
        return Err(ctx.fail(CliError::from_code(
            ErrorCode::EmailTaken,
            format!("'{email}' is already registered"),
        )));
    }
    match session.current() {
        Some(user) => render_item(&AccountView(user), ctx.output)?,
        None => return Err(ctx.fail(CliError::from_code(ErrorCode::InternalUnexpected, "session lost"))),
    }
    Ok(())
}

pub fn run_logout(ctx: &AppContext) -> anyhow::Result<()> {
    let mut session = ctx.session();
    let was = session.current().map(|u| u.email.clone());
    session.logout();
    match was {
        Some(email) => render_success(ctx.output, &format!("logged out {email}")),
        None => render_success(ctx.output, "no active session"),
    }
}

pub fn run_whoami(ctx: &AppContext) -> anyhow::Result<()> {
    let user = ctx.require_actor()?;
    render_item(&AccountView(&user), ctx.output)?;
    Ok(())
}
