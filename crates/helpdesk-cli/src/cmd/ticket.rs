//! `hd ticket`: open, triage, and discuss service-desk tickets.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use helpdesk_core::error::ErrorCode;
use helpdesk_core::model::{Category, NewTicket, Status, Ticket, TicketComment, TicketPriority, User};
use helpdesk_core::store::{TicketStore, TicketUpdate, UpdateOutcome};
use helpdesk_core::view::{self, TicketQuery, TicketStats};
use serde::Serialize;
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::output::{
    CliError, Renderable, pretty_kv, pretty_rule, pretty_section, render_item,
    render_list, render_mode,
};
use crate::validate;

const ACCESS_DENIED: &str = "Access Denied: You don't have permission to access this page.";

#[derive(Args, Debug)]
pub struct TicketArgs {
    #[command(subcommand)]
    pub command: TicketCommand,
}

#[derive(Subcommand, Debug)]
pub enum TicketCommand {
    #[command(
        about = "Open a new ticket",
        after_help = "EXAMPLES:\n    # Report a hardware fault\n    hd ticket create --title \"Printer broken\" --description \"Cannot print since this morning\" --category hardware --priority high"
    )]
    Create(CreateArgs),

    #[command(
        about = "List visible tickets",
        long_about = "List tickets you can see (all of them for admins), newest first. \
                      Search matches title or description; the other filters must all match.",
        after_help = "EXAMPLES:\n    # Open tickets only\n    hd ticket list --status open\n\n    # Search, machine-readable\n    hd ticket list --search email --json"
    )]
    List(ListArgs),

    #[command(
        about = "Show one ticket with its comments",
        after_help = "EXAMPLES:\n    hd ticket show lrlwev40-x1y2"
    )]
    Show(ShowArgs),

    #[command(
        about = "Edit title, description or category",
        after_help = "EXAMPLES:\n    hd ticket edit lrlwev40-x1y2 --title \"Printer on 3rd floor broken\""
    )]
    Edit(EditArgs),

    #[command(
        about = "Change ticket status (admin)",
        after_help = "EXAMPLES:\n    hd ticket status lrlwev40-x1y2 in-progress\n    hd ticket status lrlwev40-x1y2 resolved"
    )]
    Status(StatusArgs),

    #[command(
        about = "Change ticket priority (admin)",
        after_help = "EXAMPLES:\n    hd ticket priority lrlwev40-x1y2 critical"
    )]
    Priority(PriorityArgs),

    #[command(
        about = "Assign or unassign a ticket (admin)",
        after_help = "EXAMPLES:\n    # Assign by user id or email\n    hd ticket assign lrlwev40-x1y2 admin@company.com\n\n    # Clear the assignee\n    hd ticket assign lrlwev40-x1y2 --clear"
    )]
    Assign(AssignArgs),

    #[command(
        about = "Add a comment to a ticket",
        after_help = "EXAMPLES:\n    hd ticket comment lrlwev40-x1y2 \"Power LED is off\"\n\n    # Admin-only note\n    hd ticket comment lrlwev40-x1y2 \"Replace PSU\" --internal"
    )]
    Comment(CommentArgs),

    #[command(about = "Ticket counts by status and priority")]
    Stats,

    #[command(about = "Counts plus the most recent tickets")]
    Dashboard,

    #[command(about = "Admin panel: counts, recent activity, category breakdown")]
    Admin,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short summary (up to 100 characters).
    #[arg(long)]
    pub title: String,

    /// What is wrong (up to 1000 characters).
    #[arg(long)]
    pub description: String,

    /// hardware, software, network, access, email or other.
    #[arg(long, default_value_t = Category::Other)]
    pub category: Category,

    /// low, medium, high or critical.
    #[arg(long, default_value_t = TicketPriority::Medium)]
    pub priority: TicketPriority,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive text to find in title or description.
    #[arg(long, short = 's')]
    pub search: Option<String>,

    #[arg(long)]
    pub status: Option<Status>,

    #[arg(long)]
    pub priority: Option<TicketPriority>,

    #[arg(long)]
    pub category: Option<Category>,
}

impl ListArgs {
    fn query(&self) -> TicketQuery {
        TicketQuery {
            search: self.search.as_deref().unwrap_or("").trim().to_string(),
            status: self.status,
            priority: self.priority,
            category: self.category,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<Category>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub id: String,
    /// open, in-progress, pending, resolved or closed.
    pub status: Status,
}

#[derive(Args, Debug)]
pub struct PriorityArgs {
    pub id: String,
    pub priority: TicketPriority,
}

#[derive(Args, Debug)]
pub struct AssignArgs {
    pub id: String,

    /// User id or email of the assignee.
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    pub assignee: Option<String>,

    /// Remove the current assignee.
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub id: String,

    pub text: String,

    /// Post as an internal note (admins only).
    #[arg(long)]
    pub internal: bool,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// One line per ticket in lists.
struct TicketRow<'a>(&'a Ticket);

impl Renderable for TicketRow<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let t = self.0;
        writeln!(w, "[{}] {}", t.id, t.title)?;
        writeln!(
            w,
            "    {} · {} · {} · opened {}",
            t.status.as_str(),
            t.priority,
            t.category.label(),
            timestamp(&t.created_at)
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, self.0)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let t = self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            t.id,
            t.status,
            t.priority,
            t.category,
            t.assigned_to.as_deref().unwrap_or("-"),
            t.title
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "STATUS", "PRIORITY", "CATEGORY", "ASSIGNEE", "TITLE"]
    }
}

/// A ticket with only the comments the viewer may read.
struct TicketDetail(Ticket);

impl TicketDetail {
    fn for_viewer(ticket: &Ticket, viewer: &User) -> Self {
        let comments = view::visible_comments(ticket, Some(viewer))
            .into_iter()
            .cloned()
            .collect();
        Self(Ticket {
            comments,
            ..ticket.clone()
        })
    }
}

impl Renderable for TicketDetail {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let t = &self.0;
        pretty_section(w, &format!("{} {}", t.id, t.title))?;
        pretty_kv(w, "Status", t.status.as_str())?;
        pretty_kv(w, "Priority", t.priority.as_str())?;
        pretty_kv(w, "Category", t.category.label())?;
        pretty_kv(w, "Owner", &t.user_id)?;
        pretty_kv(w, "Assignee", t.assigned_to.as_deref().unwrap_or("-"))?;
        pretty_kv(w, "Created", timestamp(&t.created_at))?;
        pretty_kv(w, "Updated", timestamp(&t.updated_at))?;
        if let Some(resolved) = &t.resolved_at {
            pretty_kv(w, "Resolved", timestamp(resolved))?;
        }
        writeln!(w)?;
        writeln!(w, "{}", t.description)?;
        writeln!(w)?;
        pretty_section(w, &format!("Comments ({})", t.comments.len()))?;
        for comment in &t.comments {
            CommentView(comment).render_human(w)?;
        }
        Ok(())
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, &self.0)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        TicketRow(&self.0).render_table(w)?;
        for comment in &self.0.comments {
            writeln!(
                w,
                "#\t{}\t{}\t{}\t{}",
                comment.id,
                comment.user_name,
                if comment.is_internal { "internal" } else { "public" },
                comment.content.replace('\n', " ")
            )?;
        }
        Ok(())
    }

    fn table_headers() -> &'static [&'static str] {
        TicketRow::table_headers()
    }
}

struct CommentView<'a>(&'a TicketComment);

impl Renderable for CommentView<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let c = self.0;
        let badge = if c.is_internal { " [internal]" } else { "" };
        writeln!(w, "{}{} · {}", c.user_name, badge, timestamp(&c.created_at))?;
        for line in c.content.lines() {
            writeln!(w, "  {line}")?;
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, self.0)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let c = self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            c.id,
            c.ticket_id,
            if c.is_internal { "internal" } else { "public" },
            c.content.replace('\n', " ")
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "TICKET", "VISIBILITY", "CONTENT"]
    }
}

fn write_stats_text(stats: &TicketStats, w: &mut dyn Write) -> io::Result<()> {
    for (key, value) in stats_rows(stats) {
        writeln!(w, "{key}\t{value}")?;
    }
    Ok(())
}

fn write_stats_pretty(stats: &TicketStats, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Tickets")?;
    for (key, value) in stats_rows(stats) {
        pretty_kv(w, key, value.to_string())?;
    }
    Ok(())
}

const fn stats_rows(stats: &TicketStats) -> [(&'static str, usize); 8] {
    [
        ("total", stats.total),
        ("open", stats.open),
        ("in-progress", stats.in_progress),
        ("pending", stats.pending),
        ("resolved", stats.resolved),
        ("closed", stats.closed),
        ("critical", stats.critical),
        ("high", stats.high),
    ]
}

#[derive(Serialize)]
struct Dashboard<'a> {
    stats: TicketStats,
    recent: Vec<&'a Ticket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<CategoryCount>>,
}

#[derive(Serialize)]
struct CategoryCount {
    category: Category,
    count: usize,
}

fn write_dashboard_text(dash: &Dashboard<'_>, w: &mut dyn Write) -> io::Result<()> {
    write_stats_text(&dash.stats, w)?;
    if let Some(categories) = &dash.categories {
        for c in categories {
            writeln!(w, "category:{}\t{}", c.category, c.count)?;
        }
    }
    if !dash.recent.is_empty() {
        writeln!(w, "{}", TicketRow::table_headers().join("\t"))?;
    }
    for ticket in &dash.recent {
        TicketRow(ticket).render_table(w)?;
    }
    Ok(())
}

fn write_dashboard_pretty(dash: &Dashboard<'_>, w: &mut dyn Write) -> io::Result<()> {
    write_stats_pretty(&dash.stats, w)?;
    writeln!(w)?;
    if let Some(categories) = &dash.categories {
        pretty_section(w, "By category")?;
        for c in categories {
            pretty_kv(w, c.category.label(), c.count.to_string())?;
        }
        writeln!(w)?;
    }
    pretty_section(w, "Recent tickets")?;
    if dash.recent.is_empty() {
        writeln!(w, "No tickets yet.")?;
    }
    for ticket in &dash.recent {
        TicketRow(ticket).render_human(w)?;
    }
    pretty_rule(w)
}

fn outcome_error(outcome: UpdateOutcome, id: &str) -> Option<CliError> {
    let (code, message) = match outcome {
        UpdateOutcome::Applied => return None,
        UpdateOutcome::NotFound => (ErrorCode::TicketNotFound, format!("ticket '{id}' not found")),
        UpdateOutcome::NoSession => (ErrorCode::NotLoggedIn, "not logged in".to_string()),
        UpdateOutcome::Forbidden => (
            ErrorCode::Forbidden,
            format!("not permitted to change ticket '{id}'"),
        ),
        UpdateOutcome::InvalidTransition => (
            ErrorCode::InvalidStateTransition,
            format!("status change not allowed for ticket '{id}'"),
        ),
        UpdateOutcome::EmptyText => (ErrorCode::InvalidText, "text must not be empty".to_string()),
    };
    Some(CliError::from_code(code, message))
}

/// Look up a ticket the actor can see, or fail with `E2001`.
fn visible<'a>(
    store: &'a TicketStore,
    id: &str,
    actor: &User,
    ctx: &AppContext,
) -> anyhow::Result<&'a Ticket> {
    store
        .get(id)
        .filter(|t| view::can_view(t, Some(actor)))
        .ok_or_else(|| {
            ctx.fail(CliError::from_code(
                ErrorCode::TicketNotFound,
                format!("ticket '{id}' not found"),
            ))
        })
}

fn apply_updates(
    ctx: &AppContext,
    id: &str,
    updates: Vec<TicketUpdate>,
) -> anyhow::Result<()> {
    let actor = ctx.require_actor()?;
    let mut store = ctx.tickets();
    visible(&store, id, &actor, ctx)?;

    let outcome = store.update_many(id, Some(&actor), updates);
    if let Some(err) = outcome_error(outcome, id) {
        return Err(ctx.fail(err));
    }
    debug!(id, "ticket change applied");
    let ticket = visible(&store, id, &actor, ctx)?;
    render_item(&TicketRow(ticket), ctx.output)?;
    Ok(())
}

pub fn run_ticket(args: &TicketArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        TicketCommand::Create(create) => run_create(create, ctx),
        TicketCommand::List(list) => run_list(list, ctx),
        TicketCommand::Show(show) => run_show(show, ctx),
        TicketCommand::Edit(edit) => run_edit(edit, ctx),
        TicketCommand::Status(s) => {
            apply_updates(ctx, &s.id, vec![TicketUpdate::SetStatus(s.status)])
        }
        TicketCommand::Priority(p) => {
            apply_updates(ctx, &p.id, vec![TicketUpdate::SetPriority(p.priority)])
        }
        TicketCommand::Assign(assign) => run_assign(assign, ctx),
        TicketCommand::Comment(comment) => run_comment(comment, ctx),
        TicketCommand::Stats => run_stats(ctx),
        TicketCommand::Dashboard => run_dashboard(ctx),
        TicketCommand::Admin => run_admin(ctx),
    }
}

fn run_create(args: &CreateArgs, ctx: &AppContext) -> anyhow::Result<()> {
    if let Err(e) = validate::validate_title(args.title.trim()) {
        return Err(ctx.fail(e.to_cli_error()));
    }
    if let Err(e) = validate::validate_description(args.description.trim()) {
        return Err(ctx.fail(e.to_cli_error()));
    }

    let actor = ctx.require_actor()?;
    let mut store = ctx.tickets();
    let new = NewTicket::new(&args.title, &args.description, args.category, args.priority);
    let Some(ticket) = store.create(Some(&actor), new) else {
        return Err(ctx.fail(CliError::from_code(
            ErrorCode::InvalidText,
            "title and description must not be empty",
        )));
    };
    render_item(&TicketRow(&ticket), ctx.output)?;
    Ok(())
}

fn run_list(args: &ListArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let actor = ctx.require_actor()?;
    let store = ctx.tickets();
    let query = args.query();
    let rows: Vec<TicketRow<'_>> = view::filter_tickets(store.all(), Some(&actor), &query)
        .into_iter()
        .map(TicketRow)
        .collect();
    let note = if query.is_active() {
        "No tickets match the current filters."
    } else {
        "No tickets yet."
    };
    render_list(&rows, ctx.output, note)?;
    Ok(())
}

fn run_show(args: &ShowArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let actor = ctx.require_actor()?;
    let store = ctx.tickets();
    let ticket = visible(&store, &args.id, &actor, ctx)?;
    render_item(&TicketDetail::for_viewer(ticket, &actor), ctx.output)?;
    Ok(())
}

fn run_edit(args: &EditArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut updates = Vec::new();
    if let Some(title) = &args.title {
        if let Err(e) = validate::validate_title(title.trim()) {
            return Err(ctx.fail(e.to_cli_error()));
        }
        updates.push(TicketUpdate::Retitle(title.clone()));
    }
    if let Some(description) = &args.description {
        if let Err(e) = validate::validate_description(description.trim()) {
            return Err(ctx.fail(e.to_cli_error()));
        }
        updates.push(TicketUpdate::Describe(description.clone()));
    }
    if let Some(category) = args.category {
        updates.push(TicketUpdate::SetCategory(category));
    }
    if updates.is_empty() {
        return Err(ctx.fail(CliError::with_details(
            "nothing to change",
            "pass --title, --description or --category",
            ErrorCode::InvalidText.code(),
        )));
    }
    apply_updates(ctx, &args.id, updates)
}

fn run_assign(args: &AssignArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let update = match (&args.assignee, args.clear) {
        (_, true) | (None, false) => TicketUpdate::Unassign,
        (Some(who), false) => {
            let session = ctx.session();
            let who = who.trim();
            let Some(user) = session
                .roster()
                .users()
                .find(|u| u.id == who || u.email.eq_ignore_ascii_case(who))
            else {
                return Err(ctx.fail(CliError::from_code(
                    ErrorCode::UserNotFound,
                    format!("unknown user '{who}'"),
                )));
            };
            TicketUpdate::Assign(user.id.clone())
        }
    };
    apply_updates(ctx, &args.id, vec![update])
}

fn run_comment(args: &CommentArgs, ctx: &AppContext) -> anyhow::Result<()> {
    if let Err(e) = validate::validate_comment(&args.text) {
        return Err(ctx.fail(e.to_cli_error()));
    }

    let actor = ctx.require_actor()?;
    let mut store = ctx.tickets();
    visible(&store, &args.id, &actor, ctx)?;
    if args.internal && !actor.is_admin() {
        warn!(ticket = %args.id, "internal notes are admin-only; posting publicly");
    }

    let Some(comment) = store.add_comment(&args.id, Some(&actor), &args.text, args.internal) else {
        return Err(ctx.fail(CliError::from_code(
            ErrorCode::InvalidText,
            "comment must not be empty",
        )));
    };
    render_item(&CommentView(&comment), ctx.output)?;
    Ok(())
}

fn run_stats(ctx: &AppContext) -> anyhow::Result<()> {
    let actor = ctx.require_actor()?;
    let store = ctx.tickets();
    let stats = view::ticket_stats(store.all(), Some(&actor));
    render_mode(ctx.output, &stats, write_stats_text, write_stats_pretty)
}

fn run_dashboard(ctx: &AppContext) -> anyhow::Result<()> {
    let actor = ctx.require_actor()?;
    let store = ctx.tickets();
    let dash = Dashboard {
        stats: view::ticket_stats(store.all(), Some(&actor)),
        recent: view::recent_tickets(store.all(), Some(&actor), ctx.config().views.recent_limit),
        categories: None,
    };
    render_mode(ctx.output, &dash, write_dashboard_text, write_dashboard_pretty)
}

fn run_admin(ctx: &AppContext) -> anyhow::Result<()> {
    let actor = ctx.require_actor()?;
    if !actor.is_admin() {
        return Err(ctx.fail(CliError::from_code(ErrorCode::Forbidden, ACCESS_DENIED)));
    }

    let store = ctx.tickets();
    let scoped = view::scope_tickets(store.all(), Some(&actor));
    let categories = view::category_breakdown(&scoped)
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    let dash = Dashboard {
        stats: TicketStats::compute(&scoped),
        recent: view::recent_tickets(
            store.all(),
            Some(&actor),
            ctx.config().views.admin_recent_limit,
        ),
        categories: Some(categories),
    };
    render_mode(ctx.output, &dash, write_dashboard_text, write_dashboard_pretty)
}
