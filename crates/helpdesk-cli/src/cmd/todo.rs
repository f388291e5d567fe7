//! `hd todo`: the personal todo list. No login required.

use std::io::{self, Write};

use clap::{Args, Subcommand};
use helpdesk_core::error::ErrorCode;
use helpdesk_core::model::{Todo, TodoPriority};
use helpdesk_core::store::TodoStore;
use helpdesk_core::view::{self, TodoFilter, TodoSort, TodoStats};

use crate::context::AppContext;
use crate::output::{
    CliError, Renderable, pretty_kv, pretty_section, render_item, render_list, render_mode,
    render_success,
};
use crate::validate;

#[derive(Args, Debug)]
pub struct TodoArgs {
    #[command(subcommand)]
    pub command: TodoCommand,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    #[command(
        about = "Add a todo",
        after_help = "EXAMPLES:\n    hd todo add \"Renew badge\" --priority high"
    )]
    Add(AddArgs),

    #[command(
        about = "List todos",
        after_help = "EXAMPLES:\n    # Unfinished, most important first\n    hd todo list --filter active --sort priority\n\n    hd todo list --json"
    )]
    List(ListArgs),

    #[command(about = "Flip a todo between active and completed")]
    Toggle(IdArgs),

    #[command(about = "Delete a todo")]
    Rm(IdArgs),

    #[command(about = "Replace a todo's text")]
    Edit(EditArgs),

    #[command(about = "Delete every completed todo")]
    ClearCompleted,

    #[command(about = "Total, active and completed counts")]
    Stats,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// What needs doing (up to 200 characters).
    pub text: String,

    /// low, medium or high.
    #[arg(long, short = 'p', default_value_t = TodoPriority::Medium)]
    pub priority: TodoPriority,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// all, active or completed.
    #[arg(long, short = 'f', default_value = "all")]
    pub filter: TodoFilter,

    /// date (newest first), alphabetical or priority.
    #[arg(long, short = 's', default_value = "date")]
    pub sort: TodoSort,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,
    pub text: String,
}

struct TodoRow<'a>(&'a Todo);

impl Renderable for TodoRow<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let t = self.0;
        let mark = if t.completed { "x" } else { " " };
        writeln!(w, "[{mark}] {} ({}) {}", t.text, t.priority, t.id)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *w, self.0)?;
        Ok(())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let t = self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            t.id,
            if t.completed { "done" } else { "active" },
            t.priority,
            t.created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            t.text
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "STATE", "PRIORITY", "CREATED", "TEXT"]
    }
}

fn not_found(ctx: &AppContext, id: &str) -> anyhow::Error {
    ctx.fail(CliError::from_code(
        ErrorCode::TodoNotFound,
        format!("todo '{id}' not found"),
    ))
}

fn show_one(store: &TodoStore, id: &str, ctx: &AppContext) -> anyhow::Result<()> {
    let todo = store.get(id).ok_or_else(|| not_found(ctx, id))?;
    render_item(&TodoRow(todo), ctx.output)?;
    Ok(())
}

pub fn run_todo(args: &TodoArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut store = ctx.todos();
    match &args.command {
        TodoCommand::Add(add) => {
            if let Err(e) = validate::validate_todo_text(&add.text) {
                return Err(ctx.fail(e.to_cli_error()));
            }
            let Some(todo) = store.add(&add.text, add.priority) else {
                return Err(ctx.fail(CliError::from_code(
                    ErrorCode::InvalidText,
                    "todo text must not be empty",
                )));
            };
            render_item(&TodoRow(&todo), ctx.output)?;
        }
        TodoCommand::List(list) => {
            let rows: Vec<TodoRow<'_>> = view::todo_view(store.all(), list.filter, list.sort)
                .into_iter()
                .map(TodoRow)
                .collect();
            let note = match list.filter {
                TodoFilter::All => "No todos yet. Add one with `hd todo add`.",
                TodoFilter::Active => "No active todos.",
                TodoFilter::Completed => "No completed todos.",
            };
            render_list(&rows, ctx.output, note)?;
        }
        TodoCommand::Toggle(IdArgs { id }) => {
            if !store.toggle(id) {
                return Err(not_found(ctx, id));
            }
            show_one(&store, id, ctx)?;
        }
        TodoCommand::Rm(IdArgs { id }) => {
            if !store.remove(id) {
                return Err(not_found(ctx, id));
            }
            render_success(ctx.output, &format!("removed {id}"))?;
        }
        TodoCommand::Edit(edit) => {
            if let Err(e) = validate::validate_todo_text(&edit.text) {
                return Err(ctx.fail(e.to_cli_error()));
            }
            if !store.edit(&edit.id, &edit.text) {
                return Err(not_found(ctx, &edit.id));
            }
            show_one(&store, &edit.id, ctx)?;
        }
        TodoCommand::ClearCompleted => {
            let removed = store.clear_completed();
            render_success(ctx.output, &format!("cleared {removed} completed"))?;
        }
        TodoCommand::Stats => {
            let stats = TodoStats::compute(store.all());
            render_mode(
                ctx.output,
                &stats,
                |s, w| {
                    writeln!(w, "total\t{}", s.total)?;
                    writeln!(w, "active\t{}", s.active)?;
                    writeln!(w, "completed\t{}", s.completed)
                },
                |s, w| {
                    pretty_section(w, "Todos")?;
                    pretty_kv(w, "Total", s.total.to_string())?;
                    pretty_kv(w, "Active", s.active.to_string())?;
                    pretty_kv(w, "Completed", s.completed.to_string())
                },
            )?;
        }
    }
    Ok(())
}
