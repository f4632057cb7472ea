//! Translates command-line intents into controller calls and redraws the
//! affected scope.

use std::io::Write;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::blob::BlobStore;
use crate::cli::Invocation;
use crate::datetime::{DayBucket, LocalCalendar, parse_day_expr};
use crate::general::GeneralList;
use crate::render::{Renderer, short_id};
use crate::schedule::Schedule;
use crate::task::{DateId, Task, TaskId};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "overview", "list", "add", "week", "day", "plan", "toggle", "delete", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Both task views, loaded from the same blob store.
#[derive(Debug)]
pub struct Session<B> {
    pub general: GeneralList<B>,
    pub schedule: Schedule<B>,
}

impl<B: BlobStore + Clone> Session<B> {
    #[instrument(skip(blobs))]
    pub fn load(blobs: B) -> Self {
        Self {
            general: GeneralList::load(blobs.clone()),
            schedule: Schedule::load(blobs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    General,
    Schedule,
}

/// Find the task a user-typed id refers to: an exact id, or a prefix that
/// matches exactly one task across both views.
pub fn resolve_task<B: BlobStore>(
    session: &Session<B>,
    raw: &str,
) -> anyhow::Result<Option<(Scope, TaskId)>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("missing task id"));
    }

    let candidates = session
        .general
        .snapshot()
        .iter()
        .map(|task| (Scope::General, task))
        .chain(
            session
                .schedule
                .snapshot()
                .iter()
                .map(|task| (Scope::Schedule, task)),
        );

    let mut matches: Vec<(Scope, &Task)> = Vec::new();
    for (scope, task) in candidates {
        if task.id().as_str() == raw {
            return Ok(Some((scope, task.id().clone())));
        }
        if task.id().as_str().starts_with(raw) {
            matches.push((scope, task));
        }
    }

    match matches.as_slice() {
        [] => Ok(None),
        [(scope, task)] => Ok(Some((*scope, task.id().clone()))),
        many => Err(anyhow!(
            "task id prefix {raw} is ambiguous ({} matches)",
            many.len()
        )),
    }
}

#[instrument(skip(session, calendar, renderer, out, inv), fields(command = %inv.command))]
pub fn dispatch<B: BlobStore, W: Write>(
    session: &mut Session<B>,
    calendar: &LocalCalendar,
    renderer: &Renderer,
    out: &mut W,
    inv: Invocation,
) -> anyhow::Result<()> {
    let today = calendar.today();
    let args = inv.command_args.as_slice();

    debug!(
        command = %inv.command,
        args = ?inv.command_args,
        %today,
        "dispatching command"
    );

    match inv.command.as_str() {
        "overview" => cmd_overview(session, renderer, out, today),
        "list" => renderer.write_general(out, session.general.snapshot()),
        "add" => cmd_add(session, renderer, out, args),
        "week" => cmd_week(session, renderer, out, args, today),
        "day" => cmd_day(session, renderer, out, args, today),
        "plan" => cmd_plan(session, renderer, out, args, today),
        "toggle" => cmd_toggle(session, renderer, out, args, today),
        "delete" => cmd_delete(session, renderer, out, args, today),
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_overview<B: BlobStore, W: Write>(
    session: &Session<B>,
    renderer: &Renderer,
    out: &mut W,
    today: NaiveDate,
) -> anyhow::Result<()> {
    renderer.write_general(out, session.general.snapshot())?;
    writeln!(out)?;
    renderer.write_week(out, &session.schedule.week_view(today))
}

#[instrument(skip_all)]
fn cmd_add<B: BlobStore, W: Write>(
    session: &mut Session<B>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command add");
    let task = session.general.add(&args.join(" "))?;
    writeln!(out, "Created task {}.", short_id(task.id()))?;
    renderer.write_general(out, session.general.snapshot())
}

fn cmd_week<B: BlobStore, W: Write>(
    session: &Session<B>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let reference = match args.first() {
        Some(raw) => parse_day_expr(raw, today)?,
        None => today,
    };
    renderer.write_week(out, &session.schedule.week_view(reference))
}

fn cmd_day<B: BlobStore, W: Write>(
    session: &Session<B>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("day needs a date, e.g. `emma day tomorrow`"))?;
    let date = parse_day_expr(raw, today)?;
    write_affected_day(session, renderer, out, &DateId::from(date), today)
}

#[instrument(skip_all)]
fn cmd_plan<B: BlobStore, W: Write>(
    session: &mut Session<B>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command plan");
    let (raw_day, words) = args
        .split_first()
        .ok_or_else(|| anyhow!("plan needs a day and a task, e.g. `emma plan fri Call Bob`"))?;
    let date = DateId::from(parse_day_expr(raw_day, today)?);

    let task = session.schedule.add(date.clone(), &words.join(" "))?;
    writeln!(out, "Planned task {} for {}.", short_id(task.id()), date)?;
    write_affected_day(session, renderer, out, &date, today)
}

#[instrument(skip_all)]
fn cmd_toggle<B: BlobStore, W: Write>(
    session: &mut Session<B>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let raw = args.first().map(String::as_str).unwrap_or_default();
    let Some((scope, id)) = resolve_task(session, raw)? else {
        warn!(id = %raw, "no task matches; ignoring toggle");
        return Ok(());
    };

    let toggled = match scope {
        Scope::General => session.general.toggle(&id),
        Scope::Schedule => session.schedule.toggle(&id),
    };
    let task = match toggled {
        Ok(task) => task,
        Err(err) if err.is_not_found() => {
            warn!(id = %id, "task vanished before toggle; ignoring");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let verb = if task.completed() { "Completed" } else { "Reopened" };
    writeln!(out, "{verb} task {}.", short_id(task.id()))?;
    redraw(session, renderer, out, scope, task.date(), today)
}

#[instrument(skip_all)]
fn cmd_delete<B: BlobStore, W: Write>(
    session: &mut Session<B>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    let raw = args.first().map(String::as_str).unwrap_or_default();
    let Some((scope, id)) = resolve_task(session, raw)? else {
        warn!(id = %raw, "no task matches; ignoring delete");
        return Ok(());
    };

    let removed = match scope {
        Scope::General => session.general.remove(&id)?,
        Scope::Schedule => session.schedule.remove(&id)?,
    };
    let Some(task) = removed else {
        return Ok(());
    };

    writeln!(out, "Deleted task {}.", short_id(task.id()))?;
    redraw(session, renderer, out, scope, task.date(), today)
}

fn redraw<B: BlobStore, W: Write>(
    session: &Session<B>,
    renderer: &Renderer,
    out: &mut W,
    scope: Scope,
    date: Option<&DateId>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    match (scope, date) {
        (Scope::Schedule, Some(date)) => write_affected_day(session, renderer, out, date, today),
        _ => renderer.write_general(out, session.general.snapshot()),
    }
}

/// Redraw a single schedule day. Dates that do not parse as a calendar day
/// are shown under their raw key.
fn write_affected_day<B: BlobStore, W: Write>(
    session: &Session<B>,
    renderer: &Renderer,
    out: &mut W,
    date: &DateId,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let tasks = session.schedule.tasks_for(date);
    match date.to_date() {
        Some(day) => renderer.write_day(out, &DayBucket::new(day, day == today), &tasks),
        None => {
            writeln!(out, "{date}")?;
            for task in tasks {
                writeln!(out, "  {}", task.text())?;
            }
            Ok(())
        }
    }
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: overview, list, add <text>, week [day], day <day>, \
         plan <day> <text>, toggle <id>, delete <id>, help, version\n\
         Days: today, tomorrow, yesterday, weekday names, +Nd/-Nd, YYYY-MM-DD"
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;

    fn inv(command: &str, args: &[&str]) -> Invocation {
        Invocation {
            command: command.to_string(),
            command_args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn run(session: &mut Session<&MemoryBlobStore>, invocation: Invocation) -> anyhow::Result<String> {
        let calendar = LocalCalendar::with_zone(chrono_tz::UTC);
        let mut buf = Vec::new();
        dispatch(session, &calendar, &Renderer::plain(), &mut buf, invocation)?;
        Ok(String::from_utf8(buf)?)
    }

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("tog", &known), Some("toggle"));
        assert_eq!(expand_command_abbrev("d", &known), None);
        assert_eq!(expand_command_abbrev("de", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }

    #[test]
    fn resolve_prefers_exact_ids_and_rejects_ambiguous_prefixes() {
        let blobs = MemoryBlobStore::new();
        let mut session = Session::load(&blobs);
        let general = session.general.add("Buy milk").expect("add");
        let planned = session.schedule.add("2024-01-10", "Call Bob").expect("plan");

        assert_eq!(
            resolve_task(&session, general.id().as_str()).expect("exact"),
            Some((Scope::General, general.id().clone()))
        );
        assert_eq!(
            resolve_task(&session, &planned.id().as_str()[..12]).expect("prefix"),
            Some((Scope::Schedule, planned.id().clone()))
        );
        assert_eq!(resolve_task(&session, "not-an-id").expect("unknown"), None);
        assert!(resolve_task(&session, "").is_err());
    }

    #[test]
    fn ambiguous_prefix_is_an_error() {
        let blobs = MemoryBlobStore::new();
        blobs
            .set(
                "general-tasks",
                r#"[{"id":"1700000000001","text":"a","completed":false},{"id":"1700000000002","text":"b","completed":false}]"#,
            )
            .expect("seed");
        let session = Session::load(&blobs);

        assert!(resolve_task(&session, "17000").is_err());
        assert!(resolve_task(&session, "1700000000002").expect("exact").is_some());
    }

    #[test]
    fn add_then_toggle_then_delete_through_commands() {
        let blobs = MemoryBlobStore::new();
        let mut session = Session::load(&blobs);

        let out = run(&mut session, inv("add", &["Buy", "milk"])).expect("add");
        assert!(out.starts_with("Created task "));
        let id = session.general.snapshot()[0].id().clone();

        run(&mut session, inv("toggle", &[&id.as_str()[..8]])).expect("toggle");
        assert!(session.general.snapshot()[0].completed());

        let out = run(&mut session, inv("delete", &[id.as_str()])).expect("delete");
        assert!(out.contains("No tasks."));
        assert!(GeneralList::load(&blobs).is_empty());
    }

    #[test]
    fn blank_add_surfaces_validation_message() {
        let blobs = MemoryBlobStore::new();
        let mut session = Session::load(&blobs);

        let err = run(&mut session, inv("add", &["   "])).expect_err("blank");
        assert_eq!(err.to_string(), "please enter a valid task");
    }

    #[test]
    fn toggle_of_unknown_id_is_a_silent_no_op() {
        let blobs = MemoryBlobStore::new();
        let mut session = Session::load(&blobs);
        session.general.add("Buy milk").expect("add");

        let out = run(&mut session, inv("toggle", &["ghost"])).expect("no-op");
        assert!(out.is_empty());
        assert!(!session.general.snapshot()[0].completed());
    }

    #[test]
    fn plan_redraws_only_the_affected_day() {
        let blobs = MemoryBlobStore::new();
        let mut session = Session::load(&blobs);

        let out = run(&mut session, inv("plan", &["2024-01-10", "Call", "Bob"])).expect("plan");

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("for 2024-01-10."));
        assert_eq!(lines[1], "Wednesday (Jan 10) 2024-01-10");
        assert!(lines[2].starts_with("  [ ] Call Bob  "));
        assert_eq!(
            session.schedule.tasks_for(&DateId::new("2024-01-10")).len(),
            1
        );
    }

    #[test]
    fn week_lists_seven_days_from_reference() {
        let blobs = MemoryBlobStore::new();
        let mut session = Session::load(&blobs);
        session.schedule.add("2024-01-12", "Dentist").expect("plan");

        let out = run(&mut session, inv("week", &["2024-01-10"])).expect("week");

        let headings: Vec<&str> = out.lines().filter(|l| l.contains("(Jan")).collect();
        assert_eq!(headings.len(), 7);
        assert!(headings[0].starts_with("Wednesday (Jan 10)"));
        assert!(headings[6].starts_with("Tuesday (Jan 16)"));
        assert!(out.contains("[ ] Dentist"));
    }
}
