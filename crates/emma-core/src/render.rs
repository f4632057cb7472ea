use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::DayBucket;
use crate::task::{Task, TaskId};

const SHORT_ID_LEN: usize = 8;

/// Terminal view over read-only task snapshots.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Color follows the `color` setting, and only on a terminal.
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, tasks), fields(count = tasks.len()))]
    pub fn write_general<W: Write>(&self, out: &mut W, tasks: &[Task]) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("To-do", "1"))?;
        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let rows: Vec<Vec<String>> = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&short_id(task.id()), "33"),
                    if task.completed() { "x" } else { "" }.to_string(),
                    self.task_text(task),
                ]
            })
            .collect();

        write_table(out, &["ID", "Done", "Task"], &rows)
    }

    #[tracing::instrument(skip_all, fields(days = week.len()))]
    pub fn write_week<W: Write>(
        &self,
        out: &mut W,
        week: &[(DayBucket, Vec<&Task>)],
    ) -> anyhow::Result<()> {
        for (idx, (bucket, tasks)) in week.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            self.write_day(out, bucket, tasks)?;
        }
        Ok(())
    }

    /// One day of the schedule: heading, then its tasks in insertion order.
    pub fn write_day<W: Write>(
        &self,
        out: &mut W,
        bucket: &DayBucket,
        tasks: &[&Task],
    ) -> anyhow::Result<()> {
        let mut heading = format!(
            "{} ({}) {}",
            bucket.weekday_name,
            bucket.short_label(),
            bucket.date_id
        );
        if bucket.is_today {
            heading.push_str(" [today]");
        }
        let code = if bucket.is_today { "1;36" } else { "1" };
        writeln!(out, "{}", self.paint(&heading, code))?;

        if tasks.is_empty() {
            writeln!(out, "  -")?;
        }
        for task in tasks {
            let mark = if task.completed() { "x" } else { " " };
            writeln!(
                out,
                "  [{mark}] {}  {}",
                self.task_text(task),
                self.paint(&short_id(task.id()), "33")
            )?;
        }
        Ok(())
    }

    fn task_text(&self, task: &Task) -> String {
        if task.completed() {
            self.paint(task.text(), "9")
        } else {
            task.text().to_string()
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &TaskId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

fn write_table<W: Write>(
    out: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(out, &widths, headers)?;
    write_row(out, &widths, rule.as_slice())?;
    for row in rows {
        write_row(out, &widths, row.as_slice())?;
    }
    Ok(())
}

/// Cells padded to their column width, single-space separated, with
/// trailing blanks dropped.
fn write_row<W: Write, S: AsRef<str>>(
    out: &mut W,
    widths: &[usize],
    cells: &[S],
) -> anyhow::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = cell.as_ref();
            let padding = width.saturating_sub(visible_width(cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

/// Drop `ESC ... m` color sequences.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for end in chars.by_ref() {
                if end == 'm' {
                    break;
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}
