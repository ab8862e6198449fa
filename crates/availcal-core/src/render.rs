use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::projector::{ColumnKind, DisplayRow};
use crate::roster::DailyStatus;
use crate::state::Projection;

const FREE_COLOR: &str = "34";
const BUSY_COLOR: &str = "31";
const NAME_COLOR: &str = "1";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, projection), fields(rows = projection.rows.len()))]
    pub fn print_availability_table(
        &mut self,
        title: &str,
        projection: &Projection,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_availability_table(&mut out, title, projection)
    }

    pub fn write_availability_table<W: Write>(
        &self,
        mut writer: W,
        title: &str,
        projection: &Projection,
    ) -> anyhow::Result<()> {
        writeln!(writer, "{title}")?;
        writeln!(writer)?;

        let headers: Vec<String> = projection
            .columns
            .iter()
            .map(|column| column.label.clone())
            .collect();

        let rows: Vec<Vec<String>> = projection
            .rows
            .iter()
            .map(|row| {
                projection
                    .columns
                    .iter()
                    .map(|column| match column.kind {
                        ColumnKind::Name => self.paint(&row.name, NAME_COLOR),
                        ColumnKind::RemainingHolidays => optional_count(row.remaining_holidays),
                        ColumnKind::AvailableTime => optional_count(row.available_time),
                        ColumnKind::Day => row
                            .status_on(&column.key)
                            .map(|status| self.paint_status(status))
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .collect();

        write_table(&mut writer, headers, rows)?;
        writeln!(writer)?;
        write_footer(&mut writer, &projection.rows)?;
        Ok(())
    }

    fn paint_status(&self, status: DailyStatus) -> String {
        match status {
            DailyStatus::Free => self.paint(status.as_str(), FREE_COLOR),
            DailyStatus::Busy => self.paint(status.as_str(), BUSY_COLOR),
            DailyStatus::Unknown => status.as_str().to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn optional_count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn write_footer<W: Write>(mut writer: W, rows: &[DisplayRow]) -> anyhow::Result<()> {
    let free: usize = rows.iter().map(|row| row.count(DailyStatus::Free)).sum();
    let busy: usize = rows.iter().map(|row| row.count(DailyStatus::Busy)).sum();
    writeln!(
        writer,
        "{} {} shown, {free} free / {busy} busy day(s)",
        rows.len(),
        if rows.len() == 1 { "person" } else { "people" },
    )?;
    Ok(())
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Person;
    use crate::state::{ViewEvent, ViewState};

    fn render(renderer: &Renderer, state: &ViewState) -> String {
        let mut buf = Vec::new();
        renderer
            .write_availability_table(&mut buf, "May 2024", &state.projection())
            .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn plain_table_lists_people_and_statuses() {
        let mut state = ViewState::new(2024, 5).expect("state");
        let mut alice =
            Person::new("Alice").with_month(2024, 5, [DailyStatus::Free, DailyStatus::Busy]);
        alice.remaining_holidays = Some(9);
        state
            .apply(ViewEvent::RosterLoaded(vec![alice, Person::new("Bob")]))
            .expect("roster");

        let text = render(&Renderer::plain(), &state);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "May 2024");
        assert!(lines[2].starts_with("Name  Remaining holidays Available time May 1"));
        assert!(lines[3].starts_with("----- "));
        assert!(lines[4].starts_with("Alice 9                  -              Free    Busy    Unknown"));
        assert!(lines[5].starts_with("Bob   -"));
        assert_eq!(lines.last().copied(), Some("2 people shown, 1 free / 1 busy day(s)"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn colored_cells_keep_alignment() {
        let mut state = ViewState::new(2024, 5).expect("state");
        state
            .apply(ViewEvent::RosterLoaded(vec![
                Person::new("Al").with_month(2024, 5, [DailyStatus::Busy]),
            ]))
            .expect("roster");

        let colored = Renderer { color: true };
        let text = render(&colored, &state);
        assert!(text.contains("\x1b[31mBusy\x1b[0m"));
        let plain = render(&Renderer::plain(), &state);
        assert_eq!(strip_ansi(&text), plain);
    }

    #[test]
    fn empty_roster_renders_headers_only() {
        let state = ViewState::new(2023, 2).expect("state");
        let text = render(&Renderer::plain(), &state);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].ends_with("Feb 28 "));
        assert_eq!(lines.last().copied(), Some("0 people shown, 0 free / 0 busy day(s)"));
    }

    #[test]
    fn color_setting_accepts_the_config_switch_words() {
        for raw in ["y", "n", "yes", "off", "1"] {
            let mut cfg = Config::default();
            cfg.apply_overrides([("color".to_string(), raw.to_string())]);
            assert!(Renderer::new(&cfg).is_ok(), "{raw}");
        }

        let mut cfg = Config::default();
        cfg.apply_overrides([("rc.color".to_string(), "n".to_string())]);
        let renderer = Renderer::new(&cfg).expect("renderer");
        assert!(!renderer.color);

        cfg.apply_overrides([("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
    }
}
