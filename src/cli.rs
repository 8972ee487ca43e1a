//! Interactive ticket creation.
//!
//! Line input goes through the [`LineInput`] trait; the terminal
//! implementation uses rustyline. Parsing of user choices is kept in plain
//! functions so it can be tested without a terminal.

use std::io::Write;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::config::TicketDefaults;
use crate::error::TdxError;
use crate::generator::{GeneratedTicket, TicketTextSource};
use crate::models::{CreateTicketOptions, NewTicket, Ticket};
use crate::tickets::TicketClient;

/// Status offered when the user just presses enter.
pub const DEFAULT_STATUS: (&str, i64) = ("New", 28549);

/// Statuses the CLI offers, in display order.
pub const STATUSES: [(&str, i64); 7] = [
    DEFAULT_STATUS,
    ("Open", 28550),
    ("In Process", 28551),
    ("Resolved", 28552),
    ("Closed", 28553),
    ("Cancelled", 28554),
    ("On Hold", 28555),
];

/// Categories offered by `tdx generate`. The last entry asks for free text.
pub const CATEGORIES: [&str; 7] = [
    "Hardware Issues",
    "Software Problems",
    "Network Connectivity",
    "Account Access",
    "Email Issues",
    "Printer Problems",
    "Custom",
];

/// What the user picked from the category menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryChoice {
    Preset(&'static str),
    Custom,
    None,
}

/// Parses a status answer.
///
/// Empty input selects [`DEFAULT_STATUS`]. Returns `None` for anything that
/// is not one of the listed status IDs.
pub fn parse_status(input: &str) -> Option<i64> {
    let input = input.trim();
    if input.is_empty() {
        return Some(DEFAULT_STATUS.1);
    }

    let id = input.parse::<i64>().ok()?;
    STATUSES.iter().find(|(_, known)| *known == id).map(|(_, id)| *id)
}

/// Name of a listed status.
pub fn status_name(id: i64) -> Option<&'static str> {
    STATUSES
        .iter()
        .find(|(_, known)| *known == id)
        .map(|(name, _)| *name)
}

/// Parses a 1-based category menu answer.
pub fn parse_category(input: &str) -> CategoryChoice {
    let index = match input.trim().parse::<usize>() {
        Ok(n) if (1..=CATEGORIES.len()).contains(&n) => n - 1,
        _ => return CategoryChoice::None,
    };

    if index == CATEGORIES.len() - 1 {
        CategoryChoice::Custom
    } else {
        CategoryChoice::Preset(CATEGORIES[index])
    }
}

/// True only for `y` or `Y`, ignoring surrounding whitespace.
pub fn is_yes(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("y")
}

/// A source of input lines.
pub trait LineInput {
    /// Reads one line after showing `prompt`. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Terminal input with line editing.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineInput for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// The interactive ticket loops.
pub struct Shell<'a, I, W> {
    tickets: &'a TicketClient,
    defaults: &'a TicketDefaults,
    generator: Option<&'a dyn TicketTextSource>,
    input: I,
    out: W,
}

impl<'a, I, W> Shell<'a, I, W>
where
    I: LineInput,
    W: Write,
{
    pub fn new(
        tickets: &'a TicketClient,
        defaults: &'a TicketDefaults,
        generator: Option<&'a dyn TicketTextSource>,
        input: I,
        out: W,
    ) -> Self {
        Self {
            tickets,
            defaults,
            generator,
            input,
            out,
        }
    }

    /// Creates tickets until the user declines or input ends.
    ///
    /// Ticket errors are printed and do not end the loop.
    pub async fn run_create(&mut self) -> Result<()> {
        writeln!(self.out, "TeamDynamix ticket creation")?;

        loop {
            let Some(text) = self.ticket_text().await? else {
                break;
            };
            if let Some(text) = text {
                if !self.create_with_status(&text).await? {
                    break;
                }
            }

            if !self.confirm("\nCreate another ticket? (y/n): ")? {
                break;
            }
        }

        writeln!(self.out, "Done.")?;
        Ok(())
    }

    /// Generates tickets for a chosen category until the user declines.
    pub async fn run_generate(&mut self) -> Result<()> {
        let Some(generator) = self.generator else {
            writeln!(
                self.out,
                "Ticket generation needs OPENAI_API_KEY to be set."
            )?;
            return Ok(());
        };

        loop {
            let Some(category) = self.choose_category()? else {
                break;
            };

            match generator.generate(category.as_deref()).await {
                Ok(text) => {
                    self.show_generated(&text)?;
                    if self.confirm("\nCreate this ticket? (y/n): ")?
                        && !self.create_with_status(&text).await?
                    {
                        break;
                    }
                }
                Err(e) => self.report(&e)?,
            }

            if !self.confirm("\nGenerate another ticket? (y/n): ")? {
                break;
            }
        }

        writeln!(self.out, "Done.")?;
        Ok(())
    }

    /// Returns `None` at end of input and `Some(None)` when no text could be
    /// obtained this round.
    async fn ticket_text(&mut self) -> Result<Option<Option<GeneratedTicket>>> {
        if let Some(generator) = self.generator {
            return match generator.generate(None).await {
                Ok(text) => {
                    self.show_generated(&text)?;
                    Ok(Some(Some(text)))
                }
                Err(e) => {
                    self.report(&e)?;
                    Ok(Some(None))
                }
            };
        }

        let Some(title) = self.input.read_line("Title: ")? else {
            return Ok(None);
        };
        let Some(description) = self.input.read_line("Description: ")? else {
            return Ok(None);
        };

        Ok(Some(Some(GeneratedTicket {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        })))
    }

    /// Asks for a status and creates the ticket. Returns false at end of input.
    async fn create_with_status(&mut self, text: &GeneratedTicket) -> Result<bool> {
        let Some(status_id) = self.choose_status()? else {
            return Ok(false);
        };

        let ticket = NewTicket::from_defaults(self.defaults, &text.title, &text.description, status_id);
        match self
            .tickets
            .create(self.defaults.app_id, &ticket, &CreateTicketOptions::default())
            .await
        {
            Ok(created) => self.show_created(&created, status_id)?,
            Err(e) => self.report(&e)?,
        }
        Ok(true)
    }

    fn choose_status(&mut self) -> Result<Option<i64>> {
        writeln!(self.out, "\nAvailable statuses:")?;
        for (name, id) in STATUSES {
            writeln!(self.out, "  {:<12} {}", name, id)?;
        }

        loop {
            let prompt = format!(
                "Status ID (enter for {} {}): ",
                DEFAULT_STATUS.0, DEFAULT_STATUS.1
            );
            let Some(answer) = self.input.read_line(&prompt)? else {
                return Ok(None);
            };
            match parse_status(&answer) {
                Some(id) => return Ok(Some(id)),
                None => writeln!(self.out, "Not a listed status ID: {}", answer.trim())?,
            }
        }
    }

    /// Returns `None` at end of input and `Some(None)` for "no category".
    fn choose_category(&mut self) -> Result<Option<Option<String>>> {
        writeln!(self.out, "\nCategories:")?;
        for (n, name) in CATEGORIES.iter().enumerate() {
            writeln!(self.out, "  {}. {}", n + 1, name)?;
        }

        let Some(answer) = self.input.read_line("Category number: ")? else {
            return Ok(None);
        };

        let category = match parse_category(&answer) {
            CategoryChoice::Preset(name) => Some(name.to_string()),
            CategoryChoice::Custom => match self.input.read_line("Custom category: ")? {
                Some(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Some(_) => None,
                None => return Ok(None),
            },
            CategoryChoice::None => None,
        };
        Ok(Some(category))
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(self
            .input
            .read_line(prompt)?
            .is_some_and(|answer| is_yes(&answer)))
    }

    fn show_generated(&mut self, text: &GeneratedTicket) -> Result<()> {
        writeln!(self.out, "\nTitle: {}", text.title)?;
        writeln!(self.out, "Description: {}", text.description)?;
        Ok(())
    }

    fn show_created(&mut self, ticket: &Ticket, status_id: i64) -> Result<()> {
        let status = ticket
            .status_name
            .clone()
            .or_else(|| status_name(status_id).map(str::to_string))
            .unwrap_or_else(|| status_id.to_string());

        writeln!(self.out, "\nTicket created")?;
        writeln!(self.out, "  ID:     {}", ticket.id)?;
        writeln!(self.out, "  Title:  {}", ticket.display_title())?;
        writeln!(self.out, "  Status: {}", status)?;
        Ok(())
    }

    fn report(&mut self, error: &TdxError) -> Result<()> {
        let message = self.tickets.session().sanitize_error(error);
        tracing::warn!(error = %message, "Ticket operation failed");
        writeln!(self.out, "Error: {}", message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_status_defaults_to_new() {
        assert_eq!(parse_status(""), Some(28549));
        assert_eq!(parse_status("   "), Some(28549));
    }

    #[test]
    fn test_parse_status_accepts_listed_ids_only() {
        assert_eq!(parse_status("28552"), Some(28552));
        assert_eq!(parse_status(" 28555 "), Some(28555));
        assert_eq!(parse_status("12345"), None);
        assert_eq!(parse_status("Resolved"), None);
    }

    #[test]
    fn test_status_name_lookup() {
        assert_eq!(status_name(28551), Some("In Process"));
        assert_eq!(status_name(1), None);
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("1"), CategoryChoice::Preset("Hardware Issues"));
        assert_eq!(parse_category("6"), CategoryChoice::Preset("Printer Problems"));
        assert_eq!(parse_category("7"), CategoryChoice::Custom);
        assert_eq!(parse_category("0"), CategoryChoice::None);
        assert_eq!(parse_category("8"), CategoryChoice::None);
        assert_eq!(parse_category("email"), CategoryChoice::None);
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" Y \n"));
        assert!(!is_yes("Yes"));
        assert!(!is_yes("yellow"));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }
}
