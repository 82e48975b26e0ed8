//! Interactive selection prompts
//!
//! Reads operator input from any `BufRead` and writes to any `Write`, so the
//! same prompts drive stdin/stdout in the binary and scripted input in tests.

use std::io::{BufRead, Write};

use crate::error::{MigrateError, Result};
use crate::models::{Floor, Network};

/// Something that can be listed in a selection menu
pub trait Choice {
    fn label(&self) -> &str;
}

impl Choice for Floor {
    fn label(&self) -> &str {
        &self.hierarchy
    }
}

impl Choice for Network {
    fn label(&self) -> &str {
        &self.name
    }
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Show `options` as a numbered list and read until a valid choice.
    ///
    /// Accepts the 1-based index or the exact label (case-insensitive).
    /// Closed input aborts instead of looping.
    pub fn select<'a, T: Choice>(&mut self, what: &'static str, options: &'a [T]) -> Result<&'a T> {
        if options.is_empty() {
            return Err(MigrateError::NothingToSelect(what));
        }

        writeln!(self.output, "Available {what}:")?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {:>3}. {}", i + 1, option.label())?;
        }

        loop {
            write!(self.output, "❓ Select {what} [1-{}]: ", options.len())?;
            self.output.flush()?;

            let mut raw = Vec::new();
            if self.input.read_until(b'\n', &mut raw)? == 0 {
                writeln!(self.output)?;
                return Err(MigrateError::Aborted);
            }
            // undecodable bytes are just another invalid choice
            let line = String::from_utf8_lossy(&raw);

            match parse_selection(line.trim(), options) {
                Some(index) => {
                    let chosen = &options[index];
                    writeln!(self.output, "✅ Selected: {}", chosen.label())?;
                    return Ok(chosen);
                }
                None => {
                    writeln!(
                        self.output,
                        "❌ Invalid choice '{}'. Enter a number between 1 and {} or a name from the list.",
                        line.trim(),
                        options.len()
                    )?;
                }
            }
        }
    }
}

/// Index into `options` for the operator's answer, if it names one
fn parse_selection<T: Choice>(answer: &str, options: &[T]) -> Option<usize> {
    if answer.is_empty() {
        return None;
    }
    if let Ok(n) = answer.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Some(n - 1);
        }
    }
    // numeric labels ("2024") outside the index range still match by name
    options
        .iter()
        .position(|option| option.label().eq_ignore_ascii_case(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn networks(names: &[&str]) -> Vec<Network> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Network {
                id: format!("N_{i}"),
                name: name.to_string(),
                product_types: vec!["wireless".into()],
                time_zone: None,
            })
            .collect()
    }

    fn select_with(input: &str, options: &[Network]) -> (Result<String>, String) {
        let mut prompter = Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let chosen = prompter.select("networks", options).map(|n| n.id.clone());
        let output = String::from_utf8(prompter.into_output()).unwrap();
        (chosen, output)
    }

    #[test]
    fn test_select_by_index() {
        let options = networks(&["Paris", "Lyon"]);
        let (chosen, output) = select_with("2\n", &options);
        assert_eq!(chosen.unwrap(), "N_1");
        assert!(output.contains("  1. Paris"));
        assert!(output.contains("  2. Lyon"));
    }

    #[test]
    fn test_select_by_label_is_case_insensitive() {
        let options = networks(&["Paris", "Lyon"]);
        let (chosen, _) = select_with("  lyon \n", &options);
        assert_eq!(chosen.unwrap(), "N_1");
    }

    #[test]
    fn test_invalid_input_is_reprompted() {
        let options = networks(&["Paris", "Lyon"]);
        let (chosen, output) = select_with("abc\n0\n3\n-1\n\n1\n", &options);
        assert_eq!(chosen.unwrap(), "N_0");
        assert_eq!(output.matches("❌ Invalid choice").count(), 5);
    }

    #[test]
    fn test_undecodable_input_is_reprompted() {
        let options = networks(&["Paris", "Lyon"]);
        let mut prompter = Prompter::new(Cursor::new(b"\xff\xfe\n1\n".to_vec()), Vec::new());
        let chosen = prompter.select("networks", &options).unwrap();
        assert_eq!(chosen.id, "N_0");
        let output = String::from_utf8(prompter.into_output()).unwrap();
        assert_eq!(output.matches("❌ Invalid choice").count(), 1);
    }

    #[test]
    fn test_numeric_label_out_of_index_range() {
        let options = networks(&["2023", "2024"]);
        let (chosen, _) = select_with("2024\n", &options);
        assert_eq!(chosen.unwrap(), "N_1");
        // in range, a number is still an index
        let (chosen, _) = select_with("2\n", &options);
        assert_eq!(chosen.unwrap(), "N_1");
    }

    #[test]
    fn test_closed_input_aborts() {
        let options = networks(&["Paris"]);
        let (chosen, _) = select_with("nope\n", &options);
        assert!(matches!(chosen, Err(MigrateError::Aborted)));
    }

    #[test]
    fn test_empty_options() {
        let (chosen, _) = select_with("1\n", &[]);
        assert!(matches!(chosen, Err(MigrateError::NothingToSelect("networks"))));
    }

    #[test]
    fn test_floor_label_is_hierarchy() {
        let floor = Floor {
            id: "f".into(),
            hierarchy: "Global/Paris/B1/Floor 1".into(),
            building: crate::models::Coordinates { lat: 0.0, lng: 0.0 },
        };
        assert_eq!(floor.label(), "Global/Paris/B1/Floor 1");
    }
}
