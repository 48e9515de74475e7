//! Interactive terminal prompts

use async_trait::async_trait;
use colored::Colorize;
use peerbox_core::{DecisionError, DecisionResult, DecisionSource};
use std::io::Write;

/// Decision source reading answers from the operator's terminal
pub struct TerminalDecisions;

#[async_trait]
impl DecisionSource for TerminalDecisions {
    async fn confirm(&self, prompt: &str, default_yes: bool) -> DecisionResult<bool> {
        let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
        loop {
            show(&format!("{} {}", prompt, hint))?;
            let answer = read_line()?.to_lowercase();
            match answer.as_str() {
                "" => return Ok(default_yes),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("{}", "Please answer y or n.".yellow()),
            }
        }
    }

    async fn manual_limit(&self, prompt: &str) -> DecisionResult<Option<u32>> {
        println!("{} {}", "WARNING:".yellow().bold(), prompt);
        if !self.confirm("Set a manual limit?", true).await? {
            return Ok(None);
        }
        loop {
            show("Prefix limit (integer):")?;
            match read_line()?.parse::<u32>() {
                Ok(value) if value > 0 => return Ok(Some(value)),
                _ => println!("{}", "Enter a whole number greater than zero.".yellow()),
            }
        }
    }

    async fn search_term(&self, prompt: &str) -> DecisionResult<Option<String>> {
        show(&format!("{} (empty or 'q' to quit)", prompt))?;
        let raw = read_line()?;
        if raw.is_empty() || raw.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        Ok(Some(raw))
    }

    async fn pick_index(&self, prompt: &str, len: usize) -> DecisionResult<usize> {
        loop {
            show(&format!("{} [1-{}, 0 to search again]", prompt, len))?;
            match read_line()?.parse::<usize>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("{}", "Enter a number.".yellow()),
            }
        }
    }
}

/// Asks which of the listed exchanges to peer on; empty answer keeps all
pub fn ask_selection(count: usize) -> DecisionResult<Vec<usize>> {
    loop {
        show("Select exchanges, e.g. 1,3 or 'all' [all]:")?;
        match parse_selection(&read_line()?, count) {
            Ok(picked) => return Ok(picked),
            Err(e) => println!("{}", e.yellow()),
        }
    }
}

/// Optional MD5 key for the new sessions; empty answer means none
pub fn ask_md5() -> DecisionResult<Option<String>> {
    show("MD5 password (leave empty for none):")?;
    let raw = read_line()?;
    if raw.is_empty() {
        Ok(None)
    } else {
        Ok(Some(raw))
    }
}

fn show(text: &str) -> DecisionResult<()> {
    print!("{} {} ", "?".green().bold(), text);
    std::io::stdout()
        .flush()
        .map_err(|e| DecisionError::Read(e.to_string()))
}

/// Reads one trimmed line; end of input counts as the operator walking away
fn read_line() -> DecisionResult<String> {
    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| DecisionError::Read(e.to_string()))?;
    if read == 0 {
        return Err(DecisionError::Closed);
    }
    Ok(line.trim().to_string())
}

/// Parses a one-based selection like "1,3,5" or "all" into zero-based
/// indices, deduplicated, in the order entered
fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("all") {
        return Ok((0..count).collect());
    }
    let mut picked = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        let index: usize = part
            .parse()
            .map_err(|_| format!("'{}' is not a number", part))?;
        if index == 0 || index > count {
            return Err(format!("{} is out of range (1-{})", index, count));
        }
        if !picked.contains(&(index - 1)) {
            picked.push(index - 1);
        }
    }
    Ok(picked)
}

// ============================================================================
// Tests
// ============================================================================
