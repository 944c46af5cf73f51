//! Operator prompts
//!
//! The installer asks through a [`Prompter`] so tests can script the
//! answers. `Ok(None)` from a prompt means the operator skipped it.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use crate::address::Address;
use crate::error::{FlowError, Result};

pub trait Prompter: Send + Sync {
    /// Yes/no question; asks until one is given
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Pick one of `options`, or skip
    fn select(&self, question: &str, options: &[String]) -> Result<Option<usize>>;

    /// Pick any number of `options`
    fn select_many(&self, question: &str, options: &[String]) -> Result<Vec<usize>>;

    /// Enter an address, or skip with an empty answer
    fn address(&self, question: &str) -> Result<Option<Address>>;
}

/// Prompts on stdin/stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn ask(&self, prompt: &str) -> Result<String> {
        print!("{} > ", prompt);
        std::io::stdout().flush()?;
        let mut input = String::new();
        let read = std::io::stdin().lock().read_line(&mut input)?;
        if read == 0 {
            return Err(FlowError::PromptCancelled(prompt.to_string()));
        }
        Ok(input.trim().to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        loop {
            let answer = self.ask(&format!("{} [yes/no]", question))?;
            match answer.to_lowercase().as_str() {
                "yes" | "y" => return Ok(true),
                "no" | "n" => return Ok(false),
                _ => continue,
            }
        }
    }

    fn select(&self, question: &str, options: &[String]) -> Result<Option<usize>> {
        println!("{}", question);
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        loop {
            let answer = self.ask("Choose a number, or press enter to skip")?;
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => println!("⚠️  Enter a number between 1 and {}", options.len()),
            }
        }
    }

    fn select_many(&self, question: &str, options: &[String]) -> Result<Vec<usize>> {
        println!("{}", question);
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        loop {
            let answer = self.ask("Enter numbers separated by commas, or press enter for none")?;
            if answer.is_empty() {
                return Ok(Vec::new());
            }
            let picked: std::result::Result<Vec<usize>, _> = answer
                .split(',')
                .map(|part| part.trim().parse::<usize>())
                .collect();
            match picked {
                Ok(picked) if picked.iter().all(|n| (1..=options.len()).contains(n)) => {
                    let mut indices: Vec<usize> = picked.into_iter().map(|n| n - 1).collect();
                    indices.dedup();
                    return Ok(indices);
                }
                _ => println!("⚠️  Enter numbers between 1 and {}", options.len()),
            }
        }
    }

    fn address(&self, question: &str) -> Result<Option<Address>> {
        loop {
            let answer = self.ask(&format!("{} (press enter to skip)", question))?;
            if answer.is_empty() {
                return Ok(None);
            }
            match Address::from_hex(&answer) {
                Ok(address) => return Ok(Some(address)),
                Err(e) => println!("⚠️  {}", e),
            }
        }
    }
}

/// A scripted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Select(Option<usize>),
    Many(Vec<usize>),
    Address(Option<Address>),
}

/// Replays answers in order; running out cancels the prompt
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far
    pub fn questions(&self) -> Vec<String> {
        self.questions
            .lock()
            .map(|questions| questions.clone())
            .unwrap_or_default()
    }

    fn next(&self, question: &str) -> Result<Answer> {
        if let Ok(mut questions) = self.questions.lock() {
            questions.push(question.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .ok_or_else(|| FlowError::PromptCancelled(question.to_string()))
    }

    fn unexpected(question: &str, answer: Answer) -> FlowError {
        FlowError::PromptCancelled(format!("unexpected answer {:?} to '{}'", answer, question))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        match self.next(question)? {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            other => Err(Self::unexpected(question, other)),
        }
    }

    fn select(&self, question: &str, _options: &[String]) -> Result<Option<usize>> {
        match self.next(question)? {
            Answer::Select(choice) => Ok(choice),
            other => Err(Self::unexpected(question, other)),
        }
    }

    fn select_many(&self, question: &str, _options: &[String]) -> Result<Vec<usize>> {
        match self.next(question)? {
            Answer::Many(choices) => Ok(choices),
            other => Err(Self::unexpected(question, other)),
        }
    }

    fn address(&self, question: &str) -> Result<Option<Address>> {
        match self.next(question)? {
            Answer::Address(address) => Ok(address),
            other => Err(Self::unexpected(question, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_in_order() {
        let prompter = ScriptedPrompter::new([Answer::Yes, Answer::Select(Some(1))]);
        assert!(prompter.confirm("update?").unwrap());
        assert_eq!(prompter.select("account?", &[]).unwrap(), Some(1));
        assert_eq!(prompter.questions(), vec!["update?", "account?"]);
    }

    #[test]
    fn test_running_out_cancels() {
        let prompter = ScriptedPrompter::new([]);
        assert!(matches!(
            prompter.confirm("update?"),
            Err(FlowError::PromptCancelled(_))
        ));
    }

    #[test]
    fn test_mismatched_answer_is_an_error() {
        let prompter = ScriptedPrompter::new([Answer::Yes]);
        assert!(prompter.address("alias?").is_err());
    }
}
