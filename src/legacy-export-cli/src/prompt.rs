//! Operator prompts for missing or rejected roots

use dialoguer::Input;
use std::path::PathBuf;

/// Asks the operator for a directory. `None` means the operator gave up
/// (or cannot be asked).
pub trait Prompt {
    fn ask_path(&mut self, question: &str) -> Option<PathBuf>;
}

/// Interactive terminal prompt; an empty answer ends the run
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask_path(&mut self, question: &str) -> Option<PathBuf> {
        let answer: String = Input::new()
            .with_prompt(format!("{} (empty to quit)", question))
            .allow_empty(true)
            .interact_text()
            .ok()?;

        let answer = answer.trim().trim_matches('"');
        if answer.is_empty() {
            None
        } else {
            Some(PathBuf::from(answer))
        }
    }
}

/// Used with `--no-prompt` or when stdin is not a terminal
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn ask_path(&mut self, _question: &str) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
pub mod scripted {
    use super::Prompt;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Replays canned answers and remembers the questions
    #[derive(Default)]
    pub struct ScriptedPrompt {
        pub answers: VecDeque<PathBuf>,
        pub asked: Vec<String>,
    }

    impl ScriptedPrompt {
        pub fn new<I: IntoIterator<Item = PathBuf>>(answers: I) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask_path(&mut self, question: &str) -> Option<PathBuf> {
            self.asked.push(question.to_string());
            self.answers.pop_front()
        }
    }
}
