//! Line-based interactive flows
//!
//! Every flow reads answers one line at a time from any `BufRead` and writes
//! prompts and status messages to any `Write`, so the same code drives a
//! terminal and in-memory buffers in tests. End of input aborts the flow.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::auth::{PasswordUpdate, Registration, Session};
use crate::config::{Config, DEFAULT_LOGIN_ATTEMPTS, DEFAULT_PROMPT_RETRIES};
use crate::error::Result;

/// Outcome of one interactive step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<T> {
    Done(T),
    Retry,
    Abort,
}

pub struct Console<R, W> {
    input: R,
    output: W,
    login_attempts: u32,
    prompt_retries: u32,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            login_attempts: DEFAULT_LOGIN_ATTEMPTS,
            prompt_retries: DEFAULT_PROMPT_RETRIES,
        }
    }

    /// Take attempt limits from configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.login_attempts = config.max_login_attempts.max(1);
        self.prompt_retries = config.max_prompt_retries.max(1);
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Print `label` and read one line; `None` at end of input
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            debug!("Input closed");
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Run `step` until it finishes, aborts, or `limit` attempts pass
    fn retry<T>(
        &mut self,
        limit: u32,
        mut step: impl FnMut(&mut Self, u32) -> Result<Flow<T>>,
    ) -> Result<Option<T>> {
        for attempt in 1..=limit {
            match step(self, attempt)? {
                Flow::Done(value) => return Ok(Some(value)),
                Flow::Retry => continue,
                Flow::Abort => return Ok(None),
            }
        }
        self.say("Too many attempts.")?;
        Ok(None)
    }

    /// Prompt for credentials until login succeeds or attempts run out
    pub fn login(&mut self, session: &mut Session) -> Result<bool> {
        let limit = self.login_attempts;
        let outcome = self.retry(limit, |console, attempt| {
            console.say(&format!("Attempt {attempt} / {limit}"))?;
            let Some(username) = console.prompt("Username: ")? else {
                return Ok(Flow::Abort);
            };
            let Some(password) = console.prompt("Password: ")? else {
                return Ok(Flow::Abort);
            };

            if session.login_user(username.trim(), &password)? {
                console.say("Successful login")?;
                Ok(Flow::Done(true))
            } else {
                console.say("Invalid username or password.")?;
                Ok(Flow::Retry)
            }
        })?;

        Ok(outcome.unwrap_or(false))
    }

    /// Prompt for a new account; a taken username offers retry or login
    pub fn register(&mut self, session: &mut Session) -> Result<bool> {
        let limit = self.prompt_retries;
        let mut kept_username: Option<String> = None;

        let outcome = self.retry(limit, |console, _| {
            let username = match kept_username.take() {
                Some(name) => {
                    console.say(&format!("Username: {name}"))?;
                    name
                }
                None => match console.prompt("Username: ")? {
                    Some(name) => name.trim().to_string(),
                    None => return Ok(Flow::Abort),
                },
            };
            if username.is_empty() {
                console.say("Username cannot be empty.")?;
                return Ok(Flow::Retry);
            }

            let Some(password) = console.prompt("Password: ")? else {
                return Ok(Flow::Abort);
            };
            let Some(confirm) = console.prompt("Confirm password: ")? else {
                return Ok(Flow::Abort);
            };

            match session.register_user(&username, &password, &confirm)? {
                Registration::Registered(id) => {
                    console.say(&format!(
                        "User {id} with username {username} has been created and logged in."
                    ))?;
                    Ok(Flow::Done(true))
                }
                Registration::PasswordMismatch => {
                    console.say("The passwords don't match. Please try again.")?;
                    kept_username = Some(username);
                    Ok(Flow::Retry)
                }
                Registration::UsernameTaken => {
                    console.say("That username already exists.")?;
                    match console.prompt("[T]ry again or [L]ogin? ")? {
                        Some(choice) if choice.trim().eq_ignore_ascii_case("t") => {
                            Ok(Flow::Retry)
                        }
                        Some(_) => Ok(Flow::Done(console.login(session)?)),
                        None => Ok(Flow::Abort),
                    }
                }
            }
        })?;

        Ok(outcome.unwrap_or(false))
    }

    /// Prompt for old, new and confirmed password
    pub fn update_password(&mut self, session: &mut Session) -> Result<bool> {
        if !session.is_logged_in() {
            self.say("You must be logged in to change your password.")?;
            return Ok(false);
        }

        let limit = self.prompt_retries;
        let outcome = self.retry(limit, |console, _| {
            let Some(old) = console.prompt("Enter old password: ")? else {
                return Ok(Flow::Abort);
            };
            let Some(new) = console.prompt("Enter new password: ")? else {
                return Ok(Flow::Abort);
            };
            let Some(confirm) = console.prompt("Confirm new password: ")? else {
                return Ok(Flow::Abort);
            };

            match session.update_password(&old, &new, &confirm)? {
                PasswordUpdate::Updated => {
                    console.say("Password updated.")?;
                    Ok(Flow::Done(true))
                }
                PasswordUpdate::ConfirmationMismatch => {
                    console.say("Passwords didn't match. Try again.")?;
                    Ok(Flow::Retry)
                }
                PasswordUpdate::IncorrectPassword => {
                    console.say("Old password is incorrect. Try again.")?;
                    Ok(Flow::Retry)
                }
            }
        })?;

        Ok(outcome.unwrap_or(false))
    }

    /// Ask for confirmation, then delete the current account
    pub fn deactivate(&mut self, session: &mut Session) -> Result<bool> {
        let Some(username) = session.current_user().map(|u| u.username.clone()) else {
            self.say("You must be logged in to deactivate your account.")?;
            return Ok(false);
        };

        let answer = self.prompt(&format!(
            "Deactivate account {username}? This cannot be undone. [y/N] "
        ))?;
        if !matches!(answer, Some(a) if a.trim().eq_ignore_ascii_case("y")) {
            self.say("Account kept.")?;
            return Ok(false);
        }

        session.deactivate_account()?;
        self.say("Account deactivated.")?;
        Ok(true)
    }

    /// Main menu loop; returns on quit or end of input
    pub fn run(&mut self, session: &mut Session) -> Result<()> {
        loop {
            let label = match session.current_user() {
                Some(user) => format!(
                    "[{}] [P]assword, [D]eactivate, L[o]gout or [Q]uit? ",
                    user.username
                ),
                None => "[L]ogin, [R]egister or [Q]uit? ".to_string(),
            };
            let Some(choice) = self.prompt(&label)? else {
                return Ok(());
            };
            let choice = choice.trim().to_ascii_uppercase();

            match (session.is_logged_in(), choice.as_str()) {
                (_, "Q") => return Ok(()),
                (false, "L") => {
                    self.login(session)?;
                }
                (false, "R") => {
                    self.register(session)?;
                }
                (true, "P") => {
                    self.update_password(session)?;
                }
                (true, "D") => {
                    self.deactivate(session)?;
                }
                (true, "O") => {
                    session.logout();
                    self.say("Logged out.")?;
                }
                _ => self.say("Unknown choice.")?,
            }
        }
    }
}
