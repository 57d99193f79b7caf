//! Terminal prompts. Everything is drawn on stderr so stdout stays clean for
//! `--json` output.

use std::io;
#[cfg(not(feature = "cli"))]
use std::io::Write;

use anyhow::{Context, Result};
use secrecy::SecretString;

use crate::saml::{CaptchaPrompt, Prompter};

/// [`Prompter`] that asks on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn captcha_solution(&self, prompt: &CaptchaPrompt) -> io::Result<String> {
        eprintln!("Google wants a CAPTCHA solved. Open this image:");
        eprintln!("  {}", prompt.image_url);
        read_line("CAPTCHA")
    }

    fn one_time_code(&self) -> io::Result<String> {
        read_line("One-time code")
    }
}

pub fn prompt_username() -> Result<String> {
    let username = read_line("Email").context("Failed to prompt for email")?;
    anyhow::ensure!(!username.trim().is_empty(), "Email is required");
    Ok(username.trim().to_string())
}

pub fn prompt_password() -> Result<SecretString> {
    let password = read_secret("Password").context("Failed to prompt for password")?;
    Ok(SecretString::from(password))
}

pub fn prompt_select_index(prompt: &str, options: &[String]) -> Result<Option<usize>> {
    prompt_select_index_impl(prompt, options)
}

#[cfg(feature = "cli")]
fn read_line(prompt: &str) -> io::Result<String> {
    use dialoguer::console::Term;
    use dialoguer::{theme::ColorfulTheme, Input};

    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text_on(&Term::stderr())
        .map_err(io::Error::other)
}

#[cfg(feature = "cli")]
fn read_secret(prompt: &str) -> io::Result<String> {
    use dialoguer::console::Term;
    use dialoguer::{theme::ColorfulTheme, Password};

    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_on(&Term::stderr())
        .map_err(io::Error::other)
}

#[cfg(feature = "cli")]
fn prompt_select_index_impl(prompt: &str, options: &[String]) -> Result<Option<usize>> {
    use dialoguer::console::Term;
    use dialoguer::{theme::ColorfulTheme, Select};

    if options.is_empty() {
        return Ok(None);
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact_on_opt(&Term::stderr())
        .context("Failed to prompt for selection")?;

    Ok(selection)
}

#[cfg(not(feature = "cli"))]
fn read_line(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}: ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

// Without a terminal library the input is echoed.
#[cfg(not(feature = "cli"))]
fn read_secret(prompt: &str) -> io::Result<String> {
    read_line(prompt)
}

#[cfg(not(feature = "cli"))]
fn prompt_select_index_impl(prompt: &str, options: &[String]) -> Result<Option<usize>> {
    if options.is_empty() {
        return Ok(None);
    }

    eprintln!("{prompt}");
    for (i, opt) in options.iter().enumerate() {
        eprintln!("{}) {opt}", i + 1);
    }
    loop {
        let input = read_line(&format!("Select [1-{}] (Enter to cancel)", options.len()))?;
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("q") {
            return Ok(None);
        }

        let n: usize = match input.parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Invalid selection: {input}");
                continue;
            }
        };
        if n == 0 || n > options.len() {
            eprintln!("Selection out of range: {n}");
            continue;
        }
        return Ok(Some(n - 1));
    }
}
