// Interactive credential prompt used by the `login` command

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// Username and password typed by the user
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Ask for username and password on stdin.
///
/// The password is echoed; the terminal is not switched to hidden input.
pub fn prompt_credentials() -> Result<Credentials> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let username = prompt(&mut input, "Username: ")?;
    let password = prompt(&mut input, "Password: ")?;

    if username.is_empty() || password.is_empty() {
        anyhow::bail!("username and password must not be empty");
    }

    Ok(Credentials { username, password })
}

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {}", label.trim_end_matches(": ")))?;

    Ok(line.trim().to_string())
}
