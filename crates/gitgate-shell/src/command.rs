//! Splitting the command line an SSH client asked to run.
//!
//! Git clients send `git-upload-pack 'path/to/repo.git'`, quoting the path
//! for a POSIX shell. No shell is involved here, so the command is split at
//! the first whitespace and the remainder unquoted as a single argument.

/// Splits `raw` into the program and at most one argument.
///
/// Returns an empty vector for a blank command.
pub fn split_command(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    match raw.split_once(char::is_whitespace) {
        None => vec![raw.to_string()],
        Some((program, rest)) => vec![program.to_string(), unquote(rest.trim())],
    }
}

fn unquote(arg: &str) -> String {
    let single = arg.len() >= 2 && arg.starts_with('\'') && arg.ends_with('\'');
    let double = arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"');

    if single {
        // A literal quote inside single quotes is written '\''.
        arg[1..arg.len() - 1].replace("'\\''", "'")
    } else if double {
        arg[1..arg.len() - 1].to_string()
    } else {
        arg.to_string()
    }
}
