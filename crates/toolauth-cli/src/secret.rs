//! Secret reference resolver for `config.toml` values.
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and takes the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used as-is

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        resolve_env(var)
    } else {
        Ok(value.to_string())
    }
}

/// Returns true if the value is a secret reference rather than plain text.
pub fn is_reference(value: &str) -> bool {
    value.starts_with("pass::") || value.starts_with("env::")
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}

fn resolve_env(var: &str) -> Result<String, String> {
    std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
}
