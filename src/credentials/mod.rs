use std::fmt;

/// Environment variables checked for a token, in order.
pub const ENV_TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Env(&'static str),
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Flag => write!(f, "--token"),
            TokenSource::Env(var) => write!(f, "${}", var),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub source: TokenSource,
}

// Keep the token itself out of debug logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &mask_token(&self.token))
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve the GitHub token once, at startup: the `--token` flag wins,
/// then `GITHUB_TOKEN`, then `GH_TOKEN`. Blank values count as unset.
/// `None` means the run is unauthenticated.
pub fn resolve_token(flag: Option<&str>) -> Option<Credential> {
    resolve_token_with(flag, |var| std::env::var(var).ok())
}

fn resolve_token_with<F>(flag: Option<&str>, lookup: F) -> Option<Credential>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = flag.and_then(non_blank) {
        return Some(Credential {
            token,
            source: TokenSource::Flag,
        });
    }

    ENV_TOKEN_VARS.iter().find_map(|&var| {
        lookup(var).as_deref().and_then(non_blank).map(|token| Credential {
            token,
            source: TokenSource::Env(var),
        })
    })
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Show only the first and last four characters of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
