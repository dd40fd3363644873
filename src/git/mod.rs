//! Local git collaborators: path listing, file content, commit history and
//! repository metadata, all read through `git2`.

pub mod history;
pub mod repository;
pub mod tree;

#[cfg(test)]
pub(crate) mod fixture;

pub use repository::{parse_remote, GitRepository, RemoteInfo};

use crate::error::Result;

/// Run `op`, retrying transient failures up to `retries` extra times.
/// The last error is returned unchanged.
pub fn with_retry<T, F>(retries: u32, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < retries => {
                attempt += 1;
                tracing::warn!("{} failed (attempt {}/{}): {}", what, attempt, retries + 1, e);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn retries_transient_failures_then_succeeds() {
        let mut calls = 0;
        let value = with_retry(2, "read", || {
            calls += 1;
            if calls < 3 {
                Err(AppError::upstream("flaky"))
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn gives_up_with_the_last_message() {
        let mut calls = 0;
        let err = with_retry(1, "read", || -> Result<()> {
            calls += 1;
            Err(AppError::upstream(format!("attempt {calls}")))
        })
        .unwrap_err();
        assert_eq!(calls, 2);
        assert_eq!(err.to_string(), "attempt 2");
    }

    #[test]
    fn input_errors_are_not_retried() {
        let mut calls = 0;
        let _ = with_retry(5, "read", || -> Result<()> {
            calls += 1;
            Err(AppError::input("bad"))
        });
        assert_eq!(calls, 1);
    }
}
