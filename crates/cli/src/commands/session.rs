//! Session record commands.
//!
//! # Usage
//!
//! ```bash
//! agriverse login -u 65f1c0ffee0123456789abcd -n "Asha" -r Farmer
//! agriverse whoami
//! agriverse logout
//! ```

use std::io::Write;

use agriverse_cart::SessionUser;
use agriverse_core::UserId;

use super::{CliError, Context};

/// Persist `user_id` as the logged-in user.
///
/// # Errors
///
/// Returns an error if the session record cannot be written.
pub fn login(
    ctx: &Context,
    user_id: String,
    name: Option<String>,
    role: Option<String>,
) -> Result<(), CliError> {
    let user = SessionUser {
        id: Some(UserId::new(user_id)),
        name,
        role,
    };
    ctx.session.save(&user)?;

    tracing::info!(path = %ctx.session.path().display(), "Session saved");
    writeln!(std::io::stdout().lock(), "Logged in as {}", describe(&user))?;
    Ok(())
}

/// Remove the session record.
///
/// # Errors
///
/// Returns an error if the record exists but cannot be removed.
pub fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.session.clear()?;
    writeln!(std::io::stdout().lock(), "Logged out")?;
    Ok(())
}

/// Print the logged-in user.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn whoami(ctx: &Context) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();

    // load_identity purges corrupt records; read_user only for display details
    match ctx.session.load_identity() {
        Some(id) => {
            let user = ctx
                .session
                .read_user()
                .ok()
                .flatten()
                .unwrap_or_else(|| SessionUser {
                    id: Some(id),
                    ..SessionUser::default()
                });
            writeln!(out, "{}", describe(&user))?;
        }
        None => writeln!(out, "Not logged in")?,
    }
    Ok(())
}

fn describe(user: &SessionUser) -> String {
    let id = user.id.as_ref().map_or("?", UserId::as_str);
    match (&user.name, &user.role) {
        (Some(name), Some(role)) => format!("{name} ({role}, {id})"),
        (Some(name), None) => format!("{name} ({id})"),
        (None, Some(role)) => format!("{id} ({role})"),
        (None, None) => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_user() {
        let user = SessionUser {
            id: Some(UserId::new("u1")),
            name: Some("Asha".to_string()),
            role: Some("Farmer".to_string()),
        };
        assert_eq!(describe(&user), "Asha (Farmer, u1)");

        let bare = SessionUser {
            id: Some(UserId::new("u2")),
            ..SessionUser::default()
        };
        assert_eq!(describe(&bare), "u2");
    }
}
