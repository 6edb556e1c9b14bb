//! User directory: identity resolution, account creation, search, presence.

use chrono::Utc;
use missive_store::User;
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::service::ChatService;
use crate::types::{NewUser, Page, Pagination, UserPage};

impl ChatService {
    /// Resolve a user by identifier.
    pub fn resolve_user(&self, id: Uuid) -> Result<User> {
        self.db.get_user(id).map_err(|e| match e {
            missive_store::StoreError::NotFound => {
                ChatError::NotFound(format!("User {id} not found"))
            }
            other => other.into(),
        })
    }

    /// Resolve a user by email address (case-insensitive).
    pub fn resolve_user_by_email(&self, email: &str) -> Result<User> {
        self.db.get_user_by_email(email.trim()).map_err(|e| match e {
            missive_store::StoreError::NotFound => {
                ChatError::NotFound("No account with this email".to_string())
            }
            other => other.into(),
        })
    }

    /// Create a new user account.
    ///
    /// The credential arrives already hashed; hashing is the caller's
    /// concern.  Fails with [`ChatError::Conflict`] when the username or
    /// email is already taken, naming the colliding field.
    pub fn create_user(&self, new_user: NewUser) -> Result<User> {
        let full_name = new_user.full_name.trim().to_string();
        let username = new_user.username.trim().to_string();
        let email = new_user.email.trim().to_lowercase();

        let name_len = full_name.chars().count();
        if !(2..=50).contains(&name_len) {
            return Err(ChatError::Validation(
                "Full name must be between 2 and 50 characters".to_string(),
            ));
        }
        let username_len = username.chars().count();
        if !(3..=30).contains(&username_len) {
            return Err(ChatError::Validation(
                "Username must be between 3 and 30 characters".to_string(),
            ));
        }
        if !is_valid_email(&email) {
            return Err(ChatError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }

        if let Some(existing) = self.db.lookup_user_by_username_or_email(&username, &email)? {
            if existing.email.eq_ignore_ascii_case(&email) {
                return Err(ChatError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            return Err(ChatError::Conflict(
                "This username is already taken".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name,
            username,
            email,
            password_hash: new_user.password_hash,
            avatar_url: new_user.avatar_url,
            is_online: false,
            last_seen: now,
            created_at: now,
        };

        self.db.create_user(&user)?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");

        Ok(user)
    }

    /// Search users by case-insensitive substring match against username or
    /// email, excluding the requesting user, sorted by username ascending.
    pub fn search_users(
        &self,
        query: &str,
        exclude: Option<Uuid>,
        page: Page,
    ) -> Result<UserPage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::Validation(
                "Search query is required".to_string(),
            ));
        }

        let users = self
            .db
            .search_users(query, exclude, page.size, page.offset())?;
        let total = self.db.count_search_users(query, exclude)?;

        Ok(UserPage {
            users,
            pagination: Pagination::compute(page, total),
        })
    }

    /// Flip a user's online flag, stamping their last-seen time.
    pub fn set_online(&self, id: Uuid, is_online: bool) -> Result<()> {
        self.db
            .set_online_status(id, is_online, Utc::now())
            .map_err(|e| match e {
                missive_store::StoreError::NotFound => {
                    ChatError::NotFound(format!("User {id} not found"))
                }
                other => other.into(),
            })?;
        tracing::debug!(user_id = %id, is_online, "presence updated");
        Ok(())
    }
}

/// Minimal well-formedness check: one `@`, no whitespace, and a dot-separated
/// domain with non-empty labels around the last dot.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((before, after)) => !before.is_empty() && !after.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_user, service};

    #[test]
    fn create_and_resolve() {
        let (_dir, svc) = service();
        let user = svc.create_user(new_user("mark", "mark@example.com")).unwrap();

        let resolved = svc.resolve_user(user.id).unwrap();
        assert_eq!(resolved.username, "mark");
        assert!(!resolved.is_online);
    }

    #[test]
    fn resolve_unknown_user_is_not_found() {
        let (_dir, svc) = service();
        let err = svc.resolve_user(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (_dir, svc) = service();
        svc.create_user(new_user("mark", "mark@example.com")).unwrap();

        let err = svc
            .create_user(new_user("other", "MARK@example.com"))
            .unwrap_err();
        match err {
            ChatError::Conflict(msg) => assert!(msg.contains("email")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_username_conflicts() {
        let (_dir, svc) = service();
        svc.create_user(new_user("mark", "mark@example.com")).unwrap();

        let err = svc
            .create_user(new_user("Mark", "mark2@example.com"))
            .unwrap_err();
        match err {
            ChatError::Conflict(msg) => assert!(msg.contains("username")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_fields() {
        let (_dir, svc) = service();

        let err = svc.create_user(new_user("x", "x@example.com")).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let err = svc
            .create_user(new_user("mark", "not-an-email"))
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("user.name@sub.domain.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email("a@b@c.de"));
    }

    #[test]
    fn search_excludes_requesting_user_and_sorts_by_username() {
        let (_dir, svc) = service();
        let mark = svc.create_user(new_user("mark", "mark@example.com")).unwrap();
        let maria = svc
            .create_user(new_user("maria", "maria@example.com"))
            .unwrap();
        svc.create_user(new_user("john", "john@example.com")).unwrap();

        let result = svc
            .search_users("mar", Some(maria.id), Page::new(1, 20))
            .unwrap();
        let usernames: Vec<_> = result.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(usernames, vec!["mark"]);

        let result = svc
            .search_users("mar", Some(mark.id), Page::new(1, 20))
            .unwrap();
        let usernames: Vec<_> = result.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(usernames, vec!["maria"]);

        // No exclusion: both matches, username ascending.
        let result = svc.search_users("MAR", None, Page::new(1, 20)).unwrap();
        let usernames: Vec<_> = result.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(usernames, vec!["maria", "mark"]);
        assert_eq!(result.pagination.total_count, 2);
        assert!(!result.pagination.has_more);
    }

    #[test]
    fn search_matches_email_too() {
        let (_dir, svc) = service();
        svc.create_user(new_user("alpha", "zeta@corp.example"))
            .unwrap();

        let result = svc.search_users("zeta", None, Page::new(1, 20)).unwrap();
        assert_eq!(result.users.len(), 1);
        assert_eq!(result.users[0].username, "alpha");
    }

    #[test]
    fn search_rejects_empty_query() {
        let (_dir, svc) = service();
        let err = svc.search_users("   ", None, Page::new(1, 20)).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn set_online_flips_flag_and_stamps_last_seen() {
        let (_dir, svc) = service();
        let user = svc.create_user(new_user("mark", "mark@example.com")).unwrap();

        svc.set_online(user.id, true).unwrap();
        let online = svc.resolve_user(user.id).unwrap();
        assert!(online.is_online);
        assert!(online.last_seen >= user.last_seen);

        svc.set_online(user.id, false).unwrap();
        assert!(!svc.resolve_user(user.id).unwrap().is_online);
    }
}
