use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::{Chirp, User};
use crate::{Database, Result, StoreError};

impl Database {
    // -- Chirps --

    /// Stores a chirp under the next id and returns the new record.
    pub fn create_chirp(&self, body: &str, author_id: u64) -> Result<Chirp> {
        let _guard = self.write_guard();
        let mut doc = self.load()?;

        let id = doc.next_chirp_id();
        let chirp = Chirp {
            id,
            body: body.to_string(),
            author_id,
        };
        doc.chirps.insert(id, chirp.clone());

        self.save(&doc)?;
        Ok(chirp)
    }

    /// All chirps in ascending id order.
    pub fn get_chirps(&self) -> Result<Vec<Chirp>> {
        let _guard = self.read_guard();
        let doc = self.load()?;
        Ok(doc.chirps.into_values().collect())
    }

    pub fn get_chirp(&self, id: u64) -> Result<Chirp> {
        let _guard = self.read_guard();
        let doc = self.load()?;
        doc.chirps
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("chirp"))
    }

    pub fn delete_chirp(&self, id: u64) -> Result<()> {
        let _guard = self.write_guard();
        let mut doc = self.load()?;

        if doc.chirps.remove(&id).is_none() {
            return Err(StoreError::NotFound("chirp"));
        }

        self.save(&doc)
    }

    // -- Users --

    /// Stores a new user. The email must not belong to any existing user.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let _guard = self.write_guard();
        let mut doc = self.load()?;

        if doc.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }

        let id = doc.next_user_id();
        let user = User {
            id,
            email: email.to_string(),
            password: password_hash.to_string(),
            is_chirpy_red: false,
        };
        doc.users.insert(id, user.clone());

        self.save(&doc)?;
        Ok(user)
    }

    /// All users in ascending id order.
    pub fn get_users(&self) -> Result<Vec<User>> {
        let _guard = self.read_guard();
        let doc = self.load()?;
        Ok(doc.users.into_values().collect())
    }

    pub fn get_user(&self, id: u64) -> Result<User> {
        let _guard = self.read_guard();
        let doc = self.load()?;
        doc.users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("user"))
    }

    /// Replaces every field of the user except the id. Moving to an email
    /// owned by a different user is a conflict; keeping one's own is not.
    pub fn update_user(
        &self,
        id: u64,
        email: &str,
        password_hash: &str,
        is_chirpy_red: bool,
    ) -> Result<User> {
        let _guard = self.write_guard();
        let mut doc = self.load()?;

        let taken = doc.users.values().any(|u| u.id != id && u.email == email);
        let user = doc
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound("user"))?;
        if taken {
            return Err(StoreError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }

        user.email = email.to_string();
        user.password = password_hash.to_string();
        user.is_chirpy_red = is_chirpy_red;
        let updated = user.clone();

        self.save(&doc)?;
        Ok(updated)
    }

    // -- Revocations --

    /// Marks a refresh token revoked as of `now`. Revoking again only
    /// refreshes the timestamp.
    pub fn revoke_token(&self, token: &str, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_guard();
        let mut doc = self.load()?;

        doc.revoked_tokens.insert(token.to_string(), now);

        self.save(&doc)
    }

    pub fn get_revoked_tokens(&self) -> Result<BTreeMap<String, DateTime<Utc>>> {
        let _guard = self.read_guard();
        let doc = self.load()?;
        Ok(doc.revoked_tokens)
    }

    /// Drops revocation entries stamped before `cutoff` and returns how
    /// many were removed. The file is only rewritten when something was.
    pub fn prune_revoked_tokens(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let _guard = self.write_guard();
        let mut doc = self.load()?;

        let before = doc.revoked_tokens.len();
        doc.revoked_tokens.retain(|_, revoked_at| *revoked_at >= cutoff);
        let removed = before - doc.revoked_tokens.len();

        if removed > 0 {
            self.save(&doc)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn temp_db(dir: &TempDir) -> Database {
        Database::open(&dir.path().join("database.json"), false).unwrap()
    }

    #[test]
    fn chirp_ids_are_never_reused_after_delete() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let first = db.create_chirp("hello world", 1).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.body, "hello world");
        assert_eq!(first.author_id, 1);

        let second = db.create_chirp("this is **** talk", 1).unwrap();
        assert_eq!(second.id, 2);

        db.delete_chirp(1).unwrap();
        let remaining = db.get_chirps().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);

        let third = db.create_chirp("another one", 1).unwrap();
        assert_eq!(third.id, 3);
    }

    #[test]
    fn chirps_list_in_ascending_id_order() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        for body in ["a", "b", "c", "d"] {
            db.create_chirp(body, 7).unwrap();
        }
        db.delete_chirp(2).unwrap();
        db.create_chirp("e", 7).unwrap();

        let ids: Vec<u64> = db.get_chirps().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
    }

    #[test]
    fn get_chirp_round_trips_body_and_author() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let created = db.create_chirp("just setting up my chrpy", 42).unwrap();
        let fetched = db.get_chirp(created.id).unwrap();
        assert_eq!(fetched.body, created.body);
        assert_eq!(fetched.author_id, 42);
    }

    #[test]
    fn missing_chirp_is_not_found() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        assert!(matches!(db.get_chirp(99), Err(StoreError::NotFound(_))));

        db.create_chirp("here", 1).unwrap();
        let before = db.get_chirps().unwrap();
        assert!(matches!(db.delete_chirp(99), Err(StoreError::NotFound(_))));
        let after = db.get_chirps().unwrap();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].id, after[0].id);
    }

    #[test]
    fn duplicate_email_is_a_conflict_and_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let original = db.create_user("walt@breakingbad.com", "hash1").unwrap();
        let err = db.create_user("walt@breakingbad.com", "hash2").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let users = db.get_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, original.id);
        assert_eq!(users[0].password, "hash1");
    }

    #[test]
    fn email_match_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        db.create_user("walt@breakingbad.com", "h").unwrap();
        let second = db.create_user("Walt@breakingbad.com", "h").unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn update_user_rechecks_email_uniqueness() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let walt = db.create_user("walt@breakingbad.com", "h1").unwrap();
        db.create_user("jesse@breakingbad.com", "h2").unwrap();

        let err = db
            .update_user(walt.id, "jesse@breakingbad.com", "h3", false)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Keeping your own email is not a conflict.
        let updated = db
            .update_user(walt.id, "walt@breakingbad.com", "h3", true)
            .unwrap();
        assert_eq!(updated.password, "h3");
        assert!(updated.is_chirpy_red);
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let err = db.update_user(5, "a@b.com", "h", false).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn id_counters_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");

        {
            let db = Database::open(&path, false).unwrap();
            db.create_chirp("one", 1).unwrap();
            db.create_chirp("two", 1).unwrap();
            db.delete_chirp(1).unwrap();
            db.delete_chirp(2).unwrap();
        }

        let db = Database::open(&path, false).unwrap();
        let chirp = db.create_chirp("three", 1).unwrap();
        assert_eq!(chirp.id, 3);
    }

    #[test]
    fn counterless_file_resumes_after_highest_id() {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("database.json");

        fs::write(
            &path,
            r#"{
                "chirps": {
                    "1": {"id": 1, "body": "old", "author_id": 1},
                    "7": {"id": 7, "body": "older", "author_id": 2}
                },
                "users": {
                    "3": {"id": 3, "email": "old@user.com", "password": "h"}
                }
            }"#,
        )
        .unwrap();

        let db = Database::open(&path, false).unwrap();
        assert_eq!(db.create_chirp("new", 3).unwrap().id, 8);
        assert_eq!(db.create_user("new@user.com", "h").unwrap().id, 4);

        // The legacy user loads with the premium flag defaulted off.
        assert!(!db.get_user(3).unwrap().is_chirpy_red);
    }

    #[test]
    fn revoking_a_token_twice_keeps_one_entry() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let t0 = Utc::now();
        db.revoke_token("some.refresh.token", t0).unwrap();
        db.revoke_token("some.refresh.token", t0 + Duration::seconds(5))
            .unwrap();

        let revoked = db.get_revoked_tokens().unwrap();
        assert_eq!(revoked.len(), 1);
        assert_eq!(
            revoked.get("some.refresh.token"),
            Some(&(t0 + Duration::seconds(5)))
        );
    }

    #[test]
    fn prune_drops_only_entries_before_cutoff() {
        let dir = TempDir::new().unwrap();
        let db = temp_db(&dir);

        let now = Utc::now();
        db.revoke_token("stale", now - Duration::hours(48)).unwrap();
        db.revoke_token("fresh", now).unwrap();

        let removed = db.prune_revoked_tokens(now - Duration::hours(24)).unwrap();
        assert_eq!(removed, 1);

        let revoked = db.get_revoked_tokens().unwrap();
        assert!(!revoked.contains_key("stale"));
        assert!(revoked.contains_key("fresh"));

        // Nothing left to prune.
        assert_eq!(db.prune_revoked_tokens(now - Duration::hours(24)).unwrap(), 0);
    }

    #[test]
    fn open_with_reset_discards_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");

        {
            let db = Database::open(&path, false).unwrap();
            db.create_chirp("doomed", 1).unwrap();
        }

        let db = Database::open(&path, true).unwrap();
        assert!(db.get_chirps().unwrap().is_empty());
        // The counter resets with the rest of the document.
        assert_eq!(db.create_chirp("fresh start", 1).unwrap().id, 1);
    }

    #[test]
    fn empty_file_loads_as_empty_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, "").unwrap();

        let db = Database::open(&path, false).unwrap();
        assert!(db.get_chirps().unwrap().is_empty());
        assert!(db.get_users().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, "{not json").unwrap();

        let err = Database::open(&path, false).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn reset_recovers_a_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, "{not json").unwrap();

        let db = Database::open(&path, true).unwrap();
        assert!(db.get_chirps().unwrap().is_empty());
    }
}
