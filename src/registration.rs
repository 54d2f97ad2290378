// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! User registration.

use crate::error::ServiceError;
use crate::gateway::{Connection, Gateway, NewUser};
use crate::model::User;
use crate::scope::TransactionScope;
use tracing::info;

/// Registers a user. Email and name are trimmed and must not be empty.
///
/// # Errors
///
/// - [`ServiceError::InvalidRequest`] - email or name missing.
/// - [`ServiceError::Storage`] - the email is already registered, or the store failed.
pub fn register_user<G: Gateway>(
    scope: &TransactionScope<G>,
    email: &str,
    name: &str,
) -> Result<User, ServiceError> {
    let email = email.trim();
    let name = name.trim();
    if email.is_empty() || name.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "email and name required".to_string(),
        ));
    }

    let user = scope.run(|tx| {
        Ok(tx.insert_user(NewUser {
            email: email.to_string(),
            name: name.to_string(),
        })?)
    })?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// All registered users, ordered by id.
pub fn list_users<G: Gateway>(gateway: &G) -> Result<Vec<User>, ServiceError> {
    Ok(gateway.acquire()?.users()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::error::StorageError;
    use crate::store::MemoryStore;

    fn scope() -> TransactionScope<MemoryStore> {
        TransactionScope::new(MemoryStore::new(&StoreConfig::default()))
    }

    #[test]
    fn registers_and_lists_users() {
        let scope = scope();
        let ada = register_user(&scope, " ada@example.com ", "Ada").unwrap();
        let bob = register_user(&scope, "bob@example.com", "Bob").unwrap();
        assert_eq!(ada.email, "ada@example.com");

        let users = list_users(scope.gateway()).unwrap();
        assert_eq!(users, vec![ada, bob]);
    }

    #[test]
    fn missing_fields_rejected() {
        let scope = scope();
        for (email, name) in [("", "Ada"), ("ada@example.com", "  ")] {
            assert_eq!(
                register_user(&scope, email, name),
                Err(ServiceError::InvalidRequest(
                    "email and name required".to_string()
                ))
            );
        }
        assert!(list_users(scope.gateway()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_email_violates_constraint() {
        let scope = scope();
        register_user(&scope, "ada@example.com", "Ada").unwrap();
        assert_eq!(
            register_user(&scope, "ada@example.com", "Other"),
            Err(ServiceError::Storage(StorageError::Constraint(
                "users_email_key"
            )))
        );
    }
}
