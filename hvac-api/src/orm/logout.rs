//! Session revocation.

use diesel::prelude::*;

use crate::orm::login::DbRunner;
use crate::schema::sessions;

/// Flags the session behind `token` as revoked; the row stays for the audit
/// trail. Returns false when no live session had that token.
pub async fn revoke_session<D: DbRunner>(db: &D, token: &str) -> Result<bool, diesel::result::Error> {
    let token = token.to_string();
    let updated = db
        .run(move |conn| {
            diesel::update(
                sessions::table
                    .filter(sessions::id.eq(&token))
                    .filter(sessions::revoked.eq(false)),
            )
            .set(sessions::revoked.eq(true))
            .execute(conn)
        })
        .await?;
    Ok(updated > 0)
}
